//! A binary whose registry holds an invalid configuration: discovery must
//! refuse to start rather than serve it.
//!
//! The attribute macros reject out-of-range literals while compiling, so the
//! invalid entry is registered by hand with metadata built at runtime.

use triggerkit::discovery::Registration;
use triggerkit::error::{CodegenError, ConfigurationError, ConfigurationErrorKind};
use triggerkit::function::{FunctionMetadata, MessageQueueTrigger};
use triggerkit::http::{Request, Response};
use triggerkit::manifest::ManifestFormat;
use triggerkit::runtime::{queue_handler, Handler};

#[triggerkit::http]
async fn fine(_req: Request) -> Response {
    Response::ok()
}

async fn overloaded(_job: serde_json::Value) {}

fn overloaded_metadata() -> Result<FunctionMetadata, ConfigurationError> {
    MessageQueueTrigger::new("jobs")
        .min_instances(5)
        .max_instances(2)
        .metadata()
}

fn overloaded_handler() -> Box<dyn Handler> {
    queue_handler(overloaded)
}

triggerkit::__private::inventory::submit! {
    Registration {
        name: "overloaded",
        ident: "overloaded",
        doc: "",
        file: file!(),
        line: line!(),
        column: column!(),
        metadata: overloaded_metadata,
        handler: overloaded_handler,
    }
}

#[test]
fn test_discover_reports_offending_function() {
    let err = triggerkit::discovery::discover().unwrap_err();
    assert_eq!(err.function.as_deref(), Some("overloaded"));
    assert_eq!(err.kind, ConfigurationErrorKind::MaxBelowMin { min: 5, max: 2 });
}

#[test]
fn test_from_registry_fails_before_serving() {
    let err = triggerkit::runtime::from_registry(ManifestFormat::Json).unwrap_err();
    assert!(matches!(err, CodegenError::Configuration(_)));
    assert!(err.to_string().contains("`overloaded`"));
}

#[test]
fn test_valid_registrations_still_introspectable() {
    let registration = triggerkit::discovery::lookup("fine").unwrap();
    assert!((registration.metadata)().is_ok());
    assert!(triggerkit::discovery::lookup("overloaded").is_some());
}
