//! Trigger builders and decorated functions.
//!
//! Each trigger kind has a builder. [`HttpTrigger`] has only optional
//! options, so it also offers a bare form ([`HttpTrigger::bare`]) that takes
//! every default. [`MessageQueueTrigger`] needs a topic up front and has no
//! bare form.
//!
//! ```
//! use triggerkit::function::{HttpTrigger, MessageQueueTrigger};
//!
//! fn add(a: i32, b: i32) -> i32 {
//!     a + b
//! }
//!
//! let bare = HttpTrigger::bare("add", add);
//! assert_eq!(bare(2, 3), 5);
//!
//! let scaled = HttpTrigger::new()
//!     .min_instances(1)
//!     .max_instances(4)
//!     .decorate("add", add)
//!     .unwrap();
//! assert_eq!(scaled.metadata().options().max_instances, Some(4));
//!
//! assert!(MessageQueueTrigger::new("").decorate("add", add).is_err());
//! ```

use crate::error::ConfigurationError;
use crate::function::metadata::{FunctionMetadata, TriggerKind, TriggerOptions};
use std::fmt;
use std::ops::Deref;

macro_rules! scaling_setters {
    () => {
        /// Minimum number of warm instances.
        pub fn min_instances(mut self, count: u32) -> Self {
            self.options.min_instances = Some(count);
            self
        }

        /// Maximum number of concurrent instances.
        pub fn max_instances(mut self, count: u32) -> Self {
            self.options.max_instances = Some(count);
            self
        }

        /// Memory allocation in megabytes.
        pub fn memory_mb(mut self, megabytes: u32) -> Self {
            self.options.memory_mb = Some(megabytes);
            self
        }

        /// Invocation timeout in seconds.
        pub fn timeout_secs(mut self, seconds: u32) -> Self {
            self.options.timeout_secs = Some(seconds);
            self
        }
    };
}

/// Builder for HTTP-triggered functions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpTrigger {
    options: TriggerOptions,
}

impl HttpTrigger {
    /// A trigger with every option at its default.
    pub fn new() -> Self {
        Self::default()
    }

    scaling_setters!();

    /// Bare form: decorate `func` with the default HTTP configuration.
    pub fn bare<F>(name: impl Into<String>, func: F) -> DecoratedFunction<F> {
        DecoratedFunction::new(name, FunctionMetadata::http_defaults(), func)
    }

    /// Validate the configured options.
    pub fn metadata(&self) -> Result<FunctionMetadata, ConfigurationError> {
        FunctionMetadata::new(TriggerKind::Http, self.options.clone())
    }

    /// Configured form: attach the validated metadata to `func`.
    pub fn decorate<F>(
        self,
        name: impl Into<String>,
        func: F,
    ) -> Result<DecoratedFunction<F>, ConfigurationError> {
        decorate(name.into(), self.metadata(), func)
    }
}

/// Builder for functions subscribed to a message-queue topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageQueueTrigger {
    options: TriggerOptions,
}

impl MessageQueueTrigger {
    /// A trigger subscribed to `topic`, with every other option at its default.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            options: TriggerOptions {
                topic: Some(topic.into()),
                ..TriggerOptions::default()
            },
        }
    }

    scaling_setters!();

    /// Validate the configured options.
    pub fn metadata(&self) -> Result<FunctionMetadata, ConfigurationError> {
        FunctionMetadata::new(TriggerKind::MessageQueue, self.options.clone())
    }

    /// Attach the validated metadata to `func`.
    pub fn decorate<F>(
        self,
        name: impl Into<String>,
        func: F,
    ) -> Result<DecoratedFunction<F>, ConfigurationError> {
        decorate(name.into(), self.metadata(), func)
    }
}

fn decorate<F>(
    name: String,
    metadata: Result<FunctionMetadata, ConfigurationError>,
    func: F,
) -> Result<DecoratedFunction<F>, ConfigurationError> {
    match metadata {
        Ok(metadata) => Ok(DecoratedFunction::new(name, metadata, func)),
        Err(err) => Err(err.for_function(name)),
    }
}

/// A callable paired with exactly one [`FunctionMetadata`].
///
/// Dereferences to the wrapped callable, so `(*decorated)(args)` or
/// `decorated(args)` on a function pointer behaves exactly like the original.
#[derive(Clone)]
pub struct DecoratedFunction<F> {
    name: String,
    doc: Option<String>,
    metadata: FunctionMetadata,
    func: F,
}

impl<F> DecoratedFunction<F> {
    fn new(name: impl Into<String>, metadata: FunctionMetadata, func: F) -> Self {
        Self {
            name: name.into(),
            doc: None,
            metadata,
            func,
        }
    }

    /// Record the documentation of the wrapped function.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        let doc = doc.into();
        self.doc = (!doc.is_empty()).then_some(doc);
        self
    }

    /// Deployment identifier.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Documentation recorded with [`DecoratedFunction::with_doc`].
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// The validated trigger metadata.
    pub fn metadata(&self) -> &FunctionMetadata {
        &self.metadata
    }

    /// Shorthand for `metadata().kind()`.
    pub fn kind(&self) -> TriggerKind {
        self.metadata.kind()
    }

    /// The wrapped callable.
    pub fn inner(&self) -> &F {
        &self.func
    }

    /// Unwrap the callable, dropping the metadata.
    pub fn into_inner(self) -> F {
        self.func
    }
}

// Function items and closures are not `Debug`, so the callable is left out.
impl<F> fmt::Debug for DecoratedFunction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoratedFunction")
            .field("name", &self.name)
            .field("doc", &self.doc)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl<F> Deref for DecoratedFunction<F> {
    type Target = F;

    fn deref(&self) -> &F {
        &self.func
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigurationErrorKind;

    fn divide(a: i32, b: i32) -> Result<i32, String> {
        if b == 0 {
            Err("division by zero".to_string())
        } else {
            Ok(a / b)
        }
    }

    async fn shout(message: String) -> String {
        message.to_uppercase()
    }

    #[test]
    fn test_wrapping_is_transparent() {
        let decorated = HttpTrigger::new().decorate("divide", divide).unwrap();

        for (a, b) in [(10, 2), (7, 0), (-9, 3)] {
            assert_eq!((*decorated)(a, b), divide(a, b));
            assert_eq!(decorated.inner()(a, b), divide(a, b));
        }
    }

    #[test]
    fn test_async_wrapping_is_transparent() {
        let decorated = MessageQueueTrigger::new("shouts")
            .decorate("shout", shout)
            .unwrap();

        let wrapped = tokio_test::block_on((*decorated)("hi".to_string()));
        let direct = tokio_test::block_on(shout("hi".to_string()));
        assert_eq!(wrapped, direct);
    }

    #[test]
    fn test_closures_keep_their_captures() {
        let offset = 10;
        let decorated = HttpTrigger::bare("offset", move |x: i32| x + offset);
        assert_eq!(decorated(5), 15);
        assert_eq!(decorated.into_inner()(1), 11);
    }

    #[test]
    fn test_bare_and_configured_forms() {
        let bare = HttpTrigger::bare("divide", divide);
        let configured = HttpTrigger::new().decorate("divide", divide).unwrap();
        assert_eq!(bare.kind(), TriggerKind::Http);
        assert_eq!(bare.metadata(), configured.metadata());
        assert_eq!(bare.metadata().options(), &TriggerOptions::default());

        let tuned = HttpTrigger::new()
            .memory_mb(512)
            .timeout_secs(10)
            .decorate("divide", divide)
            .unwrap();
        assert_eq!(tuned.kind(), TriggerKind::Http);
        assert_eq!(tuned.metadata().options().memory_mb, Some(512));
        assert_eq!(tuned.metadata().options().timeout_secs, Some(10));
    }

    #[test]
    fn test_queue_with_topic_succeeds() {
        let decorated = MessageQueueTrigger::new("orders")
            .max_instances(3)
            .decorate("shout", shout)
            .unwrap();
        assert_eq!(decorated.kind(), TriggerKind::MessageQueue);
        assert_eq!(decorated.metadata().topic(), Some("orders"));
    }

    #[test]
    fn test_invalid_configuration_names_function() {
        let err = HttpTrigger::new()
            .min_instances(5)
            .max_instances(2)
            .decorate("divide", divide)
            .unwrap_err();
        assert_eq!(err.function.as_deref(), Some("divide"));
        assert_eq!(err.kind, ConfigurationErrorKind::MaxBelowMin { min: 5, max: 2 });

        let err = MessageQueueTrigger::new("").decorate("shout", shout).unwrap_err();
        assert!(matches!(err.kind, ConfigurationErrorKind::InvalidTopic { .. }));
    }

    #[test]
    fn test_debug_omits_the_callable() {
        let decorated = HttpTrigger::bare("divide", divide).with_doc("Integer division.");
        let debug = format!("{:?}", decorated);
        assert!(debug.starts_with("DecoratedFunction {"));
        assert!(debug.contains("name: \"divide\""));
        assert!(debug.contains("Integer division."));
        assert!(debug.ends_with(", .. }"));

        let err = HttpTrigger::new()
            .memory_mb(1)
            .decorate("divide", divide)
            .unwrap_err();
        assert_eq!(err.function.as_deref(), Some("divide"));
    }

    #[test]
    fn test_identity_information() {
        let decorated = HttpTrigger::bare("divide", divide).with_doc("Integer division.");
        assert_eq!(decorated.name(), "divide");
        assert_eq!(decorated.doc(), Some("Integer division."));
        assert_eq!(HttpTrigger::bare("divide", divide).with_doc("").doc(), None);
    }
}
