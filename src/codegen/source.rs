//! Static discovery over parsed source text.
//!
//! Reads the same attributes the macros expand, without compiling or running
//! anything. Only top-level `fn` items are inspected; functions inside nested
//! modules are left to the module's own file.

use crate::discovery::{DiscoveredFunction, DiscoveryResult, SourceLocation};
use crate::error::{CodegenError, ConfigurationError, ConfigurationErrorKind};
use crate::function::{validate_name, FunctionMetadata, TriggerKind, TriggerOptions};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Attribute, Expr, ExprLit, Item, ItemFn, Lit, Meta, MetaNameValue, Token};
use tracing::debug;

/// Discover decorated functions in `file`, in declaration order.
///
/// `defaults` fill options a function leaves unset. `source_name` labels
/// locations in the result and in errors.
pub fn discover(
    file: &syn::File,
    defaults: &TriggerOptions,
    source_name: &str,
) -> Result<DiscoveryResult, CodegenError> {
    let mut functions = Vec::new();

    for item in &file.items {
        let Item::Fn(item_fn) = item else {
            continue;
        };
        if let Some(function) = inspect(item_fn, defaults, source_name)? {
            debug!(
                name = %function.name,
                trigger = %function.metadata.kind(),
                location = %function.location,
                "discovered function"
            );
            functions.push(function);
        }
    }

    Ok(DiscoveryResult::new(functions))
}

fn inspect(
    item_fn: &ItemFn,
    defaults: &TriggerOptions,
    source_name: &str,
) -> Result<Option<DiscoveredFunction>, CodegenError> {
    let ident = item_fn.sig.ident.to_string();
    let configuration_error =
        |kind: ConfigurationErrorKind| ConfigurationError::from(kind).for_function(ident.clone());

    let mut triggers = item_fn
        .attrs
        .iter()
        .filter_map(|attr| trigger_kind(attr).map(|kind| (kind, attr)));

    let Some((kind, attr)) = triggers.next() else {
        return Ok(None);
    };
    if let Some((second, _)) = triggers.next() {
        return Err(configuration_error(ConfigurationErrorKind::MultipleTriggers {
            first: kind,
            second,
        })
        .into());
    }
    if item_fn.sig.asyncness.is_none() {
        return Err(configuration_error(ConfigurationErrorKind::NotAsync).into());
    }

    let (name, options) = parse_arguments(attr, &ident)?;
    validate_name(&name)?;
    let metadata = FunctionMetadata::new(kind, options.with_defaults(defaults))
        .map_err(|e| e.for_function(name.clone()))?;

    let start = attr.span().start();
    Ok(Some(DiscoveredFunction {
        name,
        ident,
        doc: doc_comment(&item_fn.attrs),
        metadata,
        location: SourceLocation::new(source_name, start.line as u32, start.column as u32 + 1),
        handler: None,
    }))
}

/// Kind of a trigger attribute: `http`, `message_queue`, or either one
/// behind a `triggerkit::` prefix.
fn trigger_kind(attr: &Attribute) -> Option<TriggerKind> {
    let segments: Vec<String> = attr
        .path()
        .segments
        .iter()
        .map(|segment| segment.ident.to_string())
        .collect();

    let last = match segments.as_slice() {
        [last] => last,
        [krate, last] if krate == "triggerkit" => last,
        _ => return None,
    };

    match last.as_str() {
        "http" => Some(TriggerKind::Http),
        "message_queue" => Some(TriggerKind::MessageQueue),
        _ => None,
    }
}

/// Options whose value is an integer literal.
const COUNT_OPTIONS: [&str; 4] = ["min_instances", "max_instances", "memory_mb", "timeout_secs"];

/// Read `name = "..."` and the trigger options from the attribute, accepting
/// only the literal types the attribute macros accept.
fn parse_arguments(attr: &Attribute, ident: &str) -> Result<(String, TriggerOptions), ConfigurationError> {
    let invalid = |field: &str, reason: String| {
        ConfigurationError::from(ConfigurationErrorKind::InvalidValue {
            field: field.to_string(),
            reason,
        })
        .for_function(ident)
    };

    let arguments = match &attr.meta {
        Meta::Path(_) => Punctuated::new(),
        Meta::List(list) => list
            .parse_args_with(Punctuated::<MetaNameValue, Token![,]>::parse_terminated)
            .map_err(|e| invalid("arguments", e.to_string()))?,
        Meta::NameValue(_) => {
            return Err(invalid(
                "arguments",
                "expected `#[trigger]` or `#[trigger(option = value, ...)]`".to_string(),
            ));
        }
    };

    let mut name = ident.to_string();
    let mut options = TriggerOptions::new();

    for argument in arguments {
        let Some(key) = argument.path.get_ident().map(ToString::to_string) else {
            let path: Vec<String> = argument
                .path
                .segments
                .iter()
                .map(|segment| segment.ident.to_string())
                .collect();
            return Err(invalid(&path.join("::"), "expected a plain option name".to_string()));
        };

        match (key.as_str(), &argument.value) {
            ("name", Expr::Lit(ExprLit { lit: Lit::Str(lit), .. })) => name = lit.value(),
            ("topic", Expr::Lit(ExprLit { lit: Lit::Str(lit), .. })) => {
                options.topic = Some(lit.value());
            }
            ("name" | "topic", _) => {
                return Err(invalid(&key, "expected a string literal".to_string()));
            }
            (field, Expr::Lit(ExprLit { lit: Lit::Int(lit), .. })) if COUNT_OPTIONS.contains(&field) => {
                let value = lit
                    .base10_parse::<u32>()
                    .map_err(|e| invalid(field, e.to_string()))?;
                options
                    .set(field, &value.to_string())
                    .map_err(|e| e.for_function(ident))?;
            }
            (field, _) if COUNT_OPTIONS.contains(&field) => {
                return Err(invalid(field, "expected an integer literal".to_string()));
            }
            (other, _) => {
                return Err(ConfigurationError::from(ConfigurationErrorKind::UnknownOption(
                    other.to_string(),
                ))
                .for_function(ident));
            }
        }
    }

    Ok((name, options))
}

/// Documentation from `///` comments: one leading space stripped per line,
/// lines joined and the whole trimmed. `None` when there is none.
pub fn doc_comment(attrs: &[Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(MetaNameValue {
                value: Expr::Lit(ExprLit {
                    lit: Lit::Str(lit), ..
                }),
                ..
            }) => Some(lit.value()),
            _ => None,
        })
        .map(|line| line.strip_prefix(' ').map(str::to_string).unwrap_or(line))
        .collect();

    let doc = lines.join("\n").trim().to_string();
    (!doc.is_empty()).then_some(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> Result<DiscoveryResult, CodegenError> {
        let file = syn::parse_file(source).unwrap();
        discover(&file, &TriggerOptions::default(), "src/lib.rs")
    }

    #[test]
    fn test_decorated_functions_in_order() {
        let result = run(r#"
use triggerkit::http::{Request, Response};

/// Says hello.
#[triggerkit::http]
async fn hello(_req: Request) -> Response { Response::text("hi") }

fn helper() -> u32 { 1 }

#[message_queue(topic = "orders", max_instances = 3)]
async fn on_order(order: serde_json::Value) {}

async fn not_exposed() {}

#[triggerkit::http(name = "resize-image", memory_mb = 1024)]
async fn resize(_req: Request) -> Response { Response::ok() }
"#)
        .unwrap();

        assert_eq!(result.names(), vec!["hello", "on_order", "resize-image"]);

        let hello = result.get("hello").unwrap();
        assert_eq!(hello.doc.as_deref(), Some("Says hello."));
        assert_eq!(hello.metadata, FunctionMetadata::http_defaults());
        assert_eq!(hello.location.line, 5);
        assert!(hello.handler.is_none());

        let on_order = result.get("on_order").unwrap();
        assert_eq!(on_order.metadata.kind(), TriggerKind::MessageQueue);
        assert_eq!(on_order.metadata.topic(), Some("orders"));
        assert_eq!(on_order.metadata.options().max_instances, Some(3));
        assert_eq!(on_order.doc, None);

        let resize = result.get("resize-image").unwrap();
        assert_eq!(resize.ident, "resize");
        assert_eq!(resize.metadata.options().memory_mb, Some(1024));
    }

    #[test]
    fn test_nested_modules_and_other_attributes_ignored() {
        let result = run(r#"
#[inline]
async fn plain() {}

#[other::http]
async fn foreign() {}

mod inner {
    #[triggerkit::http]
    async fn hidden() {}
}
"#)
        .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_empty_source() {
        assert!(run("").unwrap().is_empty());
    }

    #[test]
    fn test_multiple_triggers_rejected() {
        let err = run(r#"
#[http]
#[message_queue(topic = "a")]
async fn both() {}
"#)
        .unwrap_err();

        match err {
            CodegenError::Configuration(err) => {
                assert_eq!(err.function.as_deref(), Some("both"));
                assert_eq!(
                    err.kind,
                    ConfigurationErrorKind::MultipleTriggers {
                        first: TriggerKind::Http,
                        second: TriggerKind::MessageQueue,
                    }
                );
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_queue_without_topic_rejected() {
        let err = run("#[message_queue(max_instances = 2)]\nasync fn consume() {}\n").unwrap_err();
        match err {
            CodegenError::Configuration(err) => {
                assert_eq!(err.kind, ConfigurationErrorKind::MissingTopic);
                assert_eq!(err.function.as_deref(), Some("consume"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_bad_arguments() {
        let err = run("#[http(replicas = 2)]\nasync fn f() {}\n").unwrap_err();
        assert!(matches!(
            err,
            CodegenError::Configuration(ConfigurationError {
                kind: ConfigurationErrorKind::UnknownOption(_),
                ..
            })
        ));

        let err = run("#[http(memory_mb = some_const)]\nasync fn f() {}\n").unwrap_err();
        assert!(matches!(
            err,
            CodegenError::Configuration(ConfigurationError {
                kind: ConfigurationErrorKind::InvalidValue { .. },
                ..
            })
        ));

        let err = run("#[http]\nfn sync_handler() {}\n").unwrap_err();
        assert!(err.to_string().contains("async"));

        let err = run("#[http(name = \"a/b\")]\nasync fn f() {}\n").unwrap_err();
        assert!(err.to_string().contains("a/b"));
    }

    fn invalid_value(source: &str) -> (Option<String>, String, String) {
        match run(source).unwrap_err() {
            CodegenError::Configuration(ConfigurationError {
                function,
                kind: ConfigurationErrorKind::InvalidValue { field, reason },
            }) => (function, field, reason),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_literal_types_match_the_attributes() {
        let (function, field, reason) =
            invalid_value("#[triggerkit::http(memory_mb = \"512\")]\nasync fn sized() {}\n");
        assert_eq!(function.as_deref(), Some("sized"));
        assert_eq!(field, "memory_mb");
        assert_eq!(reason, "expected an integer literal");

        let (function, field, reason) =
            invalid_value("#[triggerkit::message_queue(topic = 5)]\nasync fn consume() {}\n");
        assert_eq!(function.as_deref(), Some("consume"));
        assert_eq!(field, "topic");
        assert_eq!(reason, "expected a string literal");

        let (function, field, _) = invalid_value("#[triggerkit::http(name = 7)]\nasync fn renamed() {}\n");
        assert_eq!(function.as_deref(), Some("renamed"));
        assert_eq!(field, "name");

        let (function, field, _) =
            invalid_value("#[triggerkit::http(memory_mb = SOME_CONST)]\nasync fn sized() {}\n");
        assert_eq!(function.as_deref(), Some("sized"));
        assert_eq!(field, "memory_mb");

        let (function, _, _) = invalid_value("#[triggerkit::http(512)]\nasync fn sized() {}\n");
        assert_eq!(function.as_deref(), Some("sized"));

        let (_, field, _) = invalid_value("#[triggerkit::http(timeout_secs = 99999999999)]\nasync fn slow() {}\n");
        assert_eq!(field, "timeout_secs");
    }

    #[test]
    fn test_errors_name_the_function() {
        let err = run("#[triggerkit::http(memory_mb = \"512\")]\nasync fn sized() {}\n").unwrap_err();
        assert!(err.to_string().contains("sized"), "{}", err);
    }

    #[test]
    fn test_defaults_fill_unset_options() {
        let file = syn::parse_file("#[http(memory_mb = 128)]\nasync fn f() {}\n").unwrap();
        let defaults = TriggerOptions {
            memory_mb: Some(512),
            timeout_secs: Some(60),
            ..TriggerOptions::default()
        };
        let result = discover(&file, &defaults, "src/lib.rs").unwrap();
        let options = result.get("f").unwrap().metadata.options();
        assert_eq!(options.memory_mb, Some(128));
        assert_eq!(options.timeout_secs, Some(60));
    }

    #[test]
    fn test_discovery_is_repeatable() {
        let source = "#[http]\nasync fn a() {}\n#[http]\nasync fn b() {}\n";
        assert_eq!(run(source).unwrap(), run(source).unwrap());
    }
}
