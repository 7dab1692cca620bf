//! Trigger attribute macros for triggerkit.
//!
//! Both attributes leave the annotated function exactly as written and
//! register it, with its trigger metadata, in the process-wide registry read
//! by `triggerkit::discovery::discover`.
//!
//! # Example
//!
//! ```ignore
//! use triggerkit::http::{Request, Response};
//!
//! #[triggerkit::http(min_instances = 1)]
//! async fn hello(req: Request) -> Response {
//!     Response::text("Hello, World!")
//! }
//!
//! #[triggerkit::message_queue(topic = "orders", max_instances = 3)]
//! async fn on_order(order: serde_json::Value) {}
//! ```

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, punctuated::Punctuated, Attribute, Expr, ExprLit, ItemFn, Lit, LitStr,
    Meta, MetaNameValue, Token,
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Http,
    MessageQueue,
}

impl Trigger {
    fn attribute(&self) -> &'static str {
        match self {
            Trigger::Http => "http",
            Trigger::MessageQueue => "message_queue",
        }
    }
}

// Mirrors `triggerkit::function::limits`, which this crate cannot depend on.
const MIN_INSTANCES: (u32, u32) = (0, 1000);
const MAX_INSTANCES: (u32, u32) = (1, 1000);
const MEMORY_MB: (u32, u32) = (64, 32768);
const TIMEOUT_SECS: (u32, u32) = (1, 900);
const TOPIC_MAX_LEN: usize = 249;

/// An integer option and the literal it was read from.
#[derive(Clone, Copy)]
struct Count {
    value: u32,
    span: Span,
}

/// Arguments of a trigger attribute.
#[derive(Default)]
struct TriggerArgs {
    name: Option<String>,
    topic: Option<LitStr>,
    min_instances: Option<Count>,
    max_instances: Option<Count>,
    memory_mb: Option<Count>,
    timeout_secs: Option<Count>,
}

impl TriggerArgs {
    fn parse_meta_list(metas: Punctuated<Meta, Token![,]>) -> syn::Result<Self> {
        let mut args = TriggerArgs::default();

        for meta in metas {
            let nv = match meta {
                Meta::NameValue(nv) => nv,
                other => {
                    return Err(syn::Error::new_spanned(other, "expected `option = value`"));
                }
            };
            let key = nv
                .path
                .get_ident()
                .ok_or_else(|| syn::Error::new_spanned(&nv.path, "expected identifier"))?
                .to_string();

            match key.as_str() {
                "name" => args.name = Some(string_value(&nv)?.value()),
                "topic" => args.topic = Some(string_value(&nv)?),
                "min_instances" => args.min_instances = Some(count_value(&nv)?),
                "max_instances" => args.max_instances = Some(count_value(&nv)?),
                "memory_mb" => args.memory_mb = Some(count_value(&nv)?),
                "timeout_secs" => args.timeout_secs = Some(count_value(&nv)?),
                _ => {
                    return Err(syn::Error::new_spanned(
                        nv.path,
                        format!("unknown option `{}`", key),
                    ));
                }
            }
        }

        Ok(args)
    }

    /// Reject values the runtime would refuse, pointing at the literal.
    fn check_limits(&self) -> syn::Result<()> {
        for (field, count, (min, max)) in [
            ("min_instances", self.min_instances, MIN_INSTANCES),
            ("max_instances", self.max_instances, MAX_INSTANCES),
            ("memory_mb", self.memory_mb, MEMORY_MB),
            ("timeout_secs", self.timeout_secs, TIMEOUT_SECS),
        ] {
            if let Some(count) = count {
                if !(min..=max).contains(&count.value) {
                    return Err(syn::Error::new(
                        count.span,
                        format!(
                            "`{}` = {} is outside the allowed range {}..={}",
                            field, count.value, min, max
                        ),
                    ));
                }
            }
        }

        if let (Some(min), Some(max)) = (self.min_instances, self.max_instances) {
            if max.value < min.value {
                return Err(syn::Error::new(
                    max.span,
                    format!(
                        "`max_instances` ({}) must not be less than `min_instances` ({})",
                        max.value, min.value
                    ),
                ));
            }
        }

        if let Some(topic) = &self.topic {
            let value = topic.value();
            let reason = if value.is_empty() {
                Some("must not be empty")
            } else if value.len() > TOPIC_MAX_LEN {
                Some("must be at most 249 characters")
            } else if !value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            {
                Some("may only contain ASCII letters, digits, '-', '_' and '.'")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(syn::Error::new_spanned(
                    topic,
                    format!("topic {:?} is invalid: {}", value, reason),
                ));
            }
        }

        Ok(())
    }
}

fn string_value(nv: &MetaNameValue) -> syn::Result<LitStr> {
    match &nv.value {
        Expr::Lit(ExprLit {
            lit: Lit::Str(lit), ..
        }) => Ok(lit.clone()),
        other => Err(syn::Error::new_spanned(other, "expected a string literal")),
    }
}

fn count_value(nv: &MetaNameValue) -> syn::Result<Count> {
    match &nv.value {
        Expr::Lit(ExprLit {
            lit: Lit::Int(lit), ..
        }) => Ok(Count {
            value: lit.base10_parse()?,
            span: lit.span(),
        }),
        other => Err(syn::Error::new_spanned(other, "expected an integer literal")),
    }
}

/// Deploy a function behind an HTTP trigger, routed at `/http/{name}`.
///
/// The function must be `async`, take a `triggerkit::http::Request` and
/// return anything implementing `triggerkit::runtime::IntoResponse`.
///
/// # Options
///
/// - `name`: deployment identifier (default: the function name)
/// - `min_instances`, `max_instances`, `memory_mb`, `timeout_secs`
///
/// Without arguments every option takes its default.
#[proc_macro_attribute]
pub fn http(args: TokenStream, input: TokenStream) -> TokenStream {
    expand(Trigger::Http, args, input)
}

/// Deploy a function as a subscriber of a message-queue topic, routed at
/// `/queue/{name}`.
///
/// The function must be `async` and take one argument deserializable from
/// the JSON message body.
///
/// # Options
///
/// - `topic` (required): topic to subscribe to
/// - `name`: deployment identifier (default: the function name)
/// - `min_instances`, `max_instances`, `memory_mb`, `timeout_secs`
#[proc_macro_attribute]
pub fn message_queue(args: TokenStream, input: TokenStream) -> TokenStream {
    expand(Trigger::MessageQueue, args, input)
}

fn expand(trigger: Trigger, args: TokenStream, input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(args with Punctuated::<Meta, Token![,]>::parse_terminated);
    let input_fn = parse_macro_input!(input as ItemFn);

    match generate_registration(trigger, args, input_fn) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn generate_registration(
    trigger: Trigger,
    args: Punctuated<Meta, Token![,]>,
    input_fn: ItemFn,
) -> syn::Result<proc_macro2::TokenStream> {
    let args = TriggerArgs::parse_meta_list(args)?;
    args.check_limits()?;

    if input_fn.sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(
            &input_fn.sig,
            format!("#[{}] functions must be async", trigger.attribute()),
        ));
    }

    let builder = match (trigger, &args.topic) {
        (Trigger::Http, None) => quote! { ::triggerkit::function::HttpTrigger::new() },
        (Trigger::Http, Some(topic)) => {
            return Err(syn::Error::new_spanned(
                topic,
                "http triggers do not accept a `topic`",
            ));
        }
        (Trigger::MessageQueue, Some(topic)) => {
            quote! { ::triggerkit::function::MessageQueueTrigger::new(#topic) }
        }
        (Trigger::MessageQueue, None) => {
            return Err(syn::Error::new(
                Span::call_site(),
                "missing required attribute: topic",
            ));
        }
    };

    let setters = [
        ("min_instances", args.min_instances),
        ("max_instances", args.max_instances),
        ("memory_mb", args.memory_mb),
        ("timeout_secs", args.timeout_secs),
    ]
    .into_iter()
    .filter_map(|(setter, value)| {
        let setter = format_ident!("{}", setter);
        value.map(|Count { value, .. }| quote! { .#setter(#value) })
    });

    let fn_name = &input_fn.sig.ident;
    let ident = fn_name.to_string();
    let name = args.name.unwrap_or_else(|| ident.clone());
    let doc = doc_comment(&input_fn.attrs);

    let metadata_fn = format_ident!("__triggerkit_metadata_{}", fn_name);
    let handler_fn = format_ident!("__triggerkit_handler_{}", fn_name);
    let handler = match trigger {
        Trigger::Http => quote! { ::triggerkit::runtime::http_handler(#fn_name) },
        Trigger::MessageQueue => quote! { ::triggerkit::runtime::queue_handler(#fn_name) },
    };

    Ok(quote! {
        #input_fn

        #[doc(hidden)]
        #[allow(non_snake_case)]
        fn #metadata_fn() -> ::core::result::Result<
            ::triggerkit::function::FunctionMetadata,
            ::triggerkit::error::ConfigurationError,
        > {
            #builder #(#setters)* .metadata()
        }

        #[doc(hidden)]
        #[allow(non_snake_case)]
        fn #handler_fn() -> ::std::boxed::Box<dyn ::triggerkit::runtime::Handler> {
            #handler
        }

        ::triggerkit::__private::inventory::submit! {
            ::triggerkit::discovery::Registration {
                name: #name,
                ident: #ident,
                doc: #doc,
                file: ::core::file!(),
                line: ::core::line!(),
                column: ::core::column!(),
                metadata: #metadata_fn,
                handler: #handler_fn,
            }
        }
    })
}

/// `///` documentation, one leading space stripped per line, trimmed.
fn doc_comment(attrs: &[Attribute]) -> String {
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

    lines.join("\n").trim().to_string()
}
