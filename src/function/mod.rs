//! Deployable functions: trigger metadata and the decoration layer.

pub mod decorate;
pub mod metadata;

pub use decorate::{DecoratedFunction, HttpTrigger, MessageQueueTrigger};
pub use metadata::{
    limits, validate_name, FunctionMetadata, ResolvedConfig, TriggerKind, TriggerOptions,
};
