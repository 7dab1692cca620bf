//! Errors raised while decorating functions and synthesizing artifacts.
//!
//! All of them are fatal for a codegen run: they are reported once, name the
//! offending function, and no output is written.

use crate::discovery::SourceLocation;
use crate::function::TriggerKind;
use thiserror::Error;

/// The rule a function's trigger configuration violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationErrorKind {
    #[error("message_queue triggers require a `topic`")]
    MissingTopic,

    #[error("http triggers do not accept a `topic`")]
    TopicNotAllowed,

    #[error("topic {topic:?} is invalid: {reason}")]
    InvalidTopic { topic: String, reason: &'static str },

    #[error("`{field}` = {value} is outside the allowed range {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    #[error("`max_instances` ({max}) must not be less than `min_instances` ({min})")]
    MaxBelowMin { min: u32, max: u32 },

    #[error("function carries more than one trigger ({first} and {second})")]
    MultipleTriggers {
        first: TriggerKind,
        second: TriggerKind,
    },

    #[error("trigger functions must be `async`")]
    NotAsync,

    #[error("function name {0:?} may only contain ASCII letters, digits, '-' and '_'")]
    InvalidName(String),

    #[error("unknown option `{0}`")]
    UnknownOption(String),

    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Invalid or missing trigger metadata.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid configuration for {}: {kind}", describe_function(.function))]
pub struct ConfigurationError {
    /// Identifier of the function being decorated, once known.
    pub function: Option<String>,
    /// The violated rule.
    pub kind: ConfigurationErrorKind,
}

impl ConfigurationError {
    /// An error not yet attributed to a function.
    pub fn new(kind: ConfigurationErrorKind) -> Self {
        Self {
            function: None,
            kind,
        }
    }

    /// Attach the function identifier unless one is already recorded.
    pub fn for_function(mut self, name: impl Into<String>) -> Self {
        if self.function.is_none() {
            self.function = Some(name.into());
        }
        self
    }

    /// The violated rule.
    pub fn kind(&self) -> &ConfigurationErrorKind {
        &self.kind
    }
}

impl From<ConfigurationErrorKind> for ConfigurationError {
    fn from(kind: ConfigurationErrorKind) -> Self {
        Self::new(kind)
    }
}

fn describe_function(function: &Option<String>) -> String {
    match function {
        Some(name) => format!("function `{}`", name),
        None => "trigger".to_string(),
    }
}

/// Conflicts among discovered functions found while synthesizing artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("duplicate function identifier `{name}` (declared at {first} and {second})")]
    DuplicateIdentifier {
        name: String,
        first: SourceLocation,
        second: SourceLocation,
    },

    #[error("failed to render manifest as {format}: {message}")]
    Render {
        format: &'static str,
        message: String,
    },
}

/// Failure of a codegen run.
#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("failed to parse {location}: {message}")]
    Parse {
        location: SourceLocation,
        message: String,
    },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("invalid codegen config: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodegenError {
    /// Wrap a parse error, pointing at the start of its span in `file`.
    pub fn parse(file: &str, err: syn::Error) -> Self {
        let start = err.span().start();
        Self::Parse {
            location: SourceLocation::new(file, start.line as u32, start.column as u32 + 1),
            message: err.to_string(),
        }
    }
}
