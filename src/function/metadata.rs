//! Trigger metadata attached to a deployable function.
//!
//! A [`FunctionMetadata`] pairs a [`TriggerKind`] with the tunable
//! [`TriggerOptions`] of one function. It can only be obtained through
//! [`FunctionMetadata::new`], which enforces the per-trigger rules, and is
//! immutable afterwards.

use crate::error::{ConfigurationError, ConfigurationErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Validation ranges and defaults for trigger options.
///
/// These are platform-neutral bounds, not the limits of any particular
/// provider.
pub mod limits {
    pub const MIN_INSTANCES_MAX: u32 = 1000;
    pub const MAX_INSTANCES_MIN: u32 = 1;
    pub const MAX_INSTANCES_MAX: u32 = 1000;
    pub const MEMORY_MB_MIN: u32 = 64;
    pub const MEMORY_MB_MAX: u32 = 32768;
    pub const TIMEOUT_SECS_MIN: u32 = 1;
    pub const TIMEOUT_SECS_MAX: u32 = 900;
    pub const TOPIC_MAX_LEN: usize = 249;

    pub const DEFAULT_MIN_INSTANCES: u32 = 0;
    pub const DEFAULT_MAX_INSTANCES: u32 = 100;
    pub const DEFAULT_MEMORY_MB: u32 = 256;
    pub const DEFAULT_TIMEOUT_SECS: u32 = 30;
}

/// The category of external event that invokes a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Invoked by an HTTP request.
    Http,
    /// Invoked by a message published on a queue topic.
    MessageQueue,
}

impl TriggerKind {
    /// Every kind, in route order.
    pub const ALL: [TriggerKind; 2] = [TriggerKind::Http, TriggerKind::MessageQueue];

    /// Name used in manifests and as the attribute name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Http => "http",
            TriggerKind::MessageQueue => "message_queue",
        }
    }

    /// First path segment of the invocation route for this kind.
    pub fn route_segment(&self) -> &'static str {
        match self {
            TriggerKind::Http => "http",
            TriggerKind::MessageQueue => "queue",
        }
    }

    /// Look up a kind by its route segment.
    pub fn from_route_segment(segment: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.route_segment() == segment)
    }

    /// Invocation route of a function with this trigger.
    pub fn route(&self, name: &str) -> String {
        format!("/{}/{}", self.route_segment(), name)
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ConfigurationError::from(ConfigurationErrorKind::UnknownOption(s.to_string())))
    }
}

/// Tunable options of a trigger. Every field is optional; unset fields take
/// the defaults in [`limits`] when resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TriggerOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_instances: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_instances: Option<u32>,
    /// Memory allocation in megabytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u32>,
    /// Queue topic. Required for message-queue triggers, forbidden for HTTP.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl TriggerOptions {
    /// Options with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill unset scaling fields from `defaults`. The topic is never
    /// inherited: it identifies a single subscriber.
    pub fn with_defaults(mut self, defaults: &TriggerOptions) -> Self {
        self.min_instances = self.min_instances.or(defaults.min_instances);
        self.max_instances = self.max_instances.or(defaults.max_instances);
        self.memory_mb = self.memory_mb.or(defaults.memory_mb);
        self.timeout_secs = self.timeout_secs.or(defaults.timeout_secs);
        self
    }

    /// Set an option from its name and textual value.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), ConfigurationError> {
        match name {
            "min_instances" => self.min_instances = Some(parse_count(name, value)?),
            "max_instances" => self.max_instances = Some(parse_count(name, value)?),
            "memory_mb" => self.memory_mb = Some(parse_count(name, value)?),
            "timeout_secs" => self.timeout_secs = Some(parse_count(name, value)?),
            "topic" => self.topic = Some(value.to_string()),
            other => {
                return Err(ConfigurationErrorKind::UnknownOption(other.to_string()).into());
            }
        }
        Ok(())
    }
}

fn parse_count(field: &str, value: &str) -> Result<u32, ConfigurationError> {
    value.parse::<u32>().map_err(|e| {
        ConfigurationError::from(ConfigurationErrorKind::InvalidValue {
            field: field.to_string(),
            reason: format!("{} ({:?})", e, value),
        })
    })
}

/// Validated metadata of one deployable function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionMetadata {
    kind: TriggerKind,
    options: TriggerOptions,
}

impl FunctionMetadata {
    /// Validate `options` against the rules of `kind`.
    pub fn new(kind: TriggerKind, options: TriggerOptions) -> Result<Self, ConfigurationError> {
        validate(kind, &options)?;
        Ok(Self { kind, options })
    }

    /// Metadata of an HTTP trigger with every option left at its default.
    pub fn http_defaults() -> Self {
        Self {
            kind: TriggerKind::Http,
            options: TriggerOptions::default(),
        }
    }

    /// The trigger that invokes the function.
    pub fn kind(&self) -> TriggerKind {
        self.kind
    }

    /// Options as given, without defaults applied.
    pub fn options(&self) -> &TriggerOptions {
        &self.options
    }

    /// Subscribed topic; set only for message-queue triggers.
    pub fn topic(&self) -> Option<&str> {
        self.options.topic.as_deref()
    }

    /// The configuration with every default made explicit.
    pub fn resolved(&self) -> ResolvedConfig {
        use limits::*;

        let min_instances = self.options.min_instances.unwrap_or(DEFAULT_MIN_INSTANCES);
        ResolvedConfig {
            min_instances,
            max_instances: self
                .options
                .max_instances
                .unwrap_or(DEFAULT_MAX_INSTANCES.max(min_instances)),
            memory_mb: self.options.memory_mb.unwrap_or(DEFAULT_MEMORY_MB),
            timeout_secs: self.options.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            topic: self.options.topic.clone(),
        }
    }
}

/// Trigger options with defaults applied, as published in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    pub min_instances: u32,
    pub max_instances: u32,
    pub memory_mb: u32,
    pub timeout_secs: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

fn validate(kind: TriggerKind, options: &TriggerOptions) -> Result<(), ConfigurationError> {
    use limits::*;

    match (kind, options.topic.as_deref()) {
        (TriggerKind::Http, Some(_)) => {
            return Err(ConfigurationErrorKind::TopicNotAllowed.into());
        }
        (TriggerKind::MessageQueue, None) => {
            return Err(ConfigurationErrorKind::MissingTopic.into());
        }
        (TriggerKind::MessageQueue, Some(topic)) => validate_topic(topic)?,
        (TriggerKind::Http, None) => {}
    }

    check_range("min_instances", options.min_instances, 0, MIN_INSTANCES_MAX)?;
    check_range(
        "max_instances",
        options.max_instances,
        MAX_INSTANCES_MIN,
        MAX_INSTANCES_MAX,
    )?;
    check_range("memory_mb", options.memory_mb, MEMORY_MB_MIN, MEMORY_MB_MAX)?;
    check_range(
        "timeout_secs",
        options.timeout_secs,
        TIMEOUT_SECS_MIN,
        TIMEOUT_SECS_MAX,
    )?;

    if let (Some(min), Some(max)) = (options.min_instances, options.max_instances) {
        if max < min {
            return Err(ConfigurationErrorKind::MaxBelowMin { min, max }.into());
        }
    }

    Ok(())
}

fn check_range(
    field: &'static str,
    value: Option<u32>,
    min: u32,
    max: u32,
) -> Result<(), ConfigurationError> {
    match value {
        Some(value) if !(min..=max).contains(&value) => Err(ConfigurationErrorKind::OutOfRange {
            field,
            value,
            min,
            max,
        }
        .into()),
        _ => Ok(()),
    }
}

/// Check that `name` can be used as the last segment of a route.
pub fn validate_name(name: &str) -> Result<(), ConfigurationError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
    if valid {
        Ok(())
    } else {
        Err(ConfigurationError::from(ConfigurationErrorKind::InvalidName(name.to_string())).for_function(name))
    }
}

fn validate_topic(topic: &str) -> Result<(), ConfigurationError> {
    let reason = if topic.is_empty() {
        Some("must not be empty")
    } else if topic.len() > limits::TOPIC_MAX_LEN {
        Some("must be at most 249 characters")
    } else if !topic
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        Some("may only contain ASCII letters, digits, '-', '_' and '.'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ConfigurationErrorKind::InvalidTopic {
            topic: topic.to_string(),
            reason,
        }
        .into()),
        None => Ok(()),
    }
}
