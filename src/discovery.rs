//! Discovery of decorated functions.
//!
//! Functions annotated with `#[triggerkit::http]` or
//! `#[triggerkit::message_queue]` are registered in a process-wide collection
//! using the `inventory` crate. [`discover`] reads that collection back in
//! declaration order. Static discovery over source text lives in
//! [`crate::codegen::source`]; both produce a [`DiscoveryResult`].

use crate::error::ConfigurationError;
use crate::function::{validate_name, DecoratedFunction, FunctionMetadata};
use crate::runtime::Handler;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Builds the metadata of a registered function.
pub type MetadataFactory = fn() -> Result<FunctionMetadata, ConfigurationError>;

/// Builds the invocation handler of a registered function.
pub type HandlerFactory = fn() -> Box<dyn Handler>;

/// A function registered by one of the trigger attributes.
///
/// Created by the macros; not meant to be written by hand.
pub struct Registration {
    /// Deployment identifier.
    pub name: &'static str,
    /// Rust identifier of the annotated function.
    pub ident: &'static str,
    /// Documentation of the annotated function, empty if undocumented.
    pub doc: &'static str,
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
    pub metadata: MetadataFactory,
    pub handler: HandlerFactory,
}

inventory::collect!(Registration);

impl Registration {
    /// Where the annotated function is declared.
    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.file, self.line, self.column)
    }

    fn discovered(&self) -> Result<DiscoveredFunction, ConfigurationError> {
        validate_name(self.name)?;
        let metadata = (self.metadata)().map_err(|e| e.for_function(self.name))?;
        Ok(DiscoveredFunction {
            name: self.name.to_string(),
            ident: self.ident.to_string(),
            doc: (!self.doc.is_empty()).then(|| self.doc.to_string()),
            metadata,
            location: self.location(),
            handler: Some(self.handler),
        })
    }
}

/// Every registration linked into the current binary, in no particular order.
pub fn registrations() -> impl Iterator<Item = &'static Registration> {
    inventory::iter::<Registration>.into_iter()
}

/// Find a registration by deployment identifier.
pub fn lookup(name: &str) -> Option<&'static Registration> {
    registrations().find(|r| r.name == name)
}

/// Read the registry in declaration order and validate every entry.
pub fn discover() -> Result<DiscoveryResult, ConfigurationError> {
    let mut found: Vec<&'static Registration> = registrations().collect();
    found.sort_by_key(|r| (r.file, r.line, r.column));

    let functions = found
        .into_iter()
        .map(Registration::discovered)
        .collect::<Result<Vec<_>, _>>()?;

    for function in &functions {
        debug!(
            name = %function.name,
            trigger = %function.metadata.kind(),
            location = %function.location,
            "discovered function"
        );
    }

    Ok(DiscoveryResult::new(functions))
}

/// Where a decorated function is declared.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// One decorated function found by discovery.
#[derive(Debug, Clone)]
pub struct DiscoveredFunction {
    /// Deployment identifier, unique within a manifest.
    pub name: String,
    /// Rust identifier used to call the function.
    pub ident: String,
    pub doc: Option<String>,
    pub metadata: FunctionMetadata,
    pub location: SourceLocation,
    /// Present when the function was found in the runtime registry.
    pub handler: Option<HandlerFactory>,
}

// Handlers are derived from the registration, so they take no part in equality.
impl PartialEq for DiscoveredFunction {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.ident == other.ident
            && self.doc == other.doc
            && self.metadata == other.metadata
            && self.location == other.location
    }
}

impl Eq for DiscoveredFunction {}

impl DiscoveredFunction {
    /// Describe a function decorated through [`crate::HttpTrigger`] or
    /// [`crate::MessageQueueTrigger`] so it can be listed in a manifest.
    ///
    /// The deployment identifier doubles as the Rust identifier. Route the
    /// callable itself with [`crate::runtime::ApplicationBuilder::decorated_http`]
    /// or [`crate::runtime::ApplicationBuilder::decorated_message_queue`].
    pub fn from_decorated<F>(decorated: &DecoratedFunction<F>, location: SourceLocation) -> Self {
        Self {
            name: decorated.name().to_string(),
            ident: decorated.name().to_string(),
            doc: decorated.doc().map(str::to_string),
            metadata: decorated.metadata().clone(),
            location,
            handler: None,
        }
    }
}

/// Decorated functions in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryResult {
    functions: Vec<DiscoveredFunction>,
}

impl DiscoveryResult {
    /// Wrap functions that are already in declaration order.
    pub fn new(functions: Vec<DiscoveredFunction>) -> Self {
        Self { functions }
    }

    /// Append a function after the ones already found.
    pub fn push(&mut self, function: DiscoveredFunction) {
        self.functions.push(function);
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DiscoveredFunction> {
        self.functions.iter()
    }

    /// Look up a function by deployment identifier.
    pub fn get(&self, name: &str) -> Option<&DiscoveredFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Deployment identifiers in order.
    pub fn names(&self) -> Vec<&str> {
        self.functions.iter().map(|f| f.name.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a DiscoveryResult {
    type Item = &'a DiscoveredFunction;
    type IntoIter = std::slice::Iter<'a, DiscoveredFunction>;

    fn into_iter(self) -> Self::IntoIter {
        self.functions.iter()
    }
}

impl IntoIterator for DiscoveryResult {
    type Item = DiscoveredFunction;
    type IntoIter = std::vec::IntoIter<DiscoveredFunction>;

    fn into_iter(self) -> Self::IntoIter {
        self.functions.into_iter()
    }
}
