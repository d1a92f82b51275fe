//! Signal source registry
//!
//! Sources are registered explicitly at startup; there is no implicit
//! discovery. The registry owns the source handles for the lifetime of
//! the process.

use super::SignalSource;
use std::sync::Arc;

/// Registry of enabled signal sources
#[derive(Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn SignalSource>>,
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self { sources: vec![] }
    }

    /// Register a source
    pub fn register(&mut self, source: Arc<dyn SignalSource>) {
        tracing::info!(
            source = source.name(),
            instrument = source.instrument_id(),
            "Registered signal source"
        );
        self.sources.push(source);
    }

    /// All registered sources
    pub fn sources(&self) -> &[Arc<dyn SignalSource>] {
        &self.sources
    }

    /// Number of registered sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
