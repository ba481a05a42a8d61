//! Source / Sink Capabilities
//!
//! Minimal producer/consumer registration for wiring pipeline stages together.
//!
//! - [`Sink`]: anything that can be handed an item
//! - [`Source`]: anything that can register sinks for its future output
//!
//! Statically typed callers just use the traits. Stages held as
//! `dyn Component<T>` expose their roles through capability queries, and
//! [`add_sink`] treats a missing `Source` role as a programming error.

use std::sync::Arc;

/// Delivery target for a [`Source`]
pub trait Sink<T>: Send + Sync {
    /// Accept one item
    fn enqueue(&self, item: T);
}

/// Producer that can be wired to sinks
///
/// Fan-out policy (single sink, replace, append) belongs to the implementor.
pub trait Source<T> {
    /// Register `sink` as a destination for this source's output
    fn add_sink(&mut self, sink: Arc<dyn Sink<T>>);
}

/// A type-erased pipeline stage that may play either role
pub trait Component<T> {
    /// Stage name, for diagnostics
    fn name(&self) -> &str;

    /// The stage's `Source` role, if it has one
    fn as_source(&mut self) -> Option<&mut dyn Source<T>> {
        None
    }
}

/// Register `sink` on a type-erased stage
///
/// # Panics
///
/// Panics if `component` does not implement [`Source`]. Wiring a sink onto a
/// stage that cannot produce is a bug in the caller, not a runtime condition.
pub fn add_sink<T>(component: &mut dyn Component<T>, sink: Arc<dyn Sink<T>>) {
    let name = component.name().to_string();
    tracing::debug!(component = %name, "add_sink");

    match component.as_source() {
        Some(source) => source.add_sink(sink),
        None => panic!("add_sink: component '{name}' does not implement Source"),
    }
}

/// Source that delivers every published item to all registered sinks
pub struct FanOutSource<T> {
    name: String,
    sinks: Vec<Arc<dyn Sink<T>>>,
}

impl<T: Clone> FanOutSource<T> {
    /// Create a source with no sinks
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sinks: Vec::new(),
        }
    }

    /// Number of registered sinks
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Deliver `item` to every sink in registration order
    ///
    /// Returns how many sinks received it.
    pub fn publish(&self, item: &T) -> usize {
        for sink in &self.sinks {
            sink.enqueue(item.clone());
        }
        tracing::trace!(source = %self.name, sinks = self.sinks.len(), "Published item");
        self.sinks.len()
    }
}

impl<T: Clone> Source<T> for FanOutSource<T> {
    fn add_sink(&mut self, sink: Arc<dyn Sink<T>>) {
        self.sinks.push(sink);
    }
}

impl<T: Clone> Component<T> for FanOutSource<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_source(&mut self) -> Option<&mut dyn Source<T>> {
        Some(self)
    }
}
