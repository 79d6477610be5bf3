//! Progress reporting for imports and exports
//!
//! Every adapter reports one [`ProgressEvent::Total`] followed by any number
//! of [`ProgressEvent::Item`]s. The ordering is enforced by the types: a
//! [`Progress`] handle can only be turned into a [`Tracker`] by announcing
//! the total, and only a tracker can report items.

/// A single progress notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Number of units (pages, chapters, batches or files) about to be processed
    Total(usize),

    /// A unit just completed (file name, chapter title or batch index)
    Item(String),
}

/// One-shot progress handle given to an importer or exporter
pub struct Progress<'a> {
    sink: &'a mut dyn FnMut(ProgressEvent),
}

impl<'a> Progress<'a> {
    /// Wrap a callback that receives every event
    pub fn new(sink: &'a mut dyn FnMut(ProgressEvent)) -> Self {
        Self { sink }
    }

    /// Announce the total unit count
    pub fn start(self, total: usize) -> Tracker<'a> {
        (self.sink)(ProgressEvent::Total(total));
        Tracker { sink: self.sink }
    }
}

/// Reports completed units after the total has been announced
pub struct Tracker<'a> {
    sink: &'a mut dyn FnMut(ProgressEvent),
}

impl Tracker<'_> {
    /// Report a completed unit
    pub fn item(&mut self, name: impl Into<String>) {
        (self.sink)(ProgressEvent::Item(name.into()));
    }
}

/// Run `f` with a progress handle that discards every event
pub fn silently<T>(f: impl FnOnce(Progress<'_>) -> T) -> T {
    let mut sink = |_: ProgressEvent| {};
    f(Progress::new(&mut sink))
}
