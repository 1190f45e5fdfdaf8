//! Progress reporting
//!
//! Long operations report `(done, total, label)` triples. The label names
//! the step ("Reading NOR", "Writing FIRM (1)", ...) so a frontend can start
//! a new bar whenever it changes.

/// Callback for progress reporting during flash operations
pub trait Progress {
    /// Called with the current position of the operation named by `label`
    fn report(&mut self, done: u32, total: u32, label: &str);
}

/// A no-op progress reporter
pub struct NoProgress;

impl Progress for NoProgress {
    fn report(&mut self, _done: u32, _total: u32, _label: &str) {}
}
