//! Reactive primitives — debouncing and correlation waiting.
//!
//! Reusable building blocks with no business logic of their own:
//! - [`Debouncer`] collapses a burst of trigger calls into one delayed action.
//! - [`DebouncerManager`] keeps one debouncer per key and evicts idle entries,
//!   shutting them down so no background timer leaks.
//! - [`CorrelationWaiter`] lets a synchronous caller block on an asynchronous
//!   event keyed by a correlation identifier.

pub mod correlation;
pub mod debouncer;
pub mod manager;

pub use correlation::{CorrelationError, CorrelationWaiter};
pub use debouncer::{Debouncer, PassthroughRunner, TaskRunner};
pub use manager::DebouncerManager;
