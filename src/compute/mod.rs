//! Cooperative suspension primitives for the import orchestration layer.
//!
//! Conversion kernels run to completion on worker threads (see [`crate::jobs`]);
//! the orchestration layer checks for cancellation only at coarse-grained
//! phase boundaries. This module provides:
//!
//! - [`CancellationToken`] — caller-supplied cancellation flag
//! - [`Cancelled`] — error returned when a phase observes cancellation
//! - [`Checkpoint`] — yield-and-check-cancellation future for async callers
//! - [`yield_now`] — cooperative yielding future
//!
//! Synchronous entry points check the token directly between phases; the
//! async entry point awaits a [`Checkpoint`] instead so a host frame loop is
//! not stalled while a large asset converts.

mod cancellation;
mod yield_now;

pub use cancellation::{CancellationToken, Cancelled, Checkpoint};
pub use yield_now::{YieldNow, yield_now};
