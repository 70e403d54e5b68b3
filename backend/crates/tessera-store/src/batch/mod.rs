//! Resilient batch execution.
//!
//! The backing service applies batch requests best effort and hands back what
//! it did not apply. [`BatchWrite`] and [`BatchGet`] resubmit that remainder
//! with backoff until it drains, the retry budget runs out, or the caller
//! cancels. Exhausting the budget is not an error: the outcome carries the
//! residual set and the caller decides whether it is fatal.

mod engine;
mod operations;
mod policy;

pub use engine::BatchRetryEngine;
pub use operations::{BatchGet, BatchOperation, BatchReadOutcome, BatchWrite, BatchWriteOutcome};
pub use policy::RetryPolicy;
pub use tokio_util::sync::CancellationToken;
