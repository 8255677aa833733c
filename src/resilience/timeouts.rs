//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap backend calls with a deadline
//! - Report an elapsed deadline as its own error
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - A backend that misses its deadline is treated like one that has nothing

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// The wrapped operation did not finish in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline of {0:?} elapsed")]
pub struct DeadlineElapsed(pub Duration);

/// Run `fut`, giving up after `deadline`.
pub async fn bounded<F>(deadline: Duration, fut: F) -> Result<F::Output, DeadlineElapsed>
where
    F: Future,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| DeadlineElapsed(deadline))
}
