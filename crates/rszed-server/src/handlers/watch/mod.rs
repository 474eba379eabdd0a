//! Revision-consistent watch streams.
//!
//! A watch resolves its start revision (from a client token, or the current
//! head when none is given), opens a change feed strictly after it, and
//! forwards each committed batch restricted to the requested namespaces.
//! Batches with nothing left after filtering are not forwarded. Every
//! forwarded response carries an end token the client can resume from.
//!
//! # Termination
//!
//! | Cause                          | Outcome                   |
//! |--------------------------------|---------------------------|
//! | Receiver of the sink dropped   | `Ok(())`                  |
//! | Caller's token cancelled       | [`WatchError::Canceled`]  |
//! | Feed reports `WatchCanceled`   | [`WatchError::Canceled`]  |
//! | Feed reports `WatchDisconnected` | [`WatchError::ResourceExhausted`] |
//! | Any other feed error           | [`WatchError::Internal`]  |
//! | Feed closes without an error   | [`WatchError::Internal`]  |

mod handler;
mod types;

pub use handler::{WatchHandler, WatchSubscription};
pub use types::{
    classify_feed_error, WatchError, WatchErrorCode, WatchRequest, WatchResponse, WatchResult,
};

#[cfg(test)]
mod tests;
