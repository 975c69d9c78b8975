//! Cooperative cancellation for long-running iterations and scans (§5).
//!
//! Every prefix iteration and every gap-limit walk polls a [`Cancellation`]
//! between records or between derivation blocks. On shutdown the caller
//! flips the flag; in-flight work notices at the next checkpoint and
//! returns partial results rather than leaking or blocking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};

#[derive(Clone, Debug, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
	pub fn new() -> Self {
		Cancellation(Arc::new(AtomicBool::new(false)))
	}

	/// A token that never cancels, for callers (and tests) that don't need
	/// cooperative shutdown.
	pub fn none() -> Self {
		Cancellation::new()
	}

	pub fn cancel(&self) {
		self.0.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}

	/// Checkpoint to call between records of an iteration or between
	/// derivation blocks of a scan.
	pub fn check(&self) -> Result<()> {
		if self.is_cancelled() {
			Err(Error::Cancelled)
		} else {
			Ok(())
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cancels_cooperatively() {
		let token = Cancellation::new();
		assert!(token.check().is_ok());
		token.cancel();
		assert!(matches!(token.check(), Err(Error::Cancelled)));
	}

	#[test]
	fn clone_shares_state() {
		let token = Cancellation::new();
		let clone = token.clone();
		clone.cancel();
		assert!(token.is_cancelled());
	}
}
