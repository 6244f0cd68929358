//! "Latest wins" serialization for commands targeting one datapoint.
//!
//! A burst of commands against the same datapoint (a dimmer slider being
//! dragged, say) is collapsed so that only the most recent one reaches the
//! stick. Arrivals take a ticket before queueing on the mutex; whoever still
//! holds the newest ticket once it acquires the mutex is the survivor.

use core::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::{Mutex, MutexGuard};

#[derive(Default)]
pub(crate) struct CommandQueue {
	waiters: AtomicU32,
	mutex: Mutex<()>,
}

impl CommandQueue {
	pub fn new() -> Self {
		Self::default()
	}

	/// Queues for exclusive access to the datapoint.
	///
	/// The flag is true iff nobody joined the line while this caller was
	/// waiting; callers seeing false drop their command unsent.
	pub async fn lock(&self) -> (MutexGuard<'_, ()>, bool) {
		let ticket = self.waiters.fetch_add(1, Ordering::SeqCst) + 1;
		let guard = self.mutex.lock().await;
		let last = self.waiters.load(Ordering::SeqCst) == ticket;
		(guard, last)
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;

	#[tokio::test]
	async fn sole_caller_is_last() {
		let queue = CommandQueue::new();
		let (_guard, last) = queue.lock().await;
		assert!(last);
	}

	#[tokio::test]
	async fn intermediate_callers_bail() {
		let queue = Arc::new(CommandQueue::new());

		// Hold the mutex so both contenders line up behind it.
		let blocker = queue.mutex.lock().await;

		let first = tokio::spawn({
			let queue = queue.clone();
			async move { queue.lock().await.1 }
		});
		// Make sure the first contender has taken its ticket before the
		// second joins.
		while queue.waiters.load(Ordering::SeqCst) == 0 {
			tokio::task::yield_now().await;
		}
		let second = tokio::spawn({
			let queue = queue.clone();
			async move { queue.lock().await.1 }
		});
		while queue.waiters.load(Ordering::SeqCst) < 2 {
			tokio::task::yield_now().await;
		}

		drop(blocker);
		assert!(!first.await.unwrap());
		assert!(second.await.unwrap());
	}
}
