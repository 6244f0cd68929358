//! Sequence-tagged rendezvous table for in-flight TX commands.
//!
//! The stick echoes the 4-bit sequence nibble of a TX command in its status
//! reports, so up to 16 commands can be outstanding. Each entry parks one
//! caller on a oneshot channel until the matching report arrives, the entry
//! ages out, or the engine shuts down.

use tokio::sync::oneshot;
use tokio::time::{Duration, Instant};

struct Waiter {
	consumer: oneshot::Sender<Vec<u8>>,
	seq: u8,
	started: Instant,
}

#[derive(Default)]
pub(crate) struct WaitHandler {
	waiters: Vec<Waiter>,
	next: u8,
}

impl WaitHandler {
	pub fn new() -> Self {
		Self::default()
	}

	/// Parks `consumer` under the next free sequence tag.
	///
	/// Tags rotate round-robin over 0..16, skipping live entries. Returns
	/// the tag and the number of outstanding commands. The caller bounds
	/// concurrency well below 16, so a free tag always exists.
	pub fn add(&mut self, consumer: oneshot::Sender<Vec<u8>>) -> (u8, usize) {
		loop {
			self.next = (self.next + 1) % 16;
			if !self.waiters.iter().any(|waiter| waiter.seq == self.next) {
				break;
			}
		}
		self.waiters.push(Waiter {
			consumer,
			seq: self.next,
			started: Instant::now(),
		});
		(self.next, self.waiters.len())
	}

	/// Delivers `data` to the waiter holding `seq`.
	///
	/// A tag with no live entry is a stale or duplicate report; it is
	/// dropped silently.
	pub fn resume(&mut self, data: Vec<u8>, seq: u8) -> bool {
		let Some(index) = self.waiters.iter().position(|waiter| waiter.seq == seq) else {
			return false;
		};
		let waiter = self.waiters.swap_remove(index);
		let _ = waiter.consumer.send(data);
		true
	}

	/// Delivers `data` to the longest-waiting entry.
	pub fn resume_oldest(&mut self, data: Vec<u8>) -> bool {
		let Some((index, _)) = self
			.waiters
			.iter()
			.enumerate()
			.min_by_key(|(_, waiter)| waiter.started)
		else {
			return false;
		};
		let waiter = self.waiters.swap_remove(index);
		let _ = waiter.consumer.send(data);
		true
	}

	/// The point in time at which the oldest entry has been outstanding for
	/// `window`, if any entry is live.
	pub fn oldest_deadline(&self, window: Duration) -> Option<Instant> {
		self.waiters
			.iter()
			.map(|waiter| waiter.started)
			.min()
			.map(|started| started + window)
	}

	/// Wakes every parked caller with an empty payload.
	pub fn close(&mut self) {
		for waiter in self.waiters.drain(..) {
			let _ = waiter.consumer.send(Vec::new());
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn tags_are_unique() {
		let mut handler = WaitHandler::new();
		let mut receivers = Vec::new();
		let mut tags = Vec::new();

		for n in 0..15 {
			let (tx, rx) = oneshot::channel();
			let (seq, live) = handler.add(tx);
			assert_eq!(live, n + 1);
			assert!(!tags.contains(&seq), "duplicate tag {seq}");
			tags.push(seq);
			receivers.push(rx);
		}

		// Responses are matched on the tag, not on submission order.
		for (tag, rx) in tags.iter().zip(receivers).rev() {
			assert!(handler.resume(vec![*tag], *tag));
			assert_eq!(rx.await.unwrap(), vec![*tag]);
		}
	}

	#[tokio::test]
	async fn freed_tags_rotate_back() {
		let mut handler = WaitHandler::new();
		for _ in 0..64 {
			let (tx, rx) = oneshot::channel();
			let (seq, _) = handler.add(tx);
			assert!(handler.resume(Vec::new(), seq));
			rx.await.unwrap();
		}
	}

	#[tokio::test]
	async fn stale_resume_is_dropped() {
		let mut handler = WaitHandler::new();
		let (tx, rx) = oneshot::channel();
		let (seq, _) = handler.add(tx);
		assert!(handler.resume(vec![0x01], seq));
		assert!(!handler.resume(vec![0x02], seq));
		assert_eq!(rx.await.unwrap(), vec![0x01]);
	}

	#[tokio::test(start_paused = true)]
	async fn oldest_first() {
		let mut handler = WaitHandler::new();

		let (tx, mut first) = oneshot::channel();
		handler.add(tx);
		tokio::time::advance(Duration::from_secs(1)).await;
		let (tx, mut second) = oneshot::channel();
		handler.add(tx);

		let deadline = handler.oldest_deadline(Duration::from_secs(10)).unwrap();
		assert_eq!(deadline - Instant::now(), Duration::from_secs(9));

		assert!(handler.resume_oldest(vec![0xaa]));
		assert_eq!(first.try_recv().unwrap(), vec![0xaa]);
		assert!(second.try_recv().is_err());
	}

	#[tokio::test]
	async fn close_wakes_everyone() {
		let mut handler = WaitHandler::new();
		let receivers: Vec<_> = (0..3)
			.map(|_| {
				let (tx, rx) = oneshot::channel();
				handler.add(tx);
				rx
			})
			.collect();

		handler.close();
		for rx in receivers {
			assert!(rx.await.unwrap().is_empty());
		}
		assert!(handler.oldest_deadline(Duration::from_secs(10)).is_none());
	}
}
