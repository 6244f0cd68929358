//! The multiplexed request/response event loop.
//!
//! One task owns the stream: a dedicated reader feeds it framed packets,
//! callers hand it commands over channels, and it matches every inbound
//! status to the rendezvous parked for it. TX commands are tagged with a
//! sequence nibble and matched out of order; CONFIG and EXTENDED commands
//! are single-in-flight and matched by arrival.

use log::{debug, info, trace, warn};
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, sleep_until, timeout};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::framing;
use crate::interface::{ChannelRequest, Interface, TxRequest};
use crate::mci;
use crate::rx;
use crate::waiters::WaitHandler;

/// Additional attempts for a TX command answered with a retryable error.
pub(crate) const COMMAND_RETRIES: usize = 2;
/// TX commands in flight at once. Well below the 16 available sequence
/// tags, leaving headroom for retries.
pub(crate) const TX_PARALLEL: usize = 4;
/// A TX command unanswered for this long is treated as silently lost.
const TX_TIMEOUT: Duration = Duration::from_secs(10);
/// CONFIG/EXTENDED commands are re-posted after this long without a reply.
const CHANNEL_RETRY: Duration = Duration::from_secs(5);

pub(crate) async fn run<S>(
	iface: &Interface,
	stream: S,
	token: CancellationToken,
) -> Result<()>
where
	S: AsyncRead + AsyncWrite + Send + 'static,
{
	let Some(mut channels) = iface.shared.take_channels() else {
		warn!("interface is already bound to a stream");
		return Err(Error::Terminal);
	};

	let (reader, mut writer) = tokio::io::split(stream);
	let (frame_sender, mut frames) = mpsc::channel(32);
	let reader_task = tokio::spawn(read_task(reader, frame_sender));

	iface
		.shared
		.running
		.store(true, core::sync::atomic::Ordering::Release);

	let mut tx_waiters = WaitHandler::new();
	let mut config_waiter: Option<mpsc::Sender<Vec<u8>>> = None;
	let mut extended_waiter: Option<mpsc::Sender<Vec<u8>>> = None;

	let result = loop {
		let tx_deadline = tx_waiters.oldest_deadline(TX_TIMEOUT);

		tokio::select! {
			Some(setup) = channels.setup.recv() => {
				*iface.shared.write_registry() = setup.registry;
				let _ = setup.done.send(());
			}

			Some(request) = channels.tx.recv() => {
				let (seq, outstanding) = tx_waiters.add(request.reply);
				let mut frame = request.command;
				frame.push(seq << 4);
				trace!("-> [{}] ({outstanding} in flight)", mci::hex(&frame));
				if let Err(err) = framing::write_frame(&mut writer, &frame).await {
					break Err(err);
				}
			}

			Some(request) = channels.config.recv() => {
				config_waiter = Some(request.reply);
				trace!("-> [{}]", mci::hex(&request.command));
				if let Err(err) = framing::write_frame(&mut writer, &request.command).await {
					break Err(err);
				}
			}

			Some(request) = channels.extended.recv() => {
				extended_waiter = Some(request.reply);
				trace!("-> [{}]", mci::hex(&request.command));
				if let Err(err) = framing::write_frame(&mut writer, &request.command).await {
					break Err(err);
				}
			}

			frame = frames.recv() => match frame {
				Some(Ok(frame)) => inbound(
					iface,
					&frame,
					&mut tx_waiters,
					&mut config_waiter,
					&mut extended_waiter,
				),
				Some(Err(err)) => break Err(err),
				None => break Err(Error::Terminal),
			},

			// A TX command the stick silently lost is aged out as NoAck,
			// which the send helper turns into a retry.
			_ = conditional_sleep(tx_deadline), if tx_deadline.is_some() => {
				debug!("oldest TX command expired without a response");
				tx_waiters.resume_oldest(vec![mci::STT_ERROR, mci::STS_NO_ACK]);
			}

			_ = token.cancelled() => {
				info!("exiting");
				break Ok(());
			}
		}
	};

	reader_task.abort();
	tx_waiters.close();
	if let Some(waiter) = config_waiter.take() {
		let _ = waiter.try_send(Vec::new());
	}
	if let Some(waiter) = extended_waiter.take() {
		let _ = waiter.try_send(Vec::new());
	}

	iface
		.shared
		.running
		.store(false, core::sync::atomic::Ordering::Release);
	// Dropping the receivers closes the command channels: queued requests
	// lose their rendezvous and callers still submitting see a closed
	// channel, so everyone surfaces Terminal promptly.
	drop(channels);

	result
}

async fn conditional_sleep(deadline: Option<tokio::time::Instant>) {
	match deadline {
		Some(deadline) => sleep_until(deadline).await,
		None => core::future::pending::<()>().await,
	}
}

/// Feeds complete frames to the loop. Framing violations drop the frame and
/// keep the stream alive; I/O errors are forwarded and end the task.
async fn read_task<R>(mut reader: ReadHalf<R>, frames: mpsc::Sender<Result<Vec<u8>>>)
where
	R: AsyncRead + Send + 'static,
{
	loop {
		match framing::read_frame(&mut reader).await {
			Ok(frame) => {
				if frames.send(Ok(frame)).await.is_err() {
					return;
				}
			}
			Err(err @ (Error::Framing | Error::ShortPacket)) => {
				warn!("dropping frame: {err}");
			}
			Err(err) => {
				let _ = frames.send(Err(err)).await;
				return;
			}
		}
	}
}

/// Demultiplexes one inbound frame (starting at the packet-type byte).
fn inbound(
	iface: &Interface,
	frame: &[u8],
	tx_waiters: &mut WaitHandler,
	config_waiter: &mut Option<mpsc::Sender<Vec<u8>>>,
	extended_waiter: &mut Option<mpsc::Sender<Vec<u8>>>,
) {
	match frame.first() {
		Some(&mci::PT_RX) => {
			if !rx::dispatch(iface, &frame[1..]) {
				debug!("message not handled [{}]", mci::hex(frame));
			}
		}

		Some(&mci::PT_STATUS) => status(frame, tx_waiters, config_waiter, extended_waiter),

		Some(&mci::PT_EXTENDED) => match frame.get(1) {
			Some(&mci::ET_DPL_CHANGED) => {
				info!("datapoint list changed, reloading from eprom");
				let iface = iface.clone();
				tokio::spawn(async move {
					match iface.request_dpl().await {
						Ok(()) => iface.handler().dpl_changed(),
						Err(err) => warn!("datapoint list reload failed: {err}"),
					}
				});
			}
			Some(&(mci::ET_REPLY | mci::ET_SEND_DPL)) => {
				deliver(extended_waiter, frame[1..].to_vec(), "extended");
			}
			Some(&mci::ET_STL_CHANGED) => debug!("status list changed, ignoring"),
			Some(&mci::ET_SEND_STL) => debug!("<- status list chunk [{}]", mci::hex(frame)),
			_ => debug!("<- [{}]", mci::hex(frame)),
		},

		_ => warn!("unknown message received [{}]", mci::hex(frame)),
	}
}

fn status(
	frame: &[u8],
	tx_waiters: &mut WaitHandler,
	config_waiter: &mut Option<mpsc::Sender<Vec<u8>>>,
	extended_waiter: &mut Option<mpsc::Sender<Vec<u8>>>,
) {
	match frame.get(1) {
		Some(&mci::STT_ERROR) => {
			let subcode = frame.get(2).copied().unwrap_or_default();
			// EXTENDED commands carry no sequence tag; an "unknown
			// message" complaint while one is parked belongs to it.
			if subcode == mci::STS_UNKNOWN && extended_waiter.is_some() {
				deliver(extended_waiter, frame[1..].to_vec(), "extended");
				return;
			}
			let seq_pos = if subcode == mci::STS_GENERAL { 4 } else { 3 };
			match frame.get(seq_pos) {
				Some(&seq) => {
					tx_waiters.resume(frame[1..].to_vec(), seq >> 4);
				}
				None => warn!("malformed error status [{}]", mci::hex(frame)),
			}
		}

		Some(&mci::STT_OK) => match frame.get(2) {
			Some(&mci::OK_MRF) => {
				if let (Some(&seq), Some(&detail)) = (frame.get(3), frame.get(4)) {
					if matches!(
						detail,
						mci::OKMRF_NOINFO | mci::OKMRF_ACK_DIRECT | mci::OKMRF_ACK_ROUTED
					) {
						tx_waiters.resume(frame[1..].to_vec(), seq >> 4);
					}
				}
			}
			Some(&mci::OK_CONFIG) => deliver(config_waiter, frame[2..].to_vec(), "config"),
			_ => debug!("<- [{}]", mci::hex(frame)),
		},

		Some(&mci::STT_TIMEACCOUNT) => match (frame.get(2), frame.get(3)) {
			(Some(&mci::TA_DATA), Some(&percent)) => {
				debug!("time account at {percent}%");
			}
			(Some(&mci::TA_ZERO), _) => warn!("time account exhausted, transmission blocked"),
			(Some(&mci::TA_LESS_THAN_10), _) => warn!("time account below 10%"),
			(Some(&mci::TA_MORE_THAN_15), _) => debug!("time account recovered above 15%"),
			_ => debug!("<- [{}]", mci::hex(frame)),
		},

		Some(
			&(mci::STT_SERIAL
			| mci::STT_RELEASE
			| mci::STT_SEND_OK_MRF
			| mci::STT_COUNTER_RX
			| mci::STT_COUNTER_TX),
		) => deliver(config_waiter, frame[2..].to_vec(), "config"),

		_ => debug!("<- [{}]", mci::hex(frame)),
	}
}

/// Wakes the parked CONFIG/EXTENDED caller, if any. Duplicate responses
/// from re-posted commands land here with no waiter and are dropped.
fn deliver(waiter: &mut Option<mpsc::Sender<Vec<u8>>>, data: Vec<u8>, what: &str) {
	match waiter.take() {
		Some(sender) => {
			let _ = sender.try_send(data);
		}
		None => debug!("dropping unsolicited {what} response"),
	}
}

impl Interface {
	/// Sends a TX command (starting at the datapoint byte) and waits for
	/// the stick's verdict, retrying retryable failures.
	pub(crate) async fn send_tx_command(&self, command: &[u8]) -> Result<Vec<u8>> {
		let _permit = self
			.shared
			.tx_semaphore
			.acquire()
			.await
			.map_err(|_| Error::Terminal)?;

		let mut attempts = 0;
		loop {
			let (reply_sender, reply) = oneshot::channel();
			let mut framed = Vec::with_capacity(command.len() + 2);
			framed.push(mci::PT_TX);
			framed.extend_from_slice(command);
			self.shared
				.tx_sender
				.send(TxRequest {
					command: framed,
					reply: reply_sender,
				})
				.await
				.map_err(|_| Error::Terminal)?;

			let response = reply.await.map_err(|_| Error::Terminal)?;
			if response.is_empty() {
				return Err(Error::Terminal);
			}

			match response[0] {
				mci::STT_ERROR => {
					let err = Error::from_status(&response[1..]);
					if err.is_retryable() && attempts < COMMAND_RETRIES {
						attempts += 1;
						debug!("retrying TX command (attempt {}): {err}", attempts + 1);
						continue;
					}
					return Err(err);
				}
				mci::STT_OK => return Ok(response[1..].to_vec()),
				_ => return Err(Error::Terminal),
			}
		}
	}

	/// Sends a CONFIG command and waits for the reply, re-posting when the
	/// stick stays silent. Query commands are idempotent from the stick's
	/// point of view.
	pub(crate) async fn send_config_command(&self, command: &[u8]) -> Result<Vec<u8>> {
		let _guard = self.shared.config_mutex.lock().await;

		let mut framed = Vec::with_capacity(command.len() + 1);
		framed.push(mci::PT_CONFIG);
		framed.extend_from_slice(command);

		self.send_on_channel(&self.shared.config_sender, framed, "CONFIG")
			.await
	}

	/// Sends an EXTENDED command and waits for the reply.
	///
	/// EXTENDED commands have no sequence tag; callers serialize whole
	/// exchanges through the extended mutex.
	pub(crate) async fn send_extended_command(&self, command: &[u8]) -> Result<Vec<u8>> {
		let mut framed = Vec::with_capacity(command.len() + 1);
		framed.push(mci::PT_EXTENDED);
		framed.extend_from_slice(command);

		self.send_on_channel(&self.shared.extended_sender, framed, "EXTENDED")
			.await
	}

	async fn send_on_channel(
		&self,
		channel: &mpsc::Sender<ChannelRequest>,
		command: Vec<u8>,
		what: &str,
	) -> Result<Vec<u8>> {
		let (reply_sender, mut reply) = mpsc::channel(1);
		loop {
			channel
				.send(ChannelRequest {
					command: command.clone(),
					reply: reply_sender.clone(),
				})
				.await
				.map_err(|_| Error::Terminal)?;

			match timeout(CHANNEL_RETRY, reply.recv()).await {
				Ok(Some(response)) if response.is_empty() => return Err(Error::Terminal),
				Ok(Some(response)) => return Ok(response),
				Ok(None) => return Err(Error::Terminal),
				Err(_) => warn!("no response to {what} command, reposting"),
			}
		}
	}
}
