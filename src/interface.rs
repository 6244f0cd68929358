//! The public face of the engine: construction, stream binding, device
//! commands and registry queries.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::info;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::devices::shutter::{ShutterCommand, ShutterStatus};
use crate::eprom::EpromReader;
use crate::error::{Error, Result};
use crate::event_loop::{self, TX_PARALLEL};
use crate::mci;
use crate::readers::{self, SliceSource};
use crate::registry::{Datapoint, Device, Registry, SignalStrength};
use crate::rx::Event;

/// A value whose representation depends on the reporting device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
	Number(f64),
	Text(&'static str),
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Number(value) => value.fmt(f),
			Value::Text(text) => f.write_str(text),
		}
	}
}

/// Callbacks the engine emits for decoded traffic.
///
/// All methods are invoked synchronously from the event loop: they must not
/// call back into the engine and must hand expensive work off to their own
/// tasks. The default implementations discard the callback.
#[allow(unused_variables)]
pub trait Handler: Send + Sync {
	/// A datapoint reported a new value (dim level, duty cycle), 0..=100.
	fn status_value(&self, datapoint: &Datapoint, value: u8) {}
	/// A datapoint reported its on/off state.
	fn status_bool(&self, datapoint: &Datapoint, on: bool) {}
	/// A shutter datapoint reported its movement state.
	fn status_shutter(&self, datapoint: &Datapoint, status: ShutterStatus) {}
	/// A datapoint sent an event without a value.
	fn event(&self, datapoint: &Datapoint, event: Event) {}
	/// A datapoint sent an event with a decoded value.
	fn value_event(&self, datapoint: &Datapoint, event: Event, value: f64) {}
	/// A datapoint sent a bare value.
	fn value(&self, datapoint: &Datapoint, value: Value) {}
	/// A room controller reported its wheel position.
	fn wheel(&self, datapoint: &Datapoint, value: f64) {}
	/// An HRV accessory reported its valve position.
	fn valve(&self, datapoint: &Datapoint, position: u8) {}
	/// A device reported its battery state, as a percentage.
	fn battery(&self, device: &Device, percentage: u8) {}
	/// A device reported its power draw in watts.
	fn power(&self, device: &Device, watts: f64) {}
	/// A device reported its internal temperature in centigrade.
	fn internal_temperature(&self, device: &Device, centigrade: i32) {}
	/// A device reported its signal strength.
	fn rssi(&self, device: &Device, rssi: SignalStrength) {}
	/// The datapoint list was reloaded from the stick.
	fn dpl_changed(&self) {}
}

pub(crate) struct TxRequest {
	pub command: Vec<u8>,
	pub reply: oneshot::Sender<Vec<u8>>,
}

pub(crate) struct ChannelRequest {
	pub command: Vec<u8>,
	pub reply: mpsc::Sender<Vec<u8>>,
}

pub(crate) struct Setup {
	pub registry: Registry,
	pub done: oneshot::Sender<()>,
}

/// Receiving ends of the command channels, owned by the running loop.
pub(crate) struct LoopChannels {
	pub tx: mpsc::Receiver<TxRequest>,
	pub config: mpsc::Receiver<ChannelRequest>,
	pub extended: mpsc::Receiver<ChannelRequest>,
	pub setup: mpsc::Receiver<Setup>,
}

pub(crate) struct Shared {
	registry: RwLock<Registry>,
	handler: Arc<dyn Handler>,
	pub verbose: bool,

	pub tx_semaphore: Semaphore,
	pub config_mutex: tokio::sync::Mutex<()>,
	pub extended_mutex: tokio::sync::Mutex<()>,

	pub tx_sender: mpsc::Sender<TxRequest>,
	pub config_sender: mpsc::Sender<ChannelRequest>,
	pub extended_sender: mpsc::Sender<ChannelRequest>,
	pub setup_sender: mpsc::Sender<Setup>,

	pub running: AtomicBool,
	channels: Mutex<Option<LoopChannels>>,
}

impl Shared {
	pub fn read_registry(&self) -> RwLockReadGuard<'_, Registry> {
		self.registry.read().unwrap_or_else(PoisonError::into_inner)
	}

	pub fn write_registry(&self) -> RwLockWriteGuard<'_, Registry> {
		self.registry
			.write()
			.unwrap_or_else(PoisonError::into_inner)
	}

	pub fn take_channels(&self) -> Option<LoopChannels> {
		self.channels
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.take()
	}
}

/// Handle to the stick protocol engine.
///
/// Cheap to clone; every clone talks to the same engine.
#[derive(Clone)]
pub struct Interface {
	pub(crate) shared: Arc<Shared>,
}

impl Interface {
	/// Creates an engine delivering decoded traffic to `handler`.
	///
	/// The engine is inert until [`run`](Self::run) binds it to a stream;
	/// a datapoint list can be loaded beforehand with
	/// [`read_file`](Self::read_file).
	pub fn new(handler: Arc<dyn Handler>, verbose: bool) -> Self {
		let (tx_sender, tx) = mpsc::channel(1);
		let (config_sender, config) = mpsc::channel(1);
		let (extended_sender, extended) = mpsc::channel(1);
		let (setup_sender, setup) = mpsc::channel(1);

		Interface {
			shared: Arc::new(Shared {
				registry: RwLock::new(Registry::new()),
				handler,
				verbose,
				tx_semaphore: Semaphore::new(TX_PARALLEL),
				config_mutex: tokio::sync::Mutex::new(()),
				extended_mutex: tokio::sync::Mutex::new(()),
				tx_sender,
				config_sender,
				extended_sender,
				setup_sender,
				running: AtomicBool::new(false),
				channels: Mutex::new(Some(LoopChannels {
					tx,
					config,
					extended,
					setup,
				})),
			}),
		}
	}

	pub(crate) fn handler(&self) -> &Arc<dyn Handler> {
		&self.shared.handler
	}

	/// Runs the event loop on `stream` until `token` is cancelled or the
	/// stream fails.
	///
	/// Returns the first fatal I/O error; a plain cancellation returns
	/// `Ok`. Either way the engine is terminal afterwards: pending and
	/// future commands fail, and reconnecting takes a fresh `Interface`.
	pub async fn run<S>(&self, token: CancellationToken, stream: S) -> Result<()>
	where
		S: AsyncRead + AsyncWrite + Send + 'static,
	{
		event_loop::run(self, stream, token).await
	}

	/// Loads the registry from a vendor-tool export: `.txt` (tab-separated)
	/// or `.dpl` (binary container).
	pub async fn read_file(&self, path: impl AsRef<Path>) -> Result<()> {
		let path = path.as_ref();
		let extension = path
			.extension()
			.map(|ext| ext.to_string_lossy().to_lowercase())
			.unwrap_or_default();

		let raw = match extension.as_str() {
			"txt" => readers::read_tsv(std::io::BufReader::new(std::fs::File::open(path)?))?,
			"dpl" => {
				let mut source = SliceSource::new(std::fs::read(path)?);
				readers::read_dpl(&mut source, self.shared.verbose).await?
			}
			_ => return Err(Error::UnknownFileType(extension)),
		};

		let registry = Registry::build(raw, self.shared.verbose);
		info!("loaded {} datapoints from {}", registry.len(), path.display());
		self.swap_registry(registry).await;
		Ok(())
	}

	/// Reads the datapoint list from the stick's EPROM and swaps the
	/// registry.
	///
	/// Decoding failures leave the existing registry untouched.
	pub async fn request_dpl(&self) -> Result<()> {
		let started = Instant::now();
		if self.shared.verbose {
			info!("reading datapoint list from eprom");
		}

		let _guard = self.shared.extended_mutex.lock().await;
		let mut source = EpromReader::new(self);
		let raw = readers::read_dpl(&mut source, self.shared.verbose).await?;
		let registry = Registry::build(raw, self.shared.verbose);

		info!(
			"read datapoint list from eprom in {:?}",
			started.elapsed()
		);
		self.swap_registry(registry).await;
		Ok(())
	}

	/// Replaces the registry, at a loop checkpoint when the loop is
	/// running, directly otherwise.
	pub(crate) async fn swap_registry(&self, mut registry: Registry) {
		if self.shared.running.load(Ordering::Acquire) {
			let (done, completed) = oneshot::channel();
			match self
				.shared
				.setup_sender
				.send(Setup { registry, done })
				.await
			{
				Ok(()) => {
					// The loop may exit before applying; the direct path
					// below is not reachable in that case since the setup
					// message owns the maps now.
					let _ = completed.await;
					return;
				}
				Err(mpsc::error::SendError(setup)) => registry = setup.registry,
			}
		}
		*self.shared.write_registry() = registry;
	}

	/// Read access to the current topology.
	pub fn registry(&self) -> RwLockReadGuard<'_, Registry> {
		self.shared.read_registry()
	}

	/// The datapoint with the given engine-wide number.
	pub fn datapoint(&self, number: u8) -> Option<Arc<Datapoint>> {
		self.registry().datapoint(number).cloned()
	}

	/// The device with the given serial number.
	pub fn device(&self, serial_number: u32) -> Option<Arc<Device>> {
		self.registry().device(serial_number).cloned()
	}

	/// Applies `f` to every datapoint, stopping at the first error.
	///
	/// Datapoint 0 is the stick's own status-report indicator and is
	/// skipped.
	pub fn for_each_datapoint<E>(
		&self,
		mut f: impl FnMut(&Arc<Datapoint>) -> Result<(), E>,
	) -> Result<(), E> {
		for dp in self.registry().datapoints() {
			if dp.number() == 0 {
				continue;
			}
			f(dp)?;
		}
		Ok(())
	}

	/// Applies `f` to every device, stopping at the first error.
	pub fn for_each_device<E>(
		&self,
		mut f: impl FnMut(&Arc<Device>) -> Result<(), E>,
	) -> Result<(), E> {
		for device in self.registry().devices() {
			f(device)?;
		}
		Ok(())
	}

	/// Switches an actuator on or off.
	pub async fn switch(&self, dp: &Datapoint, on: bool) -> Result<Option<Vec<u8>>> {
		let data = if on { mci::TED_ON } else { mci::TED_OFF };
		self.queued_tx_command(dp, &[dp.number(), mci::TE_SWITCH, data])
			.await
	}

	/// Dims to an absolute percentage, 0..=100.
	pub async fn dim(&self, dp: &Datapoint, value: u8) -> Result<Option<Vec<u8>>> {
		self.queued_tx_command(dp, &[dp.number(), mci::TE_DIM, mci::TED_PERCENT, value])
			.await
	}

	/// Dims to an absolute percentage with an explicit ramp speed.
	pub async fn dim_with_speed(
		&self,
		dp: &Datapoint,
		value: u8,
		speed: u8,
	) -> Result<Option<Vec<u8>>> {
		self.queued_tx_command(
			dp,
			&[dp.number(), mci::TE_DIRECT, mci::TED_PERCENT, value, speed],
		)
		.await
	}

	/// Drives a shutter actuator.
	pub async fn shutter(
		&self,
		dp: &Datapoint,
		command: ShutterCommand,
	) -> Result<Option<Vec<u8>>> {
		self.queued_tx_command(dp, &[dp.number(), mci::TE_JALO, command.event_data()])
			.await
	}

	/// Sets the target temperature of a heating datapoint.
	///
	/// HRV accessories poll for their setpoint, so for those the value is
	/// only recorded and travels with the answer to the next setpoint
	/// request. Dimplex-style e-radiators get it pushed immediately.
	pub async fn desired_temperature(
		&self,
		dp: &Datapoint,
		value: f32,
	) -> Result<Option<Vec<u8>>> {
		dp.set_desired_temperature(value);
		if dp.device().is_hrv() {
			return Ok(None);
		}
		let encoded = ((value * 10.0) as i16).to_be_bytes();
		self.queued_tx_command(
			dp,
			&[
				dp.number(),
				mci::TE_DIMPLEX_CONFIG,
				encoded[0],
				encoded[1],
			],
		)
		.await
	}

	/// Reports the measured room temperature to a heating datapoint.
	///
	/// Same delivery rules as [`desired_temperature`](Self::desired_temperature).
	pub async fn current_temperature(
		&self,
		dp: &Datapoint,
		value: f32,
	) -> Result<Option<Vec<u8>>> {
		dp.set_current_temperature(value);
		if dp.device().is_hrv() {
			return Ok(None);
		}
		let encoded = ((value * 10.0) as i16).to_be_bytes();
		self.queued_tx_command(
			dp,
			&[dp.number(), mci::TE_DIMPLEX_TEMP, encoded[0], encoded[1]],
		)
		.await
	}

	/// Sends a TX command through the datapoint's collapse queue.
	///
	/// `Ok(None)` means the command was superseded by a newer one before it
	/// reached the stick.
	async fn queued_tx_command(
		&self,
		dp: &Datapoint,
		command: &[u8],
	) -> Result<Option<Vec<u8>>> {
		let (_guard, last) = dp.queue().lock().await;
		if !last {
			return Ok(None);
		}
		self.send_tx_command(command).await.map(Some)
	}
}
