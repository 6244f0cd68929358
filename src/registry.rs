//! The device/datapoint topology loaded from a datapoint list.
//!
//! The registry is swapped wholesale: readers build a complete new set of
//! maps which replaces the old one at an event-loop checkpoint. Devices and
//! datapoints are never mutated structurally after the build; telemetry
//! attributes (rssi, battery, subtype) live in atomics so inbound frames can
//! update them in place.

use core::fmt;
use core::sync::atomic::{AtomicU8, AtomicU32, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;
use log::{debug, warn};

use crate::device_types::{ChannelType, DeviceType};
use crate::queue::CommandQueue;

/// Qualitative battery state, code range 0..=16.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryState(pub u8);

impl BatteryState {
	/// Rough charge percentage; 0 for mains-powered and unknown codes.
	pub fn percentage(self) -> u8 {
		match self.0 {
			1 => 20,
			2 => 40,
			3 => 60,
			4 => 80,
			5 => 100,
			_ => 0,
		}
	}
}

impl fmt::Display for BatteryState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let label = match self.0 {
			0 => "N/A",
			1 => "empty",
			2 => "very weak",
			3 => "weak",
			4 => "good",
			5 => "new",
			16 => "mains-powered",
			_ => "error",
		};
		f.write_str(label)
	}
}

/// Signal strength byte, valid range 0..=120, lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalStrength(pub u8);

impl fmt::Display for SignalStrength {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let label = match self.0 {
			0..=67 => "good",
			68..=75 => "normal",
			76..=90 => "weak",
			91..=120 => "very weak",
			_ => "error",
		};
		f.write_str(label)
	}
}

/// A physical node identified by its 32-bit serial number.
pub struct Device {
	serial_number: u32,
	device_type: u8,
	subtype: AtomicU8,
	rssi: AtomicU8,
	battery: AtomicU8,
	/// Datapoint numbers belonging to this device.
	datapoints: Vec<u8>,
}

impl Device {
	pub fn serial_number(&self) -> u32 {
		self.serial_number
	}

	/// The raw device-type code from the datapoint list.
	pub fn device_type(&self) -> u8 {
		self.device_type
	}

	/// The decoded device type, if this engine knows the code.
	pub fn kind(&self) -> Option<DeviceType> {
		DeviceType::try_from(self.device_type).ok()
	}

	pub fn name(&self) -> &'static str {
		self.kind().map_or("unknown", DeviceType::name)
	}

	/// Device variant, learnt from the first extended status report.
	pub fn subtype(&self) -> u8 {
		self.subtype.load(Ordering::Relaxed)
	}

	pub fn rssi(&self) -> SignalStrength {
		SignalStrength(self.rssi.load(Ordering::Relaxed))
	}

	pub fn battery(&self) -> BatteryState {
		BatteryState(self.battery.load(Ordering::Relaxed))
	}

	/// Numbers of the datapoints belonging to this device.
	pub fn datapoint_numbers(&self) -> &[u8] {
		&self.datapoints
	}

	pub fn is_switching_actuator(&self) -> bool {
		self.kind().is_some_and(DeviceType::is_switching_actuator)
	}

	pub fn is_dimming_actuator(&self) -> bool {
		self.kind().is_some_and(DeviceType::is_dimming_actuator)
	}

	pub fn is_shutter(&self) -> bool {
		self.kind().is_some_and(DeviceType::is_shutter)
	}

	pub fn is_heating_actuator(&self) -> bool {
		self.kind().is_some_and(DeviceType::is_heating_actuator)
	}

	pub fn is_hrv(&self) -> bool {
		self.kind().is_some_and(DeviceType::is_hrv)
	}

	pub(crate) fn set_subtype(&self, subtype: u8) {
		self.subtype.store(subtype, Ordering::Relaxed);
	}

	pub(crate) fn set_rssi(&self, rssi: u8) {
		self.rssi.store(rssi, Ordering::Relaxed);
	}

	pub(crate) fn set_battery(&self, battery: u8) {
		self.battery.store(battery, Ordering::Relaxed);
	}
}

impl fmt::Debug for Device {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Device")
			.field("serial_number", &self.serial_number)
			.field("device_type", &self.device_type)
			.field("name", &self.name())
			.finish_non_exhaustive()
	}
}

/// Sentinel meaning "no user-provided temperature".
const TEMPERATURE_UNSET: f32 = -1.0;

/// A logical channel on a device, keyed by its engine-wide number.
pub struct Datapoint {
	number: u8,
	name: String,
	channel: u8,
	mode: u8,
	sensor: bool,
	device: Arc<Device>,
	queue: CommandQueue,
	/// HRV/Dimplex target temperature, degrees times ten, as f32 bits.
	desired_temperature: AtomicU32,
	/// User-provided room temperature override, as f32 bits.
	current_temperature: AtomicU32,
}

impl Datapoint {
	pub fn number(&self) -> u8 {
		self.number
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn channel(&self) -> u8 {
		self.channel
	}

	/// Mode byte from field 5 of the datapoint list; distinct from the
	/// channel index.
	pub fn mode(&self) -> u8 {
		self.mode
	}

	pub fn is_sensor(&self) -> bool {
		self.sensor
	}

	pub fn device(&self) -> &Arc<Device> {
		&self.device
	}

	/// Resolves the channel type through the static device-type table.
	pub fn channel_type(&self) -> ChannelType {
		let Some(kind) = self.device.kind() else {
			warn!("unknown device type {}", self.device.device_type);
			return ChannelType::Unknown;
		};
		match kind.channels().get(usize::from(self.channel)) {
			Some(channel_type) => *channel_type,
			None => {
				warn!("unknown channel {} for device {}", self.channel, kind.name());
				ChannelType::Unknown
			}
		}
	}

	pub(crate) fn queue(&self) -> &CommandQueue {
		&self.queue
	}

	pub(crate) fn set_desired_temperature(&self, value: f32) {
		self.desired_temperature
			.store(value.to_bits(), Ordering::Relaxed);
	}

	pub(crate) fn desired_temperature(&self) -> f32 {
		f32::from_bits(self.desired_temperature.load(Ordering::Relaxed))
	}

	pub(crate) fn set_current_temperature(&self, value: f32) {
		self.current_temperature
			.store(value.to_bits(), Ordering::Relaxed);
	}

	/// The user-provided room temperature, or `None` when unset.
	pub(crate) fn current_temperature(&self) -> Option<f32> {
		let value = f32::from_bits(self.current_temperature.load(Ordering::Relaxed));
		(value != TEMPERATURE_UNSET).then_some(value)
	}
}

impl fmt::Debug for Datapoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Datapoint")
			.field("number", &self.number)
			.field("name", &self.name)
			.field("channel", &self.channel)
			.field("mode", &self.mode)
			.field("sensor", &self.sensor)
			.field("serial_number", &self.device.serial_number())
			.finish()
	}
}

/// One record of a datapoint list, before devices are deduplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawDatapoint {
	pub number: u8,
	pub name: String,
	pub serial_number: u32,
	pub device_type: u8,
	pub channel: u8,
	pub mode: u8,
	pub sensor: bool,
}

/// The complete topology; replaced atomically, never patched.
#[derive(Default)]
pub struct Registry {
	devices: HashMap<u32, Arc<Device>>,
	datapoints: HashMap<u8, Arc<Datapoint>>,
}

impl Registry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds devices and datapoints from raw records.
	///
	/// Devices are keyed by serial number; the device type of the first
	/// record wins. Later records for an already-known datapoint number
	/// replace the earlier ones.
	pub(crate) fn build(raw: Vec<RawDatapoint>, verbose: bool) -> Self {
		let mut device_datapoints: HashMap<u32, Vec<u8>> = HashMap::new();
		for record in &raw {
			device_datapoints
				.entry(record.serial_number)
				.or_default()
				.push(record.number);
		}

		let mut devices: HashMap<u32, Arc<Device>> = HashMap::new();
		let mut datapoints = HashMap::new();
		for record in raw {
			let device = devices
				.entry(record.serial_number)
				.or_insert_with(|| {
					Arc::new(Device {
						serial_number: record.serial_number,
						device_type: record.device_type,
						subtype: AtomicU8::new(0),
						rssi: AtomicU8::new(0),
						battery: AtomicU8::new(0),
						datapoints: device_datapoints
							.remove(&record.serial_number)
							.unwrap_or_default(),
					})
				})
				.clone();

			if verbose {
				debug!(
					"datapoint {}: device {}, serial {}, channel {}, mode {}, '{}'",
					record.number,
					device.name(),
					record.serial_number,
					record.channel,
					record.mode,
					record.name
				);
			}

			datapoints.insert(
				record.number,
				Arc::new(Datapoint {
					number: record.number,
					name: record.name,
					channel: record.channel,
					mode: record.mode,
					sensor: record.sensor,
					device,
					queue: CommandQueue::new(),
					desired_temperature: AtomicU32::new(0f32.to_bits()),
					current_temperature: AtomicU32::new(TEMPERATURE_UNSET.to_bits()),
				}),
			);
		}

		Registry {
			devices,
			datapoints,
		}
	}

	pub fn datapoint(&self, number: u8) -> Option<&Arc<Datapoint>> {
		self.datapoints.get(&number)
	}

	pub fn device(&self, serial_number: u32) -> Option<&Arc<Device>> {
		self.devices.get(&serial_number)
	}

	pub fn datapoints(&self) -> impl Iterator<Item = &Arc<Datapoint>> {
		self.datapoints.values()
	}

	pub fn devices(&self) -> impl Iterator<Item = &Arc<Device>> {
		self.devices.values()
	}

	pub fn len(&self) -> usize {
		self.datapoints.len()
	}

	pub fn is_empty(&self) -> bool {
		self.datapoints.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	pub(crate) fn raw(number: u8, serial: u32, device_type: u8, channel: u8) -> RawDatapoint {
		RawDatapoint {
			number,
			name: format!("dp {number}"),
			serial_number: serial,
			device_type,
			channel,
			mode: 0,
			sensor: false,
		}
	}

	#[test]
	fn devices_are_shared() {
		let registry = Registry::build(
			vec![raw(1, 4242, 74, 0), raw(2, 4242, 74, 1), raw(3, 7, 1, 0)],
			false,
		);

		assert_eq!(registry.len(), 3);
		let first = registry.datapoint(1).unwrap();
		let second = registry.datapoint(2).unwrap();
		assert!(Arc::ptr_eq(first.device(), second.device()));
		assert_eq!(first.device().datapoint_numbers(), &[1, 2]);
		assert_eq!(registry.device(4242).unwrap().serial_number(), 4242);
	}

	#[test]
	fn channel_type_resolution() {
		let registry = Registry::build(
			vec![raw(1, 1, 74, 0), raw(2, 1, 74, 200), raw(3, 2, 0xee, 0)],
			false,
		);

		use crate::device_types::ChannelType;
		assert_eq!(
			registry.datapoint(1).unwrap().channel_type(),
			ChannelType::StatusBool
		);
		// Channel out of range and unknown device type both degrade to
		// Unknown instead of failing.
		assert_eq!(
			registry.datapoint(2).unwrap().channel_type(),
			ChannelType::Unknown
		);
		assert_eq!(
			registry.datapoint(3).unwrap().channel_type(),
			ChannelType::Unknown
		);
	}
}
