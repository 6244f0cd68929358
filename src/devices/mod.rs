//! Per-family device support: extended-status decoding and the subtype
//! tables the decoders use for their log lines.
//!
//! Extended status reports share a common prefix (device type, subtype,
//! rssi at byte 7, battery at byte 8); everything in between is family
//! specific.

pub(crate) mod dimming;
pub(crate) mod heating;
pub(crate) mod hrv;
pub(crate) mod shutter;
pub(crate) mod switching;

use std::sync::Arc;

use log::warn;

use crate::interface::Interface;
use crate::registry::{BatteryState, Device, SignalStrength};

/// Offset of the signal strength byte in an extended status frame.
const EXT_RSSI: usize = 7;
/// Offset of the battery byte in an extended status frame.
const EXT_BATTERY: usize = 8;

/// Decodes an extended status report for `device`.
///
/// `data` starts at the echoed device-type byte. Returns false when the
/// frame could not be attributed.
pub(crate) fn extended_status(iface: &Interface, device: &Arc<Device>, data: &[u8]) -> bool {
	if data.len() <= EXT_BATTERY {
		warn!(
			"truncated extended status message from device {}",
			device.serial_number()
		);
		return false;
	}
	if data[0] != device.device_type() {
		warn!(
			"received non matching device type in extended status message {}, expected {}",
			data[0],
			device.device_type()
		);
		return false;
	}

	device.set_subtype(data[1]);
	device.set_rssi(data[EXT_RSSI]);
	iface.handler().rssi(device, SignalStrength(data[EXT_RSSI]));
	device.set_battery(data[EXT_BATTERY]);
	iface
		.handler()
		.battery(device, BatteryState(data[EXT_BATTERY]).percentage());

	if device.is_switching_actuator() {
		switching::extended_status(iface, device, data)
	} else if device.is_dimming_actuator() {
		dimming::extended_status(iface, device, data)
	} else if device.is_heating_actuator() {
		heating::extended_status(iface, device, data)
	} else if device.is_shutter() {
		shutter::extended_status(iface, device, data)
	} else {
		warn!(
			"unhandled extended status message from device {} ({})",
			device.serial_number(),
			device.name()
		);
		false
	}
}

/// Invokes `report` with the device's status datapoint (channel 0), the
/// addressee of every family-level status callback.
fn with_status_datapoint(
	iface: &Interface,
	device: &Device,
	report: impl FnOnce(&Arc<crate::registry::Datapoint>),
) {
	let registry = iface.registry();
	let status = device.datapoint_numbers().iter().find_map(|&number| {
		registry
			.datapoint(number)
			.filter(|dp| dp.channel() == 0)
	});
	match status {
		Some(dp) => report(dp),
		None => warn!(
			"device {} has no status datapoint",
			device.serial_number()
		),
	}
}

/// Power draw in watts, LE tenths of a watt on the wire.
fn power_from_le(data: &[u8]) -> f64 {
	f64::from(u16::from_le_bytes([data[0], data[1]])) / 10.0
}
