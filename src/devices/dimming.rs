//! Dimming actuators, classic (CDAx-01) and new generation (CDAx-01 NG).
//!
//! New generation output channels: 0 = status, 1 = binary input A,
//! 2 = binary input B, 3 = energy, 4 = power, 5 = load error.

use std::sync::Arc;

use log::debug;

use crate::interface::Interface;
use crate::registry::Device;

/// CDAU 01/04.
pub const CDAU_0104: u8 = 0;
/// CDAU 01/04-I, two binary inputs.
pub const CDAU_0104_I: u8 = 1;
/// CDAU 01/04-E, energy function.
pub const CDAU_0104_E: u8 = 2;
/// CDAE 01/04.
pub const CDAE_0104: u8 = 4;
/// CDAE 01/04-E, energy function.
pub const CDAE_0104_E: u8 = 6;
/// CDAE 01/05-I, two binary inputs.
pub const CDAE_0105_I: u8 = 9;
/// CDAE 01/05-E, energy function.
pub const CDAE_0105_E: u8 = 10;

pub(crate) fn subtype_name(subtype: u8) -> &'static str {
	match subtype {
		CDAU_0104 => "CDAU 01/04",
		CDAU_0104_I => "CDAU 01/04-I",
		CDAU_0104_E => "CDAU 01/04-E",
		CDAE_0104 => "CDAE 01/04",
		CDAE_0104_E => "CDAE 01/04-E",
		CDAE_0105_I => "CDAE 01/05-I",
		CDAE_0105_E => "CDAE 01/05-E",
		_ => "unknown",
	}
}

/// Subtypes with an energy measurement circuit.
pub(crate) fn measures_energy(subtype: u8) -> bool {
	matches!(subtype, CDAU_0104_E | CDAE_0104_E | CDAE_0105_E)
}

pub(crate) fn extended_status(iface: &Interface, device: &Arc<Device>, data: &[u8]) -> bool {
	// The dim level comes over the wire scaled to the full byte range.
	let value = (u16::from(data[3]) * 100 / 255) as u8;

	let power = measures_energy(device.subtype()).then(|| super::power_from_le(&data[4..6]));
	if let Some(power) = power {
		iface.handler().power(device, power);
	}

	debug!(
		"device {}, type {} sent extended status message: value {}, power {:?}, rssi {}, battery {}",
		device.serial_number(),
		subtype_name(device.subtype()),
		value,
		power,
		device.rssi(),
		device.battery(),
	);

	super::with_status_datapoint(iface, device, |dp| {
		iface.handler().status_value(dp, value);
	});
	true
}
