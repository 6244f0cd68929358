//! Heating actuators (CHAx-01, CHAZ-01) driving radiator duty cycles.
//!
//! Output channels: 0 = status, 2 = energy, 3 = load error.

use std::sync::Arc;

use log::debug;

use crate::interface::{Interface, Value};
use crate::registry::Device;

/// CHAU 01/01-10E.
pub const CHAU_0101_10E: u8 = 0;
/// CHAU 01/01-16E.
pub const CHAU_0101_16E: u8 = 1;
/// CHAU 01/01-1ES.
pub const CHAU_0101_1ES: u8 = 2;
/// CHAP 01/x5-12E.
pub const CHAP_01X5_12E: u8 = 3;
/// CHAP 01/x5-1ES.
pub const CHAP_01X5_1ES: u8 = 4;

pub(crate) fn subtype_name(subtype: u8) -> &'static str {
	match subtype {
		CHAU_0101_10E => "CHAU 01/01-10E",
		CHAU_0101_16E => "CHAU 01/01-16E",
		CHAU_0101_1ES => "CHAU 01/01-1ES",
		CHAP_01X5_12E => "CHAP 01/x5-12E",
		CHAP_01X5_1ES => "CHAP 01/x5-1ES",
		_ => "unknown",
	}
}

pub(crate) fn extended_status(iface: &Interface, device: &Arc<Device>, data: &[u8]) -> bool {
	let duty_cycle = data[2];
	let power = super::power_from_le(&data[3..5]);
	let internal_temperature = i32::from(data[5]);

	iface.handler().power(device, power);
	iface
		.handler()
		.internal_temperature(device, internal_temperature);

	debug!(
		"device {}, type {} sent extended status message: duty cycle {}, temp {}C, power {:.1}W, rssi {}, battery {}",
		device.serial_number(),
		subtype_name(device.subtype()),
		duty_cycle,
		internal_temperature,
		power,
		device.rssi(),
		device.battery(),
	);

	super::with_status_datapoint(iface, device, |dp| {
		iface
			.handler()
			.status_value(dp, (u16::from(duty_cycle) * 100 / 255) as u8);
		let mode = if duty_cycle > 0 { "heat" } else { "off" };
		iface.handler().value(dp, Value::Text(mode));
	});
	true
}
