//! Switching actuators, classic (CSAx-01) and new generation (CSAU-01/01).
//!
//! New generation output channels: 0 = status, 1 = binary input,
//! 2 = energy, 3 = power, 4 = load error.

use std::sync::Arc;

use log::{debug, warn};
use num_enum::TryFromPrimitive;

use crate::interface::Interface;
use crate::registry::Device;

/// CSAU 01/01-10.
pub const CSAU_0101_10: u8 = 0;
/// CSAU 01/01-10I, binary input.
pub const CSAU_0101_10I: u8 = 1;
/// CSAU 01/01-10IE, binary input and energy function.
pub const CSAU_0101_10IE: u8 = 3;
/// CSAU 01/01-16.
pub const CSAU_0101_16: u8 = 4;
/// CSAU 01/01-16I, binary input.
pub const CSAU_0101_16I: u8 = 5;
/// CSAU 01/01-16IE, binary input and energy function.
pub const CSAU_0101_16IE: u8 = 7;
/// CSAP 01/xx-12E, energy function.
pub const CSAP_01XX_12E: u8 = 14;

pub(crate) fn subtype_name(subtype: u8) -> &'static str {
	match subtype {
		CSAU_0101_10 => "CSAU 01/01-10",
		CSAU_0101_10I => "CSAU 01/01-10I",
		CSAU_0101_10IE => "CSAU 01/01-10IE",
		CSAU_0101_16 => "CSAU 01/01-16",
		CSAU_0101_16I => "CSAU 01/01-16I",
		CSAU_0101_16IE => "CSAU 01/01-16IE",
		CSAP_01XX_12E => "CSAP 01/xx-12E",
		_ => "unknown",
	}
}

/// Subtypes with an energy measurement circuit.
pub(crate) fn measures_energy(subtype: u8) -> bool {
	matches!(subtype, CSAU_0101_10IE | CSAU_0101_16IE | CSAP_01XX_12E)
}

/// Output state nibble of an extended status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub(crate) enum OutputState {
	Off = 1,
	On = 2,
	Blinking = 3,
	OnLocked = 4,
	OffLocked = 5,
	OffOvertemp = 7,
	OffOverload = 8,
}

pub(crate) fn extended_status(iface: &Interface, device: &Arc<Device>, data: &[u8]) -> bool {
	let internal_temperature = i32::from(data[3]);
	iface
		.handler()
		.internal_temperature(device, internal_temperature);

	let power = measures_energy(device.subtype()).then(|| super::power_from_le(&data[4..6]));
	if let Some(power) = power {
		iface.handler().power(device, power);
	}

	debug!(
		"device {}, type {} sent extended status message: state {:#04x}, temp {}C, power {:?}, rssi {}, battery {}",
		device.serial_number(),
		subtype_name(device.subtype()),
		data[2],
		internal_temperature,
		power,
		device.rssi(),
		device.battery(),
	);

	let on = match OutputState::try_from(data[2] >> 4) {
		Ok(OutputState::Off | OutputState::OffLocked) => false,
		Ok(OutputState::OffOvertemp) => {
			warn!(
				"device {} switched off, overtemperature",
				device.serial_number()
			);
			false
		}
		Ok(OutputState::OffOverload) => {
			warn!("device {} switched off, overload", device.serial_number());
			false
		}
		Ok(OutputState::On | OutputState::Blinking | OutputState::OnLocked) => true,
		Err(_) => {
			warn!(
				"unknown switching actuator state {} from device {}",
				data[2] >> 4,
				device.serial_number()
			);
			return false;
		}
	};

	super::with_status_datapoint(iface, device, |dp| {
		iface.handler().status_bool(dp, on);
	});
	true
}
