//! Shutter (jalousie) actuators.

use core::fmt;
use std::sync::Arc;

use log::debug;

use crate::interface::Interface;
use crate::mci;
use crate::registry::Device;

/// Movement commands accepted by a shutter datapoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutterCommand {
	Close,
	Open,
	Stop,
	StepClose,
	StepOpen,
}

impl ShutterCommand {
	pub(crate) fn event_data(self) -> u8 {
		match self {
			ShutterCommand::Close => mci::TED_CLOSE,
			ShutterCommand::Open => mci::TED_OPEN,
			ShutterCommand::Stop => mci::TED_JSTOP,
			ShutterCommand::StepClose => mci::TED_STEP_CLOSE,
			ShutterCommand::StepOpen => mci::TED_STEP_OPEN,
		}
	}
}

/// Shutter state as reported back by the actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutterStatus {
	Stopped,
	Opening,
	Closing,
	Open,
	Closed,
}

impl fmt::Display for ShutterStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let label = match self {
			ShutterStatus::Stopped => "stopped",
			ShutterStatus::Opening => "opening",
			ShutterStatus::Closing => "closing",
			ShutterStatus::Open => "open",
			ShutterStatus::Closed => "closed",
		};
		f.write_str(label)
	}
}

pub(crate) fn extended_status(iface: &Interface, device: &Arc<Device>, data: &[u8]) -> bool {
	// Byte 3 is described as a closed percentage, but only the two
	// endpoints are reliable.
	let status = match data[3] {
		0x00 => ShutterStatus::Open,
		0x64 => ShutterStatus::Closed,
		_ => ShutterStatus::Stopped,
	};

	debug!(
		"device {} sent extended status message: shutter {}, rssi {}, battery {}",
		device.serial_number(),
		status,
		device.rssi(),
		device.battery(),
	);

	super::with_status_datapoint(iface, device, |dp| {
		iface.handler().status_shutter(dp, status);
	});
	true
}
