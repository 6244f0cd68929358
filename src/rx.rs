//! Decoding of inbound RF telegrams into typed datapoint events.
//!
//! After the packet-type byte the layout is `[datapoint][event][...]`; the
//! rest depends on the event and, for value-carrying events, on a data-type
//! byte. Signal strength and battery state ride along at fixed offsets in
//! every datapoint-addressed frame.

use core::fmt;
use std::sync::Arc;

use log::{debug, warn};

use crate::devices;
use crate::devices::hrv::{self, HrvRequest, HrvStatus};
use crate::devices::shutter::ShutterStatus;
use crate::interface::Interface;
use crate::mci;
use crate::registry::{BatteryState, Datapoint, SignalStrength};

/// A logical event sent by a datapoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
	On,
	Off,
	SwitchOn,
	SwitchOff,
	UpPressed,
	UpReleased,
	DownPressed,
	DownReleased,
	Forced,
	SingleOn,
	Value,
	TooCold,
	TooWarm,
}

impl fmt::Display for Event {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let label = match self {
			Event::On => "on",
			Event::Off => "off",
			Event::SwitchOn => "switchOn",
			Event::SwitchOff => "switchOff",
			Event::UpPressed => "upPressed",
			Event::UpReleased => "upReleased",
			Event::DownPressed => "downPressed",
			Event::DownReleased => "downReleased",
			Event::Forced => "forced",
			Event::SingleOn => "singleOn",
			Event::Value => "value",
			Event::TooCold => "tooCold",
			Event::TooWarm => "tooWarm",
		};
		f.write_str(label)
	}
}

fn event_from_byte(byte: u8) -> Option<Event> {
	match byte {
		mci::RX_EVENT_ON => Some(Event::On),
		mci::RX_EVENT_OFF => Some(Event::Off),
		mci::RX_EVENT_SWITCH_ON => Some(Event::SwitchOn),
		mci::RX_EVENT_SWITCH_OFF => Some(Event::SwitchOff),
		mci::RX_EVENT_UP_PRESSED => Some(Event::UpPressed),
		mci::RX_EVENT_UP_RELEASED => Some(Event::UpReleased),
		mci::RX_EVENT_DOWN_PRESSED => Some(Event::DownPressed),
		mci::RX_EVENT_DOWN_RELEASED => Some(Event::DownReleased),
		mci::RX_EVENT_FORCED => Some(Event::Forced),
		mci::RX_EVENT_SINGLE_ON => Some(Event::SingleOn),
		mci::RX_EVENT_VALUE => Some(Event::Value),
		mci::RX_EVENT_TOO_COLD => Some(Event::TooCold),
		mci::RX_EVENT_TOO_WARM => Some(Event::TooWarm),
		_ => None,
	}
}

/// Offset of the signal strength byte, counted from the event byte.
const RX_RSSI: usize = 7;
/// Offset of the battery/flags byte, counted from the event byte.
const RX_BATTERY: usize = 8;
/// Battery code mask of the battery/flags byte.
const RX_BATTERY_MASK: u8 = 0x1f;
/// Cyclic-transmission flag of the battery/flags byte.
const RX_CYCLIC: u8 = 0x20;

/// Routes an inbound RX payload (starting at the datapoint byte).
///
/// Returns false when nobody could make sense of the frame.
pub(crate) fn dispatch(iface: &Interface, data: &[u8]) -> bool {
	if data.len() < 2 {
		warn!("truncated RX message");
		return false;
	}

	if data[1] == mci::RX_EVENT_STATUS_EXT {
		return extended_status(iface, &data[2..]);
	}

	let Some(dp) = iface.registry().datapoint(data[0]).cloned() else {
		warn!("received message from unknown datapoint {}", data[0]);
		return false;
	};
	datapoint_rx(iface, &dp, &data[1..])
}

/// Extended status reports are addressed by serial number instead of by
/// datapoint.
fn extended_status(iface: &Interface, data: &[u8]) -> bool {
	if data.len() < 6 || data[0] != mci::RDT_SERIAL_NUMBER {
		warn!("unhandled extended status message");
		return false;
	}

	let serial_number = u32::from_le_bytes([data[2], data[3], data[4], data[5]]);
	let Some(device) = iface.registry().device(serial_number).cloned() else {
		warn!("received extended status message from unknown device {serial_number}");
		return false;
	};
	devices::extended_status(iface, &device, &data[6..])
}

/// Handles a frame addressed to a known datapoint; `data` starts at the
/// event byte.
fn datapoint_rx(iface: &Interface, dp: &Arc<Datapoint>, data: &[u8]) -> bool {
	if data.len() <= RX_BATTERY {
		warn!("truncated message from datapoint {}", dp.number());
		return false;
	}

	let device = dp.device();
	device.set_rssi(data[RX_RSSI]);
	iface
		.handler()
		.rssi(device, SignalStrength(data[RX_RSSI]));
	let battery = BatteryState(data[RX_BATTERY] & RX_BATTERY_MASK);
	device.set_battery(battery.0);
	iface.handler().battery(device, battery.percentage());

	let cyclic = data[RX_BATTERY] & RX_CYCLIC != 0;

	let (description, handled) = if data[0] == mci::RX_EVENT_STATUS {
		status(iface, dp, data[2])
	} else if let Some(event) = event_from_byte(data[0]) {
		event_rx(iface, dp, event, &data[1..])
	} else {
		warn!("unexpected event {}; ignoring", data[0]);
		("unknown".into(), false)
	};

	debug!(
		"device {} (channel {}-'{}') sent message (battery {}, signal {}, cyclic {}) {}",
		device.serial_number(),
		dp.channel(),
		dp.name(),
		device.battery(),
		device.rssi(),
		cyclic,
		description
	);

	handled
}

/// Actuator status reports carry a family-specific status byte.
fn status(iface: &Interface, dp: &Arc<Datapoint>, status: u8) -> (String, bool) {
	let device = dp.device();
	if device.is_switching_actuator() {
		match status {
			mci::RX_IS_OFF | mci::RX_IS_OFF_NG => {
				iface.handler().status_bool(dp, false);
				("status switched off".into(), true)
			}
			mci::RX_IS_ON | mci::RX_IS_ON_NG => {
				iface.handler().status_bool(dp, true);
				("status switched on".into(), true)
			}
			_ => {
				warn!("unknown switching actuator status {status}");
				("unknown".into(), false)
			}
		}
	} else if device.is_dimming_actuator() {
		iface.handler().status_value(dp, status);
		(format!("value {status}"), true)
	} else if device.is_shutter() {
		let shutter = match status {
			mci::RX_IS_STOP => ShutterStatus::Stopped,
			mci::RX_IS_OPEN => ShutterStatus::Opening,
			mci::RX_IS_CLOSE => ShutterStatus::Closing,
			_ => {
				warn!("unknown shutter status {status}");
				return ("unknown".into(), false);
			}
		};
		iface.handler().status_shutter(dp, shutter);
		(format!("status shutter {shutter}"), true)
	} else {
		warn!(
			"unknown status {status} for unsupported device {}",
			device.device_type()
		);
		("unknown".into(), false)
	}
}

/// Value-carrying events; `data` starts at the data-type byte.
fn event_rx(iface: &Interface, dp: &Arc<Datapoint>, event: Event, data: &[u8]) -> (String, bool) {
	let u16_be = |offset: usize| u16::from_be_bytes([data[offset], data[offset + 1]]);
	let u32_be = |offset: usize| {
		u32::from_be_bytes([
			data[offset],
			data[offset + 1],
			data[offset + 2],
			data[offset + 3],
		])
	};

	let value: f64 = match data[0] {
		mci::RDT_NO_DATA => {
			iface.handler().event(dp, event);
			return (format!("event '{event}'"), true);
		}
		mci::RDT_UINT8 => f64::from(data[2]),
		mci::RDT_UINT16 => f64::from(u16_be(2)),
		mci::RDT_UINT16_1POINT => f64::from(u16_be(2)) / 10.0,
		mci::RDT_UINT16_2POINT => f64::from(u16_be(2)) / 100.0,
		mci::RDT_UINT16_3POINT => f64::from(u16_be(2)) / 1000.0,
		mci::RDT_INT16_1POINT => f64::from(u16_be(2) as i16) / 10.0,
		mci::RDT_UINT32 => f64::from(u32_be(2)),
		mci::RDT_UINT32_3POINT => f64::from(u32_be(2)) / 1000.0,
		mci::RDT_FLOAT => f64::from(f32::from_bits(u32_be(2))),
		mci::RDT_PERCENT => f64::from(data[2]) * 100.0 / 255.0,
		mci::RDT_RC_DATA => {
			let temperature = f64::from(u16_be(2) as i16) / 10.0;
			let wheel = f64::from(u16_be(4) as i16) / 10.0;
			iface.handler().wheel(dp, wheel);
			temperature
		}
		mci::RDT_HRV_OUT => return hrv_out(iface, dp, event, data),
		mci::RDT_RCT_OUT => {
			let moisture =
				f64::from(u16::from_le_bytes([data[2], data[3]])) / 10.0;
			let temperature =
				f64::from(u16::from_le_bytes([data[4], data[5]])) / 10.0;
			debug!("(partially decoded) temp {temperature:.1}C moisture {moisture:.1}%");
			return ("RCT OUT".into(), false);
		}
		mci::RDT_RCT_REQ => return ("RCT REQ".into(), false),
		data_type => {
			warn!("unhandled data type {data_type} for event '{event}'");
			return ("unknown".into(), false);
		}
	};

	iface.handler().value_event(dp, event, value);
	(format!("event '{event}' with value {value}"), true)
}

/// HRV frames piggyback a request for data on their periodic report.
fn hrv_out(
	iface: &Interface,
	dp: &Arc<Datapoint>,
	event: Event,
	data: &[u8],
) -> (String, bool) {
	let serial_number = dp.device().serial_number();
	HrvStatus::from_bits_truncate(data[2]).log(serial_number);

	iface.handler().valve(dp, data[3]);

	let temperature =
		f64::from(u16::from_be_bytes([data[4] & 0x0f, data[5]])) / 10.0;
	iface.handler().value_event(dp, event, temperature);

	match HrvRequest::from(data[4] >> 4) {
		HrvRequest::Setpoint => {
			// Answered from a separate task; a TX command issued on the
			// loop itself would deadlock.
			tokio::spawn(hrv::send_temperatures(
				iface.clone(),
				dp.clone(),
				temperature as f32,
			));
		}
		HrvRequest::Time | HrvRequest::Date => {
			debug!("HRV device {serial_number} asked for time/date, not answering");
		}
		HrvRequest::Nothing => {}
	}

	(
		format!("HRV valve {} temperature {temperature:.1}", data[3]),
		true,
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn event_labels() {
		assert_eq!(Event::UpPressed.to_string(), "upPressed");
		assert_eq!(Event::Value.to_string(), "value");
	}

	#[test]
	fn event_mapping() {
		assert_eq!(event_from_byte(mci::RX_EVENT_ON), Some(Event::On));
		assert_eq!(
			event_from_byte(mci::RX_EVENT_TOO_WARM),
			Some(Event::TooWarm)
		);
		assert_eq!(event_from_byte(0xff), None);
	}
}
