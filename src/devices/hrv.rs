//! Heat recovery ventilation / valve controllers (CHVZ-01).
//!
//! HRV accessories are pull-driven: the device periodically reports its
//! valve position and temperature, and asks the controller for the current
//! setpoint. The answer is a TE_HRV_IN command carrying the latest target
//! and room temperatures stored on the datapoint.

use std::sync::Arc;

use bitflags::bitflags;
use log::{debug, warn};
use num_enum::FromPrimitive;

use crate::interface::Interface;
use crate::registry::Datapoint;

bitflags! {
	/// Status bits of an HRV_OUT frame.
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub(crate) struct HrvStatus: u8 {
		const CONNECTION_LOST = 0x01;
		const VALVE_SLUGGISH = 0x02;
		const RANGE_TOO_LARGE = 0x04;
		const RANGE_TOO_SMALL = 0x08;
		const BATTERY_EMPTY = 0x10;
		const DEEP_SLEEP = 0x20;
	}
}

impl HrvStatus {
	pub(crate) fn log(self, serial_number: u32) {
		for (name, _) in self.iter_names() {
			warn!("HRV device {serial_number}: {name}");
		}
	}
}

/// Request nibble of an HRV_OUT frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub(crate) enum HrvRequest {
	#[num_enum(default)]
	Nothing = 0,
	Setpoint = 1,
	Time = 2,
	Date = 3,
}

/// Answers a setpoint request off the event loop.
///
/// `reported_temperature` is the room temperature the device just sent; a
/// user-provided override takes precedence.
pub(crate) async fn send_temperatures(
	iface: Interface,
	dp: Arc<Datapoint>,
	reported_temperature: f32,
) {
	let (_guard, last) = dp.queue().lock().await;
	if !last {
		return;
	}

	let current = dp.current_temperature().unwrap_or(reported_temperature);
	let setpoint = ((dp.desired_temperature() * 10.0) as i16).to_be_bytes();
	let room = ((current * 10.0) as i16).to_be_bytes();

	debug!(
		"answering setpoint request of datapoint {}: setpoint {}, current {}",
		dp.number(),
		dp.desired_temperature(),
		current
	);

	let command = [
		dp.number(),
		crate::mci::TE_HRV_IN,
		setpoint[0],
		setpoint[1],
		room[0],
		room[1],
	];
	if let Err(err) = iface.send_tx_command(&command).await {
		warn!("command for datapoint {} failed: {err}", dp.number());
	}
}
