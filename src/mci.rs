//! The MCI constant space spoken by xComfort RF transceiver sticks.
//!
//! One-way packets are delimited by [`SER_START`]/[`SER_STOP`] and carry a
//! length byte followed by a packet-type byte. Everything after the packet
//! type depends on the channel: TX commands address a datapoint, CONFIG and
//! EXTENDED commands address the stick itself, RX and STATUS packets flow
//! back from the stick.

/// Serial framing start sentinel.
pub const SER_START: u8 = 0x02;
/// Serial framing stop sentinel.
pub const SER_STOP: u8 = 0x03;

/// Outbound RF command addressed to a datapoint, tagged with a sequence nibble.
pub const PT_TX: u8 = 0xb1;
/// Outbound stick configuration command.
pub const PT_CONFIG: u8 = 0xb2;
/// Outbound extended command (EPROM access, datapoint list transfer).
pub const PT_EXTENDED: u8 = 0xb7;
/// Inbound RF telegram from a device.
pub const PT_RX: u8 = 0xc1;
/// Inbound stick status message.
pub const PT_STATUS: u8 = 0xc3;

/// Switch an actuator on or off.
pub const TE_SWITCH: u8 = 0x0a;
/// Drive a shutter actuator.
pub const TE_JALO: u8 = 0x0c;
/// Dim to an absolute percentage.
pub const TE_DIM: u8 = 0x0d;
/// Direct dimming with an explicit ramp speed.
pub const TE_DIRECT: u8 = 0x0e;
/// Configure a Dimplex e-radiator setpoint.
pub const TE_DIMPLEX_CONFIG: u8 = 0x1c;
/// Report a measured temperature to a Dimplex e-radiator.
pub const TE_DIMPLEX_TEMP: u8 = 0x1d;
/// Answer an HRV setpoint request with target/current temperatures.
pub const TE_HRV_IN: u8 = 0x1e;

/// TX event data: off.
pub const TED_OFF: u8 = 0x0a;
/// TX event data: on.
pub const TED_ON: u8 = 0x0b;
/// TX event data: stop shutter movement.
pub const TED_JSTOP: u8 = 0x0c;
/// TX event data: close shutter.
pub const TED_CLOSE: u8 = 0x0d;
/// TX event data: open shutter.
pub const TED_OPEN: u8 = 0x0e;
/// TX event data: step shutter towards closed.
pub const TED_STEP_CLOSE: u8 = 0x0f;
/// TX event data: step shutter towards open.
pub const TED_STEP_OPEN: u8 = 0x10;
/// TX event data: percentage value follows.
pub const TED_PERCENT: u8 = 0x40;

/// Status message: command accepted.
pub const STT_OK: u8 = 0x01;
/// Status message: command failed, error subcode follows.
pub const STT_ERROR: u8 = 0x02;
/// Status message: stick serial number.
pub const STT_SERIAL: u8 = 0x03;
/// Status message: RF/firmware release.
pub const STT_RELEASE: u8 = 0x04;
/// Status message: remaining RF time account.
pub const STT_TIMEACCOUNT: u8 = 0x05;
/// Status message: OK_MRF reporting mode acknowledged.
pub const STT_SEND_OK_MRF: u8 = 0x06;
/// Status message: received telegram counter.
pub const STT_COUNTER_RX: u8 = 0x07;
/// Status message: transmitted telegram counter.
pub const STT_COUNTER_TX: u8 = 0x08;

/// OK subtype: RF transmission report, sequence nibble follows.
pub const OK_MRF: u8 = 0x01;
/// OK subtype: configuration command acknowledged.
pub const OK_CONFIG: u8 = 0x02;

/// OK_MRF detail: sent, no routing information.
pub const OKMRF_NOINFO: u8 = 0x00;
/// OK_MRF detail: acknowledged by the addressed device.
pub const OKMRF_ACK_DIRECT: u8 = 0x01;
/// OK_MRF detail: acknowledged through a router.
pub const OKMRF_ACK_ROUTED: u8 = 0x02;

/// Error subcode: general error, detail code follows.
pub const STS_GENERAL: u8 = 0x00;
/// Error subcode: message unknown.
pub const STS_UNKNOWN: u8 = 0x01;
/// Error subcode: datapoint out of range.
pub const STS_DP_OOR: u8 = 0x02;
/// Error subcode: RF busy, TX message lost.
pub const STS_BUSY_MRF: u8 = 0x03;
/// Error subcode: RF busy, reception in progress.
pub const STS_BUSY_MRF_RX: u8 = 0x04;
/// Error subcode: TX message lost, buffer full.
pub const STS_TX_MSG_LOST: u8 = 0x05;
/// Error subcode: no ACK received.
pub const STS_NO_ACK: u8 = 0x06;

/// Time account report carries a percentage byte.
pub const TA_DATA: u8 = 0x00;
/// Time account exhausted.
pub const TA_ZERO: u8 = 0x01;
/// Time account below 10%.
pub const TA_LESS_THAN_10: u8 = 0x02;
/// Time account recovered above 15%.
pub const TA_MORE_THAN_15: u8 = 0x03;

/// Extended command: request start of the datapoint list.
pub const ET_REQU_DPL: u8 = 0x01;
/// Extended reply: first datapoint list chunk.
pub const ET_SEND_DPL: u8 = 0x02;
/// Extended command: read EPROM bytes at an offset.
pub const ET_RD: u8 = 0x03;
/// Extended reply: EPROM bytes.
pub const ET_REPLY: u8 = 0x04;
/// Extended notification: datapoint list rewritten by the vendor tool.
pub const ET_DPL_CHANGED: u8 = 0x05;
/// Extended reply: status list chunk.
pub const ET_SEND_STL: u8 = 0x06;
/// Extended notification: status list changed.
pub const ET_STL_CHANGED: u8 = 0x07;

/// Query or set the stick serial number.
pub const CONF_SERIAL: u8 = 0x01;
/// Query the RF and firmware release.
pub const CONF_RELEASE: u8 = 0x02;
/// Enable OK_MRF transmission reports.
pub const CONF_SEND_OK_MRF: u8 = 0x03;
/// Enable RF sequence number reporting.
pub const CONF_SEND_RFSEQNO: u8 = 0x04;
/// Query the received telegram counter.
pub const CONF_COUNTER_RX: u8 = 0x05;
/// Query the transmitted telegram counter.
pub const CONF_COUNTER_TX: u8 = 0x06;

/// CONFIG data byte: get the current value.
pub const CF_DATA_GET: u8 = 0x00;
/// CONFIG data byte: set/enable.
pub const CF_DATA_SET: u8 = 0x01;
/// CONFIG data byte: get the hardware/firmware revision.
pub const CF_DATA_GET_REVISION: u8 = 0x02;

/// RX event: turned on.
pub const RX_EVENT_ON: u8 = 0x50;
/// RX event: turned off.
pub const RX_EVENT_OFF: u8 = 0x51;
/// RX event: switch closed.
pub const RX_EVENT_SWITCH_ON: u8 = 0x52;
/// RX event: switch opened.
pub const RX_EVENT_SWITCH_OFF: u8 = 0x53;
/// RX event: up button pressed.
pub const RX_EVENT_UP_PRESSED: u8 = 0x54;
/// RX event: up button released.
pub const RX_EVENT_UP_RELEASED: u8 = 0x55;
/// RX event: down button pressed.
pub const RX_EVENT_DOWN_PRESSED: u8 = 0x56;
/// RX event: down button released.
pub const RX_EVENT_DOWN_RELEASED: u8 = 0x57;
/// RX event: forced mode.
pub const RX_EVENT_FORCED: u8 = 0x58;
/// RX event: single-on mode.
pub const RX_EVENT_SINGLE_ON: u8 = 0x59;
/// RX event: measurement value.
pub const RX_EVENT_VALUE: u8 = 0x5a;
/// RX event: temperature below the configured band.
pub const RX_EVENT_TOO_COLD: u8 = 0x5b;
/// RX event: temperature above the configured band.
pub const RX_EVENT_TOO_WARM: u8 = 0x5c;
/// RX event: actuator status report.
pub const RX_EVENT_STATUS: u8 = 0x70;
/// RX event: extended status report, keyed by serial number.
pub const RX_EVENT_STATUS_EXT: u8 = 0x71;

/// RX data type: event only.
pub const RDT_NO_DATA: u8 = 0x00;
/// RX data type: percentage scaled over the full byte range.
pub const RDT_PERCENT: u8 = 0x01;
/// RX data type: unsigned byte.
pub const RDT_UINT8: u8 = 0x02;
/// RX data type: signed 16 bit, one decimal.
pub const RDT_INT16_1POINT: u8 = 0x03;
/// RX data type: IEEE-754 single.
pub const RDT_FLOAT: u8 = 0x04;
/// RX data type: unsigned 16 bit.
pub const RDT_UINT16: u8 = 0x05;
/// RX data type: unsigned 16 bit, one decimal.
pub const RDT_UINT16_1POINT: u8 = 0x06;
/// RX data type: unsigned 16 bit, two decimals.
pub const RDT_UINT16_2POINT: u8 = 0x07;
/// RX data type: unsigned 16 bit, three decimals.
pub const RDT_UINT16_3POINT: u8 = 0x08;
/// RX data type: unsigned 32 bit.
pub const RDT_UINT32: u8 = 0x09;
/// RX data type: unsigned 32 bit, three decimals.
pub const RDT_UINT32_3POINT: u8 = 0x0a;
/// RX data type: room controller temperature and wheel position.
pub const RDT_RC_DATA: u8 = 0x0b;
/// RX data type: room controller touch report (partially decoded).
pub const RDT_RCT_OUT: u8 = 0x0c;
/// RX data type: room controller touch request (not decoded).
pub const RDT_RCT_REQ: u8 = 0x0d;
/// RX data type: HRV status, valve position and setpoint request.
pub const RDT_HRV_OUT: u8 = 0x0e;
/// RX data type: serial number, introduces an extended status report.
pub const RDT_SERIAL_NUMBER: u8 = 0x10;

/// RX actuator status: off.
pub const RX_IS_OFF: u8 = 0x01;
/// RX actuator status: on.
pub const RX_IS_ON: u8 = 0x02;
/// RX actuator status: off (new generation).
pub const RX_IS_OFF_NG: u8 = 0x11;
/// RX actuator status: on (new generation).
pub const RX_IS_ON_NG: u8 = 0x12;
/// RX shutter status: stopped.
pub const RX_IS_STOP: u8 = 0x00;
/// RX shutter status: opening.
pub const RX_IS_OPEN: u8 = 0x01;
/// RX shutter status: closing.
pub const RX_IS_CLOSE: u8 = 0x02;

/// General error detail: invalid SWITCH data.
pub const ERR_T_SWITCH: u8 = 0x01;
/// General error detail: invalid PERCENT value.
pub const ERR_T_PERCENT: u8 = 0x02;
/// General error detail: invalid DIM data.
pub const ERR_T_DIM: u8 = 0x03;
/// General error detail: invalid JALO data.
pub const ERR_T_JALO: u8 = 0x04;
/// General error detail: invalid JALO_STEP data.
pub const ERR_T_JALO_STEP: u8 = 0x05;
/// General error detail: invalid PUSHBUTTON data.
pub const ERR_T_PUSHBUTTON: u8 = 0x06;
/// General error detail: invalid EVENT.
pub const ERR_T_EVENT: u8 = 0x07;
/// General error detail: invalid TIMEACCOUNT mode.
pub const ERR_T_TIMEACCOUNT: u8 = 0x08;
/// General error detail: invalid SEND_OK_MRF mode.
pub const ERR_T_SEND_OK_MRF: u8 = 0x09;
/// General error detail: invalid RELEASE mode.
pub const ERR_T_RELEASE: u8 = 0x0a;
/// General error detail: invalid BACK_TO_FACTORY mode.
pub const ERR_T_BACK_TO_FACTORY: u8 = 0x0b;
/// General error detail: invalid COUNTER_RX mode.
pub const ERR_T_COUNTER_RX: u8 = 0x0c;
/// General error detail: invalid COUNTER_TX mode.
pub const ERR_T_COUNTER_TX: u8 = 0x0d;
/// General error detail: invalid CONFIG packet type.
pub const ERR_T_TYPE: u8 = 0x0e;
/// General error detail: invalid packet type.
pub const ERR_T_PACKET_TYPE: u8 = 0x0f;
/// General error detail: invalid RF firmware revision.
pub const ERR_T_RFREVISION: u8 = 0x10;
/// General error detail: invalid SEND_CLASS mode.
pub const ERR_T_SEND_CLASS: u8 = 0x11;
/// General error detail: invalid SEND_RFSEQNO mode.
pub const ERR_T_SEND_RFSEQNO: u8 = 0x12;
/// General error detail: buffer full, wait for OK.
pub const ERR_T_BUFFER_FULL: u8 = 0x13;
/// General error detail: CRC error.
pub const ERR_T_CRC: u8 = 0x14;
/// General error detail: basic mode, no actuator in learn mode.
pub const ERR_T_BM_NO_TARGET: u8 = 0x15;
/// General error detail: datapoint not assigned to an actuator.
pub const ERR_T_DP_NOT_ASSIGNED: u8 = 0x16;
/// General error detail: unexpected value.
pub const ERR_T_VALUE: u8 = 0x17;

/// Header tag of the only supported binary datapoint list format.
pub const DPL_TYPE_EXT2: u8 = 0x03;

/// USB vendor id of the CKOZ-00/14 communication stick.
pub const USB_VENDOR_ID: u16 = 0x188a;
/// USB product id of the CKOZ-00/14 communication stick.
pub const USB_PRODUCT_ID: u16 = 0x1101;
/// TCP port spoken by Ethernet Communication Interfaces.
pub const ECI_PORT: u16 = 7153;

/// Formats a packet for log output.
pub(crate) fn hex(data: &[u8]) -> String {
	use core::fmt::Write;

	let mut out = String::with_capacity(data.len() * 2);
	for byte in data {
		// Writing to a String cannot fail.
		let _ = write!(out, "{byte:02x}");
	}
	out
}
