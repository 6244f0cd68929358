//! Failure kinds reported by the stick and by the engine itself.

use thiserror::Error;

use crate::mci;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
	/// The stick rejected a command with a general error detail code.
	#[error("general error: {}", general_error_message(.0))]
	General(u8),
	/// The stick did not understand the message.
	#[error("message unknown")]
	Unknown,
	/// The addressed datapoint is outside the configured list.
	#[error("datapoint out of range")]
	DpOutOfRange,
	/// The RF circuit was busy transmitting, the TX message was lost.
	#[error("RF busy, TX message lost")]
	BusyRfTx,
	/// The RF circuit was busy receiving.
	#[error("RF busy, RX in progress")]
	BusyRfRx,
	/// The TX buffer overflowed, the message must be repeated.
	#[error("TX message lost, repeat it, buffer full")]
	TxBufferFull,
	/// No acknowledgement was received from the addressed device.
	#[error("timeout, no ACK received")]
	NoAck,
	/// The stick reported an error subcode this engine does not know.
	#[error("unrecognised stick error {0:#04x}")]
	Unrecognised(u8),
	/// The engine is shutting down; pending callers are woken with this.
	#[error("terminal error")]
	Terminal,
	/// The binary datapoint list header tag is not supported.
	#[error("unknown DPL format")]
	UnknownDplFormat,
	/// A reply did not match the outstanding request.
	#[error("unexpected response")]
	UnexpectedResponse,
	/// A frame ended before the advertised length was read.
	#[error("short packet")]
	ShortPacket,
	/// A start or stop sentinel was out of place.
	#[error("start/stop byte violation")]
	Framing,
	/// A datapoint file record could not be decoded.
	#[error("invalid datapoint record: {0}")]
	InvalidRecord(String),
	/// The datapoint file extension maps to no known reader.
	#[error("unknown file type {0:?}")]
	UnknownFileType(String),
	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl Error {
	/// Maps a stick STT_ERROR payload (starting at the subcode byte) to a
	/// failure kind.
	pub(crate) fn from_status(data: &[u8]) -> Self {
		match data.first().copied() {
			Some(mci::STS_GENERAL) => Error::General(data.get(1).copied().unwrap_or(0)),
			Some(mci::STS_UNKNOWN) => Error::Unknown,
			Some(mci::STS_DP_OOR) => Error::DpOutOfRange,
			Some(mci::STS_BUSY_MRF) => Error::BusyRfTx,
			Some(mci::STS_BUSY_MRF_RX) => Error::BusyRfRx,
			Some(mci::STS_TX_MSG_LOST) => Error::TxBufferFull,
			Some(mci::STS_NO_ACK) => Error::NoAck,
			Some(code) => Error::Unrecognised(code),
			None => Error::UnexpectedResponse,
		}
	}

	/// Transient stick failures worth another TX attempt.
	pub fn is_retryable(&self) -> bool {
		matches!(
			self,
			Error::DpOutOfRange
				| Error::BusyRfTx
				| Error::BusyRfRx
				| Error::TxBufferFull
				| Error::NoAck
		)
	}
}

fn general_error_message(detail: &u8) -> &'static str {
	match *detail {
		mci::ERR_T_SWITCH => "invalid SWITCH data",
		mci::ERR_T_PERCENT => "invalid PERCENT value",
		mci::ERR_T_DIM => "invalid DIM data",
		mci::ERR_T_JALO => "invalid JALO data",
		mci::ERR_T_JALO_STEP => "invalid JALO_STEP data",
		mci::ERR_T_PUSHBUTTON => "invalid PUSHBUTTON data",
		mci::ERR_T_EVENT => "invalid EVENT (IN or OUT)",
		mci::ERR_T_TIMEACCOUNT => "invalid TIMEACCOUNT mode",
		mci::ERR_T_SEND_OK_MRF => "invalid SEND_OK_MRF mode",
		mci::ERR_T_RELEASE => "invalid RELEASE mode",
		mci::ERR_T_BACK_TO_FACTORY => "invalid BACK_TO_FACTORY mode",
		mci::ERR_T_COUNTER_RX => "invalid COUNTER_RX mode",
		mci::ERR_T_COUNTER_TX => "invalid COUNTER_TX mode",
		mci::ERR_T_TYPE => "invalid CONFIG packet type (OUT)",
		mci::ERR_T_PACKET_TYPE => "invalid packet type (OUT)",
		mci::ERR_T_RFREVISION => "invalid RF firmware revision",
		mci::ERR_T_SEND_CLASS => "invalid SEND_CLASS mode",
		mci::ERR_T_SEND_RFSEQNO => "invalid SEND_RFSEQNO mode",
		mci::ERR_T_BUFFER_FULL => "buffer full, wait for OK",
		mci::ERR_T_CRC => "CRC error",
		mci::ERR_T_BM_NO_TARGET => "basic mode: no actuator in learn mode",
		mci::ERR_T_DP_NOT_ASSIGNED => "datapoint is not assigned to an actuator",
		mci::ERR_T_VALUE => "unexpected value",
		_ => "unknown error",
	}
}
