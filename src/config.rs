//! Stick configuration queries, all over the CONFIG channel.

use crate::error::{Error, Result};
use crate::interface::Interface;
use crate::mci;

fn u32_be(data: &[u8], offset: usize) -> Result<u32> {
	let bytes: [u8; 4] = data
		.get(offset..offset + 4)
		.and_then(|slice| slice.try_into().ok())
		.ok_or(Error::UnexpectedResponse)?;
	Ok(u32::from_be_bytes(bytes))
}

impl Interface {
	/// The stick's serial number.
	pub async fn serial(&self) -> Result<u32> {
		let data = self
			.send_config_command(&[mci::CONF_SERIAL, mci::CF_DATA_GET])
			.await?;
		u32_be(&data, 1)
	}

	/// RF and firmware release as decimal fractions, e.g. (1.12, 2.05).
	pub async fn release(&self) -> Result<(f32, f32)> {
		let data = self
			.send_config_command(&[mci::CONF_RELEASE, mci::CF_DATA_GET])
			.await?;
		if data.len() < 5 {
			return Err(Error::UnexpectedResponse);
		}
		let rf = f32::from(data[1]) + f32::from(data[2]) / 100.0;
		let fw = f32::from(data[3]) + f32::from(data[4]) / 100.0;
		Ok((rf, fw))
	}

	/// Hardware, RF and firmware revision.
	pub async fn revision(&self) -> Result<(u8, u8, u16)> {
		let data = self
			.send_config_command(&[mci::CONF_RELEASE, mci::CF_DATA_GET_REVISION])
			.await?;
		if data.len() < 5 {
			return Err(Error::UnexpectedResponse);
		}
		let fw = u16::from_be_bytes([data[3], data[4]]);
		Ok((data[1], data[2], fw))
	}

	/// Makes the stick report RF transmissions with OK_MRF statuses, which
	/// the TX rendezvous relies on.
	pub async fn set_ok_mrf(&self) -> Result<()> {
		self.send_config_command(&[mci::CONF_SEND_OK_MRF, mci::CF_DATA_SET])
			.await?;
		Ok(())
	}

	/// Makes the stick report RF sequence numbers.
	pub async fn set_rf_seq_no(&self) -> Result<()> {
		self.send_config_command(&[mci::CONF_SEND_RFSEQNO, mci::CF_DATA_SET])
			.await?;
		Ok(())
	}

	/// Telegrams received since power-up.
	pub async fn counter_rx(&self) -> Result<u32> {
		let data = self
			.send_config_command(&[mci::CONF_COUNTER_RX, mci::CF_DATA_GET])
			.await?;
		u32_be(&data, 1)
	}

	/// Telegrams transmitted since power-up.
	pub async fn counter_tx(&self) -> Result<u32> {
		let data = self
			.send_config_command(&[mci::CONF_COUNTER_TX, mci::CF_DATA_GET])
			.await?;
		u32_be(&data, 1)
	}
}
