//! Seekable byte source over the stick's EPROM, read in small pages through
//! EXTENDED commands.
//!
//! The first read kicks off a DPL transfer with ET_REQU_DPL; everything
//! after that is plain offset/length reads. Each reply reports the absolute
//! position its payload starts at, which keeps the reader honest across
//! short replies and re-sent commands.

use log::trace;

use crate::error::{Error, Result};
use crate::interface::Interface;
use crate::mci;
use crate::readers::DplSource;

/// Bytes requested per ET_RD command.
const READ_CHUNK: u16 = 10;
/// Offset of the first payload byte in ET_SEND_DPL/ET_REPLY frames.
const REPLY_PAYLOAD: usize = 7;

pub(crate) struct EpromReader<'a> {
	iface: &'a Interface,
	position: u32,
}

impl<'a> EpromReader<'a> {
	pub fn new(iface: &'a Interface) -> Self {
		Self { iface, position: 0 }
	}

	/// Fetches the next page, returning the position it starts at and the
	/// reply frame.
	async fn fetch(&mut self) -> Result<(u32, Vec<u8>)> {
		let reply = if self.position == 0 {
			let reply = self
				.iface
				.send_extended_command(&[mci::ET_REQU_DPL, 0, 0, 0, 0, 0, 0])
				.await?;
			if reply.first() != Some(&mci::ET_SEND_DPL) {
				return Err(Error::UnexpectedResponse);
			}
			reply
		} else {
			let mut command = [mci::ET_RD, 0, 0, 0, 0, 0, 0];
			command[1..5].copy_from_slice(&self.position.to_le_bytes());
			command[5..7].copy_from_slice(&READ_CHUNK.to_le_bytes());
			let reply = self.iface.send_extended_command(&command).await?;
			if reply.first() != Some(&mci::ET_REPLY) {
				return Err(Error::UnexpectedResponse);
			}
			reply
		};

		if reply.len() <= REPLY_PAYLOAD {
			return Err(Error::UnexpectedResponse);
		}
		let start = u32::from_le_bytes([reply[1], reply[2], reply[3], reply[4]]);
		Ok((start, reply))
	}
}

impl DplSource for EpromReader<'_> {
	async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
		let mut filled = 0;
		while filled < buf.len() {
			let (start, reply) = self.fetch().await?;
			let payload = &reply[REPLY_PAYLOAD..];
			let take = payload.len().min(buf.len() - filled);
			buf[filled..filled + take].copy_from_slice(&payload[..take]);
			filled += take;
			// Unconsumed payload bytes are re-read from the stick on the
			// next page.
			self.position = start + take as u32;
			trace!("eprom read {take} bytes, position now {}", self.position);
		}
		Ok(())
	}

	async fn seek_to(&mut self, position: u64) -> Result<()> {
		self.position = position as u32;
		Ok(())
	}
}
