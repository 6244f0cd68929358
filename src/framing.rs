//! START/STOP serial framing.
//!
//! Every packet on the wire is `[START][LEN][payload][STOP]`, where `LEN`
//! counts the bytes following the length byte, stop sentinel included. The
//! decoder hands out the payload starting at the packet-type byte; the
//! encoder computes the length byte itself.

use smallvec::SmallVec;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::mci;

/// Reads one complete frame, blocking until it is available.
///
/// [`Error::Framing`] and [`Error::ShortPacket`] leave the stream open; the
/// caller is expected to log and carry on. [`Error::Io`] is fatal.
pub(crate) async fn read_frame<R>(stream: &mut R) -> Result<Vec<u8>>
where
	R: AsyncRead + Unpin,
{
	let mut byte = [0u8; 1];
	stream.read_exact(&mut byte).await?;
	if byte[0] != mci::SER_START {
		return Err(Error::Framing);
	}

	stream.read_exact(&mut byte).await?;
	let len = usize::from(byte[0]);
	if len == 0 {
		return Err(Error::Framing);
	}

	let mut buf = vec![0u8; len];
	stream.read_exact(&mut buf).await.map_err(|err| {
		if err.kind() == std::io::ErrorKind::UnexpectedEof {
			Error::ShortPacket
		} else {
			Error::Io(err)
		}
	})?;

	if buf.pop() != Some(mci::SER_STOP) {
		return Err(Error::Framing);
	}
	Ok(buf)
}

/// Wraps `payload` (starting at the packet-type byte) in sentinels and the
/// length byte and writes it out.
pub(crate) async fn write_frame<W>(stream: &mut W, payload: &[u8]) -> Result<()>
where
	W: AsyncWrite + Unpin,
{
	debug_assert!(payload.len() < 0xff);

	let mut frame = SmallVec::<[u8; 16]>::new();
	frame.push(mci::SER_START);
	frame.push(payload.len() as u8 + 1);
	frame.extend_from_slice(payload);
	frame.push(mci::SER_STOP);

	stream.write_all(&frame).await?;
	stream.flush().await?;
	Ok(())
}
