//! Readers for the two datapoint-list formats exported by the vendor tool:
//! the tab-separated text export and the binary DPL container, which is also
//! the layout stored in the stick's EPROM.

use std::io::BufRead;

use hashbrown::HashMap;
use log::{debug, warn};

use crate::error::{Error, Result};
use crate::mci;
use crate::registry::RawDatapoint;

/// Byte source for the DPL decoder.
///
/// The container is parsed with seeks, so both the in-memory file variant
/// and the paginated EPROM variant implement this instead of a plain reader.
pub(crate) trait DplSource {
	async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()>;
	async fn seek_to(&mut self, position: u64) -> Result<()>;
}

/// [`DplSource`] over bytes that are already in memory.
pub(crate) struct SliceSource {
	data: Vec<u8>,
	position: usize,
}

impl SliceSource {
	pub fn new(data: Vec<u8>) -> Self {
		Self { data, position: 0 }
	}
}

impl DplSource for SliceSource {
	async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
		let end = self.position + buf.len();
		if end > self.data.len() {
			return Err(Error::Io(std::io::ErrorKind::UnexpectedEof.into()));
		}
		buf.copy_from_slice(&self.data[self.position..end]);
		self.position = end;
		Ok(())
	}

	async fn seek_to(&mut self, position: u64) -> Result<()> {
		self.position = position as usize;
		Ok(())
	}
}

fn u16_le(data: &[u8], offset: usize) -> u16 {
	u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn u32_le(data: &[u8], offset: usize) -> u32 {
	u32::from_le_bytes([
		data[offset],
		data[offset + 1],
		data[offset + 2],
		data[offset + 3],
	])
}

fn windows1252(bytes: &[u8]) -> String {
	let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
	text.into_owned()
}

fn collapse_whitespace(name: &str) -> String {
	name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Offset of the text-list length inside the extended header.
const EXT_HEADER_TEXT_LEN: usize = 114;
/// Offset of the text-list position inside the extended header.
const EXT_HEADER_TEXT_OFFSET: usize = 116;
/// Bytes of a basic entry.
const BASIC_ENTRY_SIZE: usize = 16;
/// Length of the null-padded name field of an extended entry.
const EXT_ENTRY_NAME_SIZE: usize = 53;

/// Decodes a binary DPL container.
///
/// Everything in the container is little-endian. The basic header is
/// followed by fixed-size basic entries; the extended region (own header,
/// per-datapoint entries, text list) lives at the offset advertised in the
/// basic header.
pub(crate) async fn read_dpl<S>(source: &mut S, verbose: bool) -> Result<Vec<RawDatapoint>>
where
	S: DplSource,
{
	let mut basic_header = [0u8; 16];
	source.read_exact(&mut basic_header).await?;
	if basic_header[0] != mci::DPL_TYPE_EXT2 {
		return Err(Error::UnknownDplFormat);
	}

	let entries = usize::from(basic_header[8] & 0x0f) << 8 | usize::from(basic_header[9]);
	let mut basic_entries = vec![0u8; BASIC_ENTRY_SIZE * entries];
	source.read_exact(&mut basic_entries).await?;

	let extended_offset = u64::from(u32_le(&basic_header, 12));
	let extended_header_len = usize::from(basic_header[11]);
	if extended_header_len < EXT_HEADER_TEXT_OFFSET + 4 {
		return Err(Error::UnknownDplFormat);
	}
	let mut extended_header = vec![0u8; extended_header_len];
	source.seek_to(extended_offset).await?;
	source.read_exact(&mut extended_header).await?;

	let mut text_list = vec![0u8; usize::from(u16_le(&extended_header, EXT_HEADER_TEXT_LEN))];
	source
		.seek_to(u64::from(u32_le(&extended_header, EXT_HEADER_TEXT_OFFSET)))
		.await?;
	source.read_exact(&mut text_list).await?;

	let mut location_names: HashMap<u16, String> = HashMap::new();
	let mut rest = text_list.as_slice();
	while rest.len() >= 3 {
		let id = u16_le(rest, 0);
		let length = usize::from(rest[2]);
		if length < 3 || length > rest.len() {
			warn!("malformed text list entry {id}, ignoring the remainder");
			break;
		}
		location_names.insert(id, windows1252(&rest[3..length]));
		rest = &rest[length..];
	}

	source
		.seek_to(extended_offset + extended_header_len as u64)
		.await?;

	let mut datapoints = Vec::with_capacity(entries);
	for entry in basic_entries.chunks_exact(BASIC_ENTRY_SIZE) {
		let mut extended_entry = vec![0u8; usize::from(entry[11])];
		source.read_exact(&mut extended_entry).await?;

		let name_field = &extended_entry[..extended_entry.len().min(EXT_ENTRY_NAME_SIZE)];
		let name = collapse_whitespace(windows1252(name_field).trim_matches('\0'));

		let datapoint = RawDatapoint {
			number: u16_le(entry, 0) as u8,
			name,
			serial_number: u32_le(entry, 2),
			device_type: u16_le(entry, 6) as u8,
			channel: entry[8],
			mode: entry[9],
			sensor: entry[10] != 0,
		};

		if verbose {
			debug!(
				"datapoint {}: serial {}, type {}, channel {}, mode {}, '{}'",
				datapoint.number,
				datapoint.serial_number,
				datapoint.device_type,
				datapoint.channel,
				datapoint.mode,
				datapoint.name
			);
			// Entries placed by the vendor tool carry a location triple.
			if extended_entry.len() >= 64 && extended_entry[55] != 0 {
				let unnamed = String::new();
				debug!(
					"level: {}.{}.{}, location [{}, {}, {}]",
					extended_entry[55],
					extended_entry[58],
					extended_entry[61],
					location_names
						.get(&u16_le(&extended_entry, 56))
						.unwrap_or(&unnamed),
					location_names
						.get(&u16_le(&extended_entry, 59))
						.unwrap_or(&unnamed),
					location_names
						.get(&u16_le(&extended_entry, 62))
						.unwrap_or(&unnamed),
				);
			}
		}

		datapoints.push(datapoint);
	}

	Ok(datapoints)
}

/// Number of fields in a text-export record.
const TSV_FIELDS: usize = 9;

/// Decodes the tab-separated datapoint list exported by the vendor tool.
pub(crate) fn read_tsv<R>(reader: R) -> Result<Vec<RawDatapoint>>
where
	R: BufRead,
{
	let mut datapoints = Vec::new();
	for (index, line) in reader.lines().enumerate() {
		let line = line?;
		let line = line.trim_end_matches(['\r', '\n']);
		if line.is_empty() {
			continue;
		}

		let fields: Vec<&str> = line.split('\t').collect();
		if fields.len() != TSV_FIELDS {
			return Err(Error::InvalidRecord(format!(
				"record {} has {} fields, expected {TSV_FIELDS}",
				index + 1,
				fields.len()
			)));
		}

		datapoints.push(RawDatapoint {
			number: parse_field(index, "datapoint number", fields[0])?,
			name: collapse_whitespace(fields[1]),
			serial_number: parse_field(index, "serial number", fields[2])?,
			device_type: parse_field(index, "device type", fields[3])?,
			channel: parse_field(index, "channel", fields[4])?,
			mode: parse_field(index, "mode", fields[5])?,
			sensor: fields[6].trim() == "1",
		});
	}

	Ok(datapoints)
}

fn parse_field<T>(index: usize, what: &str, value: &str) -> Result<T>
where
	T: core::str::FromStr,
{
	value.trim().parse().map_err(|_| {
		Error::InvalidRecord(format!("record {}: invalid {what} {value:?}", index + 1))
	})
}
