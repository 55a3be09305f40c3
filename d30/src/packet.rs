use crate::{band, pack, MonoBitmap, PackedRow, Protocol, Result};

/// A complete print command: the band header followed by packed rows.
///
/// Every band gets its own packet, nothing is reused between bands.
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
	bytes: Vec<u8>,
	header_len: usize,
}

impl Packet {
	pub fn header(&self) -> &[u8] {
		&self.bytes[..self.header_len]
	}

	pub fn payload(&self) -> &[u8] {
		&self.bytes[self.header_len..]
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.bytes
	}

	pub fn len(&self) -> usize {
		self.bytes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.bytes.is_empty()
	}
}

impl std::fmt::Debug for Packet {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f
			.debug_struct("Packet")
			.field("header", &format_args!("{:02x?}", self.header()))
			.field("payload_len", &self.payload().len())
			.finish()
	}
}

/// Prepend `header` to the rows, in row order.
pub fn frame(header: &[u8], rows: &[PackedRow]) -> Packet {
	let payload_len: usize = rows.iter().map(|r| r.as_bytes().len()).sum();
	let mut bytes = Vec::with_capacity(header.len() + payload_len);
	bytes.extend_from_slice(header);
	for row in rows {
		bytes.extend_from_slice(row.as_bytes());
	}

	Packet {
		bytes,
		header_len: header.len(),
	}
}

/// Turn a whole bitmap into the packets to send, in transmission order.
pub fn encode(bitmap: &MonoBitmap, protocol: &Protocol) -> Result<Vec<Packet>> {
	band::split(bitmap, protocol.band_height)?
		.map(|band| {
			let rows = pack::pack(&band)?;
			Ok(frame(protocol.band_header, &rows))
		})
		.collect()
}
