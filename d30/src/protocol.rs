/// Wire constants for one printer firmware.
///
/// The handshake and band header were sniffed from the vendor's Android app.
/// They carry no structure this crate relies on and must be sent byte for byte.
/// If a firmware revision changes them, add a new constant next to
/// [`Protocol::D30_V1`] instead of editing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Protocol {
	pub name: &'static str,

	/// Physical print width in dots.
	pub width: usize,

	/// Maximum number of rows sent in one packet.
	pub band_height: usize,

	/// Sent once per session, each sequence written and flushed on its own.
	pub handshake: &'static [&'static [u8]],

	/// Prepended to every band.
	pub band_header: &'static [u8],
}

impl Protocol {
	/// Phomemo D30, 96 dots (12mm) wide.
	///
	/// The header ends in `GS v 0` with 12 bytes per row and 0x0140 rows,
	/// which is where the 320 row band height comes from.
	pub const D30_V1: Self = Self {
		name: "Phomemo D30",
		width: 96,
		band_height: 320,
		handshake: &[
			&[0x1f, 0x11, 0x38],
			&[0x1f, 0x11, 0x12, 0x1f, 0x11, 0x13],
			&[0x1f, 0x11, 0x09],
			&[0x1f, 0x11, 0x11],
			&[0x1f, 0x11, 0x19],
			&[0x1f, 0x11, 0x07],
			&[0x1f, 0x11, 0x0a, 0x1f, 0x11, 0x02, 0x02],
		],
		band_header: &[
			0x1f, 0x11, 0x24, 0x00,
			0x1b, 0x40,
			0x1d, 0x76, 0x30, 0x00, 0x0c, 0x00, 0x40, 0x01,
		],
	};

	/// Same constants, different row limit per packet.
	pub const fn with_band_height(self, band_height: usize) -> Self {
		Self {
			band_height,
			..self
		}
	}

	/// Bytes per packed row.
	pub const fn width_bytes(&self) -> usize {
		self.width / 8
	}
}

impl Default for Protocol {
	fn default() -> Self {
		Self::D30_V1
	}
}
