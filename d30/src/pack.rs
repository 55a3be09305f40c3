use crate::{Band, Error, Result};

/// One bitmap row, 8 dots per byte.
///
/// The leftmost dot of each group is bit 7, the rightmost is bit 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedRow(Vec<u8>);

impl PackedRow {
	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}

	/// Unpack back into dots, left to right.
	pub fn pixels(&self) -> impl Iterator<Item = bool> + '_ {
		self.0
			.iter()
			.flat_map(|b| (0..8).map(move |i| b & (128 >> i) != 0))
	}
}

fn pack_row(row: &[bool]) -> PackedRow {
	let bytes = row
		.chunks_exact(8)
		.map(|chunk| {
			chunk.iter().enumerate().fold(0u8, |mut acc, (i, c)| {
				if *c {
					acc |= 128 >> i;
				}
				acc
			})
		})
		.collect();
	PackedRow(bytes)
}

/// Pack every row of `band`.
pub fn pack(band: &Band<'_>) -> Result<Vec<PackedRow>> {
	if band.width() == 0 || band.width() % 8 != 0 {
		return Err(Error::InvalidWidth(band.width()));
	}

	Ok(band.rows().map(pack_row).collect())
}
