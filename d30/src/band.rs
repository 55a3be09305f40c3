use crate::{Error, MonoBitmap, Result};

/// A horizontal slice of a [`MonoBitmap`], sent to the printer as one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band<'a> {
	first_row: usize,
	width: usize,
	pixels: &'a [bool],
}

impl<'a> Band<'a> {
	/// Wrap raw row-major pixels.
	/// Trailing pixels that don't fill a whole row are ignored.
	pub fn new(first_row: usize, width: usize, pixels: &'a [bool]) -> Self {
		Self {
			first_row,
			width,
			pixels,
		}
	}

	/// Index of this band's top row within the source bitmap.
	pub fn first_row(&self) -> usize {
		self.first_row
	}

	pub fn width(&self) -> usize {
		self.width
	}

	pub fn height(&self) -> usize {
		if self.width == 0 {
			0
		} else {
			self.pixels.len() / self.width
		}
	}

	/// Iterate over the rows of this band, top to bottom.
	pub fn rows(&self) -> impl Iterator<Item = &'a [bool]> + '_ {
		let width = self.width.max(1);
		self.pixels.chunks_exact(width).take(self.height())
	}
}

/// Iterator returned by [`split()`].
#[derive(Debug, Clone)]
pub struct Bands<'a> {
	bitmap: &'a MonoBitmap,
	max_height: usize,
	next_row: usize,
}

impl<'a> Iterator for Bands<'a> {
	type Item = Band<'a>;

	fn next(&mut self) -> Option<Self::Item> {
		let start = self.next_row;
		if start >= self.bitmap.height() {
			return None;
		}

		let end = (start + self.max_height).min(self.bitmap.height());
		self.next_row = end;
		Some(Band::new(start, self.bitmap.width(), self.bitmap.rows(start, end)))
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		let left = self.bitmap.height() - self.next_row.min(self.bitmap.height());
		let n = left.div_ceil(self.max_height);
		(n, Some(n))
	}
}

impl ExactSizeIterator for Bands<'_> {}

/// Cut `bitmap` into bands of at most `max_height` rows, top to bottom.
///
/// The printer renders bands in the order they arrive, so this order is the
/// transmission order. An empty bitmap yields no bands.
pub fn split(bitmap: &MonoBitmap, max_height: usize) -> Result<Bands<'_>> {
	if max_height == 0 {
		return Err(Error::InvalidDimensions("band height must be non-zero".into()));
	}

	Ok(Bands {
		bitmap,
		max_height,
		next_row: 0,
	})
}
