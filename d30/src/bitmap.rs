use std::fmt::{self, Debug, Formatter};

use crate::{Error, Result};

/// A monochrome bitmap, ready to be cut into bands.
///
/// Pixels are stored row-major, `true` means a dot is burned (black).
#[derive(Clone, PartialEq, Eq)]
pub struct MonoBitmap {
	width: usize,
	height: usize,
	pixels: Vec<bool>,
}

impl MonoBitmap {
	/// Create a bitmap from row-major pixels.
	/// The height is derived from `pixels.len() / width`, and may be zero.
	pub fn new(width: usize, pixels: Vec<bool>) -> Result<Self> {
		if width == 0 || width % 8 != 0 {
			return Err(Error::InvalidWidth(width));
		}

		let height = pixels.len() / width;
		let expected = width * height;
		if expected != pixels.len() {
			return Err(Error::InvalidDimensions(format!(
				"expected a multiple of {width} pixels, got {}",
				pixels.len()
			)));
		}

		Ok(Self {
			width,
			height,
			pixels,
		})
	}

	/// An all white bitmap.
	pub fn blank(width: usize, height: usize) -> Result<Self> {
		Self::new(width, vec![false; width * height])
	}

	pub fn width(&self) -> usize {
		self.width
	}

	pub fn height(&self) -> usize {
		self.height
	}

	pub fn pixels(&self) -> &[bool] {
		&self.pixels
	}

	pub fn is_empty(&self) -> bool {
		self.height == 0
	}

	pub fn get(&self, x: usize, y: usize) -> Option<bool> {
		if x >= self.width || y >= self.height {
			return None;
		}

		Some(self.pixels[y * self.width + x])
	}

	pub fn set(&mut self, x: usize, y: usize, value: bool) {
		if x < self.width && y < self.height {
			self.pixels[y * self.width + x] = value;
		}
	}

	pub fn row(&self, y: usize) -> Option<&[bool]> {
		if y >= self.height {
			return None;
		}
		Some(&self.pixels[y * self.width..(y + 1) * self.width])
	}

	/// Append blank rows until the height is a multiple of `rows`.
	/// An empty bitmap stays empty.
	pub fn pad_to_multiple(&mut self, rows: usize) {
		if rows == 0 {
			return;
		}
		let height = self.height.next_multiple_of(rows);
		self.pixels.resize(height * self.width, false);
		self.height = height;
	}

	/// Rows `start..end`, clamped to the bitmap.
	pub(crate) fn rows(&self, start: usize, end: usize) -> &[bool] {
		let end = end.min(self.height);
		&self.pixels[start * self.width..end * self.width]
	}
}

impl Debug for MonoBitmap {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f
			.debug_struct("MonoBitmap")
			.field("width", &self.width)
			.field("height", &self.height)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_bad_width() {
		assert!(matches!(MonoBitmap::new(0, vec![]), Err(Error::InvalidWidth(0))));
		assert!(matches!(MonoBitmap::new(12, vec![false; 24]), Err(Error::InvalidWidth(12))));
	}

	#[test]
	fn rejects_partial_rows() {
		assert!(matches!(
			MonoBitmap::new(8, vec![false; 12]),
			Err(Error::InvalidDimensions(_))
		));
	}

	#[test]
	fn zero_height_is_allowed() {
		let bmp = MonoBitmap::new(96, vec![]).unwrap();
		assert_eq!(bmp.height(), 0);
		assert!(bmp.is_empty());
		assert_eq!(bmp.row(0), None);
	}

	#[test]
	fn pad_to_multiple() {
		let mut bmp = MonoBitmap::new(8, vec![true; 8 * 5]).unwrap();
		bmp.pad_to_multiple(4);
		assert_eq!(bmp.height(), 8);
		assert_eq!(bmp.pixels().len(), 64);
		assert_eq!(bmp.get(0, 4), Some(true));
		assert_eq!(bmp.get(0, 5), Some(false));

		bmp.pad_to_multiple(4);
		assert_eq!(bmp.height(), 8);

		let mut empty = MonoBitmap::blank(8, 0).unwrap();
		empty.pad_to_multiple(320);
		assert!(empty.is_empty());
	}

	#[test]
	fn get_set() {
		let mut bmp = MonoBitmap::blank(16, 2).unwrap();
		bmp.set(3, 1, true);
		assert_eq!(bmp.get(3, 1), Some(true));
		assert_eq!(bmp.get(3, 0), Some(false));
		assert_eq!(bmp.get(16, 0), None);
		assert_eq!(bmp.get(0, 2), None);
		assert_eq!(bmp.row(1).unwrap()[3], true);
		assert_eq!(format!("{bmp:?}"), "MonoBitmap { width: 16, height: 2 }");
	}
}
