//! Conversion of rendered images into [`MonoBitmap`]s.
//!
//! The printer burns a dot for every `1` bit, so dark pixels become `true`.
use std::io::Cursor;

use image::{
	imageops::{self, ColorMap, FilterType},
	DynamicImage, GrayImage, ImageReader, Luma,
};

use crate::{Error, MonoBitmap, Result};

/// How grayscale is turned into dots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
	/// Pixels darker than this are printed.
	pub threshold: u8,

	/// Print light pixels instead of dark ones.
	pub invert: bool,

	/// Diffuse the quantization error (Floyd-Steinberg) before thresholding.
	pub dither: bool,
}

impl Default for Options {
	fn default() -> Self {
		Self {
			threshold: 0x80,
			invert: false,
			dither: false,
		}
	}
}

struct BlackWhiteMap(u8);

impl ColorMap for BlackWhiteMap {
	type Color = Luma<u8>;

	fn index_of(&self, color: &Self::Color) -> usize {
		if color.0[0] >= self.0 {
			1
		} else {
			0
		}
	}

	fn map_color(&self, color: &mut Self::Color) {
		let idx = self.index_of(color);
		if let Some(c) = self.lookup(idx) {
			*color = c;
		}
	}

	fn lookup(&self, index: usize) -> Option<Self::Color> {
		match index {
			0 => Some(Luma([0x00])),
			1 => Some(Luma([0xff])),
			_ => None,
		}
	}

	fn has_lookup(&self) -> bool {
		true
	}
}

/// Decode an encoded image (PNG, JPEG, ...), guessing the format from its contents.
pub fn decode(data: &[u8]) -> Result<DynamicImage> {
	ImageReader::new(Cursor::new(data))
		.with_guessed_format()
		.map_err(|e| Error::UnsupportedImageFormat(e.to_string()))?
		.decode()
		.map_err(|e| Error::UnsupportedImageFormat(e.to_string()))
}

/// Height after scaling a `w`x`h` image to `target_width`, rounded up.
pub fn scaled_height(w: u32, h: u32, target_width: u32) -> Result<u32> {
	if w == 0 {
		return Err(Error::InvalidDimensions("source image has zero width".into()));
	}
	let scaled = (u64::from(h) * u64::from(target_width)).div_ceil(u64::from(w));
	u32::try_from(scaled).map_err(|_| {
		Error::InvalidDimensions(format!("{w}x{h} scales to {scaled} rows at width {target_width}"))
	})
}

fn resize(img: GrayImage, target_width: u32) -> Result<GrayImage> {
	let (w, h) = img.dimensions();
	if w == 0 || h == 0 {
		return Err(Error::InvalidDimensions(format!("source image is {w}x{h}")));
	}

	if w == target_width {
		return Ok(img);
	}

	let height = scaled_height(w, h, target_width)?;
	if height == 0 {
		return Err(Error::InvalidDimensions(format!(
			"{w}x{h} scales to zero rows at width {target_width}"
		)));
	}

	log::trace!("resizing {w}x{h} to {target_width}x{height}");
	Ok(imageops::resize(&img, target_width, height, FilterType::Gaussian))
}

/// Scale `image` to `target_width` dots and threshold it into a bitmap.
pub fn preprocess(image: &DynamicImage, target_width: usize, opts: &Options) -> Result<MonoBitmap> {
	if target_width == 0 || target_width % 8 != 0 {
		return Err(Error::InvalidWidth(target_width));
	}

	let mut img = resize(image.to_luma8(), target_width as u32)?;

	if opts.dither {
		log::trace!("dithering...");
		imageops::dither(&mut img, &BlackWhiteMap(opts.threshold));
	}

	let pixels = img
		.pixels()
		.map(|c| (c.0[0] < opts.threshold) ^ opts.invert)
		.collect();

	MonoBitmap::new(target_width, pixels)
}
