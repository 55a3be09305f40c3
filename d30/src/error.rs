use std::io;

use thiserror::Error;

use crate::State;

/// Everything that can go wrong between a rendered image and the printer.
#[derive(Debug, Error)]
pub enum Error {
	/// The device could not be opened within the connect timeout.
	#[error("cannot connect to {device}: {source}")]
	Connection {
		device: String,
		#[source]
		source: io::Error,
	},

	/// The input could not be decoded as an image.
	#[error("unsupported image format: {0}")]
	UnsupportedImageFormat(String),

	#[error("invalid dimensions: {0}")]
	InvalidDimensions(String),

	/// Bitmap width is zero or not a multiple of 8.
	#[error("width must be non-zero and divisible by 8, got {0}")]
	InvalidWidth(usize),

	/// A write or flush failed after the session was set up.
	/// The job cannot be resumed, the printer has already fed paper.
	#[error("transport failure: {0}")]
	Transport(#[source] io::Error),

	#[error("cannot {op} while {state:?}")]
	InvalidState {
		op: &'static str,
		state: State,
	},
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
