use std::{
	fs::File,
	io::{self, Write},
	path::Path,
};

use crate::{Backend, Error, Result};

/// Writes the raw command stream into a regular file instead of a printer.
///
/// Useful for dry runs: the file can later be replayed with
/// `cat dump.bin > /dev/rfcomm1`.
pub struct FileBackend {
	file: File,
}

impl FileBackend {
	/// Create (or truncate) the file at `path`.
	pub fn create(path: &Path) -> Result<Self> {
		let file = File::create(path).map_err(|source| Error::Connection {
			device: path.display().to_string(),
			source,
		})?;
		Ok(Self {
			file,
		})
	}
}

impl Backend for FileBackend {
	fn write(&mut self, buf: &[u8]) -> io::Result<()> {
		self.file.write_all(buf)
	}

	fn flush(&mut self) -> io::Result<()> {
		self.file.flush()
	}
}
