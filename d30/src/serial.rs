//! RFCOMM device node backend.
//!
//! The printer must already be paired and bound, e.g.
//! `rfcomm connect 1 C4:1E:5E:37:5F:EE` creates `/dev/rfcomm1`.
//! Opening the node is what establishes the Bluetooth link, so it can block
//! for a long time if the printer is off or out of range.
use std::{
	fs::{File, OpenOptions},
	io::{self, Write},
	path::Path,
	sync::mpsc::{self, RecvTimeoutError},
	thread,
	time::Duration,
};

use crate::{Backend, Error, Result};

/// How long to wait for the link before giving up.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Device node created by `rfcomm connect 1 <MAC>`.
pub const DEFAULT_DEVICE: &str = "/dev/rfcomm1";

/// A serial (RFCOMM) backend for [`Printer`](crate::Printer).
pub struct SerialBackend {
	file: File,
}

impl SerialBackend {
	/// Open the device node, waiting at most `timeout`.
	///
	/// If the timeout expires, the helper thread doing the open is left behind
	/// and the descriptor is closed as soon as the open returns.
	pub fn open(path: impl AsRef<Path>, timeout: Duration) -> Result<Self> {
		let path = path.as_ref().to_path_buf();
		let device = path.display().to_string();
		let connection = |source| Error::Connection {
			device: device.clone(),
			source,
		};

		let (tx, rx) = mpsc::channel();
		thread::Builder::new()
			.name("d30-connect".into())
			.spawn(move || {
				let _ = tx.send(OpenOptions::new().write(true).open(&path));
			})
			.map_err(connection)?;

		let file = match rx.recv_timeout(timeout) {
			Ok(Ok(file)) => file,
			Ok(Err(e)) => return Err(connection(e)),
			Err(RecvTimeoutError::Timeout) => {
				return Err(connection(io::Error::new(
					io::ErrorKind::TimedOut,
					format!("no connection after {timeout:?}"),
				)));
			}
			Err(RecvTimeoutError::Disconnected) => {
				return Err(connection(io::Error::other("connect thread exited")));
			}
		};

		configure_raw(&file).map_err(connection)?;
		log::info!("connected to {device}");
		Ok(Self {
			file,
		})
	}
}

impl Backend for SerialBackend {
	fn write(&mut self, buf: &[u8]) -> io::Result<()> {
		self.file.write_all(buf)
	}

	fn flush(&mut self) -> io::Result<()> {
		self.file.flush()
	}
}

/// Put a tty into raw 8N1 mode. Non-tty files are left alone.
///
/// XON/XOFF must be off: 0x11 and 0x13 show up in both the handshake and raster data.
#[cfg(unix)]
fn configure_raw(file: &File) -> io::Result<()> {
	use std::{mem::MaybeUninit, os::unix::io::AsRawFd};

	let fd = file.as_raw_fd();
	if unsafe { libc::isatty(fd) } != 1 {
		log::debug!("not a tty, skipping termios setup");
		return Ok(());
	}

	let mut termios = MaybeUninit::uninit();
	if unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) } != 0 {
		return Err(io::Error::last_os_error());
	}
	let mut termios = unsafe { termios.assume_init() };

	termios.c_iflag &= !(libc::IGNBRK
		| libc::BRKINT
		| libc::PARMRK
		| libc::ISTRIP
		| libc::INLCR
		| libc::IGNCR
		| libc::ICRNL
		| libc::IXON
		| libc::IXOFF
		| libc::IXANY);
	termios.c_oflag &= !libc::OPOST;
	termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
	termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
	termios.c_cflag |= libc::CS8;

	if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) } != 0 {
		return Err(io::Error::last_os_error());
	}
	Ok(())
}

#[cfg(not(unix))]
fn configure_raw(_file: &File) -> io::Result<()> {
	Ok(())
}
