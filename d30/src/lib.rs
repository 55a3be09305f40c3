//! Driver for the Phomemo D30 thermal label printer.
//!
//! A print job goes through these stages:
//! [`preprocess()`] → [`split()`] → [`pack()`] → [`frame()`] → [`Printer::send_band()`].
//! [`Printer::print()`] runs everything after preprocessing.
use std::io;
#[cfg(feature = "serial")]
use std::{path::Path, time::Duration};

mod band;
mod bitmap;
mod error;
mod pack;
mod packet;
#[cfg(feature = "image")]
mod preprocess;
mod protocol;

pub use crate::{
	band::{split, Band, Bands},
	bitmap::MonoBitmap,
	error::{Error, Result},
	pack::{pack, PackedRow},
	packet::{encode, frame, Packet},
	protocol::Protocol,
};

#[cfg(feature = "image")]
pub use crate::preprocess::{decode, preprocess, scaled_height, Options};

macro_rules! backends {
	[$($(# [$($m:tt)*])? $mod:ident :: $name:ident),* $(,)?] => {
		$(
			$(# [$($m)*])*
			mod $mod;
			$(# [$($m)*])*
			pub use crate::$mod::$name;
		)*
	};
}

backends! [
	#[cfg(feature = "serial")]
	serial::SerialBackend,
	file::FileBackend,
];

#[cfg(feature = "serial")]
pub use crate::serial::{DEFAULT_DEVICE, DEFAULT_TIMEOUT};

/// Byte sink the printer is attached to.
///
/// The printer never answers, so a backend only needs to write and flush.
pub trait Backend {
	/// Write all of `buf`.
	fn write(&mut self, buf: &[u8]) -> io::Result<()>;

	/// Push buffered bytes out to the device.
	fn flush(&mut self) -> io::Result<()>;
}

/// Where a [`Printer`] is in its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
	Disconnected,
	Connected,
	Initialized,
	Printing,
	Closed,
}

/// A print session with one printer.
///
/// The transport has no flow control and the printer sends no
/// acknowledgements, so every write is flushed before the next one and
/// ordering is the only thing keeping the stream correct.
pub struct Printer {
	protocol: Protocol,
	backend: Option<Box<dyn Backend>>,
	state: State,
}

impl Printer {
	/// A session that is not connected to anything yet.
	pub fn new(protocol: Protocol) -> Self {
		Self {
			protocol,
			backend: None,
			state: State::Disconnected,
		}
	}

	/// A session that is already connected through `backend`.
	pub fn with_backend(protocol: Protocol, backend: impl Backend + 'static) -> Self {
		Self {
			protocol,
			backend: Some(Box::new(backend)),
			state: State::Connected,
		}
	}

	/// Connect to the RFCOMM device at `device`.
	#[cfg(feature = "serial")]
	pub fn open(protocol: Protocol, device: impl AsRef<Path>, timeout: Duration) -> Result<Self> {
		let mut printer = Self::new(protocol);
		printer.connect(device, timeout)?;
		Ok(printer)
	}

	/// Open the RFCOMM device, waiting at most `timeout` for the link.
	///
	/// On failure the session stays [`State::Disconnected`]; nothing is retried.
	#[cfg(feature = "serial")]
	pub fn connect(&mut self, device: impl AsRef<Path>, timeout: Duration) -> Result<()> {
		self.expect("connect", &[State::Disconnected])?;
		let backend = SerialBackend::open(device, timeout)?;
		self.backend = Some(Box::new(backend));
		self.transition(State::Connected);
		Ok(())
	}

	pub fn state(&self) -> State {
		self.state
	}

	pub fn protocol(&self) -> &Protocol {
		&self.protocol
	}

	fn transition(&mut self, state: State) {
		if self.state != state {
			log::debug!("{:?} -> {state:?}", self.state);
			self.state = state;
		}
	}

	fn expect(&self, op: &'static str, allowed: &[State]) -> Result<()> {
		if allowed.contains(&self.state) {
			Ok(())
		} else {
			Err(Error::InvalidState {
				op,
				state: self.state,
			})
		}
	}

	/// Write `buf` and flush it. A failure tears down the session.
	fn send(&mut self, op: &'static str, buf: &[u8]) -> Result<()> {
		let Some(backend) = self.backend.as_mut() else {
			return Err(Error::InvalidState {
				op,
				state: self.state,
			});
		};

		log::trace!("send({}{buf:x?});", buf.len());
		let res = backend.write(buf).and_then(|()| backend.flush());
		if let Err(e) = res {
			log::error!("{op} failed, abandoning job: {e}");
			self.close();
			return Err(Error::Transport(e));
		}
		Ok(())
	}

	/// Send the initialization handshake.
	/// This has to be done once, before any band is sent.
	pub fn initialize(&mut self) -> Result<()> {
		self.expect("initialize", &[State::Connected])?;
		let handshake = self.protocol.handshake;
		for seq in handshake {
			self.send("initialize", seq)?;
		}
		self.transition(State::Initialized);
		Ok(())
	}

	/// Send one framed band.
	///
	/// Bands must be sent in top to bottom order, the printer has no way to
	/// tell them apart.
	pub fn send_band(&mut self, packet: &Packet) -> Result<()> {
		self.expect("send band", &[State::Initialized, State::Printing])?;
		self.send("send band", packet.as_bytes())?;
		self.transition(State::Printing);
		Ok(())
	}

	/// Print a whole bitmap, returning the number of bands sent.
	///
	/// The bitmap must already be exactly [`Protocol::width`] dots wide.
	/// An empty bitmap sends nothing.
	pub fn print(&mut self, bitmap: &MonoBitmap) -> Result<usize> {
		self.expect("print", &[State::Initialized, State::Printing])?;
		if bitmap.width() != self.protocol.width {
			return Err(Error::InvalidDimensions(format!(
				"bitmap is {} dots wide, {} expects {}",
				bitmap.width(),
				self.protocol.name,
				self.protocol.width
			)));
		}

		let packets = encode(bitmap, &self.protocol)?;
		log::debug!("printing {:?} as {} bands", bitmap, packets.len());
		for (i, packet) in packets.iter().enumerate() {
			log::trace!("sending band {i}...");
			self.send_band(packet)?;
		}
		Ok(packets.len())
	}

	/// Release the transport. Can be called any number of times.
	pub fn close(&mut self) {
		self.backend = None;
		self.transition(State::Closed);
	}
}

impl std::fmt::Debug for Printer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f
			.debug_struct("Printer")
			.field("protocol", &self.protocol.name)
			.field("state", &self.state)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;
	use std::{cell::RefCell, rc::Rc};

	#[derive(Debug, Clone, PartialEq, Eq)]
	enum Event {
		Write(Vec<u8>),
		Flush,
	}

	#[derive(Default, Clone)]
	struct Recorder {
		events: Rc<RefCell<Vec<Event>>>,
		/// Number of writes that succeed before every write fails.
		fail_after: Option<usize>,
	}

	impl Recorder {
		fn events(&self) -> Vec<Event> {
			self.events.borrow().clone()
		}

		fn writes(&self) -> Vec<Vec<u8>> {
			self.events()
				.into_iter()
				.filter_map(|e| match e {
					Event::Write(b) => Some(b),
					Event::Flush => None,
				})
				.collect()
		}
	}

	impl Backend for Recorder {
		fn write(&mut self, buf: &[u8]) -> io::Result<()> {
			let n = self.writes().len();
			if self.fail_after.is_some_and(|max| n >= max) {
				return Err(io::Error::new(io::ErrorKind::BrokenPipe, "link lost"));
			}
			self.events.borrow_mut().push(Event::Write(buf.to_vec()));
			Ok(())
		}

		fn flush(&mut self) -> io::Result<()> {
			self.events.borrow_mut().push(Event::Flush);
			Ok(())
		}
	}

	fn handshake_events() -> Vec<Event> {
		Protocol::D30_V1
			.handshake
			.iter()
			.flat_map(|seq| [Event::Write(seq.to_vec()), Event::Flush])
			.collect()
	}

	fn session(protocol: Protocol) -> (Printer, Recorder) {
		let rec = Recorder::default();
		(Printer::with_backend(protocol, rec.clone()), rec)
	}

	#[test]
	fn handshake_is_written_and_flushed_in_order() {
		let (mut printer, rec) = session(Protocol::D30_V1);
		assert_eq!(printer.state(), State::Connected);
		printer.initialize().unwrap();
		assert_eq!(printer.state(), State::Initialized);
		assert_eq!(rec.events(), handshake_events());
	}

	#[test]
	fn handshake_only_once() {
		let (mut printer, rec) = session(Protocol::D30_V1);
		printer.initialize().unwrap();
		assert!(matches!(
			printer.initialize(),
			Err(Error::InvalidState { state: State::Initialized, .. })
		));
		printer.print(&MonoBitmap::blank(96, 4).unwrap()).unwrap();
		printer.print(&MonoBitmap::blank(96, 4).unwrap()).unwrap();
		assert_eq!(rec.events()[..14].to_vec(), handshake_events());
		assert_eq!(rec.writes().len(), 7 + 2);
	}

	#[test]
	fn all_black_band() {
		let proto = Protocol::D30_V1.with_band_height(8);
		let (mut printer, rec) = session(proto);
		printer.initialize().unwrap();
		let bmp = MonoBitmap::new(96, vec![true; 96 * 8]).unwrap();
		assert_eq!(printer.print(&bmp).unwrap(), 1);
		assert_eq!(printer.state(), State::Printing);

		let mut expected = handshake_events();
		let mut packet = proto.band_header.to_vec();
		packet.extend([0xff; 96]);
		expected.push(Event::Write(packet));
		expected.push(Event::Flush);
		assert_eq!(rec.events(), expected);
	}

	#[test]
	fn empty_bitmap_still_handshakes() {
		let (mut printer, rec) = session(Protocol::D30_V1);
		printer.initialize().unwrap();
		assert_eq!(printer.print(&MonoBitmap::blank(96, 0).unwrap()).unwrap(), 0);
		assert_eq!(rec.events(), handshake_events());
		assert_eq!(printer.state(), State::Initialized);
	}

	#[test]
	fn bands_arrive_top_to_bottom() {
		let proto = Protocol::D30_V1.with_band_height(1);
		let (mut printer, rec) = session(proto);
		printer.initialize().unwrap();

		// row y has dot y set
		let mut bmp = MonoBitmap::blank(96, 20).unwrap();
		for y in 0..20 {
			bmp.set(y, y, true);
		}
		assert_eq!(printer.print(&bmp).unwrap(), 20);

		let packets = &rec.writes()[7..];
		assert_eq!(packets.len(), 20);
		for (y, p) in packets.iter().enumerate() {
			let payload = &p[14..];
			assert_eq!(payload[y / 8], 0x80 >> (y % 8), "band {y}");
			assert_eq!(payload.iter().filter(|&&b| b != 0).count(), 1);
		}
	}

	#[test]
	fn band_before_handshake_is_rejected() {
		let (mut printer, rec) = session(Protocol::D30_V1);
		let packet = frame(Protocol::D30_V1.band_header, &[]);
		assert!(matches!(
			printer.send_band(&packet),
			Err(Error::InvalidState { state: State::Connected, .. })
		));
		assert!(matches!(
			printer.print(&MonoBitmap::blank(96, 1).unwrap()),
			Err(Error::InvalidState { .. })
		));
		assert!(rec.events().is_empty());
	}

	#[test]
	fn disconnected_session_cannot_do_anything() {
		let mut printer = Printer::new(Protocol::D30_V1);
		assert_eq!(printer.state(), State::Disconnected);
		assert!(matches!(printer.initialize(), Err(Error::InvalidState { .. })));
		let packet = frame(Protocol::D30_V1.band_header, &[]);
		assert!(matches!(printer.send_band(&packet), Err(Error::InvalidState { .. })));
	}

	#[test]
	fn wrong_width_is_rejected() {
		let (mut printer, _rec) = session(Protocol::D30_V1);
		printer.initialize().unwrap();
		assert!(matches!(
			printer.print(&MonoBitmap::blank(48, 4).unwrap()),
			Err(Error::InvalidDimensions(_))
		));
	}

	#[test]
	fn transport_failure_ends_the_job() {
		let rec = Recorder {
			fail_after: Some(8),
			..Recorder::default()
		};
		let mut printer = Printer::with_backend(Protocol::D30_V1.with_band_height(2), rec.clone());
		printer.initialize().unwrap();

		let bmp = MonoBitmap::new(96, vec![true; 96 * 6]).unwrap();
		assert!(matches!(printer.print(&bmp), Err(Error::Transport(_))));
		assert_eq!(printer.state(), State::Closed);
		// handshake plus the first band only
		assert_eq!(rec.writes().len(), 8);

		let packet = frame(Protocol::D30_V1.band_header, &[]);
		assert!(matches!(
			printer.send_band(&packet),
			Err(Error::InvalidState { state: State::Closed, .. })
		));
	}

	#[test]
	fn failed_handshake_closes() {
		let rec = Recorder {
			fail_after: Some(3),
			..Recorder::default()
		};
		let mut printer = Printer::with_backend(Protocol::D30_V1, rec.clone());
		assert!(matches!(printer.initialize(), Err(Error::Transport(_))));
		assert_eq!(printer.state(), State::Closed);
		assert_eq!(rec.writes().len(), 3);
	}

	#[test]
	fn close_is_idempotent() {
		let (mut printer, _rec) = session(Protocol::D30_V1);
		printer.close();
		assert_eq!(printer.state(), State::Closed);
		printer.close();
		assert_eq!(printer.state(), State::Closed);
		assert!(matches!(printer.initialize(), Err(Error::InvalidState { .. })));

		let mut printer = Printer::new(Protocol::D30_V1);
		printer.close();
		assert_eq!(printer.state(), State::Closed);
	}

	#[cfg(feature = "serial")]
	#[test]
	fn unreachable_device() {
		let mut printer = Printer::new(Protocol::D30_V1);
		let err = printer
			.connect("/nonexistent/rfcomm1", Duration::from_secs(1))
			.err()
			.unwrap();
		assert!(matches!(err, Error::Connection { .. }));
		assert_eq!(printer.state(), State::Disconnected);

		assert!(Printer::open(Protocol::D30_V1, "/nonexistent/rfcomm1", Duration::from_secs(1)).is_err());
	}

	#[cfg(feature = "serial")]
	#[test]
	fn connect_twice_is_rejected() {
		let (mut printer, _rec) = session(Protocol::D30_V1);
		assert!(matches!(
			printer.connect("/dev/null", DEFAULT_TIMEOUT),
			Err(Error::InvalidState { state: State::Connected, .. })
		));
	}
}
