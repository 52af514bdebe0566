//! The [`Transport`] trait abstracts the serial link so the frame decoder and the transaction
//! manager can be tested against an in-memory mock (see `tests/common/mock_transport.rs`)
//! without a real serial port.

use std::path::Path;
use std::time::Duration;

use crate::error::Error;

/// 115200 8N1, no flow control -- the line configuration this crate always requests.
pub const BAUD_RATE: u32 = 115_200;

/// `VMIN=0, VTIME=1` in POSIX termios terms: a single read call returns after this long even if
/// no bytes arrived.
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Everything the frame codec and transaction manager need from the serial link.
///
/// All methods may block the calling thread on OS I/O. Implementations are not expected to be
/// reentrant; [`crate::MspDevice`] is the layer that makes a [`Transport`] safely shareable across
/// threads by guarding it with a mutex.
pub trait Transport: Send {
	/// A single write call. Returns [`Error::ShortWrite`] if fewer bytes were accepted than
	/// given, rather than looping to finish the write -- the transaction manager does not retry
	/// writes.
	fn write(&mut self, bytes: &[u8]) -> Result<(), Error>;

	/// A single read call bounded by the transport's configured per-read timeout. Returns `Ok(0)`
	/// on timeout rather than an error; never blocks longer than one timeout period.
	fn read(&mut self, buffer: &mut [u8]) -> Result<usize, Error>;

	/// Non-blocking count of bytes currently queued for reading.
	fn bytes_available(&self) -> Result<usize, Error>;

	/// Block until all previously written bytes have left the OS-side output queue.
	fn drain_output(&mut self) -> Result<(), Error>;

	/// Discard queued input and not-yet-sent output.
	fn flush_input_and_output(&mut self) -> Result<(), Error>;

	/// Fill `buffer` completely, issuing up to `retries` calls to [`Transport::read`]. Each call
	/// -- including ones that time out and return zero bytes -- consumes one retry. Returns
	/// [`Error::ReceiveTimeout`] if `buffer` is not completely filled once retries are exhausted.
	fn read_exact(&mut self, buffer: &mut [u8], retries: u32) -> Result<(), Error> {
		let mut filled = 0;
		for _ in 0..retries {
			if filled == buffer.len() {
				break;
			}
			filled += self.read(&mut buffer[filled..])?;
		}
		if filled == buffer.len() {
			Ok(())
		} else {
			Err(Error::ReceiveTimeout)
		}
	}
}

/// A [`Transport`] that can also be opened fresh from a device path.
///
/// Split out from [`Transport`] itself so that a [`crate::MspDevice`] can be generic over mock
/// transports that are constructed directly by a test rather than opened from a path.
pub trait OpenTransport: Transport + Sized {
	fn open(path: &Path) -> Result<Self, Error>;
}

/// Production [`Transport`] backed by the `serial2` crate.
pub struct Serial2Transport {
	port: serial2::SerialPort,
}

impl Serial2Transport {
	/// Open `path` at 115200 baud with a ~100 ms read timeout. `serial2`'s default line
	/// configuration (8N1, no flow control) matches what MSP expects, so only the baud rate needs
	/// setting explicitly.
	pub fn open(path: &Path) -> Result<Self, Error> {
		let port = serial2::SerialPort::open(path, BAUD_RATE)?;

		let mut settings = port.get_configuration()?;
		settings.set_baud_rate(BAUD_RATE)?;
		port.set_configuration(&settings)?;

		port.set_read_timeout(READ_TIMEOUT)?;

		Ok(Self { port })
	}
}

impl OpenTransport for Serial2Transport {
	fn open(path: &Path) -> Result<Self, Error> {
		Serial2Transport::open(path)
	}
}

impl Transport for Serial2Transport {
	fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
		use std::io::Write;
		let written = self.port.write(bytes)?;
		if written != bytes.len() {
			return Err(Error::ShortWrite { requested: bytes.len(), written });
		}
		Ok(())
	}

	fn read(&mut self, buffer: &mut [u8]) -> Result<usize, Error> {
		use std::io::Read;
		match self.port.read(buffer) {
			Ok(n) => Ok(n),
			Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
			Err(e) => Err(Error::from(e)),
		}
	}

	fn bytes_available(&self) -> Result<usize, Error> {
		#[cfg(unix)]
		{
			use std::os::unix::io::AsRawFd;
			let mut pending: libc::c_int = 0;
			// SAFETY: `pending` is a valid `c_int` for the duration of the call and the fd is
			// owned by `self.port`.
			let result = unsafe { libc::ioctl(self.port.as_raw_fd(), libc::FIONREAD, &mut pending) };
			if result != 0 {
				return Err(Error::from(std::io::Error::last_os_error()));
			}
			Ok(pending as usize)
		}
		#[cfg(not(unix))]
		{
			Err(Error::Internal("bytes_available() is only implemented on unix targets"))
		}
	}

	fn drain_output(&mut self) -> Result<(), Error> {
		use std::io::Write;
		self.port.flush()?;
		Ok(())
	}

	fn flush_input_and_output(&mut self) -> Result<(), Error> {
		self.port.discard_input_buffer()?;
		self.port.discard_output_buffer()?;
		Ok(())
	}
}
