//! [`MspDevice`], the single entry point this crate exposes for talking to a responder.

use std::path::Path;
use std::sync::Mutex;

use crate::encode::encode_request;
use crate::decode::decode_packet;
use crate::error::Error;
use crate::packet::{MspPacket, MspVersion};
use crate::transport::{OpenTransport, Serial2Transport, Transport};

const RX_BUFFER_LEN: usize = 1024;
const DEFAULT_READ_RETRIES: u32 = 3;

struct Inner<T> {
	transport: Option<T>,
	version: MspVersion,
	read_retries: u32,
	buffer: Box<[u8; RX_BUFFER_LEN]>,
}

/// A handle to one MSP link.
///
/// `MspDevice` is `Send + Sync`: every public method acquires an internal [`Mutex`] before
/// touching the transport or receive buffer, so callers on different threads are serialized
/// rather than left to race. A single handle supports any number of concurrent callers; it is not
/// necessary (and not useful) to wrap it in another mutex or `Arc` beyond what's needed to share
/// the handle itself across threads.
///
/// The mutex is not reentrant. Do not call back into this device from a callback or drop
/// implementation invoked while a device method is already on the stack on the same thread --
/// doing so deadlocks. This is primarily a concern for host-language bindings built on top of this
/// crate where garbage collection or a signal handler could run arbitrary code at an unexpected
/// point; see the crate-level documentation for the general shape of that hazard.
pub struct MspDevice<T: Transport = Serial2Transport> {
	path: String,
	inner: Mutex<Inner<T>>,
}

impl MspDevice<Serial2Transport> {
	/// Open `path` as an MSP link over a real serial port.
	///
	/// `read_retries` defaults to 3 if `None`; it must be greater than zero otherwise.
	/// `version` defaults to [`MspVersion::V1`] if `None`.
	pub fn open(path: impl AsRef<Path>, read_retries: Option<u32>, version: Option<MspVersion>) -> Result<Self, Error> {
		let read_retries = validate_retries(read_retries)?;
		let version = version.unwrap_or(MspVersion::V1);
		let transport = Serial2Transport::open(path.as_ref())?;
		Ok(Self::from_parts(path.as_ref().to_string_lossy().into_owned(), transport, read_retries, version))
	}
}

impl<T: OpenTransport> MspDevice<T> {
	/// Open `path` as an MSP link through an arbitrary [`OpenTransport`].
	///
	/// Identical to [`MspDevice::open`] except generic over the transport; used by callers (and
	/// tests) that need something other than [`Serial2Transport`].
	pub fn open_with<P: AsRef<Path>>(path: P, read_retries: Option<u32>, version: Option<MspVersion>) -> Result<Self, Error> {
		let read_retries = validate_retries(read_retries)?;
		let version = version.unwrap_or(MspVersion::V1);
		let transport = T::open(path.as_ref())?;
		Ok(Self::from_parts(path.as_ref().to_string_lossy().into_owned(), transport, read_retries, version))
	}

	/// Re-open the transport after a prior [`MspDevice::close`], reusing this handle's path,
	/// configured version and retry count.
	pub fn reopen(&self) -> Result<(), Error> {
		let mut inner = self.inner.lock().unwrap();
		if inner.transport.is_some() {
			return Err(Error::AlreadyOpen);
		}
		inner.transport = Some(T::open(Path::new(&self.path))?);
		Ok(())
	}
}

impl<T: Transport> MspDevice<T> {
	/// Build a device handle around an already-open transport. Used by tests and by callers
	/// supplying a [`Transport`] implementation that isn't [`OpenTransport`].
	pub fn with_transport(
		path: impl Into<String>,
		transport: T,
		read_retries: Option<u32>,
		version: Option<MspVersion>,
	) -> Result<Self, Error> {
		let read_retries = validate_retries(read_retries)?;
		let version = version.unwrap_or(MspVersion::V1);
		Ok(Self::from_parts(path.into(), transport, read_retries, version))
	}

	fn from_parts(path: String, transport: T, read_retries: u32, version: MspVersion) -> Self {
		Self {
			path,
			inner: Mutex::new(Inner { transport: Some(transport), version, read_retries, buffer: Box::new([0u8; RX_BUFFER_LEN]) }),
		}
	}

	/// The device path this handle was opened with.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// The MSP version this device encodes requests as.
	pub fn version(&self) -> MspVersion {
		self.inner.lock().unwrap().version
	}

	/// `true` if the transport is currently open.
	pub fn is_open(&self) -> bool {
		self.inner.lock().unwrap().transport.is_some()
	}

	/// Close the link.
	///
	/// Closing an already-closed device logs a warning and returns `Ok(())` rather than failing:
	/// `close` is treated as a recoverable, idempotent operation.
	pub fn close(&self) -> Result<(), Error> {
		let mut inner = self.inner.lock().unwrap();
		if inner.transport.take().is_none() {
			warn!("close() called on a device that is already closed: {}", self.path);
		}
		Ok(())
	}

	/// Send `command` with `payload`, optionally waiting for the response.
	///
	/// `wait_for_ack` selects between MSP's two request shapes: `false` fires the request and
	/// returns immediately (`Ok(None)`), `true` additionally drains the responder's reply and
	/// returns it. `flag` is ignored for [`MspVersion::V1`] devices.
	pub fn set(&self, command: u16, payload: &[u8], flag: u8, wait_for_ack: bool) -> Result<Option<MspPacket>, Error> {
		let mut inner = self.inner.lock().unwrap();
		let Inner { transport, version, read_retries, buffer } = &mut *inner;
		let transport = transport.as_mut().ok_or(Error::NotOpen)?;
		validate_command(*version, command)?;

		transport.flush_input_and_output()?;
		let frame = encode_request(*version, flag, command, payload)?;
		transport.write(&frame)?;

		if !wait_for_ack {
			return Ok(None);
		}

		transport.drain_output()?;
		let packet = decode_packet(transport, buffer.as_mut_slice(), *read_retries)?;
		Ok(Some(packet))
	}

	/// Send a `get` request for `command` and wait for its response.
	///
	/// Equivalent to `set(command, &[], flag, true)` except it unwraps the `Option`, since a
	/// `get` always waits for a reply.
	pub fn get(&self, command: u16, flag: u8) -> Result<MspPacket, Error> {
		self.set(command, &[], flag, true)?.ok_or(Error::Internal("get() did not produce a response packet"))
	}
}

fn validate_retries(read_retries: Option<u32>) -> Result<u32, Error> {
	match read_retries {
		None => Ok(DEFAULT_READ_RETRIES),
		Some(0) => Err(Error::InvalidArgument("read_retries must be greater than zero".to_string())),
		Some(n) => Ok(n),
	}
}

fn validate_command(version: MspVersion, command: u16) -> Result<(), Error> {
	if version == MspVersion::V1 && command > 0xFF {
		Err(Error::InvalidArgument(format!("command {} does not fit in the 8-bit MSP V1 command field", command)))
	} else {
		Ok(())
	}
}
