use crate::packet::MspPacket;

/// The error type returned by every fallible operation in this crate.
///
/// Two variants ([`Error::ChecksumMismatch`] and [`Error::Nack`]) attach the packet that was
/// actually decoded off the wire, so a caller can inspect what the responder sent even though the
/// transaction as a whole failed. `ReceiveTimeout`, `SyncNotFound`, `ChecksumMismatch` and `Nack`
/// are the "communication error" class: soft failures worth counting or retrying at the caller's
/// discretion. Everything else is fatal for the current operation.
#[derive(Debug)]
pub enum Error {
	/// A caller-supplied argument was invalid (bad retry count, command out of range for the
	/// configured version, and so on).
	InvalidArgument(String),
	/// A syscall on the transport failed. The OS error number, if any, is available through
	/// [`std::io::Error::raw_os_error`] on the wrapped value.
	Os(std::io::Error),
	/// `write` accepted fewer bytes than were given to it.
	ShortWrite { requested: usize, written: usize },
	/// Read retries were exhausted before the required bytes arrived.
	ReceiveTimeout,
	/// The sync byte (`'$'`) was not found within the search limit.
	SyncNotFound,
	/// The decoded checksum did not match the one computed over the received bytes.
	ChecksumMismatch(MspPacket),
	/// The responder replied with direction `'!'` (NACK). The decoded packet is attached.
	Nack(MspPacket),
	/// A payload (incoming or outgoing) would not fit in the fixed receive buffer.
	PayloadTooLarge { len: usize, max: usize },
	/// An operation requiring an open device was attempted on a closed one.
	NotOpen,
	/// `open` was called on a device that is already open.
	AlreadyOpen,
	/// An unreachable branch was hit; this indicates a bug in this crate.
	Internal(&'static str),
}

impl From<std::io::Error> for Error {
	fn from(other: std::io::Error) -> Self {
		if other.kind() == std::io::ErrorKind::TimedOut {
			Self::ReceiveTimeout
		} else {
			Self::Os(other)
		}
	}
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::InvalidArgument(message) => write!(f, "invalid argument: {}", message),
			Self::Os(error) => write!(f, "I/O error: {}", error),
			Self::ShortWrite { requested, written } => {
				write!(f, "short write: requested {} bytes, wrote {}", requested, written)
			},
			Self::ReceiveTimeout => write!(f, "timed out waiting for a response"),
			Self::SyncNotFound => write!(f, "sync byte not found within search limit"),
			Self::ChecksumMismatch(packet) => write!(
				f,
				"checksum mismatch: received {:#04x} for command {:#06x}",
				packet.checksum, packet.command
			),
			Self::Nack(packet) => write!(f, "responder sent NACK for command {:#06x}", packet.command),
			Self::PayloadTooLarge { len, max } => write!(f, "payload of {} bytes exceeds the {}-byte limit", len, max),
			Self::NotOpen => write!(f, "device is not open"),
			Self::AlreadyOpen => write!(f, "device is already open"),
			Self::Internal(message) => write!(f, "internal error (please report this): {}", message),
		}
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::Os(error) => Some(error),
			_ => None,
		}
	}
}

/// `true` for the "communication error" class: soft failures that a caller may reasonably retry
/// or count, as opposed to argument errors, OS errors, or internal bugs.
pub fn is_communication_error(error: &Error) -> bool {
	matches!(
		error,
		Error::ReceiveTimeout | Error::SyncNotFound | Error::ChecksumMismatch(_) | Error::Nack(_)
	)
}
