/// The two MSP wire variants this crate understands.
///
/// The variants carry the wire byte used to distinguish them in the packet header (`'M'` or
/// `'X'`) for convenient round-tripping between parsed and raw forms.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum MspVersion {
	V1,
	V2,
}

impl MspVersion {
	/// The second header byte identifying this version on the wire.
	pub fn wire_byte(self) -> u8 {
		match self {
			MspVersion::V1 => b'M',
			MspVersion::V2 => b'X',
		}
	}

	pub(crate) fn from_wire_byte(byte: u8) -> Option<Self> {
		match byte {
			b'M' => Some(MspVersion::V1),
			b'X' => Some(MspVersion::V2),
			_ => None,
		}
	}
}

/// The direction byte carried by every MSP frame.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Direction {
	/// `'<'`: host to responder.
	ToResponder,
	/// `'>'`: responder to host, success.
	FromResponder,
	/// `'!'`: responder to host, error/NACK.
	Error,
}

impl Direction {
	pub(crate) fn wire_byte(self) -> u8 {
		match self {
			Direction::ToResponder => b'<',
			Direction::FromResponder => b'>',
			Direction::Error => b'!',
		}
	}

	pub(crate) fn from_wire_byte(byte: u8) -> Option<Self> {
		match byte {
			b'<' => Some(Direction::ToResponder),
			b'>' => Some(Direction::FromResponder),
			b'!' => Some(Direction::Error),
			_ => None,
		}
	}
}

/// A fully decoded MSP packet.
///
/// Returned by the decoder on every successful parse (including NACKs, which are additionally
/// surfaced as [`crate::Error::Nack`] wrapping one of these). The payload is an owned [`Vec<u8>`]
/// copied out of the device's internal receive buffer; it has no lifetime tied to the device that
/// produced it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MspPacket {
	pub version: MspVersion,
	pub direction: Direction,
	/// Only meaningful for [`MspVersion::V2`]; always `0` for V1 packets.
	pub flag: u8,
	/// The command/function ID. V1 only ever carries an 8-bit command widened into this field.
	pub command: u16,
	pub payload: Vec<u8>,
	/// The checksum byte as received on the wire (already validated by the time a caller sees it,
	/// except when attached to [`crate::Error::ChecksumMismatch`]).
	pub checksum: u8,
}

impl MspPacket {
	pub fn is_nack(&self) -> bool {
		self.direction == Direction::Error
	}
}
