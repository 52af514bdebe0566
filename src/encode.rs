//! Frame encoders. Each builds a complete wire-ready frame, sync byte through checksum, as a
//! freshly allocated [`Vec<u8>`].

use crate::checksum::{crc8_dvb_s2, xor_checksum};
use crate::endian::write_u16_le;
use crate::error::Error;
use crate::packet::MspVersion;

/// The largest payload this crate will encode or decode. Chosen to keep `payload_len + 1`
/// (payload plus checksum byte) within the 1024-byte receive buffer.
pub const MAX_PAYLOAD_LEN: usize = 1023;

/// Encode a request for `version`, dispatching to the V1 or V2 wire format.
///
/// `command` is truncated to a single byte for V1; callers are expected to have already rejected
/// out-of-range V1 commands (see [`crate::device::validate_command`]).
pub(crate) fn encode_request(version: MspVersion, flag: u8, command: u16, payload: &[u8]) -> Result<Vec<u8>, Error> {
	match version {
		MspVersion::V1 => encode_v1_request(command as u8, payload),
		MspVersion::V2 => encode_v2_request(flag, command, payload),
	}
}

/// Build a V1 request frame, using the JUMBO size escape transparently for payloads over 254
/// bytes.
pub(crate) fn encode_v1_request(command: u8, payload: &[u8]) -> Result<Vec<u8>, Error> {
	if payload.len() > MAX_PAYLOAD_LEN {
		return Err(Error::PayloadTooLarge { len: payload.len(), max: MAX_PAYLOAD_LEN });
	}

	let jumbo = payload.len() > 254;
	let size_byte = if jumbo { 255 } else { payload.len() as u8 };

	let mut frame = Vec::with_capacity(6 + if jumbo { 2 } else { 0 } + payload.len());
	frame.extend_from_slice(b"$M<");
	frame.push(size_byte);
	frame.push(command);

	let mut checksummed = Vec::with_capacity(4 + payload.len());
	checksummed.push(size_byte);
	checksummed.push(command);

	if jumbo {
		let mut jumbo_len = [0u8; 2];
		write_u16_le(&mut jumbo_len, payload.len() as u16);
		frame.extend_from_slice(&jumbo_len);
		checksummed.extend_from_slice(&jumbo_len);
	}

	frame.extend_from_slice(payload);
	checksummed.extend_from_slice(payload);

	frame.push(xor_checksum(0, &checksummed));
	Ok(frame)
}

/// Build a V2 request frame.
pub(crate) fn encode_v2_request(flag: u8, command: u16, payload: &[u8]) -> Result<Vec<u8>, Error> {
	if payload.len() > MAX_PAYLOAD_LEN {
		return Err(Error::PayloadTooLarge { len: payload.len(), max: MAX_PAYLOAD_LEN });
	}

	let mut header_tail = [0u8; 4];
	write_u16_le(&mut header_tail[0..2], command);
	write_u16_le(&mut header_tail[2..4], payload.len() as u16);

	let mut frame = Vec::with_capacity(9 + payload.len());
	frame.extend_from_slice(b"$X<");
	frame.push(flag);
	frame.extend_from_slice(&header_tail);
	frame.extend_from_slice(payload);

	let mut checksummed = Vec::with_capacity(5 + payload.len());
	checksummed.push(flag);
	checksummed.extend_from_slice(&header_tail);
	checksummed.extend_from_slice(payload);

	frame.push(crc8_dvb_s2(0, &checksummed));
	Ok(frame)
}
