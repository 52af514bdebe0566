//! The frame decoder: sync search, header parse, and checksum-validated body read.
//!
//! The state machine described in the design notes (`SyncSearch -> Header -> V1/V2 body`) is
//! implemented directly as a call chain rather than an explicit `enum State`, since every
//! transition here is unconditional and none of the states are ever revisited mid-frame.

use crate::checksum::{crc8_dvb_s2, xor_checksum};
use crate::endian::read_u16_le;
use crate::error::Error;
use crate::packet::{Direction, MspPacket, MspVersion};
use crate::transport::Transport;

/// Upper bound on sync bytes skipped while hunting for `'$'`. Not configurable: see the design
/// notes for why this is a fixed constant rather than part of the public API.
const SYNC_SEARCH_LIMIT: usize = 50;

/// Read one frame off `transport` into `scratch`, validating its checksum.
///
/// `scratch` is reused as payload storage across calls; it must be at least
/// [`crate::encode::MAX_PAYLOAD_LEN`] + 1 bytes long. Returns [`Error::Nack`] rather than `Ok` if
/// the decoded packet's direction is the NACK direction (`'!'`).
pub(crate) fn decode_packet<T: Transport + ?Sized>(
	transport: &mut T,
	scratch: &mut [u8],
	retries: u32,
) -> Result<MspPacket, Error> {
	find_sync(transport, retries)?;

	let mut header = [0u8; 2];
	transport.read_exact(&mut header, retries)?;
	let version = MspVersion::from_wire_byte(header[0]).ok_or(Error::Internal("unrecognized MSP version byte"))?;
	let direction =
		Direction::from_wire_byte(header[1]).ok_or(Error::Internal("unrecognized MSP direction byte"))?;

	let packet = match version {
		MspVersion::V1 => decode_v1_body(transport, scratch, retries, direction)?,
		MspVersion::V2 => decode_v2_body(transport, scratch, retries, direction)?,
	};

	if packet.is_nack() {
		Err(Error::Nack(packet))
	} else {
		Ok(packet)
	}
}

fn find_sync<T: Transport + ?Sized>(transport: &mut T, retries: u32) -> Result<(), Error> {
	let mut byte = [0u8; 1];
	for _ in 0..SYNC_SEARCH_LIMIT {
		transport.read_exact(&mut byte, retries)?;
		if byte[0] == b'$' {
			return Ok(());
		}
	}
	Err(Error::SyncNotFound)
}

fn decode_v1_body<T: Transport + ?Sized>(
	transport: &mut T,
	scratch: &mut [u8],
	retries: u32,
	direction: Direction,
) -> Result<MspPacket, Error> {
	let mut size_and_command = [0u8; 2];
	transport.read_exact(&mut size_and_command, retries)?;
	let size = size_and_command[0];
	let command = size_and_command[1];
	let mut seed = xor_checksum(0, &size_and_command);

	let payload_len = if size == 255 {
		let mut jumbo_len = [0u8; 2];
		transport.read_exact(&mut jumbo_len, retries)?;
		seed = xor_checksum(seed, &jumbo_len);
		read_u16_le(&jumbo_len) as usize
	} else {
		size as usize
	};

	if command == 255 {
		// A V1 frame whose command byte is 255 is not itself a packet: it is a tunnel carrying a
		// V2 frame. The V1 checksum built up above (including any JUMBO length bytes) is
		// discarded -- the V2 frame below has its own CRC covering its own header and payload,
		// and no known responder is confirmed to also validate a checksum over the tunnel's outer
		// V1 bytes.
		return decode_v2_body(transport, scratch, retries, direction);
	}

	read_body(transport, scratch, retries, payload_len, seed, xor_checksum, MspVersion::V1, direction, 0, command as u16)
}

fn decode_v2_body<T: Transport + ?Sized>(
	transport: &mut T,
	scratch: &mut [u8],
	retries: u32,
	direction: Direction,
) -> Result<MspPacket, Error> {
	let mut header = [0u8; 5];
	transport.read_exact(&mut header, retries)?;
	let seed = crc8_dvb_s2(0, &header);
	let flag = header[0];
	let command = read_u16_le(&header[1..3]);
	let payload_len = read_u16_le(&header[3..5]) as usize;

	read_body(transport, scratch, retries, payload_len, seed, crc8_dvb_s2, MspVersion::V2, direction, flag, command)
}

#[allow(clippy::too_many_arguments)]
fn read_body<T: Transport + ?Sized>(
	transport: &mut T,
	scratch: &mut [u8],
	retries: u32,
	payload_len: usize,
	seed: u8,
	checksum_fn: fn(u8, &[u8]) -> u8,
	version: MspVersion,
	direction: Direction,
	flag: u8,
	command: u16,
) -> Result<MspPacket, Error> {
	if payload_len + 1 > scratch.len() {
		return Err(Error::PayloadTooLarge { len: payload_len, max: scratch.len() - 1 });
	}

	let body = &mut scratch[..payload_len + 1];
	transport.read_exact(body, retries)?;
	let checksum = body[payload_len];
	let payload = body[..payload_len].to_vec();

	let computed = checksum_fn(seed, &payload);
	let packet = MspPacket { version, direction, flag, command, payload, checksum };

	if computed == checksum {
		Ok(packet)
	} else {
		Err(Error::ChecksumMismatch(packet))
	}
}
