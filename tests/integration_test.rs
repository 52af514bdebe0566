use assert2::{assert, let_assert};
use msp::{Error, MspDevice, MspVersion, Transport};
use std::sync::atomic::{AtomicBool, Ordering::Relaxed};
use std::sync::Arc;
use std::thread;

mod common;
use common::mock_transport::MockTransport;

/// Respond to every request on `transport` with `command`/`payload` echoed back, until `stop` is
/// set. Simulates a flight controller that always succeeds.
fn run_echo_responder(mut transport: MockTransport, version: MspVersion, stop: Arc<AtomicBool>) -> thread::JoinHandle<()> {
	thread::spawn(move || {
		let mut scratch = [0u8; 1024];
		while !stop.load(Relaxed) {
			match msp_decode_request(&mut transport, &mut scratch) {
				Some((command, payload)) => {
					let frame = encode_response(version, command, &payload);
					transport.write(&frame).unwrap();
				},
				None => continue,
			}
		}
	})
}

// Minimal request-side decoder for the responder thread: reads a V1 or V2 request frame (always
// direction '<') and returns its command and payload, ignoring checksums since the responder's
// job here is only to echo, not to validate what the test harness sent.
fn msp_decode_request(transport: &mut MockTransport, scratch: &mut [u8]) -> Option<(u16, Vec<u8>)> {
	let mut byte = [0u8; 1];
	for _ in 0..50 {
		if transport.read(&mut byte).ok()? == 0 {
			continue;
		}
		if byte[0] == b'$' {
			break;
		}
		return None;
	}
	if byte[0] != b'$' {
		return None;
	}

	let mut header = [0u8; 2];
	if read_exact_blocking(transport, &mut header) == 0 {
		return None;
	}
	match header[0] {
		b'M' => {
			let mut size_and_command = [0u8; 2];
			read_exact_blocking(transport, &mut size_and_command);
			let size = size_and_command[0] as usize;
			let command = size_and_command[1] as u16;
			let body = &mut scratch[..size + 1];
			read_exact_blocking(transport, body);
			Some((command, body[..size].to_vec()))
		},
		b'X' => {
			let mut head = [0u8; 5];
			read_exact_blocking(transport, &mut head);
			let command = u16::from(head[1]) | (u16::from(head[2]) << 8);
			let len = usize::from(head[3]) | (usize::from(head[4]) << 8);
			let body = &mut scratch[..len + 1];
			read_exact_blocking(transport, body);
			Some((command, body[..len].to_vec()))
		},
		_ => None,
	}
}

fn read_exact_blocking(transport: &mut MockTransport, buffer: &mut [u8]) -> usize {
	let mut filled = 0;
	while filled < buffer.len() {
		match transport.read(&mut buffer[filled..]) {
			Ok(0) => continue,
			Ok(n) => filled += n,
			Err(_) => break,
		}
	}
	filled
}

fn encode_response(version: MspVersion, command: u16, payload: &[u8]) -> Vec<u8> {
	match version {
		MspVersion::V1 => {
			let mut frame = vec![b'$', b'M', b'>'];
			frame.push(payload.len() as u8);
			frame.push(command as u8);
			frame.extend_from_slice(payload);
			let checksum = frame[3..].iter().fold(0u8, |acc, &b| acc ^ b);
			frame.push(checksum);
			frame
		},
		MspVersion::V2 => {
			let mut frame = vec![b'$', b'X', b'>', 0];
			frame.push((command & 0xFF) as u8);
			frame.push((command >> 8) as u8);
			frame.push((payload.len() & 0xFF) as u8);
			frame.push((payload.len() >> 8) as u8);
			frame.extend_from_slice(payload);
			let checksum = crc8_dvb_s2(&frame[3..]);
			frame.push(checksum);
			frame
		},
	}
}

fn crc8_dvb_s2(data: &[u8]) -> u8 {
	let mut crc = 0u8;
	for &byte in data {
		crc ^= byte;
		for _ in 0..8 {
			crc = if crc & 0x80 != 0 { (crc << 1) ^ 0xD5 } else { crc << 1 };
		}
	}
	crc
}

#[test]
fn test_get_roundtrips_through_mock_responder() {
	let host_transport = MockTransport::new();
	let responder_transport = host_transport.responder_side();
	let stop = Arc::new(AtomicBool::new(false));
	let responder = run_echo_responder(responder_transport, MspVersion::V1, stop.clone());

	let device = MspDevice::with_transport("mock", host_transport, None, None).unwrap();
	let_assert!(Ok(packet) = device.get(108, 0));
	assert!(packet.command == 108);
	assert!(packet.payload.is_empty());

	stop.store(true, Relaxed);
	responder.join().unwrap();
}

#[test]
fn test_set_with_payload_roundtrips_v2() {
	let host_transport = MockTransport::new();
	let responder_transport = host_transport.responder_side();
	let stop = Arc::new(AtomicBool::new(false));
	let responder = run_echo_responder(responder_transport, MspVersion::V2, stop.clone());

	let device = MspDevice::with_transport("mock", host_transport, None, Some(MspVersion::V2)).unwrap();
	let_assert!(Ok(Some(packet)) = device.set(0x1F40, &[1, 2, 3, 4], 0, true));
	assert!(packet.command == 0x1F40);
	assert!(packet.payload == [1, 2, 3, 4]);

	stop.store(true, Relaxed);
	responder.join().unwrap();
}

#[test]
fn test_set_without_wait_for_ack_returns_immediately_and_does_not_block() {
	// No responder running at all: if `set` with `wait_for_ack = false` tried to read a response
	// it would hang on the mock's read timeout.
	let host_transport = MockTransport::new();
	let device = MspDevice::with_transport("mock", host_transport, None, None).unwrap();
	let_assert!(Ok(None) = device.set(108, &[], 0, false));
}

#[test]
fn test_concurrent_callers_each_get_their_own_response() {
	let host_transport = MockTransport::new();
	let responder_transport = host_transport.responder_side();
	let stop = Arc::new(AtomicBool::new(false));
	let responder = run_echo_responder(responder_transport, MspVersion::V1, stop.clone());

	let device = Arc::new(MspDevice::with_transport("mock", host_transport, Some(20), None).unwrap());
	let handles: Vec<_> = (0..6)
		.map(|i| {
			let device = Arc::clone(&device);
			thread::spawn(move || {
				let command = 1 + i as u16;
				let packet = device.get(command, 0).unwrap();
				assert!(packet.command == command);
			})
		})
		.collect();

	for handle in handles {
		handle.join().unwrap();
	}

	stop.store(true, Relaxed);
	responder.join().unwrap();
}

#[test]
fn test_receive_timeout_without_responder() {
	let host_transport = MockTransport::new();
	let device = MspDevice::with_transport("mock", host_transport, Some(2), None).unwrap();
	assert!(matches!(device.get(108, 0), Err(Error::ReceiveTimeout)));
}

#[test]
fn test_close_then_operation_fails_then_reopen_rejected_while_open() {
	let host_transport = MockTransport::new();
	let device = MspDevice::with_transport("mock", host_transport, None, None).unwrap();
	assert!(device.is_open());
	device.close().unwrap();
	assert!(!device.is_open());
	assert!(matches!(device.set(108, &[], 0, false), Err(Error::NotOpen)));
}

#[test]
fn test_v1_rejects_high_commands_before_touching_transport() {
	let host_transport = MockTransport::new();
	let device = MspDevice::with_transport("mock", host_transport, None, Some(MspVersion::V1)).unwrap();
	assert!(matches!(device.set(0x1F40, &[], 0, false), Err(Error::InvalidArgument(_))));
}

#[test]
fn test_stale_bytes_queued_before_request_do_not_corrupt_the_response() {
	// Simulate a flight controller that already has noise sitting in the host's receive buffer
	// (a previous, never-read telemetry push, line noise, whatever) before the host ever issues a
	// request. `flush_input_and_output` at the top of `set`/`get` is what's supposed to discard it.
	let host_transport = MockTransport::new();
	let mut responder_transport = host_transport.responder_side();
	responder_transport.write(&[0xFF; 37]).unwrap();
	responder_transport.write(b"$M>garbage-that-looks-like-a-frame-but-isnt").unwrap();

	let stop = Arc::new(AtomicBool::new(false));
	let responder = run_echo_responder(responder_transport, MspVersion::V1, stop.clone());

	let device = MspDevice::with_transport("mock", host_transport, None, None).unwrap();
	let_assert!(Ok(packet) = device.get(108, 0));
	assert!(packet.command == 108);
	assert!(packet.payload.is_empty());

	stop.store(true, Relaxed);
	responder.join().unwrap();
}

#[test]
fn test_responder_codec_matches_real_encoder() {
	let frame = encode_response(MspVersion::V1, 108, &[9, 9]);
	assert!(frame == [b'$', b'M', b'>', 2, 108, 9, 9, 108 ^ 9 ^ 9]);
}
