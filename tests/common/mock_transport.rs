use msp::{Error, Transport};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// An in-memory [`Transport`] backed by two shared byte queues.
///
/// [`MockTransport::responder_side`] returns a handle with the read/write queues swapped, letting
/// a test drive both ends of a link: one [`MockTransport`] plays the host and the other plays the
/// flight controller, each writing into the queue the other reads from.
#[derive(Clone)]
pub struct MockTransport {
	read_queue: Arc<Mutex<VecDeque<u8>>>,
	write_queue: Arc<Mutex<VecDeque<u8>>>,
	read_timeout: Duration,
}

impl MockTransport {
	pub fn new() -> Self {
		Self {
			read_queue: Arc::new(Mutex::new(VecDeque::new())),
			write_queue: Arc::new(Mutex::new(VecDeque::new())),
			read_timeout: Duration::from_millis(20),
		}
	}

	pub fn responder_side(&self) -> Self {
		Self {
			read_queue: self.write_queue.clone(),
			write_queue: self.read_queue.clone(),
			read_timeout: self.read_timeout,
		}
	}
}

impl Default for MockTransport {
	fn default() -> Self {
		Self::new()
	}
}

impl Transport for MockTransport {
	fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
		self.write_queue.lock().unwrap().extend(bytes.iter().copied());
		Ok(())
	}

	fn read(&mut self, buffer: &mut [u8]) -> Result<usize, Error> {
		let deadline = Instant::now() + self.read_timeout;
		loop {
			{
				let mut queue = self.read_queue.lock().unwrap();
				if !queue.is_empty() {
					let n = buffer.len().min(queue.len());
					for slot in buffer.iter_mut().take(n) {
						*slot = queue.pop_front().unwrap();
					}
					return Ok(n);
				}
			}
			if Instant::now() >= deadline {
				return Ok(0);
			}
			std::thread::sleep(Duration::from_millis(1));
		}
	}

	fn bytes_available(&self) -> Result<usize, Error> {
		Ok(self.read_queue.lock().unwrap().len())
	}

	fn drain_output(&mut self) -> Result<(), Error> {
		Ok(())
	}

	fn flush_input_and_output(&mut self) -> Result<(), Error> {
		self.read_queue.lock().unwrap().clear();
		self.write_queue.lock().unwrap().clear();
		Ok(())
	}
}
