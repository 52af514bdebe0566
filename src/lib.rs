//! A host-side client for the Multi-Wii Serial Protocol (MSP), the binary request/response
//! protocol spoken by flight controllers such as Betaflight, iNAV and Cleanflight over a serial
//! link.
//!
//! The crate exposes one type, [`MspDevice`], wrapping a [`Transport`] (a real serial port by
//! default, see [`Serial2Transport`]) behind a mutex so it can be shared across threads. Requests
//! are built and parsed by the [`MspVersion::V1`] and [`MspVersion::V2`] wire codecs; both are
//! supported transparently through the same [`MspDevice::get`] / [`MspDevice::set`] calls, chosen
//! by the `version` given to [`MspDevice::open`].
//!
//! ```no_run
//! use msp::{MspDevice, MspVersion};
//!
//! # fn main() -> Result<(), msp::Error> {
//! let device = MspDevice::open("/dev/ttyUSB0", None, Some(MspVersion::V2))?;
//! let packet = device.get(0x1F40, 0)?;
//! println!("received {} bytes", packet.payload.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Binding this crate across a garbage-collected runtime
//!
//! [`MspDevice`] serializes every operation behind an internal, non-reentrant mutex. That is safe
//! for ordinary multi-threaded Rust callers, but it is a deadlock hazard for a host-language
//! binding (Python, Node, etc.) whose garbage collector, signal handler, or async reactor can run
//! arbitrary user code at an unpredictable point: if that code calls back into the same
//! [`MspDevice`] while one of its methods is already on the call stack on the same OS thread, the
//! second call blocks forever on a mutex its own caller holds. Bindings should make sure no
//! finalizer, `Drop` glue, or interrupt callback can reach a device method while another one of
//! its own calls is in progress on that thread -- typically by keeping device calls off of
//! finalizer/GC threads entirely, or by routing them through a dedicated worker thread that owns
//! the device exclusively.

#[macro_use]
mod log;

mod checksum;
mod decode;
mod device;
mod encode;
mod endian;
mod error;
mod packet;
mod transport;

pub use device::MspDevice;
pub use error::{is_communication_error, Error};
pub use packet::{Direction, MspPacket, MspVersion};
pub use transport::{OpenTransport, Serial2Transport, Transport};

pub use checksum::{crc8_dvb_s2, xor_checksum};
