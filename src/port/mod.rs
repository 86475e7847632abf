//! Port abstraction layer for serial communication.
//!
//! Provides the `SerialPortAdapter` trait, a real implementation over the
//! `serialport` crate, and a mock device for tests.

pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use mock::{MockDevice, MockPortOpener, MockSerialPort};
pub use sync_port::*;
pub use traits::*;
