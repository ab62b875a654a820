#![deny(unsafe_code)]

pub mod error;
pub mod iface;
pub mod pcan;
pub mod sim;

pub use error::{Error, Result};
pub use iface::{CanBackend, CanEvent, CanInterface, ChannelInfo};
pub use pcan::PcanDriver;
pub use sim::SimulatedCan;
