//! The uniform transport interface and the backend sum type.

use std::sync::mpsc::Receiver;

use ccs_core::{CanFrame, CanStatus};
use delegate::delegate;

use crate::error::Result;
use crate::pcan::PcanDriver;
use crate::sim::SimulatedCan;

/// Asynchronous notifications published by a transport backend.
#[derive(Debug, Clone, PartialEq)]
pub enum CanEvent {
    /// A frame arrived from the bus.
    Frame(CanFrame),
    /// The channel status changed (duplicates are possible on the
    /// hardware path).
    Status(CanStatus),
}

/// A selectable channel advertised by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub name: String,
    pub handle: u16,
    pub description: String,
}

/// Uniform interface over the hardware driver and the simulator.
///
/// Received frames and status transitions are delivered through the event
/// stream handed out by [`subscribe`](CanInterface::subscribe); the
/// publishing side never blocks on a slow consumer.
pub trait CanInterface: Send {
    /// Open the given channel at `baud_rate` bit/s and start the receiver.
    fn open(&mut self, channel: u16, baud_rate: u32) -> Result<()>;

    /// Stop the receiver and release the channel. Idempotent.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Enqueue one outgoing frame.
    fn write(&self, frame: &CanFrame) -> Result<()>;

    /// Channels that can currently be opened.
    fn available_channels(&mut self) -> Vec<ChannelInfo>;

    fn status(&self) -> CanStatus;

    /// The most recent backend error string, if any.
    fn last_error(&self) -> Option<String>;

    /// Register a subscriber for received frames and status transitions.
    fn subscribe(&self) -> Receiver<CanEvent>;
}

/// The two transport flavors of the system.
///
/// Which backend drives a session is a domain-level choice made at
/// connection time, so it is modeled as a plain sum instead of trait
/// objects.
pub enum CanBackend {
    Pcan(PcanDriver),
    Simulated(SimulatedCan),
}

impl CanInterface for CanBackend {
    delegate! {
        to match self {
            CanBackend::Pcan(driver) => driver,
            CanBackend::Simulated(sim) => sim,
        } {
            fn open(&mut self, channel: u16, baud_rate: u32) -> Result<()>;
            fn close(&mut self);
            fn is_open(&self) -> bool;
            fn write(&self, frame: &CanFrame) -> Result<()>;
            fn available_channels(&mut self) -> Vec<ChannelInfo>;
            fn status(&self) -> CanStatus;
            fn last_error(&self) -> Option<String>;
            fn subscribe(&self) -> Receiver<CanEvent>;
        }
    }
}
