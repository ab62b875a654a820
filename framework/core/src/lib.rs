#![deny(unsafe_code)]

pub mod event;
pub mod frame;
pub mod ids;
pub mod state;

pub use frame::{CanFrame, CanStatus};
