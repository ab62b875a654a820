use core::fmt;
use std::time::Instant;

/// Maximum payload size of a classic CAN frame in octets.
pub const MAX_FRAME_DATA: usize = 8;

/// Mask selecting the 29 identifier bits of an extended frame.
pub const EXTENDED_ID_MASK: u32 = 0x1FFF_FFFF;

/// Mask selecting the 11 identifier bits of a standard frame.
pub const STANDARD_ID_MASK: u32 = 0x7FF;

/// A single CAN 2.0 frame as it travels between the VCU and the charging
/// module supervisor.
///
/// The payload is always carried as eight octets; bytes at and beyond
/// `dlc` are unspecified. Frames are plain values, stamped with a
/// monotonic timestamp when they are produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanFrame {
    /// Canonical identifier (29 bits extended, 11 bits standard).
    pub id: u32,
    /// `true` for an extended (29-bit) identifier.
    pub extended: bool,
    /// Data length code, 0..=8.
    pub dlc: u8,
    /// Payload octets.
    pub data: [u8; MAX_FRAME_DATA],
    /// Monotonic capture/creation time.
    pub timestamp: Instant,
}

impl CanFrame {
    fn with(id: u32, extended: bool, data: &[u8]) -> Self {
        let dlc = data.len().min(MAX_FRAME_DATA);
        let mut payload = [0u8; MAX_FRAME_DATA];
        payload[..dlc].copy_from_slice(&data[..dlc]);
        Self {
            id,
            extended,
            dlc: dlc as u8,
            data: payload,
            timestamp: Instant::now(),
        }
    }

    /// Construct an extended frame from the given payload (truncated to 8 octets).
    pub fn new_extended(id: u32, data: &[u8]) -> Self {
        Self::with(id & EXTENDED_ID_MASK, true, data)
    }

    /// Construct a standard frame from the given payload (truncated to 8 octets).
    pub fn new_standard(id: u32, data: &[u8]) -> Self {
        Self::with(id & STANDARD_ID_MASK, false, data)
    }

    /// The payload octets covered by the data length code.
    pub fn payload(&self) -> &[u8] {
        &self.data[..usize::from(self.dlc.min(MAX_FRAME_DATA as u8))]
    }

    /// Space-separated uppercase hex rendering of the payload, e.g. `D0 07 00`.
    pub fn hex_string(&self) -> String {
        let mut out = String::with_capacity(3 * usize::from(self.dlc));
        for (i, byte) in self.payload().iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&format!("{byte:02X}"));
        }
        out
    }

    /// Identifier rendered as uppercase hex, 8 digits extended / 3 digits standard.
    pub fn id_string(&self) -> String {
        if self.extended {
            format!("{:08X}", self.id)
        } else {
            format!("{:03X}", self.id)
        }
    }
}

impl Default for CanFrame {
    fn default() -> Self {
        Self {
            id: 0,
            extended: false,
            dlc: 0,
            data: [0u8; MAX_FRAME_DATA],
            timestamp: Instant::now(),
        }
    }
}

impl fmt::Display for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.id_string(),
            self.dlc,
            self.hex_string()
        )
    }
}

/// Health of a CAN channel as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanStatus {
    Ok,
    BusWarning,
    BusPassive,
    BusOff,
    Error,
    #[default]
    Disconnected,
}

impl CanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanStatus::Ok => "OK",
            CanStatus::BusWarning => "Bus Warning",
            CanStatus::BusPassive => "Bus Passive",
            CanStatus::BusOff => "Bus Off",
            CanStatus::Error => "Error",
            CanStatus::Disconnected => "Disconnected",
        }
    }
}

impl fmt::Display for CanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "embedded-can")]
mod embedded {
    use super::{CanFrame, MAX_FRAME_DATA};
    use embedded_can::{ExtendedId, Frame, Id, StandardId};

    impl Frame for CanFrame {
        fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
            if data.len() > MAX_FRAME_DATA {
                return None;
            }
            Some(match id.into() {
                Id::Standard(id) => CanFrame::new_standard(u32::from(id.as_raw()), data),
                Id::Extended(id) => CanFrame::new_extended(id.as_raw(), data),
            })
        }

        // Remote frames do not exist on the charge-control bus.
        fn new_remote(_id: impl Into<Id>, _dlc: usize) -> Option<Self> {
            None
        }

        fn is_extended(&self) -> bool {
            self.extended
        }

        fn is_remote_frame(&self) -> bool {
            false
        }

        fn id(&self) -> Id {
            if self.extended {
                ExtendedId::new(self.id).map_or(Id::Standard(StandardId::ZERO), Id::Extended)
            } else {
                StandardId::new(self.id as u16).map_or(Id::Standard(StandardId::ZERO), Id::Standard)
            }
        }

        fn dlc(&self) -> usize {
            usize::from(self.dlc)
        }

        fn data(&self) -> &[u8] {
            self.payload()
        }
    }
}
