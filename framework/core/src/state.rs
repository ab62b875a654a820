//! Wire-level enumerations exchanged with the charging module supervisor.
//!
//! Every enum decodes from the raw signal value with [`num_enum`]; values the
//! supervisor is not allowed to send (or that we do not know) collapse into
//! the `Sna` sentinel, which is also the power-on default of the decoded
//! snapshot.

use core::fmt;
use num_enum::{FromPrimitive, IntoPrimitive};

/// Supervisor state machine, decoded from `ChargeInfo::StateMachineState`.
#[derive(FromPrimitive, IntoPrimitive, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CmsState {
    Default = 0,
    Init = 1,
    Authentication = 2,
    Parameter = 3,
    Isolation = 4,
    PreCharge = 5,
    Charge = 6,
    Welding = 7,
    StopCharge = 8,
    SessionStop = 9,
    ShutOff = 10,
    Paused = 11,
    Error = 12,
    #[default]
    Sna = 15,
}

impl CmsState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CmsState::Default => "Default",
            CmsState::Init => "Init",
            CmsState::Authentication => "Authentication",
            CmsState::Parameter => "Parameter",
            CmsState::Isolation => "Isolation",
            CmsState::PreCharge => "PreCharge",
            CmsState::Charge => "Charge",
            CmsState::Welding => "Welding",
            CmsState::StopCharge => "StopCharge",
            CmsState::SessionStop => "SessionStop",
            CmsState::ShutOff => "ShutOff",
            CmsState::Paused => "Paused",
            CmsState::Error => "Error",
            CmsState::Sna => "SNA",
        }
    }
}

impl fmt::Display for CmsState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// IEC 61851 control pilot state.
#[derive(FromPrimitive, IntoPrimitive, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ControlPilotState {
    /// No vehicle connected.
    A = 0,
    /// Vehicle connected, not ready.
    B = 1,
    /// Vehicle connected, ready.
    C = 2,
    /// Charging with ventilation.
    D = 3,
    /// No power.
    E = 4,
    /// Error.
    F = 5,
    Invalid = 14,
    #[default]
    Sna = 15,
}

/// Status code of the off-board charger, from `EVSEDCStatus`.
#[derive(FromPrimitive, IntoPrimitive, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EvseStatusCode {
    NotReady = 0,
    Ready = 1,
    Shutdown = 2,
    UtilityInterruptEvent = 3,
    IsolationMonitoringActive = 4,
    EmergencyShutdown = 5,
    Malfunction = 6,
    #[default]
    Sna = 15,
}

/// Isolation monitoring result reported by the charger.
#[derive(FromPrimitive, IntoPrimitive, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EvseIsolationStatus {
    Invalid = 0,
    Valid = 1,
    Warning = 2,
    Fault = 3,
    NoImd = 4,
    Checking = 5,
    #[default]
    Sna = 7,
}

/// High-level charge protocol negotiated between EV and EVSE.
#[derive(FromPrimitive, IntoPrimitive, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChargeProtocol {
    NotDefined = 0,
    Din70121 = 1,
    Iso15118 = 2,
    NotSupported = 3,
    #[default]
    Sna = 15,
}

/// EV charge progress request, transmitted in `EVStatusControl`.
#[derive(FromPrimitive, IntoPrimitive, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChargeProgressIndication {
    Start = 0,
    Stop = 1,
    #[default]
    Sna = 3,
}

/// EV charge stop request, transmitted in `EVStatusControl`.
#[derive(FromPrimitive, IntoPrimitive, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChargeStopIndication {
    Terminate = 0,
    NoStop = 2,
    #[default]
    Sna = 3,
}

/// Battery Control Block request, transmitted in `EVStatusControl`.
#[derive(FromPrimitive, IntoPrimitive, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BcbControl {
    Stop = 0,
    Start = 1,
    #[default]
    Sna = 3,
}
