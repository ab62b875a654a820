use ccs_core::state::{
    ChargeProtocol, CmsState, ControlPilotState, EvseIsolationStatus, EvseStatusCode,
};

/// The most recent decoded state of the charging module supervisor.
///
/// Every field starts at its SNA equivalent; only the inbound decode path
/// moves them. An SNA supervisor state is a legitimate startup value, not
/// an error.
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisorSnapshot {
    // ChargeInfo (0x0600)
    pub state: CmsState,
    /// 0..14 cycling, 15 = SNA.
    pub alive_counter: u8,
    pub control_pilot_state: ControlPilotState,
    /// Percent.
    pub control_pilot_duty_cycle: u8,
    pub charge_protocol: ChargeProtocol,
    pub proximity_pin_state: u8,
    pub s2_closed: bool,
    pub voltage_match: bool,
    pub evse_compatible: bool,
    pub tcp_connected: bool,
    pub bcb_status: u8,

    // EVSEDCMaxLimits (0x1400)
    pub evse_max_current: f64,
    pub evse_max_voltage: f64,
    pub evse_max_power: f64,
    /// Wh.
    pub evse_energy_to_be_delivered: f64,

    // EVSEDCRegulationLimits (0x1401)
    pub evse_min_current: f64,
    pub evse_min_voltage: f64,
    pub evse_peak_current_ripple: f64,
    pub evse_current_regulation_tolerance: f64,

    // EVSEDCStatus (0x1402)
    pub evse_present_voltage: f64,
    pub evse_present_current: f64,
    pub evse_isolation_status: EvseIsolationStatus,
    pub evse_status_code: EvseStatusCode,
    pub evse_notification: u8,
    pub evse_notification_max_delay: u16,
    pub evse_current_limit_achieved: bool,
    pub evse_voltage_limit_achieved: bool,
    pub evse_power_limit_achieved: bool,

    // ErrorCodes (0x2002)
    pub error_code_level0: u16,
    pub error_code_level1: u16,
    pub error_code_level2: u16,
    pub error_code_level3: u16,

    // SoftwareInfo (0x2001)
    pub sw_version_major: u8,
    pub sw_version_minor: u8,
    pub sw_version_patch: u8,
    pub sw_version_config: u8,

    // SLACInfo (0x2003)
    pub slac_state: u8,
    pub link_status: u8,
    /// dB.
    pub measured_attenuation: f64,
}

impl Default for SupervisorSnapshot {
    fn default() -> Self {
        Self {
            state: CmsState::Sna,
            alive_counter: 15,
            control_pilot_state: ControlPilotState::Sna,
            control_pilot_duty_cycle: 0,
            charge_protocol: ChargeProtocol::Sna,
            proximity_pin_state: 15,
            s2_closed: false,
            voltage_match: false,
            evse_compatible: false,
            tcp_connected: false,
            bcb_status: 0,
            evse_max_current: 0.0,
            evse_max_voltage: 0.0,
            evse_max_power: 0.0,
            evse_energy_to_be_delivered: 0.0,
            evse_min_current: 0.0,
            evse_min_voltage: 0.0,
            evse_peak_current_ripple: 0.0,
            evse_current_regulation_tolerance: 0.0,
            evse_present_voltage: 0.0,
            evse_present_current: 0.0,
            evse_isolation_status: EvseIsolationStatus::Sna,
            evse_status_code: EvseStatusCode::Sna,
            evse_notification: 3,
            evse_notification_max_delay: 0xFFFF,
            evse_current_limit_achieved: false,
            evse_voltage_limit_achieved: false,
            evse_power_limit_achieved: false,
            error_code_level0: 0,
            error_code_level1: 0,
            error_code_level2: 0,
            error_code_level3: 0,
            sw_version_major: 0,
            sw_version_minor: 0,
            sw_version_patch: 0,
            sw_version_config: 0,
            slac_state: 7,
            link_status: 3,
            measured_attenuation: 0.0,
        }
    }
}
