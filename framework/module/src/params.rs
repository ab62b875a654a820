use ccs_core::state::{BcbControl, ChargeProgressIndication, ChargeStopIndication};

/// The VCU setpoints transmitted on every cycle.
///
/// Power-on values keep the module passive: zero setpoints, progress
/// `Stop`, no stop request armed, plug status at SNA. The supervisor will
/// not start a session until the mandatory signals leave their SNA values.
#[derive(Debug, Clone, PartialEq)]
pub struct VcuParameters {
    // EVDCMaxLimits (0x1300)
    pub max_current: f64,
    pub max_voltage: f64,
    pub max_power: f64,
    /// Percent.
    pub full_soc: f64,
    /// Percent.
    pub bulk_soc: f64,

    // EVDCChargeTargets (0x1301)
    pub target_current: f64,
    pub target_voltage: f64,
    pub precharge_voltage: f64,

    // EVStatusControl (0x1302)
    pub charge_progress: ChargeProgressIndication,
    pub charge_stop: ChargeStopIndication,
    pub ev_ready: bool,
    pub welding_detection_enable: bool,
    /// 0 = DIN only.
    pub charge_protocol_priority: u8,
    pub bcb_control: BcbControl,

    // EVStatusDisplay (0x1303)
    pub soc: f64,
    pub error_code: u8,
    pub charging_complete: bool,
    pub bulk_charging_complete: bool,
    pub cabin_conditioning: bool,
    pub ress_conditioning: bool,
    /// Seconds.
    pub time_to_full_soc: u32,
    /// Seconds.
    pub time_to_bulk_soc: u32,

    // EVPlugStatus (0x1304)
    pub control_pilot_state: u8,
    pub control_pilot_duty_cycle: u8,
    pub proximity_pin_state: u8,

    // EVDCEnergyLimits (0x1305)
    /// Wh.
    pub energy_capacity: f64,
    /// Wh.
    pub energy_request: f64,
}

impl Default for VcuParameters {
    fn default() -> Self {
        Self {
            max_current: 0.0,
            max_voltage: 0.0,
            max_power: 0.0,
            full_soc: 100.0,
            bulk_soc: 80.0,
            target_current: 0.0,
            target_voltage: 0.0,
            precharge_voltage: 0.0,
            charge_progress: ChargeProgressIndication::Stop,
            charge_stop: ChargeStopIndication::NoStop,
            ev_ready: false,
            welding_detection_enable: false,
            charge_protocol_priority: 0,
            bcb_control: BcbControl::Stop,
            soc: 0.0,
            error_code: 0,
            charging_complete: false,
            bulk_charging_complete: false,
            cabin_conditioning: false,
            ress_conditioning: false,
            time_to_full_soc: 0,
            time_to_bulk_soc: 0,
            control_pilot_state: 15,
            control_pilot_duty_cycle: 0,
            proximity_pin_state: 15,
            energy_capacity: 0.0,
            energy_request: 0.0,
        }
    }
}

impl VcuParameters {
    /// Force the fields the supervisor reads as "do not charge".
    pub(crate) fn enter_safe_state(&mut self) {
        self.ev_ready = false;
        self.charge_progress = ChargeProgressIndication::Stop;
        self.charge_stop = ChargeStopIndication::Terminate;
    }
}
