//! Engine behavior that needs no live transport: defaults, setter
//! clamping, high-level actions, and the inbound decode path driven
//! through `process_frame`.

mod common;

use ccs_core::state::{
    ChargeProgressIndication, ChargeProtocol, ChargeStopIndication, CmsState, ControlPilotState,
    EvseIsolationStatus, EvseStatusCode,
};
use ccs_core::CanFrame;
use ccs_module::{ChargeController, EngineConfig, EngineEvent, SafetyEvent};

fn controller() -> ChargeController {
    let controller = ChargeController::new(EngineConfig::default());
    controller.set_database(common::database());
    controller
}

#[test]
fn initial_vcu_parameters_are_passive() {
    let controller = controller();
    let params = controller.vcu_parameters();
    assert_eq!(params.max_current, 0.0);
    assert_eq!(params.max_voltage, 0.0);
    assert_eq!(params.target_current, 0.0);
    assert_eq!(params.target_voltage, 0.0);
    assert!(!params.ev_ready);
    assert_eq!(params.charge_progress, ChargeProgressIndication::Stop);
    assert_eq!(params.charge_stop, ChargeStopIndication::NoStop);
    assert_eq!(params.soc, 0.0);
    assert_eq!(params.error_code, 0);
    assert_eq!(params.full_soc, 100.0);
    assert_eq!(params.bulk_soc, 80.0);
    assert_eq!(params.control_pilot_state, 15);
    assert_eq!(params.proximity_pin_state, 15);
}

#[test]
fn initial_supervisor_snapshot_is_sna() {
    let controller = controller();
    let snapshot = controller.supervisor();
    assert_eq!(snapshot.state, CmsState::Sna);
    assert_eq!(snapshot.alive_counter, 15);
    assert_eq!(snapshot.control_pilot_state, ControlPilotState::Sna);
    assert_eq!(snapshot.evse_status_code, EvseStatusCode::Sna);
    assert_eq!(snapshot.evse_present_voltage, 0.0);
    assert_eq!(snapshot.evse_notification_max_delay, 0xFFFF);
    assert_eq!(snapshot.slac_state, 7);
    assert!(!controller.is_running());
}

#[test]
fn setters_clamp_to_user_limits() {
    let controller = controller();

    controller.set_ev_max_voltage(400.0);
    assert_eq!(controller.vcu_parameters().max_voltage, 400.0);
    controller.set_ev_max_voltage(700.0);
    assert_eq!(controller.vcu_parameters().max_voltage, 500.0);

    controller.set_ev_max_current(150.0);
    assert_eq!(controller.vcu_parameters().max_current, 150.0);
    controller.set_ev_max_current(500.0);
    assert_eq!(controller.vcu_parameters().max_current, 200.0);

    controller.set_ev_max_power(50_000.0);
    assert_eq!(controller.vcu_parameters().max_power, 50_000.0);
    controller.set_ev_max_power(500_000.0);
    assert_eq!(controller.vcu_parameters().max_power, 100_000.0);

    controller.set_ev_target_voltage(400.0);
    assert_eq!(controller.vcu_parameters().target_voltage, 400.0);
    controller.set_ev_target_current(100.0);
    assert_eq!(controller.vcu_parameters().target_current, 100.0);
    controller.set_ev_precharge_voltage(350.0);
    assert_eq!(controller.vcu_parameters().precharge_voltage, 350.0);
}

#[test]
fn soc_setters_clamp_to_percent() {
    let controller = controller();
    controller.set_ev_soc(75.0);
    assert_eq!(controller.vcu_parameters().soc, 75.0);
    controller.set_ev_soc(150.0);
    assert_eq!(controller.vcu_parameters().soc, 100.0);
    controller.set_ev_soc(-10.0);
    assert_eq!(controller.vcu_parameters().soc, 0.0);

    controller.set_ev_full_soc(95.0);
    controller.set_ev_bulk_soc(70.0);
    let params = controller.vcu_parameters();
    assert_eq!(params.full_soc, 95.0);
    assert_eq!(params.bulk_soc, 70.0);
}

#[test]
fn energy_setters_clamp_to_signal_range() {
    let controller = controller();
    controller.set_ev_energy_capacity(60_000.0);
    controller.set_ev_energy_request(5_000_000.0);
    let params = controller.vcu_parameters();
    assert_eq!(params.energy_capacity, 60_000.0);
    assert_eq!(params.energy_request, 3_276_700.0);
}

#[test]
fn user_limits_shrink_the_envelope() {
    let controller = ChargeController::new(EngineConfig {
        user_max_voltage: 450.0,
        user_max_current: 120.0,
        user_max_power: 60_000.0,
        ..EngineConfig::default()
    });
    controller.set_ev_max_voltage(700.0);
    controller.set_ev_max_current(500.0);
    controller.set_ev_max_power(500_000.0);
    let params = controller.vcu_parameters();
    assert_eq!(params.max_voltage, 450.0);
    assert_eq!(params.max_current, 120.0);
    assert_eq!(params.max_power, 60_000.0);
}

#[test]
fn request_start_charging_arms_the_session() {
    let controller = controller();
    controller.set_ev_error_code(42);
    controller.request_start_charging();

    let params = controller.vcu_parameters();
    assert!(params.ev_ready);
    assert_eq!(params.charge_stop, ChargeStopIndication::NoStop);
    assert_eq!(params.error_code, 0);
}

#[test]
fn request_stop_charging_terminates() {
    let controller = controller();
    controller.request_start_charging();
    controller.request_stop_charging();

    let params = controller.vcu_parameters();
    assert_eq!(params.charge_progress, ChargeProgressIndication::Stop);
    assert_eq!(params.charge_stop, ChargeStopIndication::Terminate);
}

#[test]
fn emergency_stop_forces_safe_state() {
    let controller = controller();
    controller.request_start_charging();
    controller.emergency_stop();

    let params = controller.vcu_parameters();
    assert!(!params.ev_ready);
    assert_eq!(params.charge_progress, ChargeProgressIndication::Stop);
    assert_eq!(params.charge_stop, ChargeStopIndication::Terminate);
    assert!(controller.safety().is_emergency_stopped());

    assert!(controller.clear_emergency_stop());
    assert!(!controller.safety().is_emergency_stopped());
}

#[test]
fn charge_info_updates_snapshot_and_emits_state_change() {
    let controller = controller();
    let events = controller.subscribe();

    controller.process_frame(common::charge_info_frame(1, 3));

    let snapshot = controller.supervisor();
    assert_eq!(snapshot.state, CmsState::Init);
    assert_eq!(snapshot.alive_counter, 3);

    let collected: Vec<_> = events.try_iter().collect();
    assert!(collected
        .iter()
        .any(|e| matches!(e, EngineEvent::RawFrameReceived(f) if f.id == 0x0600)));
    assert!(collected
        .iter()
        .any(|e| matches!(e, EngineEvent::StateChanged(CmsState::Init))));
    assert!(collected
        .iter()
        .any(|e| matches!(e, EngineEvent::SupervisorUpdated)));
}

#[test]
fn state_change_event_fires_only_on_transitions() {
    let controller = controller();
    let events = controller.subscribe();

    controller.process_frame(common::charge_info_frame(3, 1));
    controller.process_frame(common::charge_info_frame(3, 2));
    controller.process_frame(common::charge_info_frame(5, 3));

    let changes: Vec<_> = events
        .try_iter()
        .filter_map(|e| match e {
            EngineEvent::StateChanged(s) => Some(s),
            _ => None,
        })
        .collect();
    assert_eq!(changes, vec![CmsState::Parameter, CmsState::PreCharge]);
}

#[test]
fn charge_info_decodes_full_payload() {
    let controller = controller();

    let mut data = [0u8; 8];
    data[0] = 5; // duty cycle 5 %
    data[1] = 0x15; // state PreCharge, CP state B
    data[2] = 0x31; // protocol DIN, proximity 3
    data[3] = 0x14; // voltage match, EVSE compatible
    data[4] = 0x51; // TCP up, alive counter 5
    controller.process_frame(CanFrame::new_extended(0x0600, &data));

    let snapshot = controller.supervisor();
    assert_eq!(snapshot.control_pilot_duty_cycle, 5);
    assert_eq!(snapshot.state, CmsState::PreCharge);
    assert_eq!(snapshot.control_pilot_state, ControlPilotState::B);
    assert_eq!(snapshot.charge_protocol, ChargeProtocol::Din70121);
    assert_eq!(snapshot.proximity_pin_state, 3);
    assert!(snapshot.voltage_match);
    assert!(snapshot.evse_compatible);
    assert!(snapshot.tcp_connected);
    assert!(!snapshot.s2_closed);
    assert_eq!(snapshot.alive_counter, 5);
}

#[test]
fn evse_limits_land_in_snapshot() {
    let controller = controller();

    // 200.0 A, 500.0 V, 100 kW, energy SNA-ish max raw left alone.
    let mut data = [0u8; 8];
    data[0] = 0xD0;
    data[1] = 0x07; // 2000 -> 200.0 A
    data[2] = 0x88;
    data[3] = 0x13; // 5000 -> 500.0 V
    data[4] = 0xE8;
    data[5] = 0x03; // 1000 -> 100 kW
    controller.process_frame(CanFrame::new_extended(0x1400, &data));

    let snapshot = controller.supervisor();
    assert!((snapshot.evse_max_current - 200.0).abs() < 0.01);
    assert!((snapshot.evse_max_voltage - 500.0).abs() < 0.01);
    assert!((snapshot.evse_max_power - 100_000.0).abs() < 0.01);
}

#[test]
fn evse_dc_status_updates_present_values() {
    let controller = controller();

    let mut data = [0u8; 8];
    // Present current raw 32600 -> 10.0 A.
    data[0] = (32600u16 & 0xFF) as u8;
    data[1] = (32600u16 >> 8) as u8;
    // Present voltage raw 4000 -> 400.0 V.
    data[2] = (4000u16 & 0xFF) as u8;
    data[3] = (4000u16 >> 8) as u8;
    data[4] = 1; // isolation valid
    data[5] = 1; // status Ready
    data[6] = 0xFF;
    data[7] = 0xFF; // notification delay SNA
    controller.process_frame(CanFrame::new_extended(0x1402, &data));

    let snapshot = controller.supervisor();
    assert!((snapshot.evse_present_current - 10.0).abs() < 0.01);
    assert!((snapshot.evse_present_voltage - 400.0).abs() < 0.01);
    assert_eq!(snapshot.evse_isolation_status, EvseIsolationStatus::Valid);
    assert_eq!(snapshot.evse_status_code, EvseStatusCode::Ready);
    assert!(!controller.safety().is_emergency_stopped());
}

#[test]
fn evse_emergency_shutdown_latches_estop() {
    let controller = controller();
    let safety_events = controller.safety().subscribe();

    let mut data = [0u8; 8];
    data[5] = 5; // EVSEStatusCode = EmergencyShutdown
    controller.process_frame(CanFrame::new_extended(0x1402, &data));

    assert!(controller.safety().is_emergency_stopped());
    let params = controller.vcu_parameters();
    assert!(!params.ev_ready);
    assert_eq!(params.charge_stop, ChargeStopIndication::Terminate);
    assert!(matches!(
        safety_events.try_recv(),
        Ok(SafetyEvent::EmergencyStopTriggered(_))
    ));
}

#[test]
fn error_code_event_on_level0_change() {
    let controller = controller();
    let events = controller.subscribe();

    let mut data = [0u8; 8];
    data[0] = 162; // LIMITS_MSG_TIMEOUT
    controller.process_frame(CanFrame::new_extended(0x2002, &data));
    // Repeating the same code must not fire again.
    controller.process_frame(CanFrame::new_extended(0x2002, &data));

    let codes: Vec<_> = events
        .try_iter()
        .filter_map(|e| match e {
            EngineEvent::ErrorCodeReceived { code, description } => Some((code, description)),
            _ => None,
        })
        .collect();
    assert_eq!(codes.len(), 1);
    assert_eq!(codes[0].0, 162);
    assert!(codes[0].1.contains("LIMITS_MSG_TIMEOUT"));

    assert_eq!(controller.supervisor().error_code_level0, 162);
}

#[test]
fn status_ok_error_code_is_silent() {
    let controller = controller();
    let events = controller.subscribe();

    let mut data = [0u8; 8];
    data[0] = 1; // STATUS_OK
    controller.process_frame(CanFrame::new_extended(0x2002, &data));

    assert!(!events
        .try_iter()
        .any(|e| matches!(e, EngineEvent::ErrorCodeReceived { .. })));
    assert_eq!(controller.supervisor().error_code_level0, 1);
}

#[test]
fn software_and_slac_info_decode() {
    let controller = controller();

    controller.process_frame(CanFrame::new_extended(0x2001, &[1, 2, 0, 1, 0, 0, 0, 0]));
    // SLAC matched (state 6), link up, attenuation raw 40 -> 20.0 dB.
    controller.process_frame(CanFrame::new_extended(0x2003, &[0x16, 40, 0, 0, 0, 0, 0, 0]));

    let snapshot = controller.supervisor();
    assert_eq!(snapshot.sw_version_major, 1);
    assert_eq!(snapshot.sw_version_minor, 2);
    assert_eq!(snapshot.sw_version_patch, 0);
    assert_eq!(snapshot.sw_version_config, 1);
    assert_eq!(snapshot.slac_state, 6);
    assert_eq!(snapshot.link_status, 1);
    assert!((snapshot.measured_attenuation - 20.0).abs() < 0.01);
}

#[test]
fn charge_info_identifier_follows_the_database() {
    // Some description variants publish ChargeInfo at a different id; the
    // engine must follow the name, not the constant.
    let moved = common::CMS_DBC.replace("BO_ 2147485184 ChargeInfo", "BO_ 2147487744 ChargeInfo");
    let moved = moved.replace("VAL_ 2147485184", "VAL_ 2147487744");

    let controller = ChargeController::new(EngineConfig::default());
    controller.set_database(ccs_dbc::Parser::parse_str(&moved));

    let mut data = [0u8; 8];
    data[1] = 1; // Init
    controller.process_frame(CanFrame::new_extended(0x1000, &data));
    assert_eq!(controller.supervisor().state, CmsState::Init);

    // The old identifier no longer decodes as ChargeInfo.
    controller.process_frame(common::charge_info_frame(6, 1));
    assert_ne!(controller.supervisor().state, CmsState::Charge);
}

#[test]
fn unknown_frame_only_emits_raw_event() {
    let controller = controller();
    let events = controller.subscribe();

    controller.process_frame(CanFrame::new_extended(0x0777, &[0u8; 8]));

    let collected: Vec<_> = events.try_iter().collect();
    assert_eq!(collected.len(), 1);
    assert!(matches!(
        collected[0],
        EngineEvent::RawFrameReceived(f) if f.id == 0x0777
    ));
}

#[test]
fn target_current_setter_clamps_in_precharge() {
    let controller = controller();

    controller.process_frame(common::charge_info_frame(5, 1)); // PreCharge observed
    controller.set_ev_target_current(100.0);
    assert!(controller.vcu_parameters().target_current <= 2.0);

    controller.process_frame(common::charge_info_frame(6, 2)); // Charge
    controller.set_ev_target_current(100.0);
    assert_eq!(controller.vcu_parameters().target_current, 100.0);
}
