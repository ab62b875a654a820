//! In-process simulator standing in for the charging module supervisor.
//!
//! Open starts a 100 ms tick that publishes the synthetic CMS traffic
//! (ChargeInfo, EVSEDCStatus, EVSEDCMaxLimits, ErrorCodes, periodic
//! SoftwareInfo). A tiny embedded state machine reacts to the VCU's
//! EVStatusControl frames so that a charge session can be exercised
//! without hardware on the bus.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ccs_core::event::EventHub;
use ccs_core::state::CmsState;
use ccs_core::{ids, CanFrame, CanStatus};
use log::debug;
use rclite::Arc;

use crate::error::{Error, Result};
use crate::iface::{CanEvent, CanInterface, ChannelInfo};

const TICK: Duration = Duration::from_millis(100);
/// SoftwareInfo is repeated every this many ticks (~10 s).
const SOFTWARE_INFO_PERIOD: u32 = 100;
/// Ticks spent in the Default state before auto-advancing to Init.
const DEFAULT_STATE_TICKS: u32 = 10;

struct SimState {
    alive_counter: u8,
    state: u8,
    ticks_in_default: u32,
    software_info_countdown: u32,
}

impl SimState {
    fn new() -> Self {
        Self {
            alive_counter: 0,
            state: CmsState::Default.into(),
            ticks_in_default: 0,
            software_info_countdown: SOFTWARE_INFO_PERIOD,
        }
    }
}

/// Simulated transport backend.
pub struct SimulatedCan {
    open: Arc<AtomicBool>,
    state: Arc<Mutex<SimState>>,
    hub: Arc<EventHub<CanEvent>>,
    ticker: Option<JoinHandle<()>>,
}

impl SimulatedCan {
    pub fn new() -> Self {
        Self {
            open: Arc::new(AtomicBool::new(false)),
            state: Arc::new(Mutex::new(SimState::new())),
            hub: Arc::new(EventHub::new()),
            ticker: None,
        }
    }

    /// Inject a frame as if it had been received from the bus.
    pub fn inject(&self, frame: CanFrame) {
        self.hub.publish(CanEvent::Frame(frame));
    }

    /// Force the emulated supervisor into a specific state. The synthetic
    /// ChargeInfo traffic carries it from the next tick on.
    pub fn set_supervisor_state(&self, state: CmsState) {
        self.state.lock().unwrap().state = state.into();
    }

    /// Current state of the emulated supervisor.
    pub fn supervisor_state(&self) -> CmsState {
        CmsState::from(self.state.lock().unwrap().state)
    }
}

impl Default for SimulatedCan {
    fn default() -> Self {
        Self::new()
    }
}

impl CanInterface for SimulatedCan {
    fn open(&mut self, _channel: u16, _baud_rate: u32) -> Result<()> {
        if self.open.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        *self.state.lock().unwrap() = SimState::new();

        let open = self.open.clone();
        let state = self.state.clone();
        let hub = self.hub.clone();
        self.ticker = Some(thread::spawn(move || {
            while open.load(Ordering::SeqCst) {
                thread::sleep(TICK);
                if !open.load(Ordering::SeqCst) {
                    break;
                }
                tick(&state, &hub);
            }
        }));

        debug!("simulated CAN open");
        self.hub.publish(CanEvent::Status(CanStatus::Ok));
        Ok(())
    }

    fn close(&mut self) {
        let was_open = self.open.swap(false, Ordering::SeqCst);
        if let Some(ticker) = self.ticker.take() {
            let _ = ticker.join();
        }
        if was_open {
            self.state.lock().unwrap().state = CmsState::Default.into();
            self.hub.publish(CanEvent::Status(CanStatus::Disconnected));
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn write(&self, frame: &CanFrame) -> Result<()> {
        if !self.is_open() {
            return Err(Error::WriteRejected("interface not open".into()));
        }

        // The embedded supervisor reacts to the VCU's status/control frame.
        if frame.id == ids::EV_STATUS_CONTROL && frame.extended {
            let charge_progress = frame.data[0] & 0x03;
            let ev_ready = (frame.data[0] >> 4) & 0x03;

            let mut state = self.state.lock().unwrap();
            if ev_ready == 1 && state.state < u8::from(CmsState::Parameter) {
                state.state = CmsState::Parameter.into();
            }
            if charge_progress == 0 && state.state == u8::from(CmsState::PreCharge) {
                state.state = CmsState::Charge.into();
            }
        }

        Ok(())
    }

    fn available_channels(&mut self) -> Vec<ChannelInfo> {
        vec![
            ChannelInfo {
                name: "Simulated CAN 1".into(),
                handle: 0x0001,
                description: "Virtual CAN bus (no hardware)".into(),
            },
            ChannelInfo {
                name: "Simulated CAN 2".into(),
                handle: 0x0002,
                description: "Virtual CAN bus 2 (no hardware)".into(),
            },
        ]
    }

    fn status(&self) -> CanStatus {
        if self.is_open() {
            CanStatus::Ok
        } else {
            CanStatus::Disconnected
        }
    }

    fn last_error(&self) -> Option<String> {
        None
    }

    fn subscribe(&self) -> Receiver<CanEvent> {
        self.hub.subscribe()
    }
}

impl Drop for SimulatedCan {
    fn drop(&mut self) {
        self.close();
    }
}

fn tick(state: &Mutex<SimState>, hub: &EventHub<CanEvent>) {
    let (charge_info, dc_status, max_limits, error_codes, software_info) = {
        let mut sim = state.lock().unwrap();

        let charge_info = charge_info_frame(&sim);
        sim.alive_counter = (sim.alive_counter + 1) % 15;

        let dc_status = dc_status_frame(&sim);
        let max_limits = max_limits_frame();
        let error_codes = error_codes_frame();

        sim.software_info_countdown -= 1;
        let software_info = if sim.software_info_countdown == 0 {
            sim.software_info_countdown = SOFTWARE_INFO_PERIOD;
            Some(software_info_frame())
        } else {
            None
        };

        if sim.state == u8::from(CmsState::Default) {
            sim.ticks_in_default += 1;
            if sim.ticks_in_default > DEFAULT_STATE_TICKS {
                sim.state = CmsState::Init.into();
            }
        }

        (charge_info, dc_status, max_limits, error_codes, software_info)
    };

    hub.publish(CanEvent::Frame(charge_info));
    hub.publish(CanEvent::Frame(dc_status));
    hub.publish(CanEvent::Frame(max_limits));
    hub.publish(CanEvent::Frame(error_codes));
    if let Some(frame) = software_info {
        hub.publish(CanEvent::Frame(frame));
    }
}

fn charge_info_frame(sim: &SimState) -> CanFrame {
    let state = sim.state;
    let mut data = [0u8; 8];
    // ControlPilotDutyCycle: bits 0-6, 5 %.
    data[0] = 5;
    // StateMachineState: bits 8-11; ControlPilotState: bits 12-15, state B.
    data[1] = (state & 0x0F) | (1 << 4);
    // ActualChargeProtocol: bits 16-19, DIN; ProximityPinState: bits 20-23.
    data[2] = 1 | (3 << 4);
    // SwS2Close: bits 24-25; VoltageMatch: bits 26-27 from PreCharge on;
    // EVSECompatible: bits 28-29.
    data[3] = (u8::from(state >= u8::from(CmsState::PreCharge)) << 2) | (1 << 4);
    // TCPStatus: bits 32-33 from Parameter on; AliveCounter: bits 36-39.
    data[4] = u8::from(state >= u8::from(CmsState::Parameter)) | ((sim.alive_counter & 0x0F) << 4);
    CanFrame::new_extended(ids::CHARGE_INFO, &data)
}

fn dc_status_frame(sim: &SimState) -> CanFrame {
    let state = sim.state;
    let mut data = [0u8; 8];

    // EVSEPresentCurrent: bits 0-15, 0.1 A/bit, -3250 A offset.
    let raw_current: u16 = if state == u8::from(CmsState::Charge) {
        32600 // 10 A while charging
    } else {
        32500 // 0 A
    };
    data[0] = (raw_current & 0xFF) as u8;
    data[1] = (raw_current >> 8) as u8;

    // EVSEPresentVoltage: bits 16-31, 0.1 V/bit, 400 V from PreCharge on.
    let raw_voltage: u16 = if state >= u8::from(CmsState::PreCharge) {
        4000
    } else {
        0
    };
    data[2] = (raw_voltage & 0xFF) as u8;
    data[3] = (raw_voltage >> 8) as u8;

    // EVSEIsolationStatus: bits 32-34, Valid once isolation has run, else SNA.
    data[4] = if state >= u8::from(CmsState::Isolation) {
        1
    } else {
        7
    };

    // EVSEStatusCode: bits 40-43, Ready once isolation has run.
    data[5] = u8::from(state >= u8::from(CmsState::Isolation));

    // EVSENotificationMaxDelay: bits 48-63, SNA.
    data[6] = 0xFF;
    data[7] = 0xFF;

    CanFrame::new_extended(ids::EVSE_DC_STATUS, &data)
}

fn max_limits_frame() -> CanFrame {
    let mut data = [0u8; 8];
    // EVSEMaxCurrent 200 A, EVSEMaxVoltage 500 V, EVSEMaxPower 100 kW,
    // EVSEEnergyToBeDelivered SNA.
    let max_current: u16 = 2000;
    data[0] = (max_current & 0xFF) as u8;
    data[1] = (max_current >> 8) as u8;
    let max_voltage: u16 = 5000;
    data[2] = (max_voltage & 0xFF) as u8;
    data[3] = (max_voltage >> 8) as u8;
    let max_power: u16 = 1000;
    data[4] = (max_power & 0xFF) as u8;
    data[5] = (max_power >> 8) as u8;
    data[6] = 0xFF;
    data[7] = 0xFF;
    CanFrame::new_extended(ids::EVSE_DC_MAX_LIMITS, &data)
}

fn error_codes_frame() -> CanFrame {
    let mut data = [0u8; 8];
    // ErrorCodeLevel0 = 1 (STATUS_OK).
    data[0] = 1;
    CanFrame::new_extended(ids::ERROR_CODES, &data)
}

fn software_info_frame() -> CanFrame {
    CanFrame::new_extended(ids::SOFTWARE_INFO, &[1, 2, 0, 1, 0, 0, 0, 0])
}
