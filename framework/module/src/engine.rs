//! The protocol engine: cyclic transmission, inbound decoding, and the
//! high-level charge-session actions.
//!
//! One mutex guards the VCU parameter block and the supervisor snapshot.
//! A scheduler thread composes the six cyclic frames under that mutex and
//! submits them to the transport after releasing it; a pump thread drains
//! the transport event channel into the decode path; a watchdog thread
//! drives the safety monitor. The snapshot is always updated before frame
//! and derived events are published.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::{Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use ccs_can::{CanBackend, CanEvent, CanInterface};
use ccs_core::event::EventHub;
use ccs_core::state::{
    BcbControl, ChargeProgressIndication, ChargeProtocol, ChargeStopIndication, CmsState,
    ControlPilotState, EvseIsolationStatus, EvseStatusCode,
};
use ccs_core::{ids, CanFrame, CanStatus};
use ccs_dbc::Database;
use log::{debug, info, warn};
use rclite::Arc;

use crate::config::{EngineConfig, WATCHDOG_TICK};
use crate::error_codes::error_code_description;
use crate::params::VcuParameters;
use crate::safety::SafetyMonitor;
use crate::supervisor::SupervisorSnapshot;

/// Protocol constraint: while the supervisor is in PreCharge, the module
/// accepts at most this much requested current.
const PRECHARGE_MAX_CURRENT: f64 = 2.0;

/// Upper bound of the energy signals, Wh.
const MAX_ENERGY_WH: f64 = 3_276_700.0;

/// Notifications published by the engine.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The observed supervisor state changed.
    StateChanged(CmsState),
    /// Some part of the supervisor snapshot was updated.
    SupervisorUpdated,
    /// A new level-0 error code (> 1) arrived.
    ErrorCodeReceived { code: u16, description: String },
    /// An inbound frame, published after the snapshot was updated.
    RawFrameReceived(CanFrame),
    /// An outbound frame accepted by the transport.
    RawFrameSent(CanFrame),
}

struct EngineState {
    vcu: VcuParameters,
    snapshot: SupervisorSnapshot,
    last_state: CmsState,
    /// Resolved from the bus description by message name, with the
    /// well-known fallback.
    charge_info_id: u32,
}

struct Inner {
    config: EngineConfig,
    safety: SafetyMonitor,
    db: RwLock<Arc<Database>>,
    state: Mutex<EngineState>,
    transport: Mutex<Option<CanBackend>>,
    /// Bumped on every attach/detach so a stale pump thread stops
    /// forwarding events from a transport the engine no longer owns.
    pump_generation: AtomicU64,
    hub: EventHub<EngineEvent>,
    running: AtomicBool,
    shutdown: AtomicBool,
}

struct SchedulerHandle {
    thread: JoinHandle<()>,
    stop: mpsc::Sender<()>,
}

/// The VCU-side controller of the charging module.
pub struct ChargeController {
    inner: Arc<Inner>,
    scheduler: Mutex<Option<SchedulerHandle>>,
    watchdog: Option<JoinHandle<()>>,
}

impl ChargeController {
    pub fn new(config: EngineConfig) -> Self {
        let safety = SafetyMonitor::with_timeouts(config.heartbeat_timeout, config.message_timeout);
        safety.set_user_limits(
            config.user_max_voltage,
            config.user_max_current,
            config.user_max_power,
        );

        let inner = Arc::new(Inner {
            config,
            safety,
            db: RwLock::new(Arc::new(Database::default())),
            state: Mutex::new(EngineState {
                vcu: VcuParameters::default(),
                snapshot: SupervisorSnapshot::default(),
                last_state: CmsState::Sna,
                charge_info_id: ids::CHARGE_INFO,
            }),
            transport: Mutex::new(None),
            pump_generation: AtomicU64::new(0),
            hub: EventHub::new(),
            running: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
        });

        let watchdog = thread::spawn({
            let inner = inner.clone();
            move || {
                while !inner.shutdown.load(Ordering::SeqCst) {
                    thread::sleep(WATCHDOG_TICK);
                    if inner.shutdown.load(Ordering::SeqCst) {
                        break;
                    }
                    inner.safety.tick(Instant::now());
                }
            }
        });

        Self {
            inner,
            scheduler: Mutex::new(None),
            watchdog: Some(watchdog),
        }
    }

    // ── Setup ────────────────────────────────────────────────

    /// Load the bus description file the signal layouts come from.
    pub fn load_dbc(&self, path: impl AsRef<Path>) -> ccs_dbc::Result<()> {
        let db = ccs_dbc::Parser::parse_file(path)?;
        self.set_database(db);
        Ok(())
    }

    /// Install an already parsed bus description.
    pub fn set_database(&self, db: Database) {
        let charge_info_id = db
            .message_by_name("ChargeInfo")
            .map(|m| m.id)
            .unwrap_or(ids::CHARGE_INFO);
        info!(
            "bus description '{}' loaded ({} messages), ChargeInfo at 0x{:04X}",
            db.name,
            db.message_count(),
            charge_info_id
        );
        *self.inner.db.write().unwrap() = Arc::new(db);
        self.inner.state.lock().unwrap().charge_info_id = charge_info_id;
    }

    /// Take ownership of the transport and start draining its events.
    pub fn attach_transport(&self, transport: CanBackend) {
        let events = transport.subscribe();
        *self.inner.transport.lock().unwrap() = Some(transport);
        let generation = self.inner.pump_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let inner = self.inner.clone();
        thread::spawn(move || {
            while let Ok(event) = events.recv() {
                if inner.shutdown.load(Ordering::SeqCst)
                    || inner.pump_generation.load(Ordering::SeqCst) != generation
                {
                    break;
                }
                match event {
                    CanEvent::Frame(frame) => inner.handle_frame(frame),
                    CanEvent::Status(status) => debug!("transport status: {status}"),
                }
            }
        });
    }

    /// Give the transport back; the engine stops seeing bus traffic.
    pub fn detach_transport(&self) -> Option<CanBackend> {
        self.inner.pump_generation.fetch_add(1, Ordering::SeqCst);
        self.inner.transport.lock().unwrap().take()
    }

    pub fn is_transport_open(&self) -> bool {
        self.inner.transport_open()
    }

    pub fn transport_status(&self) -> Option<CanStatus> {
        self.inner
            .transport
            .lock()
            .unwrap()
            .as_ref()
            .map(|t| t.status())
    }

    /// Subscribe to engine notifications.
    pub fn subscribe(&self) -> Receiver<EngineEvent> {
        self.inner.hub.subscribe()
    }

    // ── Cyclic schedule ──────────────────────────────────────

    /// Arm the 100 ms transmit schedule.
    pub fn start(&self) {
        let mut scheduler = self.scheduler.lock().unwrap();
        if scheduler.is_some() {
            return;
        }
        self.inner.running.store(true, Ordering::SeqCst);

        let (stop_tx, stop_rx) = mpsc::channel();
        let inner = self.inner.clone();
        let thread = thread::spawn(move || scheduler_loop(inner, stop_rx));
        *scheduler = Some(SchedulerHandle {
            thread,
            stop: stop_tx,
        });
        debug!("cyclic TX started ({:?} cycle)", self.inner.config.cycle_time);
    }

    /// Disarm the schedule and send one safe-state frame.
    pub fn stop(&self) {
        self.inner.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.scheduler.lock().unwrap().take() {
            let _ = handle.stop.send(());
            let _ = handle.thread.join();
        }

        let frame = {
            let db = self.inner.database();
            let mut state = self.inner.state.lock().unwrap();
            state.vcu.enter_safe_state();
            compose_status_control(&db, &state.vcu)
        };
        self.inner.send_frame(frame);
        debug!("cyclic TX stopped, safe state sent");
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    // ── Parameter setters ────────────────────────────────────

    pub fn set_ev_max_voltage(&self, voltage: f64) {
        let clamped = self.inner.safety.clamp_voltage(voltage);
        self.inner.state.lock().unwrap().vcu.max_voltage = clamped;
    }

    pub fn set_ev_max_current(&self, current: f64) {
        let clamped = self.inner.safety.clamp_current(current);
        self.inner.state.lock().unwrap().vcu.max_current = clamped;
    }

    pub fn set_ev_max_power(&self, power: f64) {
        let clamped = self.inner.safety.clamp_power(power);
        self.inner.state.lock().unwrap().vcu.max_power = clamped;
    }

    pub fn set_ev_target_voltage(&self, voltage: f64) {
        let clamped = self.inner.safety.clamp_voltage(voltage);
        self.inner.state.lock().unwrap().vcu.target_voltage = clamped;
    }

    /// During PreCharge the target current is capped at 2 A regardless of
    /// the requested value.
    pub fn set_ev_target_current(&self, current: f64) {
        let clamped = self.inner.safety.clamp_current(current);
        let mut state = self.inner.state.lock().unwrap();
        state.vcu.target_current = if state.snapshot.state == CmsState::PreCharge {
            current.min(PRECHARGE_MAX_CURRENT)
        } else {
            clamped
        };
    }

    pub fn set_ev_precharge_voltage(&self, voltage: f64) {
        let clamped = self.inner.safety.clamp_voltage(voltage);
        self.inner.state.lock().unwrap().vcu.precharge_voltage = clamped;
    }

    pub fn set_ev_soc(&self, soc: f64) {
        self.inner.state.lock().unwrap().vcu.soc = soc.clamp(0.0, 100.0);
    }

    pub fn set_ev_full_soc(&self, soc: f64) {
        self.inner.state.lock().unwrap().vcu.full_soc = soc.clamp(0.0, 100.0);
    }

    pub fn set_ev_bulk_soc(&self, soc: f64) {
        self.inner.state.lock().unwrap().vcu.bulk_soc = soc.clamp(0.0, 100.0);
    }

    pub fn set_ev_ready(&self, ready: bool) {
        self.inner.state.lock().unwrap().vcu.ev_ready = ready;
    }

    pub fn set_charge_progress(&self, indication: ChargeProgressIndication) {
        self.inner.state.lock().unwrap().vcu.charge_progress = indication;
    }

    pub fn set_charge_stop(&self, indication: ChargeStopIndication) {
        self.inner.state.lock().unwrap().vcu.charge_stop = indication;
    }

    pub fn set_welding_detection_enable(&self, enable: bool) {
        self.inner.state.lock().unwrap().vcu.welding_detection_enable = enable;
    }

    pub fn set_ev_error_code(&self, code: u8) {
        self.inner.state.lock().unwrap().vcu.error_code = code;
    }

    pub fn set_charge_protocol_priority(&self, priority: u8) {
        self.inner.state.lock().unwrap().vcu.charge_protocol_priority = priority;
    }

    pub fn set_bcb_control(&self, control: BcbControl) {
        self.inner.state.lock().unwrap().vcu.bcb_control = control;
    }

    pub fn set_ev_energy_capacity(&self, wh: f64) {
        self.inner.state.lock().unwrap().vcu.energy_capacity = wh.clamp(0.0, MAX_ENERGY_WH);
    }

    pub fn set_ev_energy_request(&self, wh: f64) {
        self.inner.state.lock().unwrap().vcu.energy_request = wh.clamp(0.0, MAX_ENERGY_WH);
    }

    pub fn set_ev_time_to_full_soc(&self, seconds: u32) {
        self.inner.state.lock().unwrap().vcu.time_to_full_soc = seconds;
    }

    pub fn set_ev_time_to_bulk_soc(&self, seconds: u32) {
        self.inner.state.lock().unwrap().vcu.time_to_bulk_soc = seconds;
    }

    pub fn set_ev_status_flags(
        &self,
        charging_complete: bool,
        bulk_charging_complete: bool,
        cabin_conditioning: bool,
        ress_conditioning: bool,
    ) {
        let mut state = self.inner.state.lock().unwrap();
        state.vcu.charging_complete = charging_complete;
        state.vcu.bulk_charging_complete = bulk_charging_complete;
        state.vcu.cabin_conditioning = cabin_conditioning;
        state.vcu.ress_conditioning = ress_conditioning;
    }

    pub fn set_ev_plug_status(&self, pilot_state: u8, pilot_duty_cycle: u8, proximity: u8) {
        let mut state = self.inner.state.lock().unwrap();
        state.vcu.control_pilot_state = pilot_state;
        state.vcu.control_pilot_duty_cycle = pilot_duty_cycle;
        state.vcu.proximity_pin_state = proximity;
    }

    // ── High-level actions ───────────────────────────────────

    /// Arm the session: EV ready, stop request cleared, error code cleared.
    /// The progress indication follows once the voltages match.
    pub fn request_start_charging(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.vcu.ev_ready = true;
        state.vcu.charge_stop = ChargeStopIndication::NoStop;
        state.vcu.error_code = 0;
        debug!("charging requested");
    }

    pub fn request_stop_charging(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.vcu.charge_progress = ChargeProgressIndication::Stop;
        state.vcu.charge_stop = ChargeStopIndication::Terminate;
        debug!("stop charging requested");
    }

    /// Latch the emergency stop and push one safe-state frame outside the
    /// cyclic schedule.
    pub fn emergency_stop(&self) {
        self.inner
            .emergency_stop_with("User-initiated emergency stop");
    }

    pub fn clear_emergency_stop(&self) -> bool {
        self.inner.safety.clear_emergency_stop()
    }

    /// Transmit the one-off module reset command, the only standard frame
    /// in the protocol.
    pub fn reset_module(&self) {
        let frame = CanFrame::new_standard(ids::MODULE_RESET, &[0xFF, 0x00]);
        if self.inner.send_frame(frame) {
            debug!("module reset command sent (0x667)");
        }
    }

    /// Feed one inbound frame through the decode path. The transport pump
    /// uses this internally; tests and replay tooling call it directly.
    pub fn process_frame(&self, frame: CanFrame) {
        self.inner.handle_frame(frame);
    }

    // ── Accessors ────────────────────────────────────────────

    pub fn vcu_parameters(&self) -> VcuParameters {
        self.inner.state.lock().unwrap().vcu.clone()
    }

    pub fn supervisor(&self) -> SupervisorSnapshot {
        self.inner.state.lock().unwrap().snapshot.clone()
    }

    pub fn safety(&self) -> &SafetyMonitor {
        &self.inner.safety
    }

    pub fn database(&self) -> Arc<Database> {
        self.inner.database()
    }
}

impl Default for ChargeController {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Drop for ChargeController {
    fn drop(&mut self) {
        self.inner.shutdown.store(true, Ordering::SeqCst);
        self.inner.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.scheduler.lock().unwrap().take() {
            let _ = handle.stop.send(());
            let _ = handle.thread.join();
        }
        // Dropping the transport disconnects the event pump.
        *self.inner.transport.lock().unwrap() = None;
        if let Some(watchdog) = self.watchdog.take() {
            let _ = watchdog.join();
        }
    }
}

impl Inner {
    fn database(&self) -> Arc<Database> {
        self.db.read().unwrap().clone()
    }

    fn transport_open(&self) -> bool {
        self.transport
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|t| t.is_open())
    }

    /// Submit one frame. A rejected write is non-fatal and not retried;
    /// the next tick overwrites intent.
    fn send_frame(&self, frame: CanFrame) -> bool {
        let transport = self.transport.lock().unwrap();
        let Some(backend) = transport.as_ref() else {
            return false;
        };
        if !backend.is_open() {
            return false;
        }
        match backend.write(&frame) {
            Ok(()) => {
                drop(transport);
                self.hub.publish(EngineEvent::RawFrameSent(frame));
                true
            }
            Err(e) => {
                debug!("frame 0x{:04X} not written: {e}", frame.id);
                false
            }
        }
    }

    /// One pass of the cyclic schedule: compose the six frames under the
    /// engine mutex, submit them in order after releasing it.
    fn cyclic_tx(&self) {
        if !self.running.load(Ordering::SeqCst) || !self.transport_open() {
            return;
        }

        let db = self.database();
        let frames = {
            let mut state = self.state.lock().unwrap();
            if self.safety.is_emergency_stopped() {
                state.vcu.enter_safe_state();
            }
            compose_cycle(&db, &state)
        };

        for frame in frames {
            self.send_frame(frame);
        }
    }

    fn emergency_stop_with(&self, reason: &str) {
        if !self.safety.trigger_emergency_stop(reason) {
            return;
        }
        warn!("safety: emergency stop - {reason}");

        let frame = {
            let db = self.database();
            let mut state = self.state.lock().unwrap();
            state.vcu.enter_safe_state();
            compose_status_control(&db, &state.vcu)
        };
        if self.running.load(Ordering::SeqCst) {
            self.send_frame(frame);
        }
    }

    fn handle_frame(&self, frame: CanFrame) {
        self.safety.message_received(frame.id);
        let db = self.database();

        let mut events = Vec::new();
        let mut estop_reason = None;
        {
            let mut state = self.state.lock().unwrap();
            let known = if frame.id == state.charge_info_id {
                apply_charge_info(&db, &frame, &mut state, &self.safety, &mut events);
                true
            } else {
                match frame.id {
                    ids::EVSE_DC_MAX_LIMITS => {
                        apply_evse_max_limits(&db, &frame, &mut state.snapshot);
                        true
                    }
                    ids::EVSE_DC_REGULATION_LIMITS => {
                        apply_regulation_limits(&db, &frame, &mut state.snapshot);
                        true
                    }
                    ids::EVSE_DC_STATUS => {
                        estop_reason = apply_evse_dc_status(&db, &frame, &mut state.snapshot);
                        true
                    }
                    ids::ERROR_CODES => {
                        apply_error_codes(&db, &frame, &mut state.snapshot, &mut events);
                        true
                    }
                    ids::SOFTWARE_INFO => {
                        apply_software_info(&db, &frame, &mut state.snapshot);
                        true
                    }
                    ids::SLAC_INFO => {
                        apply_slac_info(&db, &frame, &mut state.snapshot);
                        true
                    }
                    _ => false,
                }
            };
            if known {
                events.push(EngineEvent::SupervisorUpdated);
            }
        }

        // Snapshot first, then the frame event, then what was derived.
        self.hub.publish(EngineEvent::RawFrameReceived(frame));
        for event in events {
            self.hub.publish(event);
        }
        if let Some(reason) = estop_reason {
            self.emergency_stop_with(reason);
        }
    }
}

fn scheduler_loop(inner: Arc<Inner>, stop: mpsc::Receiver<()>) {
    let cycle = inner.config.cycle_time;
    let mut next = Instant::now() + cycle;
    loop {
        let now = Instant::now();
        if next > now {
            match stop.recv_timeout(next - now) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
        } else {
            // Late tick: fire immediately, but still honor a pending stop.
            match stop.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }
        }
        inner.cyclic_tx();
        next += cycle;
    }
}

// ── Cyclic frame composition ─────────────────────────────────
//
// Each frame starts zeroed and is filled from the bus description of its
// identifier; signal names the description does not carry are skipped.

fn compose_cycle(db: &Database, state: &EngineState) -> Vec<CanFrame> {
    vec![
        compose_max_limits(db, &state.vcu),
        compose_charge_targets(db, &state.vcu, state.snapshot.state),
        compose_status_control(db, &state.vcu),
        compose_status_display(db, &state.vcu),
        compose_plug_status(db, &state.vcu),
        compose_energy_limits(db, &state.vcu),
    ]
}

fn blank_frame(id: u32) -> CanFrame {
    CanFrame::new_extended(id, &[0u8; 8])
}

fn compose_max_limits(db: &Database, vcu: &VcuParameters) -> CanFrame {
    let mut frame = blank_frame(ids::EV_DC_MAX_LIMITS);
    if let Some(message) = db.find_message(ids::EV_DC_MAX_LIMITS) {
        for signal in &message.signals {
            let _ = match signal.name.as_str() {
                "EVMaxCurrent" => signal.encode_physical(&mut frame.data, vcu.max_current),
                "EVMaxVoltage" => signal.encode_physical(&mut frame.data, vcu.max_voltage),
                "EVMaxPower" => signal.encode_physical(&mut frame.data, vcu.max_power),
                "EVFullSoC" => signal.encode_physical(&mut frame.data, vcu.full_soc),
                "EVBulkSoC" => signal.encode_physical(&mut frame.data, vcu.bulk_soc),
                _ => Ok(()),
            };
        }
    }
    frame
}

fn compose_charge_targets(db: &Database, vcu: &VcuParameters, observed: CmsState) -> CanFrame {
    let mut target_current = vcu.target_current;
    if observed == CmsState::PreCharge {
        target_current = target_current.min(PRECHARGE_MAX_CURRENT);
    }

    let mut frame = blank_frame(ids::EV_DC_CHARGE_TARGETS);
    if let Some(message) = db.find_message(ids::EV_DC_CHARGE_TARGETS) {
        for signal in &message.signals {
            let _ = match signal.name.as_str() {
                "EVTargetCurrent" => signal.encode_physical(&mut frame.data, target_current),
                "EVTargetVoltage" => signal.encode_physical(&mut frame.data, vcu.target_voltage),
                "EVPreChargeVoltage" => {
                    signal.encode_physical(&mut frame.data, vcu.precharge_voltage)
                }
                _ => Ok(()),
            };
        }
    }
    frame
}

fn compose_status_control(db: &Database, vcu: &VcuParameters) -> CanFrame {
    let mut frame = blank_frame(ids::EV_STATUS_CONTROL);
    if let Some(message) = db.find_message(ids::EV_STATUS_CONTROL) {
        for signal in &message.signals {
            let _ = match signal.name.as_str() {
                "ChargeProgressIndication" => {
                    signal.encode_raw(&mut frame.data, u64::from(u8::from(vcu.charge_progress)))
                }
                "ChargeStopIndication" => {
                    signal.encode_raw(&mut frame.data, u64::from(u8::from(vcu.charge_stop)))
                }
                "EVReady" => signal.encode_raw(&mut frame.data, u64::from(vcu.ev_ready)),
                "EVWeldingDetectionEnable" => {
                    signal.encode_raw(&mut frame.data, u64::from(vcu.welding_detection_enable))
                }
                "ChargeProtocolPriority" => {
                    signal.encode_raw(&mut frame.data, u64::from(vcu.charge_protocol_priority))
                }
                "BCBControl" => {
                    signal.encode_raw(&mut frame.data, u64::from(u8::from(vcu.bcb_control)))
                }
                _ => Ok(()),
            };
        }
    }
    frame
}

fn compose_status_display(db: &Database, vcu: &VcuParameters) -> CanFrame {
    let mut frame = blank_frame(ids::EV_STATUS_DISPLAY);
    if let Some(message) = db.find_message(ids::EV_STATUS_DISPLAY) {
        for signal in &message.signals {
            let _ = match signal.name.as_str() {
                "EVSoC" => signal.encode_physical(&mut frame.data, vcu.soc),
                "EVErrorCode" => signal.encode_raw(&mut frame.data, u64::from(vcu.error_code)),
                "EVChargingComplete" => {
                    signal.encode_raw(&mut frame.data, u64::from(vcu.charging_complete))
                }
                "EVBulkChargingComplete" => {
                    signal.encode_raw(&mut frame.data, u64::from(vcu.bulk_charging_complete))
                }
                "EVCabinConditioning" => {
                    signal.encode_raw(&mut frame.data, u64::from(vcu.cabin_conditioning))
                }
                "EVRESSConditioning" => {
                    signal.encode_raw(&mut frame.data, u64::from(vcu.ress_conditioning))
                }
                "EVTimeToFullSoC" => {
                    signal.encode_raw(&mut frame.data, u64::from(vcu.time_to_full_soc))
                }
                "EVTimeToBulkSoC" => {
                    signal.encode_raw(&mut frame.data, u64::from(vcu.time_to_bulk_soc))
                }
                _ => Ok(()),
            };
        }
    }
    frame
}

fn compose_plug_status(db: &Database, vcu: &VcuParameters) -> CanFrame {
    let mut frame = blank_frame(ids::EV_PLUG_STATUS);
    if let Some(message) = db.find_message(ids::EV_PLUG_STATUS) {
        for signal in &message.signals {
            let _ = match signal.name.as_str() {
                "EVControlPilotDutyCycle" => {
                    signal.encode_raw(&mut frame.data, u64::from(vcu.control_pilot_duty_cycle))
                }
                "EVControlPilotState" => {
                    signal.encode_raw(&mut frame.data, u64::from(vcu.control_pilot_state))
                }
                "EVProximityPinState" => {
                    signal.encode_raw(&mut frame.data, u64::from(vcu.proximity_pin_state))
                }
                _ => Ok(()),
            };
        }
    }
    frame
}

fn compose_energy_limits(db: &Database, vcu: &VcuParameters) -> CanFrame {
    let mut frame = blank_frame(ids::EV_DC_ENERGY_LIMITS);
    if let Some(message) = db.find_message(ids::EV_DC_ENERGY_LIMITS) {
        for signal in &message.signals {
            let _ = match signal.name.as_str() {
                "EVEnergyCapacity" => signal.encode_physical(&mut frame.data, vcu.energy_capacity),
                "EVEnergyRequest" => signal.encode_physical(&mut frame.data, vcu.energy_request),
                _ => Ok(()),
            };
        }
    }
    frame
}

// ── Inbound decoding ─────────────────────────────────────────

fn apply_charge_info(
    db: &Database,
    frame: &CanFrame,
    state: &mut EngineState,
    safety: &SafetyMonitor,
    events: &mut Vec<EngineEvent>,
) {
    let Some(decoded) = db.decode(frame) else {
        return;
    };
    for signal in &decoded.signals {
        match signal.name.as_str() {
            "StateMachineState" => {
                let new_state = CmsState::from(signal.raw as u8);
                if new_state != state.snapshot.state {
                    state.snapshot.state = new_state;
                    if new_state != state.last_state {
                        state.last_state = new_state;
                        events.push(EngineEvent::StateChanged(new_state));
                    }
                }
            }
            "AliveCounter" => {
                state.snapshot.alive_counter = signal.raw as u8;
                safety.update_alive_counter(signal.raw as u8);
            }
            "ControlPilotState" => {
                state.snapshot.control_pilot_state = ControlPilotState::from(signal.raw as u8);
            }
            "ControlPilotDutyCycle" => {
                state.snapshot.control_pilot_duty_cycle = signal.raw as u8;
            }
            "ActualChargeProtocol" => {
                state.snapshot.charge_protocol = ChargeProtocol::from(signal.raw as u8);
            }
            "ProximityPinState" => state.snapshot.proximity_pin_state = signal.raw as u8,
            "SwS2Close" => state.snapshot.s2_closed = signal.raw == 1,
            "VoltageMatch" => state.snapshot.voltage_match = signal.raw == 1,
            "EVSECompatible" => state.snapshot.evse_compatible = signal.raw == 1,
            "TCPStatus" => state.snapshot.tcp_connected = signal.raw == 1,
            "BCBStatus" => state.snapshot.bcb_status = signal.raw as u8,
            _ => {}
        }
    }
}

fn apply_evse_max_limits(db: &Database, frame: &CanFrame, snapshot: &mut SupervisorSnapshot) {
    let Some(decoded) = db.decode(frame) else {
        return;
    };
    for signal in &decoded.signals {
        if !signal.valid {
            continue;
        }
        match signal.name.as_str() {
            "EVSEMaxCurrent" => snapshot.evse_max_current = signal.physical,
            "EVSEMaxVoltage" => snapshot.evse_max_voltage = signal.physical,
            "EVSEMaxPower" => snapshot.evse_max_power = signal.physical,
            "EVSEEnergyToBeDelivered" => snapshot.evse_energy_to_be_delivered = signal.physical,
            _ => {}
        }
    }
}

fn apply_regulation_limits(db: &Database, frame: &CanFrame, snapshot: &mut SupervisorSnapshot) {
    let Some(decoded) = db.decode(frame) else {
        return;
    };
    for signal in &decoded.signals {
        if !signal.valid {
            continue;
        }
        match signal.name.as_str() {
            "EVSEMinCurrent" => snapshot.evse_min_current = signal.physical,
            "EVSEMinVoltage" => snapshot.evse_min_voltage = signal.physical,
            "EVSEPeakCurrentRipple" => snapshot.evse_peak_current_ripple = signal.physical,
            "EVSECurrentRegulationTolerance" => {
                snapshot.evse_current_regulation_tolerance = signal.physical;
            }
            _ => {}
        }
    }
}

fn apply_evse_dc_status(
    db: &Database,
    frame: &CanFrame,
    snapshot: &mut SupervisorSnapshot,
) -> Option<&'static str> {
    let decoded = db.decode(frame)?;
    for signal in &decoded.signals {
        match signal.name.as_str() {
            "EVSEPresentVoltage" if signal.valid => {
                snapshot.evse_present_voltage = signal.physical;
            }
            "EVSEPresentCurrent" if signal.valid => {
                snapshot.evse_present_current = signal.physical;
            }
            "EVSEIsolationStatus" => {
                snapshot.evse_isolation_status = EvseIsolationStatus::from(signal.raw as u8);
            }
            "EVSEStatusCode" => {
                snapshot.evse_status_code = EvseStatusCode::from(signal.raw as u8);
            }
            "EVSENotification" => snapshot.evse_notification = signal.raw as u8,
            "EVSENotificationMaxDelay" => {
                snapshot.evse_notification_max_delay = signal.raw as u16;
            }
            "EVSECurrentLimitAchieved" => snapshot.evse_current_limit_achieved = signal.raw == 1,
            "EVSEVoltageLimitAchieved" => snapshot.evse_voltage_limit_achieved = signal.raw == 1,
            "EVSEPowerLimitAchieved" => snapshot.evse_power_limit_achieved = signal.raw == 1,
            _ => {}
        }
    }

    match snapshot.evse_status_code {
        EvseStatusCode::EmergencyShutdown | EvseStatusCode::Malfunction => {
            Some("EVSE emergency/malfunction detected")
        }
        _ => None,
    }
}

fn apply_error_codes(
    db: &Database,
    frame: &CanFrame,
    snapshot: &mut SupervisorSnapshot,
    events: &mut Vec<EngineEvent>,
) {
    let Some(decoded) = db.decode(frame) else {
        return;
    };
    for signal in &decoded.signals {
        let code = signal.raw as u16;
        match signal.name.as_str() {
            "ErrorCodeLevel0" => {
                if code != snapshot.error_code_level0 && code > 1 {
                    events.push(EngineEvent::ErrorCodeReceived {
                        code,
                        description: error_code_description(code),
                    });
                }
                snapshot.error_code_level0 = code;
            }
            "ErrorCodeLevel1" => snapshot.error_code_level1 = code,
            "ErrorCodeLevel2" => snapshot.error_code_level2 = code,
            "ErrorCodeLevel3" => snapshot.error_code_level3 = code,
            _ => {}
        }
    }
}

fn apply_software_info(db: &Database, frame: &CanFrame, snapshot: &mut SupervisorSnapshot) {
    let Some(decoded) = db.decode(frame) else {
        return;
    };
    for signal in &decoded.signals {
        match signal.name.as_str() {
            "SoftwareVersionMajor" => snapshot.sw_version_major = signal.raw as u8,
            "SoftwareVersionMinor" => snapshot.sw_version_minor = signal.raw as u8,
            "SoftwareVersionPatch" => snapshot.sw_version_patch = signal.raw as u8,
            "SoftwareVersionConfig" => snapshot.sw_version_config = signal.raw as u8,
            _ => {}
        }
    }
}

fn apply_slac_info(db: &Database, frame: &CanFrame, snapshot: &mut SupervisorSnapshot) {
    let Some(decoded) = db.decode(frame) else {
        return;
    };
    for signal in &decoded.signals {
        match signal.name.as_str() {
            "SLACState" => snapshot.slac_state = signal.raw as u8,
            "LinkStatus" => snapshot.link_status = signal.raw as u8,
            "MeasuredAttenuation" if signal.valid => {
                snapshot.measured_attenuation = signal.physical;
            }
            _ => {}
        }
    }
}
