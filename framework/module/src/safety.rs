//! Electrical and timing safety supervision.
//!
//! The monitor clamps setpoints into the hard and user limit envelopes,
//! watches the supervisor's alive counter and per-identifier message
//! freshness, and latches the emergency stop. Notifications go out through
//! an event hub; the latch itself is also queried synchronously by the
//! engine at the top of every transmit cycle.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use ccs_core::event::EventHub;
use log::warn;

use crate::config::{DEFAULT_HEARTBEAT_TIMEOUT, DEFAULT_MESSAGE_TIMEOUT};

/// Alive counter value meaning "signal not available".
const ALIVE_COUNTER_SNA: u8 = 15;

/// Hard ceilings derived from the bus description signal ranges, plus the
/// user ceilings configured at engine construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Limits {
    pub max_voltage: f64,
    pub max_current: f64,
    pub max_power: f64,
    pub min_voltage: f64,
    /// Negative to permit regeneration.
    pub min_current: f64,

    pub user_max_voltage: f64,
    pub user_max_current: f64,
    pub user_max_power: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_voltage: 6500.0,
            max_current: 6500.0,
            max_power: 3_276_700.0,
            min_voltage: 0.0,
            min_current: -3250.0,
            user_max_voltage: 500.0,
            user_max_current: 200.0,
            user_max_power: 100_000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SafetyEvent {
    HeartbeatLost,
    HeartbeatRestored,
    /// The identifier stopped repeating within its freshness window.
    MessageTimeout(u32),
    EmergencyStopTriggered(String),
    EmergencyStopCleared,
}

struct Heartbeat {
    last_counter: u8,
    last_change: Instant,
    ok: bool,
}

struct MessageSeen {
    last_seen: Instant,
    timed_out: bool,
}

pub struct SafetyMonitor {
    limits: Mutex<Limits>,
    heartbeat: Mutex<Heartbeat>,
    seen: Mutex<BTreeMap<u32, MessageSeen>>,
    emergency_stopped: Mutex<bool>,
    hub: EventHub<SafetyEvent>,
    heartbeat_timeout: Duration,
    message_timeout: Duration,
}

impl SafetyMonitor {
    pub fn new() -> Self {
        Self::with_timeouts(DEFAULT_HEARTBEAT_TIMEOUT, DEFAULT_MESSAGE_TIMEOUT)
    }

    pub fn with_timeouts(heartbeat_timeout: Duration, message_timeout: Duration) -> Self {
        Self {
            limits: Mutex::new(Limits::default()),
            heartbeat: Mutex::new(Heartbeat {
                last_counter: ALIVE_COUNTER_SNA,
                last_change: Instant::now(),
                ok: false,
            }),
            seen: Mutex::new(BTreeMap::new()),
            emergency_stopped: Mutex::new(false),
            hub: EventHub::new(),
            heartbeat_timeout,
            message_timeout,
        }
    }

    pub fn subscribe(&self) -> std::sync::mpsc::Receiver<SafetyEvent> {
        self.hub.subscribe()
    }

    // ── Limit validation ─────────────────────────────────────

    pub fn limits(&self) -> Limits {
        self.limits.lock().unwrap().clone()
    }

    pub fn clamp_voltage(&self, voltage: f64) -> f64 {
        let limits = self.limits.lock().unwrap();
        voltage.clamp(
            limits.min_voltage,
            limits.max_voltage.min(limits.user_max_voltage),
        )
    }

    pub fn clamp_current(&self, current: f64) -> f64 {
        let limits = self.limits.lock().unwrap();
        current.clamp(
            limits.min_current,
            limits.max_current.min(limits.user_max_current),
        )
    }

    pub fn clamp_power(&self, power: f64) -> f64 {
        let limits = self.limits.lock().unwrap();
        power.clamp(0.0, limits.max_power.min(limits.user_max_power))
    }

    pub fn is_voltage_in_range(&self, voltage: f64) -> bool {
        let limits = self.limits.lock().unwrap();
        voltage >= limits.min_voltage && voltage <= limits.user_max_voltage
    }

    pub fn is_current_in_range(&self, current: f64) -> bool {
        let limits = self.limits.lock().unwrap();
        current >= limits.min_current && current <= limits.user_max_current
    }

    /// Saturate the requested user ceilings into the hard envelope.
    pub fn set_user_limits(&self, max_voltage: f64, max_current: f64, max_power: f64) {
        let mut limits = self.limits.lock().unwrap();
        limits.user_max_voltage = max_voltage.clamp(0.0, limits.max_voltage);
        limits.user_max_current = max_current.clamp(0.0, limits.max_current);
        limits.user_max_power = max_power.clamp(0.0, limits.max_power);
    }

    // ── Heartbeat monitoring ─────────────────────────────────

    /// Feed the alive counter decoded from ChargeInfo. Any change refreshes
    /// the heartbeat; the SNA value is ignored.
    pub fn update_alive_counter(&self, counter: u8) {
        if counter == ALIVE_COUNTER_SNA {
            return;
        }
        let mut heartbeat = self.heartbeat.lock().unwrap();
        if counter != heartbeat.last_counter {
            heartbeat.last_counter = counter;
            heartbeat.last_change = Instant::now();
            if !heartbeat.ok {
                heartbeat.ok = true;
                drop(heartbeat);
                self.hub.publish(SafetyEvent::HeartbeatRestored);
            }
        }
    }

    pub fn is_heartbeat_ok(&self) -> bool {
        self.heartbeat.lock().unwrap().ok
    }

    // ── Message freshness ────────────────────────────────────

    /// Note a reception of `id`, clearing its sticky timeout flag.
    pub fn message_received(&self, id: u32) {
        self.seen.lock().unwrap().insert(
            id,
            MessageSeen {
                last_seen: Instant::now(),
                timed_out: false,
            },
        );
    }

    /// `true` when the identifier has timed out or was never seen.
    pub fn is_message_timed_out(&self, id: u32) -> bool {
        self.seen
            .lock()
            .unwrap()
            .get(&id)
            .map_or(true, |entry| entry.timed_out)
    }

    // ── Emergency stop ───────────────────────────────────────

    /// Latch the emergency stop. Returns `true` and emits the event only on
    /// the transition; re-triggering while latched is a no-op.
    pub fn trigger_emergency_stop(&self, reason: &str) -> bool {
        {
            let mut stopped = self.emergency_stopped.lock().unwrap();
            if *stopped {
                return false;
            }
            *stopped = true;
        }
        warn!("EMERGENCY STOP: {reason}");
        self.hub
            .publish(SafetyEvent::EmergencyStopTriggered(reason.to_owned()));
        true
    }

    /// Release the latch. Emits the event only from a latched state.
    pub fn clear_emergency_stop(&self) -> bool {
        {
            let mut stopped = self.emergency_stopped.lock().unwrap();
            if !*stopped {
                return false;
            }
            *stopped = false;
        }
        self.hub.publish(SafetyEvent::EmergencyStopCleared);
        true
    }

    pub fn is_emergency_stopped(&self) -> bool {
        *self.emergency_stopped.lock().unwrap()
    }

    // ── Watchdog ─────────────────────────────────────────────

    /// One watchdog pass: heartbeat age and per-identifier freshness.
    /// Driven every 100 ms by the engine.
    pub fn tick(&self, now: Instant) {
        let lost = {
            let mut heartbeat = self.heartbeat.lock().unwrap();
            if heartbeat.ok && now.duration_since(heartbeat.last_change) > self.heartbeat_timeout {
                heartbeat.ok = false;
                true
            } else {
                false
            }
        };
        if lost {
            self.hub.publish(SafetyEvent::HeartbeatLost);
        }

        let mut timeouts = Vec::new();
        {
            let mut seen = self.seen.lock().unwrap();
            for (id, entry) in seen.iter_mut() {
                if !entry.timed_out && now.duration_since(entry.last_seen) > self.message_timeout {
                    entry.timed_out = true;
                    timeouts.push(*id);
                }
            }
        }
        for id in timeouts {
            self.hub.publish(SafetyEvent::MessageTimeout(id));
        }
    }
}

impl Default for SafetyMonitor {
    fn default() -> Self {
        Self::new()
    }
}
