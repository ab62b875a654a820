//! Construction-time knobs of the protocol engine.

use std::time::Duration;

/// Default user ceiling for the EV maximum voltage, V.
pub const DEFAULT_USER_MAX_VOLTAGE: f64 = 500.0;
/// Default user ceiling for the EV maximum current, A.
pub const DEFAULT_USER_MAX_CURRENT: f64 = 200.0;
/// Default user ceiling for the EV maximum power, W.
pub const DEFAULT_USER_MAX_POWER: f64 = 100_000.0;

/// The alive counter must change within this window.
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_millis(1500);
/// A cyclic supervisor message must repeat within this window.
pub const DEFAULT_MESSAGE_TIMEOUT: Duration = Duration::from_millis(1000);
/// Cycle of the VCU transmit schedule.
pub const DEFAULT_CYCLE_TIME: Duration = Duration::from_millis(100);
/// Cadence of the safety watchdog.
pub const WATCHDOG_TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub user_max_voltage: f64,
    pub user_max_current: f64,
    pub user_max_power: f64,
    pub heartbeat_timeout: Duration,
    pub message_timeout: Duration,
    pub cycle_time: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            user_max_voltage: DEFAULT_USER_MAX_VOLTAGE,
            user_max_current: DEFAULT_USER_MAX_CURRENT,
            user_max_power: DEFAULT_USER_MAX_POWER,
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            message_timeout: DEFAULT_MESSAGE_TIMEOUT,
            cycle_time: DEFAULT_CYCLE_TIME,
        }
    }
}
