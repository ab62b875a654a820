//! Plain-text summary of one charging session.
//!
//! Energy is integrated with the trapezoidal rule over the sampled power;
//! sample gaps of five seconds or more contribute nothing. State of charge
//! is tracked from the first non-negative sample.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Sample gaps at or above this many milliseconds are ignored.
const GAP_LIMIT_MS: u64 = 5000;

pub struct SessionReport {
    active: bool,
    start_time: SystemTime,
    end_time: SystemTime,
    last_update: Instant,
    max_voltage: f64,
    max_current: f64,
    max_power: f64,
    energy_wh: f64,
    start_soc: f64,
    end_soc: f64,
    last_voltage: f64,
    last_current: f64,
}

impl SessionReport {
    pub fn new() -> Self {
        Self {
            active: false,
            start_time: SystemTime::now(),
            end_time: SystemTime::now(),
            last_update: Instant::now(),
            max_voltage: 0.0,
            max_current: 0.0,
            max_power: 0.0,
            energy_wh: 0.0,
            start_soc: -1.0,
            end_soc: 0.0,
            last_voltage: 0.0,
            last_current: 0.0,
        }
    }

    pub fn start_session(&mut self) {
        self.active = true;
        self.start_time = SystemTime::now();
        self.end_time = self.start_time;
        self.last_update = Instant::now();
        self.max_voltage = 0.0;
        self.max_current = 0.0;
        self.max_power = 0.0;
        self.energy_wh = 0.0;
        self.start_soc = -1.0;
        self.end_soc = 0.0;
        self.last_voltage = 0.0;
        self.last_current = 0.0;
    }

    pub fn end_session(&mut self) {
        self.active = false;
        self.end_time = SystemTime::now();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Feed one telemetry sample. Pass a negative SoC when it is unknown.
    pub fn update_values(&mut self, voltage: f64, current: f64, soc: f64) {
        if !self.active {
            return;
        }
        let dt_ms = self.last_update.elapsed().as_millis() as u64;
        self.last_update = Instant::now();
        self.integrate(voltage, current, soc, dt_ms);
    }

    fn integrate(&mut self, voltage: f64, current: f64, soc: f64, dt_ms: u64) {
        let power = voltage * current;

        self.max_voltage = self.max_voltage.max(voltage);
        self.max_current = self.max_current.max(current);
        self.max_power = self.max_power.max(power);

        if dt_ms > 0 && dt_ms < GAP_LIMIT_MS {
            let average_power = (power + self.last_voltage * self.last_current) / 2.0;
            self.energy_wh += average_power * (dt_ms as f64 / 3_600_000.0);
        }

        self.last_voltage = voltage;
        self.last_current = current;

        if self.start_soc < 0.0 && soc >= 0.0 {
            self.start_soc = soc;
        }
        self.end_soc = soc;
    }

    pub fn duration_seconds(&self) -> u64 {
        let end = if self.active {
            SystemTime::now()
        } else {
            self.end_time
        };
        end.duration_since(self.start_time)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    pub fn max_voltage(&self) -> f64 {
        self.max_voltage
    }

    pub fn max_current(&self) -> f64 {
        self.max_current
    }

    pub fn max_power(&self) -> f64 {
        self.max_power
    }

    pub fn energy_wh(&self) -> f64 {
        self.energy_wh
    }

    /// Write the plain-text report.
    pub fn save_report(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut out = File::create(path)?;

        writeln!(out, "=== CCS Charging Session Report ===")?;
        writeln!(out)?;
        writeln!(out, "Start Time:     {}", format_time(self.start_time))?;
        writeln!(out, "End Time:       {}", format_time(self.end_time))?;
        writeln!(out, "Duration:       {} seconds", self.duration_seconds())?;
        writeln!(out)?;

        writeln!(out, "--- Peak Values ---")?;
        writeln!(out, "Max Voltage:    {:.1} V", self.max_voltage)?;
        writeln!(out, "Max Current:    {:.1} A", self.max_current)?;
        writeln!(out, "Max Power:      {:.2} kW", self.max_power / 1000.0)?;
        writeln!(out)?;

        writeln!(out, "--- Energy ---")?;
        writeln!(
            out,
            "Energy Delivered: {:.1} Wh ({:.3} kWh)",
            self.energy_wh,
            self.energy_wh / 1000.0
        )?;
        writeln!(out)?;

        writeln!(out, "--- State of Charge ---")?;
        if self.start_soc >= 0.0 {
            writeln!(out, "Start SoC:      {:.1} %", self.start_soc)?;
            writeln!(out, "End SoC:        {:.1} %", self.end_soc)?;
            writeln!(out, "Delta SoC:      {:.1} %", self.end_soc - self.start_soc)?;
        } else {
            writeln!(out, "SoC data not available")?;
        }

        writeln!(out)?;
        writeln!(out, "=== End of Report ===")?;
        Ok(())
    }
}

impl Default for SessionReport {
    fn default() -> Self {
        Self::new()
    }
}

/// `yyyy-MM-dd hh:mm:ss` in UTC.
fn format_time(time: SystemTime) -> String {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let days = (secs / 86_400) as i64;
    let seconds_of_day = secs % 86_400;
    let (year, month, day) = civil_from_days(days);
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        year,
        month,
        day,
        seconds_of_day / 3600,
        (seconds_of_day / 60) % 60,
        seconds_of_day % 60
    )
}

/// Gregorian date from days since 1970-01-01.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let year = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if month <= 2 { year + 1 } else { year }, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn energy_integrates_trapezoidally() {
        let mut report = SessionReport::new();
        report.start_session();

        // 40 kW held for two 100 ms intervals: 40000 * 0.2/3600 h.
        report.integrate(400.0, 100.0, 20.0, 0);
        report.integrate(400.0, 100.0, 21.0, 100);
        report.integrate(400.0, 100.0, 22.0, 100);

        let expected = 40_000.0 * (0.2 / 3600.0);
        assert!((report.energy_wh() - expected).abs() < 0.01);
        assert_eq!(report.max_power(), 40_000.0);
        assert_eq!(report.max_voltage(), 400.0);
        assert_eq!(report.max_current(), 100.0);
    }

    #[test]
    fn gaps_of_five_seconds_contribute_nothing() {
        let mut report = SessionReport::new();
        report.start_session();

        report.integrate(400.0, 100.0, 20.0, 0);
        report.integrate(400.0, 100.0, 20.0, 5000);
        assert_eq!(report.energy_wh(), 0.0);

        report.integrate(400.0, 100.0, 20.0, 100);
        assert!(report.energy_wh() > 0.0);
    }

    #[test]
    fn soc_tracks_from_first_valid_sample() {
        let mut report = SessionReport::new();
        report.start_session();

        report.integrate(0.0, 0.0, -1.0, 0);
        report.integrate(400.0, 100.0, 20.0, 100);
        report.integrate(400.0, 100.0, 35.0, 100);
        report.end_session();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        report.save_report(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("Start SoC:      20.0 %"));
        assert!(content.contains("End SoC:        35.0 %"));
        assert!(content.contains("Delta SoC:      15.0 %"));
    }

    #[test]
    fn missing_soc_is_reported_as_unavailable() {
        let mut report = SessionReport::new();
        report.start_session();
        report.integrate(400.0, 100.0, -1.0, 100);
        report.end_session();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        report.save_report(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("=== CCS Charging Session Report ==="));
        assert!(content.contains("SoC data not available"));
        assert!(content.contains("=== End of Report ==="));
    }

    #[test]
    fn samples_outside_a_session_are_ignored() {
        let mut report = SessionReport::new();
        report.update_values(400.0, 100.0, 50.0);
        assert_eq!(report.max_voltage(), 0.0);
        assert_eq!(report.energy_wh(), 0.0);
    }

    #[test]
    fn time_formatting_is_civil() {
        // 2024-03-01 12:30:45 UTC.
        let time = UNIX_EPOCH + std::time::Duration::from_secs(1_709_296_245);
        assert_eq!(format_time(time), "2024-03-01 12:30:45");
    }
}
