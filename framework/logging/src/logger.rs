//! CSV logs of raw and decoded bus traffic.
//!
//! Raw log: `Timestamp_ms,Direction,ID,Extended,DLC,Data` with the payload
//! as space-separated uppercase hex. Decoded log: one line per decoded
//! signal, `Timestamp_ms,Message,Signal,RawValue,PhysicalValue,Unit,
//! Description`. Timestamps count from the moment the raw log started.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use ccs_core::CanFrame;
use ccs_dbc::Database;
use log::warn;

/// Writers are flushed after this many records.
const FLUSH_EVERY: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Rx,
    Tx,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Rx => "RX",
            Direction::Tx => "TX",
        })
    }
}

pub struct CanLogger {
    raw: Option<BufWriter<File>>,
    decoded: Option<BufWriter<File>>,
    database: Option<Database>,
    start: Instant,
    raw_count: u64,
    decoded_count: u64,
}

impl CanLogger {
    pub fn new() -> Self {
        Self {
            raw: None,
            decoded: None,
            database: None,
            start: Instant::now(),
            raw_count: 0,
            decoded_count: 0,
        }
    }

    /// The bus description used to fill the decoded log.
    pub fn set_database(&mut self, database: Database) {
        self.database = Some(database);
    }

    /// Open the raw CSV log and write its header. Resets the timestamp
    /// origin.
    pub fn start_raw_log(&mut self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "Timestamp_ms,Direction,ID,Extended,DLC,Data")?;
        writer.flush()?;
        self.raw = Some(writer);
        self.raw_count = 0;
        self.start = Instant::now();
        Ok(())
    }

    /// Open the decoded CSV log and write its header.
    pub fn start_decoded_log(&mut self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(
            writer,
            "Timestamp_ms,Message,Signal,RawValue,PhysicalValue,Unit,Description"
        )?;
        writer.flush()?;
        self.decoded = Some(writer);
        self.decoded_count = 0;
        Ok(())
    }

    /// Flush and close both logs.
    pub fn stop_all(&mut self) {
        if let Some(mut writer) = self.raw.take() {
            let _ = writer.flush();
        }
        if let Some(mut writer) = self.decoded.take() {
            let _ = writer.flush();
        }
    }

    /// Record one frame in whichever logs are open.
    pub fn log_frame(&mut self, frame: &CanFrame, direction: Direction) {
        let elapsed_ms = self.start.elapsed().as_millis();

        if let Some(writer) = self.raw.as_mut() {
            match write_raw_line(writer, frame, direction, elapsed_ms) {
                Ok(()) => {
                    self.raw_count += 1;
                    if self.raw_count % FLUSH_EVERY == 0 {
                        let _ = writer.flush();
                    }
                }
                Err(e) => {
                    warn!("raw log write failed: {e}");
                    self.raw = None;
                }
            }
        }

        if let (Some(database), Some(writer)) = (self.database.as_ref(), self.decoded.as_mut()) {
            match write_decoded_lines(writer, database, frame, elapsed_ms) {
                Ok(written) => {
                    let before = self.decoded_count;
                    self.decoded_count += written;
                    if before / FLUSH_EVERY != self.decoded_count / FLUSH_EVERY {
                        let _ = writer.flush();
                    }
                }
                Err(e) => {
                    warn!("decoded log write failed: {e}");
                    self.decoded = None;
                }
            }
        }
    }
}

fn write_raw_line(
    writer: &mut BufWriter<File>,
    frame: &CanFrame,
    direction: Direction,
    elapsed_ms: u128,
) -> io::Result<()> {
    writeln!(
        writer,
        "{},{},{},{},{},{}",
        elapsed_ms,
        direction,
        frame.id_string(),
        if frame.extended { "EXT" } else { "STD" },
        frame.dlc,
        frame.hex_string()
    )
}

/// Returns the number of signal lines written.
fn write_decoded_lines(
    writer: &mut BufWriter<File>,
    database: &Database,
    frame: &CanFrame,
    elapsed_ms: u128,
) -> io::Result<u64> {
    let Some(decoded) = database.decode(frame) else {
        return Ok(0);
    };
    for signal in &decoded.signals {
        writeln!(
            writer,
            "{},{},{},{},{},{},{}",
            elapsed_ms,
            decoded.name,
            signal.name,
            signal.raw,
            signal.physical,
            signal.unit,
            signal.label.as_deref().unwrap_or_default()
        )?;
    }
    Ok(decoded.signals.len() as u64)
}

impl Default for CanLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CanLogger {
    fn drop(&mut self) {
        self.stop_all();
    }
}
