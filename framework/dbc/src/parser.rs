//! Line-oriented parser for the textual bus description form.
//!
//! The parser folds each recognized line into an accumulating [`Database`],
//! carrying the canonical identifier of the most recently opened message as
//! explicit scope for `SG_` lines. It is deliberately tolerant: lines it
//! cannot make sense of are skipped, unknown keywords are ignored, and a
//! blank line closes the current signal scope. The only failure it reports
//! is an unreadable file.

use std::fs;
use std::path::Path;

use log::{debug, trace};

use crate::database::Database;
use crate::error::{Error, Result};
use crate::message::{MessageDef, SendType};
use crate::signal::{ByteOrder, SignalDef};
use crate::{CANONICAL_ID_MASK, EXTENDED_FLAG};

#[derive(Default)]
pub struct Parser {
    db: Database,
    /// Canonical id of the message whose signal list is currently open.
    scope: Option<u32>,
}

impl Parser {
    /// Parse a bus description file. Fails only when the file cannot be
    /// read; the content itself is handled tolerantly.
    pub fn parse_file(path: impl AsRef<Path>) -> Result<Database> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::ParseIo {
            path: path.display().to_string(),
            source,
        })?;
        let db = Self::parse_str(&text);
        debug!(
            "parsed bus description {} ({} messages)",
            path.display(),
            db.message_count()
        );
        Ok(db)
    }

    /// Parse a bus description from memory. Total: never fails.
    pub fn parse_str(text: &str) -> Database {
        let mut parser = Parser::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                parser.scope = None;
                continue;
            }
            parser.parse_line(line);
        }
        parser.db
    }

    fn parse_line(&mut self, line: &str) {
        let handled = if let Some(rest) = line.strip_prefix("BU_:") {
            self.parse_nodes(rest)
        } else if line.starts_with("BO_ ") {
            self.parse_message(line)
        } else if line.starts_with("SG_ ") {
            self.parse_signal(line)
        } else if line.starts_with("CM_ ") {
            self.parse_comment(line)
        } else if line.starts_with("BA_ ") {
            self.parse_attribute(line)
        } else if line.starts_with("VAL_ ") {
            self.parse_value_table(line)
        } else {
            // Unknown keyword, not ours to judge.
            return;
        };

        if handled.is_none() {
            trace!("skipping malformed line: {line}");
        }
    }

    fn parse_nodes(&mut self, rest: &str) -> Option<()> {
        self.db.nodes = rest.split_whitespace().map(str::to_owned).collect();
        Some(())
    }

    /// `BO_ 2147488512 EVDCMaxLimits: 8 VCU`
    fn parse_message(&mut self, line: &str) -> Option<()> {
        let rest = line.strip_prefix("BO_")?.trim_start();
        let (id_str, rest) = rest.split_once(char::is_whitespace)?;
        let raw_id: u32 = id_str.parse().ok()?;
        let (name, rest) = rest.split_once(':')?;
        let mut tail = rest.split_whitespace();
        let dlc: u8 = tail.next()?.parse().ok()?;
        let transmitter = tail.next().unwrap_or_default().to_owned();

        let id = raw_id & CANONICAL_ID_MASK;
        let message = MessageDef {
            raw_id,
            id,
            extended: raw_id & EXTENDED_FLAG != 0,
            name: name.trim().to_owned(),
            dlc,
            transmitter,
            ..MessageDef::default()
        };

        // Last definition wins for duplicate identifiers.
        self.db.messages.insert(id, message);
        self.scope = Some(id);
        Some(())
    }

    /// `SG_ EVMaxCurrent : 0|16@1+ (0.1,0) [0|6500] "A" CMS`
    fn parse_signal(&mut self, line: &str) -> Option<()> {
        let scope = self.scope?;

        let rest = line.strip_prefix("SG_")?.trim_start();
        let (name_part, rest) = rest.split_once(':')?;
        // A multiplexer indicator may trail the name; only the name matters.
        let name = name_part.split_whitespace().next()?;

        let rest = rest.trim_start();
        let (start_str, rest) = rest.split_once('|')?;
        let start_bit: u16 = start_str.trim().parse().ok()?;
        let (len_str, rest) = rest.split_once('@')?;
        let bit_length: u16 = len_str.trim().parse().ok()?;

        let mut chars = rest.chars();
        let byte_order = match chars.next()? {
            '0' => ByteOrder::BigEndian,
            '1' => ByteOrder::LittleEndian,
            _ => return None,
        };
        let signed = match chars.next()? {
            '+' => false,
            '-' => true,
            _ => return None,
        };

        let rest = chars.as_str().trim_start().strip_prefix('(')?;
        let (factor_str, rest) = rest.split_once(',')?;
        let (offset_str, rest) = rest.split_once(')')?;
        let rest = rest.trim_start().strip_prefix('[')?;
        let (min_str, rest) = rest.split_once('|')?;
        let (max_str, rest) = rest.split_once(']')?;
        let rest = rest.trim_start().strip_prefix('"')?;
        let (unit, _) = rest.split_once('"')?;

        let signal = SignalDef {
            name: name.to_owned(),
            start_bit,
            bit_length,
            byte_order,
            signed,
            factor: factor_str.trim().parse().ok()?,
            offset: offset_str.trim().parse().ok()?,
            min: min_str.trim().parse().ok()?,
            max: max_str.trim().parse().ok()?,
            unit: unit.to_owned(),
            ..SignalDef::default()
        };

        let message = self.db.messages.get_mut(&scope)?;
        if !signal.fits_in(message.dlc) {
            trace!(
                "signal {} does not fit into {} ({} bytes)",
                signal.name,
                message.name,
                message.dlc
            );
            return Some(());
        }
        message.signals.push(signal);
        Some(())
    }

    /// `CM_ BO_ <id> "…";` / `CM_ SG_ <id> <signal> "…";`
    fn parse_comment(&mut self, line: &str) -> Option<()> {
        let rest = line.strip_prefix("CM_")?.trim_start();

        if let Some(rest) = rest.strip_prefix("BO_") {
            let (id_str, rest) = rest.trim_start().split_once(char::is_whitespace)?;
            let raw_id: u32 = id_str.parse().ok()?;
            let comment = quoted(rest)?;
            let message = self.db.messages.get_mut(&(raw_id & CANONICAL_ID_MASK))?;
            message.comment = Some(comment.to_owned());
        } else if let Some(rest) = rest.strip_prefix("SG_") {
            let mut tail = rest.split_whitespace();
            let raw_id: u32 = tail.next()?.parse().ok()?;
            let sig_name = tail.next()?;
            let comment = quoted(rest)?.to_owned();
            let message = self.db.messages.get_mut(&(raw_id & CANONICAL_ID_MASK))?;
            message.signal_mut(sig_name)?.comment = Some(comment);
        }
        Some(())
    }

    /// `BA_ "<attribute>" …;`
    fn parse_attribute(&mut self, line: &str) -> Option<()> {
        let rest = line.strip_prefix("BA_")?.trim_start().strip_prefix('"')?;
        let (attribute, rest) = rest.split_once('"')?;
        let rest = rest.trim_start();

        match attribute {
            "DBName" => self.db.name = quoted(rest)?.to_owned(),
            "BusType" => self.db.bus_type = quoted(rest)?.to_owned(),
            "GenMsgCycleTime" => {
                let rest = rest.strip_prefix("BO_")?.trim_start();
                let mut tail = rest.split_whitespace();
                let raw_id: u32 = tail.next()?.parse().ok()?;
                let cycle: u32 = number(tail.next()?)?;
                let message = self.db.messages.get_mut(&(raw_id & CANONICAL_ID_MASK))?;
                message.cycle_time_ms = Some(cycle);
            }
            "GenMsgSendType" => {
                let rest = rest.strip_prefix("BO_")?.trim_start();
                let mut tail = rest.split_whitespace();
                let raw_id: u32 = tail.next()?.parse().ok()?;
                let index: u32 = number(tail.next()?)?;
                let message = self.db.messages.get_mut(&(raw_id & CANONICAL_ID_MASK))?;
                message.send_type = Some(SendType::from_index(index));
            }
            "GenSigStartValue" => {
                let rest = rest.strip_prefix("SG_")?.trim_start();
                let mut tail = rest.split_whitespace();
                let raw_id: u32 = tail.next()?.parse().ok()?;
                let sig_name = tail.next()?;
                let value: u64 = number(tail.next()?)?;
                let message = self.db.messages.get_mut(&(raw_id & CANONICAL_ID_MASK))?;
                message.signal_mut(sig_name)?.start_value = Some(value);
            }
            _ => {}
        }
        Some(())
    }

    /// `VAL_ <id> <signal> <n> "label" <n> "label" …;`
    fn parse_value_table(&mut self, line: &str) -> Option<()> {
        let rest = line.strip_prefix("VAL_")?.trim_start();
        let (id_str, rest) = rest.split_once(char::is_whitespace)?;
        let raw_id: u32 = id_str.parse().ok()?;
        let (sig_name, mut rest) = rest.trim_start().split_once(char::is_whitespace)?;

        let message = self.db.messages.get_mut(&(raw_id & CANONICAL_ID_MASK))?;
        let signal = message.signal_mut(sig_name)?;

        loop {
            rest = rest.trim_start();
            if rest.is_empty() || rest.starts_with(';') {
                break;
            }
            let (value_str, tail) = rest.split_once(char::is_whitespace)?;
            let value: u64 = value_str.parse().ok()?;
            let tail = tail.trim_start().strip_prefix('"')?;
            let (label, tail) = tail.split_once('"')?;
            signal.value_descriptions.insert(value, label.to_owned());
            rest = tail;
        }
        Some(())
    }
}

/// The content of the first double-quoted span in `text`.
fn quoted(text: &str) -> Option<&str> {
    let start = text.find('"')? + 1;
    let end = start + text[start..].find('"')?;
    Some(&text[start..end])
}

/// Parse an attribute number that may be written with a decimal point.
fn number<T: TryFrom<u64>>(text: &str) -> Option<T> {
    let text = text.trim_end_matches(';').trim();
    let value: f64 = text.parse().ok()?;
    if !(0.0..=u64::MAX as f64).contains(&value) {
        return None;
    }
    T::try_from(value.round() as u64).ok()
}
