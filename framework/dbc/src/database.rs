use std::collections::BTreeMap;

use ccs_core::CanFrame;

use crate::codec::DecodedMessage;
use crate::message::MessageDef;
use crate::signal::SignalDef;

/// A parsed bus description: messages keyed by canonical identifier.
///
/// Built once per file load and read-only afterwards. Identifiers are
/// unique; a file that defines the same identifier twice keeps the last
/// definition.
#[derive(Debug, Clone, Default)]
pub struct Database {
    /// The `DBName` attribute.
    pub name: String,
    /// The `BusType` attribute.
    pub bus_type: String,
    /// Node names from the `BU_:` line.
    pub nodes: Vec<String>,
    pub messages: BTreeMap<u32, MessageDef>,
}

impl Database {
    pub fn find_message(&self, id: u32) -> Option<&MessageDef> {
        self.messages.get(&id)
    }

    pub fn message_by_name(&self, name: &str) -> Option<&MessageDef> {
        self.messages.values().find(|m| m.name == name)
    }

    pub fn find_signal(&self, id: u32, name: &str) -> Option<&SignalDef> {
        self.find_message(id).and_then(|m| m.signal(name))
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Decode every signal of the message matching the frame identifier.
    /// `None` when the identifier is not part of the description.
    pub fn decode(&self, frame: &CanFrame) -> Option<DecodedMessage> {
        let message = self.find_message(frame.id)?;
        let signals = message
            .signals
            .iter()
            .filter_map(|sig| sig.decode(&frame.data).ok())
            .collect();
        Some(DecodedMessage {
            id: message.id,
            name: message.name.clone(),
            signals,
        })
    }
}
