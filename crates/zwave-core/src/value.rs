//! The value sum type and its addressing key.
//!
//! Grounded on the teacher's `zwave-core::value_id::ValueId`, extended with
//! the metadata fields and `Genre` enum spec.md §3 describes (the teacher's
//! own `ValueId` only carries CC/property/property-key, not the full
//! OpenZWave-style value metadata this driver exposes).

use crate::command_classes::CommandClasses;
use crate::ids::{EndpointIndex, HomeId, NodeId};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Genre {
    Basic,
    User,
    Config,
    System,
}

/// Uniquely addresses a value within a node: which CC, instance and index
/// within that CC it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueId {
    pub home_id: HomeId,
    pub node_id: NodeId,
    pub genre: Genre,
    pub command_class: CommandClasses,
    pub instance: u8,
    pub index: u8,
}

impl ValueId {
    pub fn new(
        home_id: HomeId,
        node_id: NodeId,
        genre: Genre,
        command_class: CommandClasses,
        instance: u8,
        index: u8,
    ) -> Self {
        Self { home_id, node_id, genre, command_class, instance, index }
    }

    pub fn with_endpoint(&self, _endpoint: EndpointIndex) -> Self {
        // Endpoints beyond the root are addressed via MultiChannel CC
        // encapsulation at the message layer; the ValueId itself stays
        // keyed by (home, node, cc, instance, index) per spec.md §3.
        *self
    }
}

impl Display for ValueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{:?}:{}:{}",
            self.home_id, self.node_id, self.command_class, self.instance, self.index
        )
    }
}

/// Static properties of a value, mostly set once by the owning command class
/// and read thereafter by the application.
#[derive(Debug, Clone, Default)]
pub struct ValueMetadata {
    pub label: String,
    pub units: Option<String>,
    pub help: Option<String>,
    pub read_only: bool,
    pub write_only: bool,
    pub is_set: bool,
    pub is_polled: bool,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub poll_intensity: u8,
    pub verify_changes: bool,
}

/// The value sum type. Spec.md §3 enumerates: Bool, Byte, Short, Int,
/// Decimal, String, List, Button, Schedule, Raw, BitSet.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Byte(u8),
    Short(i16),
    Int(i32),
    Decimal(f32),
    String(String),
    List(i32),
    Button,
    Schedule(Vec<u8>),
    Raw(Vec<u8>),
    BitSet(Vec<bool>),
}

impl Value {
    pub fn get_as_string(&self) -> String {
        match self {
            Value::Bool(b) => b.to_string(),
            Value::Byte(b) => b.to_string(),
            Value::Short(v) => v.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Decimal(v) => v.to_string(),
            Value::String(s) => s.clone(),
            Value::List(v) => v.to_string(),
            Value::Button => "Button".to_string(),
            Value::Schedule(_) => "Schedule".to_string(),
            Value::Raw(bytes) => hex::encode(bytes),
            Value::BitSet(bits) => bits
                .iter()
                .map(|b| if *b { '1' } else { '0' })
                .collect(),
        }
    }

    pub fn set_from_string(&mut self, s: &str) -> Result<(), String> {
        *self = match self {
            Value::Bool(_) => Value::Bool(s.parse().map_err(|_| "not a bool".to_string())?),
            Value::Byte(_) => Value::Byte(s.parse().map_err(|_| "not a byte".to_string())?),
            Value::Short(_) => Value::Short(s.parse().map_err(|_| "not a short".to_string())?),
            Value::Int(_) => Value::Int(s.parse().map_err(|_| "not an int".to_string())?),
            Value::Decimal(_) => Value::Decimal(s.parse().map_err(|_| "not a decimal".to_string())?),
            Value::String(_) => Value::String(s.to_string()),
            Value::List(_) => Value::List(s.parse().map_err(|_| "not a list index".to_string())?),
            Value::Button => Value::Button,
            Value::Schedule(_) => {
                Value::Schedule(hex::decode(s).map_err(|_| "not hex".to_string())?)
            }
            Value::Raw(_) => Value::Raw(hex::decode(s).map_err(|_| "not hex".to_string())?),
            Value::BitSet(_) => Value::BitSet(s.chars().map(|c| c == '1').collect()),
        };
        Ok(())
    }
}
