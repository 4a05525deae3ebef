//! Signal values keyed by entity, with write history

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::entities::EntityId;
use crate::signals::Signal;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SignalValue {
    /// Numeric view; booleans map to 0/1, text has none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SignalValue::Int(v) => Some(*v as f64),
            SignalValue::Float(v) => Some(*v),
            SignalValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            SignalValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SignalValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for SignalValue {
    fn from(v: f64) -> Self {
        SignalValue::Float(v)
    }
}

impl From<i64> for SignalValue {
    fn from(v: i64) -> Self {
        SignalValue::Int(v)
    }
}

impl From<usize> for SignalValue {
    fn from(v: usize) -> Self {
        SignalValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<bool> for SignalValue {
    fn from(v: bool) -> Self {
        SignalValue::Bool(v)
    }
}

impl From<&str> for SignalValue {
    fn from(v: &str) -> Self {
        SignalValue::Text(v.to_string())
    }
}

impl From<String> for SignalValue {
    fn from(v: String) -> Self {
        SignalValue::Text(v)
    }
}

/// One recorded write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalWrite {
    pub value: SignalValue,
    pub producer: String,
    /// Store-wide write sequence number.
    pub seq: u64,
}

/// `(entity, signal) → value`, last write wins. Every write is kept in
/// order for auditing.
#[derive(Debug, Clone, Default)]
pub struct SignalStore {
    history: BTreeMap<(EntityId, Signal), Vec<SignalWrite>>,
    seq: u64,
}

impl SignalStore {
    pub fn set(&mut self, entity: EntityId, signal: Signal, value: SignalValue, producer: &str) {
        self.seq += 1;
        self.history.entry((entity, signal)).or_default().push(SignalWrite {
            value,
            producer: producer.to_string(),
            seq: self.seq,
        });
    }

    pub fn get(&self, entity: &EntityId, signal: Signal) -> Option<&SignalValue> {
        self.history
            .get(&(entity.clone(), signal))
            .and_then(|h| h.last())
            .map(|w| &w.value)
    }

    pub fn contains(&self, entity: &EntityId, signal: Signal) -> bool {
        self.history.contains_key(&(entity.clone(), signal))
    }

    pub fn history(&self, entity: &EntityId, signal: Signal) -> &[SignalWrite] {
        self.history
            .get(&(entity.clone(), signal))
            .map_or(&[], Vec::as_slice)
    }

    /// Latest value of every signal set on `entity`.
    pub fn for_entity<'a>(&'a self, entity: &'a EntityId) -> impl Iterator<Item = (Signal, &'a SignalValue)> + 'a {
        self.history
            .range((entity.clone(), Signal::ALL[0])..)
            .take_while(move |((e, _), _)| e == entity)
            .filter_map(|((_, s), h)| h.last().map(|w| (*s, &w.value)))
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
