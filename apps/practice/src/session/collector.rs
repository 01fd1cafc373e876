use std::collections::BTreeMap;

use bytes::Bytes;

use crate::errors::PracticeError;

/// A value captured for one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseValue {
    /// The option text the user picked.
    Choice(String),
    /// Captured audio.
    Recording(Bytes),
}

impl ResponseValue {
    pub fn as_choice(&self) -> Option<&str> {
        match self {
            ResponseValue::Choice(choice) => Some(choice),
            ResponseValue::Recording(_) => None,
        }
    }
}

/// Per-slot responses for one session.
/// Sealed on submission; after that every write is rejected.
#[derive(Debug, Default, Clone)]
pub struct ResponseCollector {
    slots: usize,
    values: BTreeMap<usize, ResponseValue>,
    sealed: bool,
}

impl ResponseCollector {
    pub fn new(slots: usize) -> Self {
        Self {
            slots,
            values: BTreeMap::new(),
            sealed: false,
        }
    }

    pub fn record(&mut self, slot: usize, value: ResponseValue) -> Result<(), PracticeError> {
        if self.sealed {
            return Err(PracticeError::NotAcceptingInput);
        }
        if slot >= self.slots {
            return Err(PracticeError::Validation(format!(
                "slot {slot} is outside the {} prompts of this session",
                self.slots
            )));
        }
        self.values.insert(slot, value);
        Ok(())
    }

    /// Number of distinct slots holding a value.
    pub fn completion_count(&self) -> usize {
        self.values.len()
    }

    pub fn is_complete(&self) -> bool {
        self.slots > 0 && self.values.len() == self.slots
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    pub fn get(&self, slot: usize) -> Option<&ResponseValue> {
        self.values.get(&slot)
    }

    pub fn responses(&self) -> &BTreeMap<usize, ResponseValue> {
        &self.values
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }
}
