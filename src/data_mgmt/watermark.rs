use std::collections::HashMap;

use super::aggregate::ReadingKind;

/// Reading time of the last reading pushed per kind
///
/// Held for the lifetime of one run only; a fresh set starts every kind at 0.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Watermarks {
    last_pushed: HashMap<ReadingKind, i64>,
}

impl Watermarks {
    pub fn last_pushed(&self, kind: ReadingKind) -> i64 {
        self.last_pushed.get(&kind).copied().unwrap_or(0)
    }

    pub fn is_newer(&self, kind: ReadingKind, reading_time: i64) -> bool {
        reading_time > self.last_pushed(kind)
    }

    pub fn advance(&mut self, kind: ReadingKind, reading_time: i64) {
        self.last_pushed.insert(kind, reading_time);
    }
}
