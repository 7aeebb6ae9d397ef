use std::collections::HashMap;

use crate::{Error, Result};

/// Highest note identifier in the MIDI note space
pub const MAX_NOTE: u8 = 127;

/// Lookup from a source note identifier to a destination note identifier.
///
/// The table may be partial: notes without an entry are reported as a
/// lookup failure rather than passed through. Entries only enter through
/// [`MappingTable::insert`], so every stored note is within `0..=MAX_NOTE`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    entries: HashMap<u8, u8>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) an entry. Returns the destination previously stored
    /// for `source`, if any.
    pub fn insert(&mut self, source: u8, destination: u8) -> Result<Option<u8>> {
        for note in [source, destination] {
            if note > MAX_NOTE {
                return Err(Error::NoteOutOfRange(note));
            }
        }
        Ok(self.entries.insert(source, destination))
    }

    pub fn get(&self, note: u8) -> Option<u8> {
        self.entries.get(&note).copied()
    }

    /// Like [`get`](Self::get), but a miss is an error naming the event position.
    pub fn lookup(&self, note: u8, position: usize) -> Result<u8> {
        self.get(note)
            .ok_or(Error::MappingLookup { note, position })
    }

    pub fn contains(&self, note: u8) -> bool {
        self.entries.contains_key(&note)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by source note
    pub fn entries(&self) -> Vec<(u8, u8)> {
        let mut entries: Vec<_> = self.entries.iter().map(|(&s, &d)| (s, d)).collect();
        entries.sort_unstable();
        entries
    }

    /// Build a table from pairs, later pairs overriding earlier ones.
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u8, u8)>,
    {
        let mut table = Self::new();
        for (source, destination) in pairs {
            table.insert(source, destination)?;
        }
        Ok(table)
    }
}
