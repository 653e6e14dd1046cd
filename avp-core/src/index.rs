use alloc::string::String;
use alloc::vec::Vec;
use zeroize::Zeroizing;

use crate::backend::SecureElement;
use crate::error::ErrorKind;
use crate::limits::{DATA_SLOT_START, MAX_SECRETS};

/// Metadata for one stored secret. The value itself lives in the element's
/// data slot; the index holds only the book-keeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRecord {
    pub name: String,
    pub slot: u8,
    pub created_at: u32,
    pub updated_at: u32,
}

/// Fixed-capacity name → slot table.
///
/// Entries keep their table position for their whole lifetime, so
/// enumeration order is stable across calls. A deleted entry leaves a
/// tombstone that the next insertion reuses (lowest free index first), and
/// each index maps onto one data slot, so slot assignments never collide.
#[derive(Debug)]
pub struct SecretIndex {
    entries: Vec<Option<SecretRecord>>,
}

impl SecretIndex {
    pub fn new() -> Self {
        Self {
            entries: (0..MAX_SECRETS).map(|_| None).collect(),
        }
    }

    /// Store `value` under `name`, creating the entry if the name is new.
    ///
    /// New entries are committed only after the slot write succeeds, so a
    /// backend failure leaves the table byte-identical.
    pub fn put<B: SecureElement>(
        &mut self,
        backend: &mut B,
        name: &str,
        value: &[u8],
    ) -> Result<(), ErrorKind> {
        let now = backend.now_seconds();
        match self.position(name) {
            Some(idx) => {
                let Some(record) = &mut self.entries[idx] else {
                    return Err(ErrorKind::Internal);
                };
                backend
                    .slot_write(record.slot, value)
                    .map_err(ErrorKind::from)?;
                record.updated_at = now;
            }
            None => {
                let idx = self.free_index().ok_or(ErrorKind::CapacityExceeded)?;
                let slot = DATA_SLOT_START + idx as u8;
                backend.slot_write(slot, value).map_err(ErrorKind::from)?;
                self.entries[idx] = Some(SecretRecord {
                    name: String::from(name),
                    slot,
                    created_at: now,
                    updated_at: now,
                });
            }
        }
        Ok(())
    }

    /// Read the stored value for `name` through the element.
    pub fn get<B: SecureElement>(
        &self,
        backend: &mut B,
        name: &str,
    ) -> Result<Zeroizing<Vec<u8>>, ErrorKind> {
        let record = self.record(name).ok_or(ErrorKind::SecretNotFound)?;
        backend.slot_read(record.slot).map_err(ErrorKind::from)
    }

    /// Erase the slot and clear the entry. A failed erase retains the entry
    /// so the secret is never silently orphaned.
    pub fn remove<B: SecureElement>(
        &mut self,
        backend: &mut B,
        name: &str,
    ) -> Result<(), ErrorKind> {
        let idx = self.position(name).ok_or(ErrorKind::SecretNotFound)?;
        let Some(record) = &self.entries[idx] else {
            return Err(ErrorKind::Internal);
        };
        backend.slot_erase(record.slot).map_err(ErrorKind::from)?;
        self.entries[idx] = None;
        Ok(())
    }

    /// Names of all stored secrets, in table order.
    pub fn names(&self) -> Vec<String> {
        self.entries
            .iter()
            .flatten()
            .map(|record| record.name.clone())
            .collect()
    }

    /// Number of stored secrets.
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Metadata for `name`, if stored. Observation hook for tests and
    /// host-side diagnostics.
    pub fn record(&self, name: &str) -> Option<&SecretRecord> {
        self.position(name)
            .and_then(|idx| self.entries[idx].as_ref())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.as_ref().is_some_and(|record| record.name == name))
    }

    fn free_index(&self) -> Option<usize> {
        self.entries.iter().position(Option::is_none)
    }
}

impl Default for SecretIndex {
    fn default() -> Self {
        Self::new()
    }
}
