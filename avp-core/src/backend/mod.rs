//! Secure-element capability boundary.
//!
//! The engine owns no key material and no persistent storage; everything
//! sensitive lives behind [`SecureElement`]. The silicon implementation maps
//! slot operations onto the element's memory regions and `sign`/`attest`
//! onto its ECDSA engine. [`MemoryBackend`] satisfies the same contract in
//! memory with a seeded PRNG and a virtual clock, which is what the test
//! suites drive.

mod memory;

pub use memory::MemoryBackend;

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use zeroize::Zeroizing;

use crate::error::ErrorKind;
use crate::limits::{DATA_SLOT_END, DATA_SLOT_START, KEY_SLOT_END, MAX_SECRET_SIZE};

/// Failure reported by a secure-element operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendError {
    /// Slot index outside the range permitted for the operation.
    InvalidSlot(u8),
    /// Read of a slot that holds no data.
    SlotEmpty(u8),
    /// Write payload exceeds the slot size.
    ValueTooLarge { len: usize },
    /// Element I/O failure.
    Storage,
    /// Signing engine failure.
    Crypto,
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::InvalidSlot(slot) => write!(f, "slot {slot} outside permitted range"),
            BackendError::SlotEmpty(slot) => write!(f, "slot {slot} holds no data"),
            BackendError::ValueTooLarge { len } => {
                write!(f, "payload of {len} bytes exceeds slot size {MAX_SECRET_SIZE}")
            }
            BackendError::Storage => write!(f, "secure element storage failure"),
            BackendError::Crypto => write!(f, "secure element crypto failure"),
        }
    }
}

impl core::error::Error for BackendError {}

impl From<BackendError> for ErrorKind {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::InvalidSlot(_) => ErrorKind::InvalidParameter,
            BackendError::SlotEmpty(_) => ErrorKind::SecretNotFound,
            BackendError::ValueTooLarge { .. } => ErrorKind::CapacityExceeded,
            BackendError::Storage => ErrorKind::Hardware,
            BackendError::Crypto => ErrorKind::Crypto,
        }
    }
}

/// Outcome of a PIN presentation, as judged by the element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinVerdict {
    /// PIN accepted.
    Ok,
    /// PIN rejected; the element has not locked.
    Invalid,
    /// The element refuses further attempts.
    Locked,
}

/// Identity fields reported by the element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub model: String,
    pub serial: String,
    pub firmware: String,
}

/// Capability set the engine consumes.
///
/// All methods take `&mut self`: the element is a single exclusive handle
/// and every operation may advance its internal state.
pub trait SecureElement {
    /// Monotonic seconds since power-up.
    fn now_seconds(&mut self) -> u32;

    /// Fill `buf` with random bytes from the hardware RNG.
    fn random(&mut self, buf: &mut [u8]);

    /// Write `bytes` into a data slot, replacing its contents.
    fn slot_write(&mut self, slot: u8, bytes: &[u8]) -> Result<(), BackendError>;

    /// Read the full contents of a data slot.
    fn slot_read(&mut self, slot: u8) -> Result<Zeroizing<Vec<u8>>, BackendError>;

    /// Erase a data slot. The element has no erase primitive, so this is a
    /// full-slot overwrite with zeros.
    fn slot_erase(&mut self, slot: u8) -> Result<(), BackendError>;

    /// Present a PIN to the element.
    fn pin_verify(&mut self, pin: &str) -> Result<PinVerdict, BackendError>;

    /// ECDSA-sign `data` with the key in `key_slot`.
    fn sign(&mut self, key_slot: u8, data: &[u8]) -> Result<Vec<u8>, BackendError>;

    /// Sign `challenge` with the device attestation key (key slot 0).
    fn attest(&mut self, challenge: &[u8]) -> Result<Vec<u8>, BackendError>;

    /// Identity fields for `DISCOVER` and `HW_CHALLENGE`.
    fn device_info(&self) -> DeviceInfo;
}

/// True iff `slot` lies in the data-slot pool reserved for secrets.
pub const fn is_data_slot(slot: u8) -> bool {
    slot >= DATA_SLOT_START && slot <= DATA_SLOT_END
}

/// True iff `slot` lies in the ECC key range.
pub const fn is_key_slot(slot: u8) -> bool {
    slot <= KEY_SLOT_END
}
