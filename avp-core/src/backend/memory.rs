use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};
use zeroize::Zeroizing;

use super::{BackendError, DeviceInfo, PinVerdict, SecureElement, is_data_slot, is_key_slot};
use crate::limits::{MAX_PIN_LEN, MAX_SECRET_SIZE};

const MODEL: &str = "NexusClaw";
const SERIAL: &str = "NC00000001";
const FIRMWARE: &str = "1.0.0";

/// In-memory secure element with a seeded PRNG and a virtual clock.
///
/// Behaviorally interchangeable with the silicon backend from the engine's
/// perspective: slots live in a map and are zeroized when replaced or
/// erased, signing uses Ed25519 keys derived from the seed, and the clock
/// advances only on explicit calls. Two backends constructed from the same
/// seed produce identical byte streams.
pub struct MemoryBackend {
    slots: BTreeMap<u8, Zeroizing<Vec<u8>>>,
    keys: BTreeMap<u8, SigningKey>,
    rng: ChaCha20Rng,
    now: u32,
    expected_pin: Option<Zeroizing<String>>,
    element_locked: bool,
    storage_failure: bool,
    crypto_failure: bool,
}

impl MemoryBackend {
    /// Construct a backend whose RNG output is fixed by `seed`.
    pub fn new(seed: [u8; 32]) -> Self {
        let mut backend = Self {
            slots: BTreeMap::new(),
            keys: BTreeMap::new(),
            rng: ChaCha20Rng::from_seed(seed),
            now: 0,
            expected_pin: None,
            element_locked: false,
            storage_failure: false,
            crypto_failure: false,
        };
        // The attestation key occupies key slot 0 and is derived first so
        // its value does not depend on which named keys were touched.
        backend.signing_key(0);
        backend
    }

    /// Advance the virtual clock.
    pub fn advance_clock(&mut self, seconds: u32) {
        self.now = self.now.saturating_add(seconds);
    }

    /// Require this exact PIN instead of the well-formedness rule.
    pub fn set_expected_pin(&mut self, pin: &str) {
        self.expected_pin = Some(Zeroizing::new(pin.to_string()));
    }

    /// Force the element into its own lockout state.
    pub fn set_element_locked(&mut self, locked: bool) {
        self.element_locked = locked;
    }

    /// Make every slot operation fail until cleared.
    pub fn set_storage_failure(&mut self, failing: bool) {
        self.storage_failure = failing;
    }

    /// Make every signing operation fail until cleared.
    pub fn set_crypto_failure(&mut self, failing: bool) {
        self.crypto_failure = failing;
    }

    /// Verifying half of the key a given slot signs with.
    pub fn verifying_key(&mut self, key_slot: u8) -> VerifyingKey {
        self.signing_key(key_slot).verifying_key()
    }

    /// Verifying half of the attestation key (key slot 0).
    pub fn attestation_key(&mut self) -> VerifyingKey {
        self.verifying_key(0)
    }

    /// Raw contents of a data slot, if any. Test observation hook.
    pub fn slot_contents(&self, slot: u8) -> Option<&[u8]> {
        self.slots.get(&slot).map(|bytes| bytes.as_slice())
    }

    fn signing_key(&mut self, key_slot: u8) -> &SigningKey {
        let rng = &mut self.rng;
        self.keys.entry(key_slot).or_insert_with(|| {
            let mut seed = Zeroizing::new([0u8; 32]);
            rng.fill_bytes(seed.as_mut());
            SigningKey::from_bytes(&seed)
        })
    }

    fn pin_well_formed(pin: &str) -> bool {
        (4..=MAX_PIN_LEN).contains(&pin.len()) && pin.bytes().all(|b| b.is_ascii_digit())
    }
}

impl SecureElement for MemoryBackend {
    fn now_seconds(&mut self) -> u32 {
        self.now
    }

    fn random(&mut self, buf: &mut [u8]) {
        self.rng.fill_bytes(buf);
    }

    fn slot_write(&mut self, slot: u8, bytes: &[u8]) -> Result<(), BackendError> {
        if !is_data_slot(slot) {
            return Err(BackendError::InvalidSlot(slot));
        }
        if bytes.len() > MAX_SECRET_SIZE {
            return Err(BackendError::ValueTooLarge { len: bytes.len() });
        }
        if self.storage_failure {
            return Err(BackendError::Storage);
        }
        self.slots.insert(slot, Zeroizing::new(bytes.to_vec()));
        Ok(())
    }

    fn slot_read(&mut self, slot: u8) -> Result<Zeroizing<Vec<u8>>, BackendError> {
        if !is_data_slot(slot) {
            return Err(BackendError::InvalidSlot(slot));
        }
        if self.storage_failure {
            return Err(BackendError::Storage);
        }
        self.slots
            .get(&slot)
            .cloned()
            .ok_or(BackendError::SlotEmpty(slot))
    }

    fn slot_erase(&mut self, slot: u8) -> Result<(), BackendError> {
        if !is_data_slot(slot) {
            return Err(BackendError::InvalidSlot(slot));
        }
        if self.storage_failure {
            return Err(BackendError::Storage);
        }
        // Dropping the entry zeroizes it; erasing an empty slot is a no-op,
        // matching the element's overwrite-with-zeros behavior.
        self.slots.remove(&slot);
        Ok(())
    }

    fn pin_verify(&mut self, pin: &str) -> Result<PinVerdict, BackendError> {
        if self.element_locked {
            return Ok(PinVerdict::Locked);
        }
        if !Self::pin_well_formed(pin) {
            return Ok(PinVerdict::Invalid);
        }
        match &self.expected_pin {
            Some(expected) if pin != expected.as_str() => Ok(PinVerdict::Invalid),
            _ => Ok(PinVerdict::Ok),
        }
    }

    fn sign(&mut self, key_slot: u8, data: &[u8]) -> Result<Vec<u8>, BackendError> {
        if !is_key_slot(key_slot) {
            return Err(BackendError::InvalidSlot(key_slot));
        }
        if self.crypto_failure {
            return Err(BackendError::Crypto);
        }
        let signature = self.signing_key(key_slot).sign(data);
        Ok(signature.to_bytes().to_vec())
    }

    fn attest(&mut self, challenge: &[u8]) -> Result<Vec<u8>, BackendError> {
        self.sign(0, challenge)
    }

    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            model: MODEL.to_string(),
            serial: SERIAL.to_string(),
            firmware: FIRMWARE.to_string(),
        }
    }
}
