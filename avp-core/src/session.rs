use alloc::string::String;
use zeroize::{Zeroize, Zeroizing};

use crate::backend::{PinVerdict, SecureElement};
use crate::codec::SecretString;
use crate::error::ErrorKind;
use crate::hex;
use crate::limits::{DEFAULT_TTL, MAX_PIN_ATTEMPTS, MAX_TTL, MIN_TTL};

const DEFAULT_WORKSPACE: &str = "default";

/// Fields returned to the host after a successful authentication.
#[derive(Debug)]
pub struct SessionDescriptor {
    pub id: SecretString,
    pub expires_in: u32,
    pub workspace: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    /// No session since power-up, or the last one was invalidated.
    Fresh,
    /// A session is live (subject to TTL).
    Active,
    /// The last session ran past its TTL and nothing replaced it.
    Expired,
}

/// At-most-one authenticated session plus the device PIN-attempt counter.
///
/// The attempt counter deliberately outlives sessions: it survives expiry
/// and invalidation, resets only on a successful authenticate, and once it
/// reaches the ceiling every authentication fails without consulting the
/// element. A power cycle (fresh construction) is the only other reset.
#[derive(Debug)]
pub struct SessionManager {
    state: SessionState,
    id: Zeroizing<String>,
    workspace: String,
    created_at: u32,
    ttl: u32,
    pin_attempts: u8,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            state: SessionState::Fresh,
            id: Zeroizing::new(String::new()),
            workspace: String::new(),
            created_at: 0,
            ttl: 0,
            pin_attempts: 0,
        }
    }

    /// Drive a PIN presentation through the element and, on success, replace
    /// any prior session with a fresh one.
    pub fn authenticate<B: SecureElement>(
        &mut self,
        backend: &mut B,
        pin: &str,
        workspace: Option<&str>,
        requested_ttl: Option<u32>,
    ) -> Result<SessionDescriptor, ErrorKind> {
        if self.pin_attempts >= MAX_PIN_ATTEMPTS {
            return Err(ErrorKind::PinLocked);
        }

        match backend.pin_verify(pin).map_err(ErrorKind::from)? {
            PinVerdict::Invalid => {
                self.pin_attempts = self.pin_attempts.saturating_add(1);
                return Err(ErrorKind::PinInvalid);
            }
            PinVerdict::Locked => {
                self.pin_attempts = MAX_PIN_ATTEMPTS;
                return Err(ErrorKind::PinLocked);
            }
            PinVerdict::Ok => self.pin_attempts = 0,
        }

        let mut id_bytes = Zeroizing::new([0u8; 16]);
        backend.random(id_bytes.as_mut());

        self.state = SessionState::Active;
        self.id = Zeroizing::new(hex::encode(id_bytes.as_ref()));
        self.workspace = String::from(workspace.unwrap_or(DEFAULT_WORKSPACE));
        self.created_at = backend.now_seconds();
        self.ttl = requested_ttl.unwrap_or(DEFAULT_TTL).clamp(MIN_TTL, MAX_TTL);

        Ok(SessionDescriptor {
            id: SecretString::from(self.id.as_str()),
            expires_in: self.ttl,
            workspace: self.workspace.clone(),
        })
    }

    /// Whether a session is live at `now`. The first call that observes the
    /// TTL elapsed moves the session to its expired state.
    pub fn is_valid(&mut self, now: u32) -> bool {
        if self.state != SessionState::Active {
            return false;
        }
        if now >= self.created_at.saturating_add(self.ttl) {
            self.state = SessionState::Expired;
            self.id.zeroize();
            return false;
        }
        true
    }

    /// True once a session has run past its TTL without being replaced.
    /// Distinguishes `SESSION_EXPIRED` from `NOT_AUTHENTICATED`.
    pub fn has_expired(&self) -> bool {
        self.state == SessionState::Expired
    }

    /// Tear the session down, zeroizing its identifier. The PIN-attempt
    /// counter is left untouched.
    pub fn invalidate(&mut self) {
        self.state = SessionState::Fresh;
        self.id.zeroize();
        self.workspace.clear();
        self.created_at = 0;
        self.ttl = 0;
    }

    pub fn pin_attempts(&self) -> u8 {
        self.pin_attempts
    }

    #[cfg(test)]
    pub(crate) fn id(&self) -> &str {
        &self.id
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::limits::SESSION_ID_LEN;

    fn backend() -> MemoryBackend {
        MemoryBackend::new([3u8; 32])
    }

    #[test]
    fn authenticate_issues_hex_session_id() {
        let mut backend = backend();
        let mut session = SessionManager::new();
        let descriptor = session
            .authenticate(&mut backend, "123456", None, None)
            .expect("authenticate");

        assert_eq!(descriptor.id.len(), SESSION_ID_LEN);
        assert!(descriptor.id.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_eq!(descriptor.expires_in, DEFAULT_TTL);
        assert_eq!(descriptor.workspace, "default");
        assert!(session.is_valid(0));
    }

    #[test]
    fn requested_ttl_is_clamped() {
        let mut backend = backend();
        let mut session = SessionManager::new();
        for (requested, effective) in [(Some(1), MIN_TTL), (Some(86_400), MAX_TTL), (None, DEFAULT_TTL)] {
            let descriptor = session
                .authenticate(&mut backend, "123456", None, requested)
                .expect("authenticate");
            assert_eq!(descriptor.expires_in, effective);
        }
    }

    #[test]
    fn expiry_flips_once_observed() {
        let mut backend = backend();
        let mut session = SessionManager::new();
        session
            .authenticate(&mut backend, "123456", None, Some(60))
            .expect("authenticate");

        assert!(session.is_valid(59));
        assert!(!session.is_valid(60));
        assert!(session.has_expired());
        assert!(!session.is_valid(0));
    }

    #[test]
    fn reauthentication_replaces_the_session() {
        let mut backend = backend();
        let mut session = SessionManager::new();
        let first = session
            .authenticate(&mut backend, "123456", Some("blue"), None)
            .expect("first");
        let second = session
            .authenticate(&mut backend, "123456", None, None)
            .expect("second");

        assert_ne!(&*first.id, &*second.id);
        assert_eq!(second.workspace, "default");
        assert_eq!(session.id(), &*second.id);
    }

    #[test]
    fn invalid_pins_count_up_to_lockout() {
        let mut backend = backend();
        let mut session = SessionManager::new();

        for attempt in 1..=MAX_PIN_ATTEMPTS {
            let err = session
                .authenticate(&mut backend, "1", None, None)
                .expect_err("short pin");
            assert_eq!(err, ErrorKind::PinInvalid);
            assert_eq!(session.pin_attempts(), attempt);
        }

        // Locked out now, even with a PIN the element would accept.
        let err = session
            .authenticate(&mut backend, "123456", None, None)
            .expect_err("locked");
        assert_eq!(err, ErrorKind::PinLocked);
        assert_eq!(session.pin_attempts(), MAX_PIN_ATTEMPTS);
    }

    #[test]
    fn element_lockout_pins_the_counter() {
        let mut backend = backend();
        backend.set_element_locked(true);
        let mut session = SessionManager::new();

        let err = session
            .authenticate(&mut backend, "123456", None, None)
            .expect_err("element locked");
        assert_eq!(err, ErrorKind::PinLocked);
        assert_eq!(session.pin_attempts(), MAX_PIN_ATTEMPTS);

        // The ceiling short-circuits before the element is consulted, so
        // unlocking it changes nothing.
        backend.set_element_locked(false);
        let err = session
            .authenticate(&mut backend, "123456", None, None)
            .expect_err("still locked");
        assert_eq!(err, ErrorKind::PinLocked);
    }

    #[test]
    fn success_resets_the_attempt_counter() {
        let mut backend = backend();
        let mut session = SessionManager::new();
        for _ in 0..2 {
            let _ = session.authenticate(&mut backend, "1", None, None);
        }
        assert_eq!(session.pin_attempts(), 2);

        session
            .authenticate(&mut backend, "123456", None, None)
            .expect("authenticate");
        assert_eq!(session.pin_attempts(), 0);
    }

    #[test]
    fn failed_attempt_leaves_the_active_session_alone() {
        let mut backend = backend();
        let mut session = SessionManager::new();
        session
            .authenticate(&mut backend, "123456", None, None)
            .expect("authenticate");

        let err = session
            .authenticate(&mut backend, "1", None, None)
            .expect_err("short pin");
        assert_eq!(err, ErrorKind::PinInvalid);
        assert!(session.is_valid(0));
    }

    #[test]
    fn invalidate_clears_the_id_but_not_the_counter() {
        let mut backend = backend();
        let mut session = SessionManager::new();
        session
            .authenticate(&mut backend, "123456", None, None)
            .expect("authenticate");
        let _ = session.authenticate(&mut backend, "1", None, None);
        assert_eq!(session.pin_attempts(), 1);

        session.invalidate();
        assert!(!session.is_valid(0));
        assert!(!session.has_expired());
        assert!(session.id().is_empty());
        assert_eq!(session.pin_attempts(), 1);
    }
}
