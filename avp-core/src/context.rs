use crate::backend::SecureElement;
use crate::index::SecretIndex;
use crate::session::SessionManager;

/// Runtime state required to service requests: the element handle, the
/// current session, and the secret metadata table.
///
/// All mutable protocol state has this single owner; the firmware runtime
/// feeds one complete request at a time into
/// [`process_line`](crate::process_line), so no locking happens below this
/// level. Hosts embedding the engine in a threaded simulator serialize
/// calls behind one mutex around the whole context.
#[derive(Debug)]
pub struct VaultContext<B> {
    pub(crate) backend: B,
    pub(crate) session: SessionManager,
    pub(crate) index: SecretIndex,
}

impl<B: SecureElement> VaultContext<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            session: SessionManager::new(),
            index: SecretIndex::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn index(&self) -> &SecretIndex {
        &self.index
    }

    /// Tear down the current session without touching stored secrets.
    /// Wired to out-of-band events such as the lock button or USB detach.
    pub fn invalidate_session(&mut self) {
        self.session.invalidate();
    }
}

#[cfg(test)]
pub(crate) fn fresh_context() -> VaultContext<crate::backend::MemoryBackend> {
    VaultContext::new(crate::backend::MemoryBackend::new([0xA5; 32]))
}
