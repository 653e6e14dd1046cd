use core::fmt;

/// Failure category carried in the `error` field of a failure response.
///
/// The set is closed: every error the engine can surface to the host maps
/// onto exactly one of these codes. Backend failures keep their specific
/// hardware/crypto code instead of collapsing into [`ErrorKind::Internal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input line was not a well-formed request object.
    Parse,
    /// The `op` field named an operation outside the protocol.
    InvalidOperation,
    /// A field was malformed, oversize, or missing where required.
    InvalidParameter,
    /// No session has been established.
    NotAuthenticated,
    /// The session existed but its TTL elapsed.
    SessionExpired,
    /// No stored secret carries the requested name.
    SecretNotFound,
    /// The secret table is full.
    CapacityExceeded,
    /// The secure element failed a storage or I/O operation.
    Hardware,
    /// The secure element failed a cryptographic operation.
    Crypto,
    /// PIN verification rejected the presented PIN.
    PinInvalid,
    /// The failed-attempt ceiling was reached; authentication is disabled.
    PinLocked,
    /// The engine reached a state it cannot account for.
    Internal,
}

impl ErrorKind {
    /// Stable wire code for the `error` field.
    pub const fn code(self) -> &'static str {
        match self {
            ErrorKind::Parse => "PARSE_ERROR",
            ErrorKind::InvalidOperation => "INVALID_OPERATION",
            ErrorKind::InvalidParameter => "INVALID_PARAMETER",
            ErrorKind::NotAuthenticated => "NOT_AUTHENTICATED",
            ErrorKind::SessionExpired => "SESSION_EXPIRED",
            ErrorKind::SecretNotFound => "SECRET_NOT_FOUND",
            ErrorKind::CapacityExceeded => "CAPACITY_EXCEEDED",
            ErrorKind::Hardware => "HARDWARE_ERROR",
            ErrorKind::Crypto => "CRYPTO_ERROR",
            ErrorKind::PinInvalid => "PIN_INVALID",
            ErrorKind::PinLocked => "PIN_LOCKED",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }

    /// Default human-readable message used when a handler supplies none.
    pub const fn describe(self) -> &'static str {
        match self {
            ErrorKind::Parse => "request is not a valid JSON object",
            ErrorKind::InvalidOperation => "unknown operation",
            ErrorKind::InvalidParameter => "invalid parameter",
            ErrorKind::NotAuthenticated => "session not established",
            ErrorKind::SessionExpired => "session timed out",
            ErrorKind::SecretNotFound => "secret does not exist",
            ErrorKind::CapacityExceeded => "storage full",
            ErrorKind::Hardware => "secure element failure",
            ErrorKind::Crypto => "cryptographic failure",
            ErrorKind::PinInvalid => "wrong PIN",
            ErrorKind::PinLocked => "too many failed attempts",
            ErrorKind::Internal => "internal error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl core::error::Error for ErrorKind {}

#[cfg(test)]
mod tests {
    use super::ErrorKind;

    #[test]
    fn wire_codes_are_stable() {
        for (kind, code) in [
            (ErrorKind::Parse, "PARSE_ERROR"),
            (ErrorKind::InvalidOperation, "INVALID_OPERATION"),
            (ErrorKind::InvalidParameter, "INVALID_PARAMETER"),
            (ErrorKind::NotAuthenticated, "NOT_AUTHENTICATED"),
            (ErrorKind::SessionExpired, "SESSION_EXPIRED"),
            (ErrorKind::SecretNotFound, "SECRET_NOT_FOUND"),
            (ErrorKind::CapacityExceeded, "CAPACITY_EXCEEDED"),
            (ErrorKind::Hardware, "HARDWARE_ERROR"),
            (ErrorKind::Crypto, "CRYPTO_ERROR"),
            (ErrorKind::PinInvalid, "PIN_INVALID"),
            (ErrorKind::PinLocked, "PIN_LOCKED"),
            (ErrorKind::Internal, "INTERNAL_ERROR"),
        ] {
            assert_eq!(kind.code(), code);
            assert_eq!(kind.to_string(), code);
        }
    }
}
