//! Compile-time protocol limits shared by the codec, session manager, and
//! secret index.

/// Protocol version advertised by `DISCOVER`.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Maximum length of a request or response line, in bytes.
pub const MAX_JSON_LEN: usize = 1024;

/// Maximum length of a secret name, in bytes.
pub const MAX_NAME_LEN: usize = 63;

/// Maximum length of a secret value as carried on the wire, in bytes.
pub const MAX_VALUE_LEN: usize = 511;

/// Maximum number of stored secrets.
pub const MAX_SECRETS: usize = 32;

/// Maximum size of a secret as persisted in a data slot, in bytes.
pub const MAX_SECRET_SIZE: usize = 256;

/// Maximum decoded length of the `data` field for `HW_SIGN`, in bytes.
pub const MAX_SIGN_DATA_LEN: usize = 256;

/// Maximum length of a PIN string, in bytes.
pub const MAX_PIN_LEN: usize = 16;

/// Session identifier length in lowercase hex characters.
pub const SESSION_ID_LEN: usize = 32;

/// Session TTL applied when the host does not request one, in seconds.
pub const DEFAULT_TTL: u32 = 300;

/// Lower clamp for requested session TTLs, in seconds.
pub const MIN_TTL: u32 = 60;

/// Upper clamp for requested session TTLs, in seconds.
pub const MAX_TTL: u32 = 3600;

/// Failed PIN presentations tolerated before the device locks.
pub const MAX_PIN_ATTEMPTS: u8 = 5;

/// First secure-element slot reserved for secret data.
pub const DATA_SLOT_START: u8 = 96;

/// Last secure-element slot reserved for secret data.
pub const DATA_SLOT_END: u8 = 127;

/// First secure-element slot reserved for ECC keys.
pub const KEY_SLOT_START: u8 = 0;

/// Last secure-element slot reserved for ECC keys.
pub const KEY_SLOT_END: u8 = 31;
