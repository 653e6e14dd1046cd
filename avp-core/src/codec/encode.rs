use alloc::string::String;
use alloc::vec::Vec;

use serde::Serialize;

use super::SecretString;
use crate::error::ErrorKind;
use crate::limits::{MAX_JSON_LEN, MAX_SECRET_SIZE, MAX_SECRETS, PROTOCOL_VERSION};

const BACKEND_TYPE: &str = "hardware";
const MANUFACTURER: &str = "AVP Protocol";

/// Canonical failure line substituted when response encoding itself fails.
pub const INTERNAL_FAILURE_LINE: &str =
    "{\"ok\":false,\"error\":\"INTERNAL_ERROR\",\"message\":\"INTERNAL_ERROR\"}";

/// Structured outcome of one operation, keyed by opcode so the encoder is
/// total: every variant has exactly one wire shape.
#[derive(Debug)]
pub enum Response {
    /// `{"ok":true}`, for operations with no payload (STORE, ROTATE, DELETE).
    Empty,
    Discover {
        model: String,
        serial: String,
    },
    Authenticate {
        session_id: SecretString,
        expires_in: u32,
        workspace: String,
    },
    Retrieve {
        value: SecretString,
    },
    List {
        secrets: Vec<String>,
    },
    Challenge {
        model: String,
        serial: String,
    },
    Sign {
        signature: String,
    },
    Attest {
        attestation: String,
    },
    Failure {
        kind: ErrorKind,
        message: String,
    },
}

impl Response {
    /// Failure carrying the kind's default message.
    pub fn failure(kind: ErrorKind) -> Self {
        Response::Failure {
            kind,
            message: String::from(kind.describe()),
        }
    }

    /// Failure with an operation-specific message.
    pub fn failure_with(kind: ErrorKind, message: String) -> Self {
        Response::Failure { kind, message }
    }

    pub fn is_ok(&self) -> bool {
        !matches!(self, Response::Failure { .. })
    }
}

// One body struct per shape; serde emits fields in declaration order, which
// fixes the wire order.

#[derive(Serialize)]
struct EmptyBody {
    ok: bool,
}

#[derive(Serialize)]
struct CapabilitiesBody {
    hw_sign: bool,
    hw_attest: bool,
    max_secrets: u32,
    max_secret_size: u32,
}

#[derive(Serialize)]
struct DiscoverBody<'a> {
    ok: bool,
    version: &'a str,
    backend_type: &'a str,
    manufacturer: &'a str,
    model: &'a str,
    serial: &'a str,
    capabilities: CapabilitiesBody,
}

#[derive(Serialize)]
struct AuthenticateBody<'a> {
    ok: bool,
    session_id: &'a SecretString,
    expires_in: u32,
    workspace: &'a str,
}

#[derive(Serialize)]
struct RetrieveBody<'a> {
    ok: bool,
    value: &'a SecretString,
}

#[derive(Serialize)]
struct ListBody<'a> {
    ok: bool,
    secrets: &'a [String],
}

#[derive(Serialize)]
struct ChallengeBody<'a> {
    ok: bool,
    verified: bool,
    model: &'a str,
    serial: &'a str,
}

#[derive(Serialize)]
struct SignBody<'a> {
    ok: bool,
    signature: &'a str,
}

#[derive(Serialize)]
struct AttestBody<'a> {
    ok: bool,
    attestation: &'a str,
}

#[derive(Serialize)]
struct FailureBody<'a> {
    ok: bool,
    error: &'a str,
    message: &'a str,
}

/// Encode a response as a single JSON line.
///
/// Output never exceeds [`MAX_JSON_LEN`]: a response that would overflow is
/// replaced whole by [`INTERNAL_FAILURE_LINE`] rather than emitted
/// truncated.
pub fn encode_response(response: &Response) -> String {
    let encoded = match response {
        Response::Empty => serde_json::to_string(&EmptyBody { ok: true }),
        Response::Discover { model, serial } => serde_json::to_string(&DiscoverBody {
            ok: true,
            version: PROTOCOL_VERSION,
            backend_type: BACKEND_TYPE,
            manufacturer: MANUFACTURER,
            model,
            serial,
            capabilities: CapabilitiesBody {
                hw_sign: true,
                hw_attest: true,
                max_secrets: MAX_SECRETS as u32,
                max_secret_size: MAX_SECRET_SIZE as u32,
            },
        }),
        Response::Authenticate {
            session_id,
            expires_in,
            workspace,
        } => serde_json::to_string(&AuthenticateBody {
            ok: true,
            session_id,
            expires_in: *expires_in,
            workspace,
        }),
        Response::Retrieve { value } => serde_json::to_string(&RetrieveBody { ok: true, value }),
        Response::List { secrets } => serde_json::to_string(&ListBody { ok: true, secrets }),
        Response::Challenge { model, serial } => serde_json::to_string(&ChallengeBody {
            ok: true,
            verified: true,
            model,
            serial,
        }),
        Response::Sign { signature } => serde_json::to_string(&SignBody {
            ok: true,
            signature,
        }),
        Response::Attest { attestation } => serde_json::to_string(&AttestBody {
            ok: true,
            attestation,
        }),
        Response::Failure { kind, message } => serde_json::to_string(&FailureBody {
            ok: false,
            error: kind.code(),
            message,
        }),
    };

    match encoded {
        Ok(line) if line.len() <= MAX_JSON_LEN => line,
        _ => String::from(INTERNAL_FAILURE_LINE),
    }
}
