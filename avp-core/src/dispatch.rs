//! Request dispatch: decode, precondition check, handler, encode.
//!
//! The dispatcher is the only component that decides whether an operation
//! may run without a session; handlers assume their preconditions hold.
//! Parse and dispatch failures never mutate state, and handler failures
//! mutate state only where the operation says so (the PIN-attempt counter,
//! entry creation after a successful slot write).

use alloc::format;
use alloc::string::{String, ToString};
use core::hash::Hasher;

use pruefung::fnv::Fnv32;

use crate::backend::SecureElement;
use crate::codec::{
    Command, Opcode, Response, SecretString, decode_command, encode_response,
};
use crate::context::VaultContext;
use crate::error::ErrorKind;
use crate::hex;
use crate::limits::KEY_SLOT_END;

/// True iff a transport line is addressed to this protocol: the first
/// non-whitespace byte opens a JSON object. Everything else belongs to
/// whatever else shares the console.
pub fn is_avp_line(data: &[u8]) -> bool {
    data.iter()
        .copied()
        .find(|byte| !byte.is_ascii_whitespace())
        == Some(b'{')
}

/// Service one request line and return the response line (without the
/// trailing newline).
pub fn process_line<B: SecureElement>(line: &[u8], ctx: &mut VaultContext<B>) -> String {
    encode_response(&process(line, ctx))
}

/// Service one request line and return the structured response.
pub fn process<B: SecureElement>(line: &[u8], ctx: &mut VaultContext<B>) -> Response {
    let command = match decode_command(line) {
        Ok(command) => command,
        Err(err) => return Response::failure_with(err.kind(), err.to_string()),
    };

    if command.op.requires_session() {
        let now = ctx.backend.now_seconds();
        if !ctx.session.is_valid(now) {
            let kind = if ctx.session.has_expired() {
                ErrorKind::SessionExpired
            } else {
                ErrorKind::NotAuthenticated
            };
            return Response::failure(kind);
        }
    }

    match dispatch(&command, ctx) {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

/// Handler-level failure awaiting projection into a wire response.
enum OpError {
    MissingField(&'static str),
    UnsupportedAuthMethod(String),
    Kind(ErrorKind),
}

impl OpError {
    fn into_response(self) -> Response {
        match self {
            OpError::MissingField(field) => Response::failure_with(
                ErrorKind::InvalidParameter,
                format!("missing required field: {field}"),
            ),
            OpError::UnsupportedAuthMethod(method) => Response::failure_with(
                ErrorKind::InvalidParameter,
                format!("unsupported auth method '{method}'"),
            ),
            OpError::Kind(kind) => Response::failure(kind),
        }
    }
}

impl From<ErrorKind> for OpError {
    fn from(value: ErrorKind) -> Self {
        OpError::Kind(value)
    }
}

fn dispatch<B: SecureElement>(
    command: &Command,
    ctx: &mut VaultContext<B>,
) -> Result<Response, OpError> {
    match command.op {
        Opcode::Discover => handle_discover(ctx),
        Opcode::Authenticate => handle_authenticate(command, ctx),
        Opcode::Store | Opcode::Rotate => handle_store(command, ctx),
        Opcode::Retrieve => handle_retrieve(command, ctx),
        Opcode::Delete => handle_delete(command, ctx),
        Opcode::List => handle_list(ctx),
        Opcode::HwChallenge => handle_challenge(ctx),
        Opcode::HwSign => handle_sign(command, ctx),
        Opcode::HwAttest => handle_attest(ctx),
    }
}

fn handle_discover<B: SecureElement>(ctx: &mut VaultContext<B>) -> Result<Response, OpError> {
    let info = ctx.backend.device_info();
    Ok(Response::Discover {
        model: info.model,
        serial: info.serial,
    })
}

fn handle_authenticate<B: SecureElement>(
    command: &Command,
    ctx: &mut VaultContext<B>,
) -> Result<Response, OpError> {
    if let Some(method) = command.auth_method.as_deref()
        && method != "pin"
    {
        return Err(OpError::UnsupportedAuthMethod(method.to_string()));
    }
    let pin = command.pin.as_deref().ok_or(OpError::MissingField("pin"))?;

    let descriptor = ctx.session.authenticate(
        &mut ctx.backend,
        pin,
        command.workspace.as_deref(),
        command.requested_ttl,
    )?;

    Ok(Response::Authenticate {
        session_id: descriptor.id,
        expires_in: descriptor.expires_in,
        workspace: descriptor.workspace,
    })
}

fn handle_store<B: SecureElement>(
    command: &Command,
    ctx: &mut VaultContext<B>,
) -> Result<Response, OpError> {
    let name = command.name.as_deref().ok_or(OpError::MissingField("name"))?;
    let value = command
        .value
        .as_deref()
        .ok_or(OpError::MissingField("value"))?;

    ctx.index.put(&mut ctx.backend, name, value.as_bytes())?;
    Ok(Response::Empty)
}

fn handle_retrieve<B: SecureElement>(
    command: &Command,
    ctx: &mut VaultContext<B>,
) -> Result<Response, OpError> {
    let name = command.name.as_deref().ok_or(OpError::MissingField("name"))?;

    let bytes = ctx.index.get(&mut ctx.backend, name)?;
    let value = core::str::from_utf8(&bytes).map_err(|_| ErrorKind::Internal)?;
    Ok(Response::Retrieve {
        value: SecretString::from(value),
    })
}

fn handle_delete<B: SecureElement>(
    command: &Command,
    ctx: &mut VaultContext<B>,
) -> Result<Response, OpError> {
    let name = command.name.as_deref().ok_or(OpError::MissingField("name"))?;

    ctx.index.remove(&mut ctx.backend, name)?;
    Ok(Response::Empty)
}

fn handle_list<B: SecureElement>(ctx: &mut VaultContext<B>) -> Result<Response, OpError> {
    Ok(Response::List {
        secrets: ctx.index.names(),
    })
}

fn handle_challenge<B: SecureElement>(ctx: &mut VaultContext<B>) -> Result<Response, OpError> {
    let info = ctx.backend.device_info();
    Ok(Response::Challenge {
        model: info.model,
        serial: info.serial,
    })
}

fn handle_sign<B: SecureElement>(
    command: &Command,
    ctx: &mut VaultContext<B>,
) -> Result<Response, OpError> {
    let key_name = command
        .key_name
        .as_deref()
        .ok_or(OpError::MissingField("key_name"))?;
    let data = command.data.as_deref().ok_or(OpError::MissingField("data"))?;

    let key_slot = key_slot_for_name(key_name);
    let signature = ctx
        .backend
        .sign(key_slot, data)
        .map_err(ErrorKind::from)?;
    Ok(Response::Sign {
        signature: hex::encode(&signature),
    })
}

fn handle_attest<B: SecureElement>(ctx: &mut VaultContext<B>) -> Result<Response, OpError> {
    let mut challenge = [0u8; 32];
    ctx.backend.random(&mut challenge);
    let signature = ctx
        .backend
        .attest(&challenge)
        .map_err(ErrorKind::from)?;
    Ok(Response::Attest {
        attestation: format!("{}:{}", hex::encode(&challenge), hex::encode(&signature)),
    })
}

/// Provisioning convention: key slot 0 holds the device attestation key,
/// and named signing keys fold onto slots 1..=31.
fn key_slot_for_name(key_name: &str) -> u8 {
    let mut hasher = Fnv32::default();
    hasher.write(key_name.as_bytes());
    let folded = hasher.finish() as u32;
    1 + (folded % u32::from(KEY_SLOT_END)) as u8
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod dispatch_tests;
