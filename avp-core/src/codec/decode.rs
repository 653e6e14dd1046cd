use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use serde::Deserialize;

use super::SecretString;
use crate::error::ErrorKind;
use crate::hex;
use crate::limits::{
    MAX_JSON_LEN, MAX_NAME_LEN, MAX_PIN_LEN, MAX_SIGN_DATA_LEN, MAX_VALUE_LEN, SESSION_ID_LEN,
};

/// Operation requested by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Discover,
    Authenticate,
    Store,
    Retrieve,
    Delete,
    List,
    Rotate,
    HwChallenge,
    HwSign,
    HwAttest,
}

impl Opcode {
    /// Parse the wire spelling of an opcode.
    pub fn parse(op: &str) -> Option<Self> {
        let opcode = match op {
            "DISCOVER" => Opcode::Discover,
            "AUTHENTICATE" => Opcode::Authenticate,
            "STORE" => Opcode::Store,
            "RETRIEVE" => Opcode::Retrieve,
            "DELETE" => Opcode::Delete,
            "LIST" => Opcode::List,
            "ROTATE" => Opcode::Rotate,
            "HW_CHALLENGE" => Opcode::HwChallenge,
            "HW_SIGN" => Opcode::HwSign,
            "HW_ATTEST" => Opcode::HwAttest,
            _ => return None,
        };
        Some(opcode)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Opcode::Discover => "DISCOVER",
            Opcode::Authenticate => "AUTHENTICATE",
            Opcode::Store => "STORE",
            Opcode::Retrieve => "RETRIEVE",
            Opcode::Delete => "DELETE",
            Opcode::List => "LIST",
            Opcode::Rotate => "ROTATE",
            Opcode::HwChallenge => "HW_CHALLENGE",
            Opcode::HwSign => "HW_SIGN",
            Opcode::HwAttest => "HW_ATTEST",
        }
    }

    /// Whether the dispatcher must observe a live session before running
    /// this operation.
    pub const fn requires_session(self) -> bool {
        !matches!(
            self,
            Opcode::Discover | Opcode::Authenticate | Opcode::HwChallenge
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded request, validated field by field.
///
/// Every field except `op` is optional at this layer; handlers decide which
/// fields their operation requires. The `session_id` field is advisory: the
/// engine enforces session liveness, not identifier equality, so the value
/// is carried for host-side bookkeeping and future multi-session extension.
#[derive(Debug)]
pub struct Command {
    pub op: Opcode,
    pub session_id: Option<String>,
    pub workspace: Option<String>,
    pub name: Option<String>,
    pub value: Option<SecretString>,
    pub auth_method: Option<String>,
    pub pin: Option<SecretString>,
    pub requested_ttl: Option<u32>,
    pub key_name: Option<String>,
    pub data: Option<Vec<u8>>,
}

/// Failure produced while decoding a request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input is not valid UTF-8 or not a well-formed JSON object.
    Syntax,
    /// Input line exceeds the protocol's line length ceiling.
    LineTooLong(usize),
    /// The `op` field is absent or not a string.
    MissingOp,
    /// The `op` field named an operation outside the protocol.
    UnknownOp(String),
    /// A string field exceeds its length ceiling.
    FieldTooLong { field: &'static str, max: usize },
    /// A field that must be non-empty was empty.
    FieldEmpty { field: &'static str },
    /// A field contains bytes outside its permitted charset.
    FieldNotPrintable { field: &'static str },
    /// A hex-typed field contains non-hex characters.
    FieldNotHex { field: &'static str },
    /// The `data` field is not even-length hex.
    InvalidHex,
    /// The `data` field decodes past the signing buffer.
    DataTooLarge { len: usize },
}

impl CodecError {
    /// Wire-level error category this failure projects to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodecError::Syntax | CodecError::LineTooLong(_) | CodecError::MissingOp => {
                ErrorKind::Parse
            }
            CodecError::UnknownOp(_) => ErrorKind::InvalidOperation,
            CodecError::FieldTooLong { .. }
            | CodecError::FieldEmpty { .. }
            | CodecError::FieldNotPrintable { .. }
            | CodecError::FieldNotHex { .. }
            | CodecError::InvalidHex
            | CodecError::DataTooLarge { .. } => ErrorKind::InvalidParameter,
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Syntax => write!(f, "request is not a valid JSON object"),
            CodecError::LineTooLong(len) => {
                write!(f, "request of {len} bytes exceeds line limit {MAX_JSON_LEN}")
            }
            CodecError::MissingOp => write!(f, "missing op field"),
            CodecError::UnknownOp(op) => write!(f, "unknown operation '{op}'"),
            CodecError::FieldTooLong { field, max } => {
                write!(f, "{field} exceeds {max} bytes")
            }
            CodecError::FieldEmpty { field } => write!(f, "{field} must not be empty"),
            CodecError::FieldNotPrintable { field } => {
                write!(f, "{field} contains non-printable characters")
            }
            CodecError::FieldNotHex { field } => write!(f, "{field} is not valid hex"),
            CodecError::InvalidHex => write!(f, "data is not valid hex"),
            CodecError::DataTooLarge { len } => {
                write!(f, "data of {len} bytes exceeds limit {MAX_SIGN_DATA_LEN}")
            }
        }
    }
}

impl core::error::Error for CodecError {}

/// Raw shape accepted from the wire before validation. Unknown fields are
/// ignored; `requested_ttl` wins over `ttl` when both are present.
#[derive(Deserialize)]
struct RawCommand {
    op: Option<String>,
    session_id: Option<String>,
    workspace: Option<String>,
    name: Option<String>,
    value: Option<SecretString>,
    auth_method: Option<String>,
    pin: Option<SecretString>,
    ttl: Option<u64>,
    requested_ttl: Option<u64>,
    key_name: Option<String>,
    data: Option<String>,
}

/// Decode one newline-terminated request line.
pub fn decode_command(line: &[u8]) -> Result<Command, CodecError> {
    if line.len() > MAX_JSON_LEN {
        return Err(CodecError::LineTooLong(line.len()));
    }
    let text = core::str::from_utf8(line).map_err(|_| CodecError::Syntax)?;
    let raw: RawCommand = serde_json::from_str(text).map_err(|_| CodecError::Syntax)?;

    let op = raw.op.ok_or(CodecError::MissingOp)?;
    let op = Opcode::parse(&op).ok_or_else(|| CodecError::UnknownOp(op.to_string()))?;

    if let Some(session_id) = &raw.session_id {
        check_len("session_id", session_id, SESSION_ID_LEN)?;
        if !session_id.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CodecError::FieldNotHex { field: "session_id" });
        }
    }
    let workspace = match raw.workspace {
        Some(workspace) if workspace.is_empty() => None,
        Some(workspace) => {
            check_len("workspace", &workspace, MAX_NAME_LEN)?;
            Some(workspace)
        }
        None => None,
    };
    if let Some(name) = &raw.name {
        check_name("name", name)?;
    }
    if let Some(key_name) = &raw.key_name {
        check_name("key_name", key_name)?;
    }
    if let Some(value) = &raw.value {
        check_len("value", value, MAX_VALUE_LEN)?;
    }
    if let Some(pin) = &raw.pin {
        check_len("pin", pin, MAX_PIN_LEN)?;
    }

    let data = match raw.data {
        Some(data) => {
            let decoded = hex::decode(&data).map_err(|_| CodecError::InvalidHex)?;
            if decoded.len() > MAX_SIGN_DATA_LEN {
                return Err(CodecError::DataTooLarge { len: decoded.len() });
            }
            Some(decoded)
        }
        None => None,
    };

    let requested_ttl = raw
        .requested_ttl
        .or(raw.ttl)
        .map(|ttl| ttl.min(u64::from(u32::MAX)) as u32);

    Ok(Command {
        op,
        session_id: raw.session_id,
        workspace,
        name: raw.name,
        value: raw.value,
        auth_method: raw.auth_method,
        pin: raw.pin,
        requested_ttl,
        key_name: raw.key_name,
        data,
    })
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), CodecError> {
    if value.len() > max {
        return Err(CodecError::FieldTooLong { field, max });
    }
    Ok(())
}

/// Names are 1..=63 bytes of printable ASCII so LIST output stays clean.
fn check_name(field: &'static str, value: &str) -> Result<(), CodecError> {
    if value.is_empty() {
        return Err(CodecError::FieldEmpty { field });
    }
    check_len(field, value, MAX_NAME_LEN)?;
    if !value.bytes().all(|b| b.is_ascii_graphic()) {
        return Err(CodecError::FieldNotPrintable { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_minimal_discover() {
        let cmd = decode_command(b"{\"op\":\"DISCOVER\"}").expect("decode");
        assert_eq!(cmd.op, Opcode::Discover);
        assert!(cmd.name.is_none());
    }

    #[test]
    fn accepts_leading_whitespace_and_trailing_newline() {
        let cmd = decode_command(b"  \t{\"op\":\"LIST\"}\n").expect("decode");
        assert_eq!(cmd.op, Opcode::List);
    }

    #[test]
    fn ignores_unknown_fields() {
        let cmd = decode_command(b"{\"op\":\"LIST\",\"color\":\"green\",\"depth\":3}")
            .expect("decode");
        assert_eq!(cmd.op, Opcode::List);
    }

    #[test]
    fn missing_op_is_a_parse_error() {
        let err = decode_command(b"{\"name\":\"k\"}").expect_err("missing op");
        assert_eq!(err, CodecError::MissingOp);
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn non_string_op_is_a_parse_error() {
        let err = decode_command(b"{\"op\":7}").expect_err("numeric op");
        assert_eq!(err, CodecError::Syntax);
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn unknown_op_is_invalid_operation() {
        let err = decode_command(b"{\"op\":\"FORMAT\"}").expect_err("unknown op");
        assert_eq!(err, CodecError::UnknownOp("FORMAT".into()));
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    }

    #[test]
    fn requested_ttl_wins_over_ttl() {
        let cmd = decode_command(b"{\"op\":\"AUTHENTICATE\",\"ttl\":120,\"requested_ttl\":600}")
            .expect("decode");
        assert_eq!(cmd.requested_ttl, Some(600));

        let cmd = decode_command(b"{\"op\":\"AUTHENTICATE\",\"ttl\":120}").expect("decode");
        assert_eq!(cmd.requested_ttl, Some(120));
    }

    #[test]
    fn oversize_name_is_invalid_parameter() {
        let name = "n".repeat(MAX_NAME_LEN + 1);
        let line = alloc::format!("{{\"op\":\"STORE\",\"name\":\"{name}\",\"value\":\"v\"}}");
        let err = decode_command(line.as_bytes()).expect_err("oversize name");
        assert_eq!(
            err,
            CodecError::FieldTooLong {
                field: "name",
                max: MAX_NAME_LEN
            }
        );
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn empty_name_is_invalid_parameter() {
        let err = decode_command(b"{\"op\":\"STORE\",\"name\":\"\",\"value\":\"v\"}")
            .expect_err("empty name");
        assert_eq!(err, CodecError::FieldEmpty { field: "name" });
    }

    #[test]
    fn empty_workspace_falls_back_to_default() {
        let cmd = decode_command(b"{\"op\":\"AUTHENTICATE\",\"workspace\":\"\"}").expect("decode");
        assert!(cmd.workspace.is_none());
    }

    #[test]
    fn non_hex_session_id_is_invalid_parameter() {
        let err = decode_command(b"{\"op\":\"LIST\",\"session_id\":\"not-hex!\"}")
            .expect_err("bad session id");
        assert_eq!(err, CodecError::FieldNotHex { field: "session_id" });
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn oversize_value_is_invalid_parameter() {
        let value = "v".repeat(MAX_VALUE_LEN + 1);
        let line = alloc::format!("{{\"op\":\"STORE\",\"name\":\"k\",\"value\":\"{value}\"}}");
        let err = decode_command(line.as_bytes()).expect_err("oversize value");
        assert_eq!(
            err,
            CodecError::FieldTooLong {
                field: "value",
                max: MAX_VALUE_LEN
            }
        );
    }

    #[test]
    fn data_decodes_from_hex() {
        let cmd = decode_command(b"{\"op\":\"HW_SIGN\",\"key_name\":\"k\",\"data\":\"deadBEEF\"}")
            .expect("decode");
        assert_eq!(cmd.data.as_deref(), Some(&[0xDE, 0xAD, 0xBE, 0xEF][..]));
    }

    #[test]
    fn malformed_hex_is_invalid_parameter() {
        for line in [
            &b"{\"op\":\"HW_SIGN\",\"data\":\"abc\"}"[..],
            &b"{\"op\":\"HW_SIGN\",\"data\":\"zz\"}"[..],
        ] {
            let err = decode_command(line).expect_err("bad hex");
            assert_eq!(err, CodecError::InvalidHex);
            assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        }
    }

    #[test]
    fn oversize_data_is_invalid_parameter() {
        let data = "ab".repeat(MAX_SIGN_DATA_LEN + 1);
        let line = alloc::format!("{{\"op\":\"HW_SIGN\",\"data\":\"{data}\"}}");
        let err = decode_command(line.as_bytes()).expect_err("oversize data");
        assert_eq!(
            err,
            CodecError::DataTooLarge {
                len: MAX_SIGN_DATA_LEN + 1
            }
        );
    }

    #[test]
    fn oversize_line_is_a_parse_error() {
        let padding = "x".repeat(MAX_JSON_LEN);
        let line = alloc::format!("{{\"op\":\"LIST\",\"pad\":\"{padding}\"}}");
        let err = decode_command(line.as_bytes()).expect_err("oversize line");
        assert!(matches!(err, CodecError::LineTooLong(_)));
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn session_exempt_set_is_exactly_three_ops() {
        for (op, exempt) in [
            (Opcode::Discover, true),
            (Opcode::Authenticate, true),
            (Opcode::HwChallenge, true),
            (Opcode::Store, false),
            (Opcode::Retrieve, false),
            (Opcode::Delete, false),
            (Opcode::List, false),
            (Opcode::Rotate, false),
            (Opcode::HwSign, false),
            (Opcode::HwAttest, false),
        ] {
            assert_eq!(op.requires_session(), !exempt, "{op}");
        }
    }
}
