use std::io::{self, BufRead, Write};

use avp_core::{MemoryBackend, VaultContext, is_avp_line, limits, process_line};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("seed must be 64 hex characters")]
    BadSeed,
}

pub struct SimOptions {
    pub seed: [u8; 32],
    pub pin: Option<String>,
}

/// Parse a 64-character hex seed into RNG seed bytes.
pub fn parse_seed(hex_seed: &str) -> Result<[u8; 32], SimError> {
    let bytes = avp_core::hex::decode(hex_seed).map_err(|_| SimError::BadSeed)?;
    bytes.try_into().map_err(|_| SimError::BadSeed)
}

/// Serve requests line by line until the input closes.
///
/// Mirrors the device's USB console: `#`-prefixed banner lines first, then
/// one response line per request. Lines that do not open a JSON object
/// belong to whatever else shares the console and are passed over.
pub fn run(
    options: SimOptions,
    input: impl BufRead,
    mut output: impl Write,
) -> Result<(), SimError> {
    let mut backend = MemoryBackend::new(options.seed);
    if let Some(pin) = &options.pin {
        backend.set_expected_pin(pin);
    }
    let mut ctx = VaultContext::new(backend);

    writeln!(output, "# AVP Protocol v{} initialized", limits::PROTOCOL_VERSION)?;
    writeln!(output, "# NexusClaw ready")?;

    for line in input.lines() {
        let line = line?;
        if !is_avp_line(line.as_bytes()) {
            continue;
        }
        writeln!(output, "{}", process_line(line.as_bytes(), &mut ctx))?;
        output.flush()?;
    }

    Ok(())
}
