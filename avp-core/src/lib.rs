//! Agent Vault Protocol engine for the NexusClaw security token.
//!
//! NexusClaw stores credentials and performs signing inside a
//! tamper-resistant secure element; hosts talk to it over USB CDC with
//! line-delimited JSON. This crate is the firmware-resident core of that
//! conversation: request decoding, session lifecycle, authorization
//! checks, secret-metadata book-keeping, operation dispatch, and response
//! formatting.
//!
//! Everything sensitive sits behind the [`SecureElement`] trait: slot
//! storage, randomness, the clock, PIN verification, and signing. The
//! engine never holds plaintext secret material past the response that
//! carries it, and buffers that do touch secrets are wrapped in
//! [`zeroize`](https://docs.rs/zeroize) guards. The firmware links a
//! driver-backed element; tests and the host simulator use
//! [`MemoryBackend`].
//!
//! The PIN-attempt counter is device state, not session state: it counts
//! up across failed authentications, resets only on success, and at five
//! failures every subsequent authentication fails with `PIN_LOCKED`
//! without consulting the element. Power-cycling the device is the only
//! recourse, which user documentation should call out.
//!
//! ```
//! use avp_core::{MemoryBackend, VaultContext, process_line};
//!
//! let mut ctx = VaultContext::new(MemoryBackend::new([0u8; 32]));
//! let response = process_line(b"{\"op\":\"DISCOVER\"}", &mut ctx);
//! assert!(response.starts_with("{\"ok\":true,\"version\":\"0.1.0\""));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod backend;
pub mod codec;
mod context;
mod dispatch;
mod error;
pub mod hex;
pub mod index;
pub mod limits;
mod session;

pub use backend::{BackendError, DeviceInfo, MemoryBackend, PinVerdict, SecureElement};
pub use codec::{Command, CodecError, Opcode, Response, SecretString};
pub use context::VaultContext;
pub use dispatch::{is_avp_line, process, process_line};
pub use error::ErrorKind;
pub use session::{SessionDescriptor, SessionManager};
