//! # Tessera Protocol: Wire Format
//!
//! This crate implements the framing and record layer for the Tessera key
//! distribution protocol, a symmetric Needham–Schroeder exchange between an
//! initiator, a responder and a trusted key distribution center (KDC).
//!
//! ## Protocol Design
//!
//! Every message travels as one frame:
//! - **FrameHeader**: 12 bytes of raw binary (Big Endian) carrying magic,
//!   version, opcode and payload length
//! - **Payload**: either a clear [`payloads::kdc::AuthRequest`] record or an
//!   opaque AEAD ciphertext ([`payloads::Sealed`])
//!
//! Structured bodies (the clear request and every sealed plaintext) use the
//! length-prefixed [`codec`] with a version byte and a record tag. The format
//! is deliberately not self-describing: a decoder only ever produces the type
//! its caller expects.
//!
//! ## Implementation Notes
//!
//! - **Zero-Copy Headers**: [`zerocopy`](https://docs.rs/zerocopy) casts
//!   network bytes to [`FrameHeader`] with compile-time layout checks.
//!
//! - **No Cryptography Here**: sealing and opening live in `tessera-core`.
//!   This crate only moves bytes and validates structure.
//!
//! ## Security Properties
//!
//! - **No Unsafe Deserialization**: malformed frames and records are rejected
//!   with a [`ProtocolError`]; nothing panics on hostile input.
//!
//! - **Size Limits**: payloads are capped at 64 KiB.
//!
//! - **Secret Hygiene**: [`KeyMaterial`] is zeroized on drop and never printed.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod errors;
pub mod frame;
pub mod header;
pub mod opcodes;
pub mod payloads;
pub mod principal;

pub use codec::Record;
pub use errors::{ProtocolError, Result};
pub use frame::Frame;
pub use header::FrameHeader;
pub use opcodes::Opcode;
pub use payloads::{Payload, Sealed};
pub use principal::{KeyMaterial, PrincipalId};
