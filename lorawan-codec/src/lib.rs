//! LoRaWAN 1.0.2 frame handling: parsing and building of PHY payloads,
//! MAC commands and the session crypto that goes with them.
//!
//! The crate is `no_std` and allocation-free; payloads are views over the
//! caller's byte slices. The AES/CMAC primitives sit behind the
//! [`keys::CryptoFactory`] seam so a hardware implementation can be swapped
//! in; the `default-crypto` feature provides a software one.
#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::upper_case_acronyms)]

pub mod creator;
pub mod keys;
pub mod maccommandcreator;
pub mod maccommands;
pub mod parser;
pub mod types;

#[cfg(feature = "default-crypto")]
#[cfg_attr(docsrs, doc(cfg(feature = "default-crypto")))]
pub mod default_crypto;

mod securityhelpers;
