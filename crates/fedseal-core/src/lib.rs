#![forbid(unsafe_code)]

//! Core definitions shared by every fedseal crate: the error type,
//! XML namespace and node names, and algorithm identifiers.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use algorithm::{ContentEncryptionAlgorithm, KeyWrapAlgorithm};
pub use error::{Error, Result};
