#![forbid(unsafe_code)]

pub use fedseal_core as core;
pub use fedseal_xml as xml;
pub use fedseal_crypto as crypto;
pub use fedseal_keys as keys;
pub use fedseal_enc as enc;
pub use fedseal_token as token;

pub use fedseal_core::{Error, Result};
