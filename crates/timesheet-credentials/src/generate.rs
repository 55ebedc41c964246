use bip39::{Language, Mnemonic};

/// Generate a fresh 24-word BIP39 English mnemonic from 256 bits of entropy
/// plus an 8-bit checksum (§4.5), drawn from the OS random source via the
/// `bip39` crate's own generator.
///
/// # Panics
///
/// Panics if the underlying entropy source fails, which the `bip39` crate
/// treats as unrecoverable.
#[must_use]
pub fn generate_phrase() -> String {
    Mnemonic::generate_in(Language::English, 24)
        .expect("24-word mnemonic generation from a valid word count never fails")
        .to_string()
}
