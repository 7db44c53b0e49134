//! Chat payload obfuscation.
//!
//! Outbound chat text is XORed one UTF-16 code unit at a time with a fixed
//! key; the server applies the same transform to recover it. This is not
//! encryption.

pub const CHAT_XOR_KEY: u16 = 42;

/// XOR every UTF-16 code unit with [`CHAT_XOR_KEY`]. Applying it twice is the
/// identity.
///
/// The key only touches the low six bits: a surrogate stays a surrogate of the
/// same half, and a non-surrogate never becomes one, so the result is always
/// valid UTF-16.
pub fn obfuscate_chat(text: &str) -> String {
    let units = text.encode_utf16().map(|unit| unit ^ CHAT_XOR_KEY);
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
