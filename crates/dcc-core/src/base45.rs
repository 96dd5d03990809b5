//! # Base45 — QR Alphanumeric Alphabet Codec
//!
//! Reversible encoding between raw bytes and the 45-symbol alphabet that QR
//! codes store most compactly in alphanumeric mode.
//!
//! Bytes are taken two at a time. A pair `(b0, b1)` becomes the number
//! `b0 * 256 + b1`, written as three base-45 digits, least significant
//! first. A lone trailing byte becomes two digits.
//!
//! ## Rejections
//!
//! Decoding fails on characters outside the alphabet, on chunks whose value
//! does not fit the byte width they stand for, and on inputs whose length
//! leaves one dangling character (`len % 3 == 1`). Nothing is emitted for a
//! rejected input.

use crate::error::EncodingError;

/// The 45 symbols, index 0..44.
pub const ALPHABET: &[u8; 45] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

const BASE: u32 = 45;
const BASE_SQUARED: u32 = BASE * BASE;

/// Encode bytes into Base45 text.
pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(2) * 3);
    let mut chunks = data.chunks_exact(2);
    for pair in &mut chunks {
        let x = u32::from(pair[0]) * 256 + u32::from(pair[1]);
        out.push(symbol(x % BASE));
        out.push(symbol((x / BASE) % BASE));
        out.push(symbol(x / BASE_SQUARED));
    }
    if let [b] = chunks.remainder() {
        let x = u32::from(*b);
        out.push(symbol(x % BASE));
        out.push(symbol(x / BASE));
    }
    out
}

/// Decode Base45 text into bytes.
///
/// # Errors
///
/// - [`EncodingError::InvalidLength`] if `text.len() % 3 == 1`.
/// - [`EncodingError::InvalidCharacter`] for a symbol outside [`ALPHABET`].
/// - [`EncodingError::Overflow`] if a triplet exceeds `0xFFFF` or a trailing
///   pair exceeds `0xFF`.
pub fn decode(text: &str) -> Result<Vec<u8>, EncodingError> {
    let input = text.as_bytes();
    if input.len() % 3 == 1 {
        return Err(EncodingError::InvalidLength(input.len()));
    }

    let mut out = Vec::with_capacity(input.len() / 3 * 2 + 1);
    let mut chunks = input.chunks_exact(3);
    let mut position = 0;
    for _ in &mut chunks {
        let c0 = index_of(text, position)?;
        let c1 = index_of(text, position + 1)?;
        let c2 = index_of(text, position + 2)?;
        let value = c0 + c1 * BASE + c2 * BASE_SQUARED;
        if value > 0xFFFF {
            return Err(EncodingError::Overflow { value, position });
        }
        out.push((value / 256) as u8);
        out.push((value % 256) as u8);
        position += 3;
    }

    if chunks.remainder().len() == 2 {
        let c0 = index_of(text, position)?;
        let c1 = index_of(text, position + 1)?;
        let value = c0 + c1 * BASE;
        if value > 0xFF {
            return Err(EncodingError::Overflow { value, position });
        }
        out.push(value as u8);
    }

    Ok(out)
}

fn symbol(index: u32) -> char {
    char::from(ALPHABET[index as usize])
}

/// Alphabet index of the byte at `position`.
///
/// Non-ASCII input is reported with the full character it belongs to.
fn index_of(text: &str, position: usize) -> Result<u32, EncodingError> {
    let byte = text.as_bytes()[position];
    ALPHABET
        .iter()
        .position(|&s| s == byte)
        .map(|i| i as u32)
        .ok_or_else(|| EncodingError::InvalidCharacter {
            ch: char_at(text, position),
            position,
        })
}

fn char_at(text: &str, position: usize) -> char {
    text.char_indices()
        .take_while(|(i, _)| *i <= position)
        .last()
        .map_or(char::REPLACEMENT_CHARACTER, |(_, c)| c)
}
