//! # DGCI — Certificate Identifier Generation
//!
//! Produces unique certificate identifiers of the form
//! `<prefix>:<encoded-uuid><check-char>`.
//!
//! The identifier body is a random UUID rendered in radix 35
//! (`10 + ('Z' - 'A')`), uppercase. The trailing check character is a
//! Luhn mod N checksum over the whole preceding string, where N is the size
//! of [`CODE_POINTS`].
//!
//! ## Invariants
//!
//! - A [`DgciGenerator`] can only be constructed with a prefix drawn from
//!   [`CODE_POINTS`]; prefix validation happens once, at construction.
//! - N is even, so the doubling step maps code points one-to-one and
//!   every single-symbol substitution changes the check character.
//! - For every generated identifier, recomputing the check character over
//!   all but the last character reproduces the last character.

use rand_core::{CryptoRng, OsRng, RngCore};
use uuid::Uuid;

use crate::error::{ConfigError, CryptoError, EncodingError};

/// Symbol table for the Luhn mod N checksum.
pub const CODE_POINTS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789/:";

const TABLE: &[u8] = CODE_POINTS.as_bytes();

const N: u32 = TABLE.len() as u32;

/// Radix of the encoded UUID body.
pub const UUID_RADIX: u32 = 10 + ('Z' as u32 - 'A' as u32);

/// Digit symbols of [`UUID_RADIX`], most significant last.
const UUID_DIGITS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXY";

/// Generates checksum-protected certificate identifiers for one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DgciGenerator {
    prefix: String,
    /// Code points of `prefix` followed by the `:` separator.
    head: Vec<u32>,
}

impl DgciGenerator {
    /// Create a generator, rejecting prefixes with characters outside
    /// [`CODE_POINTS`].
    pub fn new(prefix: impl Into<String>) -> Result<Self, ConfigError> {
        let prefix = prefix.into();
        let head = format!("{prefix}:")
            .chars()
            .map(|c| code_point(c).ok_or(ConfigError::InvalidPrefixCharacter(c)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                tracing::warn!(prefix = %prefix, "rejected identifier prefix");
                e
            })?;
        tracing::debug!(prefix = %prefix, "identifier generator ready");
        Ok(Self { prefix, head })
    }

    /// The configured prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Generate a new identifier using the operating system CSPRNG.
    pub fn generate(&self) -> Result<String, CryptoError> {
        self.generate_with(&mut OsRng)
    }

    /// Generate a new identifier drawing the UUID from `rng`.
    pub fn generate_with<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<String, CryptoError> {
        let mut bytes = [0u8; 16];
        rng.try_fill_bytes(&mut bytes)?;
        let uuid = uuid::Builder::from_random_bytes(bytes).into_uuid();
        Ok(self.identifier_for(uuid))
    }

    /// Build the identifier for a given UUID.
    ///
    /// The prefix was validated at construction and every radix digit is a
    /// code point, so the check is computed on code points directly.
    pub fn identifier_for(&self, uuid: Uuid) -> String {
        let digits = uuid_digits(uuid);
        let points = self
            .head
            .iter()
            .copied()
            .chain(digits.iter().map(|&d| digit_code_point(d)));
        let check = luhn_check(points);

        let mut id = String::with_capacity(self.head.len() + digits.len() + 1);
        id.push_str(&self.prefix);
        id.push(':');
        id.extend(digits.iter().map(|&d| digit_char(d)));
        id.push(check);
        id
    }
}

/// Render a UUID as an unsigned 128-bit integer in [`UUID_RADIX`], uppercase.
pub fn encode_uuid(uuid: Uuid) -> String {
    uuid_digits(uuid).into_iter().map(digit_char).collect()
}

/// Compute the Luhn mod N check character for `input`.
///
/// # Errors
///
/// Returns [`EncodingError::InvalidCharacter`] if `input` contains a
/// character outside [`CODE_POINTS`].
pub fn check_character(input: &str) -> Result<char, EncodingError> {
    let points = input
        .char_indices()
        .map(|(position, ch)| code_point(ch).ok_or(EncodingError::InvalidCharacter { ch, position }))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(luhn_check(points))
}

/// Recompute the check character of a full identifier and compare it to the
/// identifier's last character.
pub fn verify_check_character(identifier: &str) -> bool {
    let mut chars = identifier.chars();
    match chars.next_back() {
        Some(last) => check_character(chars.as_str()).is_ok_and(|c| c == last),
        None => false,
    }
}

/// Luhn mod N over code points, scanned right to left with the doubling
/// factor on the rightmost point.
fn luhn_check<I>(points: I) -> char
where
    I: IntoIterator<Item = u32>,
    I::IntoIter: DoubleEndedIterator,
{
    let mut factor = 2;
    let mut sum = 0;
    for p in points.into_iter().rev() {
        let addend = factor * p;
        sum += addend / N + addend % N;
        factor = if factor == 2 { 1 } else { 2 };
    }
    char::from(TABLE[((N - sum % N) % N) as usize])
}

/// Radix digits of the UUID value, most significant first.
fn uuid_digits(uuid: Uuid) -> Vec<u32> {
    let mut value = uuid.as_u128();
    let radix = u128::from(UUID_RADIX);
    let mut digits = Vec::with_capacity(26);
    loop {
        digits.push((value % radix) as u32);
        value /= radix;
        if value == 0 {
            break;
        }
    }
    digits.reverse();
    digits
}

fn digit_char(digit: u32) -> char {
    char::from(UUID_DIGITS[digit as usize])
}

/// Position of a radix digit's symbol in [`CODE_POINTS`]: letters come
/// first, then `0`-`9`.
fn digit_code_point(digit: u32) -> u32 {
    if digit < 10 {
        26 + digit
    } else {
        digit - 10
    }
}

fn code_point(ch: char) -> Option<u32> {
    CODE_POINTS.find(ch).map(|i| i as u32)
}
