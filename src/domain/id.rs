//! Task identity
//!
//! Two kinds of identifiers exist:
//!
//! - [`TaskKey`]: a stable internal key assigned when a task enters a
//!   collection. It never changes while the task lives, whatever happens to
//!   its text, and is what the dependency graph stores.
//! - Text identifiers: short base-36 codes (e.g. `k3f`) derived from a blake3
//!   hash of the task text. Display-only; editing a task changes its code.
//!
//! Text identifier length grows with the collection so collisions stay rare;
//! remaining collisions are resolved by probing in list order, so the same
//! list always produces the same codes.

use std::collections::HashSet;
use std::fmt;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const MIN_LENGTH: u32 = 3;
const MAX_LENGTH: u32 = 12;

/// Stable key of a task inside its collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskKey(u64);

impl TaskKey {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw key value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Code length for a collection of `count` tasks: at least 100 codes per task
pub fn identifier_length(count: usize) -> u32 {
    let wanted = (count as u128).saturating_mul(100).max(1);
    let mut length = MIN_LENGTH;
    while length < MAX_LENGTH && 36u128.pow(length) < wanted {
        length += 1;
    }
    length
}

/// Derives one text identifier per input, in order
pub fn text_identifiers<'a>(texts: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let texts: Vec<&str> = texts.into_iter().collect();
    let length = identifier_length(texts.len());
    let space = 36u64.pow(length);

    let mut used = HashSet::with_capacity(texts.len());
    texts
        .iter()
        .map(|text| {
            let mut value = hash_value(text) % space;
            while !used.insert(value) {
                value = (value + 1) % space;
            }
            encode(value, length)
        })
        .collect()
}

/// Returns true if the string could be a text identifier
pub fn is_text_identifier(s: &str) -> bool {
    (MIN_LENGTH as usize..=MAX_LENGTH as usize).contains(&s.len())
        && s.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
}

fn hash_value(text: &str) -> u64 {
    let hash = blake3::hash(text.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

fn encode(mut value: u64, length: u32) -> String {
    let mut digits: Vec<char> = (0..length)
        .map(|_| {
            let digit = char::from(ALPHABET[(value % 36) as usize]);
            value /= 36;
            digit
        })
        .collect();
    digits.reverse();
    digits.into_iter().collect()
}
