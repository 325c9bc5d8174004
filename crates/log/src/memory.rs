//! Write chunk sizing from a memory limit
//!
//! The limit uses the shorthand byte notation (`"128M"`, `"1g"`, `"512k"`,
//! plain digits for bytes). Stream handlers buffer writes in chunks of 10% of
//! that limit, never less than [`MIN_CHUNK_SIZE`] and never more than
//! [`DEFAULT_CHUNK_SIZE`].

use std::sync::LazyLock;

use regex::Regex;

/// Chunk size used when no limit is configured, and the upper bound
pub const DEFAULT_CHUNK_SIZE: usize = 10 * 1024 * 1024;

/// Lower bound for a derived chunk size
pub const MIN_CHUNK_SIZE: usize = 100 * 1024;

static SHORTHAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?P<num>\d+)(?:\.\d+)?\s*(?P<unit>[gkm])?\s*$")
        .expect("shorthand size pattern is valid")
});

/// Parse a shorthand size into bytes
///
/// Returns `None` for anything that does not match, including negative
/// values such as `"-1"` (no limit).
pub fn parse_shorthand_size(value: &str) -> Option<u64> {
    let caps = SHORTHAND.captures(value)?;
    let num: u64 = caps["num"].parse().ok()?;
    let multiplier: u64 = match caps.name("unit").map(|u| u.as_str().to_ascii_lowercase()) {
        Some(unit) if unit == "g" => 1024 * 1024 * 1024,
        Some(unit) if unit == "m" => 1024 * 1024,
        Some(unit) if unit == "k" => 1024,
        _ => 1,
    };
    num.checked_mul(multiplier)
}

/// Chunk size for a given memory limit
pub fn chunk_size(memory_limit: Option<&str>) -> usize {
    match memory_limit.and_then(parse_shorthand_size) {
        Some(bytes) => {
            let tenth = usize::try_from(bytes / 10).unwrap_or(usize::MAX);
            tenth.clamp(MIN_CHUNK_SIZE, DEFAULT_CHUNK_SIZE)
        }
        None => DEFAULT_CHUNK_SIZE,
    }
}
