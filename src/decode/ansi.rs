// src/decode/ansi.rs

//! Removal of terminal control sequences from raw output bytes.

use std::sync::LazyLock;

use regex::bytes::Regex;

/// A complete CSI sequence: `ESC [`, parameter bytes (0x30–0x3F),
/// intermediate bytes (0x20–0x2F), one final byte (0x40–0x7E).
static CSI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u)\x1b\[[\x30-\x3f]*[\x20-\x2f]*[\x40-\x7e]").expect("valid CSI regex")
});

/// An escape that was cut off at the end of the chunk: a lone `ESC`, or a
/// CSI prefix still missing its final byte.
static TRAILING_PARTIAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u)\x1b(?:\[[\x30-\x3f]*[\x20-\x2f]*)?\z").expect("valid partial CSI regex")
});

/// Strip every CSI sequence from `input`, plus a truncated one at the end.
///
/// Removing a sequence can splice two fragments into a new one
/// (`ESC ESC[0m [31m`), so this repeats until nothing matches. The result
/// contains no complete CSI and no trailing partial, which makes the
/// function idempotent.
pub fn strip_csi(input: &[u8]) -> Vec<u8> {
    let mut current = input.to_vec();
    loop {
        let stripped = CSI.replace_all(&current, &b""[..]);
        let stripped = TRAILING_PARTIAL.replace(&stripped, &b""[..]).into_owned();
        if stripped.len() == current.len() {
            return current;
        }
        current = stripped;
    }
}

/// True if `input` still holds a complete CSI sequence.
pub fn contains_csi(input: &[u8]) -> bool {
    CSI.is_match(input)
}
