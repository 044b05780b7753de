//! Content Fingerprinting
//!
//! Reversible steganographic codec that embeds a key's identity into
//! delivered text using zero-width characters, for after-the-fact leak
//! attribution. Watermarking, not encryption: it survives copy-paste
//! but not deliberate stripping of non-printing characters.

use crate::domain::entities::TOKEN_PREFIX;

/// Zero-width characters used as base-4 digits
///
/// ZERO WIDTH SPACE, ZERO WIDTH NON-JOINER, ZERO WIDTH JOINER,
/// WORD JOINER. None of them render.
const MARKERS: [char; 4] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}'];

/// Copies of the payload spliced into the text, so partial excerpts
/// still carry at least one complete copy
const REDUNDANCY: u64 = 3;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Explicitly seeded FNV-1a, so placement never depends on any
/// runtime's built-in string hashing and stays identical across runs
fn fnv1a64(data: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &byte in data {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn digit_of(c: char) -> Option<u8> {
    MARKERS.iter().position(|&m| m == c).map(|i| i as u8)
}

/// Encode an identity as a run of zero-width digits,
/// most-significant bit pair first: 4 digits per byte
fn encode_payload(identity: &str) -> String {
    let mut payload = String::with_capacity(identity.len() * 4 * 3);
    for byte in identity.bytes() {
        for shift in [6u8, 4, 2, 0] {
            payload.push(MARKERS[((byte >> shift) & 0b11) as usize]);
        }
    }
    payload
}

/// Embed `identity` invisibly into `text`
///
/// Deterministic: the same identity on the same text always yields
/// byte-identical output. Only zero-width characters are inserted;
/// every visible glyph and every whitespace byte of `text` is
/// preserved, so rendered output is indistinguishable from the
/// original. Degenerate input (empty text or identity) is returned
/// unchanged.
pub fn embed(text: &str, identity: &str) -> String {
    if text.is_empty() || identity.is_empty() {
        return text.to_string();
    }

    let payload = encode_payload(identity);

    // Word-start byte offsets; insertion between words keeps the
    // payload runs separated by visible characters.
    let word_starts = word_start_offsets(text);
    if word_starts.len() < 2 {
        return format!("{text}{payload}");
    }

    let hash = fnv1a64(identity.as_bytes());
    let word_count = word_starts.len() as u64;
    let mut offsets: Vec<usize> = (1..=REDUNDANCY)
        .map(|i| word_starts[(hash.wrapping_mul(i) % word_count) as usize])
        .collect();
    offsets.sort_unstable();
    offsets.dedup();

    // Splice back to front so earlier offsets stay valid
    let mut out = text.to_string();
    for &offset in offsets.iter().rev() {
        out.insert_str(offset, &payload);
    }
    out
}

/// Recover an embedded identity from `text`
///
/// Each contiguous run of zero-width characters is one payload copy;
/// the first run that decodes cleanly wins, so a truncated excerpt
/// still resolves as long as one copy survives intact. A recognizable
/// token pattern inside the decode is returned on its own, stripping
/// any noise from misaligned runs; otherwise the raw decode is
/// returned only when it is wholly printable.
pub fn extract(text: &str) -> Option<String> {
    let mut runs: Vec<Vec<u8>> = Vec::new();
    let mut current: Vec<u8> = Vec::new();

    for c in text.chars() {
        match digit_of(c) {
            Some(digit) => current.push(digit),
            None => {
                if !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }

    runs.iter().find_map(|run| decode_run(run))
}

/// Remove every zero-width marker, leaving only visible content
pub fn strip(text: &str) -> String {
    text.chars().filter(|&c| digit_of(c).is_none()).collect()
}

fn decode_run(digits: &[u8]) -> Option<String> {
    if digits.len() < 4 {
        return None;
    }

    let mut bytes = Vec::with_capacity(digits.len() / 4);
    for chunk in digits.chunks_exact(4) {
        bytes.push(chunk[0] << 6 | chunk[1] << 4 | chunk[2] << 2 | chunk[3]);
    }

    let decoded = String::from_utf8(bytes).ok()?;

    if let Some(token) = find_token(&decoded) {
        return Some(token);
    }

    if !decoded.is_empty() && decoded.chars().all(|c| c.is_ascii_graphic() || c == ' ') {
        Some(decoded)
    } else {
        None
    }
}

/// Match the token pattern (prefix + alphanumeric body) inside a decode
fn find_token(decoded: &str) -> Option<String> {
    let start = decoded.find(TOKEN_PREFIX)?;
    let body = &decoded[start + TOKEN_PREFIX.len()..];
    let body_len: usize = body
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .map(|c| c.len_utf8())
        .sum();
    Some(decoded[start..start + TOKEN_PREFIX.len() + body_len].to_string())
}

fn word_start_offsets(text: &str) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut in_word = false;
    for (idx, c) in text.char_indices() {
        if c.is_whitespace() {
            in_word = false;
        } else if !in_word {
            offsets.push(idx);
            in_word = true;
        }
    }
    offsets
}
