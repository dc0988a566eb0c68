//! Lossy grid-reference codec
//!
//! A grid reference is a short human-readable label for a world cell: a
//! letter for the x cell (cycling the alphabet with wraparound) and a number
//! for the z cell (biased to be non-negative inside the play area). The
//! encoding aliases once the world extends past 26 cells on x; callers must
//! not rely on injectivity beyond the expected play area.

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Bias added to the z cell so labels inside the play area carry a
/// non-negative number.
const NUMBER_BIAS: i32 = 50;

/// Encode a world point as a grid reference like `C47`
pub fn encode(cell_size: f32, x: f32, z: f32) -> String {
    let cx = (x / cell_size).floor() as i32;
    let cz = (z / cell_size).floor() as i32;
    let letter = ALPHABET[cx.rem_euclid(ALPHABET.len() as i32) as usize] as char;
    format!("{}{}", letter, cz + NUMBER_BIAS)
}

/// Decode a grid reference back to the cell's center point
///
/// Inverse of [`encode`] within the supported extent (x cells 0..26).
pub fn decode(cell_size: f32, gridref: &str) -> Option<(f32, f32)> {
    let trimmed = gridref.trim().to_uppercase();
    let mut chars = trimmed.chars();
    let letter = chars.next()?;
    let cx = ALPHABET.iter().position(|&c| c as char == letter)? as i32;
    let cz = chars.as_str().parse::<i32>().ok()? - NUMBER_BIAS;
    Some((
        (cx as f32 + 0.5) * cell_size,
        (cz as f32 + 0.5) * cell_size,
    ))
}
