//! Random code material for human-presentable single-use codes.

use rand::Rng;

/// Uppercase letters and digits.
const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates `len` random uppercase alphanumeric characters.
pub fn random_code_body(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| {
            let idx = rng.gen_range(0..CODE_CHARS.len());
            CODE_CHARS[idx] as char
        })
        .collect()
}
