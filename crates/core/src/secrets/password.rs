//! Master password generation.

use rand::seq::SliceRandom;
use rand::Rng;

pub const PASSWORD_LENGTH: usize = 20;

/// Minimum occurrences of each character class.
const MIN_PER_CLASS: usize = 2;

const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const SPECIAL: &[u8] = b"!@#$%&*";
const DIGITS: &[u8] = b"0123456789";

fn pick<R: Rng + ?Sized>(rng: &mut R, set: &[u8], count: usize, out: &mut Vec<u8>) {
    out.extend((0..count).map(|_| set[rng.gen_range(0..set.len())]));
}

/// Generate a password with at least two special characters, digits,
/// upper and lower case letters.
pub fn generate_password<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut chars = Vec::with_capacity(PASSWORD_LENGTH);
    for set in [SPECIAL, DIGITS, UPPER, LOWER] {
        pick(rng, set, MIN_PER_CLASS, &mut chars);
    }

    let all: Vec<u8> = [LOWER, UPPER, SPECIAL, DIGITS].concat();
    pick(rng, &all, PASSWORD_LENGTH - chars.len(), &mut chars);

    chars.shuffle(rng);
    chars.into_iter().map(char::from).collect()
}
