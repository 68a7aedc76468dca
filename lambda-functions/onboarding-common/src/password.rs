use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{OnboardingError, OnboardingResult};

const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const NUMBERS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!#$%&*+-.:=?^_";

const CHARACTER_CLASSES: [&[u8]; 4] = [UPPERCASE, LOWERCASE, NUMBERS, SYMBOLS];

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Random password of exactly `length` characters with at least one character
/// from each class (upper, lower, digit, symbol).
pub fn generate_password(length: usize) -> OnboardingResult<String> {
    if length < MIN_PASSWORD_LENGTH {
        return Err(OnboardingError::Invalid(format!(
            "Invalid password length. Minimum of {} characters is required.",
            MIN_PASSWORD_LENGTH
        )));
    }

    let mut rng = rand::thread_rng();
    let mut password: Vec<u8> = CHARACTER_CLASSES
        .iter()
        .map(|class| class[rng.gen_range(0..class.len())])
        .collect();

    while password.len() < length {
        let class = CHARACTER_CLASSES[rng.gen_range(0..CHARACTER_CLASSES.len())];
        password.push(class[rng.gen_range(0..class.len())]);
    }
    password.shuffle(&mut rng);

    Ok(password.into_iter().map(char::from).collect())
}
