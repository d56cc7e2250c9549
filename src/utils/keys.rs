use rand::distr::Alphanumeric;
use rand::Rng;

/// Length of generated activation keys
pub const ACTIVATION_KEY_LENGTH: usize = 45;

/// Random ASCII alphanumeric string of `size` characters
pub fn random_string(size: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(size)
        .map(char::from)
        .collect()
}

pub fn random_activation_key() -> String {
    random_string(ACTIVATION_KEY_LENGTH)
}

/// Keys travel in URL paths and must stay alphanumeric
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_alphanumeric())
}
