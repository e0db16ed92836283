// ============================
// crates/backend-lib/src/auth/token_generator.rs
// ============================
/** Random printable string generation.
Used for the process-held cookie secret and for confirmation codes.
Characters are drawn from `[A-Za-z0-9]` so the output is safe in cookies,
URLs and e-mail bodies without any escaping. */
use rand::{distr::Alphanumeric, Rng};

/// Length of a generated server secret
pub const SECRET_LENGTH: usize = 32;

/** Generate a random, cookie and human friendly string of the given length.
The thread RNG is a CSPRNG seeded from the OS, so no explicit seeding step
is needed (or possible) before use. */
pub fn generate_readable(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Generate a fresh server secret
pub fn generate_secret() -> String {
    generate_readable(SECRET_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readable_generation() {
        let a = generate_readable(20);
        let b = generate_readable(20);

        assert_eq!(a.len(), 20);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));

        assert_eq!(generate_readable(0), "");
        assert_eq!(generate_secret().len(), SECRET_LENGTH);
    }
}
