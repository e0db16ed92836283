// ============================
// crates/backend-lib/src/auth/confirmation.rs
// ============================
//! Confirmation code generation.
use super::token_generator::generate_readable;
use thiserror::Error;

/// Default starting length of a confirmation code
pub const DEFAULT_MIN_CODE_LENGTH: usize = 20;

/// Codes longer than this mean the uniqueness oracle is broken
pub const MAX_CODE_LENGTH: usize = 100;

/// Every candidate up to [`MAX_CODE_LENGTH`] was reported as in use
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no unique confirmation code found up to length {MAX_CODE_LENGTH}")]
pub struct ExhaustedAttempts;

/// Produces confirmation codes that are unique against a caller supplied oracle
#[derive(Debug, Clone)]
pub struct ConfirmationCodeGenerator {
    min_length: usize,
}

impl Default for ConfirmationCodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CODE_LENGTH)
    }
}

impl ConfirmationCodeGenerator {
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Generate a code for which `is_in_use` returns false.
    /// Every collision makes the next candidate one character longer.
    pub fn generate<F>(&self, mut is_in_use: F) -> Result<String, ExhaustedAttempts>
    where
        F: FnMut(&str) -> bool,
    {
        let mut length = self.min_length;
        while length <= MAX_CODE_LENGTH {
            let code = generate_readable(length);
            if !is_in_use(&code) {
                return Ok(code);
            }
            length += 1;
        }
        Err(ExhaustedAttempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_first_candidate_is_used_when_free() {
        let code = ConfirmationCodeGenerator::default().generate(|_| false).unwrap();
        assert_eq!(code.len(), DEFAULT_MIN_CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_collisions_grow_the_code() {
        let mut seen = HashSet::new();
        let mut calls = 0;
        let code = ConfirmationCodeGenerator::new(5)
            .generate(|c| {
                calls += 1;
                seen.insert(c.to_string());
                calls <= 3
            })
            .unwrap();

        assert_eq!(code.len(), 8);
        assert!(seen.contains(&code));
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_never_returns_a_code_in_use() {
        let taken: HashSet<String> = (0..50).map(|_| generate_readable(1)).collect();
        let code = ConfirmationCodeGenerator::new(1)
            .generate(|c| taken.contains(c))
            .unwrap();
        assert!(!taken.contains(&code));
    }

    #[test]
    fn test_always_in_use_is_exhausted() {
        let mut longest = 0;
        let result = ConfirmationCodeGenerator::default().generate(|c| {
            longest = longest.max(c.len());
            true
        });

        assert_eq!(result, Err(ExhaustedAttempts));
        assert_eq!(longest, MAX_CODE_LENGTH);
    }

    #[test]
    fn test_min_length_above_ceiling() {
        let result = ConfirmationCodeGenerator::new(MAX_CODE_LENGTH + 1).generate(|_| false);
        assert_eq!(result, Err(ExhaustedAttempts));
    }
}
