use std::fmt::{Display, Formatter};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Exact length of every key code.
pub const KEY_CODE_LENGTH: usize = 6;

/// A voter's single-use credential: exactly six ASCII alphanumeric
/// characters, case-insensitive, stored normalised to uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyCode(String);

impl KeyCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Generate a random key code of uppercase letters.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
        let code = (0..KEY_CODE_LENGTH)
            .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
            .collect();
        Self(code)
    }
}

impl TryFrom<String> for KeyCode {
    type Error = Error;

    /// Validate and normalise a raw key code.
    fn try_from(raw: String) -> Result<Self, Self::Error> {
        if raw.len() != KEY_CODE_LENGTH || !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::validation(format!(
                "Key code must be exactly {KEY_CODE_LENGTH} alphanumeric characters"
            )));
        }
        Ok(Self(raw.to_ascii_uppercase()))
    }
}

impl From<KeyCode> for String {
    fn from(code: KeyCode) -> Self {
        code.0
    }
}

impl Display for KeyCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_and_normalises() {
        let code = KeyCode::try_from("ab12cd".to_string()).unwrap();
        assert_eq!(code.as_str(), "AB12CD");

        // Case-insensitive: both spellings resolve to the same code.
        let upper = KeyCode::try_from("AB12CD".to_string()).unwrap();
        assert_eq!(code, upper);
    }

    #[test]
    fn rejects_bad_codes() {
        assert!(KeyCode::try_from("ABC12".to_string()).is_err()); // too short
        assert!(KeyCode::try_from("ABC1234".to_string()).is_err()); // too long
        assert!(KeyCode::try_from("AB-12D".to_string()).is_err()); // punctuation
        assert!(KeyCode::try_from("AB 12D".to_string()).is_err()); // whitespace
        assert!(KeyCode::try_from("".to_string()).is_err());
    }

    #[test]
    fn random_codes_are_valid() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let code = KeyCode::random(&mut rng);
            assert_eq!(code.as_str().len(), KEY_CODE_LENGTH);
            assert!(code.as_str().chars().all(|c| c.is_ascii_uppercase()));
        }
    }
}
