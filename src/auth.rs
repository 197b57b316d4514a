use std::fmt;

/// A GitHub access token.
///
/// Kept out of `Debug` output so it never ends up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.trim().to_string())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_redacted_in_debug() {
        let token = Token::from("ghp_secret");
        assert_eq!(format!("{token:?}"), "Token(***)");
        assert_eq!(token.as_str(), "ghp_secret");
    }

    #[test]
    fn test_token_is_trimmed() {
        assert_eq!(Token::from(" ghp_secret\n").as_str(), "ghp_secret");
    }
}
