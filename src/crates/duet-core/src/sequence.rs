use std::ops::Index;

use serde::{Deserialize, Serialize};

/// Canonical string form of an event: a pitch name, dot-joined pitch
/// classes, or "Rest"
pub type Token = String;

/// Ordered tokens for one instrument role, one token per time unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSequence {
    tokens: Vec<Token>,
}

impl TokenSequence {
    pub fn new() -> Self {
        Self { tokens: Vec::new() }
    }

    pub fn push(&mut self, token: impl Into<Token>) {
        self.tokens.push(token.into());
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Drop everything after the first `len` tokens
    pub fn truncate(&mut self, len: usize) {
        self.tokens.truncate(len);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }

    /// Append another sequence, consuming it
    pub fn concat(mut self, other: TokenSequence) -> Self {
        self.tokens.extend(other.tokens);
        self
    }
}

impl From<Vec<Token>> for TokenSequence {
    fn from(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }
}

impl<'a> From<&[&'a str]> for TokenSequence {
    fn from(tokens: &[&'a str]) -> Self {
        tokens.iter().map(|t| t.to_string()).collect()
    }
}

impl FromIterator<Token> for TokenSequence {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}

impl Extend<Token> for TokenSequence {
    fn extend<I: IntoIterator<Item = Token>>(&mut self, iter: I) {
        self.tokens.extend(iter);
    }
}

impl Index<usize> for TokenSequence {
    type Output = Token;

    fn index(&self, index: usize) -> &Self::Output {
        &self.tokens[index]
    }
}

impl<'a> IntoIterator for &'a TokenSequence {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

impl IntoIterator for TokenSequence {
    type Item = Token;
    type IntoIter = std::vec::IntoIter<Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_keeps_order() {
        let a = TokenSequence::from(&["C4", "Rest"][..]);
        let b = TokenSequence::from(&["0.4.7"][..]);
        let joined = a.concat(b);
        assert_eq!(joined.as_slice(), ["C4", "Rest", "0.4.7"]);
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let sequence = TokenSequence::from(&["C4", "Rest"][..]);
        let json = serde_json::to_string(&sequence).unwrap();
        assert_eq!(json, r#"["C4","Rest"]"#);

        let back: TokenSequence = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sequence);
    }
}
