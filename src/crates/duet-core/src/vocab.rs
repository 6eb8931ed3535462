use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sequence::{Token, TokenSequence};

/// Bijection between the distinct tokens of a corpus and `0..len()`.
///
/// Codes follow the lexicographic order of the token strings, so the same
/// multiset of tokens always yields the same mapping whatever the input
/// order. Serialized as the ordered token list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Token>", into = "Vec<Token>")]
pub struct Vocabulary {
    tokens: Vec<Token>,
    codes: HashMap<Token, u32>,
}

impl Vocabulary {
    pub fn build<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<Token> = tokens
            .into_iter()
            .map(|t| t.as_ref().to_string())
            .collect();
        Self::from_sorted(distinct.into_iter().collect())
    }

    fn from_sorted(tokens: Vec<Token>) -> Self {
        let codes = tokens
            .iter()
            .enumerate()
            .map(|(code, token)| (token.clone(), code as u32))
            .collect();
        Self { tokens, codes }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn code(&self, token: &str) -> Option<u32> {
        self.codes.get(token).copied()
    }

    pub fn token(&self, code: u32) -> Option<&str> {
        self.tokens.get(code as usize).map(String::as_str)
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Encode a whole sequence, failing on the first token not in the vocabulary
    pub fn encode(&self, sequence: &TokenSequence) -> Result<Vec<u32>> {
        sequence
            .iter()
            .enumerate()
            .map(|(position, token)| {
                self.code(token)
                    .ok_or_else(|| Error::unknown_token(token.clone(), position))
            })
            .collect()
    }

    pub fn decode(&self, codes: &[u32]) -> Result<TokenSequence> {
        codes
            .iter()
            .map(|&code| {
                self.token(code)
                    .map(str::to_string)
                    .ok_or(Error::UnknownCode {
                        code,
                        size: self.len(),
                    })
            })
            .collect::<Result<Vec<Token>>>()
            .map(TokenSequence::from)
    }
}

impl From<Vec<Token>> for Vocabulary {
    fn from(tokens: Vec<Token>) -> Self {
        Vocabulary::build(tokens)
    }
}

impl From<Vocabulary> for Vec<Token> {
    fn from(vocabulary: Vocabulary) -> Self {
        vocabulary.tokens
    }
}
