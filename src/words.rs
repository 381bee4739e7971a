//! Event id and pin generation.
//!
//! Ids are three random dictionary words joined by `-` (e.g. `chop-coach-blimp`).
//! Generation is not collision-free; the store detects collisions on insert.

use rand::{Rng, seq::SliceRandom};
use std::path::Path;

use crate::error::AppError;

const BUILTIN_WORDS: &str = include_str!("../wordlist.txt");
const WORDS_PER_ID: usize = 3;
const ID_SEPARATOR: &str = "-";

#[derive(Debug, Clone)]
pub struct Wordlist {
    words: Vec<String>,
}

impl Wordlist {
    pub fn builtin() -> Self {
        Self::parse(BUILTIN_WORDS)
    }

    /// Loads a newline-separated list, rejecting one with no words in it.
    pub async fn from_file(path: &Path) -> Result<Self, AppError> {
        let contents = tokio::fs::read_to_string(path).await?;
        let words = Self::parse(&contents);
        if words.is_empty() {
            return Err(AppError::Generation(format!(
                "word list {} contains no words",
                path.display()
            )));
        }
        Ok(words)
    }

    pub fn parse(contents: &str) -> Self {
        let words = contents
            .lines()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        Self { words }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn event_id(&self) -> Result<String, AppError> {
        let mut rng = rand::thread_rng();
        let picked = (0..WORDS_PER_ID)
            .map(|_| {
                self.words
                    .choose(&mut rng)
                    .map(String::as_str)
                    .ok_or_else(|| AppError::Generation("word list is empty".to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(picked.join(ID_SEPARATOR))
    }
}

/// Four digits, never starting with zero.
pub fn generate_pin() -> String {
    rand::thread_rng().gen_range(1000..=9999).to_string()
}
