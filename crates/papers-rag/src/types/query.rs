//! Query types

use crate::error::{Error, Result};

use super::document::Embedding;

/// A question together with its transient embedding
#[derive(Debug, Clone)]
pub struct Query {
    /// The question as asked, trimmed
    pub text: String,
    /// Embedding of `text`; never persisted
    pub embedding: Embedding,
}

impl Query {
    pub fn new(text: impl Into<String>, embedding: Embedding) -> Self {
        Self {
            text: text.into(),
            embedding,
        }
    }
}

/// Trim a question, rejecting empty input
pub fn normalize_question(question: &str) -> Result<&str> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidQuestion);
    }
    Ok(trimmed)
}
