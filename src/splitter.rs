use crate::error::StatsError;

pub type Tokens<'a> = Box<dyn Iterator<Item = &'a str> + 'a>;

/// Breaks a message into tokens for the worker pool.
///
/// Tokens are yielded lazily. An error means the message could not be
/// tokenized at all; workers then report a zero count for it.
pub trait Tokenizer: Send + Sync {
    fn tokens<'a>(&self, line: &'a str) -> Result<Tokens<'a>, StatsError>;
}

/// Whitespace tokenizer. No cleaning is applied to the tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct Splitter;

impl Splitter {
    pub fn new() -> Self {
        Splitter
    }

    pub fn split<'a>(&self, line: &'a str) -> std::str::SplitWhitespace<'a> {
        line.split_whitespace()
    }
}

impl Tokenizer for Splitter {
    fn tokens<'a>(&self, line: &'a str) -> Result<Tokens<'a>, StatsError> {
        Ok(Box::new(self.split(line)))
    }
}
