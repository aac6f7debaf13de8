use thiserror::Error;

pub type MarkupResult<T> = Result<T, MarkupError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarkupError {
    #[error("Unexpected closing tag </{name}> at {pos}")]
    UnexpectedClosingTag { pos: usize, name: String },

    #[error("Unclosed tag <{name}>")]
    UnclosedTag { name: String },

    #[error("Invalid tag at {pos}: {message}")]
    InvalidTag { pos: usize, message: String },
}

impl MarkupError {
    pub fn unexpected_closing_tag(pos: usize, name: impl Into<String>) -> Self {
        Self::UnexpectedClosingTag {
            pos,
            name: name.into(),
        }
    }

    pub fn invalid_tag(pos: usize, message: impl Into<String>) -> Self {
        Self::InvalidTag {
            pos,
            message: message.into(),
        }
    }
}
