use std::fmt;

/// A source position (1-based line and column).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

impl Span {
    pub fn point(line: usize, col: usize) -> Self {
        Span { line, col }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum FnError {
    #[error("parse error at {span}: {message}")]
    Reader { message: String, span: Span },

    /// Input ended in the middle of a form. Kept separate from `Reader` so
    /// an interactive caller can keep accumulating lines.
    #[error("unexpected end of input at {span}")]
    UnexpectedEof { span: Span },

    #[error("eval error: {0}")]
    Eval(String),

    #[error("type error: expected {expected}, got {got}")]
    Type { expected: String, got: String },

    #[error("arity error: {name} expects {expected} args, got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },

    #[error("undefined symbol: {0}")]
    Unbound(String),

    #[error("{0}")]
    User(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("closed channel")]
    ChannelClosed,

    #[error("stream is closed")]
    StreamClosed,
}

impl FnError {
    pub fn eval(msg: impl Into<String>) -> Self {
        FnError::Eval(msg.into())
    }

    pub fn type_error(expected: impl Into<String>, got: impl Into<String>) -> Self {
        FnError::Type {
            expected: expected.into(),
            got: got.into(),
        }
    }

    pub fn arity(name: impl Into<String>, expected: impl Into<String>, got: usize) -> Self {
        FnError::Arity {
            name: name.into(),
            expected: expected.into(),
            got,
        }
    }

    pub fn user(msg: impl Into<String>) -> Self {
        FnError::User(msg.into())
    }

    /// True for errors that mean "the reader wants more input".
    pub fn is_unexpected_eof(&self) -> bool {
        matches!(self, FnError::UnexpectedEof { .. })
    }
}
