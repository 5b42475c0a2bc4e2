use std::fmt;
use std::io;

/// The token the decoder was in the middle of when the bits ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
  /// Inside a run of ones, waiting for the terminating zero.
  Variable,
  /// After a leading zero, waiting for the bit selecting lambda or call.
  Prefix,
  /// After `00`, waiting for the abstraction body.
  Lambda,
  /// After `01` or after the function term, waiting for an operand.
  Call,
}

/// Premature end of a bit stream strictly inside a term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
  pub token: Token,
  /// Bits consumed by this read before the stream ended.
  pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
  Decode(DecodeError),
  /// Only VAR, LAMBDA and CALL have a BLC encoding.
  Unencodable(&'static str),
  Io(String),
}

impl fmt::Display for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Token::Variable => write!(f, "variable"),
      Token::Prefix => write!(f, "lambda or call prefix"),
      Token::Lambda => write!(f, "lambda body"),
      Token::Call => write!(f, "call operand"),
    }
  }
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Error::Decode(e) => write!(f, "Decode error: end of input inside {} after {} bits", e.token, e.offset),
      Error::Unencodable(kind) => write!(f, "Encode error: {} has no BLC encoding", kind),
      Error::Io(msg) => write!(f, "I/O error: {}", msg),
    }
  }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
  fn from(e: io::Error) -> Self {
    Error::Io(e.to_string())
  }
}

impl From<DecodeError> for Error {
  fn from(e: DecodeError) -> Self {
    Error::Decode(e)
  }
}

pub type BlcResult<T> = Result<T, Error>;
