use crate::loc::Loc;
use crate::token::TT;
use core::fmt;
use core::fmt::Debug;
use core::fmt::Formatter;
use diagnostics::Diagnostic;
use diagnostics::FileId;
use std::error::Error;
use std::fmt::Display;

/// Why a top-level item could not be parsed.
///
/// Codes:
/// - `PS0001`: [`SyntaxErrorType::ExpectedSyntax`]
/// - `PS0002`: [`SyntaxErrorType::RequiredTokenNotFound`]
/// - `PS0003`: [`SyntaxErrorType::UnexpectedEnd`]
/// - `PS0004`: [`SyntaxErrorType::UnterminatedComment`]
/// - `PS0005`: [`SyntaxErrorType::UnterminatedString`]
/// - `PS0006`: [`SyntaxErrorType::InvalidCharacter`]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SyntaxErrorType {
  ExpectedSyntax(&'static str),
  RequiredTokenNotFound(TT),
  UnexpectedEnd,
  UnterminatedComment,
  UnterminatedString,
  InvalidCharacter,
}

/// Recorded on the tree next to the error node that replaced the item.
#[derive(Clone, PartialEq, Eq)]
pub struct SyntaxError {
  pub typ: SyntaxErrorType,
  pub loc: Loc,
  pub found: Option<TT>,
}

impl SyntaxError {
  pub fn new(typ: SyntaxErrorType, loc: Loc, found: Option<TT>) -> SyntaxError {
    SyntaxError {
      typ,
      loc,
      found,
    }
  }

  pub fn to_diagnostic(&self, file: FileId) -> Diagnostic {
    let diagnostic = Diagnostic::error(self.typ.code(), self.typ.message(), self.loc.to_span(file));
    match self.found {
      Some(found) => diagnostic.with_note(format!("found token: {:?}", found)),
      None => diagnostic,
    }
  }
}

impl Debug for SyntaxError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "{} at {}..{}", self.typ.message(), self.loc.0, self.loc.1)
  }
}

impl Display for SyntaxError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self.found {
      Some(found) => write!(f, "{} (found {:?})", self.typ.message(), found),
      None => f.write_str(&self.typ.message()),
    }
  }
}

impl Error for SyntaxError {}

pub type SyntaxResult<T> = Result<T, SyntaxError>;

impl SyntaxErrorType {
  pub fn code(&self) -> &'static str {
    match self {
      SyntaxErrorType::ExpectedSyntax(_) => "PS0001",
      SyntaxErrorType::RequiredTokenNotFound(_) => "PS0002",
      SyntaxErrorType::UnexpectedEnd => "PS0003",
      SyntaxErrorType::UnterminatedComment => "PS0004",
      SyntaxErrorType::UnterminatedString => "PS0005",
      SyntaxErrorType::InvalidCharacter => "PS0006",
    }
  }

  pub fn message(&self) -> String {
    match self {
      SyntaxErrorType::ExpectedSyntax(what) => format!("expected {what}"),
      SyntaxErrorType::RequiredTokenNotFound(tt) => format!("expected token {tt:?}"),
      SyntaxErrorType::UnexpectedEnd => "unexpected end of input".into(),
      SyntaxErrorType::UnterminatedComment => "unterminated block comment".into(),
      SyntaxErrorType::UnterminatedString => "unterminated string literal".into(),
      SyntaxErrorType::InvalidCharacter => "invalid character".into(),
    }
  }
}
