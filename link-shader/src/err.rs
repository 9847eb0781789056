use diagnostics::Diagnostic;
use diagnostics::FileId;
use diagnostics::Span;
use diagnostics::TextRange;
use std::error::Error;
use std::fmt;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use symbol_shader::error::StructuralError;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CodecMismatchKind {
  UnknownOp(u8),
  OutOfBounds,
  NotCharBoundary,
  MissingArgument,
  StrayArgument,
}

/// A compact stream that does not fit the source it is replayed against.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CodecMismatchError {
  pub kind: CodecMismatchKind,
  /// Index of the offending node in the stream.
  pub index: usize,
}

impl Display for CodecMismatchError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    let what = match self.kind {
      CodecMismatchKind::UnknownOp(op) => format!("unknown op {}", op),
      CodecMismatchKind::OutOfBounds => "span out of bounds".to_string(),
      CodecMismatchKind::NotCharBoundary => "span not on a character boundary".to_string(),
      CodecMismatchKind::MissingArgument => "missing argument".to_string(),
      CodecMismatchKind::StrayArgument => "unexpected argument".to_string(),
    };
    write!(f, "compact stream node {}: {}", self.index, what)
  }
}

impl Error for CodecMismatchError {}

/// Diagnostic codes (prefix `LK`):
/// - `LK0001`: [`LinkError::UnresolvedImport`]
/// - `LK0002`: [`LinkError::UnresolvedLink`]
/// - `LK0003`: [`LinkError::CodecMismatch`]
/// - `LK0004`: [`LinkError::Serialization`]
///
/// Structural errors keep their own `SY` code.
#[derive(Clone)]
pub enum LinkError {
  Structural(StructuralError),
  UnresolvedImport { module: String, importer: String },
  UnresolvedLink { name: String, importer: String },
  CodecMismatch(CodecMismatchError),
  Serialization(String),
}

impl LinkError {
  pub fn code(&self) -> &'static str {
    match self {
      LinkError::Structural(err) => err.typ.code(),
      LinkError::UnresolvedImport { .. } => "LK0001",
      LinkError::UnresolvedLink { .. } => "LK0002",
      LinkError::CodecMismatch(_) => "LK0003",
      LinkError::Serialization(_) => "LK0004",
    }
  }

  pub fn message(&self) -> String {
    match self {
      LinkError::Structural(err) => err.typ.message(),
      LinkError::UnresolvedImport { module, importer } => {
        format!("Module '{}' in '{}' is unknown", module, importer)
      }
      LinkError::UnresolvedLink { name, importer } => {
        format!("Link '{}' in '{}' is not linked", name, importer)
      }
      LinkError::CodecMismatch(err) => err.to_string(),
      LinkError::Serialization(msg) => format!("invalid compiled module: {}", msg),
    }
  }

  /// Errors without a location in `file` point at its start.
  pub fn to_diagnostic(&self, file: FileId) -> Diagnostic {
    match self {
      LinkError::Structural(err) => err.to_diagnostic(file),
      _ => Diagnostic::error(
        self.code(),
        self.message(),
        Span::new(file, TextRange::new(0, 0)),
      ),
    }
  }
}

impl Debug for LinkError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.code(), self.message())
  }
}

impl Display for LinkError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      LinkError::Structural(err) => Display::fmt(err, f),
      _ => f.write_str(&self.message()),
    }
  }
}

impl Error for LinkError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    match self {
      LinkError::Structural(err) => Some(err),
      LinkError::CodecMismatch(err) => Some(err),
      _ => None,
    }
  }
}

impl From<StructuralError> for LinkError {
  fn from(err: StructuralError) -> Self {
    LinkError::Structural(err)
  }
}

impl From<CodecMismatchError> for LinkError {
  fn from(err: CodecMismatchError) -> Self {
    LinkError::CodecMismatch(err)
  }
}

impl From<serde_json::Error> for LinkError {
  fn from(err: serde_json::Error) -> Self {
    LinkError::Serialization(err.to_string())
  }
}
