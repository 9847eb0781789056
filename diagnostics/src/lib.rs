//! Shared diagnostics model and rendering utilities.
//!
//! Parsing, extraction and linking all report problems as [`Diagnostic`]s so
//! the CLI can render them uniformly against the shader source they refer to.
//!
//! ```
//! use diagnostics::files::SimpleFiles;
//! use diagnostics::render::render_diagnostic;
//! use diagnostics::{Diagnostic, Span, TextRange};
//!
//! let mut files = SimpleFiles::new();
//! let file = files.add("main.wgsl", "fn main() { foo(); }");
//! let diag = Diagnostic::error(
//!   "TEST0001",
//!   "unknown function",
//!   Span::new(file, TextRange::new(12, 15)),
//! );
//!
//! let rendered = render_diagnostic(&files, &diag);
//! assert!(rendered.contains("TEST0001"));
//! assert!(rendered.contains("--> main.wgsl:1:13"));
//! ```

pub mod files;
pub mod render;

use std::fmt::Display;
use std::fmt::Formatter;

/// A stable identifier for a source file known to a [`render::SourceProvider`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct FileId(pub u32);

/// A byte range in a file.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TextRange {
  pub start: u32,
  pub end: u32,
}

impl TextRange {
  pub const fn new(start: u32, end: u32) -> Self {
    Self { start, end }
  }

  /// Builds a range from `usize` byte offsets, saturating to `u32::MAX`.
  pub fn from_offsets(start: usize, end: usize) -> Self {
    Self {
      start: saturating_to_u32(start),
      end: saturating_to_u32(end),
    }
  }

  pub fn len(&self) -> u32 {
    self.end.saturating_sub(self.start)
  }

  pub fn is_empty(&self) -> bool {
    self.start >= self.end
  }
}

/// A span across a specific file.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Span {
  pub file: FileId,
  pub range: TextRange,
}

impl Span {
  pub const fn new(file: FileId, range: TextRange) -> Self {
    Self { file, range }
  }
}

/// Diagnostic severity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Severity {
  Error,
  Warning,
  Note,
}

impl Severity {
  pub const fn as_str(&self) -> &'static str {
    match self {
      Severity::Error => "error",
      Severity::Warning => "warning",
      Severity::Note => "note",
    }
  }
}

impl Display for Severity {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A label attached to a diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Label {
  pub span: Span,
  pub message: String,
  pub is_primary: bool,
}

impl Label {
  pub fn primary(span: Span, message: impl Into<String>) -> Self {
    Self {
      span,
      message: message.into(),
      is_primary: true,
    }
  }

  pub fn secondary(span: Span, message: impl Into<String>) -> Self {
    Self {
      span,
      message: message.into(),
      is_primary: false,
    }
  }
}

/// A user-facing diagnostic with optional labels and notes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
  pub code: &'static str,
  pub severity: Severity,
  pub message: String,
  pub primary: Span,
  pub labels: Vec<Label>,
  pub notes: Vec<String>,
}

impl Diagnostic {
  pub fn new(
    severity: Severity,
    code: &'static str,
    message: impl Into<String>,
    primary: Span,
  ) -> Self {
    Self {
      code,
      severity,
      message: message.into(),
      primary,
      labels: Vec::new(),
      notes: Vec::new(),
    }
  }

  pub fn error(code: &'static str, message: impl Into<String>, primary: Span) -> Self {
    Self::new(Severity::Error, code, message, primary)
  }

  pub fn warning(code: &'static str, message: impl Into<String>, primary: Span) -> Self {
    Self::new(Severity::Warning, code, message, primary)
  }

  pub fn with_label(mut self, label: Label) -> Self {
    self.labels.push(label);
    self
  }

  pub fn with_note(mut self, note: impl Into<String>) -> Self {
    self.notes.push(note.into());
    self
  }
}

/// Diagnostic for failures outside of any source text, e.g. file I/O in the CLI.
pub fn host_error(span: Option<Span>, message: impl Into<String>) -> Diagnostic {
  let span = span.unwrap_or(Span::new(FileId(0), TextRange::new(0, 0)));
  Diagnostic::error("HOST0001", message, span)
}

fn saturating_to_u32(value: usize) -> u32 {
  u32::try_from(value).unwrap_or(u32::MAX)
}
