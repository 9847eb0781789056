use diagnostics::files::SimpleFiles;
use diagnostics::render::render_diagnostic;
use diagnostics::Diagnostic;
use diagnostics::FileId;
use parse_shader::error::SyntaxErrorType;
use parse_shader::loc::Loc;
use parse_shader::tree::SyntaxKind;
use std::error::Error;
use std::fmt;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;

/// Diagnostic codes (prefix `SY`):
/// - `SY0001`: [`StructuralErrorType::MissingChild`]
/// - `SY0002`: [`StructuralErrorType::ErrorNode`]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StructuralErrorType {
  MissingChild {
    parent: SyntaxKind,
    expected: &'static str,
  },
  // Carries the parser's own classification when one was recorded for the node.
  ErrorNode(Option<SyntaxErrorType>),
}

impl StructuralErrorType {
  pub fn code(&self) -> &'static str {
    match self {
      StructuralErrorType::MissingChild { .. } => "SY0001",
      StructuralErrorType::ErrorNode(_) => "SY0002",
    }
  }

  pub fn message(&self) -> String {
    match self {
      StructuralErrorType::MissingChild { parent, expected } => {
        format!("{:?} is missing its {}", parent, expected)
      }
      StructuralErrorType::ErrorNode(Some(typ)) => format!("syntax error: {}", typ.message()),
      StructuralErrorType::ErrorNode(None) => "syntax error".to_string(),
    }
  }
}

/// A unit whose tree cannot be turned into a symbol table.
///
/// The rendered excerpt is captured at construction so the error stays useful after the source is
/// gone.
#[derive(Clone)]
pub struct StructuralError {
  pub typ: StructuralErrorType,
  pub loc: Loc,
  pub name: Option<String>,
  pub excerpt: String,
}

impl StructuralError {
  pub fn new(typ: StructuralErrorType, loc: Loc, source: &str, name: Option<&str>) -> StructuralError {
    let mut files = SimpleFiles::new();
    let file = files.add(name.unwrap_or("<shader>"), source);
    let excerpt = render_diagnostic(&files, &Self::diagnostic(typ, loc, file));
    StructuralError {
      typ,
      loc,
      name: name.map(|n| n.to_string()),
      excerpt,
    }
  }

  fn diagnostic(typ: StructuralErrorType, loc: Loc, file: FileId) -> Diagnostic {
    Diagnostic::error(typ.code(), typ.message(), loc.to_span(file))
  }

  pub fn to_diagnostic(&self, file: FileId) -> Diagnostic {
    let diagnostic = Self::diagnostic(self.typ, self.loc, file);
    match &self.name {
      Some(name) => diagnostic.with_note(format!("in module '{}'", name)),
      None => diagnostic,
    }
  }
}

impl Debug for StructuralError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "{} around loc [{}:{}]", self.typ.message(), self.loc.0, self.loc.1)
  }
}

impl Display for StructuralError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match &self.name {
      Some(name) => write!(f, "error parsing '{}': {}", name, self.typ.message())?,
      None => write!(f, "error parsing: {}", self.typ.message())?,
    };
    write!(f, "\n{}", self.excerpt)
  }
}

impl Error for StructuralError {}
