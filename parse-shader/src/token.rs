use crate::error::SyntaxError;
use crate::error::SyntaxErrorType;
use crate::loc::Loc;
use ahash::HashSet;
use ahash::HashSetExt;
use once_cell::sync::Lazy;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TT {
  Arrow,
  At,
  Backslash,
  BraceClose,
  BraceOpen,
  BracketClose,
  BracketOpen,
  ChevronLeft,
  ChevronRight,
  Colon,
  ColonColon,
  Comma,
  Dot,
  EOF,
  Equals,
  Hash,
  Identifier,
  // Special token used to represent invalid input, such as an unterminated string.
  Invalid,
  LiteralNumber,
  LiteralString,
  Operator,
  ParenthesisClose,
  ParenthesisOpen,
  Semicolon,
}

#[derive(Clone, Debug)]
pub struct Token {
  pub loc: Loc,
  // A newline sits between the previous token and this one. GLSL directives end at it.
  pub preceded_by_line_terminator: bool,
  pub typ: TT,
}

impl Token {
  pub fn error(&self, typ: SyntaxErrorType) -> SyntaxError {
    self.loc.error(typ, Some(self.typ))
  }
}

fn word_set(words: &[&'static str]) -> HashSet<&'static str> {
  let mut set = HashSet::with_capacity(words.len());
  set.extend(words.iter().copied());
  set
}

// Words inside WGSL bodies that never name a declaration.
pub static WGSL_BODY_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
  word_set(&[
    "alias", "break", "case", "const", "const_assert", "continue", "continuing", "default",
    "discard", "else", "false", "fn", "for", "if", "let", "loop", "override", "return", "struct",
    "switch", "true", "var", "while",
  ])
});

// Words inside GLSL bodies that never name a declaration.
pub static GLSL_BODY_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
  word_set(&[
    "break", "buffer", "case", "centroid", "coherent", "const", "continue", "default", "discard",
    "do", "else", "false", "flat", "for", "highp", "if", "in", "inout", "invariant", "layout",
    "lowp", "mediump", "noperspective", "out", "patch", "precise", "precision", "readonly",
    "restrict", "return", "sample", "shared", "smooth", "struct", "switch", "true", "uniform",
    "volatile", "while", "writeonly",
  ])
});

// Storage, interpolation and precision qualifiers that may lead a GLSL declaration.
pub static GLSL_QUALIFIERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
  word_set(&[
    "attribute", "buffer", "centroid", "coherent", "const", "flat", "highp", "in", "inout",
    "invariant", "lowp", "mediump", "noperspective", "out", "patch", "precise", "readonly",
    "restrict", "sample", "shared", "smooth", "uniform", "varying", "volatile", "writeonly",
  ])
});
