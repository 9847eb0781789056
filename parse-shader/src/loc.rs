use crate::error::SyntaxError;
use crate::error::SyntaxErrorType;
use crate::token::TT;
use diagnostics::FileId;
use diagnostics::Span;
use diagnostics::TextRange;
use serde::Deserialize;
use serde::Serialize;
use std::cmp::max;
use std::cmp::min;
use std::ops::Add;
use std::ops::AddAssign;

/// A location within a shader source file expressed as UTF-8 byte offsets.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Loc(pub usize, pub usize);

impl Loc {
  pub fn at(offset: usize) -> Loc {
    Loc(offset, offset)
  }

  pub fn error(self, typ: SyntaxErrorType, found: Option<TT>) -> SyntaxError {
    SyntaxError::new(typ, self, found)
  }

  pub fn is_empty(&self) -> bool {
    self.0 >= self.1
  }

  pub fn len(&self) -> usize {
    self.1.saturating_sub(self.0)
  }

  pub fn extend(&mut self, other: Loc) {
    self.0 = min(self.0, other.0);
    self.1 = max(self.1, other.1);
  }

  pub fn contains(&self, other: Loc) -> bool {
    self.0 <= other.0 && other.1 <= self.1
  }

  /// Converts this `Loc` into a diagnostics range, saturating to `u32`.
  pub fn to_range(&self) -> TextRange {
    TextRange::from_offsets(self.0, self.1)
  }

  pub fn to_span(&self, file: FileId) -> Span {
    Span::new(file, self.to_range())
  }
}

impl Add for Loc {
  type Output = Loc;

  fn add(self, rhs: Self) -> Self::Output {
    let mut new = self;
    new.extend(rhs);
    new
  }
}

impl AddAssign for Loc {
  fn add_assign(&mut self, rhs: Self) {
    self.extend(rhs);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extends_to_cover_both() {
    assert_eq!(Loc(4, 6) + Loc(1, 2), Loc(1, 6));
    let mut loc = Loc(3, 3);
    loc += Loc(3, 9);
    assert_eq!(loc, Loc(3, 9));
    assert!(loc.contains(Loc(4, 5)));
    assert!(Loc::at(2).is_empty());
  }

  #[test]
  fn converts_to_diagnostics_span() {
    let span = Loc(2, 4).to_span(FileId(7));
    assert_eq!(span.file, FileId(7));
    assert_eq!(span.range, TextRange::new(2, 4));
  }
}
