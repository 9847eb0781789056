use crate::render::SourceProvider;
use crate::FileId;
use std::sync::Arc;

/// A minimal in-memory store of file names and source text.
///
/// `FileId`s are allocated in insertion order starting from zero.
#[derive(Clone, Debug, Default)]
pub struct SimpleFiles {
  files: Vec<(Arc<str>, Arc<str>)>,
}

impl SimpleFiles {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add(&mut self, name: impl Into<Arc<str>>, text: impl Into<Arc<str>>) -> FileId {
    let file = FileId(u32::try_from(self.files.len()).unwrap_or(u32::MAX));
    self.files.push((name.into(), text.into()));
    file
  }

  pub fn len(&self) -> usize {
    self.files.len()
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }
}

impl SourceProvider for SimpleFiles {
  fn file_name(&self, file: FileId) -> Option<&str> {
    self.files.get(file.0 as usize).map(|(name, _)| name.as_ref())
  }

  fn file_text(&self, file: FileId) -> Option<&str> {
    self.files.get(file.0 as usize).map(|(_, text)| text.as_ref())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::render::render_diagnostic;
  use crate::{Diagnostic, Label, Span, TextRange};

  #[test]
  fn allocates_ids_and_renders_multiple_files() {
    let mut files = SimpleFiles::new();
    let first = files.add("a.wgsl", "const a = 1;");
    let second = files.add("b.wgsl", "const b = 2;");
    assert_ne!(first, second);
    assert_eq!(files.len(), 2);

    let diagnostic = Diagnostic::error("TEST0004", "primary", Span::new(second, TextRange::new(6, 7)))
      .with_label(Label::secondary(Span::new(first, TextRange::new(6, 7)), "secondary"));

    let rendered = render_diagnostic(&files, &diagnostic);
    let b = rendered.find("--> b.wgsl:1:7").unwrap();
    let a = rendered.find("--> a.wgsl:1:7").unwrap();
    assert!(b < a);
  }

  #[test]
  fn missing_file_is_reported() {
    let files = SimpleFiles::new();
    let diagnostic = Diagnostic::error("TEST0005", "gone", Span::new(FileId(3), TextRange::new(0, 1)));
    let rendered = render_diagnostic(&files, &diagnostic);
    assert!(rendered.contains("<unknown file>:?:?"));
    assert!(rendered.contains("(source unavailable)"));
  }
}
