use crate::Diagnostic;
use crate::FileId;
use crate::Label;
use crate::TextRange;
use std::collections::BTreeMap;
use std::fmt::Write;

const TAB_WIDTH: usize = 2;

/// Provides access to source text for rendering diagnostics.
pub trait SourceProvider {
  fn file_name(&self, file: FileId) -> Option<&str>;
  fn file_text(&self, file: FileId) -> Option<&str>;
}

struct LineHighlight<'a> {
  start_col: usize,
  len: usize,
  marker: char,
  message: Option<&'a str>,
}

/// Render a diagnostic into a human-readable string with caret highlighting.
pub fn render_diagnostic(provider: &dyn SourceProvider, diagnostic: &Diagnostic) -> String {
  let mut output = String::new();
  let _ = writeln!(
    output,
    "{}[{}]: {}",
    diagnostic.severity, diagnostic.code, diagnostic.message
  );

  let mut labels = Vec::with_capacity(diagnostic.labels.len() + 1);
  labels.push(Label::primary(diagnostic.primary, diagnostic.message.clone()));
  labels.extend(diagnostic.labels.iter().cloned());

  // Group by file, primary file first, otherwise in order of appearance.
  let mut files: Vec<(FileId, Vec<&Label>)> = Vec::new();
  for label in &labels {
    match files.iter_mut().find(|(file, _)| *file == label.span.file) {
      Some((_, group)) => group.push(label),
      None => files.push((label.span.file, vec![label])),
    }
  }

  for (file, group) in &files {
    render_file(provider, &mut output, *file, group);
  }

  for note in &diagnostic.notes {
    let _ = writeln!(output, "= note: {}", note);
  }
  output
}

fn render_file(provider: &dyn SourceProvider, output: &mut String, file: FileId, labels: &[&Label]) {
  let name = provider.file_name(file).unwrap_or("<unknown file>");
  let Some(text) = provider.file_text(file) else {
    let _ = writeln!(output, " --> {}:?:?", name);
    let _ = writeln!(output, "  | (source unavailable)");
    return;
  };

  let lines = LineIndex::new(text);
  let (first, _) = clamp_range(text, labels[0].span.range);
  let first_line = lines.line_at(first);
  let (line_start, _) = lines.bounds(first_line);
  let col = text[line_start..first].chars().count() + 1;
  let _ = writeln!(output, " --> {}:{}:{}", name, first_line + 1, col);

  let mut highlights: BTreeMap<usize, Vec<LineHighlight>> = BTreeMap::new();
  for label in labels {
    let (start, end) = clamp_range(text, label.span.range);
    let start_line = lines.line_at(start);
    let end_line = lines.line_at(end.saturating_sub(1).max(start)).max(start_line);
    for line in start_line..=end_line {
      let (line_start, line_end) = lines.bounds(line);
      let from = start.clamp(line_start, line_end);
      let to = end.clamp(from, line_end);
      let line_text = &text[line_start..line_end];
      let start_col = display_column(line_text, from - line_start);
      let end_col = display_column(line_text, to - line_start);
      highlights.entry(line).or_default().push(LineHighlight {
        start_col,
        len: (end_col - start_col).max(1),
        marker: if label.is_primary { '^' } else { '-' },
        message: (line == start_line).then_some(label.message.as_str()),
      });
    }
  }

  let max_line = highlights.keys().next_back().copied().unwrap_or(0) + 1;
  let gutter = max_line.to_string().len();
  let _ = writeln!(output, "{:>gutter$} |", "");
  let mut previous: Option<usize> = None;
  for (line, row) in highlights.iter_mut() {
    if let Some(previous) = previous {
      if *line > previous + 1 {
        let _ = writeln!(output, "{:>gutter$} | ...", "");
      }
    }
    let (line_start, line_end) = lines.bounds(*line);
    let _ = writeln!(
      output,
      "{:>gutter$} | {}",
      line + 1,
      expand_tabs(&text[line_start..line_end])
    );
    row.sort_by_key(|highlight| (highlight.start_col, highlight.len));
    for highlight in row.iter() {
      let mut underline = format!("{:>gutter$} | ", "");
      underline.push_str(&" ".repeat(highlight.start_col));
      underline.extend(std::iter::repeat(highlight.marker).take(highlight.len));
      if let Some(message) = highlight.message.filter(|m| !m.is_empty()) {
        underline.push(' ');
        underline.push_str(message);
      }
      let _ = writeln!(output, "{}", underline);
    }
    previous = Some(*line);
  }
}

struct LineIndex {
  starts: Vec<usize>,
  text_len: usize,
  ends: Vec<usize>,
}

impl LineIndex {
  fn new(text: &str) -> Self {
    let mut starts = vec![0];
    let mut ends = Vec::new();
    for (i, byte) in text.bytes().enumerate() {
      if byte == b'\n' {
        let end = if i > 0 && text.as_bytes()[i - 1] == b'\r' {
          i - 1
        } else {
          i
        };
        ends.push(end);
        starts.push(i + 1);
      }
    }
    ends.push(text.len());
    LineIndex {
      starts,
      text_len: text.len(),
      ends,
    }
  }

  fn line_at(&self, offset: usize) -> usize {
    let offset = offset.min(self.text_len);
    self.starts.partition_point(|&start| start <= offset).saturating_sub(1)
  }

  fn bounds(&self, line: usize) -> (usize, usize) {
    (self.starts[line], self.ends[line])
  }
}

fn clamp_range(text: &str, range: TextRange) -> (usize, usize) {
  let start = clamp_to_char_boundary(text, range.start as usize);
  let end = clamp_to_char_boundary(text, range.end as usize).max(start);
  (start, end)
}

fn clamp_to_char_boundary(text: &str, offset: usize) -> usize {
  let mut offset = offset.min(text.len());
  while offset > 0 && !text.is_char_boundary(offset) {
    offset -= 1;
  }
  offset
}

fn display_column(line: &str, offset: usize) -> usize {
  line[..offset]
    .chars()
    .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
    .sum()
}

fn expand_tabs(line: &str) -> String {
  line.replace('\t', &" ".repeat(TAB_WIDTH))
}
