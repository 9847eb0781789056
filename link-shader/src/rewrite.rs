use crate::dialect::collapses_separators;
use crate::span::SpanSource;
use crate::span::SpanTag;
use ahash::HashMap;
use ahash::HashSet;
use parse_shader::dialect::Dialect;

struct Writer<'a> {
  code: &'a str,
  dialect: Dialect,
  out: String,
  pos: usize,
}

impl<'a> Writer<'a> {
  fn replace(&mut self, from: usize, to: usize, with: &str) {
    self.out.push_str(&self.code[self.pos..from]);
    self.out.push_str(with);
    self.pos = to;
  }

  // Drops `from..to` and the blank space after it.
  fn skip(&mut self, from: usize, to: usize) {
    self.out.push_str(&self.code[self.pos..from]);
    self.pos = to;
    let separators = collapses_separators(self.dialect);
    if separators && self.out.chars().next_back().is_some_and(|c| !c.is_whitespace()) {
      self.out.push('\n');
    }
    let rest = &self.code[self.pos..];
    let kept = rest
      .char_indices()
      .find(|(_, c)| !(c.is_whitespace() || (separators && *c == ';')))
      .map_or(rest.len(), |(i, _)| i);
    self.pos += kept;
  }
}

/// Emits `code` with removals and renames applied.
///
/// Spans of `shake` declarations and link placeholders are dropped together with the space after
/// them, except `Optional` placeholders whose symbol is in `optionals`. Identifiers and attributes
/// found in `rename` are substituted.
pub fn rewrite(
  code: &str,
  source: &dyn SpanSource,
  dialect: Dialect,
  rename: &HashMap<String, String>,
  shake: Option<&HashSet<usize>>,
  optionals: Option<&HashSet<String>>,
) -> String {
  let mut w = Writer {
    code,
    dialect,
    out: String::with_capacity(code.len()),
    pos: 0,
  };
  source.for_each_span(&mut |span| {
    let (from, to) = (span.loc.0, span.loc.1);
    // Inside something already dropped or replaced.
    if from < w.pos || to > code.len() {
      return;
    }
    match span.tag {
      SpanTag::Skip => w.skip(from, to),
      SpanTag::Shake => {
        if shake.is_some_and(|s| s.contains(&from)) {
          w.skip(from, to);
        }
      }
      SpanTag::Optional => {
        let keep = match (span.arg, optionals) {
          (Some(arg), Some(optionals)) => optionals.contains(arg),
          _ => false,
        };
        if !keep {
          w.skip(from, to);
        }
      }
      SpanTag::Identifier | SpanTag::Attribute => {
        if let Some(name) = rename.get(&code[from..to]) {
          w.replace(from, to, name);
        }
      }
    };
  });
  w.out.push_str(&code[w.pos..]);
  w.out
}
