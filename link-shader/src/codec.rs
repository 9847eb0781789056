use crate::err::CodecMismatchError;
use crate::err::CodecMismatchKind;
use crate::span::SpanSource;
use crate::span::SpanTag;
use crate::span::TaggedSpan;
use ahash::HashMap;
use ahash::HashMapExt;
use parse_shader::loc::Loc;
use serde::Deserialize;
use serde::Serialize;

/// `(op, start delta from the previous node's start, length, argument index)`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct CompactNode(pub u8, pub u32, pub u32, pub Option<u32>);

/// Flat replayable encoding of the spans a rewrite needs.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct CompactStream {
  pub nodes: Vec<CompactNode>,
  /// Distinct span arguments in order of first use.
  pub args: Vec<String>,
}

impl CompactStream {
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }
}

fn to_u32(value: usize) -> u32 {
  u32::try_from(value).unwrap_or(u32::MAX)
}

pub fn compress(source: &dyn SpanSource) -> CompactStream {
  let mut nodes = Vec::new();
  let mut args: Vec<String> = Vec::new();
  let mut arg_ids: HashMap<String, u32> = HashMap::new();
  let mut last = 0usize;
  source.for_each_span(&mut |span| {
    let arg = span.arg.map(|arg| {
      if let Some(id) = arg_ids.get(arg) {
        return *id;
      }
      let id = to_u32(args.len());
      args.push(arg.to_string());
      arg_ids.insert(arg.to_string(), id);
      id
    });
    let delta = span.loc.0.saturating_sub(last);
    last = span.loc.0;
    nodes.push(CompactNode(
      span.tag.op(),
      to_u32(delta),
      to_u32(span.loc.len()),
      arg,
    ));
  });
  CompactStream { nodes, args }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct CompactSpan {
  tag: SpanTag,
  loc: Loc,
  arg: Option<usize>,
}

/// A validated compact stream, walkable in place of the syntax tree it was built from.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CompactTree {
  spans: Vec<CompactSpan>,
  args: Vec<String>,
}

impl CompactTree {
  pub fn len(&self) -> usize {
    self.spans.len()
  }

  pub fn is_empty(&self) -> bool {
    self.spans.is_empty()
  }
}

/// Rebuilds span positions for `code`.
///
/// Fails if any node does not fit `code`, which means the stream was made for different source or
/// by an incompatible encoder.
pub fn decompress(code: &str, stream: &CompactStream) -> Result<CompactTree, CodecMismatchError> {
  let mut spans = Vec::with_capacity(stream.nodes.len());
  let mut start = 0usize;
  for (index, &CompactNode(op, delta, len, arg)) in stream.nodes.iter().enumerate() {
    let mismatch = |kind| CodecMismatchError { kind, index };
    let tag = SpanTag::from_op(op).ok_or_else(|| mismatch(CodecMismatchKind::UnknownOp(op)))?;
    start = start
      .checked_add(delta as usize)
      .ok_or_else(|| mismatch(CodecMismatchKind::OutOfBounds))?;
    let end = start
      .checked_add(len as usize)
      .filter(|end| *end <= code.len())
      .ok_or_else(|| mismatch(CodecMismatchKind::OutOfBounds))?;
    if !code.is_char_boundary(start) || !code.is_char_boundary(end) {
      return Err(mismatch(CodecMismatchKind::NotCharBoundary));
    }
    let arg = match (tag.takes_arg(), arg) {
      (true, Some(id)) if (id as usize) < stream.args.len() => Some(id as usize),
      (true, _) => return Err(mismatch(CodecMismatchKind::MissingArgument)),
      (false, Some(_)) => return Err(mismatch(CodecMismatchKind::StrayArgument)),
      (false, None) => None,
    };
    spans.push(CompactSpan {
      tag,
      loc: Loc(start, end),
      arg,
    });
  }
  Ok(CompactTree {
    spans,
    args: stream.args.clone(),
  })
}

impl SpanSource for CompactTree {
  fn for_each_span<'s>(&'s self, visit: &mut dyn FnMut(TaggedSpan<'s>)) {
    for span in self.spans.iter() {
      visit(TaggedSpan {
        tag: span.tag,
        loc: span.loc,
        arg: span.arg.and_then(|i| self.args.get(i)).map(|a| a.as_str()),
      });
    }
  }
}
