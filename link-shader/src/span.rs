use parse_shader::loc::Loc;

/// What the rewrite engine does with a span.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SpanTag {
  /// A top-level declaration that is dropped when its offset is in the shake set.
  Shake,
  /// Syntax that never survives rewriting: imports, enables, link placeholders, private attributes.
  Skip,
  Identifier,
  Attribute,
  /// An optional link placeholder, kept only while its symbol (the span's argument) is unresolved.
  Optional,
}

impl SpanTag {
  pub fn op(self) -> u8 {
    match self {
      SpanTag::Shake => 0,
      SpanTag::Skip => 1,
      SpanTag::Identifier => 2,
      SpanTag::Attribute => 3,
      SpanTag::Optional => 4,
    }
  }

  pub fn from_op(op: u8) -> Option<SpanTag> {
    Some(match op {
      0 => SpanTag::Shake,
      1 => SpanTag::Skip,
      2 => SpanTag::Identifier,
      3 => SpanTag::Attribute,
      4 => SpanTag::Optional,
      _ => return None,
    })
  }

  pub fn takes_arg(self) -> bool {
    self == SpanTag::Optional
  }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TaggedSpan<'a> {
  pub tag: SpanTag,
  pub loc: Loc,
  pub arg: Option<&'a str>,
}

impl<'a> TaggedSpan<'a> {
  pub fn new(tag: SpanTag, loc: Loc) -> TaggedSpan<'a> {
    TaggedSpan {
      tag,
      loc,
      arg: None,
    }
  }

  pub fn with_arg(tag: SpanTag, loc: Loc, arg: &'a str) -> TaggedSpan<'a> {
    TaggedSpan {
      tag,
      loc,
      arg: Some(arg),
    }
  }
}

/// Anything the rewrite engine can replay: a syntax tree walk or a decompressed stream.
///
/// Spans are visited in pre-order, so starts never decrease and an enclosing span comes before the
/// spans nested in it.
pub trait SpanSource {
  fn for_each_span<'s>(&'s self, visit: &mut dyn FnMut(TaggedSpan<'s>));

  fn collect_spans(&self) -> Vec<TaggedSpan<'_>> {
    let mut out = Vec::new();
    self.for_each_span(&mut |span| out.push(span));
    out
  }
}
