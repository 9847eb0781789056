use crate::span::SpanSource;
use crate::span::SpanTag;
use crate::span::TaggedSpan;
use ahash::HashSet;
use ahash::HashSetExt;
use once_cell::sync::Lazy;
use parse_shader::dialect::Dialect;
use parse_shader::tree::Node;
use parse_shader::tree::SyntaxKind;
use parse_shader::tree::SyntaxTree;
use symbol_shader::extract::wgsl::attribute_parts;
use symbol_shader::extract::wgsl::flags_from_attributes;
use symbol_shader::table::RefFlags;

// Attributes that only steer linking and are never emitted.
static PRIVATE_ATTRIBUTES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
  let mut set = HashSet::new();
  set.extend(["export", "link", "global", "optional", "infer"]);
  set
});

static SKIPPED_PRAGMAS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
  let mut set = HashSet::new();
  set.extend(["import", "export", "optional", "global", "infer"]);
  set
});

/// Tagged spans read directly off a syntax tree.
pub struct TreeSpans<'a> {
  code: &'a str,
  tree: &'a SyntaxTree,
  dialect: Dialect,
  // GLSL functions with a body; prototypes of anything else are link placeholders.
  defined: HashSet<&'a str>,
}

impl<'a> TreeSpans<'a> {
  pub fn new(code: &'a str, tree: &'a SyntaxTree, dialect: Dialect) -> TreeSpans<'a> {
    let mut defined = HashSet::new();
    if dialect == Dialect::Glsl {
      for node in tree.root().children() {
        if node.kind() != SyntaxKind::FunctionDefinition {
          continue;
        }
        if let Some(name) = node
          .child(SyntaxKind::FunctionPrototype)
          .and_then(|p| p.child(SyntaxKind::Identifier))
        {
          defined.insert(name.text(code));
        }
      }
    }
    TreeSpans {
      code,
      tree,
      dialect,
      defined,
    }
  }

  // Returns whether to descend into the node's children.
  fn visit_wgsl(&self, node: Node<'a>, visit: &mut dyn FnMut(TaggedSpan<'a>)) -> bool {
    let loc = node.loc();
    match node.kind() {
      SyntaxKind::ImportDeclaration | SyntaxKind::EnableDirective => {
        visit(TaggedSpan::new(SpanTag::Skip, loc));
        false
      }
      SyntaxKind::LocalDeclaration => {
        let inner = node.first_child();
        let flags = inner
          .and_then(|i| i.child(SyntaxKind::AttributeList))
          .map(|list| {
            flags_from_attributes(
              list
                .children()
                .map(|a| attribute_parts(a.text(self.code)).0),
            )
          })
          .unwrap_or_else(RefFlags::empty);
        if flags.contains(RefFlags::INFER) {
          visit(TaggedSpan::new(SpanTag::Skip, loc));
          return false;
        }
        if flags.contains(RefFlags::EXTERNAL) {
          let name = inner.and_then(|i| self.wgsl_declared_name(i));
          return match name {
            Some(name) if flags.contains(RefFlags::OPTIONAL) => {
              visit(TaggedSpan::with_arg(SpanTag::Optional, loc, name));
              true
            }
            _ => {
              visit(TaggedSpan::new(SpanTag::Skip, loc));
              false
            }
          };
        }
        visit(TaggedSpan::new(SpanTag::Shake, loc));
        true
      }
      SyntaxKind::Attribute => {
        let (name, _) = attribute_parts(node.text(self.code));
        let tag = if PRIVATE_ATTRIBUTES.contains(name) {
          SpanTag::Skip
        } else {
          SpanTag::Attribute
        };
        visit(TaggedSpan::new(tag, loc));
        false
      }
      SyntaxKind::Identifier => {
        visit(TaggedSpan::new(SpanTag::Identifier, loc));
        false
      }
      SyntaxKind::Directive
      | SyntaxKind::Error
      | SyntaxKind::PrivateIdentifier
      | SyntaxKind::Keyword
      | SyntaxKind::String => false,
      _ => true,
    }
  }

  fn wgsl_declared_name(&self, inner: Node<'a>) -> Option<&'a str> {
    let holder = match inner.kind() {
      SyntaxKind::FunctionDeclaration => inner.child(SyntaxKind::FunctionHeader)?,
      SyntaxKind::GlobalVariableDeclaration => inner.child(SyntaxKind::VariableDeclaration)?,
      _ => inner,
    };
    holder
      .child(SyntaxKind::Identifier)
      .map(|n| n.text(self.code))
  }

  fn visit_glsl(&self, node: Node<'a>, visit: &mut dyn FnMut(TaggedSpan<'a>)) -> bool {
    let loc = node.loc();
    match node.kind() {
      SyntaxKind::Preprocessor => {
        if self.glsl_is_skipped_directive(node) {
          visit(TaggedSpan::new(SpanTag::Skip, loc));
        }
        false
      }
      SyntaxKind::GlobalDeclaration => {
        let external = node
          .child(SyntaxKind::FunctionPrototype)
          .and_then(|p| p.child(SyntaxKind::Identifier))
          .is_some_and(|name| !self.defined.contains(name.text(self.code)));
        if external {
          visit(TaggedSpan::new(SpanTag::Skip, loc));
          return false;
        }
        visit(TaggedSpan::new(SpanTag::Shake, loc));
        true
      }
      SyntaxKind::FunctionDefinition => {
        visit(TaggedSpan::new(SpanTag::Shake, loc));
        true
      }
      SyntaxKind::Identifier => {
        visit(TaggedSpan::new(SpanTag::Identifier, loc));
        false
      }
      SyntaxKind::Error
      | SyntaxKind::PrivateIdentifier
      | SyntaxKind::Keyword
      | SyntaxKind::String => false,
      _ => true,
    }
  }

  fn glsl_is_skipped_directive(&self, node: Node<'a>) -> bool {
    let Some(directive) = node.child(SyntaxKind::PreprocessorDirective) else {
      return false;
    };
    match directive.text(self.code) {
      "version" | "extension" => true,
      "pragma" => node
        .child(SyntaxKind::PragmaVerb)
        .is_some_and(|verb| SKIPPED_PRAGMAS.contains(verb.text(self.code))),
      _ => false,
    }
  }
}

impl SpanSource for TreeSpans<'_> {
  fn for_each_span<'s>(&'s self, visit: &mut dyn FnMut(TaggedSpan<'s>)) {
    let mut cursor = self.tree.cursor();
    loop {
      let node = cursor.node();
      let descend = match self.dialect {
        Dialect::Wgsl => self.visit_wgsl(node, visit),
        Dialect::Glsl => self.visit_glsl(node, visit),
      };
      let moved = if descend {
        cursor.next()
      } else {
        cursor.next_skipping_children()
      };
      if !moved {
        break;
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use parse_shader::parse;

  fn spans(code: &str, dialect: Dialect) -> Vec<(SpanTag, String, Option<String>)> {
    let tree = parse(code, dialect);
    let source = TreeSpans::new(code, &tree, dialect);
    source
      .collect_spans()
      .into_iter()
      .map(|s| {
        (
          s.tag,
          code[s.loc.0..s.loc.1].to_string(),
          s.arg.map(|a| a.to_string()),
        )
      })
      .collect()
  }

  fn tags(code: &str, dialect: Dialect) -> Vec<(SpanTag, String)> {
    spans(code, dialect)
      .into_iter()
      .map(|(tag, text, _)| (tag, text))
      .collect()
  }

  #[test]
  fn wgsl_declarations() {
    let code = "import { a } from 'x';\n@export fn f(p: T) -> T { return a(p); }\n";
    assert_eq!(tags(code, Dialect::Wgsl), vec![
      (SpanTag::Skip, "import { a } from 'x';".to_string()),
      (SpanTag::Shake, "@export fn f(p: T) -> T { return a(p); }".to_string()),
      (SpanTag::Skip, "@export".to_string()),
      (SpanTag::Identifier, "f".to_string()),
      (SpanTag::Identifier, "p".to_string()),
      (SpanTag::Identifier, "T".to_string()),
      (SpanTag::Identifier, "T".to_string()),
      (SpanTag::Identifier, "a".to_string()),
      (SpanTag::Identifier, "p".to_string()),
    ]);
  }

  #[test]
  fn wgsl_link_placeholders() {
    let code = "@link fn getA() -> f32;\n@optional @link fn getB() -> f32 {};\n@infer type T;\n@group(0) @binding(0) var<uniform> u: f32;\n";
    let spans = spans(code, Dialect::Wgsl);
    assert_eq!(spans[0], (SpanTag::Skip, "@link fn getA() -> f32;".to_string(), None));
    assert_eq!(
      spans[1],
      (
        SpanTag::Optional,
        "@optional @link fn getB() -> f32 {}".to_string(),
        Some("getB".to_string())
      )
    );
    assert!(spans.contains(&(SpanTag::Skip, "@infer type T;".to_string(), None)));
    assert!(spans.contains(&(SpanTag::Attribute, "@group(0)".to_string(), None)));
    assert!(spans.contains(&(SpanTag::Attribute, "@binding(0)".to_string(), None)));
  }

  #[test]
  fn wgsl_member_names_are_not_identifiers() {
    let code = "struct Foo { bar: f32 };\nfn f(x: Foo) -> f32 { return x.bar; }\n";
    let names: Vec<String> = tags(code, Dialect::Wgsl)
      .into_iter()
      .filter(|(tag, _)| *tag == SpanTag::Identifier)
      .map(|(_, text)| text)
      .collect();
    assert!(!names.contains(&"bar".to_string()));
    assert!(names.contains(&"Foo".to_string()));
  }

  #[test]
  fn glsl_directives_and_prototypes() {
    let code = "#version 450\n#pragma export\nfloat getA();\nfloat getB();\nfloat getB() { return 1.0; }\n#define X 1\n";
    assert_eq!(tags(code, Dialect::Glsl), vec![
      (SpanTag::Skip, "#version 450".to_string()),
      (SpanTag::Skip, "#pragma export".to_string()),
      (SpanTag::Skip, "float getA();".to_string()),
      (SpanTag::Shake, "float getB();".to_string()),
      (SpanTag::Identifier, "float".to_string()),
      (SpanTag::Identifier, "getB".to_string()),
      (SpanTag::Shake, "float getB() { return 1.0; }".to_string()),
      (SpanTag::Identifier, "float".to_string()),
      (SpanTag::Identifier, "getB".to_string()),
    ]);
  }
}
