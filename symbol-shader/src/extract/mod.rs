use crate::error::StructuralError;
use crate::error::StructuralErrorType;
use crate::table::ImportRef;
use crate::table::ModuleRef;
use parse_shader::loc::Loc;
use parse_shader::tree::Node;
use parse_shader::tree::SyntaxKind;
use parse_shader::tree::SyntaxTree;

pub mod glsl;
pub mod wgsl;

pub type ExtractResult<T> = Result<T, StructuralError>;

/// Read-only view over one unit shared by both dialect extractors.
pub struct Extractor<'a> {
  pub source: &'a str,
  pub tree: &'a SyntaxTree,
  pub name: Option<&'a str>,
}

impl<'a> Extractor<'a> {
  pub fn new(source: &'a str, tree: &'a SyntaxTree, name: Option<&'a str>) -> Extractor<'a> {
    Extractor { source, tree, name }
  }

  pub fn error(&self, typ: StructuralErrorType, loc: Loc) -> StructuralError {
    StructuralError::new(typ, loc, self.source, self.name)
  }

  pub fn text(&self, node: Node<'_>) -> &'a str {
    let loc = node.loc();
    &self.source[loc.0..loc.1]
  }

  pub fn string_value(&self, node: Node<'_>) -> String {
    let text = self.text(node);
    text
      .strip_prefix(['"', '\''])
      .and_then(|t| t.strip_suffix(['"', '\'']))
      .unwrap_or(text)
      .to_string()
  }

  pub fn require<'t>(
    &self,
    node: Node<'t>,
    kind: SyntaxKind,
    expected: &'static str,
  ) -> ExtractResult<Node<'t>> {
    node.child(kind).ok_or_else(|| {
      self.error(
        StructuralErrorType::MissingChild {
          parent: node.kind(),
          expected,
        },
        node.loc(),
      )
    })
  }

  /// Fails on the first error node anywhere in the tree.
  pub fn check_errors(&self) -> ExtractResult<()> {
    let mut cursor = self.tree.cursor();
    loop {
      if cursor.is_error() {
        let loc = cursor.loc();
        let typ = self
          .tree
          .errors()
          .iter()
          .find(|e| loc.contains(e.loc))
          .map(|e| e.typ);
        return Err(self.error(StructuralErrorType::ErrorNode(typ), loc));
      }
      if !cursor.next() {
        return Ok(());
      }
    }
  }

  /// Collects identifier names under `node` in order of first appearance.
  ///
  /// Attribute and private identifier subtrees are not entered, and names in `exclude` are
  /// dropped.
  pub fn identifiers(&self, node: Node<'_>, exclude: &[&str], out: &mut Vec<String>) {
    let mut skip_until = 0usize;
    for n in node.descendants() {
      if n.loc().0 < skip_until {
        continue;
      }
      match n.kind() {
        SyntaxKind::Attribute | SyntaxKind::PrivateIdentifier => skip_until = n.loc().1,
        SyntaxKind::Identifier => {
          let text = self.text(n);
          if !exclude.contains(&text) && !out.iter().any(|o| o == text) {
            out.push(text.to_string());
          }
        }
        _ => {}
      };
    }
  }

  /// Groups import references by module path in order of first appearance.
  pub fn group_imports(imports: Vec<(String, Vec<ImportRef>)>) -> Vec<ModuleRef> {
    let mut modules: Vec<ModuleRef> = Vec::new();
    for (path, refs) in imports {
      match modules.iter_mut().find(|m| m.name == path) {
        Some(module) => module.imports.extend(refs),
        None => modules.push(ModuleRef {
          name: path,
          imports: refs,
        }),
      }
    }
    modules
  }

  /// Reads `{a, b as c}` lists.
  pub fn import_list(&self, list: Node<'_>) -> Vec<ImportRef> {
    list
      .children()
      .filter(|n| n.kind() == SyntaxKind::ImportDeclarationIdentifier)
      .filter_map(|item| {
        let mut names = item.children().filter(|n| n.kind() == SyntaxKind::Identifier);
        let imported = self.text(names.next()?).to_string();
        let name = names.next().map_or_else(|| imported.clone(), |n| self.text(n).to_string());
        Some(ImportRef { name, imported })
      })
      .collect()
  }
}
