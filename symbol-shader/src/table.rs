use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::BitOr;
use std::ops::BitOrAssign;

/// Linking facets attached to a declaration.
///
/// Both dialects spell these differently (`@export` vs `#pragma export`) but
/// they mean the same thing to the linker.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefFlags(u8);

impl RefFlags {
  pub const EXPORTED: RefFlags = RefFlags(1 << 0);
  pub const EXTERNAL: RefFlags = RefFlags(1 << 1);
  pub const OPTIONAL: RefFlags = RefFlags(1 << 2);
  pub const GLOBAL: RefFlags = RefFlags(1 << 3);
  pub const INFER: RefFlags = RefFlags(1 << 4);
  pub const BINDING: RefFlags = RefFlags(1 << 5);

  const NAMES: [(RefFlags, &'static str); 6] = [
    (RefFlags::EXPORTED, "Exported"),
    (RefFlags::EXTERNAL, "External"),
    (RefFlags::OPTIONAL, "Optional"),
    (RefFlags::GLOBAL, "Global"),
    (RefFlags::INFER, "Infer"),
    (RefFlags::BINDING, "Binding"),
  ];

  pub fn empty() -> RefFlags {
    RefFlags(0)
  }

  pub fn bits(self) -> u8 {
    self.0
  }

  pub fn is_empty(self) -> bool {
    self.0 == 0
  }

  pub fn contains(self, other: RefFlags) -> bool {
    self.0 & other.0 == other.0
  }

  pub fn insert(&mut self, other: RefFlags) {
    self.0 |= other.0;
  }

  pub fn set(&mut self, other: RefFlags, on: bool) {
    if on {
      self.0 |= other.0;
    } else {
      self.0 &= !other.0;
    }
  }
}

impl BitOr for RefFlags {
  type Output = RefFlags;

  fn bitor(self, rhs: Self) -> Self::Output {
    RefFlags(self.0 | rhs.0)
  }
}

impl BitOrAssign for RefFlags {
  fn bitor_assign(&mut self, rhs: Self) {
    self.insert(rhs);
  }
}

impl fmt::Debug for RefFlags {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut first = true;
    for (flag, name) in RefFlags::NAMES {
      if self.contains(flag) {
        if !first {
          f.write_str(" | ")?;
        }
        f.write_str(name)?;
        first = false;
      }
    }
    if first {
      f.write_str("(empty)")?;
    }
    Ok(())
  }
}

/// A symbol imported from another module, as `imported` or `imported as name`.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ImportRef {
  /// Local name.
  pub name: String,
  /// Name in the imported module.
  pub imported: String,
}

/// All imports from one module path, in source order.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ModuleRef {
  pub name: String,
  pub imports: Vec<ImportRef>,
}

/// A type referenced by an `@infer(T)` attribute.
///
/// `at` is `-1` for the return type, otherwise the parameter index.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct InferRef {
  pub name: String,
  pub at: i32,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ParameterRef {
  pub name: Option<String>,
  pub ty: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct FunctionRef {
  pub name: String,
  pub ty: String,
  pub parameters: Vec<ParameterRef>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub inferred: Vec<InferRef>,
}

impl FunctionRef {
  /// Type at an inferrable position: `-1` is the return type.
  pub fn type_at(&self, at: i32) -> Option<&str> {
    if at < 0 {
      return Some(&self.ty);
    }
    self.parameters.get(at as usize).map(|p| p.ty.as_str())
  }
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct VariableRef {
  pub ty: Option<String>,
  pub qualifier: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct MemberRef {
  pub name: String,
  pub ty: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct StructRef {
  pub members: Vec<MemberRef>,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DeclarationKind {
  Function(FunctionRef),
  Variable(VariableRef),
  Constant(VariableRef),
  Alias(VariableRef),
  Struct(StructRef),
  Block(StructRef),
  // A declaration made only of qualifiers, e.g. `layout(local_size_x = 8) in;`.
  Qualifier,
}

/// One top-level declaration.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Declaration {
  /// Start offset; identifies the declaration for removal.
  pub at: usize,
  pub symbols: Vec<String>,
  pub flags: RefFlags,
  pub kind: DeclarationKind,
  /// Other symbols of the same unit referenced by this declaration.
  pub identifiers: Vec<String>,
}

impl Declaration {
  pub fn function(&self) -> Option<&FunctionRef> {
    match &self.kind {
      DeclarationKind::Function(func) => Some(func),
      _ => None,
    }
  }

  pub fn has(&self, flags: RefFlags) -> bool {
    self.flags.contains(flags)
  }
}

#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct SymbolTable {
  /// Every declared symbol, deduplicated, in declaration order.
  pub symbols: Vec<String>,
  /// Exported symbols.
  pub visibles: Vec<String>,
  pub globals: Vec<String>,
  pub modules: Vec<ModuleRef>,
  pub enables: Vec<String>,
  pub declarations: Vec<Declaration>,
  /// Names of external placeholders awaiting a link.
  pub linkable: BTreeSet<String>,
}

impl SymbolTable {
  /// Fills in the derived lists from `declarations` and prunes identifiers that are neither symbols
  /// of this unit nor names it imports.
  pub fn from_declarations(
    mut declarations: Vec<Declaration>,
    modules: Vec<ModuleRef>,
    enables: Vec<String>,
  ) -> SymbolTable {
    let mut symbols = Vec::new();
    let mut visibles = Vec::new();
    let mut globals = Vec::new();
    let mut linkable = BTreeSet::new();
    for decl in declarations.iter() {
      for symbol in decl.symbols.iter() {
        push_unique(&mut symbols, symbol);
        if decl.has(RefFlags::EXPORTED) {
          push_unique(&mut visibles, symbol);
        }
        if decl.has(RefFlags::GLOBAL) {
          push_unique(&mut globals, symbol);
        }
        if decl.has(RefFlags::EXTERNAL) {
          linkable.insert(symbol.clone());
        }
      }
    }
    let scope: ahash::HashSet<&str> = symbols
      .iter()
      .map(|s| s.as_str())
      .chain(modules.iter().flat_map(|m| m.imports.iter().map(|i| i.name.as_str())))
      .collect();
    for decl in declarations.iter_mut() {
      let own = decl.symbols.clone();
      decl
        .identifiers
        .retain(|id| scope.contains(id.as_str()) && !own.contains(id));
    }
    SymbolTable {
      symbols,
      visibles,
      globals,
      modules,
      enables,
      declarations,
      linkable,
    }
  }

  /// A table with no symbols, used for modules included verbatim.
  pub fn empty() -> SymbolTable {
    SymbolTable::default()
  }

  pub fn index_of(&self, symbol: &str) -> Option<usize> {
    self.symbols.iter().position(|s| s == symbol)
  }

  pub fn has_symbol(&self, symbol: &str) -> bool {
    self.index_of(symbol).is_some()
  }

  pub fn is_visible(&self, symbol: &str) -> bool {
    self.visibles.iter().any(|s| s == symbol)
  }

  pub fn is_global(&self, symbol: &str) -> bool {
    self.globals.iter().any(|s| s == symbol)
  }

  pub fn is_linkable(&self, symbol: &str) -> bool {
    self.linkable.contains(symbol)
  }

  pub fn externals(&self) -> impl Iterator<Item = &Declaration> {
    self.with_flags(RefFlags::EXTERNAL)
  }

  pub fn exports(&self) -> impl Iterator<Item = &Declaration> {
    self.with_flags(RefFlags::EXPORTED)
  }

  pub fn bindings(&self) -> impl Iterator<Item = &Declaration> {
    self.with_flags(RefFlags::BINDING)
  }

  fn with_flags(&self, flags: RefFlags) -> impl Iterator<Item = &Declaration> {
    self.declarations.iter().filter(move |d| d.has(flags))
  }

  /// The first non-external declaration introducing `symbol`.
  pub fn declaration(&self, symbol: &str) -> Option<&Declaration> {
    self
      .declarations
      .iter()
      .find(|d| !d.has(RefFlags::EXTERNAL) && d.symbols.iter().any(|s| s == symbol))
  }

  /// Signature of an exported function, used to resolve inferred types.
  pub fn exported_function(&self, name: &str) -> Option<&FunctionRef> {
    self
      .exports()
      .filter_map(|d| d.function())
      .find(|f| f.name == name)
  }
}

fn push_unique(list: &mut Vec<String>, symbol: &str) {
  if !list.iter().any(|s| s == symbol) {
    list.push(symbol.to_string());
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn decl(at: usize, symbol: &str, flags: RefFlags, identifiers: &[&str]) -> Declaration {
    Declaration {
      at,
      symbols: vec![symbol.to_string()],
      flags,
      kind: DeclarationKind::Constant(VariableRef {
        ty: None,
        qualifier: None,
      }),
      identifiers: identifiers.iter().map(|s| s.to_string()).collect(),
    }
  }

  #[test]
  fn flags_debug_lists_names() {
    let flags = RefFlags::EXPORTED | RefFlags::GLOBAL;
    assert_eq!(format!("{:?}", flags), "Exported | Global");
    assert_eq!(format!("{:?}", RefFlags::empty()), "(empty)");
    let mut flags = flags;
    flags.set(RefFlags::GLOBAL, false);
    assert!(!flags.contains(RefFlags::GLOBAL));
    assert!(flags.contains(RefFlags::EXPORTED));
  }

  #[test]
  fn derives_lists_and_prunes_identifiers() {
    let table = SymbolTable::from_declarations(
      vec![
        decl(0, "x", RefFlags::empty(), &["f32", "x"]),
        decl(10, "a", RefFlags::EXPORTED, &["x", "vec4"]),
        decl(20, "g", RefFlags::GLOBAL | RefFlags::EXPORTED, &[]),
        decl(30, "ext", RefFlags::EXTERNAL, &[]),
        decl(40, "a", RefFlags::empty(), &[]),
        decl(50, "b", RefFlags::empty(), &["blend", "mix", "a"]),
      ],
      vec![ModuleRef {
        name: "colors".into(),
        imports: vec![ImportRef {
          name: "blend".into(),
          imported: "mix".into(),
        }],
      }],
      Vec::new(),
    );
    assert_eq!(table.symbols, vec!["x", "a", "g", "ext", "b"]);
    assert_eq!(table.visibles, vec!["a", "g"]);
    assert_eq!(table.globals, vec!["g"]);
    assert!(table.is_linkable("ext"));
    assert!(table.declarations[0].identifiers.is_empty());
    assert_eq!(table.declarations[1].identifiers, vec!["x"]);
    assert_eq!(table.index_of("g"), Some(2));
    assert_eq!(table.declaration("a").map(|d| d.at), Some(10));
    assert!(table.declaration("ext").is_none());
    // Imported names are references too, under their local spelling.
    assert_eq!(table.declarations[5].identifiers, vec!["blend", "a"]);
  }
}
