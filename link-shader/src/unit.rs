use crate::codec::compress;
use crate::codec::decompress;
use crate::codec::CompactStream;
use crate::codec::CompactTree;
use crate::err::LinkError;
use crate::hash::stable_hash;
use crate::rewrite::rewrite;
use crate::walk::TreeSpans;
use ahash::HashMap;
use ahash::HashSet;
use parse_shader::dialect::Dialect;
use parse_shader::parse;
use parse_shader::tree::SyntaxTree;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use symbol_shader::analyze;
use symbol_shader::extract;
use symbol_shader::table::SymbolTable;
use symbol_shader::ShakeTable;

/// Generates the code of a virtual module once the linker has chosen its namespace and resolved
/// the names it refers to.
pub trait VirtualRender: Send + Sync {
  fn render(&self, namespace: &str, rename: &HashMap<String, String>) -> String;
}

/// How a module's final text is produced.
#[derive(Clone)]
pub enum Body {
  Tree(Arc<SyntaxTree>),
  Compact(Arc<CompactTree>),
  /// Included verbatim.
  Static,
  Virtual(Arc<dyn VirtualRender>),
}

impl fmt::Debug for Body {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Body::Tree(_) => "Tree",
      Body::Compact(_) => "Compact",
      Body::Static => "Static",
      Body::Virtual(_) => "Virtual",
    })
  }
}

/// A loaded unit. Immutable and cheap to clone; shared parts sit behind `Arc`.
#[derive(Clone, Debug)]
pub struct Module {
  pub name: String,
  pub code: Arc<str>,
  pub dialect: Dialect,
  /// Hash of the dialect and code, independent of the entry point.
  pub hash: u64,
  pub table: Arc<SymbolTable>,
  pub shake: Arc<ShakeTable>,
  pub body: Body,
  pub entry: Option<String>,
}

pub(crate) fn content_hash(dialect: Dialect, code: &str) -> u64 {
  stable_hash(&(dialect.as_str(), code))
}

impl Module {
  /// Parses and analyzes `code`. With `compressed`, the syntax tree is replaced by its compact
  /// stream right away.
  pub fn load(name: &str, code: &str, dialect: Dialect, compressed: bool) -> Result<Module, LinkError> {
    let _span = tracing::debug_span!("load_module", name, ?dialect, compressed).entered();
    let tree = parse(code, dialect);
    let table = extract(code, &tree, dialect, Some(name))?;
    let shake = analyze(&table);
    let body = if compressed {
      let stream = compress(&TreeSpans::new(code, &tree, dialect));
      Body::Compact(Arc::new(decompress(code, &stream)?))
    } else {
      Body::Tree(Arc::new(tree))
    };
    let module = Module {
      name: name.to_string(),
      code: Arc::from(code),
      dialect,
      hash: content_hash(dialect, code),
      table: Arc::new(table),
      shake: Arc::new(shake),
      body,
      entry: None,
    };
    Ok(module.bind_entry_point(None))
  }

  /// Code included as-is, with nothing to rename or shake.
  pub fn from_static(name: &str, code: &str, dialect: Dialect, entry: Option<&str>) -> Module {
    Module {
      name: name.to_string(),
      code: Arc::from(code),
      dialect,
      hash: stable_hash(&("static", dialect.as_str(), code)),
      table: Arc::new(SymbolTable::empty()),
      shake: Arc::new(ShakeTable::default()),
      body: Body::Static,
      entry: entry.map(|e| e.to_string()),
    }
  }

  /// A generated module exporting `symbols`.
  pub fn from_virtual(
    name: &str,
    dialect: Dialect,
    symbols: Vec<String>,
    render: Arc<dyn VirtualRender>,
  ) -> Module {
    let code = format!("@virtual [{}]", symbols.join(", "));
    let table = SymbolTable {
      visibles: symbols.clone(),
      symbols,
      ..SymbolTable::empty()
    };
    Module {
      name: name.to_string(),
      hash: stable_hash(&(name, dialect.as_str(), code.as_str())),
      code: Arc::from(code),
      dialect,
      table: Arc::new(table),
      shake: Arc::new(ShakeTable::default()),
      body: Body::Virtual(render),
      entry: None,
    }
    .bind_entry_point(None)
  }

  /// Sets the symbol this module is linked for. Without an explicit entry, `main` is used when the
  /// module declares it.
  pub fn bind_entry_point(mut self, entry: Option<&str>) -> Module {
    let entry = match entry {
      Some(entry) => Some(entry.to_string()),
      None => self
        .entry
        .take()
        .or_else(|| self.table.has_symbol("main").then(|| "main".to_string())),
    };
    self.entry = entry;
    self
  }

  /// Identity of this module as a link target: the same code bound to different entries differs.
  pub fn identity(&self) -> u64 {
    stable_hash(&(self.hash, self.entry.as_deref()))
  }

  pub fn is_compressed(&self) -> bool {
    matches!(self.body, Body::Compact(_))
  }

  /// Produces this module's fragment of a linked program.
  pub fn render(
    &self,
    namespace: &str,
    rename: &HashMap<String, String>,
    shake: Option<&HashSet<usize>>,
    optionals: Option<&HashSet<String>>,
  ) -> String {
    match &self.body {
      Body::Tree(tree) => {
        let spans = TreeSpans::new(&self.code, tree, self.dialect);
        rewrite(&self.code, &spans, self.dialect, rename, shake, optionals)
      }
      Body::Compact(tree) => rewrite(&self.code, tree.as_ref(), self.dialect, rename, shake, optionals),
      Body::Static => self.code.to_string(),
      Body::Virtual(generator) => generator.render(namespace, rename),
    }
  }

  /// Serializable form. Virtual modules have no persistent form.
  pub fn to_compiled(&self) -> Option<CompiledModule> {
    let stream = match &self.body {
      Body::Tree(tree) => compress(&TreeSpans::new(&self.code, tree, self.dialect)),
      Body::Compact(tree) => compress(tree.as_ref()),
      Body::Static => CompactStream::default(),
      Body::Virtual(_) => return None,
    };
    Some(CompiledModule {
      name: self.name.clone(),
      code: self.code.to_string(),
      dialect: self.dialect,
      hash: self.hash,
      entry: self.entry.clone(),
      table: self.table.as_ref().clone(),
      shake: self.shake.as_ref().clone(),
      stream,
    })
  }

  pub fn from_compiled(compiled: CompiledModule) -> Result<Module, LinkError> {
    let tree = decompress(&compiled.code, &compiled.stream)?;
    Ok(Module {
      name: compiled.name,
      code: Arc::from(compiled.code),
      dialect: compiled.dialect,
      hash: compiled.hash,
      table: Arc::new(compiled.table),
      shake: Arc::new(compiled.shake),
      body: Body::Compact(Arc::new(tree)),
      entry: compiled.entry,
    })
  }
}

/// A module persisted with its symbol table, reachability table and compact stream, so it can be
/// linked later without parsing.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct CompiledModule {
  pub name: String,
  pub code: String,
  pub dialect: Dialect,
  pub hash: u64,
  pub entry: Option<String>,
  pub table: SymbolTable,
  pub shake: ShakeTable,
  pub stream: CompactStream,
}

impl CompiledModule {
  pub fn to_json(&self) -> Result<String, LinkError> {
    Ok(serde_json::to_string(self)?)
  }

  pub fn from_json(json: &str) -> Result<CompiledModule, LinkError> {
    Ok(serde_json::from_str(json)?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::codec::CompactNode;
  use crate::err::CodecMismatchKind;
  use ahash::HashMapExt;

  const SUB: &str = "@export fn getColor() -> vec4<f32> { return vec4<f32>(1.0); }\nfn main() {}\n";

  #[test]
  fn binds_main_by_default() {
    let module = Module::load("sub", SUB, Dialect::Wgsl, false).unwrap();
    assert_eq!(module.entry.as_deref(), Some("main"));
    let other = module.clone().bind_entry_point(Some("getColor"));
    assert_eq!(other.hash, module.hash);
    assert_ne!(other.identity(), module.identity());
  }

  #[test]
  fn compressed_and_tree_render_alike() {
    let tree = Module::load("sub", SUB, Dialect::Wgsl, false).unwrap();
    let compact = Module::load("sub", SUB, Dialect::Wgsl, true).unwrap();
    assert!(compact.is_compressed());
    let mut rename = HashMap::new();
    rename.insert("getColor".to_string(), "_ab_getColor".to_string());
    assert_eq!(
      tree.render("", &rename, None, None),
      compact.render("", &rename, None, None)
    );
  }

  #[test]
  fn compiled_round_trip() {
    let module = Module::load("sub", SUB, Dialect::Wgsl, false).unwrap();
    let compiled = module.to_compiled().unwrap();
    let json = compiled.to_json().unwrap();
    let loaded = Module::from_compiled(CompiledModule::from_json(&json).unwrap()).unwrap();
    assert_eq!(loaded.hash, module.hash);
    assert_eq!(loaded.entry, module.entry);
    assert_eq!(loaded.table, module.table);
    let rename = HashMap::new();
    assert_eq!(
      loaded.render("", &rename, None, None),
      module.render("", &rename, None, None)
    );
  }

  #[test]
  fn skewed_compiled_module_is_rejected() {
    let module = Module::load("sub", SUB, Dialect::Wgsl, false).unwrap();
    let mut compiled = module.to_compiled().unwrap();
    compiled.stream.nodes.push(CompactNode(0, 10_000, 1, None));
    match Module::from_compiled(compiled) {
      Err(LinkError::CodecMismatch(err)) => assert_eq!(err.kind, CodecMismatchKind::OutOfBounds),
      other => panic!("unexpected {:?}", other.map(|m| m.name)),
    };
    assert!(matches!(
      CompiledModule::from_json("{\"name\": 1}"),
      Err(LinkError::Serialization(_))
    ));
  }

  #[test]
  fn static_modules_render_verbatim() {
    let module = Module::from_static("lib", "float PI = 3.14;", Dialect::Glsl, None);
    assert!(module.table.symbols.is_empty());
    assert_eq!(module.render("_x_", &HashMap::new(), None, None), "float PI = 3.14;");
  }
}
