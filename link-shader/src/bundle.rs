use crate::dialect::Defines;
use crate::hash::stable_hash;
use crate::unit::Module;
use std::collections::BTreeMap;

/// Bundles by import path or link name. Link names may carry an alias, `name:imported`.
pub type BundleMap = BTreeMap<String, Bundle>;

/// A module together with what it was bound to: its own libraries, the modules satisfying its link
/// placeholders, and defines.
#[derive(Clone, Debug)]
pub struct Bundle {
  pub module: Module,
  pub libs: BundleMap,
  pub links: BundleMap,
  pub defines: Defines,
  /// Identity used to merge repeated uses of one bundle and to derive its namespace.
  pub key: u64,
}

impl Bundle {
  pub fn new(module: Module) -> Bundle {
    let key = module.identity();
    Bundle {
      module,
      libs: BundleMap::new(),
      links: BundleMap::new(),
      defines: Defines::new(),
      key,
    }
  }

  pub fn entry(&self) -> Option<&str> {
    self.module.entry.as_deref()
  }

  pub fn name(&self) -> &str {
    &self.module.name
  }

  pub fn with_libs(mut self, libs: BundleMap) -> Bundle {
    self.libs.extend(libs);
    self.key = self.rekey();
    self
  }

  fn rekey(&self) -> u64 {
    let libs: Vec<(&str, u64)> = self.libs.iter().map(|(k, b)| (k.as_str(), b.key)).collect();
    let links: Vec<(&str, u64)> = self.links.iter().map(|(k, b)| (k.as_str(), b.key)).collect();
    stable_hash(&(self.module.identity(), libs, links, &self.defines))
  }
}

impl From<Module> for Bundle {
  fn from(module: Module) -> Self {
    Bundle::new(module)
  }
}

/// Splits a link name into the placeholder it satisfies and the symbol it should resolve to.
pub fn parse_link_alias(key: &str) -> (&str, Option<&str>) {
  match key.split_once(':') {
    Some((name, imported)) if !imported.is_empty() => (name, Some(imported)),
    Some((name, _)) => (name, None),
    None => (key, None),
  }
}

/// Attaches `links` and `defines` to `bundle`.
///
/// Links for names the module has no placeholder for are ignored. The result gets a new key, so
/// the same module bound differently links as a separate fragment.
pub fn bind_bundle(mut bundle: Bundle, links: &BundleMap, defines: &Defines) -> Bundle {
  if links.is_empty() && defines.is_empty() {
    return bundle;
  }
  for (key, link) in links.iter() {
    let (name, _) = parse_link_alias(key);
    if !bundle.module.table.is_linkable(name) {
      tracing::debug!(module = %bundle.module.name, link = name, "ignoring link without placeholder");
      continue;
    }
    bundle.links.insert(key.clone(), link.clone());
  }
  bundle.defines.merge(defines);
  bundle.key = bundle.rekey();
  bundle
}
