use crate::err::LinkError;
use crate::unit::content_hash;
use crate::unit::CompiledModule;
use crate::unit::Module;
use dashmap::DashMap;
use parse_shader::dialect::Dialect;

pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct CacheKey {
  pub name: String,
  pub hash: u64,
  pub dialect: Dialect,
  pub compressed: bool,
}

impl CacheKey {
  pub fn new(name: &str, code: &str, dialect: Dialect, compressed: bool) -> CacheKey {
    CacheKey {
      name: name.to_string(),
      hash: content_hash(dialect, code),
      dialect,
      compressed,
    }
  }
}

/// Loaded modules shared between link requests.
///
/// Entries are inserted only when absent and never replaced, so concurrent readers always see a
/// complete module. Once `capacity` entries are held, new modules are returned without being
/// cached.
pub struct ModuleCache {
  modules: DashMap<CacheKey, Module>,
  capacity: usize,
}

impl Default for ModuleCache {
  fn default() -> Self {
    ModuleCache::new(DEFAULT_CAPACITY)
  }
}

impl ModuleCache {
  pub fn new(capacity: usize) -> ModuleCache {
    ModuleCache {
      modules: DashMap::new(),
      capacity,
    }
  }

  pub fn len(&self) -> usize {
    self.modules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.modules.is_empty()
  }

  pub fn get(&self, key: &CacheKey) -> Option<Module> {
    self.modules.get(key).map(|m| m.value().clone())
  }

  fn insert(&self, key: CacheKey, module: Module) -> Module {
    if self.modules.len() >= self.capacity && !self.modules.contains_key(&key) {
      tracing::debug!(name = %key.name, capacity = self.capacity, "module cache full");
      return module;
    }
    self.modules.entry(key).or_insert(module).value().clone()
  }

  pub fn load(&self, name: &str, code: &str, dialect: Dialect, compressed: bool) -> Result<Module, LinkError> {
    let key = CacheKey::new(name, code, dialect, compressed);
    if let Some(module) = self.get(&key) {
      tracing::debug!(name, hash = key.hash, "module cache hit");
      return Ok(module);
    }
    let module = Module::load(name, code, dialect, compressed)?;
    Ok(self.insert(key, module))
  }

  /// Restores a compiled module. A stream that does not decode evicts whatever is cached for the
  /// same source.
  pub fn load_compiled(&self, compiled: CompiledModule) -> Result<Module, LinkError> {
    let key = CacheKey::new(&compiled.name, &compiled.code, compiled.dialect, true);
    if let Some(module) = self.get(&key) {
      return Ok(module);
    }
    match Module::from_compiled(compiled) {
      Ok(module) => Ok(self.insert(key, module)),
      Err(err) => {
        tracing::warn!(name = %key.name, error = %err, "discarding compiled module");
        self.modules.remove(&key);
        Err(err)
      }
    }
  }
}
