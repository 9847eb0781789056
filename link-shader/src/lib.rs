use bundle::bind_bundle;
use bundle::parse_link_alias;
use parse_shader::dialect::Dialect;

pub mod bundle;
pub mod cache;
pub mod codec;
pub mod dialect;
pub mod err;
pub mod hash;
mod link;
pub mod rewrite;
pub mod span;
pub mod unit;
pub mod walk;

pub use bundle::Bundle;
pub use bundle::BundleMap;
pub use cache::ModuleCache;
pub use dialect::Defines;
pub use err::LinkError;
pub use unit::CompiledModule;
pub use unit::Module;
pub use unit::VirtualRender;

/// Settings for one link request.
#[derive(Clone, Debug)]
pub struct LinkOptions {
  pub dialect: Dialect,
  preamble: Option<String>,
  /// Load sources straight into their compact form.
  pub compressed: bool,
}

impl LinkOptions {
  pub fn new(dialect: Dialect) -> LinkOptions {
    LinkOptions {
      dialect,
      preamble: None,
      compressed: false,
    }
  }

  /// Replaces the dialect's default header line(s).
  pub fn with_preamble(mut self, preamble: impl Into<String>) -> LinkOptions {
    self.preamble = Some(preamble.into());
    self
  }

  pub fn with_compressed(mut self, compressed: bool) -> LinkOptions {
    self.compressed = compressed;
    self
  }

  pub fn preamble(&self) -> &str {
    self
      .preamble
      .as_deref()
      .unwrap_or_else(|| dialect::default_preamble(self.dialect))
  }
}

/// Links a bundle whose imports are satisfied by its own libraries or by `libraries`.
pub fn link_bundle(options: &LinkOptions, bundle: &Bundle, libraries: &BundleMap) -> Result<String, LinkError> {
  link::link_graph(options.dialect, options.preamble(), bundle, libraries)
}

/// Links `module` with `links` filling its placeholders and `defines` injected.
pub fn link_module(
  options: &LinkOptions,
  module: Module,
  libraries: &BundleMap,
  links: &BundleMap,
  defines: &Defines,
) -> Result<String, LinkError> {
  let bundle = bind_bundle(Bundle::new(module), links, defines);
  link_bundle(options, &bundle, libraries)
}

/// Parses and links source code.
///
/// `libraries` are `(import path, code)` pairs. `links` are `(name, code)` pairs where the name may
/// be `placeholder:entry`; each linked module is bound to that entry, or to the placeholder's own
/// name, so the same code linked under two names yields two fragments.
///
/// # Examples
///
/// ```
/// use link_shader::{link_code, Defines, LinkOptions};
/// use parse_shader::dialect::Dialect;
///
/// let main = "@link fn getColor() -> vec4<f32>;\nfn main() { let c = getColor(); }\n";
/// let color = "fn getColor() -> vec4<f32> { return vec4<f32>(1.0); }\n";
/// let options = LinkOptions::new(Dialect::Wgsl);
/// let code = link_code(&options, main, &[], &[("getColor", color)], &Defines::new(), None).unwrap();
/// let lines: Vec<&str> = code.lines().collect();
/// assert_eq!(lines.len(), 2);
/// assert!(lines[0].starts_with("fn _") && lines[0].contains("_getColor() -> vec4<f32>"));
/// assert!(lines[1].starts_with("fn main() { let c = _"));
/// ```
pub fn link_code(
  options: &LinkOptions,
  code: &str,
  libraries: &[(&str, &str)],
  links: &[(&str, &str)],
  defines: &Defines,
  cache: Option<&ModuleCache>,
) -> Result<String, LinkError> {
  let load = |name: &str, code: &str| match cache {
    Some(cache) => cache.load(name, code, options.dialect, options.compressed),
    None => Module::load(name, code, options.dialect, options.compressed),
  };

  let main = load("main", code)?;
  let mut libs = BundleMap::new();
  for &(name, code) in libraries.iter() {
    libs.insert(name.to_string(), Bundle::new(load(name, code)?));
  }
  let mut linked = BundleMap::new();
  for &(key, code) in links.iter() {
    let (name, alias) = parse_link_alias(key);
    let module = load(name, code)?.bind_entry_point(Some(alias.unwrap_or(name)));
    linked.insert(key.to_string(), Bundle::new(module));
  }
  link_module(options, main, &libs, &linked, defines)
}
