use ahash::HashMap;
use ahash::HashMapExt;
use itertools::Itertools;
use parse_shader::dialect::Dialect;
use serde::Deserialize;
use serde::Serialize;

/// Ordered `name → value` constants injected into a linked program.
///
/// Names starting with `@` are not constants but attribute substitutions, e.g. `@group(GROUP)` →
/// `@group(0)`.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Defines(Vec<(String, String)>);

impl Defines {
  pub fn new() -> Defines {
    Defines::default()
  }

  /// Sets `name`, keeping its original position if it was already present.
  pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
    let (name, value) = (name.into(), value.into());
    match self.0.iter_mut().find(|(k, _)| *k == name) {
      Some(entry) => entry.1 = value,
      None => self.0.push((name, value)),
    };
  }

  pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Defines {
    self.set(name, value);
    self
  }

  pub fn get(&self, name: &str) -> Option<&str> {
    self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
  }

  pub fn merge(&mut self, other: &Defines) {
    for (k, v) in other.iter() {
      self.set(k, v);
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Defines {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    let mut defines = Defines::new();
    for (k, v) in iter {
      defines.set(k, v);
    }
    defines
  }
}

pub fn default_preamble(dialect: Dialect) -> &'static str {
  match dialect {
    Dialect::Wgsl => "",
    Dialect::Glsl => "#version 450",
  }
}

fn is_attribute(name: &str) -> bool {
  name.starts_with('@')
}

/// Renders constants as `const NAME = value;` (WGSL) or `#define NAME value` (GLSL, where `false`
/// means undefined).
pub fn define_constants(dialect: Dialect, defines: &Defines) -> String {
  defines
    .iter()
    .filter(|(k, _)| !is_attribute(k))
    .filter_map(|(k, v)| match dialect {
      Dialect::Wgsl => Some(format!("const {} = {};", k, v)),
      Dialect::Glsl if v == "false" => None,
      Dialect::Glsl => Some(format!("#define {} {}", k, v)),
    })
    .join("\n")
}

pub fn define_enables(dialect: Dialect, enables: &[String]) -> String {
  if enables.is_empty() {
    return String::new();
  }
  match dialect {
    Dialect::Wgsl => format!("enable {};", enables.iter().join(", ")),
    Dialect::Glsl => enables
      .iter()
      .map(|e| format!("#extension {} : enable", e))
      .join("\n"),
  }
}

/// Attribute substitutions applied to every linked fragment.
pub fn static_renames(defines: &Defines) -> HashMap<String, String> {
  let mut renames = HashMap::new();
  for (k, v) in defines.iter().filter(|(k, _)| is_attribute(k)) {
    renames.insert(k.to_string(), v.to_string());
  }
  renames
}

/// Whether a dropped span also swallows following `;` and starts a fresh line.
pub(crate) fn collapses_separators(dialect: Dialect) -> bool {
  dialect == Dialect::Wgsl
}
