use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// The shading language a module is written in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
  Wgsl,
  Glsl,
}

impl Dialect {
  pub fn from_extension(ext: &str) -> Option<Dialect> {
    match ext.to_ascii_lowercase().as_str() {
      "wgsl" => Some(Dialect::Wgsl),
      "glsl" | "vert" | "frag" | "comp" | "geom" | "tesc" | "tese" => Some(Dialect::Glsl),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Dialect::Wgsl => "wgsl",
      Dialect::Glsl => "glsl",
    }
  }
}

impl fmt::Display for Dialect {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Dialect {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Dialect::from_extension(s).ok_or_else(|| format!("unknown shader dialect `{s}`"))
  }
}
