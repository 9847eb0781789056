use crate::table::SymbolTable;
use ahash::HashSet;
use ahash::HashSetExt;
use serde::Deserialize;
use serde::Serialize;

/// Upward closure of one declaration: the symbol indices of itself and of every declaration that
/// transitively references it.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ShakeOp {
  pub at: usize,
  pub deps: Vec<u32>,
}

/// Per-unit reachability table, computed once and reused for any number of keep-sets.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShakeTable(pub Vec<ShakeOp>);

impl ShakeTable {
  pub fn ops(&self) -> &[ShakeOp] {
    &self.0
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn get(&self, at: usize) -> Option<&ShakeOp> {
    self.0.iter().find(|op| op.at == at)
  }
}

pub fn analyze(table: &SymbolTable) -> ShakeTable {
  let _span = tracing::debug_span!("analyze", declarations = table.declarations.len()).entered();
  let n = table.symbols.len();
  // `graph[i]` lists the symbols whose declarations reference symbol `i`.
  let mut graph: Vec<Vec<usize>> = vec![Vec::new(); n];
  for decl in table.declarations.iter() {
    for id in decl.identifiers.iter() {
      let Some(from) = table.index_of(id) else {
        continue;
      };
      for symbol in decl.symbols.iter() {
        if let Some(to) = table.index_of(symbol) {
          if !graph[from].contains(&to) {
            graph[from].push(to);
          }
        }
      }
    }
  }

  let mut ops = Vec::new();
  for decl in table.declarations.iter() {
    let mut visited = HashSet::new();
    let mut stack: Vec<usize> = decl
      .symbols
      .iter()
      .filter_map(|s| table.index_of(s))
      .collect();
    while let Some(i) = stack.pop() {
      if !visited.insert(i) {
        continue;
      }
      stack.extend(graph[i].iter().copied().filter(|d| !visited.contains(d)));
    }
    if visited.is_empty() {
      continue;
    }
    let mut deps: Vec<u32> = visited.into_iter().map(|i| i as u32).collect();
    deps.sort_unstable();
    ops.push(ShakeOp { at: decl.at, deps });
  }
  ShakeTable(ops)
}

/// Offsets of declarations to remove when only `keep` (and what it needs) must survive.
pub fn resolve_shake_ops<'k>(
  table: &ShakeTable,
  keep: impl IntoIterator<Item = &'k str>,
  symbols: &[String],
) -> Vec<usize> {
  let keep: HashSet<u32> = keep
    .into_iter()
    .filter_map(|k| symbols.iter().position(|s| s == k))
    .map(|i| i as u32)
    .collect();
  table
    .0
    .iter()
    .filter(|op| !op.deps.iter().any(|d| keep.contains(d)))
    .map(|op| op.at)
    .collect()
}
