use crate::bundle::parse_link_alias;
use crate::bundle::Bundle;
use crate::bundle::BundleMap;
use crate::dialect::define_constants;
use crate::dialect::define_enables;
use crate::dialect::static_renames;
use crate::dialect::Defines;
use crate::err::LinkError;
use crate::hash::to_base36;
use ahash::HashMap;
use ahash::HashMapExt;
use ahash::HashSet;
use ahash::HashSetExt;
use parse_shader::dialect::Dialect;
use std::collections::VecDeque;
use symbol_shader::resolve_shake_ops;
use symbol_shader::table::FunctionRef;
use symbol_shader::table::RefFlags;

/// One bundle of the link graph, interned by key.
struct Fragment<'a> {
  bundle: &'a Bundle,
  /// Fragments this one refers to, in discovery order.
  deps: Vec<usize>,
  /// Import path or link placeholder → fragment.
  imported: HashMap<&'a str, usize>,
  /// Link placeholder → symbol it resolves to, when they differ.
  aliased: HashMap<&'a str, String>,
  /// Local names that, once referenced by a surviving declaration, ask another fragment for a
  /// symbol.
  requests: Vec<Request<'a>>,
}

struct Request<'a> {
  /// Import or link placeholder as spelled in this fragment.
  name: &'a str,
  target: usize,
  symbol: String,
}

struct Graph<'a> {
  fragments: Vec<Fragment<'a>>,
  index: HashMap<u64, usize>,
  queue: VecDeque<usize>,
}

impl<'a> Graph<'a> {
  fn intern(&mut self, bundle: &'a Bundle) -> usize {
    if let Some(&i) = self.index.get(&bundle.key) {
      return i;
    }
    let i = self.fragments.len();
    self.fragments.push(Fragment {
      bundle,
      deps: Vec::new(),
      imported: HashMap::new(),
      aliased: HashMap::new(),
      requests: Vec::new(),
    });
    self.index.insert(bundle.key, i);
    self.queue.push_back(i);
    i
  }

  fn request(&mut self, from: usize, name: &'a str, target: usize, symbol: &str) {
    self.fragments[from].requests.push(Request {
      name,
      target,
      symbol: symbol.to_string(),
    });
  }

  fn depend(&mut self, from: usize, to: usize) {
    let deps = &mut self.fragments[from].deps;
    if from != to && !deps.contains(&to) {
      deps.push(to);
    }
  }
}

/// Discovers every bundle reachable from `root` through imports and links, breadth first.
fn load_graph<'a>(root: &'a Bundle, libraries: &'a BundleMap) -> Result<Graph<'a>, LinkError> {
  let mut graph = Graph {
    fragments: Vec::new(),
    index: HashMap::new(),
    queue: VecDeque::new(),
  };
  graph.intern(root);

  while let Some(i) = graph.queue.pop_front() {
    let bundle = graph.fragments[i].bundle;
    let module = &bundle.module;
    let table = &module.table;

    for m in table.modules.iter() {
      let chunk = bundle
        .libs
        .get(&m.name)
        .or_else(|| libraries.get(&m.name))
        .ok_or_else(|| LinkError::UnresolvedImport {
          module: m.name.clone(),
          importer: module.name.clone(),
        })?;
      let j = graph.intern(chunk);
      graph.depend(i, j);
      graph.fragments[i].imported.insert(m.name.as_str(), j);
      for import in m.imports.iter() {
        graph.request(i, &import.name, j, &import.imported);
      }
    }

    let mut links: HashMap<&str, (&'a Bundle, Option<&str>)> = HashMap::new();
    for (key, link) in bundle.links.iter() {
      let (name, alias) = parse_link_alias(key);
      links.insert(name, (link, alias));
    }
    for decl in table.externals() {
      let Some(name) = decl.symbols.first() else {
        continue;
      };
      let Some(&(chunk, alias)) = links.get(name.as_str()) else {
        if decl.has(RefFlags::OPTIONAL) {
          tracing::debug!(module = %module.name, link = %name, "optional link left unresolved");
          continue;
        }
        return Err(LinkError::UnresolvedLink {
          name: name.clone(),
          importer: module.name.clone(),
        });
      };
      let j = graph.intern(chunk);
      graph.depend(i, j);
      graph.fragments[i].imported.insert(name.as_str(), j);
      let symbol = chunk.entry().or(alias).unwrap_or(name.as_str()).to_string();
      graph.request(i, name, j, &symbol);
      if symbol != *name {
        graph.fragments[i].aliased.insert(name.as_str(), symbol);
      }
    }
  }
  Ok(graph)
}

/// Declarations each fragment drops, and whether anything of it is needed at all.
struct Demand {
  live: Vec<bool>,
  shaken: Vec<HashSet<usize>>,
}

/// Propagates keep-sets outward from the root.
///
/// A fragment is asked for a symbol only when a declaration of its importer that survives shaking
/// names the import or link placeholder resolving to it. Keep-sets only grow, so revisiting a
/// fragment whenever its set changes reaches a fixed point even through cycles. The root keeps
/// everything when `root_keep` is `None`.
fn resolve_demand(fragments: &[Fragment<'_>], root_keep: Option<HashSet<String>>) -> Demand {
  let n = fragments.len();
  let mut keep: Vec<Option<HashSet<String>>> = vec![Some(HashSet::new()); n];
  let mut shaken: Vec<HashSet<usize>> = vec![HashSet::new(); n];
  let mut queued = vec![false; n];
  let mut queue = VecDeque::new();
  if n > 0 {
    keep[0] = root_keep;
    queued[0] = true;
    queue.push_back(0);
  }

  while let Some(i) = queue.pop_front() {
    queued[i] = false;
    let module = &fragments[i].bundle.module;
    let table = &module.table;
    shaken[i] = match &keep[i] {
      Some(k) => resolve_shake_ops(&module.shake, k.iter().map(|s| s.as_str()), &table.symbols)
        .into_iter()
        .collect(),
      None => HashSet::new(),
    };
    let used: HashSet<&str> = table
      .declarations
      .iter()
      .filter(|d| !shaken[i].contains(&d.at))
      .flat_map(|d| d.identifiers.iter().map(|id| id.as_str()))
      .collect();

    for request in fragments[i].requests.iter() {
      if !used.contains(request.name) {
        continue;
      }
      let Some(k) = keep[request.target].as_mut() else {
        continue;
      };
      if k.insert(request.symbol.clone()) && !queued[request.target] {
        queued[request.target] = true;
        queue.push_back(request.target);
      }
    }
  }

  let live = keep
    .iter()
    .map(|k| k.as_ref().map_or(true, |k| !k.is_empty()))
    .collect();
  Demand { live, shaken }
}

/// Emission order: every fragment after the fragments it depends on.
///
/// Among ready fragments the earliest discovered goes first. When only cycles remain, the fragment
/// with the fewest unplaced dependencies is hoisted, ties going to the latest discovered, which
/// places leaves of the cycle before the fragments that reached them.
fn emission_order(fragments: &[Fragment<'_>]) -> Vec<usize> {
  let n = fragments.len();
  let mut placed = vec![false; n];
  let mut order = Vec::with_capacity(n);
  while order.len() < n {
    let outstanding = |i: usize| fragments[i].deps.iter().filter(|&&d| !placed[d]).count();
    let next = (0..n)
      .filter(|&i| !placed[i])
      .find(|&i| outstanding(i) == 0)
      .or_else(|| {
        (0..n)
          .filter(|&i| !placed[i])
          .min_by_key(|&i| (outstanding(i), std::cmp::Reverse(i)))
      });
    let Some(next) = next else {
      break;
    };
    if outstanding(next) > 0 {
      tracing::debug!(module = %fragments[next].bundle.name(), "hoisting fragment out of a cycle");
    }
    placed[next] = true;
    order.push(next);
  }
  order
}

/// Reserves `_xxxx_` from the bundle key, lengthening it until it is unique.
fn reserve_namespace(key: u64, taken: &mut HashMap<String, u64>) -> String {
  let digits = to_base36(key);
  let mut len = 4;
  loop {
    let ns = if len <= digits.len() {
      format!("_{}_", &digits[..len])
    } else {
      format!("_{}{}_", digits, len)
    };
    match taken.get(&ns) {
      Some(&other) if other != key => len += 1,
      _ => {
        taken.insert(ns.clone(), key);
        return ns;
      }
    }
  }
}

/// Names shared by all fragments while they are renamed.
#[derive(Default)]
struct Scope<'a> {
  /// Namespaced name → global name, for globals that keep their spelling.
  fixed: HashMap<String, String>,
  exists: HashSet<String>,
  visible: HashSet<String>,
  signatures: HashMap<String, &'a FunctionRef>,
  /// Inferred names, namespaced, → what they resolved to.
  infers: HashMap<String, String>,
}

impl<'a> Scope<'a> {
  fn resolve(&self, name: String) -> String {
    match self.fixed.get(&name) {
      Some(global) => global.clone(),
      None => name,
    }
  }

  fn follow_infers(&self, mut name: String) -> String {
    let mut seen = HashSet::new();
    while let Some(next) = self.infers.get(&name) {
      if !seen.insert(name.clone()) {
        break;
      }
      name = next.clone();
    }
    name
  }

  fn check(&self, what: &str, name: &str, from: &str, target: &str) {
    if !self.exists.contains(target) {
      tracing::warn!(name, from, "{} does not exist", what);
    } else if !self.visible.contains(target) {
      tracing::warn!(name, from, "{} is private", what);
    }
  }
}

/// Links `root` and everything it reaches into one program.
pub fn link_graph(
  dialect: Dialect,
  preamble: &str,
  root: &Bundle,
  libraries: &BundleMap,
) -> Result<String, LinkError> {
  let _span = tracing::debug_span!("link", root = %root.name(), ?dialect).entered();
  let graph = load_graph(root, libraries)?;
  let fragments = &graph.fragments;
  let root_keep: Option<HashSet<String>> = root.entry().map(|entry| [entry.to_string()].into_iter().collect());
  let demand = resolve_demand(fragments, root_keep);
  let order: Vec<usize> = emission_order(fragments)
    .into_iter()
    .filter(|&i| {
      if !demand.live[i] {
        tracing::debug!(module = %fragments[i].bundle.name(), "nothing requested, fragment dropped");
      }
      demand.live[i]
    })
    .collect();

  let mut enables: Vec<String> = Vec::new();
  let mut defines = Defines::new();
  for &i in order.iter() {
    let bundle = fragments[i].bundle;
    for enable in bundle.module.table.enables.iter() {
      if !enables.contains(enable) {
        enables.push(enable.clone());
      }
    }
    defines.merge(&bundle.defines);
  }
  let statics = static_renames(&defines);

  // Namespaces and the names every fragment makes available.
  let mut taken = HashMap::new();
  let mut namespaces = vec![String::new(); fragments.len()];
  let mut scope = Scope::default();
  for &i in order.iter() {
    let module = &fragments[i].bundle.module;
    let table = &module.table;
    let ns = if i == 0 {
      String::new()
    } else {
      reserve_namespace(fragments[i].bundle.key, &mut taken)
    };
    tracing::debug!(module = %module.name, namespace = %ns, "assigned namespace");
    for symbol in table.symbols.iter() {
      let renamed = if table.is_global(symbol) {
        scope.fixed.insert(format!("{}{}", ns, symbol), symbol.clone());
        symbol.clone()
      } else {
        format!("{}{}", ns, symbol)
      };
      if table.is_visible(symbol) {
        scope.visible.insert(renamed.clone());
      }
      scope.exists.insert(renamed);
    }
    for func in table.exports().filter_map(|d| d.function()) {
      scope.signatures.insert(format!("{}{}", ns, func.name), func);
    }
    namespaces[i] = ns;
  }

  let mut program: Vec<String> = Vec::new();
  if !preamble.is_empty() {
    program.push(preamble.to_string());
  }
  let en = define_enables(dialect, &enables);
  if !en.is_empty() {
    program.push(en);
  }
  let def = define_constants(dialect, &defines);
  if !def.is_empty() {
    program.push(def);
  }

  // Global declarations already emitted, by (name, content hash).
  let mut emitted: HashSet<(String, u64)> = HashSet::new();
  let mut global_sources: HashMap<String, u64> = HashMap::new();

  for &i in order.iter() {
    let fragment = &fragments[i];
    let module = &fragment.bundle.module;
    let table = &module.table;
    let ns = &namespaces[i];

    let mut rename: HashMap<String, String> = HashMap::new();
    if !ns.is_empty() {
      for symbol in table.symbols.iter() {
        if !table.is_global(symbol) {
          rename.insert(symbol.clone(), format!("{}{}", ns, symbol));
        }
      }
    }

    for m in table.modules.iter() {
      let Some(&j) = fragment.imported.get(m.name.as_str()).filter(|&&j| demand.live[j]) else {
        continue;
      };
      for import in m.imports.iter() {
        let target = scope.resolve(format!("{}{}", namespaces[j], import.imported));
        scope.check("import", &import.name, &m.name, &target);
        scope.infers.insert(format!("{}{}", ns, import.name), target.clone());
        rename.insert(import.name.clone(), target);
      }
    }

    let mut optionals: HashSet<String> = HashSet::new();
    for decl in table.externals() {
      let Some(name) = decl.symbols.first() else {
        continue;
      };
      let Some(&j) = fragment.imported.get(name.as_str()) else {
        optionals.insert(name.clone());
        continue;
      };
      if !demand.live[j] {
        continue;
      }
      let resolved = fragment.aliased.get(name.as_str()).unwrap_or(name);
      let target = scope.resolve(format!("{}{}", namespaces[j], resolved));
      scope.check("link", name, resolved, &target);
      rename.insert(name.clone(), target.clone());

      let Some(inferred) = decl.function().map(|f| &f.inferred) else {
        continue;
      };
      let signature = scope.signatures.get(&target).copied();
      for infer in inferred.iter() {
        let Some(ty) = signature.and_then(|s| s.type_at(infer.at)) else {
          tracing::warn!(name = %infer.name, link = %name, "cannot infer type without a signature");
          continue;
        };
        let linked = &fragments[j].bundle.module.table;
        let ty = if linked.has_symbol(ty) {
          scope.resolve(format!("{}{}", namespaces[j], ty))
        } else {
          ty.to_string()
        };
        let ty = scope.follow_infers(ty);
        scope.infers.insert(format!("{}{}", ns, infer.name), ty.clone());
        rename.insert(infer.name.clone(), ty);
      }
    }

    for (k, v) in statics.iter() {
      rename.insert(k.clone(), v.clone());
    }

    let mut shaken = demand.shaken[i].clone();

    for decl in table.declarations.iter().filter(|d| d.has(RefFlags::GLOBAL)) {
      if shaken.contains(&decl.at) {
        continue;
      }
      let Some(symbol) = decl.symbols.first() else {
        continue;
      };
      if let Some(&other) = global_sources.get(symbol) {
        if other != module.hash {
          tracing::warn!(global = %symbol, module = %module.name, "global declared by different modules");
        }
      }
      global_sources.insert(symbol.clone(), module.hash);
      if !emitted.insert((symbol.clone(), module.hash)) {
        tracing::debug!(global = %symbol, module = %module.name, "global already emitted");
        shaken.insert(decl.at);
      }
    }

    let code = module.render(ns, &rename, Some(&shaken), Some(&optionals));
    let code = code.trim_end();
    if !code.is_empty() {
      program.push(code.to_string());
    }
  }

  Ok(program.join("\n"))
}
