use super::ExtractResult;
use super::Extractor;
use crate::error::StructuralErrorType;
use crate::table::Declaration;
use crate::table::DeclarationKind;
use crate::table::FunctionRef;
use crate::table::MemberRef;
use crate::table::ParameterRef;
use crate::table::RefFlags;
use crate::table::StructRef;
use crate::table::SymbolTable;
use crate::table::VariableRef;
use ahash::HashSet;
use ahash::HashSetExt;
use parse_shader::tree::Node;
use parse_shader::tree::SyntaxKind;
use parse_shader::tree::SyntaxTree;

// Layout keys that look like identifiers but never name a declaration.
const IGNORED_IDENTIFIERS: [&str; 3] = ["location", "set", "binding"];

pub fn extract(source: &str, tree: &SyntaxTree, name: Option<&str>) -> ExtractResult<SymbolTable> {
  let ex = Extractor::new(source, tree, name);
  ex.check_errors()?;

  let defined: HashSet<&str> = {
    let mut set = HashSet::new();
    for node in tree.root().children() {
      if node.kind() == SyntaxKind::FunctionDefinition {
        let proto = ex.require(node, SyntaxKind::FunctionPrototype, "prototype")?;
        let name = ex.require(proto, SyntaxKind::Identifier, "name")?;
        set.insert(ex.text(name));
      }
    }
    set
  };

  let mut imports = Vec::new();
  let mut enables = Vec::new();
  let mut declarations = Vec::new();
  for node in tree.root().children() {
    match node.kind() {
      SyntaxKind::Preprocessor => {
        if pragma_verb(&ex, node) == Some("import") {
          let path = ex.require(node, SyntaxKind::String, "module path")?;
          let refs = node
            .child(SyntaxKind::ImportDeclarationList)
            .map(|list| ex.import_list(list))
            .unwrap_or_default();
          imports.push((ex.string_value(path), refs));
        } else if let Some(name) = extension_name(&ex, node) {
          if !enables.iter().any(|e| e == name) {
            enables.push(name.to_string());
          }
        }
      }
      SyntaxKind::FunctionDefinition => {
        let proto = ex.require(node, SyntaxKind::FunctionPrototype, "prototype")?;
        let func = prototype(&ex, proto)?;
        declarations.push(finish(&ex, node, func.name.clone(), Vec::new(), DeclarationKind::Function(func)));
      }
      SyntaxKind::GlobalDeclaration => declarations.push(global_declaration(&ex, node, &defined)?),
      _ => {}
    };
  }

  Ok(SymbolTable::from_declarations(
    declarations,
    Extractor::group_imports(imports),
    enables,
  ))
}

pub fn pragma_verb<'a>(ex: &Extractor<'a>, node: Node<'_>) -> Option<&'a str> {
  let directive = node.child(SyntaxKind::PreprocessorDirective)?;
  if ex.text(directive) != "pragma" {
    return None;
  }
  node.child(SyntaxKind::PragmaVerb).map(|v| ex.text(v))
}

/// Name declared by `#extension NAME : behavior`.
pub fn extension_name<'a>(ex: &Extractor<'a>, node: Node<'_>) -> Option<&'a str> {
  let directive = node.child(SyntaxKind::PreprocessorDirective)?;
  if ex.text(directive) != "extension" {
    return None;
  }
  let rest = &ex.source[directive.loc().1..node.loc().1];
  let name = rest.split(':').next()?.trim();
  (!name.is_empty()).then_some(name)
}

/// Flags from the run of `#pragma` lines directly before `node`.
fn pragma_flags(ex: &Extractor<'_>, node: Node<'_>) -> RefFlags {
  let mut flags = RefFlags::empty();
  let mut prev = node.prev_sibling();
  while let Some(p) = prev {
    if p.kind() != SyntaxKind::Preprocessor {
      break;
    }
    let Some(verb) = pragma_verb(ex, p) else {
      break;
    };
    match verb {
      "export" => flags |= RefFlags::EXPORTED,
      "optional" => flags |= RefFlags::OPTIONAL,
      "global" => flags |= RefFlags::GLOBAL,
      "infer" => flags |= RefFlags::INFER,
      _ => {}
    };
    prev = p.prev_sibling();
  }
  flags
}

fn qualifiers<'a>(ex: &Extractor<'a>, qualified: Node<'_>) -> Vec<&'a str> {
  qualified
    .child(SyntaxKind::TypeQualifierList)
    .map(|list| list.children().map(|q| ex.text(q)).collect())
    .unwrap_or_default()
}

fn is_binding(ex: &Extractor<'_>, qualifier_list: Option<Node<'_>>) -> bool {
  let Some(list) = qualifier_list else {
    return false;
  };
  list.children().any(|q| {
    let text = ex.text(q);
    text == "uniform"
      || text == "buffer"
      || q
        .children()
        .any(|c| c.kind() == SyntaxKind::Identifier && ex.text(c) == "binding")
  })
}

fn members(ex: &Extractor<'_>, body: Node<'_>) -> ExtractResult<Vec<MemberRef>> {
  let mut members = Vec::new();
  for member in body.children() {
    let qualified = ex.require(member, SyntaxKind::QualifiedType, "member type")?;
    let spec = ex.require(qualified, SyntaxKind::TypeSpecifier, "type specifier")?;
    for field in member.children().filter(|n| n.kind() == SyntaxKind::PrivateIdentifier) {
      members.push(MemberRef {
        name: ex.text(field).to_string(),
        ty: ex.text(spec).to_string(),
      });
    }
  }
  Ok(members)
}

fn prototype(ex: &Extractor<'_>, proto: Node<'_>) -> ExtractResult<FunctionRef> {
  let qualified = ex.require(proto, SyntaxKind::QualifiedType, "return type")?;
  let name = ex.require(proto, SyntaxKind::Identifier, "name")?;
  let params = ex.require(proto, SyntaxKind::ParameterList, "parameter list")?;
  let mut parameters = Vec::new();
  for param in params.children() {
    let ty = ex.require(param, SyntaxKind::QualifiedType, "parameter type")?;
    let spec = ex.require(ty, SyntaxKind::TypeSpecifier, "type specifier")?;
    parameters.push(ParameterRef {
      name: param.child(SyntaxKind::Identifier).map(|n| ex.text(n).to_string()),
      ty: ex.text(spec).to_string(),
    });
  }
  let ty = qualified
    .child(SyntaxKind::TypeSpecifier)
    .map(|s| ex.text(s))
    .unwrap_or("void");
  Ok(FunctionRef {
    name: ex.text(name).to_string(),
    ty: ty.to_string(),
    parameters,
    inferred: Vec::new(),
  })
}

fn global_declaration(
  ex: &Extractor<'_>,
  node: Node<'_>,
  defined: &HashSet<&str>,
) -> ExtractResult<Declaration> {
  let inner = node.first_child().ok_or_else(|| {
    ex.error(
      StructuralErrorType::MissingChild {
        parent: node.kind(),
        expected: "declaration",
      },
      node.loc(),
    )
  })?;
  let mut decl = match inner.kind() {
    SyntaxKind::FunctionPrototype => {
      let func = prototype(ex, inner)?;
      let external = !defined.contains(func.name.as_str());
      let mut decl = finish(ex, node, func.name.clone(), Vec::new(), DeclarationKind::Function(func));
      decl.flags.set(RefFlags::EXTERNAL, external);
      decl
    }
    SyntaxKind::VariableDeclaration => {
      let qualified = ex.require(inner, SyntaxKind::QualifiedType, "type")?;
      let spec = qualified.child(SyntaxKind::TypeSpecifier);
      let strukt = spec.and_then(|s| s.child(SyntaxKind::StructDeclaration));
      let mut symbols = Vec::new();
      if let Some(name) = strukt.and_then(|s| s.child(SyntaxKind::Identifier)) {
        symbols.push(ex.text(name).to_string());
      }
      for local in inner.children().filter(|n| n.kind() == SyntaxKind::Local) {
        let name = ex.require(local, SyntaxKind::Identifier, "name")?;
        symbols.push(ex.text(name).to_string());
      }
      let kind = match (strukt, symbols.len()) {
        (Some(s), 1) if inner.child(SyntaxKind::Local).is_none() => {
          let body = ex.require(s, SyntaxKind::StructBody, "struct body")?;
          DeclarationKind::Struct(StructRef {
            members: members(ex, body)?,
          })
        }
        (None, 0) => DeclarationKind::Qualifier,
        _ => DeclarationKind::Variable(VariableRef {
          ty: spec.map(|s| ex.text(s).to_string()),
          qualifier: Some(qualifiers(ex, qualified).join(" ")).filter(|q| !q.is_empty()),
        }),
      };
      let first = symbols.first().cloned().unwrap_or_default();
      let rest = symbols.into_iter().skip(1).collect();
      let mut decl = finish(ex, node, first, rest, kind);
      if is_binding(ex, qualified.child(SyntaxKind::TypeQualifierList)) {
        decl.flags |= RefFlags::BINDING;
      }
      decl
    }
    SyntaxKind::InterfaceBlock => {
      let body = ex.require(inner, SyntaxKind::StructBody, "block body")?;
      let members = members(ex, body)?;
      let instance = inner.child(SyntaxKind::Identifier);
      // Members of an anonymous block are program-wide names bound by the host.
      let (symbols, anonymous) = match instance {
        Some(instance) => (vec![ex.text(instance).to_string()], false),
        None => (members.iter().map(|m| m.name.clone()).collect::<Vec<_>>(), true),
      };
      let mut symbols = symbols.into_iter();
      let first = symbols.next().unwrap_or_default();
      let mut decl = finish(ex, node, first, symbols.collect(), DeclarationKind::Block(StructRef { members }));
      if anonymous {
        decl.flags |= RefFlags::GLOBAL;
      }
      if is_binding(ex, inner.child(SyntaxKind::TypeQualifierList)) {
        decl.flags |= RefFlags::BINDING;
      }
      decl
    }
    _ => finish(ex, node, String::new(), Vec::new(), DeclarationKind::Qualifier),
  };
  if decl.symbols.iter().all(|s| s.is_empty()) {
    decl.symbols.clear();
  }
  Ok(decl)
}

fn finish(
  ex: &Extractor<'_>,
  node: Node<'_>,
  symbol: String,
  rest: Vec<String>,
  kind: DeclarationKind,
) -> Declaration {
  let mut symbols = vec![symbol];
  symbols.extend(rest);
  let mut exclude: Vec<&str> = symbols.iter().map(|s| s.as_str()).collect();
  exclude.extend(IGNORED_IDENTIFIERS);
  if let DeclarationKind::Function(func) = &kind {
    exclude.extend(func.parameters.iter().filter_map(|p| p.name.as_deref()));
  }
  let mut identifiers = Vec::new();
  ex.identifiers(node, &exclude, &mut identifiers);
  Declaration {
    at: node.loc().0,
    symbols,
    flags: pragma_flags(ex, node),
    kind,
    identifiers,
  }
}
