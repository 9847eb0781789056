use super::ExtractResult;
use super::Extractor;
use crate::error::StructuralErrorType;
use crate::table::Declaration;
use crate::table::DeclarationKind;
use crate::table::FunctionRef;
use crate::table::InferRef;
use crate::table::MemberRef;
use crate::table::ParameterRef;
use crate::table::RefFlags;
use crate::table::StructRef;
use crate::table::SymbolTable;
use crate::table::VariableRef;
use parse_shader::tree::Node;
use parse_shader::tree::SyntaxKind;
use parse_shader::tree::SyntaxTree;

/// Splits `@name(args)` into its name and optional trimmed argument text.
pub fn attribute_parts(text: &str) -> (&str, Option<&str>) {
  let text = text.strip_prefix('@').unwrap_or(text);
  match text.split_once('(') {
    Some((name, rest)) => (name.trim(), Some(rest.trim_end().trim_end_matches(')').trim())),
    None => (text.trim(), None),
  }
}

pub fn flags_from_attributes<'s>(names: impl IntoIterator<Item = &'s str>) -> RefFlags {
  let mut flags = RefFlags::empty();
  for name in names {
    match name {
      "export" => flags |= RefFlags::EXPORTED,
      "link" => flags |= RefFlags::EXTERNAL,
      "optional" => flags |= RefFlags::OPTIONAL,
      "global" => flags |= RefFlags::GLOBAL,
      "infer" => flags |= RefFlags::INFER,
      "group" => flags |= RefFlags::BINDING,
      _ => {}
    };
  }
  flags
}

pub fn extract(source: &str, tree: &SyntaxTree, name: Option<&str>) -> ExtractResult<SymbolTable> {
  let ex = Extractor::new(source, tree, name);
  ex.check_errors()?;

  let mut imports = Vec::new();
  let mut enables = Vec::new();
  let mut declarations = Vec::new();
  for node in tree.root().children() {
    match node.kind() {
      SyntaxKind::ImportDeclaration => {
        let path = ex.require(node, SyntaxKind::String, "module path")?;
        let refs = node
          .child(SyntaxKind::ImportDeclarationList)
          .map(|list| ex.import_list(list))
          .unwrap_or_default();
        imports.push((ex.string_value(path), refs));
      }
      SyntaxKind::EnableDirective => {
        for name in node.children().filter(|n| n.kind() == SyntaxKind::EnableName) {
          let name = ex.text(name).to_string();
          if !enables.contains(&name) {
            enables.push(name);
          }
        }
      }
      SyntaxKind::LocalDeclaration => declarations.push(declaration(&ex, node)?),
      _ => {}
    };
  }

  Ok(SymbolTable::from_declarations(
    declarations,
    Extractor::group_imports(imports),
    enables,
  ))
}

fn attributes<'a>(ex: &Extractor<'a>, list: Option<Node<'_>>) -> Vec<&'a str> {
  list
    .map(|list| {
      list
        .children()
        .filter(|n| n.kind() == SyntaxKind::Attribute)
        .map(|n| ex.text(n))
        .collect()
    })
    .unwrap_or_default()
}

fn find_infer(attrs: &[&str]) -> Option<String> {
  attrs.iter().find_map(|a| match attribute_parts(a) {
    ("infer", Some(arg)) if !arg.is_empty() => Some(arg.to_string()),
    _ => None,
  })
}

fn declaration(ex: &Extractor<'_>, node: Node<'_>) -> ExtractResult<Declaration> {
  let at = node.loc().0;
  let inner = node.first_child().ok_or_else(|| {
    ex.error(
      StructuralErrorType::MissingChild {
        parent: node.kind(),
        expected: "declaration",
      },
      node.loc(),
    )
  })?;
  let attrs = attributes(ex, inner.child(SyntaxKind::AttributeList));
  let mut flags = flags_from_attributes(attrs.iter().map(|a| attribute_parts(a).0));

  let (symbol, kind, exclude) = match inner.kind() {
    SyntaxKind::FunctionDeclaration => {
      let func = function(ex, inner)?;
      if func.name == "main" {
        flags |= RefFlags::EXPORTED;
      }
      let exclude: Vec<String> = func.parameters.iter().filter_map(|p| p.name.clone()).collect();
      (func.name.clone(), DeclarationKind::Function(func), exclude)
    }
    SyntaxKind::GlobalVariableDeclaration => {
      let decl = ex.require(inner, SyntaxKind::VariableDeclaration, "variable declaration")?;
      let name = ex.require(decl, SyntaxKind::Identifier, "name")?;
      let variable = VariableRef {
        ty: decl.child(SyntaxKind::Type).map(|t| ex.text(t).to_string()),
        qualifier: decl
          .child(SyntaxKind::VariableQualifier)
          .map(|q| ex.text(q).trim_matches(['<', '>']).trim().to_string()),
      };
      (ex.text(name).to_string(), DeclarationKind::Variable(variable), Vec::new())
    }
    SyntaxKind::GlobalConstantDeclaration | SyntaxKind::TypeAliasDeclaration => {
      let name = ex.require(inner, SyntaxKind::Identifier, "name")?;
      let variable = VariableRef {
        ty: inner.child(SyntaxKind::Type).map(|t| ex.text(t).to_string()),
        qualifier: inner.child(SyntaxKind::Keyword).map(|k| ex.text(k).to_string()),
      };
      let kind = if inner.kind() == SyntaxKind::TypeAliasDeclaration {
        DeclarationKind::Alias(variable)
      } else {
        DeclarationKind::Constant(variable)
      };
      (ex.text(name).to_string(), kind, Vec::new())
    }
    SyntaxKind::StructDeclaration => {
      let name = ex.require(inner, SyntaxKind::Identifier, "name")?;
      let mut members = Vec::new();
      if let Some(body) = inner.child(SyntaxKind::StructBody) {
        for member in body.children() {
          let field = ex.require(member, SyntaxKind::PrivateIdentifier, "field name")?;
          let ty = ex.require(member, SyntaxKind::Type, "field type")?;
          members.push(MemberRef {
            name: ex.text(field).to_string(),
            ty: ex.text(ty).to_string(),
          });
        }
      }
      (ex.text(name).to_string(), DeclarationKind::Struct(StructRef { members }), Vec::new())
    }
    _ => {
      return Err(ex.error(
        StructuralErrorType::MissingChild {
          parent: node.kind(),
          expected: "declaration",
        },
        node.loc(),
      ))
    }
  };

  let mut exclude: Vec<&str> = exclude.iter().map(|s| s.as_str()).collect();
  exclude.push(&symbol);
  let mut identifiers = Vec::new();
  ex.identifiers(inner, &exclude, &mut identifiers);

  Ok(Declaration {
    at,
    symbols: vec![symbol],
    flags,
    kind,
    identifiers,
  })
}

fn function(ex: &Extractor<'_>, node: Node<'_>) -> ExtractResult<FunctionRef> {
  let header = ex.require(node, SyntaxKind::FunctionHeader, "header")?;
  let name = ex.require(header, SyntaxKind::Identifier, "name")?;
  let params = ex.require(header, SyntaxKind::ParameterList, "parameter list")?;

  let mut inferred = Vec::new();
  let ty = match header.child(SyntaxKind::ReturnType) {
    Some(ret) => {
      let ty = ex.require(ret, SyntaxKind::Type, "return type")?;
      let attrs = attributes(ex, ret.child(SyntaxKind::AttributeList));
      if let Some(name) = find_infer(&attrs) {
        inferred.push(InferRef { name, at: -1 });
      }
      ex.text(ty).to_string()
    }
    None => "void".to_string(),
  };

  let mut parameters = Vec::new();
  for (i, param) in params.children().enumerate() {
    let name = ex.require(param, SyntaxKind::Identifier, "parameter name")?;
    let ty = ex.require(param, SyntaxKind::Type, "parameter type")?;
    let attrs = attributes(ex, param.child(SyntaxKind::AttributeList));
    if let Some(name) = find_infer(&attrs) {
      inferred.push(InferRef {
        name,
        at: i as i32,
      });
    }
    parameters.push(ParameterRef {
      name: Some(ex.text(name).to_string()),
      ty: ex.text(ty).to_string(),
    });
  }

  Ok(FunctionRef {
    name: ex.text(name).to_string(),
    ty,
    parameters,
    inferred,
  })
}
