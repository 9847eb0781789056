use super::Parser;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::loc::Loc;
use crate::token::GLSL_QUALIFIERS;
use crate::token::TT;
use crate::tree::RawNode;
use crate::tree::SyntaxKind;

impl<'a> Parser<'a> {
  pub fn parse_glsl_item(&mut self) -> SyntaxResult<RawNode> {
    let t = self.peek();
    if t.typ == TT::Hash {
      return self.parse_glsl_preprocessor();
    }
    if self.is_word(&t, "precision") {
      return self.parse_glsl_precision();
    }

    let start = t.loc.0;
    let quals = self.parse_glsl_qualifiers()?;
    let (a, b) = (self.peek(), self.peek_n(1));
    if !quals.children.is_empty()
      && a.typ == TT::Identifier
      && b.typ == TT::BraceOpen
      && !self.is_word(&a, "struct")
    {
      return self.parse_glsl_interface_block(quals, start);
    }

    // Bare qualifier declarations such as `layout(local_size_x = 8) in;`.
    if let Some(semi) = self.consume_if(TT::Semicolon).match_loc() {
      let qualified = RawNode::new(SyntaxKind::QualifiedType, quals.loc, vec![quals]);
      let decl = RawNode::new(SyntaxKind::VariableDeclaration, qualified.loc, vec![qualified]);
      return Ok(RawNode::new(SyntaxKind::GlobalDeclaration, Loc(start, semi.1), vec![decl]));
    }

    let spec = self.parse_glsl_type_specifier()?;
    let qualified = RawNode::new(SyntaxKind::QualifiedType, Loc(start, spec.loc.1), vec![quals, spec]);

    if let Some(semi) = self.consume_if(TT::Semicolon).match_loc() {
      let decl = RawNode::new(SyntaxKind::VariableDeclaration, qualified.loc, vec![qualified]);
      return Ok(RawNode::new(SyntaxKind::GlobalDeclaration, Loc(start, semi.1), vec![decl]));
    }

    let name = self.require(TT::Identifier)?;
    if self.peek().typ == TT::ParenthesisOpen {
      let params = self.parse_glsl_parameters()?;
      let proto = RawNode::new(SyntaxKind::FunctionPrototype, Loc(start, params.loc.1), vec![
        qualified,
        RawNode::leaf(SyntaxKind::Identifier, name.loc),
        params,
      ]);
      if self.peek().typ == TT::BraceOpen {
        let body = self.parse_block()?;
        let loc = Loc(start, body.loc.1);
        return Ok(RawNode::new(SyntaxKind::FunctionDefinition, loc, vec![proto, body]));
      }
      let semi = self.require(TT::Semicolon)?;
      return Ok(RawNode::new(SyntaxKind::GlobalDeclaration, Loc(start, semi.loc.1), vec![proto]));
    }

    let mut children = vec![qualified];
    children.push(self.parse_glsl_local(name.loc)?);
    while self.consume_if(TT::Comma).is_match() {
      let name = self.require(TT::Identifier)?;
      children.push(self.parse_glsl_local(name.loc)?);
    }
    let decl = RawNode::new(SyntaxKind::VariableDeclaration, Loc(start, self.last_end()), children);
    let semi = self.require(TT::Semicolon)?;
    Ok(RawNode::new(SyntaxKind::GlobalDeclaration, Loc(start, semi.loc.1), vec![decl]))
  }

  /// Parses a preprocessor line. Only `#pragma` lines get structure beyond the directive name.
  fn parse_glsl_preprocessor(&mut self) -> SyntaxResult<RawNode> {
    let hash = self.consume();
    let mut loc = hash.loc;
    let mut children = Vec::new();
    let directive = self.peek();
    if directive.typ == TT::Identifier && !directive.preceded_by_line_terminator {
      self.consume();
      loc.extend(directive.loc);
      children.push(RawNode::leaf(SyntaxKind::PreprocessorDirective, directive.loc));
      let verb = self.peek();
      if self.is_word(&directive, "pragma")
        && verb.typ == TT::Identifier
        && !verb.preceded_by_line_terminator
      {
        self.consume();
        loc.extend(verb.loc);
        children.push(RawNode::leaf(SyntaxKind::PragmaVerb, verb.loc));
        if self.is_word(&verb, "import") {
          let next = self.peek();
          if !next.preceded_by_line_terminator && next.typ == TT::BraceOpen {
            let list = self.parse_import_list()?;
            loc.extend(list.loc);
            children.push(list);
            self.require_word("from")?;
          }
          let path = self.peek();
          if !path.preceded_by_line_terminator && path.typ == TT::LiteralString {
            self.consume();
            loc.extend(path.loc);
            children.push(RawNode::leaf(SyntaxKind::String, path.loc));
          } else {
            return Err(path.error(SyntaxErrorType::ExpectedSyntax("import path")));
          }
        }
      }
    }

    // Rest of the line, honouring backslash continuations.
    let mut continued = false;
    loop {
      let t = self.peek();
      if t.typ == TT::EOF || (t.preceded_by_line_terminator && !continued) {
        break;
      }
      self.consume();
      loc.extend(t.loc);
      continued = t.typ == TT::Backslash;
    }
    Ok(RawNode::new(SyntaxKind::Preprocessor, loc, children))
  }

  fn parse_glsl_precision(&mut self) -> SyntaxResult<RawNode> {
    let kw = self.consume();
    let mut loc = kw.loc;
    loop {
      let t = self.consume();
      match t.typ {
        TT::EOF => return Err(t.error(SyntaxErrorType::RequiredTokenNotFound(TT::Semicolon))),
        TT::Semicolon => break,
        _ => loc.extend(t.loc),
      };
    }
    let stmt = RawNode::leaf(SyntaxKind::PrecisionStatement, loc);
    Ok(RawNode::new(SyntaxKind::GlobalDeclaration, Loc(loc.0, self.last_end()), vec![stmt]))
  }

  pub fn parse_glsl_qualifiers(&mut self) -> SyntaxResult<RawNode> {
    let start = self.peek().loc.0;
    let mut children = Vec::new();
    loop {
      let t = self.peek();
      if self.is_word(&t, "layout") {
        self.consume();
        let open = self.require(TT::ParenthesisOpen)?;
        let mut loc = t.loc + open.loc;
        let mut args = vec![RawNode::leaf(SyntaxKind::Keyword, t.loc)];
        let mut depth = 1usize;
        while depth > 0 {
          let a = self.consume();
          loc.extend(a.loc);
          match a.typ {
            TT::EOF => return Err(a.error(SyntaxErrorType::RequiredTokenNotFound(TT::ParenthesisClose))),
            TT::ParenthesisOpen => depth += 1,
            TT::ParenthesisClose => depth -= 1,
            TT::Identifier => args.push(RawNode::leaf(SyntaxKind::Identifier, a.loc)),
            _ => {}
          };
        }
        children.push(RawNode::new(SyntaxKind::TypeQualifier, loc, args));
        continue;
      }
      if t.typ == TT::Identifier && GLSL_QUALIFIERS.contains(self.str(t.loc)) {
        self.consume();
        children.push(RawNode::leaf(SyntaxKind::TypeQualifier, t.loc));
        continue;
      }
      break;
    }
    let loc = match (children.first(), children.last()) {
      (Some(first), Some(last)) => first.loc + last.loc,
      _ => Loc::at(start),
    };
    Ok(RawNode::new(SyntaxKind::TypeQualifierList, loc, children))
  }

  fn parse_glsl_type_specifier(&mut self) -> SyntaxResult<RawNode> {
    let t = self.peek();
    if self.is_word(&t, "struct") {
      self.consume();
      let mut children = vec![RawNode::leaf(SyntaxKind::Keyword, t.loc)];
      if let Some(name) = self.consume_if(TT::Identifier).match_loc() {
        children.push(RawNode::leaf(SyntaxKind::Identifier, name));
      }
      let body = self.parse_glsl_struct_body()?;
      let loc = t.loc + body.loc;
      children.push(body);
      let decl = RawNode::new(SyntaxKind::StructDeclaration, loc, children);
      return Ok(RawNode::new(SyntaxKind::TypeSpecifier, loc, vec![decl]));
    }
    let name = self.require(TT::Identifier)?;
    let mut children = vec![RawNode::leaf(SyntaxKind::Identifier, name.loc)];
    children.extend(self.parse_glsl_array_sizes()?);
    Ok(RawNode::new(SyntaxKind::TypeSpecifier, Loc(name.loc.0, self.last_end()), children))
  }

  fn parse_glsl_array_sizes(&mut self) -> SyntaxResult<Vec<RawNode>> {
    let mut sizes = Vec::new();
    while let Some(open) = self.consume_if(TT::BracketOpen).match_loc() {
      let children = if self.peek().typ == TT::BracketClose {
        Vec::new()
      } else {
        self.parse_expression(&[TT::BracketClose])?.children
      };
      let close = self.require(TT::BracketClose)?;
      sizes.push(RawNode::new(SyntaxKind::Expression, open + close.loc, children));
    }
    Ok(sizes)
  }

  fn parse_glsl_struct_body(&mut self) -> SyntaxResult<RawNode> {
    let open = self.require(TT::BraceOpen)?;
    let mut children = Vec::new();
    loop {
      if let Some(close) = self.consume_if(TT::BraceClose).match_loc() {
        return Ok(RawNode::new(SyntaxKind::StructBody, open.loc + close, children));
      }
      let start = self.peek().loc.0;
      let quals = self.parse_glsl_qualifiers()?;
      let spec = self.parse_glsl_type_specifier()?;
      let qualified = RawNode::new(SyntaxKind::QualifiedType, Loc(start, spec.loc.1), vec![quals, spec]);
      let mut member = vec![qualified];
      loop {
        let name = self.require(TT::Identifier)?;
        member.push(RawNode::leaf(SyntaxKind::PrivateIdentifier, name.loc));
        member.extend(self.parse_glsl_array_sizes()?);
        if !self.consume_if(TT::Comma).is_match() {
          break;
        }
      }
      let semi = self.require(TT::Semicolon)?;
      children.push(RawNode::new(SyntaxKind::StructMember, Loc(start, semi.loc.1), member));
    }
  }

  fn parse_glsl_interface_block(&mut self, quals: RawNode, start: usize) -> SyntaxResult<RawNode> {
    let name = self.require(TT::Identifier)?;
    let body = self.parse_glsl_struct_body()?;
    let mut children = vec![quals, RawNode::leaf(SyntaxKind::PrivateIdentifier, name.loc), body];
    if let Some(instance) = self.consume_if(TT::Identifier).match_loc() {
      children.push(RawNode::leaf(SyntaxKind::Identifier, instance));
      children.extend(self.parse_glsl_array_sizes()?);
    }
    let block = RawNode::new(SyntaxKind::InterfaceBlock, Loc(start, self.last_end()), children);
    let semi = self.require(TT::Semicolon)?;
    Ok(RawNode::new(SyntaxKind::GlobalDeclaration, Loc(start, semi.loc.1), vec![block]))
  }

  fn parse_glsl_parameters(&mut self) -> SyntaxResult<RawNode> {
    let open = self.require(TT::ParenthesisOpen)?;
    let mut children = Vec::new();
    let t = self.peek();
    if self.is_word(&t, "void") && self.peek_n(1).typ == TT::ParenthesisClose {
      self.consume();
    }
    loop {
      if let Some(close) = self.consume_if(TT::ParenthesisClose).match_loc() {
        return Ok(RawNode::new(SyntaxKind::ParameterList, open.loc + close, children));
      }
      let start = self.peek().loc.0;
      let quals = self.parse_glsl_qualifiers()?;
      let spec = self.parse_glsl_type_specifier()?;
      let qualified = RawNode::new(SyntaxKind::QualifiedType, Loc(start, spec.loc.1), vec![quals, spec]);
      let mut param = vec![qualified];
      if let Some(name) = self.consume_if(TT::Identifier).match_loc() {
        param.push(RawNode::leaf(SyntaxKind::Identifier, name));
        param.extend(self.parse_glsl_array_sizes()?);
      }
      children.push(RawNode::new(SyntaxKind::Parameter, Loc(start, self.last_end()), param));
      if !self.consume_if(TT::Comma).is_match() {
        let close = self.require(TT::ParenthesisClose)?;
        return Ok(RawNode::new(SyntaxKind::ParameterList, open.loc + close.loc, children));
      }
    }
  }

  fn parse_glsl_local(&mut self, name: Loc) -> SyntaxResult<RawNode> {
    let mut children = vec![RawNode::leaf(SyntaxKind::Identifier, name)];
    children.extend(self.parse_glsl_array_sizes()?);
    if self.consume_if(TT::Equals).is_match() {
      children.push(self.parse_expression(&[TT::Comma, TT::Semicolon])?);
    }
    Ok(RawNode::new(SyntaxKind::Local, Loc(name.0, self.last_end()), children))
  }
}
