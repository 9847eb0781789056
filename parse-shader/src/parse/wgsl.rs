use super::Parser;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::loc::Loc;
use crate::token::TT;
use crate::tree::RawNode;
use crate::tree::SyntaxKind;

fn start_of(attrs: &RawNode, fallback: Loc) -> usize {
  if attrs.children.is_empty() {
    fallback.0
  } else {
    attrs.loc.0
  }
}

impl<'a> Parser<'a> {
  pub fn parse_wgsl_item(&mut self) -> SyntaxResult<RawNode> {
    let t = self.peek();
    if t.typ == TT::Identifier {
      match self.str(t.loc) {
        "import" => return self.parse_wgsl_import(),
        "use" => return self.parse_wgsl_use(),
        "enable" => return self.parse_wgsl_enable(),
        "requires" | "diagnostic" | "const_assert" => return self.parse_wgsl_directive(),
        _ => {}
      };
    }

    let attrs = self.parse_wgsl_attributes()?;
    let keyword = self.peek();
    let inner = match (keyword.typ, self.str(keyword.loc)) {
      (TT::Identifier, "fn") => self.parse_wgsl_function(attrs)?,
      (TT::Identifier, "var") => self.parse_wgsl_global_variable(attrs)?,
      (TT::Identifier, "const" | "override" | "let") => self.parse_wgsl_global_constant(attrs)?,
      (TT::Identifier, "alias" | "type") => self.parse_wgsl_type_alias(attrs)?,
      (TT::Identifier, "struct") => self.parse_wgsl_struct(attrs)?,
      (TT::EOF, _) => return Err(keyword.error(SyntaxErrorType::UnexpectedEnd)),
      _ => return Err(keyword.error(SyntaxErrorType::ExpectedSyntax("declaration"))),
    };
    Ok(RawNode::new(SyntaxKind::LocalDeclaration, inner.loc, vec![inner]))
  }

  fn parse_wgsl_import(&mut self) -> SyntaxResult<RawNode> {
    let kw = self.consume();
    let mut children = vec![RawNode::leaf(SyntaxKind::Keyword, kw.loc)];
    if self.peek().typ == TT::LiteralString {
      let path = self.consume();
      children.push(RawNode::leaf(SyntaxKind::String, path.loc));
    } else {
      children.push(self.parse_import_list()?);
      self.require_word("from")?;
      let path = self.require(TT::LiteralString)?;
      children.push(RawNode::leaf(SyntaxKind::String, path.loc));
    }
    let _ = self.consume_if(TT::Semicolon);
    let loc = Loc(kw.loc.0, self.last_end());
    Ok(RawNode::new(SyntaxKind::ImportDeclaration, loc, children))
  }

  fn parse_wgsl_use(&mut self) -> SyntaxResult<RawNode> {
    let kw = self.consume();
    let path = self.require(TT::LiteralString)?;
    let mut children = vec![
      RawNode::leaf(SyntaxKind::Keyword, kw.loc),
      RawNode::leaf(SyntaxKind::String, path.loc),
    ];
    if self.consume_if(TT::ColonColon).is_match() {
      if self.peek().typ == TT::BraceOpen {
        children.push(self.parse_import_list()?);
      } else {
        let name = self.require(TT::Identifier)?;
        let item = RawNode::new(SyntaxKind::ImportDeclarationIdentifier, name.loc, vec![
          RawNode::leaf(SyntaxKind::Identifier, name.loc),
        ]);
        children.push(RawNode::new(SyntaxKind::ImportDeclarationList, name.loc, vec![item]));
      }
    }
    let _ = self.consume_if(TT::Semicolon);
    let loc = Loc(kw.loc.0, self.last_end());
    Ok(RawNode::new(SyntaxKind::ImportDeclaration, loc, children))
  }

  fn parse_wgsl_enable(&mut self) -> SyntaxResult<RawNode> {
    let kw = self.consume();
    let mut children = vec![RawNode::leaf(SyntaxKind::Keyword, kw.loc)];
    loop {
      let name = self.require(TT::Identifier)?;
      children.push(RawNode::leaf(SyntaxKind::EnableName, name.loc));
      if !self.consume_if(TT::Comma).is_match() {
        break;
      }
      if self.peek().typ == TT::Semicolon {
        break;
      }
    }
    let semi = self.require(TT::Semicolon)?;
    Ok(RawNode::new(SyntaxKind::EnableDirective, kw.loc + semi.loc, children))
  }

  fn parse_wgsl_directive(&mut self) -> SyntaxResult<RawNode> {
    let kw = self.consume();
    let mut loc = kw.loc;
    loop {
      let t = self.consume();
      match t.typ {
        TT::EOF => return Err(t.error(SyntaxErrorType::RequiredTokenNotFound(TT::Semicolon))),
        TT::Semicolon => {
          loc.extend(t.loc);
          break;
        }
        _ => loc.extend(t.loc),
      }
    }
    Ok(RawNode::new(SyntaxKind::Directive, loc, vec![RawNode::leaf(
      SyntaxKind::Keyword,
      kw.loc,
    )]))
  }

  pub fn parse_wgsl_attributes(&mut self) -> SyntaxResult<RawNode> {
    let mut children = Vec::new();
    while self.peek().typ == TT::At {
      children.push(self.parse_wgsl_attribute()?);
    }
    let loc = match (children.first(), children.last()) {
      (Some(first), Some(last)) => first.loc + last.loc,
      _ => Loc::at(self.peek().loc.0),
    };
    Ok(RawNode::new(SyntaxKind::AttributeList, loc, children))
  }

  // Attribute arguments are opaque; the node spans `@name(args)`.
  fn parse_wgsl_attribute(&mut self) -> SyntaxResult<RawNode> {
    let at = self.require(TT::At)?;
    let name = self.require(TT::Identifier)?;
    let mut loc = at.loc + name.loc;
    if self.peek().typ == TT::ParenthesisOpen {
      let mut depth = 0usize;
      loop {
        let t = self.consume();
        loc.extend(t.loc);
        match t.typ {
          TT::EOF => return Err(t.error(SyntaxErrorType::RequiredTokenNotFound(TT::ParenthesisClose))),
          TT::ParenthesisOpen => depth += 1,
          TT::ParenthesisClose => {
            depth -= 1;
            if depth == 0 {
              break;
            }
          }
          _ => {}
        };
      }
    }
    Ok(RawNode::leaf(SyntaxKind::Attribute, loc))
  }

  fn parse_wgsl_function(&mut self, attrs: RawNode) -> SyntaxResult<RawNode> {
    let header = self.parse_wgsl_function_header()?;
    let start = start_of(&attrs, header.loc);
    if self.peek().typ == TT::BraceOpen {
      let body = self.parse_block()?;
      let loc = Loc(start, body.loc.1);
      return Ok(RawNode::new(SyntaxKind::FunctionDeclaration, loc, vec![attrs, header, body]));
    }
    let semi = self.require(TT::Semicolon)?;
    let loc = Loc(start, semi.loc.1);
    Ok(RawNode::new(SyntaxKind::FunctionDeclaration, loc, vec![attrs, header]))
  }

  fn parse_wgsl_function_header(&mut self) -> SyntaxResult<RawNode> {
    let kw = self.require_word("fn")?;
    let name = self.require(TT::Identifier)?;
    let params = self.parse_wgsl_parameters()?;
    let mut loc = kw.loc + params.loc;
    let mut children = vec![
      RawNode::leaf(SyntaxKind::Keyword, kw.loc),
      RawNode::leaf(SyntaxKind::Identifier, name.loc),
      params,
    ];
    if let Some(arrow) = self.consume_if(TT::Arrow).match_loc() {
      let attrs = self.parse_wgsl_attributes()?;
      let ty = self.parse_wgsl_type()?;
      let ret_loc = arrow + ty.loc;
      loc.extend(ret_loc);
      children.push(RawNode::new(SyntaxKind::ReturnType, ret_loc, vec![attrs, ty]));
    }
    Ok(RawNode::new(SyntaxKind::FunctionHeader, loc, children))
  }

  fn parse_wgsl_parameters(&mut self) -> SyntaxResult<RawNode> {
    let open = self.require(TT::ParenthesisOpen)?;
    let mut children = Vec::new();
    loop {
      if let Some(close) = self.consume_if(TT::ParenthesisClose).match_loc() {
        return Ok(RawNode::new(SyntaxKind::ParameterList, open.loc + close, children));
      }
      let attrs = self.parse_wgsl_attributes()?;
      let name = self.require(TT::Identifier)?;
      self.require(TT::Colon)?;
      let ty = self.parse_wgsl_type()?;
      let loc = Loc(start_of(&attrs, name.loc), ty.loc.1);
      children.push(RawNode::new(SyntaxKind::Parameter, loc, vec![
        attrs,
        RawNode::leaf(SyntaxKind::Identifier, name.loc),
        ty,
      ]));
      if !self.consume_if(TT::Comma).is_match() {
        let close = self.require(TT::ParenthesisClose)?;
        return Ok(RawNode::new(SyntaxKind::ParameterList, open.loc + close.loc, children));
      }
    }
  }

  pub fn parse_wgsl_type(&mut self) -> SyntaxResult<RawNode> {
    let name = self.require(TT::Identifier)?;
    let mut loc = name.loc;
    let mut children = vec![RawNode::leaf(SyntaxKind::Identifier, name.loc)];
    if self.consume_if(TT::ChevronLeft).is_match() {
      loop {
        if let Some(close) = self.consume_if(TT::ChevronRight).match_loc() {
          loc.extend(close);
          break;
        }
        children.push(self.parse_wgsl_type_argument()?);
        if !self.consume_if(TT::Comma).is_match() {
          let close = self.require(TT::ChevronRight)?;
          loc.extend(close.loc);
          break;
        }
      }
    }
    Ok(RawNode::new(SyntaxKind::Type, loc, children))
  }

  fn parse_wgsl_type_argument(&mut self) -> SyntaxResult<RawNode> {
    if self.peek().typ == TT::Identifier
      && matches!(self.peek_n(1).typ, TT::ChevronLeft | TT::Comma | TT::ChevronRight)
    {
      return self.parse_wgsl_type();
    }
    self.parse_expression(&[TT::Comma, TT::ChevronRight])
  }

  fn parse_wgsl_global_variable(&mut self, attrs: RawNode) -> SyntaxResult<RawNode> {
    let kw = self.consume();
    let mut decl = vec![RawNode::leaf(SyntaxKind::Keyword, kw.loc)];
    if let Some(open) = self.consume_if(TT::ChevronLeft).match_loc() {
      let mut loc = open;
      loop {
        let t = self.consume();
        loc.extend(t.loc);
        match t.typ {
          TT::ChevronRight => break,
          TT::EOF => return Err(t.error(SyntaxErrorType::RequiredTokenNotFound(TT::ChevronRight))),
          _ => {}
        };
      }
      decl.push(RawNode::leaf(SyntaxKind::VariableQualifier, loc));
    }
    let name = self.require(TT::Identifier)?;
    decl.push(RawNode::leaf(SyntaxKind::Identifier, name.loc));
    if self.consume_if(TT::Colon).is_match() {
      decl.push(self.parse_wgsl_type()?);
    }
    let decl_loc = Loc(kw.loc.0, self.last_end());
    let mut children = vec![attrs, RawNode::new(SyntaxKind::VariableDeclaration, decl_loc, decl)];
    if self.consume_if(TT::Equals).is_match() {
      children.push(self.parse_expression(&[TT::Semicolon])?);
    }
    let semi = self.require(TT::Semicolon)?;
    let loc = Loc(start_of(&children[0], kw.loc), semi.loc.1);
    Ok(RawNode::new(SyntaxKind::GlobalVariableDeclaration, loc, children))
  }

  fn parse_wgsl_global_constant(&mut self, attrs: RawNode) -> SyntaxResult<RawNode> {
    let kw = self.consume();
    let start = start_of(&attrs, kw.loc);
    let name = self.require(TT::Identifier)?;
    let mut children = vec![
      attrs,
      RawNode::leaf(SyntaxKind::Keyword, kw.loc),
      RawNode::leaf(SyntaxKind::Identifier, name.loc),
    ];
    if self.consume_if(TT::Colon).is_match() {
      children.push(self.parse_wgsl_type()?);
    }
    if self.consume_if(TT::Equals).is_match() {
      children.push(self.parse_expression(&[TT::Semicolon])?);
    }
    let semi = self.require(TT::Semicolon)?;
    Ok(RawNode::new(SyntaxKind::GlobalConstantDeclaration, Loc(start, semi.loc.1), children))
  }

  fn parse_wgsl_type_alias(&mut self, attrs: RawNode) -> SyntaxResult<RawNode> {
    let kw = self.consume();
    let start = start_of(&attrs, kw.loc);
    let name = self.require(TT::Identifier)?;
    let mut children = vec![
      attrs,
      RawNode::leaf(SyntaxKind::Keyword, kw.loc),
      RawNode::leaf(SyntaxKind::Identifier, name.loc),
    ];
    if self.consume_if(TT::Equals).is_match() {
      children.push(self.parse_wgsl_type()?);
    }
    let semi = self.require(TT::Semicolon)?;
    Ok(RawNode::new(SyntaxKind::TypeAliasDeclaration, Loc(start, semi.loc.1), children))
  }

  fn parse_wgsl_struct(&mut self, attrs: RawNode) -> SyntaxResult<RawNode> {
    let kw = self.consume();
    let start = start_of(&attrs, kw.loc);
    let name = self.require(TT::Identifier)?;
    let mut children = vec![
      attrs,
      RawNode::leaf(SyntaxKind::Keyword, kw.loc),
      RawNode::leaf(SyntaxKind::Identifier, name.loc),
    ];
    let end = if self.peek().typ == TT::BraceOpen {
      let body = self.parse_wgsl_struct_body()?;
      let end = body.loc.1;
      children.push(body);
      end
    } else {
      self.require(TT::Semicolon)?.loc.1
    };
    Ok(RawNode::new(SyntaxKind::StructDeclaration, Loc(start, end), children))
  }

  fn parse_wgsl_struct_body(&mut self) -> SyntaxResult<RawNode> {
    let open = self.require(TT::BraceOpen)?;
    let mut children = Vec::new();
    loop {
      if let Some(close) = self.consume_if(TT::BraceClose).match_loc() {
        return Ok(RawNode::new(SyntaxKind::StructBody, open.loc + close, children));
      }
      let attrs = self.parse_wgsl_attributes()?;
      let name = self.require(TT::Identifier)?;
      self.require(TT::Colon)?;
      let ty = self.parse_wgsl_type()?;
      let loc = Loc(start_of(&attrs, name.loc), ty.loc.1);
      children.push(RawNode::new(SyntaxKind::StructMember, loc, vec![
        attrs,
        RawNode::leaf(SyntaxKind::PrivateIdentifier, name.loc),
        ty,
      ]));
      if !self.consume_if(TT::Comma).is_match() && !self.consume_if(TT::Semicolon).is_match() {
        let close = self.require(TT::BraceClose)?;
        return Ok(RawNode::new(SyntaxKind::StructBody, open.loc + close.loc, children));
      }
    }
  }
}
