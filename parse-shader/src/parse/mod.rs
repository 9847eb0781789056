use crate::dialect::Dialect;
use crate::error::SyntaxError;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::lex::lex_next;
use crate::lex::Lexer;
use crate::loc::Loc;
use crate::token::Token;
use crate::token::GLSL_BODY_KEYWORDS;
use crate::token::TT;
use crate::token::WGSL_BODY_KEYWORDS;
use crate::tree::RawNode;
use crate::tree::SyntaxKind;
use crate::tree::SyntaxTree;

pub mod glsl;
pub mod wgsl;

#[derive(Debug)]
#[must_use]
pub struct MaybeToken {
  typ: TT,
  loc: Loc,
  matched: bool,
}

impl MaybeToken {
  pub fn is_match(&self) -> bool {
    self.matched
  }

  pub fn match_loc(&self) -> Option<Loc> {
    if self.matched {
      Some(self.loc)
    } else {
      None
    }
  }

  pub fn error(&self, err: SyntaxErrorType) -> SyntaxError {
    debug_assert!(!self.matched);
    self.loc.error(err, Some(self.typ))
  }
}

pub struct ParserCheckpoint {
  next_tok_i: usize,
}

pub struct Parser<'a> {
  lexer: Lexer<'a>,
  buf: Vec<Token>,
  next_tok_i: usize,
  errors: Vec<SyntaxError>,
}

// Dialect-specific grammar lives in the `wgsl` and `glsl` submodules as further `impl` blocks on
// this struct, so shared helpers stay methods rather than free functions.
impl<'a> Parser<'a> {
  pub fn new(lexer: Lexer<'a>) -> Parser<'a> {
    Parser {
      lexer,
      buf: Vec::new(),
      next_tok_i: 0,
      errors: Vec::new(),
    }
  }

  pub fn dialect(&self) -> Dialect {
    self.lexer.dialect()
  }

  pub fn str(&self, loc: Loc) -> &'a str {
    &self.lexer.source()[loc.0..loc.1]
  }

  pub fn checkpoint(&self) -> ParserCheckpoint {
    ParserCheckpoint {
      next_tok_i: self.next_tok_i,
    }
  }

  pub fn restore_checkpoint(&mut self, checkpoint: ParserCheckpoint) {
    self.next_tok_i = checkpoint.next_tok_i;
  }

  fn fill(&mut self, i: usize) {
    while self.buf.len() <= i {
      if self.buf.last().is_some_and(|t| t.typ == TT::EOF) {
        let eof = self.buf[self.buf.len() - 1].clone();
        self.buf.push(eof);
      } else {
        let token = lex_next(&mut self.lexer);
        self.buf.push(token);
      }
    }
  }

  pub fn peek_n(&mut self, n: usize) -> Token {
    let i = self.next_tok_i + n;
    self.fill(i);
    self.buf[i].clone()
  }

  pub fn peek(&mut self) -> Token {
    self.peek_n(0)
  }

  pub fn consume(&mut self) -> Token {
    let t = self.peek();
    if t.typ != TT::EOF {
      self.next_tok_i += 1;
    }
    t
  }

  /// End offset of the most recently consumed token.
  pub fn last_end(&self) -> usize {
    match self.next_tok_i.checked_sub(1) {
      Some(i) => self.buf[i].loc.1,
      None => 0,
    }
  }

  pub fn is_word(&self, token: &Token, word: &str) -> bool {
    token.typ == TT::Identifier && self.str(token.loc) == word
  }

  pub fn consume_if(&mut self, typ: TT) -> MaybeToken {
    let t = self.peek();
    let matched = t.typ == typ;
    if matched {
      self.consume();
    }
    MaybeToken {
      typ: t.typ,
      loc: t.loc,
      matched,
    }
  }

  pub fn consume_if_word(&mut self, word: &str) -> MaybeToken {
    let t = self.peek();
    let matched = self.is_word(&t, word);
    if matched {
      self.consume();
    }
    MaybeToken {
      typ: t.typ,
      loc: t.loc,
      matched,
    }
  }

  pub fn require(&mut self, typ: TT) -> SyntaxResult<Token> {
    let t = self.peek();
    if t.typ == typ {
      return Ok(self.consume());
    }
    if t.typ == TT::EOF {
      return Err(t.error(SyntaxErrorType::UnexpectedEnd));
    }
    Err(t.error(SyntaxErrorType::RequiredTokenNotFound(typ)))
  }

  pub fn require_word(&mut self, word: &'static str) -> SyntaxResult<Token> {
    let t = self.peek();
    if self.is_word(&t, word) {
      return Ok(self.consume());
    }
    Err(t.error(SyntaxErrorType::ExpectedSyntax(word)))
  }

  pub fn parse_program(&mut self) -> SyntaxTree {
    let mut items = Vec::new();
    loop {
      let t = self.peek();
      match t.typ {
        TT::EOF => break,
        TT::Semicolon => {
          self.consume();
          continue;
        }
        _ => {}
      };
      let cp = self.checkpoint();
      let result = match self.dialect() {
        Dialect::Wgsl => self.parse_wgsl_item(),
        Dialect::Glsl => self.parse_glsl_item(),
      };
      match result {
        Ok(node) => items.push(node),
        Err(err) => {
          self.restore_checkpoint(cp);
          let loc = self.recover();
          tracing::debug!(code = err.typ.code(), start = loc.0, end = loc.1, "recovered from syntax error");
          self.errors.push(err);
          items.push(RawNode::leaf(SyntaxKind::Error, loc));
        }
      }
    }
    let root = RawNode::new(SyntaxKind::Program, self.lexer.source_range(), items);
    SyntaxTree::build(root, std::mem::take(&mut self.errors))
  }

  /// Skips the rest of a broken top-level item: through the next `;` or balanced `}` at depth 0,
  /// or up to the next preprocessor line in GLSL.
  fn recover(&mut self) -> Loc {
    let mut loc = self.peek().loc;
    let mut depth = 0usize;
    let mut first = true;
    loop {
      let t = self.peek();
      if t.typ == TT::EOF {
        break;
      }
      if !first
        && depth == 0
        && t.typ == TT::Hash
        && t.preceded_by_line_terminator
        && self.dialect() == Dialect::Glsl
      {
        break;
      }
      first = false;
      self.consume();
      loc.extend(t.loc);
      match t.typ {
        TT::BraceOpen => depth += 1,
        TT::BraceClose => {
          depth = depth.saturating_sub(1);
          if depth == 0 {
            break;
          }
        }
        TT::Semicolon if depth == 0 => break,
        _ => {}
      }
    }
    loc
  }

  fn soup_leaf(&self, token: &Token, after_dot: bool) -> Option<RawNode> {
    if token.typ != TT::Identifier {
      return None;
    }
    if after_dot {
      return Some(RawNode::leaf(SyntaxKind::PrivateIdentifier, token.loc));
    }
    let keywords = match self.dialect() {
      Dialect::Wgsl => &*WGSL_BODY_KEYWORDS,
      Dialect::Glsl => &*GLSL_BODY_KEYWORDS,
    };
    if keywords.contains(self.str(token.loc)) {
      return None;
    }
    Some(RawNode::leaf(SyntaxKind::Identifier, token.loc))
  }

  /// Parses a braced body as a flat list of identifier leaves and nested blocks.
  pub fn parse_block(&mut self) -> SyntaxResult<RawNode> {
    let open = self.require(TT::BraceOpen)?;
    let mut children = Vec::new();
    let mut after_dot = false;
    loop {
      let t = self.peek();
      match t.typ {
        TT::EOF => return Err(t.error(SyntaxErrorType::RequiredTokenNotFound(TT::BraceClose))),
        TT::BraceOpen => {
          children.push(self.parse_block()?);
          after_dot = false;
          continue;
        }
        TT::BraceClose => {
          self.consume();
          return Ok(RawNode::new(SyntaxKind::Block, open.loc + t.loc, children));
        }
        _ => {}
      };
      self.consume();
      children.extend(self.soup_leaf(&t, after_dot));
      after_dot = t.typ == TT::Dot;
    }
  }

  /// Parses tokens up to (not including) one of `stops` at nesting depth 0.
  pub fn parse_expression(&mut self, stops: &[TT]) -> SyntaxResult<RawNode> {
    let mut children = Vec::new();
    let mut loc: Option<Loc> = None;
    let mut depth = 0usize;
    let mut after_dot = false;
    loop {
      let t = self.peek();
      if t.typ == TT::EOF {
        return Err(t.error(SyntaxErrorType::UnexpectedEnd));
      }
      let closing = matches!(t.typ, TT::ParenthesisClose | TT::BracketClose | TT::BraceClose);
      if depth == 0 && (stops.contains(&t.typ) || closing) {
        break;
      }
      match t.typ {
        TT::ParenthesisOpen | TT::BracketOpen | TT::BraceOpen => depth += 1,
        _ if closing => depth -= 1,
        _ => {}
      };
      self.consume();
      children.extend(self.soup_leaf(&t, after_dot));
      after_dot = t.typ == TT::Dot;
      loc = Some(loc.map_or(t.loc, |l| l + t.loc));
    }
    match loc {
      Some(loc) => Ok(RawNode::new(SyntaxKind::Expression, loc, children)),
      None => Err(self.peek().error(SyntaxErrorType::ExpectedSyntax("expression"))),
    }
  }

  /// Parses `{a, b as c}`.
  pub fn parse_import_list(&mut self) -> SyntaxResult<RawNode> {
    let open = self.require(TT::BraceOpen)?;
    let mut children = Vec::new();
    loop {
      if let Some(close) = self.consume_if(TT::BraceClose).match_loc() {
        return Ok(RawNode::new(SyntaxKind::ImportDeclarationList, open.loc + close, children));
      }
      let name = self.require(TT::Identifier)?;
      let mut loc = name.loc;
      let mut parts = vec![RawNode::leaf(SyntaxKind::Identifier, name.loc)];
      if self.consume_if_word("as").is_match() {
        let alias = self.require(TT::Identifier)?;
        loc.extend(alias.loc);
        parts.push(RawNode::leaf(SyntaxKind::Identifier, alias.loc));
      }
      children.push(RawNode::new(SyntaxKind::ImportDeclarationIdentifier, loc, parts));
      if !self.consume_if(TT::Comma).is_match() {
        let close = self.require(TT::BraceClose)?;
        return Ok(RawNode::new(SyntaxKind::ImportDeclarationList, open.loc + close.loc, children));
      }
    }
  }
}
