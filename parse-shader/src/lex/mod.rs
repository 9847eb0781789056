use crate::dialect::Dialect;
use crate::loc::Loc;
use crate::token::Token;
use crate::token::TT;
use core::ops::Index;
use memchr::memchr;
use memchr::memchr2;
use memchr::memmem;


#[derive(Copy, Clone)]
pub struct LexerCheckpoint {
  next: usize,
}

// Length of the matched prefix.
#[derive(Copy, Clone)]
struct Match(usize);

impl Match {
  pub fn len(&self) -> usize {
    self.0
  }
}

pub struct Lexer<'a> {
  source: &'a str,
  dialect: Dialect,
  next: usize,
}

impl<'a> Lexer<'a> {
  pub fn new(code: &'a str, dialect: Dialect) -> Lexer<'a> {
    Lexer {
      source: code,
      dialect,
      next: 0,
    }
  }

  pub fn next(&self) -> usize {
    self.next
  }

  pub fn dialect(&self) -> Dialect {
    self.dialect
  }

  pub fn source(&self) -> &'a str {
    self.source
  }

  fn end(&self) -> usize {
    self.source.len()
  }

  fn remaining(&self) -> usize {
    self.end() - self.next
  }

  pub fn source_range(&self) -> Loc {
    Loc(0, self.end())
  }

  fn eof_range(&self) -> Loc {
    Loc(self.end(), self.end())
  }

  fn at_end(&self) -> bool {
    self.next >= self.end()
  }

  fn peek_byte(&self, n: usize) -> Option<u8> {
    self.source.as_bytes().get(self.next + n).copied()
  }

  fn peek_char(&self) -> Option<char> {
    self.source[self.next..].chars().next()
  }

  pub fn checkpoint(&self) -> LexerCheckpoint {
    LexerCheckpoint { next: self.next }
  }

  pub fn since_checkpoint(&self, checkpoint: LexerCheckpoint) -> Loc {
    Loc(checkpoint.next, self.next)
  }

  pub fn apply_checkpoint(&mut self, checkpoint: LexerCheckpoint) {
    self.next = checkpoint.next;
  }

  fn through_char_or_end(&self, c: u8) -> Match {
    memchr(c, self.source[self.next..].as_bytes())
      .map(|pos| Match(pos + 1))
      .unwrap_or(Match(self.remaining()))
  }

  fn while_bytes(&self, pred: impl Fn(u8) -> bool) -> Match {
    Match(
      self.source.as_bytes()[self.next..]
        .iter()
        .take_while(|&&b| pred(b))
        .count(),
    )
  }

  fn while_chars(&self, pred: impl Fn(char) -> bool) -> Match {
    let mut len = 0;
    for ch in self.source[self.next..].chars() {
      if !pred(ch) {
        break;
      }
      len += ch.len_utf8();
    }
    Match(len)
  }

  fn consume(&mut self, m: Match) -> Match {
    self.next += m.len();
    m
  }

  fn skip(&mut self, n: usize) {
    debug_assert!(self.next + n <= self.end());
    self.next += n;
  }

  fn drive(&mut self, preceded_by_line_terminator: bool, f: impl FnOnce(&mut Self) -> TT) -> Token {
    let cp = self.checkpoint();
    let typ = f(self);
    Token {
      loc: self.since_checkpoint(cp),
      typ,
      preceded_by_line_terminator,
    }
  }

  // Returns whether the block comment was terminated.
  fn skip_block_comment(&mut self) -> bool {
    self.skip(2);
    if self.dialect == Dialect::Glsl {
      return match memmem::find(self.source[self.next..].as_bytes(), b"*/") {
        Some(pos) => {
          self.skip(pos + 2);
          true
        }
        None => {
          self.next = self.end();
          false
        }
      };
    }
    // WGSL block comments nest.
    let mut depth = 1;
    while let Some(pos) = memchr2(b'*', b'/', self.source[self.next..].as_bytes()) {
      self.skip(pos);
      match (self.peek_byte(0), self.peek_byte(1)) {
        (Some(b'*'), Some(b'/')) => {
          self.skip(2);
          depth -= 1;
          if depth == 0 {
            return true;
          }
        }
        (Some(b'/'), Some(b'*')) => {
          self.skip(2);
          depth += 1;
        }
        _ => self.skip(1),
      }
    }
    self.next = self.end();
    false
  }
}

impl<'a> Index<Loc> for Lexer<'a> {
  type Output = str;

  fn index(&self, index: Loc) -> &Self::Output {
    &self.source[index.0..index.1]
  }
}

fn is_whitespace(b: u8) -> bool {
  matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c)
}

fn is_id_start(c: char) -> bool {
  c == '_' || c.is_ascii_alphabetic() || (!c.is_ascii() && c.is_alphabetic())
}

fn is_id_continue(c: char) -> bool {
  c == '_' || c.is_ascii_alphanumeric() || (!c.is_ascii() && c.is_alphanumeric())
}

fn lex_number(lexer: &mut Lexer<'_>) -> TT {
  let mut hex = false;
  if lexer.peek_byte(0) == Some(b'0') && matches!(lexer.peek_byte(1), Some(b'x' | b'X')) {
    hex = true;
    lexer.skip(2);
  }
  loop {
    let m = lexer.while_bytes(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.');
    lexer.consume(m);
    let Some(prev) = lexer.next.checked_sub(1).map(|i| lexer.source.as_bytes()[i]) else {
      break;
    };
    let exponent = if hex {
      matches!(prev, b'p' | b'P')
    } else {
      matches!(prev, b'e' | b'E')
    };
    if exponent && matches!(lexer.peek_byte(0), Some(b'+' | b'-')) {
      lexer.skip(1);
      continue;
    }
    break;
  }
  TT::LiteralNumber
}

fn lex_string(lexer: &mut Lexer<'_>, quote: u8) -> TT {
  lexer.skip(1);
  while let Some(b) = lexer.peek_byte(0) {
    match b {
      b'\\' => lexer.skip(if lexer.peek_byte(1).is_some() { 2 } else { 1 }),
      b'\n' => return TT::Invalid,
      b if b == quote => {
        lexer.skip(1);
        return TT::LiteralString;
      }
      _ => {
        let len = lexer.peek_char().map(char::len_utf8).unwrap_or(1);
        lexer.skip(len);
      }
    }
  }
  TT::Invalid
}

fn lex_punctuation(lexer: &mut Lexer<'_>, c: char) -> TT {
  let next = lexer.peek_byte(1);
  let (typ, len) = match c {
    '@' => (TT::At, 1),
    '#' => (TT::Hash, 1),
    '\\' => (TT::Backslash, 1),
    '(' => (TT::ParenthesisOpen, 1),
    ')' => (TT::ParenthesisClose, 1),
    '{' => (TT::BraceOpen, 1),
    '}' => (TT::BraceClose, 1),
    '[' => (TT::BracketOpen, 1),
    ']' => (TT::BracketClose, 1),
    // Chevrons are never merged so nested template lists close correctly.
    '<' => (TT::ChevronLeft, 1),
    '>' => (TT::ChevronRight, 1),
    ',' => (TT::Comma, 1),
    ';' => (TT::Semicolon, 1),
    '.' => (TT::Dot, 1),
    ':' if next == Some(b':') => (TT::ColonColon, 2),
    ':' => (TT::Colon, 1),
    '-' if next == Some(b'>') => (TT::Arrow, 2),
    '=' | '!' if next == Some(b'=') => (TT::Operator, 2),
    '=' => (TT::Equals, 1),
    '+' | '-' | '*' | '/' | '%' | '&' | '|' | '^' | '!' | '~' | '?' => (TT::Operator, 1),
    c => (TT::Invalid, c.len_utf8()),
  };
  lexer.skip(len);
  typ
}

/// Lexes the next token, skipping whitespace and comments.
///
/// An unterminated block comment produces a single [`TT::Invalid`] token covering the rest of the
/// source.
pub fn lex_next(lexer: &mut Lexer<'_>) -> Token {
  let mut preceded_by_line_terminator = false;
  loop {
    let ws = lexer.while_bytes(is_whitespace);
    if memchr(b'\n', lexer.source[lexer.next..lexer.next + ws.len()].as_bytes()).is_some() {
      preceded_by_line_terminator = true;
    }
    lexer.consume(ws);
    match (lexer.peek_byte(0), lexer.peek_byte(1)) {
      (Some(b'/'), Some(b'/')) => {
        let m = lexer.through_char_or_end(b'\n');
        lexer.consume(m);
        preceded_by_line_terminator = true;
      }
      (Some(b'/'), Some(b'*')) => {
        let cp = lexer.checkpoint();
        if !lexer.skip_block_comment() {
          return Token {
            loc: lexer.since_checkpoint(cp),
            typ: TT::Invalid,
            preceded_by_line_terminator,
          };
        }
      }
      _ => break,
    }
  }

  if lexer.at_end() {
    return Token {
      loc: lexer.eof_range(),
      typ: TT::EOF,
      preceded_by_line_terminator,
    };
  }

  lexer.drive(preceded_by_line_terminator, |lexer| {
    let Some(c) = lexer.peek_char() else {
      return TT::EOF;
    };
    if is_id_start(c) {
      let m = lexer.while_chars(is_id_continue);
      lexer.consume(m);
      return TT::Identifier;
    }
    if c.is_ascii_digit() || (c == '.' && lexer.peek_byte(1).is_some_and(|b| b.is_ascii_digit())) {
      return lex_number(lexer);
    }
    if c == '"' || c == '\'' {
      return lex_string(lexer, c as u8);
    }
    lex_punctuation(lexer, c)
  })
}
