use dialect::Dialect;
use lex::Lexer;
use parse::Parser;
use tree::SyntaxTree;

pub mod dialect;
pub mod error;
pub mod lex;
pub mod loc;
pub mod parse;
pub mod token;
pub mod tree;

/// Parses a shader module into a concrete syntax tree.
///
/// Parsing never fails outright: top-level items that cannot be understood are
/// kept as [`tree::SyntaxKind::Error`] nodes and the corresponding errors are
/// available from [`SyntaxTree::errors`].
pub fn parse(source: &str, dialect: Dialect) -> SyntaxTree {
  let _span = tracing::debug_span!("parse", ?dialect, len = source.len()).entered();
  let lexer = Lexer::new(source, dialect);
  let mut parser = Parser::new(lexer);
  parser.parse_program()
}
