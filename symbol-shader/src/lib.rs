use error::StructuralError;
use parse_shader::dialect::Dialect;
use parse_shader::tree::SyntaxTree;
use table::SymbolTable;

pub mod error;
pub mod extract;
pub mod shake;
pub mod table;

pub use shake::analyze;
pub use shake::resolve_shake_ops;
pub use shake::ShakeOp;
pub use shake::ShakeTable;

/// Builds the symbol table of one parsed unit.
///
/// `name` is only used to label errors.
pub fn extract(
  source: &str,
  tree: &SyntaxTree,
  dialect: Dialect,
  name: Option<&str>,
) -> Result<SymbolTable, StructuralError> {
  let _span = tracing::debug_span!("extract", ?dialect, name).entered();
  let table = match dialect {
    Dialect::Wgsl => extract::wgsl::extract(source, tree, name)?,
    Dialect::Glsl => extract::glsl::extract(source, tree, name)?,
  };
  tracing::debug!(
    symbols = table.symbols.len(),
    declarations = table.declarations.len(),
    modules = table.modules.len(),
    "extracted symbol table"
  );
  Ok(table)
}
