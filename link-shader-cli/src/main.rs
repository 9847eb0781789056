use clap::{Args, Parser, Subcommand};
use diagnostics::files::SimpleFiles;
use diagnostics::render::render_diagnostic;
use diagnostics::{host_error, Diagnostic, FileId, Span, TextRange};
use link_shader::bundle::parse_link_alias;
use link_shader::{link_code, Defines, LinkError, LinkOptions, Module, ModuleCache};
use parse_shader::dialect::Dialect;
use parse_shader::parse;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::stdout;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use symbol_shader::table::SymbolTable;
use symbol_shader::{analyze, extract, ShakeTable};
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "link-shader", version, about = "Tree-shaking WGSL/GLSL shader linker")]
struct Cli {
  #[command(subcommand)]
  command: Commands,

  /// Emit tracing spans (JSON) for profiling/debugging.
  #[arg(long, global = true)]
  trace: bool,
}

#[derive(Subcommand)]
enum Commands {
  /// Link a shader and everything it imports or links into one program.
  Link(LinkArgs),
  /// Compile a module to JSON that can be linked without parsing.
  Compile(CompileArgs),
  /// Print the symbol and reachability tables of a module as JSON.
  Symbols(SourceArgs),
}

#[derive(Args)]
struct SourceArgs {
  /// Shader source file.
  input: PathBuf,

  /// Shader dialect; inferred from the file extension when omitted.
  #[arg(long, value_name = "wgsl|glsl")]
  dialect: Option<Dialect>,
}

#[derive(Args)]
struct LinkArgs {
  #[command(flatten)]
  source: SourceArgs,

  /// Library available to imports under the given path.
  #[arg(long = "lib", value_name = "NAME=FILE", value_parser = parse_file_pair)]
  libs: Vec<(String, PathBuf)>,

  /// Module satisfying a link placeholder, optionally bound to another entry point.
  #[arg(long = "link", value_name = "NAME[:ENTRY]=FILE", value_parser = parse_file_pair)]
  links: Vec<(String, PathBuf)>,

  /// Constant, or attribute substitution when NAME starts with `@`.
  #[arg(long = "define", value_name = "NAME=VALUE", value_parser = parse_define)]
  defines: Vec<(String, String)>,

  /// Header replacing the dialect's default preamble.
  #[arg(long)]
  preamble: Option<String>,

  /// Replay modules from their compact streams instead of syntax trees.
  #[arg(long)]
  compressed: bool,

  /// Output destination; omit for stdout.
  #[arg(short, long)]
  output: Option<PathBuf>,
}

#[derive(Args)]
struct CompileArgs {
  #[command(flatten)]
  source: SourceArgs,

  /// Module name recorded in the output; defaults to the file stem.
  #[arg(long)]
  name: Option<String>,

  /// Entry point to bind; defaults to `main` when declared.
  #[arg(long)]
  entry: Option<String>,

  /// Output destination; omit for stdout.
  #[arg(short, long)]
  output: Option<PathBuf>,
}

#[derive(Serialize)]
struct SymbolsOutput<'a> {
  table: &'a SymbolTable,
  shake: &'a ShakeTable,
}

fn parse_file_pair(raw: &str) -> Result<(String, PathBuf), String> {
  match raw.split_once('=') {
    Some((name, path)) if !name.is_empty() && !path.is_empty() => {
      Ok((name.to_string(), PathBuf::from(path)))
    }
    _ => Err(format!("expected NAME=FILE, got `{raw}`")),
  }
}

fn parse_define(raw: &str) -> Result<(String, String), String> {
  match raw.split_once('=') {
    Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
    _ => Err(format!("expected NAME=VALUE, got `{raw}`")),
  }
}

fn init_tracing(enabled: bool) {
  if !enabled {
    return;
  }
  let _ = tracing_subscriber::fmt()
    .with_span_events(FmtSpan::CLOSE)
    .with_max_level(Level::DEBUG)
    .json()
    .with_ansi(false)
    .with_writer(std::io::stderr)
    .try_init();
}

/// Every file read so far, so diagnostics can point into any of them.
struct Sources {
  files: SimpleFiles,
  by_module: HashMap<String, FileId>,
}

impl Sources {
  fn new() -> Sources {
    Sources {
      files: SimpleFiles::new(),
      by_module: HashMap::new(),
    }
  }

  fn read(&mut self, module: &str, path: &Path) -> Result<String, Diagnostic> {
    let name = path.display().to_string();
    match fs::read_to_string(path) {
      Ok(text) => {
        let file = self.files.add(name, text.as_str());
        self.by_module.insert(module.to_string(), file);
        Ok(text)
      }
      Err(err) => {
        let file = self.files.add(name, "");
        Err(host_error(
          Some(Span::new(file, TextRange::new(0, 0))),
          format!("failed to read {}: {err}", path.display()),
        ))
      }
    }
  }

  fn link_error(&self, err: &LinkError) -> Diagnostic {
    let module = match err {
      LinkError::Structural(err) => err.name.as_deref(),
      LinkError::UnresolvedImport { importer, .. } | LinkError::UnresolvedLink { importer, .. } => {
        Some(importer.as_str())
      }
      _ => None,
    };
    let file = module
      .and_then(|m| self.by_module.get(m))
      .copied()
      .unwrap_or(FileId(0));
    err.to_diagnostic(file)
  }

  fn report(&self, diagnostic: &Diagnostic) -> ExitCode {
    eprintln!("{}", render_diagnostic(&self.files, diagnostic));
    ExitCode::FAILURE
  }
}

fn dialect_of(source: &SourceArgs) -> Dialect {
  source.dialect.unwrap_or_else(|| {
    source
      .input
      .extension()
      .and_then(|ext| ext.to_str())
      .and_then(Dialect::from_extension)
      .unwrap_or(Dialect::Wgsl)
  })
}

fn write_output(sources: &mut Sources, output: Option<&Path>, text: &str) -> ExitCode {
  let result = match output {
    Some(p) => fs::write(p, text).map_err(|err| (p.display().to_string(), err)),
    None => stdout()
      .write_all(text.as_bytes())
      .and_then(|_| stdout().write_all(b"\n"))
      .map_err(|err| ("<stdout>".to_string(), err)),
  };
  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err((dest, err)) => {
      let file = sources.files.add(dest, "");
      sources.report(&host_error(
        Some(Span::new(file, TextRange::new(0, 0))),
        format!("failed to write output: {err}"),
      ))
    }
  }
}

fn run_link(args: LinkArgs) -> ExitCode {
  let mut sources = Sources::new();
  let dialect = dialect_of(&args.source);
  let main = match sources.read("main", &args.source.input) {
    Ok(text) => text,
    Err(diagnostic) => return sources.report(&diagnostic),
  };
  let mut libs = Vec::new();
  for (name, path) in args.libs.iter() {
    match sources.read(name, path) {
      Ok(text) => libs.push((name.clone(), text)),
      Err(diagnostic) => return sources.report(&diagnostic),
    };
  }
  let mut links = Vec::new();
  for (key, path) in args.links.iter() {
    let (module, _) = parse_link_alias(key);
    match sources.read(module, path) {
      Ok(text) => links.push((key.clone(), text)),
      Err(diagnostic) => return sources.report(&diagnostic),
    };
  }
  let defines: Defines = args.defines.iter().cloned().collect();

  let mut options = LinkOptions::new(dialect).with_compressed(args.compressed);
  if let Some(preamble) = args.preamble {
    options = options.with_preamble(preamble);
  }
  let libs: Vec<(&str, &str)> = libs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
  let links: Vec<(&str, &str)> = links.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
  let cache = ModuleCache::default();
  match link_code(&options, &main, &libs, &links, &defines, Some(&cache)) {
    Ok(code) => write_output(&mut sources, args.output.as_deref(), &code),
    Err(err) => sources.report(&sources.link_error(&err)),
  }
}

fn run_compile(args: CompileArgs) -> ExitCode {
  let mut sources = Sources::new();
  let dialect = dialect_of(&args.source);
  let name = args.name.clone().unwrap_or_else(|| {
    args
      .source
      .input
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_else(|| "main".to_string())
  });
  let code = match sources.read(&name, &args.source.input) {
    Ok(text) => text,
    Err(diagnostic) => return sources.report(&diagnostic),
  };
  let module = match Module::load(&name, &code, dialect, true) {
    Ok(module) => module.bind_entry_point(args.entry.as_deref()),
    Err(err) => return sources.report(&sources.link_error(&err)),
  };
  let Some(compiled) = module.to_compiled() else {
    return sources.report(&host_error(None, format!("module `{name}` has no compiled form")));
  };
  match compiled.to_json() {
    Ok(json) => write_output(&mut sources, args.output.as_deref(), &json),
    Err(err) => sources.report(&sources.link_error(&err)),
  }
}

fn run_symbols(args: SourceArgs) -> ExitCode {
  let mut sources = Sources::new();
  let dialect = dialect_of(&args);
  let code = match sources.read("main", &args.input) {
    Ok(text) => text,
    Err(diagnostic) => return sources.report(&diagnostic),
  };
  let tree = parse(&code, dialect);
  let table = match extract(&code, &tree, dialect, Some("main")) {
    Ok(table) => table,
    Err(err) => return sources.report(&err.to_diagnostic(FileId(0))),
  };
  let shake = analyze(&table);
  let output = SymbolsOutput {
    table: &table,
    shake: &shake,
  };
  match serde_json::to_string_pretty(&output) {
    Ok(json) => write_output(&mut sources, None, &json),
    Err(err) => sources.report(&host_error(None, format!("failed to serialize tables: {err}"))),
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.trace);
  match cli.command {
    Commands::Link(args) => run_link(args),
    Commands::Compile(args) => run_compile(args),
    Commands::Symbols(args) => run_symbols(args),
  }
}
