// src/main.rs
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use rxlex::{
    Grammar, ModuleEmitter, ModuleType, Scanner, Skeleton, TokenMap,
    lexer::tables::save_spec_json,
};
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

#[derive(Parser, Debug)]
#[command(name = "rxlex", version, about = "Compile a lexical grammar into a scanner module")]
struct Cli {
    /// Grammar in JSON form.
    grammar: PathBuf,

    /// Token map: `{"NAME": id}` or a parser's terminal table `{"<id>": "NAME"}`.
    #[arg(long)]
    tokens: Option<PathBuf>,

    /// Overrides the grammar's `moduleType` (commonjs, amd, js).
    #[arg(long)]
    module_type: Option<ModuleType>,

    /// Overrides the grammar's `moduleName`.
    #[arg(long)]
    module_name: Option<String>,

    /// Directory holding a replacement `lexer` skeleton.
    #[arg(long)]
    template: Option<PathBuf>,

    /// Where to write the module; stdout if omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also dump the compiled spec as JSON.
    #[arg(long)]
    spec_json: Option<PathBuf>,

    /// Tokenize this file with the in-process scanner instead of emitting.
    #[arg(long)]
    scan: Option<PathBuf>,
}

fn load_tokens(path: &Path) -> Result<TokenMap> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading token map {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("parsing token map {}", path.display()))?;
    TokenMap::from_json_value(value).with_context(|| format!("token map {}", path.display()))
}

fn scan_file(scanner: &mut Scanner, path: &Path) -> Result<()> {
    let input =
        fs::read_to_string(path).with_context(|| format!("reading input {}", path.display()))?;
    scanner.set_input(input);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut count = 0usize;
    loop {
        let token = scanner
            .lex()
            .with_context(|| format!("scanning {}", path.display()))?;
        if token.is_eof() {
            break;
        }
        let loc = scanner.yylloc();
        writeln!(
            out,
            "{}:{}\t{token}\t{:?}",
            loc.first_line,
            loc.first_column,
            scanner.yytext()
        )?;
        count += 1;
    }
    let echoed = scanner.take_echoed();
    if !echoed.is_empty() {
        out.write_all(echoed.as_bytes())?;
    }
    log::info!("[scan] {count} tokens from {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let source = fs::read_to_string(&cli.grammar)
        .with_context(|| format!("reading grammar {}", cli.grammar.display()))?;
    let mut grammar = Grammar::from_json_str(&source)
        .with_context(|| format!("parsing grammar {}", cli.grammar.display()))?;
    if let Some(module_type) = cli.module_type {
        grammar.options.module_type = Some(module_type);
    }
    if let Some(name) = cli.module_name.clone() {
        grammar.options.module_name = Some(name);
    }

    let tokens = cli.tokens.as_deref().map(load_tokens).transpose()?;
    let spec = rxlex::compile(&grammar, tokens.as_ref())
        .with_context(|| format!("compiling {}", cli.grammar.display()))?;

    if let Some(path) = &cli.spec_json {
        save_spec_json(path, &spec)
            .with_context(|| format!("writing spec {}", path.display()))?;
        log::info!("[tables] wrote compiled spec -> {}", path.display());
    }

    if let Some(path) = &cli.scan {
        let mut scanner = Scanner::new(spec);
        return scan_file(&mut scanner, path);
    }

    let skeleton = match &cli.template {
        Some(dir) => Skeleton::from_dir(dir)?,
        None => Skeleton::javascript(),
    };
    let text = ModuleEmitter::new(skeleton).emit(&spec, spec.options.module_type())?;

    match &cli.output {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)?;
            }
            fs::write(path, &text).with_context(|| format!("writing {}", path.display()))?;
            log::info!("[emit] {} bytes -> {}", text.len(), path.display());
        }
        None => {
            let mut out = io::stdout().lock();
            out.write_all(text.as_bytes())?;
            out.write_all(b"\n")?;
        }
    }
    Ok(())
}
