// src/bin/scan.rs
// Token dump over a spec previously written with `rxlex --spec-json`.
//
//   scan <spec.json> <input> [--quiet]

use std::{env, fs, time::Instant};

use anyhow::{Context, Result, anyhow, bail};
use rxlex::{Scanner, Token, lexer::tables::load_spec_json_bytes};

fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let (Some(spec_path), Some(input_path)) = (args.next(), args.next()) else {
        bail!("usage: scan <spec.json> <input> [--quiet]");
    };
    let quiet = args.any(|a| a == "--quiet");

    let bytes = fs::read(&spec_path).with_context(|| format!("reading {spec_path}"))?;
    let spec = load_spec_json_bytes(&bytes).map_err(|e| anyhow!("{spec_path}: {e}"))?;
    let input = fs::read_to_string(&input_path).with_context(|| format!("reading {input_path}"))?;
    println!(
        "[scan] {} rules, {} conditions, {} bytes of input",
        spec.rule_count(),
        spec.conditions.len(),
        input.len()
    );

    let mut scanner = Scanner::new(spec);
    scanner.set_input(input);

    let t0 = Instant::now();
    let mut count = 0usize;
    loop {
        let token = scanner.lex()?;
        if token == Token::Eof {
            break;
        }
        count += 1;
        if !quiet {
            println!(
                "{:>4}:{:<3} {:<16} {:?}",
                scanner.yylloc().first_line,
                scanner.yylloc().first_column,
                token.to_string(),
                scanner.yytext()
            );
        }
    }
    let dt = t0.elapsed();
    println!(
        "[scan] {count} tokens in {:.3} ms ({} lines)",
        dt.as_secs_f64() * 1e3,
        scanner.yylineno() + 1
    );
    Ok(())
}
