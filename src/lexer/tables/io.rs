// src/lexer/tables/io.rs
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    time::Instant,
};

use super::CompiledLexerSpec;

// -------------------- JSON (de)serialization --------------------

pub fn save_spec_json(path: &Path, spec: &CompiledLexerSpec) -> std::io::Result<()> {
    let instant = Instant::now();
    let f = File::create(path)?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, spec)?;
    let flush = w.flush();
    log::debug!(
        "Saved compiled spec ({} rules) to {} in {} ms",
        spec.rules.len(),
        path.display(),
        instant.elapsed().as_millis()
    );
    flush
}

pub fn load_spec_json_bytes(data: &[u8]) -> Result<CompiledLexerSpec, String> {
    let spec = serde_json::from_slice::<CompiledLexerSpec>(data)
        .map_err(|e| format!("Failed to parse compiled spec JSON: {e}"))?;
    if !spec.is_consistent() {
        return Err("compiled spec JSON has mismatched rule/action indices".into());
    }
    Ok(spec)
}
