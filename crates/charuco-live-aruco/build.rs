//! Compiles `data/*_CODES.json` into `$OUT_DIR/builtins.rs`.

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Deserialize)]
struct CodesFile {
    name: String,
    marker_size: usize,
    max_correction_bits: u8,
    codes: Vec<u64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let data_dir = Path::new("data");
    println!("cargo:rerun-if-changed={}", data_dir.display());

    let mut files: Vec<PathBuf> = fs::read_dir(data_dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with("_CODES.json"))
        })
        .collect();
    files.sort();

    let mut out = String::new();
    let mut table = String::new();
    for path in &files {
        println!("cargo:rerun-if-changed={}", path.display());
        let raw = fs::read_to_string(path)?;
        let dict: CodesFile = serde_json::from_str(&raw)
            .map_err(|e| format!("{}: {e}", path.display()))?;
        let ident = dict.name.to_uppercase().replace(['-', ' '], "_");

        writeln!(out, "/// `{}`: {} markers.", dict.name, dict.codes.len())?;
        writeln!(out, "pub const {ident}_CODES: &[u64] = &[")?;
        for chunk in dict.codes.chunks(12) {
            let row: Vec<String> = chunk.iter().map(|c| format!("0x{c:016x}")).collect();
            writeln!(out, "    {},", row.join(", "))?;
        }
        writeln!(out, "];\n")?;

        writeln!(
            table,
            "    Builtin {{ name: {:?}, marker_size: {}, max_correction_bits: {}, codes: {ident}_CODES }},",
            dict.name, dict.marker_size, dict.max_correction_bits
        )?;
    }
    writeln!(out, "const BUILTINS: &[Builtin] = &[\n{table}];")?;

    let dest = PathBuf::from(env::var("OUT_DIR")?).join("builtins.rs");
    fs::write(dest, out)?;
    Ok(())
}
