//! Generate `idanalyzer.h` for C callers.
//!
//! The header is always written to `OUT_DIR`. Set `IDANALYZER_HEADER_DIR`
//! to also copy it somewhere a C build can find it. Generation failures
//! only warn, so `cargo build` still succeeds on toolchains where cbindgen
//! cannot parse the crate.

use std::env;
use std::path::PathBuf;

const HEADER: &str = "idanalyzer.h";

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/types.rs");
    println!("cargo:rerun-if-env-changed=IDANALYZER_HEADER_DIR");

    let (Ok(crate_dir), Ok(out_dir)) = (env::var("CARGO_MANIFEST_DIR"), env::var("OUT_DIR")) else {
        println!("cargo:warning=CARGO_MANIFEST_DIR or OUT_DIR unset; skipping C header");
        return;
    };
    let out = PathBuf::from(out_dir).join(HEADER);

    let config = cbindgen::Config {
        language: cbindgen::Language::C,
        include_guard: Some("IDANALYZER_H".to_string()),
        cpp_compat: true,
        ..Default::default()
    };

    let bindings = match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .generate()
    {
        Ok(bindings) => bindings,
        Err(e) => {
            println!("cargo:warning=failed to generate C header: {e}");
            return;
        }
    };
    bindings.write_to_file(&out);

    if let Ok(dir) = env::var("IDANALYZER_HEADER_DIR") {
        let dir = PathBuf::from(dir);
        if let Err(e) = std::fs::create_dir_all(&dir).and_then(|_| std::fs::copy(&out, dir.join(HEADER))) {
            println!("cargo:warning=failed to copy C header to {}: {e}", dir.display());
        }
    }
}
