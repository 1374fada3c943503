//! Build script for the storefront crate.
//!
//! Content-hashes the stylesheet and script so they can be served with
//! immutable caching.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

fn main() {
    let manifest_dir =
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo");
    let static_dir = Path::new(&manifest_dir).join("static");

    hash_asset(&static_dir, "css", "main.css", "CSS_HASH");
    hash_asset(&static_dir, "js", "app.js", "JS_HASH");
}

/// Hash `static/{dir}/{file}` and copy it to `static/{dir}/derived/` with the
/// hash in the filename. Sets `{env_key}` for `env!()`; empty when the file
/// is missing.
fn hash_asset(static_dir: &Path, dir: &str, file: &str, env_key: &str) {
    let source = static_dir.join(dir).join(file);
    println!("cargo:rerun-if-changed={}", source.display());

    let content = match fs::read(&source) {
        Ok(content) => content,
        Err(e) => {
            println!("cargo:warning=Could not read {file}: {e}");
            println!("cargo:rustc-env={env_key}=");
            return;
        }
    };

    let hash = format!("{:x}", Sha256::digest(&content));
    let short_hash = &hash[..8];
    println!("cargo:rustc-env={env_key}={short_hash}");

    let (stem, ext) = file.rsplit_once('.').unwrap_or((file, ""));
    let derived_dir = static_dir.join(dir).join("derived");
    fs::create_dir_all(&derived_dir).expect("Failed to create derived asset directory");
    fs::copy(&source, derived_dir.join(format!("{stem}.{short_hash}.{ext}")))
        .expect("Failed to copy asset to derived directory");
}
