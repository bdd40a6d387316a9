// Build script that tries to generate a C header with `cbindgen`.
// If `cbindgen` is not available, it falls back to copying the
// checked-in `include/feedline.h` to $OUT_DIR.
//
// Either way, consumers can include the header from:
//   - <repo>/feedline-ffi/include/feedline.h      (checked-in)
//   - $OUT_DIR/feedline.h

use std::{env, fs, path::PathBuf, process::Command};

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=include/feedline.h");

    let crate_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let header_repo = crate_dir.join("include").join("feedline.h");
    let header_out = out_dir.join("feedline.h");

    let cbindgen_ok = Command::new("cbindgen")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);

    if cbindgen_ok {
        let status = Command::new("cbindgen")
            .args(["--crate", "feedline-ffi", "--lang", "C", "--output"])
            .arg(&header_out)
            .current_dir(&crate_dir)
            .status();
        if matches!(status, Ok(s) if s.success()) {
            println!("cargo:warning=feedline-ffi: generated header with cbindgen -> {}", header_out.display());
            return;
        }
        println!("cargo:warning=feedline-ffi: cbindgen failed; falling back to checked-in header");
    }

    if header_repo.exists() {
        fs::copy(&header_repo, &header_out).expect("failed to copy include/feedline.h to OUT_DIR");
    }
}
