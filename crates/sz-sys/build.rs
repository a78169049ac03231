//! Build script for sz-sys crate.
//!
//! When the `link-libsz` feature is enabled, emits the link directives for the
//! vendor `libSz` shared library. The library directory defaults to the
//! standard Senzing install location and can be overridden with
//! `SENZING_LIB_DIR`.

use std::env;

const DEFAULT_LIB_DIR: &str = "/opt/senzing/er/lib";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=SENZING_LIB_DIR");

    if env::var_os("CARGO_FEATURE_LINK_LIBSZ").is_some() {
        let lib_dir = env::var("SENZING_LIB_DIR").unwrap_or_else(|_| DEFAULT_LIB_DIR.to_string());
        println!("cargo:rustc-link-search=native={}", lib_dir);
        println!("cargo:rustc-link-lib=dylib=Sz");
    }
}
