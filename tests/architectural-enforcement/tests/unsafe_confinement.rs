//! Integration Test: Unsafe Confinement
//!
//! **Policy**: `unsafe` is only allowed where the broker talks to C:
//! the dynamic TCTI loader (`dlopen`/`dlsym` and the TSS2 function table) and
//! the device backend's `poll` call. Everything else stays safe Rust.

use std::path::Path;

use architectural_enforcement::{production_dirs, production_lines};

const ALLOWED: &[&str] = &["transport/dynamic.rs", "transport/device.rs"];

fn is_allowed(path: &Path) -> bool {
    ALLOWED.iter().any(|suffix| path.ends_with(suffix))
}

#[test]
fn test_unsafe_only_in_ffi_backends() {
    let mut violations = Vec::new();

    for dir in production_dirs() {
        for line in production_lines(&dir) {
            if line.code.contains("unsafe") && !is_allowed(&line.path) {
                violations.push(line.report());
            }
        }
    }

    if !violations.is_empty() {
        eprintln!("\n❌ unsafe found outside the FFI backends!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ Allowed files:");
        for allowed in ALLOWED {
            eprintln!("  - abrmd/core/src/{allowed}");
        }

        panic!("\nFound {} unsafe site(s) outside FFI code.", violations.len());
    }
}

#[test]
fn test_ffi_backends_still_exist() {
    let core = &production_dirs()[0];
    for allowed in ALLOWED {
        assert!(
            core.join(allowed).exists(),
            "allow-list entry {allowed} no longer matches a file"
        );
    }
}
