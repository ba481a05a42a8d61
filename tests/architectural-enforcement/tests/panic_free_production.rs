//! Integration Test: Panic-Free Production Code
//!
//! **Policy**: Production code in the broker crates propagates errors with
//! `Result` and `?`; it MUST NOT call `unwrap()` or `expect()`.
//! **Exceptions**: test modules, and the documented capability panic in
//! `source.rs` which is raised with `panic!` rather than `unwrap`.

use architectural_enforcement::{production_dirs, production_lines};

#[test]
fn test_no_unwrap_in_production_code() {
    let mut violations = Vec::new();

    for dir in production_dirs() {
        for line in production_lines(&dir) {
            if line.code.contains(".unwrap()") || line.code.contains(".expect(") {
                violations.push(line.report());
            }
        }
    }

    if !violations.is_empty() {
        eprintln!("\n❌ unwrap()/expect() found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ Use instead:");
        eprintln!("  - `?` with a thiserror variant in abrmd-core");
        eprintln!("  - `.context(..)?` in abrmd-daemon");
        eprintln!("  - `unwrap_or` / `unwrap_or_else` when a fallback is correct");

        panic!(
            "\nFound {} panic site(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}
