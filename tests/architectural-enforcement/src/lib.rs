//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles
//! of the broker crates:
//! - No `unwrap()` / `expect()` in production code
//! - `unsafe` confined to the FFI-facing TCTI backends
//!
//! The helpers here walk a crate's `src/` tree and hand back the production
//! lines of each file, i.e. everything above the first `#[cfg(test)]`.

use std::fs;
use std::path::{Path, PathBuf};

/// Workspace root, resolved from this package's manifest directory
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// Production source directories checked by every policy
pub fn production_dirs() -> Vec<PathBuf> {
    let root = workspace_root();
    vec![
        root.join("abrmd").join("core").join("src"),
        root.join("abrmd").join("daemon").join("src"),
    ]
}

/// One non-test line of a source file
#[derive(Debug)]
pub struct SourceLine {
    /// File the line came from
    pub path: PathBuf,
    /// 1-based line number
    pub number: usize,
    /// Line text with any trailing `//` comment removed
    pub code: String,
    /// Line text as written
    pub raw: String,
}

impl SourceLine {
    /// `path:line - text` for violation reports
    pub fn report(&self) -> String {
        format!("{}:{} - {}", self.path.display(), self.number, self.raw.trim())
    }
}

/// Production lines of every `.rs` file under `dir`
pub fn production_lines(dir: &Path) -> Vec<SourceLine> {
    let mut lines = Vec::new();
    if !dir.exists() {
        return lines;
    }

    for entry in walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.path().extension().and_then(|s| s.to_str()) == Some("rs") {
            collect_file(entry.path(), &mut lines);
        }
    }
    lines
}

fn collect_file(path: &Path, out: &mut Vec<SourceLine>) {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return,
    };

    for (idx, line) in content.lines().enumerate() {
        if line.trim_start().starts_with("#[cfg(test)]") {
            break;
        }
        let trimmed = line.trim_start();
        if trimmed.starts_with("//") {
            continue;
        }
        let code = line.split("//").next().unwrap_or(line);
        out.push(SourceLine {
            path: path.to_path_buf(),
            number: idx + 1,
            code: code.to_string(),
            raw: line.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_dirs_exist() {
        for dir in production_dirs() {
            assert!(dir.exists(), "missing source dir {}", dir.display());
        }
    }

    #[test]
    fn test_lines_stop_at_test_module() {
        let dir = production_dirs().remove(0);
        let lines = production_lines(&dir);
        assert!(!lines.is_empty());
        assert!(lines.iter().all(|l| !l.code.contains("#[test]")));
    }
}
