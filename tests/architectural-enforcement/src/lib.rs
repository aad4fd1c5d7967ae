//! Architectural Enforcement
//!
//! Source scanners backing the workspace's structural rules:
//! - Production code never sleeps; periodic work runs on `tokio::time::interval`
//! - Routing state reads time from `tokio::time::Instant` so paused-clock
//!   tests drive breaker cool-downs, rate windows and health probes
//!
//! Test modules (`#[cfg(test)]` onward) are exempt from both rules.

use std::fs;
use std::path::{Path, PathBuf};

/// A rule breach at a specific source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: PathBuf,
    pub line: usize,
    pub text: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.line, self.text)
    }
}

/// Which rule a scan enforces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// `::sleep(` / `.sleep(` outside tests
    NoSleep,
    /// `std::time::Instant` outside tests
    TokioClock,
}

impl Rule {
    fn matches(self, code: &str) -> bool {
        match self {
            Self::NoSleep => code.contains("::sleep(") || code.contains(".sleep("),
            Self::TokioClock => {
                code.contains("std::time::Instant")
                    || (code.contains("std::time::{") && code.contains("Instant"))
            }
        }
    }
}

/// Workspace root, resolved from this crate's manifest directory
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// Production source directories covered by the rules
#[must_use]
pub fn production_dirs() -> Vec<PathBuf> {
    let root = workspace_root();
    vec![root.join("router/core/src"), root.join("router/cli/src")]
}

/// Scan every `.rs` file under `dir`
///
/// A missing directory yields no violations.
#[must_use]
pub fn scan_directory(dir: &Path, rule: Rule) -> Vec<Violation> {
    let mut violations = Vec::new();
    if !dir.exists() {
        return violations;
    }

    for entry in walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("rs") {
            continue;
        }
        // Shared test fixtures are compiled only under cfg(test)
        if path.file_name().and_then(|s| s.to_str()) == Some("test_utils.rs") {
            continue;
        }
        let Ok(content) = fs::read_to_string(path) else {
            continue;
        };
        violations.extend(
            scan_source(&content, rule)
                .into_iter()
                .map(|(line, text)| Violation {
                    path: path.to_path_buf(),
                    line,
                    text,
                }),
        );
    }

    violations
}

/// Scan one file's text, returning `(line_number, trimmed_line)` pairs
#[must_use]
pub fn scan_source(content: &str, rule: Rule) -> Vec<(usize, String)> {
    let mut hits = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with("#[cfg(test)]") {
            // Test modules sit at the end of each file
            break;
        }
        if trimmed.starts_with("//") {
            continue;
        }

        let code = line.split("//").next().unwrap_or(line);
        if rule.matches(code) {
            hits.push((idx + 1, trimmed.to_string()));
        }
    }

    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleep_detected() {
        let src = "async fn poll() {\n    tokio::time::sleep(Duration::from_millis(10)).await;\n}\n";
        let hits = scan_source(src, Rule::NoSleep);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, 2);
    }

    #[test]
    fn test_sleep_in_comment_ignored() {
        let src = "// never call thread::sleep(..) here\nlet x = 1; // .sleep( in trailing comment\n";
        assert!(scan_source(src, Rule::NoSleep).is_empty());
    }

    #[test]
    fn test_test_module_exempt() {
        let src = "fn real() {}\n\n#[cfg(test)]\nmod tests {\n    fn t() { std::thread::sleep(d); }\n}\n";
        assert!(scan_source(src, Rule::NoSleep).is_empty());
    }

    #[test]
    fn test_std_instant_detected() {
        let src = "use std::time::{Duration, Instant};\nuse std::time::Duration;\n";
        let hits = scan_source(src, Rule::TokioClock);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, 1);
    }

    #[test]
    fn test_tokio_instant_allowed() {
        let src = "use tokio::time::Instant;\nlet now = Instant::now();\n";
        assert!(scan_source(src, Rule::TokioClock).is_empty());
    }

    #[test]
    fn test_missing_directory_is_clean() {
        let violations = scan_directory(Path::new("/nonexistent/router/src"), Rule::NoSleep);
        assert!(violations.is_empty());
    }
}
