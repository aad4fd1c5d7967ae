//! Integration Test: Sleep Prohibition and Clock Source
//!
//! **Policy**: Router production code MUST NOT sleep. Waiting happens on
//! channels, the primitive's futures, or `tokio::time::interval`.
//! Every timestamp in routing state comes from `tokio::time::Instant`.
//! **Exceptions**: test code

use architectural_enforcement::{production_dirs, scan_directory, Rule, Violation};

fn scan_all(rule: Rule) -> Vec<Violation> {
    production_dirs()
        .iter()
        .flat_map(|dir| scan_directory(dir, rule))
        .collect()
}

#[test]
fn test_production_dirs_exist() {
    for dir in production_dirs() {
        assert!(dir.exists(), "missing source directory: {}", dir.display());
    }
}

#[test]
fn test_no_sleep_in_production_code() {
    let violations = scan_all(Rule::NoSleep);

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Sleep calls found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ ACCEPTABLE:");
        eprintln!("  - Periodic tasks using tokio::time::interval()");
        eprintln!("  - Test code (#[cfg(test)] modules)");

        panic!(
            "\nFound {} sleep violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

#[test]
fn test_routing_state_uses_tokio_clock() {
    let violations = scan_all(Rule::TokioClock);

    if !violations.is_empty() {
        eprintln!("\n❌ std::time::Instant found in production code!");
        eprintln!("Breaker cool-downs, rate windows and probes must follow tokio's clock.\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }

        panic!("\nFound {} clock violation(s).", violations.len());
    }
}
