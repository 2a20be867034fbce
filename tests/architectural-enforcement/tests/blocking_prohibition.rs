//! Integration Test: Blocking Call Prohibition
//!
//! **Policy**: Production code in the core crate runs inside an async
//! runtime and MUST NOT block the executor. The only suspension point in a
//! task's execution is the backend client invocation; everything else has to
//! stay non-blocking.
//!
//! Test code is exempt: `#[cfg(test)]` modules sit at the end of each source
//! file, so scanning stops at the first test marker.

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

/// Calls that stall an async executor thread
const FORBIDDEN: &[&str] = &[
    "std::thread::sleep",
    "thread::sleep(",
    "futures::executor::block_on",
    "reqwest::blocking",
    "block_in_place",
    ".blocking_lock(",
    ".blocking_recv(",
];

/// Source files that are test-only by construction
const EXEMPT_FILES: &[&str] = &["test_utils.rs"];

#[test]
fn test_no_blocking_calls_in_production_code() {
    let core_src = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../switchboard/core/src");
    assert!(
        core_src.is_dir(),
        "expected core crate sources at {}",
        core_src.display()
    );

    let violations = find_violations(&core_src);

    if !violations.is_empty() {
        eprintln!("\nBlocking calls found in production async code:");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nUse tokio::time::sleep / async I/O instead, or move the code under #[cfg(test)].");
        panic!(
            "Found {} blocking call violation(s) in production code.",
            violations.len()
        );
    }
}

fn find_violations(root: &Path) -> Vec<String> {
    let mut violations = Vec::new();

    for entry in WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
    {
        let path = entry.path();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if EXEMPT_FILES.contains(&file_name) {
            continue;
        }

        let Ok(source) = fs::read_to_string(path) else {
            continue;
        };

        for (line_no, line) in source.lines().enumerate() {
            // Test modules close out every file; nothing after the marker is
            // production code.
            if line.contains("#[cfg(test)]") {
                break;
            }
            let trimmed = line.trim_start();
            if trimmed.starts_with("//") {
                continue;
            }

            for pattern in FORBIDDEN {
                if trimmed.contains(pattern) {
                    violations.push(format!(
                        "{}:{}: `{}`",
                        path.display(),
                        line_no + 1,
                        trimmed
                    ));
                }
            }
        }
    }

    violations
}
