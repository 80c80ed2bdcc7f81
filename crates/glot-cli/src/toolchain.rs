//! Toolchain auto-discovery helpers.
//!
//! Silently runs `<toolchain> --version` and reports whether the foreign
//! toolchain is installed and what it identifies itself as.

use std::process::Command;

/// Run `<program> --version` and return the first line it prints.
///
/// Returns `Err(reason)` when the binary cannot be found or the probe run
/// fails.
pub fn probe(program: &str) -> Result<String, String> {
    let output = Command::new(program)
        .arg("--version")
        .output()
        .map_err(|e| format!("toolchain '{}' not found: {}", program, e))?;

    if !output.status.success() {
        return Err(format!(
            "'{} --version' exited with {}",
            program, output.status
        ));
    }

    let first_line = String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .unwrap_or("")
        .trim()
        .to_string();
    if first_line.is_empty() {
        Ok("(no version output)".to_string())
    } else {
        Ok(first_line)
    }
}

/// Returns `true` if the toolchain binary responds to `--version`.
pub fn is_available(program: &str) -> bool {
    probe(program).is_ok()
}
