/// Integration tests for shell completion generation
use std::process::Command;

fn generate(shell: &str) -> String {
    let output = Command::new(env!("CARGO_BIN_EXE_oci-ops"))
        .args(["generate-completion", shell])
        .output()
        .expect("Failed to execute oci-ops");

    assert!(output.status.success(), "Command should succeed");
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_generate_completion_bash() {
    let stdout = generate("bash");

    assert!(stdout.contains("_oci-ops()"), "Should contain bash completion function");
    assert!(stdout.contains("complete -F _oci-ops"), "Should register the completion");
    for command in [
        "audit-export",
        "events-to-csv",
        "compartments",
        "list-resources",
        "list-instances",
        "start-stop",
        "generate-completion",
    ] {
        assert!(stdout.contains(command), "Should include {}", command);
    }
}

#[test]
fn test_generate_completion_zsh() {
    let stdout = generate("zsh");
    assert!(stdout.contains("#compdef oci-ops"));
}

#[test]
fn test_invalid_dates_exit_non_zero() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let output_path = temp_dir.path().join("out.json");

    let output = Command::new(env!("CARGO_BIN_EXE_oci-ops"))
        .args([
            "audit-export",
            "--start",
            "yesterday",
            "--end",
            "2025-01-20",
            "--output",
            output_path.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to execute oci-ops");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not a valid date"));
    assert!(!output_path.exists());
}

#[test]
fn test_missing_required_arguments() {
    let output = Command::new(env!("CARGO_BIN_EXE_oci-ops"))
        .args(["audit-export", "--start", "2025-01-01"])
        .output()
        .expect("Failed to execute oci-ops");

    assert!(!output.status.success());
}
