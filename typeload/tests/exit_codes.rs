use std::process::Command;

use anyhow::Context as _;

fn status_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

fn corpus(dir: &tempfile::TempDir, name: &str, text: &str) -> anyhow::Result<std::path::PathBuf> {
    let path = dir.path().join(name);
    std::fs::write(&path, text).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

fn expect_code(out: &std::process::Output, code: i32) -> anyhow::Result<()> {
    anyhow::ensure!(
        status_code(out.status) == code,
        "expected exit code {code}, got {}\nstdout:\n{}\nstderr:\n{}",
        status_code(out.status),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    Ok(())
}

#[test]
fn invalid_flags_exit_30() -> anyhow::Result<()> {
    let out = Command::new(env!("CARGO_BIN_EXE_typeload"))
        .arg("run")
        .arg("./does-not-matter.txt")
        .arg("--interval")
        .arg("10x")
        .output()
        .context("run typeload binary")?;

    expect_code(&out, 30)
}

#[test]
fn missing_corpus_exit_30() -> anyhow::Result<()> {
    let out = Command::new(env!("CARGO_BIN_EXE_typeload"))
        .arg("run")
        .arg("./definitely-missing-corpus.txt")
        .output()
        .context("run typeload binary")?;

    expect_code(&out, 30)?;
    anyhow::ensure!(String::from_utf8_lossy(&out.stderr).contains("failed to read corpus"));
    Ok(())
}

#[test]
fn zero_concurrency_exit_30() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = corpus(&dir, "c.txt", "hello\n")?;

    let out = Command::new(env!("CARGO_BIN_EXE_typeload"))
        .arg("run")
        .arg(&path)
        .arg("--concurrency")
        .arg("0")
        .arg("--chunks")
        .arg("1")
        .output()
        .context("run typeload binary")?;

    expect_code(&out, 30)
}

#[test]
fn partially_failed_run_exit_10() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = corpus(&dir, "c.txt", "one\ntwo\n")?;

    let out = Command::new(env!("CARGO_BIN_EXE_typeload"))
        .arg("run")
        .arg(&path)
        .arg("--chunks")
        .arg("2")
        .arg("--refuse-connections")
        .arg("1")
        .arg("--output")
        .arg("json")
        .output()
        .context("run typeload binary")?;

    expect_code(&out, 10)
}

#[test]
fn fully_failed_run_exit_40() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = corpus(&dir, "c.txt", "one\ntwo\n")?;

    let out = Command::new(env!("CARGO_BIN_EXE_typeload"))
        .arg("run")
        .arg(&path)
        .arg("--chunks")
        .arg("2")
        .arg("--refuse-connections")
        .arg("5")
        .arg("--output")
        .arg("json")
        .output()
        .context("run typeload binary")?;

    expect_code(&out, 40)?;
    anyhow::ensure!(String::from_utf8_lossy(&out.stderr).contains("no chunk completed (2 failed)"));

    let failed: Vec<serde_json::Value> = String::from_utf8_lossy(&out.stdout)
        .lines()
        .filter_map(|l| serde_json::from_str(l).ok())
        .collect();
    anyhow::ensure!(failed.len() == 2, "expected 2 chunk lines, got {failed:?}");
    for line in &failed {
        anyhow::ensure!(line.get("ok").and_then(serde_json::Value::as_bool) == Some(false));
        let error = line
            .get("error")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        anyhow::ensure!(error.contains("connection refused"), "chunk error: {error}");
    }
    Ok(())
}
