//! Enlazado con la toolchain del sistema. Estas pruebas solo corren en
//! hosts x86-64 Linux que disponen de `cc`.

#![cfg(all(target_arch = "x86_64", target_os = "linux"))]

use anyhow::{ensure, Result};
use std::{
    fs,
    path::PathBuf,
    process::{Command, Stdio},
};

fn has_cc() -> bool {
    Command::new("cc")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

fn build(name: &str, input: &str, extra: &[&str]) -> Result<PathBuf> {
    let path = std::env::temp_dir().join(format!("arithc-{}-{}", name, std::process::id()));

    let output = Command::new(env!("CARGO_BIN_EXE_arithc"))
        .arg(input)
        .args(["--target", "x86_64", "--link", "--output"])
        .arg(&path)
        .args(extra)
        .output()?;

    ensure!(
        output.status.success(),
        "arithc failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    Ok(path)
}

fn exit_code(name: &str, input: &str, extra: &[&str]) -> Result<Option<i32>> {
    let path = build(name, input, extra)?;
    let status = Command::new(&path).status()?;
    fs::remove_file(&path)?;

    Ok(status.code())
}

#[test]
fn linked_executables_return_the_value() -> Result<()> {
    if !has_cc() {
        return Ok(());
    }

    assert_eq!(exit_code("sum", "1+2*3", &[])?, Some(7));
    assert_eq!(exit_code("paren", "(1+2)*3", &[])?, Some(9));
    assert_eq!(exit_code("cmp", "2>1", &[])?, Some(1));

    // El estado de salida son los 8 bits bajos de `rax`
    assert_eq!(exit_code("neg", "-(1+2)", &[])?, Some(253));

    Ok(())
}

#[test]
fn stripped_executable() -> Result<()> {
    if !has_cc() {
        return Ok(());
    }

    assert_eq!(exit_code("strip", "5*(9-6)", &["--strip"])?, Some(15));
    Ok(())
}
