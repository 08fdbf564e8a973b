use std::process::Command;

use openctm_core::{Context, ContextMode};

fn ctmtool() -> Command {
    Command::new(env!("CARGO_BIN_EXE_ctmtool"))
}

#[test]
fn test_info_prints_counts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tri.ctm");

    let mut ctx = Context::new(ContextMode::Export);
    ctx.define_mesh(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], vec![[0, 1, 2]], None)
        .unwrap();
    ctx.add_attrib_map(vec![[1.0, 0.5, 0.25, 1.0]; 3], "Color").unwrap();
    ctx.save_file(&path).unwrap();

    let output = ctmtool().arg("info").arg(&path).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Method:      MG1"));
    assert!(stdout.contains("Vertices:    3"));
    assert!(stdout.contains("Triangles:   1"));
    assert!(stdout.contains("Attrib map:  Color"));
}

#[test]
fn test_missing_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = ctmtool()
        .arg("convert")
        .arg(dir.path().join("missing.ctm"))
        .arg(dir.path().join("out.ctm"))
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to load"));
}
