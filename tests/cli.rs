use std::process::{Command, Output};

fn simred_deck(args: &[&str], dir: &std::path::Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_simred-deck"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn convert_without_input_fails_with_message() {
    let dir = tempfile::tempdir().unwrap();

    let out = simred_deck(&["convert"], dir.path());

    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("presentacion_simred.docx"), "{stderr}");
    assert!(!dir.path().join("presentacion_simred.pdf").exists());
}

#[test]
fn convert_reports_unreadable_document() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("roto.docx"), b"not a package").unwrap();

    let out = simred_deck(&["convert", "roto.docx"], dir.path());

    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Failed to convert"), "{stderr}");
    assert!(stderr.contains("Error al convertir a PDF"), "{stderr}");
}

#[test]
fn build_then_convert_with_defaults() {
    let dir = tempfile::tempdir().unwrap();

    let build = simred_deck(&["build"], dir.path());
    assert!(build.status.success());
    assert!(String::from_utf8_lossy(&build.stdout).contains("Documento Word creado exitosamente"));

    let convert = simred_deck(&["convert"], dir.path());
    assert!(convert.status.success());
    assert!(String::from_utf8_lossy(&convert.stdout).contains("PDF creado exitosamente"));
    assert!(dir.path().join("presentacion_simred.pdf").is_file());
}
