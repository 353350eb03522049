// CLI behaviour of the compliance-wizard binary
// Offline commands only; the run command is covered against a mock backend elsewhere

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn wizard(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("compliance-wizard").unwrap();
    cmd.arg("--config-dir").arg(config_dir.path());
    cmd
}

#[test]
fn test_no_subcommand_shows_getting_started() {
    let dir = TempDir::new().unwrap();

    wizard(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Compliance Wizard"))
        .stdout(predicate::str::contains("compliance-wizard validate --project FILE"));
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();

    wizard(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("steps"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("run"));
}

#[test]
fn test_steps_prints_default_definition() {
    let dir = TempDir::new().unwrap();

    wizard(&dir)
        .arg("steps")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. Tipo de edificio"))
        .stdout(predicate::str::contains("6. Resolución de ambigüedades"))
        .stdout(predicate::str::contains("7. Checklist final"));
}

#[test]
fn test_steps_uses_configured_definition() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("compliance-wizard.toml"),
        r#"
[[workflow.definition.steps]]
title = "Datos del proyecto"
rule = "primary_use_selected"

[[workflow.definition.steps]]
title = "Documentos"
rule = "documents_present"
on_enter = "run_analysis"
"#,
    )
    .unwrap();

    wizard(&dir)
        .arg("steps")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. Datos del proyecto"))
        .stdout(predicate::str::contains("2. Documentos"))
        .stdout(predicate::str::contains("Checklist final").not());
}

#[test]
fn test_validate_reports_incomplete_project() {
    let dir = TempDir::new().unwrap();
    let project = dir.path().join("project.toml");
    std::fs::write(&project, "existing_building = true\n").unwrap();

    wizard(&dir)
        .arg("validate")
        .arg("--project")
        .arg(&project)
        .assert()
        .failure()
        .stdout(predicate::str::contains("❌ 2. Uso principal"))
        .stderr(predicate::str::contains("incomplete"));
}

#[test]
fn test_validate_accepts_complete_project() {
    let dir = TempDir::new().unwrap();
    let memoria = dir.path().join("memoria.pdf");
    let plano = dir.path().join("plano.pdf");
    std::fs::write(&memoria, b"%PDF-1.7").unwrap();
    std::fs::write(&plano, b"%PDF-1.7").unwrap();

    let project = dir.path().join("project.json");
    let content = serde_json::json!({
        "primary_use": "servicios_terciarios",
        "secondary_uses": [{"use": "garaje-aparcamiento", "floors": ["sótano 1", "sótano 2"]}],
        "memoria": memoria,
        "planos": [plano],
    });
    std::fs::write(&project, content.to_string()).unwrap();

    wizard(&dir)
        .arg("validate")
        .arg("--project")
        .arg(&project)
        .assert()
        .success()
        .stdout(predicate::str::contains("⏳ 5. Análisis"))
        .stdout(predicate::str::contains("Project is ready to run"));
}
