//! Project files read by the CLI.
//!
//! ```toml
//! existing_building = false
//! primary_use = "residencial"
//! memoria = "docs/memoria.pdf"
//! planos = ["docs/plantas.pdf", "docs/alzados.pdf"]
//!
//! [[secondary_uses]]
//! use = "garaje-aparcamiento"
//! floors = ["sótano 1"]
//! ranges = [{ kind = "sotano", from = -3, to = -2 }]
//! ```

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::draft::{FileRef, FloorLevel, ProjectDraft, RangeKind, UseType, PDF_MIME_TYPE};

const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RangeSpec {
    pub kind: RangeKind,
    pub from: i32,
    pub to: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SecondaryUseSpec {
    #[serde(rename = "use")]
    pub use_type: UseType,
    /// Free-text floor labels such as "planta baja" or "sótano 2"
    #[serde(default)]
    pub floors: Vec<String>,
    #[serde(default)]
    pub ranges: Vec<RangeSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProjectSpec {
    pub existing_building: bool,
    pub primary_use: Option<UseType>,
    /// Enables the secondary-use step even when the list is still empty
    pub has_secondary_uses: bool,
    pub secondary_uses: Vec<SecondaryUseSpec>,
    pub memoria: Option<PathBuf>,
    pub planos: Vec<PathBuf>,
}

impl ProjectSpec {
    /// Read a project file; `.json` is parsed as JSON, anything else as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read project file {}", path.display()))?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let spec = if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON project file {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Invalid TOML project file {}", path.display()))?
        };
        Ok(spec)
    }

    /// Build the draft for everything but the documents.
    pub fn to_draft(&self) -> Result<ProjectDraft> {
        let mut draft = ProjectDraft::new();
        draft.set_building_type(self.existing_building);
        draft.set_primary_use(self.primary_use);
        draft.set_secondary_uses_enabled(self.has_secondary_uses || !self.secondary_uses.is_empty());

        for secondary in &self.secondary_uses {
            let use_type = secondary.use_type;
            draft.add_secondary_use(use_type)?;

            let floors = secondary
                .floors
                .iter()
                .map(|label| {
                    FloorLevel::parse_label(label)
                        .ok_or_else(|| anyhow!("Unrecognised floor '{label}' for {use_type}"))
                })
                .collect::<Result<Vec<_>>>()?;
            draft.set_floors_for_use(use_type, floors)?;

            for range in &secondary.ranges {
                draft
                    .add_floor_range(use_type, range.kind, range.from, range.to)
                    .with_context(|| format!("Invalid floor range for {use_type}"))?;
            }
        }

        Ok(draft)
    }

    /// File references for the memoria and plans, command-line paths taking precedence.
    pub fn document_files(
        &self,
        memoria_override: Option<&Path>,
        extra_planos: &[PathBuf],
    ) -> Result<(Vec<FileRef>, Vec<FileRef>)> {
        let memoria = memoria_override
            .map(Path::to_path_buf)
            .or_else(|| self.memoria.clone())
            .map(|path| file_ref(&path))
            .transpose()?
            .into_iter()
            .collect();

        let planos = self
            .planos
            .iter()
            .chain(extra_planos.iter())
            .map(|path| file_ref(path))
            .collect::<Result<Vec<_>>>()?;

        Ok((memoria, planos))
    }
}

/// Describe a local file the way an upload would: name, size and MIME type by extension.
pub fn file_ref(path: &Path) -> Result<FileRef> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Cannot read document {}", path.display()))?;
    if !metadata.is_file() {
        bail!("{} is not a file", path.display());
    }

    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("Invalid document name {}", path.display()))?;
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    let mime_type = if is_pdf { PDF_MIME_TYPE } else { OCTET_STREAM };

    Ok(FileRef::new(name, metadata.len(), mime_type).with_source(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PROJECT: &str = r#"
existing_building = true
primary_use = "residencial"

[[secondary_uses]]
use = "garaje-aparcamiento"
floors = ["planta baja"]
ranges = [{ kind = "sotano", from = -2, to = -1 }]
"#;

    #[test]
    fn test_toml_project_builds_draft() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("project.toml");
        std::fs::write(&path, PROJECT).unwrap();

        let draft = ProjectSpec::load(&path).unwrap().to_draft().unwrap();
        assert!(draft.is_existing_building());
        assert_eq!(draft.primary_use(), Some(UseType::Residencial));

        let garage = draft.secondary_use(UseType::GarajeAparcamiento).unwrap();
        let floors: Vec<FloorLevel> = garage.floors.iter().copied().collect();
        assert_eq!(
            floors,
            vec![
                FloorLevel::numbered(-2).unwrap(),
                FloorLevel::numbered(-1).unwrap(),
                FloorLevel::Ground
            ]
        );
    }

    #[test]
    fn test_json_project_and_unknown_floor() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("project.json");
        std::fs::write(
            &path,
            r#"{"primary_use": "industrial", "secondary_uses": [{"use": "residencial", "floors": ["ático"]}]}"#,
        )
        .unwrap();

        let spec = ProjectSpec::load(&path).unwrap();
        assert_eq!(spec.primary_use, Some(UseType::Industrial));
        let error = spec.to_draft().unwrap_err();
        assert!(error.to_string().contains("ático"));
    }

    #[test]
    fn test_document_files_detect_pdf_by_extension() {
        let dir = TempDir::new().unwrap();
        let memoria = dir.path().join("Memoria.PDF");
        let render = dir.path().join("render.png");
        std::fs::write(&memoria, b"%PDF-1.7").unwrap();
        std::fs::write(&render, b"png").unwrap();

        let spec = ProjectSpec {
            memoria: Some(memoria.clone()),
            ..ProjectSpec::default()
        };
        let (memoria_files, planos) = spec.document_files(None, &[render]).unwrap();

        assert_eq!(memoria_files.len(), 1);
        assert!(memoria_files[0].is_pdf());
        assert_eq!(memoria_files[0].byte_size, 8);
        assert_eq!(memoria_files[0].source.as_deref(), Some(memoria.as_path()));
        assert!(!planos[0].is_pdf());
    }

    #[test]
    fn test_missing_document_is_an_error() {
        let spec = ProjectSpec::default();
        let missing = PathBuf::from("/nonexistent/plano.pdf");
        assert!(spec.document_files(None, &[missing]).is_err());
    }
}
