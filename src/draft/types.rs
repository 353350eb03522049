use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::floors::FloorLevel;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Land-use catalog of the municipal plan. Wire names match the verification backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UseType {
    #[serde(rename = "residencial")]
    Residencial,
    #[serde(rename = "industrial")]
    Industrial,
    #[serde(rename = "garaje-aparcamiento")]
    GarajeAparcamiento,
    #[serde(rename = "servicios_terciarios")]
    ServiciosTerciarios,
    #[serde(rename = "dotacional_zona_verde")]
    DotacionalZonaVerde,
    #[serde(rename = "dotacional_deportivo")]
    DotacionalDeportivo,
    #[serde(rename = "dotacional_equipamiento")]
    DotacionalEquipamiento,
    #[serde(rename = "dotacional_servicios_publicos")]
    DotacionalServiciosPublicos,
    #[serde(rename = "dotacional_administracion_publica")]
    DotacionalAdministracionPublica,
    #[serde(rename = "dotacional_infraestructural")]
    DotacionalInfraestructural,
    #[serde(rename = "dotacional_via_publica")]
    DotacionalViaPublica,
    #[serde(rename = "dotacional_transporte")]
    DotacionalTransporte,
}

impl UseType {
    pub const ALL: [UseType; 12] = [
        UseType::Residencial,
        UseType::Industrial,
        UseType::GarajeAparcamiento,
        UseType::ServiciosTerciarios,
        UseType::DotacionalZonaVerde,
        UseType::DotacionalDeportivo,
        UseType::DotacionalEquipamiento,
        UseType::DotacionalServiciosPublicos,
        UseType::DotacionalAdministracionPublica,
        UseType::DotacionalInfraestructural,
        UseType::DotacionalViaPublica,
        UseType::DotacionalTransporte,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UseType::Residencial => "residencial",
            UseType::Industrial => "industrial",
            UseType::GarajeAparcamiento => "garaje-aparcamiento",
            UseType::ServiciosTerciarios => "servicios_terciarios",
            UseType::DotacionalZonaVerde => "dotacional_zona_verde",
            UseType::DotacionalDeportivo => "dotacional_deportivo",
            UseType::DotacionalEquipamiento => "dotacional_equipamiento",
            UseType::DotacionalServiciosPublicos => "dotacional_servicios_publicos",
            UseType::DotacionalAdministracionPublica => "dotacional_administracion_publica",
            UseType::DotacionalInfraestructural => "dotacional_infraestructural",
            UseType::DotacionalViaPublica => "dotacional_via_publica",
            UseType::DotacionalTransporte => "dotacional_transporte",
        }
    }
}

impl fmt::Display for UseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        UseType::ALL
            .iter()
            .copied()
            .find(|use_type| use_type.as_str() == wanted)
            .ok_or_else(|| format!("unknown use type '{s}'"))
    }
}

/// A user-selected file. Only the metadata is part of the draft; `source` lets
/// a transport read the bytes when it needs them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub name: String,
    pub byte_size: u64,
    pub mime_type: String,
    #[serde(default, skip_serializing)]
    pub source: Option<PathBuf>,
}

impl FileRef {
    pub fn new(name: impl Into<String>, byte_size: u64, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            byte_size,
            mime_type: mime_type.into(),
            source: None,
        }
    }

    pub fn pdf(name: impl Into<String>, byte_size: u64) -> Self {
        Self::new(name, byte_size, PDF_MIME_TYPE)
    }

    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type.trim().eq_ignore_ascii_case(PDF_MIME_TYPE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Descriptive report; at most one per project
    Memoria,
    /// Drawings
    Planos,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Memoria => write!(f, "memoria"),
            DocumentKind::Planos => write!(f, "planos"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Documents {
    pub memoria: Vec<FileRef>,
    pub planos: Vec<FileRef>,
}

impl Documents {
    pub fn get(&self, kind: DocumentKind) -> &[FileRef] {
        match kind {
            DocumentKind::Memoria => &self.memoria,
            DocumentKind::Planos => &self.planos,
        }
    }

    pub(crate) fn get_mut(&mut self, kind: DocumentKind) -> &mut Vec<FileRef> {
        match kind {
            DocumentKind::Memoria => &mut self.memoria,
            DocumentKind::Planos => &mut self.planos,
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.memoria
            .iter()
            .chain(self.planos.iter())
            .map(|file| file.name.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.memoria.is_empty() && self.planos.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryUse {
    pub use_type: UseType,
    pub floors: BTreeSet<FloorLevel>,
}

impl SecondaryUse {
    pub fn new(use_type: UseType) -> Self {
        Self {
            use_type,
            floors: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    NotPdf,
    /// A memoria slot already took an earlier file from the same selection
    SlotFull,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedFile {
    pub name: String,
    pub reason: RejectionReason,
}

/// Outcome of a partially accepted file selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentSelection {
    pub accepted: Vec<String>,
    pub rejected: Vec<RejectedFile>,
}

impl DocumentSelection {
    pub fn has_rejections(&self) -> bool {
        !self.rejected.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_use_type_round_trips_through_wire_names() {
        for use_type in UseType::ALL {
            let json = serde_json::to_string(&use_type).unwrap();
            assert_eq!(json, format!("\"{}\"", use_type.as_str()));
            assert_eq!(use_type.as_str().parse::<UseType>(), Ok(use_type));
        }
        assert!("oficinas".parse::<UseType>().is_err());
    }

    #[test]
    fn test_pdf_detection_ignores_case_and_whitespace() {
        assert!(FileRef::new("a.pdf", 10, "Application/PDF ").is_pdf());
        assert!(!FileRef::new("a.png", 10, "image/png").is_pdf());
    }

    #[test]
    fn test_file_source_is_not_serialized() {
        let file = FileRef::pdf("memoria.pdf", 2048).with_source("/tmp/memoria.pdf");
        let json = serde_json::to_value(&file).unwrap();
        assert!(json.get("source").is_none());
        assert_eq!(json["mime_type"], PDF_MIME_TYPE);
    }
}
