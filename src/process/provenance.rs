// src/process/provenance.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::{fs, path::Path};

static REVISION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)revis(?:ão|ao|ion)_(\d+)").expect("revision regex is valid"));

/// Where a run's input came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceMeta {
    pub file_name: String,
    pub revision: Option<u32>,
    pub modified_at: DateTime<Utc>,
}

impl SourceMeta {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let meta = fs::metadata(path)
            .with_context(|| format!("reading metadata of {}", path.display()))?;
        let modified = meta
            .modified()
            .with_context(|| format!("no modification time for {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(Self {
            revision: parse_revision(&file_name),
            file_name,
            modified_at: DateTime::<Utc>::from(modified),
        })
    }
}

/// `"Programação Fev Revisão_07.xlsx"` → `Some(7)`.
pub fn parse_revision(file_name: &str) -> Option<u32> {
    REVISION_RE
        .captures(file_name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn revision_variants() {
        assert_eq!(parse_revision("Programação Fev Revisão_07.xlsx"), Some(7));
        assert_eq!(parse_revision("prog_REVISAO_12.xlsx"), Some(12));
        assert_eq!(parse_revision("plan Revision_3.xlsx"), Some(3));
        assert_eq!(parse_revision("plan final.xlsx"), None);
    }

    #[test]
    fn meta_from_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("TL1 Revisão_4.xlsx");
        fs::File::create(&path)?.write_all(b"x")?;
        let meta = SourceMeta::from_path(&path)?;
        assert_eq!(meta.revision, Some(4));
        assert_eq!(meta.file_name, "TL1 Revisão_4.xlsx");
        assert!(meta.modified_at <= Utc::now());
        Ok(())
    }
}
