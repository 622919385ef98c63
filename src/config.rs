//! Runtime settings resolved from the command line and environment.

use crate::error::Result;
use crate::loader::Validation;
use crate::reports::DEFAULT_TOP_LIMIT;
use crate::source::JsonFileSource;
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_PATH: &str = "statev3.json";
pub const DATA_PATH_ENV: &str = "DENGUE_MG_DATA";
pub const OUT_DIR_ENV: &str = "DENGUE_MG_OUT_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Export of the weekly state collection (JSON array or JSON Lines).
    pub data_path: PathBuf,
    /// Directory for CSV/JSON outputs.
    pub out_dir: PathBuf,
    pub validation: Validation,
    /// Rows shown in console previews.
    pub preview_rows: usize,
    pub top_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            out_dir: PathBuf::from("."),
            validation: Validation::Lenient,
            preview_rows: 5,
            top_limit: DEFAULT_TOP_LIMIT,
        }
    }
}

impl Config {
    #[must_use]
    pub fn source(&self) -> JsonFileSource {
        JsonFileSource::new(&self.data_path, self.validation)
    }

    /// Path of an output file inside `out_dir`.
    #[must_use]
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.out_dir.join(file_name)
    }

    /// Create `out_dir` (and parents) if it does not exist yet.
    pub fn ensure_out_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.out_dir)?;
        Ok(())
    }

    #[must_use]
    pub fn data_path(&self) -> &Path {
        &self.data_path
    }
}

/// File-name friendly form of a city name (`"Pará de Minas"` → `"para_de_minas"`).
#[must_use]
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars() {
        let c = match c {
            'á' | 'à' | 'â' | 'ã' | 'Á' | 'À' | 'Â' | 'Ã' => 'a',
            'é' | 'ê' | 'É' | 'Ê' => 'e',
            'í' | 'Í' => 'i',
            'ó' | 'ô' | 'õ' | 'Ó' | 'Ô' | 'Õ' => 'o',
            'ú' | 'ü' | 'Ú' | 'Ü' => 'u',
            'ç' | 'Ç' => 'c',
            c if c.is_ascii_alphanumeric() => c.to_ascii_lowercase(),
            _ => '_',
        };
        if c != '_' || !out.ends_with('_') {
            out.push(c);
        }
    }
    out.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_export() {
        let config = Config::default();
        assert_eq!(config.data_path(), Path::new("statev3.json"));
        assert_eq!(config.output_path("kpis.csv"), PathBuf::from("./kpis.csv"));
        assert_eq!(config.validation, Validation::Lenient);
        assert_eq!(config.top_limit, 10);
    }

    #[test]
    fn slugs_portuguese_names() {
        assert_eq!(slug("Pará de Minas"), "para_de_minas");
        assert_eq!(slug("  São João del-Rei "), "sao_joao_del_rei");
        assert_eq!(slug("Uberlândia"), "uberlandia");
    }

    #[test]
    fn creates_nested_out_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            out_dir: dir.path().join("exports").join("2024"),
            ..Config::default()
        };
        config.ensure_out_dir().unwrap();
        assert!(config.out_dir.is_dir());
        // Already present is fine.
        config.ensure_out_dir().unwrap();
    }

    #[test]
    fn source_uses_configured_path() {
        let config = Config {
            data_path: PathBuf::from("/data/statev3.jsonl"),
            ..Config::default()
        };
        assert_eq!(config.source().path(), Path::new("/data/statev3.jsonl"));
    }
}
