use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

pub const DEFAULT_BOUNDARIES_URL: &str =
    "https://raw.githubusercontent.com/johan/world.geo.json/master/countries.geo.json";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub boundaries: BoundaryConfig,
    pub translation: TranslationConfig,
    pub matching: MatchingConfig,
    pub scale: ScaleConfig,
    pub output: OutputConfig,
    pub chart: ChartConfig,
    /// Countries the translate-and-match pass misses, keyed by canonical name.
    pub overrides: Option<Vec<OverrideEntry>>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    pub spreadsheet: PathBuf,
    pub sheet: Option<String>,
    /// Rows discarded before the header row.
    pub skip_rows: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BoundaryConfig {
    /// http(s) URL or local path of a GeoJSON FeatureCollection.
    pub source: String,
    pub name_property: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TranslationConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub source_lang: String,
    pub target_lang: String,
    /// Source name -> English, used instead of the service when disabled.
    pub fixed: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct MatchingConfig {
    pub warn_below: Option<u8>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    #[default]
    Percentile,
    Linear,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ScaleConfig {
    pub mode: ScaleMode,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub map_html: PathBuf,
    pub chart: PathBuf,
    pub caption: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChartConfig {
    pub title: String,
    pub top_n: usize,
    pub width: u32,
    pub height: u32,
    pub label_aliases: Vec<LabelAlias>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LabelAlias {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct OverrideEntry {
    pub name: String,
    pub total: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            spreadsheet: PathBuf::from("sp2024.xlsx"),
            sheet: None,
            skip_rows: 7,
        }
    }
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_BOUNDARIES_URL.to_string(),
            name_property: "name".to_string(),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://translate.googleapis.com/translate_a/single".to_string(),
            source_lang: "es".to_string(),
            target_lang: "en".to_string(),
            fixed: HashMap::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            map_html: PathBuf::from("world_2024.html"),
            chart: PathBuf::from("top_5_countries.svg"),
            caption: "Spanish population residing abroad".to_string(),
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            title: "Top 5 Countries with More Spanish People".to_string(),
            top_n: 5,
            width: 1200,
            height: 1200,
            label_aliases: vec![LabelAlias {
                from: "United States of America".to_string(),
                to: "USA".to_string(),
            }],
        }
    }
}

/// Entries the 2024 sheet needs after matching.
pub fn default_overrides() -> Vec<OverrideEntry> {
    [
        ("Republic of the Congo", 11),
        ("Estonia", 410),
        ("Moldova", 11),
        ("Slovakia", 469),
        ("Andorra", 27679),
        ("Western Sahara", 10),
        ("Guyana", 13),
        ("El Salvador", 2877),
    ]
    .into_iter()
    .map(|(name, total)| OverrideEntry { name: name.to_string(), total })
    .collect()
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }

    /// Like `load_from_file`, but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::info!("No config at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Configured overrides, or the built-in list when the section is absent.
    pub fn overrides(&self) -> Vec<OverrideEntry> {
        self.overrides.clone().unwrap_or_else(default_overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_builtin_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.input.skip_rows, 7);
        assert_eq!(config.boundaries.source, DEFAULT_BOUNDARIES_URL);
        assert_eq!(config.boundaries.name_property, "name");
        assert!(config.translation.enabled);
        assert_eq!(config.scale.mode, ScaleMode::Percentile);
        assert_eq!(config.output.map_html, PathBuf::from("world_2024.html"));
        assert_eq!(config.chart.top_n, 5);
        assert_eq!(config.overrides().len(), 8);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [input]
            spreadsheet = "data/residents.csv"

            [scale]
            mode = "linear"

            [translation]
            enabled = false

            [[overrides]]
            name = "Estonia"
            total = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.input.spreadsheet, PathBuf::from("data/residents.csv"));
        assert_eq!(config.input.skip_rows, 7);
        assert_eq!(config.scale.mode, ScaleMode::Linear);
        assert!(!config.translation.enabled);
        assert_eq!(config.translation.source_lang, "es");
        assert_eq!(
            config.overrides(),
            vec![OverrideEntry { name: "Estonia".to_string(), total: 500 }]
        );
    }

    #[test]
    fn empty_override_list_disables_defaults() {
        let config: AppConfig = toml::from_str("overrides = []").unwrap();
        assert!(config.overrides().is_empty());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.chart.title, "Top 5 Countries with More Spanish People");
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[input\nspreadsheet = 1").unwrap();
        assert!(AppConfig::load_from_file(&path).is_err());
    }
}
