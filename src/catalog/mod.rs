use crate::error::CatalogError;
use crate::graph::SelectedModel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

mod resolver;

pub use resolver::normalize_key;

/// A base model that can be selected on a model node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: String,
    pub display_name: String,
    pub provider: String,
    /// Parameter count in billions.
    pub parameter_count: f64,
    /// Lowercase family name used for comparative lookups ("llama", "phi").
    pub family: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl CatalogEntry {
    pub fn to_selected_model(&self) -> SelectedModel {
        SelectedModel {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            provider: self.provider.clone(),
            parameter_count: self.parameter_count,
        }
    }
}

/// One value of the catalog JSON map, keyed by model id.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCatalogEntry {
    display_name: String,
    #[serde(default)]
    provider: String,
    parameter_count: f64,
    #[serde(default)]
    family: Option<String>,
    #[serde(default, alias = "aliases")]
    alias_patterns: Vec<String>,
}

/// The static catalog of selectable base models.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCatalog {
    entries: Vec<CatalogEntry>,
}

impl ModelCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Parses a `model-id -> {displayName, provider, parameterCount, aliasPatterns}` map.
    ///
    /// Entries are ordered by model id. A missing `family` falls back to the
    /// first word of the display name.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: BTreeMap<String, RawCatalogEntry> =
            serde_json::from_str(json).map_err(|e| CatalogError::ParseError(e.to_string()))?;
        let entries = raw
            .into_iter()
            .map(|(id, raw)| {
                let family = raw
                    .family
                    .or_else(|| raw.display_name.split_whitespace().next().map(str::to_string))
                    .unwrap_or_default()
                    .to_lowercase();
                CatalogEntry {
                    id,
                    display_name: raw.display_name,
                    provider: raw.provider,
                    parameter_count: raw.parameter_count,
                    family,
                    aliases: raw.alias_patterns,
                }
            })
            .collect();
        Ok(Self { entries })
    }

    pub fn from_file(path: &str) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&content)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn display_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.display_name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn entry(
    id: &str,
    display_name: &str,
    provider: &str,
    parameter_count: f64,
    family: &str,
    aliases: &[&str],
) -> CatalogEntry {
    CatalogEntry {
        id: id.to_string(),
        display_name: display_name.to_string(),
        provider: provider.to_string(),
        parameter_count,
        family: family.to_string(),
        aliases: aliases.iter().map(|a| a.to_string()).collect(),
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::new(vec![
            entry(
                "meta-llama/Llama-3.2-1B-Instruct",
                "Llama 3.2 1B Instruct",
                "Meta",
                1.0,
                "llama",
                &["llama 1b", "llama 3.2 1b", "llama-3.2-1b"],
            ),
            entry(
                "meta-llama/Llama-3.2-3B-Instruct",
                "Llama 3.2 3B Instruct",
                "Meta",
                3.0,
                "llama",
                &["llama 3b", "llama 3.2 3b", "llama-3.2-3b", "llama 3.2"],
            ),
            entry(
                "meta-llama/Llama-3.1-8B-Instruct",
                "Llama 3.1 8B Instruct",
                "Meta",
                8.0,
                "llama",
                &["llama 8b", "llama 3.1 8b", "llama-3.1-8b", "llama 3.1", "llama 3"],
            ),
            entry(
                "microsoft/Phi-3-mini-4k-instruct",
                "Phi-3 Mini 4K Instruct",
                "Microsoft",
                3.8,
                "phi",
                &["phi3", "phi-3", "phi 3 mini", "phi3 mini"],
            ),
            entry(
                "microsoft/Phi-3.5-mini-instruct",
                "Phi-3.5 Mini Instruct",
                "Microsoft",
                3.8,
                "phi",
                &["phi3.5", "phi-3.5", "phi 3.5 mini"],
            ),
            entry(
                "Qwen/Qwen2.5-0.5B-Instruct",
                "Qwen 2.5 0.5B Instruct",
                "Alibaba",
                0.5,
                "qwen",
                &["qwen 0.5b", "qwen2.5 0.5b"],
            ),
            entry(
                "Qwen/Qwen2.5-7B-Instruct",
                "Qwen 2.5 7B Instruct",
                "Alibaba",
                7.0,
                "qwen",
                &["qwen 7b", "qwen2.5 7b", "qwen2.5"],
            ),
            entry(
                "google/gemma-2-2b-it",
                "Gemma 2 2B Instruct",
                "Google",
                2.0,
                "gemma",
                &["gemma 2b", "gemma2", "gemma 2"],
            ),
            entry(
                "mistralai/Mistral-7B-Instruct-v0.3",
                "Mistral 7B Instruct",
                "Mistral AI",
                7.0,
                "mistral",
                &["mistral", "mistral 7b"],
            ),
        ])
    }
}
