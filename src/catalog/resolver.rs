use super::{CatalogEntry, ModelCatalog};
use crate::error::CatalogError;
use log::debug;

const SMALLER_WORDS: &[&str] = &[
    "smaller", "smallest", "small", "tiny", "tinier", "tiniest", "lighter", "lightest", "mini",
];
const LARGER_WORDS: &[&str] = &[
    "larger", "largest", "large", "bigger", "biggest", "big", "heavier", "heaviest",
];

/// Shortest normalized input considered for substring matching.
const MIN_SUBSTRING_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SizePreference {
    Smallest,
    Largest,
}

/// Lowercases and drops everything that is not alphanumeric, so that
/// "Phi-3", "phi 3" and "PHI3" compare equal.
pub fn normalize_key(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn model_name(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

fn size_preference(input: &str) -> Option<SizePreference> {
    let lowered = input.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    if words.iter().any(|w| SMALLER_WORDS.contains(w)) {
        Some(SizePreference::Smallest)
    } else if words.iter().any(|w| LARGER_WORDS.contains(w)) {
        Some(SizePreference::Largest)
    } else {
        None
    }
}

impl ModelCatalog {
    /// Resolves free text such as "the smaller llama" or "phi3" to a catalog entry.
    ///
    /// Strategies, in priority order:
    /// 1. exact normalized match on the model id, its short name or the display name;
    /// 2. the entry's alias table;
    /// 3. comparative language ("smaller", "larger") within a named family;
    /// 4. substring match against display names.
    ///
    /// Without a match the error names the input and lists every display name.
    pub fn resolve(&self, input: &str) -> Result<&CatalogEntry, CatalogError> {
        let key = normalize_key(input);
        if key.is_empty() {
            return Err(CatalogError::EmptyInput);
        }

        let resolved = self
            .match_exact(&key)
            .or_else(|| self.match_alias(&key))
            .or_else(|| self.match_comparative(input, &key))
            .or_else(|| self.match_substring(&key));

        match resolved {
            Some(entry) => {
                debug!("Resolved model name '{}' to '{}'", input, entry.id);
                Ok(entry)
            }
            None => Err(CatalogError::NoMatch {
                input: input.to_string(),
                valid: self.display_names(),
            }),
        }
    }

    fn match_exact(&self, key: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| {
            normalize_key(&e.id) == key
                || normalize_key(model_name(&e.id)) == key
                || normalize_key(&e.display_name) == key
        })
    }

    fn match_alias(&self, key: &str) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|e| e.aliases.iter().any(|alias| normalize_key(alias) == key))
    }

    fn match_comparative(&self, input: &str, key: &str) -> Option<&CatalogEntry> {
        let preference = size_preference(input)?;
        let family = self
            .entries
            .iter()
            .map(|e| e.family.as_str())
            .find(|family| !family.is_empty() && key.contains(&normalize_key(family)))?;
        let members = self.entries.iter().filter(|e| e.family == family);
        match preference {
            SizePreference::Smallest => {
                members.min_by(|a, b| a.parameter_count.total_cmp(&b.parameter_count))
            }
            SizePreference::Largest => {
                members.max_by(|a, b| a.parameter_count.total_cmp(&b.parameter_count))
            }
        }
    }

    fn match_substring(&self, key: &str) -> Option<&CatalogEntry> {
        if key.len() < MIN_SUBSTRING_LEN {
            return None;
        }
        self.entries.iter().find(|e| {
            let display = normalize_key(&e.display_name);
            display.contains(key) || key.contains(&display)
        })
    }
}
