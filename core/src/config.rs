//! Session-wide configuration (spec §6).
//!
//! Split out of `lib.rs`; keeps the teacher's TOML load/save and
//! phrase-masking API, with the field table replaced by the nine options
//! spec §6 names. Language crates (e.g. `libzhuyin`) layer their own
//! keyboard-layout-specific config on top via `#[serde(flatten)]`, the same
//! way the teacher's `ZhuyinConfig` wraps this one.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::preedit::{DEFAULT_CAPACITY, MAX_CAPACITY_CEILING};

/// Where a newly learned user phrase is inserted relative to existing
/// entries sharing its syllable sequence (spec §6 `add_phrase_direction`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddPhraseDirection {
    Forward,
    Backward,
}

impl Default for AddPhraseDirection {
    fn default() -> Self {
        AddPhraseDirection::Forward
    }
}

/// Generic configuration for IME core functionality (spec §6).
///
/// Language-specific options (pinyin corrections, zhuyin keyboard layouts,
/// etc.) belong in the language crate's own config, not here.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of preedit symbols the buffer may hold before
    /// further input is absorbed-then-ignored. Clamped to
    /// `MAX_CAPACITY_CEILING`.
    pub max_chi_symbol_len: usize,

    /// Candidates shown per page in the chooser window.
    pub candidates_per_page: usize,

    /// Direction newly learned phrases are inserted relative to existing
    /// entries for the same syllable sequence.
    pub add_phrase_direction: AddPhraseDirection,

    /// Whether Space selects the highlighted candidate (vs. just moving
    /// the cursor / inserting a literal space when no composition exists).
    pub space_as_selection: bool,

    /// Enable easy-symbol shortcuts (spec §8 scenario 4, e.g. `[` → `「`).
    pub easy_symbol_mode: bool,

    /// Enable full-width punctuation/ASCII conversion on commit.
    pub fullshape_mode: bool,

    /// Direction the candidate window searches for a span relative to the
    /// cursor: ahead of it (default) or the syllable just behind it
    /// (rearward).
    pub phrase_choice_rearward: bool,

    /// Automatically move the cursor to the end of a freshly chosen phrase.
    pub auto_shift_cursor: bool,

    /// Set of phrases hidden from candidate suggestions (spec §10
    /// supplemented feature).
    pub masked_phrases: HashSet<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_chi_symbol_len: DEFAULT_CAPACITY,
            candidates_per_page: 10,
            add_phrase_direction: AddPhraseDirection::Forward,
            space_as_selection: true,
            easy_symbol_mode: false,
            fullshape_mode: false,
            phrase_choice_rearward: false,
            auto_shift_cursor: true,
            masked_phrases: HashSet::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Clamp and apply a new preedit capacity (spec §6 ceiling of 39).
    pub fn set_max_chi_symbol_len(&mut self, len: usize) {
        self.max_chi_symbol_len = len.clamp(1, MAX_CAPACITY_CEILING);
    }

    // ========== Phrase Masking API ==========

    pub fn mask_phrase(&mut self, phrase: &str) {
        self.masked_phrases.insert(phrase.to_string());
    }

    pub fn unmask_phrase(&mut self, phrase: &str) -> bool {
        self.masked_phrases.remove(phrase)
    }

    pub fn is_masked(&self, phrase: &str) -> bool {
        self.masked_phrases.contains(phrase)
    }

    pub fn clear_masked_phrases(&mut self) {
        self.masked_phrases.clear();
    }

    pub fn get_masked_phrases(&self) -> Vec<String> {
        let mut phrases: Vec<_> = self.masked_phrases.iter().cloned().collect();
        phrases.sort();
        phrases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let cfg = Config::default();
        assert_eq!(cfg.max_chi_symbol_len, DEFAULT_CAPACITY);
        assert!(cfg.space_as_selection);
        assert!(!cfg.easy_symbol_mode);
    }

    #[test]
    fn toml_round_trip() {
        let mut cfg = Config::default();
        cfg.mask_phrase("測試");
        cfg.candidates_per_page = 6;
        let toml = cfg.to_toml_string().unwrap();
        let back = Config::from_toml_str(&toml).unwrap();
        assert_eq!(back.candidates_per_page, 6);
        assert!(back.is_masked("測試"));
    }

    #[test]
    fn capacity_setter_clamps_to_ceiling() {
        let mut cfg = Config::default();
        cfg.set_max_chi_symbol_len(1000);
        assert_eq!(cfg.max_chi_symbol_len, MAX_CAPACITY_CEILING);
        cfg.set_max_chi_symbol_len(0);
        assert_eq!(cfg.max_chi_symbol_len, 1);
    }
}
