//! Zhuyin-specific configuration layered on top of [`libchinese_core::Config`].
//!
//! Kept from the teacher: the flattened base config plus TOML round-trip.
//! Rewritten: the fuzzy-matching preset fields are gone (no `FuzzyMap` left
//! in core to drive them); in their place is the keyboard layout choice and
//! the two correction flags that gate [`crate::layout::KeyboardLayout::alt_syllable`].

use serde::{Deserialize, Serialize};

use crate::layout::KeyboardLayoutKind;

/// Zhuyin/Bopomofo-specific configuration that extends the base `Config`
/// from core.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ZhuyinConfig {
    /// Base configuration fields (preedit capacity, pagination, phrase
    /// masking, etc.)
    #[serde(flatten)]
    pub base: libchinese_core::Config,

    /// Which of the thirteen key tables drives the phonetic editor.
    pub keyboard_layout: KeyboardLayoutKind,

    /// Offer Hsu's commonly-confused final pairs as a second reading
    /// (spec §9 open question).
    pub zhuyin_correct_hsu: bool,

    /// Same correction, for ET26.
    pub zhuyin_correct_eten26: bool,
}

impl Default for ZhuyinConfig {
    fn default() -> Self {
        Self {
            base: libchinese_core::Config::default(),
            keyboard_layout: KeyboardLayoutKind::Default,
            zhuyin_correct_hsu: false,
            zhuyin_correct_eten26: false,
        }
    }
}

impl ZhuyinConfig {
    /// Build the [`crate::layout::KeyboardLayout`] this config describes,
    /// with its correction flag wired up.
    pub fn build_layout(&self) -> crate::layout::KeyboardLayout {
        let correction = match self.keyboard_layout {
            KeyboardLayoutKind::Hsu | KeyboardLayoutKind::DvorakHsu | KeyboardLayoutKind::Carpalx => {
                self.zhuyin_correct_hsu
            }
            KeyboardLayoutKind::Et26 => self.zhuyin_correct_eten26,
            _ => false,
        };
        crate::layout::KeyboardLayout::new(self.keyboard_layout).with_correction(correction)
    }

    /// Convert this zhuyin config into the base config (e.g. to build a
    /// `PreeditBuffer` or construct a `Chooser`-driven editor directly).
    pub fn into_base(self) -> libchinese_core::Config {
        self.base
    }

    pub fn base(&self) -> &libchinese_core::Config {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut libchinese_core::Config {
        &mut self.base
    }

    pub fn load_toml<P: AsRef<std::path::Path>>(
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save_toml<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_is_dachen_with_no_correction() {
        let cfg = ZhuyinConfig::default();
        assert_eq!(cfg.keyboard_layout, KeyboardLayoutKind::Default);
        let layout = cfg.build_layout();
        assert_eq!(layout.kind(), KeyboardLayoutKind::Default);
    }

    #[test]
    fn hsu_correction_flag_reaches_the_built_layout() {
        let mut cfg = ZhuyinConfig::default();
        cfg.keyboard_layout = KeyboardLayoutKind::Hsu;
        cfg.zhuyin_correct_hsu = true;
        let layout = cfg.build_layout();
        let confusable = libchinese_core::Phoneme::new(1, 0, 10, 1);
        assert!(libchinese_core::PhoneticLayout::alt_syllable(&layout, confusable).is_some());
    }

    #[test]
    fn toml_round_trip_preserves_layout_choice() {
        let mut cfg = ZhuyinConfig::default();
        cfg.keyboard_layout = KeyboardLayoutKind::HanyuPinyin;
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let back: ZhuyinConfig = toml::from_str(&toml).unwrap();
        assert_eq!(back.keyboard_layout, KeyboardLayoutKind::HanyuPinyin);
    }
}
