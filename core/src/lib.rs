//! libchinese-core
//!
//! Shared engine for Zhuyin/Bopomofo-style phonetic input methods: a packed
//! phoneme representation, a memory-mapped phrase tree, a redb-backed user
//! phrase store, a preedit buffer with chooser-driven segmentation, and the
//! session/editor/key-event plumbing that ties them into an `ImeEngine`.
//!
//! Public API:
//! - `Phoneme` / `Syllable` — packed phonetic unit (C1)
//! - `PhraseTree` — mmap'd dictionary lookup (C3)
//! - `UserDict` — persistent user learning and frequency adaptation (C4)
//! - `PreeditBuffer` — in-progress composition (C5)
//! - `Chooser` — dictionary + user-dict segmentation (C6)
//! - `Config` — feature flags and tunables (spec §6)
//! - `ImeEngine` — key-event driven session orchestration

pub mod phoneme;
pub use phoneme::{Phoneme, Syllable};

pub mod tree;
pub use tree::PhraseTree;

pub mod userdict;
pub use userdict::UserDict;

pub mod preedit;
pub use preedit::{PreeditBuffer, PreeditError, Symbol};

pub mod chooser;
pub use chooser::{ChoiceSpan, Chooser, PinnedSpan};

pub mod candidate;
pub use candidate::{Candidate, CandidateList};

pub mod config;
pub use config::{AddPhraseDirection, Config};

pub mod context;
pub use context::{ImeContext, InputPurpose};

pub mod session;
pub use session::{ImeSession, SessionState};

pub mod editor;
pub use editor::{Editor, EditorResult, PhoneticEditor, PhoneticLayout, PunctuationEditor};

pub mod ime_engine;
pub use ime_engine::{ImeEngine, KeyEvent, KeyResult};

/// Utility helpers shared by every layout crate.
pub mod utils {
    /// Normalize input strings (NFC) and trim whitespace.
    pub fn normalize(s: &str) -> String {
        use unicode_normalization::UnicodeNormalization;
        s.nfc().collect::<String>().trim().to_string()
    }

    /// Convert ASCII characters to full-width equivalents.
    ///
    /// This converts:
    /// - ASCII letters (A-Z, a-z) → Full-width letters (Ａ-Ｚ, ａ-ｚ)
    /// - ASCII digits (0-9) → Full-width digits (０-９)
    /// - ASCII space → Ideographic space (　)
    /// - ASCII punctuation → Full-width punctuation
    ///
    /// Non-ASCII characters are passed through unchanged.
    pub fn to_fullwidth(s: &str) -> String {
        s.chars()
            .map(|ch| match ch {
                ' ' => '\u{3000}',
                '!'..='~' => {
                    let code = ch as u32;
                    char::from_u32(code - 0x21 + 0xFF01).unwrap_or(ch)
                }
                _ => ch,
            })
            .collect()
    }

    /// Convert full-width characters back to ASCII (half-width).
    pub fn to_halfwidth(s: &str) -> String {
        s.chars()
            .map(|ch| match ch {
                '\u{3000}' => ' ',
                '\u{FF01}'..='\u{FF5E}' => {
                    let code = ch as u32;
                    char::from_u32(code - 0xFF01 + 0x21).unwrap_or(ch)
                }
                _ => ch,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::utils::*;

    #[test]
    fn fullwidth_roundtrip() {
        let s = "Hello, World! 123";
        let full = to_fullwidth(s);
        assert_ne!(full, s);
        assert_eq!(to_halfwidth(&full), s);
    }

    #[test]
    fn normalize_trims_whitespace() {
        assert_eq!(normalize("  nihao  "), "nihao");
    }
}
