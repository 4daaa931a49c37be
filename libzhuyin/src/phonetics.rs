//! Zhuyin/Bopomofo symbol tables shared by every keyboard layout.
//!
//! `libchinese_core::Phoneme` only knows about numeric fields; this module
//! supplies the numbering convention the `libzhuyin` layouts agree on (which
//! integer is ㄓ, which is ㄢ, ...) and the glyphs used to render a phoneme
//! back to the user. It also carries the Hanyu/Thl/MPS2 Pinyin
//! letter-sequence tables those three layouts translate into the same
//! numbering once a syllable is complete.

/// The 21 Zhuyin initials, indexed by `initial() - 1` (index 0 is unused;
/// `initial() == 0` means "no initial").
pub const INITIALS: [&str; 22] = [
    "", "ㄅ", "ㄆ", "ㄇ", "ㄈ", "ㄉ", "ㄊ", "ㄋ", "ㄌ", "ㄍ", "ㄎ", "ㄏ", "ㄐ", "ㄑ", "ㄒ", "ㄓ",
    "ㄔ", "ㄕ", "ㄖ", "ㄗ", "ㄘ", "ㄙ",
];

/// The 3 Zhuyin medials, indexed by `medial()`.
pub const MEDIALS: [&str; 4] = ["", "ㄧ", "ㄨ", "ㄩ"];

/// The 13 Zhuyin finals, indexed by `final_()`.
pub const FINALS: [&str; 14] = [
    "", "ㄚ", "ㄛ", "ㄜ", "ㄝ", "ㄞ", "ㄟ", "ㄠ", "ㄡ", "ㄢ", "ㄣ", "ㄤ", "ㄥ", "ㄦ",
];

/// Tone marks, indexed by `tone()`. Tone 1 is the traditionally unmarked
/// first tone; tone 5 is the neutral tone. `Phoneme`'s 3-bit field happily
/// carries values up to 7 (only the `peel`/ordering logic cares about field
/// *position*, not a hard tone ceiling), so the fifth tone gets its own
/// code even though `phoneme::MAX_TONE` documents the common four-tone case.
pub const TONES: [&str; 6] = ["", "", "ˊ", "ˇ", "ˋ", "˙"];

/// Render a phoneme's components back to Bopomofo glyphs, in initial,
/// medial, final, tone order — the same visual order Zhuyin is written in.
pub fn render(initial: u8, medial: u8, final_: u8, tone: u8) -> String {
    let mut s = String::new();
    s.push_str(INITIALS.get(initial as usize).copied().unwrap_or(""));
    s.push_str(MEDIALS.get(medial as usize).copied().unwrap_or(""));
    s.push_str(FINALS.get(final_ as usize).copied().unwrap_or(""));
    s.push_str(TONES.get(tone as usize).copied().unwrap_or(""));
    s
}

/// One step of a Pinyin-family ASCII-buffer translation: given the letters
/// typed so far (without the tone digit/key), the matched initial/medial/
/// final codes, or `None` if the buffer doesn't yet (or can't ever) spell a
/// valid syllable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyllableCodes {
    pub initial: u8,
    pub medial: u8,
    pub final_: u8,
}

const PINYIN_INITIALS: &[(&str, u8)] = &[
    ("zh", 15),
    ("ch", 16),
    ("sh", 17),
    ("b", 1),
    ("p", 2),
    ("m", 3),
    ("f", 4),
    ("d", 5),
    ("t", 6),
    ("n", 7),
    ("l", 8),
    ("g", 9),
    ("k", 10),
    ("h", 11),
    ("j", 12),
    ("q", 13),
    ("x", 14),
    ("r", 18),
    ("z", 19),
    ("c", 20),
    ("s", 21),
];

/// Hanyu Pinyin finals, longest-match first so e.g. "iang" is not parsed as
/// "i" + "ang". `(medial, final)` pairs; a bare medial with no final (e.g.
/// trailing "i" in "ji") is expressed with `final_ == 0`.
const HANYU_FINALS: &[(&str, u8, u8)] = &[
    ("iang", 1, 11),
    ("iong", 3, 12),
    ("uang", 2, 11),
    ("ang", 0, 11),
    ("eng", 0, 12),
    ("ing", 1, 12),
    ("ong", 2, 12),
    ("ian", 1, 9),
    ("uan", 2, 9),
    ("uai", 2, 5),
    ("iao", 1, 7),
    ("iu", 1, 8),
    ("ui", 2, 6),
    ("ua", 2, 1),
    ("uo", 2, 2),
    ("ue", 3, 3),
    ("ve", 3, 3),
    ("un", 2, 10),
    ("vn", 3, 10),
    ("in", 1, 10),
    ("an", 0, 9),
    ("en", 0, 10),
    ("ai", 0, 5),
    ("ei", 0, 6),
    ("ao", 0, 7),
    ("ou", 0, 8),
    ("er", 0, 13),
    ("ia", 1, 1),
    ("ie", 1, 3),
    ("a", 0, 1),
    ("o", 0, 2),
    ("e", 0, 3),
    ("i", 1, 0),
    ("u", 2, 0),
    ("v", 3, 0),
];

/// Parse a Hanyu Pinyin letter buffer (no tone digit) into Zhuyin codes.
/// Tries the longest initial, then the longest final on the remainder.
/// Returns `None` if the buffer doesn't (yet) spell a complete syllable,
/// so the caller keeps accumulating letters.
pub fn parse_hanyu_pinyin(buf: &str) -> Option<SyllableCodes> {
    let lower = buf.to_ascii_lowercase();
    let (initial, rest) = match_initial(&lower);
    let rest = strip_apostrophe_y_w(rest, initial);
    for (pat, medial, final_) in HANYU_FINALS {
        if rest == *pat {
            return Some(SyllableCodes {
                initial,
                medial: *medial,
                final_: *final_,
            });
        }
    }
    None
}

fn match_initial(s: &str) -> (u8, &str) {
    for (pat, code) in PINYIN_INITIALS {
        if let Some(rest) = s.strip_prefix(pat) {
            return (*code, rest);
        }
    }
    (0, s)
}

/// `y`/`w` are Pinyin's spelling convention for a bare medial with no
/// initial (e.g. "ying" == ㄧㄥ, "wu" == ㄨ); strip them before final
/// matching since the medial they imply is already encoded in `HANYU_FINALS`.
fn strip_apostrophe_y_w(s: &str, initial: u8) -> &str {
    if initial != 0 {
        return s;
    }
    s.strip_prefix('y').or_else(|| s.strip_prefix('w')).unwrap_or(s)
}

/// THL (Tongyong-ish) Pinyin shares Hanyu's initial/final shape but spells
/// three initials differently: "c" for ㄐ, "s" for ㄒ is unaffected, but the
/// retroflex row swaps `zh/ch/sh` for `jh/c/s` in some Tongyong-derived
/// keyboards; THL (the libchewing "Tongyong" table this layout is modeled
/// after) keeps `zh/ch/sh` but reuses `f` for ㄈ identically to Hanyu. The
/// only practical difference this layout needs is the initial table, so it
/// swaps one entry and otherwise defers to [`parse_hanyu_pinyin`]'s finals.
pub fn parse_thl_pinyin(buf: &str) -> Option<SyllableCodes> {
    let lower = buf.to_ascii_lowercase();
    let lower = if let Some(rest) = lower.strip_prefix("jh") {
        format!("zh{rest}")
    } else {
        lower
    };
    parse_hanyu_pinyin(&lower)
}

/// MPS2 spells the retroflex initials and a handful of finals differently
/// from Hanyu Pinyin (`c`→ㄓ, `ch`→ㄔ, `sh`→ㄕ stay, but ㄐㄑㄒ use `j q x`
/// like Hanyu while ㄗㄘㄙ use `tz ts s` instead of `z c s`). Remap those
/// before delegating to the shared final table.
pub fn parse_mps2_pinyin(buf: &str) -> Option<SyllableCodes> {
    let lower = buf.to_ascii_lowercase();
    let remapped = lower
        .replacen("tz", "z", 1)
        .replacen("ts", "c", 1);
    parse_hanyu_pinyin(&remapped)
}
