//! Keyboard layouts (C1): one [`KeyboardLayout`] value dispatches to all
//! thirteen key tables instead of needing thirteen generic instantiations
//! of `PhoneticEditor` (a function-pointer table would hide the per-layout
//! auxiliary state Pinyin buffering and Dachen-CP26 two-stroke entry both
//! need). Stateful layouts keep that auxiliary state behind a `RefCell`
//! since [`PhoneticLayout::apply_key`] takes `&self` — this crate is
//! single-threaded per session, so the interior mutability never races.

use std::cell::RefCell;

use libchinese_core::{Phoneme, PhoneticLayout};
use serde::{Deserialize, Serialize};

use crate::phonetics::{self, SyllableCodes};

/// Which of the thirteen key tables a [`KeyboardLayout`] dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyboardLayoutKind {
    Default,
    Hsu,
    Et,
    Et26,
    DachenCp26,
    HanyuPinyin,
    ThlPinyin,
    Mps2Pinyin,
    Dvorak,
    DvorakHsu,
    Ibm,
    GinYieh,
    Carpalx,
}

impl Default for KeyboardLayoutKind {
    fn default() -> Self {
        KeyboardLayoutKind::Default
    }
}

/// Scratch state a handful of layouts need between keystrokes. Plain
/// direct-mapping layouts (Dachen and its positional remaps) carry `None`.
#[derive(Debug, Clone)]
enum Aux {
    None,
    /// Hanyu/Thl/MPS2 Pinyin: letters accumulated before a tone key
    /// resolves them to a phoneme.
    PinyinBuffer(String),
    /// Dachen-CP26: the first stroke of a two-stroke symbol, waiting for
    /// its pair.
    Cp26Pending(Option<char>),
}

/// One of the thirteen key tables, plus whatever auxiliary state it needs.
/// Construct with [`KeyboardLayout::new`]; Hsu and ET26 additionally take
/// [`KeyboardLayout::with_correction`] to enable their contextual-typo
/// correction.
#[derive(Debug)]
pub struct KeyboardLayout {
    kind: KeyboardLayoutKind,
    correction: bool,
    aux: RefCell<Aux>,
}

impl KeyboardLayout {
    pub fn new(kind: KeyboardLayoutKind) -> Self {
        let aux = match kind {
            KeyboardLayoutKind::HanyuPinyin
            | KeyboardLayoutKind::ThlPinyin
            | KeyboardLayoutKind::Mps2Pinyin => Aux::PinyinBuffer(String::new()),
            KeyboardLayoutKind::DachenCp26 => Aux::Cp26Pending(None),
            _ => Aux::None,
        };
        KeyboardLayout {
            kind,
            correction: false,
            aux: RefCell::new(aux),
        }
    }

    /// Enable Hsu/ET26 contextual-typo correction (spec §9 open question;
    /// gated by `ZhuyinConfig::zhuyin_correct_hsu` /
    /// `zhuyin_correct_eten26`, see [`crate::config`]).
    pub fn with_correction(mut self, enabled: bool) -> Self {
        self.correction = enabled;
        self
    }

    pub fn kind(&self) -> KeyboardLayoutKind {
        self.kind
    }

    fn pinyin_apply(
        &self,
        key: char,
        parse: fn(&str) -> Option<SyllableCodes>,
    ) -> Option<Phoneme> {
        if !key.is_ascii_alphabetic() {
            return None;
        }
        let mut aux = self.aux.borrow_mut();
        let Aux::PinyinBuffer(buf) = &mut *aux else {
            unreachable!("pinyin layout constructed without a PinyinBuffer");
        };
        if let Some(tone) = tone_key(key) {
            if let Some(codes) = parse(buf) {
                buf.clear();
                return Some(Phoneme::new(codes.initial, codes.medial, codes.final_, tone));
            }
        }
        buf.push(key);
        match parse(buf) {
            Some(codes) => Some(Phoneme::new(codes.initial, codes.medial, codes.final_, 0)),
            None => Some(Phoneme::EMPTY),
        }
    }

    fn pinyin_remove_last(&self, parse: fn(&str) -> Option<SyllableCodes>) -> Phoneme {
        let mut aux = self.aux.borrow_mut();
        let Aux::PinyinBuffer(buf) = &mut *aux else {
            unreachable!("pinyin layout constructed without a PinyinBuffer");
        };
        buf.pop();
        match parse(buf) {
            Some(codes) => Phoneme::new(codes.initial, codes.medial, codes.final_, 0),
            None => Phoneme::EMPTY,
        }
    }

    fn cp26_apply(&self, current: Phoneme, key: char) -> Option<Phoneme> {
        let mut aux = self.aux.borrow_mut();
        let Aux::Cp26Pending(pending) = &mut *aux else {
            unreachable!("DachenCp26 constructed without Cp26Pending");
        };
        match *pending {
            Some(first) if first == key => {
                *pending = None;
                dachen::apply_key(current, key)
            }
            Some(_) => {
                *pending = Some(key);
                Some(current)
            }
            None => {
                *pending = Some(key);
                Some(current)
            }
        }
    }
}

/// The five common "tone letters" Pinyin layouts use to close a syllable,
/// since (unlike the Dachen family) a bare letter buffer has no natural
/// place to park tone marks. Chosen from the top QWERTY row; safe on any
/// buffer because they only fire once the buffer *already* parses as a
/// complete syllable (see [`KeyboardLayout::pinyin_apply`]) — a letter
/// that would extend the buffer into a longer valid syllable never reaches
/// this table.
fn tone_key(key: char) -> Option<u8> {
    match key {
        'q' => Some(1),
        'w' => Some(2),
        'e' => Some(3),
        'r' => Some(4),
        't' => Some(5),
        _ => None,
    }
}

impl PhoneticLayout for KeyboardLayout {
    fn apply_key(&self, current: Phoneme, key: char) -> Option<Phoneme> {
        match self.kind {
            KeyboardLayoutKind::Default => dachen::apply_key(current, key),
            KeyboardLayoutKind::Hsu => hsu::apply_key(current, key),
            KeyboardLayoutKind::Et => et::apply_key(current, key),
            KeyboardLayoutKind::Et26 => et26::apply_key(current, key),
            KeyboardLayoutKind::DachenCp26 => self.cp26_apply(current, key),
            KeyboardLayoutKind::HanyuPinyin => {
                self.pinyin_apply(key, phonetics::parse_hanyu_pinyin)
            }
            KeyboardLayoutKind::ThlPinyin => self.pinyin_apply(key, phonetics::parse_thl_pinyin),
            KeyboardLayoutKind::Mps2Pinyin => {
                self.pinyin_apply(key, phonetics::parse_mps2_pinyin)
            }
            KeyboardLayoutKind::Dvorak => dachen::apply_key(current, remap::dvorak(key)),
            KeyboardLayoutKind::DvorakHsu => hsu::apply_key(current, remap::dvorak(key)),
            KeyboardLayoutKind::Ibm => dachen::apply_key(current, remap::ibm(key)),
            KeyboardLayoutKind::GinYieh => dachen::apply_key(current, remap::gin_yieh(key)),
            KeyboardLayoutKind::Carpalx => hsu::apply_key(current, remap::carpalx(key)),
        }
    }

    fn alt_syllable(&self, phoneme: Phoneme) -> Option<Phoneme> {
        if !self.correction {
            return None;
        }
        match self.kind {
            KeyboardLayoutKind::Hsu | KeyboardLayoutKind::DvorakHsu | KeyboardLayoutKind::Carpalx => {
                hsu::alt_final(phoneme)
            }
            KeyboardLayoutKind::Et26 => et26::alt_final(phoneme),
            _ => None,
        }
    }

    fn remove_last(&self, current: Phoneme) -> Phoneme {
        match self.kind {
            KeyboardLayoutKind::HanyuPinyin => self.pinyin_remove_last(phonetics::parse_hanyu_pinyin),
            KeyboardLayoutKind::ThlPinyin => self.pinyin_remove_last(phonetics::parse_thl_pinyin),
            KeyboardLayoutKind::Mps2Pinyin => self.pinyin_remove_last(phonetics::parse_mps2_pinyin),
            KeyboardLayoutKind::DachenCp26 => {
                let mut aux = self.aux.borrow_mut();
                let Aux::Cp26Pending(pending) = &mut *aux else {
                    unreachable!("DachenCp26 constructed without Cp26Pending");
                };
                if pending.take().is_some() {
                    current
                } else {
                    current.peel()
                }
            }
            _ => current.peel(),
        }
    }
}

/// Two small helpers every direct-mapping table below is built from: a key
/// whose meaning is an initial while the syllable is empty and a final once
/// the initial slot is filled, and a key whose meaning is an initial while
/// the syllable has no body yet and a tone once it does. Both encode the
/// same idea — a key's role follows how far the syllable has progressed,
/// not a fixed lookup — which is what lets 26 letters reach 21+3+13+5 = 42
/// distinct symbols.
fn dual_initial_final(cur: Phoneme, initial: u8, final_: u8) -> Option<Phoneme> {
    if cur.is_empty() {
        Some(cur.with_initial(initial))
    } else if cur.final_() == 0 {
        Some(cur.with_final(final_))
    } else {
        None
    }
}

fn initial_then_tone(cur: Phoneme, initial: u8, tone: u8) -> Option<Phoneme> {
    let has_body = cur.medial() != 0 || cur.final_() != 0;
    if has_body && cur.tone() == 0 {
        Some(cur.with_tone(tone))
    } else if cur.is_empty() {
        Some(cur.with_initial(initial))
    } else {
        None
    }
}

fn medial_only(cur: Phoneme, medial: u8) -> Option<Phoneme> {
    if cur.final_() == 0 {
        Some(cur.with_medial(medial))
    } else {
        None
    }
}

fn final_only(cur: Phoneme, final_: u8) -> Option<Phoneme> {
    if cur.final_() == 0 {
        Some(cur.with_final(final_))
    } else {
        None
    }
}

fn initial_only(cur: Phoneme, initial: u8) -> Option<Phoneme> {
    if cur.is_empty() {
        Some(cur.with_initial(initial))
    } else {
        None
    }
}

/// The standard Dachen (大千) layout: 21 initials spread across every
/// letter, 3 medials on `i o p`, 2 finals that need no initial first on
/// `k l`, 11 more finals riding the same keys as 11 of the initials once
/// the initial slot is already full, and tone entered on `h z x c v` once
/// the syllable has a medial or final (`h` doubling as the otherwise
/// unmarked first tone).
mod dachen {
    use super::*;

    pub fn apply_key(cur: Phoneme, key: char) -> Option<Phoneme> {
        match key {
            'q' => dual_initial_final(cur, 2, 1),
            'w' => dual_initial_final(cur, 6, 2),
            'e' => dual_initial_final(cur, 9, 4),
            'r' => dual_initial_final(cur, 12, 5),
            't' => dual_initial_final(cur, 16, 6),
            'y' => dual_initial_final(cur, 19, 8),
            'a' => dual_initial_final(cur, 3, 9),
            's' => dual_initial_final(cur, 7, 10),
            'd' => dual_initial_final(cur, 10, 11),
            'f' => dual_initial_final(cur, 13, 12),
            'g' => dual_initial_final(cur, 17, 13),
            'h' => initial_then_tone(cur, 20, 1),
            'z' => initial_then_tone(cur, 4, 2),
            'x' => initial_then_tone(cur, 8, 3),
            'c' => initial_then_tone(cur, 11, 4),
            'v' => initial_then_tone(cur, 14, 5),
            'b' => initial_only(cur, 18),
            'n' => initial_only(cur, 21),
            'u' => initial_only(cur, 1),
            'j' => initial_only(cur, 5),
            'm' => initial_only(cur, 15),
            'i' => medial_only(cur, 1),
            'o' => medial_only(cur, 2),
            'p' => medial_only(cur, 3),
            'k' => final_only(cur, 3),
            'l' => final_only(cur, 7),
            _ => None,
        }
    }
}

/// Hsu (許氏) style: the same shape as [`dachen`] but a different
/// permutation, with the tone keys moved onto `d f j k x` per the
/// contextual dual-purpose key design this layout is known for.
mod hsu {
    use super::*;

    pub fn apply_key(cur: Phoneme, key: char) -> Option<Phoneme> {
        match key {
            'd' => initial_then_tone(cur, 10, 1),
            'f' => initial_then_tone(cur, 13, 2),
            'j' => initial_then_tone(cur, 12, 3),
            'k' => initial_then_tone(cur, 15, 4),
            'x' => initial_then_tone(cur, 8, 5),
            'n' => medial_only(cur, 1),
            'm' => medial_only(cur, 2),
            'v' => medial_only(cur, 3),
            'w' => final_only(cur, 3),
            'y' => final_only(cur, 7),
            'q' => dual_initial_final(cur, 2, 1),
            'r' => dual_initial_final(cur, 3, 2),
            't' => dual_initial_final(cur, 4, 4),
            'a' => dual_initial_final(cur, 5, 5),
            's' => dual_initial_final(cur, 6, 6),
            'g' => dual_initial_final(cur, 7, 8),
            'h' => dual_initial_final(cur, 9, 9),
            'c' => dual_initial_final(cur, 11, 10),
            'z' => dual_initial_final(cur, 14, 11),
            'b' => dual_initial_final(cur, 16, 12),
            'e' => dual_initial_final(cur, 1, 13),
            'i' => initial_only(cur, 17),
            'l' => initial_only(cur, 18),
            'o' => initial_only(cur, 19),
            'p' => initial_only(cur, 20),
            'u' => initial_only(cur, 21),
            _ => None,
        }
    }

    /// Hsu's best-known typo: `ㄣ`(10)/`ㄥ`(12) and `ㄢ`(9)/`ㄤ`(11) share a
    /// finger pattern and get crossed under time pressure. Offer the swap
    /// as a second reading rather than rejecting the keystroke outright.
    pub fn alt_final(phoneme: Phoneme) -> Option<Phoneme> {
        let swapped = match phoneme.final_() {
            10 => 12,
            12 => 10,
            9 => 11,
            11 => 9,
            _ => return None,
        };
        Some(phoneme.with_final(swapped))
    }
}

/// ET (倚天) style: its own permutation of the same dual/tone/medial/final
/// shape, tone keys on `s d f j`.
mod et {
    use super::*;

    pub fn apply_key(cur: Phoneme, key: char) -> Option<Phoneme> {
        match key {
            's' => initial_then_tone(cur, 5, 1),
            'd' => initial_then_tone(cur, 9, 2),
            'f' => initial_then_tone(cur, 13, 3),
            'j' => initial_then_tone(cur, 17, 4),
            'x' => initial_then_tone(cur, 21, 5),
            'u' => medial_only(cur, 1),
            'i' => medial_only(cur, 2),
            'o' => medial_only(cur, 3),
            'k' => final_only(cur, 4),
            'l' => final_only(cur, 8),
            'q' => dual_initial_final(cur, 2, 1),
            'w' => dual_initial_final(cur, 3, 2),
            'e' => dual_initial_final(cur, 4, 3),
            'r' => dual_initial_final(cur, 6, 5),
            't' => dual_initial_final(cur, 7, 6),
            'y' => dual_initial_final(cur, 8, 7),
            'a' => dual_initial_final(cur, 10, 9),
            'g' => dual_initial_final(cur, 11, 10),
            'h' => dual_initial_final(cur, 12, 11),
            'z' => dual_initial_final(cur, 14, 12),
            'c' => dual_initial_final(cur, 16, 13),
            'v' => initial_only(cur, 1),
            'b' => initial_only(cur, 15),
            'n' => initial_only(cur, 18),
            'm' => initial_only(cur, 19),
            'p' => initial_only(cur, 20),
            _ => None,
        }
    }
}

/// ET26, ET's 26-key successor: same table as [`et`], contextual typo
/// correction on the same confusable final pairs as Hsu.
mod et26 {
    use super::*;

    pub fn apply_key(cur: Phoneme, key: char) -> Option<Phoneme> {
        et::apply_key(cur, key)
    }

    pub fn alt_final(phoneme: Phoneme) -> Option<Phoneme> {
        hsu::alt_final(phoneme)
    }
}

/// Positional remaps: the key tables above assume a QWERTY physical
/// layout (Zhuyin keycaps are printed by physical position); a user whose
/// OS keymap is one of these re-maps the character that actually arrives
/// back to its QWERTY-position equivalent before handing it to `dachen`
/// or `hsu`.
///
/// Dvorak's mapping is the standard ANSI Dvorak/QWERTY key correspondence.
/// IBM, GinYieh and Carpalx predate any surviving public key chart this
/// crate could check against, so their tables here are this crate's own
/// self-consistent permutations, not reproductions of the historical
/// exact layouts.
mod remap {
    const DVORAK: &[(char, char)] = &[
        ('q', '\''), ('w', ','), ('e', '.'), ('r', 'p'), ('t', 'y'),
        ('y', 'f'), ('u', 'g'), ('i', 'c'), ('o', 'r'), ('p', 'l'),
        ('a', 'a'), ('s', 'o'), ('d', 'e'), ('f', 'u'), ('g', 'i'),
        ('h', 'd'), ('j', 'h'), ('k', 't'), ('l', 'n'),
        ('z', ';'), ('x', 'q'), ('c', 'j'), ('v', 'k'), ('b', 'x'),
        ('n', 'b'), ('m', 'm'),
    ];

    const IBM: &[(char, char)] = &[
        ('q', 'q'), ('w', 'a'), ('e', 'z'), ('r', 'x'), ('t', 'c'),
        ('y', 'v'), ('u', 'b'), ('i', 'n'), ('o', 'm'), ('p', 'p'),
        ('a', 'w'), ('s', 's'), ('d', 'd'), ('f', 'f'), ('g', 'g'),
        ('h', 'h'), ('j', 'j'), ('k', 'k'), ('l', 'l'),
        ('z', 'e'), ('x', 'r'), ('c', 't'), ('v', 'y'), ('b', 'u'),
        ('n', 'i'), ('m', 'o'),
    ];

    const GIN_YIEH: &[(char, char)] = &[
        ('q', 'p'), ('w', 'o'), ('e', 'i'), ('r', 'u'), ('t', 'y'),
        ('y', 't'), ('u', 'r'), ('i', 'e'), ('o', 'w'), ('p', 'q'),
        ('a', 'l'), ('s', 'k'), ('d', 'j'), ('f', 'h'), ('g', 'g'),
        ('h', 'f'), ('j', 'd'), ('k', 's'), ('l', 'a'),
        ('z', 'm'), ('x', 'n'), ('c', 'b'), ('v', 'v'), ('b', 'c'),
        ('n', 'x'), ('m', 'z'),
    ];

    const CARPALX: &[(char, char)] = &[
        ('q', 'q'), ('w', 'g'), ('e', 'm'), ('r', 'l'), ('t', 'w'),
        ('y', 'y'), ('u', 'f'), ('i', 'u'), ('o', 'b'), ('p', 'p'),
        ('a', 'a'), ('s', 's'), ('d', 't'), ('f', 'h'), ('g', 'n'),
        ('h', 'r'), ('j', 'e'), ('k', 'i'), ('l', 'o'),
        ('z', 'z'), ('x', 'x'), ('c', 'c'), ('v', 'd'), ('b', 'v'),
        ('n', 'k'), ('m', 'j'),
    ];

    /// Tables below are written as `(qwerty_position_char, remapped_char)`
    /// — the character the remapped layout actually sends when the user
    /// presses the key at that QWERTY position. Looking a received
    /// character up here therefore searches the *second* element and
    /// returns the first: "which QWERTY-position key sends this?".
    fn lookup(table: &[(char, char)], received: char) -> char {
        table
            .iter()
            .find(|(_, remapped)| *remapped == received)
            .map(|(qwerty, _)| *qwerty)
            .unwrap_or(received)
    }

    pub fn dvorak(key: char) -> char {
        lookup(DVORAK, key)
    }

    pub fn ibm(key: char) -> char {
        lookup(IBM, key)
    }

    pub fn gin_yieh(key: char) -> char {
        lookup(GIN_YIEH, key)
    }

    pub fn carpalx(key: char) -> char {
        lookup(CARPALX, key)
    }
}
