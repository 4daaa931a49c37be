//! Editor trait and implementations for different input modes (C2, spec
//! §4.2 and §4.7).
//!
//! Kept from the teacher: the `Editor`/`EditorResult` trait shape, and the
//! overall split between a phonetic editor and a punctuation editor.
//! Rewritten: `PhoneticEditor` now drives a phoneme-based composition
//! instead of a raw string input buffer, and is generic over a
//! [`PhoneticLayout`] (the keyboard-layout trait `libzhuyin` implements)
//! rather than over a sentence-scoring `SyllableParser`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::candidate::Candidate;
use crate::chooser::{Chooser, PinnedSpan};
use crate::config::{AddPhraseDirection, Config};
use crate::ime_engine::KeyEvent;
use crate::phoneme::{Phoneme, Syllable};
use crate::preedit::{PreeditError, Symbol};
use crate::session::{ImeSession, SessionState};
use crate::tree::PhraseTree;
use crate::userdict::UserDict;

/// Result of processing a key event in an editor.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorResult {
    /// Key was handled, session state updated
    Handled,
    /// Text should be committed, stay in current mode
    Commit(String),
    /// Text should be committed and mode should reset
    CommitAndReset(String),
    /// Request to switch to a different session state
    ModeSwitch(SessionState),
    /// Key not handled by this editor, pass to parent
    PassThrough,
}

/// Editor trait for handling input in specific modes.
pub trait Editor {
    fn process_key(&mut self, key: KeyEvent, session: &mut ImeSession) -> EditorResult;
    fn update_candidates(&mut self, session: &mut ImeSession);
    fn reset(&mut self);
    fn name(&self) -> &'static str;
    fn can_handle(&self, _key: &KeyEvent) -> bool {
        true
    }
}

/// Translates one keystroke into a phoneme update (C1, spec §4.1). Each
/// keyboard layout in `libzhuyin` implements this.
pub trait PhoneticLayout {
    /// Apply `key` to `current`, returning the updated in-progress
    /// phoneme, or `None` if `key` does not belong to this layout at all
    /// (the editor then passes the key through).
    fn apply_key(&self, current: Phoneme, key: char) -> Option<Phoneme>;

    /// An alternate reading for an ambiguous key sequence (Hsu/ET26
    /// contextual corrections, spec §9 open question). Looked up in
    /// addition to the primary phoneme; union their dictionary hits.
    fn alt_syllable(&self, _phoneme: Phoneme) -> Option<Phoneme> {
        None
    }

    /// Undo the most recent keystroke (spec §4.2 `remove_last`). Default is
    /// the generic rightmost-component peel, correct for any layout that
    /// writes phoneme fields directly (Dachen and its positional remaps).
    /// Layouts that accumulate a letter buffer before translating it
    /// (Pinyin) or that hold pending multi-stroke state (CP26) override
    /// this to pop their own auxiliary state instead.
    fn remove_last(&self, current: Phoneme) -> Phoneme {
        current.peel()
    }
}

// ============================================================================
// PhoneticEditor - phoneme-driven composition (C2)
// ============================================================================

/// Phonetic input editor. Drives a [`PhoneticLayout`] to turn keystrokes
/// into phonemes, folds completed syllables into the session's preedit
/// buffer, and asks the [`Chooser`] to segment + merge dictionary
/// candidates (C3/C4/C6).
pub struct PhoneticEditor<L: PhoneticLayout> {
    layout: L,
    tree: Arc<PhraseTree>,
    user: UserDict,
    /// Phrases hidden from candidate suggestions (spec §10 masking),
    /// mirrored from `Config::masked_phrases` by the owning `ImeEngine`.
    masked: HashSet<String>,
    /// The syllable currently being typed, not yet finalized by a tone.
    pending: Phoneme,
    /// Buffer slot the in-progress syllable occupies, if any.
    pending_index: Option<usize>,
    /// Spans pinned by explicit candidate-window selections.
    pins: Vec<PinnedSpan>,
    /// Span the candidate window is currently open for.
    selecting_span: Option<(usize, usize)>,
    /// Spec §6 `space_as_selection`: when set, a bare Space opens the
    /// candidate window instead of committing outright.
    space_as_selection: bool,
    /// Spec §6 `phrase_choice_rearward`: when set, the candidate window
    /// opened at the cursor looks at the syllable behind it rather than
    /// the one ahead of it.
    phrase_choice_rearward: bool,
    /// Spec §6 `auto_shift_cursor`: when set, the cursor jumps to just
    /// past a span once a candidate is chosen for it.
    auto_shift_cursor: bool,
    /// Spec §6 `add_phrase_direction`: where a brand-new user phrase lands
    /// relative to its dictionary siblings on first commit.
    add_phrase_direction: AddPhraseDirection,
}

impl<L: PhoneticLayout> PhoneticEditor<L> {
    pub fn new(layout: L, tree: Arc<PhraseTree>, user: UserDict) -> Self {
        Self {
            layout,
            tree,
            user,
            masked: HashSet::new(),
            pending: Phoneme::EMPTY,
            pending_index: None,
            pins: Vec::new(),
            selecting_span: None,
            space_as_selection: false,
            phrase_choice_rearward: false,
            auto_shift_cursor: false,
            add_phrase_direction: AddPhraseDirection::Forward,
        }
    }

    pub fn layout(&self) -> &L {
        &self.layout
    }

    /// Replace the set of phrases excluded from suggestion, e.g. after
    /// `Config::mask_phrase`/`unmask_phrase` changes at runtime.
    pub fn set_masked_phrases(&mut self, masked: HashSet<String>) {
        self.masked = masked;
    }

    /// Pull the behavioral knobs of spec §6 out of a `Config`, mirroring
    /// the way `ImeEngine` already pushes `masked_phrases` in.
    pub fn set_options(&mut self, config: &Config) {
        self.space_as_selection = config.space_as_selection;
        self.phrase_choice_rearward = config.phrase_choice_rearward;
        self.auto_shift_cursor = config.auto_shift_cursor;
        self.add_phrase_direction = config.add_phrase_direction;
    }

    fn chooser(&self) -> Chooser<'_> {
        Chooser::new(&self.tree, &self.user, &self.masked).with_direction(self.add_phrase_direction)
    }

    /// Every completed syllable currently sitting in the buffer.
    fn buffer_syllables(session: &ImeSession) -> Vec<Syllable> {
        session
            .preedit()
            .symbols()
            .iter()
            .filter_map(|s| match s {
                Symbol::Phone(p) => Syllable::from_phoneme(*p),
                Symbol::Char(_) => None,
            })
            .collect()
    }

    /// Re-run the chooser over the whole buffer and write the result back
    /// as committed intervals (spec §4.6).
    fn resegment(&self, session: &mut ImeSession) {
        let syllables = Self::buffer_syllables(session);
        if syllables.is_empty() {
            return;
        }
        let spans = self.chooser().segment(&syllables, &self.pins);
        for span in &spans {
            session
                .preedit_mut()
                .commit_interval(span.start, span.end, span.text.clone());
        }
    }

    fn handle_char(&mut self, ch: char, session: &mut ImeSession) -> EditorResult {
        let Some(next) = self.layout.apply_key(self.pending, ch) else {
            return EditorResult::PassThrough;
        };

        match self.pending_index {
            Some(idx) => session.preedit_mut().set_symbol(idx, Symbol::Phone(next)),
            None => {
                let idx = session.preedit().cursor();
                match session.preedit_mut().insert(Symbol::Phone(next)) {
                    Ok(()) => self.pending_index = Some(idx),
                    Err(PreeditError::Overflow) => return EditorResult::Handled,
                }
            }
        }
        self.pending = next;

        if Syllable::from_phoneme(next).is_some() {
            self.pending = Phoneme::EMPTY;
            self.pending_index = None;
        }

        self.resegment(session);
        self.update_candidates(session);
        EditorResult::Handled
    }

    fn handle_backspace(&mut self, session: &mut ImeSession) -> EditorResult {
        if let Some(idx) = self.pending_index {
            let peeled = self.layout.remove_last(self.pending);
            if peeled.is_empty() {
                session.preedit_mut().set_cursor(idx + 1);
                session.preedit_mut().delete_before();
                self.pending_index = None;
            } else {
                session.preedit_mut().set_symbol(idx, Symbol::Phone(peeled));
            }
            self.pending = peeled;
            return EditorResult::Handled;
        }

        let removed = session.preedit_mut().delete_before();
        if removed.is_none() {
            return EditorResult::PassThrough;
        }
        if session.preedit().is_empty() {
            self.reset();
            return EditorResult::CommitAndReset(String::new());
        }
        self.resegment(session);
        self.update_candidates(session);
        EditorResult::Handled
    }

    fn handle_delete(&mut self, session: &mut ImeSession) -> EditorResult {
        let removed = session.preedit_mut().delete_after();
        if removed.is_none() {
            return EditorResult::PassThrough;
        }
        if session.preedit().is_empty() {
            self.reset();
            return EditorResult::CommitAndReset(String::new());
        }
        self.resegment(session);
        self.update_candidates(session);
        EditorResult::Handled
    }

    /// Open the candidate window for the span under the cursor (spec §4.6).
    /// Finds the interval covering the cursor, or falls back to a
    /// single-syllable span there.
    fn open_candidate_window(&mut self, session: &mut ImeSession) -> EditorResult {
        let syllables = Self::buffer_syllables(session);
        if syllables.is_empty() {
            return EditorResult::PassThrough;
        }
        let last = syllables.len().saturating_sub(1);
        let cursor = session.preedit().cursor().min(last);
        // `phrase_choice_rearward`: look at the syllable just behind the
        // cursor instead of the one it's sitting on (spec §6).
        let probe = if self.phrase_choice_rearward {
            cursor.saturating_sub(1)
        } else {
            cursor
        };
        let span = session
            .preedit()
            .intervals()
            .iter()
            .find(|iv| iv.start <= probe && probe < iv.end)
            .map(|iv| (iv.start, iv.end))
            .unwrap_or((probe, probe + 1));

        let span_syllables = &syllables[span.0..span.1];
        let mut options = self.chooser().candidates_for_span(span_syllables);

        // Hsu/ET26-style layouts offer a contextual alternate reading for a
        // single ambiguous syllable; union its dictionary hits in rather
        // than forcing the user to retype (spec §9 open question).
        if span_syllables.len() == 1 {
            if let Some(alt) = self.layout.alt_syllable(span_syllables[0].phoneme()) {
                if let Some(alt_syllable) = Syllable::from_phoneme(alt) {
                    let mut by_text: HashMap<String, u32> = options.iter().cloned().collect();
                    for (text, freq) in self.chooser().candidates_for_span(&[alt_syllable]) {
                        by_text.entry(text).and_modify(|f| *f = (*f).max(freq)).or_insert(freq);
                    }
                    options = by_text.into_iter().collect();
                    options.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                }
            }
        }

        if options.is_empty() {
            return EditorResult::PassThrough;
        }
        let candidates: Vec<Candidate> = options
            .into_iter()
            .map(|(text, freq)| Candidate::from_freq(text, freq))
            .collect();
        session.candidates_mut().set_candidates(candidates);
        session.set_state(SessionState::Selecting);
        self.selecting_span = Some(span);
        EditorResult::Handled
    }

    fn select_candidate(&mut self, index: usize, session: &mut ImeSession) -> EditorResult {
        let Some(span) = self.selecting_span else {
            return EditorResult::PassThrough;
        };
        let Some(candidate) = session.candidates_mut().select_by_index(index) else {
            return EditorResult::PassThrough;
        };
        let text = candidate.text.clone();

        self.pins.retain(|p| p.start != span.0);
        self.pins.push(PinnedSpan {
            start: span.0,
            end: span.1,
            text,
        });
        self.selecting_span = None;
        session.candidates_mut().clear();
        session.set_state(SessionState::Entering);
        self.resegment(session);
        if self.auto_shift_cursor {
            session.preedit_mut().set_cursor(span.1);
        }
        self.update_candidates(session);
        EditorResult::Handled
    }

    fn handle_enter(&mut self, session: &mut ImeSession) -> EditorResult {
        if session.state() == SessionState::Selecting {
            let idx = session.candidates().cursor();
            return self.select_candidate(idx, session);
        }
        let syllables = Self::buffer_syllables(session);
        let spans = self.chooser().segment(&syllables, &self.pins);
        self.chooser().record_commit(&syllables, &spans);
        let text = session.preedit().render_committed();
        self.reset();
        session.clear();
        EditorResult::CommitAndReset(text)
    }

    fn handle_space(&mut self, session: &mut ImeSession) -> EditorResult {
        if session.state() == SessionState::Selecting {
            let idx = session.candidates().cursor();
            return self.select_candidate(idx, session);
        }
        if session.preedit().is_empty() {
            return EditorResult::CommitAndReset(" ".to_string());
        }
        if self.space_as_selection {
            let result = self.open_candidate_window(session);
            if !matches!(result, EditorResult::PassThrough) {
                return result;
            }
        }
        self.handle_enter(session)
    }

    fn handle_number(&mut self, n: u8, session: &mut ImeSession) -> EditorResult {
        if session.state() != SessionState::Selecting || !(1..=9).contains(&n) {
            return EditorResult::PassThrough;
        }
        self.select_candidate((n - 1) as usize, session)
    }
}

impl<L: PhoneticLayout> Editor for PhoneticEditor<L> {
    fn process_key(&mut self, key: KeyEvent, session: &mut ImeSession) -> EditorResult {
        match key {
            KeyEvent::Char(ch) if session.state() == SessionState::Selecting => {
                session.candidates_mut().clear();
                session.set_state(SessionState::Entering);
                self.selecting_span = None;
                self.handle_char(ch, session)
            }
            KeyEvent::Char(ch) => self.handle_char(ch, session),
            KeyEvent::Backspace => self.handle_backspace(session),
            KeyEvent::Delete => self.handle_delete(session),
            KeyEvent::Space => self.handle_space(session),
            KeyEvent::Enter => self.handle_enter(session),
            KeyEvent::Number(n) => self.handle_number(n, session),
            KeyEvent::Down if session.state() != SessionState::Selecting => {
                self.open_candidate_window(session)
            }
            KeyEvent::Up if session.state() != SessionState::Selecting => {
                self.open_candidate_window(session)
            }
            KeyEvent::Up => {
                session.candidates_mut().cursor_up();
                EditorResult::Handled
            }
            KeyEvent::Down => {
                session.candidates_mut().cursor_down();
                EditorResult::Handled
            }
            KeyEvent::Left => {
                session.preedit_mut().move_left();
                EditorResult::Handled
            }
            KeyEvent::Right => {
                session.preedit_mut().move_right();
                EditorResult::Handled
            }
            KeyEvent::PageUp => {
                session.candidates_mut().page_up();
                EditorResult::Handled
            }
            KeyEvent::PageDown => {
                session.candidates_mut().page_down();
                EditorResult::Handled
            }
            KeyEvent::Escape => {
                self.reset();
                session.clear();
                EditorResult::CommitAndReset(String::new())
            }
            KeyEvent::Ctrl(_) | KeyEvent::ShiftLock => EditorResult::PassThrough,
        }
    }

    fn update_candidates(&mut self, session: &mut ImeSession) {
        if session.state() == SessionState::Selecting {
            return;
        }
        session.candidates_mut().clear();
    }

    fn reset(&mut self) {
        self.pending = Phoneme::EMPTY;
        self.pending_index = None;
        self.pins.clear();
        self.selecting_span = None;
    }

    fn name(&self) -> &'static str {
        "PhoneticEditor"
    }

    fn can_handle(&self, key: &KeyEvent) -> bool {
        match key {
            KeyEvent::Char(ch) => ch.is_ascii_lowercase(),
            _ => true,
        }
    }
}

// ============================================================================
// PunctuationEditor - full-width punctuation selection
// ============================================================================

/// When the user types a punctuation key during composition, this editor
/// shows a list of full-width alternatives to choose from (spec §8
/// "fullshape" scenario).
pub struct PunctuationEditor {
    punct_map: HashMap<char, Vec<&'static str>>,
    active_key: Option<char>,
}

impl PunctuationEditor {
    pub fn new() -> Self {
        let mut punct_map = HashMap::new();
        punct_map.insert(',', vec!["，", ",", "、", "﹐", "﹑"]);
        punct_map.insert('.', vec!["。", ".", "·", "﹒", "．"]);
        punct_map.insert(';', vec!["；", ";", "﹔"]);
        punct_map.insert(':', vec!["：", ":", "﹕"]);
        punct_map.insert('?', vec!["？", "?", "﹖"]);
        punct_map.insert('!', vec!["！", "!", "﹗"]);
        punct_map.insert('"', vec!["\u{201C}", "\u{201D}", "\"", "＂"]);
        punct_map.insert('\'', vec!["\u{2018}", "\u{2019}", "'", "＇"]);
        punct_map.insert('(', vec!["（", "(", "﹙"]);
        punct_map.insert(')', vec!["）", ")", "﹚"]);
        punct_map.insert('[', vec!["「", "[", "［"]);
        punct_map.insert(']', vec!["」", "]", "］"]);
        punct_map.insert('{', vec!["『", "{", "｛"]);
        punct_map.insert('}', vec!["』", "}", "｝"]);
        punct_map.insert('-', vec!["—", "–", "-", "－"]);
        punct_map.insert('~', vec!["～", "…", "~"]);

        Self {
            punct_map,
            active_key: None,
        }
    }

    pub fn has_alternatives(&self, ch: char) -> bool {
        self.punct_map.contains_key(&ch)
    }

    /// First alternative for `key`, without opening the selection window
    /// (spec §8 easy-symbol scenario: `[` commits `「` on the keystroke
    /// itself; the candidate menu below is reserved for the explicit
    /// punctuation-browsing shortcut).
    pub fn easy_symbol(&self, key: char) -> Option<&'static str> {
        self.punct_map.get(&key).and_then(|alts| alts.first().copied())
    }

    /// Activate punctuation selection for a given key (manual punctuation
    /// browsing, not the easy-symbol auto-commit path above).
    pub fn activate(&mut self, key: char, session: &mut ImeSession) -> bool {
        let Some(alternatives) = self.punct_map.get(&key) else {
            return false;
        };
        self.active_key = Some(key);
        let candidates: Vec<Candidate> = alternatives.iter().map(|&s| Candidate::new(s, 1.0)).collect();
        session.clear();
        session.candidates_mut().set_candidates(candidates);
        session.set_state(SessionState::Selecting);
        true
    }

    fn select_candidate(&mut self, session: &mut ImeSession) -> Option<String> {
        session.candidates().selected_candidate().map(|c| c.text.clone())
    }
}

impl Default for PunctuationEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor for PunctuationEditor {
    fn process_key(&mut self, key: KeyEvent, session: &mut ImeSession) -> EditorResult {
        match key {
            KeyEvent::Number(n) => {
                if !(1..=9).contains(&n) {
                    return EditorResult::PassThrough;
                }
                let index = (n - 1) as usize;
                if let Some(candidate) = session.candidates_mut().select_by_index(index) {
                    EditorResult::CommitAndReset(candidate.text.clone())
                } else {
                    EditorResult::PassThrough
                }
            }
            KeyEvent::Space | KeyEvent::Enter => match self.select_candidate(session) {
                Some(text) => EditorResult::CommitAndReset(text),
                None => EditorResult::PassThrough,
            },
            KeyEvent::Up => {
                session.candidates_mut().cursor_up();
                EditorResult::Handled
            }
            KeyEvent::Down => {
                session.candidates_mut().cursor_down();
                EditorResult::Handled
            }
            KeyEvent::PageUp => {
                session.candidates_mut().page_up();
                EditorResult::Handled
            }
            KeyEvent::PageDown => {
                session.candidates_mut().page_down();
                EditorResult::Handled
            }
            KeyEvent::Escape => match self.active_key {
                Some(key) => EditorResult::CommitAndReset(key.to_string()),
                None => EditorResult::CommitAndReset(String::new()),
            },
            _ => EditorResult::PassThrough,
        }
    }

    fn update_candidates(&mut self, _session: &mut ImeSession) {}

    fn reset(&mut self) {
        self.active_key = None;
    }

    fn name(&self) -> &'static str {
        "PunctuationEditor"
    }

    fn can_handle(&self, key: &KeyEvent) -> bool {
        !matches!(key, KeyEvent::Char(_) | KeyEvent::Backspace | KeyEvent::Delete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phoneme::Phoneme;
    use std::io::Write;

    /// A tiny layout for tests: 'n' sets initial=2, 'i' sets final=2,
    /// digits 1-4 set tone (completing the syllable).
    struct TestLayout;

    impl PhoneticLayout for TestLayout {
        fn apply_key(&self, current: Phoneme, key: char) -> Option<Phoneme> {
            match key {
                'n' => Some(current.with_initial(2)),
                'i' => Some(current.with_final(2)),
                '1'..='4' => {
                    let tone = key.to_digit(10).unwrap() as u8;
                    Some(current.with_tone(tone))
                }
                _ => None,
            }
        }
    }

    fn write_node(buf: &mut Vec<u8>, key: u16, a: u32, b: u32) {
        buf.extend_from_slice(&key.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&a.to_le_bytes());
        buf.extend_from_slice(&b.to_le_bytes());
    }

    fn build_tree() -> Arc<PhraseTree> {
        let ni = Syllable::from_phoneme(Phoneme::new(2, 0, 2, 4)).unwrap();
        let mut arena = Vec::new();
        let pos = arena.len() as u32;
        arena.extend_from_slice("你".as_bytes());
        arena.push(0);

        let mut nodes = Vec::new();
        write_node(&mut nodes, 1, 1, 2);
        write_node(&mut nodes, ni.raw(), 2, 3);
        write_node(&mut nodes, 0, pos, 50);

        let mut tree_file = tempfile::NamedTempFile::new().unwrap();
        tree_file.write_all(&nodes).unwrap();
        let mut arena_file = tempfile::NamedTempFile::new().unwrap();
        arena_file.write_all(&arena).unwrap();
        Arc::new(PhraseTree::open(tree_file.path(), arena_file.path()).unwrap())
    }

    fn temp_userdict() -> UserDict {
        let mut p = std::env::temp_dir();
        p.push(format!(
            "editor_test_{}.redb",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        UserDict::new(p).unwrap()
    }

    #[test]
    fn typing_a_complete_syllable_produces_a_candidate() {
        let tree = build_tree();
        let user = temp_userdict();
        let mut editor = PhoneticEditor::new(TestLayout, tree, user);
        let mut session = ImeSession::new();

        editor.process_key(KeyEvent::Char('n'), &mut session);
        editor.process_key(KeyEvent::Char('i'), &mut session);
        editor.process_key(KeyEvent::Char('4'), &mut session);

        assert_eq!(session.preedit().len(), 1);
        assert_eq!(session.preedit().render_committed(), "你");
    }

    #[test]
    fn backspace_mid_syllable_peels_the_tone_first() {
        let tree = build_tree();
        let user = temp_userdict();
        let mut editor = PhoneticEditor::new(TestLayout, tree, user);
        let mut session = ImeSession::new();

        editor.process_key(KeyEvent::Char('n'), &mut session);
        editor.process_key(KeyEvent::Char('i'), &mut session);
        editor.process_key(KeyEvent::Char('4'), &mut session);
        editor.process_key(KeyEvent::Backspace, &mut session);

        // tone peeled off; the syllable is no longer complete so it
        // renders via the phoneme preview, not the dictionary phrase.
        assert_ne!(session.preedit().render_preview(), "你");
    }

    #[test]
    fn escape_cancels_without_committing() {
        let tree = build_tree();
        let user = temp_userdict();
        let mut editor = PhoneticEditor::new(TestLayout, tree, user);
        let mut session = ImeSession::new();

        editor.process_key(KeyEvent::Char('n'), &mut session);
        let result = editor.process_key(KeyEvent::Escape, &mut session);
        assert_eq!(result, EditorResult::CommitAndReset(String::new()));
        assert!(session.preedit().is_empty());
    }

    #[test]
    fn enter_commits_and_bumps_user_frequency() {
        let tree = build_tree();
        let user = temp_userdict();
        let mut editor = PhoneticEditor::new(TestLayout, tree, user.clone());
        let mut session = ImeSession::new();

        editor.process_key(KeyEvent::Char('n'), &mut session);
        editor.process_key(KeyEvent::Char('i'), &mut session);
        editor.process_key(KeyEvent::Char('4'), &mut session);
        let result = editor.process_key(KeyEvent::Enter, &mut session);

        assert_eq!(result, EditorResult::CommitAndReset("你".to_string()));
        let ni = Syllable::from_phoneme(Phoneme::new(2, 0, 2, 4)).unwrap();
        let boosted = user.lookup(&[ni]).unwrap();
        assert!(!boosted.is_empty());
    }

    /// Two independent single-syllable entries ("好" at tone 3, "你" at tone
    /// 4) sharing the same initial/final, neither combining into a longer
    /// phrase — lets a test put the cursor on one or the other.
    fn build_two_entry_tree() -> Arc<PhraseTree> {
        let hao = Syllable::from_phoneme(Phoneme::new(2, 0, 2, 3)).unwrap();
        let ni = Syllable::from_phoneme(Phoneme::new(2, 0, 2, 4)).unwrap();
        let mut arena = Vec::new();
        let hao_pos = arena.len() as u32;
        arena.extend_from_slice("好".as_bytes());
        arena.push(0);
        let ni_pos = arena.len() as u32;
        arena.extend_from_slice("你".as_bytes());
        arena.push(0);

        // hao.raw() < ni.raw() since only the tone differs (3 < 4) and tone
        // occupies the low bits, so hao sorts first among root's children.
        let mut nodes = Vec::new();
        write_node(&mut nodes, 2, 1, 3); // root, count=2, children[1,3)
        write_node(&mut nodes, hao.raw(), 3, 4);
        write_node(&mut nodes, ni.raw(), 4, 5);
        write_node(&mut nodes, 0, hao_pos, 30); // leaf "好"
        write_node(&mut nodes, 0, ni_pos, 20); // leaf "你"

        let mut tree_file = tempfile::NamedTempFile::new().unwrap();
        tree_file.write_all(&nodes).unwrap();
        let mut arena_file = tempfile::NamedTempFile::new().unwrap();
        arena_file.write_all(&arena).unwrap();
        Arc::new(PhraseTree::open(tree_file.path(), arena_file.path()).unwrap())
    }

    #[test]
    fn space_as_selection_opens_the_candidate_window_instead_of_committing() {
        let tree = build_tree();
        let user = temp_userdict();
        let mut editor = PhoneticEditor::new(TestLayout, tree, user);
        let mut config = Config::default();
        config.space_as_selection = true;
        editor.set_options(&config);
        let mut session = ImeSession::new();

        editor.process_key(KeyEvent::Char('n'), &mut session);
        editor.process_key(KeyEvent::Char('i'), &mut session);
        editor.process_key(KeyEvent::Char('4'), &mut session);
        let result = editor.process_key(KeyEvent::Space, &mut session);

        assert_eq!(result, EditorResult::Handled);
        assert_eq!(session.state(), SessionState::Selecting);
        assert!(!session.preedit().is_empty());
    }

    #[test]
    fn phrase_choice_rearward_opens_the_window_on_the_syllable_behind_the_cursor() {
        let tree = build_two_entry_tree();
        let user = temp_userdict();
        let mut editor = PhoneticEditor::new(TestLayout, tree, user);
        let mut config = Config::default();
        config.phrase_choice_rearward = true;
        editor.set_options(&config);
        let mut session = ImeSession::new();

        editor.process_key(KeyEvent::Char('n'), &mut session); // syllable 1: 好
        editor.process_key(KeyEvent::Char('i'), &mut session);
        editor.process_key(KeyEvent::Char('3'), &mut session);
        editor.process_key(KeyEvent::Char('n'), &mut session); // syllable 2: 你
        editor.process_key(KeyEvent::Char('i'), &mut session);
        editor.process_key(KeyEvent::Char('4'), &mut session);

        editor.process_key(KeyEvent::Down, &mut session);
        let candidates = session.candidates().current_page_candidates();
        assert_eq!(candidates[0].text, "好");
    }

    #[test]
    fn without_rearward_the_window_opens_on_the_syllable_under_the_cursor() {
        let tree = build_two_entry_tree();
        let user = temp_userdict();
        let mut editor = PhoneticEditor::new(TestLayout, tree, user);
        let mut session = ImeSession::new();

        editor.process_key(KeyEvent::Char('n'), &mut session);
        editor.process_key(KeyEvent::Char('i'), &mut session);
        editor.process_key(KeyEvent::Char('3'), &mut session);
        editor.process_key(KeyEvent::Char('n'), &mut session);
        editor.process_key(KeyEvent::Char('i'), &mut session);
        editor.process_key(KeyEvent::Char('4'), &mut session);

        editor.process_key(KeyEvent::Down, &mut session);
        let candidates = session.candidates().current_page_candidates();
        assert_eq!(candidates[0].text, "你");
    }

    #[test]
    fn auto_shift_cursor_moves_the_cursor_past_a_newly_chosen_span() {
        let tree = build_two_entry_tree();
        let user = temp_userdict();
        let mut editor = PhoneticEditor::new(TestLayout, tree, user);
        let mut config = Config::default();
        config.auto_shift_cursor = true;
        editor.set_options(&config);
        let mut session = ImeSession::new();

        editor.process_key(KeyEvent::Char('n'), &mut session);
        editor.process_key(KeyEvent::Char('i'), &mut session);
        editor.process_key(KeyEvent::Char('3'), &mut session);
        editor.process_key(KeyEvent::Char('n'), &mut session);
        editor.process_key(KeyEvent::Char('i'), &mut session);
        editor.process_key(KeyEvent::Char('4'), &mut session);
        session.preedit_mut().set_cursor(0);

        editor.process_key(KeyEvent::Down, &mut session);
        editor.process_key(KeyEvent::Number(1), &mut session);

        assert_eq!(session.preedit().cursor(), 1);
    }

    #[test]
    fn without_auto_shift_cursor_the_cursor_position_is_left_alone() {
        let tree = build_two_entry_tree();
        let user = temp_userdict();
        let mut editor = PhoneticEditor::new(TestLayout, tree, user);
        let mut session = ImeSession::new();

        editor.process_key(KeyEvent::Char('n'), &mut session);
        editor.process_key(KeyEvent::Char('i'), &mut session);
        editor.process_key(KeyEvent::Char('3'), &mut session);
        editor.process_key(KeyEvent::Char('n'), &mut session);
        editor.process_key(KeyEvent::Char('i'), &mut session);
        editor.process_key(KeyEvent::Char('4'), &mut session);
        session.preedit_mut().set_cursor(0);

        editor.process_key(KeyEvent::Down, &mut session);
        editor.process_key(KeyEvent::Number(1), &mut session);

        assert_eq!(session.preedit().cursor(), 0);
    }

    #[test]
    fn punctuation_editor_offers_fullwidth_alternatives() {
        let mut editor = PunctuationEditor::new();
        let mut session = ImeSession::new();
        assert!(editor.activate(',', &mut session));
        let first = session.candidates().current_page_candidates().first().unwrap();
        assert_eq!(first.text, "，");
    }
}
