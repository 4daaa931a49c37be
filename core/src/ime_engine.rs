//! IME engine with session management and key event processing.
//!
//! `ImeEngine` wires a [`PhoneticEditor`] and a [`PunctuationEditor`]
//! behind a single `process_key()` entry point, routing keys to whichever
//! editor currently owns composition and keeping the session's
//! [`SessionState`] (spec §4.7) in sync. After every call the platform
//! reads `context()` to update preedit/candidate/commit UI.

use std::sync::Arc;

use crate::candidate::Candidate;
use crate::config::Config;
use crate::context::ImeContext;
use crate::editor::{Editor, EditorResult, PhoneticEditor, PhoneticLayout, PunctuationEditor};
use crate::session::{ImeSession, SessionState};
use crate::tree::PhraseTree;
use crate::userdict::UserDict;

/// Key event types that the IME can process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyEvent {
    /// Character input (a-z, punctuation, etc.)
    Char(char),
    /// Backspace key
    Backspace,
    /// Delete key
    Delete,
    /// Left arrow key
    Left,
    /// Right arrow key
    Right,
    /// Up arrow key (candidate cursor up)
    Up,
    /// Down arrow key (candidate cursor down)
    Down,
    /// Page up (candidate page up)
    PageUp,
    /// Page down (candidate page down)
    PageDown,
    /// Space key (select first candidate or commit)
    Space,
    /// Enter/Return key (commit current selection)
    Enter,
    /// Escape key (clear/cancel)
    Escape,
    /// Number key for candidate selection (1-9)
    Number(u8),
    /// Ctrl + character (e.g., Ctrl+period for punctuation toggle)
    Ctrl(char),
    /// Shift lock toggle (for passthrough mode)
    ShiftLock,
}

/// Result of processing a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyResult {
    /// Key was handled by the IME
    Handled,
    /// Key was not handled (pass through to application)
    NotHandled,
}

/// Which editor currently owns the in-progress composition. Orthogonal to
/// [`SessionState`]: the state tracks *phase* (entering vs. selecting),
/// this tracks *which* editor that phase belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Active {
    None,
    Phonetic,
    Punctuation,
}

/// IME engine with session management.
pub struct ImeEngine<L: PhoneticLayout> {
    phonetic_editor: PhoneticEditor<L>,
    punct_editor: PunctuationEditor,
    session: ImeSession,
    context: ImeContext,
    config: Config,
    active: Active,
}

impl<L: PhoneticLayout> ImeEngine<L> {
    pub fn new(layout: L, tree: Arc<PhraseTree>, user: UserDict) -> Self {
        Self::with_config(layout, tree, user, Config::default())
    }

    pub fn with_config(layout: L, tree: Arc<PhraseTree>, user: UserDict, config: Config) -> Self {
        let session = ImeSession::with_capacity_and_page_size(
            config.max_chi_symbol_len,
            config.candidates_per_page,
        );
        let mut phonetic_editor = PhoneticEditor::new(layout, tree, user);
        phonetic_editor.set_masked_phrases(config.masked_phrases.clone());
        phonetic_editor.set_options(&config);
        Self {
            phonetic_editor,
            punct_editor: PunctuationEditor::new(),
            session,
            context: ImeContext::new(),
            config,
            active: Active::None,
        }
    }

    pub fn context(&self) -> &ImeContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ImeContext {
        &mut self.context
    }

    pub fn session(&self) -> &ImeSession {
        &self.session
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Reset the IME to initial state.
    pub fn reset(&mut self) {
        self.session.clear();
        self.context.clear();
        self.phonetic_editor.reset();
        self.punct_editor.reset();
        self.active = Active::None;
    }

    fn maybe_fullwidth(&self, text: String) -> String {
        if self.config.fullshape_mode {
            crate::utils::to_fullwidth(&text)
        } else {
            text
        }
    }

    /// Process a key event and update IME state.
    ///
    /// After calling this, the platform should read `context()` to update
    /// the UI. Returns `KeyResult::Handled` if the IME consumed the key, or
    /// `KeyResult::NotHandled` if it should pass through to the
    /// application.
    pub fn process_key(&mut self, key: KeyEvent) -> KeyResult {
        self.context.commit_text.clear();

        match key {
            KeyEvent::ShiftLock => {
                if self.session.state() == SessionState::Bypass {
                    self.session.set_state(SessionState::Init);
                    self.context.clear();
                    self.context.auxiliary_text.clear();
                } else {
                    self.reset();
                    self.session.activate();
                    self.session.set_state(SessionState::Bypass);
                    self.context.auxiliary_text = "直通模式 | Shift_lock切换".to_string();
                }
                return KeyResult::Handled;
            }
            KeyEvent::Ctrl('.') => {
                if self.session.state() == SessionState::Bypass {
                    return KeyResult::NotHandled;
                }
                if self.active == Active::Phonetic && !self.session.preedit().is_empty() {
                    let text = self.session.preedit().render_committed();
                    self.reset();
                    self.context.commit_text = self.maybe_fullwidth(text);
                    return KeyResult::Handled;
                }
                if self.active == Active::Punctuation {
                    self.reset();
                } else {
                    self.reset();
                    self.active = Active::Punctuation;
                    self.session.activate();
                    self.session.set_state(SessionState::Selecting);
                }
                self.session.sync_to_context(&mut self.context);
                self.update_auxiliary_text();
                return KeyResult::Handled;
            }
            _ => {}
        }

        if self.session.state() == SessionState::Bypass {
            return KeyResult::NotHandled;
        }

        let result = match self.active {
            Active::None => {
                if matches!(key, KeyEvent::Char(ch) if ch.is_ascii_lowercase()) {
                    self.active = Active::Phonetic;
                    self.session.activate();
                    self.session.set_state(SessionState::Entering);
                    self.phonetic_editor.process_key(key, &mut self.session)
                } else if self.config.easy_symbol_mode
                    && matches!(key, KeyEvent::Char(ch) if self.punct_editor.has_alternatives(ch))
                {
                    match key {
                        KeyEvent::Char(ch) => match self.punct_editor.easy_symbol(ch) {
                            Some(remap) => EditorResult::CommitAndReset(remap.to_string()),
                            None => EditorResult::PassThrough,
                        },
                        _ => EditorResult::PassThrough,
                    }
                } else if self.config.fullshape_mode
                    && matches!(key, KeyEvent::Char(ch) if ch.is_ascii_graphic())
                {
                    match key {
                        KeyEvent::Char(ch) => EditorResult::CommitAndReset(ch.to_string()),
                        _ => EditorResult::PassThrough,
                    }
                } else {
                    EditorResult::PassThrough
                }
            }
            Active::Phonetic => {
                if self.config.easy_symbol_mode
                    && matches!(key, KeyEvent::Char(ch) if self.punct_editor.has_alternatives(ch))
                    && self.session.preedit().is_empty()
                {
                    match key {
                        KeyEvent::Char(ch) => match self.punct_editor.easy_symbol(ch) {
                            Some(remap) => EditorResult::CommitAndReset(remap.to_string()),
                            None => EditorResult::PassThrough,
                        },
                        _ => EditorResult::PassThrough,
                    }
                } else {
                    self.phonetic_editor.process_key(key, &mut self.session)
                }
            }
            Active::Punctuation => self.punct_editor.process_key(key, &mut self.session),
        };

        match result {
            EditorResult::Handled => {
                self.session.sync_to_context(&mut self.context);
                self.update_auxiliary_text();
                KeyResult::Handled
            }
            EditorResult::Commit(text) => {
                self.context.commit_text = self.maybe_fullwidth(text);
                self.session.sync_to_context(&mut self.context);
                self.update_auxiliary_text();
                KeyResult::Handled
            }
            EditorResult::CommitAndReset(text) => {
                let text = self.maybe_fullwidth(text);
                if !text.is_empty() {
                    self.context.commit_text = text;
                }
                self.reset();
                KeyResult::Handled
            }
            EditorResult::ModeSwitch(state) => {
                self.session.set_state(state);
                self.session.sync_to_context(&mut self.context);
                self.update_auxiliary_text();
                KeyResult::Handled
            }
            EditorResult::PassThrough => KeyResult::NotHandled,
        }
    }

    fn update_auxiliary_text(&mut self) {
        if !self.session.is_active() {
            self.context.auxiliary_text.clear();
            return;
        }

        let aux_text = match (self.active, self.session.state()) {
            (Active::None, _) => String::new(),
            (Active::Phonetic, SessionState::Selecting) => {
                format!("注音 | {} 个候选 | Space/数字选择", self.session.candidates().len())
            }
            (Active::Phonetic, _) => "注音 | 輸入中...".to_string(),
            (Active::Punctuation, _) => "標點 | 數字/Space選擇 | Esc取消".to_string(),
        };

        self.context.auxiliary_text = aux_text;
    }

    // ========== Configuration Management API ==========

    pub fn toggle_fullshape(&mut self) {
        self.config.fullshape_mode = !self.config.fullshape_mode;
    }

    pub fn set_fullshape(&mut self, enabled: bool) {
        self.config.fullshape_mode = enabled;
    }

    pub fn is_fullshape(&self) -> bool {
        self.config.fullshape_mode
    }

    pub fn mask_phrase(&mut self, phrase: &str) {
        self.config.mask_phrase(phrase);
        self.phonetic_editor.set_masked_phrases(self.config.masked_phrases.clone());
    }

    pub fn unmask_phrase(&mut self, phrase: &str) -> bool {
        let removed = self.config.unmask_phrase(phrase);
        self.phonetic_editor.set_masked_phrases(self.config.masked_phrases.clone());
        removed
    }

    pub fn is_masked(&self, phrase: &str) -> bool {
        self.config.is_masked(phrase)
    }

    pub fn get_masked_phrases(&self) -> Vec<String> {
        self.config.get_masked_phrases()
    }

    pub fn clear_masked_phrases(&mut self) {
        self.config.clear_masked_phrases();
        self.phonetic_editor.set_masked_phrases(self.config.masked_phrases.clone());
    }

    /// Current page of visible candidates, for platforms that want to
    /// render their own candidate widget instead of reading raw context.
    pub fn current_candidates(&self) -> &[Candidate] {
        self.session.candidates().current_page_candidates()
    }
}
