//! IME session state (spec §4.7).
//!
//! The `ImeSession` struct combines the preedit buffer and candidate window
//! into a cohesive session that tracks state across multiple key events,
//! following the three top-level states spec §4.7 names: entering a
//! syllable sequence, selecting among candidates for one span of it, or
//! bypassing the IME entirely (direct passthrough, e.g. while shift-locked).

use crate::candidate::CandidateList;
use crate::context::ImeContext;
use crate::preedit::PreeditBuffer;

/// Top-level session state (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No composition in progress; keys are inert until phonetic input
    /// starts a new one.
    Init,
    /// A syllable sequence is being composed in the preedit buffer.
    Entering,
    /// The candidate window is open for one span of the preedit buffer.
    Selecting,
    /// The IME is stepping aside; keys pass straight to the application.
    Bypass,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Init
    }
}

/// IME session state combining the preedit buffer and candidate window.
///
/// The session is separate from the backend dictionary/chooser — those
/// provide the linguistic intelligence, while the session manages UI state.
#[derive(Debug, Clone)]
pub struct ImeSession {
    preedit: PreeditBuffer,
    candidates: CandidateList,
    state: SessionState,
    active: bool,
}

impl ImeSession {
    pub fn new() -> Self {
        Self::with_capacity_and_page_size(crate::preedit::DEFAULT_CAPACITY, 5)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self::with_capacity_and_page_size(crate::preedit::DEFAULT_CAPACITY, page_size)
    }

    pub fn with_capacity_and_page_size(capacity: usize, page_size: usize) -> Self {
        Self {
            preedit: PreeditBuffer::new(capacity),
            candidates: CandidateList::with_page_size(page_size),
            state: SessionState::Init,
            active: false,
        }
    }

    pub fn preedit(&self) -> &PreeditBuffer {
        &self.preedit
    }

    pub fn preedit_mut(&mut self) -> &mut PreeditBuffer {
        &mut self.preedit
    }

    pub fn candidates(&self) -> &CandidateList {
        &self.candidates
    }

    pub fn candidates_mut(&mut self) -> &mut CandidateList {
        &mut self.candidates
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Clear all session state and return to `Init`.
    pub fn clear(&mut self) {
        self.preedit.clear();
        self.candidates.clear();
        self.state = SessionState::Init;
        self.active = false;
    }

    /// Sync session state to an `ImeContext` for platform communication.
    pub fn sync_to_context(&self, context: &mut ImeContext) {
        context.preedit_text.clear();
        context.candidates.clear();
        context.auxiliary_text.clear();

        if !self.preedit.is_empty() {
            context.preedit_text = self.preedit.render_preview();
            context.preedit_cursor = self.preedit.cursor();
        }

        let page_candidates = self.candidates.current_page_candidates();
        context.candidates = page_candidates.iter().map(|c| c.text.clone()).collect();
        context.candidate_cursor = self.candidates.cursor();

        if self.candidates.num_pages() > 1 {
            let current_page = self.candidates.current_page() + 1;
            let total_pages = self.candidates.num_pages();
            context.auxiliary_text = format!("第{}页/{}", current_page, total_pages);
        }
    }
}

impl Default for ImeSession {
    fn default() -> Self {
        Self::new()
    }
}
