//! # libzhuyin
//!
//! Zhuyin/Bopomofo input method engine built on `libchinese-core`: this
//! crate supplies the phonetic layer core's `ImeEngine` is generic over —
//! the Zhuyin symbol tables and thirteen keyboard layouts in [`phonetics`]
//! and [`layout`], the layout-aware configuration in [`config`], and the
//! [`engine`] constructors that open a dictionary + user database and wire
//! them to a chosen layout.

pub mod config;
pub mod engine;
pub mod layout;
pub mod phonetics;

pub use libchinese_core::{
    Candidate, CandidateList, Config as CoreConfig, Editor, EditorResult, ImeContext, ImeEngine,
    ImeSession, KeyEvent, KeyResult, PhoneticEditor, PhoneticLayout, PunctuationEditor,
    SessionState,
};

pub use config::ZhuyinConfig;
pub use engine::{open_session, ZhuyinSession};
pub use layout::{KeyboardLayout, KeyboardLayoutKind};
