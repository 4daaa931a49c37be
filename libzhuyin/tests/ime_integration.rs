//! End-to-end tests driving a [`libzhuyin::ZhuyinSession`] through
//! `open_session` over a small synthetic dictionary, exercising the full
//! key-event pipeline (typing, backspace, escape, candidate selection,
//! cursor navigation) rather than any one module in isolation.

use libchinese_core::{KeyEvent, KeyResult, Phoneme, Syllable};
use libzhuyin::{KeyboardLayoutKind, ZhuyinConfig};

fn write_node(buf: &mut Vec<u8>, key: u16, a: u32, b: u32) {
    buf.extend_from_slice(&key.to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(&a.to_le_bytes());
    buf.extend_from_slice(&b.to_le_bytes());
}

/// A dictionary with one syllable (ㄋㄧˇ) offering two competing phrases, so
/// tests can open the candidate window and select between them.
fn two_candidate_dict() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let ni = Syllable::from_phoneme(Phoneme::new(7, 1, 0, 3)).unwrap();

    let mut arena = Vec::new();
    let pos_a = arena.len() as u32;
    arena.extend_from_slice("你".as_bytes());
    arena.push(0);
    let pos_b = arena.len() as u32;
    arena.extend_from_slice("妮".as_bytes());
    arena.push(0);

    let mut nodes = Vec::new();
    write_node(&mut nodes, 2, 1, 2); // root: phrase_count=2, children [1,2)
    write_node(&mut nodes, ni.raw(), 2, 4); // ㄋㄧˇ -> children [2,4), two leaves
    write_node(&mut nodes, 0, pos_a, 80); // "你", higher freq
    write_node(&mut nodes, 0, pos_b, 40); // "妮", lower freq

    std::fs::write(dir.path().join("fonetree.dat"), &nodes).unwrap();
    std::fs::write(dir.path().join("dict.dat"), &arena).unwrap();
    dir
}

fn open(dir: &tempfile::TempDir) -> libzhuyin::ZhuyinSession {
    let userdict = dir.path().join("userdict.redb");
    libzhuyin::open_session(dir.path(), userdict, ZhuyinConfig::default()).unwrap()
}

/// Default (Dachen) layout keys for ㄋㄧˇ: 's' initial ㄋ(7), 'i' medial
/// ㄧ(1), 'x' (body present) tone 3.
const NI3: [char; 3] = ['s', 'i', 'x'];

#[test]
fn typing_a_syllable_auto_commits_the_best_candidate_on_enter() {
    let dir = two_candidate_dict();
    let mut session = open(&dir);

    for key in NI3 {
        assert_eq!(session.process_key(KeyEvent::Char(key)), KeyResult::Handled);
    }
    assert_eq!(session.process_key(KeyEvent::Enter), KeyResult::Handled);
    assert_eq!(session.context().commit_text, "你");
}

#[test]
fn down_opens_the_candidate_window_and_number_selects() {
    let dir = two_candidate_dict();
    let mut session = open(&dir);

    for key in NI3 {
        session.process_key(KeyEvent::Char(key));
    }
    assert_eq!(session.process_key(KeyEvent::Down), KeyResult::Handled);
    assert_eq!(session.context().candidates.len(), 2);
    assert_eq!(session.context().candidates[0], "你");
    assert_eq!(session.context().candidates[1], "妮");

    assert_eq!(session.process_key(KeyEvent::Number(2)), KeyResult::Handled);
    assert_eq!(session.process_key(KeyEvent::Enter), KeyResult::Handled);
    assert_eq!(session.context().commit_text, "妮");
}

#[test]
fn backspace_removes_one_syllable_component_at_a_time() {
    let dir = two_candidate_dict();
    let mut session = open(&dir);

    session.process_key(KeyEvent::Char('s'));
    session.process_key(KeyEvent::Char('i'));
    session.process_key(KeyEvent::Char('x'));
    assert!(!session.session().preedit().is_empty());

    session.process_key(KeyEvent::Backspace);
    // Tone peeled off; syllable no longer complete, nothing committed yet.
    assert!(session.context().commit_text.is_empty());
    assert!(!session.session().preedit().is_empty());
}

#[test]
fn escape_clears_everything_without_committing() {
    let dir = two_candidate_dict();
    let mut session = open(&dir);

    session.process_key(KeyEvent::Char('s'));
    session.process_key(KeyEvent::Char('i'));
    let result = session.process_key(KeyEvent::Escape);
    assert_eq!(result, KeyResult::Handled);
    assert!(session.session().preedit().is_empty());
    assert!(session.context().commit_text.is_empty());
}

#[test]
fn multiple_commits_in_a_row_each_reset_the_session() {
    let dir = two_candidate_dict();
    let mut session = open(&dir);

    for key in NI3 {
        session.process_key(KeyEvent::Char(key));
    }
    session.process_key(KeyEvent::Enter);
    assert_eq!(session.context().commit_text, "你");

    for key in NI3 {
        session.process_key(KeyEvent::Char(key));
    }
    session.process_key(KeyEvent::Enter);
    assert_eq!(session.context().commit_text, "你");
}

#[test]
fn unhandled_keys_pass_through_when_nothing_is_active() {
    let dir = two_candidate_dict();
    let mut session = open(&dir);
    // 'Q' (uppercase) never reaches the phonetic editor (see
    // `PhoneticEditor::can_handle`), and nothing else is active yet.
    assert_eq!(session.process_key(KeyEvent::Char('Q')), KeyResult::NotHandled);
}

#[test]
fn each_layout_kind_builds_a_working_session() {
    let kinds = [
        KeyboardLayoutKind::Default,
        KeyboardLayoutKind::Hsu,
        KeyboardLayoutKind::Et,
        KeyboardLayoutKind::Et26,
        KeyboardLayoutKind::DachenCp26,
        KeyboardLayoutKind::HanyuPinyin,
        KeyboardLayoutKind::ThlPinyin,
        KeyboardLayoutKind::Mps2Pinyin,
        KeyboardLayoutKind::Dvorak,
        KeyboardLayoutKind::DvorakHsu,
        KeyboardLayoutKind::Ibm,
        KeyboardLayoutKind::GinYieh,
        KeyboardLayoutKind::Carpalx,
    ];
    for kind in kinds {
        let dir = two_candidate_dict();
        let mut config = ZhuyinConfig::default();
        config.keyboard_layout = kind;
        let mut session = libzhuyin::open_session(dir.path(), dir.path().join("u.redb"), config)
            .unwrap_or_else(|e| panic!("{kind:?} failed to open a session: {e}"));
        // Every layout should at least accept a lowercase letter without
        // panicking, whether or not it resolves to anything for this key.
        session.process_key(KeyEvent::Char('a'));
    }
}
