//! Minimal library-usage example: build a tiny phrase dictionary in a temp
//! directory, open a session over it, and type a syllable key by key.
//!
//! Run with `cargo run --example interactive` (no `data/zhuyin/` required —
//! unlike the `libzhuyin` binary, this walks through dictionary
//! construction itself so it runs standalone).

use libchinese_core::{KeyEvent, KeyResult, Phoneme, Syllable};
use libzhuyin::ZhuyinConfig;

fn write_node(buf: &mut Vec<u8>, key: u16, a: u32, b: u32) {
    buf.extend_from_slice(&key.to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(&a.to_le_bytes());
    buf.extend_from_slice(&b.to_le_bytes());
}

fn main() -> anyhow::Result<()> {
    let dict_dir = tempfile::tempdir()?;

    // One entry: ㄋㄧˇㄏㄠˇ ("ni3 hao3") -> "你好".
    let ni = Syllable::from_phoneme(Phoneme::new(7, 1, 0, 3)).unwrap();
    let hao = Syllable::from_phoneme(Phoneme::new(11, 0, 7, 3)).unwrap();

    let mut arena = Vec::new();
    let pos = arena.len() as u32;
    arena.extend_from_slice("你好".as_bytes());
    arena.push(0);

    let mut nodes = Vec::new();
    write_node(&mut nodes, 1, 1, 2); // root -> single top-level child
    write_node(&mut nodes, ni.raw(), 2, 3); // ㄋㄧˇ -> single child
    write_node(&mut nodes, hao.raw(), 3, 4); // ㄏㄠˇ -> single child
    write_node(&mut nodes, 0, pos, 90); // leaf: "你好", freq 90

    std::fs::write(dict_dir.path().join("fonetree.dat"), &nodes)?;
    std::fs::write(dict_dir.path().join("dict.dat"), &arena)?;

    let userdict_path = dict_dir.path().join("userdict.redb");
    let mut session = libzhuyin::open_session(dict_dir.path(), &userdict_path, ZhuyinConfig::default())?;

    // Default (Dachen) layout: 's' is the dual initial/final key for ㄋ(7),
    // 'i' the medial key for ㄧ(1), 'x' (once the syllable has a body) the
    // tone-3 key. ㄏㄠˇ: 'c' = initial ㄏ(11), 'l' = final ㄠ(7), 'x' = tone 3.
    for key in ['s', 'i', 'x', 'c', 'l', 'x'] {
        session.process_key(KeyEvent::Char(key));
    }
    let result = session.process_key(KeyEvent::Enter);
    assert_eq!(result, KeyResult::Handled);

    println!("committed: {}", session.context().commit_text);
    Ok(())
}
