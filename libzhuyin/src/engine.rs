//! Constructors that open a phrase dictionary and user database and hand
//! back a ready-to-drive [`ImeEngine`] over the configured keyboard layout.
//!
//! Kept from the teacher: the `PhraseTree::open` + `UserDict::new` pairing
//! and `anyhow::Context`-annotated error reporting. Rewritten: there is one
//! layout type now (`KeyboardLayout`, picking its table at runtime from
//! `ZhuyinConfig`) instead of a family of generic type parameters, so
//! callers never need to name `ImeEngine<L>` themselves.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use libchinese_core::{ImeEngine, PhraseTree, UserDict};
use tracing::info;

use crate::config::ZhuyinConfig;
use crate::layout::KeyboardLayout;

/// A running Zhuyin session: `libchinese_core`'s key-event engine, generic
/// over this crate's keyboard layout.
pub type ZhuyinSession = ImeEngine<KeyboardLayout>;

/// Open the mmap'd phrase tree at `dict_dir`/`fonetree.dat` +
/// `dict_dir`/`dict.dat`, the redb user dictionary at `userdict_path`, and
/// assemble a session using the layout `config` selects.
///
/// `userdict_path`'s parent directory is created if missing, since redb
/// will not create it for us.
pub fn open_session<P: AsRef<Path>, Q: AsRef<Path>>(
    dict_dir: P,
    userdict_path: Q,
    config: ZhuyinConfig,
) -> Result<ZhuyinSession> {
    let dict_dir = dict_dir.as_ref();
    let userdict_path = userdict_path.as_ref();

    if let Some(parent) = userdict_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating user dictionary directory {}", parent.display()))?;
    }

    let tree_path = dict_dir.join("fonetree.dat");
    let arena_path = dict_dir.join("dict.dat");
    info!(tree = %tree_path.display(), arena = %arena_path.display(), "opening phrase tree");
    let tree = Arc::new(
        PhraseTree::open(&tree_path, &arena_path)
            .with_context(|| format!("opening phrase tree in {}", dict_dir.display()))?,
    );

    info!(path = %userdict_path.display(), "opening user dictionary");
    let user = UserDict::new(userdict_path)
        .with_context(|| format!("opening user dictionary at {}", userdict_path.display()))?;

    let layout = config.build_layout();
    info!(layout = ?layout.kind(), "assembling zhuyin session");
    let base_config = config.into_base();
    Ok(ImeEngine::with_config(layout, tree, user, base_config))
}
