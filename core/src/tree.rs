//! Memory-mapped phrase tree and phrase arena (C3, spec §3 and §4.3).
//!
//! `fonetree.dat` is an array of fixed-width 12-byte node records:
//!
//! ```text
//! offset 0: key      u16 LE   (phoneme for internal nodes, 0 for leaves)
//! offset 2: reserved u16      (unused, zero)
//! offset 4: a        u32 LE   (child.begin for internal, phrase.pos for leaf)
//! offset 8: b        u32 LE   (child.end   for internal, phrase.freq for leaf)
//! ```
//!
//! Node 0 is the sentinel root: its `key` field holds the total phrase count
//! (spec §9 open question — the DP chooser and arena readers must treat this
//! as data read at load time, never as a compile-time constant), and its
//! `a`/`b` fields are the begin/end range of its top-level children, exactly
//! like any other internal node.
//!
//! `dict.dat` is the companion phrase arena: concatenated NUL-terminated
//! UTF-8 phrases. A leaf's `pos` is a byte offset into this arena.
//!
//! Both files are mapped read-only via `memmap2`, following the same
//! precedent as `fontique`'s read-only font-byte mapping elsewhere in this
//! codebase's lineage.

use std::ops::Range;
use std::path::Path;

use anyhow::{bail, Context, Result};
use memmap2::Mmap;

use crate::phoneme::{Phoneme, Syllable};

const NODE_SIZE: usize = 12;

/// A phrase borrowed directly out of the mmap'd arena. Must not outlive the
/// [`PhraseTree`] it came from (spec §4.3: "callers must not retain views
/// across a session teardown").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhraseRef<'a> {
    pub text: &'a str,
    pub freq: u32,
}

#[derive(Debug, Clone, Copy)]
struct RawNode {
    key: u16,
    a: u32,
    b: u32,
}

/// Read-only, memory-mapped phrase dictionary: tree + arena.
pub struct PhraseTree {
    nodes: Mmap,
    arena: Mmap,
}

impl PhraseTree {
    /// Open `fonetree.dat` and `dict.dat` from disk and map both read-only.
    pub fn open<P: AsRef<Path>>(tree_path: P, arena_path: P) -> Result<Self> {
        let tree_file = std::fs::File::open(tree_path.as_ref())
            .with_context(|| format!("opening {}", tree_path.as_ref().display()))?;
        let arena_file = std::fs::File::open(arena_path.as_ref())
            .with_context(|| format!("opening {}", arena_path.as_ref().display()))?;

        // SAFETY: both files are treated as immutable for the session's
        // lifetime; the host guarantees they are not concurrently truncated
        // or rewritten out from under the mapping (spec §5).
        let nodes = unsafe { Mmap::map(&tree_file) }.context("mapping fonetree.dat")?;
        let arena = unsafe { Mmap::map(&arena_file) }.context("mapping dict.dat")?;

        Self::from_mmaps(nodes, arena)
    }

    fn from_mmaps(nodes: Mmap, arena: Mmap) -> Result<Self> {
        if nodes.len() % NODE_SIZE != 0 || nodes.is_empty() {
            bail!(
                "fonetree.dat size {} is not a positive multiple of the {}-byte node record",
                nodes.len(),
                NODE_SIZE
            );
        }
        Ok(Self { nodes, arena })
    }

    fn node_count(&self) -> u32 {
        (self.nodes.len() / NODE_SIZE) as u32
    }

    fn read_node(&self, idx: u32) -> RawNode {
        let off = idx as usize * NODE_SIZE;
        let bytes = &self.nodes[off..off + NODE_SIZE];
        RawNode {
            key: u16::from_le_bytes([bytes[0], bytes[1]]),
            a: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            b: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        }
    }

    /// Total phrase count, read from the root sentinel at load time. Never a
    /// compile-time constant (spec §9 open question).
    pub fn phrase_count(&self) -> u32 {
        self.read_node(0).key as u32
    }

    /// Node 0 is always internal by convention, even though its `key` field
    /// (the phrase count) would otherwise read as the leaf discriminant.
    fn is_leaf(&self, idx: u32) -> bool {
        idx != 0 && self.read_node(idx).key == 0
    }

    /// The half-open index range of `idx`'s children, or `None` if `idx` is
    /// a leaf (no children).
    fn children_range(&self, idx: u32) -> Option<Range<u32>> {
        if self.is_leaf(idx) {
            return None;
        }
        let n = self.read_node(idx);
        Some(n.a..n.b)
    }

    fn leaf_pos_freq(&self, idx: u32) -> Option<(u32, u32)> {
        if self.is_leaf(idx) {
            let n = self.read_node(idx);
            Some((n.a, n.b))
        } else {
            None
        }
    }

    fn child_phoneme(&self, idx: u32) -> Phoneme {
        Phoneme::from_raw(self.read_node(idx).key)
    }

    /// Binary search `range` (sorted ascending by `key`, invariant (i)) for
    /// the child whose key equals `phoneme`.
    fn binary_search_child(&self, range: Range<u32>, phoneme: Phoneme) -> Option<u32> {
        let mut lo = range.start;
        let mut hi = range.end;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let key = self.child_phoneme(mid);
            match key.cmp(&phoneme) {
                std::cmp::Ordering::Equal => return Some(mid),
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
            }
        }
        None
    }

    /// Walk the tree along `query`, returning the node index reached, or
    /// `None` if the prefix does not exist.
    fn descend(&self, query: &[Phoneme]) -> Option<u32> {
        let mut cur = 0u32;
        for phoneme in query {
            let children = self.children_range(cur)?;
            cur = self.binary_search_child(children, *phoneme)?;
        }
        Some(cur)
    }

    fn phrase_text(&self, pos: u32) -> Result<&str> {
        let bytes = &self.arena[pos as usize..];
        let end = bytes
            .iter()
            .position(|&b| b == 0)
            .context("phrase arena entry is not NUL-terminated")?;
        std::str::from_utf8(&bytes[..end]).context("phrase arena entry is not valid UTF-8")
    }

    fn leaves_at(&self, node: u32) -> Result<Vec<PhraseRef<'_>>> {
        let Some(range) = self.children_range(node) else {
            return Ok(Vec::new());
        };
        // Invariant (i): children sorted ascending by key, and key == 0
        // (leaves) sorts first, so leaves form a contiguous prefix.
        let mut out = Vec::new();
        for idx in range {
            let Some((pos, freq)) = self.leaf_pos_freq(idx) else {
                break;
            };
            out.push(PhraseRef {
                text: self.phrase_text(pos)?,
                freq,
            });
        }
        Ok(out)
    }

    /// Order results by descending frequency, then ascending arena offset
    /// (spec §4.3, §8 "Phrase lookup monotonicity").
    fn sort_for_determinism(entries: &mut [PhraseRef<'_>], positions: &[u32]) {
        let mut idx: Vec<usize> = (0..entries.len()).collect();
        idx.sort_by(|&a, &b| {
            entries[b]
                .freq
                .cmp(&entries[a].freq)
                .then(positions[a].cmp(&positions[b]))
        });
        let sorted: Vec<PhraseRef<'_>> = idx.iter().map(|&i| entries[i]).collect();
        entries.copy_from_slice(&sorted);
    }

    /// All phrases whose syllable sequence is exactly `syllables`, ordered by
    /// descending frequency then ascending arena order.
    pub fn phrase_first(&self, syllables: &[Syllable]) -> Result<Vec<PhraseRef<'_>>> {
        let query: Vec<Phoneme> = syllables.iter().map(|s| s.phoneme()).collect();
        let Some(node) = self.descend(&query) else {
            return Ok(Vec::new());
        };
        let mut entries = self.leaves_at(node)?;
        let positions: Vec<u32> = {
            let Some(range) = self.children_range(node) else {
                return Ok(entries);
            };
            range
                .filter_map(|idx| self.leaf_pos_freq(idx).map(|(pos, _)| pos))
                .collect()
        };
        Self::sort_for_determinism(&mut entries, &positions);
        Ok(entries)
    }

    /// All single-character phrases matching exactly `phone`, ordered by
    /// descending frequency then ascending arena order (spec §4.3).
    pub fn char_first(&self, phone: Syllable) -> Result<Vec<(char, u32)>> {
        let entries = self.phrase_first(&[phone])?;
        Ok(entries
            .into_iter()
            .filter_map(|p| {
                let mut chars = p.text.chars();
                let c = chars.next()?;
                if chars.next().is_none() {
                    Some((c, p.freq))
                } else {
                    None
                }
            })
            .collect())
    }

    /// Whether any phrase matches `syllables` as an exact or longer prefix
    /// (used by the chooser to probe before doing the full lookup).
    pub fn has_prefix(&self, syllables: &[Syllable]) -> bool {
        let query: Vec<Phoneme> = syllables.iter().map(|s| s.phoneme()).collect();
        self.descend(&query).is_some()
    }

    /// Direct (non-leaf) children of `node`, used by the chooser to extend a
    /// matched prefix by one more syllable. Returns `(node_index, phoneme)`
    /// pairs rather than borrowed pointers, so callers never couple a
    /// lifetime to the mmap (spec §9 REDESIGN FLAGS).
    pub fn phrase_tree_children(&self, node: u32) -> Vec<(u32, Phoneme)> {
        let Some(range) = self.children_range(node) else {
            return Vec::new();
        };
        range
            .filter(|&idx| !self.is_leaf(idx))
            .map(|idx| (idx, self.child_phoneme(idx)))
            .collect()
    }

    /// Root node index, the starting point for any prefix walk.
    pub const fn root() -> u32 {
        0
    }

    /// Descend one more phoneme from `node`; `None` if no such child exists.
    pub fn step(&self, node: u32, phoneme: Phoneme) -> Option<u32> {
        let children = self.children_range(node)?;
        self.binary_search_child(children, phoneme)
    }

    /// Node count, mostly useful for diagnostics/tests.
    pub fn len(&self) -> u32 {
        self.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.node_count() == 0
    }
}
