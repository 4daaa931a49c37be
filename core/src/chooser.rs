//! Phrase chooser: dynamic-programming segmenter over a syllable span
//! (C6, spec §4.6).
//!
//! `best[i]` is the optimal segmentation of `syllables[i..]`, computed
//! backward from the end of the span. The objective, evaluated lexically at
//! each position, is (fewest intervals, highest total log-frequency, then
//! longest first phrase as a tie-break — libchewing's "long word wins"
//! policy). The backward `best[i]` suffix array is grounded in the
//! teacher's deleted `core/src/engine.rs`
//! (`generate_candidates_from_segmentation`'s `best_path: Vec<Option<...>>`
//! shape), simplified here to a frequency-only objective since this spec
//! carries no bigram interpolation.

use std::collections::{HashMap, HashSet};

use crate::config::AddPhraseDirection;
use crate::phoneme::Syllable;
use crate::tree::PhraseTree;
use crate::userdict::UserDict;

/// One phrase chosen for a contiguous run of syllables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceSpan {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub freq: u32,
}

/// A user-forced span (spec §4.6: selecting a candidate pins that phrase
/// for its syllables; the DP re-optimizes everything else around it).
#[derive(Debug, Clone)]
pub struct PinnedSpan {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

#[derive(Clone)]
struct BestEntry {
    intervals: usize,
    log_freq: f64,
    next: usize,
    text: String,
    freq: u32,
}

/// Compares two objective tuples; `true` if `new` is strictly better than
/// `incumbent`. `new_len`/`incumbent_len` are each entry's own first-phrase
/// length, used only for the tie-break.
fn better(new: &BestEntry, new_len: usize, incumbent: &BestEntry, incumbent_len: usize) -> bool {
    if new.intervals != incumbent.intervals {
        return new.intervals < incumbent.intervals;
    }
    if (new.log_freq - incumbent.log_freq).abs() > 1e-9 {
        return new.log_freq > incumbent.log_freq;
    }
    // tie-break: prefer the option whose first phrase is longer.
    new_len > incumbent_len
}

/// Segments syllable runs against the phrase tree and user dictionary.
pub struct Chooser<'a> {
    tree: &'a PhraseTree,
    user: &'a UserDict,
    /// Phrases hidden from suggestion (spec §10 masking), excluded from
    /// every merged candidate list before the DP ever sees them.
    masked: &'a HashSet<String>,
    /// Where a brand-new user phrase lands relative to its dictionary
    /// siblings the first time it's committed (spec §6
    /// `add_phrase_direction`).
    direction: AddPhraseDirection,
}

impl<'a> Chooser<'a> {
    pub fn new(tree: &'a PhraseTree, user: &'a UserDict, masked: &'a HashSet<String>) -> Self {
        Chooser {
            tree,
            user,
            masked,
            direction: AddPhraseDirection::Forward,
        }
    }

    pub fn with_direction(mut self, direction: AddPhraseDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Merge tree and user-dictionary results for `syllables[start..end]`,
    /// ordered by descending frequency (user entries win ties since they
    /// reflect the live user, per spec §4.4 "merge-at-lookup"), with any
    /// masked phrase text dropped. Public so the editor can populate the
    /// candidate window for one span without re-running the whole
    /// segmentation.
    pub fn candidates_for_span(&self, syllables: &[Syllable]) -> Vec<(String, u32)> {
        let mut merged: HashMap<String, u32> = HashMap::new();
        if let Ok(tree_hits) = self.tree.phrase_first(syllables) {
            for p in tree_hits {
                merged.insert(p.text.to_string(), p.freq);
            }
        }
        if let Ok(user_hits) = self.user.lookup(syllables) {
            for entry in user_hits {
                merged
                    .entry(entry.text)
                    .and_modify(|f| *f = (*f).max(entry.freq))
                    .or_insert(entry.freq);
            }
        }
        let mut out: Vec<(String, u32)> = merged
            .into_iter()
            .filter(|(text, _)| !self.masked.contains(text))
            .collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        out
    }

    /// Segment the full `syllables` span, honoring any `pinned` choices
    /// (from explicit candidate-window selections). Returns a gap-free
    /// cover of `[0, syllables.len())`.
    pub fn segment(&self, syllables: &[Syllable], pinned: &[PinnedSpan]) -> Vec<ChoiceSpan> {
        let n = syllables.len();
        if n == 0 {
            return Vec::new();
        }
        let pinned_by_start: HashMap<usize, &PinnedSpan> =
            pinned.iter().map(|p| (p.start, p)).collect();

        let mut best: Vec<Option<BestEntry>> = vec![None; n + 1];
        best[n] = Some(BestEntry {
            intervals: 0,
            log_freq: 0.0,
            next: n,
            text: String::new(),
            freq: 0,
        });

        for i in (0..n).rev() {
            if let Some(pin) = pinned_by_start.get(&i) {
                let end = pin.end.min(n);
                if end > i {
                    if let Some(tail) = best[end].clone() {
                        let freq = self
                            .candidates_for_span(&syllables[i..end])
                            .into_iter()
                            .find(|(t, _)| t == &pin.text)
                            .map(|(_, f)| f)
                            .unwrap_or(1);
                        best[i] = Some(BestEntry {
                            intervals: tail.intervals + 1,
                            log_freq: tail.log_freq + (freq.max(1) as f64).ln(),
                            next: end,
                            text: pin.text.clone(),
                            freq,
                        });
                        continue;
                    }
                }
            }

            let mut candidate_best: Option<(BestEntry, usize)> = None;
            for len in 1..=(n - i) {
                let span = &syllables[i..i + len];
                let options = self.candidates_for_span(span);
                let (text, freq) = if !options.is_empty() {
                    options[0].clone()
                } else if len == 1 {
                    // No dictionary entry at all: keep the syllable visible
                    // as its own placeholder text rather than stall the DP.
                    // libzhuyin's editor substitutes the real Bopomofo
                    // rendering before this ever reaches a user.
                    (syllables[i].to_string(), 1)
                } else {
                    continue;
                };
                let Some(tail) = best[i + len].clone() else {
                    continue;
                };
                let entry = BestEntry {
                    intervals: tail.intervals + 1,
                    log_freq: tail.log_freq + (freq.max(1) as f64).ln(),
                    next: i + len,
                    text,
                    freq,
                };
                candidate_best = match candidate_best {
                    None => Some((entry, len)),
                    Some((cur, cur_len)) => {
                        if better(&entry, len, &cur, cur_len) {
                            Some((entry, len))
                        } else {
                            Some((cur, cur_len))
                        }
                    }
                };
            }
            best[i] = candidate_best.map(|(e, _)| e);
        }

        let mut spans = Vec::new();
        let mut pos = 0;
        while pos < n {
            let Some(entry) = best[pos].clone() else {
                // Should not happen since len==1 always has a fallback.
                break;
            };
            spans.push(ChoiceSpan {
                start: pos,
                end: entry.next,
                text: entry.text,
                freq: entry.freq,
            });
            pos = entry.next;
        }
        spans
    }

    /// Record a commit: every chosen span that came from the dictionary
    /// (not the raw-phoneme fallback) bumps its user frequency, wiring the
    /// chooser back into C4 (spec §4.6 "commit draining"). A span that has
    /// never been seen before (no tree or user hit for this exact text)
    /// is instead *seeded*, placed ahead of or behind its siblings per
    /// `add_phrase_direction`.
    pub fn record_commit(&self, syllables: &[Syllable], spans: &[ChoiceSpan]) {
        for span in spans {
            let slice = &syllables[span.start..span.end];
            let options = self.candidates_for_span(slice);
            let already_known = options.iter().any(|(text, _)| text == &span.text);
            if already_known {
                let _ = self.user.bump_frequency(slice, &span.text);
                continue;
            }
            let seed = match self.direction {
                // Head: a freshly learned phrase should immediately
                // outrank whatever this span currently prefers.
                AddPhraseDirection::Forward => {
                    options.iter().map(|(_, f)| *f).max().unwrap_or(0).saturating_add(1)
                }
                // Tail: let it in at the bottom; it has to earn its way up
                // through repeated use like any other new phrase.
                AddPhraseDirection::Backward => 1,
            };
            let _ = self.user.add_phrase(slice, &span.text, seed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phoneme::Phoneme;
    use std::io::Write;

    fn syllable(initial: u8, medial: u8, final_: u8, tone: u8) -> Syllable {
        Syllable::from_phoneme(Phoneme::new(initial, medial, final_, tone)).unwrap()
    }

    fn write_node(buf: &mut Vec<u8>, key: u16, a: u32, b: u32) {
        buf.extend_from_slice(&key.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&a.to_le_bytes());
        buf.extend_from_slice(&b.to_le_bytes());
    }

    /// One two-syllable phrase "你好" (freq 80) and, sharing its first
    /// syllable, a single-char phrase "你" (freq 20) — tests that the DP
    /// prefers the longer two-syllable match.
    fn build_tree() -> PhraseTree {
        let ni = syllable(2, 0, 2, 4);
        let hao = syllable(3, 0, 3, 3);

        let mut arena = Vec::new();
        let ni_pos = arena.len() as u32;
        arena.extend_from_slice("你".as_bytes());
        arena.push(0);
        let nihao_pos = arena.len() as u32;
        arena.extend_from_slice("你好".as_bytes());
        arena.push(0);

        // 0: root -> children [1,2)         (only "ni" branch)
        // 1: internal ni -> children [2,4)  (leaf "你", internal hao)
        // 2: leaf "你" freq=20
        // 3: internal hao -> children [4,5)
        // 4: leaf "你好" freq=80
        let mut nodes = Vec::new();
        write_node(&mut nodes, 1, 1, 2); // root, count=1, children[1,2)
        write_node(&mut nodes, ni.raw(), 2, 4); // ni internal, children[2,4)
        write_node(&mut nodes, 0, ni_pos, 20); // leaf "你"
        write_node(&mut nodes, hao.raw(), 4, 5); // hao internal, children[4,5)
        write_node(&mut nodes, 0, nihao_pos, 80); // leaf "你好"

        let mut tree_file = tempfile::NamedTempFile::new().unwrap();
        tree_file.write_all(&nodes).unwrap();
        let mut arena_file = tempfile::NamedTempFile::new().unwrap();
        arena_file.write_all(&arena).unwrap();
        PhraseTree::open(tree_file.path(), arena_file.path()).unwrap()
    }

    fn temp_userdict() -> UserDict {
        let mut p = std::env::temp_dir();
        p.push(format!(
            "chooser_test_{}.redb",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        UserDict::new(p).unwrap()
    }

    #[test]
    fn prefers_longer_phrase_over_two_short_ones() {
        let tree = build_tree();
        let user = temp_userdict();
        let masked = HashSet::new();
        let chooser = Chooser::new(&tree, &user, &masked);
        let seq = vec![syllable(2, 0, 2, 4), syllable(3, 0, 3, 3)];
        let spans = chooser.segment(&seq, &[]);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "你好");
    }

    /// Three syllables where the first position has two equally-scored
    /// segmentations: a 1-syllable phrase followed by a 2-syllable phrase,
    /// or a 2-syllable phrase followed by a 1-syllable fallback. Both cover
    /// the same two intervals with the same total log-frequency (2 * 8 ==
    /// 8 * 1, fallback freq 1), so only the length tie-break (spec §4.6,
    /// "longer phrases at the left end first") decides which one wins.
    fn build_tie_tree() -> PhraseTree {
        let s0 = syllable(1, 0, 1, 1);
        let s1 = syllable(2, 0, 2, 2);
        let s2 = syllable(3, 0, 3, 3);

        let mut arena = Vec::new();
        let s0_pos = arena.len() as u32;
        arena.extend_from_slice("甲".as_bytes());
        arena.push(0);
        let xy_pos = arena.len() as u32;
        arena.extend_from_slice("甲乙".as_bytes());
        arena.push(0);
        let yz_pos = arena.len() as u32;
        arena.extend_from_slice("乙丙".as_bytes());
        arena.push(0);

        // 0: root                 -> [1,3)  (s0 branch, s1 branch)
        // 1: s0 internal          -> [3,5)  (leaf "甲", s1-under-s0 internal)
        // 2: s1 internal (top)    -> [6,7)  (s2-under-s1 internal)
        // 3: leaf "甲"   freq=2
        // 4: s1 internal (under 0)-> [5,6)  (leaf "甲乙")
        // 5: leaf "甲乙" freq=8
        // 6: s2 internal (under 2)-> [7,8)  (leaf "乙丙")
        // 7: leaf "乙丙" freq=4
        let mut nodes = Vec::new();
        write_node(&mut nodes, 2, 1, 3); // root, count=2
        write_node(&mut nodes, s0.raw(), 3, 5); // idx1
        write_node(&mut nodes, s1.raw(), 6, 7); // idx2
        write_node(&mut nodes, 0, s0_pos, 2); // idx3 leaf "甲"
        write_node(&mut nodes, s1.raw(), 5, 6); // idx4
        write_node(&mut nodes, 0, xy_pos, 8); // idx5 leaf "甲乙"
        write_node(&mut nodes, s2.raw(), 7, 8); // idx6
        write_node(&mut nodes, 0, yz_pos, 4); // idx7 leaf "乙丙"

        let mut tree_file = tempfile::NamedTempFile::new().unwrap();
        tree_file.write_all(&nodes).unwrap();
        let mut arena_file = tempfile::NamedTempFile::new().unwrap();
        arena_file.write_all(&arena).unwrap();
        PhraseTree::open(tree_file.path(), arena_file.path()).unwrap()
    }

    #[test]
    fn tie_break_prefers_longer_first_phrase() {
        let tree = build_tie_tree();
        let user = temp_userdict();
        let masked = HashSet::new();
        let chooser = Chooser::new(&tree, &user, &masked);
        let seq = vec![
            syllable(1, 0, 1, 1),
            syllable(2, 0, 2, 2),
            syllable(3, 0, 3, 3),
        ];
        let spans = chooser.segment(&seq, &[]);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text, "甲乙");
        assert_eq!(spans[0].end, 2);
    }

    #[test]
    fn pinned_span_forces_a_specific_boundary() {
        let tree = build_tree();
        let user = temp_userdict();
        let masked = HashSet::new();
        let chooser = Chooser::new(&tree, &user, &masked);
        let seq = vec![syllable(2, 0, 2, 4), syllable(3, 0, 3, 3)];
        let pinned = vec![PinnedSpan {
            start: 0,
            end: 1,
            text: "你".to_string(),
        }];
        let spans = chooser.segment(&seq, &pinned);
        assert_eq!(spans[0].text, "你");
        assert_eq!(spans[0].end, 1);
    }

    #[test]
    fn unknown_syllable_falls_back_to_its_own_display() {
        let tree = build_tree();
        let user = temp_userdict();
        let masked = HashSet::new();
        let chooser = Chooser::new(&tree, &user, &masked);
        let unknown = syllable(20, 3, 13, 1);
        let spans = chooser.segment(&[unknown], &[]);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].freq, 1);
    }

    #[test]
    fn record_commit_bumps_user_frequency() {
        let tree = build_tree();
        let user = temp_userdict();
        let masked = HashSet::new();
        let chooser = Chooser::new(&tree, &user, &masked);
        let seq = vec![syllable(2, 0, 2, 4), syllable(3, 0, 3, 3)];
        let spans = chooser.segment(&seq, &[]);
        chooser.record_commit(&seq, &spans);
        let boosted = user.lookup(&seq).unwrap();
        assert!(!boosted.is_empty());
        assert!(boosted[0].freq > 0);
    }

    #[test]
    fn record_commit_seeds_a_new_phrase_per_add_phrase_direction() {
        let tree = build_tree();
        let seq = vec![syllable(2, 0, 2, 4)]; // "ni" alone; tree already has "你" at freq 20
        let masked = HashSet::new();
        let new_span = ChoiceSpan {
            start: 0,
            end: 1,
            text: "妮".to_string(),
            freq: 0,
        };

        let forward_user = temp_userdict();
        Chooser::new(&tree, &forward_user, &masked)
            .with_direction(AddPhraseDirection::Forward)
            .record_commit(&seq, &[new_span.clone()]);
        let seeded = forward_user.lookup(&seq).unwrap();
        let entry = seeded.iter().find(|e| e.text == "妮").unwrap();
        assert!(entry.freq > 20, "forward direction should outrank the existing 你 (freq 20)");

        let backward_user = temp_userdict();
        Chooser::new(&tree, &backward_user, &masked)
            .with_direction(AddPhraseDirection::Backward)
            .record_commit(&seq, &[new_span]);
        let seeded = backward_user.lookup(&seq).unwrap();
        let entry = seeded.iter().find(|e| e.text == "妮").unwrap();
        assert_eq!(entry.freq, 1, "backward direction should seed at the bottom");
    }

    #[test]
    fn masked_phrase_is_excluded_from_candidates_and_segmentation() {
        let tree = build_tree();
        let user = temp_userdict();
        let seq = vec![syllable(2, 0, 2, 4), syllable(3, 0, 3, 3)];

        let mut masked = HashSet::new();
        masked.insert("你好".to_string());
        let chooser = Chooser::new(&tree, &user, &masked);

        let options = chooser.candidates_for_span(&seq);
        assert!(options.iter().all(|(text, _)| text != "你好"));

        // With "你好" hidden the DP should fall back to "你" + the lone
        // syllable placeholder instead of the higher-freq two-syllable word.
        let spans = chooser.segment(&seq, &[]);
        assert!(spans.iter().all(|s| s.text != "你好"));
    }
}
