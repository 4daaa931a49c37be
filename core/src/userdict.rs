//! Redb-backed user phrase store (C4, spec §4.4).
//!
//! Keyed by `(syllable_seq, text)`. Each record tracks `user_freq` (the
//! current, possibly-aged frequency), `original_freq` (the floor a phrase
//! decays back to), `recent_time` (last bump, Unix seconds) and `max_freq`
//! (the ceiling reached after repeated selection). Frequency aging and the
//! append-only journal format follow spec §4.4 and §6; the redb
//! open/read-transaction/write-transaction idiom is carried over from the
//! teacher's original `core/src/userdict.rs`.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use redb::{Database, ReadableTable, TableDefinition};

use crate::phoneme::{Phoneme, Syllable};

/// Half-life of the frequency-decay curve (spec §4.4): fifteen days.
pub const HALF_LIFE_SECS: u64 = 15 * 24 * 3600;

/// Frequency ceiling a single selection can push a phrase towards.
const BUMP_STEP: u32 = 30;

/// Absolute cap on `max_freq`, mirroring the phrase tree's 24-bit frequency
/// field so user entries never overflow it when exported or merged.
pub const MAX_USER_FREQ: u32 = (1 << 24) - 1;

const SYLLABLE_SENTINEL: u16 = 0xFFFF;

/// One user-dictionary record: a candidate text for a syllable sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserPhraseRecord {
    pub user_freq: u32,
    pub original_freq: u32,
    pub recent_time: u64,
    pub max_freq: u32,
}

/// A lookup result merged with the current (aged) frequency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPhraseEntry {
    pub text: String,
    pub freq: u32,
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// `decay(Δ) = max(0, 1 - Δ/HALF_LIFE_SECS)` (spec §4.4).
fn decay(delta_secs: u64) -> f64 {
    (1.0 - delta_secs as f64 / HALF_LIFE_SECS as f64).max(0.0)
}

/// `f = clamp(o + decay(now-t)*(m-o), o, m)` (spec §4.4).
fn aged_freq(original: u32, max: u32, recent_time: u64, now: u64) -> u32 {
    let delta = now.saturating_sub(recent_time);
    let f = original as f64 + decay(delta) * (max as f64 - original as f64);
    f.clamp(original as f64, max as f64).round() as u32
}

fn encode_key(syllables: &[Syllable], text: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(syllables.len() * 2 + 2 + text.len());
    for s in syllables {
        key.extend_from_slice(&s.raw().to_le_bytes());
    }
    key.extend_from_slice(&SYLLABLE_SENTINEL.to_le_bytes());
    key.extend_from_slice(text.as_bytes());
    key
}

fn encode_prefix(syllables: &[Syllable]) -> Vec<u8> {
    let mut key = Vec::with_capacity(syllables.len() * 2 + 2);
    for s in syllables {
        key.extend_from_slice(&s.raw().to_le_bytes());
    }
    key.extend_from_slice(&SYLLABLE_SENTINEL.to_le_bytes());
    key
}

fn decode_key(key: &[u8]) -> Option<(Vec<Syllable>, &str)> {
    let mut i = 0;
    let mut syllables = Vec::new();
    loop {
        let raw = u16::from_le_bytes([*key.get(i)?, *key.get(i + 1)?]);
        i += 2;
        if raw == SYLLABLE_SENTINEL {
            break;
        }
        syllables.push(Syllable::from_phoneme(Phoneme::from_raw(raw))?);
    }
    let text = std::str::from_utf8(&key[i..]).ok()?;
    Some((syllables, text))
}

fn encode_record(rec: &UserPhraseRecord) -> [u8; 20] {
    let mut out = [0u8; 20];
    out[0..4].copy_from_slice(&rec.user_freq.to_le_bytes());
    out[4..8].copy_from_slice(&rec.original_freq.to_le_bytes());
    out[8..16].copy_from_slice(&rec.recent_time.to_le_bytes());
    out[16..20].copy_from_slice(&rec.max_freq.to_le_bytes());
    out
}

fn decode_record(bytes: &[u8]) -> Option<UserPhraseRecord> {
    if bytes.len() != 20 {
        return None;
    }
    Some(UserPhraseRecord {
        user_freq: u32::from_le_bytes(bytes[0..4].try_into().ok()?),
        original_freq: u32::from_le_bytes(bytes[4..8].try_into().ok()?),
        recent_time: u64::from_le_bytes(bytes[8..16].try_into().ok()?),
        max_freq: u32::from_le_bytes(bytes[16..20].try_into().ok()?),
    })
}

const TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("user_phrases");

/// User phrase store backed by `redb`.
#[derive(Clone)]
pub struct UserDict {
    db: Arc<Database>,
    #[allow(dead_code)]
    path: PathBuf,
}

impl UserDict {
    /// Create/open a redb-backed user dictionary at the given path.
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> Result<Self, redb::Error> {
        if let Some(dir) = path.as_ref().parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        let db = Database::create(path.as_ref())?;
        Ok(UserDict {
            db: Arc::new(db),
            path: path.as_ref().to_path_buf(),
        })
    }

    fn get_record(&self, key: &[u8]) -> Result<Option<UserPhraseRecord>, redb::Error> {
        let r = self.db.begin_read()?;
        match r.open_table(TABLE) {
            Ok(table) => Ok(table
                .get(key)?
                .and_then(|v| decode_record(v.value()))),
            Err(redb::TableError::TableDoesNotExist(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put_record(&self, key: &[u8], rec: &UserPhraseRecord) -> Result<(), redb::Error> {
        let bytes = encode_record(rec);
        let w = self.db.begin_write()?;
        {
            let mut table = w.open_table(TABLE)?;
            table.insert(key, bytes.as_slice())?;
        }
        w.commit()?;
        Ok(())
    }

    /// Insert a brand-new user phrase with an explicit initial frequency, or
    /// reset an existing one back to that floor (spec §4.4 "add").
    pub fn add_phrase_at(
        &self,
        syllables: &[Syllable],
        text: &str,
        initial_freq: u32,
        now: u64,
    ) -> Result<(), redb::Error> {
        let key = encode_key(syllables, text);
        let rec = UserPhraseRecord {
            user_freq: initial_freq,
            original_freq: initial_freq,
            recent_time: now,
            max_freq: initial_freq.max(BUMP_STEP).min(MAX_USER_FREQ),
        };
        self.put_record(&key, &rec)
    }

    pub fn add_phrase(
        &self,
        syllables: &[Syllable],
        text: &str,
        initial_freq: u32,
    ) -> Result<(), redb::Error> {
        self.add_phrase_at(syllables, text, initial_freq, now_unix())
    }

    /// Record a selection: age the stored frequency up to `now`, then push
    /// the ceiling up by one more step (spec §4.4).
    pub fn bump_frequency_at(
        &self,
        syllables: &[Syllable],
        text: &str,
        now: u64,
    ) -> Result<(), redb::Error> {
        let key = encode_key(syllables, text);
        let existing = self.get_record(&key)?;
        let rec = match existing {
            Some(r) => {
                let aged = aged_freq(r.original_freq, r.max_freq, r.recent_time, now);
                UserPhraseRecord {
                    user_freq: aged,
                    original_freq: r.original_freq,
                    recent_time: now,
                    max_freq: (aged + BUMP_STEP).min(MAX_USER_FREQ),
                }
            }
            None => UserPhraseRecord {
                user_freq: BUMP_STEP,
                original_freq: BUMP_STEP,
                recent_time: now,
                max_freq: BUMP_STEP,
            },
        };
        self.put_record(&key, &rec)
    }

    pub fn bump_frequency(&self, syllables: &[Syllable], text: &str) -> Result<(), redb::Error> {
        self.bump_frequency_at(syllables, text, now_unix())
    }

    /// Remove a user phrase entirely.
    pub fn remove(&self, syllables: &[Syllable], text: &str) -> Result<(), redb::Error> {
        let key = encode_key(syllables, text);
        let w = self.db.begin_write()?;
        {
            let mut table = w.open_table(TABLE)?;
            table.remove(key.as_slice())?;
        }
        w.commit()?;
        Ok(())
    }

    /// All entries for exactly `syllables`, with frequencies aged to `now`,
    /// ordered by descending frequency (same convention as the phrase tree).
    pub fn lookup_at(
        &self,
        syllables: &[Syllable],
        now: u64,
    ) -> Result<Vec<UserPhraseEntry>, redb::Error> {
        let prefix = encode_prefix(syllables);
        let mut out = Vec::new();
        let r = self.db.begin_read()?;
        match r.open_table(TABLE) {
            Ok(table) => {
                for item in table.iter()? {
                    let (k, v) = item?;
                    if !k.value().starts_with(&prefix[..]) {
                        continue;
                    }
                    if let (Some((_, text)), Some(rec)) =
                        (decode_key(k.value()), decode_record(v.value()))
                    {
                        out.push(UserPhraseEntry {
                            text: text.to_string(),
                            freq: aged_freq(rec.original_freq, rec.max_freq, rec.recent_time, now),
                        });
                    }
                }
            }
            Err(redb::TableError::TableDoesNotExist(_)) => {}
            Err(e) => return Err(e.into()),
        }
        out.sort_by(|a, b| b.freq.cmp(&a.freq).then_with(|| a.text.cmp(&b.text)));
        Ok(out)
    }

    pub fn lookup(&self, syllables: &[Syllable]) -> Result<Vec<UserPhraseEntry>, redb::Error> {
        self.lookup_at(syllables, now_unix())
    }

    /// Snapshot every stored record, keyed by `(syllable_seq, text)`.
    pub fn snapshot(&self) -> HashMap<(Vec<Syllable>, String), UserPhraseRecord> {
        let mut out = HashMap::new();
        let Ok(r) = self.db.begin_read() else {
            return out;
        };
        let Ok(table) = r.open_table(TABLE) else {
            return out;
        };
        let Ok(iter) = table.iter() else {
            return out;
        };
        for item in iter.flatten() {
            let (k, v) = item;
            if let (Some((syllables, text)), Some(rec)) =
                (decode_key(k.value()), decode_record(v.value()))
            {
                out.insert((syllables, text.to_string()), rec);
            }
        }
        out
    }

    /// Write every record as an append-only journal (spec §6 interchange
    /// format): for each record, `u16` syllable count, that many raw
    /// syllable `u16`s, `u16` text byte length, the UTF-8 text, then the
    /// 20-byte record encoded the same way as on disk.
    pub fn export_journal<W: Write>(&self, w: &mut W) -> io::Result<usize> {
        let snapshot = self.snapshot();
        let mut count = 0;
        for ((syllables, text), rec) in snapshot {
            w.write_all(&(syllables.len() as u16).to_le_bytes())?;
            for s in &syllables {
                w.write_all(&s.raw().to_le_bytes())?;
            }
            let text_bytes = text.as_bytes();
            w.write_all(&(text_bytes.len() as u16).to_le_bytes())?;
            w.write_all(text_bytes)?;
            w.write_all(&encode_record(&rec))?;
            count += 1;
        }
        Ok(count)
    }

    /// Merge an exported journal back in. Last-writer-wins: an imported
    /// record only overwrites an existing one if its `recent_time` is
    /// strictly newer; on a tie the existing record is kept.
    pub fn import_journal<R: Read>(&self, r: &mut R) -> io::Result<usize> {
        let mut imported = 0;
        loop {
            let mut len_buf = [0u8; 2];
            match r.read_exact(&mut len_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }
            let syllable_count = u16::from_le_bytes(len_buf) as usize;
            let mut syllables = Vec::with_capacity(syllable_count);
            for _ in 0..syllable_count {
                let mut raw_buf = [0u8; 2];
                r.read_exact(&mut raw_buf)?;
                let raw = u16::from_le_bytes(raw_buf);
                let syllable = Syllable::from_phoneme(Phoneme::from_raw(raw)).ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidData, "invalid syllable in journal")
                })?;
                syllables.push(syllable);
            }
            let mut text_len_buf = [0u8; 2];
            r.read_exact(&mut text_len_buf)?;
            let text_len = u16::from_le_bytes(text_len_buf) as usize;
            let mut text_buf = vec![0u8; text_len];
            r.read_exact(&mut text_buf)?;
            let text = String::from_utf8(text_buf)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "journal text not UTF-8"))?;
            let mut record_buf = [0u8; 20];
            r.read_exact(&mut record_buf)?;
            let rec = decode_record(&record_buf)
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "bad journal record"))?;

            let key = encode_key(&syllables, &text);
            let existing = self
                .get_record(&key)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
            let should_write = match existing {
                Some(cur) => rec.recent_time > cur.recent_time,
                None => true,
            };
            if should_write {
                self.put_record(&key, &rec)
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
            }
            imported += 1;
        }
        Ok(imported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syllable(initial: u8, medial: u8, final_: u8, tone: u8) -> Syllable {
        Syllable::from_phoneme(Phoneme::new(initial, medial, final_, tone)).unwrap()
    }

    fn temp_path(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!(
            "libchinese_userdict_{}_{}.redb",
            name,
            std::time::SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        p
    }

    #[test]
    fn add_then_lookup_roundtrip() {
        let dict = UserDict::new(temp_path("add_lookup")).unwrap();
        let seq = vec![syllable(2, 0, 2, 4), syllable(3, 0, 3, 3)];
        dict.add_phrase_at(&seq, "你好", 50, 1_000).unwrap();
        let results = dict.lookup_at(&seq, 1_000).unwrap();
        assert_eq!(results, vec![UserPhraseEntry { text: "你好".into(), freq: 50 }]);
    }

    #[test]
    fn frequency_decays_towards_original_over_time() {
        let dict = UserDict::new(temp_path("decay")).unwrap();
        let seq = vec![syllable(2, 0, 2, 4)];
        dict.add_phrase_at(&seq, "你", 10, 0).unwrap();
        dict.bump_frequency_at(&seq, "你", 0).unwrap();
        let boosted = dict.lookup_at(&seq, 0).unwrap()[0].freq;
        assert!(boosted > 10);

        // far beyond the half-life: should have decayed back to original
        let decayed = dict.lookup_at(&seq, HALF_LIFE_SECS * 10).unwrap()[0].freq;
        assert_eq!(decayed, 10);
    }

    #[test]
    fn bump_without_prior_add_seeds_a_record() {
        let dict = UserDict::new(temp_path("bump_seed")).unwrap();
        let seq = vec![syllable(1, 0, 1, 2)];
        dict.bump_frequency_at(&seq, "冊", 0).unwrap();
        let results = dict.lookup_at(&seq, 0).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "冊");
    }

    #[test]
    fn remove_deletes_entry() {
        let dict = UserDict::new(temp_path("remove")).unwrap();
        let seq = vec![syllable(2, 0, 2, 4)];
        dict.add_phrase_at(&seq, "你", 10, 0).unwrap();
        dict.remove(&seq, "你").unwrap();
        assert!(dict.lookup_at(&seq, 0).unwrap().is_empty());
    }

    #[test]
    fn export_then_import_round_trips_into_a_fresh_dict() {
        let source = UserDict::new(temp_path("export_src")).unwrap();
        let seq = vec![syllable(2, 0, 2, 4), syllable(3, 0, 3, 3)];
        source.add_phrase_at(&seq, "你好", 80, 500).unwrap();

        let mut buf = Vec::new();
        let exported = source.export_journal(&mut buf).unwrap();
        assert_eq!(exported, 1);

        let dest = UserDict::new(temp_path("export_dst")).unwrap();
        let imported = dest.import_journal(&mut buf.as_slice()).unwrap();
        assert_eq!(imported, 1);

        let results = dest.lookup_at(&seq, 500).unwrap();
        assert_eq!(results[0].text, "你好");
        assert_eq!(results[0].freq, 80);
    }

    #[test]
    fn import_keeps_existing_record_on_timestamp_tie() {
        let dict = UserDict::new(temp_path("tie")).unwrap();
        let seq = vec![syllable(2, 0, 2, 4)];
        dict.add_phrase_at(&seq, "你", 99, 1_000).unwrap();

        let mut buf = Vec::new();
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.extend_from_slice(&seq[0].raw().to_le_bytes());
        let text = "你".as_bytes();
        buf.extend_from_slice(&(text.len() as u16).to_le_bytes());
        buf.extend_from_slice(text);
        buf.extend_from_slice(&encode_record(&UserPhraseRecord {
            user_freq: 1,
            original_freq: 1,
            recent_time: 1_000,
            max_freq: 1,
        }));

        dict.import_journal(&mut buf.as_slice()).unwrap();
        let results = dict.lookup_at(&seq, 1_000).unwrap();
        assert_eq!(results[0].freq, 99);
    }
}
