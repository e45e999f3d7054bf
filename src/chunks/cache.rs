use std::collections::{BTreeMap, HashMap};

use crate::chunks::key::{CHUNK_KEY_SCHEMA, ChunkKey};
use crate::scene::model::{LyricLine, SceneInput, WordTiming};
use crate::tuning;

/// Measures text width in logical pixels.
pub trait TextMeasure {
    /// Width of `text` at `font_size`, and whether it came from real font metrics.
    fn measure(&mut self, text: &str, font_size: f64) -> (f64, bool);
}

/// Fallback metrics used when no font could be loaded.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApproxMeasure;

impl TextMeasure for ApproxMeasure {
    fn measure(&mut self, text: &str, font_size: f64) -> (f64, bool) {
        (approx_width(text, font_size), false)
    }
}

pub(crate) fn approx_width(text: &str, font_size: f64) -> f64 {
    text.chars().count() as f64 * font_size * tuning::FALLBACK_ADVANCE_EM
}

/// Cached text record for one chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkVisual {
    /// Identity shared with baked keyframes.
    pub key: ChunkKey,
    /// Display text.
    pub text: String,
    /// Font size the width was measured at.
    pub font_size: f64,
    /// Font weight.
    pub font_weight: u16,
    /// Measured width at `font_size`.
    pub width: f64,
    /// Whether `width` comes from real font metrics.
    pub measured: bool,
}

/// How well the chunk cache covers the scene's words.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkCoverage {
    /// Entries in the cache.
    pub entries: usize,
    /// Words the scene declares.
    pub expected: usize,
}

impl ChunkCoverage {
    /// Words with no cache entry.
    pub fn missing(self) -> usize {
        self.expected.saturating_sub(self.entries)
    }

    /// Return `true` when every word has an entry.
    pub fn is_complete(self) -> bool {
        self.missing() == 0
    }
}

/// Chunk visuals keyed by [`ChunkKey`].
#[derive(Clone, Debug, Default)]
pub struct ChunkCache {
    entries: HashMap<ChunkKey, ChunkVisual>,
}

impl ChunkCache {
    /// Build the cache from scene words, keyed exactly like the baker keys its chunks.
    pub fn build(scene: &SceneInput, measure: &mut dyn TextMeasure) -> Self {
        let font_size = scene.physics.font_size;
        let font_weight = scene.physics.font_weight;
        let mut entries = HashMap::with_capacity(scene.words.len());
        for (key, word) in assign_chunk_keys(&scene.lines, &scene.words) {
            let text = word.word.trim().to_owned();
            let (width, measured) = measure.measure(&text, font_size);
            entries.insert(
                key,
                ChunkVisual {
                    key,
                    text,
                    font_size,
                    font_weight,
                    width,
                    measured,
                },
            );
        }
        Self { entries }
    }

    /// Add chunks the baker knows about that the scene words did not produce.
    ///
    /// Existing entries are never replaced. Returns the number of inserted entries.
    pub fn merge_missing(
        &mut self,
        texts: &BTreeMap<ChunkKey, String>,
        font_size: f64,
        font_weight: u16,
        measure: &mut dyn TextMeasure,
    ) -> usize {
        let mut inserted = 0;
        for (key, text) in texts {
            if self.entries.contains_key(key) {
                continue;
            }
            let (width, measured) = measure.measure(text, font_size);
            self.entries.insert(
                *key,
                ChunkVisual {
                    key: *key,
                    text: text.clone(),
                    font_size,
                    font_weight,
                    width,
                    measured,
                },
            );
            inserted += 1;
        }
        inserted
    }

    /// Copy entries of `other` whose keys this cache lacks. Returns the number copied.
    pub fn absorb_missing(&mut self, other: &ChunkCache) -> usize {
        let mut inserted = 0;
        for (key, visual) in &other.entries {
            if !self.entries.contains_key(key) {
                self.entries.insert(*key, visual.clone());
                inserted += 1;
            }
        }
        inserted
    }

    /// Look up a chunk.
    pub fn get(&self, key: &ChunkKey) -> Option<&ChunkVisual> {
        self.entries.get(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` when empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Coverage against `expected` words.
    pub fn coverage(&self, expected: usize) -> ChunkCoverage {
        ChunkCoverage {
            entries: self.entries.len(),
            expected,
        }
    }

    /// Schema version this cache was keyed with.
    pub fn schema(&self) -> u32 {
        CHUNK_KEY_SCHEMA
    }

    /// Iterate over entries (unordered).
    pub fn iter(&self) -> impl Iterator<Item = &ChunkVisual> {
        self.entries.values()
    }
}

/// Assign `(line, group, word)` keys to scene words.
///
/// Words are keyed in start-time order (stable for ties), whatever order the scene lists them
/// in. A word belongs to the line whose `[start, end]` window contains its start time; words
/// between lines attach to the latest line that started before them (or line 0). Within a line a
/// phrase group closes after a word ending in punctuation, or once it holds
/// [`tuning::MAX_PHRASE_WORDS`] words. Every line keeps its own cursor, so a line that is
/// revisited continues its numbering instead of reissuing a key.
pub fn assign_chunk_keys<'a>(
    lines: &[LyricLine],
    words: &'a [WordTiming],
) -> Vec<(ChunkKey, &'a WordTiming)> {
    let mut ordered: Vec<&WordTiming> = words.iter().filter(|w| !w.word.trim().is_empty()).collect();
    ordered.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut out = Vec::with_capacity(ordered.len());
    let mut cursors: HashMap<usize, (u32, u32)> = HashMap::new();
    for w in ordered {
        let line = line_for_time(lines, w.start);
        let (group, word) = match cursors.get(&line) {
            Some(&(g, n)) if n >= tuning::MAX_PHRASE_WORDS => (g + 1, 0),
            Some(&(g, n)) => (g, n),
            None => (0, 0),
        };
        out.push((ChunkKey::new(line as u32, group, word), w));

        let next = if ends_phrase(&w.word) {
            (group + 1, 0)
        } else {
            (group, word + 1)
        };
        cursors.insert(line, next);
    }
    out
}

/// Number of words that produce a chunk (blank words are skipped).
pub fn expected_chunks(words: &[WordTiming]) -> usize {
    words.iter().filter(|w| !w.word.trim().is_empty()).count()
}

fn line_for_time(lines: &[LyricLine], t: f64) -> usize {
    const EPS: f64 = 1e-6;
    if lines.is_empty() {
        return 0;
    }
    if let Some(i) = lines
        .iter()
        .position(|l| t >= l.start - EPS && t <= l.end + EPS)
    {
        return i;
    }
    lines
        .iter()
        .rposition(|l| l.start <= t)
        .unwrap_or(0)
}

fn ends_phrase(word: &str) -> bool {
    word.trim_end()
        .chars()
        .last()
        .is_some_and(|c| matches!(c, ',' | '.' | ';' | ':' | '!' | '?'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str, start: f64, end: f64) -> LyricLine {
        LyricLine {
            text: text.to_owned(),
            start,
            end,
        }
    }

    fn word(w: &str, start: f64) -> WordTiming {
        WordTiming {
            word: w.to_owned(),
            start,
            end: start + 0.2,
        }
    }

    #[test]
    fn punctuation_closes_phrase_groups() {
        let lines = vec![line("hold on, hold tight", 0.0, 2.0)];
        let words = vec![
            word("hold", 0.0),
            word("on,", 0.3),
            word("hold", 0.6),
            word("tight", 0.9),
        ];
        let keys: Vec<String> = assign_chunk_keys(&lines, &words)
            .iter()
            .map(|(k, _)| k.to_string())
            .collect();
        assert_eq!(keys, vec!["0:0:0", "0:0:1", "0:1:0", "0:1:1"]);
    }

    #[test]
    fn long_groups_split_and_lines_reset() {
        let lines = vec![line("a b c d e", 0.0, 2.0), line("f", 3.0, 4.0)];
        let words = vec![
            word("a", 0.0),
            word("b", 0.2),
            word("c", 0.4),
            word("d", 0.6),
            word("e", 0.8),
            word("f", 3.1),
        ];
        let keys: Vec<ChunkKey> = assign_chunk_keys(&lines, &words)
            .iter()
            .map(|(k, _)| *k)
            .collect();
        let max = tuning::MAX_PHRASE_WORDS;
        assert_eq!(keys[max as usize], ChunkKey::new(0, 1, 0));
        assert_eq!(*keys.last().unwrap(), ChunkKey::new(1, 0, 0));
    }

    #[test]
    fn unsorted_words_get_unique_keys_in_time_order() {
        let lines = vec![line("one two", 0.0, 1.0), line("three", 1.0, 2.0)];
        let words = vec![word("one", 0.1), word("three", 1.2), word("two", 0.5)];
        let keyed = assign_chunk_keys(&lines, &words);
        let pairs: Vec<(ChunkKey, &str)> = keyed.iter().map(|(k, w)| (*k, w.word.as_str())).collect();
        assert_eq!(
            pairs,
            vec![
                (ChunkKey::new(0, 0, 0), "one"),
                (ChunkKey::new(0, 0, 1), "two"),
                (ChunkKey::new(1, 0, 0), "three"),
            ]
        );
    }

    #[test]
    fn revisited_line_continues_its_own_numbering() {
        // The trailing word falls after every line and attaches to line 1 again.
        let lines = vec![line("x", 2.0, 3.0), line("y z", 0.0, 1.0)];
        let words = vec![word("y", 0.5), word("x", 2.5), word("z", 4.0)];
        let keys: Vec<ChunkKey> = assign_chunk_keys(&lines, &words).iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            vec![ChunkKey::new(1, 0, 0), ChunkKey::new(0, 0, 0), ChunkKey::new(1, 0, 1)]
        );
    }

    #[test]
    fn words_between_lines_attach_to_previous_line() {
        let lines = vec![line("a", 0.0, 1.0), line("b", 5.0, 6.0)];
        let words = vec![word("a", 0.5), word("gap", 2.5)];
        let keys = assign_chunk_keys(&lines, &words);
        assert_eq!(keys[1].0.line, 0);
    }

    #[test]
    fn merge_never_replaces_existing_entries() {
        let mut cache = ChunkCache::default();
        let mut texts = BTreeMap::new();
        texts.insert(ChunkKey::new(0, 0, 0), "one".to_owned());
        assert_eq!(cache.merge_missing(&texts, 40.0, 400, &mut ApproxMeasure), 1);
        texts.insert(ChunkKey::new(0, 0, 0), "other".to_owned());
        assert_eq!(cache.merge_missing(&texts, 40.0, 400, &mut ApproxMeasure), 0);
        assert_eq!(cache.get(&ChunkKey::new(0, 0, 0)).unwrap().text, "one");
        assert_eq!(cache.coverage(2).missing(), 1);
    }

    #[test]
    fn absorb_copies_only_absent_keys() {
        let mut ours = ChunkCache::default();
        let mut theirs = ChunkCache::default();
        let mut a = BTreeMap::new();
        a.insert(ChunkKey::new(0, 0, 0), "mine".to_owned());
        ours.merge_missing(&a, 40.0, 400, &mut ApproxMeasure);
        let mut b = BTreeMap::new();
        b.insert(ChunkKey::new(0, 0, 0), "theirs".to_owned());
        b.insert(ChunkKey::new(2, 0, 0), "extra".to_owned());
        theirs.merge_missing(&b, 40.0, 400, &mut ApproxMeasure);

        assert_eq!(ours.absorb_missing(&theirs), 1);
        assert_eq!(ours.get(&ChunkKey::new(0, 0, 0)).unwrap().text, "mine");
        assert_eq!(ours.get(&ChunkKey::new(2, 0, 0)).unwrap().text, "extra");
    }
}
