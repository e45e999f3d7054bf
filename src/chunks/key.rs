use std::fmt;
use std::str::FromStr;

use crate::foundation::error::{DanceError, DanceResult};

/// Version of the chunk keying scheme shared with the scene baker.
///
/// Every [`crate::BakeOutput`] carries the version it was keyed with; a mismatch is rejected at
/// publish time instead of silently dropping words during playback.
pub const CHUNK_KEY_SCHEMA: u32 = 1;

/// Stable identity of one renderable chunk: `(line, phrase group, word within group)`.
///
/// String form is `"{line}:{group}:{word}"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey {
    /// Lyric line index.
    pub line: u32,
    /// Phrase-group index within the line.
    pub group: u32,
    /// Word index within the phrase group.
    pub word: u32,
}

impl ChunkKey {
    /// Build a key.
    pub fn new(line: u32, group: u32, word: u32) -> Self {
        Self { line, group, word }
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.line, self.group, self.word)
    }
}

impl FromStr for ChunkKey {
    type Err = DanceError;

    fn from_str(s: &str) -> DanceResult<Self> {
        let mut parts = s.split(':');
        let mut next = |what: &str| -> DanceResult<u32> {
            parts
                .next()
                .ok_or_else(|| DanceError::validation(format!("chunk key '{s}' missing {what}")))?
                .trim()
                .parse::<u32>()
                .map_err(|_| DanceError::validation(format!("chunk key '{s}' has invalid {what}")))
        };
        let line = next("line")?;
        let group = next("group")?;
        let word = next("word")?;
        if parts.next().is_some() {
            return Err(DanceError::validation(format!(
                "chunk key '{s}' has more than three parts"
            )));
        }
        Ok(Self { line, group, word })
    }
}

impl serde::Serialize for ChunkKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for ChunkKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyVisitor;

        impl serde::de::Visitor<'_> for KeyVisitor {
            type Value = ChunkKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a chunk key string \"line:group:word\"")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<ChunkKey, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(KeyVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_agree() {
        let k = ChunkKey::new(3, 1, 2);
        assert_eq!(k.to_string(), "3:1:2");
        assert_eq!("3:1:2".parse::<ChunkKey>().unwrap(), k);
    }

    #[test]
    fn parse_rejects_malformed_keys() {
        assert!("3:1".parse::<ChunkKey>().is_err());
        assert!("3:1:2:4".parse::<ChunkKey>().is_err());
        assert!("a:b:c".parse::<ChunkKey>().is_err());
        assert!("3-1-2".parse::<ChunkKey>().is_err());
    }

    #[test]
    fn serde_uses_string_form_including_map_keys() {
        let k = ChunkKey::new(0, 2, 1);
        assert_eq!(serde_json::to_string(&k).unwrap(), "\"0:2:1\"");

        let mut m = std::collections::BTreeMap::new();
        m.insert(k, "word".to_owned());
        let json = serde_json::to_string(&m).unwrap();
        let back: std::collections::BTreeMap<ChunkKey, String> =
            serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(&k).map(String::as_str), Some("word"));
    }
}
