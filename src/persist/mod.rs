//! Persistence Module
//!
//! Drains a cache into a stream of records and restores it from one.
//!
//! Saving walks the cache lazily, so shards stay writable while the stream
//! is produced. Loading only inserts keys that are absent, which makes
//! restoring into a non-empty cache a merge rather than a replace.

mod codec;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::cache::CacheStore;
use crate::config::CacheConfig;
use crate::error::Result;

pub use codec::{BincodeCodec, JsonLinesCodec, RecordCodec, MAX_RECORD_BYTES};

impl<V> CacheStore<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    // == Save ==
    /// Writes every live entry to `writer`, returning how many were written.
    ///
    /// Aborts on the first I/O or encoding failure.
    pub fn save<W, C>(&self, writer: W, codec: &mut C) -> Result<usize>
    where
        W: Write,
        C: RecordCodec<V>,
    {
        let mut writer = BufWriter::new(writer);
        let mut written = 0;
        for entry in self.iter() {
            codec.encode(&mut writer, &entry)?;
            written += 1;
        }
        writer.flush()?;
        Ok(written)
    }

    // == Load ==
    /// Restores records from `reader`, skipping keys already present.
    ///
    /// Returns how many entries were inserted. Stops at the first decode
    /// failure; entries restored before it stay in the cache.
    pub fn load<R, C>(&self, reader: R, codec: &mut C) -> Result<usize>
    where
        R: Read,
        C: RecordCodec<V>,
    {
        let mut reader = BufReader::new(reader);
        let now = Utc::now();
        let mut decoded = 0;
        let mut inserted = 0;
        while let Some(entry) = codec.decode(&mut reader)? {
            decoded += 1;
            if self.restore(entry, now) {
                inserted += 1;
            }
        }
        if inserted < decoded {
            warn!(
                "Skipped {} of {} records (already present or expired)",
                decoded - inserted,
                decoded
            );
        }
        Ok(inserted)
    }

    // == File Helpers ==
    /// Saves to a newly created (or truncated) file with the given codec.
    pub fn save_to_file<P, C>(&self, path: P, codec: &mut C) -> Result<usize>
    where
        P: AsRef<Path>,
        C: RecordCodec<V>,
    {
        let path = path.as_ref();
        let written = self.save(File::create(path)?, codec)?;
        info!("Saved {} entries to {:?}", written, path);
        Ok(written)
    }

    /// Loads from an existing file with the given codec.
    pub fn load_from_file<P, C>(&self, path: P, codec: &mut C) -> Result<usize>
    where
        P: AsRef<Path>,
        C: RecordCodec<V>,
    {
        let path = path.as_ref();
        let inserted = self.load(File::open(path)?, codec)?;
        info!("Loaded {} entries from {:?}", inserted, path);
        Ok(inserted)
    }

    /// Saves to a file using [`BincodeCodec`].
    pub fn save_file<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        self.save_to_file(path, &mut BincodeCodec)
    }

    /// Loads from a file written by [`CacheStore::save_file`].
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        self.load_from_file(path, &mut BincodeCodec)
    }

    // == Constructors ==
    /// Builds a cache from `config` and fills it from `reader`.
    pub fn from_reader<R, C>(config: &CacheConfig, reader: R, codec: &mut C) -> Result<Self>
    where
        R: Read,
        C: RecordCodec<V>,
    {
        let cache = Self::from_config(config);
        cache.load(reader, codec)?;
        Ok(cache)
    }

    /// Builds a cache from `config` and fills it from a [`BincodeCodec`] file.
    pub fn from_file<P: AsRef<Path>>(config: &CacheConfig, path: P) -> Result<Self> {
        let cache = Self::from_config(config);
        cache.load_file(path)?;
        Ok(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use std::io::Cursor;
    use std::time::Duration;

    #[test]
    fn test_save_and_load_stream() {
        let source = CacheStore::new(10);
        source.set("a", 1u32);
        source.set("b", 2u32);

        let mut buf = Vec::new();
        assert_eq!(source.save(&mut buf, &mut BincodeCodec).unwrap(), 2);

        let target: CacheStore<u32> = CacheStore::new(10);
        assert_eq!(target.load(Cursor::new(buf), &mut BincodeCodec).unwrap(), 2);
        assert_eq!(target.get("a"), Some(1));
        assert_eq!(target.get("b"), Some(2));
    }

    #[test]
    fn test_load_preserves_recency_order() {
        let source = CacheStore::new(10);
        source.set("a", 1);
        source.set("b", 2);
        source.set("c", 3);
        source.get("a");

        let mut buf = Vec::new();
        source.save(&mut buf, &mut JsonLinesCodec).unwrap();
        let target: CacheStore<i32> = CacheStore::new(10);
        target.load(buf.as_slice(), &mut JsonLinesCodec).unwrap();

        let keys: Vec<_> = target.iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_load_does_not_overwrite() {
        let source = CacheStore::new(10);
        source.set("shared", "from snapshot".to_string());
        source.set("extra", "restored".to_string());
        let mut buf = Vec::new();
        source.save(&mut buf, &mut BincodeCodec).unwrap();

        let target = CacheStore::new(10);
        target.set("shared", "live".to_string());
        assert_eq!(target.load(buf.as_slice(), &mut BincodeCodec).unwrap(), 1);

        assert_eq!(target.get("shared"), Some("live".to_string()));
        assert_eq!(target.get("extra"), Some("restored".to_string()));
    }

    #[test]
    fn test_load_keeps_deadlines() {
        let source = CacheStore::with_params(10, 1, Some(Duration::from_secs(60)));
        source.set("k", 1);
        let deadline = source.get_entry("k").unwrap().expiration;
        let mut buf = Vec::new();
        source.save(&mut buf, &mut BincodeCodec).unwrap();

        let target: CacheStore<i32> = CacheStore::new(10);
        target.load(buf.as_slice(), &mut BincodeCodec).unwrap();
        let restored = target.iter().next().unwrap();
        assert_eq!(restored.expiration, deadline);
    }

    #[test]
    fn test_load_stops_on_corrupt_record() {
        let source = CacheStore::new(10);
        source.set("a", 1);
        let mut buf = Vec::new();
        source.save(&mut buf, &mut JsonLinesCodec).unwrap();
        buf.extend_from_slice(b"garbage\n");

        let target: CacheStore<i32> = CacheStore::new(10);
        let err = target.load(buf.as_slice(), &mut JsonLinesCodec).unwrap_err();
        assert!(matches!(err, CacheError::Decode(_)));
        assert_eq!(target.get("a"), Some(1));
    }

    #[test]
    fn test_load_forged_key_length_is_decode_error() {
        let mut bytes = (1u64 << 40).to_le_bytes().to_vec();
        bytes.extend_from_slice(b"abc");

        let cache: CacheStore<i32> = CacheStore::new(10);
        let err = cache.load(bytes.as_slice(), &mut BincodeCodec).unwrap_err();
        assert!(matches!(err, CacheError::Decode(_)), "got {:?}", err);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let cache: CacheStore<i32> = CacheStore::new(10);
        let err = cache
            .load_file("/nonexistent/dir/snapshot.bin")
            .unwrap_err();
        assert!(matches!(err, CacheError::Io(_)));
    }

    #[test]
    fn test_save_unencodable_value_returns_error() {
        use std::collections::HashMap;

        let cache = CacheStore::new(10);
        let mut value = HashMap::new();
        value.insert(vec![1u8], 1);
        cache.set("bad", value);

        let mut buf = Vec::new();
        let err = cache.save(&mut buf, &mut JsonLinesCodec).unwrap_err();
        assert!(matches!(err, CacheError::Encode(_)));
    }
}
