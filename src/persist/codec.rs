//! Record codecs
//!
//! A codec writes one [`Entry`] per record and reads them back, telling a
//! clean end of stream (`Ok(None)`) apart from a broken record (`Err`).
//!
//! Value types are "registered" through the `Serialize + DeserializeOwned`
//! bounds, so an unsupported type is a compile error rather than a runtime
//! one. Values whose serializer fails at runtime surface as
//! [`CacheError::Encode`].

use std::io::{self, BufRead, Write};

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::Entry;
use crate::error::{CacheError, Result};

// == Record Codec ==
/// Stream format for persisted cache entries.
pub trait RecordCodec<V> {
    /// Appends one record to `writer`.
    fn encode<W: Write>(&mut self, writer: &mut W, entry: &Entry<V>) -> Result<()>;

    /// Reads the next record, or `Ok(None)` at end of stream.
    fn decode<R: BufRead>(&mut self, reader: &mut R) -> Result<Option<Entry<V>>>;
}

// == Bincode ==
/// Largest single record the binary codec will write or read.
pub const MAX_RECORD_BYTES: u64 = 64 * 1024 * 1024;

/// Compact binary records laid back to back.
///
/// Length prefixes are checked against [`MAX_RECORD_BYTES`] before anything
/// is allocated, so a corrupt stream fails with [`CacheError::Decode`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

/// Fixed-width integers with trailing bytes allowed, the layout of
/// `bincode::serialize`, plus a per-record size limit.
fn record_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(MAX_RECORD_BYTES)
}

impl<V> RecordCodec<V> for BincodeCodec
where
    V: Serialize + DeserializeOwned,
{
    fn encode<W: Write>(&mut self, writer: &mut W, entry: &Entry<V>) -> Result<()> {
        record_options()
            .serialize_into(writer, entry)
            .map_err(|e| match *e {
                bincode::ErrorKind::Io(err) => CacheError::Io(err),
                other => CacheError::Encode(other.to_string()),
            })
    }

    fn decode<R: BufRead>(&mut self, reader: &mut R) -> Result<Option<Entry<V>>> {
        // Exhausted exactly at a record boundary means a clean end.
        if reader.fill_buf()?.is_empty() {
            return Ok(None);
        }
        record_options()
            .deserialize_from(reader)
            .map(Some)
            .map_err(|e| match *e {
                bincode::ErrorKind::Io(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
                    CacheError::Decode("stream ended inside a record".to_string())
                }
                bincode::ErrorKind::Io(err) => CacheError::Io(err),
                bincode::ErrorKind::SizeLimit => CacheError::Decode(format!(
                    "record exceeds the {} byte limit",
                    MAX_RECORD_BYTES
                )),
                other => CacheError::Decode(other.to_string()),
            })
    }
}

// == JSON Lines ==
/// One JSON object per line; blank lines are ignored.
///
/// Works with self-describing values such as `serde_json::Value`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLinesCodec;

impl<V> RecordCodec<V> for JsonLinesCodec
where
    V: Serialize + DeserializeOwned,
{
    fn encode<W: Write>(&mut self, writer: &mut W, entry: &Entry<V>) -> Result<()> {
        // Serialize to a buffer first so a failing value leaves no partial line.
        let mut line = serde_json::to_vec(entry).map_err(|e| {
            if e.is_io() {
                CacheError::Io(e.into())
            } else {
                CacheError::Encode(e.to_string())
            }
        })?;
        line.push(b'\n');
        writer.write_all(&line)?;
        Ok(())
    }

    fn decode<R: BufRead>(&mut self, reader: &mut R) -> Result<Option<Entry<V>>> {
        // Raw bytes, so invalid UTF-8 is reported by the parser, not the reader.
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                return Ok(None);
            }
            if !line.iter().all(u8::is_ascii_whitespace) {
                break;
            }
        }
        serde_json::from_slice(&line)
            .map(Some)
            .map_err(|e| CacheError::Decode(e.to_string()))
    }
}
