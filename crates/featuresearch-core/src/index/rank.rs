//! Relevance ranking over FTS4 `matchinfo()` statistics.
//!
//! `matchinfo(search)` with the default `pcx` format returns a blob of
//! native-endian u32 words: the phrase count, the column count, then one
//! triple per (phrase, column) pair:
//! `(hits in this row, hits in all rows, rows with at least one hit)`.

use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::Connection;

use crate::Result;

/// Number of leading global words (phrase count, column count).
const GLOBAL_WORDS: usize = 2;

/// Name of the SQL function registered on query connections.
pub const RANK_FUNCTION: &str = "rank";

/// Decode a matchinfo blob into u32 words. Trailing partial words are ignored.
pub fn decode_matchinfo(blob: &[u8]) -> Vec<u32> {
    blob.chunks_exact(4)
        .map(|word| u32::from_ne_bytes([word[0], word[1], word[2], word[3]]))
        .collect()
}

/// Score one matched row.
///
/// Each (phrase, column) triple is paired with the weight at the same
/// position and contributes `hits_in_row * weight / docs_with_hits`.
/// Positions past the end of `weights` are ignored, and a triple with
/// `docs_with_hits == 0` contributes nothing.
pub fn rank(matchinfo: &[u32], weights: &[f64]) -> f64 {
    matchinfo
        .get(GLOBAL_WORDS..)
        .unwrap_or_default()
        .chunks_exact(3)
        .zip(weights)
        .filter(|(triple, _)| triple[2] != 0)
        .map(|(triple, weight)| f64::from(triple[0]) * weight / f64::from(triple[2]))
        .sum()
}

/// Register `rank(matchinfo_blob)` on a connection with the given weights.
pub fn register_rank_function(conn: &Connection, weights: &[f64]) -> Result<()> {
    let weights = weights.to_vec();
    conn.create_scalar_function(
        RANK_FUNCTION,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        move |ctx| match ctx.get_raw(0) {
            ValueRef::Blob(blob) => Ok(rank(&decode_matchinfo(blob), &weights)),
            ValueRef::Null => Ok(0.0),
            _ => Err(rusqlite::Error::UserFunctionError(
                "rank() expects a matchinfo blob".into(),
            )),
        },
    )?;
    Ok(())
}
