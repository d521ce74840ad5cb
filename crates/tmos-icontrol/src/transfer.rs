// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of TMOS Rollout.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Chunked file transfer helpers
//!
//! The file-transfer endpoints (`/mgmt/cm/autodeploy/software-image-uploads`,
//! `/mgmt/shared/file-transfer/...`) reject large bodies, so files move in
//! fixed-size chunks described by a `Content-Range: start-end/total` header
//! with an inclusive `end`.

/// Chunk size accepted by the file-transfer workers
pub const CHUNK_SIZE: u64 = 512 * 1024;

/// Inclusive byte range of the chunk starting at `start`
pub fn chunk_bounds(start: u64, total: u64) -> (u64, u64) {
    let end = (start + CHUNK_SIZE).min(total).saturating_sub(1);
    (start, end.max(start))
}

pub fn content_range(start: u64, end: u64, total: u64) -> String {
    format!("{start}-{end}/{total}")
}

/// Parse a `Content-Range` header value; the optional `bytes ` unit prefix is accepted
pub fn parse_content_range(header: &str) -> Option<(u64, u64, u64)> {
    let value = header.trim();
    let value = value.strip_prefix("bytes ").unwrap_or(value);
    let (range, total) = value.split_once('/')?;
    let (start, end) = range.split_once('-')?;
    Some((
        start.trim().parse().ok()?,
        end.trim().parse().ok()?,
        total.trim().parse().ok()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_bounds_full_chunk() {
        assert_eq!(chunk_bounds(0, 2 * CHUNK_SIZE), (0, CHUNK_SIZE - 1));
        assert_eq!(
            chunk_bounds(CHUNK_SIZE, 2 * CHUNK_SIZE),
            (CHUNK_SIZE, 2 * CHUNK_SIZE - 1)
        );
    }

    #[test]
    fn test_chunk_bounds_short_tail() {
        assert_eq!(chunk_bounds(CHUNK_SIZE, CHUNK_SIZE + 10), (CHUNK_SIZE, CHUNK_SIZE + 9));
        assert_eq!(chunk_bounds(0, 1), (0, 0));
    }

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range("0-524287/1048576"), Some((0, 524287, 1048576)));
        assert_eq!(parse_content_range("bytes 10-19/20"), Some((10, 19, 20)));
        assert_eq!(parse_content_range("garbage"), None);
        assert_eq!(parse_content_range("0-a/10"), None);
    }

    #[test]
    fn test_content_range_format() {
        assert_eq!(content_range(0, 99, 100), "0-99/100");
    }
}
