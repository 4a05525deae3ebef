//! Compression-based complexity
//!
//! Compressed size approximates Kolmogorov complexity, so:
//! - `compression_ratio` = `|C(s)| / |s|` measures information density
//! - `ncd` = `(C(ab) − min(C(a), C(b))) / max(C(a), C(b))` measures similarity
//!
//! Inputs under [`MIN_SIZE_THRESHOLD`] bytes compress too poorly to say
//! anything and score 0.0.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use bzip2::write::BzEncoder;
use flate2::write::{GzEncoder, ZlibEncoder};

use super::{MathError, MathResult};

/// Below this many bytes ratios and distances are unreliable.
pub const MIN_SIZE_THRESHOLD: usize = 512;

/// Level used for similarity measurements.
const NCD_LEVEL: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionAlgorithm {
    #[default]
    Zlib,
    Gzip,
    Bzip2,
}

impl FromStr for CompressionAlgorithm {
    type Err = MathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zlib" => Ok(Self::Zlib),
            "gzip" => Ok(Self::Gzip),
            "bzip2" | "bz2" => Ok(Self::Bzip2),
            other => Err(MathError::UnknownAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zlib => write!(f, "zlib"),
            Self::Gzip => write!(f, "gzip"),
            Self::Bzip2 => write!(f, "bzip2"),
        }
    }
}

/// Size in bytes of `data` compressed with `algorithm` at `level` (0-9).
pub fn compressed_size(data: &[u8], algorithm: CompressionAlgorithm, level: u32) -> MathResult<usize> {
    let level = level.min(9);
    let compressed = match algorithm {
        CompressionAlgorithm::Zlib => {
            let mut enc = ZlibEncoder::new(Vec::new(), flate2::Compression::new(level));
            enc.write_all(data).map_err(|e| MathError::Compression(e.to_string()))?;
            enc.finish()
        }
        CompressionAlgorithm::Gzip => {
            let mut enc = GzEncoder::new(Vec::new(), flate2::Compression::new(level));
            enc.write_all(data).map_err(|e| MathError::Compression(e.to_string()))?;
            enc.finish()
        }
        CompressionAlgorithm::Bzip2 => {
            // bzip2 block sizes run 1-9
            let mut enc = BzEncoder::new(Vec::new(), bzip2::Compression::new(level.max(1)));
            enc.write_all(data).map_err(|e| MathError::Compression(e.to_string()))?;
            enc.finish()
        }
    }
    .map_err(|e| MathError::Compression(e.to_string()))?;
    Ok(compressed.len())
}

/// Compression ratio in `[0, 1]`, level 9.
///
/// | ratio      | reading                           |
/// |------------|-----------------------------------|
/// | < 0.20     | highly repetitive, maybe duplicated |
/// | 0.20-0.45  | normal source code                |
/// | 0.45-0.65  | dense                             |
/// | > 0.65     | very dense or already compressed  |
///
/// Under the size threshold → 0.0; inflation → 1.0.
pub fn compression_ratio(data: &[u8], algorithm: CompressionAlgorithm) -> MathResult<f64> {
    if data.len() < MIN_SIZE_THRESHOLD {
        return Ok(0.0);
    }
    let size = compressed_size(data, algorithm, 9)?;
    if size >= data.len() {
        return Ok(1.0);
    }
    Ok(size as f64 / data.len() as f64)
}

/// Normalized compression distance. Either input under the size threshold
/// yields 0.0.
///
/// `ncd(x, x)` is near 0 only up to the compressor's fixed overhead: about
/// 0.1 for zlib and gzip on a few KB of source, up to 0.2 for bzip2, whose
/// block headers and Huffman tables do not shrink with repetition.
pub fn ncd(a: &[u8], b: &[u8], algorithm: CompressionAlgorithm) -> MathResult<f64> {
    if a.len() < MIN_SIZE_THRESHOLD || b.len() < MIN_SIZE_THRESHOLD {
        return Ok(0.0);
    }
    raw_ncd(a, b, algorithm)
}

/// NCD without the size threshold. Empty input is maximally distant (1.0).
///
/// Clone detection uses this so that small files are compared rather than
/// all scoring as identical.
pub fn raw_ncd(a: &[u8], b: &[u8], algorithm: CompressionAlgorithm) -> MathResult<f64> {
    if a.is_empty() || b.is_empty() {
        return Ok(1.0);
    }
    let c_a = compressed_size(a, algorithm, NCD_LEVEL)?;
    let c_b = compressed_size(b, algorithm, NCD_LEVEL)?;
    let mut joined = Vec::with_capacity(a.len() + b.len());
    joined.extend_from_slice(a);
    joined.extend_from_slice(b);
    let c_ab = compressed_size(&joined, algorithm, NCD_LEVEL)?;

    let max_c = c_a.max(c_b);
    if max_c == 0 {
        return Ok(1.0);
    }
    let value = (c_ab as f64 - c_a.min(c_b) as f64) / max_c as f64;
    Ok(value.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_like(seed: &str, lines: usize) -> Vec<u8> {
        (0..lines)
            .map(|i| format!("def {seed}_{i}(value):\n    return value * {i} + len('{seed}')\n"))
            .collect::<String>()
            .into_bytes()
    }

    fn pseudo_random(len: usize, mut state: u64) -> Vec<u8> {
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                (state >> 33) as u8
            })
            .collect()
    }

    #[test]
    fn test_unknown_algorithm() {
        let result = "lzma".parse::<CompressionAlgorithm>();
        assert!(matches!(result, Err(MathError::UnknownAlgorithm(_))));
        assert_eq!("BZIP2".parse::<CompressionAlgorithm>().unwrap(), CompressionAlgorithm::Bzip2);
    }

    #[test]
    fn test_small_content_is_zero() {
        let small = b"print('hello')";
        assert_eq!(compression_ratio(small, CompressionAlgorithm::Zlib).unwrap(), 0.0);
        assert_eq!(ncd(small, small, CompressionAlgorithm::Zlib).unwrap(), 0.0);
    }

    #[test]
    fn test_ratio_in_unit_interval() {
        let data = source_like("parse", 40);
        for algo in [CompressionAlgorithm::Zlib, CompressionAlgorithm::Gzip, CompressionAlgorithm::Bzip2] {
            let r = compression_ratio(&data, algo).unwrap();
            assert!(r > 0.0 && r < 1.0, "{algo}: {r}");
        }
    }

    #[test]
    fn test_random_bytes_inflate_to_one() {
        let data = pseudo_random(600, 7);
        assert_eq!(compression_ratio(&data, CompressionAlgorithm::Zlib).unwrap(), 1.0);
    }

    #[test]
    fn test_ncd_self_near_zero() {
        let a = source_like("render", 40);
        assert!(ncd(&a, &a, CompressionAlgorithm::Zlib).unwrap() < 0.2);
    }

    #[test]
    fn test_ncd_self_distance_per_algorithm() {
        let a = source_like("render", 40);
        let b = source_like("storage", 35);
        let cases = [
            (CompressionAlgorithm::Zlib, 0.2),
            (CompressionAlgorithm::Gzip, 0.2),
            (CompressionAlgorithm::Bzip2, 0.35),
        ];
        for (algo, tolerance) in cases {
            let same = ncd(&a, &a, algo).unwrap();
            let other = ncd(&a, &b, algo).unwrap();
            assert!(same < tolerance, "{algo}: ncd(a, a) = {same}");
            assert!(same < other, "{algo}: {same} vs {other}");
        }
    }

    #[test]
    fn test_ncd_symmetric() {
        let a = source_like("render", 40);
        let b = source_like("storage", 35);
        let ab = ncd(&a, &b, CompressionAlgorithm::Zlib).unwrap();
        let ba = ncd(&b, &a, CompressionAlgorithm::Zlib).unwrap();
        assert!((ab - ba).abs() < 0.05);
    }

    #[test]
    fn test_ncd_unrelated_larger_than_similar() {
        let a = source_like("render", 40);
        let noise = pseudo_random(2000, 99);
        let same = ncd(&a, &a, CompressionAlgorithm::Zlib).unwrap();
        let different = ncd(&a, &noise, CompressionAlgorithm::Zlib).unwrap();
        assert!(different > same);
    }

    #[test]
    fn test_raw_ncd_empty_is_one() {
        assert_eq!(raw_ncd(b"", b"abc", CompressionAlgorithm::Zlib).unwrap(), 1.0);
    }
}
