//! Binary weight file.
//!
//! Little-endian, laid out as:
//! ```text
//! i32              layers count N
//! i32[N]           layer sizes, bias excluded
//! i32              layer pairs count (N - 1)
//! N - 1 times:
//!     i32          rows (source layer size + 1)
//!     i32          columns (destination layer size)
//!     f64[rows * columns]  row-major weights
//! ```
//! Loading validates the whole file against the live topology before writing a single weight.

use std::{
    convert::TryInto,
    error, fmt, fs, io,
    path::{Path, PathBuf},
};

use super::weights::WeightStore;

/// Serializes topology and weights.
pub fn encode(weights: &WeightStore) -> Vec<u8> {
    let layers = weights.topology().layers();
    let values_count: usize = weights.matrices().iter().map(|m| m.values().len()).sum();
    let header_count = 2 + layers.len() + 2 * weights.matrices().len();
    let mut bytes = Vec::with_capacity(4 * header_count + 8 * values_count);

    bytes.extend_from_slice(&(layers.len() as i32).to_le_bytes());
    for &size in layers {
        bytes.extend_from_slice(&(size as i32).to_le_bytes());
    }

    bytes.extend_from_slice(&(weights.matrices().len() as i32).to_le_bytes());
    for matrix in weights.matrices() {
        bytes.extend_from_slice(&(matrix.rows() as i32).to_le_bytes());
        bytes.extend_from_slice(&(matrix.columns() as i32).to_le_bytes());
        for value in matrix.values() {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
    }

    bytes
}

/// Reads `bytes` into `weights`.
///
/// # Returns
/// * `Ok(())` if the file describes exactly the store's topology;
/// * `Err(LoadError)` otherwise, `weights` are left as they were.
pub fn decode_into(weights: &mut WeightStore, bytes: &[u8]) -> Result<(), LoadError> {
    let mut reader = Reader { bytes, position: 0 };
    let layers = weights.topology().layers();

    let layers_count = reader.read_i32()?;
    if layers_count != layers.len() as i32 {
        return Err(LoadError::StructureMismatch(Mismatch::LayersCount {
            expected: layers.len(),
            got: layers_count,
        }));
    }

    let mut sizes = Vec::with_capacity(layers.len());
    for _ in 0..layers.len() {
        sizes.push(reader.read_i32()?);
    }
    if sizes.iter().zip(layers.iter()).any(|(&got, &expected)| got != expected as i32) {
        return Err(LoadError::StructureMismatch(Mismatch::LayerSizes {
            expected: layers.to_vec(),
            got: sizes,
        }));
    }

    let pairs_count = reader.read_i32()?;
    if pairs_count != weights.matrices().len() as i32 {
        return Err(LoadError::StructureMismatch(Mismatch::PairsCount {
            expected: weights.matrices().len(),
            got: pairs_count,
        }));
    }

    // Everything is staged first so that a bad file leaves the live weights intact
    let mut staged = Vec::with_capacity(weights.matrices().len());
    for (pair, matrix) in weights.matrices().iter().enumerate() {
        let rows = reader.read_i32()?;
        let columns = reader.read_i32()?;
        if rows != matrix.rows() as i32 || columns != matrix.columns() as i32 {
            return Err(LoadError::StructureMismatch(Mismatch::PairShape {
                pair,
                expected: (matrix.rows(), matrix.columns()),
                got: (rows, columns),
            }));
        }

        let mut values = Vec::with_capacity(matrix.values().len());
        for _ in 0..matrix.values().len() {
            values.push(reader.read_f64()?);
        }
        staged.push(values);
    }

    let remaining = bytes.len() - reader.position;
    if remaining > 0 {
        return Err(LoadError::TrailingBytes(remaining));
    }

    for (matrix, values) in weights.matrices_mut().iter_mut().zip(staged) {
        matrix.values_mut().copy_from_slice(&values);
    }
    Ok(())
}

/// Writes `weights` to a file at `path`, replacing it if it exists.
pub fn save<P: AsRef<Path>>(weights: &WeightStore, path: P) -> io::Result<()> {
    fs::write(path, encode(weights))
}

/// Reads weights from a file at `path`, see `decode_into`.
pub fn load<P: AsRef<Path>>(weights: &mut WeightStore, path: P) -> Result<(), LoadError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => LoadError::FileNotFound(path.to_owned()),
        _ => LoadError::Io(e),
    })?;
    decode_into(weights, &bytes)
}

struct Reader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], LoadError> {
        let end = self.position + N;
        let chunk = self.bytes.get(self.position..end).ok_or(LoadError::Truncated {
            needed: end,
            got: self.bytes.len(),
        })?;
        self.position = end;
        // `get` returned exactly N bytes
        Ok(chunk.try_into().unwrap_or([0; N]))
    }

    fn read_i32(&mut self) -> Result<i32, LoadError> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    fn read_f64(&mut self) -> Result<f64, LoadError> {
        Ok(f64::from_le_bytes(self.take()?))
    }
}

/// Which part of a weight file disagrees with the live network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    LayersCount {
        expected: usize,
        got: i32,
    },
    LayerSizes {
        expected: Vec<usize>,
        got: Vec<i32>,
    },
    PairsCount {
        expected: usize,
        got: i32,
    },
    PairShape {
        pair: usize,
        expected: (usize, usize),
        got: (i32, i32),
    },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self {
            Mismatch::LayersCount { expected, got } => {
                write!(f, "expected {} layers, but file has {}", expected, got)
            }
            Mismatch::LayerSizes { expected, got } => write!(
                f,
                "expected layer sizes {:?}, but file has {:?}",
                expected, got
            ),
            Mismatch::PairsCount { expected, got } => write!(
                f,
                "expected {} weight matrices, but file has {}",
                expected, got
            ),
            Mismatch::PairShape {
                pair,
                expected,
                got,
            } => write!(
                f,
                "expected {}x{} weights for layer pair {}, but file has {}x{}",
                expected.0, expected.1, pair, got.0, got.1
            ),
        }
    }
}

/// Error structure for weight loading
#[derive(Debug)]
pub enum LoadError {
    FileNotFound(PathBuf),
    Io(io::Error),
    StructureMismatch(Mismatch),
    Truncated { needed: usize, got: usize },
    TrailingBytes(usize),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self {
            LoadError::FileNotFound(path) => {
                write!(f, "Weights file {} not found!", path.display())
            }
            LoadError::Io(e) => write!(f, "Failed to read weights file: {}!", e),
            LoadError::StructureMismatch(mismatch) => {
                write!(f, "Network structure differs from the file: {}!", mismatch)
            }
            LoadError::Truncated { needed, got } => write!(
                f,
                "Weights file is truncated: needed at least {} bytes, but got {}!",
                needed, got
            ),
            LoadError::TrailingBytes(count) => {
                write!(f, "Weights file has {} unexpected trailing bytes!", count)
            }
        }
    }
}

impl error::Error for LoadError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            LoadError::Io(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedforward::Topology;
    use rand::{rngs::StdRng, SeedableRng};

    fn store(layers: &[usize], seed: u64) -> WeightStore {
        WeightStore::random(
            Topology::new(layers).unwrap(),
            &mut StdRng::seed_from_u64(seed),
        )
    }

    #[test]
    fn layout_is_little_endian() {
        let mut weights = WeightStore::zeroed(Topology::new(&[1, 2]).unwrap());
        weights.set(0, 1, 1, 1.5).unwrap();
        let bytes = encode(&weights);

        assert_eq!(bytes.len(), 4 + 2 * 4 + 4 + 2 * 4 + 4 * 8);
        assert_eq!(&bytes[..4], &[2, 0, 0, 0]);
        assert_eq!(&bytes[4..12], &[1, 0, 0, 0, 2, 0, 0, 0]);
        assert_eq!(&bytes[12..16], &[1, 0, 0, 0]);
        assert_eq!(&bytes[16..24], &[2, 0, 0, 0, 2, 0, 0, 0]);
        assert_eq!(&bytes[48..56], &1.5f64.to_le_bytes());
    }

    #[test]
    fn decode_restores_every_weight() {
        for layers in [&[1, 1][..], &[3, 5, 2], &[7, 4, 4, 3]].iter() {
            let original = store(layers, 17);
            let mut decoded = store(layers, 18);
            assert_ne!(original, decoded);

            decode_into(&mut decoded, &encode(&original)).unwrap();
            assert_eq!(original, decoded);
        }
    }

    #[test]
    fn mismatched_topology_is_rejected_untouched() {
        let bytes = encode(&store(&[4, 3, 2], 1));

        let mut fewer = store(&[4, 2], 2);
        let before = fewer.clone();
        assert!(matches!(
            decode_into(&mut fewer, &bytes),
            Err(LoadError::StructureMismatch(Mismatch::LayersCount { expected: 2, got: 3 }))
        ));
        assert_eq!(fewer, before);

        let mut narrower = store(&[4, 5, 2], 3);
        let before = narrower.clone();
        assert!(matches!(
            decode_into(&mut narrower, &bytes),
            Err(LoadError::StructureMismatch(Mismatch::LayerSizes { .. }))
        ));
        assert_eq!(narrower, before);
    }

    #[test]
    fn bad_pair_shape_is_rejected_untouched() {
        let original = store(&[2, 2, 2], 4);
        let mut bytes = encode(&original);
        // Second pair header sits after the header, the first pair header and its 3x2 weights
        let second = 4 + 3 * 4 + 4 + 8 + 6 * 8;
        bytes[second..second + 4].copy_from_slice(&4i32.to_le_bytes());

        let mut target = store(&[2, 2, 2], 5);
        let before = target.clone();
        match decode_into(&mut target, &bytes) {
            Err(LoadError::StructureMismatch(Mismatch::PairShape { pair, got, .. })) => {
                assert_eq!(pair, 1);
                assert_eq!(got, (4, 2));
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(target, before);
    }

    #[test]
    fn truncated_and_padded_files_are_rejected() {
        let original = store(&[3, 2], 6);
        let bytes = encode(&original);
        let mut target = store(&[3, 2], 7);
        let before = target.clone();

        assert!(matches!(
            decode_into(&mut target, &bytes[..bytes.len() - 3]),
            Err(LoadError::Truncated { .. })
        ));
        assert_eq!(target, before);

        let mut padded = bytes.clone();
        padded.push(0);
        assert!(matches!(
            decode_into(&mut target, &padded),
            Err(LoadError::TrailingBytes(1))
        ));
        assert_eq!(target, before);
    }

    #[test]
    fn saved_file_holds_encoded_bytes() {
        let weights = store(&[3, 4, 2], 9);
        let path = std::env::temp_dir().join(format!("toponet-codec-{}.bin", std::process::id()));
        save(&weights, &path).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes, encode(&weights));
        assert_eq!(bytes.len(), 4 * (1 + 3 + 1 + 2 * 2) + 8 * (4 * 4 + 5 * 2));

        let mut loaded = store(&[3, 4, 2], 10);
        load(&mut loaded, &path).unwrap();
        assert_eq!(loaded, weights);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_reported() {
        let mut target = store(&[2, 2], 8);
        let path = std::env::temp_dir().join("toponet-codec-missing.bin");
        let _ = fs::remove_file(&path);
        assert!(matches!(load(&mut target, &path), Err(LoadError::FileNotFound(p)) if p == path));
    }
}
