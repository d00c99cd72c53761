use rand::{distributions::Uniform, prelude::Distribution, Rng};
use std::{error, fmt};

use super::topology::Topology;

/// Weights between two adjacent layers.
///
/// Stored row-major: row `i` holds the weights going out of source neuron `i`
/// (the last row belongs to the bias unit), column `j` is the destination neuron.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    columns: usize,
    values: Box<[f64]>,
}

impl Matrix {
    fn zeroed(rows: usize, columns: usize) -> Matrix {
        Matrix {
            rows,
            columns,
            values: vec![0.0; rows * columns].into_boxed_slice(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        if row < self.rows && column < self.columns {
            Some(self.values[row * self.columns + column])
        } else {
            None
        }
    }

    /// Raw row-major values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Weight from source neuron `row` to destination neuron `column`, unchecked.
    #[inline]
    pub(crate) fn at(&self, row: usize, column: usize) -> f64 {
        self.values[row * self.columns + column]
    }
}

/// Owns one weight matrix per adjacent layer pair.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightStore {
    topology: Topology,
    matrices: Box<[Matrix]>,
}

impl WeightStore {
    /// Returns store for given topology with every weight set to zero.
    pub fn zeroed(topology: Topology) -> WeightStore {
        let matrices = (0..topology.pairs_count())
            .map(|pair| {
                let (rows, columns) = topology.pair_shape(pair);
                Matrix::zeroed(rows, columns)
            })
            .collect();

        WeightStore { topology, matrices }
    }

    /// Returns store for given topology with random weights.
    ///
    /// Each weight of a pair with `inputs` rows (bias row included) is drawn independently from
    /// the uniform range `[-1/sqrt(inputs), 1/sqrt(inputs)]`, so wide input layers don't saturate
    /// the sigmoid right away. Same `rng` state gives same weights.
    ///
    /// # Examples
    /// ```
    /// # use rand::{rngs::StdRng, SeedableRng};
    /// # use toponet::feedforward::{Topology, WeightStore};
    /// let topology = Topology::new(&[400, 64, 8]).unwrap();
    /// let a = WeightStore::random(topology.clone(), &mut StdRng::seed_from_u64(7));
    /// let b = WeightStore::random(topology, &mut StdRng::seed_from_u64(7));
    /// assert_eq!(a, b);
    /// ```
    pub fn random<R: Rng + ?Sized>(topology: Topology, rng: &mut R) -> WeightStore {
        let mut store = WeightStore::zeroed(topology);

        for matrix in store.matrices.iter_mut() {
            let bound = 1.0 / (matrix.rows as f64).sqrt();
            let weights_between = Uniform::new_inclusive(-bound, bound);
            for weight in matrix.values.iter_mut() {
                *weight = weights_between.sample(rng);
            }
        }

        store
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn matrices(&self) -> &[Matrix] {
        &self.matrices
    }

    pub(crate) fn matrices_mut(&mut self) -> &mut [Matrix] {
        &mut self.matrices
    }

    pub fn matrix(&self, pair: usize) -> Option<&Matrix> {
        self.matrices.get(pair)
    }

    /// Weight from neuron `row` of layer `pair` to neuron `column` of layer `pair + 1`.
    pub fn get(&self, pair: usize, row: usize, column: usize) -> Option<f64> {
        self.matrices.get(pair)?.get(row, column)
    }

    pub fn set(
        &mut self,
        pair: usize,
        row: usize,
        column: usize,
        value: f64,
    ) -> Result<(), WeightIndexError> {
        let error = WeightIndexError { pair, row, column };
        let matrix = self.matrices.get_mut(pair).ok_or(error)?;
        if row >= matrix.rows || column >= matrix.columns {
            return Err(error);
        }
        matrix.values[row * matrix.columns + column] = value;
        Ok(())
    }
}

/// Error structure for `WeightStore::set`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightIndexError {
    pub pair: usize,
    pub row: usize,
    pub column: usize,
}

impl fmt::Display for WeightIndexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "There is no weight [{}][{}] in layer pair {}!",
            self.row, self.column, self.pair
        )
    }
}

impl error::Error for WeightIndexError {}
