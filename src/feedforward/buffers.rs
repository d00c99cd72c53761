use rayon::prelude::*;

use super::topology::Topology;

/// Per-layer value arena, allocated once and mutated in place for every sample.
///
/// Each layer owns `layer_size + 1` slots, the trailing one belongs to the bias unit.
/// `Net` keeps activations here (bias slot pinned to `1.0`),
/// `Trainer` keeps error deltas (bias slot computed but never consumed).
#[derive(Debug, Clone)]
pub struct LayerBuffers {
    layers: Box<[Box<[f64]>]>,
}

impl LayerBuffers {
    /// Allocates buffers for every layer of `topology` with `bias` written to each bias slot.
    pub fn new(topology: &Topology, bias: f64) -> LayerBuffers {
        let layers = topology
            .layers()
            .iter()
            .map(|&size| {
                let mut layer = vec![0.0; size + 1];
                layer[size] = bias;
                layer.into_boxed_slice()
            })
            .collect();

        LayerBuffers { layers }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Whole layer, bias slot included.
    pub fn layer(&self, index: usize) -> &[f64] {
        &self.layers[index]
    }

    /// Layer values without the bias slot.
    pub fn neurons(&self, index: usize) -> &[f64] {
        let layer = &self.layers[index];
        &layer[..layer.len() - 1]
    }

    /// Mutable neuron values of a layer, bias slot excluded so it can't be overwritten.
    pub fn neurons_mut(&mut self, index: usize) -> &mut [f64] {
        let layer = &mut self.layers[index];
        let len = layer.len();
        &mut layer[..len - 1]
    }

    pub fn last(&self) -> &[f64] {
        self.neurons(self.layers.len() - 1)
    }

    /// Splits out layer `index` for reading and layer `index + 1` for writing (bias excluded).
    pub(crate) fn forward_pair(&mut self, index: usize) -> (&[f64], &mut [f64]) {
        let (head, tail) = self.layers.split_at_mut(index + 1);
        let next = &mut tail[0];
        let len = next.len();
        (&head[index], &mut next[..len - 1])
    }

    /// Splits out layer `index` for writing (bias included) and layer `index + 1` for reading.
    pub(crate) fn backward_pair(&mut self, index: usize) -> (&mut [f64], &[f64]) {
        let (head, tail) = self.layers.split_at_mut(index + 1);
        (&mut head[index], &tail[0])
    }
}

/// Writes `f(j)` into every `out[j]`.
///
/// Cells are independent, so with `parallel` set they are spread over the rayon pool.
/// Returns once every cell is written, which is the barrier before the next layer.
pub(crate) fn fill_indexed<F>(out: &mut [f64], parallel: bool, f: F)
where
    F: Fn(usize) -> f64 + Sync + Send,
{
    if parallel {
        out.par_iter_mut()
            .enumerate()
            .for_each(|(j, cell)| *cell = f(j));
    } else {
        for (j, cell) in out.iter_mut().enumerate() {
            *cell = f(j);
        }
    }
}

/// Calls `f(i, row)` for every `columns`-wide row of a row-major matrix.
pub(crate) fn for_each_row<F>(values: &mut [f64], columns: usize, parallel: bool, f: F)
where
    F: Fn(usize, &mut [f64]) + Sync + Send,
{
    if parallel {
        values
            .par_chunks_mut(columns)
            .enumerate()
            .for_each(|(i, row)| f(i, row));
    } else {
        for (i, row) in values.chunks_mut(columns).enumerate() {
            f(i, row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bias_slots_are_allocated() {
        let topology = Topology::new(&[3, 2]).unwrap();
        let buffers = LayerBuffers::new(&topology, 1.0);

        assert_eq!(buffers.len(), 2);
        assert_eq!(buffers.layer(0), &[0.0, 0.0, 0.0, 1.0]);
        assert_eq!(buffers.neurons(1), &[0.0, 0.0]);
        assert_eq!(buffers.layer(1)[2], 1.0);
    }

    #[test]
    fn neurons_mut_leaves_bias_alone() {
        let topology = Topology::new(&[2, 2]).unwrap();
        let mut buffers = LayerBuffers::new(&topology, 1.0);

        for value in buffers.neurons_mut(0) {
            *value = 5.0;
        }
        let (_, next) = buffers.forward_pair(0);
        assert_eq!(next.len(), 2);
        assert_eq!(buffers.layer(0), &[5.0, 5.0, 1.0]);
    }

    #[test]
    fn parallel_and_sequential_fill_agree() {
        let mut a = vec![0.0; 257];
        let mut b = vec![0.0; 257];
        fill_indexed(&mut a, true, |j| (j as f64).sin());
        fill_indexed(&mut b, false, |j| (j as f64).sin());
        assert_eq!(a, b);
    }

    #[test]
    fn rows_are_visited_once() {
        let mut values = vec![1.0; 12];
        for_each_row(&mut values, 4, true, |i, row| {
            for cell in row.iter_mut() {
                *cell += i as f64;
            }
        });
        assert_eq!(&values[..4], &[1.0; 4]);
        assert_eq!(&values[8..], &[3.0; 4]);
    }
}
