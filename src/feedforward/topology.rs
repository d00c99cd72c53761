use std::{error, fmt};

/// Network shape: the number of neurons in each layer, bias units excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    layers: Box<[usize]>,
}

impl Topology {
    /// Returns topology for given layer sizes.
    ///
    /// # Arguments
    /// * `layers` - a number slice that holds a desired number of neurons in each layer,
    /// input layer first and output layer last.
    ///
    /// # Returns
    /// * `Ok(Topology)` if there are at least two layers and none of them is empty;
    /// * `Err(TopologyError)` otherwise.
    ///
    /// # Examples
    /// ```
    /// # use toponet::feedforward::Topology;
    /// let topology = Topology::new(&[400, 128, 32, 8]).unwrap();
    /// assert_eq!(topology.pairs_count(), 3);
    /// assert!(Topology::new(&[400]).is_err());
    /// ```
    pub fn new(layers: &[usize]) -> Result<Topology, TopologyError> {
        if layers.len() < 2 {
            return Err(TopologyError::TooFewLayers(layers.len()));
        }
        if let Some(index) = layers.iter().position(|&size| size == 0) {
            return Err(TopologyError::EmptyLayer(index));
        }

        Ok(Topology {
            layers: layers.to_owned().into_boxed_slice(),
        })
    }

    pub fn layers(&self) -> &[usize] {
        &self.layers
    }

    pub fn layers_count(&self) -> usize {
        self.layers.len()
    }

    /// Number of neurons in layer `index`, bias excluded. Panics if out of range.
    pub fn layer_size(&self, index: usize) -> usize {
        self.layers[index]
    }

    /// Number of adjacent layer pairs, i.e. weight matrices.
    pub fn pairs_count(&self) -> usize {
        self.layers.len() - 1
    }

    pub fn inputs(&self) -> usize {
        self.layers[0]
    }

    pub fn outputs(&self) -> usize {
        self.layers[self.layers.len() - 1]
    }

    /// Shape `(rows, columns)` of the weight matrix between layers `pair` and `pair + 1`.
    /// Rows include the bias unit of the source layer.
    pub fn pair_shape(&self, pair: usize) -> (usize, usize) {
        (self.layers[pair] + 1, self.layers[pair + 1])
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sizes: Vec<String> = self.layers.iter().map(|s| s.to_string()).collect();
        write!(f, "[{}]", sizes.join(", "))
    }
}

/// Error structure for `Topology::new`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    TooFewLayers(usize),
    EmptyLayer(usize),
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self {
            TopologyError::TooFewLayers(length) => write!(
                f,
                "Net must have at least two layers (input and output), \
                but got topology with len {}!",
                length
            ),
            TopologyError::EmptyLayer(index) => {
                write!(f, "Layer {} must have at least one neuron!", index)
            }
        }
    }
}

impl error::Error for TopologyError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_and_empty_layers() {
        assert_eq!(Topology::new(&[]), Err(TopologyError::TooFewLayers(0)));
        assert_eq!(Topology::new(&[3]), Err(TopologyError::TooFewLayers(1)));
        assert_eq!(Topology::new(&[3, 0, 2]), Err(TopologyError::EmptyLayer(1)));
    }

    #[test]
    fn derived_dimensions() {
        let topology = Topology::new(&[4, 3, 2]).unwrap();
        assert_eq!(topology.layers_count(), 3);
        assert_eq!(topology.pairs_count(), 2);
        assert_eq!(topology.inputs(), 4);
        assert_eq!(topology.outputs(), 2);
        assert_eq!(topology.pair_shape(0), (5, 3));
        assert_eq!(topology.pair_shape(1), (4, 2));
        assert_eq!(topology.to_string(), "[4, 3, 2]");
    }
}
