//! Labeled samples and the collaborators that produce them from image files.

mod supplier;
mod vectorizer;

pub use supplier::*;
pub use vectorizer::*;

use rand::{seq::SliceRandom, Rng};
use std::{iter::FromIterator, slice, vec};

/// Input vector with its desired output vector, and the class index when it's known.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    input: Box<[f64]>,
    target: Box<[f64]>,
    class: Option<usize>,
}

impl Sample {
    pub fn new<I: Into<Box<[f64]>>, T: Into<Box<[f64]>>>(input: I, target: T) -> Self {
        Self {
            input: input.into(),
            target: target.into(),
            class: None,
        }
    }

    /// Sample of class `class` out of `classes_count`, with a one-hot target.
    ///
    /// # Returns
    /// * `None` if `class` is not below `classes_count`.
    ///
    /// # Examples
    /// ```
    /// # use toponet::dataset::Sample;
    /// let sample = Sample::one_hot(vec![0.5; 4], 3, 2).unwrap();
    /// assert_eq!(sample.target(), &[0.0, 0.0, 1.0]);
    /// assert_eq!(sample.class(), Some(2));
    /// assert!(Sample::one_hot(vec![0.5; 4], 3, 3).is_none());
    /// ```
    pub fn one_hot<I: Into<Box<[f64]>>>(input: I, classes_count: usize, class: usize) -> Option<Self> {
        if class >= classes_count {
            return None;
        }
        let mut target = vec![0.0; classes_count];
        target[class] = 1.0;

        Some(Self {
            input: input.into(),
            target: target.into_boxed_slice(),
            class: Some(class),
        })
    }

    pub fn input(&self) -> &[f64] {
        &self.input
    }

    pub fn target(&self) -> &[f64] {
        &self.target
    }

    pub fn class(&self) -> Option<usize> {
        self.class
    }
}

/// Ordered collection of samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamplesSet {
    samples: Vec<Sample>,
}

impl SamplesSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    /// Uniformly permutes the samples in place (Fisher-Yates).
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.samples.shuffle(rng);
    }
}

impl FromIterator<Sample> for SamplesSet {
    fn from_iter<T: IntoIterator<Item = Sample>>(iter: T) -> Self {
        Self {
            samples: iter.into_iter().collect(),
        }
    }
}

impl Extend<Sample> for SamplesSet {
    fn extend<T: IntoIterator<Item = Sample>>(&mut self, iter: T) {
        self.samples.extend(iter);
    }
}

impl IntoIterator for SamplesSet {
    type Item = Sample;
    type IntoIter = vec::IntoIter<Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.into_iter()
    }
}

impl<'a> IntoIterator for &'a SamplesSet {
    type Item = &'a Sample;
    type IntoIter = slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
