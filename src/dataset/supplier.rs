use log::{debug, warn};
use std::{
    error, fmt, fs, io,
    path::{Path, PathBuf},
};

use super::{
    vectorizer::{VectorizeError, Vectorizer},
    Sample, SamplesSet,
};
use crate::classifier::Labels;

/// Source of labeled training and test sets.
pub trait SampleSupplier {
    /// Number of classes the samples are spread over.
    fn classes_count(&self) -> usize;

    /// Up to `count` samples, an even share of every class, in class order.
    /// Finding no sample at all is an error, a network can't learn from nothing.
    fn train_set(&self, count: usize) -> Result<SamplesSet, DatasetError>;

    /// Like `train_set`, but taken from the other end of every class so the two don't overlap
    /// as long as a class holds enough files.
    fn test_set(&self, count: usize) -> Result<SamplesSet, DatasetError>;
}

/// Supplies samples from image files laid out as `<root>/<label>/<file>.<extension>`.
///
/// Files of a class are used in name order. Missing class directories contribute nothing.
pub struct DirectorySupplier<V> {
    root: PathBuf,
    vectorizer: V,
    labels: Labels,
    classes: Vec<Vec<PathBuf>>,
}

impl<V: Vectorizer> DirectorySupplier<V> {
    /// Scans `root` for the files of every label.
    pub fn scan<P: AsRef<Path>>(
        root: P,
        labels: Labels,
        extension: &str,
        vectorizer: V,
    ) -> Result<Self, DatasetError> {
        let root = root.as_ref();
        let mut classes = Vec::with_capacity(labels.len());

        for label in labels.iter() {
            let directory = root.join(label);
            if !directory.is_dir() {
                warn!("no directory for class {:?} at {}", label, directory.display());
                classes.push(Vec::new());
                continue;
            }

            let mut files = Vec::new();
            let entries = fs::read_dir(&directory)
                .map_err(|e| DatasetError::Io(directory.clone(), e))?;
            for entry in entries {
                let path = entry.map_err(|e| DatasetError::Io(directory.clone(), e))?.path();
                let matches = path
                    .extension()
                    .map_or(false, |ext| ext.eq_ignore_ascii_case(extension));
                if matches && path.is_file() {
                    files.push(path);
                }
            }
            files.sort();

            debug!("class {:?}: {} file(s)", label, files.len());
            classes.push(files);
        }

        Ok(Self {
            root: root.to_owned(),
            vectorizer,
            labels,
            classes,
        })
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Number of files found for class `class`.
    pub fn files_count(&self, class: usize) -> usize {
        self.classes.get(class).map_or(0, Vec::len)
    }

    fn collect<F>(&self, count: usize, pick: F) -> Result<SamplesSet, DatasetError>
    where
        F: Fn(&[PathBuf], usize) -> &[PathBuf],
    {
        let classes_count = self.classes.len();
        if classes_count == 0 {
            return Ok(SamplesSet::new());
        }
        let per_class = count / classes_count;

        let mut set = SamplesSet::new();
        for (class, files) in self.classes.iter().enumerate() {
            let take = per_class.min(files.len());
            for path in pick(files, take) {
                let input = self
                    .vectorizer
                    .vectorize(path)
                    .map_err(DatasetError::Vectorize)?;
                // `class` indexes `self.classes`, which has one entry per label
                if let Some(sample) = Sample::one_hot(input, classes_count, class) {
                    set.push(sample);
                }
            }
        }
        Ok(set)
    }
}

impl<V: Vectorizer> SampleSupplier for DirectorySupplier<V> {
    fn classes_count(&self) -> usize {
        self.classes.len()
    }

    fn train_set(&self, count: usize) -> Result<SamplesSet, DatasetError> {
        let set = self.collect(count, |files, take| &files[..take])?;
        if set.is_empty() {
            return Err(DatasetError::NoSamples(self.root.clone()));
        }
        Ok(set)
    }

    fn test_set(&self, count: usize) -> Result<SamplesSet, DatasetError> {
        self.collect(count, |files, take| &files[files.len() - take..])
    }
}

#[derive(Debug)]
pub enum DatasetError {
    Io(PathBuf, io::Error),
    Vectorize(VectorizeError),
    NoSamples(PathBuf),
}

impl fmt::Display for DatasetError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self {
            DatasetError::Io(path, e) => {
                write!(f, "Can't list dataset directory {}: {}!", path.display(), e)
            }
            DatasetError::Vectorize(e) => write!(f, "{}", e),
            DatasetError::NoSamples(root) => {
                write!(f, "No training images found under {}!", root.display())
            }
        }
    }
}

impl error::Error for DatasetError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            DatasetError::Io(_, e) => Some(e),
            DatasetError::Vectorize(e) => Some(e),
            DatasetError::NoSamples(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    /// Encodes the file name's number as the only input.
    struct NameVectorizer;

    impl Vectorizer for NameVectorizer {
        fn vector_len(&self) -> usize {
            1
        }

        fn vectorize(&self, path: &Path) -> Result<Vec<f64>, VectorizeError> {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
            stem.parse::<f64>()
                .map(|n| vec![n])
                .map_err(|_| VectorizeError::BadFormat(stem.to_owned()))
        }
    }

    fn dataset(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("toponet-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&root);
        for (label, count) in [("apiary", 5), ("fir", 3)].iter() {
            let directory = root.join(label);
            fs::create_dir_all(&directory).unwrap();
            for i in 0..*count {
                fs::write(directory.join(format!("{}.png", i)), b"").unwrap();
            }
            fs::write(directory.join("notes.txt"), b"").unwrap();
        }
        root
    }

    #[test]
    fn splits_classes_from_both_ends() {
        let root = dataset("split");
        let labels = Labels::new(vec!["apiary", "fir", "yurt"]);
        let supplier = DirectorySupplier::scan(&root, labels, "png", NameVectorizer).unwrap();

        assert_eq!(supplier.classes_count(), 3);
        assert_eq!(supplier.files_count(0), 5);
        assert_eq!(supplier.files_count(2), 0);

        let train = supplier.train_set(6).unwrap();
        let inputs: Vec<(usize, f64)> = train
            .iter()
            .map(|s| (s.class().unwrap(), s.input()[0]))
            .collect();
        assert_eq!(inputs, vec![(0, 0.0), (0, 1.0), (1, 0.0), (1, 1.0)]);
        assert_eq!(train.as_slice()[2].target(), &[0.0, 1.0, 0.0]);

        let test = supplier.test_set(6).unwrap();
        let inputs: Vec<(usize, f64)> = test
            .iter()
            .map(|s| (s.class().unwrap(), s.input()[0]))
            .collect();
        assert_eq!(inputs, vec![(0, 3.0), (0, 4.0), (1, 1.0), (1, 2.0)]);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn shares_are_capped_by_available_files() {
        let root = dataset("cap");
        let labels = Labels::new(vec!["apiary", "fir"]);
        let supplier = DirectorySupplier::scan(&root, labels, "PNG", NameVectorizer).unwrap();

        assert_eq!(supplier.train_set(100).unwrap().len(), 8);
        assert!(matches!(supplier.train_set(1), Err(DatasetError::NoSamples(_))));
        assert_eq!(supplier.test_set(1).unwrap().len(), 0);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_dataset_yields_no_training_set() {
        let root = std::env::temp_dir().join(format!("toponet-absent-{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        let labels = Labels::new(vec!["apiary", "fir"]);
        let supplier = DirectorySupplier::scan(&root, labels, "png", NameVectorizer).unwrap();

        assert_eq!(supplier.files_count(0), 0);
        match supplier.train_set(1040) {
            Err(DatasetError::NoSamples(path)) => assert_eq!(path, root),
            other => panic!("expected no samples, got {:?}", other),
        }
    }
}
