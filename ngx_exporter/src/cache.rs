//! The named series cache
//!
//! Every normalized measurement lands in a [`Series`] keyed by its fully
//! qualified name. Series and samples are only ever added or updated, never
//! removed: a sample whose source stops reporting keeps its last value for
//! the lifetime of the process.

use rustc_hash::FxHashMap;

use crate::measurement::Labels;

/// One label set and its most recent value.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// The sample's labels.
    pub labels: Labels,
    /// Last value observed.
    pub value: f64,
}

/// All samples sharing one metric name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    label_names: Vec<String>,
    samples: Vec<Sample>,
    index: FxHashMap<Labels, usize>,
}

impl Series {
    fn new(labels: &Labels) -> Self {
        Self {
            label_names: labels.keys().cloned().collect(),
            samples: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    fn set(&mut self, labels: Labels, value: f64) {
        if let Some(&idx) = self.index.get(&labels) {
            self.samples[idx].value = value;
        } else {
            self.index.insert(labels.clone(), self.samples.len());
            self.samples.push(Sample { labels, value });
        }
    }

    /// Label names of the first sample observed for this series.
    #[must_use]
    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Samples in first-observed order.
    #[must_use]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// The value recorded for exactly `labels`, if any.
    #[must_use]
    pub fn get(&self, labels: &Labels) -> Option<f64> {
        self.index.get(labels).map(|&idx| self.samples[idx].value)
    }
}

/// Series keyed by fully qualified metric name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesCache {
    series: FxHashMap<String, Series>,
}

impl SeriesCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` for `name` at `labels`, creating the series on first
    /// observation.
    pub fn set(&mut self, name: String, labels: Labels, value: f64) {
        self.series
            .entry(name)
            .or_insert_with(|| Series::new(&labels))
            .set(labels, value);
    }

    /// Look up a series by fully qualified name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Series> {
        self.series.get(name)
    }

    /// Iterate over every series.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Series)> {
        self.series.iter().map(|(name, series)| (name.as_str(), series))
    }

    /// Number of series.
    #[must_use]
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Whether the cache holds no series.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
