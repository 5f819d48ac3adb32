use thiserror::Error;

use crate::types::Event;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("random sampling failed: {0}")]
    Sampling(String),
}

/// One content generator: fabricates a single realistic record per call.
///
/// Implementations carry no cross-call state beyond their RNG and must not
/// block; failures are transient and retried by the emission task.
pub trait EventGenerator: Send {
    fn generate(&mut self) -> Result<Event, GeneratorError>;
}

/// Constructs a fresh generator instance for one emission task run.
pub type GeneratorFactory = fn() -> Box<dyn EventGenerator>;

#[derive(Clone)]
pub struct DatasetSpec {
    pub dataset: &'static str,
    pub description: &'static str,
    pub data_stream: &'static str,
    pub factory: GeneratorFactory,
}

#[derive(Clone)]
pub struct SourceSpec {
    pub source: &'static str,
    pub description: &'static str,
    pub datasets: Vec<DatasetSpec>,
}

/// Static read-only listing of the known (source, dataset) pairs.
#[derive(Clone, Default)]
pub struct Catalog {
    sources: Vec<SourceSpec>,
}

impl Catalog {
    pub fn new(mut sources: Vec<SourceSpec>) -> Self {
        sources.sort_by(|a, b| a.source.cmp(b.source));
        for source in &mut sources {
            source.datasets.sort_by(|a, b| a.dataset.cmp(b.dataset));
        }
        Self { sources }
    }

    pub fn sources(&self) -> &[SourceSpec] {
        &self.sources
    }

    pub fn resolve(&self, source: &str, dataset: &str) -> Option<&DatasetSpec> {
        self.sources
            .iter()
            .find(|s| s.source == source)?
            .datasets
            .iter()
            .find(|d| d.dataset == dataset)
    }

    pub fn contains(&self, source: &str, dataset: &str) -> bool {
        self.resolve(source, dataset).is_some()
    }

    /// Flat view over every (source, dataset) pair, sorted.
    pub fn entries(&self) -> impl Iterator<Item = (&SourceSpec, &DatasetSpec)> {
        self.sources
            .iter()
            .flat_map(|s| s.datasets.iter().map(move |d| (s, d)))
    }

    pub fn dataset_count(&self) -> usize {
        self.sources.iter().map(|s| s.datasets.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
