use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One fully tokenised training example.
/// Both sides are bracketed as: <sos> tokens... <eos>
/// Sequences are NOT padded here — padding to the batch maximum
/// happens in the batcher, so short sentences don't pay for the
/// longest sentence in the corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationSample {
    pub source_ids: Vec<u32>,
    pub target_ids: Vec<u32>,
}

impl TranslationSample {
    /// Source length including the <sos>/<eos> brackets.
    pub fn source_len(&self) -> usize {
        self.source_ids.len()
    }

    /// Target length including the <sos>/<eos> brackets.
    pub fn target_len(&self) -> usize {
        self.target_ids.len()
    }
}

pub struct TranslationDataset {
    samples: Vec<TranslationSample>,
}

impl TranslationDataset {
    pub fn new(samples: Vec<TranslationSample>) -> Self {
        Self { samples }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

impl Dataset<TranslationSample> for TranslationDataset {
    fn get(&self, index: usize) -> Option<TranslationSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
