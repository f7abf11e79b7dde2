// ============================================================
// Layer 4 — Translation Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec of
// TranslationSamples into padded tensor batches.
//
// Unlike a corpus padded globally up front, samples arrive here
// with their natural lengths. The batcher pads every sequence
// up to the longest one WITHIN the batch:
//
//   Input:  [len 4, len 7, len 5] source sequences
//   Output: source tensor of shape [3, 7], short rows
//           filled with <pad> on the right
//
// Source and target are padded independently — their lengths
// are unrelated.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::TranslationSample;

// ─── TranslationBatch ─────────────────────────────────────────────────────────
/// A batch of sentence pairs ready for the model forward pass.
/// Both tensors have batch_size as their first dimension.
#[derive(Debug, Clone)]
pub struct TranslationBatch<B: Backend> {
    /// Source token ids — shape: [batch_size, src_len]
    pub source: Tensor<B, 2, Int>,

    /// Target token ids — shape: [batch_size, trg_len]
    pub target: Tensor<B, 2, Int>,
}

// ─── TranslationBatcher ───────────────────────────────────────────────────────
/// Holds the target device and the padding id so tensors are
/// created on the correct backend with the correct filler.
#[derive(Clone, Debug)]
pub struct TranslationBatcher<B: Backend> {
    pub device: B::Device,
    pub pad_id: u32,
}

impl<B: Backend> TranslationBatcher<B> {
    pub fn new(device: B::Device, pad_id: u32) -> Self {
        Self { device, pad_id }
    }

    /// Pad each sequence to `max_len` and flatten into one Vec,
    /// then reshape into a [batch, max_len] Int tensor.
    fn pad_and_stack(&self, rows: Vec<&Vec<u32>>, max_len: usize) -> Tensor<B, 2, Int> {
        let batch_size = rows.len();
        let mut flat: Vec<i32> = Vec::with_capacity(batch_size * max_len);

        for row in rows {
            flat.extend(row.iter().map(|&id| id as i32));
            flat.extend(std::iter::repeat(self.pad_id as i32).take(max_len - row.len()));
        }

        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
            .reshape([batch_size, max_len])
    }
}

impl<B: Backend> Batcher<B, TranslationSample, TranslationBatch<B>> for TranslationBatcher<B> {
    fn batch(&self, items: Vec<TranslationSample>, _device: &B::Device) -> TranslationBatch<B> {
        // Longest sequence of each side within this batch
        let src_max = items.iter().map(|s| s.source_len()).max().unwrap_or(0);
        let trg_max = items.iter().map(|s| s.target_len()).max().unwrap_or(0);

        let source = self.pad_and_stack(
            items.iter().map(|s| &s.source_ids).collect(),
            src_max,
        );
        let target = self.pad_and_stack(
            items.iter().map(|s| &s.target_ids).collect(),
            trg_max,
        );

        TranslationBatch { source, target }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TB = burn::backend::NdArray;

    fn sample(src: Vec<u32>, trg: Vec<u32>) -> TranslationSample {
        TranslationSample { source_ids: src, target_ids: trg }
    }

    #[test]
    fn test_pads_to_batch_maximum() {
        let device  = Default::default();
        let batcher = TranslationBatcher::<TB>::new(device, 0);

        let batch = batcher.batch(vec![
            sample(vec![2, 7, 3], vec![2, 9, 9, 3]),
            sample(vec![2, 3], vec![2, 3]),
        ], &Default::default());

        assert_eq!(batch.source.dims(), [2, 3]);
        assert_eq!(batch.target.dims(), [2, 4]);

        // Second source row is [2, 3, <pad>]
        let row: Vec<i64> = batch
            .source
            .into_data()
            .to_vec::<i64>()
            .unwrap();
        assert_eq!(row, vec![2, 7, 3, 2, 3, 0]);
    }

    #[test]
    fn test_padding_uses_configured_id() {
        let device  = Default::default();
        let batcher = TranslationBatcher::<TB>::new(device, 99);

        let batch = batcher.batch(vec![
            sample(vec![1], vec![1, 2]),
            sample(vec![1, 2, 3], vec![1]),
        ], &Default::default());

        let trg: Vec<i64> = batch.target.into_data().to_vec::<i64>().unwrap();
        assert_eq!(trg, vec![1, 2, 1, 99]);
    }
}
