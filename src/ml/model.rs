// ============================================================
// Layer 5 — Phrase Translation Model
// ============================================================
// Wires the segment encoder and phrase decoder into the unit
// the training loop drives:
//
//   source ids ─► SegmentEncoder ─► segment table + summary
//                                        │
//   target ids ─────────────────► PhraseDecoder ─► per-phrase
//                                                  predictions
//                                        │
//                          per-position probability table
//
// The forward pass is entirely teacher-forced: the decoder only
// ever sees ground-truth target tokens, and no predicted token
// is fed back in. The teacher-forcing ratio is accepted for
// interface compatibility with schedulers that mix in model
// samples, and currently ignored.
//
// Output: [batch, trg_len, vocab]. The prediction step at
// offset t of phrase (start, len) predicts position start+t;
// each position's row is the MEAN of the softmaxed predictions
// of every phrase step that covers it. The <eop> rows close
// phrases but map to no position, and the final target position
// is covered by no candidate — its row stays zero.

use anyhow::{ensure, Result};
use burn::{
    prelude::*,
    tensor::activation::softmax,
    tensor::backend::AutodiffBackend,
};

use crate::domain::markers::MarkerTokens;
use crate::ml::decoder::{PhraseDecoder, PhraseDecoderConfig};
use crate::ml::encoder::{SegmentEncoder, SegmentEncoderConfig};

#[derive(Config, Debug)]
pub struct PhraseModelConfig {
    /// Source vocabulary size
    pub input_dim: usize,

    /// Target vocabulary size
    pub output_dim: usize,

    /// Token embedding width (both sides)
    pub embed_dim: usize,

    /// Recurrent hidden width throughout the model
    pub hidden_dim: usize,

    /// Segment recurrence width; segment vectors are 2× this
    pub segment_dim: usize,

    /// Stacked layers in every recurrence
    pub n_layers: usize,

    /// Dropout probability
    pub dropout: f64,

    /// Maximum source span length given a representation
    pub segment_threshold: usize,
}

impl PhraseModelConfig {
    pub fn init<B: Backend>(
        &self,
        markers: &MarkerTokens,
        device: &B::Device,
    ) -> PhraseTranslationModel<B> {
        let encoder = SegmentEncoderConfig::new(
            self.input_dim,
            self.embed_dim,
            self.hidden_dim,
            self.segment_dim,
            self.n_layers,
            self.dropout,
            self.segment_threshold,
        )
        .init(device);

        let decoder = PhraseDecoderConfig::new(
            self.output_dim,
            self.embed_dim,
            self.hidden_dim,
            self.segment_dim,
            self.n_layers,
            self.dropout,
        )
        .init(markers, device);

        PhraseTranslationModel {
            encoder,
            decoder,
            pad_id: markers.pad,
        }
    }
}

#[derive(Module, Debug)]
pub struct PhraseTranslationModel<B: Backend> {
    pub encoder: SegmentEncoder<B>,
    pub decoder: PhraseDecoder<B>,
    pub pad_id: usize,
}

impl<B: Backend> PhraseTranslationModel<B> {
    /// src: [batch, src_len], trg: [batch, trg_len] →
    /// per-position probability table [batch, trg_len, vocab].
    ///
    /// Fails fast on batch-size mismatch and on targets too
    /// short to enumerate any phrase. An empty source is a
    /// defined degenerate case: the zero table comes back
    /// unpopulated.
    pub fn forward(
        &self,
        src: Tensor<B, 2, Int>,
        trg: Tensor<B, 2, Int>,
        _teacher_forcing_ratio: f64,
    ) -> Result<Tensor<B, 3>> {
        let [src_batch, src_len] = src.dims();
        let [trg_batch, trg_len] = trg.dims();
        let vocab = self.decoder.output_dim();
        let device = trg.device();

        ensure!(
            src_batch == trg_batch,
            "source batch size ({src_batch}) does not match target batch size ({trg_batch})"
        );
        ensure!(
            trg_len >= 2,
            "target length ({trg_len}) is too short to enumerate any phrase — \
             sequences must carry at least their <sos>/<eos> brackets"
        );

        if src_len == 0 {
            return Ok(Tensor::zeros([trg_batch, trg_len, vocab], &device));
        }

        // ── Encode ────────────────────────────────────────────────────────────
        let (table, hidden) = self.encoder.forward(src);

        // ── Decode every phrase candidate ─────────────────────────────────────
        let predictions = self.decoder.forward(trg, hidden, &table);

        // ── Fold candidate steps into the per-position table ──────────────────
        // Step t of phrase (start, len) predicts position
        // start + t for t < len; the trailing <eop> row has no
        // position slot and is left to phrase-boundary training
        let mut per_position: Vec<Vec<Tensor<B, 2>>> =
            (0..trg_len).map(|_| Vec::new()).collect();

        for p in &predictions {
            for t in 0..p.len {
                let step = p
                    .logits
                    .clone()
                    .slice([0..trg_batch, t..t + 1, 0..vocab])
                    .reshape([trg_batch, vocab]);
                per_position[p.start + t].push(softmax(step, 1));
            }
        }

        let rows: Vec<Tensor<B, 2>> = per_position
            .into_iter()
            .map(|candidates| {
                let count = candidates.len();
                let mut sum = Tensor::<B, 2>::zeros([trg_batch, vocab], &device);
                for c in candidates {
                    sum = sum + c;
                }
                if count > 0 {
                    sum.div_scalar(count as f32)
                } else {
                    sum
                }
            })
            .collect();

        Ok(Tensor::stack::<3>(rows, 1))
    }

    /// Forward pass plus masked NLL loss, for the training loop.
    pub fn forward_loss(
        &self,
        src: Tensor<B, 2, Int>,
        trg: Tensor<B, 2, Int>,
        teacher_forcing_ratio: f64,
    ) -> Result<(Tensor<B, 1>, Tensor<B, 3>)>
    where
        B: AutodiffBackend,
    {
        let output = self.forward(src, trg.clone(), teacher_forcing_ratio)?;
        let loss = masked_nll(output.clone(), trg, self.pad_id);
        Ok((loss, output))
    }
}

/// Average negative log-likelihood of the gold tokens over the
/// scored target positions, ignoring padding.
///
/// Scored positions are 1..trg_len-1: position 0 holds <sos>
/// (never predicted) and the final position is covered by no
/// phrase candidate.
pub fn masked_nll<B: Backend>(
    output: Tensor<B, 3>,
    trg: Tensor<B, 2, Int>,
    pad_id: usize,
) -> Tensor<B, 1> {
    let [batch_size, trg_len, vocab] = output.dims();

    // A two-token target is all brackets — no scored positions
    if trg_len <= 2 {
        return Tensor::zeros([1], &output.device());
    }

    let scored = output.slice([0..batch_size, 1..trg_len - 1, 0..vocab]);
    let gold = trg.slice([0..batch_size, 1..trg_len - 1]);

    // Probability assigned to each gold token
    let picked = scored
        .gather(2, gold.clone().unsqueeze_dim::<3>(2))
        .reshape([batch_size, trg_len - 2]);

    let mask = gold.not_equal_elem(pad_id as i32).float();

    let nll = picked.clamp_min(1e-9).log().neg() * mask.clone();

    // Average over real (non-pad) positions only
    let denom = mask.sum().clamp_min(1.0);
    nll.sum() / denom
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TB = burn::backend::NdArray;

    const VOCAB: usize = 12;

    fn markers() -> MarkerTokens {
        MarkerTokens::new(0, 1, 2, 3, 4, 5)
    }

    fn model() -> PhraseTranslationModel<TB> {
        PhraseModelConfig::new(15, VOCAB, 8, 6, 5, 2, 0.0, 3)
            .init(&markers(), &Default::default())
    }

    fn ids(batch: usize, len: usize, offset: usize) -> Tensor<TB, 2, Int> {
        let data: Vec<i32> = (0..batch * len)
            .map(|k| ((k % 5) + offset) as i32)
            .collect();
        Tensor::<TB, 2, Int>::from_data(
            burn::prelude::TensorData::new(data, [batch, len]),
            &Default::default(),
        )
    }

    #[test]
    fn test_output_shape() {
        let m = model();
        let out = m.forward(ids(2, 4, 6), ids(2, 5, 6), 0.5).unwrap();
        assert_eq!(out.dims(), [2, 5, VOCAB]);
    }

    #[test]
    fn test_covered_rows_are_distributions_and_last_row_is_zero() {
        let m = model();
        let trg_len = 4;
        let out = m.forward(ids(1, 3, 6), ids(1, trg_len, 6), 0.5).unwrap();

        let values: Vec<f32> = out.into_data().to_vec::<f32>().unwrap();

        for (pos, row) in values.chunks(VOCAB).enumerate() {
            let sum: f32 = row.iter().sum();
            if pos < trg_len - 1 {
                // Covered positions hold averaged softmax rows
                assert!((sum - 1.0).abs() < 1e-4, "row {pos} sums to {sum}");
                assert!(row.iter().all(|&p| p >= 0.0));
            } else {
                // The final position is covered by no candidate
                assert!(row.iter().all(|&p| p == 0.0), "row {pos} should be zero");
            }
        }
    }

    #[test]
    fn test_batch_mismatch_is_an_error() {
        let m = model();
        assert!(m.forward(ids(2, 3, 6), ids(1, 4, 6), 0.5).is_err());
    }

    #[test]
    fn test_too_short_target_is_an_error() {
        let m = model();
        assert!(m.forward(ids(1, 3, 6), ids(1, 1, 6), 0.5).is_err());
    }

    #[test]
    fn test_empty_source_returns_zero_table() {
        let m = model();
        let out = m.forward(ids(1, 0, 6), ids(1, 4, 6), 0.5).unwrap();
        assert_eq!(out.dims(), [1, 4, VOCAB]);
        let values: Vec<f32> = out.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_masked_nll_is_finite_and_positive() {
        let m = model();
        let trg = ids(2, 5, 6);
        let out = m.forward(ids(2, 4, 6), trg.clone(), 0.5).unwrap();

        let loss = masked_nll(out, trg, 0);
        let value: f32 = loss.into_data().to_vec::<f32>().unwrap()[0];
        assert!(value.is_finite());
        assert!(value > 0.0);
    }

    #[test]
    fn test_padding_positions_are_masked_out_of_the_loss() {
        // Hand-built table: batch 1, trg_len 4, vocab 4.
        // Scored positions are 1 and 2; the gold token at
        // position 2 is <pad>, so only position 1 may count.
        let device = Default::default();

        #[rustfmt::skip]
        let rows: Vec<f32> = vec![
            // position 0 (<sos> slot, never scored)
            0.25, 0.25, 0.25, 0.25,
            // position 1 — gold id 2 gets probability 0.5
            0.1, 0.2, 0.5, 0.2,
            // position 2 — gold is <pad>; deliberately tiny mass
            0.97, 0.01, 0.01, 0.01,
            // position 3 (uncovered final slot)
            0.0, 0.0, 0.0, 0.0,
        ];
        let output = Tensor::<TB, 1>::from_floats(rows.as_slice(), &device)
            .reshape([1, 4, 4]);
        let trg = Tensor::<TB, 1, Int>::from_ints([1, 2, 0, 3].as_slice(), &device)
            .reshape([1, 4]);

        let loss = masked_nll(output, trg, 0);
        let value: f32 = loss.into_data().to_vec::<f32>().unwrap()[0];

        // Only position 1 counts: loss = -ln(0.5) = ln 2
        assert!((value - 2.0f32.ln()).abs() < 1e-5);
    }
}
