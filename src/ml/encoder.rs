// ============================================================
// Layer 5 — Segment Encoder
// ============================================================
// Turns a batch of source token ids into the segment table the
// decoder attends over, in three stages:
//
//   1. Embedding (+ dropout) — ids → dense vectors
//   2. Bidirectional contextual pass — two stacked GRUs, one
//      reading left-to-right, one over the reversed sequence;
//      their outputs are concatenated per token
//   3. Segment sweeps — build_segment_table runs the bounded
//      forward/backward span recurrences over the contextual
//      vectors
//
// The encoder also produces a single hidden summary vector for
// the decoder: the final states of the two segment sweeps,
// concatenated and projected through a tanh layer down to the
// decoder's hidden width.
//
// Reference: Cho et al. (2014) — RNN encoder-decoder

use burn::{
    nn::{Dropout, DropoutConfig, Embedding, EmbeddingConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::tanh,
};

use crate::ml::rnn::{StackedGru, StackedGruConfig};
use crate::ml::segment::{build_segment_table, SegmentTable};

#[derive(Config, Debug)]
pub struct SegmentEncoderConfig {
    /// Source vocabulary size
    pub input_dim: usize,

    /// Token embedding width
    pub embed_dim: usize,

    /// Hidden width of the contextual GRUs (per direction) and
    /// of the summary handed to the decoder
    pub hidden_dim: usize,

    /// Hidden width of the segment recurrence; segment vectors
    /// have width 2 × segment_dim
    pub segment_dim: usize,

    /// Stacked layers in every recurrence
    pub n_layers: usize,

    /// Dropout on embeddings and between recurrent layers
    pub dropout: f64,

    /// Maximum span length the segment sweeps will represent
    pub segment_threshold: usize,
}

impl SegmentEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SegmentEncoder<B> {
        assert!(self.segment_threshold >= 1, "segment threshold must be at least 1");
        assert!(self.segment_dim >= 1, "segment width must be positive");
        assert!(self.input_dim >= 1, "source vocabulary must not be empty");

        let embedding = EmbeddingConfig::new(self.input_dim, self.embed_dim).init(device);

        let forward_rnn =
            StackedGruConfig::new(self.embed_dim, self.hidden_dim, self.n_layers, self.dropout)
                .init(device);
        let backward_rnn =
            StackedGruConfig::new(self.embed_dim, self.hidden_dim, self.n_layers, self.dropout)
                .init(device);

        // The segment recurrence reads the concatenated
        // bidirectional context
        let segment_rnn = StackedGruConfig::new(
            2 * self.hidden_dim,
            self.segment_dim,
            self.n_layers,
            self.dropout,
        )
        .init(device);

        let fc_hidden = LinearConfig::new(2 * self.segment_dim, self.hidden_dim).init(device);

        SegmentEncoder {
            embedding,
            forward_rnn,
            backward_rnn,
            segment_rnn,
            fc_hidden,
            dropout: DropoutConfig::new(self.dropout).init(),
            segment_threshold: self.segment_threshold,
            hidden_dim: self.hidden_dim,
        }
    }
}

#[derive(Module, Debug)]
pub struct SegmentEncoder<B: Backend> {
    pub embedding: Embedding<B>,
    pub forward_rnn: StackedGru<B>,
    pub backward_rnn: StackedGru<B>,
    pub segment_rnn: StackedGru<B>,
    pub fc_hidden: Linear<B>,
    pub dropout: Dropout,
    pub segment_threshold: usize,
    pub hidden_dim: usize,
}

impl<B: Backend> SegmentEncoder<B> {
    /// src: [batch, src_len] token ids →
    /// (segment table, hidden summary [batch, hidden_dim]).
    pub fn forward(&self, src: Tensor<B, 2, Int>) -> (SegmentTable<B>, Tensor<B, 2>) {
        let [batch_size, src_len] = src.dims();
        let device = src.device();

        // Empty sentence: empty table, zero summary
        if src_len == 0 {
            let segment_dim = self.segment_rnn.d_hidden();
            let table = SegmentTable {
                spans: Vec::new(),
                vectors: Tensor::zeros([batch_size, 0, 2 * segment_dim], &device),
                final_forward: Tensor::zeros([batch_size, segment_dim], &device),
                final_backward: Tensor::zeros([batch_size, segment_dim], &device),
            };
            let hidden = Tensor::zeros([batch_size, self.hidden_dim], &device);
            return (table, hidden);
        }

        // ── Embedding ─────────────────────────────────────────────────────────
        let embedded = self.dropout.forward(self.embedding.forward(src));
        // [batch, src_len, embed_dim]

        // ── Bidirectional contextual pass ─────────────────────────────────────
        // The backward direction reads the reversed sequence and
        // is flipped back so position j lines up in both halves
        let (fwd_ctx, _) = self.forward_rnn.forward(embedded.clone(), None);
        let (bwd_ctx, _) = self.backward_rnn.forward(embedded.flip([1]), None);
        let ctx = Tensor::cat(vec![fwd_ctx, bwd_ctx.flip([1])], 2);
        // [batch, src_len, 2*hidden_dim]

        // ── Segment sweeps ────────────────────────────────────────────────────
        let table = build_segment_table(&self.segment_rnn, ctx, self.segment_threshold);

        // ── Hidden summary for the decoder ────────────────────────────────────
        let summary = Tensor::cat(
            vec![table.final_forward.clone(), table.final_backward.clone()],
            1,
        );
        let hidden = tanh(self.fc_hidden.forward(summary));

        (table, hidden)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TB = burn::backend::NdArray;

    fn encoder() -> SegmentEncoder<TB> {
        SegmentEncoderConfig::new(20, 8, 6, 5, 2, 0.0, 3).init(&Default::default())
    }

    fn src(batch: usize, len: usize) -> Tensor<TB, 2, Int> {
        let ids: Vec<i32> = (0..batch * len).map(|k| (k % 7) as i32).collect();
        Tensor::<TB, 2, Int>::from_data(
            burn::prelude::TensorData::new(ids, [batch, len]),
            &Default::default(),
        )
    }

    #[test]
    fn test_table_and_summary_shapes() {
        let enc = encoder();
        let (table, hidden) = enc.forward(src(2, 4));

        assert_eq!(table.segment_count(), 4 * 5 / 2);
        assert_eq!(table.vectors.dims(), [2, 10, 10]); // 2 × segment_dim = 10
        assert_eq!(hidden.dims(), [2, 6]);
    }

    #[test]
    fn test_empty_source_yields_empty_table() {
        let enc = encoder();
        let (table, hidden) = enc.forward(src(2, 0));

        assert!(table.is_empty());
        assert_eq!(hidden.dims(), [2, 6]);
        let values: Vec<f32> = hidden.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_forward_is_deterministic_without_dropout() {
        let enc = encoder();
        let (a, _) = enc.forward(src(1, 3));
        let (b, _) = enc.forward(src(1, 3));
        let va: Vec<f32> = a.vectors.into_data().to_vec::<f32>().unwrap();
        let vb: Vec<f32> = b.vectors.into_data().to_vec::<f32>().unwrap();
        assert_eq!(va, vb);
    }
}
