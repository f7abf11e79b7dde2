// ============================================================
// Layer 5 — Phrase Attention
// ============================================================
// Scores every source segment against one decoder query vector
// and normalises the scores into a probability distribution.
//
// This is additive (Bahdanau-style) attention over a VARIABLE
// sized axis: the number of segments is n(n+1)/2 for a source
// sentence of n tokens, so nothing here may assume a fixed
// sequence length.
//
//   energy = tanh(W · [query ⧺ segment])     per segment
//   score  = v · energy                      scalar per segment
//   attn   = softmax(scores)                 over the segment axis
//
// Stateless: the distribution is recomputed for every query —
// the decoder state changes at each step, so there is nothing
// to cache between calls.
//
// Reference: Bahdanau et al. (2015) — additive attention

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::{softmax, tanh},
};

#[derive(Config, Debug)]
pub struct PhraseAttentionConfig {
    /// Width of a segment vector (2 × segment_dim)
    pub segment_width: usize,

    /// Width of the decoder query vector
    pub d_query: usize,
}

impl PhraseAttentionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> PhraseAttention<B> {
        PhraseAttention {
            attn: LinearConfig::new(self.segment_width + self.d_query, self.d_query)
                .init(device),
            score: LinearConfig::new(self.d_query, 1)
                .with_bias(false)
                .init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct PhraseAttention<B: Backend> {
    /// Projects [query ⧺ segment] down to an energy vector
    pub attn: Linear<B>,

    /// Collapses each energy vector to a scalar score
    pub score: Linear<B>,
}

impl<B: Backend> PhraseAttention<B> {
    /// segments: [batch, n_segments, segment_width],
    /// query: [batch, d_query] →
    /// attention distribution [batch, n_segments].
    pub fn forward(&self, segments: Tensor<B, 3>, query: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch_size, n_segments, _] = segments.dims();
        let [_, d_query] = query.dims();

        // Broadcast the query across the segment axis
        let query = query
            .unsqueeze_dim::<3>(1)
            .expand([batch_size, n_segments, d_query]);

        let energy = tanh(self.attn.forward(Tensor::cat(vec![query, segments], 2)));
        // [batch, n_segments, d_query]

        let scores = self.score.forward(energy).reshape([batch_size, n_segments]);

        softmax(scores, 1)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TB = burn::backend::NdArray;

    #[test]
    fn test_output_is_a_probability_distribution() {
        let device = Default::default();
        let attn: PhraseAttention<TB> = PhraseAttentionConfig::new(6, 4).init(&device);

        let segments = Tensor::<TB, 3>::ones([2, 10, 6], &device);
        let query = Tensor::<TB, 2>::ones([2, 4], &device);

        let dist = attn.forward(segments, query);
        assert_eq!(dist.dims(), [2, 10]);

        let values: Vec<f32> = dist.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|&p| p >= 0.0));

        for row in values.chunks(10) {
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-4, "row sums to {sum}, expected 1");
        }
    }

    #[test]
    fn test_single_segment_gets_full_mass() {
        let device = Default::default();
        let attn: PhraseAttention<TB> = PhraseAttentionConfig::new(6, 4).init(&device);

        let segments = Tensor::<TB, 3>::ones([1, 1, 6], &device);
        let query = Tensor::<TB, 2>::ones([1, 4], &device);

        let dist = attn.forward(segments, query);
        let values: Vec<f32> = dist.into_data().to_vec::<f32>().unwrap();
        assert!((values[0] - 1.0).abs() < 1e-5);
    }
}
