// ============================================================
// Layer 5 — Phrase Decoder
// ============================================================
// Decodes the target sentence phrase by phrase instead of
// token by token.
//
// A target-side GRU first runs over the whole (teacher-forced)
// target sequence, seeded with the encoder's hidden summary.
// The decoder then enumerates every candidate phrase — each
// (start, length) window that fits inside the target — and for
// each candidate:
//
//   1. queries phrase attention over the segment table with
//      the target-side output at the phrase's end position;
//   2. forms the attention-weighted summary of the segment
//      vectors (fixed for the whole phrase);
//   3. brackets the phrase tokens with <sop>/<eop> and runs a
//      FRESH phrase recurrence over the bracketed sequence,
//      feeding [token embedding ⧺ weighted summary] per step —
//      a phrase of length L consumes exactly L+2 steps;
//   4. projects [recurrence output ⧺ weighted summary ⧺ token
//      embedding] to vocabulary logits at each step.
//
// Each prediction step targets the NEXT bracketed token: the
// step consuming <sop> predicts the first phrase token, and
// the step consuming the last phrase token predicts <eop>, so
// a candidate of length L emits L+1 logit rows. The final step
// (consuming <eop>) closes the recurrence and emits nothing.
//
// Every candidate's predictions are returned — the model layer
// folds them into a per-position output table.

use burn::{
    nn::{Embedding, EmbeddingConfig, Linear, LinearConfig},
    prelude::*,
};

use crate::domain::markers::MarkerTokens;
use crate::ml::attention::{PhraseAttention, PhraseAttentionConfig};
use crate::ml::rnn::{StackedGru, StackedGruConfig, SweepState};
use crate::ml::segment::SegmentTable;

// ─── PhrasePrediction ─────────────────────────────────────────────────────────
/// The logits emitted while decoding one phrase candidate.
#[derive(Debug, Clone)]
pub struct PhrasePrediction<B: Backend> {
    /// First target position inside the phrase
    pub start: usize,

    /// Number of target tokens in the phrase
    pub len: usize,

    /// One logit row per prediction step —
    /// [batch, len + 1, vocab]; step t predicts target
    /// position start + t, the final row predicts <eop>
    pub logits: Tensor<B, 3>,
}

// ─── PhraseDecoder ────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct PhraseDecoderConfig {
    /// Target vocabulary size
    pub output_dim: usize,

    /// Token embedding width
    pub embed_dim: usize,

    /// Hidden width of both decoder recurrences; must match the
    /// encoder's summary width
    pub hidden_dim: usize,

    /// Hidden width of the encoder's segment recurrence; segment
    /// vectors arrive with width 2 × segment_dim
    pub segment_dim: usize,

    /// Stacked layers in every recurrence
    pub n_layers: usize,

    /// Dropout between recurrent layers
    pub dropout: f64,
}

impl PhraseDecoderConfig {
    pub fn init<B: Backend>(&self, markers: &MarkerTokens, device: &B::Device) -> PhraseDecoder<B> {
        assert!(self.output_dim >= 1, "target vocabulary must not be empty");
        assert!(
            markers.sop < self.output_dim && markers.eop < self.output_dim,
            "phrase marker ids must lie inside the target vocabulary"
        );

        let segment_width = 2 * self.segment_dim;

        let embedding = EmbeddingConfig::new(self.output_dim, self.embed_dim).init(device);

        // Runs over the full target sequence to provide the
        // attention queries
        let target_rnn =
            StackedGruConfig::new(self.embed_dim, self.hidden_dim, self.n_layers, self.dropout)
                .init(device);

        // Runs over one bracketed phrase at a time; each step
        // reads the token embedding next to the attention summary
        let phrase_rnn = StackedGruConfig::new(
            self.embed_dim + segment_width,
            self.hidden_dim,
            self.n_layers,
            self.dropout,
        )
        .init(device);

        let attention = PhraseAttentionConfig::new(segment_width, self.hidden_dim).init(device);

        let fc_out = LinearConfig::new(
            self.hidden_dim + segment_width + self.embed_dim,
            self.output_dim,
        )
        .init(device);

        PhraseDecoder {
            embedding,
            target_rnn,
            phrase_rnn,
            attention,
            fc_out,
            sop_id: markers.sop,
            eop_id: markers.eop,
            output_dim: self.output_dim,
            embed_dim: self.embed_dim,
        }
    }
}

#[derive(Module, Debug)]
pub struct PhraseDecoder<B: Backend> {
    pub embedding: Embedding<B>,
    pub target_rnn: StackedGru<B>,
    pub phrase_rnn: StackedGru<B>,
    pub attention: PhraseAttention<B>,
    pub fc_out: Linear<B>,
    pub sop_id: usize,
    pub eop_id: usize,
    pub output_dim: usize,
    pub embed_dim: usize,
}

impl<B: Backend> PhraseDecoder<B> {
    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    /// trg: [batch, trg_len] teacher-forced target ids;
    /// encoder_hidden: [batch, hidden_dim] summary;
    /// segments: the encoder's segment table.
    ///
    /// Returns one PhrasePrediction per enumerated candidate,
    /// in enumeration order (start ascending, length ascending).
    pub fn forward(
        &self,
        trg: Tensor<B, 2, Int>,
        encoder_hidden: Tensor<B, 2>,
        segments: &SegmentTable<B>,
    ) -> Vec<PhrasePrediction<B>> {
        let [batch_size, trg_len] = trg.dims();
        let device = trg.device();

        // No segments to attend over (empty source) or no room
        // for any phrase: nothing to decode
        if segments.is_empty() || trg_len < 2 {
            return Vec::new();
        }

        let embedded = self.embedding.forward(trg);
        // [batch, trg_len, embed_dim]

        // ── Target-side contextual pass ───────────────────────────────────────
        // Seeded with the encoder summary at every layer; its
        // per-position outputs become the attention queries
        let init = SweepState::broadcast(encoder_hidden, self.target_rnn.n_layers());
        let (trg_ctx, _) = self.target_rnn.forward(embedded.clone(), Some(init));
        // [batch, trg_len, hidden_dim]

        // Marker embeddings used to bracket every phrase
        let sop_embedded = self.embed_marker(self.sop_id, batch_size, &device);
        let eop_embedded = self.embed_marker(self.eop_id, batch_size, &device);

        // ── Phrase enumeration ────────────────────────────────────────────────
        // Every (start, length) window that leaves the query
        // position start+length inside the sequence
        let mut predictions = Vec::new();

        for start in 0..trg_len {
            for len in 1..trg_len - start {
                let end = start + len;

                // 1. Attention query: target context at the
                //    phrase end position
                let query = trg_ctx
                    .clone()
                    .slice([0..batch_size, end..end + 1, 0..self.target_rnn.d_hidden()])
                    .reshape([batch_size, self.target_rnn.d_hidden()]);

                let attn = self.attention.forward(segments.vectors.clone(), query);
                // [batch, n_segments]

                // 2. Weighted summary of the segment vectors,
                //    fixed for the whole phrase
                let weighted = attn
                    .unsqueeze_dim::<3>(1)
                    .matmul(segments.vectors.clone())
                    .reshape([batch_size, segments.segment_width()]);

                // 3. Bracket the phrase: <sop> tokens... <eop>
                let phrase_embedded = Tensor::cat(
                    vec![
                        sop_embedded.clone(),
                        embedded
                            .clone()
                            .slice([0..batch_size, start..end, 0..self.embed_dim]),
                        eop_embedded.clone(),
                    ],
                    1,
                );
                // [batch, len + 2, embed_dim]

                // 4.+5. Phrase recurrence with per-step logits
                let logits = self.decode_phrase(phrase_embedded, weighted, batch_size, len);

                predictions.push(PhrasePrediction { start, len, logits });
            }
        }

        predictions
    }

    /// Run the L+2-step phrase recurrence from a fresh state and
    /// project logits at the first L+1 steps.
    fn decode_phrase(
        &self,
        phrase_embedded: Tensor<B, 3>,
        weighted: Tensor<B, 2>,
        batch_size: usize,
        len: usize,
    ) -> Tensor<B, 3> {
        let device = phrase_embedded.device();
        let mut state: SweepState<B> = self.phrase_rnn.fresh_state(batch_size, &device);
        let mut step_logits: Vec<Tensor<B, 2>> = Vec::with_capacity(len + 1);

        for t in 0..len + 2 {
            let token_embedded = phrase_embedded
                .clone()
                .slice([0..batch_size, t..t + 1, 0..self.embed_dim])
                .reshape([batch_size, self.embed_dim]);

            let rnn_input = Tensor::cat(vec![token_embedded.clone(), weighted.clone()], 1);
            let (out, next) = self.phrase_rnn.step(rnn_input, state);
            state = next;

            // The step consuming <eop> closes the phrase and
            // predicts nothing
            if t < len + 1 {
                let logits = self.fc_out.forward(Tensor::cat(
                    vec![out, weighted.clone(), token_embedded],
                    1,
                ));
                step_logits.push(logits);
            }
        }

        Tensor::stack::<3>(step_logits, 1)
    }

    /// Embedding of one marker id, broadcast over the batch —
    /// [batch, 1, embed_dim].
    fn embed_marker(&self, id: usize, batch_size: usize, device: &B::Device) -> Tensor<B, 3> {
        let ids = Tensor::<B, 2, Int>::full([batch_size, 1], id as i32, device);
        self.embedding.forward(ids)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::encoder::SegmentEncoderConfig;

    type TB = burn::backend::NdArray;

    const VOCAB: usize = 12;
    const HIDDEN: usize = 6;
    const SEGMENT_DIM: usize = 5;

    fn markers() -> MarkerTokens {
        MarkerTokens::new(0, 1, 2, 3, 4, 5)
    }

    fn decoder() -> PhraseDecoder<TB> {
        PhraseDecoderConfig::new(VOCAB, 8, HIDDEN, SEGMENT_DIM, 2, 0.0)
            .init(&markers(), &Default::default())
    }

    fn segment_table(batch: usize, src_len: usize) -> SegmentTable<TB> {
        let enc = SegmentEncoderConfig::new(VOCAB, 8, HIDDEN, SEGMENT_DIM, 2, 0.0, 3)
            .init::<TB>(&Default::default());
        let ids: Vec<i32> = (0..batch * src_len).map(|k| (k % VOCAB) as i32).collect();
        let src = Tensor::<TB, 2, Int>::from_data(
            burn::prelude::TensorData::new(ids, [batch, src_len]),
            &Default::default(),
        );
        enc.forward(src).0
    }

    fn trg(batch: usize, len: usize) -> Tensor<TB, 2, Int> {
        let ids: Vec<i32> = (0..batch * len).map(|k| ((k % 5) + 6) as i32).collect();
        Tensor::<TB, 2, Int>::from_data(
            burn::prelude::TensorData::new(ids, [batch, len]),
            &Default::default(),
        )
    }

    #[test]
    fn test_enumeration_covers_all_windows() {
        // trg_len = 4 → candidates (0,1) (0,2) (0,3) (1,1) (1,2) (2,1)
        let dec = decoder();
        let table = segment_table(1, 3);
        let hidden = Tensor::<TB, 2>::zeros([1, HIDDEN], &Default::default());

        let preds = dec.forward(trg(1, 4), hidden, &table);

        let windows: Vec<(usize, usize)> = preds.iter().map(|p| (p.start, p.len)).collect();
        assert_eq!(
            windows,
            vec![(0, 1), (0, 2), (0, 3), (1, 1), (1, 2), (2, 1)]
        );
    }

    #[test]
    fn test_single_content_token_target_yields_a_candidate() {
        // <sos> w <eos> — the shortest decodable target still
        // produces the (start 0, length 1) candidate
        let dec = decoder();
        let table = segment_table(1, 2);
        let hidden = Tensor::<TB, 2>::zeros([1, HIDDEN], &Default::default());

        let preds = dec.forward(trg(1, 3), hidden, &table);
        assert!(preds.iter().any(|p| p.start == 0 && p.len == 1));
    }

    #[test]
    fn test_each_candidate_emits_len_plus_one_steps() {
        // Pins the generalised emission policy: a phrase of
        // length L contributes L+1 logit rows, one per content
        // position plus the closing <eop> prediction
        let dec = decoder();
        let table = segment_table(2, 3);
        let hidden = Tensor::<TB, 2>::zeros([2, HIDDEN], &Default::default());

        let preds = dec.forward(trg(2, 4), hidden, &table);
        assert!(!preds.is_empty());

        for p in &preds {
            assert_eq!(p.logits.dims(), [2, p.len + 1, VOCAB]);
        }
    }

    #[test]
    fn test_too_short_target_yields_nothing() {
        let dec = decoder();
        let table = segment_table(1, 3);
        let hidden = Tensor::<TB, 2>::zeros([1, HIDDEN], &Default::default());

        assert!(dec.forward(trg(1, 1), hidden, &table).is_empty());
    }

    #[test]
    fn test_empty_segment_table_yields_nothing() {
        let dec = decoder();
        let table = segment_table(1, 0);
        let hidden = Tensor::<TB, 2>::zeros([1, HIDDEN], &Default::default());

        assert!(dec.forward(trg(1, 4), hidden, &table).is_empty());
    }
}
