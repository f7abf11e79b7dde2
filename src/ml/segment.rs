// ============================================================
// Layer 5 — Segment Table Builder
// ============================================================
// Builds a learned representation for every contiguous span of
// the source sentence up to a bounded length.
//
// Given per-token contextual vectors ctx[0..n-1], the builder
// fills an upper-triangular table with two recurrent sweeps:
//
//   Forward:  for each start index i, a FRESH recurrence walks
//             left-to-right; its output after consuming ctx[j]
//             is the forward vector of span (i, j). The walk
//             stops after `threshold` steps.
//
//   Backward: for each end index i, a fresh recurrence walks
//             right-to-left; its output after consuming ctx[j]
//             is the backward vector of span (j, i).
//
// Assembly concatenates forward ⧺ backward per cell and lists
// the i ≤ j cells in row-major order:
//
//          j=0      j=1      j=2
//   i=0  (0,0)    (0,1)    (0,2)
//   i=1    ·      (1,1)    (1,2)
//   i=2    ·        ·      (2,2)
//
//   → [(0,0), (0,1), (0,2), (1,1), (1,2), (2,2)]
//
// Spans longer than the threshold are never swept; their cells
// keep a zero-vector sentinel, so the table always has exactly
// n(n+1)/2 entries and its shape depends only on n.
//
// Cost: O(n · threshold) recurrence steps per direction. Only
// the assembly pass touches the O(n²) cell grid.
//
// The per-index state reset is load-bearing: the recurrence
// rooted at i must not see anything from the sweep rooted at
// i−1. Each inner loop owns one SweepState and drops it.

use burn::prelude::*;

use crate::domain::span::Span;
use crate::ml::rnn::{StackedGru, SweepState};

// ─── SegmentTable ─────────────────────────────────────────────────────────────
/// The assembled per-span representations of one source batch.
/// Built fresh by every encoder forward pass, consumed by the
/// decoder's attention, then dropped — never mutated, never
/// shared between forward passes.
#[derive(Debug, Clone)]
pub struct SegmentTable<B: Backend> {
    /// The valid (start ≤ end) spans in row-major order;
    /// spans.len() == n(n+1)/2
    pub spans: Vec<Span>,

    /// One vector per span — [batch, spans.len(), 2*segment_dim],
    /// forward and backward halves concatenated
    pub vectors: Tensor<B, 3>,

    /// Top-layer state of the last forward sweep
    pub final_forward: Tensor<B, 2>,

    /// Top-layer state of the last backward sweep
    pub final_backward: Tensor<B, 2>,
}

impl<B: Backend> SegmentTable<B> {
    /// Number of spans in the table.
    pub fn segment_count(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Width of each segment vector (2 × segment_dim).
    pub fn segment_width(&self) -> usize {
        self.vectors.dims()[2]
    }
}

/// Build the segment table for one batch of contextual vectors.
///
/// * `segment_rnn` — the shared recurrence applied by both
///   sweeps (input width = ctx width, hidden = segment_dim)
/// * `ctx`         — [batch, n, ctx_width] contextual vectors
/// * `threshold`   — maximum span length to sweep (≥ 1)
pub fn build_segment_table<B: Backend>(
    segment_rnn: &StackedGru<B>,
    ctx: Tensor<B, 3>,
    threshold: usize,
) -> SegmentTable<B> {
    assert!(threshold >= 1, "segment threshold must be at least 1");

    let [batch_size, n, ctx_width] = ctx.dims();
    let segment_dim = segment_rnn.d_hidden();
    let device = ctx.device();

    // n = 0: the empty sentence has no spans. Zero-size table,
    // zeroed summaries, no sweeps.
    if n == 0 {
        return SegmentTable {
            spans: Vec::new(),
            vectors: Tensor::zeros([batch_size, 0, 2 * segment_dim], &device),
            final_forward: Tensor::zeros([batch_size, segment_dim], &device),
            final_backward: Tensor::zeros([batch_size, segment_dim], &device),
        };
    }

    let token_at = |j: usize| {
        ctx.clone()
            .slice([0..batch_size, j..j + 1, 0..ctx_width])
            .reshape([batch_size, ctx_width])
    };

    // Cell grids, indexed [i * n + j]. Cells outside the sweep
    // range stay None and become zero sentinels at assembly.
    let mut forward_cells: Vec<Option<Tensor<B, 2>>> = vec![None; n * n];
    let mut backward_cells: Vec<Option<Tensor<B, 2>>> = vec![None; n * n];

    // ── Forward sweep ─────────────────────────────────────────────────────────
    // One fresh recurrence per start index i; step j stores the
    // representation of span (i, j).
    let mut final_forward = Tensor::zeros([batch_size, segment_dim], &device);
    for i in 0..n {
        let mut state: SweepState<B> = segment_rnn.fresh_state(batch_size, &device);
        for j in i..n.min(i + threshold) {
            let (out, next) = segment_rnn.step(token_at(j), state);
            state = next;
            forward_cells[i * n + j] = Some(out);
        }
        final_forward = state.top();
    }

    // ── Backward sweep ────────────────────────────────────────────────────────
    // One fresh recurrence per END index i; walking j downward,
    // step j stores the representation of span (j, i).
    let mut final_backward = Tensor::zeros([batch_size, segment_dim], &device);
    for i in 0..n {
        let mut state: SweepState<B> = segment_rnn.fresh_state(batch_size, &device);
        let lowest = (i + 1).saturating_sub(threshold);
        for j in (lowest..=i).rev() {
            let (out, next) = segment_rnn.step(token_at(j), state);
            state = next;
            backward_cells[j * n + i] = Some(out);
        }
        final_backward = state.top();
    }

    // ── Assembly ──────────────────────────────────────────────────────────────
    // Select the upper triangle in row-major order, concatenate
    // the two halves, zero-fill cells the threshold excluded.
    let mut spans = Vec::with_capacity(n * (n + 1) / 2);
    let mut rows: Vec<Tensor<B, 2>> = Vec::with_capacity(n * (n + 1) / 2);

    let zero_half = Tensor::<B, 2>::zeros([batch_size, segment_dim], &device);

    for i in 0..n {
        for j in i..n {
            spans.push(Span::new(i, j));
            let fwd = forward_cells[i * n + j]
                .clone()
                .unwrap_or_else(|| zero_half.clone());
            let bwd = backward_cells[i * n + j]
                .clone()
                .unwrap_or_else(|| zero_half.clone());
            rows.push(Tensor::cat(vec![fwd, bwd], 1));
        }
    }

    SegmentTable {
        spans,
        vectors: Tensor::stack::<3>(rows, 1),
        final_forward,
        final_backward,
    }
}
