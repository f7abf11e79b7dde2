// ============================================================
// Layer 5 — Stacked GRU and Sweep State
// ============================================================
// Burn's Gru module is a single recurrent layer. The encoder
// and decoder both want a multi-layer recurrence with dropout
// between layers, stepped either one token at a time (the
// segment sweeps, the phrase recurrence) or over a whole
// sequence at once (the contextual pass).
//
// StackedGru wraps Vec<Gru> the same way the transformer
// stacks encoder blocks; SweepState is the explicit, owned
// hidden state that goes with it.
//
// SweepState is deliberately NOT part of the module: every
// sweep over a start index and every phrase candidate begins
// from a fresh state and throws it away afterwards. Keeping
// the state outside the module makes that reset visible at the
// call site and rules out accidental carry-over between
// iterations.
//
// Reference: Burn Book §3 (Building Blocks)
//            Cho et al. (2014) — GRU

use burn::{
    nn::{
        gru::{Gru, GruConfig},
        Dropout, DropoutConfig,
    },
    prelude::*,
};

// ─── SweepState ───────────────────────────────────────────────────────────────
/// The hidden state of one StackedGru recurrence: one
/// [batch, d_hidden] tensor per layer.
///
/// A SweepState is scoped to exactly one sweep — construct it
/// fresh (zeroed or broadcast from a summary vector), thread it
/// through the steps of that sweep, and drop it.
#[derive(Debug, Clone)]
pub struct SweepState<B: Backend> {
    layers: Vec<Tensor<B, 2>>,
}

impl<B: Backend> SweepState<B> {
    /// A zeroed state — the canonical fresh start of a sweep.
    pub fn zeros(n_layers: usize, batch_size: usize, d_hidden: usize, device: &B::Device) -> Self {
        Self {
            layers: (0..n_layers)
                .map(|_| Tensor::zeros([batch_size, d_hidden], device))
                .collect(),
        }
    }

    /// Seed every layer with the same summary vector.
    /// Used to start the target-side recurrence from the
    /// encoder's hidden summary.
    pub fn broadcast(summary: Tensor<B, 2>, n_layers: usize) -> Self {
        Self {
            layers: (0..n_layers).map(|_| summary.clone()).collect(),
        }
    }

    /// Hidden state of the topmost layer.
    pub fn top(&self) -> Tensor<B, 2> {
        // Construction guarantees at least one layer
        self.layers[self.layers.len() - 1].clone()
    }
}

// ─── StackedGru ───────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct StackedGruConfig {
    /// Width of the input vectors fed to the bottom layer
    pub d_input: usize,

    /// Hidden width of every layer
    pub d_hidden: usize,

    /// Number of stacked layers
    pub n_layers: usize,

    /// Dropout applied between layers (not after the top layer)
    pub dropout: f64,
}

impl StackedGruConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> StackedGru<B> {
        assert!(self.n_layers >= 1, "a recurrence needs at least one layer");
        assert!(self.d_hidden >= 1, "hidden width must be positive");

        let layers = (0..self.n_layers)
            .map(|l| {
                // Bottom layer reads the input width; upper layers
                // read the layer below
                let d_in = if l == 0 { self.d_input } else { self.d_hidden };
                GruConfig::new(d_in, self.d_hidden, true).init(device)
            })
            .collect();

        StackedGru {
            layers,
            dropout: DropoutConfig::new(self.dropout).init(),
            d_hidden: self.d_hidden,
        }
    }
}

/// A multi-layer GRU with inter-layer dropout and an explicit,
/// caller-owned hidden state.
#[derive(Module, Debug)]
pub struct StackedGru<B: Backend> {
    pub layers: Vec<Gru<B>>,
    pub dropout: Dropout,
    pub d_hidden: usize,
}

impl<B: Backend> StackedGru<B> {
    pub fn d_hidden(&self) -> usize {
        self.d_hidden
    }

    pub fn n_layers(&self) -> usize {
        self.layers.len()
    }

    /// A fresh zeroed state sized for this recurrence.
    pub fn fresh_state(&self, batch_size: usize, device: &B::Device) -> SweepState<B> {
        SweepState::zeros(self.n_layers(), batch_size, self.d_hidden, device)
    }

    /// Advance the recurrence by one step.
    ///
    /// input: [batch, d_input] → (top-layer output [batch, d_hidden],
    /// advanced state). The input state is consumed — a sweep
    /// threads its state through its own steps and nowhere else.
    pub fn step(&self, input: Tensor<B, 2>, state: SweepState<B>) -> (Tensor<B, 2>, SweepState<B>) {
        let [batch_size, _] = input.dims();
        let n_layers = self.layers.len();

        let mut x = input.unsqueeze_dim::<3>(1);
        let mut next_layers = Vec::with_capacity(n_layers);

        for (l, gru) in self.layers.iter().enumerate() {
            // A one-step sequence: the GRU output IS the new hidden
            let h = gru
                .forward(x, Some(state.layers[l].clone()))
                .reshape([batch_size, self.d_hidden]);
            next_layers.push(h.clone());

            let h3 = h.unsqueeze_dim::<3>(1);
            x = if l + 1 < n_layers { self.dropout.forward(h3) } else { h3 };
        }

        (
            x.reshape([batch_size, self.d_hidden]),
            SweepState { layers: next_layers },
        )
    }

    /// Run the recurrence over a whole sequence at once.
    ///
    /// input: [batch, seq_len, d_input] (seq_len ≥ 1) →
    /// (top-layer outputs [batch, seq_len, d_hidden], final state).
    pub fn forward(
        &self,
        input: Tensor<B, 3>,
        state: Option<SweepState<B>>,
    ) -> (Tensor<B, 3>, SweepState<B>) {
        let [batch_size, seq_len, _] = input.dims();
        assert!(seq_len >= 1, "cannot run a recurrence over an empty sequence");

        let n_layers = self.layers.len();
        let mut x = input;
        let mut finals = Vec::with_capacity(n_layers);

        for (l, gru) in self.layers.iter().enumerate() {
            let init = state.as_ref().map(|s| s.layers[l].clone());
            let out = gru.forward(x, init); // [batch, seq_len, d_hidden]

            finals.push(
                out.clone()
                    .slice([0..batch_size, seq_len - 1..seq_len, 0..self.d_hidden])
                    .reshape([batch_size, self.d_hidden]),
            );

            x = if l + 1 < n_layers { self.dropout.forward(out) } else { out };
        }

        (x, SweepState { layers: finals })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TB = burn::backend::NdArray;

    fn rnn(d_input: usize, d_hidden: usize, n_layers: usize) -> StackedGru<TB> {
        StackedGruConfig::new(d_input, d_hidden, n_layers, 0.0).init(&Default::default())
    }

    fn to_vec(t: Tensor<TB, 2>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_fresh_state_is_zeroed() {
        let r = rnn(4, 3, 2);
        let s = r.fresh_state(2, &Default::default());
        assert_eq!(s.top().dims(), [2, 3]);
        assert!(to_vec(s.top()).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_step_shapes() {
        let r = rnn(4, 3, 2);
        let s = r.fresh_state(2, &Default::default());
        let x = Tensor::<TB, 2>::ones([2, 4], &Default::default());

        let (out, next) = r.step(x, s);
        assert_eq!(out.dims(), [2, 3]);
        assert_eq!(next.top().dims(), [2, 3]);
    }

    #[test]
    fn test_step_from_identical_fresh_states_is_deterministic() {
        // Two sweeps from fresh states over the same input must
        // agree exactly — there is no hidden carry-over
        let r = rnn(4, 3, 2);
        let x = Tensor::<TB, 2>::ones([2, 4], &Default::default());

        let (a, _) = r.step(x.clone(), r.fresh_state(2, &Default::default()));
        let (b, _) = r.step(x, r.fresh_state(2, &Default::default()));

        assert_eq!(to_vec(a), to_vec(b));
    }

    #[test]
    fn test_sequence_forward_matches_stepping() {
        let r = rnn(2, 3, 1);
        let device = Default::default();
        let seq = Tensor::<TB, 3>::ones([1, 3, 2], &device);

        let (outs, _) = r.forward(seq.clone(), None);
        assert_eq!(outs.dims(), [1, 3, 3]);

        // Manual stepping over the same inputs
        let mut state = r.fresh_state(1, &device);
        let mut last = None;
        for t in 0..3 {
            let x = seq.clone().slice([0..1, t..t + 1, 0..2]).reshape([1, 2]);
            let (o, s) = r.step(x, state);
            state = s;
            last = Some(o);
        }

        let seq_last = outs.slice([0..1, 2..3, 0..3]).reshape([1, 3]);
        let step_last = last.unwrap();
        let a = to_vec(seq_last);
        let b = to_vec(step_last);
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-5, "sequence and stepped outputs diverge");
        }
    }
}
