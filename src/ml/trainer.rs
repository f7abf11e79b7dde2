// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Full train + validation loop using Burn's DataLoader and Adam
// with gradient-norm clipping.
//
// Key Burn 0.20 insight:
//   - Training uses MyBackend (Autodiff<Wgpu>) for gradients
//   - model.valid() returns model on MyInnerBackend (Wgpu)
//   - Validation batcher must also use MyInnerBackend
//
// Checkpoints follow a keep-the-best policy: a snapshot is
// written only when validation loss improves, and the pointer
// file always names the best epoch. Loss is reported both raw
// and as perplexity.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::TranslationBatcher, dataset::TranslationDataset};
use crate::domain::markers::MarkerTokens;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::model::{masked_nll, PhraseModelConfig, PhraseTranslationModel};

type MyBackend      = burn::backend::Autodiff<burn::backend::Wgpu>;
type MyInnerBackend = burn::backend::Wgpu;

pub fn run_training(
    cfg:            &TrainConfig,
    src_vocab_size: usize,
    trg_vocab_size: usize,
    markers:        MarkerTokens,
    train_dataset:  TranslationDataset,
    val_dataset:    TranslationDataset,
    ckpt_manager:   CheckpointManager,
) -> Result<()> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop(
        cfg, src_vocab_size, trg_vocab_size, markers,
        train_dataset, val_dataset, ckpt_manager, device,
    )
}

#[allow(clippy::too_many_arguments)]
fn train_loop(
    cfg:            &TrainConfig,
    src_vocab_size: usize,
    trg_vocab_size: usize,
    markers:        MarkerTokens,
    train_dataset:  TranslationDataset,
    val_dataset:    TranslationDataset,
    ckpt_manager:   CheckpointManager,
    device:         burn::backend::wgpu::WgpuDevice,
) -> Result<()> {

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = PhraseModelConfig::new(
        src_vocab_size, trg_vocab_size,
        cfg.embed_dim, cfg.hidden_dim, cfg.segment_dim,
        cfg.n_layers, cfg.dropout, cfg.segment_threshold,
    );
    let mut model: PhraseTranslationModel<MyBackend> = model_cfg.init(&markers, &device);
    tracing::info!(
        "Model ready: {} layers, hidden_dim={}, segment_threshold={}",
        cfg.n_layers, cfg.hidden_dim, cfg.segment_threshold,
    );

    // ── Adam optimiser with gradient clipping ─────────────────────────────────
    // Exploding gradients are a fact of life for stacked GRUs;
    // clipping the global norm keeps updates bounded.
    let optim_cfg = AdamConfig::new()
        .with_epsilon(1e-8)
        .with_grad_clipping(Some(GradientClippingConfig::Norm(cfg.clip as f32)));
    let mut optim = optim_cfg.init();

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_batcher = TranslationBatcher::<MyBackend>::new(device.clone(), markers.pad as u32);
    let train_loader  = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train_dataset);

    // ── Validation data loader (InnerBackend — no autodiff overhead) ──────────
    let val_batcher = TranslationBatcher::<MyInnerBackend>::new(device.clone(), markers.pad as u32);
    let val_loader  = DataLoaderBuilder::new(val_batcher)
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val_dataset);

    let metrics_logger = MetricsLogger::new(&cfg.checkpoint_dir)?;
    let mut best_val_loss = f64::INFINITY;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for batch in train_loader.iter() {
            let (loss, _) = model.forward_loss(
                batch.source,
                batch.target,
                cfg.teacher_forcing,
            )?;

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            train_loss_sum += loss_val;
            train_batches  += 1;

            // Backward pass + clipped Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        // model.valid() → PhraseTranslationModel<MyInnerBackend>;
        // dropout disabled, teacher forcing off (evaluation is
        // fully ground-truth conditioned either way)
        let model_valid = model.valid();

        let mut val_loss_sum = 0.0f64;
        let mut val_batches  = 0usize;

        for batch in val_loader.iter() {
            let output = model_valid.forward(batch.source, batch.target.clone(), 0.0)?;
            let loss   = masked_nll(output, batch.target, markers.pad);

            val_loss_sum += loss.into_scalar().elem::<f64>();
            val_batches  += 1;
        }

        let avg_val_loss = if val_batches > 0 {
            val_loss_sum / val_batches as f64
        } else { f64::NAN };

        let metrics = EpochMetrics::new(epoch, avg_train_loss, avg_val_loss);

        println!(
            "Epoch {:>3}/{} | train_loss={:.3} | train_ppl={:7.3} | val_loss={:.3} | val_ppl={:7.3}",
            epoch, cfg.epochs,
            metrics.train_loss, metrics.train_ppl(),
            metrics.val_loss,   metrics.val_ppl(),
        );
        metrics_logger.log(&metrics)?;

        // ── Keep only the best snapshot ───────────────────────────────────────
        if metrics.is_improvement(best_val_loss) {
            best_val_loss = metrics.val_loss;
            ckpt_manager.save_model(&model, epoch)?;
            tracing::info!(
                "Validation improved to {:.4} — checkpoint saved for epoch {}",
                best_val_loss, epoch,
            );
        }
    }

    tracing::info!("Training complete!");
    Ok(())
}
