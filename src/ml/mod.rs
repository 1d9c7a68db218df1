// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Model architecture, training and scoring. Everything here is
// generic over the Burn backend; the concrete backend is picked
// in the application layer.
//
//   char_encoder.rs — words → fixed-width character id rows
//
//   embedder.rs     — ELMo as a Burn module
//                     • character CNN + highway + projection
//                     • stacked BiLSTMs with residuals
//                     • learned scalar mix, mean-pooled
//
//   model.rs        — embedder → Dense(256, ReLU) → Dense(1)
//                     with binary cross-entropy on logits
//
//   trainer.rs      — epoch loop, validation, best-only
//                     checkpointing
//
//   evaluator.rs    — batched scoring and classification report
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Peters et al. (2018) Deep contextualized word representations

/// Character-level encoding of whitespace tokens
pub mod char_encoder;

/// Contextual sentence embedder
pub mod embedder;

/// Classifier head and model assembly
pub mod model;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Test-set scoring
pub mod evaluator;
