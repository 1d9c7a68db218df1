// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal per
// use case (train end to end, or re-score a saved run).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination

// Load → preprocess → train → evaluate
pub mod train_use_case;

// Reload the best checkpoint and score the test split
pub mod evaluate_use_case;
