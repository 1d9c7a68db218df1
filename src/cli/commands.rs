// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Two subcommands, `train` and `evaluate`. Every `train` flag
// defaults to the fixed pipeline constant, so `train` with no
// flags is the same run as invoking the binary bare.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train on the labelled CSVs, then score the test split
    Train(TrainArgs),

    /// Score the test split with the best saved checkpoint
    Evaluate(EvaluateArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// CSV with `text` and `label` columns; 10% is held out for validation
    #[arg(long, default_value = "Data/binary_train_data.csv")]
    pub train_path: String,

    /// CSV scored after training
    #[arg(long, default_value = "Data/binary_test_data.csv")]
    pub test_path: String,

    /// Where checkpoints, train_config.json and metrics.csv are written
    #[arg(long, default_value = "Model")]
    pub model_dir: String,

    /// Whitespace tokens kept per text
    #[arg(long, default_value_t = 250)]
    pub max_tokens: usize,

    #[arg(long, default_value_t = 3)]
    pub epochs: usize,

    #[arg(long, default_value_t = 128)]
    pub batch_size: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Units in the hidden dense layer
    #[arg(long, default_value_t = 256)]
    pub hidden_units: usize,

    /// Pretrained ELMo record: https URL or local path.
    /// Falls back to ELMO_MODULE_URL, then the hosted ELMo v2 module.
    #[arg(long)]
    pub module: Option<String>,

    /// Directory for downloaded modules (default: platform cache dir)
    #[arg(long)]
    pub module_cache_dir: Option<String>,

    /// Discrete GPU index; a missing GPU falls back to the default adapter
    #[arg(long, default_value_t = 0)]
    pub device: usize,

    /// Share of device memory the run may use, in (0, 1]
    #[arg(long, default_value_t = 0.5)]
    pub memory_fraction: f64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            train_path:       a.train_path,
            test_path:        a.test_path,
            model_dir:        a.model_dir,
            max_tokens:       a.max_tokens,
            epochs:           a.epochs,
            batch_size:       a.batch_size,
            learning_rate:    a.lr,
            hidden_units:     a.hidden_units,
            module:           a.module,
            module_cache_dir: a.module_cache_dir,
            device_index:     a.device,
            memory_fraction:  a.memory_fraction,
            ..TrainConfig::default()
        }
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Directory a previous `train` run wrote to
    #[arg(long, default_value = "Model")]
    pub model_dir: String,

    /// Score this CSV instead of the one recorded at training time
    #[arg(long)]
    pub test_path: Option<String>,
}
