//! 画像フォルダのWebP一括変換ライブラリ
//!
//! 入力ディレクトリ以下の画像を検証し、内容が同一の重複と破損ファイルを
//! 隔離しながら、残りをWebPへ並列に変換します。
pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod hasher;
pub mod logger;
pub mod namer;
pub mod registry;
pub mod rejection_log;
pub mod scheduler;
pub mod summary;
pub mod transcoder;
pub mod util;
pub mod validator;

pub use classifier::{Classifier, Outcome, OutcomeKind};
pub use cli::Cli;
pub use config::Config;
pub use registry::{DedupRegistry, Registration};
pub use scheduler::run_pipeline;
pub use summary::RunSummary;
