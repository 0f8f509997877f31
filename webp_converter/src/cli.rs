use clap::{Parser, ValueEnum};
use std::fmt;
use std::path::PathBuf;

use crate::config::Config;

/// コマンドライン引数の解析のためのデータ構造
#[derive(Parser, Debug)]
#[command(author, version, about = "画像フォルダをWebPへ一括変換するユーティリティ", long_about = None)]
pub struct Cli {
    /// 入力ディレクトリのパス
    #[arg(
        short,
        long,
        default_value = "images",
        help = "変換する画像（jpg/jpeg/png/webp）が格納されているディレクトリを指定します。サブディレクトリも再帰的に走査します。"
    )]
    pub input_dir: PathBuf,

    /// WebP出力ディレクトリのパス
    #[arg(short, long, default_value = "webp_output")]
    pub output_dir: PathBuf,

    /// 重複画像の隔離先
    #[arg(long, default_value = "duplicate_images")]
    pub duplicate_dir: PathBuf,

    /// 破損画像の隔離先
    #[arg(long, default_value = "corrupt_images")]
    pub corrupt_dir: PathBuf,

    /// 破損画像の記録ファイル（追記のみ）
    #[arg(long, default_value = "corrupt_images.txt")]
    pub rejection_log: PathBuf,

    /// 1バッチあたりのファイル数
    #[arg(short, long, default_value_t = 5000, value_parser = batch_size_validator, help = "1回の並列処理でまとめて扱うファイル数を指定します（デフォルトは5000）。")]
    pub batch_size: usize,

    /// 並列処理のスレッド数（0=自動）
    #[arg(short, long, default_value_t = 8, value_parser = threads_validator, help = "使用するスレッド数を指定します。0の場合はCPUコア数から自動で設定されます（デフォルトは8）。")]
    pub threads: usize,

    /// WebPの品質（1-100、高いほど高品質）
    #[arg(short, long, default_value = "80", value_parser = quality_validator, help = "WebPの品質を指定します。1から100の範囲で指定してください。デフォルトは80です。")]
    pub quality: u8,

    /// エンコーダーの種類
    #[arg(short = 'e', long, value_enum, default_value_t = EncoderType::Libwebp, help = "エンコーダーの種類を指定します。Libwebp（デフォルト）は品質指定付きの非可逆圧縮、Imageはimageクレートの可逆エンコーダーを使用します。")]
    pub encoder: EncoderType,

    /// ログレベル
    #[arg(short, long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// アプリケーションログの出力先
    #[arg(long, default_value = "webp_converter.log")]
    pub app_log: PathBuf,

    /// 処理を自動実行（プロンプトなし）
    #[arg(short, long, default_value_t = false)]
    pub yes: bool,

    /// プログレスバーを表示しない
    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
}

impl Cli {
    /// 解析済みの引数からパイプライン設定を組み立てる
    pub fn to_config(&self) -> Config {
        let workers = if self.threads == 0 {
            std::cmp::max(1, num_cpus::get())
        } else {
            self.threads
        };

        Config {
            input_dir: self.input_dir.clone(),
            output_dir: self.output_dir.clone(),
            duplicate_dir: self.duplicate_dir.clone(),
            corrupt_dir: self.corrupt_dir.clone(),
            rejection_log: self.rejection_log.clone(),
            batch_size: self.batch_size,
            workers,
            quality: self.quality,
            encoder: self.encoder,
            show_progress: !self.no_progress,
        }
    }
}

/// ログレベルの列挙型
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// エンコーダーの種類の列挙型
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum EncoderType {
    /// libwebpによる非可逆エンコード（品質指定が有効）
    Libwebp,
    /// imageクレートの可逆WebPエンコーダー
    Image,
}

impl fmt::Display for EncoderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncoderType::Libwebp => write!(f, "libwebp"),
            EncoderType::Image => write!(f, "image"),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

/// 品質パラメータのバリデーション（1-100の範囲内であることを確認）
fn quality_validator(s: &str) -> Result<u8, String> {
    s.parse::<u8>()
        .map_err(|_| format!("`{}` は有効な数値ではありません", s))
        .and_then(|quality| {
            if (1..=100).contains(&quality) {
                Ok(quality)
            } else {
                Err("品質は1から100の間である必要があります".to_string())
            }
        })
}

/// スレッド数パラメータのバリデーション
fn threads_validator(s: &str) -> Result<usize, String> {
    s.parse::<usize>()
        .map_err(|_| format!("`{}` は有効な数値ではありません", s))
        .and_then(|threads| {
            if threads <= 256 {
                Ok(threads)
            } else {
                Err("スレッド数は0（自動）から256までの間である必要があります".to_string())
            }
        })
}

fn batch_size_validator(s: &str) -> Result<usize, String> {
    s.parse::<usize>()
        .map_err(|_| format!("`{}` は有効な数値ではありません", s))
        .and_then(|size| {
            if size >= 1 {
                Ok(size)
            } else {
                Err("バッチサイズは1以上である必要があります".to_string())
            }
        })
}
