use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::cli::EncoderType;

/// 変換パイプラインの実行設定
#[derive(Debug, Clone)]
pub struct Config {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub duplicate_dir: PathBuf,
    pub corrupt_dir: PathBuf,
    pub rejection_log: PathBuf,
    pub batch_size: usize,
    pub workers: usize,
    pub quality: u8,
    pub encoder: EncoderType,
    pub show_progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("images"),
            output_dir: PathBuf::from("webp_output"),
            duplicate_dir: PathBuf::from("duplicate_images"),
            corrupt_dir: PathBuf::from("corrupt_images"),
            rejection_log: PathBuf::from("corrupt_images.txt"),
            batch_size: 5000,
            workers: 8,
            quality: 80,
            encoder: EncoderType::Libwebp,
            show_progress: true,
        }
    }
}

impl Config {
    /// 実行前に設定値の範囲を確認する
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("バッチサイズは1以上である必要があります");
        }
        if self.workers == 0 {
            bail!("スレッド数は1以上である必要があります");
        }
        if !(1..=100).contains(&self.quality) {
            bail!("品質は1から100の間である必要があります: {}", self.quality);
        }
        Ok(())
    }

    /// 走査から除外する出力系ディレクトリ
    pub fn excluded_dirs(&self) -> [&PathBuf; 3] {
        [&self.output_dir, &self.duplicate_dir, &self.corrupt_dir]
    }
}
