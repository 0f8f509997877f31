use std::fmt;
use std::time::Duration;

use crate::classifier::Outcome;

/// 実行全体の集計
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub found: usize,
    pub converted: usize,
    pub duplicate: usize,
    pub corrupt: usize,
    pub batches: usize,
    /// 変換できたファイルの元サイズ合計
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn new(found: usize) -> Self {
        Self {
            found,
            ..Self::default()
        }
    }

    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Converted {
                bytes_in,
                bytes_out,
                ..
            } => {
                self.converted += 1;
                self.bytes_in += bytes_in;
                self.bytes_out += bytes_out;
            }
            Outcome::Duplicate { .. } => self.duplicate += 1,
            Outcome::Corrupt { .. } => self.corrupt += 1,
        }
    }

    pub fn processed(&self) -> usize {
        self.converted + self.duplicate + self.corrupt
    }

    /// 出力サイズ / 元サイズ
    pub fn size_ratio(&self) -> f64 {
        if self.bytes_in == 0 {
            return 0.0;
        }
        self.bytes_out as f64 / self.bytes_in as f64
    }

    /// ファイル/秒
    pub fn speed(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.processed() as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "================ 処理結果 ================")?;
        writeln!(f, "入力画像数 : {}", self.found)?;
        writeln!(f, "WebP変換数 : {}", self.converted)?;
        writeln!(f, "重複       : {}", self.duplicate)?;
        writeln!(f, "破損       : {}", self.corrupt)?;
        write!(f, "==========================================")
    }
}
