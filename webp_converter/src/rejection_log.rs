use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};

/// 破損ファイルの追記専用ログ
///
/// 1ファイルにつき1行 `<元のパス> :: <エラー内容>[ | move failed: <移動エラー>]`。
#[derive(Debug)]
pub struct RejectionLog {
    file: Mutex<File>,
}

impl RejectionLog {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("ログディレクトリの作成に失敗しました: {}", parent.display())
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("破損ログを開けませんでした: {}", path.display()))?;

        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// 1行を追記する（ロックは書き込みの間だけ保持）
    pub fn record(
        &self,
        original: &Path,
        reason: &str,
        move_error: Option<&io::Error>,
    ) -> io::Result<()> {
        let line = format_line(original, reason, move_error);
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.write_all(line.as_bytes())?;
        file.flush()
    }
}

fn format_line(original: &Path, reason: &str, move_error: Option<&io::Error>) -> String {
    // 改行を含むエラーメッセージで1ファイル1行が崩れないようにする
    let reason = reason.replace(['\r', '\n'], " ");
    match move_error {
        Some(e) => format!("{} :: {} | move failed: {}\n", original.display(), reason, e),
        None => format!("{} :: {}\n", original.display(), reason),
    }
}
