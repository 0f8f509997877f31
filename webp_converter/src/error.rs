use std::fmt;
use std::io;

use thiserror::Error;

/// 1ファイルの処理中に発生するエラー
///
/// どのバリアントもパイプラインの外へは伝播せず、
/// 分類器の中で「破損」として決着する。
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("画像として読み込めません: {0}")]
    Validation(#[source] image::ImageError),

    #[error("再デコードに失敗しました: {0}")]
    Transcode(#[source] image::ImageError),

    #[error("WebPエンコードに失敗しました: {0}")]
    Encode(String),

    #[error("出力ファイルの書き込みに失敗しました: {0}")]
    OutputWrite(#[source] io::Error),

    #[error("ハッシュ計算中の読み込みに失敗しました: {0}")]
    HashRead(#[source] io::Error),

    #[error("想定外のエラー: {0}")]
    Unexpected(String),
}

impl ProcessError {
    /// 集計・記録用の分類タグ
    pub fn kind(&self) -> FailureKind {
        match self {
            ProcessError::Validation(_) => FailureKind::Validation,
            ProcessError::Transcode(_) | ProcessError::Encode(_) | ProcessError::OutputWrite(_) => {
                FailureKind::Transcode
            }
            ProcessError::HashRead(_) => FailureKind::HashRead,
            ProcessError::Unexpected(_) => FailureKind::Unexpected,
        }
    }
}

/// 破損と判定された理由の種別
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Validation,
    Transcode,
    HashRead,
    Unexpected,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Validation => write!(f, "validation"),
            FailureKind::Transcode => write!(f, "transcode"),
            FailureKind::HashRead => write!(f, "hash-read"),
            FailureKind::Unexpected => write!(f, "unexpected"),
        }
    }
}

/// 破損判定の理由（種別とメッセージ）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&ProcessError> for Failure {
    fn from(err: &ProcessError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
