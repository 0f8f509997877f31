use std::path::Path;

use image::{ImageError, ImageReader};

use crate::error::ProcessError;

/// 画像を最後までデコードし、破損していないかを確認する
///
/// 形式の判定はファイル内容から行う（拡張子は判定できない場合の補助）。
/// 未対応形式・途中で途切れたデータ・読み込み時のI/Oエラーはすべて
/// `ProcessError::Validation` として扱う。デコード結果は破棄される。
pub fn validate_image(path: &Path) -> Result<(), ProcessError> {
    let reader = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| ProcessError::Validation(ImageError::IoError(e)))?;

    reader.decode().map(drop).map_err(ProcessError::Validation)
}
