use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageError, ImageReader};
use log::debug;
#[cfg(not(feature = "libwebp-encoder"))]
use log::warn;

use crate::cli::EncoderType;
use crate::error::ProcessError;
use crate::namer::claim_unique_path;

pub const TARGET_EXTENSION: &str = "webp";

/// 変換結果
#[derive(Debug, Clone)]
pub struct Transcoded {
    pub output: PathBuf,
    pub bytes_written: u64,
}

/// 検証済みの画像をWebPへ変換し、出力ディレクトリに書き込む
///
/// 検証時とは別に改めてデコードする。出力名は `<元のファイル名の語幹>.webp` で、
/// 既存ファイルは上書きせず連番で回避する。
pub fn transcode(
    src: &Path,
    output_dir: &Path,
    quality: u8,
    encoder: EncoderType,
) -> Result<Transcoded, ProcessError> {
    let img = ImageReader::open(src)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| ProcessError::Transcode(ImageError::IoError(e)))?
        .decode()
        .map_err(ProcessError::Transcode)?;

    let img = normalize_color(img);
    let data = encode_webp(&img, quality, encoder)?;

    let mut name = OsString::from(src.file_stem().unwrap_or_default());
    name.push(".");
    name.push(TARGET_EXTENSION);
    let output = claim_unique_path(output_dir, &name).map_err(ProcessError::OutputWrite)?;

    if let Err(e) = fs::write(&output, &data) {
        let _ = fs::remove_file(&output);
        return Err(ProcessError::OutputWrite(e));
    }

    debug!(
        "変換完了: {} → {} ({} bytes)",
        src.display(),
        output.display(),
        data.len()
    );

    Ok(Transcoded {
        output,
        bytes_written: data.len() as u64,
    })
}

/// アルファを持つ画像はRGBA8、それ以外はRGB8にそろえる
///
/// パレット画像はデコーダーがRGB/RGBAへ展開済みなので、
/// 透過付きパレットもここでRGBA8になる。
pub fn normalize_color(img: DynamicImage) -> DynamicImage {
    if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.into_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.into_rgb8())
    }
}

fn encode_webp(
    img: &DynamicImage,
    quality: u8,
    encoder: EncoderType,
) -> Result<Vec<u8>, ProcessError> {
    match encoder {
        EncoderType::Libwebp => encode_libwebp(img, quality),
        EncoderType::Image => encode_lossless(img),
    }
}

/// libwebpによる品質指定付きの非可逆エンコード
#[cfg(feature = "libwebp-encoder")]
fn encode_libwebp(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, ProcessError> {
    let (width, height) = (img.width(), img.height());
    let encoder = match img {
        DynamicImage::ImageRgba8(buf) => webp::Encoder::from_rgba(buf.as_raw(), width, height),
        DynamicImage::ImageRgb8(buf) => webp::Encoder::from_rgb(buf.as_raw(), width, height),
        other => {
            return Err(ProcessError::Encode(format!(
                "未対応のカラー形式です: {:?}",
                other.color()
            )))
        }
    };

    let memory = encoder
        .encode_simple(false, f32::from(quality))
        .map_err(|e| ProcessError::Encode(format!("{:?}", e)))?;
    Ok(memory.to_vec())
}

/// libwebpが利用できない場合の代替実装
#[cfg(not(feature = "libwebp-encoder"))]
fn encode_libwebp(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, ProcessError> {
    warn!(
        "libwebpエンコーダーが利用できません。imageクレートの可逆エンコーダーを使用します（品質 {} は無視されます）",
        quality
    );
    encode_lossless(img)
}

/// imageクレートの可逆WebPエンコーダー
fn encode_lossless(img: &DynamicImage) -> Result<Vec<u8>, ProcessError> {
    let mut data = Vec::new();
    img.write_with_encoder(WebPEncoder::new_lossless(&mut data))
        .map_err(|e| ProcessError::Encode(e.to_string()))?;
    Ok(data)
}
