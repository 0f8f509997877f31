use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::classifier::{Classifier, Outcome};
use crate::config::Config;
use crate::logger;
use crate::registry::DedupRegistry;
use crate::rejection_log::RejectionLog;
use crate::summary::RunSummary;
use crate::util::time::{estimate_remaining, format_duration};

/// 処理対象とする拡張子（大文字小文字は区別しない）
pub const ACCEPTED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
}

/// 入力ディレクトリ以下の画像ファイルを再帰的に集める
///
/// ディレクトリ内はファイル名順。`excluded` に一致するディレクトリには降りない。
pub fn collect_images(root: &Path, excluded: &[PathBuf]) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !(entry.file_type().is_dir() && excluded.iter().any(|d| d == entry.path())))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("走査できないエントリをスキップします: {}", e);
                None
            }
        })
        // ファイルへのシンボリックリンクも対象にする（ディレクトリへのリンクはたどらない）
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_image_file(path))
        .collect()
}

/// 入力全体を一括処理する
///
/// ファイル一覧を `batch_size` ごとに区切り、バッチ単位でワーカープールへ投入する。
/// 次のバッチは前のバッチが全件終わってから始まる。重複レジストリは全バッチで共有。
pub fn run_pipeline(config: &Config) -> Result<RunSummary> {
    config.validate()?;
    let start = Instant::now();

    for dir in config.excluded_dirs() {
        fs::create_dir_all(dir)
            .with_context(|| format!("ディレクトリの作成に失敗しました: {}", dir.display()))?;
    }
    let rejections = RejectionLog::open(&config.rejection_log)?;

    let root = config.input_dir.canonicalize().with_context(|| {
        format!(
            "入力ディレクトリが見つかりません: {}",
            config.input_dir.display()
        )
    })?;
    let excluded: Vec<PathBuf> = config
        .excluded_dirs()
        .iter()
        .filter_map(|dir| dir.canonicalize().ok())
        .collect();

    info!("画像ファイルをスキャンしています...");
    let files = collect_images(&root, &excluded);
    let total = files.len();
    let mut summary = RunSummary::new(total);

    if files.is_empty() {
        warn!("対象の画像ファイルが見つかりませんでした");
        summary.elapsed = start.elapsed();
        return Ok(summary);
    }
    info!("合計 {} 個の画像ファイルを検出しました", total);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .thread_name(|i| format!("webp-worker-{}", i))
        .build()
        .context("スレッドプールの作成に失敗しました")?;

    let registry = DedupRegistry::new();
    let classifier = Classifier::new(config, &registry, &rejections);

    let progress = progress_bar(total, config.show_progress);
    logger::attach_progress(progress.clone());

    let batch_count = total.div_ceil(config.batch_size);
    info!(
        "変換処理を開始します（{}スレッド, バッチ {} 件 × {}, 品質: {}, エンコーダー: {}）",
        config.workers, config.batch_size, batch_count, config.quality, config.encoder
    );

    for (index, batch) in files.chunks(config.batch_size).enumerate() {
        info!(
            "バッチ {}/{} を処理中 ({} 枚)",
            index + 1,
            batch_count,
            batch.len()
        );
        progress.set_message(format!("バッチ {}/{}", index + 1, batch_count));

        let outcomes: Vec<Outcome> = pool.install(|| {
            batch
                .par_iter()
                .progress_with(progress.clone())
                .map(|path| classifier.classify(path))
                .collect()
        });

        for outcome in &outcomes {
            summary.record(outcome);
        }
        summary.batches += 1;

        if let Some(left) = estimate_remaining(summary.processed(), total, start.elapsed()) {
            progress.set_message(format!(
                "バッチ {}/{} 完了 (残り約{})",
                index + 1,
                batch_count,
                format_duration(left)
            ));
        }
    }

    progress.finish_with_message("処理完了");
    logger::detach_progress();

    summary.elapsed = start.elapsed();
    info!(
        "処理サマリー: {}ファイル中 変換 {}, 重複 {}, 破損 {} (ユニーク {} 件)",
        summary.found,
        summary.converted,
        summary.duplicate,
        summary.corrupt,
        registry.len()
    );

    Ok(summary)
}

fn progress_bar(total: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new(total as u64);
    match ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
    {
        Ok(style) => progress.set_style(style.progress_chars("█▓▒░ ")),
        Err(e) => warn!("プログレスバーの書式が不正です: {}", e),
    }
    progress
}
