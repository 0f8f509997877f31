use std::io::{self, Write};

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use log::info;

use webp_converter::util::format::format_bytes;
use webp_converter::util::time::format_duration;
use webp_converter::{logger, run_pipeline, Cli, Config, RunSummary};

fn main() -> Result<()> {
    // コマンドライン引数の解析
    let cli = Cli::parse();

    logger::init_logger(cli.log_level, &cli.app_log)?;

    let config = cli.to_config();
    config.validate()?;

    display_config(&cli, &config);

    // 元ファイルを移動するため、自動実行でない場合はユーザー確認
    if !cli.yes {
        print!("変換処理を実行しますか？ 重複・破損ファイルは入力フォルダから移動されます (y/n): ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim().to_lowercase() != "y" {
            println!("処理を中止しました。");
            return Ok(());
        }
    }

    info!("処理開始時刻: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));

    let summary = run_pipeline(&config).with_context(|| "WebP変換処理中にエラーが発生しました")?;

    display_results(&config, &summary);
    println!("\n{}", summary);

    info!("処理終了時刻: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));

    Ok(())
}

fn display_config(cli: &Cli, config: &Config) {
    info!("==================================================");
    info!("WebP一括変換ユーティリティ v{}", env!("CARGO_PKG_VERSION"));
    info!("==================================================");
    info!("実行時設定:");
    info!(" - 入力ディレクトリ: {}", config.input_dir.display());
    info!(" - 出力ディレクトリ: {}", config.output_dir.display());
    info!(" - 重複の隔離先: {}", config.duplicate_dir.display());
    info!(" - 破損の隔離先: {}", config.corrupt_dir.display());
    info!(" - 破損ログ: {}", config.rejection_log.display());
    info!(" - バッチサイズ: {}", config.batch_size);
    info!(
        " - スレッド数: {}{}",
        config.workers,
        if cli.threads == 0 { " (自動)" } else { "" }
    );
    info!(" - 品質: {}/100", config.quality);
    info!(" - エンコーダー: {}", config.encoder);
    info!(" - ログレベル: {}", cli.log_level);
    info!("--------------------------------------------------");
}

fn display_results(config: &Config, summary: &RunSummary) {
    info!("========================================");
    info!("WebP変換処理 完了");
    info!("----------------------------------------");
    info!(
        "処理時間: {} ({:.2}秒)",
        format_duration(summary.elapsed),
        summary.elapsed.as_secs_f64()
    );
    info!("処理速度: {:.1}ファイル/秒", summary.speed());
    info!("バッチ数: {}", summary.batches);

    if summary.converted > 0 {
        info!(
            "容量: {} → {} ({:.1}% 削減)",
            format_bytes(summary.bytes_in),
            format_bytes(summary.bytes_out),
            (1.0 - summary.size_ratio()) * 100.0
        );
        info!("出力ディレクトリ: {}", config.output_dir.display());
    }
    if summary.corrupt > 0 {
        info!("破損ファイルの詳細: {}", config.rejection_log.display());
    }
}
