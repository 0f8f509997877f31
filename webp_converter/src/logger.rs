use std::path::Path;
use std::sync::{Mutex, PoisonError};

use anyhow::Result;
use chrono::Local;
use colored::*;
use fern::colors::{Color, ColoredLevelConfig};
use indicatif::ProgressBar;
use log::LevelFilter;
use regex::Regex;

use crate::cli::LogLevel;

// ログ出力中に一時的に退避させるプログレスバー
static ACTIVE_PROGRESS: Mutex<Option<ProgressBar>> = Mutex::new(None);

/// ログ出力時に退避させるプログレスバーを登録する
pub fn attach_progress(progress: ProgressBar) {
    *ACTIVE_PROGRESS.lock().unwrap_or_else(PoisonError::into_inner) = Some(progress);
}

pub fn detach_progress() {
    *ACTIVE_PROGRESS.lock().unwrap_or_else(PoisonError::into_inner) = None;
}

fn print_console(line: &str) {
    let active = ACTIVE_PROGRESS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    match active {
        Some(progress) if !progress.is_hidden() => progress.suspend(|| println!("{}", line)),
        _ => println!("{}", line),
    }
}

/// ロガーを初期化する
///
/// コンソールには色付きで、`log_file` にはプレーンテキストで出力する。
pub fn init_logger(log_level: LogLevel, log_file: &Path) -> Result<()> {
    let level_filter = match log_level {
        LogLevel::Error => LevelFilter::Error,
        LogLevel::Warn => LevelFilter::Warn,
        LogLevel::Info => LevelFilter::Info,
        LogLevel::Debug => LevelFilter::Debug,
        LogLevel::Trace => LevelFilter::Trace,
    };

    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Cyan)
        .trace(Color::BrightBlack);

    // 画像・ログファイルのパスを強調表示する
    let path_pattern =
        Regex::new(r#"(?:[A-Za-z]:)?[/\\]?(?:[^\s:"|?*<>()]+[/\\])*[^\s:"|?*<>()/\\]+\.(?i:jpe?g|png|webp|txt|log)\b"#)?;

    fern::Dispatch::new()
        .format(move |out, message, record| {
            let timestamp = Local::now()
                .format("[%Y-%m-%d %H:%M:%S]")
                .to_string()
                .blue()
                .bold();

            let module = record.target();
            let target = match module.split_once("::") {
                Some((head, rest)) => format!("[{}::{}]", head.yellow(), rest.yellow().bold()),
                None => format!("[{}]", module.yellow()),
            };

            let text = message.to_string();
            let highlighted = path_pattern.replace_all(&text, |caps: &regex::Captures| {
                caps[0].green().to_string()
            });

            print_console(&format!(
                "{} {} [{}] {}",
                timestamp,
                target,
                colors.color(record.level()),
                highlighted
            ));

            // ファイル出力用
            out.finish(format_args!(
                "{} [{}] [{}] {}",
                Local::now().format("[%Y-%m-%d %H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ));
        })
        .level(level_filter)
        .chain(fern::log_file(log_file)?)
        .apply()?;

    Ok(())
}
