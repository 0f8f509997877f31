use std::any::Any;
use std::fmt;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use log::{debug, error, warn};

use crate::config::Config;
use crate::error::{Failure, ProcessError};
use crate::hasher::fingerprint_file;
use crate::namer::move_into;
use crate::registry::{DedupRegistry, Registration};
use crate::rejection_log::RejectionLog;
use crate::transcoder::transcode;
use crate::validator::validate_image;

/// 1ファイルの最終的な分類結果
#[derive(Debug, Clone)]
pub enum Outcome {
    /// WebPを出力した（元ファイルはそのまま）
    Converted {
        output: PathBuf,
        bytes_in: u64,
        bytes_out: u64,
    },
    /// 内容が既出。元ファイルを重複用ディレクトリへ移動した
    Duplicate {
        first_seen: PathBuf,
        moved_to: Option<PathBuf>,
    },
    /// 検証または変換に失敗。元ファイルを破損用ディレクトリへ移動した
    Corrupt {
        failure: Failure,
        moved_to: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Converted,
    Duplicate,
    Corrupt,
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Converted { .. } => OutcomeKind::Converted,
            Outcome::Duplicate { .. } => OutcomeKind::Duplicate,
            Outcome::Corrupt { .. } => OutcomeKind::Corrupt,
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeKind::Converted => write!(f, "converted"),
            OutcomeKind::Duplicate => write!(f, "duplicate"),
            OutcomeKind::Corrupt => write!(f, "corrupt"),
        }
    }
}

/// 検証 → ハッシュ/重複判定 → 変換 の順に1ファイルを処理する
///
/// ワーカー間で共有されるのはレジストリと破損ログだけ。
pub struct Classifier<'a> {
    config: &'a Config,
    registry: &'a DedupRegistry,
    rejections: &'a RejectionLog,
}

impl<'a> Classifier<'a> {
    pub fn new(config: &'a Config, registry: &'a DedupRegistry, rejections: &'a RejectionLog) -> Self {
        Self {
            config,
            registry,
            rejections,
        }
    }

    /// 必ずいずれか1つの結果を返す（パニックも破損として扱う）
    pub fn classify(&self, path: &Path) -> Outcome {
        self.settle(path, || self.try_classify(path))
    }

    /// 処理結果を1つの分類に落とし込む。エラーとパニックは破損として隔離・記録する
    fn settle<F>(&self, path: &Path, run: F) -> Outcome
    where
        F: FnOnce() -> Result<Outcome, ProcessError>,
    {
        match panic::catch_unwind(AssertUnwindSafe(run)) {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => self.reject(path, &err),
            Err(payload) => self.reject(path, &ProcessError::Unexpected(panic_message(payload.as_ref()))),
        }
    }

    fn try_classify(&self, path: &Path) -> Result<Outcome, ProcessError> {
        validate_image(path)?;

        let fingerprint = fingerprint_file(path).map_err(ProcessError::HashRead)?;
        match self.registry.register_if_absent(fingerprint, path) {
            Registration::Duplicate { first_seen } => Ok(self.quarantine_duplicate(path, first_seen)),
            Registration::First => {
                let bytes_in = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                let transcoded = transcode(
                    path,
                    &self.config.output_dir,
                    self.config.quality,
                    self.config.encoder,
                )?;
                Ok(Outcome::Converted {
                    output: transcoded.output,
                    bytes_in,
                    bytes_out: transcoded.bytes_written,
                })
            }
        }
    }

    fn quarantine_duplicate(&self, path: &Path, first_seen: PathBuf) -> Outcome {
        let moved_to = match move_into(path, &self.config.duplicate_dir) {
            Ok(dest) => {
                debug!(
                    "重複: {} ({} と同一) → {}",
                    path.display(),
                    first_seen.display(),
                    dest.display()
                );
                Some(dest)
            }
            Err(e) => {
                warn!("重複ファイルを移動できませんでした {}: {}", path.display(), e);
                // 入力フォルダに残ったことを破損ログにも残す
                let reason = format!("重複 ({} と同一)", first_seen.display());
                if let Err(log_err) = self.rejections.record(path, &reason, Some(&e)) {
                    error!("破損ログへの書き込みに失敗しました: {}", log_err);
                }
                None
            }
        };

        Outcome::Duplicate {
            first_seen,
            moved_to,
        }
    }

    fn reject(&self, path: &Path, err: &ProcessError) -> Outcome {
        let failure = Failure::from(err);
        let (moved_to, move_error) = match move_into(path, &self.config.corrupt_dir) {
            Ok(dest) => (Some(dest), None),
            Err(e) => (None, Some(e)),
        };

        error!("破損 [{}] {}: {}", failure.kind, path.display(), failure);
        if let Err(e) = self.rejections.record(path, &failure.message, move_error.as_ref()) {
            error!("破損ログへの書き込みに失敗しました: {}", e);
        }

        Outcome::Corrupt { failure, moved_to }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "ワーカーがパニックしました".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::EncoderType;
    use crate::error::FailureKind;
    use image::{ImageFormat, RgbImage};
    use tempfile::TempDir;

    struct Sandbox {
        _root: TempDir,
        input: PathBuf,
        config: Config,
    }

    impl Sandbox {
        fn new() -> Self {
            let root = TempDir::new().unwrap();
            let input = root.path().join("images");
            let config = Config {
                input_dir: input.clone(),
                output_dir: root.path().join("webp_output"),
                duplicate_dir: root.path().join("duplicate_images"),
                corrupt_dir: root.path().join("corrupt_images"),
                rejection_log: root.path().join("corrupt_images.txt"),
                encoder: EncoderType::Image,
                show_progress: false,
                ..Config::default()
            };
            for dir in [&input, &config.output_dir, &config.duplicate_dir, &config.corrupt_dir] {
                fs::create_dir_all(dir).unwrap();
            }
            Self {
                _root: root,
                input,
                config,
            }
        }

        fn png(&self, name: &str, seed: u8) -> PathBuf {
            let path = self.input.join(name);
            RgbImage::from_fn(8, 8, |x, y| image::Rgb([seed, x as u8, y as u8]))
                .save_with_format(&path, ImageFormat::Png)
                .unwrap();
            path
        }

        fn log_lines(&self) -> Vec<String> {
            fs::read_to_string(&self.config.rejection_log)
                .unwrap_or_default()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    #[test]
    fn converts_first_and_quarantines_duplicate() {
        let sb = Sandbox::new();
        let registry = DedupRegistry::new();
        let log = RejectionLog::open(&sb.config.rejection_log).unwrap();
        let classifier = Classifier::new(&sb.config, &registry, &log);

        let a = sb.png("a.png", 1);
        let b = sb.input.join("b.png");
        fs::copy(&a, &b).unwrap();

        let first = classifier.classify(&a);
        let second = classifier.classify(&b);

        match first {
            Outcome::Converted { output, .. } => {
                assert_eq!(output, sb.config.output_dir.join("a.webp"));
                assert!(a.exists());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        match second {
            Outcome::Duplicate {
                first_seen,
                moved_to,
            } => {
                assert_eq!(first_seen, a);
                assert_eq!(moved_to, Some(sb.config.duplicate_dir.join("b.png")));
                assert!(!b.exists());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(!sb.config.output_dir.join("b.webp").exists());
    }

    #[test]
    fn corrupt_file_is_moved_and_logged_once() {
        let sb = Sandbox::new();
        let registry = DedupRegistry::new();
        let log = RejectionLog::open(&sb.config.rejection_log).unwrap();
        let classifier = Classifier::new(&sb.config, &registry, &log);

        let c = sb.input.join("c.png");
        fs::write(&c, b"\x89PNG\r\n\x1a\n\x00\x00").unwrap();

        let outcome = classifier.classify(&c);
        match outcome {
            Outcome::Corrupt { failure, moved_to } => {
                assert_eq!(failure.kind, FailureKind::Validation);
                assert_eq!(moved_to, Some(sb.config.corrupt_dir.join("c.png")));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(!c.exists());

        let lines = sb.log_lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with(&format!("{} :: ", c.display())));
        assert!(!lines[0].contains("move failed"));
        assert!(registry.is_empty(), "破損ファイルは登録されない");
    }

    #[test]
    fn failed_quarantine_move_is_noted_and_file_stays() {
        let sb = Sandbox::new();
        let config = Config {
            corrupt_dir: sb.config.corrupt_dir.join("does").join("not").join("exist"),
            ..sb.config.clone()
        };
        let registry = DedupRegistry::new();
        let log = RejectionLog::open(&config.rejection_log).unwrap();
        let classifier = Classifier::new(&config, &registry, &log);

        let c = sb.input.join("c.jpg");
        fs::write(&c, b"garbage").unwrap();

        let outcome = classifier.classify(&c);
        assert_eq!(outcome.kind(), OutcomeKind::Corrupt);
        assert!(c.exists());

        let lines = sb.log_lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains(" | move failed: "));
    }

    #[test]
    fn panic_payloads_become_messages() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }

    #[test]
    fn transcode_failure_after_registration_is_quarantined() {
        let sb = Sandbox::new();
        let config = Config {
            output_dir: sb.config.output_dir.join("missing"),
            ..sb.config.clone()
        };
        let registry = DedupRegistry::new();
        let log = RejectionLog::open(&config.rejection_log).unwrap();
        let classifier = Classifier::new(&config, &registry, &log);

        let a = sb.png("a.png", 4);
        match classifier.classify(&a) {
            Outcome::Corrupt { failure, moved_to } => {
                assert_eq!(failure.kind, FailureKind::Transcode);
                assert_eq!(moved_to, Some(config.corrupt_dir.join("a.png")));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(!a.exists());
        assert_eq!(registry.len(), 1, "登録済みのまま残る");

        let lines = sb.log_lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with(&format!("{} :: ", a.display())));
    }

    #[test]
    fn hash_read_failure_resolves_to_corrupt() {
        let sb = Sandbox::new();
        let registry = DedupRegistry::new();
        let log = RejectionLog::open(&sb.config.rejection_log).unwrap();
        let classifier = Classifier::new(&sb.config, &registry, &log);

        let a = sb.png("a.png", 5);
        let outcome = classifier.settle(&a, || {
            Err(ProcessError::HashRead(std::io::Error::new(
                std::io::ErrorKind::Other,
                "read error",
            )))
        });

        match outcome {
            Outcome::Corrupt { failure, moved_to } => {
                assert_eq!(failure.kind, FailureKind::HashRead);
                assert!(failure.message.contains("read error"));
                assert_eq!(moved_to, Some(sb.config.corrupt_dir.join("a.png")));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(sb.log_lines().len(), 1);
    }

    #[test]
    fn panic_during_processing_resolves_to_corrupt() {
        let sb = Sandbox::new();
        let registry = DedupRegistry::new();
        let log = RejectionLog::open(&sb.config.rejection_log).unwrap();
        let classifier = Classifier::new(&sb.config, &registry, &log);

        let a = sb.png("a.png", 6);
        let outcome = classifier.settle(&a, || panic!("decoder exploded"));

        match outcome {
            Outcome::Corrupt { failure, moved_to } => {
                assert_eq!(failure.kind, FailureKind::Unexpected);
                assert!(failure.message.contains("decoder exploded"));
                assert_eq!(moved_to, Some(sb.config.corrupt_dir.join("a.png")));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        let lines = sb.log_lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("decoder exploded"));
    }

    #[test]
    fn unmovable_duplicate_is_recorded_in_rejection_log() {
        let sb = Sandbox::new();
        let config = Config {
            duplicate_dir: sb.config.duplicate_dir.join("missing"),
            ..sb.config.clone()
        };
        let registry = DedupRegistry::new();
        let log = RejectionLog::open(&config.rejection_log).unwrap();
        let classifier = Classifier::new(&config, &registry, &log);

        let a = sb.png("a.png", 7);
        let b = sb.input.join("b.png");
        fs::copy(&a, &b).unwrap();

        assert_eq!(classifier.classify(&a).kind(), OutcomeKind::Converted);
        match classifier.classify(&b) {
            Outcome::Duplicate { moved_to, .. } => assert_eq!(moved_to, None),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(b.exists());

        let lines = sb.log_lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with(&format!("{} :: ", b.display())));
        assert!(lines[0].contains(" | move failed: "));
    }
}
