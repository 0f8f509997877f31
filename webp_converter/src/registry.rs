use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::hasher::Fingerprint;

/// 登録結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// このフィンガープリントを最初に登録した
    First,
    /// 既に別のファイルが登録済み（最初のファイルのパスを保持）
    Duplicate { first_seen: PathBuf },
}

/// 実行全体で共有する重複判定レジストリ
///
/// 確認と登録を1つのロック内で行うため、同じフィンガープリントに対して
/// `First` が返るのは常に1回だけ。マップには外部から触れられない。
#[derive(Debug, Default)]
pub struct DedupRegistry {
    seen: Mutex<HashMap<Fingerprint, PathBuf>>,
}

impl DedupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_if_absent(&self, fingerprint: Fingerprint, path: &Path) -> Registration {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        match seen.get(&fingerprint) {
            Some(first) => Registration::Duplicate {
                first_seen: first.clone(),
            },
            None => {
                seen.insert(fingerprint, path.to_path_buf());
                Registration::First
            }
        }
    }

    /// 登録済みのユニークなコンテンツ数
    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
