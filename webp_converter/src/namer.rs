use std::ffi::{OsStr, OsString};
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

/// 連番付きの候補パスを作る（0番目は元の名前のまま）
///
/// 名前はバイト列のまま扱い、UTF-8でないファイル名も変えない。
fn candidate(dir: &Path, desired_name: &OsStr, index: usize) -> PathBuf {
    if index == 0 {
        return dir.join(desired_name);
    }

    let name = Path::new(desired_name);
    let mut numbered = OsString::from(name.file_stem().unwrap_or_default());
    numbered.push(format!("_{}", index));
    if let Some(ext) = name.extension() {
        numbered.push(".");
        numbered.push(ext);
    }
    dir.join(numbered)
}

/// 現時点で存在しないパスを返す
///
/// `name.ext` → `name_1.ext` → `name_2.ext` … の順に空きを探す。
/// ファイルは作成しないため、同じ名前を狙う並行呼び出しとは競合しうる。
pub fn unique_path(dir: &Path, desired_name: impl AsRef<OsStr>) -> PathBuf {
    let desired_name = desired_name.as_ref();
    let mut index = 0;
    loop {
        let path = candidate(dir, desired_name, index);
        if !path.exists() {
            return path;
        }
        index += 1;
    }
}

/// 空きパスを探し、空ファイルを作成して確保する
///
/// `create_new` で作成できた名前だけを返すので、並行するワーカー同士で
/// 同じパスが返ることはない。呼び出し側はこのファイルを上書きするか、
/// 使わなかった場合は削除する。
pub fn claim_unique_path(dir: &Path, desired_name: impl AsRef<OsStr>) -> io::Result<PathBuf> {
    let desired_name = desired_name.as_ref();
    let mut index = 0;
    loop {
        let path = candidate(dir, desired_name, index);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => return Ok(path),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => index += 1,
            Err(e) => return Err(e),
        }
    }
}

/// ファイルを隔離先ディレクトリへ移動する
///
/// 移動先は名前衝突を避けて確保し、実際の移動先パスを返す。
/// 別デバイス間で rename できない場合はコピー後に元ファイルを削除する。
/// 失敗した場合、元ファイルはその場に残り、確保した移動先は片付けられる。
pub fn move_into(src: &Path, dir: &Path) -> io::Result<PathBuf> {
    let file_name = src
        .file_name()
        .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "ファイル名がありません"))?;

    let dest = claim_unique_path(dir, file_name)?;
    match move_file(src, &dest) {
        Ok(()) => Ok(dest),
        Err(e) => {
            let _ = fs::remove_file(&dest);
            Err(e)
        }
    }
}

fn move_file(src: &Path, dest: &Path) -> io::Result<()> {
    if fs::rename(src, dest).is_ok() {
        return Ok(());
    }

    fs::copy(src, dest)?;
    if let Err(e) = fs::remove_file(src) {
        // 元ファイルを消せないなら移動は不成立
        let _ = fs::remove_file(dest);
        return Err(e);
    }
    Ok(())
}
