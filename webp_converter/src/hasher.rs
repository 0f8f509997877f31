use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const CHUNK_SIZE: usize = 8192;

/// ファイル内容のMD5ダイジェスト（重複判定専用）
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 16]);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// ファイル全体をチャンク単位で読み込み、フィンガープリントを計算する
pub fn fingerprint_file(path: &Path) -> io::Result<Fingerprint> {
    let file = File::open(path)?;
    fingerprint_reader(file)
}

/// 任意のリーダーからフィンガープリントを計算する
pub fn fingerprint_reader<R: Read>(mut reader: R) -> io::Result<Fingerprint> {
    let mut context = md5::Context::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        context.consume(&buffer[..bytes_read]);
    }

    Ok(Fingerprint(context.compute().0))
}
