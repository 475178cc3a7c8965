//! 硬件零点持久化
//!
//! 离线标定工具把三只盘在机械零位处的原始读数写成一个扁平二进制文件，
//! 部件构造时读回并预置各盘的零点偏移。
//!
//! 文件格式：8 字节魔数 + 3 × f64（小端，顺序为 底/中/顶），共 32 字节。

use crate::error::PartError;
use std::fs;
use std::path::Path;

/// 文件魔数
pub const MAGIC: &[u8; 8] = b"MAGPIEZ0";

/// 写入硬件零点（[底, 中, 顶] 的原始读数）
pub fn write_hardware_zero(path: &Path, raw_positions: &[f64; 3]) -> Result<(), PartError> {
    let mut buf = Vec::with_capacity(MAGIC.len() + 24);
    buf.extend_from_slice(MAGIC);
    for value in raw_positions {
        buf.extend_from_slice(&value.to_le_bytes());
    }
    fs::write(path, buf)?;
    Ok(())
}

/// 读回硬件零点
pub fn read_hardware_zero(path: &Path) -> Result<[f64; 3], PartError> {
    let bytes = fs::read(path)?;

    let invalid = |reason: &str| PartError::ZeroFile {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if bytes.len() != MAGIC.len() + 24 {
        return Err(invalid(&format!("expected 32 bytes, got {}", bytes.len())));
    }
    if &bytes[..MAGIC.len()] != MAGIC {
        return Err(invalid("bad magic"));
    }

    let mut out = [0.0f64; 3];
    for (i, chunk) in bytes[MAGIC.len()..].chunks_exact(8).enumerate() {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(chunk);
        out[i] = f64::from_le_bytes(raw);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zero.bin");

        let zero = [310.25, -42.0, 127.5];
        write_hardware_zero(&path, &zero).unwrap();
        assert_eq!(read_hardware_zero(&path).unwrap(), zero);
    }

    #[test]
    fn test_truncated_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zero.bin");
        fs::write(&path, b"MAGPIEZ0\x00\x00").unwrap();

        let err = read_hardware_zero(&path).unwrap_err();
        assert!(matches!(err, PartError::ZeroFile { .. }));
    }

    #[test]
    fn test_bad_magic_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zero.bin");
        let mut buf = vec![0u8; 32];
        buf[..8].copy_from_slice(b"NOTMAGIC");
        fs::write(&path, buf).unwrap();

        let err = read_hardware_zero(&path).unwrap_err();
        assert!(matches!(err, PartError::ZeroFile { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_hardware_zero(Path::new("/nonexistent/zero.bin")).unwrap_err();
        assert!(matches!(err, PartError::Io(_)));
    }
}
