//! エラー型
//!
//! ディスクイメージ・ROMイメージ・設定ファイルの取り込み失敗を表す

use thiserror::Error;

/// ディスクイメージのマウント失敗
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiskError {
    #[error("invalid drive number: {0}")]
    InvalidDrive(usize),
    #[error("invalid image size: expected {expected} bytes, got {got}")]
    InvalidSize { expected: usize, got: usize },
    #[error("bad 2IMG magic")]
    BadMagic,
    #[error("bad 2IMG header size: {0}")]
    BadHeaderSize(u16),
    #[error("bad 2IMG block count: {0} (ProDOS order requires 280)")]
    BadBlockCount(u32),
    #[error("unsupported 2IMG format selector: {0}")]
    UnsupportedFormat(u32),
    #[error("invalid Disk II boot ROM: {0}")]
    BadBootRom(&'static str),
}

/// ROMイメージのロード失敗
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RomError {
    #[error("invalid ROM size: expected 32768 bytes, got {0}")]
    InvalidSize(usize),
    #[error("no BASIC entry found at any known ROM offset")]
    UnrecognizedImage,
}

/// 設定ファイルの読み書き失敗
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

/// セーブステートの読み書き失敗
#[derive(Debug, Error)]
pub enum StateError {
    #[error("incompatible save state version: {0}")]
    Version(u32),
    #[error("save state memory image has {0} bytes")]
    StoreSize(usize),
    #[error("failed to encode save state: {0}")]
    Json(#[from] serde_json::Error),
}
