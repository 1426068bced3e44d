//! Disk II ログシステム
//!
//! 原則:
//! 1. ログは「現象」ではなく「判断」を記録
//! 2. 状態遷移のみ記録（毎回のI/Oは記録しない）
//! 3. レベル分離: FLOW / STATE / NIBBLE
//!
//! 出力は `log` クレート経由（target = "disk"）。カテゴリが無効なら
//! フォーマットも行わない。

use std::sync::atomic::{AtomicU32, Ordering};

bitflags::bitflags! {
    /// ログカテゴリ
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DiskLogLevel: u32 {
        /// L1: 何が起きているか（人間向け）
        const FLOW   = 0b0001;
        /// L2: 状態遷移（開発者向け）
        const STATE  = 0b0010;
        /// L3: 生データ・アクセラレータのスキップ
        const NIBBLE = 0b0100;
    }
}

impl DiskLogLevel {
    /// `"flow+state"` / `"all"` / `"none"` 形式の文字列を解釈
    ///
    /// 未知のカテゴリ名は None
    pub fn parse(text: &str) -> Option<DiskLogLevel> {
        let mut level = DiskLogLevel::empty();
        for part in text.split('+').map(str::trim).filter(|p| !p.is_empty()) {
            level |= match part.to_ascii_lowercase().as_str() {
                "flow" => DiskLogLevel::FLOW,
                "state" => DiskLogLevel::STATE,
                "nibble" => DiskLogLevel::NIBBLE,
                "all" => DiskLogLevel::all(),
                "none" => DiskLogLevel::empty(),
                _ => return None,
            };
        }
        Some(level)
    }
}

/// グローバルログレベル
static LOG_LEVEL: AtomicU32 = AtomicU32::new(0);

/// ログレベルを設定
pub fn set_log_level(level: DiskLogLevel) {
    LOG_LEVEL.store(level.bits(), Ordering::Relaxed);
}

/// 現在のログレベルを取得
pub fn get_log_level() -> DiskLogLevel {
    DiskLogLevel::from_bits_truncate(LOG_LEVEL.load(Ordering::Relaxed))
}

/// ログレベルが有効かチェック
#[inline]
pub fn is_enabled(flag: DiskLogLevel) -> bool {
    (LOG_LEVEL.load(Ordering::Relaxed) & flag.bits()) != 0
}

/// [FLOW] モーターON
pub fn log_motor_on(drive: usize) {
    if is_enabled(DiskLogLevel::FLOW) {
        log::info!(target: "disk", "[DISK] D{} motor ON", drive + 1);
    }
}

/// [FLOW] モーターOFF
pub fn log_motor_off(drive: usize) {
    if is_enabled(DiskLogLevel::FLOW) {
        log::info!(target: "disk", "[DISK] D{} motor OFF", drive + 1);
    }
}

/// [STATE] トラック変更
pub fn log_track_change(from: usize, to: usize) {
    if is_enabled(DiskLogLevel::STATE) {
        log::debug!(target: "disk", "[STATE] Track {} -> {}", from, to);
    }
}

/// [STATE] ドライブ選択
pub fn log_drive_select(drive: usize) {
    if is_enabled(DiskLogLevel::STATE) {
        log::debug!(target: "disk", "[STATE] Drive {} selected", drive + 1);
    }
}

/// [FLOW] ディスク挿入
pub fn log_mount(drive: usize, name: &str, format: &str, write_protected: bool) {
    if is_enabled(DiskLogLevel::FLOW) {
        log::info!(
            target: "disk",
            "[DISK] D{} <- {} ({}{})",
            drive + 1,
            name,
            format,
            if write_protected { ", write-protected" } else { "" }
        );
    }
}

/// [NIBBLE] アクセラレータによるカーソル早送り
pub fn log_accelerator_skip(track: usize, from: usize, to: usize, skipped: u8) {
    if is_enabled(DiskLogLevel::NIBBLE) {
        log::trace!(
            target: "disk",
            "[FAST] T={} skip ${:02X} cursor {} -> {}",
            track,
            skipped,
            from,
            to
        );
    }
}
