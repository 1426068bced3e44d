//! セーブステート機能
//!
//! マシンの状態を保存・復元する（serde、JSON）

use serde::{Deserialize, Serialize};

use crate::error::StateError;
use crate::paddle::Paddles;
use crate::switches::SoftSwitches;

/// ディスクドライブの状態（セーブ用）
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DiskDriveState {
    pub disk_loaded: bool,
    pub write_protected: bool,
    pub modified: bool,
    pub name: String,
    pub tracks: Vec<Vec<u8>>,   // 35トラック分のニブル列
    pub head: usize,            // ハーフトラック単位
    pub cursor: usize,
}

/// Disk IIコントローラの状態（セーブ用）
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DiskState {
    pub curr_drive: usize,
    pub drives: [DiskDriveState; 2],
    pub latch: u8,
    pub write_mode: bool,
    pub load_mode: bool,
    pub motor_on: bool,
    pub boot_rom: Vec<u8>,
}

/// 完全なマシン状態
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SaveState {
    pub version: u32,           // セーブフォーマットのバージョン
    pub clock: u64,
    pub switches: SoftSwitches,
    pub keyboard_latch: u8,
    pub paddles: Paddles,
    pub store: Vec<u8>,         // 物理メモリ全体
    /// スロット番号とDisk IIの状態
    pub disks: Vec<(usize, DiskState)>,
}

impl SaveState {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn to_json(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, StateError> {
        let state: SaveState = serde_json::from_str(json)?;
        if state.version != Self::CURRENT_VERSION {
            return Err(StateError::Version(state.version));
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_state(version: u32) -> SaveState {
        SaveState {
            version,
            clock: 42,
            switches: SoftSwitches::default(),
            keyboard_latch: 0xC1,
            paddles: Paddles::new(),
            store: vec![0; 16],
            disks: Vec::new(),
        }
    }

    #[test]
    fn test_json_round_trip() {
        let state = empty_state(SaveState::CURRENT_VERSION);
        let json = state.to_json().unwrap();
        assert_eq!(SaveState::from_json(&json).unwrap(), state);
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let json = empty_state(99).to_json().unwrap();
        assert!(matches!(SaveState::from_json(&json), Err(StateError::Version(99))));
        assert!(matches!(SaveState::from_json("{"), Err(StateError::Json(_))));
    }
}
