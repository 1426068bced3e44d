//! 設定ファイル管理モジュール
//!
//! マシン構成（ROM・ディスク・ドライブ設定）をJSON形式で永続化

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::gcr::DEFAULT_VOLUME;

/// 設定ファイルのデフォルトファイル名
pub const CONFIG_FILENAME: &str = "a2bus_config.json";

/// 実行ファイルのディレクトリを取得
pub fn get_exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// 相対パスを指定されたベースディレクトリからの絶対パスに解決
pub fn resolve_path_with_base(base: &str, relative: &str) -> PathBuf {
    let path = Path::new(relative);
    if path.is_absolute() {
        path.to_path_buf()
    } else if base.is_empty() {
        get_exe_dir().join(relative)
    } else {
        let base_path = Path::new(base);
        if base_path.is_absolute() {
            base_path.join(relative)
        } else {
            get_exe_dir().join(base).join(relative)
        }
    }
}

/// 設定ファイルのパスを取得
pub fn get_config_path() -> PathBuf {
    get_exe_dir().join(CONFIG_FILENAME)
}

/// マシン設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 相対パスの基準（空なら実行ファイルのディレクトリ）
    pub home: String,
    /// 32KB システムROM
    pub rom: Option<String>,
    /// Disk II ブートROM（256バイト）
    pub disk_rom: Option<String>,
    /// ドライブ1のディスクイメージ
    pub disk1: Option<String>,
    /// ドライブ2のディスクイメージ
    pub disk2: Option<String>,
    /// ドライブごとの書き込みプロテクト
    pub write_protect: [bool; 2],
    /// セクタイメージをエンコードするときのボリューム番号
    pub volume: u8,
    /// ディスク読み取りの早送り
    pub accelerate_disk: bool,
    /// Disk IIログカテゴリ（"flow+state" など）
    pub disk_log: String,
    /// CPU速度の目安（kHz）
    pub cpu_khz: u32,
    /// セーブステートの保存先
    pub save_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            home: String::new(),
            rom: None,
            disk_rom: None,
            disk1: None,
            disk2: None,
            write_protect: [false; 2],
            volume: DEFAULT_VOLUME,
            accelerate_disk: true,
            disk_log: "none".to_string(),
            cpu_khz: 1000,
            save_dir: "saves".to_string(),
        }
    }
}

impl Config {
    /// 設定ファイルを読み込む（実行ファイルと同じディレクトリから）
    pub fn load() -> Self {
        Self::load_from(get_config_path())
    }

    /// 指定したパスから設定を読み込む
    ///
    /// ファイルがなければ既定値、壊れていれば警告して既定値
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        match Self::try_load_from(&path) {
            Ok(config) => config,
            Err(ConfigError::Io(_)) => Config::default(),
            Err(e) => {
                log::warn!("Failed to parse config {:?}: {}, using defaults", path.as_ref(), e);
                Config::default()
            }
        }
    }

    pub fn try_load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// 指定したパスに設定を保存する
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// 相対パスをhomeからの絶対パスに解決
    pub fn resolve_path(&self, relative: &str) -> PathBuf {
        resolve_path_with_base(&self.home, relative)
    }

    /// ドライブ番号（0/1）に対応するディスクイメージ
    pub fn disk(&self, drive: usize) -> Option<&str> {
        match drive {
            0 => self.disk1.as_deref(),
            1 => self.disk2.as_deref(),
            _ => None,
        }
    }

    /// セーブステートのパスを取得
    pub fn get_save_path(&self, slot: u8) -> PathBuf {
        let filename = if slot == 0 {
            "quicksave.json".to_string()
        } else {
            format!("save_slot_{}.json", slot)
        };
        self.resolve_path(&self.save_dir).join(filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("a2bus_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.volume, 254);
        assert!(config.accelerate_disk);
        assert_eq!(config.cpu_khz, 1000);
        assert_eq!(config.disk(0), None);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"disk1": "dos33.dsk", "volume": 17}"#).unwrap();
        assert_eq!(config.disk(0), Some("dos33.dsk"));
        assert_eq!(config.volume, 17);
        assert!(config.accelerate_disk);
        assert_eq!(config.write_protect, [false, false]);
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("roundtrip.json");
        let config = Config {
            rom: Some("apple2e.rom".to_string()),
            write_protect: [true, false],
            disk_log: "flow".to_string(),
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_or_broken_file() {
        assert_eq!(Config::load_from(temp_path("missing.json")), Config::default());

        let path = temp_path("broken.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
        assert!(matches!(Config::try_load_from(&path), Err(ConfigError::Json(_))));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_absolute_paths_kept() {
        let config = Config::default();
        let abs = std::env::temp_dir().join("x.dsk");
        assert_eq!(config.resolve_path(abs.to_str().unwrap()), abs);
        assert!(config.get_save_path(3).ends_with("saves/save_slot_3.json"));
    }
}
