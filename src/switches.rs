//! ソフトスイッチ
//!
//! バンク切り替えフラグと、I/Oページ($C000-$C0FF)の各アドレスが
//! 何をするかを表すディスパッチテーブル。テーブルはアドレスごとの
//! `IoAction` の配列で、実際の副作用は `apple2.rs` が実行する。

use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// 画面モード（ビデオ合成側が参照する）
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct GraphicsMode: u8 {
        const TEXT    = 1 << 0;
        const MIXED   = 1 << 1;
        const PAGE2   = 1 << 2;
        const HIRES   = 1 << 3;
        const STORE80 = 1 << 4;
        const COL80   = 1 << 5;
        const ALTCHAR = 1 << 6;
        const DHIRES  = 1 << 7;
    }
}

impl Default for GraphicsMode {
    fn default() -> Self {
        GraphicsMode::empty()
    }
}

impl GraphicsMode {
    /// メインRAMのページテーブルに影響するビット
    pub const MAIN_MAP_BITS: GraphicsMode = GraphicsMode::PAGE2
        .union(GraphicsMode::HIRES)
        .union(GraphicsMode::STORE80);
}

/// ソフトスイッチの状態
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftSwitches {
    pub graphics: GraphicsMode,
    pub aux_read: bool,
    pub aux_write: bool,
    pub aux_zero_page: bool,
    pub lc_bank2: bool,
    pub lc_read_enable: bool,
    pub lc_write_enable: bool,
    pub rom_internal: bool,
    pub rom_slot3_external: bool,
    /// $C019 を読むたびに反転する
    pub video_vbl: bool,
}

impl SoftSwitches {
    pub fn page2(&self) -> bool {
        self.graphics.contains(GraphicsMode::PAGE2)
    }

    pub fn store80(&self) -> bool {
        self.graphics.contains(GraphicsMode::STORE80)
    }

    pub fn hires(&self) -> bool {
        self.graphics.contains(GraphicsMode::HIRES)
    }

    /// $C011-$C01F で読み出されるフラグ
    pub fn status(&self, flag: StatusFlag) -> bool {
        match flag {
            StatusFlag::LcBank2 => self.lc_bank2,
            StatusFlag::LcRead => self.lc_read_enable,
            StatusFlag::AuxRead => self.aux_read,
            StatusFlag::AuxWrite => self.aux_write,
            StatusFlag::RomInternal => self.rom_internal,
            StatusFlag::AuxZeroPage => self.aux_zero_page,
            StatusFlag::RomSlot3External => self.rom_slot3_external,
            StatusFlag::Vbl => self.video_vbl,
            StatusFlag::Graphics(mode) => self.graphics.contains(mode),
        }
    }
}

/// ステータス読み出し対象
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFlag {
    LcBank2,
    LcRead,
    AuxRead,
    AuxWrite,
    RomInternal,
    AuxZeroPage,
    RomSlot3External,
    Vbl,
    Graphics(GraphicsMode),
}

/// $C000-$C00F 書き込みのメモリ管理スイッチ（画面モード以外）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemorySwitch {
    AuxRead,
    AuxWrite,
    RomInternal,
    AuxZeroPage,
    RomSlot3External,
}

/// I/Oページ1アドレス分の動作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoAction {
    /// フローティングバス（何もせずノイズを返す）
    Floating,
    /// キーボードラッチ読み出し
    Keyboard,
    /// キーストローブクリア
    KeyStrobe,
    /// キーボードラッチ下位7ビット | フラグ<<7
    Status(StatusFlag),
    Memory(MemorySwitch, bool),
    Graphics(GraphicsMode, bool),
    Speaker,
    Button(u8),
    Paddle(u8),
    PaddleTrigger,
    LanguageCard { bank2: bool, read: bool, write: bool },
    /// スロットI/O ($C090-$C0FF)
    Slot(u8),
}

const fn language_card(addr: u8) -> IoAction {
    IoAction::LanguageCard {
        bank2: addr & 0x08 == 0,
        read: matches!(addr & 0x03, 0 | 3),
        write: addr & 0x01 != 0,
    }
}

const fn shared_action(addr: u8) -> IoAction {
    match addr {
        0x30..=0x3F => IoAction::Speaker,
        0x50 => IoAction::Graphics(GraphicsMode::TEXT, false),
        0x51 => IoAction::Graphics(GraphicsMode::TEXT, true),
        0x52 => IoAction::Graphics(GraphicsMode::MIXED, false),
        0x53 => IoAction::Graphics(GraphicsMode::MIXED, true),
        0x54 => IoAction::Graphics(GraphicsMode::PAGE2, false),
        0x55 => IoAction::Graphics(GraphicsMode::PAGE2, true),
        0x56 => IoAction::Graphics(GraphicsMode::HIRES, false),
        0x57 => IoAction::Graphics(GraphicsMode::HIRES, true),
        0x5E => IoAction::Graphics(GraphicsMode::DHIRES, true),
        0x5F => IoAction::Graphics(GraphicsMode::DHIRES, false),
        0x70..=0x7F => IoAction::PaddleTrigger,
        0x80..=0x8F => language_card(addr),
        0x90..=0xFF => IoAction::Slot((addr >> 4) & 7),
        // カセット・ゲームストローブ・アナンシエータ
        _ => IoAction::Floating,
    }
}

const fn read_action(addr: u8) -> IoAction {
    match addr {
        0x00..=0x0F => IoAction::Keyboard,
        0x10 => IoAction::KeyStrobe,
        0x11 => IoAction::Status(StatusFlag::LcBank2),
        0x12 => IoAction::Status(StatusFlag::LcRead),
        0x13 => IoAction::Status(StatusFlag::AuxRead),
        0x14 => IoAction::Status(StatusFlag::AuxWrite),
        0x15 => IoAction::Status(StatusFlag::RomInternal),
        0x16 => IoAction::Status(StatusFlag::AuxZeroPage),
        0x17 => IoAction::Status(StatusFlag::RomSlot3External),
        0x18 => IoAction::Status(StatusFlag::Graphics(GraphicsMode::STORE80)),
        0x19 => IoAction::Status(StatusFlag::Vbl),
        0x1A => IoAction::Status(StatusFlag::Graphics(GraphicsMode::TEXT)),
        0x1B => IoAction::Status(StatusFlag::Graphics(GraphicsMode::MIXED)),
        0x1C => IoAction::Status(StatusFlag::Graphics(GraphicsMode::PAGE2)),
        0x1D => IoAction::Status(StatusFlag::Graphics(GraphicsMode::HIRES)),
        0x1E => IoAction::Status(StatusFlag::Graphics(GraphicsMode::ALTCHAR)),
        0x1F => IoAction::Status(StatusFlag::Graphics(GraphicsMode::COL80)),
        // $C060 はカセット入力兼ボタン3
        0x60 | 0x68 => IoAction::Button(3),
        0x61 | 0x69 => IoAction::Button(0),
        0x62 | 0x6A => IoAction::Button(1),
        0x63 | 0x6B => IoAction::Button(2),
        0x64..=0x67 => IoAction::Paddle(addr - 0x64),
        0x6C..=0x6F => IoAction::Paddle(addr - 0x6C),
        _ => shared_action(addr),
    }
}

const fn write_action(addr: u8) -> IoAction {
    match addr {
        0x00 => IoAction::Graphics(GraphicsMode::STORE80, false),
        0x01 => IoAction::Graphics(GraphicsMode::STORE80, true),
        0x02 => IoAction::Memory(MemorySwitch::AuxRead, false),
        0x03 => IoAction::Memory(MemorySwitch::AuxRead, true),
        0x04 => IoAction::Memory(MemorySwitch::AuxWrite, false),
        0x05 => IoAction::Memory(MemorySwitch::AuxWrite, true),
        0x06 => IoAction::Memory(MemorySwitch::RomInternal, false),
        0x07 => IoAction::Memory(MemorySwitch::RomInternal, true),
        0x08 => IoAction::Memory(MemorySwitch::AuxZeroPage, false),
        0x09 => IoAction::Memory(MemorySwitch::AuxZeroPage, true),
        0x0A => IoAction::Memory(MemorySwitch::RomSlot3External, false),
        0x0B => IoAction::Memory(MemorySwitch::RomSlot3External, true),
        0x0C => IoAction::Graphics(GraphicsMode::COL80, false),
        0x0D => IoAction::Graphics(GraphicsMode::COL80, true),
        0x0E => IoAction::Graphics(GraphicsMode::ALTCHAR, false),
        0x0F => IoAction::Graphics(GraphicsMode::ALTCHAR, true),
        0x10..=0x1F => IoAction::KeyStrobe,
        // 書き込み側のパドル/ボタンは無効
        0x60..=0x6F => IoAction::Floating,
        _ => shared_action(addr),
    }
}

const fn build_map(write: bool) -> [IoAction; 256] {
    let mut map = [IoAction::Floating; 256];
    let mut addr = 0;
    while addr < 256 {
        map[addr] = if write {
            write_action(addr as u8)
        } else {
            read_action(addr as u8)
        };
        addr += 1;
    }
    map
}

/// I/Oページ読み出しのディスパッチテーブル
pub static READ_MAP: [IoAction; 256] = build_map(false);

/// I/Oページ書き込みのディスパッチテーブル
pub static WRITE_MAP: [IoAction; 256] = build_map(true);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyboard_and_status_reads() {
        for addr in 0x00..=0x0F {
            assert_eq!(READ_MAP[addr], IoAction::Keyboard);
        }
        assert_eq!(READ_MAP[0x10], IoAction::KeyStrobe);
        assert_eq!(READ_MAP[0x13], IoAction::Status(StatusFlag::AuxRead));
        assert_eq!(
            READ_MAP[0x1F],
            IoAction::Status(StatusFlag::Graphics(GraphicsMode::COL80))
        );
    }

    #[test]
    fn test_memory_switch_writes_are_pairs() {
        for addr in (0x02..0x0C).step_by(2) {
            match (WRITE_MAP[addr], WRITE_MAP[addr + 1]) {
                (IoAction::Memory(off, false), IoAction::Memory(on, true)) => assert_eq!(off, on),
                other => panic!("unexpected pair at ${:02X}: {:?}", addr, other),
            }
        }
        assert_eq!(WRITE_MAP[0x09], IoAction::Memory(MemorySwitch::AuxZeroPage, true));
    }

    #[test]
    fn test_language_card_combinations() {
        assert_eq!(
            READ_MAP[0x80],
            IoAction::LanguageCard { bank2: true, read: true, write: false }
        );
        assert_eq!(
            READ_MAP[0x81],
            IoAction::LanguageCard { bank2: true, read: false, write: true }
        );
        assert_eq!(
            READ_MAP[0x8A],
            IoAction::LanguageCard { bank2: false, read: false, write: false }
        );
        assert_eq!(
            WRITE_MAP[0x8B],
            IoAction::LanguageCard { bank2: false, read: true, write: true }
        );
        // $C084-$C087 は $C080-$C083 の影
        for addr in 0x80..0x84 {
            assert_eq!(READ_MAP[addr], READ_MAP[addr + 4]);
        }
    }

    #[test]
    fn test_slot_routing() {
        assert_eq!(READ_MAP[0xE0], IoAction::Slot(6));
        assert_eq!(WRITE_MAP[0xEF], IoAction::Slot(6));
        assert_eq!(READ_MAP[0x90], IoAction::Slot(1));
        assert_eq!(READ_MAP[0xFF], IoAction::Slot(7));
    }

    #[test]
    fn test_paddle_mirrors() {
        assert_eq!(READ_MAP[0x64], IoAction::Paddle(0));
        assert_eq!(READ_MAP[0x6F], IoAction::Paddle(3));
        assert_eq!(READ_MAP[0x60], IoAction::Button(3));
        assert_eq!(WRITE_MAP[0x64], IoAction::Floating);
        assert_eq!(WRITE_MAP[0x70], IoAction::PaddleTrigger);
    }

    #[test]
    fn test_graphics_toggles_shared() {
        for addr in 0x50..=0x57 {
            assert_eq!(READ_MAP[addr], WRITE_MAP[addr]);
        }
        assert_eq!(READ_MAP[0x5E], IoAction::Graphics(GraphicsMode::DHIRES, true));
        assert_eq!(WRITE_MAP[0x0D], IoAction::Graphics(GraphicsMode::COL80, true));
    }
}
