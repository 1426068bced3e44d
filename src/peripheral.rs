//! 拡張スロットのカード
//!
//! スロットに挿せるカードは閉じた列挙型で表す。空きスロットは
//! フローティングバス（乱数）を返すだけのカード。

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::disk::DiskII;

/// スロットI/O時にマシンから渡される情報
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusContext {
    /// 現在のクロック
    pub clock: u64,
    /// PCから4バイト分の命令列（CPUがPCを公開している場合のみ）
    pub code: Option<[u8; 4]>,
}

/// 空きスロット
#[derive(Clone)]
pub struct EmptySlot {
    rng: StdRng,
}

impl Default for EmptySlot {
    fn default() -> Self {
        Self::new()
    }
}

impl EmptySlot {
    pub fn new() -> Self {
        EmptySlot {
            rng: StdRng::from_entropy(),
        }
    }
}

/// スロットに挿すカード
#[derive(Clone)]
pub enum Peripheral {
    Empty(EmptySlot),
    DiskII(Box<DiskII>),
}

impl Default for Peripheral {
    fn default() -> Self {
        Peripheral::Empty(EmptySlot::new())
    }
}

impl Peripheral {
    pub fn disk_ii(disk: DiskII) -> Self {
        Peripheral::DiskII(Box::new(disk))
    }

    /// $C0n0-$C0nF 読み取り
    pub fn io_read(&mut self, address: u8, ctx: &BusContext) -> u8 {
        match self {
            Peripheral::Empty(slot) => slot.rng.gen(),
            Peripheral::DiskII(disk) => disk.io_read(address, ctx),
        }
    }

    /// $C0n0-$C0nF 書き込み
    pub fn io_write(&mut self, address: u8, value: u8, ctx: &BusContext) {
        match self {
            Peripheral::Empty(_) => {}
            Peripheral::DiskII(disk) => disk.io_write(address, value, ctx),
        }
    }

    /// $Cn00-$CnFF のROMイメージ
    pub fn memory_read(&self, address: u8) -> u8 {
        match self {
            Peripheral::Empty(_) => 0,
            Peripheral::DiskII(disk) => disk.memory_read(address),
        }
    }

    /// ROMイメージ全体
    pub fn rom_image(&self) -> [u8; 256] {
        let mut image = [0u8; 256];
        for (address, byte) in image.iter_mut().enumerate() {
            *byte = self.memory_read(address as u8);
        }
        image
    }

    /// マシンリセット（ディスク内容には触れない）
    pub fn reset(&mut self) {
        match self {
            Peripheral::Empty(_) => {}
            Peripheral::DiskII(disk) => disk.reset(),
        }
    }

    pub fn as_disk(&self) -> Option<&DiskII> {
        match self {
            Peripheral::DiskII(disk) => Some(&**disk),
            Peripheral::Empty(_) => None,
        }
    }

    pub fn as_disk_mut(&mut self) -> Option<&mut DiskII> {
        match self {
            Peripheral::DiskII(disk) => Some(&mut **disk),
            Peripheral::Empty(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_slot() {
        let mut slot = Peripheral::default();
        let ctx = BusContext::default();
        slot.io_write(0x00, 0x55, &ctx);
        let _ = slot.io_read(0x00, &ctx);
        assert_eq!(slot.rom_image(), [0u8; 256]);
        assert!(slot.as_disk().is_none());
    }

    #[test]
    fn test_disk_card_exposes_boot_rom() {
        let mut disk = DiskII::new();
        let mut rom = [0u8; 256];
        rom[0] = 0xA2;
        rom[1] = 0x20;
        rom[0xFF] = 0x0A;
        disk.load_boot_rom(&rom).unwrap();
        let card = Peripheral::disk_ii(disk);
        let image = card.rom_image();
        assert_eq!(&image[..2], &[0xA2, 0x20]);
        assert_eq!(image[0xFF], 0x0A);
        assert!(card.as_disk().is_some());
    }
}
