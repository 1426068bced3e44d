//! Apple II メモリサブシステム
//!
//! 論理アドレス→物理オフセット変換（256エントリのページテーブル2本）。
//! テーブルはソフトスイッチの純関数で、スイッチが変わるたびに
//! `recompute_main` / `recompute_io` / `recompute_language_card` で再計算する。
//! アクセス時には分岐なしで `addr + table[addr >> 8]` を引くだけ。

use crate::error::RomError;
use crate::store::*;
use crate::switches::SoftSwitches;

/// ROMイメージのサイズ（32KB）
pub const ROM_IMAGE_SIZE: usize = 0x8000;

/// BASICエントリを探すROM内オフセット候補
const ROM_ALIGN_CANDIDATES: [usize; 3] = [0x0000, 0x1000, 0x2000];

/// 空のスロットROMを埋める値
const EMPTY_SLOT_FILL: u8 = 0xA0;

/// ページテーブル
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageTables {
    pub read: [i32; 256],
    pub write: [i32; 256],
}

impl Default for PageTables {
    fn default() -> Self {
        PageTables {
            read: [0; 256],
            write: [0; 256],
        }
    }
}

#[inline(always)]
fn delta(physical: usize, logical: usize) -> i32 {
    physical as i32 - logical as i32
}

/// Apple IIメモリシステム
#[derive(Clone)]
pub struct Memory {
    pub store: PhysicalStore,
    tables: PageTables,
}

impl Memory {
    /// 空のメモリを作り、与えられたスイッチ状態でテーブルを構築
    pub fn new(switches: &SoftSwitches) -> Self {
        let mut memory = Memory {
            store: PhysicalStore::new(),
            tables: PageTables::default(),
        };
        memory.init_io_write_map();
        memory.recompute_all(switches);
        memory
    }

    pub fn tables(&self) -> &PageTables {
        &self.tables
    }

    /// 読み取り先の物理オフセット
    #[inline(always)]
    pub fn read_offset(&self, address: u16) -> usize {
        (address as i32 + self.tables.read[(address >> 8) as usize]) as usize
    }

    /// 書き込み先の物理オフセット
    #[inline(always)]
    pub fn write_offset(&self, address: u16) -> usize {
        (address as i32 + self.tables.write[(address >> 8) as usize]) as usize
    }

    /// I/Oページ以外の読み取り（I/Oページの判定は呼び出し側）
    #[inline(always)]
    pub fn read(&self, address: u16) -> u8 {
        self.store.get(self.read_offset(address))
    }

    /// I/Oページ以外の書き込み。書き込んだ物理オフセットを返す
    #[inline(always)]
    pub fn write(&mut self, address: u16, value: u8) -> usize {
        let offset = self.write_offset(address);
        self.store.set(offset, value);
        offset
    }

    /// 副作用なしの読み取り（I/Oページは 0）
    pub fn peek(&self, address: u16) -> u8 {
        if address & 0xFF00 == 0xC000 {
            0
        } else {
            self.read(address)
        }
    }

    pub fn recompute_all(&mut self, switches: &SoftSwitches) {
        self.recompute_main(switches);
        self.recompute_io(switches);
        self.recompute_language_card(switches);
    }

    /// $0200-$BFFF: メイン/補助RAM、テキスト、Hi-Res
    pub fn recompute_main(&mut self, switches: &SoftSwitches) {
        let ram_read = if switches.aux_read {
            delta(MEM_AUX_RAM1, MEM_PHYS_RAM1)
        } else {
            delta(MEM_MAIN_RAM1, MEM_PHYS_RAM1)
        };
        let ram_write = if switches.aux_write {
            delta(MEM_AUX_RAM1, MEM_PHYS_RAM1)
        } else {
            delta(MEM_MAIN_RAM1, MEM_PHYS_RAM1)
        };

        let (mut text_read, mut text_write) = (ram_read, ram_write);
        let (mut hires_read, mut hires_write) = (ram_read, ram_write);

        // 80STORE時はPAGE2がテキスト（HIRES時はHi-Resも）のバンクを選ぶ
        if switches.store80() {
            let text = if switches.page2() {
                delta(MEM_AUX_TEXT, MEM_PHYS_TEXT)
            } else {
                delta(MEM_MAIN_TEXT, MEM_PHYS_TEXT)
            };
            text_read = text;
            text_write = text;
            if switches.hires() {
                hires_read = text;
                hires_write = text;
            }
        }

        let t = &mut self.tables;
        for page in 0x02..0x04 {
            t.read[page] = ram_read;
            t.write[page] = ram_write;
        }
        for page in 0x04..0x08 {
            t.read[page] = text_read;
            t.write[page] = text_write;
        }
        for page in 0x08..0x20 {
            t.read[page] = ram_read;
            t.write[page] = ram_write;
        }
        for page in 0x20..0x40 {
            t.read[page] = hires_read;
            t.write[page] = hires_write;
        }
        for page in 0x40..0xC0 {
            t.read[page] = ram_read;
            t.write[page] = ram_write;
        }
    }

    /// $C100-$CFFF の書き込みは常に捨て領域
    fn init_io_write_map(&mut self) {
        for page in 0xC1..0xD0 {
            self.tables.write[page] = delta(MEM_WASTE, MEM_PHYS_IO);
        }
    }

    /// $C100-$CFFF: 内部ROM/スロットROMの可視性
    pub fn recompute_io(&mut self, switches: &SoftSwitches) {
        let rom = if switches.rom_internal {
            delta(MEM_ROM_INTERNAL, MEM_PHYS_IO)
        } else {
            delta(MEM_ROM_EXTERNAL, MEM_PHYS_IO)
        };
        for page in 0xC1..0xD0 {
            self.tables.read[page] = rom;
        }

        self.tables.read[0xC3] = if switches.rom_slot3_external {
            delta(MEM_ROM_EXTERNAL, MEM_PHYS_IO)
        } else {
            delta(MEM_ROM_INTERNAL, MEM_PHYS_IO)
        };
    }

    /// $D000-$FFFF: ランゲージカード
    pub fn recompute_language_card(&mut self, switches: &SoftSwitches) {
        let (lc_low, lc_high) = match (switches.aux_zero_page, switches.lc_bank2) {
            (true, true) => (MEM_AUX_LC2, MEM_AUX_LC_HIGH),
            (true, false) => (MEM_AUX_LC1, MEM_AUX_LC_HIGH),
            (false, true) => (MEM_MAIN_LC2, MEM_MAIN_LC_HIGH),
            (false, false) => (MEM_MAIN_LC1, MEM_MAIN_LC_HIGH),
        };

        let (read_low, read_high) = if switches.lc_read_enable {
            (delta(lc_low, MEM_PHYS_ROM_LOW), delta(lc_high, MEM_PHYS_ROM_HIGH))
        } else {
            // ROMは $D000-$FFFF が連続して置かれている
            let rom = delta(MEM_ROM_MAIN_LOW, MEM_PHYS_ROM_LOW);
            (rom, rom)
        };

        let (write_low, write_high) = if switches.lc_write_enable {
            (delta(lc_low, MEM_PHYS_ROM_LOW), delta(lc_high, MEM_PHYS_ROM_HIGH))
        } else {
            (delta(MEM_WASTE, MEM_PHYS_ROM_LOW), delta(MEM_WASTE, MEM_PHYS_ROM_HIGH))
        };

        let t = &mut self.tables;
        for page in 0xD0..0xE0 {
            t.read[page] = read_low;
            t.write[page] = write_low;
        }
        for page in 0xE0..0x100 {
            t.read[page] = read_high;
            t.write[page] = write_high;
        }
    }

    /// ゼロページ+スタックの物理的な入れ替え
    /// フラグを切り替える前に呼ぶこと
    pub fn swap_zero_page(&mut self, to_aux: bool) {
        if to_aux {
            self.store.copy_region(MEM_PHYS_ZP, MEM_MAIN_ZP, ZP_STACK_SIZE);
            self.store.copy_region(MEM_AUX_ZP, MEM_PHYS_ZP, ZP_STACK_SIZE);
        } else {
            self.store.copy_region(MEM_PHYS_ZP, MEM_AUX_ZP, ZP_STACK_SIZE);
            self.store.copy_region(MEM_MAIN_ZP, MEM_PHYS_ZP, ZP_STACK_SIZE);
        }
    }

    /// 32KB ROMイメージをロード
    ///
    /// BASICの先頭命令（JSR/JMP）が見つかる位置からアラインメントを決め、
    /// メインROM(12KB)、内部$Cxxx ROM(4KB)、$C800 ROM(2KB)にコピーする。
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<(), RomError> {
        if rom.len() != ROM_IMAGE_SIZE {
            return Err(RomError::InvalidSize(rom.len()));
        }

        let offset = ROM_ALIGN_CANDIDATES
            .iter()
            .copied()
            .find(|&offset| matches!(rom[offset + 0x1000], 0x20 | 0x4C))
            .ok_or(RomError::UnrecognizedImage)?;

        self.store
            .region_mut(MEM_ROM_MAIN_LOW, 0x3000)
            .copy_from_slice(&rom[offset..offset + 0x3000]);
        self.store
            .region_mut(MEM_ROM_INTERNAL, 0x1000)
            .copy_from_slice(&rom[offset + 0x3000..offset + 0x4000]);
        self.store
            .region_mut(MEM_ROM_EXTERNAL + 0x800, 0x800)
            .copy_from_slice(&rom[offset + 0x3800..offset + 0x4000]);

        // 空のスロットROMが 0 だと起動時に誤検出されるので埋める
        for slot in 1..8 {
            let base = MEM_ROM_EXTERNAL + (slot << 8);
            if self.store.get(base) == 0 {
                self.store.region_mut(base, 0x100).fill(EMPTY_SLOT_FILL);
            }
        }

        log::info!("ROM loaded (BASIC entry at image offset ${:04X})", offset);
        Ok(())
    }

    /// スロットROM（$Cn00-$CnFF）を外部ROM領域に配置
    pub fn install_slot_rom(&mut self, slot: usize, image: &[u8; 256]) {
        let base = MEM_ROM_EXTERNAL + (slot << 8);
        self.store.region_mut(base, 0x100).copy_from_slice(image);
    }
}
