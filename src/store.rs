//! 物理メモリアリーナ
//!
//! メインRAM・補助RAM・ランゲージカード・ROM・書き込み捨て領域を
//! 1つのバイト配列に同時配置する。論理アドレスは `memory.rs` の
//! ページテーブルでこの配列内のオフセットに変換される。

// 論理アドレスと同じ位置に置かれる「現在見えている」領域
pub const MEM_PHYS_ZP: usize = 0x00000;
pub const MEM_PHYS_STACK: usize = 0x00100;
pub const MEM_PHYS_RAM1: usize = 0x00200;
pub const MEM_PHYS_TEXT: usize = 0x00400;
pub const MEM_PHYS_RAM2: usize = 0x00800;
pub const MEM_PHYS_HIRES: usize = 0x02000;
pub const MEM_PHYS_RAM3: usize = 0x04000;
pub const MEM_PHYS_IO: usize = 0x0C000;
pub const MEM_PHYS_ROM_LOW: usize = 0x0D000;
pub const MEM_PHYS_ROM_HIGH: usize = 0x0E000;

// メインRAM（$C000-$CFFFはI/Oなので、LCバンク1をそこに置く）
pub const MEM_MAIN_RAM1: usize = 0x00200;
pub const MEM_MAIN_TEXT: usize = 0x00400;
pub const MEM_MAIN_RAM2: usize = 0x00800;
pub const MEM_MAIN_HIRES: usize = 0x02000;
pub const MEM_MAIN_RAM3: usize = 0x04000;
pub const MEM_MAIN_LC1: usize = 0x0C000;
pub const MEM_MAIN_LC2: usize = 0x0D000;
pub const MEM_MAIN_LC_HIGH: usize = 0x0E000;

// 補助RAM（80列カード）
pub const MEM_AUX_ZP: usize = 0x10000;
pub const MEM_AUX_STACK: usize = 0x10100;
pub const MEM_AUX_RAM1: usize = 0x10200;
pub const MEM_AUX_TEXT: usize = 0x10400;
pub const MEM_AUX_RAM2: usize = 0x10800;
pub const MEM_AUX_HIRES: usize = 0x12000;
pub const MEM_AUX_RAM3: usize = 0x14000;
pub const MEM_AUX_LC1: usize = 0x1C000;
pub const MEM_AUX_LC2: usize = 0x1D000;
pub const MEM_AUX_LC_HIGH: usize = 0x1E000;

// ROMイメージ
pub const MEM_ROM_MAIN_LOW: usize = 0x20000;
pub const MEM_ROM_MAIN_HIGH: usize = 0x21000;
pub const MEM_ROM_INTERNAL: usize = 0x23000;
pub const MEM_ROM_EXTERNAL: usize = 0x24000;

/// 補助ゼロページ使用中にメインのゼロページ+スタックを退避する場所
pub const MEM_MAIN_ZP: usize = 0x25000;
pub const MEM_MAIN_STACK: usize = 0x25100;

/// 書き込み捨て領域（ROMやスロットROMへの書き込み先）
pub const MEM_WASTE: usize = 0x25200;

pub const MEM_END: usize = 0x28000;

/// ゼロページ+スタックのサイズ
pub const ZP_STACK_SIZE: usize = 0x200;

/// 物理メモリ
#[derive(Clone)]
pub struct PhysicalStore {
    bytes: Box<[u8]>,
}

impl Default for PhysicalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicalStore {
    pub fn new() -> Self {
        PhysicalStore {
            bytes: vec![0u8; MEM_END].into_boxed_slice(),
        }
    }

    /// 状態復元用: サイズが合わない場合は None
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != MEM_END {
            return None;
        }
        Some(PhysicalStore {
            bytes: bytes.to_vec().into_boxed_slice(),
        })
    }

    #[inline(always)]
    pub fn get(&self, offset: usize) -> u8 {
        self.bytes[offset]
    }

    #[inline(always)]
    pub fn set(&mut self, offset: usize, value: u8) {
        self.bytes[offset] = value;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn region(&self, base: usize, len: usize) -> &[u8] {
        &self.bytes[base..base + len]
    }

    pub fn region_mut(&mut self, base: usize, len: usize) -> &mut [u8] {
        &mut self.bytes[base..base + len]
    }

    /// 領域間コピー（重なりなしを前提としない）
    pub fn copy_region(&mut self, from: usize, to: usize, len: usize) {
        self.bytes.copy_within(from..from + len, to);
    }

    /// RAM領域（ROMより前）をゼロクリア
    pub fn clear_ram(&mut self) {
        self.bytes[..MEM_ROM_MAIN_LOW].fill(0);
        self.bytes[MEM_MAIN_ZP..MEM_WASTE].fill(0);
    }

    /// 物理オフセットが補助RAMに属するか
    #[inline]
    pub fn is_aux(offset: usize) -> bool {
        (MEM_AUX_ZP..MEM_ROM_MAIN_LOW).contains(&offset)
    }
}
