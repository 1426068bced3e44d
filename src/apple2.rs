//! Apple II バス
//!
//! メモリ、ソフトスイッチ、スロットを統合し、CPUコアに `MemoryBus` を提供する。
//! CPUコア自体は外部にあり、クロックとPCだけをここに通知する。

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bus::MemoryBus;
use crate::dirty::DirtyBitmap;
use crate::disk::DiskII;
use crate::error::{DiskError, RomError, StateError};
use crate::memory::Memory;
use crate::paddle::Paddles;
use crate::peripheral::{BusContext, Peripheral};
use crate::savestate::SaveState;
use crate::speaker::SpeakerFlips;
use crate::store::{PhysicalStore, MEM_PHYS_ZP};
use crate::switches::{GraphicsMode, IoAction, MemorySwitch, SoftSwitches, StatusFlag, READ_MAP, WRITE_MAP};

/// Disk IIを挿すスロット
pub const DISK_SLOT: usize = 6;

/// リセット時にIOU/MMUへ書き込むアドレス
const RESET_WRITES: [u8; 14] = [
    0x00, 0x02, 0x04, 0x06, 0x08, 0x0A, 0x0C, 0x0E, 0x50, 0x52, 0x54, 0x56, 0x5F, 0x82,
];

/// 起動時に乱数で初期化されるゼロページのアドレス
const RANDOM_SEED_ADDRESS: usize = 0xCD;

/// Apple IIのメイン構造体（CPUを除く）
pub struct Apple2 {
    /// メモリシステム
    memory: Memory,
    /// ソフトスイッチ
    switches: SoftSwitches,
    /// キーボードラッチ（bit7 = ストローブ）
    keyboard_latch: u8,
    /// CPUが進めるクロック
    clock: u64,
    paddles: Paddles,
    speaker: SpeakerFlips,
    /// スロット0-7（0は未使用）
    slots: [Peripheral; 8],
    /// ビデオ合成側と共有するダーティページ
    dirty: Arc<DirtyBitmap>,
    /// CPUが公開しているPC（ディスク早送り用）
    pc: Option<u16>,
    rng: StdRng,
}

impl Default for Apple2 {
    fn default() -> Self {
        Self::new()
    }
}

impl Apple2 {
    /// スロット6にDisk IIを挿した状態で電源投入
    pub fn new() -> Self {
        let switches = SoftSwitches::default();
        let mut apple2 = Apple2 {
            memory: Memory::new(&switches),
            switches,
            keyboard_latch: 0,
            clock: 0,
            paddles: Paddles::new(),
            speaker: SpeakerFlips::new(),
            slots: std::array::from_fn(|_| Peripheral::default()),
            dirty: Arc::new(DirtyBitmap::new()),
            pc: None,
            rng: StdRng::from_entropy(),
        };
        apple2.install_disk_ii(DiskII::new());
        apple2.restart();
        apple2
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn set_clock(&mut self, clock: u64) {
        self.clock = clock;
    }

    /// CPUが命令を実行した分だけクロックを進める
    pub fn advance_clock(&mut self, cycles: u64) {
        self.clock += cycles;
    }

    /// 次に実行する命令のアドレスを通知（ディスク早送りが参照する）
    pub fn observe_pc(&mut self, pc: u16) {
        self.pc = Some(pc);
    }

    pub fn clear_pc(&mut self) {
        self.pc = None;
    }

    /// キー入力（ASCII）
    pub fn set_key(&mut self, key: u8) {
        self.keyboard_latch = (key & 0x7F) | 0x80;
    }

    pub fn keyboard_latch(&self) -> u8 {
        self.keyboard_latch
    }

    pub fn set_paddle(&mut self, paddle: usize, value: u8) {
        self.paddles.set_position(paddle, value);
    }

    pub fn set_button(&mut self, button: usize, pressed: bool) {
        self.paddles.set_button(button, pressed);
    }

    /// スピーカー反転タイミングのリングバッファ
    pub fn speaker(&self) -> &SpeakerFlips {
        &self.speaker
    }

    pub fn switches(&self) -> &SoftSwitches {
        &self.switches
    }

    /// ビデオ合成側が参照する画面モード
    pub fn graphics_mode(&self) -> GraphicsMode {
        self.switches.graphics
    }

    /// ダーティページ（描画スレッドに渡す）
    pub fn dirty(&self) -> Arc<DirtyBitmap> {
        Arc::clone(&self.dirty)
    }

    /// 物理メモリ全体（ビデオ合成用）
    pub fn store(&self) -> &[u8] {
        self.memory.store.as_slice()
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// 32KBシステムROMをロード。失敗時は警告して状態を変えない
    pub fn load_rom(&mut self, rom: &[u8]) -> bool {
        match self.try_load_rom(rom) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Cannot load ROM: {}", e);
                false
            }
        }
    }

    pub fn try_load_rom(&mut self, rom: &[u8]) -> Result<(), RomError> {
        self.memory.load_rom(rom)
    }

    /// スロットにカードを挿し、ROMイメージを外部ROM領域へコピー
    pub fn set_peripheral(&mut self, slot: usize, peripheral: Peripheral) {
        let slot = slot & 7;
        self.memory.install_slot_rom(slot, &peripheral.rom_image());
        self.slots[slot] = peripheral;
    }

    pub fn peripheral(&self, slot: usize) -> &Peripheral {
        &self.slots[slot & 7]
    }

    pub fn install_disk_ii(&mut self, disk: DiskII) {
        self.set_peripheral(DISK_SLOT, Peripheral::disk_ii(disk));
    }

    pub fn disk(&self) -> Option<&DiskII> {
        self.slots[DISK_SLOT].as_disk()
    }

    pub fn disk_mut(&mut self) -> Option<&mut DiskII> {
        self.slots[DISK_SLOT].as_disk_mut()
    }

    /// スロット6のドライブにディスクイメージを挿入
    pub fn mount(&mut self, drive: usize, data: &[u8], name: &str, write_protected: bool, volume: u8) -> bool {
        match self.disk_mut() {
            Some(disk) => disk.mount(drive, data, name, write_protected, volume),
            None => {
                log::warn!("No Disk II in slot {}", DISK_SLOT);
                false
            }
        }
    }

    pub fn unmount(&mut self, drive: usize) -> bool {
        self.disk_mut().map_or(false, |disk| disk.unmount(drive))
    }

    /// Disk IIブートROMをロードし、$C600に見えるようにする
    pub fn load_disk_rom(&mut self, data: &[u8]) -> Result<(), DiskError> {
        if self.disk().is_none() {
            self.install_disk_ii(DiskII::new());
        }
        if let Some(disk) = self.disk_mut() {
            disk.load_boot_rom(data)?;
        }
        let image = self.slots[DISK_SLOT].rom_image();
        self.memory.install_slot_rom(DISK_SLOT, &image);
        log::info!("Disk II boot ROM installed in slot {}", DISK_SLOT);
        Ok(())
    }

    /// リセット（RAMは保持）
    pub fn reset(&mut self) {
        self.power_cycle(false);
    }

    /// 電源再投入（RAMをクリア）
    pub fn restart(&mut self) {
        self.power_cycle(true);
    }

    fn power_cycle(&mut self, restart: bool) {
        for &address in RESET_WRITES.iter() {
            self.io_write(address, 0);
        }

        if restart {
            self.memory.store.clear_ram();
            let seed = self.rng.gen();
            self.memory.store.set(MEM_PHYS_ZP + RANDOM_SEED_ADDRESS, seed);
            self.dirty.mark_all();
        }

        for slot in self.slots.iter_mut().skip(1) {
            slot.reset();
        }
        log::debug!("Machine {}", if restart { "restarted" } else { "reset" });
    }

    /// 副作用なしの読み取り（I/Oページは 0）
    pub fn peek(&self, address: u16) -> u8 {
        self.memory.peek(address)
    }

    fn bus_context(&self) -> BusContext {
        let code = self.pc.map(|pc| {
            [
                self.peek(pc),
                self.peek(pc.wrapping_add(1)),
                self.peek(pc.wrapping_add(2)),
                self.peek(pc.wrapping_add(3)),
            ]
        });
        BusContext { clock: self.clock, code }
    }

    /// フローティングバス: ビデオが直前に読んだバイトの近似
    fn floating_bus(&self) -> u8 {
        self.memory.store.get((self.clock & 0x3FFF) as usize)
    }

    fn set_graphics(&mut self, mode: GraphicsMode, on: bool) {
        self.switches.graphics.set(mode, on);
        if mode.intersects(GraphicsMode::MAIN_MAP_BITS) {
            self.memory.recompute_main(&self.switches);
        }
    }

    fn set_memory_switch(&mut self, switch: MemorySwitch, on: bool) {
        match switch {
            MemorySwitch::AuxRead => {
                self.switches.aux_read = on;
                self.memory.recompute_main(&self.switches);
            }
            MemorySwitch::AuxWrite => {
                self.switches.aux_write = on;
                self.memory.recompute_main(&self.switches);
            }
            MemorySwitch::RomInternal => {
                self.switches.rom_internal = on;
                self.memory.recompute_io(&self.switches);
            }
            MemorySwitch::RomSlot3External => {
                self.switches.rom_slot3_external = on;
                self.memory.recompute_io(&self.switches);
            }
            MemorySwitch::AuxZeroPage => {
                // コピーしてから切り替える
                if on != self.switches.aux_zero_page {
                    self.memory.swap_zero_page(on);
                }
                self.switches.aux_zero_page = on;
                self.memory.recompute_language_card(&self.switches);
            }
        }
    }

    fn set_language_card(&mut self, bank2: bool, read: bool, write: bool) {
        self.switches.lc_bank2 = bank2;
        self.switches.lc_read_enable = read;
        self.switches.lc_write_enable = write;
        self.memory.recompute_language_card(&self.switches);
    }

    /// 読み書き共通の動作。処理したら `true`
    fn shared_io(&mut self, action: IoAction) -> bool {
        match action {
            IoAction::Speaker => self.speaker.toggle(self.clock),
            IoAction::PaddleTrigger => self.paddles.trigger(self.clock),
            IoAction::Graphics(mode, on) => self.set_graphics(mode, on),
            IoAction::LanguageCard { bank2, read, write } => self.set_language_card(bank2, read, write),
            _ => return false,
        }
        true
    }

    /// $C000-$C0FF 読み取り
    pub fn io_read(&mut self, address: u8) -> u8 {
        let action = READ_MAP[address as usize];
        match action {
            IoAction::Keyboard => self.keyboard_latch,
            IoAction::KeyStrobe => {
                self.keyboard_latch &= 0x7F;
                self.keyboard_latch
            }
            IoAction::Status(flag) => {
                if flag == StatusFlag::Vbl {
                    self.switches.video_vbl = !self.switches.video_vbl;
                }
                (self.keyboard_latch & 0x7F) | ((self.switches.status(flag) as u8) << 7)
            }
            IoAction::Button(button) => self.paddles.button_register(button as usize),
            IoAction::Paddle(paddle) => self.paddles.paddle_register(paddle as usize, self.clock),
            IoAction::Slot(slot) => {
                let ctx = self.bus_context();
                self.slots[slot as usize].io_read(address & 0x0F, &ctx)
            }
            IoAction::Memory(..) | IoAction::Floating => self.floating_bus(),
            _ => {
                self.shared_io(action);
                self.floating_bus()
            }
        }
    }

    /// $C000-$C0FF 書き込み
    pub fn io_write(&mut self, address: u8, value: u8) {
        let action = WRITE_MAP[address as usize];
        match action {
            IoAction::KeyStrobe => self.keyboard_latch &= 0x7F,
            IoAction::Memory(switch, on) => self.set_memory_switch(switch, on),
            IoAction::Slot(slot) => {
                let ctx = self.bus_context();
                self.slots[slot as usize].io_write(address & 0x0F, value, &ctx);
            }
            _ => {
                self.shared_io(action);
            }
        }
    }

    /// 現在の状態をセーブステートとして取得
    pub fn snapshot(&self) -> SaveState {
        SaveState {
            version: SaveState::CURRENT_VERSION,
            clock: self.clock,
            switches: self.switches.clone(),
            keyboard_latch: self.keyboard_latch,
            paddles: self.paddles.clone(),
            store: self.memory.store.as_slice().to_vec(),
            disks: self
                .slots
                .iter()
                .enumerate()
                .filter_map(|(slot, p)| p.as_disk().map(|disk| (slot, disk.save_state())))
                .collect(),
        }
    }

    /// セーブステートから状態を復元
    pub fn restore(&mut self, state: &SaveState) -> Result<(), StateError> {
        if state.version != SaveState::CURRENT_VERSION {
            return Err(StateError::Version(state.version));
        }
        let store = PhysicalStore::from_bytes(&state.store).ok_or(StateError::StoreSize(state.store.len()))?;

        self.memory.store = store;
        self.switches = state.switches.clone();
        self.keyboard_latch = state.keyboard_latch;
        self.paddles = state.paddles.clone();
        self.clock = state.clock;
        for (slot, disk_state) in &state.disks {
            if let Some(disk) = self.slots.get_mut(*slot).and_then(Peripheral::as_disk_mut) {
                disk.load_state(disk_state);
            }
        }

        self.memory.recompute_all(&self.switches);
        self.dirty.mark_all();
        log::info!("State restored (clock {})", self.clock);
        Ok(())
    }
}

/// CPUコアから見たメモリバス
impl MemoryBus for Apple2 {
    #[inline]
    fn read(&mut self, address: u16) -> u8 {
        if address & 0xFF00 == 0xC000 {
            self.io_read(address as u8)
        } else {
            self.memory.read(address)
        }
    }

    #[inline]
    fn write(&mut self, address: u16, value: u8) {
        if address & 0xFF00 == 0xC000 {
            self.io_write(address as u8, value);
        } else {
            let offset = self.memory.write(address, value);
            self.dirty.mark_address(address, PhysicalStore::is_aux(offset));
        }
    }
}
