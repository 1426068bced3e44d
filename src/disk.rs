//! Apple II Disk II ドライブエミュレーション
//!
//! Disk II hardware emulation based on "Beneath Apple DOS" documentation
//! 2ドライブ分のニブルトラックを保持し、ステッパー・モーター・
//! シーケンサー（Q6/Q7）をスロットI/O経由で操作する。
//! ディスクへの書き込みはメモリ上のトラックにだけ反映される。

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::disk_image::DiskImage;
use crate::disk_log::{
    log_accelerator_skip, log_drive_select, log_motor_off, log_motor_on, log_mount,
    log_track_change,
};
use crate::error::DiskError;
use crate::gcr::{self, TRACKS};
use crate::peripheral::BusContext;
use crate::savestate::{DiskDriveState, DiskState};

/// ヘッド位置の最大値（ハーフトラック単位、35トラック×2-1）
pub const MAX_HEAD_POSITION: usize = TRACKS * 2 - 1;

/// DOS 3.3 RWTS のアドレスプロローグ待ちループ ($B94F)
/// `BPL *-3 ; CMP #$D5`
const PROLOGUE_POLL: [u8; 4] = [0x10, 0xFB, 0xC9, 0xD5];

const SYNC_D5: u8 = 0xD5;

/// フロッピードライブの状態
#[derive(Clone, Debug)]
pub struct FloppyDrive {
    /// 35トラック分のニブル列
    pub tracks: Vec<Vec<u8>>,
    /// ディスクがロードされているか
    pub disk_loaded: bool,
    /// 書き込みプロテクト
    pub write_protected: bool,
    /// 書き込みがあったか
    pub modified: bool,
    /// イメージ名
    pub name: String,
    /// ヘッド位置（0-69、ハーフトラック単位）
    pub head: usize,
    /// トラック内のニブル位置
    pub cursor: usize,
}

impl Default for FloppyDrive {
    fn default() -> Self {
        Self::new()
    }
}

impl FloppyDrive {
    pub fn new() -> Self {
        let blank = DiskImage::blank();
        FloppyDrive {
            tracks: blank.tracks,
            disk_loaded: false,
            write_protected: false,
            modified: false,
            name: String::new(),
            head: 0,
            cursor: 0,
        }
    }

    /// 現在のトラック番号を取得（0-34）
    #[inline(always)]
    pub fn current_track(&self) -> usize {
        self.head >> 1
    }

    /// 変換済みイメージで中身を置き換える（ヘッド位置は維持）
    fn insert(&mut self, image: DiskImage, name: &str) {
        self.tracks = image.tracks;
        self.write_protected = image.write_protected;
        self.disk_loaded = true;
        self.modified = false;
        self.name = name.to_string();
        self.cursor = 0;
    }
}

/// Disk IIインターフェースカード
#[derive(Clone)]
pub struct DiskII {
    /// ドライブ0と1
    pub drives: [FloppyDrive; 2],
    /// 選択中のドライブ
    curr_drive: usize,
    motor_on: bool,
    /// データラッチ
    latch: u8,
    /// Q7
    write_mode: bool,
    /// Q6
    load_mode: bool,
    /// アドレスプロローグ探索・無効ニブルの早送り
    accelerate: bool,
    /// $C600-$C6FF に見えるブートROM（外部ファイルからロード）
    boot_rom: [u8; 256],
    /// 奇数アドレスのフローティングバス
    rng: StdRng,
}

impl Default for DiskII {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskII {
    pub fn new() -> Self {
        DiskII {
            drives: [FloppyDrive::new(), FloppyDrive::new()],
            curr_drive: 0,
            motor_on: false,
            latch: 0,
            write_mode: false,
            load_mode: false,
            accelerate: true,
            boot_rom: [0u8; 256],
            rng: StdRng::from_entropy(),
        }
    }

    /// リセット（ディスク内容とヘッド位置は維持）
    pub fn reset(&mut self) {
        if self.motor_on {
            log_motor_off(self.curr_drive);
        }
        self.motor_on = false;
        self.write_mode = false;
        self.load_mode = false;
        self.latch = 0;
    }

    pub fn set_accelerate(&mut self, enabled: bool) {
        self.accelerate = enabled;
    }

    pub fn accelerate(&self) -> bool {
        self.accelerate
    }

    /// ディスク1と2を入れ替え
    pub fn swap_disks(&mut self) {
        let (first, second) = self.drives.split_at_mut(1);
        std::mem::swap(&mut first[0].tracks, &mut second[0].tracks);
        std::mem::swap(&mut first[0].disk_loaded, &mut second[0].disk_loaded);
        std::mem::swap(&mut first[0].write_protected, &mut second[0].write_protected);
        std::mem::swap(&mut first[0].modified, &mut second[0].modified);
        std::mem::swap(&mut first[0].name, &mut second[0].name);
        log::info!("Disks swapped: Drive1 <-> Drive2");
    }

    /// ディスクイメージをロード
    ///
    /// 変換がすべて成功してから差し替えるので、失敗時はドライブの中身が変わらない
    pub fn insert_disk(
        &mut self,
        drive: usize,
        data: &[u8],
        name: &str,
        write_protected: bool,
        volume: u8,
    ) -> Result<(), DiskError> {
        if drive > 1 {
            return Err(DiskError::InvalidDrive(drive));
        }
        let image = DiskImage::parse(data, name, write_protected, volume)?;
        log_mount(drive, name, image.format.label(), image.write_protected);
        self.drives[drive].insert(image, name);
        Ok(())
    }

    /// `insert_disk` の成否だけを返す版
    pub fn mount(&mut self, drive: usize, data: &[u8], name: &str, write_protected: bool, volume: u8) -> bool {
        match self.insert_disk(drive, data, name, write_protected, volume) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("D{}: cannot mount {}: {}", drive + 1, name, e);
                false
            }
        }
    }

    /// 書き戻しは未実装なので何もしない（常に成功）
    pub fn unmount(&mut self, drive: usize) -> bool {
        if let Some(d) = self.drives.get(drive) {
            if d.modified {
                log::info!("D{}: in-memory changes to {} are not written back", drive + 1, d.name);
            }
        }
        true
    }

    /// 外部ファイルからブートROMをロード
    pub fn load_boot_rom(&mut self, data: &[u8]) -> Result<(), DiskError> {
        if data.len() != 256 {
            return Err(DiskError::BadBootRom("boot ROM must be exactly 256 bytes"));
        }
        // Disk II ROMは 0xA2 0x20 で始まる (LDX #$20)
        if data[0] != 0xA2 || data[1] != 0x20 {
            return Err(DiskError::BadBootRom("missing LDX #$20 signature"));
        }
        self.boot_rom.copy_from_slice(data);
        Ok(())
    }

    /// ROMがロードされているかチェック
    pub fn is_rom_loaded(&self) -> bool {
        self.boot_rom[0] == 0xA2 && self.boot_rom[1] == 0x20
    }

    /// ブートROMからの読み取り
    pub fn memory_read(&self, address: u8) -> u8 {
        self.boot_rom[address as usize]
    }

    /// I/O読み取り ($C0n0-$C0nF)
    pub fn io_read(&mut self, address: u8, ctx: &BusContext) -> u8 {
        let reg = address & 0x0F;
        self.access(reg, ctx);
        if reg & 1 != 0 {
            return self.rng.gen();
        }
        // Q6H・Q7L・モーターONなら偶数アドレスは書き込みプロテクトを返す
        if self.sensing_write_protect() {
            if self.drives[self.curr_drive].write_protected {
                0x80
            } else {
                0x00
            }
        } else {
            self.latch
        }
    }

    /// I/O書き込み ($C0n0-$C0nF)
    pub fn io_write(&mut self, address: u8, value: u8, ctx: &BusContext) {
        // データロード書き込みモードならラッチに値を設定（$C0nC はその値を書く）
        if self.write_mode && self.load_mode {
            self.latch = value;
        }
        self.access(address & 0x0F, ctx);
        if self.write_mode && self.load_mode {
            self.latch = value;
        }
    }

    fn sensing_write_protect(&self) -> bool {
        self.load_mode && !self.write_mode && self.motor_on
    }

    /// 読み書き共通の動作
    fn access(&mut self, reg: u8, ctx: &BusContext) {
        match reg {
            0x00..=0x07 => self.control_stepper(reg),
            0x08 => self.control_motor(false),
            0x09 => self.control_motor(true),
            0x0A => self.enable_drive(0),
            0x0B => self.enable_drive(1),
            0x0C => {
                self.load_mode = false;
                self.read_write_nibble(ctx);
            }
            0x0D => self.load_mode = true,
            0x0E => self.write_mode = false,
            0x0F => self.write_mode = true,
            _ => {}
        }
    }

    /// モーター制御
    fn control_motor(&mut self, on: bool) {
        if on != self.motor_on {
            if on {
                log_motor_on(self.curr_drive);
            } else {
                log_motor_off(self.curr_drive);
            }
        }
        self.motor_on = on;
    }

    /// ドライブ選択（ヘッド位置はドライブごとに保持）
    fn enable_drive(&mut self, drive: usize) {
        if drive != self.curr_drive {
            self.curr_drive = drive;
            log_drive_select(drive);
        }
    }

    /// ステッパーモーター制御
    ///
    /// 奇数アドレスでフェーズ `reg>>1` の磁石がONになる。現在位置の隣の
    /// フェーズなら1ステップ移動し、それ以外は無視。OFFでは動かない。
    fn control_stepper(&mut self, reg: u8) {
        if reg & 1 == 0 {
            return;
        }
        let phase = (reg >> 1) as usize & 3;
        let drive = &mut self.drives[self.curr_drive];
        let old_track = drive.current_track();
        let position = drive.head & 3;

        if position == (phase + 1) & 3 {
            drive.head = drive.head.saturating_sub(1);
        } else if position == (phase + 3) & 3 {
            drive.head = (drive.head + 1).min(MAX_HEAD_POSITION);
        }

        let new_track = drive.current_track();
        if new_track != old_track {
            log_track_change(old_track, new_track);
        }
    }

    /// $C0nC: 読み取りモードならニブルを読み、書き込みモードならラッチを書く
    fn read_write_nibble(&mut self, ctx: &BusContext) {
        let drive = &mut self.drives[self.curr_drive];
        let track_num = drive.current_track();
        let track = &mut drive.tracks[track_num];
        let len = track.len();
        if len == 0 {
            return;
        }
        let mut cursor = drive.cursor % len;

        if self.write_mode {
            if !drive.write_protected {
                track[cursor] = self.latch;
                drive.modified = true;
            }
        } else {
            self.latch = track[cursor];

            if let (true, Some(code)) = (self.accelerate, ctx.code) {
                let start = cursor;
                if self.latch != SYNC_D5 && code == PROLOGUE_POLL {
                    // アドレスプロローグ待ちループ: 次の $D5 まで早送り
                    for _ in 0..len {
                        cursor = (cursor + 1) % len;
                        self.latch = track[cursor];
                        if self.latch == SYNC_D5 {
                            break;
                        }
                    }
                    log_accelerator_skip(track_num, start, cursor, SYNC_D5);
                } else if self.latch == gcr::FILLER_NIBBLE {
                    // トラック末尾の無効ニブルを読み飛ばす
                    for _ in 0..len {
                        cursor = (cursor + 1) % len;
                        self.latch = track[cursor];
                        if self.latch != gcr::FILLER_NIBBLE {
                            break;
                        }
                    }
                    log_accelerator_skip(track_num, start, cursor, gcr::FILLER_NIBBLE);
                }
            }
        }

        drive.cursor = (cursor + 1) % len;
    }

    /// モーターが回っているか
    pub fn is_motor_on(&self) -> bool {
        self.motor_on
    }

    /// ドライブの状態を取得 (ロード済み, モーター回転中, 書き込みプロテクト)
    pub fn get_drive_status(&self, drive: usize) -> (bool, bool, bool) {
        let d = &self.drives[drive & 1];
        (
            d.disk_loaded,
            self.motor_on && self.curr_drive == drive,
            d.write_protected,
        )
    }

    /// 現在のトラックを取得
    pub fn get_current_track(&self) -> usize {
        self.drives[self.curr_drive].current_track()
    }

    /// 現在のドライブを取得
    pub fn get_current_drive(&self) -> usize {
        self.curr_drive
    }

    /// 現在のデータラッチ
    pub fn latch(&self) -> u8 {
        self.latch
    }

    /// トラックのニブル列
    pub fn track(&self, drive: usize, track: usize) -> Option<&[u8]> {
        self.drives.get(drive)?.tracks.get(track).map(Vec::as_slice)
    }

    /// 現在の状態をセーブステートとして取得
    pub fn save_state(&self) -> DiskState {
        let drive_state = |d: &FloppyDrive| DiskDriveState {
            disk_loaded: d.disk_loaded,
            write_protected: d.write_protected,
            modified: d.modified,
            name: d.name.clone(),
            tracks: d.tracks.clone(),
            head: d.head,
            cursor: d.cursor,
        };
        DiskState {
            curr_drive: self.curr_drive,
            drives: [drive_state(&self.drives[0]), drive_state(&self.drives[1])],
            latch: self.latch,
            write_mode: self.write_mode,
            load_mode: self.load_mode,
            motor_on: self.motor_on,
            boot_rom: self.boot_rom.to_vec(),
        }
    }

    /// セーブステートから状態を復元
    pub fn load_state(&mut self, state: &DiskState) {
        self.curr_drive = state.curr_drive & 1;
        self.latch = state.latch;
        self.write_mode = state.write_mode;
        self.load_mode = state.load_mode;
        self.motor_on = state.motor_on;
        if state.boot_rom.len() == self.boot_rom.len() {
            self.boot_rom.copy_from_slice(&state.boot_rom);
        }

        for (drive, saved) in self.drives.iter_mut().zip(state.drives.iter()) {
            drive.disk_loaded = saved.disk_loaded;
            drive.write_protected = saved.write_protected;
            drive.modified = saved.modified;
            drive.name = saved.name.clone();
            if saved.tracks.len() == TRACKS && saved.tracks.iter().all(|t| !t.is_empty()) {
                drive.tracks = saved.tracks.clone();
            }
            drive.head = saved.head.min(MAX_HEAD_POSITION);
            drive.cursor = saved.cursor;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcr::{DSK_SIZE, FILLER_NIBBLE, NIB_SIZE, NIB_TRACK_SIZE};

    fn no_pc() -> BusContext {
        BusContext::default()
    }

    fn with_code(code: [u8; 4]) -> BusContext {
        BusContext {
            clock: 0,
            code: Some(code),
        }
    }

    fn nib_disk(fill: u8) -> Vec<u8> {
        vec![fill; NIB_SIZE]
    }

    /// Q1, Q2, Q3, Q0 の順にONにすると前進する
    fn step_forward(disk: &mut DiskII, phase: &mut usize) {
        *phase = (*phase + 1) & 3;
        disk.io_read((*phase as u8) * 2 + 1, &no_pc());
        disk.io_read((*phase as u8) * 2, &no_pc());
    }

    #[test]
    fn test_stepper_moves_forward_to_limit() {
        let mut disk = DiskII::new();
        let mut phase = 0;
        let mut last = disk.drives[0].head;
        for _ in 0..MAX_HEAD_POSITION {
            step_forward(&mut disk, &mut phase);
            let head = disk.drives[0].head;
            assert_eq!(head, last + 1);
            last = head;
        }
        assert_eq!(last, MAX_HEAD_POSITION);
        assert_eq!(disk.get_current_track(), 34);

        // 69 (&3 = 1) で前進方向のQ2を叩き続けても止まったまま
        for _ in 0..8 {
            disk.io_read(0x05, &no_pc());
            assert_eq!(disk.drives[0].head, MAX_HEAD_POSITION);
        }
    }

    #[test]
    fn test_stepper_ignores_non_adjacent_phase() {
        let mut disk = DiskII::new();
        // 位置0でQ2は反対側
        disk.io_read(0x05, &no_pc());
        assert_eq!(disk.drives[0].head, 0);
        // Q3 (後退方向) も0より下には行かない
        disk.io_read(0x07, &no_pc());
        assert_eq!(disk.drives[0].head, 0);
        // OFFアドレスは何もしない
        disk.io_read(0x02, &no_pc());
        assert_eq!(disk.drives[0].head, 0);
    }

    #[test]
    fn test_stepper_moves_backward() {
        let mut disk = DiskII::new();
        disk.drives[0].head = 10;
        // 位置 10 (&3 = 2): Q1 で後退
        disk.io_read(0x03, &no_pc());
        assert_eq!(disk.drives[0].head, 9);
    }

    #[test]
    fn test_drive_select_keeps_head_per_drive() {
        let mut disk = DiskII::new();
        disk.drives[0].head = 20;
        disk.io_read(0x0B, &no_pc());
        assert_eq!(disk.get_current_drive(), 1);
        assert_eq!(disk.get_current_track(), 0);
        disk.io_read(0x0A, &no_pc());
        assert_eq!(disk.get_current_track(), 10);
    }

    #[test]
    fn test_write_protect_sense() {
        let mut disk = DiskII::new();
        assert!(disk.mount(0, &nib_disk(0x96), "wp.nib", true, 254));
        disk.io_read(0x09, &no_pc());
        disk.io_read(0x0D, &no_pc());
        assert_eq!(disk.io_read(0x0E, &no_pc()), 0x80);

        assert!(disk.mount(0, &nib_disk(0x96), "rw.nib", false, 254));
        disk.io_read(0x0D, &no_pc());
        assert_eq!(disk.io_read(0x0E, &no_pc()), 0x00);
    }

    #[test]
    fn test_write_protect_sense_needs_motor() {
        let mut disk = DiskII::new();
        assert!(disk.mount(0, &nib_disk(0x96), "wp.nib", true, 254));
        disk.io_read(0x0D, &no_pc());
        // モーター停止中はラッチがそのまま返る
        assert_eq!(disk.io_read(0x0E, &no_pc()), disk.latch());
    }

    #[test]
    fn test_write_protect_sense_on_any_even_address() {
        let mut disk = DiskII::new();
        assert!(disk.mount(0, &nib_disk(0x96), "wp.nib", true, 254));
        disk.io_read(0x09, &no_pc());
        disk.io_read(0x0D, &no_pc());
        assert_eq!(disk.io_read(0x0A, &no_pc()), 0x80);
        assert_eq!(disk.io_read(0x04, &no_pc()), 0x80);
        assert_eq!(disk.drives[0].head, 0);

        // $C0nC はQ6を落としてからニブルを読む
        assert_eq!(disk.io_read(0x0C, &no_pc()), 0x96);
        assert_eq!(disk.io_read(0x0A, &no_pc()), 0x96);

        // 書き込みモード中は検出しない
        disk.io_read(0x0F, &no_pc());
        disk.io_read(0x0D, &no_pc());
        assert_eq!(disk.io_read(0x0A, &no_pc()), 0x96);
    }

    #[test]
    fn test_write_to_c_register_stores_value() {
        let mut disk = DiskII::new();
        assert!(disk.mount(0, &nib_disk(0x96), "rw.nib", false, 254));
        disk.io_read(0x09, &no_pc());
        disk.io_write(0x0F, 0x00, &no_pc());
        disk.io_write(0x0D, 0x11, &no_pc());
        disk.io_write(0x0C, 0xD5, &no_pc());
        assert_eq!(disk.track(0, 0).unwrap()[0], 0xD5);
        assert_eq!(disk.latch(), 0xD5);
        assert_eq!(disk.drives[0].cursor, 1);
    }

    #[test]
    fn test_write_sequence_commits_latch() {
        let mut disk = DiskII::new();
        assert!(disk.mount(0, &nib_disk(0x96), "rw.nib", false, 254));
        disk.io_read(0x09, &no_pc());
        disk.io_read(0x0D, &no_pc());
        disk.io_read(0x0E, &no_pc());
        // STA $C08F,X ; ORA $C08C,X
        disk.io_write(0x0F, 0xD5, &no_pc());
        disk.io_read(0x0C, &no_pc());
        // STA $C08D,X ; ORA $C08C,X
        disk.io_write(0x0D, 0xAA, &no_pc());
        disk.io_read(0x0C, &no_pc());

        let track = disk.track(0, 0).unwrap();
        assert_eq!(&track[..3], &[0xD5, 0xAA, 0x96]);
        assert!(disk.drives[0].modified);
        assert_eq!(disk.drives[0].cursor, 2);
    }

    #[test]
    fn test_write_to_protected_disk_ignored() {
        let mut disk = DiskII::new();
        assert!(disk.mount(0, &nib_disk(0x96), "wp.nib", true, 254));
        disk.io_write(0x0F, 0x00, &no_pc());
        disk.io_write(0x0D, 0x12, &no_pc());
        disk.io_read(0x0C, &no_pc());
        assert_eq!(disk.track(0, 0).unwrap()[0], 0x96);
        assert_eq!(disk.drives[0].cursor, 1);
        assert!(!disk.drives[0].modified);
    }

    #[test]
    fn test_filler_read_without_pc_window() {
        let mut disk = DiskII::new();
        let mut data = nib_disk(FILLER_NIBBLE);
        data[100] = 0xD5;
        assert!(disk.mount(0, &data, "f.nib", false, 254));
        assert_eq!(disk.io_read(0x0C, &no_pc()), FILLER_NIBBLE);
        assert_eq!(disk.drives[0].cursor, 1);
    }

    #[test]
    fn test_filler_skipped_with_accelerator() {
        let mut disk = DiskII::new();
        let mut data = nib_disk(FILLER_NIBBLE);
        data[100] = 0xAB;
        assert!(disk.mount(0, &data, "f.nib", false, 254));
        assert_eq!(disk.io_read(0x0C, &with_code([0xEA; 4])), 0xAB);
        assert_eq!(disk.drives[0].cursor, 101);

        disk.set_accelerate(false);
        disk.drives[0].cursor = 0;
        assert_eq!(disk.io_read(0x0C, &with_code([0xEA; 4])), FILLER_NIBBLE);
        assert_eq!(disk.drives[0].cursor, 1);
    }

    #[test]
    fn test_prologue_poll_seeks_d5() {
        let mut disk = DiskII::new();
        let image: Vec<u8> = (0..DSK_SIZE).map(|i| i as u8).collect();
        assert!(disk.mount(0, &image, "dos.dsk", false, 254));
        disk.drives[0].cursor = 30;
        assert_eq!(disk.io_read(0x0C, &with_code(PROLOGUE_POLL)), 0xD5);
        let cursor = disk.drives[0].cursor;
        assert_eq!(disk.track(0, 0).unwrap()[cursor - 1], 0xD5);
        // 次の読み取りは $AA
        assert_eq!(disk.io_read(0x0C, &with_code([0; 4])), 0xAA);
    }

    #[test]
    fn test_prologue_poll_on_d5_reads_one_nibble() {
        let mut disk = DiskII::new();
        let mut data = nib_disk(0x96);
        data[10] = 0xD5;
        data[20] = 0xD5;
        assert!(disk.mount(0, &data, "p.nib", false, 254));
        disk.drives[0].cursor = 10;
        assert_eq!(disk.io_read(0x0C, &with_code(PROLOGUE_POLL)), 0xD5);
        assert_eq!(disk.drives[0].cursor, 11);
    }

    #[test]
    fn test_prologue_poll_ignored_without_accelerator() {
        let mut disk = DiskII::new();
        let mut data = nib_disk(0x96);
        data[20] = 0xD5;
        assert!(disk.mount(0, &data, "p.nib", false, 254));
        disk.set_accelerate(false);
        assert_eq!(disk.io_read(0x0C, &with_code(PROLOGUE_POLL)), 0x96);
        assert_eq!(disk.drives[0].cursor, 1);
    }

    #[test]
    fn test_even_addresses_return_latch() {
        let mut disk = DiskII::new();
        assert!(disk.mount(0, &nib_disk(0x96), "a.nib", false, 254));
        assert_eq!(disk.io_read(0x0C, &no_pc()), 0x96);
        assert_eq!(disk.io_read(0x08, &no_pc()), 0x96);
    }

    #[test]
    fn test_mount_failure_keeps_previous_disk() {
        let mut disk = DiskII::new();
        assert!(disk.mount(1, &nib_disk(0x97), "keep.nib", false, 254));
        let before = disk.drives[1].tracks.clone();
        assert!(!disk.mount(1, &[0u8; 10], "bad.dsk", false, 254));
        assert_eq!(disk.drives[1].tracks, before);
        assert_eq!(disk.drives[1].name, "keep.nib");
        assert_eq!(
            disk.insert_disk(2, &nib_disk(0), "x.nib", false, 254),
            Err(DiskError::InvalidDrive(2))
        );
    }

    #[test]
    fn test_reset_keeps_disk_data() {
        let mut disk = DiskII::new();
        assert!(disk.mount(0, &nib_disk(0x9A), "a.nib", false, 254));
        disk.io_read(0x09, &no_pc());
        disk.io_read(0x0F, &no_pc());
        disk.reset();
        assert!(!disk.is_motor_on());
        assert_eq!(disk.latch(), 0);
        assert!(disk.drives[0].disk_loaded);
        assert_eq!(disk.track(0, 3).unwrap()[0], 0x9A);
    }

    #[test]
    fn test_swap_and_status() {
        let mut disk = DiskII::new();
        assert!(disk.mount(0, &nib_disk(0x9B), "one.nib", true, 254));
        disk.swap_disks();
        assert_eq!(disk.get_drive_status(0), (false, false, false));
        assert_eq!(disk.get_drive_status(1), (true, false, true));
        disk.io_read(0x0B, &no_pc());
        disk.io_read(0x09, &no_pc());
        assert!(disk.get_drive_status(1).1);
        assert_eq!(disk.drives[1].name, "one.nib");
    }

    #[test]
    fn test_unmounted_drive_is_blank() {
        let disk = DiskII::new();
        let track = disk.track(0, 0).unwrap();
        assert_eq!(track.len(), NIB_TRACK_SIZE);
        assert!(track.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_boot_rom_validation() {
        let mut disk = DiskII::new();
        assert!(!disk.is_rom_loaded());
        assert!(disk.load_boot_rom(&[0u8; 256]).is_err());
        assert!(disk.load_boot_rom(&[0xA2, 0x20]).is_err());
        let mut rom = [0u8; 256];
        rom[0] = 0xA2;
        rom[1] = 0x20;
        assert!(disk.load_boot_rom(&rom).is_ok());
        assert!(disk.is_rom_loaded());
        assert_eq!(disk.memory_read(1), 0x20);
    }

    #[test]
    fn test_state_round_trip() {
        let mut disk = DiskII::new();
        assert!(disk.mount(0, &nib_disk(0x9D), "s.nib", false, 254));
        disk.drives[0].head = 7;
        disk.drives[0].cursor = 123;
        let state = disk.save_state();

        let mut restored = DiskII::new();
        restored.load_state(&state);
        assert_eq!(restored.drives[0].head, 7);
        assert_eq!(restored.drives[0].cursor, 123);
        assert_eq!(restored.track(0, 0).unwrap()[0], 0x9D);
        assert!(restored.drives[0].disk_loaded);
    }
}
