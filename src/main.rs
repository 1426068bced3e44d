//! A2BUS - Apple II bus inspector
//!
//! ROMとディスクイメージを読み込み、メモリマップとDisk IIの状態を表示する。
//! CPUコアは持たないので、ソフトスイッチはコマンドラインから叩く。
//!
//! # 使用方法
//! ```text
//! a2bus --rom apple2e.rom -1 dos33.dsk --dump-track 0
//! a2bus --load-state 1 --switch C0E9,C0EC --save-state 1
//! ```

use a2bus::apple2::Apple2;
use a2bus::config::{get_config_path, Config};
use a2bus::disk_log::{self, DiskLogLevel};
use a2bus::gcr::scan_address_fields;
use a2bus::savestate::SaveState;
use a2bus::MemoryBus;
use clap::Parser;
use std::fs;
use std::path::PathBuf;

/// A2BUS - Apple II memory map and Disk II inspector
#[derive(Parser, Debug)]
#[command(name = "a2bus")]
#[command(version = "0.1.0")]
#[command(about = "A2BUS - Apple II memory map and Disk II inspector", long_about = None)]
struct Args {
    /// 設定ファイル（省略時は実行ファイルと同じディレクトリ）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// ROMファイル（32KB）
    #[arg(short, long)]
    rom: Option<String>,

    /// ディスクイメージファイル（ドライブ1）
    #[arg(short = '1', long)]
    disk1: Option<String>,

    /// ディスクイメージファイル（ドライブ2）
    #[arg(short = '2', long)]
    disk2: Option<String>,

    /// Disk II Boot ROM (256 bytes)
    #[arg(long)]
    disk_rom: Option<String>,

    /// 書き込みプロテクト（ドライブ番号 1/2、複数指定可）
    #[arg(short = 'w', long, value_parser = clap::value_parser!(u8).range(1..=2))]
    write_protect: Vec<u8>,

    /// セクタイメージのボリューム番号
    #[arg(long)]
    volume: Option<u8>,

    /// ディスク読み取りの早送りを無効化
    #[arg(long)]
    no_accelerate: bool,

    /// ディスクログ（flow, state, nibble, all を + で連結）
    #[arg(long)]
    disk_log: Option<String>,

    /// ドライブ1の指定トラックのアドレスフィールドを表示
    #[arg(long)]
    dump_track: Option<usize>,

    /// ソフトスイッチを叩く（例: C055,C057）
    #[arg(long, value_delimiter = ',')]
    switch: Vec<String>,

    /// 実効設定を設定ファイルに保存
    #[arg(long)]
    save_config: bool,

    /// セーブスロットから状態を復元（0 = クイックセーブ）
    #[arg(long)]
    load_state: Option<u8>,

    /// 最終状態をセーブスロットに保存（0 = クイックセーブ）
    #[arg(long)]
    save_state: Option<u8>,
}

impl Args {
    /// コマンドライン指定で設定を上書き
    fn apply(&self, config: &mut Config) {
        if let Some(rom) = &self.rom {
            config.rom = Some(rom.clone());
        }
        if let Some(disk) = &self.disk1 {
            config.disk1 = Some(disk.clone());
        }
        if let Some(disk) = &self.disk2 {
            config.disk2 = Some(disk.clone());
        }
        if let Some(rom) = &self.disk_rom {
            config.disk_rom = Some(rom.clone());
        }
        for &drive in &self.write_protect {
            config.write_protect[(drive - 1) as usize] = true;
        }
        if let Some(volume) = self.volume {
            config.volume = volume;
        }
        if self.no_accelerate {
            config.accelerate_disk = false;
        }
        if let Some(level) = &self.disk_log {
            config.disk_log = level.clone();
        }
    }
}

fn read_file(config: &Config, path: &str) -> Option<Vec<u8>> {
    let resolved = config.resolve_path(path);
    match fs::read(&resolved) {
        Ok(data) => Some(data),
        Err(e) => {
            eprintln!("Failed to read {}: {}", resolved.display(), e);
            None
        }
    }
}

fn load_machine(config: &Config) -> Apple2 {
    let mut emu = Apple2::new();

    if let Some(disk_rom) = config.disk_rom.as_deref() {
        if let Some(data) = read_file(config, disk_rom) {
            if let Err(e) = emu.load_disk_rom(&data) {
                eprintln!("Failed to load Disk II Boot ROM: {}", e);
            }
        }
    }

    match config.rom.as_deref() {
        Some(rom) => {
            if let Some(data) = read_file(config, rom) {
                if !emu.load_rom(&data) {
                    eprintln!("ROM {} not recognized", rom);
                }
            }
        }
        None => eprintln!("No ROM specified; $D000-$FFFF reads as zero"),
    }

    if let Some(disk) = emu.disk_mut() {
        disk.set_accelerate(config.accelerate_disk);
    }

    for drive in 0..2 {
        let Some(path) = config.disk(drive) else { continue };
        let Some(data) = read_file(config, path) else { continue };
        let wp = config.write_protect[drive];
        if emu.mount(drive, &data, path, wp, config.volume) {
            println!("D{}: {} ({} bytes{})", drive + 1, path, data.len(), if wp { ", write protected" } else { "" });
        } else {
            println!("D{}: {} rejected", drive + 1, path);
        }
    }

    emu
}

fn dump_track(emu: &Apple2, track: usize) {
    let Some(nibbles) = emu.disk().and_then(|disk| disk.track(0, track)) else {
        eprintln!("Track {} out of range", track);
        return;
    };
    let fields = scan_address_fields(nibbles);
    println!("Track {}: {} address fields", track, fields.len());
    for field in fields {
        println!(
            "  @{:04X} vol {:3} trk {:2} sec {:2} {}",
            field.position,
            field.volume,
            field.track,
            field.sector,
            if field.checksum_ok() { "ok" } else { "BAD CHECKSUM" }
        );
    }
}

fn load_state(emu: &mut Apple2, config: &Config, slot: u8) {
    let path = config.get_save_path(slot);
    let json = match fs::read_to_string(&path) {
        Ok(json) => json,
        Err(_) => {
            println!("Slot {} is empty", slot);
            return;
        }
    };
    match SaveState::from_json(&json).and_then(|state| emu.restore(&state)) {
        Ok(()) => println!("State loaded from slot {} ({})", slot, path.display()),
        Err(e) => eprintln!("Failed to load state: {}", e),
    }
}

fn save_state(emu: &Apple2, config: &Config, slot: u8) {
    let path = config.get_save_path(slot);
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            let _ = fs::create_dir_all(dir);
        }
    }
    let json = match emu.snapshot().to_json() {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Failed to serialize state: {}", e);
            return;
        }
    };
    match fs::write(&path, json) {
        Ok(()) => println!("State saved to slot {} ({})", slot, path.display()),
        Err(e) => eprintln!("Failed to save state: {}", e),
    }
}

fn hit_switches(emu: &mut Apple2, switches: &[String]) {
    for switch in switches {
        let Ok(address) = u16::from_str_radix(switch.trim_start_matches('$'), 16) else {
            eprintln!("Bad switch address: {}", switch);
            continue;
        };
        if address & 0xFF00 != 0xC000 {
            eprintln!("${:04X} is not on the I/O page", address);
            continue;
        }
        let value = emu.read(address);
        println!("${:04X} -> ${:02X}", address, value);
    }
    println!("Mode: {:?}", emu.graphics_mode());
    println!("Switches: {:?}", emu.switches());
    let tables = emu.memory().tables();
    for page in [0x00usize, 0x04, 0x20, 0x40, 0xC6, 0xD0, 0xE0] {
        println!(
            "  page ${:02X}: read +{:05X} write +{:05X}",
            page,
            (page << 8) as i32 + tables.read[page],
            (page << 8) as i32 + tables.write[page]
        );
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(get_config_path);
    let mut config = Config::load_from(&config_path);
    args.apply(&mut config);

    // ディスクログレベルを設定
    match DiskLogLevel::parse(&config.disk_log) {
        Some(level) => disk_log::set_log_level(level),
        None => eprintln!("Unknown disk log category: {}", config.disk_log),
    }

    if args.save_config {
        match config.save_to(&config_path) {
            Ok(()) => println!("Config saved to {}", config_path.display()),
            Err(e) => eprintln!("Failed to save config: {}", e),
        }
    }

    println!("A2BUS v0.1 (CPU pacing hint {} kHz)", config.cpu_khz);
    let mut emu = load_machine(&config);
    if let Some(slot) = args.load_state {
        load_state(&mut emu, &config, slot);
    }

    if let Some(disk) = emu.disk() {
        for drive in 0..2 {
            let (loaded, active, wp) = disk.get_drive_status(drive);
            println!(
                "Drive {}: {}{}{}",
                drive + 1,
                if loaded { "loaded" } else { "empty" },
                if active { ", motor on" } else { "" },
                if wp { ", write protected" } else { "" }
            );
        }
    }

    if let Some(track) = args.dump_track {
        dump_track(&emu, track);
    }

    if !args.switch.is_empty() {
        hit_switches(&mut emu, &args.switch);
    }

    if let Some(slot) = args.save_state {
        save_state(&emu, &config, slot);
    }
}
