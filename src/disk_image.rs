//! ディスクイメージの取り込み
//!
//! DSK/PO（セクタイメージ）、NIB（生ニブル）、2IMGコンテナを
//! 35トラック分のニブル列に変換する。ファイルI/Oは呼び出し側の仕事で、
//! ここではバイト列とファイル名（形式判定用）だけを受け取る。

use crate::error::DiskError;
use crate::gcr::{self, SectorOrder, DSK_SIZE, NIB_SIZE, NIB_TRACK_SIZE, TRACKS};

/// 2IMGヘッダのサイズ
pub const TWOIMG_HEADER_SIZE: usize = 64;

const TWOIMG_MAGIC: &[u8; 4] = b"2IMG";

/// ProDOS順2IMGのブロック数（140KB）
const TWOIMG_PRODOS_BLOCKS: u32 = 280;

const TWOIMG_FLAG_LOCKED: u32 = 1 << 31;
const TWOIMG_FLAG_VOLUME: u32 = 1 << 8;

/// ディスクイメージ形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskFormat {
    Dsk,
    Po,
    Nib,
    TwoImg,
}

impl DiskFormat {
    /// ファイル名から形式を推定（不明ならDSK）
    pub fn from_name(name: &str) -> DiskFormat {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".2mg") || lower.ends_with(".2img") {
            DiskFormat::TwoImg
        } else if lower.ends_with(".nib") {
            DiskFormat::Nib
        } else if lower.ends_with(".po") {
            DiskFormat::Po
        } else {
            DiskFormat::Dsk
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DiskFormat::Dsk => "DSK",
            DiskFormat::Po => "PO",
            DiskFormat::Nib => "NIB",
            DiskFormat::TwoImg => "2IMG",
        }
    }
}

/// 変換済みのディスク
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskImage {
    pub format: DiskFormat,
    pub tracks: Vec<Vec<u8>>,
    pub write_protected: bool,
    pub volume: u8,
}

/// 2IMGヘッダの必要部分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TwoImgHeader {
    format: u32,
    flags: u32,
    blocks: u32,
}

fn le16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

fn le32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

impl TwoImgHeader {
    fn parse(data: &[u8]) -> Result<Self, DiskError> {
        if data.len() < TWOIMG_HEADER_SIZE {
            return Err(DiskError::InvalidSize {
                expected: TWOIMG_HEADER_SIZE,
                got: data.len(),
            });
        }
        if &data[0..4] != TWOIMG_MAGIC {
            return Err(DiskError::BadMagic);
        }
        let header_size = le16(data, 0x08);
        if header_size as usize != TWOIMG_HEADER_SIZE {
            return Err(DiskError::BadHeaderSize(header_size));
        }
        Ok(TwoImgHeader {
            format: le32(data, 0x0C),
            flags: le32(data, 0x10),
            blocks: le32(data, 0x14),
        })
    }

    fn volume_override(&self) -> Option<u8> {
        (self.flags & TWOIMG_FLAG_VOLUME != 0).then_some((self.flags & 0xFF) as u8)
    }

    fn locked(&self) -> bool {
        self.flags & TWOIMG_FLAG_LOCKED != 0
    }
}

/// セクタイメージ → ニブルトラック
fn sector_tracks(data: &[u8], volume: u8, order: SectorOrder) -> Result<Vec<Vec<u8>>, DiskError> {
    if data.len() != DSK_SIZE {
        return Err(DiskError::InvalidSize {
            expected: DSK_SIZE,
            got: data.len(),
        });
    }
    Ok(gcr::encode_disk(data, volume, order))
}

/// NIBイメージ → そのままトラックに分割
fn nibble_tracks(data: &[u8]) -> Result<Vec<Vec<u8>>, DiskError> {
    if data.len() != NIB_SIZE {
        return Err(DiskError::InvalidSize {
            expected: NIB_SIZE,
            got: data.len(),
        });
    }
    Ok(data.chunks_exact(NIB_TRACK_SIZE).map(<[u8]>::to_vec).collect())
}

/// 2IMGのペイロードは後ろにコメント等が付くことがあるので先頭だけ使う
fn payload(data: &[u8], len: usize) -> Result<&[u8], DiskError> {
    let body = &data[TWOIMG_HEADER_SIZE..];
    body.get(..len).ok_or(DiskError::InvalidSize {
        expected: TWOIMG_HEADER_SIZE + len,
        got: data.len(),
    })
}

impl DiskImage {
    /// 何も入っていないドライブ（ゼロ埋めトラック）
    pub fn blank() -> Self {
        DiskImage {
            format: DiskFormat::Nib,
            tracks: vec![vec![0u8; NIB_TRACK_SIZE]; TRACKS],
            write_protected: false,
            volume: gcr::DEFAULT_VOLUME,
        }
    }

    /// バイト列を解析して35トラックを構築
    pub fn parse(data: &[u8], name: &str, write_protected: bool, volume: u8) -> Result<Self, DiskError> {
        let format = DiskFormat::from_name(name);
        let mut image = DiskImage {
            format,
            tracks: Vec::new(),
            write_protected,
            volume,
        };

        image.tracks = match format {
            DiskFormat::Dsk => sector_tracks(data, volume, SectorOrder::Dos)?,
            DiskFormat::Po => sector_tracks(data, volume, SectorOrder::ProDos)?,
            DiskFormat::Nib => nibble_tracks(data)?,
            DiskFormat::TwoImg => {
                let header = TwoImgHeader::parse(data)?;
                if let Some(v) = header.volume_override() {
                    image.volume = v;
                }
                image.write_protected |= header.locked();
                match header.format {
                    0 => sector_tracks(payload(data, DSK_SIZE)?, image.volume, SectorOrder::Dos)?,
                    1 => {
                        if header.blocks != TWOIMG_PRODOS_BLOCKS {
                            return Err(DiskError::BadBlockCount(header.blocks));
                        }
                        sector_tracks(payload(data, DSK_SIZE)?, image.volume, SectorOrder::ProDos)?
                    }
                    2 => nibble_tracks(payload(data, NIB_SIZE)?)?,
                    other => return Err(DiskError::UnsupportedFormat(other)),
                }
            }
        };

        Ok(image)
    }
}
