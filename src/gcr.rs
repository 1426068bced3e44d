//! GCR（6-and-2）トラックエンコーダ
//!
//! 16セクタ×256バイトの論理トラックを、Disk IIが読む1トラック分の
//! ニブル列（6656バイト）に変換する。デコード側は持たない。

/// ディスクの定数
pub const TRACKS: usize = 35;
pub const SECTORS_PER_TRACK: usize = 16;
pub const BYTES_PER_SECTOR: usize = 256;
pub const BYTES_PER_TRACK: usize = SECTORS_PER_TRACK * BYTES_PER_SECTOR;
pub const DSK_SIZE: usize = TRACKS * BYTES_PER_TRACK; // 143360 bytes

/// NIBフォーマットの定数
pub const NIB_TRACK_SIZE: usize = 6656;
pub const NIB_SIZE: usize = TRACKS * NIB_TRACK_SIZE;

/// 同期ニブル
pub const SYNC_NIBBLE: u8 = 0xFF;
/// トラック末尾の未使用領域を埋める無効ニブル
pub const FILLER_NIBBLE: u8 = 0x7F;

/// 既定のボリューム番号
pub const DEFAULT_VOLUME: u8 = 254;

pub const ADDRESS_PROLOGUE: [u8; 3] = [0xD5, 0xAA, 0x96];
pub const DATA_PROLOGUE: [u8; 3] = [0xD5, 0xAA, 0xAD];
pub const EPILOGUE: [u8; 3] = [0xDE, 0xAA, 0xEB];

/// セクタ前の同期ニブル数
const ADDRESS_GAP: usize = 12;
/// アドレスフィールドとデータフィールドの間
const DATA_GAP: usize = 8;

/// 補助バッファ（下位2ビット）の長さ
const AUX_BUFFER_SIZE: usize = 86;

/// 6-and-2エンコーディングテーブル
pub const WRITE_TABLE: [u8; 64] = [
    0x96, 0x97, 0x9A, 0x9B, 0x9D, 0x9E, 0x9F, 0xA6,
    0xA7, 0xAB, 0xAC, 0xAD, 0xAE, 0xAF, 0xB2, 0xB3,
    0xB4, 0xB5, 0xB6, 0xB7, 0xB9, 0xBA, 0xBB, 0xBC,
    0xBD, 0xBE, 0xBF, 0xCB, 0xCD, 0xCE, 0xCF, 0xD3,
    0xD6, 0xD7, 0xD9, 0xDA, 0xDB, 0xDC, 0xDD, 0xDE,
    0xDF, 0xE5, 0xE6, 0xE7, 0xE9, 0xEA, 0xEB, 0xEC,
    0xED, 0xEE, 0xEF, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6,
    0xF7, 0xF9, 0xFA, 0xFB, 0xFC, 0xFD, 0xFE, 0xFF,
];

/// 下位2ビットのD0/D1入れ替え（P5 PROMが LSR/ROL で逆順に組み立てるため）
const SWAP_BITS: [u8; 4] = [0, 2, 1, 3];

/// 物理セクタ→DOS 3.3論理セクタ
const DOS_SECTOR_ORDER: [usize; 16] = [0, 7, 14, 6, 13, 5, 12, 4, 11, 3, 10, 2, 9, 1, 8, 15];

/// 物理セクタ→ProDOS論理セクタ
const PRODOS_SECTOR_ORDER: [usize; 16] = [0, 8, 1, 9, 2, 10, 3, 11, 4, 12, 5, 13, 6, 14, 7, 15];

/// イメージ内のセクタ並び
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorOrder {
    Dos,
    ProDos,
}

impl SectorOrder {
    /// 物理セクタ番号から論理セクタ番号への表
    pub fn skew(self) -> &'static [usize; 16] {
        match self {
            SectorOrder::Dos => &DOS_SECTOR_ORDER,
            SectorOrder::ProDos => &PRODOS_SECTOR_ORDER,
        }
    }
}

/// 6-and-2 分割
///
/// 上位6ビットは `main`、下位2ビットは3つずつ `aux` に詰める。
/// 86*3 = 258 なので先頭2バイトの下位ビットは2回入る。
fn split_6and2(sector: &[u8]) -> ([u8; BYTES_PER_SECTOR], [u8; AUX_BUFFER_SIZE]) {
    let mut main = [0u8; BYTES_PER_SECTOR];
    let mut aux = [0u8; AUX_BUFFER_SIZE];

    aux[0] = SWAP_BITS[(sector[1] & 0x03) as usize];
    aux[1] = SWAP_BITS[(sector[0] & 0x03) as usize];

    let mut j = 2;
    for i in (0..BYTES_PER_SECTOR).rev() {
        aux[j] = (aux[j] << 2) | SWAP_BITS[(sector[i] & 0x03) as usize];
        main[i] = sector[i] >> 2;
        j = if j == AUX_BUFFER_SIZE - 1 { 0 } else { j + 1 };
    }

    for value in aux.iter_mut() {
        *value &= 0x3F;
    }
    (main, aux)
}

/// 1トラック分のニブル列を組み立てる
struct TrackWriter {
    nibbles: Vec<u8>,
}

impl TrackWriter {
    fn new() -> Self {
        TrackWriter {
            nibbles: Vec::with_capacity(NIB_TRACK_SIZE),
        }
    }

    #[inline]
    fn push(&mut self, nibble: u8) {
        self.nibbles.push(nibble);
    }

    fn extend(&mut self, nibbles: &[u8]) {
        self.nibbles.extend_from_slice(nibbles);
    }

    fn sync(&mut self, count: usize) {
        self.nibbles.extend(std::iter::repeat(SYNC_NIBBLE).take(count));
    }

    /// 4-and-4エンコード（奇数ビット、偶数ビットの順）
    fn encode44(&mut self, value: u8) {
        self.push((value >> 1) | 0xAA);
        self.push(value | 0xAA);
    }

    fn address_field(&mut self, volume: u8, track: u8, sector: u8) {
        self.extend(&ADDRESS_PROLOGUE);
        self.encode44(volume);
        self.encode44(track);
        self.encode44(sector);
        self.encode44(volume ^ track ^ sector);
        self.extend(&EPILOGUE);
    }

    fn data_field(&mut self, sector: &[u8]) {
        let (main, aux) = split_6and2(sector);

        self.extend(&DATA_PROLOGUE);
        let mut last = 0u8;
        for &value in aux.iter().rev().chain(main.iter()) {
            self.push(WRITE_TABLE[(last ^ value) as usize]);
            last = value;
        }
        self.push(WRITE_TABLE[last as usize]);
        self.extend(&EPILOGUE);
    }

    /// 末尾を無効ニブルで埋めて返す
    fn finish(mut self) -> Vec<u8> {
        self.nibbles.resize(NIB_TRACK_SIZE, FILLER_NIBBLE);
        self.nibbles
    }
}

/// 論理トラック（4096バイト）を物理ニブル列（6656バイト）に変換
pub fn encode_track(data: &[u8], volume: u8, track: u8, order: SectorOrder) -> Vec<u8> {
    debug_assert_eq!(data.len(), BYTES_PER_TRACK);
    let skew = order.skew();
    let mut writer = TrackWriter::new();

    for physical in 0..SECTORS_PER_TRACK {
        let offset = skew[physical] * BYTES_PER_SECTOR;
        writer.sync(ADDRESS_GAP);
        writer.address_field(volume, track, physical as u8);
        writer.sync(DATA_GAP);
        writer.data_field(&data[offset..offset + BYTES_PER_SECTOR]);
    }

    writer.finish()
}

/// ディスク全体（35トラック）をエンコード
pub fn encode_disk(data: &[u8], volume: u8, order: SectorOrder) -> Vec<Vec<u8>> {
    data.chunks_exact(BYTES_PER_TRACK)
        .take(TRACKS)
        .enumerate()
        .map(|(track, chunk)| encode_track(chunk, volume, track as u8, order))
        .collect()
}

/// 4-and-4デコード（アドレスフィールド解析用）
#[inline]
pub fn decode44(odd: u8, even: u8) -> u8 {
    ((odd << 1) | 0x01) & even
}

/// アドレスフィールドの内容
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressField {
    /// トラック内の位置（プロローグ先頭）
    pub position: usize,
    pub volume: u8,
    pub track: u8,
    pub sector: u8,
    pub checksum: u8,
}

impl AddressField {
    pub fn checksum_ok(&self) -> bool {
        self.volume ^ self.track ^ self.sector == self.checksum
    }
}

/// トラック内のアドレスフィールドを列挙（トラック末尾で折り返す）
pub fn scan_address_fields(track: &[u8]) -> Vec<AddressField> {
    let len = track.len();
    let at = |i: usize| track[i % len];
    (0..len)
        .filter(|&i| at(i) == ADDRESS_PROLOGUE[0] && at(i + 1) == ADDRESS_PROLOGUE[1] && at(i + 2) == ADDRESS_PROLOGUE[2])
        .map(|i| AddressField {
            position: i,
            volume: decode44(at(i + 3), at(i + 4)),
            track: decode44(at(i + 5), at(i + 6)),
            sector: decode44(at(i + 7), at(i + 8)),
            checksum: decode44(at(i + 9), at(i + 10)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_table() -> [u8; 256] {
        let mut table = [0xFFu8; 256];
        for (i, &nibble) in WRITE_TABLE.iter().enumerate() {
            table[nibble as usize] = i as u8;
        }
        table
    }

    fn synthetic_track(seed: u8) -> Vec<u8> {
        (0..BYTES_PER_TRACK)
            .map(|i| (i as u8).wrapping_mul(37).wrapping_add(seed) ^ (i >> 8) as u8)
            .collect()
    }

    fn find_all(track: &[u8], marker: &[u8; 3]) -> Vec<usize> {
        track
            .windows(3)
            .enumerate()
            .filter(|(_, w)| *w == marker)
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_track_layout() {
        let nibbles = encode_track(&synthetic_track(1), DEFAULT_VOLUME, 17, SectorOrder::Dos);
        assert_eq!(nibbles.len(), NIB_TRACK_SIZE);

        let address = find_all(&nibbles, &ADDRESS_PROLOGUE);
        let data = find_all(&nibbles, &DATA_PROLOGUE);
        assert_eq!(address.len(), 16);
        assert_eq!(data.len(), 16);

        // 1セクタ383ニブル、残りは無効ニブル
        assert_eq!(address[1] - address[0], 383);
        assert!(nibbles[16 * 383..].iter().all(|&n| n == FILLER_NIBBLE));
        assert!(nibbles[..ADDRESS_GAP].iter().all(|&n| n == SYNC_NIBBLE));
    }

    #[test]
    fn test_address_field_checksums() {
        let nibbles = encode_track(&synthetic_track(2), 0x42, 9, SectorOrder::ProDos);
        let fields = scan_address_fields(&nibbles);
        assert_eq!(fields.len(), 16);
        for (physical, field) in fields.iter().enumerate() {
            assert_eq!(field.volume, 0x42);
            assert_eq!(field.track, 9);
            assert_eq!(field.sector as usize, physical);
            assert_eq!(field.checksum, 0x42 ^ 9 ^ physical as u8);
            assert!(field.checksum_ok());
        }
    }

    #[test]
    fn test_data_field_checksum_chain() {
        let table = read_table();
        let nibbles = encode_track(&synthetic_track(3), DEFAULT_VOLUME, 0, SectorOrder::Dos);
        for start in find_all(&nibbles, &DATA_PROLOGUE) {
            let body = &nibbles[start + 3..start + 3 + 343];
            let mut last = 0u8;
            for &nibble in &body[..342] {
                let decoded = table[nibble as usize];
                assert!(decoded < 0x40, "invalid nibble {:02X}", nibble);
                last ^= decoded;
            }
            assert_eq!(table[body[342] as usize], last);
            assert_eq!(&nibbles[start + 346..start + 349], &EPILOGUE);
        }
    }

    #[test]
    fn test_sector_data_recoverable() {
        // P5 PROMと同じ組み立て方で元データに戻ることを確認
        let table = read_table();
        let logical = synthetic_track(4);
        let nibbles = encode_track(&logical, DEFAULT_VOLUME, 3, SectorOrder::Dos);

        for (physical, start) in find_all(&nibbles, &DATA_PROLOGUE).into_iter().enumerate() {
            let mut values = [0u8; 342];
            let mut last = 0u8;
            for (k, &nibble) in nibbles[start + 3..start + 345].iter().enumerate() {
                last ^= table[nibble as usize];
                values[k] = last;
            }
            let (aux_rev, main) = values.split_at(AUX_BUFFER_SIZE);
            let expected = &logical[DOS_SECTOR_ORDER[physical] * 256..][..256];
            for i in 0..256 {
                let j = (257 - i) % AUX_BUFFER_SIZE;
                let shift = if i >= 172 { 4 } else if i >= 86 { 2 } else { 0 };
                let aux = aux_rev[AUX_BUFFER_SIZE - 1 - j];
                let low = SWAP_BITS[((aux >> shift) & 3) as usize];
                assert_eq!((main[i] << 2) | low, expected[i], "sector {} byte {}", physical, i);
            }
        }
    }

    #[test]
    fn test_encode_disk_tracks() {
        let image: Vec<u8> = (0..DSK_SIZE).map(|i| (i / BYTES_PER_TRACK) as u8).collect();
        let tracks = encode_disk(&image, DEFAULT_VOLUME, SectorOrder::Dos);
        assert_eq!(tracks.len(), TRACKS);
        let fields = scan_address_fields(&tracks[34]);
        assert!(fields.iter().all(|f| f.track == 34));
    }

    #[test]
    fn test_decode44() {
        for value in [0u8, 1, 0x55, 0xAA, 0xFE, 0xFF] {
            assert_eq!(decode44((value >> 1) | 0xAA, value | 0xAA), value);
        }
    }
}
