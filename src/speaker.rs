//! スピーカー反転タイムスタンプのリングバッファ
//!
//! $C030 へのアクセスごとにその時点のクロックを記録する。
//! 波形合成は外部（オーディオ側）が `drain` で読み出して行う。

/// リングバッファのサイズ（2のべき乗）
pub const SPEAKER_FLIPS_SIZE: usize = 4096;
const SPEAKER_FLIPS_MASK: usize = SPEAKER_FLIPS_SIZE - 1;

#[derive(Clone)]
pub struct SpeakerFlips {
    flips: Box<[u64]>,
    pointer: usize,
}

impl Default for SpeakerFlips {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeakerFlips {
    pub fn new() -> Self {
        SpeakerFlips {
            flips: vec![0; SPEAKER_FLIPS_SIZE].into_boxed_slice(),
            pointer: 0,
        }
    }

    #[inline]
    pub fn toggle(&mut self, clock: u64) {
        self.flips[self.pointer] = clock;
        self.pointer = (self.pointer + 1) & SPEAKER_FLIPS_MASK;
    }

    /// 次に書き込む位置
    pub fn pointer(&self) -> usize {
        self.pointer
    }

    /// `cursor` から書き込み位置までのタイムスタンプを取り出し、`cursor` を進める
    ///
    /// 1周以上遅れた読み手は古い値を取りこぼす
    pub fn drain(&self, cursor: &mut usize) -> Vec<u64> {
        let mut out = Vec::new();
        while *cursor != self.pointer {
            out.push(self.flips[*cursor]);
            *cursor = (*cursor + 1) & SPEAKER_FLIPS_MASK;
        }
        out
    }
}
