//! 画面更新用のダーティページ追跡
//!
//! 128バイト単位（グラニュール）の世代カウンタ。エミュレーションスレッドは
//! バイトを書いた後に世代を `Release` で進め、描画側は `Acquire` で世代を
//! 読んでから内容を描画し、描画前に観測した世代だけを既読にする。
//! 描画中に書かれたページは世代が進んでいるので次回も未読のまま残る。

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// グラニュールのアドレスシフト（128バイト）
pub const GRANULE_SHIFT: u32 = 7;

/// メイン64KB分のグラニュール数
pub const MAIN_GRANULES: usize = 0x10000 >> GRANULE_SHIFT;

/// メイン + 補助ミラー
pub const GRANULES: usize = MAIN_GRANULES * 2;

/// 書き込み側（エミュレーションループ）が更新する世代カウンタ列
pub struct DirtyBitmap {
    generations: Box<[AtomicU32]>,
}

impl Default for DirtyBitmap {
    fn default() -> Self {
        Self::new()
    }
}

impl DirtyBitmap {
    pub fn new() -> Self {
        DirtyBitmap {
            generations: (0..GRANULES).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    /// 論理アドレスへの書き込みを記録（補助RAMに落ちた書き込みはミラー側）
    #[inline]
    pub fn mark_address(&self, address: u16, aux: bool) {
        let granule = (address >> GRANULE_SHIFT) as usize;
        self.mark(if aux { MAIN_GRANULES + granule } else { granule });
    }

    #[inline]
    pub fn mark(&self, granule: usize) {
        self.generations[granule].fetch_add(1, Ordering::Release);
    }

    /// 全ページを更新扱いにする（リセット・状態復元後）
    pub fn mark_all(&self) {
        for granule in 0..GRANULES {
            self.mark(granule);
        }
    }

    #[inline]
    pub fn generation(&self, granule: usize) -> u32 {
        self.generations[granule].load(Ordering::Acquire)
    }
}

/// 未描画のグラニュールと、その時点の世代
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingPage {
    pub granule: usize,
    pub generation: u32,
}

impl PendingPage {
    /// 補助RAM側のミラーか
    pub fn is_aux(&self) -> bool {
        self.granule >= MAIN_GRANULES
    }

    /// 対応する論理アドレスの先頭
    pub fn address(&self) -> u16 {
        ((self.granule % MAIN_GRANULES) << GRANULE_SHIFT) as u16
    }
}

/// 描画側が保持する既読世代
pub struct DirtyTracker {
    bitmap: Arc<DirtyBitmap>,
    seen: Vec<u32>,
}

impl DirtyTracker {
    /// 最初の `pending` では全ページが未読になる
    pub fn new(bitmap: Arc<DirtyBitmap>) -> Self {
        let seen = (0..GRANULES)
            .map(|g| bitmap.generation(g).wrapping_sub(1))
            .collect();
        DirtyTracker { bitmap, seen }
    }

    pub fn is_dirty(&self, granule: usize) -> bool {
        self.bitmap.generation(granule) != self.seen[granule]
    }

    /// 未読ページの一覧（描画前に呼ぶ）
    pub fn pending(&self) -> Vec<PendingPage> {
        (0..GRANULES)
            .filter_map(|granule| {
                let generation = self.bitmap.generation(granule);
                (generation != self.seen[granule]).then_some(PendingPage { granule, generation })
            })
            .collect()
    }

    /// 描画済みページを既読にする。`pending` で観測した世代までしか進めない
    pub fn acknowledge(&mut self, pages: &[PendingPage]) {
        for page in pages {
            self.seen[page.granule] = page.generation;
        }
    }
}
