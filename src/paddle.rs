//! パドル・ボタン
//!
//! $C070 のトリガーでRC回路の放電タイマーを開始し、パドル値に比例した
//! サイクル数のあいだ $C064-$C067 が bit7=1 を返す。

use serde::{Deserialize, Serialize};

pub const PADDLE_LOW: u8 = 0;
pub const PADDLE_CENTER: u8 = 127;
pub const PADDLE_HIGH: u8 = 255;

/// パドル値 → 放電サイクル数（ROM $FB1E-$FB2E のループ1周が11サイクル）
#[inline]
fn discharge_cycles(value: u8) -> u64 {
    value as u64 * 11 + 8
}

/// 4チャンネル分のパドルとボタン
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paddles {
    deadline: [u64; 4],
    increment: [u64; 4],
    buttons: [bool; 4],
}

impl Default for Paddles {
    fn default() -> Self {
        Self::new()
    }
}

impl Paddles {
    pub fn new() -> Self {
        Paddles {
            deadline: [0; 4],
            increment: [discharge_cycles(PADDLE_HIGH); 4],
            buttons: [false; 4],
        }
    }

    pub fn set_position(&mut self, paddle: usize, value: u8) {
        if let Some(increment) = self.increment.get_mut(paddle) {
            *increment = discharge_cycles(value);
        }
    }

    pub fn set_button(&mut self, button: usize, pressed: bool) {
        if let Some(state) = self.buttons.get_mut(button) {
            *state = pressed;
        }
    }

    /// $C070-$C07F: 4チャンネル同時にタイマー開始
    pub fn trigger(&mut self, clock: u64) {
        for (deadline, increment) in self.deadline.iter_mut().zip(self.increment) {
            *deadline = clock + increment;
        }
    }

    /// $C064-$C067
    pub fn paddle_register(&self, paddle: usize, clock: u64) -> u8 {
        if clock < self.deadline[paddle & 3] {
            0x80
        } else {
            0x00
        }
    }

    /// $C061-$C063 ($C060 はボタン3)
    pub fn button_register(&self, button: usize) -> u8 {
        if self.buttons[button & 3] {
            0x80
        } else {
            0x00
        }
    }
}
