//! CPUコアから見たバス

/// メモリバスのトレイト
///
/// 命令インタプリタはこのトレイト越しにだけメモリへアクセスする
pub trait MemoryBus {
    /// メモリから1バイト読み取り
    fn read(&mut self, address: u16) -> u8;
    /// メモリに1バイト書き込み
    fn write(&mut self, address: u16, value: u8);
}
