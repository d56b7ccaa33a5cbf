//! Ports - 抽象化レイヤー
//!
//! ReplayLoop が依存する外部能力を trait で切り出す。
//! - **TableStore**: staging / live テーブルへの select・insert・delete
//! - **Clock**: レポート用の現在時刻

pub mod table_store;
pub mod clock;

pub use self::table_store::TableStore;
pub use self::clock::{Clock, FixedClock, SystemClock};
