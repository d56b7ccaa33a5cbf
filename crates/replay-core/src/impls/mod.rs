//! Impls - ports の実装
//!
//! - **PostgrestStore**: hosted backend（PostgREST 互換 REST API）向けの本番実装
//! - **InMemoryTableStore**: テスト・ローカル確認用

pub mod inmem_store;
pub mod postgrest;

pub use self::inmem_store::{InMemoryTableStore, StoreCall};
pub use self::postgrest::PostgrestStore;
