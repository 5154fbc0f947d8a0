//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **InMemoryRecordStore**: 開発用の record store
//! - **TracingUi**: tracing に出力する Ui
//! - **CommandHookRunner**: hook を子プロセスで実行

pub mod command_hook;
pub mod inmem_store;
pub mod tracing_ui;

pub use self::command_hook::CommandHookRunner;
pub use self::inmem_store::InMemoryRecordStore;
pub use self::tracing_ui::{TracingStatus, TracingUi};
