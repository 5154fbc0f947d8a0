//! launchpad-core
//!
//! Execution core of the launchpad deployment orchestrator: binds plugin
//! components to an application's roles and drives them through the
//! build → push → deploy → release pipeline, persisting each stage.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, labels, records, errors）
//! - **config**: application configuration, hooks, evaluation context
//! - **ports**: 抽象化レイヤー（RecordStore, Ui, HookRunner, Clock, IdGenerator）
//! - **impls**: 実装（InMemoryRecordStore, TracingUi, CommandHookRunner）
//! - **component**: roles, the `Component` trait and capability checks
//! - **invoke**: dynamic functions and type-directed argument resolution
//! - **factory**: plugin constructors by type name
//! - **datadir**: scoped data directories
//! - **app**: `Project`, `App` and the pipeline stages

pub mod app;
pub mod component;
pub mod config;
pub mod datadir;
pub mod domain;
pub mod factory;
pub mod impls;
pub mod invoke;
pub mod ports;

pub use self::app::{App, BuildOptions, BuildResult, ComponentHandle, Project, ProjectBuilder};
pub use self::domain::{AppError, ErrorKind};
