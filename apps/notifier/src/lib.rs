//! # Fragments Notifier ライブラリ
//!
//! 通知サービスの設定、ハンドラ、ユースケースを公開する。
//! `main.rs` と統合テスト（`tests/`）から Router を組み立てるために使う。

pub mod app_builder;
pub mod config;
pub mod error;
pub mod handler;
pub mod usecase;
