//! # Fragments インフラ層
//!
//! 外部システムとの接続・通信を担当するインフラストラクチャ層。
//!
//! ## 責務
//!
//! - **データベース接続**: PostgreSQL への接続プール管理とマイグレーション
//! - **リポジトリ実装**: ユーザーディレクトリとコメント返信の読み書き
//! - **メール送信**: SMTP / Resend / SES / Noop の送信クライアント
//!
//! ## 依存関係
//!
//! ```text
//! notifier → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`db`] - PostgreSQL データベース接続管理
//! - [`error`] - インフラ層エラー定義
//! - [`notification`] - メール送信クライアント
//! - [`repository`] - リポジトリ実装
//! - `mock` - テスト用モック（`test-utils` feature）
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use fragments_infra::{db, repository::PostgresUserDirectory};
//!
//! async fn setup() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = db::create_pool("postgres://localhost/fragments").await?;
//!     db::run_migrations(&pool).await?;
//!
//!     let directory = PostgresUserDirectory::new(pool);
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod notification;
pub mod repository;

pub use error::InfraError;
