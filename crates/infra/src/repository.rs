//! # リポジトリ実装
//!
//! ユーザーディレクトリの読み出しとコメント返信の永続化を提供する。
//!
//! ## 設計方針
//!
//! - **トレイト経由の注入**: ユースケース層は `Arc<dyn UserDirectory>` などで受け取り、
//!   テストではインメモリモックに差し替える
//! - **実行時クエリ**: `sqlx::query` / `sqlx::query_scalar` を使い、ビルド時に DB を要求しない

pub mod comment_repository;
pub mod user_directory;

pub use comment_repository::{CommentRepository, PostgresCommentRepository};
pub use user_directory::{PostgresUserDirectory, UserDirectory};
