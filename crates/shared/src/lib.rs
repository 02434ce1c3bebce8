//! # Fragments 共有ユーティリティ
//!
//! 通知サービスと各クレート（domain, infra）から共通で使用されるユーティリティ。
//!
//! ## 設計方針
//!
//! - ビジネスロジックを含まない純粋なユーティリティのみを配置
//! - axum などの Web フレームワークには依存しない
//! - トレーシング初期化は `observability` feature の背後に置く

pub mod api_response;
pub mod error_response;
pub mod event_log;
pub mod health;
pub mod observability;

pub use api_response::ApiResponse;
pub use error_response::ErrorResponse;
pub use health::HealthResponse;
