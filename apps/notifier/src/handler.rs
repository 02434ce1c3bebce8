//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - 各ハンドラはサブモジュールに配置
//! - 親モジュール（この `handler.rs`）で re-export し、フラットな API を提供
//! - ハンドラは薄く保ち、ビジネスロジックはユースケース層に委譲

pub mod health;
pub mod notification;

pub use health::health_check;
pub use notification::{
    NotificationState,
    reply_to_comment,
    send_broadcast,
    send_newsletter,
    send_welcome,
    send_wish,
};
