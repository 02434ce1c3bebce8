//! # Fragments ドメイン層
//!
//! 通知配信のドメインモデルを定義する。
//!
//! ## 依存関係の方向
//!
//! ```text
//! notifier → infra → domain
//! ```
//!
//! ドメイン層は DB や SMTP などの外部システムに一切依存しない。
//!
//! ## モジュール構成
//!
//! - [`recipient`] - 宛先（検証済みメールアドレス）と宛先集合、解決モード
//! - [`message`] - 送信メッセージと添付ファイル
//! - [`outcome`] - 送信試行の結果とバッチ集計
//! - [`notification`] - 通知種別とペイロード、送信エラー
//! - [`comment`] - コメント返信
//! - [`error`] - ドメインエラー
//!
//! ## 使用例
//!
//! ```rust
//! use fragments_domain::recipient::{Recipient, RecipientSet};
//!
//! let set: RecipientSet = ["a@example.com", "a@example.com", "b@example.com"]
//!     .into_iter()
//!     .filter_map(|address| Recipient::new(address).ok())
//!     .collect();
//!
//! assert_eq!(set.len(), 2);
//! ```

#[macro_use]
mod macros;

pub mod comment;
pub mod error;
pub mod message;
pub mod notification;
pub mod outcome;
pub mod recipient;

pub use error::DomainError;
