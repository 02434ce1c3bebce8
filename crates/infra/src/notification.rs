//! # 通知送信
//!
//! メール通知の送信を担当するインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: `NotificationSender` trait でメール送信を抽象化
//! - **4 つの実装**: SMTP（Mailpit / Gmail リレー）、Resend（HTTP API）、SES（本番用）、
//!   Noop（送信無効化）
//! - **環境変数切替**: `NOTIFICATION_BACKEND` でランタイム選択
//! - **並行送信可能**: 実装はすべて `Send + Sync` で、`Arc<dyn NotificationSender>`
//!   として複数タスクから同時に呼び出される

mod mime;
mod noop;
mod resend;
mod ses;
mod smtp;

use async_trait::async_trait;
use fragments_domain::{message::OutboundMessage, notification::NotificationError};
pub use noop::NoopNotificationSender;
pub use resend::{DEFAULT_BASE_URL as DEFAULT_RESEND_BASE_URL, ResendNotificationSender};
pub use ses::SesNotificationSender;
pub use smtp::{SmtpCredentials, SmtpNotificationSender};

/// メール送信トレイト
///
/// 1 通のメッセージを送信し、プロバイダが返した応答トークン
/// （SMTP の応答行、API のメッセージ ID など）を返す。
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// メールを送信する
    async fn send_email(&self, message: &OutboundMessage) -> Result<String, NotificationError>;
}
