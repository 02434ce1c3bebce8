//! Noop 通知送信実装
//!
//! メールを実際に送信せず、ログ出力のみ行う。
//! ローカル開発や通知無効化時に使用する。

use async_trait::async_trait;
use fragments_domain::{message::OutboundMessage, notification::NotificationError};
use uuid::Uuid;

use super::NotificationSender;

/// Noop 通知送信（ログ出力のみ）
#[derive(Debug, Clone)]
pub struct NoopNotificationSender;

#[async_trait]
impl NotificationSender for NoopNotificationSender {
    async fn send_email(&self, message: &OutboundMessage) -> Result<String, NotificationError> {
        tracing::info!(
            to = %message.to(),
            subject = %message.subject(),
            attachments = message.attachments().len(),
            "Noop: メール送信をスキップ"
        );
        Ok(format!("noop-{}", Uuid::now_v7()))
    }
}

#[cfg(test)]
mod tests {
    use fragments_domain::{message::NewOutboundMessage, recipient::Recipient};

    use super::*;

    #[tokio::test]
    async fn send_emailが合成トークンを返す() {
        let sender = NoopNotificationSender;
        let message = OutboundMessage::new(NewOutboundMessage {
            from:        "noreply@example.com".to_string(),
            to:          Recipient::new("test@example.com").unwrap(),
            subject:     "テスト件名".to_string(),
            html_body:   "<p>テスト</p>".to_string(),
            text_body:   "テスト".to_string(),
            attachments: vec![],
        });

        let token = sender.send_email(&message).await.unwrap();
        assert!(token.starts_with("noop-"));
    }
}
