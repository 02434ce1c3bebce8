//! SES 通知送信実装
//!
//! AWS SES v2 API を使用してメールを送信する。本番環境で使用する。
//!
//! 添付ファイルを扱うため、lettre で組み立てた MIME メッセージを
//! raw コンテンツとして送信する。

use async_trait::async_trait;
use aws_sdk_sesv2::{
    Client,
    primitives::Blob,
    types::{Destination, EmailContent, RawMessage},
};
use fragments_domain::{message::OutboundMessage, notification::NotificationError};

use super::{NotificationSender, mime};

/// SES 通知送信
///
/// `aws_sdk_sesv2::Client` をラップする。
pub struct SesNotificationSender {
    client: Client,
}

impl SesNotificationSender {
    /// 新しい SES 送信インスタンスを作成
    ///
    /// 送信元アドレスは各メッセージの From ヘッダを使う（SES で検証済みであること）。
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// 環境の AWS 設定（リージョン、認証情報）から SES 送信インスタンスを作成する
    pub async fn from_env() -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;
        Self::new(Client::new(&config))
    }
}

#[async_trait]
impl NotificationSender for SesNotificationSender {
    async fn send_email(&self, message: &OutboundMessage) -> Result<String, NotificationError> {
        let raw = RawMessage::builder()
            .data(Blob::new(mime::build_message(message)?.formatted()))
            .build()
            .map_err(|e| NotificationError::SendFailed(format!("raw メッセージ構築失敗: {e}")))?;

        let output = self
            .client
            .send_email()
            .destination(
                Destination::builder()
                    .to_addresses(message.to().as_str())
                    .build(),
            )
            .content(EmailContent::builder().raw(raw).build())
            .send()
            .await
            .map_err(|e| NotificationError::SendFailed(format!("SES 送信失敗: {e}")))?;

        Ok(output.message_id().unwrap_or_default().to_string())
    }
}
