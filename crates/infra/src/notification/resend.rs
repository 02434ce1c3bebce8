//! Resend 通知送信実装
//!
//! Resend の HTTP API（`POST /emails`）でメールを送信する。
//! 添付ファイルは base64 でエンコードして JSON に含める。

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use fragments_domain::{message::OutboundMessage, notification::NotificationError};
use serde::{Deserialize, Serialize};

use super::NotificationSender;

/// Resend API のデフォルトのベース URL
pub const DEFAULT_BASE_URL: &str = "https://api.resend.com";

/// `POST /emails` のリクエストボディ
#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from:        &'a str,
    to:          [&'a str; 1],
    subject:     &'a str,
    html:        &'a str,
    text:        &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<AttachmentPayload<'a>>,
}

#[derive(Debug, Serialize)]
struct AttachmentPayload<'a> {
    filename:     &'a str,
    content:      String,
    content_type: &'a str,
}

/// `POST /emails` のレスポンスボディ
#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: String,
}

/// Resend 通知送信
pub struct ResendNotificationSender {
    client:   reqwest::Client,
    base_url: String,
    api_key:  String,
}

impl ResendNotificationSender {
    /// 新しい Resend 送信インスタンスを作成
    ///
    /// # 引数
    ///
    /// - `base_url`: API のベース URL（通常は [`DEFAULT_BASE_URL`]）
    /// - `api_key`: Resend の API キー
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client:   reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key:  api_key.into(),
        }
    }

    fn request_body<'a>(message: &'a OutboundMessage) -> SendEmailRequest<'a> {
        SendEmailRequest {
            from:        message.from(),
            to:          [message.to().as_str()],
            subject:     message.subject(),
            html:        message.html_body(),
            text:        message.text_body(),
            attachments: message
                .attachments()
                .iter()
                .map(|attachment| AttachmentPayload {
                    filename:     attachment.filename(),
                    content:      STANDARD.encode(attachment.bytes()),
                    content_type: attachment.mime_type(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl NotificationSender for ResendNotificationSender {
    async fn send_email(&self, message: &OutboundMessage) -> Result<String, NotificationError> {
        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&Self::request_body(message))
            .send()
            .await
            .map_err(|e| NotificationError::SendFailed(format!("Resend 接続失敗: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::SendFailed(format!(
                "Resend API エラー ({status}): {body}"
            )));
        }

        let body: SendEmailResponse = response.json().await.map_err(|e| {
            NotificationError::SendFailed(format!("Resend 応答の解析に失敗: {e}"))
        })?;

        Ok(body.id)
    }
}
