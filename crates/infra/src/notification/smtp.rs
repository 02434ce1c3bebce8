//! SMTP 通知送信実装
//!
//! lettre の `AsyncSmtpTransport` を使用してメールを送信する。
//! 開発環境では Mailpit（ローカル SMTP サーバー）に平文で接続し、
//! 認証情報が設定されていれば STARTTLS リレー（Gmail 等）に接続する。

use async_trait::async_trait;
use fragments_domain::{message::OutboundMessage, notification::NotificationError};
use lettre::{
    AsyncSmtpTransport,
    AsyncTransport,
    Tokio1Executor,
    transport::smtp::{authentication::Credentials, response::Response},
};

use super::{NotificationSender, mime};
use crate::error::InfraError;

/// SMTP 認証情報
#[derive(Clone)]
pub struct SmtpCredentials {
    pub username: String,
    pub password: String,
}

// パスワードはログに出さない
impl std::fmt::Debug for SmtpCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// SMTP 通知送信
///
/// `lettre::AsyncSmtpTransport<Tokio1Executor>` をラップする。
/// トランスポートは内部で接続プールを持ち、並行送信に対応する。
pub struct SmtpNotificationSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotificationSender {
    /// 新しい SMTP 送信インスタンスを作成
    ///
    /// # 引数
    ///
    /// - `host`: SMTP サーバーのホスト名（例: "localhost", "smtp.gmail.com"）
    /// - `port`: SMTP サーバーのポート番号（例: 1025 for Mailpit, 587 for STARTTLS）
    /// - `credentials`: 認証情報。`None` の場合は TLS なしで接続する
    pub fn new(
        host: &str,
        port: u16,
        credentials: Option<SmtpCredentials>,
    ) -> Result<Self, InfraError> {
        let transport = match credentials {
            Some(credentials) => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| InfraError::configuration(format!("SMTP リレー設定失敗: {e}")))?
                .port(port)
                .credentials(Credentials::new(credentials.username, credentials.password))
                .build(),
            // builder_dangerous: TLS なしで接続（Mailpit 等のローカル SMTP 向け）
            None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
                .port(port)
                .build(),
        };

        Ok(Self { transport })
    }
}

/// SMTP 応答を応答トークン（"250 OK ..." 形式）に変換する
fn response_token(response: &Response) -> String {
    match response.first_line() {
        Some(line) => format!("{} {}", response.code(), line),
        None => response.code().to_string(),
    }
}

#[async_trait]
impl NotificationSender for SmtpNotificationSender {
    async fn send_email(&self, message: &OutboundMessage) -> Result<String, NotificationError> {
        let email = mime::build_message(message)?;

        let response = self
            .transport
            .send(email)
            .await
            .map_err(|e| NotificationError::SendFailed(format!("SMTP 送信失敗: {e}")))?;

        Ok(response_token(&response))
    }
}

#[cfg(test)]
mod tests {
    use lettre::transport::smtp::response::{Category, Code, Detail, Severity};

    use super::*;

    #[test]
    fn トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SmtpNotificationSender>();
    }

    #[test]
    fn test_応答トークンはコードと1行目を連結する() {
        let response = Response::new(
            Code::new(
                Severity::PositiveCompletion,
                Category::MailSystem,
                Detail::Zero,
            ),
            vec!["OK: queued as 1234".to_string(), "second".to_string()],
        );

        assert_eq!(response_token(&response), "250 OK: queued as 1234");
    }

    #[test]
    fn test_認証情報のdebug出力にパスワードを含めない() {
        let credentials = SmtpCredentials {
            username: "ops@example.com".to_string(),
            password: "app-password".to_string(),
        };

        let debug = format!("{credentials:?}");
        assert!(debug.contains("ops@example.com"));
        assert!(!debug.contains("app-password"));
    }

    #[tokio::test]
    async fn test_認証情報なしでも作成できる() {
        assert!(SmtpNotificationSender::new("localhost", 1025, None).is_ok());
    }
}
