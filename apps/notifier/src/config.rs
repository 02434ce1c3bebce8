//! # Notifier 設定
//!
//! 環境変数から通知サービスの設定を読み込む。
//!
//! 読み込みは [`NotifierConfig::from_lookup`] に集約し、テストでは環境変数の代わりに
//! `HashMap` を渡す。

use std::{env, str::FromStr, time::Duration};

use axum::http::HeaderValue;
use fragments_domain::recipient::Recipient;
use fragments_infra::notification::{DEFAULT_RESEND_BASE_URL, SmtpCredentials};
use thiserror::Error;

use crate::usecase::notification::DispatchPolicy;

/// 設定エラー
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 必須の環境変数が未設定
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    /// 値が不正
    #[error("{name} の値が不正です（{value}）: {reason}")]
    Invalid {
        name:   &'static str,
        value:  String,
        reason: String,
    },
}

/// 通知サービスの設定
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// バインドアドレス
    pub host:         String,
    /// ポート番号
    pub port:         u16,
    /// データベース接続 URL
    pub database_url: String,
    /// CORS で許可するフロントエンドのオリジン（未設定なら全オリジン）
    pub frontend_url: Option<HeaderValue>,
    /// 通知設定
    pub notification: NotificationConfig,
    /// 送信ポリシー
    pub dispatch:     DispatchPolicy,
}

/// 送信バックエンド
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum NotificationBackend {
    /// SMTP サーバー経由（Mailpit / Gmail など）
    Smtp,
    /// Resend HTTP API
    Resend,
    /// Amazon SES v2
    Ses,
    /// 送信しない（ログ出力のみ）
    Noop,
}

/// 通知機能の設定
///
/// `NOTIFICATION_BACKEND` 環境変数で送信バックエンドを切り替える:
/// - `smtp`: Mailpit（開発）/ SMTP サーバー経由で送信
/// - `resend`: Resend API 経由で送信（`RESEND_API_KEY` 必須）
/// - `ses`: Amazon SES v2 経由で送信
/// - `noop`: 送信しない（ログ出力のみ）
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub backend:          NotificationBackend,
    /// SMTP ホスト（backend=smtp の場合に使用）
    pub smtp_host:        String,
    /// SMTP ポート（backend=smtp の場合に使用）
    pub smtp_port:        u16,
    /// SMTP 認証情報（ユーザー名とパスワードの両方が設定された場合のみ）
    pub smtp_credentials: Option<SmtpCredentials>,
    /// Resend API キー（backend=resend の場合は必須）
    pub resend_api_key:   Option<String>,
    pub resend_base_url:  String,
    /// 送信元（`"表示名 <address>"` 形式も可）
    pub from_address:     String,
    /// フロントエンド URL（メール内リンク用）
    pub base_url:         String,
    /// 運用者アドレス（願い事とテストモードの宛先）
    pub operator:         Option<Recipient>,
}

impl NotifierConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意のキー検索関数から設定を読み込む
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);

        let frontend_url = vars
            .get("FRONTEND_URL")
            .map(|url| {
                HeaderValue::from_str(&url).map_err(|e| ConfigError::Invalid {
                    name:   "FRONTEND_URL",
                    value:  url.clone(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        Ok(Self {
            host: vars.get_or("NOTIFIER_HOST", "0.0.0.0"),
            port: vars.parse_or("NOTIFIER_PORT", 4400)?,
            database_url: vars.require("DATABASE_URL")?,
            frontend_url,
            notification: NotificationConfig::from_vars(&vars)?,
            dispatch: dispatch_policy(&vars)?,
        })
    }
}

impl NotificationConfig {
    fn from_vars<F>(vars: &Vars<'_, F>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = vars.parse_or("NOTIFICATION_BACKEND", NotificationBackend::Noop)?;

        let smtp_credentials = match (vars.get("SMTP_USERNAME"), vars.get("SMTP_PASSWORD")) {
            (Some(username), Some(password)) => Some(SmtpCredentials { username, password }),
            _ => None,
        };

        let resend_api_key = vars.get("RESEND_API_KEY");
        if backend == NotificationBackend::Resend && resend_api_key.is_none() {
            return Err(ConfigError::Missing("RESEND_API_KEY"));
        }

        let operator = vars
            .get("NOTIFICATION_OPERATOR_ADDRESS")
            .map(|address| {
                Recipient::new(address.as_str()).map_err(|e| ConfigError::Invalid {
                    name:   "NOTIFICATION_OPERATOR_ADDRESS",
                    value:  address.clone(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        Ok(Self {
            backend,
            smtp_host: vars.get_or("SMTP_HOST", "localhost"),
            smtp_port: vars.parse_or("SMTP_PORT", 1025)?,
            smtp_credentials,
            resend_api_key,
            resend_base_url: vars.get_or("RESEND_BASE_URL", DEFAULT_RESEND_BASE_URL),
            from_address: vars.get_or(
                "NOTIFICATION_FROM_ADDRESS",
                "Fragments of Me <noreply@fragments-of-me.example.com>",
            ),
            base_url: vars.get_or("NOTIFICATION_BASE_URL", "http://localhost:5173"),
            operator,
        })
    }
}

fn dispatch_policy<F>(vars: &Vars<'_, F>) -> Result<DispatchPolicy, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = DispatchPolicy::default();

    let concurrency_limit = vars.parse_or("DISPATCH_CONCURRENCY", defaults.concurrency_limit)?;
    if concurrency_limit == 0 {
        return Err(ConfigError::Invalid {
            name:   "DISPATCH_CONCURRENCY",
            value:  "0".to_string(),
            reason: "1 以上である必要があります".to_string(),
        });
    }

    let message_timeout = vars.parse_or(
        "DISPATCH_MESSAGE_TIMEOUT_SECS",
        defaults.message_timeout.as_secs(),
    )?;
    let dispatch_timeout = vars.parse::<u64>("DISPATCH_TIMEOUT_SECS")?;

    Ok(DispatchPolicy {
        concurrency_limit,
        message_timeout: Duration::from_secs(message_timeout),
        dispatch_timeout: dispatch_timeout.map(Duration::from_secs),
    })
}

/// キー検索関数のラッパー
///
/// 空文字列は未設定として扱う。
struct Vars<'a, F>(&'a F);

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|value| !value.trim().is_empty())
    }

    fn get_or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_string())
    }

    fn require(&self, name: &'static str) -> Result<String, ConfigError> {
        self.get(name).ok_or(ConfigError::Missing(name))
    }

    fn parse<T>(&self, name: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(name)
            .map(|value| {
                value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                    name,
                    value: value.clone(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    fn parse_or<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        Ok(self.parse(name)?.unwrap_or(default))
    }
}
