//! # インフラ層エラー定義
//!
//! データベースや送信クライアントの構築で発生するエラーを表現する。
//!
//! ## 構造
//!
//! `std::io::Error` と同じ struct + enum パターンを採用:
//! - [`InfraError`]: エラー種別（[`InfraErrorKind`]）と [`SpanTrace`] を保持するラッパー
//! - [`InfraErrorKind`]: エラーの具体的な種別（Database, Configuration 等）
//!
//! `From` 実装や convenience constructor でエラーを生成すると、
//! その時点の呼び出し経路（スパン）が自動的に記録される。
//!
//! メール送信そのものの失敗は [`NotificationError`](fragments_domain::notification::NotificationError)
//! で表し、ここには含めない。

use std::fmt;

use derive_more::Display;
use thiserror::Error;
use tracing_error::SpanTrace;

/// インフラ層で発生するエラー
///
/// エラー種別に応じた処理には [`kind()`](InfraError::kind) を使用する:
///
/// ```ignore
/// match error.kind() {
///     InfraErrorKind::Database(_) => { /* DB 障害 */ }
///     _ => { /* その他 */ }
/// }
/// ```
#[derive(Display)]
#[display("{kind}")]
pub struct InfraError {
    kind:       InfraErrorKind,
    span_trace: SpanTrace,
}

/// インフラ層エラーの種別
#[derive(Debug, Error)]
pub enum InfraErrorKind {
    /// データベースエラー
    ///
    /// SQL クエリの実行失敗、接続エラー、制約違反など。
    #[error("データベースエラー: {0}")]
    Database(#[source] sqlx::Error),

    /// 設定エラー
    ///
    /// 送信クライアントの構築に必要な値が不正な場合。
    #[error("設定エラー: {0}")]
    Configuration(String),

    /// 予期しないエラー
    ///
    /// DB に保存された値がドメインの検証を通らない場合など。
    #[error("予期しないエラー: {0}")]
    Unexpected(String),
}

impl InfraError {
    /// エラー種別を取得する
    pub fn kind(&self) -> &InfraErrorKind {
        &self.kind
    }

    /// SpanTrace を取得する
    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// 設定エラーを生成する
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self {
            kind:       InfraErrorKind::Configuration(msg.into()),
            span_trace: SpanTrace::capture(),
        }
    }

    /// 予期しないエラーを生成する
    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self {
            kind:       InfraErrorKind::Unexpected(msg.into()),
            span_trace: SpanTrace::capture(),
        }
    }
}

impl fmt::Debug for InfraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfraError")
            .field("kind", &self.kind)
            .field("span_trace", &self.span_trace)
            .finish()
    }
}

impl std::error::Error for InfraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

impl From<sqlx::Error> for InfraError {
    fn from(source: sqlx::Error) -> Self {
        Self {
            kind:       InfraErrorKind::Database(source),
            span_trace: SpanTrace::capture(),
        }
    }
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::layer::SubscriberExt as _;

    use super::*;

    /// テスト用に ErrorLayer 付き subscriber を設定する
    fn with_error_layer(f: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(tracing_error::ErrorLayer::default());
        let _guard = tracing::subscriber::set_default(subscriber);
        f();
    }

    #[test]
    fn test_from_sqlx_errorでspan_traceがキャプチャされる() {
        with_error_layer(|| {
            let span = tracing::info_span!("list_all_user_emails");
            let _enter = span.enter();

            let err: InfraError = sqlx::Error::RowNotFound.into();

            assert!(matches!(err.kind(), InfraErrorKind::Database(_)));
            let trace_str = format!("{}", err.span_trace());
            assert!(
                trace_str.contains("list_all_user_emails"),
                "SpanTrace がスパン名を含むこと: {trace_str}",
            );
        });
    }

    #[test]
    fn test_configurationでspan_traceがキャプチャされる() {
        with_error_layer(|| {
            let span = tracing::info_span!("build_sender");
            let _enter = span.enter();

            let err = InfraError::configuration("SMTP ホストが不正です");

            assert!(matches!(
                err.kind(),
                InfraErrorKind::Configuration(msg) if msg == "SMTP ホストが不正です"
            ));
            assert!(format!("{}", err.span_trace()).contains("build_sender"));
        });
    }

    #[test]
    fn test_displayがinfra_error_kindのメッセージを出力する() {
        let err = InfraError::unexpected("壊れた行");
        assert_eq!(format!("{err}"), "予期しないエラー: 壊れた行");
    }

    #[test]
    fn test_sourceがinfra_error_kindに委譲する() {
        use std::error::Error;

        let err: InfraError = sqlx::Error::RowNotFound.into();
        assert!(err.source().is_some());

        let err = InfraError::unexpected("test");
        assert!(err.source().is_none());
    }
}
