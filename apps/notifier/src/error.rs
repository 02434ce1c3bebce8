//! # Notifier エラー定義
//!
//! 通知サービス固有のエラーと、HTTP レスポンスへの変換を定義する。
//!
//! | エラー | ステータス |
//! |-------|-----------|
//! | `Validation` | 400 |
//! | `Resolution(EmptyRecipientSet / InvalidTarget)` | 422 |
//! | `Resolution(Directory)` / `Database` / `Internal` | 500 |
//!
//! 宛先ごとの組み立て失敗や送信失敗はエラーにならず、送信結果に含まれる。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use fragments_domain::DomainError;
use fragments_infra::InfraError;
use fragments_shared::{
    ErrorResponse,
    event_log::error::{category, kind},
};
use thiserror::Error;

use crate::usecase::notification::ResolutionError;

/// 通知サービスで発生するエラー
#[derive(Debug, Error)]
pub enum NotifierError {
    /// 不正なリクエスト（送信処理の前に拒否）
    #[error("不正なリクエスト: {0}")]
    Validation(String),

    /// 宛先解決エラー
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// データベースエラー
    #[error("データベースエラー: {0}")]
    Database(#[from] InfraError),

    /// 内部エラー（設定不備など）
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl From<DomainError> for NotifierError {
    fn from(e: DomainError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<validator::ValidationErrors> for NotifierError {
    fn from(e: validator::ValidationErrors) -> Self {
        Self::Validation(e.to_string())
    }
}

impl IntoResponse for NotifierError {
    fn into_response(self) -> Response {
        let body = match &self {
            NotifierError::Validation(msg) => ErrorResponse::validation_error(msg.clone()),
            NotifierError::Resolution(
                e @ (ResolutionError::EmptyRecipientSet | ResolutionError::InvalidTarget(_)),
            ) => ErrorResponse::unresolvable_recipients(e.to_string()),
            NotifierError::Resolution(ResolutionError::Directory(e)) => {
                tracing::error!(
                    error.category = category::INFRASTRUCTURE,
                    error.kind = kind::DIRECTORY_LOOKUP,
                    span_trace = %e.span_trace(),
                    "ユーザーディレクトリの読み出しに失敗: {}",
                    e
                );
                ErrorResponse::internal_error()
            }
            NotifierError::Database(e) => {
                tracing::error!(
                    error.category = category::INFRASTRUCTURE,
                    error.kind = kind::DATABASE,
                    span_trace = %e.span_trace(),
                    "データベースエラー: {}",
                    e
                );
                ErrorResponse::internal_error()
            }
            NotifierError::Internal(msg) => {
                tracing::error!("内部エラー: {}", msg);
                ErrorResponse::internal_error()
            }
        };

        let status =
            StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}
