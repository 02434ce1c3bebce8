//! # アプリケーション構築
//!
//! 設定から依存コンポーネントを組み立て、axum の Router を構築する。
//!
//! `main.rs` と統合テストの両方から使う。統合テストではモックを注入した
//! [`NotificationState`] を [`build_app`] に渡す。

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
};
use fragments_infra::{
    InfraError,
    notification::{
        NoopNotificationSender,
        NotificationSender,
        ResendNotificationSender,
        SesNotificationSender,
        SmtpNotificationSender,
    },
    repository::{CommentRepository, UserDirectory},
};
use fragments_shared::observability::{MakeRequestUuidV7, make_request_span};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{
    config::{NotificationBackend, NotificationConfig, NotifierConfig},
    handler::{
        NotificationState,
        health_check,
        reply_to_comment,
        send_broadcast,
        send_newsletter,
        send_welcome,
        send_wish,
    },
    usecase::notification::{
        Dispatcher,
        MessageBuilder,
        NotificationService,
        RecipientResolver,
        TemplateRenderer,
    },
};

/// リクエストボディの上限（data URL 形式の画像を受け付けるため大きめ）
const BODY_LIMIT_BYTES: usize = 50 * 1024 * 1024;

/// 設定に応じた送信クライアントを作成する
pub async fn build_sender(
    config: &NotificationConfig,
) -> Result<Arc<dyn NotificationSender>, InfraError> {
    let sender: Arc<dyn NotificationSender> = match config.backend {
        NotificationBackend::Smtp => {
            tracing::info!(
                "通知バックエンド: SMTP ({}:{}, 認証: {})",
                config.smtp_host,
                config.smtp_port,
                config.smtp_credentials.is_some()
            );
            Arc::new(SmtpNotificationSender::new(
                &config.smtp_host,
                config.smtp_port,
                config.smtp_credentials.clone(),
            )?)
        }
        NotificationBackend::Resend => {
            let api_key = config
                .resend_api_key
                .clone()
                .ok_or_else(|| InfraError::configuration("RESEND_API_KEY が設定されていません"))?;
            tracing::info!("通知バックエンド: Resend ({})", config.resend_base_url);
            Arc::new(ResendNotificationSender::new(
                config.resend_base_url.clone(),
                api_key,
            ))
        }
        NotificationBackend::Ses => {
            tracing::info!("通知バックエンド: SES");
            Arc::new(SesNotificationSender::from_env().await)
        }
        NotificationBackend::Noop => {
            tracing::info!("通知バックエンド: Noop（送信無効）");
            Arc::new(NoopNotificationSender)
        }
    };

    Ok(sender)
}

/// 通知サービスを組み立てる
pub fn build_service(
    config: &NotifierConfig,
    sender: Arc<dyn NotificationSender>,
    directory: Arc<dyn UserDirectory>,
    comments: Arc<dyn CommentRepository>,
) -> Result<NotificationService, InfraError> {
    let renderer = TemplateRenderer::new()
        .map_err(|e| InfraError::configuration(format!("テンプレートの登録に失敗: {e}")))?;
    let notification = &config.notification;

    Ok(NotificationService::new(
        RecipientResolver::new(directory),
        MessageBuilder::new(
            renderer,
            notification.from_address.clone(),
            notification.base_url.clone(),
        ),
        Dispatcher::new(sender, config.dispatch),
        comments,
        notification.operator.clone(),
    ))
}

/// Router を構築する
///
/// `frontend_url` を指定した場合はそのオリジンのみ CORS を許可する。
pub fn build_app(state: Arc<NotificationState>, frontend_url: Option<HeaderValue>) -> Router {
    let cors = match frontend_url {
        Some(origin) => CorsLayer::new().allow_origin(origin),
        None => CorsLayer::new().allow_origin(Any),
    }
    .allow_methods(Any)
    .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/send-email", post(send_wish))
        .route("/send-welcome", post(send_welcome))
        .route("/send-broadcast", post(send_broadcast))
        .route("/send-newsletter", post(send_newsletter))
        .route("/reply-to-comment", post(reply_to_comment))
        .with_state(state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors)
        // Request ID レイヤー（下に書いたものが外側）
        // 1. SetRequestIdLayer（最外）: UUID v7 を生成（またはクライアント提供値を使用）
        // 2. TraceLayer: スパンに request_id を含め、全ログに自動注入
        // 3. PropagateRequestIdLayer: レスポンスヘッダーに X-Request-Id をコピー
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
}
