//! # 通知ハンドラ
//!
//! 通知種別ごとの送信 API を提供する。
//!
//! ## エンドポイント
//!
//! - `POST /send-email` - 新年の願い事を運用者に送信
//! - `POST /send-welcome` - 新規ユーザーにウェルカムメールを送信
//! - `POST /send-broadcast` - 全ユーザーにお知らせを送信
//! - `POST /send-newsletter` - 全ユーザーにニュースレターを送信
//! - `POST /reply-to-comment` - コメントへの返信を記録し、元コメントの投稿者に通知
//!
//! いずれも `?verbose=true` で失敗の明細をレスポンスに含める。
//! 一部の送信に失敗しても 200 を返し、件数と `success: false` で伝える。

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use fragments_domain::{
    comment::{AuthorId, CommentId, CommentReplyId, EntryId, ReplyContent},
    notification::{
        BroadcastNotification,
        DeviceInfo,
        NewsletterNotification,
        NotificationKind,
        NotificationPayload,
        NotificationSubject,
        PersonName,
        WelcomeNotification,
        WishNotification,
    },
};
use fragments_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    error::NotifierError,
    usecase::notification::{
        DispatchReport,
        NotificationService,
        ReplyToCommentInput,
        ReportVerbosity,
        report,
    },
};

/// 通知 API の共有状態
pub struct NotificationState {
    pub service: NotificationService,
}

// --- リクエスト/レスポンス型 ---

/// レポート詳細度のクエリパラメータ
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub verbose: bool,
}

impl ReportQuery {
    fn verbosity(&self) -> ReportVerbosity {
        ReportVerbosity::from_flag(self.verbose)
    }
}

/// 願い事送信リクエスト
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendWishRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "name は 1〜100 文字で指定してください"))]
    pub name:           String,
    #[serde(default)]
    #[validate(length(min = 1, max = 2000, message = "wish は 1〜2000 文字で指定してください"))]
    pub wish:           String,
    #[serde(default)]
    pub device_info:    Option<DeviceInfo>,
    /// `data:{mime};base64,{data}` 形式の画像
    #[serde(default)]
    pub image_captured: Option<String>,
}

/// ウェルカムメール送信リクエスト
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendWelcomeRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "name は 1〜100 文字で指定してください"))]
    pub name:  String,
    /// 形式の検証は宛先解決で行う（不正なら 422）
    #[serde(default)]
    #[validate(length(min = 1, message = "email は必須です"))]
    pub email: String,
}

/// 一斉配信リクエスト
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendBroadcastRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "subject は 1〜200 文字で指定してください"))]
    pub subject:   String,
    #[serde(default)]
    #[validate(length(min = 1, message = "message は必須です"))]
    pub message:   String,
    #[serde(default)]
    pub test_mode: bool,
}

/// ニュースレター配信リクエスト
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendNewsletterRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "subject は 1〜200 文字で指定してください"))]
    pub subject:   String,
    #[serde(default)]
    #[validate(length(min = 1, message = "headline は必須です"))]
    pub headline:  String,
    #[serde(default)]
    #[validate(length(min = 1, message = "content は必須です"))]
    pub content:   String,
    #[serde(default)]
    #[validate(length(max = 2048, message = "link は 2048 文字以内で指定してください"))]
    pub link:      Option<String>,
    #[serde(default)]
    pub test_mode: bool,
}

/// コメント返信リクエスト
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReplyToCommentRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "entryId は必須です"))]
    pub entry_id:      String,
    #[serde(default)]
    #[validate(length(min = 1, message = "commentId は必須です"))]
    pub comment_id:    String,
    #[serde(default)]
    #[validate(length(min = 1, max = 5000, message = "replyContent は 1〜5000 文字で指定してください"))]
    pub reply_content: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "authorId は必須です"))]
    pub author_id:     String,
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "replierName は 1〜100 文字で指定してください"))]
    pub replier_name:  String,
}

/// コメント返信レスポンス
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyToCommentResponse {
    pub reply_id:     CommentReplyId,
    pub created_at:   DateTime<Utc>,
    pub notification: DispatchReport,
}

// --- ハンドラ ---

/// POST /send-email
///
/// 新年の願い事を運用者アドレスに送信する。
pub async fn send_wish(
    State(state): State<Arc<NotificationState>>,
    Query(query): Query<ReportQuery>,
    payload: Result<Json<SendWishRequest>, JsonRejection>,
) -> Result<impl IntoResponse, NotifierError> {
    let req = validated(payload)?;

    let payload = NotificationPayload::Wish(WishNotification {
        name:           PersonName::new(req.name)?,
        wish:           req.wish,
        device_info:    req.device_info,
        captured_image: req.image_captured,
    });
    let outcome = state.service.notify_operator(payload).await?;

    let response = ApiResponse::new(report(
        NotificationKind::Wish,
        &outcome,
        query.verbosity(),
    ));
    Ok((StatusCode::OK, Json(response)))
}

/// POST /send-welcome
///
/// 新規ユーザーにウェルカムメールを送信する。
pub async fn send_welcome(
    State(state): State<Arc<NotificationState>>,
    Query(query): Query<ReportQuery>,
    payload: Result<Json<SendWelcomeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, NotifierError> {
    let req = validated(payload)?;

    let payload = NotificationPayload::Welcome(WelcomeNotification {
        name: PersonName::new(req.name)?,
    });
    let outcome = state.service.notify_address(payload, req.email).await?;

    let response = ApiResponse::new(report(
        NotificationKind::Welcome,
        &outcome,
        query.verbosity(),
    ));
    Ok((StatusCode::OK, Json(response)))
}

/// POST /send-broadcast
///
/// 全ユーザーにお知らせを送信する。`testMode` なら運用者のみ。
pub async fn send_broadcast(
    State(state): State<Arc<NotificationState>>,
    Query(query): Query<ReportQuery>,
    payload: Result<Json<SendBroadcastRequest>, JsonRejection>,
) -> Result<impl IntoResponse, NotifierError> {
    let req = validated(payload)?;

    let payload = NotificationPayload::Broadcast(BroadcastNotification {
        subject: NotificationSubject::new(req.subject)?,
        message: req.message,
    });
    let outcome = state
        .service
        .notify_all_users(payload, req.test_mode)
        .await?;

    let response = ApiResponse::new(report(
        NotificationKind::Broadcast,
        &outcome,
        query.verbosity(),
    ));
    Ok((StatusCode::OK, Json(response)))
}

/// POST /send-newsletter
///
/// 全ユーザーにニュースレターを送信する。`testMode` なら運用者のみ。
pub async fn send_newsletter(
    State(state): State<Arc<NotificationState>>,
    Query(query): Query<ReportQuery>,
    payload: Result<Json<SendNewsletterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, NotifierError> {
    let req = validated(payload)?;

    let payload = NotificationPayload::Newsletter(NewsletterNotification {
        subject:  NotificationSubject::new(req.subject)?,
        headline: req.headline,
        content:  req.content,
        link:     req.link.filter(|link| !link.trim().is_empty()),
    });
    let outcome = state
        .service
        .notify_all_users(payload, req.test_mode)
        .await?;

    let response = ApiResponse::new(report(
        NotificationKind::Newsletter,
        &outcome,
        query.verbosity(),
    ));
    Ok((StatusCode::OK, Json(response)))
}

/// POST /reply-to-comment
///
/// 返信を記録してから元コメントの投稿者に通知する。
/// 通知の失敗はレスポンスの `notification` に含め、記録は取り消さない。
pub async fn reply_to_comment(
    State(state): State<Arc<NotificationState>>,
    Query(query): Query<ReportQuery>,
    payload: Result<Json<ReplyToCommentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, NotifierError> {
    let req = validated(payload)?;

    let input = ReplyToCommentInput {
        entry_id:     EntryId::new(req.entry_id)?,
        comment_id:   CommentId::new(req.comment_id)?,
        author_id:    AuthorId::new(req.author_id)?,
        replier_name: PersonName::new(req.replier_name)?,
        content:      ReplyContent::new(req.reply_content)?,
    };
    let output = state.service.reply_to_comment(input).await?;

    let response = ApiResponse::new(ReplyToCommentResponse {
        reply_id:     output.reply.id().clone(),
        created_at:   output.reply.created_at(),
        notification: report(NotificationKind::Reply, &output.outcome, query.verbosity()),
    });
    Ok((StatusCode::OK, Json(response)))
}

/// JSON ボディを取り出して検証する
///
/// JSON として読めない場合も含め、送信処理の前に 400 で拒否する。
fn validated<T: Validate>(payload: Result<Json<T>, JsonRejection>) -> Result<T, NotifierError> {
    let Json(req) = payload.map_err(|e| NotifierError::Validation(e.body_text()))?;
    req.validate()?;
    Ok(req)
}
