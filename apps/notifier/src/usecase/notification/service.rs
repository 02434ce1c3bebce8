//! # 通知サービス
//!
//! 宛先解決 → メッセージ組み立て → 送信 → 集計 のパイプラインをまとめる。
//!
//! ## 設計方針
//!
//! - **中断するのは宛先解決まで**: 宛先解決に失敗した場合のみエラーを返す。
//!   組み立て失敗・送信失敗は宛先ごとの `Failed` として結果に含める
//! - **テストモードは宛先解決で表現**: 運用者のみに送るかどうかは
//!   [`RecipientMode`] の選択だけで決まり、組み立て処理は分岐しない
//! - **返信は送信より先に記録**: 通知に失敗しても記録は取り消さない

use std::sync::Arc;

use fragments_domain::{
    comment::{
        AuthorId,
        CommentId,
        CommentReply,
        CommentReplyId,
        EntryId,
        NewCommentReply,
        ReplyContent,
    },
    notification::{NotificationPayload, PersonName, ReplyNotification},
    outcome::{BatchOutcome, SendAttempt},
    recipient::{BroadcastTarget, Recipient, RecipientMode, RecipientSet},
};
use fragments_infra::repository::CommentRepository;
use fragments_shared::{
    event_log::{error, event},
    log_business_event,
};

use super::{
    dispatcher::Dispatcher,
    message_builder::MessageBuilder,
    resolver::RecipientResolver,
};
use crate::error::NotifierError;

/// コメント返信の入力
#[derive(Debug, Clone)]
pub struct ReplyToCommentInput {
    pub entry_id:     EntryId,
    pub comment_id:   CommentId,
    pub author_id:    AuthorId,
    pub replier_name: PersonName,
    pub content:      ReplyContent,
}

/// コメント返信の結果
#[derive(Debug, Clone)]
pub struct ReplyToCommentOutput {
    pub reply:   CommentReply,
    pub outcome: BatchOutcome,
}

/// 組み立て段階の結果（投入順を保つためのスロット）
enum Slot {
    /// 送信対象（送信結果を先頭から順に割り当てる）
    Queued,
    /// 組み立てに失敗した宛先
    Failed(Recipient, String),
}

/// 通知サービス
pub struct NotificationService {
    resolver:   RecipientResolver,
    builder:    MessageBuilder,
    dispatcher: Dispatcher,
    comments:   Arc<dyn CommentRepository>,
    operator:   Option<Recipient>,
}

impl NotificationService {
    pub fn new(
        resolver: RecipientResolver,
        builder: MessageBuilder,
        dispatcher: Dispatcher,
        comments: Arc<dyn CommentRepository>,
        operator: Option<Recipient>,
    ) -> Self {
        Self {
            resolver,
            builder,
            dispatcher,
            comments,
            operator,
        }
    }

    /// 運用者宛ての通知を送信する（願い事）
    pub async fn notify_operator(
        &self,
        payload: NotificationPayload,
    ) -> Result<BatchOutcome, NotifierError> {
        let operator = self.operator()?;
        self.notify(payload, RecipientMode::Single(operator.as_str().to_string()))
            .await
    }

    /// 指定した 1 件の宛先に通知を送信する（ウェルカムメール）
    pub async fn notify_address(
        &self,
        payload: NotificationPayload,
        address: String,
    ) -> Result<BatchOutcome, NotifierError> {
        self.notify(payload, RecipientMode::Single(address)).await
    }

    /// 全ユーザーに通知を送信する（一斉配信、ニュースレター）
    ///
    /// `test_mode` が有効な場合は運用者のみに送信する。
    pub async fn notify_all_users(
        &self,
        payload: NotificationPayload,
        test_mode: bool,
    ) -> Result<BatchOutcome, NotifierError> {
        let mode = match (&self.operator, test_mode) {
            (Some(operator), _) => RecipientMode::broadcast(test_mode, operator),
            (None, false) => RecipientMode::Broadcast(BroadcastTarget::AllUsers),
            (None, true) => return Err(operator_not_configured()),
        };
        self.notify(payload, mode).await
    }

    /// コメントへの返信を記録し、元コメントの投稿者に通知する
    ///
    /// 1. 元コメントの投稿者アドレスを取得（なければ 400）
    /// 2. 投稿者アドレスを宛先として解決（不正なら 422、記録しない）
    /// 3. 返信を記録（失敗したら 500、送信しない）
    /// 4. 通知を送信（失敗は結果に含め、記録は取り消さない）
    pub async fn reply_to_comment(
        &self,
        input: ReplyToCommentInput,
    ) -> Result<ReplyToCommentOutput, NotifierError> {
        let author_email = self
            .comments
            .find_comment_author_email(&input.entry_id, &input.comment_id)
            .await?
            .ok_or_else(|| {
                NotifierError::Validation("Original comment author not found.".to_string())
            })?;

        let recipients = self
            .resolver
            .resolve(RecipientMode::Single(author_email))
            .await?;

        let reply = self
            .comments
            .insert_reply(NewCommentReply {
                id:         CommentReplyId::new(),
                entry_id:   input.entry_id.clone(),
                comment_id: input.comment_id,
                author_id:  input.author_id,
                content:    input.content.clone(),
            })
            .await?;

        log_business_event!(
            event.category = event::category::COMMENT,
            event.action = event::action::REPLY_RECORDED,
            event.entity_type = event::entity_type::COMMENT_REPLY,
            event.entity_id = %reply.id(),
            event.result = event::result::SUCCESS,
            comment.entry_id = %reply.entry_id(),
            comment.comment_id = %reply.comment_id(),
            "コメントへの返信を記録しました"
        );

        let payload = NotificationPayload::Reply(ReplyNotification {
            entry_id:      input.entry_id,
            replier_name:  input.replier_name,
            reply_content: input.content,
        });
        let outcome = self.deliver(&payload, recipients).await;

        Ok(ReplyToCommentOutput { reply, outcome })
    }

    /// 宛先を解決して送信する
    async fn notify(
        &self,
        payload: NotificationPayload,
        mode: RecipientMode,
    ) -> Result<BatchOutcome, NotifierError> {
        let recipients = self.resolver.resolve(mode).await?;
        Ok(self.deliver(&payload, recipients).await)
    }

    /// 解決済みの宛先ごとにメッセージを組み立てて送信する
    ///
    /// 組み立てに失敗した宛先は送信せずに `Failed` とし、投入順を保って結果に合流させる。
    async fn deliver(
        &self,
        payload: &NotificationPayload,
        recipients: RecipientSet,
    ) -> BatchOutcome {
        let kind: &'static str = payload.kind().into();

        let mut slots = Vec::with_capacity(recipients.len());
        let mut messages = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            match self.builder.build(payload, &recipient) {
                Ok(message) => {
                    messages.push(message);
                    slots.push(Slot::Queued);
                }
                Err(e) => {
                    tracing::warn!(
                        error.category = error::category::INFRASTRUCTURE,
                        error.kind = error::kind::TEMPLATE,
                        notification.kind = kind,
                        notification.recipient = %recipient,
                        "メッセージの組み立てに失敗: {}",
                        e
                    );
                    slots.push(Slot::Failed(recipient, e.to_string()));
                }
            }
        }

        let mut sent = self.dispatcher.dispatch_attempts(messages).await.into_iter();
        let attempts = slots.into_iter().filter_map(|slot| match slot {
            Slot::Queued => sent.next(),
            Slot::Failed(recipient, reason) => Some((recipient, SendAttempt::failed(reason))),
        });
        let outcome = BatchOutcome::from_attempts(attempts);

        log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::BATCH_COMPLETED,
            event.entity_type = event::entity_type::OUTBOUND_MESSAGE,
            event.result = batch_result(&outcome),
            notification.kind = kind,
            notification.total = outcome.total(),
            notification.delivered = outcome.delivered(),
            notification.failed = outcome.failed(),
            "通知の送信が完了しました"
        );

        outcome
    }

    fn operator(&self) -> Result<&Recipient, NotifierError> {
        self.operator.as_ref().ok_or_else(operator_not_configured)
    }
}

fn operator_not_configured() -> NotifierError {
    NotifierError::Internal("NOTIFICATION_OPERATOR_ADDRESS が設定されていません".to_string())
}

fn batch_result(outcome: &BatchOutcome) -> &'static str {
    if outcome.is_complete_success() {
        event::result::SUCCESS
    } else if outcome.delivered() > 0 {
        event::result::PARTIAL_FAILURE
    } else {
        event::result::FAILURE
    }
}
