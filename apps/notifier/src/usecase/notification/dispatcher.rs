//! # ディスパッチャー
//!
//! 送信メッセージ列を、同時実行数を制限したバッチ単位で送信する。
//!
//! ## 送信モデル
//!
//! 1. メッセージを `concurrency_limit` 件ずつのバッチに分ける
//! 2. バッチ内の各送信を tokio タスクとして同時に起動する
//! 3. バッチ内の全送信が決着してから次のバッチを起動する
//! 4. 結果は投入順に並べ直して [`BatchOutcome`] に集約する
//!
//! 1 通の失敗（送信エラー、タイムアウト、タスクの panic）は、その 1 通の
//! `Failed` になるだけで、他のメッセージには影響しない。
//!
//! ## 配信全体の期限
//!
//! `dispatch_timeout` を設定すると、期限到達時点で未決着の送信を中断し
//! `Failed("cancelled")` とする。未起動のメッセージは送信せずに
//! `Failed("cancelled")` とする。決着済みの結果はそのまま残す。

use std::{sync::Arc, time::Duration};

use fragments_domain::{
    message::OutboundMessage,
    outcome::{BatchOutcome, SendAttempt},
    recipient::Recipient,
};
use fragments_infra::notification::NotificationSender;
use fragments_shared::{
    event_log::{error, event},
    log_business_event,
};
use tokio::{task::JoinHandle, time::Instant};
use tracing::Instrument;

/// 既定の同時送信数
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 10;
/// 既定の 1 通あたりのタイムアウト
pub const DEFAULT_MESSAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// 送信ポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPolicy {
    /// 同時に処理中にできる送信数の上限（1 以上）
    pub concurrency_limit: usize,
    /// 1 通あたりのタイムアウト
    pub message_timeout:   Duration,
    /// 配信全体の期限（`None` なら無期限）
    pub dispatch_timeout:  Option<Duration>,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            message_timeout:   DEFAULT_MESSAGE_TIMEOUT,
            dispatch_timeout:  None,
        }
    }
}

/// ディスパッチャー
///
/// 送信クライアントは全タスクで共有する（読み取り専用）。
pub struct Dispatcher {
    sender: Arc<dyn NotificationSender>,
    policy: DispatchPolicy,
}

impl Dispatcher {
    pub fn new(sender: Arc<dyn NotificationSender>, policy: DispatchPolicy) -> Self {
        Self { sender, policy }
    }

    /// メッセージ列を送信し、集計結果を返す
    pub async fn dispatch(&self, messages: Vec<OutboundMessage>) -> BatchOutcome {
        BatchOutcome::from_attempts(self.dispatch_attempts(messages).await)
    }

    /// メッセージ列を送信し、投入順の送信試行結果を返す
    ///
    /// 返り値の長さと順序は入力と一致する。
    pub async fn dispatch_attempts(
        &self,
        messages: Vec<OutboundMessage>,
    ) -> Vec<(Recipient, SendAttempt)> {
        let deadline = self
            .policy
            .dispatch_timeout
            .map(|timeout| Instant::now() + timeout);
        let limit = self.policy.concurrency_limit.max(1);

        let mut attempts = Vec::with_capacity(messages.len());
        let mut pending = messages.into_iter();

        loop {
            let batch: Vec<OutboundMessage> = pending.by_ref().take(limit).collect();
            if batch.is_empty() {
                break;
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                let skipped = batch.into_iter().chain(pending.by_ref());
                attempts.extend(
                    skipped.map(|message| (message.to().clone(), SendAttempt::cancelled())),
                );
                tracing::warn!("配信全体の期限を過ぎたため残りの送信を取り消しました");
                break;
            }

            attempts.extend(self.run_batch(batch, deadline).await);
        }

        attempts
    }

    /// 1 バッチ分を同時に送信し、全件の決着を待つ
    async fn run_batch(
        &self,
        batch: Vec<OutboundMessage>,
        deadline: Option<Instant>,
    ) -> Vec<(Recipient, SendAttempt)> {
        let handles: Vec<(Recipient, JoinHandle<SendAttempt>)> = batch
            .into_iter()
            .map(|message| {
                let recipient = message.to().clone();
                let sender = Arc::clone(&self.sender);
                let timeout = self.policy.message_timeout;
                let task = send_one(sender, message, timeout).in_current_span();
                (recipient, tokio::spawn(task))
            })
            .collect();

        let mut attempts = Vec::with_capacity(handles.len());
        for (recipient, mut handle) in handles {
            let joined = match deadline {
                Some(deadline) => {
                    match tokio::time::timeout_at(deadline, &mut handle).await {
                        Ok(joined) => joined,
                        Err(_) => {
                            handle.abort();
                            tracing::warn!(
                                recipient = %recipient,
                                "配信全体の期限切れで送信を中断しました"
                            );
                            attempts.push((recipient, SendAttempt::cancelled()));
                            continue;
                        }
                    }
                }
                None => handle.await,
            };

            let attempt = joined.unwrap_or_else(|e| {
                tracing::error!(
                    recipient = %recipient,
                    error = %e,
                    "送信タスクが異常終了しました"
                );
                SendAttempt::failed(format!("送信タスクが異常終了しました: {e}"))
            });
            attempts.push((recipient, attempt));
        }

        attempts
    }
}

/// 1 通を送信し、結果を [`SendAttempt`] に変換する
async fn send_one(
    sender: Arc<dyn NotificationSender>,
    message: OutboundMessage,
    timeout: Duration,
) -> SendAttempt {
    match tokio::time::timeout(timeout, sender.send_email(&message)).await {
        Ok(Ok(token)) => {
            log_business_event!(
                event.category = event::category::NOTIFICATION,
                event.action = event::action::NOTIFICATION_SENT,
                event.entity_type = event::entity_type::OUTBOUND_MESSAGE,
                event.result = event::result::SUCCESS,
                notification.recipient = %message.to(),
                transport_response = %token,
                "通知メールを送信しました"
            );
            SendAttempt::delivered(token)
        }
        Ok(Err(e)) => {
            log_business_event!(
                event.category = event::category::NOTIFICATION,
                event.action = event::action::NOTIFICATION_FAILED,
                event.entity_type = event::entity_type::OUTBOUND_MESSAGE,
                event.result = event::result::FAILURE,
                notification.recipient = %message.to(),
                error.category = error::category::EXTERNAL_SERVICE,
                error.kind = error::kind::TRANSPORT,
                error = %e,
                "通知メールの送信に失敗しました"
            );
            SendAttempt::failed(e.reason())
        }
        Err(_) => {
            log_business_event!(
                event.category = event::category::NOTIFICATION,
                event.action = event::action::NOTIFICATION_FAILED,
                event.entity_type = event::entity_type::OUTBOUND_MESSAGE,
                event.result = event::result::FAILURE,
                notification.recipient = %message.to(),
                timeout_ms = timeout.as_millis() as u64,
                "通知メールの送信がタイムアウトしました"
            );
            SendAttempt::timed_out()
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use fragments_domain::{
        message::NewOutboundMessage,
        notification::NotificationError,
    };
    use fragments_infra::mock::MockNotificationSender;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn message(to: &str) -> OutboundMessage {
        OutboundMessage::new(NewOutboundMessage {
            from:        "noreply@fragments.example.com".to_string(),
            to:          Recipient::new(to).unwrap(),
            subject:     "お知らせ".to_string(),
            html_body:   "<p>本文</p>".to_string(),
            text_body:   "本文".to_string(),
            attachments: vec![],
        })
    }

    fn messages(count: usize) -> Vec<OutboundMessage> {
        (0..count)
            .map(|i| message(&format!("user{i}@example.com")))
            .collect()
    }

    fn policy(concurrency_limit: usize) -> DispatchPolicy {
        DispatchPolicy {
            concurrency_limit,
            ..DispatchPolicy::default()
        }
    }

    fn sut(sender: &MockNotificationSender, policy: DispatchPolicy) -> Dispatcher {
        Dispatcher::new(Arc::new(sender.clone()), policy)
    }

    /// 常に panic する送信クライアント
    struct PanickingSender;

    #[async_trait]
    impl NotificationSender for PanickingSender {
        async fn send_email(&self, _message: &OutboundMessage) -> Result<String, NotificationError> {
            panic!("transport exploded");
        }
    }

    #[tokio::test]
    async fn test_空の入力では送信せず空の結果を返す() {
        let sender = MockNotificationSender::new();

        let outcome = sut(&sender, DispatchPolicy::default())
            .dispatch(vec![])
            .await;

        assert_eq!(outcome, BatchOutcome::empty());
        assert_eq!(sender.call_count(), 0);
    }

    #[tokio::test]
    async fn test_全件成功すると失敗なしで集計される() {
        let sender = MockNotificationSender::new();

        let outcome = sut(&sender, policy(2)).dispatch(messages(5)).await;

        assert_eq!(outcome.total(), 5);
        assert_eq!(outcome.delivered(), 5);
        assert_eq!(outcome.failed(), 0);
        assert!(outcome.is_complete_success());
        assert_eq!(sender.call_count(), 5);
    }

    #[tokio::test]
    async fn test_3件中2件目だけ失敗するとその宛先だけが失敗になる() {
        let sender = MockNotificationSender::new();
        sender.fail_for("user1@example.com", "550 mailbox unavailable");

        let outcome = sut(&sender, DispatchPolicy::default())
            .dispatch(messages(3))
            .await;

        assert_eq!(outcome.total(), 3);
        assert_eq!(outcome.delivered(), 2);
        assert_eq!(outcome.failed(), 1);
        let failure = &outcome.failures()[0];
        assert_eq!(failure.recipient().as_str(), "user1@example.com");
        assert_eq!(failure.reason(), "550 mailbox unavailable");
    }

    #[rstest]
    #[case::先頭(0)]
    #[case::バッチ境界(2)]
    #[case::末尾(6)]
    #[tokio::test]
    async fn test_失敗する宛先の位置によらずその1件だけが失敗する(#[case] position: usize) {
        let sender = MockNotificationSender::new();
        let failing = format!("user{position}@example.com");
        sender.fail_for(&failing, "auth rejected");

        let outcome = sut(&sender, policy(3)).dispatch(messages(7)).await;

        assert_eq!(outcome.total(), 7);
        assert_eq!(outcome.delivered(), 6);
        assert_eq!(outcome.failed(), 1);
        assert_eq!(outcome.failures()[0].recipient().as_str(), failing);
        assert_eq!(sender.call_count(), 7);
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(10)]
    #[tokio::test]
    async fn test_同時送信数は上限を超えない(#[case] limit: usize) {
        let sender = MockNotificationSender::new().with_delay(Duration::from_millis(20));

        let outcome = sut(&sender, policy(limit)).dispatch(messages(12)).await;

        assert_eq!(outcome.delivered(), 12);
        assert!(
            sender.max_in_flight() <= limit,
            "max_in_flight = {}, limit = {limit}",
            sender.max_in_flight()
        );
    }

    #[tokio::test]
    async fn test_失敗は投入順に並ぶ() {
        let sender = MockNotificationSender::new();
        sender.fail_for("user4@example.com", "rejected");
        sender.fail_for("user0@example.com", "rejected");
        sender.fail_for("user2@example.com", "rejected");

        let outcome = sut(&sender, policy(2)).dispatch(messages(5)).await;

        let failed: Vec<&str> = outcome
            .failures()
            .iter()
            .map(|failure| failure.recipient().as_str())
            .collect();
        assert_eq!(
            failed,
            vec!["user0@example.com", "user2@example.com", "user4@example.com"]
        );
    }

    #[tokio::test]
    async fn test_応答しない送信はタイムアウトで失敗し他の送信に影響しない() {
        let sender = MockNotificationSender::new();
        sender.hang_for("user1@example.com");
        let policy = DispatchPolicy {
            concurrency_limit: 10,
            message_timeout:   Duration::from_millis(100),
            dispatch_timeout:  None,
        };

        let started = std::time::Instant::now();
        let outcome = sut(&sender, policy).dispatch(messages(3)).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(outcome.delivered(), 2);
        assert_eq!(outcome.failed(), 1);
        assert_eq!(outcome.failures()[0].recipient().as_str(), "user1@example.com");
        assert_eq!(outcome.failures()[0].reason(), SendAttempt::TIMEOUT_REASON);
    }

    #[tokio::test]
    async fn test_送信タスクのpanicはその1件の失敗になる() {
        let dispatcher = Dispatcher::new(Arc::new(PanickingSender), DispatchPolicy::default());

        let outcome = dispatcher.dispatch(messages(2)).await;

        assert_eq!(outcome.total(), 2);
        assert_eq!(outcome.failed(), 2);
        assert!(outcome.failures()[0].reason().contains("異常終了"));
    }

    #[tokio::test]
    async fn test_配信全体の期限切れで未決着と未起動の送信が取り消される() {
        let sender = MockNotificationSender::new();
        sender.hang_for("user1@example.com");
        let policy = DispatchPolicy {
            concurrency_limit: 2,
            message_timeout:   Duration::from_secs(60),
            dispatch_timeout:  Some(Duration::from_millis(100)),
        };

        let attempts = sut(&sender, policy).dispatch_attempts(messages(4)).await;

        let summary: Vec<(&str, Option<&str>)> = attempts
            .iter()
            .map(|(recipient, attempt)| (recipient.as_str(), attempt.failure_reason()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("user0@example.com", None),
                ("user1@example.com", Some(SendAttempt::CANCELLED_REASON)),
                ("user2@example.com", Some(SendAttempt::CANCELLED_REASON)),
                ("user3@example.com", Some(SendAttempt::CANCELLED_REASON)),
            ]
        );
        // 2 バッチ目は起動しない
        assert_eq!(sender.call_count(), 2);
    }
}
