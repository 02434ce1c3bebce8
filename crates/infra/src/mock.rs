//! # テスト用モック
//!
//! ユースケーステストと HTTP 統合テストで使用するインメモリモック。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! fragments-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use fragments_domain::{
    comment::{CommentId, CommentReply, CommentReplyRecord, EntryId, NewCommentReply},
    message::OutboundMessage,
    notification::NotificationError,
};

use crate::{
    error::InfraError,
    notification::NotificationSender,
    repository::{CommentRepository, UserDirectory},
};

// ===== MockNotificationSender =====

/// 送信内容を記録するモック送信クライアント
///
/// - 宛先ごとに失敗・無応答を設定できる
/// - 全送信に一律の遅延を入れられる
/// - 同時送信数の最大値（high-water mark）を記録する
#[derive(Clone, Default)]
pub struct MockNotificationSender {
    sent:          Arc<Mutex<Vec<OutboundMessage>>>,
    failures:      Arc<Mutex<HashMap<String, String>>>,
    hanging:       Arc<Mutex<HashSet<String>>>,
    delay:         Option<Duration>,
    calls:         Arc<AtomicUsize>,
    in_flight:     Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// 全送信に遅延を入れる
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// 指定宛先への送信を失敗させる
    pub fn fail_for(&self, address: &str, reason: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(address.to_ascii_lowercase(), reason.to_string());
    }

    /// 指定宛先への送信を応答しないままにする
    pub fn hang_for(&self, address: &str) {
        self.hanging
            .lock()
            .unwrap()
            .insert(address.to_ascii_lowercase());
    }

    /// 送信に成功したメッセージ（完了順）
    pub fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// 送信に成功した宛先（完了順）
    pub fn sent_addresses(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|message| message.to().as_str().to_string())
            .collect()
    }

    /// `send_email` が呼ばれた回数（失敗・無応答を含む）
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 同時に処理中だった送信数の最大値
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// 処理中カウンタをドロップ時に戻すガード
///
/// タイムアウトや中断で future が破棄された場合も確実に減算する。
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotificationSender for MockNotificationSender {
    async fn send_email(&self, message: &OutboundMessage) -> Result<String, NotificationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlightGuard(Arc::clone(&self.in_flight));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let key = message.to().as_str().to_ascii_lowercase();

        let hangs = self.hanging.lock().unwrap().contains(&key);
        if hangs {
            std::future::pending::<()>().await;
        }

        let failure = self.failures.lock().unwrap().get(&key).cloned();
        if let Some(reason) = failure {
            return Err(NotificationError::SendFailed(reason));
        }

        self.sent.lock().unwrap().push(message.clone());
        Ok(format!("mock-{call}"))
    }
}

// ===== MockUserDirectory =====

/// 固定のアドレス一覧を返すモックディレクトリ
#[derive(Clone, Default)]
pub struct MockUserDirectory {
    emails:      Arc<Mutex<Vec<Option<String>>>>,
    unavailable: Arc<Mutex<bool>>,
    reads:       Arc<AtomicUsize>,
}

impl MockUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定したアドレスを持つディレクトリを作成する
    pub fn with_emails(emails: &[&str]) -> Self {
        let directory = Self::new();
        for email in emails {
            directory.add_user(Some(*email));
        }
        directory
    }

    /// ユーザーを追加する（`None` はメールアドレス未登録）
    pub fn add_user(&self, email: Option<&str>) {
        self.emails
            .lock()
            .unwrap()
            .push(email.map(str::to_string));
    }

    /// 読み出しを失敗させる
    pub fn set_unavailable(&self) {
        *self.unavailable.lock().unwrap() = true;
    }

    /// `list_all_user_emails` が呼ばれた回数
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserDirectory for MockUserDirectory {
    async fn list_all_user_emails(&self) -> Result<Vec<Option<String>>, InfraError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if *self.unavailable.lock().unwrap() {
            return Err(InfraError::unexpected("ユーザーディレクトリに接続できません"));
        }
        Ok(self.emails.lock().unwrap().clone())
    }
}

// ===== MockCommentRepository =====

/// インメモリのコメントリポジトリ
#[derive(Clone, Default)]
pub struct MockCommentRepository {
    authors:     Arc<Mutex<HashMap<(String, String), Option<String>>>>,
    replies:     Arc<Mutex<Vec<CommentReply>>>,
    fail_insert: Arc<Mutex<bool>>,
}

impl MockCommentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// コメントを登録する（`author_email` が `None` なら投稿者アドレス未登録）
    pub fn add_comment(&self, entry_id: &str, comment_id: &str, author_email: Option<&str>) {
        self.authors.lock().unwrap().insert(
            (entry_id.to_string(), comment_id.to_string()),
            author_email.map(str::to_string),
        );
    }

    /// 返信の記録を失敗させる
    pub fn set_insert_failure(&self) {
        *self.fail_insert.lock().unwrap() = true;
    }

    /// 記録された返信
    pub fn replies(&self) -> Vec<CommentReply> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommentRepository for MockCommentRepository {
    async fn find_comment_author_email(
        &self,
        entry_id: &EntryId,
        comment_id: &CommentId,
    ) -> Result<Option<String>, InfraError> {
        Ok(self
            .authors
            .lock()
            .unwrap()
            .get(&(entry_id.as_str().to_string(), comment_id.as_str().to_string()))
            .cloned()
            .flatten())
    }

    async fn insert_reply(&self, reply: NewCommentReply) -> Result<CommentReply, InfraError> {
        if *self.fail_insert.lock().unwrap() {
            return Err(InfraError::unexpected("返信の記録に失敗しました"));
        }

        let reply = CommentReply::from_db(CommentReplyRecord {
            id:         reply.id,
            entry_id:   reply.entry_id,
            comment_id: reply.comment_id,
            author_id:  reply.author_id,
            content:    reply.content,
            created_at: Utc::now(),
        });
        self.replies.lock().unwrap().push(reply.clone());
        Ok(reply)
    }
}
