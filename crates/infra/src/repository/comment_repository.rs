//! # CommentRepository
//!
//! コメント投稿者の参照と、コメントへの返信の記録を担当するリポジトリ。
//!
//! 返信は追記のみ。記録日時はデータベースの `now()` で付与し、
//! `RETURNING` で受け取ってエンティティを復元する。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fragments_domain::comment::{
    CommentId,
    CommentReply,
    CommentReplyRecord,
    EntryId,
    NewCommentReply,
};
use sqlx::PgPool;

use crate::error::InfraError;

/// コメントリポジトリトレイト
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// コメント投稿者のメールアドレスを取得する
    ///
    /// コメントが存在しない場合、または投稿者のメールアドレスが未登録の場合は `None`。
    async fn find_comment_author_email(
        &self,
        entry_id: &EntryId,
        comment_id: &CommentId,
    ) -> Result<Option<String>, InfraError>;

    /// 返信を記録し、記録日時付きのエンティティを返す
    async fn insert_reply(&self, reply: NewCommentReply) -> Result<CommentReply, InfraError>;
}

/// PostgreSQL 実装の CommentRepository
#[derive(Debug, Clone)]
pub struct PostgresCommentRepository {
    pool: PgPool,
}

impl PostgresCommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(%entry_id, %comment_id))]
    async fn find_comment_author_email(
        &self,
        entry_id: &EntryId,
        comment_id: &CommentId,
    ) -> Result<Option<String>, InfraError> {
        let email = sqlx::query_scalar::<_, Option<String>>(
            r#"
            SELECT author_email
            FROM comments
            WHERE entry_id = $1 AND id = $2
            "#,
        )
        .bind(entry_id.as_str())
        .bind(comment_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(email.flatten())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(reply_id = %reply.id))]
    async fn insert_reply(&self, reply: NewCommentReply) -> Result<CommentReply, InfraError> {
        let created_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            INSERT INTO comment_replies (id, entry_id, comment_id, author_id, content)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING created_at
            "#,
        )
        .bind(reply.id.as_uuid())
        .bind(reply.entry_id.as_str())
        .bind(reply.comment_id.as_str())
        .bind(reply.author_id.as_str())
        .bind(reply.content.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(CommentReply::from_db(CommentReplyRecord {
            id: reply.id,
            entry_id: reply.entry_id,
            comment_id: reply.comment_id,
            author_id: reply.author_id,
            content: reply.content,
            created_at,
        }))
    }
}
