//! # コメント返信
//!
//! 日記エントリーのコメントに対する返信を表す。
//!
//! 返信は追記のみで、通知メールの送信結果にかかわらず取り消されない。
//! 記録日時は保存時にデータベースが付与する。

use chrono::{DateTime, Utc};

define_uuid_id! {
    /// コメント返信 ID
    ///
    /// comment_replies テーブルの主キー。UUID v7 を使用。
    pub struct CommentReplyId;
}

define_validated_string! {
    /// 日記エントリー ID（外部で採番された識別子）
    pub struct EntryId {
        label: "エントリー ID",
        max_length: 128,
    }
}

define_validated_string! {
    /// コメント ID（外部で採番された識別子）
    pub struct CommentId {
        label: "コメント ID",
        max_length: 128,
    }
}

define_validated_string! {
    /// 返信者のユーザー ID
    pub struct AuthorId {
        label: "投稿者 ID",
        max_length: 128,
    }
}

define_validated_string! {
    /// 返信本文
    pub struct ReplyContent {
        label: "返信内容",
        max_length: 5000,
    }
}

/// コメント返信の新規作成パラメータ
pub struct NewCommentReply {
    pub id:         CommentReplyId,
    pub entry_id:   EntryId,
    pub comment_id: CommentId,
    pub author_id:  AuthorId,
    pub content:    ReplyContent,
}

/// コメント返信の DB 復元パラメータ
pub struct CommentReplyRecord {
    pub id:         CommentReplyId,
    pub entry_id:   EntryId,
    pub comment_id: CommentId,
    pub author_id:  AuthorId,
    pub content:    ReplyContent,
    pub created_at: DateTime<Utc>,
}

/// コメント返信エンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentReply {
    id:         CommentReplyId,
    entry_id:   EntryId,
    comment_id: CommentId,
    author_id:  AuthorId,
    content:    ReplyContent,
    created_at: DateTime<Utc>,
}

impl CommentReply {
    /// 既存のデータから復元する
    pub fn from_db(record: CommentReplyRecord) -> Self {
        Self {
            id:         record.id,
            entry_id:   record.entry_id,
            comment_id: record.comment_id,
            author_id:  record.author_id,
            content:    record.content,
            created_at: record.created_at,
        }
    }

    // Getter メソッド

    pub fn id(&self) -> &CommentReplyId {
        &self.id
    }

    pub fn entry_id(&self) -> &EntryId {
        &self.entry_id
    }

    pub fn comment_id(&self) -> &CommentId {
        &self.comment_id
    }

    pub fn author_id(&self) -> &AuthorId {
        &self.author_id
    }

    pub fn content(&self) -> &ReplyContent {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
