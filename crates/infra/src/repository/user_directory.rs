//! # UserDirectory
//!
//! 一斉配信の宛先となる全ユーザーのメールアドレスを読み出す。読み取り専用。

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::InfraError;

/// ユーザーディレクトリトレイト
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// 全ユーザーのメールアドレスを登録順に返す
    ///
    /// メールアドレス未登録のユーザーは `None` になる。
    /// 形式の検証は呼び出し側（宛先解決）が行う。
    async fn list_all_user_emails(&self) -> Result<Vec<Option<String>>, InfraError>;
}

/// PostgreSQL 実装の UserDirectory
#[derive(Debug, Clone)]
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn list_all_user_emails(&self) -> Result<Vec<Option<String>>, InfraError> {
        let emails = sqlx::query_scalar::<_, Option<String>>(
            "SELECT email FROM users ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(emails)
    }
}
