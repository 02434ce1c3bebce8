//! # 宛先解決
//!
//! [`RecipientMode`] を重複のない検証済み宛先集合 [`RecipientSet`] に変換する。
//!
//! | モード | 結果 |
//! |-------|------|
//! | `Single` | 1 件。形式不正なら [`ResolutionError::InvalidTarget`] |
//! | `List` | 不正なものを除外し、重複を除いた集合。空なら [`ResolutionError::EmptyRecipientSet`] |
//! | `Broadcast(AllUsers)` | ディレクトリの全アドレス（未登録・不正は除外）。空ならエラー |
//! | `Broadcast(SelfOnly)` | ディレクトリを 1 回読み出した上で、運用者アドレスのみ |
//!
//! 重複判定は大文字小文字を区別せず、最初に現れた表記を残す。
//! 順序は入力（ディレクトリの返却順）の初出順。

use std::sync::Arc;

use fragments_domain::recipient::{BroadcastTarget, Recipient, RecipientMode, RecipientSet};
use fragments_infra::{InfraError, repository::UserDirectory};
use thiserror::Error;

/// 宛先解決エラー
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// 有効な宛先が 1 件も残らなかった
    #[error("有効な宛先がありません")]
    EmptyRecipientSet,

    /// 単一宛先の形式が不正
    #[error("宛先が不正です: {0}")]
    InvalidTarget(String),

    /// ユーザーディレクトリの読み出しに失敗
    #[error("ユーザーディレクトリの読み出しに失敗しました: {0}")]
    Directory(#[from] InfraError),
}

/// 宛先リゾルバ
pub struct RecipientResolver {
    directory: Arc<dyn UserDirectory>,
}

impl RecipientResolver {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    /// 宛先モードを検証済みの宛先集合に解決する
    ///
    /// ディレクトリを読むのは `Broadcast` のときだけ。成功時の集合は必ず 1 件以上。
    pub async fn resolve(&self, mode: RecipientMode) -> Result<RecipientSet, ResolutionError> {
        match mode {
            RecipientMode::Single(address) => Recipient::new(address)
                .map(RecipientSet::singleton)
                .map_err(|e| ResolutionError::InvalidTarget(e.to_string())),
            RecipientMode::List(addresses) => {
                non_empty(collect_valid(addresses.into_iter().map(Some)))
            }
            RecipientMode::Broadcast(target) => {
                let emails = self.directory.list_all_user_emails().await?;
                let resolved = collect_valid(emails);

                match target {
                    BroadcastTarget::AllUsers => non_empty(resolved),
                    BroadcastTarget::SelfOnly(operator) => {
                        tracing::info!(
                            discarded = resolved.len(),
                            "テストモードのため運用者アドレスのみに送信します"
                        );
                        Ok(RecipientSet::singleton(operator))
                    }
                }
            }
        }
    }
}

/// 未登録（`None`）と形式不正を除外し、重複を除いた集合を作る
fn collect_valid(candidates: impl IntoIterator<Item = Option<String>>) -> RecipientSet {
    candidates
        .into_iter()
        .flatten()
        .filter_map(|candidate| match Recipient::new(candidate.as_str()) {
            Ok(recipient) => Some(recipient),
            Err(e) => {
                tracing::warn!(candidate = %candidate, error = %e, "不正な宛先を除外しました");
                None
            }
        })
        .collect()
}

fn non_empty(recipients: RecipientSet) -> Result<RecipientSet, ResolutionError> {
    if recipients.is_empty() {
        return Err(ResolutionError::EmptyRecipientSet);
    }
    Ok(recipients)
}

#[cfg(test)]
mod tests {
    use fragments_infra::mock::MockUserDirectory;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn addresses(set: &RecipientSet) -> Vec<&str> {
        set.iter().map(Recipient::as_str).collect()
    }

    fn sut(directory: &MockUserDirectory) -> RecipientResolver {
        RecipientResolver::new(Arc::new(directory.clone()))
    }

    #[tokio::test]
    async fn test_単一宛先はそのまま1件になる() {
        let directory = MockUserDirectory::new();

        let set = sut(&directory)
            .resolve(RecipientMode::Single("reader@example.com".to_string()))
            .await
            .unwrap();

        assert_eq!(addresses(&set), vec!["reader@example.com"]);
        assert_eq!(directory.read_count(), 0);
    }

    #[rstest]
    #[case("")]
    #[case("not-an-address")]
    #[case("reader@")]
    #[tokio::test]
    async fn test_単一宛先が不正ならinvalid_targetになる(#[case] address: &str) {
        let directory = MockUserDirectory::new();

        let result = sut(&directory)
            .resolve(RecipientMode::Single(address.to_string()))
            .await;

        assert!(matches!(result, Err(ResolutionError::InvalidTarget(_))));
    }

    #[tokio::test]
    async fn test_リストは不正な宛先を除外し大文字小文字を無視して重複を除く() {
        let directory = MockUserDirectory::new();
        let list = vec![
            "A@example.com".to_string(),
            "broken".to_string(),
            "b@example.com".to_string(),
            "a@EXAMPLE.com".to_string(),
        ];

        let set = sut(&directory)
            .resolve(RecipientMode::List(list))
            .await
            .unwrap();

        assert_eq!(addresses(&set), vec!["A@example.com", "b@example.com"]);
    }

    #[tokio::test]
    async fn test_リストに有効な宛先がなければempty_recipient_setになる() {
        let directory = MockUserDirectory::new();

        let result = sut(&directory)
            .resolve(RecipientMode::List(vec!["broken".to_string()]))
            .await;

        tokio_test::assert_err!(&result);
        assert!(matches!(result, Err(ResolutionError::EmptyRecipientSet)));
    }

    #[tokio::test]
    async fn test_全ユーザー配信は未登録と不正を除外してディレクトリ順に並ぶ() {
        let directory = MockUserDirectory::with_emails(&["c@example.com", "a@example.com"]);
        directory.add_user(None);
        directory.add_user(Some("oops"));
        directory.add_user(Some("C@example.com"));

        let set = sut(&directory)
            .resolve(RecipientMode::Broadcast(BroadcastTarget::AllUsers))
            .await
            .unwrap();

        assert_eq!(addresses(&set), vec!["c@example.com", "a@example.com"]);
        assert_eq!(directory.read_count(), 1);
    }

    #[tokio::test]
    async fn test_全ユーザー配信で宛先がなければempty_recipient_setになる() {
        let directory = MockUserDirectory::new();
        directory.add_user(None);

        let result = sut(&directory)
            .resolve(RecipientMode::Broadcast(BroadcastTarget::AllUsers))
            .await;

        assert!(matches!(result, Err(ResolutionError::EmptyRecipientSet)));
    }

    #[tokio::test]
    async fn test_テストモードはディレクトリを読んだ上で運用者のみを返す() {
        let directory = MockUserDirectory::with_emails(&["a@example.com", "b@example.com"]);
        let operator = Recipient::new("operator@example.com").unwrap();

        let set = sut(&directory)
            .resolve(RecipientMode::broadcast(true, &operator))
            .await
            .unwrap();

        assert_eq!(addresses(&set), vec!["operator@example.com"]);
        assert_eq!(directory.read_count(), 1);
    }

    #[tokio::test]
    async fn test_ディレクトリの読み出し失敗はdirectoryエラーになる() {
        let directory = MockUserDirectory::with_emails(&["a@example.com"]);
        directory.set_unavailable();

        let result = sut(&directory)
            .resolve(RecipientMode::Broadcast(BroadcastTarget::AllUsers))
            .await;

        assert!(matches!(result, Err(ResolutionError::Directory(_))));
    }
}
