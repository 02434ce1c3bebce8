//! # 宛先
//!
//! 通知メールの宛先（検証済みメールアドレス）と、その集合・解決モードを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 |
//! |---|------------|
//! | [`Recipient`] | 宛先（検証済みメールアドレス） |
//! | [`RecipientSet`] | 重複を除いた宛先集合（投入順を保持） |
//! | [`RecipientMode`] | 宛先解決モード（単一 / 明示リスト / 一斉配信） |
//! | [`BroadcastTarget`] | 一斉配信の対象（全ユーザー / 運用者のみ） |

use std::collections::HashSet;

use serde::Serialize;
use validator::ValidateEmail;

use crate::DomainError;

/// メールアドレスの最大長（RFC 5321 のパス長上限）
const MAX_ADDRESS_LENGTH: usize = 254;

/// 宛先（値オブジェクト）
///
/// 生成時に以下を検証する:
///
/// - 前後の空白を除いて空でない
/// - `@` を含む
/// - 254 文字以内
/// - `local@domain` として構文的に正しい
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Recipient(String);

impl Recipient {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_string();

        if value.is_empty() {
            return Err(DomainError::Validation(
                "宛先メールアドレスは必須です".to_string(),
            ));
        }

        if !value.contains('@') {
            return Err(DomainError::Validation(format!(
                "宛先メールアドレスに @ が含まれていません: {value}"
            )));
        }

        if value.len() > MAX_ADDRESS_LENGTH {
            return Err(DomainError::Validation(format!(
                "宛先メールアドレスは {MAX_ADDRESS_LENGTH} 文字以内である必要があります"
            )));
        }

        if !value.as_str().validate_email() {
            return Err(DomainError::Validation(format!(
                "宛先メールアドレスの形式が不正です: {value}"
            )));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// 重複判定に使うキー（大文字小文字を区別しない）
    fn dedup_key(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl std::fmt::Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 重複を除いた宛先集合
///
/// 大文字小文字違いのアドレスは同一とみなし、最初に現れた表記を残す。
/// 反復順は投入順で、送信結果のレポート順を決定的にする。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientSet {
    recipients: Vec<Recipient>,
    seen:       HashSet<String>,
}

impl RecipientSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 1 件だけを含む集合を作成する
    pub fn singleton(recipient: Recipient) -> Self {
        let mut set = Self::new();
        set.insert(recipient);
        set
    }

    /// 宛先を追加する。既に含まれていた場合は `false` を返す
    pub fn insert(&mut self, recipient: Recipient) -> bool {
        if !self.seen.insert(recipient.dedup_key()) {
            return false;
        }
        self.recipients.push(recipient);
        true
    }

    pub fn contains(&self, recipient: &Recipient) -> bool {
        self.seen.contains(&recipient.dedup_key())
    }

    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Recipient> {
        self.recipients.iter()
    }
}

impl FromIterator<Recipient> for RecipientSet {
    fn from_iter<I: IntoIterator<Item = Recipient>>(iter: I) -> Self {
        let mut set = Self::new();
        for recipient in iter {
            set.insert(recipient);
        }
        set
    }
}

impl IntoIterator for RecipientSet {
    type Item = Recipient;
    type IntoIter = std::vec::IntoIter<Recipient>;

    fn into_iter(self) -> Self::IntoIter {
        self.recipients.into_iter()
    }
}

impl<'a> IntoIterator for &'a RecipientSet {
    type Item = &'a Recipient;
    type IntoIter = std::slice::Iter<'a, Recipient>;

    fn into_iter(self) -> Self::IntoIter {
        self.recipients.iter()
    }
}

/// 一斉配信の対象
///
/// テストモードは `SelfOnly` で表し、メッセージ構築側では分岐しない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastTarget {
    /// ユーザーディレクトリの全ユーザー
    AllUsers,
    /// 運用者アドレスのみ（ディレクトリの解決結果は破棄する）
    SelfOnly(Recipient),
}

/// 宛先解決モード
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipientMode {
    /// 呼び出し元が指定した 1 件（未検証）
    Single(String),
    /// 呼び出し元が指定した複数件（未検証、不正なものは除外）
    List(Vec<String>),
    /// ユーザーディレクトリからの一斉配信
    Broadcast(BroadcastTarget),
}

impl RecipientMode {
    /// 一斉配信モードを作成する
    ///
    /// `test_mode` が有効な場合は運用者アドレスのみを対象にする。
    pub fn broadcast(test_mode: bool, operator: &Recipient) -> Self {
        if test_mode {
            Self::Broadcast(BroadcastTarget::SelfOnly(operator.clone()))
        } else {
            Self::Broadcast(BroadcastTarget::AllUsers)
        }
    }
}
