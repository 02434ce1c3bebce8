//! # ドメイン層エラー定義
//!
//! | エラー種別 | HTTP ステータス | 用途 |
//! |-----------|----------------|------|
//! | `Validation` | 400 Bad Request | 入力値の検証失敗 |
//! | `NotFound` | 404 / 400 | 参照先エンティティが存在しない |

use thiserror::Error;

/// ドメイン層で発生するエラー
#[derive(Debug, Error)]
pub enum DomainError {
    /// バリデーションエラー
    ///
    /// 必須項目の欠落、文字数超過、メールアドレスの形式不正など。
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// エンティティが見つからない
    #[error("{entity_type} が見つかりません: {id}")]
    NotFound {
        /// エンティティの種類（"Comment" など）
        entity_type: &'static str,
        /// 検索に使用した識別子
        id:          String,
    },
}
