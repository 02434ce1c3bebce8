//! # ビジネスイベントログ
//!
//! 通知送信やコメント返信の記録など、運用上追跡したいイベントを
//! 構造化ログとして出力するためのマクロとフィールド定数。
//!
//! [`log_business_event!`] は `event.kind = "business_event"` を自動付与するので、
//! JSON ログから `jq 'select(.["event.kind"] == "business_event")'` で抽出できる。
//!
//! フィールド名はドット記法（`event.category`、`event.action`）で統一する。

/// ビジネスイベントを `info` レベルの構造化ログとして出力する。
///
/// ## 必須フィールド（慣例）
///
/// - `event.category`: [`event::category`] の定数
/// - `event.action`: [`event::action`] の定数
/// - `event.result`: [`event::result`] の定数
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

/// イベントフィールドの定数
pub mod event {
    /// イベントカテゴリ
    pub mod category {
        pub const NOTIFICATION: &str = "notification";
        pub const COMMENT: &str = "comment";
    }

    /// イベントアクション
    pub mod action {
        // 通知
        pub const NOTIFICATION_SENT: &str = "notification.sent";
        pub const NOTIFICATION_FAILED: &str = "notification.failed";
        pub const BATCH_COMPLETED: &str = "notification.batch_completed";

        // コメント
        pub const REPLY_RECORDED: &str = "comment.reply_recorded";
    }

    /// エンティティ種別
    pub mod entity_type {
        pub const OUTBOUND_MESSAGE: &str = "outbound_message";
        pub const COMMENT_REPLY: &str = "comment_reply";
    }

    /// イベント結果
    pub mod result {
        pub const SUCCESS: &str = "success";
        pub const PARTIAL_FAILURE: &str = "partial_failure";
        pub const FAILURE: &str = "failure";
    }
}

/// エラーコンテキストフィールドの定数
///
/// `tracing::error!` に `error.category` と `error.kind` を直接付与して使う。
pub mod error {
    /// エラーカテゴリ
    pub mod category {
        /// インフラストラクチャ（DB）
        pub const INFRASTRUCTURE: &str = "infrastructure";
        /// 外部サービス（SMTP、SES、Resend）
        pub const EXTERNAL_SERVICE: &str = "external_service";
    }

    /// エラー種別
    pub mod kind {
        pub const DATABASE: &str = "database";
        pub const DIRECTORY_LOOKUP: &str = "directory_lookup";
        pub const TEMPLATE: &str = "template";
        pub const TRANSPORT: &str = "transport";
    }
}
