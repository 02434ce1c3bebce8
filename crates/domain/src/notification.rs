//! # 通知
//!
//! メール通知の種別とペイロードを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 |
//! |---|------------|
//! | [`NotificationKind`] | 通知種別（願い事、ウェルカム、一斉配信、ニュースレター、返信） |
//! | [`NotificationPayload`] | 通知ペイロード（テンプレートに渡す内容） |
//! | [`DeviceInfo`] | 願い事の送信端末の情報 |
//!
//! ## 設計方針
//!
//! - **宛先とペイロードの分離**: ペイロードは宛先を持たない。宛先は
//!   [`RecipientMode`](crate::recipient::RecipientMode) で解決し、ペイロードと組み合わせて
//!   1 宛先 1 メッセージを構築する
//! - **テストモードを持たない**: テストモードは宛先解決側のバリアントで表現する

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use thiserror::Error;

use crate::comment::{EntryId, ReplyContent};

define_validated_string! {
    /// 人物名（願い事の送信者、新規ユーザー、返信者）
    pub struct PersonName {
        label: "名前",
        max_length: 100,
    }
}

define_validated_string! {
    /// 一斉配信・ニュースレターの件名
    pub struct NotificationSubject {
        label: "件名",
        max_length: 200,
    }
}

/// 通知送信エラー
#[derive(Debug, Error)]
pub enum NotificationError {
    /// メール送信に失敗
    #[error("メール送信に失敗: {0}")]
    SendFailed(String),

    /// テンプレートレンダリングに失敗
    #[error("テンプレートレンダリングに失敗: {0}")]
    TemplateFailed(String),
}

impl NotificationError {
    /// 送信先やテンプレートエンジンが返した理由（接頭辞なし）
    pub fn reason(&self) -> &str {
        match self {
            Self::SendFailed(reason) | Self::TemplateFailed(reason) => reason,
        }
    }
}

/// 通知種別
///
/// テンプレート名とログの `notification.kind` に使う。snake_case で文字列化される。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// 新年の願い事 → 運用者に送信
    Wish,
    /// ウェルカムメール → 新規ユーザーに送信
    Welcome,
    /// 一斉配信 → 全ユーザーに送信
    Broadcast,
    /// ニュースレター → 全ユーザーに送信
    Newsletter,
    /// コメント返信 → 元コメントの投稿者に送信
    Reply,
}

/// 緯度経度
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude:  f64,
    pub longitude: f64,
}

/// 送信端末の情報
///
/// ブラウザから送られた値をそのまま保持する。いずれの項目も省略可能。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(default)]
    pub location:       Option<GeoLocation>,
    #[serde(default)]
    pub location_error: Option<String>,
    #[serde(default)]
    pub user_agent:     Option<String>,
    #[serde(default)]
    pub platform:       Option<String>,
    #[serde(default)]
    pub language:       Option<String>,
}

/// 新年の願い事
#[derive(Debug, Clone, PartialEq)]
pub struct WishNotification {
    pub name:           PersonName,
    pub wish:           String,
    pub device_info:    Option<DeviceInfo>,
    /// `data:{mime};base64,{data}` 形式の画像（未検証）
    pub captured_image: Option<String>,
}

impl WishNotification {
    /// 位置情報の表示テキスト
    ///
    /// 位置が取れていれば緯度経度、取得エラーがあればその内容、
    /// どちらもなければ未提供である旨を返す。
    pub fn location_text(&self) -> String {
        match &self.device_info {
            Some(DeviceInfo {
                location: Some(location),
                ..
            }) => format!(
                "Location: Latitude: {}, Longitude: {}",
                location.latitude, location.longitude
            ),
            Some(DeviceInfo {
                location_error: Some(error),
                ..
            }) => format!("Location Error: {error}"),
            _ => "Device information not provided.".to_string(),
        }
    }
}

/// 新規ユーザーへのウェルカムメール
#[derive(Debug, Clone, PartialEq)]
pub struct WelcomeNotification {
    pub name: PersonName,
}

/// 全ユーザーへのお知らせ
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastNotification {
    pub subject: NotificationSubject,
    pub message: String,
}

/// ニュースレター
#[derive(Debug, Clone, PartialEq)]
pub struct NewsletterNotification {
    pub subject:  NotificationSubject,
    pub headline: String,
    pub content:  String,
    pub link:     Option<String>,
}

/// コメントへの返信通知
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyNotification {
    pub entry_id:      EntryId,
    pub replier_name:  PersonName,
    pub reply_content: ReplyContent,
}

/// 通知ペイロード
///
/// 宛先に依存しない通知内容。メッセージビルダーが宛先ごとに
/// [`OutboundMessage`](crate::message::OutboundMessage) へ展開する。
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationPayload {
    Wish(WishNotification),
    Welcome(WelcomeNotification),
    Broadcast(BroadcastNotification),
    Newsletter(NewsletterNotification),
    Reply(ReplyNotification),
}

impl NotificationPayload {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::Wish(_) => NotificationKind::Wish,
            Self::Welcome(_) => NotificationKind::Welcome,
            Self::Broadcast(_) => NotificationKind::Broadcast,
            Self::Newsletter(_) => NotificationKind::Newsletter,
            Self::Reply(_) => NotificationKind::Reply,
        }
    }
}
