//! # メッセージビルダー
//!
//! 通知ペイロードと宛先 1 件から送信メッセージ [`OutboundMessage`] を組み立てる。
//!
//! 送信元と URL は設定値として保持し、宛先ごとに異なるのは `to` のみ。
//! 願い事に添付された画像（data URL）が不正な場合は添付を省き、警告ログを残して続行する。

use base64::{Engine, engine::general_purpose::STANDARD};
use fragments_domain::{
    message::{Attachment, NewOutboundMessage, OutboundMessage},
    notification::{NotificationError, NotificationPayload},
    recipient::Recipient,
};
use thiserror::Error;

use super::template_renderer::TemplateRenderer;

/// 添付画像のファイル名（拡張子は MIME サブタイプ）
const CAPTURED_IMAGE_STEM: &str = "captured_image";

/// data URL の解析エラー
#[derive(Debug, Error)]
enum CapturedImageError {
    #[error("data URL の形式が不正です")]
    Malformed,

    #[error("base64 のデコードに失敗しました: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// メッセージビルダー
pub struct MessageBuilder {
    renderer:     TemplateRenderer,
    from_address: String,
    base_url:     String,
}

impl MessageBuilder {
    pub fn new(renderer: TemplateRenderer, from_address: String, base_url: String) -> Self {
        Self {
            renderer,
            from_address,
            base_url,
        }
    }

    /// 宛先 1 件分の送信メッセージを組み立てる
    pub fn build(
        &self,
        payload: &NotificationPayload,
        recipient: &Recipient,
    ) -> Result<OutboundMessage, NotificationError> {
        let rendered = self.renderer.render(payload, &self.base_url)?;

        Ok(OutboundMessage::new(NewOutboundMessage {
            from:        self.from_address.clone(),
            to:          recipient.clone(),
            subject:     rendered.subject,
            html_body:   rendered.html_body,
            text_body:   rendered.text_body,
            attachments: attachments_for(payload),
        }))
    }
}

fn attachments_for(payload: &NotificationPayload) -> Vec<Attachment> {
    let NotificationPayload::Wish(wish) = payload else {
        return Vec::new();
    };
    let Some(data_url) = wish.captured_image.as_deref() else {
        return Vec::new();
    };

    match decode_captured_image(data_url) {
        Ok(attachment) => vec![attachment],
        Err(e) => {
            tracing::warn!(error = %e, "添付画像を解析できないため添付せずに送信します");
            Vec::new()
        }
    }
}

/// `data:{mime};base64,{data}` を添付ファイルに変換する
fn decode_captured_image(data_url: &str) -> Result<Attachment, CapturedImageError> {
    let (header, data) = data_url
        .split_once(";base64,")
        .ok_or(CapturedImageError::Malformed)?;
    let mime_type = header
        .strip_prefix("data:")
        .ok_or(CapturedImageError::Malformed)?;
    let subtype = mime_type
        .split_once('/')
        .map(|(_, subtype)| subtype)
        .filter(|subtype| !subtype.is_empty())
        .ok_or(CapturedImageError::Malformed)?;

    let bytes = STANDARD.decode(data.trim())?;

    Ok(Attachment::new(
        format!("{CAPTURED_IMAGE_STEM}.{subtype}"),
        mime_type,
        bytes,
    ))
}
