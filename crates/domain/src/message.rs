//! # 送信メッセージ
//!
//! 宛先 1 件分の完成したメールを表す。メッセージビルダーが生成し、
//! 配信エンジンが 1 回の送信試行の間だけ所有する。生成後は変更できない。

use std::fmt;

use crate::recipient::Recipient;

/// 添付ファイル
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    filename:  String,
    mime_type: String,
    bytes:     Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

// バイト列はログに出さずサイズだけを出す
impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// 送信メッセージ作成パラメータ
pub struct NewOutboundMessage {
    pub from:        String,
    pub to:          Recipient,
    pub subject:     String,
    pub html_body:   String,
    pub text_body:   String,
    pub attachments: Vec<Attachment>,
}

/// 送信メッセージ
///
/// フィールドは private で、[`OutboundMessage::new`] 以外では作れない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    from:        String,
    to:          Recipient,
    subject:     String,
    html_body:   String,
    text_body:   String,
    attachments: Vec<Attachment>,
}

impl OutboundMessage {
    pub fn new(params: NewOutboundMessage) -> Self {
        Self {
            from:        params.from,
            to:          params.to,
            subject:     params.subject,
            html_body:   params.html_body,
            text_body:   params.text_body,
            attachments: params.attachments,
        }
    }

    /// 送信元（`"表示名 <address>"` 形式も可）
    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &Recipient {
        &self.to
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn html_body(&self) -> &str {
        &self.html_body
    }

    pub fn text_body(&self) -> &str {
        &self.text_body
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }
}
