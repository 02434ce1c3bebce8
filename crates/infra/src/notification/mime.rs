//! MIME メッセージの組み立て
//!
//! SMTP 送信と SES の raw 送信で共通に使う。

use fragments_domain::{message::OutboundMessage, notification::NotificationError};
use lettre::{
    Message,
    message::{Attachment, Mailbox, MultiPart, SinglePart, header::ContentType},
};

/// `OutboundMessage` を lettre の `Message` に変換する
///
/// 本文は text/plain と text/html の multipart/alternative。
/// 添付ファイルがある場合は multipart/mixed で包む。
pub(super) fn build_message(message: &OutboundMessage) -> Result<Message, NotificationError> {
    let from: Mailbox = message
        .from()
        .parse()
        .map_err(|e| NotificationError::SendFailed(format!("送信元アドレス不正: {e}")))?;
    let to: Mailbox = message
        .to()
        .as_str()
        .parse()
        .map_err(|e| NotificationError::SendFailed(format!("宛先アドレス不正: {e}")))?;

    let body = MultiPart::alternative()
        .singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_PLAIN)
                .body(message.text_body().to_string()),
        )
        .singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_HTML)
                .body(message.html_body().to_string()),
        );

    let builder = Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject());

    let built = if message.attachments().is_empty() {
        builder.multipart(body)
    } else {
        let mut mixed = MultiPart::mixed().multipart(body);
        for attachment in message.attachments() {
            let content_type = ContentType::parse(attachment.mime_type()).map_err(|e| {
                NotificationError::SendFailed(format!(
                    "添付ファイルの MIME タイプ不正 ({}): {e}",
                    attachment.mime_type()
                ))
            })?;
            mixed = mixed.singlepart(
                Attachment::new(attachment.filename().to_string())
                    .body(attachment.bytes().to_vec(), content_type),
            );
        }
        builder.multipart(mixed)
    };

    built.map_err(|e| NotificationError::SendFailed(format!("メッセージ構築失敗: {e}")))
}
