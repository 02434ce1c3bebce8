//! # テンプレートレンダラー
//!
//! tera テンプレートエンジンで通知メールの件名・HTML・plaintext を生成する。
//!
//! ## 設計方針
//!
//! - **`include_str!` によるコンパイル時埋め込み**: テンプレートはバイナリに埋め込まれる
//! - **テンプレート名 = 通知種別**: `{kind}.html` / `{kind}.txt`
//! - **エスケープ**: tera の既定どおり `.html` のみ自動エスケープし、`.txt` はそのまま出力する
//! - **宛先に依存しない**: 同じペイロードなら全宛先で同じ内容になる

use fragments_domain::notification::{
    NotificationError,
    NotificationPayload,
    ReplyNotification,
    WishNotification,
};
use tera::{Context, Tera};

/// 端末情報の項目が未提供の場合の表示
const UNKNOWN: &str = "Unknown";

/// レンダリング結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNotification {
    pub subject:   String,
    pub html_body: String,
    pub text_body: String,
}

/// テンプレートレンダラー
pub struct TemplateRenderer {
    engine: Tera,
}

impl TemplateRenderer {
    /// 新しいレンダラーインスタンスを作成
    ///
    /// `include_str!` で埋め込んだテンプレートを tera に登録する。
    pub fn new() -> Result<Self, NotificationError> {
        let mut engine = Tera::default();

        engine
            .add_raw_templates(vec![
                (
                    "wish.html",
                    include_str!("../../../templates/notifications/wish.html"),
                ),
                (
                    "wish.txt",
                    include_str!("../../../templates/notifications/wish.txt"),
                ),
                (
                    "welcome.html",
                    include_str!("../../../templates/notifications/welcome.html"),
                ),
                (
                    "welcome.txt",
                    include_str!("../../../templates/notifications/welcome.txt"),
                ),
                (
                    "broadcast.html",
                    include_str!("../../../templates/notifications/broadcast.html"),
                ),
                (
                    "broadcast.txt",
                    include_str!("../../../templates/notifications/broadcast.txt"),
                ),
                (
                    "newsletter.html",
                    include_str!("../../../templates/notifications/newsletter.html"),
                ),
                (
                    "newsletter.txt",
                    include_str!("../../../templates/notifications/newsletter.txt"),
                ),
                (
                    "reply.html",
                    include_str!("../../../templates/notifications/reply.html"),
                ),
                (
                    "reply.txt",
                    include_str!("../../../templates/notifications/reply.txt"),
                ),
            ])
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok(Self { engine })
    }

    /// 通知ペイロードから件名と本文を生成する
    ///
    /// # 引数
    ///
    /// - `payload`: 通知ペイロード
    /// - `base_url`: フロントエンドのベース URL（例: `http://localhost:5173`）
    pub fn render(
        &self,
        payload: &NotificationPayload,
        base_url: &str,
    ) -> Result<RenderedNotification, NotificationError> {
        let template_name: &'static str = payload.kind().into();
        let (subject, context) = build_template_params(payload, base_url);

        let html_body = self
            .engine
            .render(&format!("{template_name}.html"), &context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        let text_body = self
            .engine
            .render(&format!("{template_name}.txt"), &context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok(RenderedNotification {
            subject,
            html_body,
            text_body,
        })
    }
}

/// 件名とコンテキストを構築する
fn build_template_params(payload: &NotificationPayload, base_url: &str) -> (String, Context) {
    let mut context = Context::new();
    context.insert("base_url", base_url);

    let subject = match payload {
        NotificationPayload::Wish(wish) => {
            insert_wish(&mut context, wish);
            format!("New Year Wish from {}", wish.name)
        }
        NotificationPayload::Welcome(welcome) => {
            context.insert("name", welcome.name.as_str());
            format!("Welcome to Fragments of Me, {}!", welcome.name)
        }
        NotificationPayload::Broadcast(broadcast) => {
            context.insert("message", &broadcast.message);
            broadcast.subject.as_str().to_string()
        }
        NotificationPayload::Newsletter(newsletter) => {
            context.insert("headline", &newsletter.headline);
            context.insert("content", &newsletter.content);
            context.insert("link", &newsletter.link);
            newsletter.subject.as_str().to_string()
        }
        NotificationPayload::Reply(reply) => {
            insert_reply(&mut context, reply, base_url);
            "New reply on your comment".to_string()
        }
    };

    (subject, context)
}

fn insert_wish(context: &mut Context, wish: &WishNotification) {
    context.insert("name", wish.name.as_str());
    context.insert("wish", &wish.wish);
    context.insert("location_text", &wish.location_text());
    context.insert("has_image", &wish.captured_image.is_some());

    context.insert("has_device_info", &wish.device_info.is_some());
    let device = wish.device_info.clone().unwrap_or_default();
    context.insert("user_agent", device.user_agent.as_deref().unwrap_or(UNKNOWN));
    context.insert("platform", device.platform.as_deref().unwrap_or(UNKNOWN));
    context.insert("language", device.language.as_deref().unwrap_or(UNKNOWN));
}

fn insert_reply(context: &mut Context, reply: &ReplyNotification, base_url: &str) {
    context.insert("replier_name", reply.replier_name.as_str());
    context.insert("reply_content", reply.reply_content.as_str());
    context.insert(
        "entry_url",
        &format!("{base_url}/entry/{}", reply.entry_id),
    );
}
