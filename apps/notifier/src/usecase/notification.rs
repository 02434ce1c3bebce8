//! # 通知ユースケース
//!
//! 宛先解決から送信結果の集計までの通知パイプラインを構成する。
//!
//! ## モジュール構成
//!
//! - [`resolver`] - 宛先モードを検証済みの宛先集合に解決
//! - [`template_renderer`] - tera テンプレートエンジンによる件名・本文の生成
//! - [`message_builder`] - ペイロードと宛先 1 件から送信メッセージを組み立て
//! - [`dispatcher`] - 同時実行数を制限したバッチ送信
//! - [`reporter`] - 送信結果を呼び出し元向けのレポートに変換
//! - [`service`] - 上記をまとめた通知サービス

pub mod dispatcher;
pub mod message_builder;
pub mod reporter;
pub mod resolver;
pub mod service;
pub mod template_renderer;

pub use dispatcher::{DispatchPolicy, Dispatcher};
pub use message_builder::MessageBuilder;
pub use reporter::{DispatchReport, ReportVerbosity, report};
pub use resolver::{RecipientResolver, ResolutionError};
pub use service::{NotificationService, ReplyToCommentInput, ReplyToCommentOutput};
pub use template_renderer::{RenderedNotification, TemplateRenderer};
