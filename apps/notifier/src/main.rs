//! # Fragments Notifier サーバー
//!
//! ブログアプリケーションのイベント（願い事の投稿、新規登録、お知らせ、
//! ニュースレター、コメント返信）をメール通知として配信する HTTP サービス。
//!
//! ## 役割
//!
//! - **宛先解決**: 単一宛先・ユーザーディレクトリ全件・テストモード（運用者のみ）
//! - **メッセージ組み立て**: 通知種別ごとの tera テンプレートで HTML/plaintext を生成
//! - **一括送信**: 同時実行数を制限したバッチ送信。1 通の失敗は他に波及しない
//! - **結果報告**: 件数（詳細表示なら失敗の明細）を返す
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `NOTIFIER_HOST` | No | バインドアドレス（既定 `0.0.0.0`） |
//! | `NOTIFIER_PORT` | No | ポート番号（既定 `4400`） |
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//! | `FRONTEND_URL` | No | CORS で許可するオリジン |
//! | `NOTIFICATION_BACKEND` | No | `smtp` / `resend` / `ses` / `noop`（既定 `noop`） |
//! | `NOTIFICATION_OPERATOR_ADDRESS` | No | 願い事とテストモードの宛先 |
//! | `DISPATCH_CONCURRENCY` | No | 同時送信数（既定 10） |
//! | `DISPATCH_MESSAGE_TIMEOUT_SECS` | No | 1 通あたりのタイムアウト秒（既定 30） |
//! | `DISPATCH_TIMEOUT_SECS` | No | 配信全体の期限秒 |
//! | `LOG_FORMAT` | No | `json` / `pretty` |
//!
//! ## 起動方法
//!
//! ```bash
//! DATABASE_URL=postgres://... cargo run -p fragments-notifier
//! ```

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use fragments_infra::{
    db,
    repository::{
        CommentRepository,
        PostgresCommentRepository,
        PostgresUserDirectory,
        UserDirectory,
    },
};
use fragments_notifier::{
    app_builder::{build_app, build_sender, build_service},
    config::NotifierConfig,
    handler::NotificationState,
};
use fragments_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;

/// Notifier サーバーのエントリーポイント
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    // トレーシング初期化
    init_tracing(TracingConfig::from_env("notifier"));
    let _tracing_guard = tracing::info_span!("app", service = "notifier").entered();

    // 設定読み込み
    let config = NotifierConfig::from_env().context("設定の読み込みに失敗しました")?;

    tracing::info!(
        "Notifier サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    // データベース接続プールを作成
    let pool = db::create_pool(&config.database_url)
        .await
        .context("データベース接続に失敗しました")?;
    tracing::info!("データベースに接続しました");

    // マイグレーション実行
    db::run_migrations(&pool)
        .await
        .context("マイグレーションの実行に失敗しました")?;
    tracing::info!("マイグレーションを適用しました");

    // 依存コンポーネントを初期化
    let sender = build_sender(&config.notification)
        .await
        .context("送信クライアントの初期化に失敗しました")?;
    let directory: Arc<dyn UserDirectory> = Arc::new(PostgresUserDirectory::new(pool.clone()));
    let comments: Arc<dyn CommentRepository> = Arc::new(PostgresCommentRepository::new(pool));
    let service = build_service(&config, sender, directory, comments)
        .context("通知サービスの初期化に失敗しました")?;

    if config.notification.operator.is_none() {
        tracing::warn!(
            "NOTIFICATION_OPERATOR_ADDRESS が未設定のため、願い事とテストモードの送信は失敗します"
        );
    }

    // ルーター構築
    let state = Arc::new(NotificationState { service });
    let app = build_app(state, config.frontend_url.clone());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("アドレスのパースに失敗しました")?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Notifier サーバーが起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
