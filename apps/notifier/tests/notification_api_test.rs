//! 通知 API 統合テスト
//!
//! モックを注入した Router に対してリクエストを送り、
//! ステータスコードとレスポンスの形を検証する。
//!
//! ## テストケース
//!
//! - 願い事・ウェルカム・一斉配信・返信の正常系
//! - 不正な JSON や必須項目の欠落は送信前に 400
//! - 宛先が解決できなければ 422、ディレクトリ障害は 500
//! - 一部失敗は 200 + `success: false`、明細は `verbose=true` のときだけ
//! - レスポンスに X-Request-Id が付与される

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use fragments_domain::recipient::Recipient;
use fragments_infra::mock::{MockCommentRepository, MockNotificationSender, MockUserDirectory};
use fragments_notifier::{
    app_builder::build_app,
    handler::NotificationState,
    usecase::notification::{
        DispatchPolicy,
        Dispatcher,
        MessageBuilder,
        NotificationService,
        RecipientResolver,
        TemplateRenderer,
    },
};
use pretty_assertions::assert_eq;
use serde_json::{Value as JsonValue, json};
use tower::ServiceExt;

// --- テストヘルパー ---

const OPERATOR: &str = "ops@example.com";

struct TestApp {
    router:    Router,
    sender:    MockNotificationSender,
    directory: MockUserDirectory,
    comments:  MockCommentRepository,
}

/// テスト用 Notifier アプリケーションを構築する
fn create_test_app() -> TestApp {
    let sender = MockNotificationSender::new();
    let directory = MockUserDirectory::new();
    let comments = MockCommentRepository::new();

    let service = NotificationService::new(
        RecipientResolver::new(Arc::new(directory.clone())),
        MessageBuilder::new(
            TemplateRenderer::new().unwrap(),
            "Fragments of Me <noreply@fragments.example.com>".to_string(),
            "http://localhost:5173".to_string(),
        ),
        Dispatcher::new(Arc::new(sender.clone()), DispatchPolicy::default()),
        Arc::new(comments.clone()),
        Some(Recipient::new(OPERATOR).unwrap()),
    );
    let router = build_app(Arc::new(NotificationState { service }), None);

    TestApp {
        router,
        sender,
        directory,
        comments,
    }
}

fn post_json(uri: &str, body: JsonValue) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// レスポンスボディを JSON として解析する
async fn parse_body(response: axum::http::Response<Body>) -> JsonValue {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

// --- ヘルスチェック ---

#[tokio::test]
async fn test_ヘルスチェックは200を返す() {
    let app = create_test_app();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_レスポンスにリクエストidが付与される() {
    let app = create_test_app();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-12345")
        .body(Body::empty())
        .unwrap();

    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.headers()["x-request-id"], "req-12345");
}

// --- 願い事 ---

#[tokio::test]
async fn test_願い事を運用者に送信して結果を返す() {
    let app = create_test_app();
    let request = post_json(
        "/send-email",
        json!({
            "name": "Hana",
            "wish": "健康第一",
            "deviceInfo": {"userAgent": "Mozilla/5.0", "platform": "MacIntel"}
        }),
    );

    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert_eq!(
        body["data"],
        json!({
            "kind": "wish",
            "success": true,
            "total": 1,
            "delivered": 1,
            "failed": 0,
        })
    );
    assert_eq!(app.sender.sent_addresses(), vec![OPERATOR]);
}

#[tokio::test]
async fn test_名前が欠けた願い事は送信せずに400を返す() {
    let app = create_test_app();
    let request = post_json("/send-email", json!({"wish": "健康第一"}));

    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.sender.call_count(), 0);
}

#[tokio::test]
async fn test_jsonとして読めないボディは400を返す() {
    let app = create_test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/send-email")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_body(response).await;
    assert_eq!(body["status"], 400);
    assert_eq!(app.sender.call_count(), 0);
}

// --- ウェルカム ---

#[tokio::test]
async fn test_不正なアドレスへのウェルカムメールは422を返す() {
    let app = create_test_app();
    let request = post_json(
        "/send-welcome",
        json!({"name": "Ren", "email": "not-an-address"}),
    );

    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.sender.call_count(), 0);
}

// --- 一斉配信 ---

#[tokio::test]
async fn test_一部の送信に失敗しても200で件数を返す() {
    let app = create_test_app();
    for address in ["a@example.com", "b@example.com", "c@example.com"] {
        app.directory.add_user(Some(address));
    }
    app.sender.fail_for("b@example.com", "550 mailbox unavailable");
    let request = post_json(
        "/send-broadcast",
        json!({"subject": "お知らせ", "message": "新しい章を公開しました"}),
    );

    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert_eq!(body["data"]["success"], false);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["delivered"], 2);
    assert_eq!(body["data"]["failed"], 1);
    assert!(body["data"].get("failures").is_none());
}

#[tokio::test]
async fn test_verboseを指定すると失敗の明細を含む() {
    let app = create_test_app();
    for address in ["a@example.com", "b@example.com"] {
        app.directory.add_user(Some(address));
    }
    app.sender.fail_for("b@example.com", "550 mailbox unavailable");
    let request = post_json(
        "/send-newsletter?verbose=true",
        json!({
            "subject": "1月号",
            "headline": "新しい章",
            "content": "今月の更新です",
            "link": "https://fragments.example.com/entry/1"
        }),
    );

    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert_eq!(
        body["data"]["failures"],
        json!([{"recipient": "b@example.com", "reason": "550 mailbox unavailable"}])
    );
}

#[tokio::test]
async fn test_テストモードの一斉配信は運用者だけに送信する() {
    let app = create_test_app();
    app.directory.add_user(Some("a@example.com"));
    let request = post_json(
        "/send-broadcast",
        json!({"subject": "お知らせ", "message": "テスト配信", "testMode": true}),
    );

    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.sender.sent_addresses(), vec![OPERATOR]);
}

#[tokio::test]
async fn test_ユーザーがいなければ一斉配信は422を返す() {
    let app = create_test_app();
    let request = post_json(
        "/send-broadcast",
        json!({"subject": "お知らせ", "message": "新しい章を公開しました"}),
    );

    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_ディレクトリ障害は500を返す() {
    let app = create_test_app();
    app.directory.set_unavailable();
    let request = post_json(
        "/send-broadcast",
        json!({"subject": "お知らせ", "message": "新しい章を公開しました"}),
    );

    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = parse_body(response).await;
    assert_eq!(body["status"], 500);
    assert_eq!(app.sender.call_count(), 0);
}

// --- コメント返信 ---

fn reply_request() -> Request<Body> {
    post_json(
        "/reply-to-comment",
        json!({
            "entryId": "entry-1",
            "commentId": "comment-1",
            "replyContent": "同感です",
            "authorId": "replier-1",
            "replierName": "Mio"
        }),
    )
}

#[tokio::test]
async fn test_返信を記録して投稿者に通知する() {
    let app = create_test_app();
    app.comments
        .add_comment("entry-1", "comment-1", Some("author@example.com"));

    let response = app.router.oneshot(reply_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert!(body["data"]["replyId"].is_string());
    assert!(body["data"]["createdAt"].is_string());
    assert_eq!(body["data"]["notification"]["kind"], "reply");
    assert_eq!(body["data"]["notification"]["success"], true);
    assert_eq!(app.comments.replies().len(), 1);
    assert_eq!(app.sender.sent_addresses(), vec!["author@example.com"]);
}

#[tokio::test]
async fn test_投稿者が見つからない返信は記録せずに400を返す() {
    let app = create_test_app();

    let response = app.router.oneshot(reply_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.comments.replies().is_empty());
    assert_eq!(app.sender.call_count(), 0);
}

#[tokio::test]
async fn test_返信の記録に失敗したら通知せずに500を返す() {
    let app = create_test_app();
    app.comments
        .add_comment("entry-1", "comment-1", Some("author@example.com"));
    app.comments.set_insert_failure();

    let response = app.router.oneshot(reply_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.sender.call_count(), 0);
}
