mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{Event, EventLog, FakeGateway, RecordingProcessor, address_of, receipt_for};
use rs_sqs_dispatch::api::{AppState, create_app};
use rs_sqs_dispatch::errors::GatewayError;
use rs_sqs_dispatch::gateway::ReceiveOptions;
use rs_sqs_dispatch::receiver::{Dispatcher, PollConfig, PollRegistry, WorkerConfig};
use serde_json::Value;
use tower::ServiceExt;

struct TestApp {
    app: Router,
    gateway: Arc<FakeGateway>,
    polls: Arc<PollRegistry>,
    log: EventLog,
}

fn test_app() -> TestApp {
    let log = EventLog::default();
    let gateway = Arc::new(FakeGateway::new(log.clone()).with_queue("orders"));
    let dispatcher = Dispatcher::new(
        gateway.clone(),
        Arc::new(RecordingProcessor::new(log.clone())),
        &WorkerConfig::default(),
    );
    let polls = Arc::new(PollRegistry::new(dispatcher.clone(), PollConfig::default()));

    let app = create_app(AppState {
        dispatcher,
        polls: polls.clone(),
        receive_options: ReceiveOptions::default(),
        send_delay: Duration::from_secs(10),
    });

    TestApp {
        app,
        gateway,
        polls,
        log,
    }
}

fn request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn missing_queue_name_is_a_bad_request() {
    let test = test_app();

    for (method, uri) in [("GET", "/message"), ("POST", "/message"), ("GET", "/message?queueName=")] {
        let response = test
            .app
            .clone()
            .oneshot(request(method, uri, r#"{"message":"hi"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{method} {uri}");
        assert_eq!(body_text(response).await, "Url Param 'queueName' is missing");
    }
}

#[tokio::test]
async fn send_returns_created_with_the_send_receipt() {
    let test = test_app();

    let response = test
        .app
        .oneshot(request("POST", "/message?queueName=orders", r#"{"message":"hello"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["MessageId"], "sent-1");
    assert_eq!(test.log.events(), vec![Event::Send("hello".into())]);
}

#[tokio::test]
async fn send_rejects_malformed_body() {
    let test = test_app();

    let response = test
        .app
        .oneshot(request("POST", "/message?queueName=orders", "not json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(test.log.events().is_empty());
}

#[tokio::test]
async fn send_surfaces_gateway_errors_as_500() {
    let test = test_app();
    test.gateway
        .fail_sends_with(GatewayError::transport("SendMessage", "access denied"));

    let response = test
        .app
        .oneshot(request("POST", "/message?queueName=orders", r#"{"message":"hello"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "SendMessage failed: access denied");
}

#[tokio::test]
async fn unknown_queue_is_not_found() {
    let test = test_app();

    let response = test
        .app
        .oneshot(request("GET", "/message?queueName=missing", ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "queue not found: missing");
}

#[tokio::test(start_paused = true)]
async fn receive_returns_the_batch_before_processing_finishes() {
    let test = test_app();
    test.gateway.push_batch(&[("1", "a"), ("2", "b")]);

    let response = test
        .app
        .oneshot(request("GET", "/message?queueName=orders", ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    let messages = json["Messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["MessageId"], "1");
    assert_eq!(messages[0]["ReceiptHandle"], receipt_for("1"));
    assert_eq!(messages[1]["Body"], "b");

    assert!(test.log.deleted().is_empty());

    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(test.log.deleted(), vec![receipt_for("1"), receipt_for("2")]);
}

#[tokio::test]
async fn receive_surfaces_gateway_errors_as_500() {
    let test = test_app();
    test.gateway
        .push_error(GatewayError::transport("ReceiveMessage", "connection reset"));

    let response = test
        .app
        .oneshot(request("GET", "/message?queueName=orders", ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "ReceiveMessage failed: connection reset");
}

#[tokio::test(start_paused = true)]
async fn poll_can_be_started_and_stopped_over_http() {
    let test = test_app();

    let response = test
        .app
        .clone()
        .oneshot(request("POST", "/startPoll?queueName=orders", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(test.polls.is_polling(&address_of("orders")));

    let response = test
        .app
        .clone()
        .oneshot(request("GET", "/health", ""))
        .await
        .unwrap();
    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["polling"][0], address_of("orders").as_str());

    let response = test
        .app
        .oneshot(request("POST", "/stopPoll", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(test.polls.active().is_empty());
}
