//! End-to-end lifecycle tests over real sockets: request dispatch through
//! a bound listener, graceful shutdown with in-flight requests, and the
//! shutdown deadline.

use std::net::SocketAddr;
use std::time::Duration;

use portico_core::{response, Exchange, Request};
use portico_middleware::stages::RequestId;
use portico_server::{LifecycleState, ServerBuilder, ServerError, ShutdownSignal};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// Sends one raw HTTP/1.1 request and reads the response until the server
/// closes the connection.
async fn send_request(addr: SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    stream.write_all(raw.as_bytes()).await.expect("write");

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.expect("read");
    String::from_utf8_lossy(&buf).into_owned()
}

fn get(path: &str) -> String {
    format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
}

fn post_json(path: &str, body: &str) -> String {
    format!(
        "POST {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

#[tokio::test]
async fn serves_json_round_trip_over_the_wire() {
    let mut server = ServerBuilder::new()
        .addr("127.0.0.1:0")
        .app_name("e2e")
        .build_contextual();

    server
        .post("/echo", |cx: Exchange| async move {
            match cx.read_json::<serde_json::Value>() {
                Ok(value) => cx.json(&value),
                Err(err) => cx.json_with_status(
                    http::StatusCode::BAD_REQUEST,
                    &serde_json::json!({"error": err.to_string()}),
                ),
            }
        })
        .unwrap();

    let bound = server.bind().await.unwrap();
    let addr = bound.local_addr();

    let shutdown = ShutdownSignal::new();
    let serve = tokio::spawn(bound.serve(shutdown.clone()));

    let payload = r#"{"name":"alpha","nested":{"values":[1,2,3],"flag":true},"note":null}"#;
    let reply = send_request(addr, &post_json("/echo", payload)).await;
    assert!(reply.starts_with("HTTP/1.1 200"));
    let body = reply.split("\r\n\r\n").nth(1).expect("body");
    let echoed: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(echoed, serde_json::from_str::<serde_json::Value>(payload).unwrap());

    let bad = send_request(addr, &post_json("/echo", "not json")).await;
    assert!(bad.starts_with("HTTP/1.1 400"));

    let missing = send_request(addr, &get("/nowhere")).await;
    assert!(missing.starts_with("HTTP/1.1 404"));

    shutdown.trigger();
    serve.await.unwrap().unwrap();
}

#[tokio::test]
async fn middleware_and_prefix_apply_over_the_wire() {
    let mut server = ServerBuilder::new().addr("127.0.0.1:0").build_direct();
    server.add_middleware(RequestId::new());
    server
        .get("/ping", |_request: Request| async move {
            response::json(http::StatusCode::OK, &serde_json::json!({"pong": true}))
        })
        .unwrap();
    server.mount_prefix("/api/v1").unwrap();

    let bound = server.bind().await.unwrap();
    let addr = bound.local_addr();

    let shutdown = ShutdownSignal::new();
    let serve = tokio::spawn(bound.serve(shutdown.clone()));

    let prefixed = send_request(addr, &get("/api/v1/ping")).await;
    assert!(prefixed.starts_with("HTTP/1.1 200"));
    assert!(prefixed.to_lowercase().contains("x-request-id:"));

    let unprefixed = send_request(addr, &get("/ping")).await;
    assert!(unprefixed.starts_with("HTTP/1.1 404"));

    shutdown.trigger();
    serve.await.unwrap().unwrap();
}

#[tokio::test]
async fn inflight_request_completes_within_the_deadline() {
    let (started_tx, mut started_rx) = mpsc::unbounded_channel::<()>();

    let mut server = ServerBuilder::new()
        .addr("127.0.0.1:0")
        .shutdown_timeout(Duration::from_secs(5))
        .build_direct();
    server
        .get("/slow", move |_request: Request| {
            let started = started_tx.clone();
            async move {
                let _ = started.send(());
                tokio::time::sleep(Duration::from_millis(200)).await;
                response::json(http::StatusCode::OK, &serde_json::json!({"done": true}))
            }
        })
        .unwrap();
    let states = server.lifecycle();

    let bound = server.bind().await.unwrap();
    let addr = bound.local_addr();
    assert_eq!(*states.borrow(), LifecycleState::Running);

    let shutdown = ShutdownSignal::new();
    let serve = tokio::spawn(bound.serve(shutdown.clone()));

    let client = tokio::spawn(async move { send_request(addr, &get("/slow")).await });

    // Interrupt while the request is in flight.
    started_rx.recv().await.expect("handler should start");
    shutdown.trigger();

    // The in-flight response is still delivered.
    let reply = client.await.unwrap();
    assert!(reply.starts_with("HTTP/1.1 200"));
    assert!(reply.contains("done"));

    // And shutdown reports a clean drain.
    serve.await.unwrap().unwrap();
    assert_eq!(*states.borrow(), LifecycleState::Stopped);
}

#[tokio::test]
async fn overlong_request_trips_the_shutdown_deadline() {
    let (started_tx, mut started_rx) = mpsc::unbounded_channel::<()>();

    let mut server = ServerBuilder::new()
        .addr("127.0.0.1:0")
        .shutdown_timeout(Duration::from_millis(100))
        .build_direct();
    server
        .get("/stuck", move |_request: Request| {
            let started = started_tx.clone();
            async move {
                let _ = started.send(());
                tokio::time::sleep(Duration::from_secs(30)).await;
                response::json(http::StatusCode::OK, &serde_json::json!({"done": true}))
            }
        })
        .unwrap();
    let states = server.lifecycle();

    let bound = server.bind().await.unwrap();
    let addr = bound.local_addr();

    let shutdown = ShutdownSignal::new();
    let serve = tokio::spawn(bound.serve(shutdown.clone()));

    let _client = tokio::spawn(async move {
        let mut stream = TcpStream::connect(addr).await.expect("connect");
        stream
            .write_all(get("/stuck").as_bytes())
            .await
            .expect("write");
        // Hold the connection open; the server is what gives up.
        tokio::time::sleep(Duration::from_secs(60)).await;
    });

    started_rx.recv().await.expect("handler should start");
    shutdown.trigger();

    let err = serve.await.unwrap().unwrap_err();
    assert!(matches!(err, ServerError::ShutdownTimeout { active, .. } if active >= 1));
    // Shutdown is attempted exactly once; the state still reaches Stopped.
    assert_eq!(*states.borrow(), LifecycleState::Stopped);
}
