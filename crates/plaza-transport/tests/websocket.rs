//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and talk to it with
//! a `tokio-tungstenite` client (or a raw TCP socket for the liveness
//! endpoints).

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use plaza_transport::{Connection, Transport, WebSocketTransport};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<TcpStream>,
    >;

    async fn bind() -> (WebSocketTransport, String) {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().to_string();
        (transport, addr)
    }

    async fn connect_client(url: &str) -> ClientWs {
        let (ws, _) = tokio_tungstenite::connect_async(url)
            .await
            .expect("client should connect");
        ws
    }

    /// Writes a request in the given pieces, pausing between them, then reads
    /// the whole response. Header names come back lowercased.
    async fn http_exchange(addr: &str, pieces: &[&str]) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        for (i, piece) in pieces.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            stream.write_all(piece.as_bytes()).await.unwrap();
            stream.flush().await.unwrap();
        }
        let mut response = String::new();
        tokio::time::timeout(
            Duration::from_secs(2),
            stream.read_to_string(&mut response),
        )
        .await
        .expect("response should arrive")
        .unwrap();
        response.to_ascii_lowercase()
    }

    async fn http_get(addr: &str, path: &str) -> String {
        let request = format!(
            "GET {path} HTTP/1.1\r\nHost: {addr}\r\nOrigin: http://game.test\r\nConnection: close\r\n\r\n"
        );
        http_exchange(addr, &[&request]).await
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (mut transport, addr) = bind().await;

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let mut client_ws = connect_client(&format!("ws://{addr}")).await;
        let server_conn = server_handle.await.expect("task should complete");

        // Server → client: UTF-8 goes out as a text frame.
        server_conn
            .send(br#"{"event":"SC_CHAT"}"#)
            .await
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text(), "JSON should travel as text");
        assert_eq!(msg.into_data().as_ref(), br#"{"event":"SC_CHAT"}"#);

        // Client → server.
        client_ws
            .send(Message::Text("hello from client".into()))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, b"hello from client");

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_accept_assigns_distinct_ids() {
        let (mut transport, addr) = bind().await;
        let _a = connect_client(&format!("ws://{addr}")).await;
        let first = transport.accept().await.unwrap();
        let _b = connect_client(&format!("ws://{addr}")).await;
        let second = transport.accept().await.unwrap();

        assert_ne!(first.id(), second.id());
    }

    #[tokio::test]
    async fn test_websocket_send_while_recv_is_pending() {
        // A writer must not be blocked by a reader parked in recv().
        let (mut transport, addr) = bind().await;
        let server_handle =
            tokio::spawn(async move { transport.accept().await.unwrap() });
        let mut client_ws = connect_client(&format!("ws://{addr}")).await;
        let conn = std::sync::Arc::new(server_handle.await.unwrap());

        let reader = std::sync::Arc::clone(&conn);
        let pending = tokio::spawn(async move { reader.recv().await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(1), conn.send(b"still flowing"))
            .await
            .expect("send must not wait on the reader")
            .unwrap();
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"still flowing");

        client_ws.send(Message::Close(None)).await.unwrap();
        let result = pending.await.unwrap().unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (mut transport, addr) = bind().await;
        let server_handle =
            tokio::spawn(async move { transport.accept().await.unwrap() });

        let mut client_ws = connect_client(&format!("ws://{addr}")).await;
        let server_conn = server_handle.await.unwrap();

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_close_reaches_client() {
        let (mut transport, addr) = bind().await;
        let mut client_ws = connect_client(&format!("ws://{addr}")).await;
        let conn = transport.accept().await.unwrap();

        conn.close().await.unwrap();

        let next = tokio::time::timeout(Duration::from_secs(1), client_ws.next())
            .await
            .expect("client should hear the close");
        assert!(matches!(next, Some(Ok(Message::Close(_))) | None));
    }

    #[tokio::test]
    async fn test_websocket_exposes_handshake_query() {
        let (mut transport, addr) = bind().await;
        let server_handle =
            tokio::spawn(async move { transport.accept().await.unwrap() });

        let _client =
            connect_client(&format!("ws://{addr}/?client_id=a&room_id=r1"))
                .await;
        let conn = server_handle.await.unwrap();

        assert_eq!(conn.query(), Some("client_id=a&room_id=r1"));
    }

    #[tokio::test]
    async fn test_websocket_filter_refuses_with_400() {
        let mut transport =
            WebSocketTransport::bind_with_filter("127.0.0.1:0", |query| {
                match query {
                    Some(q) if q.contains("client_id=") => Ok(()),
                    _ => Err("client_id required".into()),
                }
            })
            .await
            .unwrap();
        let addr = transport.local_addr().to_string();
        let server_handle =
            tokio::spawn(async move { transport.accept().await.unwrap() });

        // Refused: the client sees an HTTP error, not a socket.
        let refused =
            tokio_tungstenite::connect_async(format!("ws://{addr}/?room_id=r1"))
                .await;
        match refused {
            Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
                assert_eq!(response.status(), 400);
            }
            other => panic!("expected HTTP 400, got {other:?}"),
        }

        // The transport keeps accepting after a refusal.
        let _ok = connect_client(&format!("ws://{addr}/?client_id=a")).await;
        let conn = server_handle.await.unwrap();
        assert_eq!(conn.query(), Some("client_id=a"));
    }

    #[tokio::test]
    async fn test_websocket_idle_socket_does_not_block_handshake() {
        let (mut transport, addr) = bind().await;
        tokio::spawn(async move {
            while transport.accept().await.is_ok() {}
        });

        // Opens TCP and never sends a byte.
        let _idle = TcpStream::connect(&addr).await.unwrap();

        let started = tokio::time::Instant::now();
        let _ws = tokio::time::timeout(
            Duration::from_secs(1),
            connect_client(&format!("ws://{addr}")),
        )
        .await
        .expect("handshake should not wait on the idle socket");
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_liveness_endpoints_answer_on_same_port() {
        let (mut transport, addr) = bind().await;
        tokio::spawn(async move {
            let _ = transport.accept().await;
        });

        let root = http_get(&addr, "/").await;
        assert!(root.starts_with("http/1.1 200 ok"));
        assert!(root.ends_with(r#"{"message":"my server is running"}"#));
        assert!(root.contains("access-control-allow-origin: http://game.test"));
        assert!(root.contains("access-control-allow-credentials: true"));

        let health = http_get(&addr, "/health").await;
        assert!(health.starts_with("http/1.1 200 ok"));
        assert!(health.ends_with(r#"{"message":"ok"}"#));
    }

    #[tokio::test]
    async fn test_liveness_unknown_path_returns_404() {
        let (_transport, addr) = bind().await;

        let response = http_get(&addr, "/nope").await;
        assert!(response.starts_with("http/1.1 404"));
        assert!(response.ends_with(r#"{"message":"not found"}"#));
    }

    #[tokio::test]
    async fn test_liveness_preflight_is_answered() {
        let (_transport, addr) = bind().await;

        let request = format!(
            "OPTIONS /health HTTP/1.1\r\nHost: {addr}\r\nOrigin: http://game.test\r\nAccess-Control-Request-Method: GET\r\nConnection: close\r\n\r\n"
        );
        let response = http_exchange(&addr, &[&request]).await;
        assert!(response.starts_with("http/1.1 200"));
        assert!(response.contains("access-control-allow-origin: http://game.test"));
        assert!(response.contains("access-control-allow-methods: get"));
    }

    #[tokio::test]
    async fn test_liveness_request_split_across_segments_is_answered() {
        let (_transport, addr) = bind().await;

        let response = http_exchange(
            &addr,
            &[
                "GET /hea",
                &format!("lth HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n"),
            ],
        )
        .await;
        assert!(response.starts_with("http/1.1 200 ok"));
        assert!(response.ends_with(r#"{"message":"ok"}"#));
    }
}
