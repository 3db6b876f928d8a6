//! Integration tests for the WebSocket transport.
//!
//! These tests spin up a real WebSocket server and client to verify
//! that text and binary frames keep their kind across the wire.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use intercom_transport::{Connection, Frame, Transport, WebSocketTransport};
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on an OS-assigned port, connects one client, and returns
    /// both ends.
    async fn connected_pair() -> (intercom_transport::WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("should have local addr");

        let server_handle =
            tokio::spawn(async move { transport.accept().await.expect("should accept") });

        let (client_ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        let server_conn = server_handle.await.expect("task should complete");
        (server_conn, client_ws)
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (server_conn, mut client_ws) = connected_pair().await;
        assert!(server_conn.id().into_inner() > 0);

        // --- Server sends text, client receives text ---
        server_conn
            .send(Frame::Text("hello from server".into()))
            .await
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(msg.into_data().as_ref(), b"hello from server");

        // --- Client sends binary, server receives binary ---
        client_ws
            .send(Message::Binary(vec![1, 2, 3].into()))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, Frame::Binary(vec![1, 2, 3]));

        // --- Client sends text, server receives text ---
        client_ws
            .send(Message::Text("ping".to_owned().into()))
            .await
            .unwrap();
        let received = server_conn.recv().await.unwrap().unwrap();
        assert_eq!(received, Frame::Text("ping".into()));

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_binary_frame_reaches_client_as_binary() {
        let (server_conn, mut client_ws) = connected_pair().await;

        server_conn
            .send(Frame::Binary(vec![0xde, 0xad]))
            .await
            .unwrap();
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_binary());
        assert_eq!(msg.into_data().as_ref(), &[0xde, 0xad]);
    }

    #[tokio::test]
    async fn test_websocket_send_while_recv_pending() {
        // The reader and writer halves are locked independently, so a
        // pending recv must not stall an outbound send.
        let (server_conn, mut client_ws) = connected_pair().await;
        let server_conn = std::sync::Arc::new(server_conn);

        let reader = {
            let conn = std::sync::Arc::clone(&server_conn);
            tokio::spawn(async move { conn.recv().await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        tokio::time::timeout(
            std::time::Duration::from_secs(1),
            server_conn.send(Frame::Text("while reading".into())),
        )
        .await
        .expect("send must not block on the reader")
        .unwrap();

        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"while reading");

        client_ws.send(Message::Close(None)).await.unwrap();
        let result = reader.await.unwrap().expect("recv should not error");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (server_conn, mut client_ws) = connected_pair().await;

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_idle_socket_does_not_block_accept() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("should have local addr");

        // Connects at the TCP level and never sends the HTTP upgrade.
        let _idle = tokio::net::TcpStream::connect(addr)
            .await
            .expect("raw TCP connect should succeed");

        let client = tokio::spawn(async move {
            tokio_tungstenite::connect_async(format!("ws://{addr}")).await
        });

        let server_conn = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            transport.accept(),
        )
        .await
        .expect("accept must not wait on the idle socket")
        .expect("should accept");
        let (mut client_ws, _) = client
            .await
            .expect("task should complete")
            .expect("client should connect");

        server_conn
            .send(Frame::Text("welcome".into()))
            .await
            .unwrap();
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"welcome");
    }
}
