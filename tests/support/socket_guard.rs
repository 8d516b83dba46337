//! Mock servers for tests that need a localhost socket.

use std::net::TcpListener;

use wiremock::MockServer;

/// Starts a mock server, or returns `None` when localhost cannot be bound.
///
/// Set `COMIC_DL_REQUIRE_SOCKET_TESTS=1` to fail instead of skipping (CI).
pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    if TcpListener::bind("127.0.0.1:0").is_ok() {
        return Some(MockServer::start().await);
    }

    let required = std::env::var("COMIC_DL_REQUIRE_SOCKET_TESTS")
        .is_ok_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"));
    assert!(!required, "cannot bind a localhost socket for the mock server");
    eprintln!("cannot bind a localhost socket; skipping mock-server test");
    None
}
