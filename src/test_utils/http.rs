use axum::Router;
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral local port and return the API base URL.
///
/// Routes in `router` should be mounted under `/api/`.
pub(crate) async fn spawn_api_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Could not bind test server");
    let address = listener.local_addr().expect("Could not get local address");

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Test server failed");
    });

    format!("http://{address}/api/")
}

/// A base URL on a local port that nothing is listening on.
pub(crate) async fn unused_local_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Could not bind test port");
    let address = listener.local_addr().expect("Could not get local address");
    drop(listener);

    format!("http://{address}/api/")
}
