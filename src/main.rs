use tower_http::cors::CorsLayer;

use botops::config::Config;
use botops::{AppState, routes};

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    println!(
        "[startup] upstream {} | refresh {}s | twitter refresh {}s",
        config.backend_base_url,
        config.refresh_interval.as_secs(),
        config.twitter_refresh_interval.as_secs()
    );

    let port = config.port;
    let state = AppState::new(config);

    // The dashboard frontend is served from a static host elsewhere
    let app = routes::build_routes()
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {}: {}", addr, e));

    println!("Listening on http://{}", addr);
    axum::serve(listener, app).await.expect("Server failed");
}
