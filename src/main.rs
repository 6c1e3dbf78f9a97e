use {
    paycore::{
        AppState,
        adapters::{
            internal::{CodGateway, WalletGateway},
            razorpay::RazorpayGateway,
            routes,
            stripe::StripeGateway,
        },
        config::Config,
        domain::gateway::GatewayRegistry,
        services::{cache::PendingCountCache, notify::Notifier},
    },
    axum::extract::DefaultBodyLimit,
    sqlx::postgres::PgPoolOptions,
    std::{sync::Arc, time::Duration},
    tokio::signal,
    tower_http::timeout::TimeoutLayer,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("incomplete configuration");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    // One outbound client for every gateway; never wait on a provider
    // longer than our own request timeout.
    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .expect("failed to build http client");

    let gateways = GatewayRegistry::new(
        Arc::new(RazorpayGateway::new(
            http.clone(),
            config.razorpay_key_id.clone(),
            config.razorpay_key_secret.clone(),
            config.razorpay_webhook_secret.clone(),
        )),
        Arc::new(StripeGateway::new(
            http.clone(),
            config.stripe_secret_key.clone(),
            config.stripe_webhook_secret.clone(),
        )),
        Arc::new(WalletGateway::new(pool.clone())),
        Arc::new(CodGateway),
    );

    let state = AppState {
        pool,
        gateways,
        notifier: Arc::new(Notifier::new(
            http,
            config.notification_sink_url.clone(),
        )),
        pending_cache: Arc::new(PendingCountCache::new(config.pending_count_ttl)),
    };

    let app = routes::router(state)
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(DefaultBodyLimit::max(256 * 1024)); // gateway events stay well under this

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind");
    tracing::info!("listening on {}", config.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
