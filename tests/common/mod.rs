#![allow(dead_code)]

use {
    chrono::Utc,
    hmac::{Hmac, Mac},
    paycore::{
        adapters::{
            internal::{CodGateway, WalletGateway},
            razorpay::RazorpayGateway,
            stripe::StripeGateway,
        },
        domain::{
            gateway::GatewayRegistry,
            money::MoneyAmount,
            order::{OrderStatus, PaymentMethod, PaymentStatus},
        },
    },
    sha2::Sha256,
    sqlx::PgPool,
    std::sync::{
        Arc, Once,
        atomic::{AtomicUsize, Ordering},
    },
    uuid::Uuid,
};

pub const RZP_WEBHOOK_SECRET: &str = "whsec_rzp_test";
pub const STRIPE_WEBHOOK_SECRET: &str = "whsec_stripe_test";

static INIT_ONCE: Once = Once::new();

/// Registry with real signature verification but test credentials. Card
/// rails would need a live endpoint for refunds; tests that move money use
/// the wallet and COD rails.
pub fn test_gateways(pool: &PgPool) -> GatewayRegistry {
    let http = reqwest::Client::new();
    GatewayRegistry::new(
        Arc::new(RazorpayGateway::new(
            http.clone(),
            "rzp_test_key",
            "rzp_test_secret",
            RZP_WEBHOOK_SECRET,
        )),
        Arc::new(StripeGateway::new(
            http,
            "sk_test_123",
            STRIPE_WEBHOOK_SECRET,
        )),
        Arc::new(WalletGateway::new(pool.clone())),
        Arc::new(CodGateway),
    )
}

/// Local HTTP sink standing in for the messaging service: counts every
/// notification posted to it.
pub async fn spawn_sink() -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = axum::Router::new().route(
        "/notify",
        axum::routing::post(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                "ok"
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind sink listener");
    let addr = listener.local_addr().expect("sink has no local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("sink server died");
    });
    (format!("http://{addr}/notify"), hits)
}

pub fn rzp_sign(body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(RZP_WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Builds a `Stripe-Signature` header the SDK's verifier accepts:
/// `t=<ts>,v1=hmac_sha256(secret, "<ts>.<body>")`.
pub fn stripe_sign(body: &[u8]) -> String {
    let ts = Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(STRIPE_WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(ts.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    let v1 = hex::encode(mac.finalize().into_bytes());
    format!("t={ts},v1={v1}")
}

/// Creates a dedicated database for this test binary next to the one in
/// DATABASE_URL, runs migrations, and truncates. Each binary gets full
/// isolation. Returns None (tests skip) when DATABASE_URL is not set.
///
/// `db_name` should be unique per test file.
pub async fn try_pool(db_name: &str) -> Option<PgPool> {
    let admin_url = std::env::var("DATABASE_URL").ok()?;
    let db_url = sibling_db_url(&admin_url, db_name);

    // Create DB + migrate + truncate once per binary.
    // Runs on a separate thread to avoid nested-runtime panic.
    let db_name_owned = db_name.to_string();
    let db_url_owned = db_url.clone();
    INIT_ONCE.call_once(move || {
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("failed to build init runtime");
            rt.block_on(async {
                let admin = PgPool::connect(&admin_url)
                    .await
                    .expect("failed to connect to admin db");
                // CREATE DATABASE is not idempotent, so check first.
                let exists: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)",
                )
                .bind(&db_name_owned)
                .fetch_one(&admin)
                .await
                .expect("failed to check db existence");
                if !exists {
                    sqlx::query(&format!("CREATE DATABASE {db_name_owned}"))
                        .execute(&admin)
                        .await
                        .expect("failed to create test db");
                }
                admin.close().await;

                let pool = PgPool::connect(&db_url_owned)
                    .await
                    .expect("failed to connect to test db");
                sqlx::migrate!("./migrations")
                    .run(&pool)
                    .await
                    .expect("failed to run migrations");
                sqlx::query(
                    "TRUNCATE orders, order_items, order_timeline, webhook_log, refunds, \
                     products, product_variants, wallets, cashback_requests \
                     RESTART IDENTITY CASCADE",
                )
                .execute(&pool)
                .await
                .expect("truncate failed");
                pool.close().await;
            });
        })
        .join()
        .expect("init thread panicked");
    });

    let pool = PgPool::connect(&db_url)
        .await
        .expect("failed to connect to test db");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    Some(pool)
}

/// Swap the database name in a postgres URL, keeping credentials and host.
fn sibling_db_url(url: &str, db_name: &str) -> String {
    let (without_query, _) = url.split_once('?').unwrap_or((url, ""));
    match without_query.rfind('/') {
        Some(idx) if idx > "postgresql://".len() => {
            format!("{}/{db_name}", &without_query[..idx])
        }
        _ => format!("{without_query}/{db_name}"),
    }
}

// ── Seed helpers ───────────────────────────────────────────────────────────

pub struct OrderSeed {
    pub method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub total: i64,
    pub paid_amount: i64,
    pub refund_amount: i64,
    pub transaction_id: Option<String>,
}

impl Default for OrderSeed {
    fn default() -> Self {
        Self {
            method: PaymentMethod::Cod,
            payment_status: PaymentStatus::Paid,
            status: OrderStatus::Delivered,
            total: 1000,
            paid_amount: 1000,
            refund_amount: 0,
            transaction_id: None,
        }
    }
}

pub async fn seed_order(pool: &PgPool, seed: OrderSeed) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query(
        r#"
        INSERT INTO orders
            (id, order_number, user_id, status, payment_method, payment_status,
             transaction_id, paid_at, total, paid_amount, refund_amount, currency)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'inr')
        "#,
    )
    .bind(id)
    .bind(format!("ORD-{}", &id.simple().to_string()[..12]))
    .bind(Uuid::now_v7())
    .bind(seed.status.as_str())
    .bind(seed.method.as_str())
    .bind(seed.payment_status.as_str())
    .bind(&seed.transaction_id)
    .bind((seed.paid_amount > 0).then(Utc::now))
    .bind(seed.total)
    .bind(seed.paid_amount)
    .bind(seed.refund_amount)
    .execute(pool)
    .await
    .expect("failed to seed order");
    id
}

pub async fn seed_item(
    pool: &PgPool,
    order_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    unit_price: i64,
    variant: Option<(&str, &str)>,
) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO order_items (id, order_id, product_id, quantity, unit_price, \
         variant_type, variant_value) VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(id)
    .bind(order_id)
    .bind(product_id)
    .bind(quantity)
    .bind(unit_price)
    .bind(variant.map(|(t, _)| t.to_string()))
    .bind(variant.map(|(_, v)| v.to_string()))
    .execute(pool)
    .await
    .expect("failed to seed order item");
    id
}

pub async fn seed_product(pool: &PgPool, stock: i32, available: bool) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO products (id, stock, is_available) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(stock)
        .bind(available)
        .execute(pool)
        .await
        .expect("failed to seed product");
    id
}

pub async fn seed_variant(
    pool: &PgPool,
    product_id: Uuid,
    kind: &str,
    value: &str,
    stock: i32,
) {
    sqlx::query(
        "INSERT INTO product_variants (product_id, variant_type, variant_value, stock) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(product_id)
    .bind(kind)
    .bind(value)
    .bind(stock)
    .execute(pool)
    .await
    .expect("failed to seed variant");
}

pub async fn seed_cashback(
    pool: &PgPool,
    merchant_id: Uuid,
    requested: i64,
    status: &str,
) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO cashback_requests (id, request_number, merchant_id, customer_id, \
         requested_amount, status) VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(id)
    .bind(format!("CB-{}", &id.simple().to_string()[..12]))
    .bind(merchant_id)
    .bind(Uuid::now_v7())
    .bind(requested)
    .bind(status)
    .execute(pool)
    .await
    .expect("failed to seed cashback request");
    id
}

// ── Query helpers ──────────────────────────────────────────────────────────

pub struct OrderRow {
    pub status: String,
    pub payment_status: String,
    pub transaction_id: Option<String>,
    pub paid_amount: i64,
    pub refund_amount: i64,
    pub refund_id: Option<String>,
}

pub async fn order_row(pool: &PgPool, id: Uuid) -> OrderRow {
    let (status, payment_status, transaction_id, paid_amount, refund_amount, refund_id) =
        sqlx::query_as::<_, (String, String, Option<String>, i64, i64, Option<String>)>(
            "SELECT status, payment_status, transaction_id, paid_amount, refund_amount, \
             refund_id FROM orders WHERE id = $1",
        )
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("order not found");
    OrderRow {
        status,
        payment_status,
        transaction_id,
        paid_amount,
        refund_amount,
        refund_id,
    }
}

pub async fn webhook_log_row(
    pool: &PgPool,
    provider: &str,
    event_id: &str,
) -> Option<(String, bool, i32)> {
    sqlx::query_as::<_, (String, bool, i32)>(
        "SELECT status, signature_valid, retry_count FROM webhook_log \
         WHERE provider = $1 AND event_id = $2",
    )
    .bind(provider)
    .bind(event_id)
    .fetch_optional(pool)
    .await
    .expect("webhook_log query failed")
}

pub async fn webhook_log_count(pool: &PgPool, provider: &str, event_id: &str) -> i64 {
    sqlx::query_scalar("SELECT count(*) FROM webhook_log WHERE provider = $1 AND event_id = $2")
        .bind(provider)
        .bind(event_id)
        .fetch_one(pool)
        .await
        .expect("webhook_log count failed")
}

pub async fn refund_count(pool: &PgPool, order_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT count(*) FROM refunds WHERE order_id = $1")
        .bind(order_id)
        .fetch_one(pool)
        .await
        .expect("refund count failed")
}

pub async fn timeline_statuses(pool: &PgPool, order_id: Uuid) -> Vec<String> {
    sqlx::query_scalar(
        "SELECT status FROM order_timeline WHERE order_id = $1 ORDER BY created_at, id",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await
    .expect("timeline query failed")
}

pub async fn wallet_balance(pool: &PgPool, user_id: Uuid) -> Option<i64> {
    sqlx::query_scalar("SELECT balance FROM wallets WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .expect("wallet query failed")
}

pub async fn product_stock(pool: &PgPool, product_id: Uuid) -> i32 {
    sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_one(pool)
        .await
        .expect("product query failed")
}

pub async fn variant_stock(pool: &PgPool, product_id: Uuid, kind: &str, value: &str) -> i32 {
    sqlx::query_scalar(
        "SELECT stock FROM product_variants WHERE product_id = $1 AND variant_type = $2 \
         AND variant_value = $3",
    )
    .bind(product_id)
    .bind(kind)
    .bind(value)
    .fetch_one(pool)
    .await
    .expect("variant query failed")
}

pub fn money(minor: i64) -> MoneyAmount {
    MoneyAmount::new(minor).expect("invalid test amount")
}

/// Skip the test politely when no database is available.
#[macro_export]
macro_rules! require_pool {
    ($db_name:literal) => {
        match common::try_pool($db_name).await {
            Some(pool) => pool,
            None => {
                eprintln!("skipping: DATABASE_URL not set");
                return;
            }
        }
    };
}
