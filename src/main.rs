use std::net::SocketAddr;

use axum::{extract::Extension, routing::get, Router};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use formbuilder_api::database::manager::DatabaseManager;
use formbuilder_api::{config, handlers, middleware};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    let config = config::config();
    tracing_subscriber::fmt::init();
    tracing::info!("Starting formbuilder API in {:?} mode", config.environment);

    DatabaseManager::migrate()
        .await
        .unwrap_or_else(|e| panic!("failed to run migrations: {}", e));

    let pool = DatabaseManager::pool()
        .await
        .unwrap_or_else(|e| panic!("failed to connect to database: {}", e));

    let app = app(pool);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("Formbuilder API listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .expect("server");
}

fn app(pool: PgPool) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(form_routes())
        .merge(submission_routes())
        .merge(product_routes())
        .merge(sales_routes())
        .merge(dashboard_routes())
        // Global middleware
        .layer(axum::middleware::from_fn(middleware::identity_middleware))
        .layer(Extension(pool))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn form_routes() -> Router {
    use handlers::forms;

    Router::new()
        .route("/forms", get(forms::list).post(forms::create))
        .route(
            "/forms/:slug",
            get(forms::get).put(forms::update).delete(forms::delete),
        )
        .route("/forms/:slug/public", get(forms::public))
        .route("/forms/:slug/submissions", get(forms::list_for_form))
        .route("/forms/:slug/related_data", get(forms::related_data))
}

fn submission_routes() -> Router {
    use handlers::submissions;

    Router::new().route("/submissions", get(submissions::list).post(submissions::create))
}

fn product_routes() -> Router {
    use handlers::products;

    Router::new()
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/:product_id",
            get(products::get).put(products::update).delete(products::delete),
        )
        .route("/products/:product_id/sales_summary", get(products::sales_summary))
}

fn sales_routes() -> Router {
    use handlers::sales;

    Router::new()
        .route("/sales", get(sales::list).post(sales::create))
        .route("/sales/by_product", get(sales::by_product))
        .route("/sales/analytics", get(sales::analytics))
}

fn dashboard_routes() -> Router {
    use handlers::dashboards;

    Router::new()
        .route("/dashboards", get(dashboards::list).post(dashboards::create))
        .route("/dashboards/:dashboard_id/data", get(dashboards::data))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "name": "Formbuilder API",
        "version": version,
        "description": "Dynamic form schemas, submissions, products, sales and dashboards",
        "endpoints": {
            "forms": "/forms, /forms/:slug, /forms/:slug/public, /forms/:slug/submissions, /forms/:slug/related_data",
            "submissions": "/submissions",
            "products": "/products, /products/:product_id, /products/:product_id/sales_summary",
            "sales": "/sales, /sales/by_product, /sales/analytics",
            "dashboards": "/dashboards, /dashboards/:dashboard_id/data",
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "status": "degraded",
                "timestamp": now,
                "database_error": e.to_string()
            })),
        ),
    }
}
