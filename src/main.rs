mod config;
mod database;
mod error;
mod handlers;
mod ledger;
mod middleware;
mod models;
mod notifications;
mod utils;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use dotenvy::dotenv;
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use config::AppConfig;
use database::{create_database_pool, Database};
use notifications::Notifier;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
    pub notifier: Arc<Notifier>,
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env().expect("invalid configuration");

    let db = create_database_pool(&config.database_url)
        .await
        .expect("failed to connect to database");

    sqlx::migrate!()
        .run(&db)
        .await
        .expect("failed to run migrations");

    log::info!("database ready");

    let notifier = Notifier::new(config.notifications.clone());
    let port = config.port;

    let state = AppState {
        db,
        config: Arc::new(config),
        notifier: Arc::new(notifier),
    };

    let app = create_router(state);

    let addr = format!("0.0.0.0:{port}");
    log::info!("listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind listener");
    axum::serve(listener, app).await.expect("server error");
}

fn create_router(state: AppState) -> Router {
    Router::new()
        // Auth
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/me", get(handlers::auth::me))
        .route(
            "/api/auth/users",
            get(handlers::auth::list_users).post(handlers::auth::create_user),
        )
        .route(
            "/api/auth/users/:id",
            get(handlers::auth::get_user).put(handlers::auth::update_user),
        )
        // Item catalog
        .route(
            "/api/items",
            get(handlers::items::list_items).post(handlers::items::create_item),
        )
        .route(
            "/api/items/:id",
            get(handlers::items::get_item)
                .put(handlers::items::update_item)
                .delete(handlers::items::delete_item),
        )
        // Stock ledger
        .route(
            "/api/inventory/transactions",
            get(handlers::stock::list_transactions).post(handlers::stock::create_transaction),
        )
        .route("/api/inventory/stock-report", get(handlers::stock::stock_report))
        .route("/api/inventory/low-stock", get(handlers::stock::low_stock))
        .route("/api/inventory/current-stock", get(handlers::stock::current_stock))
        // Customer directory
        .route(
            "/api/customers",
            get(handlers::customers::list_customers).post(handlers::customers::create_customer),
        )
        .route("/api/customers/export", get(handlers::customers::export_customers))
        .route(
            "/api/customers/:id",
            get(handlers::customers::get_customer)
                .put(handlers::customers::update_customer)
                .delete(handlers::customers::delete_customer),
        )
        .route(
            "/api/customers/:id/history",
            get(handlers::customers::customer_history),
        )
        // Billing
        .route(
            "/api/billing",
            get(handlers::invoices::list_invoices).post(handlers::invoices::create_invoice),
        )
        .route("/api/billing/:id", get(handlers::invoices::get_invoice))
        .route(
            "/api/billing/:id/confirm-payment",
            post(handlers::invoices::confirm_payment),
        )
        // Reports
        .route("/api/reports/daily-sales", get(handlers::reports::daily_sales))
        .route("/api/reports/stock", get(handlers::reports::stock_report))
        .route(
            "/api/reports/customers/:id/history",
            get(handlers::reports::customer_history),
        )
        .route("/api/reports/item-sales", get(handlers::reports::item_sales))
        // Notifications
        .route(
            "/api/notifications/logs",
            get(handlers::notifications::list_logs),
        )
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CookieManagerLayer::new())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
