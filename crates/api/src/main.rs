use std::sync::Arc;

use oficina_store::InMemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    oficina_observability::init();

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| {
        tracing::info!("BIND_ADDR not set; using 0.0.0.0:8080");
        "0.0.0.0:8080".to_string()
    });

    let app = build_service().await?;

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(feature = "postgres")]
async fn build_service() -> anyhow::Result<axum::Router> {
    match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(&url)
                .await?;
            oficina_store::postgres::ensure_schema(&pool).await?;
            tracing::info!("using postgres store");
            Ok(oficina_api::app::build_app(Arc::new(
                oficina_store::PostgresStore::new(pool),
            )))
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; falling back to in-memory store");
            Ok(oficina_api::app::build_app(Arc::new(InMemoryStore::new())))
        }
    }
}

#[cfg(not(feature = "postgres"))]
async fn build_service() -> anyhow::Result<axum::Router> {
    tracing::info!("using in-memory store");
    Ok(oficina_api::app::build_app(Arc::new(InMemoryStore::new())))
}
