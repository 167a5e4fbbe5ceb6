use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::info;

pub mod memory;
pub mod models;
pub mod store;

pub use memory::MemoryStore;
pub use store::{ClientStore, FollowupStore, ProfileStore, Store};

/// Postgres-backed store; one pool per process, cloned into each request.
#[derive(Clone)]
pub struct DBService {
    pub pool: PgPool,
}

impl DBService {
    pub async fn new(database_url: &str) -> Result<DBService, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database connected and migrations applied");
        Ok(DBService { pool })
    }
}
