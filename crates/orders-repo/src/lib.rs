#[cfg(not(any(feature = "memory", feature = "sqlite")))]
compile_error!("Enable a repo feature: `memory` or `sqlite`.");

use orders_types::domain::order::{NewOrder, Order, OrderSummary};
use orders_types::domain::pagination::PageRequest;
use orders_types::domain::status::OrderStatus;
use orders_types::ports::order_repository::{OrderRepository, RepoError};
use uuid::Uuid;

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(all(feature = "sqlite", not(feature = "memory")))]
const DEFAULT_SQLITE_URL: &str = "sqlite://orders.db";

/// The adapter selected at startup.
pub enum Repo {
    #[cfg(feature = "memory")]
    Memory(memory::InMemoryRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteRepo),
}

pub async fn build_repo(url: Option<&str>) -> anyhow::Result<Repo> {
    Repo::build_repo(url).await
}

impl Repo {
    /// A URL selects SQLite when compiled in; without one the in-memory
    /// adapter wins, falling back to `sqlite://orders.db`.
    pub async fn build_repo(database_url: Option<&str>) -> anyhow::Result<Self> {
        match database_url {
            #[cfg(feature = "sqlite")]
            Some(url) => Ok(Repo::Sqlite(sqlite::SqliteRepo::new(url).await?)),
            #[cfg(feature = "memory")]
            other => {
                if let Some(url) = other {
                    tracing::warn!(url, "sqlite support not compiled in, using in-memory repo");
                }
                Ok(Repo::Memory(memory::InMemoryRepo::new()))
            }
            #[cfg(not(feature = "memory"))]
            None => Ok(Repo::Sqlite(
                sqlite::SqliteRepo::new(DEFAULT_SQLITE_URL).await?,
            )),
        }
    }

    /// Releases store connections. Call after the server has drained.
    pub async fn close(&self) {
        match self {
            #[cfg(feature = "memory")]
            Repo::Memory(_) => {}
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(r) => r.close().await,
        }
    }

    fn inner(&self) -> &dyn OrderRepository {
        match self {
            #[cfg(feature = "memory")]
            Repo::Memory(r) => r,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(r) => r,
        }
    }
}

#[async_trait::async_trait]
impl OrderRepository for Repo {
    async fn create_with_items(&self, order: NewOrder) -> Result<Order, RepoError> {
        self.inner().create_with_items(order).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        self.inner().find_by_id(id).await
    }

    async fn find_page(&self, page: PageRequest) -> Result<(Vec<OrderSummary>, u64), RepoError> {
        self.inner().find_page(page).await
    }

    async fn count_by_status(&self, status: Option<OrderStatus>) -> Result<u64, RepoError> {
        self.inner().count_by_status(status).await
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepoError> {
        self.inner().update_status(id, status).await
    }
}
