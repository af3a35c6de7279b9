//! System orchestration, startup, and shutdown logic.

use anyhow::Context;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::actor_framework::ResourceActor;
use crate::catalog::ProductClient;
use crate::config::AppConfig;
use crate::domain::{Product, User};
use crate::ledger::{LedgerClient, LedgerService};
use crate::store::{DynKeyValueStore, JsonFileStore, MemoryStore};

/// Starts the catalog and ledger actors and wires them together.
pub struct LedgerSystem {
    pub ledger: LedgerClient,
    pub products: ProductClient,
    /// Administrator present at startup, created from config when the store had none.
    pub admin: User,
    handles: Vec<JoinHandle<()>>,
}

impl LedgerSystem {
    /// Opens the store named by `config` (or an in-memory one) and starts.
    pub async fn start(config: &AppConfig) -> anyhow::Result<Self> {
        let store: DynKeyValueStore = match &config.store_path {
            Some(path) => Arc::new(
                JsonFileStore::open(path)
                    .await
                    .with_context(|| format!("opening ledger store {}", path.display()))?,
            ),
            None => Arc::new(MemoryStore::new()),
        };
        Self::with_store(store, config).await
    }

    pub async fn with_store(store: DynKeyValueStore, config: &AppConfig) -> anyhow::Result<Self> {
        let defaults = config.ledger_settings()?;

        // 1. Product catalog
        let product_id_counter = Arc::new(AtomicU64::new(1));
        let next_product_id = move || {
            let id = product_id_counter.fetch_add(1, Ordering::SeqCst);
            format!("product_{}", id)
        };
        let (product_actor, product_resource_client) =
            ResourceActor::<Product>::new(config.actor_buffer_size, next_product_id);
        let products = ProductClient::new(product_resource_client);
        let product_handle = tokio::spawn(product_actor.run());

        // 2. Ledger, pricing through the catalog
        let (ledger_service, ledger) =
            LedgerService::new(config.actor_buffer_size, store, defaults, Arc::new(products.clone()));
        let ledger_handle = tokio::spawn(ledger_service.run());

        // 3. Administrator
        let admin = ledger
            .ensure_admin(config.admin_name.clone(), config.admin_email.clone())
            .await
            .context("bootstrapping administrator")?;
        info!(admin_id = %admin.id, "Ledger system started");

        Ok(Self {
            ledger,
            products,
            admin,
            handles: vec![ledger_handle, product_handle],
        })
    }

    /// Stops the ledger, then waits for the catalog to drain. Any client clones
    /// still held elsewhere keep the catalog running until they are dropped.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        info!("Shutting down system...");
        self.ledger.shutdown().await?;

        // Drop clients to close channels
        drop(self.ledger);
        drop(self.products);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(e).context("actor task failed");
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}
