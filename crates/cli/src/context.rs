//! Application context - wires everything together

use anyhow::Context;
use cleancredit_core::CleanCreditConfig;
use cleancredit_report::{DecoderChain, ManualEntryDecoder, ReportService};
use cleancredit_store::{LedgerStore, SqliteStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Application context - configuration plus the open store
pub struct AppContext {
    pub config: CleanCreditConfig,
    store: Arc<SqliteStore>,
    data_path: PathBuf,
    db_path: PathBuf,
}

impl AppContext {
    /// Open (creating if needed) the store under `data_path`
    pub async fn new(
        data_path: impl AsRef<Path>,
        config: CleanCreditConfig,
    ) -> Result<Self, anyhow::Error> {
        config.validate().context("Invalid configuration")?;

        let data_path = data_path.as_ref().to_path_buf();
        let db_path = data_path.join("cleancredit.db");
        std::fs::create_dir_all(&data_path)
            .with_context(|| format!("Cannot create data directory {}", data_path.display()))?;

        let store = SqliteStore::open(&db_path, &config.store)
            .await
            .with_context(|| format!("Cannot open database {}", db_path.display()))?;

        Ok(Self {
            config,
            store: Arc::new(store),
            data_path,
            db_path,
        })
    }

    /// Load configuration from `path` when given, defaults otherwise
    pub fn load_config(path: Option<&Path>) -> Result<CleanCreditConfig, anyhow::Error> {
        match path {
            Some(path) => CleanCreditConfig::from_file(path)
                .with_context(|| format!("Cannot read config {}", path.display())),
            None => Ok(CleanCreditConfig::default()),
        }
    }

    pub fn store(&self) -> Arc<dyn LedgerStore> {
        self.store.clone()
    }

    /// Report service reading raw values typed on the command line
    pub async fn report_service(&self) -> Result<ReportService, anyhow::Error> {
        let decoders = DecoderChain::new().with(Arc::new(ManualEntryDecoder));
        let service = ReportService::new(self.store(), decoders, self.config.scoring).await?;
        Ok(service)
    }

    pub async fn is_initialized(&self) -> Result<bool, anyhow::Error> {
        Ok(!self.store.accounts().await?.is_empty())
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}
