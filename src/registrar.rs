//! # Schema Registrar
//!
//! Pushes compiled node trees to the platform, skipping trees that are structurally identical
//! to the last confirmed registration of the same root.
//!
//! Each root alias owns an async mutex held across the comparison, the platform call and the
//! snapshot write, so concurrent or retried registrations of one root serialize and identical
//! trees reach the platform at most once. A root is only marked registered after the platform
//! confirms it. Failures are logged and returned; nothing is retried.
//!
//! With a snapshot directory configured, every confirmed registration is written as
//! `<root>.json` and read back on the next startup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::config::FrameworkConfig;
use crate::diagnostics::CommandError;
use crate::schema::{CommandTree, SchemaPayload};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalId(pub String);

impl std::fmt::Display for ExternalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The last tree the platform confirmed for a root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredSchema {
    pub external_id: ExternalId,
    pub root: CommandTree,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Unchanged(ExternalId),
    Registered(ExternalId),
}

impl RegistrationOutcome {
    pub fn external_id(&self) -> &ExternalId {
        match self {
            RegistrationOutcome::Unchanged(id) | RegistrationOutcome::Registered(id) => id,
        }
    }
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct PlatformError {
    pub message: String,
}

impl PlatformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The platform endpoint that accepts command schemas.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn upsert_command(&self, payload: &SchemaPayload) -> Result<ExternalId, PlatformError>;
}

type Slot = Arc<tokio::sync::Mutex<Option<RegisteredSchema>>>;

pub struct SchemaRegistrar {
    client: Arc<dyn PlatformClient>,
    slots: Mutex<BTreeMap<String, Slot>>,
    snapshot_dir: Option<PathBuf>,
}

impl SchemaRegistrar {
    pub fn new(client: Arc<dyn PlatformClient>) -> Self {
        Self {
            client,
            slots: Mutex::new(BTreeMap::new()),
            snapshot_dir: None,
        }
    }

    /// Persists snapshots under `config.snapshot_dir` when one is set.
    pub fn from_config(
        client: Arc<dyn PlatformClient>,
        config: &FrameworkConfig,
    ) -> Result<Self, CommandError> {
        match &config.snapshot_dir {
            Some(dir) => Self::with_snapshot_dir(client, dir.clone()),
            None => Ok(Self::new(client)),
        }
    }

    /// Loads every `*.json` snapshot found directly in `dir`. A missing directory is empty.
    pub fn with_snapshot_dir(
        client: Arc<dyn PlatformClient>,
        dir: impl Into<PathBuf>,
    ) -> Result<Self, CommandError> {
        let dir = dir.into();
        let mut slots = BTreeMap::new();
        for schema in load_snapshots(&dir)? {
            slots.insert(
                schema.root.name().to_lowercase(),
                Arc::new(tokio::sync::Mutex::new(Some(schema))),
            );
        }
        Ok(Self {
            client,
            slots: Mutex::new(slots),
            snapshot_dir: Some(dir),
        })
    }

    fn slot(&self, root: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(root.to_lowercase()).or_default())
    }

    pub async fn register(&self, mut tree: CommandTree) -> Result<RegistrationOutcome, CommandError> {
        let root = tree.name().to_string();
        let slot = self.slot(&root);
        let mut current = slot.lock().await;

        if let Some(existing) = current.as_ref() {
            if existing.root.structurally_eq(&tree) {
                debug!(root = %root, id = %existing.external_id, "schema unchanged, skipping registration");
                return Ok(RegistrationOutcome::Unchanged(existing.external_id.clone()));
            }
        }

        let payload = SchemaPayload::from_tree(&tree);
        let external_id = match self.client.upsert_command(&payload).await {
            Ok(id) => id,
            Err(e) => {
                let err = CommandError::registration(&root, e.message.clone(), Some(Box::new(e)));
                error!(root = %root, error = %err, "schema registration failed");
                return Err(err);
            }
        };

        tree.mark_registered();
        let schema = RegisteredSchema {
            external_id: external_id.clone(),
            root: tree,
        };
        if let Some(dir) = &self.snapshot_dir {
            if let Err(err) = save_snapshot(dir, &schema).await {
                warn!(root = %root, error = %err, "could not persist schema snapshot");
            }
        }
        *current = Some(schema);
        info!(root = %root, id = %external_id, "schema registered");
        Ok(RegistrationOutcome::Registered(external_id))
    }

    /// Fire-and-forget registration; failures only reach the log.
    pub fn spawn_register(self: &Arc<Self>, tree: CommandTree) -> JoinHandle<Option<RegistrationOutcome>> {
        let registrar = Arc::clone(self);
        tokio::spawn(async move { registrar.register(tree).await.ok() })
    }

    /// Registers a batch concurrently, one result per tree in input order.
    pub async fn register_all(
        &self,
        trees: Vec<CommandTree>,
    ) -> Vec<Result<RegistrationOutcome, CommandError>> {
        join_all(trees.into_iter().map(|tree| self.register(tree))).await
    }

    /// False while a registration of `root` is still in flight.
    pub fn is_registered(&self, root: &str) -> bool {
        let slot = self.slot(root);
        let result = match slot.try_lock() {
            Ok(current) => current
                .as_ref()
                .map_or(false, |schema| schema.root.is_registered()),
            Err(_) => false,
        };
        result
    }

    pub async fn registered(&self, root: &str) -> Option<RegisteredSchema> {
        let slot = self.slot(root);
        let current = slot.lock().await;
        current.clone()
    }
}

// ============================================================================
// SNAPSHOTS
// ============================================================================

pub fn load_snapshots(dir: &Path) -> Result<Vec<RegisteredSchema>, CommandError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut schemas = Vec::new();
    for entry in WalkDir::new(dir).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| CommandError::Config {
            message: format!("cannot scan snapshot directory '{}': {e}", dir.display()),
            ctx: Default::default(),
            source: Some(Box::new(e)),
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "json") {
            continue;
        }
        match read_snapshot(path) {
            Ok(mut schema) => {
                schema.root.mark_registered();
                schemas.push(schema);
            }
            Err(err) => warn!(path = %path.display(), error = %err, "ignoring unreadable snapshot"),
        }
    }
    Ok(schemas)
}

pub fn read_snapshot(path: &Path) -> Result<RegisteredSchema, CommandError> {
    let text = std::fs::read_to_string(path).map_err(|e| CommandError::Config {
        message: format!("cannot read snapshot '{}': {e}", path.display()),
        ctx: Default::default(),
        source: Some(Box::new(e)),
    })?;
    serde_json::from_str(&text).map_err(|e| CommandError::Config {
        message: format!("invalid snapshot '{}': {e}", path.display()),
        ctx: Default::default(),
        source: Some(Box::new(e)),
    })
}

async fn save_snapshot(dir: &Path, schema: &RegisteredSchema) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let json = serde_json::to_string_pretty(schema)?;
    tokio::fs::write(
        dir.join(format!("{}.json", schema.root.name().to_lowercase())),
        json,
    )
    .await
}
