//! Model registry: adapter ownership, health-biased resolution, and the
//! admin surface.
//!
//! The registry owns one entry per configured model (descriptor, built
//! adapter, health record). Health mutation is per entry -- a slow or
//! failing model never serializes calls to an independent one. No health
//! lock is ever held across an adapter call.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use dashmap::DashMap;
use tracing::{debug, info, warn};

use colloquy_types::config::RegistrySettings;
use colloquy_types::error::{AdapterError, RegistryError};
use colloquy_types::model::{ModelDescriptor, ModelStatusInfo};

use super::adapter::{AdapterFactory, PromptRequest};
use super::box_adapter::BoxChatAdapter;
use super::health::ModelHealth;

struct ModelEntry {
    descriptor: ModelDescriptor,
    adapter: BoxChatAdapter,
    health: Mutex<ModelHealth>,
}

impl ModelEntry {
    fn health(&self) -> std::sync::MutexGuard<'_, ModelHealth> {
        self.health.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns the configured adapters keyed by logical model name, tracks
/// per-model health, and resolves a usable model with fallback.
pub struct ModelRegistry {
    factory: Arc<dyn AdapterFactory>,
    entries: DashMap<String, Arc<ModelEntry>>,
    /// Registration order, for deterministic fallback and listings.
    order: RwLock<Vec<String>>,
    default_model: RwLock<String>,
    settings: RegistrySettings,
}

impl ModelRegistry {
    /// Create an empty registry; populate it with [`refresh`](Self::refresh).
    pub fn new(factory: Arc<dyn AdapterFactory>, settings: RegistrySettings) -> Self {
        Self {
            factory,
            entries: DashMap::new(),
            order: RwLock::new(Vec::new()),
            default_model: RwLock::new(String::new()),
            settings,
        }
    }

    /// Reload the descriptor set wholesale.
    ///
    /// Health entries for removed names are discarded; surviving names
    /// keep their health; new names start Available. A descriptor whose
    /// adapter cannot be built is skipped with a warning rather than
    /// failing the whole refresh. Returns the number of models loaded.
    pub fn refresh(
        &self,
        descriptors: Vec<ModelDescriptor>,
        default_model: impl Into<String>,
    ) -> usize {
        let mut new_order = Vec::with_capacity(descriptors.len());
        let mut new_entries = Vec::with_capacity(descriptors.len());

        for descriptor in descriptors {
            let adapter = match self.factory.build(&descriptor) {
                Ok(adapter) => adapter,
                Err(err) => {
                    warn!(model = %descriptor.name, error = %err, "Skipping model on refresh");
                    continue;
                }
            };

            let health = self
                .entries
                .get(&descriptor.name)
                .map(|old| old.health().clone())
                .unwrap_or_else(|| ModelHealth::new(&self.settings));

            new_order.push(descriptor.name.clone());
            new_entries.push(Arc::new(ModelEntry {
                descriptor,
                adapter,
                health: Mutex::new(health),
            }));
        }

        self.entries.clear();
        for entry in new_entries {
            self.entries.insert(entry.descriptor.name.clone(), entry);
        }
        *write(&self.order) = new_order;
        *write(&self.default_model) = default_model.into();

        let loaded = self.entries.len();
        info!(loaded, "Model registry refreshed");
        loaded
    }

    /// The configured default model name.
    pub fn default_model(&self) -> String {
        read(&self.default_model).clone()
    }

    /// Whether a model with this logical name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    fn is_usable(&self, name: &str) -> bool {
        self.entries
            .get(name)
            .map(|entry| entry.health().is_available())
            .unwrap_or(false)
    }

    /// Resolve a usable model name.
    ///
    /// Unknown or cooling names fall back to the configured default, then
    /// to the first available model in registration order. If nothing is
    /// available the originally requested name is returned anyway --
    /// health bias never blocks a reply attempt outright.
    pub fn resolve(&self, requested: &str) -> String {
        if self.is_usable(requested) {
            return requested.to_string();
        }

        let default = self.default_model();
        if default != requested && self.is_usable(&default) {
            debug!(%requested, %default, "Falling back to default model");
            return default;
        }

        let order = read(&self.order).clone();
        for name in order {
            if name != requested && name != default && self.is_usable(&name) {
                debug!(%requested, fallback = %name, "Falling back to first available model");
                return name;
            }
        }

        // Fail open with the original request.
        requested.to_string()
    }

    /// Resolve and invoke a model, recording the outcome in its health.
    pub async fn invoke(
        &self,
        name: &str,
        request: &PromptRequest,
    ) -> Result<String, AdapterError> {
        let resolved = self.resolve(name);
        let entry = match self.entries.get(&resolved) {
            Some(entry) => Arc::clone(&entry),
            None => {
                return Err(AdapterError::Configuration(format!(
                    "no model named '{resolved}' is configured"
                )));
            }
        };

        debug!(model = %resolved, kind = entry.adapter.kind(), "Invoking model");
        let result = entry.adapter.call(request).await;

        match &result {
            Ok(_) => entry.health().record_success(),
            Err(err) => {
                warn!(model = %resolved, error = %err, "Model call failed");
                entry.health().record_failure(err.to_string());
            }
        }

        result
    }

    /// Unconditionally clear a model's failures and cooldown.
    pub fn reset(&self, name: &str) -> Result<(), RegistryError> {
        match self.entries.get(name) {
            Some(entry) => {
                entry.health().reset();
                info!(model = %name, "Model health reset");
                Ok(())
            }
            None => Err(RegistryError::UnknownModel(name.to_string())),
        }
    }

    /// Status projections for all models, in registration order.
    pub fn list(&self) -> Vec<ModelStatusInfo> {
        read(&self.order)
            .iter()
            .filter_map(|name| self.details(name))
            .collect()
    }

    /// Status projection for one model.
    pub fn details(&self, name: &str) -> Option<ModelStatusInfo> {
        let entry = self.entries.get(name)?;
        let info = entry.health().status_info(
            &entry.descriptor.name,
            entry.descriptor.provider.kind(),
            entry.descriptor.description.as_deref(),
        );
        Some(info)
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
