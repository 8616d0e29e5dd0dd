//! Module registry - concurrency-safe catalog of analysis modules.
//!
//! The registry maps module ids to `(definition, handler)` pairs behind a
//! single lock. It is owned by the application's composition root and handed
//! to collaborators by reference or `Arc`; there is no process-global
//! instance. Built-in modules are installed once at startup; tests and
//! administrative callers may register, replace, or unregister modules at
//! runtime through the same lock-guarded API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::dataset::DataTable;
use super::definition::ModuleDefinition;
use super::errors::AnalysisError;
use super::handler::AnalysisHandler;

/// One registered module: its definition and the handler bound to it.
#[derive(Clone)]
pub struct RegisteredModule {
    definition: ModuleDefinition,
    handler: Arc<dyn AnalysisHandler>,
}

impl std::fmt::Debug for RegisteredModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredModule")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

impl RegisteredModule {
    /// The module's definition.
    pub fn definition(&self) -> &ModuleDefinition {
        &self.definition
    }

    /// The module's executable handler.
    pub fn handler(&self) -> &Arc<dyn AnalysisHandler> {
        &self.handler
    }
}

#[derive(Default)]
struct RegistryInner {
    modules: HashMap<String, RegisteredModule>,
    /// Module ids in registration order, for stable listing.
    order: Vec<String>,
}

/// Concurrency-safe catalog of analysis modules.
#[derive(Default)]
pub struct ModuleRegistry {
    inner: Mutex<RegistryInner>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        // Registry operations are plain map mutations; a poisoned lock can
        // only mean a panic mid-mutation of consistent state, so recover it.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new module.
    ///
    /// # Errors
    /// Returns [`AnalysisError::AlreadyRegistered`] when the id is taken.
    pub fn register(
        &self,
        definition: ModuleDefinition,
        handler: Arc<dyn AnalysisHandler>,
    ) -> Result<(), AnalysisError> {
        let mut inner = self.lock();
        let module_id = definition.module_id.clone();
        if inner.modules.contains_key(&module_id) {
            return Err(AnalysisError::already_registered(module_id));
        }
        inner.order.push(module_id.clone());
        inner.modules.insert(
            module_id,
            RegisteredModule {
                definition,
                handler,
            },
        );
        Ok(())
    }

    /// Registers or replaces a module unconditionally.
    ///
    /// A replaced id keeps its original slot in listing order; unseen ids
    /// append at the end.
    pub fn replace(&self, definition: ModuleDefinition, handler: Arc<dyn AnalysisHandler>) {
        let mut inner = self.lock();
        let module_id = definition.module_id.clone();
        if !inner.modules.contains_key(&module_id) {
            inner.order.push(module_id.clone());
        }
        inner.modules.insert(
            module_id,
            RegisteredModule {
                definition,
                handler,
            },
        );
    }

    /// Removes a module; absent ids are a no-op.
    pub fn unregister(&self, module_id: &str) {
        let mut inner = self.lock();
        if inner.modules.remove(module_id).is_some() {
            inner.order.retain(|id| id != module_id);
        }
    }

    /// Looks up a module.
    ///
    /// # Errors
    /// Returns [`AnalysisError::UnknownModule`] when absent.
    pub fn get(&self, module_id: &str) -> Result<RegisteredModule, AnalysisError> {
        self.lock()
            .modules
            .get(module_id)
            .cloned()
            .ok_or_else(|| AnalysisError::unknown_module(module_id))
    }

    /// Returns true when a module with this id is registered.
    pub fn has_module(&self, module_id: &str) -> bool {
        self.lock().modules.contains_key(module_id)
    }

    /// Number of registered modules.
    pub fn module_count(&self) -> usize {
        self.lock().modules.len()
    }

    /// Definitions in registration order, for discovery endpoints.
    pub fn list_definitions(&self) -> Vec<ModuleDefinition> {
        let inner = self.lock();
        inner
            .order
            .iter()
            .filter_map(|id| inner.modules.get(id))
            .map(|module| module.definition.clone())
            .collect()
    }

    /// Checks that the dataset declares every column the module requires.
    ///
    /// # Errors
    /// Returns [`AnalysisError::MissingColumns`] naming all missing columns
    /// in one message, not just the first.
    pub fn ensure_requirements(
        &self,
        definition: &ModuleDefinition,
        table: &DataTable,
    ) -> Result<(), AnalysisError> {
        let missing: Vec<&str> = definition
            .required_columns
            .iter()
            .filter(|column| !table.has_column(column))
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AnalysisError::missing_columns(missing))
        }
    }
}
