//! Indicator registry: id → implementation + parameter schema.

use crate::domain::error::RegistryError;
use crate::domain::indicator::{
    adx, atr, ema_cross, ema_regime, macd, momentum, rsi, stochastic, volume, Indicator,
    IndicatorSchema,
};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// One registered indicator.
#[derive(Clone)]
pub struct RegistryEntry {
    pub id: String,
    pub indicator: Arc<dyn Indicator>,
    pub schema: IndicatorSchema,
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("id", &self.id)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Catalogue of indicators, kept in registration order.
#[derive(Debug, Default)]
pub struct IndicatorRegistry {
    entries: Vec<RegistryEntry>,
    index: HashMap<String, usize>,
}

impl IndicatorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `indicator` under `id`.
    ///
    /// Registering the same implementation with the same schema again is a
    /// no-op; anything else under an existing id is a conflict.
    pub fn register(
        &mut self,
        id: &str,
        indicator: Arc<dyn Indicator>,
        schema: IndicatorSchema,
    ) -> Result<(), RegistryError> {
        if let Some(&i) = self.index.get(id) {
            let existing = &self.entries[i];
            if existing.indicator.implementation_id() == indicator.implementation_id()
                && existing.schema == schema
            {
                return Ok(());
            }
            return Err(RegistryError::DuplicateIndicator(id.to_string()));
        }

        self.index.insert(id.to_string(), self.entries.len());
        self.entries.push(RegistryEntry {
            id: id.to_string(),
            indicator,
            schema,
        });
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&RegistryEntry, RegistryError> {
        self.index
            .get(id)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| RegistryError::UnknownIndicator(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// (id, schema) pairs in registration order. Each call starts over.
    pub fn list_all(&self) -> impl Iterator<Item = (&str, &IndicatorSchema)> + '_ {
        self.entries.iter().map(|e| (e.id.as_str(), &e.schema))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registry holding the nine built-in indicators.
    pub fn with_defaults() -> Self {
        let builtins: [(&str, Arc<dyn Indicator>, IndicatorSchema); 9] = [
            (ema_cross::ID, Arc::new(ema_cross::EmaCross), ema_cross::schema()),
            (macd::ID, Arc::new(macd::Macd), macd::schema()),
            (rsi::ID, Arc::new(rsi::Rsi), rsi::schema()),
            (stochastic::ID, Arc::new(stochastic::Stochastic), stochastic::schema()),
            (atr::ID, Arc::new(atr::Atr), atr::schema()),
            (adx::ID, Arc::new(adx::Adx), adx::schema()),
            (volume::ID, Arc::new(volume::Volume), volume::schema()),
            (momentum::ID, Arc::new(momentum::Momentum), momentum::schema()),
            (ema_regime::ID, Arc::new(ema_regime::EmaRegime), ema_regime::schema()),
        ];

        let mut registry = Self::new();
        for (id, indicator, schema) in builtins {
            // ids above are distinct, so registration cannot conflict
            if let Err(e) = registry.register(id, indicator, schema) {
                tracing::error!(error = %e, "built-in indicator rejected");
            }
        }
        registry
    }
}

/// Process-wide registry of built-in indicators, built on first use.
pub fn default_registry() -> &'static IndicatorRegistry {
    static REGISTRY: OnceLock<IndicatorRegistry> = OnceLock::new();
    REGISTRY.get_or_init(IndicatorRegistry::with_defaults)
}
