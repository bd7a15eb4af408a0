//! Runtime configuration.
//!
//! Settings are integer-valued properties, each with a default, so a host
//! can set them from whatever configuration source it uses.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use rustc_hash::FxHashMap;

/// A tunable runtime setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum RuntimeProperty {
    /// Track host-held references per object (1) or not (0).
    RefLedger = 0,
    /// Report outstanding references when the runtime is dropped.
    LeakCheckOnShutdown = 1,
    /// Warn when a host class replaces an earlier registration.
    WarnOnReregister = 2,
}

impl RuntimeProperty {
    pub const ALL: [RuntimeProperty; 3] = [
        RuntimeProperty::RefLedger,
        RuntimeProperty::LeakCheckOnShutdown,
        RuntimeProperty::WarnOnReregister,
    ];

    pub fn default_value(self) -> usize {
        match self {
            RuntimeProperty::RefLedger => usize::from(cfg!(debug_assertions)),
            RuntimeProperty::LeakCheckOnShutdown => 1,
            RuntimeProperty::WarnOnReregister => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeProperty::RefLedger => "ref_ledger",
            RuntimeProperty::LeakCheckOnShutdown => "leak_check_on_shutdown",
            RuntimeProperty::WarnOnReregister => "warn_on_reregister",
        }
    }
}

impl std::fmt::Display for RuntimeProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Property values, falling back to each property's default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    values: FxHashMap<RuntimeProperty, usize>,
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, property: RuntimeProperty, value: usize) -> &mut Self {
        self.values.insert(property, value);
        self
    }

    pub fn with(mut self, property: RuntimeProperty, value: usize) -> Self {
        self.set(property, value);
        self
    }

    pub fn get(&self, property: RuntimeProperty) -> usize {
        self.values
            .get(&property)
            .copied()
            .unwrap_or_else(|| property.default_value())
    }

    pub fn is_enabled(&self, property: RuntimeProperty) -> bool {
        self.get(property) != 0
    }

    /// Look a property up by its name.
    pub fn property_by_name(name: &str) -> Option<RuntimeProperty> {
        RuntimeProperty::ALL.into_iter().find(|p| p.as_str() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_until_set() {
        let mut config = RuntimeConfig::new();
        assert!(config.is_enabled(RuntimeProperty::LeakCheckOnShutdown));
        assert_eq!(
            config.is_enabled(RuntimeProperty::RefLedger),
            cfg!(debug_assertions)
        );

        config.set(RuntimeProperty::LeakCheckOnShutdown, 0);
        assert!(!config.is_enabled(RuntimeProperty::LeakCheckOnShutdown));
    }

    #[test]
    fn raw_ids_and_names() {
        assert_eq!(
            RuntimeProperty::try_from(2u32),
            Ok(RuntimeProperty::WarnOnReregister)
        );
        assert!(RuntimeProperty::try_from(9u32).is_err());
        assert_eq!(
            RuntimeConfig::property_by_name("ref_ledger"),
            Some(RuntimeProperty::RefLedger)
        );
        assert_eq!(RuntimeProperty::RefLedger.to_string(), "ref_ledger");
    }
}
