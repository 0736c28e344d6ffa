//! Ordered registry of configured service adapters.
//!
//! Kinds resolve through [`KNOWN_SERVICES`], a closed table from kind name to
//! constructor. There is no dynamic loading: adding a service means adding a
//! row here.

use serde::de::DeserializeOwned;

use yamlhouse_core::ServiceEntry;

use crate::adapter::ServiceAdapter;
use crate::asana::{self, AsanaAdapter, AsanaSettings};
use crate::error::RegistryError;
use crate::jira::{self, JiraAdapter, JiraSettings};

type Constructor = fn(&ServiceEntry) -> Result<Box<dyn ServiceAdapter>, RegistryError>;

/// Every service kind a config entry may name.
pub const KNOWN_SERVICES: &[(&str, Constructor)] = &[
    (asana::KIND, build_asana as Constructor),
    (jira::KIND, build_jira as Constructor),
];

fn build_asana(entry: &ServiceEntry) -> Result<Box<dyn ServiceAdapter>, RegistryError> {
    let settings: AsanaSettings = decode_settings(entry)?;
    Ok(Box::new(AsanaAdapter::from_settings(entry.name.clone(), settings)?))
}

fn build_jira(entry: &ServiceEntry) -> Result<Box<dyn ServiceAdapter>, RegistryError> {
    let settings: JiraSettings = decode_settings(entry)?;
    Ok(Box::new(JiraAdapter::from_settings(entry.name.clone(), settings)?))
}

fn decode_settings<T: DeserializeOwned>(entry: &ServiceEntry) -> Result<T, RegistryError> {
    serde_yaml::from_value(serde_yaml::Value::Mapping(entry.settings.clone())).map_err(|source| {
        RegistryError::InvalidSettings {
            kind: entry.kind.clone(),
            source,
        }
    })
}

/// Adapters in insertion order.
#[derive(Default)]
pub struct ServiceRegistry {
    services: Vec<Box<dyn ServiceAdapter>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from config entries, in order.
    pub fn from_config(entries: &[ServiceEntry]) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for entry in entries {
            registry.add(entry)?;
        }
        Ok(registry)
    }

    /// Resolve `entry.kind` to a constructor and register the built adapter.
    pub fn add(&mut self, entry: &ServiceEntry) -> Result<&dyn ServiceAdapter, RegistryError> {
        let kind = entry.kind.to_ascii_lowercase();
        let Some((_, construct)) = KNOWN_SERVICES.iter().find(|(known, _)| *known == kind) else {
            return Err(RegistryError::UnknownService {
                kind: entry.kind.clone(),
                known: KNOWN_SERVICES
                    .iter()
                    .map(|(known, _)| *known)
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        };
        let adapter = construct(entry)?;
        Ok(self.add_adapter(adapter))
    }

    /// Register an already-constructed adapter.
    pub fn add_adapter(&mut self, adapter: Box<dyn ServiceAdapter>) -> &dyn ServiceAdapter {
        if self.find(adapter.name()).is_some() {
            tracing::warn!(
                service = %adapter.name(),
                "service name registered twice; records will share one namespace"
            );
        }
        tracing::debug!(service = %adapter.name(), kind = adapter.kind(), "registered service");
        self.services.push(adapter);
        let last = self.services.len() - 1;
        self.services[last].as_ref()
    }

    /// First adapter whose name matches.
    pub fn find(&self, name: &str) -> Option<&dyn ServiceAdapter> {
        self.services
            .iter()
            .find(|s| s.name() == name)
            .map(|s| s.as_ref())
    }

    /// Adapter at `index`.
    pub fn get(&self, index: usize) -> Result<&dyn ServiceAdapter, RegistryError> {
        self.services
            .get(index)
            .map(|s| s.as_ref())
            .ok_or(RegistryError::IndexOutOfRange {
                index,
                len: self.services.len(),
            })
    }

    pub fn all(&self) -> &[Box<dyn ServiceAdapter>] {
        &self.services
    }

    pub fn names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::RecordStream;
    use rstest::rstest;

    struct Named(&'static str, &'static str);

    impl ServiceAdapter for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn kind(&self) -> &'static str {
            self.1
        }

        fn produce_records(&self) -> RecordStream<'_> {
            Box::new(std::iter::empty())
        }
    }

    fn entry(yaml: &str) -> ServiceEntry {
        serde_yaml::from_str(yaml).expect("entry yaml")
    }

    #[test]
    fn add_resolves_known_kinds() {
        let mut registry = ServiceRegistry::new();
        registry.add(&entry("kind: asana\napi_key: tok\n")).expect("asana");
        registry
            .add(&entry(
                "kind: jira\nbase_uri: https://x.test/rest/api/2\nemail: a@b.c\napi_key: k\n",
            ))
            .expect("jira");
        assert_eq!(registry.names(), ["asana", "jira"]);
        assert_eq!(registry.get(1).unwrap().kind(), "jira");
    }

    #[rstest]
    #[case("asana")]
    #[case("Asana")]
    #[case("ASANA")]
    fn kind_lookup_ignores_case(#[case] kind: &str) {
        let mut registry = ServiceRegistry::new();
        let added = registry
            .add(&entry(&format!("kind: {kind}\napi_key: tok\n")))
            .expect("asana");
        assert_eq!(added.kind(), "asana");
    }

    #[test]
    fn name_override_is_used() {
        let mut registry = ServiceRegistry::new();
        let added = registry
            .add(&entry("kind: asana\nname: work-asana\napi_key: tok\n"))
            .expect("asana");
        assert_eq!(added.name(), "work-asana");
        assert!(registry.find("asana").is_none());
        assert!(registry.find("work-asana").is_some());
    }

    #[test]
    fn unknown_kind_lists_known_services() {
        let mut registry = ServiceRegistry::new();
        let err = registry.add(&entry("kind: trello\n")).err().expect("error");
        assert!(matches!(err, RegistryError::UnknownService { .. }));
        assert!(err.to_string().contains("asana, jira"));
        assert!(registry.is_empty());
    }

    #[test]
    fn unknown_setting_is_rejected() {
        let mut registry = ServiceRegistry::new();
        let err = registry
            .add(&entry("kind: asana\napi_key: tok\nworkspace: w1\n"))
            .err()
            .expect("error");
        assert!(matches!(err, RegistryError::InvalidSettings { .. }), "got: {err}");
    }

    #[test]
    fn missing_env_credential_surfaces_config_error() {
        let mut registry = ServiceRegistry::new();
        let err = registry
            .add(&entry(
                "kind: asana\napi_key: { env: YAMLHOUSE_REGISTRY_TEST_UNSET }\n",
            ))
            .err()
            .expect("error");
        assert!(matches!(err, RegistryError::Config(_)), "got: {err}");
    }

    #[test]
    fn find_returns_first_match() {
        let mut registry = ServiceRegistry::new();
        registry.add_adapter(Box::new(Named("alpha", "first")));
        registry.add_adapter(Box::new(Named("beta", "second")));
        registry.add_adapter(Box::new(Named("alpha", "third")));
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.find("alpha").expect("alpha").kind(), "first");
        assert_eq!(registry.get(2).expect("index 2").kind(), "third");
        assert!(registry.find("gamma").is_none());
    }

    #[test]
    fn get_out_of_range_is_an_error() {
        let registry = ServiceRegistry::new();
        let err = registry.get(2).err().expect("error");
        assert!(matches!(err, RegistryError::IndexOutOfRange { index: 2, len: 0 }));
    }
}
