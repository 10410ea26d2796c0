use std::collections::BTreeMap;

use async_trait::async_trait;

use super::repository::{RepositoryError, SubmissionRepository};

/// Where the primary store lives.
///
/// `backend` picks the factory; `connection_string` is handed to it as-is.
/// A `DATABASE_URL` such as `sqlite:estimates.db?mode=rwc` or a bare
/// `:memory:` both resolve to the `sqlite` backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub backend: String,
    pub connection_string: String,
}

impl DbConfig {
    /// Splits off the URL scheme as the backend name. Anything without a
    /// scheme is a SQLite path.
    pub fn from_url(url: &str) -> Self {
        let backend = url
            .split_once(':')
            .map(|(scheme, _)| scheme)
            .filter(|scheme| !scheme.is_empty())
            .map_or_else(|| "sqlite".to_string(), str::to_ascii_lowercase);

        Self {
            backend,
            connection_string: url.to_string(),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::from_url(":memory:")
    }
}

/// Opens submission stores for one backend.
#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Connects and prepares the store (migrations included) before
    /// handing it back.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn SubmissionRepository>, RepositoryError>;
}

/// Backend factories known to this build.
#[derive(Default)]
pub struct RepositoryRegistry {
    factories: BTreeMap<&'static str, Box<dyn RepositoryFactory>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `factory`. A later registration under the same name wins.
    pub fn register(
        &mut self,
        factory: Box<dyn RepositoryFactory>,
    ) {
        self.factories.insert(factory.backend_name(), factory);
    }

    pub fn available_backends(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    /// Opens a store through the factory named by `config.backend`.
    ///
    /// Fails with [`RepositoryError::Configuration`] for a backend nobody
    /// registered; factory errors come back unchanged.
    pub async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn SubmissionRepository>, RepositoryError> {
        let Some(factory) = self.factories.get(config.backend.as_str()) else {
            return Err(RepositoryError::Configuration(format!(
                "no store backend named '{}' (built with: {})",
                config.backend,
                self.available_backends().join(", ")
            )));
        };

        factory.create(config).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use crate::models::{NewSubmission, Submission};

    use super::*;

    /// A store that only knows its own name.
    struct NamedStore(&'static str);

    #[async_trait]
    impl SubmissionRepository for NamedStore {
        fn name(&self) -> &str {
            self.0
        }
        async fn create_submission(
            &self,
            _submission: NewSubmission,
        ) -> Result<Submission, RepositoryError> {
            Err(RepositoryError::Database("read-only".to_string()))
        }
        async fn get_submission(
            &self,
            _id: i64,
        ) -> Result<Submission, RepositoryError> {
            Err(RepositoryError::NotFound)
        }
        async fn list_submissions(&self) -> Result<Vec<Submission>, RepositoryError> {
            Ok(Vec::new())
        }
        async fn count_submissions(&self) -> Result<i64, RepositoryError> {
            Ok(0)
        }
        async fn delete_all_submissions(&self) -> Result<u64, RepositoryError> {
            Ok(0)
        }
    }

    /// Records the connection strings it was asked to open.
    struct RecordingFactory {
        backend: &'static str,
        store_name: &'static str,
        opened: Mutex<Vec<String>>,
    }

    impl RecordingFactory {
        fn new(
            backend: &'static str,
            store_name: &'static str,
        ) -> Self {
            Self {
                backend,
                store_name,
                opened: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RepositoryFactory for RecordingFactory {
        fn backend_name(&self) -> &'static str {
            self.backend
        }
        async fn create(
            &self,
            config: &DbConfig,
        ) -> Result<Box<dyn SubmissionRepository>, RepositoryError> {
            if config.connection_string.contains("unreachable") {
                return Err(RepositoryError::Connection("host unreachable".to_string()));
            }
            self.opened.lock().unwrap().push(config.connection_string.clone());
            Ok(Box::new(NamedStore(self.store_name)))
        }
    }

    #[test]
    fn backend_comes_from_url_scheme() {
        let cases = [
            ("sqlite:estimates.db?mode=rwc", "sqlite"),
            ("SQLite://estimates.db", "sqlite"),
            ("postgres://user@host/estimates", "postgres"),
            ("estimates.db", "sqlite"),
            (":memory:", "sqlite"),
        ];
        for (url, backend) in cases {
            let config = DbConfig::from_url(url);
            assert_eq!(config.backend, backend, "{url}");
            assert_eq!(config.connection_string, url);
        }
    }

    #[test]
    fn default_config_is_in_memory_sqlite() {
        assert_eq!(DbConfig::default(), DbConfig::from_url(":memory:"));
        assert_eq!(DbConfig::default().backend, "sqlite");
    }

    #[test]
    fn backends_are_listed_in_name_order() {
        let mut registry = RepositoryRegistry::new();
        registry.register(Box::new(RecordingFactory::new("sqlite", "a")));
        registry.register(Box::new(RecordingFactory::new("mysql", "b")));
        registry.register(Box::new(RecordingFactory::new("sqlite", "c")));

        assert_eq!(registry.available_backends(), vec!["mysql", "sqlite"]);
    }

    #[tokio::test]
    async fn later_registration_replaces_earlier() {
        let mut registry = RepositoryRegistry::new();
        registry.register(Box::new(RecordingFactory::new("sqlite", "first")));
        registry.register(Box::new(RecordingFactory::new("sqlite", "second")));

        let store = registry.create(&DbConfig::default()).await.unwrap();

        assert_eq!(store.name(), "second");
    }

    #[tokio::test]
    async fn config_is_forwarded_to_the_factory() {
        let mut registry = RepositoryRegistry::new();
        registry.register(Box::new(RecordingFactory::new("sqlite", "local")));

        let store = registry
            .create(&DbConfig::from_url("sqlite:estimates.db?mode=rwc"))
            .await
            .unwrap();

        assert_eq!(store.name(), "local");
        assert_eq!(store.count_submissions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unregistered_backend_is_a_configuration_error() {
        let mut registry = RepositoryRegistry::new();
        registry.register(Box::new(RecordingFactory::new("sqlite", "local")));

        let err = registry
            .create(&DbConfig::from_url("postgres://localhost/estimates"))
            .await
            .err();

        assert_eq!(
            err,
            Some(RepositoryError::Configuration(
                "no store backend named 'postgres' (built with: sqlite)".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn factory_errors_pass_through() {
        let mut registry = RepositoryRegistry::new();
        registry.register(Box::new(RecordingFactory::new("sqlite", "local")));

        let err = registry
            .create(&DbConfig::from_url("sqlite:unreachable.db"))
            .await
            .err();

        assert_eq!(
            err,
            Some(RepositoryError::Connection("host unreachable".to_string()))
        );
    }
}
