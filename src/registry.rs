//! Service registry mapping upstream origins to stand-in servers

use std::collections::{HashMap, HashSet};
use std::fmt;

use hyper::Uri;

use crate::config::Config;
use crate::{MockwireError, Result};

/// Scheme, host and port of a URL
///
/// Hosts compare case-insensitively and default ports are dropped, so
/// `https://API.example.com:443` and `https://api.example.com` are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    scheme: String,
    host: String,
    port: Option<u16>,
}

impl Origin {
    /// Parse an absolute `http`/`https` URL into its origin
    ///
    /// # Errors
    ///
    /// Returns error if the URL is not absolute or uses another scheme
    pub fn parse(url: &str) -> Result<Self> {
        let uri = url.parse::<Uri>().map_err(|e| MockwireError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Self::of(&uri).ok_or_else(|| MockwireError::InvalidUrl {
            url: url.to_string(),
            reason: "expected an absolute http(s) URL".to_string(),
        })
    }

    /// Origin of a request URI, if it is absolute
    #[must_use]
    pub fn of(uri: &Uri) -> Option<Self> {
        let scheme = uri.scheme_str()?.to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return None;
        }

        let host = uri.host()?.to_ascii_lowercase();
        if host.is_empty() {
            return None;
        }

        let default_port = if scheme == "https" { 443 } else { 80 };
        let port = uri.port_u16().filter(|p| *p != default_port);

        Some(Self { scheme, host, port })
    }

    /// Host name
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Replace scheme and authority of `uri` with this origin
    ///
    /// Path and query are carried over byte for byte.
    ///
    /// # Errors
    ///
    /// Returns error if the rebuilt URI is invalid
    pub fn rebase(&self, uri: &Uri) -> Result<Uri> {
        let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
        let authority = match self.port {
            Some(port) => format!("{}:{port}", self.host),
            None => self.host.clone(),
        };

        Uri::builder()
            .scheme(self.scheme.as_str())
            .authority(authority.as_str())
            .path_and_query(path_and_query)
            .build()
            .map_err(|e| MockwireError::InvalidUrl {
                url: uri.to_string(),
                reason: e.to_string(),
            })
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}

/// A registered upstream service
#[derive(Debug, Clone)]
pub struct ServiceConfiguration {
    name: String,
    mock_origin: Origin,
    real_origin: Origin,
    ignored_request_headers: HashSet<String>,
    ignored_response_headers: HashSet<String>,
}

impl ServiceConfiguration {
    /// Create a service configuration with no redaction
    ///
    /// # Errors
    ///
    /// Returns error if either URL is not an absolute http(s) URL
    pub fn new(name: impl Into<String>, mock_url: &str, real_url: &str) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            mock_origin: Origin::parse(mock_url)?,
            real_origin: Origin::parse(real_url)?,
            ignored_request_headers: HashSet::new(),
            ignored_response_headers: HashSet::new(),
        })
    }

    /// Add request headers to drop from recordings
    #[must_use]
    pub fn ignore_request_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ignored_request_headers
            .extend(names.into_iter().map(|n| n.as_ref().to_ascii_lowercase()));
        self
    }

    /// Add response headers to drop from recordings
    #[must_use]
    pub fn ignore_response_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ignored_response_headers
            .extend(names.into_iter().map(|n| n.as_ref().to_ascii_lowercase()));
        self
    }

    /// Logical service name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Origin of the stand-in server
    #[must_use]
    pub fn mock_origin(&self) -> &Origin {
        &self.mock_origin
    }

    /// Origin of the real upstream
    #[must_use]
    pub fn real_origin(&self) -> &Origin {
        &self.real_origin
    }

    /// Whether a request header must be left out of recordings
    #[must_use]
    pub fn ignores_request_header(&self, name: &str) -> bool {
        self.ignored_request_headers
            .contains(&name.to_ascii_lowercase())
    }

    /// Whether a response header must be left out of recordings
    #[must_use]
    pub fn ignores_response_header(&self, name: &str) -> bool {
        self.ignored_response_headers
            .contains(&name.to_ascii_lowercase())
    }

    fn claims(&self, origin: &Origin) -> bool {
        self.mock_origin == *origin || self.real_origin == *origin
    }
}

/// Read-only catalog of registered services
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: Vec<ServiceConfiguration>,
}

impl ServiceRegistry {
    /// Build a registry, rejecting ambiguous configurations
    ///
    /// # Errors
    ///
    /// Returns error if a name is registered twice or an origin (real or
    /// mock) is claimed more than once across all services
    pub fn new(services: Vec<ServiceConfiguration>) -> Result<Self> {
        let mut names = HashSet::new();
        let mut claimed = HashSet::new();

        for service in &services {
            if !names.insert(service.name.as_str()) {
                return Err(MockwireError::ConfigError(format!(
                    "Service '{}' registered twice",
                    service.name
                )));
            }
            for origin in [&service.real_origin, &service.mock_origin] {
                if !claimed.insert(origin) {
                    return Err(MockwireError::ConfigError(format!(
                        "{origin} claimed more than once (service '{}')",
                        service.name
                    )));
                }
            }
        }

        Ok(Self { services })
    }

    /// Build a registry from configuration plus runtime-assigned mock URLs
    ///
    /// Redaction sets are resolved once here: per-service names merged with
    /// the configured defaults. Entries in `mock_urls` (keyed by service
    /// name) take precedence over `mock_url` in the file.
    ///
    /// # Errors
    ///
    /// Returns error if a service has no mock URL or the result is ambiguous
    pub fn from_config(config: &Config, mock_urls: &HashMap<String, String>) -> Result<Self> {
        let services = config
            .services
            .iter()
            .map(|service| {
                let mock_url = mock_urls
                    .get(&service.name)
                    .or(service.mock_url.as_ref())
                    .ok_or_else(|| {
                        MockwireError::ConfigError(format!(
                            "Service '{}' has no mock URL",
                            service.name
                        ))
                    })?;

                Ok(
                    ServiceConfiguration::new(service.name.clone(), mock_url, &service.real_url)?
                        .ignore_request_headers(&config.defaults.ignored_request_headers)
                        .ignore_request_headers(&service.ignored_request_headers)
                        .ignore_response_headers(&config.defaults.ignored_response_headers)
                        .ignore_response_headers(&service.ignored_response_headers),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(services)
    }

    /// Service whose real or mock origin matches the URI
    #[must_use]
    pub fn find_by_uri(&self, uri: &Uri) -> Option<&ServiceConfiguration> {
        let origin = Origin::of(uri)?;
        self.services.iter().find(|s| s.claims(&origin))
    }

    /// Service by logical name
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&ServiceConfiguration> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Whether the URI points at a registered stand-in server
    #[must_use]
    pub fn is_mock_origin(&self, uri: &Uri) -> bool {
        Origin::of(uri).is_some_and(|o| self.services.iter().any(|s| s.mock_origin == o))
    }

    /// Whether the URI points at a registered real upstream
    #[must_use]
    pub fn is_real_origin(&self, uri: &Uri) -> bool {
        Origin::of(uri).is_some_and(|o| self.services.iter().any(|s| s.real_origin == o))
    }

    /// Registered services in configuration order
    pub fn iter(&self) -> impl Iterator<Item = &ServiceConfiguration> {
        self.services.iter()
    }

    /// Number of registered services
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// True if no services are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NamingStrategy, RedactionDefaults, ServiceConfig};
    use std::path::PathBuf;

    fn fun_translations() -> ServiceConfiguration {
        ServiceConfiguration::new(
            "FunTranslations",
            "http://127.0.0.1:9091",
            "https://api.funtranslations.com",
        )
        .unwrap()
    }

    #[test]
    fn test_origin_normalization() {
        let a = Origin::parse("https://API.FunTranslations.com:443/ignored").unwrap();
        let b = Origin::parse("https://api.funtranslations.com").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "https://api.funtranslations.com");

        let c = Origin::parse("http://127.0.0.1:9091").unwrap();
        assert_eq!(c.to_string(), "http://127.0.0.1:9091");
    }

    #[test]
    fn test_origin_rejects_relative_and_other_schemes() {
        assert!(Origin::parse("/translate/yoda").is_err());
        assert!(Origin::parse("ftp://files.example.com").is_err());
    }

    #[test]
    fn test_origin_rebase_preserves_path_and_query() {
        let mock = Origin::parse("http://127.0.0.1:9091").unwrap();
        let uri: Uri = "https://api.funtranslations.com/translate/yoda?text=hello%20there"
            .parse()
            .unwrap();

        let rebased = mock.rebase(&uri).unwrap();
        assert_eq!(
            rebased.to_string(),
            "http://127.0.0.1:9091/translate/yoda?text=hello%20there"
        );
    }

    #[test]
    fn test_find_by_uri_matches_real_and_mock() {
        let registry = ServiceRegistry::new(vec![fun_translations()]).unwrap();

        let real: Uri = "https://api.funtranslations.com/translate/yoda".parse().unwrap();
        let mock: Uri = "http://127.0.0.1:9091/translate/yoda".parse().unwrap();
        let other: Uri = "https://example.com/".parse().unwrap();

        assert_eq!(registry.find_by_uri(&real).unwrap().name(), "FunTranslations");
        assert_eq!(registry.find_by_uri(&mock).unwrap().name(), "FunTranslations");
        assert!(registry.find_by_uri(&other).is_none());

        assert!(registry.is_real_origin(&real));
        assert!(!registry.is_mock_origin(&real));
        assert!(registry.is_mock_origin(&mock));
    }

    #[test]
    fn test_ambiguous_registry_rejected() {
        let dup_real = ServiceConfiguration::new(
            "Other",
            "http://127.0.0.1:9092",
            "https://api.funtranslations.com",
        )
        .unwrap();
        assert!(ServiceRegistry::new(vec![fun_translations(), dup_real]).is_err());

        let dup_mock = ServiceConfiguration::new(
            "Other",
            "http://127.0.0.1:9091",
            "https://other.example.com",
        )
        .unwrap();
        assert!(ServiceRegistry::new(vec![fun_translations(), dup_mock]).is_err());
    }

    #[test]
    fn test_mock_origin_cannot_shadow_other_real_origin() {
        let first = ServiceConfiguration::new(
            "First",
            "http://127.0.0.1:9091",
            "http://shared.example.com",
        )
        .unwrap();
        let second = ServiceConfiguration::new(
            "Second",
            "http://shared.example.com",
            "https://second.example.com",
        )
        .unwrap();

        let err = ServiceRegistry::new(vec![first, second]).unwrap_err();
        assert!(matches!(err, MockwireError::ConfigError(_)));

        let same_service =
            ServiceConfiguration::new("Loop", "http://loop.example.com", "http://loop.example.com")
                .unwrap();
        assert!(ServiceRegistry::new(vec![same_service]).is_err());
    }

    #[test]
    fn test_from_config_merges_redaction_and_runtime_urls() {
        let config = Config {
            mock_data_dir: PathBuf::from("MockData"),
            naming: NamingStrategy::Versioned,
            defaults: RedactionDefaults::default(),
            services: vec![ServiceConfig {
                name: "FunTranslations".to_string(),
                real_url: "https://api.funtranslations.com".to_string(),
                mock_url: Some("http://127.0.0.1:1".to_string()),
                ignored_request_headers: vec!["X-Api-Key".to_string()],
                ignored_response_headers: vec!["Date".to_string()],
            }],
        };

        let mut mock_urls = HashMap::new();
        mock_urls.insert(
            "FunTranslations".to_string(),
            "http://127.0.0.1:9091".to_string(),
        );

        let registry = ServiceRegistry::from_config(&config, &mock_urls).unwrap();
        let service = registry.find_by_name("FunTranslations").unwrap();

        assert_eq!(service.mock_origin().to_string(), "http://127.0.0.1:9091");
        assert!(service.ignores_request_header("Authorization"));
        assert!(service.ignores_request_header("traceparent"));
        assert!(service.ignores_request_header("x-api-key"));
        assert!(service.ignores_response_header("date"));
        assert!(!service.ignores_response_header("content-type"));
    }

    #[test]
    fn test_from_config_requires_mock_url() {
        let config = Config {
            mock_data_dir: PathBuf::from("MockData"),
            naming: NamingStrategy::Versioned,
            defaults: RedactionDefaults::default(),
            services: vec![ServiceConfig {
                name: "FunTranslations".to_string(),
                real_url: "https://api.funtranslations.com".to_string(),
                mock_url: None,
                ignored_request_headers: vec![],
                ignored_response_headers: vec![],
            }],
        };

        assert!(ServiceRegistry::from_config(&config, &HashMap::new()).is_err());
    }
}
