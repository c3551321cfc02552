use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

/// The top level configuration of the exporter.
/// Contains the named probe modules a scrape can select with the `module` query parameter.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub modules: HashMap<String, ModuleConfig>,
}

/// A probe module.
/// Bundles the prober kind, the timeout of a single scrape and the Sentry API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleConfig {
    /// The prober used for this module. Only `http` is supported.
    #[serde(default = "default_prober")]
    pub prober: String,

    /// Bound on every HTTP round trip made during one scrape. Must be at least 1.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Settings for the requests sent to the Sentry API.
    #[serde(default)]
    pub http: ProbeConfig,
}

impl ModuleConfig {
    pub fn runtime(&self) -> ProbeRuntime {
        ProbeRuntime {
            timeout: Duration::from_secs(self.timeout_seconds),
        }
    }
}

/// Settings for the requests sent to the Sentry API.
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    /// Base URL every probe path is appended to,
    /// e.g. `https://sentry.io/api/0/projects/my-org/`.
    #[serde(default)]
    pub prefix: String,

    /// Headers sent with every request.
    /// A `host` key (in any casing) overrides the virtual host instead of being sent literally.
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// The accepted HTTP status codes.
    /// When empty any 2xx status is accepted.
    #[serde(default)]
    pub valid_status_codes: Vec<u16>,

    /// Treat any redirect as a failed request instead of following it.
    #[serde(default)]
    pub no_follow_redirects: bool,

    /// The stat kinds queried on the stats endpoint, one sub-request each.
    #[serde(default = "default_stats")]
    pub stats: Vec<String>,
}

impl ProbeConfig {
    /// Whether the headers carry a virtual host override (`host` in any casing).
    pub fn has_host_override(&self) -> bool {
        self.headers.keys().any(|key| key.eq_ignore_ascii_case("host"))
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            headers: HashMap::new(),
            valid_status_codes: Vec::new(),
            no_follow_redirects: false,
            stats: default_stats(),
        }
    }
}

/// Per scrape runtime settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeRuntime {
    pub timeout: Duration,
}

fn default_prober() -> String {
    "http".to_string()
}

fn default_timeout_seconds() -> u64 {
    5
}

fn default_stats() -> Vec<String> {
    vec!["received".to_string(), "rejected".to_string()]
}

#[cfg(test)]
pub mod test {
    use super::*;

    #[test]
    fn test_default_stats() {
        assert_eq!(default_stats(), vec!["received", "rejected"]);
        assert_eq!(ProbeConfig::default().stats, vec!["received", "rejected"]);
    }

    #[test]
    fn test_host_override_detection() {
        let mut config = ProbeConfig::default();
        assert!(!config.has_host_override());

        config.headers.insert("Hostname".to_string(), "x".to_string());
        assert!(!config.has_host_override());

        config.headers.insert("HOST".to_string(), "sentry.internal".to_string());
        assert!(config.has_host_override());
    }

    #[test]
    fn test_module_config_deserialization() {
        let yaml = r#"
                    modules:
                        sentry:
                            prober: http
                            timeout_seconds: 10
                            http:
                                prefix: https://sentry.io/api/0/projects/acme/
                                headers:
                                    Authorization: Bearer secret
                                    Host: sentry.internal
                                valid_status_codes: [200, 204]
                                no_follow_redirects: true

                        minimal:
                            http:
                                prefix: http://localhost:9000/api/0/projects/demo/
                                    "#;

        let config: Config = serde_yaml::from_str(yaml).expect("Invalid YAML");
        assert!(config.modules.contains_key("sentry"));
        assert!(config.modules.contains_key("minimal"));

        let sentry = config.modules.get("sentry").expect("sentry module not found");
        assert_eq!(sentry.prober, "http");
        assert_eq!(sentry.timeout_seconds, 10);
        assert_eq!(sentry.runtime().timeout, Duration::from_secs(10));
        assert_eq!(sentry.http.prefix, "https://sentry.io/api/0/projects/acme/");
        assert_eq!(
            sentry.http.headers.get("Authorization").map(String::as_str),
            Some("Bearer secret")
        );
        assert_eq!(sentry.http.headers.get("Host").map(String::as_str), Some("sentry.internal"));
        assert_eq!(sentry.http.valid_status_codes, vec![200, 204]);
        assert!(sentry.http.no_follow_redirects);

        // check defaults
        let minimal = config.modules.get("minimal").expect("minimal module not found");
        assert_eq!(minimal.prober, "http");
        assert_eq!(minimal.timeout_seconds, 5);
        assert!(minimal.http.headers.is_empty());
        assert!(minimal.http.valid_status_codes.is_empty());
        assert!(!minimal.http.no_follow_redirects);
        assert_eq!(minimal.http.stats, vec!["received", "rejected"]);
    }
}
