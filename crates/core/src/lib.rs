pub mod agents;
pub mod doctor;
pub mod domain;
pub mod llm;
pub mod market;
pub mod report;
pub mod time;

#[cfg(test)]
mod test_support;

pub mod config {
    use std::fmt;

    pub const FINNHUB_API_KEY_VAR: &str = "FINNHUB_API_KEY";
    pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";

    const FINNHUB_PLACEHOLDERS: &[&str] = &[
        "your_finnhub_api_key_here",
        "your_actual_finnhub_api_key_here",
    ];
    const OPENAI_PLACEHOLDERS: &[&str] = &[
        "your_openai_api_key_here",
        "your_actual_openai_api_key_here",
    ];

    const FINNHUB_HINT: &str = "Get a free key from: https://finnhub.io/";
    const OPENAI_HINT: &str = "Get a key from: https://platform.openai.com/api-keys";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub finnhub_api_key: Option<String>,
        pub openai_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub trading_agents_base_url: Option<String>,
        pub finnhub_base_url: Option<String>,
        pub openai_base_url: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                finnhub_api_key: non_empty_var(FINNHUB_API_KEY_VAR),
                openai_api_key: non_empty_var(OPENAI_API_KEY_VAR),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                trading_agents_base_url: non_empty_var("TRADING_AGENTS_BASE_URL"),
                finnhub_base_url: non_empty_var("FINNHUB_BASE_URL"),
                openai_base_url: non_empty_var("OPENAI_BASE_URL"),
            })
        }

        pub fn require_finnhub_api_key(&self) -> Result<&str, ConfigError> {
            require_key(
                self.finnhub_api_key.as_deref(),
                FINNHUB_API_KEY_VAR,
                FINNHUB_PLACEHOLDERS,
                FINNHUB_HINT,
            )
        }

        pub fn require_openai_api_key(&self) -> Result<&str, ConfigError> {
            require_key(
                self.openai_api_key.as_deref(),
                OPENAI_API_KEY_VAR,
                OPENAI_PLACEHOLDERS,
                OPENAI_HINT,
            )
        }
    }

    /// Validated credentials handed to the analysis collaborator at call time.
    #[derive(Clone)]
    pub struct ApiKeys {
        pub finnhub: String,
        pub openai: String,
    }

    impl ApiKeys {
        /// Fails on the first missing or placeholder key, market data first.
        pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
            let finnhub = settings.require_finnhub_api_key()?.to_string();
            let openai = settings.require_openai_api_key()?.to_string();
            Ok(Self { finnhub, openai })
        }
    }

    impl fmt::Debug for ApiKeys {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("ApiKeys")
                .field("finnhub", &"<redacted>")
                .field("openai", &"<redacted>")
                .finish()
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ConfigErrorKind {
        Missing,
        Placeholder,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ConfigError {
        pub var: &'static str,
        pub kind: ConfigErrorKind,
        pub hint: &'static str,
    }

    impl fmt::Display for ConfigError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self.kind {
                ConfigErrorKind::Missing => write!(f, "{} is not set. {}", self.var, self.hint),
                ConfigErrorKind::Placeholder => write!(
                    f,
                    "{} still holds the placeholder value; replace it with your actual key. {}",
                    self.var, self.hint
                ),
            }
        }
    }

    impl std::error::Error for ConfigError {}

    fn non_empty_var(name: &str) -> Option<String> {
        std::env::var(name)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn require_key<'a>(
        value: Option<&'a str>,
        var: &'static str,
        placeholders: &[&str],
        hint: &'static str,
    ) -> Result<&'a str, ConfigError> {
        let Some(value) = value else {
            return Err(ConfigError {
                var,
                kind: ConfigErrorKind::Missing,
                hint,
            });
        };
        if placeholders.contains(&value) {
            return Err(ConfigError {
                var,
                kind: ConfigErrorKind::Placeholder,
                hint,
            });
        }
        Ok(value)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn settings(finnhub: Option<&str>, openai: Option<&str>) -> Settings {
            Settings {
                finnhub_api_key: finnhub.map(str::to_string),
                openai_api_key: openai.map(str::to_string),
                sentry_dsn: None,
                trading_agents_base_url: None,
                finnhub_base_url: None,
                openai_base_url: None,
            }
        }

        #[test]
        fn placeholder_market_data_key_is_rejected() {
            let s = settings(Some("your_finnhub_api_key_here"), Some("sk-real"));
            let err = ApiKeys::from_settings(&s).unwrap_err();
            assert_eq!(err.var, FINNHUB_API_KEY_VAR);
            assert_eq!(err.kind, ConfigErrorKind::Placeholder);
        }

        #[test]
        fn missing_llm_key_is_rejected() {
            let s = settings(Some("fh-real"), None);
            let err = ApiKeys::from_settings(&s).unwrap_err();
            assert_eq!(err.var, OPENAI_API_KEY_VAR);
            assert_eq!(err.kind, ConfigErrorKind::Missing);
            assert!(err.to_string().contains("platform.openai.com"));
        }

        #[test]
        fn market_data_key_is_checked_first() {
            let s = settings(None, Some("your_openai_api_key_here"));
            let err = ApiKeys::from_settings(&s).unwrap_err();
            assert_eq!(err.var, FINNHUB_API_KEY_VAR);
        }

        #[test]
        fn accepts_real_keys_and_redacts_debug() {
            let s = settings(Some("fh-real"), Some("sk-real"));
            let keys = ApiKeys::from_settings(&s).unwrap();
            assert_eq!(keys.finnhub, "fh-real");
            assert_eq!(keys.openai, "sk-real");
            let debug = format!("{keys:?}");
            assert!(!debug.contains("sk-real"));
        }

        #[test]
        fn example_script_placeholders_are_rejected_too() {
            let s = settings(
                Some("your_actual_finnhub_api_key_here"),
                Some("your_actual_openai_api_key_here"),
            );
            assert_eq!(
                ApiKeys::from_settings(&s).unwrap_err().kind,
                ConfigErrorKind::Placeholder
            );
        }
    }
}
