use crate::core::{DbError, Result};

const URL_SCHEME: &str = "memory://";

/// Settings for a [`MemoryDb`](crate::MemoryDb).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryConfig {
    /// Name reported in logs and URLs
    pub database: String,

    /// Parsed statements kept in the LRU cache; 0 disables caching
    pub statement_cache_capacity: usize,

    /// Store UUIDs with the time-low and time-high fields swapped,
    /// like MySQL's `UUID_TO_BIN(u, 1)`
    pub swap_uuid_time: bool,
}

impl MemoryConfig {
    pub fn new(database: &str) -> Self {
        Self {
            database: database.to_string(),
            statement_cache_capacity: 128,
            swap_uuid_time: false,
        }
    }

    pub fn database(mut self, database: &str) -> Self {
        self.database = database.to_string();
        self
    }

    pub fn statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.statement_cache_capacity = capacity;
        self
    }

    pub fn swap_uuid_time(mut self, swap: bool) -> Self {
        self.swap_uuid_time = swap;
        self
    }

    /// Parse from a URL.
    ///
    /// Format: `memory://<database>[?cache=<n>&swap_uuid=<bool>]`
    ///
    /// # Examples
    ///
    /// ```
    /// use tablegate::MemoryConfig;
    ///
    /// let config = MemoryConfig::from_url("memory://app?cache=16&swap_uuid=true").unwrap();
    /// assert_eq!(config.database, "app");
    /// assert_eq!(config.statement_cache_capacity, 16);
    /// assert!(config.swap_uuid_time);
    /// ```
    pub fn from_url(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix(URL_SCHEME)
            .ok_or_else(|| DbError::ParseError(format!("URL must start with '{}'", URL_SCHEME)))?;

        let (database, query) = match rest.split_once('?') {
            Some((database, query)) => (database, Some(query)),
            None => (rest, None),
        };

        let mut config = Self::new(database);

        for pair in query.into_iter().flat_map(|q| q.split('&')).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| DbError::ParseError(format!("Invalid URL parameter '{}'", pair)))?;

            match key {
                "cache" => {
                    config.statement_cache_capacity = value
                        .parse()
                        .map_err(|_| DbError::ParseError(format!("Invalid cache size '{}'", value)))?;
                }
                "swap_uuid" => {
                    config.swap_uuid_time = value
                        .parse()
                        .map_err(|_| DbError::ParseError(format!("Invalid swap_uuid flag '{}'", value)))?;
                }
                other => {
                    return Err(DbError::ParseError(format!("Unknown URL parameter '{}'", other)));
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn to_url(&self) -> String {
        format!(
            "{}{}?cache={}&swap_uuid={}",
            URL_SCHEME, self.database, self.statement_cache_capacity, self.swap_uuid_time
        )
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.is_empty() {
            return Err(DbError::ParseError("Database name cannot be empty".into()));
        }

        if self.database.contains(['/', '?', '&']) {
            return Err(DbError::ParseError(format!(
                "Database name '{}' contains reserved characters",
                self.database
            )));
        }

        Ok(())
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self::new("tablegate")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MemoryConfig::default();
        assert_eq!(config.database, "tablegate");
        assert_eq!(config.statement_cache_capacity, 128);
        assert!(!config.swap_uuid_time);
    }

    #[test]
    fn test_builder_pattern() {
        let config = MemoryConfig::new("a")
            .database("shop")
            .statement_cache_capacity(0)
            .swap_uuid_time(true);

        assert_eq!(config.database, "shop");
        assert_eq!(config.statement_cache_capacity, 0);
        assert!(config.swap_uuid_time);
    }

    #[test]
    fn test_from_url_defaults() {
        let config = MemoryConfig::from_url("memory://shop").unwrap();
        assert_eq!(config, MemoryConfig::new("shop"));
    }

    #[test]
    fn test_url_round_trip() {
        let config = MemoryConfig::new("shop").statement_cache_capacity(7).swap_uuid_time(true);
        assert_eq!(MemoryConfig::from_url(&config.to_url()).unwrap(), config);
    }

    #[test]
    fn test_invalid_url() {
        assert!(MemoryConfig::from_url("mysql://shop").is_err());
        assert!(MemoryConfig::from_url("memory://").is_err());
        assert!(MemoryConfig::from_url("memory://shop?cache=lots").is_err());
        assert!(MemoryConfig::from_url("memory://shop?swap_uuid=yes").is_err());
        assert!(MemoryConfig::from_url("memory://shop?pool=4").is_err());
        assert!(MemoryConfig::from_url("memory://shop?cache").is_err());
    }
}
