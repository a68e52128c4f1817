//! Configuration for the recommendation endpoint and display output

use std::env;
use std::time::Duration;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_OUTPUT_ID: &str = "ai-output";

pub const ENV_HOST: &str = "SENSOR_ADVISOR_HOST";
pub const ENV_PORT: &str = "SENSOR_ADVISOR_PORT";
pub const ENV_TIMEOUT_SECS: &str = "SENSOR_ADVISOR_TIMEOUT_SECS";
pub const ENV_OUTPUT_ID: &str = "SENSOR_ADVISOR_OUTPUT_ID";

/// Where the recommendation service lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig
{   /// Service host name or address
    pub host: String
  , /// Service port
    pub port: u16
  , /// Path receiving the query envelope
    pub recommend_path: String
  , /// Path receiving structured readings
    pub analyze_path: String
  , /// Path answering free-text searches
    pub search_path: String
  , /// Health check path
    pub status_path: String
  , /// Request timeout in seconds, none waits forever
    pub timeout_secs: Option<u64>
}

impl Default for EndpointConfig
{   fn default() -> Self
    {   EndpointConfig
        {   host: DEFAULT_HOST.to_string()
          , port: DEFAULT_PORT
          , recommend_path: "/recommend".to_string()
          , analyze_path: "/analyze".to_string()
          , search_path: "/search".to_string()
          , status_path: "/test".to_string()
          , timeout_secs: None
        }
    }
}

impl EndpointConfig
{   /// Endpoint on the given host and port with default paths
    pub fn new(host: impl Into<String>, port: u16) -> Self
    {   EndpointConfig
        {   host: host.into()
          , port
          , ..EndpointConfig::default()
        }
    }

    /// `http://host:port`
    pub fn base_url(&self) -> String
    {   format!("http://{}:{}", self.host, self.port)
    }

    /// Full URL for one of the configured paths
    pub fn url_for(&self, path: &str) -> String
    {   format!("{}{}", self.base_url(), path)
    }

    pub fn recommend_url(&self) -> String
    {   self.url_for(&self.recommend_path)
    }

    pub fn analyze_url(&self) -> String
    {   self.url_for(&self.analyze_path)
    }

    pub fn search_url(&self) -> String
    {   self.url_for(&self.search_path)
    }

    pub fn status_url(&self) -> String
    {   self.url_for(&self.status_path)
    }

    pub fn timeout(&self) -> Option<Duration>
    {   self.timeout_secs.map(Duration::from_secs)
    }

    /// Reject values that cannot form a usable URL
    pub fn validate(&self) -> Result<(), Error>
    {   if self.host.trim().is_empty()
        {   return Err(Error::InvalidConfiguration(
              "host must not be empty".to_string()
            ));
        }
        if self.port == 0
        {   return Err(Error::InvalidConfiguration(
              "port must be non-zero".to_string()
            ));
        }
        for (name, path) in [
            ("recommend_path", &self.recommend_path)
          , ("analyze_path", &self.analyze_path)
          , ("search_path", &self.search_path)
          , ("status_path", &self.status_path)
          ]
        {   if !path.starts_with('/')
            {   return Err(Error::InvalidConfiguration(
                  format!("{} must start with '/': {}", name, path)
                ));
            }
        }
        if self.timeout_secs == Some(0)
        {   return Err(Error::InvalidConfiguration(
              "timeout_secs must be positive".to_string()
            ));
        }
        Ok(())
    }
}

/// Advisor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig
{   /// Recommendation service endpoint
    pub endpoint: EndpointConfig
  , /// Symbolic id of the display surface
    pub output_id: String
}

impl Default for AdvisorConfig
{   fn default() -> Self
    {   AdvisorConfig
        {   endpoint: EndpointConfig::default()
          , output_id: DEFAULT_OUTPUT_ID.to_string()
        }
    }
}

impl AdvisorConfig
{   /// Parse a JSON document; missing fields keep their defaults
    pub fn from_json_str(raw: &str) -> Result<Self, Error>
    {   let config: AdvisorConfig = serde_json::from_str(raw)
          .map_err(|e| Error::InvalidConfiguration(e.to_string()))?;
        config.endpoint.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `SENSOR_ADVISOR_*` variables
    pub fn from_env() -> Result<Self, Error>
    {   Self::default().with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, Error>
    where F: Fn(&str) -> Option<String>
    {   if let Some(host) = lookup(ENV_HOST)
        {   debug!("Host overridden: {}", host);
            self.endpoint.host = host;
        }
        if let Some(raw) = lookup(ENV_PORT)
        {   self.endpoint.port = raw.trim().parse().map_err(|_| {
              Error::InvalidConfiguration(
                format!("{} is not a port: {}", ENV_PORT, raw)
              )
            })?;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS)
        {   let secs: u64 = raw.trim().parse().map_err(|_| {
              Error::InvalidConfiguration(
                format!("{} is not a number: {}", ENV_TIMEOUT_SECS, raw)
              )
            })?;
            self.endpoint.timeout_secs = Some(secs);
        }
        if let Some(id) = lookup(ENV_OUTPUT_ID)
        {   self.output_id = id;
        }
        self.endpoint.validate()?;
        Ok(self)
    }
}
