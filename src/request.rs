//! Wire request and response types for the recommendation service

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Reading, Recommendation};

/// Body of the recommend call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEnvelope
{   /// Human-readable rendering of a reading
    pub query: String
}

impl From<&Reading> for QueryEnvelope
{   fn from(reading: &Reading) -> Self
    {   QueryEnvelope
        {   query: reading.to_string()
        }
    }
}

/// Body of the analyze call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest
{   pub ph: f64
  , pub tds: f64
  , pub temperature: f64
  , pub humidity: f64
}

impl From<&Reading> for AnalyzeRequest
{   fn from(reading: &Reading) -> Self
    {   AnalyzeRequest
        {   ph: reading.ph
          , tds: reading.tds
          , temperature: reading.temperature
          , humidity: reading.humidity
        }
    }
}

/// Query string of the search call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchParams<'a>
{   pub term: &'a str
  , pub ph: f64
  , pub tds: f64
  , pub temp: f64
  , pub hum: f64
}

impl<'a> SearchParams<'a>
{   pub fn new(term: &'a str, reading: &Reading) -> Self
    {   SearchParams
        {   term
          , ph: reading.ph
          , tds: reading.tds
          , temp: reading.temperature
          , hum: reading.humidity
        }
    }
}

/// Health report from the status route
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServiceStatus
{   #[serde(default)]
    pub status: Option<String>
  , #[serde(default)]
    pub message: Option<String>
}

/// Field carrying the answer of recommend and analyze
pub const RECOMMENDATION_FIELD: &str = "recommendation";
/// Field carrying the answer of search
pub const RESULT_FIELD: &str = "result";
/// Field carrying a service-side failure
pub const ERROR_FIELD: &str = "error";

/// Pick what to display from an arbitrary response body.
///
/// `primary` wins when it is a non-empty string, then `error`,
/// otherwise the answer is `Empty`. Any other shape is tolerated.
pub fn select_display(body: &Value, primary: &str) -> Recommendation
{   match non_empty_str(body, primary)
    {   Some(text) => Recommendation::Advice(text.to_string())
      , None => match non_empty_str(body, ERROR_FIELD)
        {   Some(text) => Recommendation::ServiceError(text.to_string())
          , None => Recommendation::Empty
        }
    }
}

fn non_empty_str<'v>(body: &'v Value, field: &str) -> Option<&'v str>
{   body.get(field)
      .and_then(Value::as_str)
      .filter(|s| !s.is_empty())
}
