use log::{debug, trace, error, warn};
use serde_json::Value;

use crate::config::EndpointConfig;
use crate::error::Error;
use crate::request::{
  AnalyzeRequest, QueryEnvelope, SearchParams, ServiceStatus,
  select_display, RECOMMENDATION_FIELD, RESULT_FIELD,
};
use crate::{Reading, Recommendation};

/// HTTP client for the recommendation service
#[derive(Debug, Clone)]
pub struct RecommendationService
{   config: EndpointConfig
  , http_client: reqwest::Client
}

impl RecommendationService
{   /// Build a client for the given endpoint
    pub fn new(config: EndpointConfig) -> Result<Self, Error>
    {   debug!("Creating RecommendationService for {}", config.base_url());
        config.validate()?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout()
        {   builder = builder.timeout(timeout);
        }
        let http_client = builder.build().map_err(|e| {
          error!("Failed to build HTTP client: {}", e);
          Error::InvalidConfiguration(e.to_string())
        })?;

        Ok(RecommendationService
        {   config
          , http_client
        })
    }

    /// Send the formatted reading and pick the text to display
    pub async fn recommend(
      &self
    , reading: &Reading
    ) -> Result<Recommendation, Error>
    {   let envelope = QueryEnvelope::from(reading);
        debug!("Requesting recommendation for: {}", envelope.query);
        trace!("Recommend request: {:?}", envelope);

        let response = self.http_client
          .post(self.config.recommend_url())
          .header("Content-Type", "application/json")
          .json(&envelope)
          .send()
          .await
          .map_err(|e| Error::from_transport(&e))?;

        let body = read_json(response).await?;
        Ok(select_display(&body, RECOMMENDATION_FIELD))
    }

    /// Send the raw numbers and let the service phrase them
    pub async fn analyze(
      &self
    , reading: &Reading
    ) -> Result<Recommendation, Error>
    {   let request = AnalyzeRequest::from(reading);
        trace!("Analyze request: {:?}", request);

        let response = self.http_client
          .post(self.config.analyze_url())
          .header("Content-Type", "application/json")
          .json(&request)
          .send()
          .await
          .map_err(|e| Error::from_transport(&e))?;

        let body = read_json(response).await?;
        Ok(select_display(&body, RECOMMENDATION_FIELD))
    }

    /// Ask about a free-text term in the context of a reading
    pub async fn search(
      &self
    , term: &str
    , reading: &Reading
    ) -> Result<Recommendation, Error>
    {   debug!("Searching for: {}", term);
        let params = SearchParams::new(term, reading);

        let response = self.http_client
          .get(self.config.search_url())
          .query(&params)
          .send()
          .await
          .map_err(|e| Error::from_transport(&e))?;

        let body = read_json(response).await?;
        Ok(select_display(&body, RESULT_FIELD))
    }

    /// Health check
    pub async fn status(&self) -> Result<ServiceStatus, Error>
    {   debug!("Checking service status");

        let response = self.http_client
          .get(self.config.status_url())
          .send()
          .await
          .map_err(|e| Error::from_transport(&e))?;

        let body = read_json(response).await?;
        serde_json::from_value(body)
          .map_err(|e| Error::ParseError(e.to_string()))
    }
}

/// Read a body as JSON whatever the status code
async fn read_json(response: reqwest::Response) -> Result<Value, Error>
{   let status = response.status();
    trace!("Response status: {}", status);
    if !status.is_success()
    {   warn!("Service answered with status {}", status);
    }

    let text = response.text()
      .await
      .map_err(|e| Error::from_transport(&e))?;
    trace!("Response body: {}", text);

    serde_json::from_str(&text)
      .map_err(|e| Error::ParseError(e.to_string()))
}
