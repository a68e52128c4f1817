pub mod error;
pub mod config;
pub mod request;
pub mod sink;
pub mod service;
pub mod client;

use std::fmt;
use serde::{Deserialize, Serialize};

pub use client::{AdvisorBackend, RecommendationRequester};
pub use request::ServiceStatus;
pub use config::{AdvisorConfig, EndpointConfig};
pub use error::Error;
pub use service::RecommendationService;
pub use sink::{ConsoleSink, DisplaySink, MemorySink};

/*

sensor_advisor sends one set of sensor readings to a local
recommendation service and shows whatever text comes back.

sensor_advisor/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Reading, Recommendation, backend channel types
│   ├── main.rs         # One-shot command line runner
│   ├── error.rs        # Error type shared by every call
│   ├── config.rs       # Endpoint and output configuration
│   ├── request.rs      # Wire bodies and display selection
│   ├── service.rs      # HTTP calls against the service
│   ├── sink.rs         # Display surfaces
│   └── client.rs       # Requester and the serializing backend task
└── tests/              # Integration tests against a loopback service

*/

/// SENSOR_ADVISOR STRUCTURES:

/// One set of sensor readings.
/// Units are implicit: pH is unitless, TDS in ppm, temperature
/// in °C, humidity in percent. No range is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading
{   pub ph: f64
  , pub tds: f64
  , pub temperature: f64
  , pub humidity: f64
}

impl Reading
{   pub fn new(
      ph: f64
    , tds: f64
    , temperature: f64
    , humidity: f64
    ) -> Self
    {   Reading
        {   ph
          , tds
          , temperature
          , humidity
        }
    }
}

/// The query line sent to the service
impl fmt::Display for Reading
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   write!(
          f,
          "pH: {}, TDS: {} ppm, Temperature: {}°C, Humidity: {}%",
          self.ph, self.tds, self.temperature, self.humidity
        )
    }
}

/// Shown when the service answers with neither advice nor error
pub const NO_RECOMMENDATION: &str = "No recommendation available";

/// What a successfully parsed response amounts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recommendation
{   /// The service's advice
    Advice(String)
  , /// The service reported its own failure
    ServiceError(String)
  , /// Valid JSON without anything to show
    Empty
}

impl Recommendation
{   /// Text written to the display sink
    pub fn display_text(&self) -> &str
    {   match self
        {   Recommendation::Advice(text) => text.as_str()
          , Recommendation::ServiceError(text) => text.as_str()
          , Recommendation::Empty => NO_RECOMMENDATION
        }
    }
}

/// SENSOR_ADVISOR BACKEND INTERFACE:

// ===== Recommend / Analyze / Search =====

pub type RequestReply = Result<Recommendation, crate::error::Error>;
pub type RequestReplySender
  = tokio::sync::mpsc::UnboundedSender<RequestReply>;

/// Which route a queued reading goes to
#[derive(Debug, Clone, PartialEq)]
pub enum RequestKind
{   /// Query envelope to the recommend route
    Recommend
  , /// Structured reading to the analyze route
    Analyze
  , /// Free-text term to the search route
    Search(String)
}

pub struct RecommendArgs
{   pub reading: Reading
  , pub kind: RequestKind
  , pub reply: RequestReplySender
}

// ===== Status =====

pub type StatusReply
  = Result<request::ServiceStatus, crate::error::Error>;
pub type StatusReplySender
  = tokio::sync::mpsc::UnboundedSender<StatusReply>;

pub struct StatusArgs
{   pub reply: StatusReplySender
}

// ===== KillProcess =====

pub type KillProcessReply = Result<(), crate::error::Error>;
pub type KillProcessReplySender
  = tokio::sync::mpsc::UnboundedSender<KillProcessReply>;

pub struct KillProcessArgs
{   pub reply: KillProcessReplySender
}

// ===== Commands =====

/// Every backend command shares one channel, so they run in the
/// order they were queued
pub enum AdvisorCommand
{   Recommend(RecommendArgs)
  , Status(StatusArgs)
  , KillProcess(KillProcessArgs)
}

// ===== AdvisorHand (sender side) =====

pub struct AdvisorHand
{   pub command_tx
      : tokio::sync::mpsc::UnboundedSender<AdvisorCommand>
}

// ===== AdvisorFoot (receiver side) =====

pub struct AdvisorFoot
{   pub command_rx
      : tokio::sync::mpsc::UnboundedReceiver<AdvisorCommand>
}
