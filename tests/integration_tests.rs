use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_test::{assert_err, assert_ok};

use sensor_advisor::request::ServiceStatus;
use sensor_advisor::{
  AdvisorBackend, DisplaySink, EndpointConfig, Error, MemorySink, Reading,
  Recommendation, RecommendationRequester, RecommendationService,
  NO_RECOMMENDATION,
};

/// What the loopback service saw of one request
#[derive(Debug, Clone)]
struct CapturedRequest
{   request_line: String
  , headers: Vec<(String, String)>
  , body: String
}

impl CapturedRequest
{   fn header(&self, name: &str) -> Option<&str>
    {   self.headers
          .iter()
          .find(|(k, _)| k.eq_ignore_ascii_case(name))
          .map(|(_, v)| v.as_str())
    }
}

/// Loopback HTTP service answering each connection with the
/// next canned response, then stopping
struct MockService
{   port: u16
  , handle: JoinHandle<Vec<CapturedRequest>>
}

impl MockService
{   async fn start(responses: Vec<(u16, &'static str)>) -> Self
    {   let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
          let mut captured = vec![];
          for (status, body) in responses
          {   let (mut stream, _) = listener.accept().await.unwrap();
              captured.push(read_request(&mut stream).await);

              let reply = format!(
                "HTTP/1.1 {} {}\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n{}",
                status,
                reason(status),
                body.len(),
                body
              );
              stream.write_all(reply.as_bytes()).await.unwrap();
              let _ = stream.shutdown().await;
          }
          captured
        });

        MockService
        {   port
          , handle
        }
    }

    fn endpoint(&self) -> EndpointConfig
    {   EndpointConfig::new("127.0.0.1", self.port)
    }

    async fn captured(self) -> Vec<CapturedRequest>
    {   self.handle.await.unwrap()
    }
}

fn reason(status: u16) -> &'static str
{   match status
    {   200 => "OK"
      , 400 => "Bad Request"
      , 404 => "Not Found"
      , _ => "Internal Server Error"
    }
}

async fn read_request(stream: &mut tokio::net::TcpStream) -> CapturedRequest
{   let mut raw = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop
    {   let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending headers");
        raw.extend_from_slice(&chunk[..n]);
        if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n")
        {   break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&raw[..header_end]).to_string();
    let mut lines = head.split("\r\n").filter(|l| !l.is_empty());
    let request_line = lines.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
      .filter_map(|l| l.split_once(':'))
      .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
      .collect();

    let content_length = headers
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
      .and_then(|(_, v)| v.parse::<usize>().ok())
      .unwrap_or(0);

    while raw.len() < header_end + content_length
    {   let n = stream.read(&mut chunk).await.unwrap();
        if n == 0
        {   break;
        }
        raw.extend_from_slice(&chunk[..n]);
    }

    CapturedRequest
    {   request_line
      , headers
      , body: String::from_utf8_lossy(&raw[header_end..]).to_string()
    }
}

fn sample_reading() -> Reading
{   Reading::new(7.5, 420.0, 32.0, 55.0)
}

fn requester_for(
  endpoint: EndpointConfig
, sink: &MemorySink
) -> RecommendationRequester
{   let service = RecommendationService::new(endpoint).unwrap();
    RecommendationRequester::new(service, Box::new(sink.clone()))
}

fn closed_port() -> u16
{   std::net::TcpListener::bind("127.0.0.1:0")
      .unwrap()
      .local_addr()
      .unwrap()
      .port()
}

#[tokio::test]
async fn test_recommendation_reaches_sink()
{   let mock = MockService::start(vec![
      (200, r#"{"recommendation":"Add 10ml nutrient solution"}"#)
    ]).await;
    let sink = MemorySink::new();
    let requester = requester_for(mock.endpoint(), &sink);

    let result = requester.request(&sample_reading()).await;

    assert_eq!(
      assert_ok!(result),
      Recommendation::Advice("Add 10ml nutrient solution".to_string())
    );
    assert_eq!(sink.writes(), vec!["Add 10ml nutrient solution"]);

    let captured = mock.captured().await;
    assert_eq!(captured.len(), 1);
    assert!(captured[0].request_line.starts_with("POST /recommend "));
    assert_eq!(captured[0].header("content-type"), Some("application/json"));
    assert_eq!(
      captured[0].body,
      r#"{"query":"pH: 7.5, TDS: 420 ppm, Temperature: 32°C, Humidity: 55%"}"#
    );
}

#[tokio::test]
async fn test_error_field_is_displayed()
{   let mock = MockService::start(vec![
      (200, r#"{"error":"sensor out of range"}"#)
    ]).await;
    let sink = MemorySink::new();
    let requester = requester_for(mock.endpoint(), &sink);

    let result = requester.request(&sample_reading()).await;

    assert_eq!(
      result,
      Ok(Recommendation::ServiceError("sensor out of range".to_string()))
    );
    assert_eq!(sink.current().as_deref(), Some("sensor out of range"));
}

#[tokio::test]
async fn test_empty_object_displays_fallback()
{   let mock = MockService::start(vec![(200, "{}")]).await;
    let sink = MemorySink::new();
    let requester = requester_for(mock.endpoint(), &sink);

    let result = requester.request(&sample_reading()).await;

    assert_eq!(result, Ok(Recommendation::Empty));
    assert_eq!(sink.writes(), vec![NO_RECOMMENDATION]);
}

#[tokio::test]
async fn test_error_status_body_is_still_used()
{   let mock = MockService::start(vec![
      (500, r#"{"error":"API request error: quota exhausted"}"#)
    ]).await;
    let sink = MemorySink::new();
    let requester = requester_for(mock.endpoint(), &sink);

    let result = requester.request(&sample_reading()).await;

    assert_eq!(
      result,
      Ok(Recommendation::ServiceError(
        "API request error: quota exhausted".to_string()
      ))
    );
    assert_eq!(sink.writes().len(), 1);
}

#[tokio::test]
async fn test_malformed_body_leaves_sink_untouched()
{   let mock = MockService::start(vec![(200, "not json")]).await;
    let sink = MemorySink::new();
    let requester = requester_for(mock.endpoint(), &sink);

    let result = requester.request(&sample_reading()).await;

    assert!(matches!(result, Err(Error::ParseError(_))));
    assert!(sink.writes().is_empty());
}

#[tokio::test]
async fn test_connection_refused_leaves_sink_untouched()
{   let sink = MemorySink::new();
    sink.display("previous advice");
    let requester = requester_for(
      EndpointConfig::new("127.0.0.1", closed_port()),
      &sink
    );

    let result = requester.request(&sample_reading()).await;

    assert!(matches!(result, Err(Error::HttpError(_))));
    assert_eq!(sink.writes(), vec!["previous advice"]);
}

#[tokio::test]
async fn test_configured_timeout_is_reported()
{   let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let silent = tokio::spawn(async move {
      let (_stream, _) = listener.accept().await.unwrap();
      tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let mut endpoint = EndpointConfig::new("127.0.0.1", port);
    endpoint.timeout_secs = Some(1);
    let sink = MemorySink::new();
    let requester = requester_for(endpoint, &sink);

    let result = requester.request(&sample_reading()).await;

    assert_eq!(result, Err(Error::Timeout));
    assert!(sink.writes().is_empty());
    silent.abort();
}

#[tokio::test]
async fn test_analyze_sends_structured_reading()
{   let mock = MockService::start(vec![
      (200, r#"{"recommendation":"Water quality is within range"}"#)
    ]).await;
    let sink = MemorySink::new();
    let requester = requester_for(mock.endpoint(), &sink);

    let result = requester.analyze(&sample_reading()).await;
    assert_ok!(result);
    assert_eq!(
      sink.current().as_deref(),
      Some("Water quality is within range")
    );

    let captured = mock.captured().await;
    assert!(captured[0].request_line.starts_with("POST /analyze "));
    let body: Value = serde_json::from_str(&captured[0].body).unwrap();
    assert_eq!(
      body,
      json!({"ph": 7.5, "tds": 420.0, "temperature": 32.0, "humidity": 55.0})
    );
}

#[tokio::test]
async fn test_search_sends_term_and_reading()
{   let mock = MockService::start(vec![
      (200, r#"{"result":"Basil grows best between pH 6 and 7"}"#)
    ]).await;
    let sink = MemorySink::new();
    let requester = requester_for(mock.endpoint(), &sink);

    let result = requester.search("basil", &sample_reading()).await;
    assert_eq!(
      result,
      Ok(Recommendation::Advice(
        "Basil grows best between pH 6 and 7".to_string()
      ))
    );

    let captured = mock.captured().await;
    let line = &captured[0].request_line;
    assert!(line.starts_with("GET /search?"));
    assert!(line.contains("term=basil"));
    assert!(line.contains("ph=7.5"));
    assert!(line.contains("temp=32"));
    assert!(line.contains("hum=55"));
}

#[tokio::test]
async fn test_search_not_found_shows_service_error()
{   let mock = MockService::start(vec![
      (404, r#"{"error":"No information found for 'mint'"}"#)
    ]).await;
    let sink = MemorySink::new();
    let requester = requester_for(mock.endpoint(), &sink);

    let result = requester.search("mint", &sample_reading()).await;

    assert!(matches!(result, Ok(Recommendation::ServiceError(_))));
    assert_eq!(
      sink.current().as_deref(),
      Some("No information found for 'mint'")
    );
}

#[tokio::test]
async fn test_status_decodes_health_report()
{   let mock = MockService::start(vec![
      (200, r#"{"status":"Server is running","message":"API is operational"}"#)
    ]).await;
    let service = RecommendationService::new(mock.endpoint()).unwrap();

    let status = assert_ok!(service.status().await);
    assert_eq!(
      status,
      ServiceStatus
      {   status: Some("Server is running".to_string())
        , message: Some("API is operational".to_string())
      }
    );

    let captured = mock.captured().await;
    assert!(captured[0].request_line.starts_with("GET /test "));
}

#[tokio::test]
async fn test_backend_runs_queued_commands_in_order()
{   let mock = MockService::start(vec![
      (200, r#"{"recommendation":"first"}"#)
    , (200, r#"{"status":"Server is running"}"#)
    , (200, r#"{"result":"second"}"#)
    , (200, r#"{"recommendation":"third"}"#)
    ]).await;
    let sink = MemorySink::new();
    let backend = AdvisorBackend::new(
      requester_for(mock.endpoint(), &sink)
    );

    // Everything is queued before any reply is awaited
    let mut first = backend.recommend(sample_reading()).unwrap();
    let mut status = backend.status().unwrap();
    let mut second = backend
      .search("lettuce".to_string(), sample_reading())
      .unwrap();
    let mut third = backend.analyze(sample_reading()).unwrap();
    assert_ok!(backend.shutdown().await);

    assert_eq!(
      first.recv().await,
      Some(Ok(Recommendation::Advice("first".to_string())))
    );
    let report = assert_ok!(status.recv().await.unwrap());
    assert_eq!(report.status.as_deref(), Some("Server is running"));
    assert_eq!(report.message, None);
    assert_eq!(
      second.recv().await,
      Some(Ok(Recommendation::Advice("second".to_string())))
    );
    assert_eq!(
      third.recv().await,
      Some(Ok(Recommendation::Advice("third".to_string())))
    );
    assert_eq!(sink.writes(), vec!["first", "second", "third"]);

    let captured = mock.captured().await;
    assert_eq!(captured.len(), 4);
    assert!(captured[0].request_line.starts_with("POST /recommend "));
    assert!(captured[1].request_line.starts_with("GET /test "));
    assert!(captured[2].request_line.starts_with("GET /search?"));
    assert!(captured[3].request_line.starts_with("POST /analyze "));
}

#[tokio::test]
async fn test_backend_finishes_pending_work_on_shutdown()
{   let mock = MockService::start(vec![
      (200, r#"{"recommendation":"Add 10ml nutrient solution"}"#)
    , (200, r#"{"status":"Server is running","message":"API is operational"}"#)
    ]).await;
    let sink = MemorySink::new();
    let backend = AdvisorBackend::new(
      requester_for(mock.endpoint(), &sink)
    );

    let mut advice = backend.recommend(sample_reading()).unwrap();
    let mut status = backend.status().unwrap();
    assert_ok!(backend.shutdown().await);

    assert!(advice.recv().await.is_some());
    assert!(status.recv().await.is_some());
    assert_eq!(sink.writes(), vec!["Add 10ml nutrient solution"]);
    assert_eq!(mock.captured().await.len(), 2);
}

#[tokio::test]
async fn test_invalid_endpoint_is_rejected()
{   let result = RecommendationService::new(
      EndpointConfig::new("127.0.0.1", 0)
    );
    assert_err!(result);
}
