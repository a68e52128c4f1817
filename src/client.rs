use tokio::sync::mpsc;
use log::{debug, error, info};

use crate::service::RecommendationService;
use crate::sink::DisplaySink;
use crate::{AdvisorCommand, AdvisorFoot, Reading, RequestKind};

/// Turns a reading into text on a display surface
pub struct RecommendationRequester
{   service: RecommendationService
  , sink: Box<dyn DisplaySink>
}

impl RecommendationRequester
{   pub fn new(
      service: RecommendationService
    , sink: Box<dyn DisplaySink>
    ) -> Self
    {   RecommendationRequester
        {   service
          , sink
        }
    }

    pub fn service(&self) -> &RecommendationService
    {   &self.service
    }

    /// One request, one display write.
    ///
    /// On failure the error is logged once and the sink keeps
    /// whatever it showed before.
    pub async fn request(
      &self
    , reading: &Reading
    ) -> crate::RequestReply
    {   let result = self.service.recommend(reading).await;
        self.show(result)
    }

    /// Same contract as [`request`](Self::request), structured body
    pub async fn analyze(
      &self
    , reading: &Reading
    ) -> crate::RequestReply
    {   let result = self.service.analyze(reading).await;
        self.show(result)
    }

    /// Same contract as [`request`](Self::request) for a search term
    pub async fn search(
      &self
    , term: &str
    , reading: &Reading
    ) -> crate::RequestReply
    {   let result = self.service.search(term, reading).await;
        self.show(result)
    }

    fn show(&self, result: crate::RequestReply) -> crate::RequestReply
    {   match result
        {   Ok(recommendation) => {
              info!("AI Response: {:?}", recommendation);
              self.sink.display(recommendation.display_text());
              Ok(recommendation)
            }
          , Err(e) => {
              error!("Error: {}", e);
              Err(e)
            }
        }
    }
}

/// Owns a requester on its own task; commands run one at a time
pub struct AdvisorBackend
{   hand: crate::AdvisorHand
  , _task_handle: tokio::task::JoinHandle<()>
}

impl AdvisorBackend
{   /// Spawn the backend loop - returns immediately
    pub fn new(requester: RecommendationRequester) -> Self
    {   debug!("Creating AdvisorBackend with task ownership");

        let (command_tx, command_rx)
          = mpsc::unbounded_channel();

        let hand = crate::AdvisorHand { command_tx };
        let foot = crate::AdvisorFoot { command_rx };

        let _task_handle = tokio::spawn(async move {
          run_backend_loop(foot, requester).await
        });

        AdvisorBackend
        {   hand
          , _task_handle
        }
    }

    /// Queue a recommendation request
    pub fn recommend(
      &self
    , reading: Reading
    ) -> Result<
        mpsc::UnboundedReceiver<crate::RequestReply>,
        crate::error::Error
      >
    {   debug!("recommend queuing command");
        self.queue(reading, RequestKind::Recommend)
    }

    /// Queue an analyze request
    pub fn analyze(
      &self
    , reading: Reading
    ) -> Result<
        mpsc::UnboundedReceiver<crate::RequestReply>,
        crate::error::Error
      >
    {   debug!("analyze queuing command");
        self.queue(reading, RequestKind::Analyze)
    }

    /// Queue a search request
    pub fn search(
      &self
    , term: String
    , reading: Reading
    ) -> Result<
        mpsc::UnboundedReceiver<crate::RequestReply>,
        crate::error::Error
      >
    {   debug!("search queuing command for: {}", term);
        self.queue(reading, RequestKind::Search(term))
    }

    fn queue(
      &self
    , reading: Reading
    , kind: RequestKind
    ) -> Result<
        mpsc::UnboundedReceiver<crate::RequestReply>,
        crate::error::Error
      >
    {   let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        self.send(AdvisorCommand::Recommend(crate::RecommendArgs
        {   reading
          , kind
          , reply: reply_tx
        }))?;

        Ok(reply_rx)
    }

    /// Queue a health check
    pub fn status(
      &self
    ) -> Result<
        mpsc::UnboundedReceiver<crate::StatusReply>,
        crate::error::Error
      >
    {   debug!("status queuing command");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        self.send(AdvisorCommand::Status(
          crate::StatusArgs { reply: reply_tx }
        ))?;

        Ok(reply_rx)
    }

    /// Gracefully shutdown the backend.
    ///
    /// Commands queued before this one still run first.
    pub async fn shutdown(self)
      -> Result<(), crate::error::Error>
    {   debug!("Shutting down AdvisorBackend");
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        self.send(AdvisorCommand::KillProcess(
          crate::KillProcessArgs { reply: reply_tx }
        ))?;

        if let Some(result) = reply_rx.recv().await
        {   debug!("Backend shutdown confirmed");
            result
        } else
        {   error!("Backend stopped before confirming shutdown");
            Err(crate::error::Error::Other(
              "Backend stopped before confirming shutdown".to_string()
            ))
        }
    }

    fn send(&self, cmd: AdvisorCommand)
      -> Result<(), crate::error::Error>
    {   self.hand.command_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel closed");
            crate::error::Error::Other(
              "Backend disconnected".to_string()
            )
          })
    }
}

/// Main backend event loop
///
/// One channel carries every command; each is awaited to
/// completion before the next is taken.
async fn run_backend_loop(
  foot: AdvisorFoot
, requester: RecommendationRequester
)
{   debug!("Starting AdvisorBackend event loop");
    let AdvisorFoot { mut command_rx } = foot;

    loop
    { match command_rx.recv().await
      {   Some(AdvisorCommand::Recommend(cmd)) => {
            let result = match &cmd.kind
            {   RequestKind::Recommend => {
                  debug!("Received Recommend");
                  requester.request(&cmd.reading).await
                }
              , RequestKind::Analyze => {
                  debug!("Received Analyze");
                  requester.analyze(&cmd.reading).await
                }
              , RequestKind::Search(term) => {
                  debug!("Received Search for: {}", term);
                  requester.search(term, &cmd.reading).await
                }
            };
            let _ = cmd.reply.send(result);
          }
        , Some(AdvisorCommand::Status(cmd)) => {
            debug!("Received Status");
            let _ = cmd.reply.send(requester.service().status().await);
          }
        , Some(AdvisorCommand::KillProcess(cmd)) => {
            debug!("Received KillProcess");
            let _ = cmd.reply.send(Ok(()));
            info!("AdvisorBackend shutting down");
            break;
          }
        , None => {
            debug!("Command channel closed");
            break;
          }
      }
    }
}
