//! Backpressured body pump.
//!
//! # Responsibilities
//! - Move body frames from a source to a consumer without buffering the
//!   whole body
//! - Pause reading the source while the consumer's queue is full
//! - Abandon a source that stops producing data
//! - Report how the transfer ended
//!
//! # Design Decisions
//! - A spawned task reads the source into a bounded channel; `send().await`
//!   is the pause point, so at most `queue_frames` frames sit in memory
//! - Dropping the consumer stops the task and drops the source, which
//!   abandons the other side of the exchange
//! - Source errors and idle expiry are forwarded as an error frame so the
//!   consumer fails instead of seeing a truncated body

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use http_body_util::BodyExt;
use tokio::sync::mpsc;

use crate::proxy::timing::Milestone;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type FrameResult = Result<Frame<Bytes>, BoxError>;

/// How a pumped transfer ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PumpOutcome {
    Completed { bytes: u64 },
    /// The consumer went away before the source ended.
    ReceiverGone { bytes: u64 },
    SourceFailed { bytes: u64, cause: String },
    /// The source produced nothing for `after`.
    TimedOut { bytes: u64, after: Duration },
}

impl PumpOutcome {
    pub fn bytes(&self) -> u64 {
        match self {
            PumpOutcome::Completed { bytes }
            | PumpOutcome::ReceiverGone { bytes }
            | PumpOutcome::SourceFailed { bytes, .. }
            | PumpOutcome::TimedOut { bytes, .. } => *bytes,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PumpOutcome::Completed { .. } => "completed",
            PumpOutcome::ReceiverGone { .. } => "client_gone",
            PumpOutcome::SourceFailed { .. } => "stream_failed",
            PumpOutcome::TimedOut { .. } => "stream_timeout",
        }
    }
}

/// Factory for pumped bodies sharing one queue size and idle deadline.
#[derive(Debug, Clone, Copy)]
pub struct BodyPump {
    queue_frames: usize,
    idle_timeout: Option<Duration>,
}

impl BodyPump {
    pub fn new(queue_frames: usize) -> Self {
        Self {
            queue_frames: queue_frames.max(1),
            idle_timeout: None,
        }
    }

    /// Give up on a source that yields no frame for `idle`.
    pub fn with_idle_timeout(mut self, idle: Duration) -> Self {
        self.idle_timeout = Some(idle);
        self
    }

    pub fn queue_frames(&self) -> usize {
        self.queue_frames
    }

    /// Start pumping `source`; `on_complete` runs once when the transfer ends.
    pub fn pump<B, F>(&self, source: B, on_complete: F) -> PumpedBody
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
        F: FnOnce(PumpOutcome) + Send + 'static,
    {
        let size_hint = source.size_hint();
        let (tx, rx) = mpsc::channel(self.queue_frames);
        let idle_timeout = self.idle_timeout;
        tokio::spawn(async move {
            let outcome = run_pump(Box::pin(source), tx, idle_timeout).await;
            on_complete(outcome);
        });

        PumpedBody {
            rx,
            size_hint,
            first_poll: None,
            finished: false,
        }
    }
}

/// One read from the source, with the source's error already boxed.
enum Read {
    Frame(Frame<Bytes>),
    End,
    Failed(BoxError),
    Idle(Duration),
}

async fn read_frame<B>(mut source: Pin<&mut B>, idle_timeout: Option<Duration>) -> Read
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let next = match idle_timeout {
        Some(idle) => match tokio::time::timeout(idle, source.frame()).await {
            Ok(next) => next,
            Err(_) => return Read::Idle(idle),
        },
        None => source.frame().await,
    };
    match next {
        None => Read::End,
        Some(Ok(frame)) => Read::Frame(frame),
        Some(Err(e)) => Read::Failed(e.into()),
    }
}

async fn run_pump<B>(
    mut source: Pin<Box<B>>,
    tx: mpsc::Sender<FrameResult>,
    idle_timeout: Option<Duration>,
) -> PumpOutcome
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let mut bytes = 0u64;
    loop {
        let read = tokio::select! {
            read = read_frame(source.as_mut(), idle_timeout) => read,
            _ = tx.closed() => return PumpOutcome::ReceiverGone { bytes },
        };

        match read {
            Read::End => return PumpOutcome::Completed { bytes },
            Read::Frame(frame) => {
                let len = frame.data_ref().map_or(0, |data| data.len() as u64);
                if tx.send(Ok(frame)).await.is_err() {
                    return PumpOutcome::ReceiverGone { bytes };
                }
                bytes += len;
            }
            Read::Failed(e) => {
                let cause = e.to_string();
                let _ = tx.send(Err(e)).await;
                return PumpOutcome::SourceFailed { bytes, cause };
            }
            Read::Idle(after) => {
                let e = io::Error::new(io::ErrorKind::TimedOut, format!("no body data within {after:?}"));
                let _ = tx.send(Err(e.into())).await;
                return PumpOutcome::TimedOut { bytes, after };
            }
        }
    }
}

/// Consumer side of a pump.
pub struct PumpedBody {
    rx: mpsc::Receiver<FrameResult>,
    size_hint: SizeHint,
    first_poll: Option<Milestone>,
    finished: bool,
}

impl PumpedBody {
    /// Mark `milestone` the first time the consumer asks for data.
    pub fn on_first_poll(mut self, milestone: Milestone) -> Self {
        self.first_poll = Some(milestone);
        self
    }
}

impl Body for PumpedBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Bytes>, BoxError>>> {
        if let Some(milestone) = self.first_poll.take() {
            milestone.mark();
        }
        match self.rx.poll_recv(cx) {
            Poll::Ready(None) => {
                self.finished = true;
                Poll::Ready(None)
            }
            other => other,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.finished
    }

    fn size_hint(&self) -> SizeHint {
        self.size_hint.clone()
    }
}
