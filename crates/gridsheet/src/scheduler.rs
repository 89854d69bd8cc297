//! Background parsing with a deadline
//!
//! The [`ParseScheduler`] runs a [`Parser`] on its own OS thread so the
//! caller's task never blocks on file decoding. At most one parse is in
//! flight per scheduler. The deadline is measured from submission; when it
//! passes, the parse is cancelled and the caller gets
//! [`ParseError::Timeout`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gridsheet_core::Workbook;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::codec::{CancellationFlag, Parser};
use crate::error::{ParseError, PreconditionError, SessionError};

/// How long a parse may run before it is abandoned
pub const PARSE_TIMEOUT: Duration = Duration::from_secs(10);

const WORKER_NAME: &str = "gridsheet-parse";

/// Runs one parse at a time off the calling task
pub struct ParseScheduler {
    parser: Arc<dyn Parser>,
    timeout: Duration,
    in_flight: Arc<AtomicBool>,
}

impl ParseScheduler {
    /// A scheduler using [`PARSE_TIMEOUT`]
    pub fn new(parser: Arc<dyn Parser>) -> Self {
        Self {
            parser,
            timeout: PARSE_TIMEOUT,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use a different deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether a submitted parse has not resolved yet
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Start parsing `bytes` on a worker thread.
    ///
    /// Fails with [`PreconditionError::SchedulerBusy`] while an earlier
    /// handle is alive; the earlier parse is not affected.
    pub fn submit(&self, bytes: Vec<u8>) -> Result<ParseHandle, SessionError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("Rejected parse of {} bytes: another parse is in flight", bytes.len());
            return Err(PreconditionError::SchedulerBusy.into());
        }

        let cancel = CancellationFlag::new();
        let slot = InFlight {
            slot: Arc::clone(&self.in_flight),
            cancel: cancel.clone(),
        };
        let deadline = Instant::now() + self.timeout;
        let size = bytes.len();

        let (tx, rx) = oneshot::channel();
        let parser = Arc::clone(&self.parser);
        let worker_cancel = cancel.clone();
        std::thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || {
                let result = parser.parse(&bytes, &worker_cancel);
                if tx.send(result).is_err() {
                    tracing::debug!("Parse result of {} bytes discarded", bytes.len());
                }
            })?;

        tracing::debug!("Submitted parse of {} bytes", size);
        Ok(ParseHandle {
            result: rx,
            cancel,
            deadline,
            timeout: self.timeout,
            size,
            _slot: slot,
        })
    }
}

/// Holds the scheduler's single slot; dropping it cancels the parse and
/// frees the slot
struct InFlight {
    slot: Arc<AtomicBool>,
    cancel: CancellationFlag,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.slot.store(false, Ordering::SeqCst);
    }
}

/// A submitted parse
pub struct ParseHandle {
    result: oneshot::Receiver<Result<Workbook, ParseError>>,
    cancel: CancellationFlag,
    deadline: Instant,
    timeout: Duration,
    size: usize,
    _slot: InFlight,
}

impl ParseHandle {
    /// Length of the submitted bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Ask the parse to stop; [`wait`](ParseHandle::wait) then yields
    /// [`ParseError::Cancelled`]
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The flag the worker polls
    pub fn cancellation_flag(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    /// Wait for the parse to finish, be cancelled or run out of time
    pub async fn wait(mut self) -> Result<Workbook, ParseError> {
        let cancel = self.cancel.clone();
        let result = &mut self.result;

        let outcome = tokio::time::timeout_at(self.deadline, async {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ParseError::Cancelled),
                received = result => received.unwrap_or_else(|_| {
                    Err(ParseError::Malformed("Parser stopped without producing a result".into()))
                }),
            }
        })
        .await;

        match outcome {
            Ok(result) => result,
            Err(_) => {
                cancel.cancel();
                tracing::warn!(
                    "Parse of {} bytes timed out after {:?}",
                    self.size,
                    self.timeout
                );
                Err(ParseError::Timeout {
                    after: self.timeout,
                })
            }
        }
    }
}
