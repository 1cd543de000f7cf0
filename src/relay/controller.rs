//! # Streaming Controller
//!
//! The owner-facing control surface. A controller runs at most one session
//! at a time; there is no global instance, callers construct one per
//! destination and keep it for as long as they want to stream.
//!
//! ## Lifecycle:
//! - `start()`: connect a fresh byte source, bind the UDP socket, spawn the
//!   session worker. Calling it while a session is live changes nothing
//!   and reports [`StartOutcome::AlreadyRunning`].
//! - `stop()`: clear the running flag and wait until the worker has
//!   released its source and socket. Safe to call when idle.
//! - `wait()`: wait for the current session to end on its own, e.g. when
//!   the encoder closes the source.

use crate::amr::reader::PollPolicy;
use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::relay::batch::BatchAccumulator;
use crate::relay::sender::DatagramSender;
use crate::relay::session::{SessionReport, StreamingSession};
use crate::source::{ByteSource, SourceConnector};
use crate::state::{RunningFlag, StreamState};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// What `start()` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new session was started.
    Started,
    /// A session was already live; nothing changed.
    AlreadyRunning,
}

/// Starts and stops streaming sessions over byte sources from `C`.
pub struct StreamingController<C: SourceConnector> {
    connector: C,
    config: RelayConfig,
    running: RunningFlag,
    state: Arc<watch::Sender<StreamState>>,
    worker: Option<JoinHandle<SessionReport>>, // not yet joined, may have finished
    last_report: Option<SessionReport>,
}

impl<C: SourceConnector> StreamingController<C> {
    /// Create an idle controller. Nothing is connected until `start()`.
    pub fn new(connector: C, config: RelayConfig) -> Self {
        let (state, _) = watch::channel(StreamState::Idle);
        Self {
            connector,
            config,
            running: RunningFlag::new(false),
            state: Arc::new(state),
            worker: None,
            last_report: None,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn connector_mut(&mut self) -> &mut C {
        &mut self.connector
    }

    /// Current state of the live session, or `Idle`.
    pub fn state(&self) -> StreamState {
        *self.state.borrow()
    }

    /// Receiver that observes every state change of every session.
    pub fn subscribe(&self) -> watch::Receiver<StreamState> {
        self.state.subscribe()
    }

    /// Whether a session worker is live.
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .map(|worker| !worker.is_finished())
            .unwrap_or(false)
    }

    /// Report of the most recently finished session, if any.
    pub fn last_report(&self) -> Option<&SessionReport> {
        self.last_report.as_ref()
    }

    /// Start a new streaming session.
    ///
    /// ## Errors:
    /// - `Config`: framing or destination settings are unusable
    /// - `SourceUnavailable`: the connector could not open a byte source
    /// - `Transport`: the local UDP socket could not be bound
    ///
    /// On error nothing is left running and the state stays `Idle`.
    pub async fn start(&mut self) -> RelayResult<StartOutcome> {
        if self.is_running() {
            info!("Streaming already started");
            return Ok(StartOutcome::AlreadyRunning);
        }
        self.reap().await;

        self.config.validate()?;
        let batcher = BatchAccumulator::new(&self.config.framing)?;

        let mut source = self.connector.connect().map_err(|err| {
            error!(error = %err, "Failed to connect byte source");
            RelayError::SourceUnavailable(err)
        })?;

        let sender = match DatagramSender::bind(&self.config.destination).await {
            Ok(sender) => sender,
            Err(err) => {
                error!(error = %err, "Failed to set up UDP socket");
                if let Err(close_err) = source.close() {
                    warn!(error = %close_err, "Failed to close byte source");
                }
                return Err(err.into());
            }
        };

        info!(
            host = %self.config.destination.host,
            port = self.config.destination.port,
            frames_per_batch = self.config.framing.frames_per_batch,
            "Starting AMR stream"
        );

        self.running.set();
        let policy = PollPolicy::new(self.config.framing.poll_interval(), self.running.clone());
        let session = StreamingSession::new(source, sender, batcher, policy, Arc::clone(&self.state));
        self.worker = Some(tokio::spawn(session.run()));

        Ok(StartOutcome::Started)
    }

    /// Stop the current session and wait for it to release its resources.
    ///
    /// Returns the session's report, or `None` if nothing was running.
    pub async fn stop(&mut self) -> Option<SessionReport> {
        self.running.clear();
        let report = self.reap().await;
        if report.is_some() {
            info!("Streaming stopped");
        }
        report
    }

    /// Wait for the current session to end without asking it to stop.
    pub async fn wait(&mut self) -> Option<SessionReport> {
        self.reap().await
    }

    /// Join a worker, live or finished, and keep its report.
    ///
    /// Cancel-safe: the handle is only dropped once the worker has finished.
    async fn reap(&mut self) -> Option<SessionReport> {
        let worker = self.worker.as_mut()?;
        let result = worker.await;
        self.worker = None;

        match result {
            Ok(report) => {
                self.last_report = Some(report.clone());
                Some(report)
            }
            Err(err) => {
                error!(error = %err, "Streaming worker panicked or was aborted");
                self.running.clear();
                self.state.send_replace(StreamState::Idle);
                None
            }
        }
    }
}

impl<C: SourceConnector> Drop for StreamingController<C> {
    fn drop(&mut self) {
        self.running.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amr::header::AMR_MAGIC;
    use crate::source::{pipe, PipeConnector};
    use std::io::Write;
    use std::time::Duration;
    use tokio::net::UdpSocket;

    async fn receiver_and_config() -> (UdpSocket, RelayConfig) {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut config = RelayConfig::default();
        config.destination.port = receiver.local_addr().unwrap().port();
        config.destination.bind_addr = "127.0.0.1:0".to_string();
        config.framing.poll_interval_ms = 5;
        (receiver, config)
    }

    async fn wait_for_state(rx: &mut watch::Receiver<StreamState>, wanted: StreamState) {
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|state| *state == wanted))
            .await
            .expect("state change timed out")
            .unwrap();
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        let (_receiver, config) = receiver_and_config().await;
        let mut controller = StreamingController::new(PipeConnector::disconnected(), config);

        assert!(controller.stop().await.is_none());
        assert!(controller.stop().await.is_none());
        assert_eq!(controller.state(), StreamState::Idle);
    }

    #[tokio::test]
    async fn test_start_without_source_fails_visibly() {
        let (_receiver, config) = receiver_and_config().await;
        let mut controller = StreamingController::new(PipeConnector::disconnected(), config);

        let result = controller.start().await;
        assert!(matches!(result, Err(RelayError::SourceUnavailable(_))));
        assert!(!controller.is_running());
        assert_eq!(controller.state(), StreamState::Idle);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_connecting() {
        let (_receiver, mut config) = receiver_and_config().await;
        config.framing.buffer_capacity = 16;
        let (_writer, reader) = pipe();
        let mut controller = StreamingController::new(PipeConnector::new(reader), config);

        assert!(matches!(controller.start().await, Err(RelayError::Config(_))));
        // The reader was never taken.
        assert!(controller.connector_mut().connect().is_ok());
    }

    #[tokio::test]
    async fn test_second_start_reports_already_running() {
        let (_receiver, config) = receiver_and_config().await;
        let (_writer, reader) = pipe();
        let mut controller = StreamingController::new(PipeConnector::new(reader), config);
        let mut states = controller.subscribe();

        assert_eq!(controller.start().await.unwrap(), StartOutcome::Started);
        wait_for_state(&mut states, StreamState::Synchronizing).await;

        assert_eq!(controller.start().await.unwrap(), StartOutcome::AlreadyRunning);
        assert!(controller.is_running());
        assert_eq!(controller.state(), StreamState::Synchronizing);

        let report = controller.stop().await.unwrap();
        assert_eq!(report.end, crate::relay::SessionEnd::Stopped);
        assert_eq!(controller.state(), StreamState::Idle);
        assert!(!controller.is_running());
    }

    #[tokio::test]
    async fn test_restart_needs_fresh_source() {
        let (receiver, config) = receiver_and_config().await;
        let (mut writer, reader) = pipe();
        let mut controller = StreamingController::new(PipeConnector::new(reader), config);
        let mut states = controller.subscribe();

        controller.start().await.unwrap();
        writer.write_all(&AMR_MAGIC).unwrap();
        writer.write_all(&[0x7C]).unwrap();
        wait_for_state(&mut states, StreamState::Streaming).await;
        controller.stop().await.unwrap();

        let mut buf = [0u8; 64];
        let (len, _) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], &[0x7C]);

        // The first pipe's reader is spent.
        assert!(matches!(
            controller.start().await,
            Err(RelayError::SourceUnavailable(_))
        ));

        let (mut writer, reader) = pipe();
        controller.connector_mut().replace(reader);
        assert_eq!(controller.start().await.unwrap(), StartOutcome::Started);

        // Frames written before the header of the new stream are skipped.
        writer.write_all(&[0x44, 1, 2, 3, 4, 5]).unwrap();
        writer.write_all(&AMR_MAGIC).unwrap();
        writer.write_all(&[0x44, 9, 9, 9, 9, 9]).unwrap();
        drop(writer);

        let report = controller.wait().await.unwrap();
        assert_eq!(report.end, crate::relay::SessionEnd::SourceEnded);
        assert_eq!(report.stats.frames_read, 1);

        let (len, _) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], &[0x44, 9, 9, 9, 9, 9]);
    }
}
