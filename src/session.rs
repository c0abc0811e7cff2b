use std::future::Future;
use std::time::Duration;

use afpacket::tokio::RawPacketStream;
use pnet::util::MacAddr;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::capture::{self, FrameSink, FrameSource};
use crate::error::Result;
use crate::frame::FrameTemplate;
use crate::probe::{OfferRecord, SessionStatus};
use crate::response::Listener;
use crate::transmit;

/// Wall-clock budget a session gets to collect replies.
pub const SESSION_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub interface_name: String,
    pub addresses: Vec<MacAddr>,
    pub host_name: Option<String>,
    pub deadline: Duration,
    pub xid_seed: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct SessionConfigBuilder {
    interface_name: String,
    addresses: Vec<MacAddr>,
    host_name: Option<String>,
    deadline: Option<Duration>,
    xid_seed: Option<u64>,
}

impl SessionConfigBuilder {
    pub fn new(interface_name: &str) -> Self {
        Self {
            interface_name: interface_name.into(),
            addresses: Vec::new(),
            host_name: None,
            deadline: Some(SESSION_DEADLINE),
            xid_seed: None,
        }
    }

    /// Hardware addresses to probe on behalf of, in send order.
    pub fn with_addresses(mut self, addresses: Vec<MacAddr>) -> Self {
        self.addresses = addresses;
        self
    }

    /// Host name to embed in each Discover (DHCP option 12).
    pub fn with_host_name(mut self, host_name: &str) -> Self {
        self.host_name = Some(host_name.into());
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Seeds the session RNG, making the transaction id deterministic.
    pub fn with_xid_seed(mut self, xid_seed: u64) -> Self {
        self.xid_seed = Some(xid_seed);
        self
    }

    pub fn build(self) -> SessionConfig {
        SessionConfig {
            interface_name: self.interface_name,
            addresses: self.addresses,
            host_name: self.host_name,
            deadline: self.deadline.unwrap(),
            xid_seed: self.xid_seed,
        }
    }
}

/// A single DHCP probe run: one Discover broadcast per configured hardware
/// address, and one background listener correlating Offer replies back to the
/// addresses through the client-hardware-address field.
///
/// The session owns a write-capable and a read-capable capture handle on the
/// configured interface for its whole lifetime; both are released when the
/// handle returned by [`ProbeSession::start`] is dropped.
///
/// # Example
/// ```no_run
/// use async_dhcp_probe::{ProbeSession, SessionConfigBuilder};
/// use pnet::util::MacAddr;
///
/// let config = SessionConfigBuilder::new("eth0")
///     .with_addresses(vec!["11:22:33:44:55:66".parse::<MacAddr>().unwrap()])
///     .with_host_name("audit-host")
///     .build();
/// tokio_test::block_on(async {
///     let session = ProbeSession::new(config).expect("failed to open capture handles");
///     let mut handle = session.start();
///     while let Some(offer) = handle.offers.recv().await {
///         println!("{:?}", offer);
///     }
///     let status = (&mut handle.status).await.unwrap();
///     println!("{:?}", status);
/// })
/// ```
#[derive(Debug)]
pub struct ProbeSession {
    config: SessionConfig,
    write_stream: RawPacketStream,
    read_stream: RawPacketStream,
}

impl ProbeSession {
    /// Acquires both capture handles up front. If either fails, the session
    /// fails here, before any frame is sent or read.
    ///
    /// # Errors
    /// Returns [`crate::Error::CapabilityOpen`] when a packet stream cannot be
    /// created or bound to the interface.
    pub fn new(config: SessionConfig) -> Result<Self> {
        let write_stream = capture::open_stream(&config.interface_name)?;
        let read_stream = capture::open_stream(&config.interface_name)?;
        Ok(Self {
            config,
            write_stream,
            read_stream,
        })
    }

    /// Starts the listener, then the transmitter, as background tasks and
    /// hands the result channels to the caller. Offers stream incrementally;
    /// the terminal status arrives exactly once, after which no further
    /// records are published.
    pub fn start(self) -> SessionHandle {
        Self::start_with(self.write_stream, self.read_stream, self.config)
    }

    pub(crate) fn start_with<W, R>(sink: W, source: R, config: SessionConfig) -> SessionHandle
    where
        W: FrameSink + Send + 'static,
        R: FrameSource + Send + 'static,
    {
        let (record_tx, record_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = oneshot::channel();

        let mut rng = match config.xid_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let template = FrameTemplate::new(rng.gen(), config.host_name);
        let deadline = Instant::now() + config.deadline;

        let mut task_spawner = BackgroundTaskSpawner::new();
        // The listener must be reading before the first Discover goes out.
        let listener = Listener::new(
            source,
            config.addresses.len(),
            deadline,
            record_tx,
            status_tx,
        );
        task_spawner.spawn(listener.listen());

        let addresses = config.addresses;
        let mut sink = sink;
        task_spawner.spawn(async move {
            transmit::send_probes(&mut sink, &template, &addresses).await;
        });

        SessionHandle {
            offers: record_rx,
            status: status_rx,
            _task_spawner: task_spawner,
        }
    }
}

/// Live side of a running session. `offers` streams one record per
/// recognized Offer as it is correlated; `status` resolves exactly once with
/// the terminal outcome. Records published before the terminal status stay
/// readable afterwards, so callers may drain `offers` once `status` fires.
/// Dropping the handle abandons the session and releases its capture handles.
#[derive(Debug)]
pub struct SessionHandle {
    pub offers: mpsc::UnboundedReceiver<OfferRecord>,
    pub status: oneshot::Receiver<SessionStatus>,
    _task_spawner: BackgroundTaskSpawner,
}

#[derive(Debug)]
struct BackgroundTaskSpawner {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTaskSpawner {
    fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            handles: Vec::new(),
        }
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.token.clone();
        let handle = tokio::task::spawn(async move {
            tokio::select! {
                _ = task => {},
                _ = token.cancelled() => {}
            }
        });
        self.handles.push(handle);
    }
}

impl Drop for BackgroundTaskSpawner {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            self.token.cancel();
        }
    }
}
