use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use gmti_config::{EngineEndpoints, constants::MIN_POLL_INTERVAL_MS};
use gmti_model::TelemetrySnapshot;
use reqwest::{Client, Url};
use tokio::{
    sync::mpsc,
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::wire::{SubmissionPayload, SubmissionReceipt, parse_snapshot};
use crate::error::TransportError;

/// Completion of one tagged telemetry request.
#[derive(Debug)]
pub struct FetchOutcome {
    pub sequence: u64,
    pub result: Result<TelemetrySnapshot, TransportError>,
}

#[derive(Debug)]
struct Ticker {
    token: CancellationToken,
    period: Duration,
}

/// Issues tagged fetches and delivers their completions in whatever order
/// they finish.
#[derive(Debug, Clone)]
struct Fetcher {
    http: Client,
    url: Url,
    sequence: Arc<AtomicU64>,
    results: mpsc::UnboundedSender<FetchOutcome>,
}

impl Fetcher {
    fn issue(&self) -> u64 {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let http = self.http.clone();
        let url = self.url.clone();
        let results = self.results.clone();
        tokio::spawn(async move {
            let result = fetch_snapshot(&http, &url).await;
            trace!(sequence, ok = result.is_ok(), "telemetry fetch finished");
            let _ = results.send(FetchOutcome { sequence, result });
        });
        sequence
    }
}

/// HTTP side of the console: periodic telemetry polling and configuration
/// submission.
#[derive(Debug)]
pub struct TelemetryClient {
    fetcher: Fetcher,
    endpoints: EngineEndpoints,
    submit_timeout: Duration,
    ticker: Option<Ticker>,
}

impl TelemetryClient {
    /// Completions of polled fetches arrive on the returned receiver.
    pub fn new(
        endpoints: EngineEndpoints,
        submit_timeout: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<FetchOutcome>) {
        // Don't set a global timeout, submissions carry their own
        let http = Client::builder()
            .pool_max_idle_per_host(4)
            .build()
            .unwrap_or_else(|_| Client::new());
        let (results, result_rx) = mpsc::unbounded_channel();
        let fetcher = Fetcher {
            http,
            url: endpoints.telemetry_url(),
            sequence: Arc::new(AtomicU64::new(0)),
            results,
        };
        let client = Self {
            fetcher,
            endpoints,
            submit_timeout,
            ticker: None,
        };
        (client, result_rx)
    }

    /// Begin ticking every `period`, replacing any running ticker. Fetches
    /// already in flight keep going. The first tick fires immediately.
    /// Periods below [`MIN_POLL_INTERVAL_MS`] are raised to it.
    pub fn start_polling(&mut self, period: Duration) {
        self.stop_polling();

        let period = clamp_period(period);

        let token = CancellationToken::new();
        let cancel = token.clone();
        let fetcher = self.fetcher.clone();
        tokio::spawn(async move {
            let mut ticks = interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticks.tick() => {
                        if fetcher.results.is_closed() {
                            break;
                        }
                        fetcher.issue();
                    }
                }
            }
            trace!("telemetry ticker stopped");
        });

        debug!(
            period_ms = period.as_millis() as u64,
            "telemetry polling started"
        );
        self.ticker = Some(Ticker { token, period });
    }

    /// Halt the ticker. Returns whether one was running.
    pub fn stop_polling(&mut self) -> bool {
        match self.ticker.take() {
            Some(ticker) => {
                ticker.token.cancel();
                debug!("telemetry polling stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_polling(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn poll_period(&self) -> Option<Duration> {
        self.ticker.as_ref().map(|t| t.period)
    }

    /// Issue one tagged fetch outside the ticker.
    pub fn request_snapshot(&self) -> u64 {
        self.fetcher.issue()
    }

    /// Highest sequence number handed out so far.
    pub fn last_issued(&self) -> u64 {
        self.fetcher.sequence.load(Ordering::SeqCst)
    }

    /// One untagged fetch, awaited in place.
    pub async fn fetch(&self) -> Result<TelemetrySnapshot, TransportError> {
        fetch_snapshot(&self.fetcher.http, &self.fetcher.url).await
    }

    /// Send a run configuration. Times out after the configured submit
    /// window.
    pub async fn submit_configuration(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionReceipt, TransportError> {
        submit(
            &self.fetcher.http,
            self.endpoints.submission_url(),
            self.submit_timeout,
            payload,
        )
        .await
    }

    /// Owned future for running a submission on another task.
    pub fn submission(
        &self,
        payload: SubmissionPayload,
    ) -> impl Future<Output = Result<SubmissionReceipt, TransportError>>
    + Send
    + 'static {
        let http = self.fetcher.http.clone();
        let url = self.endpoints.submission_url();
        let timeout = self.submit_timeout;
        async move { submit(&http, url, timeout, &payload).await }
    }
}

/// Poll period with the minimum applied.
pub fn clamp_period(period: Duration) -> Duration {
    period.max(Duration::from_millis(MIN_POLL_INTERVAL_MS))
}

impl Drop for TelemetryClient {
    fn drop(&mut self) {
        self.stop_polling();
    }
}

async fn fetch_snapshot(
    http: &Client,
    url: &Url,
) -> Result<TelemetrySnapshot, TransportError> {
    let response = http
        .get(url.clone())
        .send()
        .await
        .map_err(|err| TransportError::from_reqwest(url.as_str(), err))?;
    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let body = response
        .bytes()
        .await
        .map_err(|err| TransportError::from_reqwest(url.as_str(), err))?;
    parse_snapshot(&body).map_err(|source| TransportError::Malformed {
        url: url.to_string(),
        source,
    })
}

async fn submit(
    http: &Client,
    url: Url,
    timeout: Duration,
    payload: &SubmissionPayload,
) -> Result<SubmissionReceipt, TransportError> {
    let map_err = |err: reqwest::Error| {
        if err.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
                timeout,
            }
        } else {
            TransportError::from_reqwest(url.as_str(), err)
        }
    };

    let response = http
        .post(url.clone())
        .json(payload)
        .timeout(timeout)
        .send()
        .await
        .map_err(map_err)?;
    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let body = response.bytes().await.map_err(map_err)?;
    Ok(SubmissionReceipt::parse(&body))
}
