//! Periodic status reporter.
//!
//! Samples the store on a fixed period and logs the request count and the
//! number of stored keys until the stop signal closes.

use std::{fmt, sync::Arc, time::Duration};

use tokio::{select, sync::mpsc, time};
use tracing::info;

use crate::{lifecycle::StopSignal, store::Store};

/// Default period between two reports.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Shortest period the reporter accepts; `tokio::time::interval` rejects zero.
pub const MIN_REPORT_INTERVAL: Duration = Duration::from_millis(1);

/// One status sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub requests: u64,
    pub db_size: usize,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Current requests: {}, Database size: {}",
            self.requests, self.db_size
        )
    }
}

pub struct Reporter {
    store: Arc<Store>,
    period: Duration,
    sink: Option<mpsc::UnboundedSender<Report>>,
}

impl Reporter {
    /// Periods shorter than [`MIN_REPORT_INTERVAL`] are raised to it.
    pub fn new(store: Arc<Store>, period: Duration) -> Self {
        Self {
            store,
            period: period.max(MIN_REPORT_INTERVAL),
            sink: None,
        }
    }

    /// Forwards every report to `sink` in addition to logging it.
    pub fn with_sink(mut self, sink: mpsc::UnboundedSender<Report>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Reports once per period until `stop` closes.
    ///
    /// The first report is emitted one full period after start. A close that
    /// lands between ticks ends the loop immediately.
    pub async fn run(self, stop: StopSignal) {
        info!(period_ms = self.period.as_millis() as u64, "reporter started");

        let mut interval = time::interval(self.period);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;

        loop {
            select! {
                biased;

                _ = stop.closed() => {
                    info!("reporter stopped");
                    break;
                }

                _ = interval.tick() => self.emit(),
            }
        }
    }

    fn emit(&self) {
        let stats = self.store.observe();
        let report = Report {
            requests: stats.requests,
            db_size: stats.db_size,
        };
        info!(requests = report.requests, db_size = report.db_size, "{report}");

        if let Some(sink) = &self.sink {
            // A dropped receiver only means nobody is listening anymore.
            let _ = sink.send(report);
        }
    }
}
