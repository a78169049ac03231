//! Entity report export: handles, the scoped cursor and the background stream.
//!
//! An export goes through open, repeated fetch-next, then close. The
//! handle must be closed exactly once per successful open, including when
//! the consumer stops early.
//!
//! ```text
//!   export_*_entity_report ──► Open ──fetch_next──► fragment ... "" (end)
//!                                │
//!                                └──close_export_report──► Closed
//! ```
//!
//! [`ExportReport`] ties the close to scope. [`EntityReportStream`] drives the
//! whole loop on a blocking task and hands fragments to an async consumer.

use crate::component::details;
use crate::engine::SzEngine;
use crate::error::{SzError, SzResult};
use crate::flags::SzFlags;
use std::fmt;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

/// Fragments buffered between the export producer and its consumer.
pub const EXPORT_CHANNEL_CAPACITY: usize = 16;

/// Opaque token for one open export cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExportHandle(usize);

impl ExportHandle {
    pub fn from_raw(raw: usize) -> Self {
        ExportHandle(raw)
    }

    pub fn as_raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for ExportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which report an export opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportFormat {
    /// CSV rows; an empty column list selects the default columns.
    Csv { csv_column_list: String },
    /// One JSON entity document per line.
    Json,
}

impl ExportFormat {
    fn open(&self, engine: &SzEngine, flags: SzFlags) -> SzResult<ExportHandle> {
        match self {
            ExportFormat::Csv { csv_column_list } => engine.export_csv_entity_report(csv_column_list, flags),
            ExportFormat::Json => engine.export_json_entity_report(flags),
        }
    }

    fn message_number(&self) -> u32 {
        match self {
            ExportFormat::Csv { .. } => 8007,
            ExportFormat::Json => 8009,
        }
    }
}

/// Scoped export cursor. The handle is closed when the report is dropped.
///
/// Iterating yields fragments until the end of the report. A fetch error is
/// yielded once and ends the iteration.
pub struct ExportReport {
    engine: SzEngine,
    handle: ExportHandle,
    closed: bool,
    exhausted: bool,
}

impl ExportReport {
    pub(crate) fn open(engine: &SzEngine, format: &ExportFormat, flags: SzFlags) -> SzResult<Self> {
        let handle = format.open(engine, flags)?;
        Ok(Self {
            engine: engine.clone(),
            handle,
            closed: false,
            exhausted: false,
        })
    }

    pub fn handle(&self) -> ExportHandle {
        self.handle
    }

    /// Next fragment, or `None` once the report is exhausted.
    pub fn fetch_next(&mut self) -> SzResult<Option<String>> {
        if self.exhausted {
            return Ok(None);
        }
        let fragment = self.engine.fetch_next(self.handle)?;
        if fragment.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }
        Ok(Some(fragment))
    }

    /// Reads the remaining fragments into one string.
    pub fn read_to_string(&mut self) -> SzResult<String> {
        let mut report = String::new();
        while let Some(fragment) = self.fetch_next()? {
            report.push_str(&fragment);
        }
        Ok(report)
    }

    /// Closes the handle now and reports the outcome.
    pub fn close(mut self) -> SzResult<()> {
        self.closed = true;
        self.engine.close_export_report(self.handle)
    }
}

impl Iterator for ExportReport {
    type Item = SzResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.fetch_next() {
            Ok(fragment) => fragment.map(Ok),
            Err(e) => {
                self.exhausted = true;
                Some(Err(e))
            }
        }
    }
}

impl Drop for ExportReport {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.engine.close_export_report(self.handle) {
            tracing::warn!(handle = %self.handle, error = %e, "Failed to close export report on drop");
        }
    }
}

impl fmt::Debug for ExportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportReport")
            .field("handle", &self.handle)
            .field("closed", &self.closed)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

/// Consumer side of a background export.
///
/// Fragments arrive in report order. An error, including
/// [`SzError::Cancelled`], is always the last item.
#[derive(Debug)]
pub struct EntityReportStream {
    rx: mpsc::Receiver<SzResult<String>>,
    cancel: CancellationToken,
    producer: JoinHandle<()>,
}

impl EntityReportStream {
    pub(crate) fn spawn(engine: &SzEngine, format: ExportFormat, flags: SzFlags) -> SzResult<Self> {
        let runtime = Handle::try_current()
            .map_err(|_| SzError::config("export streams must be started inside a Tokio runtime"))?;
        let (tx, rx) = mpsc::channel(EXPORT_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        let producer = {
            let engine = engine.clone();
            let cancel = cancel.clone();
            let producer_runtime = runtime.clone();
            runtime.spawn_blocking(move || {
                ExportProducer {
                    engine,
                    runtime: producer_runtime,
                    tx,
                    cancel,
                }
                .run(format, flags)
            })
        };

        Ok(Self { rx, cancel, producer })
    }

    /// Next item, or `None` once the producer has finished.
    pub async fn next(&mut self) -> Option<SzResult<String>> {
        self.rx.recv().await
    }

    /// Blocking variant of [`next`](Self::next) for synchronous consumers.
    ///
    /// # Panics
    ///
    /// Panics if called from within an async execution context.
    pub fn blocking_next(&mut self) -> Option<SzResult<String>> {
        self.rx.blocking_recv()
    }

    /// Asks the producer to stop before its next fetch.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Converts into a [`futures`-style](tokio_stream::Stream) stream.
    ///
    /// The producer keeps running detached until the report ends or the
    /// stream is dropped.
    pub fn into_stream(self) -> ReceiverStream<SzResult<String>> {
        ReceiverStream::new(self.rx)
    }

    /// Drops unread fragments and waits for the producer to finish.
    ///
    /// A panic in the producer, raised when the handle cannot be closed, is
    /// resumed on the caller.
    pub async fn join(self) {
        let Self { rx, cancel, producer } = self;
        cancel.cancel();
        drop(rx);
        if let Err(e) = producer.await {
            if e.is_panic() {
                std::panic::resume_unwind(e.into_panic());
            }
        }
    }
}

enum Delivery {
    Sent,
    Cancelled,
    ConsumerGone,
}

/// Runs open, fetch and close on one blocking thread.
struct ExportProducer {
    engine: SzEngine,
    runtime: Handle,
    tx: mpsc::Sender<SzResult<String>>,
    cancel: CancellationToken,
}

impl ExportProducer {
    fn run(self, format: ExportFormat, flags: SzFlags) {
        let handle = match format.open(&self.engine, flags) {
            Ok(handle) => handle,
            Err(e) => {
                self.finish(&format, flags, Some(&e));
                self.fail(e);
                return;
            }
        };
        tracing::debug!(%handle, "Export stream opened");

        let mut fragments = 0usize;
        let mut failure = None;
        loop {
            if self.cancel.is_cancelled() {
                self.mark_cancelled();
                break;
            }
            match self.engine.fetch_next(handle) {
                Ok(fragment) if fragment.is_empty() => break,
                Ok(fragment) => match self.deliver(Ok(fragment)) {
                    Delivery::Sent => fragments += 1,
                    Delivery::Cancelled => {
                        self.mark_cancelled();
                        break;
                    }
                    Delivery::ConsumerGone => {
                        tracing::debug!(%handle, "Export consumer dropped, stopping");
                        break;
                    }
                },
                Err(e) => {
                    failure = Some(e.clone());
                    self.fail(e);
                    break;
                }
            }
        }

        if let Err(e) = self.engine.close_export_report(handle) {
            tracing::error!(%handle, error = %e, "Failed to close export handle; native resources leaked");
            panic!("export handle {} could not be closed: {}", handle, e);
        }
        tracing::debug!(%handle, fragments, "Export stream closed");
        self.finish(&format, flags, failure.as_ref());
    }

    /// Sends a fragment, giving up if the consumer cancels or goes away.
    fn deliver(&self, item: SzResult<String>) -> Delivery {
        self.runtime.block_on(async {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Delivery::Cancelled,
                sent = self.tx.send(item) => match sent {
                    Ok(()) => Delivery::Sent,
                    Err(_) => Delivery::ConsumerGone,
                },
            }
        })
    }

    /// Sends a native failure as the last item, waiting for room in the
    /// channel. It is lost only if the consumer cancels or goes away first.
    fn fail(&self, error: SzError) {
        let reported = error.to_string();
        match self.deliver(Err(error)) {
            Delivery::Sent => {}
            Delivery::Cancelled => {
                tracing::warn!(error = %reported, "Export stream cancelled before its error was delivered")
            }
            Delivery::ConsumerGone => {
                tracing::warn!(error = %reported, "Export consumer dropped before its error was delivered")
            }
        }
    }

    /// Marks a cancelled stream without blocking on a consumer that has
    /// stopped reading.
    fn mark_cancelled(&self) {
        if self.tx.try_send(Err(SzError::Cancelled)).is_err() {
            tracing::debug!("Export cancellation marker not delivered");
        }
    }

    fn finish(&self, format: &ExportFormat, flags: SzFlags, error: Option<&SzError>) {
        let component = self.engine.component();
        if !component.observers().is_active() {
            return;
        }
        let details = match format {
            ExportFormat::Csv { csv_column_list } => {
                details!["csvColumnList" => csv_column_list, "flags" => flags]
            }
            ExportFormat::Json => details!["flags" => flags],
        };
        component.notify(format.message_number(), details, error);
    }
}
