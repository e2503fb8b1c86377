use std::io;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, info};

use jobwatch_events::{Delivery, EventBus, JobLifecycleEvent, Subscription};

use crate::recorder::HistoryRecorder;

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Feeds lifecycle signals from a bus subscription into a [`HistoryRecorder`].
///
/// - Subscribes before the thread starts, so nothing published after
///   `spawn` returns is missed
/// - Drives the async recorder on the given tokio runtime
/// - On shutdown, records whatever is already queued before stopping
/// - Stops when the bus is dropped
#[derive(Debug)]
pub struct RecorderWorker;

impl RecorderWorker {
    /// Spawn the worker thread.
    ///
    /// `runtime` must outlive the worker; the thread blocks on it for each
    /// signal, so it must not be called from inside that runtime's
    /// current-thread executor.
    pub fn spawn<B>(
        name: &'static str,
        bus: &B,
        recorder: HistoryRecorder,
        runtime: Handle,
    ) -> io::Result<WorkerHandle>
    where
        B: EventBus<JobLifecycleEvent> + ?Sized,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub: Subscription<JobLifecycleEvent> = bus.subscribe();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(name, sub, shutdown_rx, &recorder, &runtime))?;

        info!(worker = name, "recorder worker started");
        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn worker_loop(
    name: &'static str,
    sub: Subscription<JobLifecycleEvent>,
    shutdown_rx: mpsc::Receiver<()>,
    recorder: &HistoryRecorder,
    runtime: &Handle,
) {
    let tick = Duration::from_millis(250);

    loop {
        if shutdown_rx.try_recv().is_ok() {
            let pending = sub.drain();
            debug!(worker = name, pending = pending.len(), "flushing queued signals");
            for event in pending {
                record(name, event, recorder, runtime);
            }
            break;
        }

        match sub.next(tick) {
            Delivery::Signal(event) => record(name, event, recorder, runtime),
            Delivery::Idle => continue,
            Delivery::Closed => break,
        }
    }

    info!(worker = name, "recorder worker stopped");
}

fn record(name: &str, event: JobLifecycleEvent, recorder: &HistoryRecorder, runtime: &Handle) {
    debug!(worker = name, kind = event.kind(), job_id = ?event.job_id(), "lifecycle signal");
    runtime.block_on(recorder.handle(event));
}
