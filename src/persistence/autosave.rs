//! Debounced background saving.
//!
//! Every edit hands the saver a full snapshot. A write happens only after the
//! quiet period passes with no newer snapshot, so a burst of edits becomes a
//! single write of the last state. Failures are published, never retried.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use super::store::ScheduleStore;
use crate::schedule::ScheduleRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    Saving,
    Saved { at: DateTime<Utc> },
    Failed { message: String },
}

pub struct AutoSaver {
    tx: mpsc::UnboundedSender<ScheduleRecord>,
    status: watch::Receiver<SaveStatus>,
    worker: JoinHandle<()>,
}

impl AutoSaver {
    /// Start the background saver on the current tokio runtime.
    pub fn spawn(store: Arc<dyn ScheduleStore>, quiet_period: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(SaveStatus::Idle);
        let worker = tokio::spawn(run(store, quiet_period, rx, status_tx));
        Self { tx, status, worker }
    }

    /// Queue `record` to be written once edits go quiet, replacing anything
    /// still waiting.
    pub fn schedule(&self, record: ScheduleRecord) {
        if self.tx.send(record).is_err() {
            error!("autosave worker has stopped; edit not queued");
        }
    }

    pub fn status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    /// Write whatever is still waiting right away and stop the worker.
    pub async fn flush(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            error!(error = %e, "autosave worker panicked");
        }
    }
}

async fn run(
    store: Arc<dyn ScheduleStore>,
    quiet_period: Duration,
    mut rx: mpsc::UnboundedReceiver<ScheduleRecord>,
    status: watch::Sender<SaveStatus>,
) {
    let mut pending: Option<ScheduleRecord> = None;
    loop {
        match pending.take() {
            None => match rx.recv().await {
                Some(record) => pending = Some(record),
                None => break,
            },
            Some(record) => {
                tokio::select! {
                    next = rx.recv() => match next {
                        Some(newer) => {
                            debug!("edit arrived during quiet period; restarting autosave timer");
                            pending = Some(newer);
                        }
                        None => {
                            write(store.as_ref(), &record, &status).await;
                            break;
                        }
                    },
                    _ = tokio::time::sleep(quiet_period) => {
                        write(store.as_ref(), &record, &status).await;
                    }
                }
            }
        }
    }
}

async fn write(store: &dyn ScheduleStore, record: &ScheduleRecord, status: &watch::Sender<SaveStatus>) {
    status.send_replace(SaveStatus::Saving);
    match store.save(record).await {
        Ok(_) => {
            status.send_replace(SaveStatus::Saved { at: Utc::now() });
        }
        Err(e) => {
            error!(owner = %record.owner_id, error = %e, "autosave failed");
            status.send_replace(SaveStatus::Failed {
                message: e.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::store::MemoryStore;
    use crate::schedule::{ScheduleTask, TimeWindow};

    fn record_at(start: &str) -> ScheduleRecord {
        let task = ScheduleTask::new("a", "Roast chicken", start.parse().unwrap(), 30).unwrap();
        ScheduleRecord::new("chef", vec!["a".into()], vec![task], TimeWindow::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_is_one_write_of_last_state() {
        let store = Arc::new(MemoryStore::new());
        let saver = AutoSaver::spawn(store.clone(), Duration::from_secs(1));

        for start in ["06:15", "06:30", "06:45", "07:00", "07:15"] {
            saver.schedule(record_at(start));
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        assert_eq!(store.write_count(), 0);

        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(store.write_count(), 1);
        let saved = store.load_latest("chef").await.unwrap().unwrap();
        assert_eq!(saved.schedule_tasks[0].start_time().to_string(), "07:15");
        assert!(matches!(saver.status(), SaveStatus::Saved { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_edits_are_separate_writes() {
        let store = Arc::new(MemoryStore::new());
        let saver = AutoSaver::spawn(store.clone(), Duration::from_secs(1));
        saver.schedule(record_at("06:15"));
        tokio::time::sleep(Duration::from_secs(2)).await;
        saver.schedule(record_at("06:30"));
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_reported_not_retried() {
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);
        let saver = AutoSaver::spawn(store.clone(), Duration::from_secs(1));
        saver.schedule(record_at("06:15"));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(matches!(saver.status(), SaveStatus::Failed { .. }));

        store.set_failing(false);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_writes_pending_immediately() {
        let store = Arc::new(MemoryStore::new());
        let saver = AutoSaver::spawn(store.clone(), Duration::from_secs(60));
        saver.schedule(record_at("09:00"));
        saver.flush().await;
        assert_eq!(store.write_count(), 1);
    }
}
