use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::io::store::TaskStore;
use crate::model::project::ProjectType;
use crate::model::task::MainTask;

/// Counts reported when the saver shuts down
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub saves: usize,
    pub failures: usize,
}

enum Message {
    Save(Vec<MainTask>),
    Flush(Sender<()>),
}

/// Coalesces bursts of task-list snapshots into a single write once the
/// list has been quiet for the debounce delay. Only the newest snapshot is
/// written. Save failures are logged and counted, never retried.
pub struct DebouncedSaver {
    tx: Option<Sender<Message>>,
    handle: Option<JoinHandle<SaveReport>>,
}

impl DebouncedSaver {
    pub fn spawn(store: Arc<dyn TaskStore>, project: ProjectType, delay: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || run(store.as_ref(), project, delay, rx));
        DebouncedSaver {
            tx: Some(tx),
            handle: Some(handle),
        }
    }

    /// Queue a snapshot, restarting the quiet period.
    pub fn schedule(&self, tasks: Vec<MainTask>) {
        if let Some(tx) = &self.tx
            && tx.send(Message::Save(tasks)).is_err()
        {
            tracing::error!("autosave worker is gone; snapshot dropped");
        }
    }

    /// Write any pending snapshot now and wait until it is done.
    pub fn flush(&self) {
        let Some(tx) = &self.tx else { return };
        let (ack_tx, ack_rx) = mpsc::channel();
        if tx.send(Message::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }

    /// Stop the worker, writing whatever is still pending.
    pub fn finish(mut self) -> SaveReport {
        self.shutdown()
    }

    fn shutdown(&mut self) -> SaveReport {
        drop(self.tx.take());
        match self.handle.take().map(JoinHandle::join) {
            Some(Ok(report)) => report,
            Some(Err(_)) => {
                tracing::error!("autosave worker panicked");
                SaveReport::default()
            }
            None => SaveReport::default(),
        }
    }
}

impl Drop for DebouncedSaver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(
    store: &dyn TaskStore,
    project: ProjectType,
    delay: Duration,
    rx: Receiver<Message>,
) -> SaveReport {
    let mut report = SaveReport::default();
    let mut pending: Option<Vec<MainTask>> = None;

    loop {
        let message = if pending.is_some() {
            match rx.recv_timeout(delay) {
                Ok(m) => m,
                Err(RecvTimeoutError::Timeout) => {
                    write(store, project, pending.take(), &mut report);
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match rx.recv() {
                Ok(m) => m,
                Err(_) => break,
            }
        };

        match message {
            Message::Save(tasks) => pending = Some(tasks),
            Message::Flush(ack) => {
                write(store, project, pending.take(), &mut report);
                let _ = ack.send(());
            }
        }
    }

    write(store, project, pending.take(), &mut report);
    report
}

fn write(
    store: &dyn TaskStore,
    project: ProjectType,
    tasks: Option<Vec<MainTask>>,
    report: &mut SaveReport,
) {
    let Some(tasks) = tasks else { return };
    match store.save_tasks(project, &tasks) {
        Ok(()) => report.saves += 1,
        Err(e) => {
            report.failures += 1;
            tracing::error!(project = %project, error = %e, "failed to save tasks");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::store::MemoryStore;

    fn list(titles: &[&str]) -> Vec<MainTask> {
        titles
            .iter()
            .enumerate()
            .map(|(i, t)| MainTask::new(format!("task-{}", i), t.to_string()))
            .collect()
    }

    #[test]
    fn burst_is_coalesced_into_one_write() {
        let store = Arc::new(MemoryStore::new());
        let saver = DebouncedSaver::spawn(store.clone(), ProjectType::Build, Duration::from_secs(60));
        saver.schedule(list(&["a"]));
        saver.schedule(list(&["a", "b"]));
        saver.schedule(list(&["a", "b", "c"]));
        let report = saver.finish();

        assert_eq!(report, SaveReport { saves: 1, failures: 0 });
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.load_tasks(ProjectType::Build).unwrap().len(), 3);
    }

    #[test]
    fn quiet_period_triggers_write() {
        let store = Arc::new(MemoryStore::new());
        let saver = DebouncedSaver::spawn(store.clone(), ProjectType::Destroy, Duration::from_millis(20));
        saver.schedule(list(&["a"]));
        for _ in 0..200 {
            if store.save_count() > 0 {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(store.save_count(), 1);
        assert_eq!(saver.finish().saves, 1);
    }

    #[test]
    fn each_schedule_restarts_the_quiet_window() {
        let store = Arc::new(MemoryStore::new());
        let delay = Duration::from_millis(300);
        let saver = DebouncedSaver::spawn(store.clone(), ProjectType::Build, delay);

        // 10 edits 50ms apart span well past one quiet window
        let titles = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"];
        let started = std::time::Instant::now();
        for n in 1..=titles.len() {
            saver.schedule(list(&titles[..n]));
            thread::sleep(Duration::from_millis(50));
        }
        assert!(started.elapsed() > delay);
        assert_eq!(store.save_count(), 0);

        for _ in 0..500 {
            if store.save_count() > 0 {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.load_tasks(ProjectType::Build).unwrap().len(), titles.len());
        assert_eq!(saver.finish().saves, 1);
    }

    #[test]
    fn flush_writes_immediately() {
        let store = Arc::new(MemoryStore::new());
        let saver = DebouncedSaver::spawn(store.clone(), ProjectType::Build, Duration::from_secs(60));
        saver.schedule(list(&["a", "b"]));
        saver.flush();
        assert_eq!(store.save_count(), 1);

        // nothing pending: flush is a no-op
        saver.flush();
        assert_eq!(saver.finish().saves, 1);
    }

    #[test]
    fn failures_are_counted_not_retried() {
        let store = Arc::new(MemoryStore::new());
        store.fail_saves(true);
        let saver = DebouncedSaver::spawn(store.clone(), ProjectType::Build, Duration::from_secs(60));
        saver.schedule(list(&["a"]));
        saver.flush();
        let report = saver.finish();
        assert_eq!(report, SaveReport { saves: 0, failures: 1 });
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn drop_saves_pending() {
        let store = Arc::new(MemoryStore::new());
        {
            let saver =
                DebouncedSaver::spawn(store.clone(), ProjectType::Build, Duration::from_secs(60));
            saver.schedule(list(&["a"]));
        }
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn nothing_scheduled_nothing_saved() {
        let store = Arc::new(MemoryStore::new());
        let saver = DebouncedSaver::spawn(store.clone(), ProjectType::Build, Duration::from_millis(5));
        assert_eq!(saver.finish(), SaveReport::default());
        assert_eq!(store.save_count(), 0);
    }
}
