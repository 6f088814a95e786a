//! Async session driver
//!
//! ```text
//! SessionHandle ──edit()──► track_edit (sectors shift now)
//!      │                        │
//!      └──── mpsc ────► driver task ── quiet for `window` ──► reparse_generation
//! ```
//!
//! One task per model. Each edit restarts the window (`tokio::time::timeout`
//! around `recv`). The task exits on `close()` or when every handle is gone,
//! detaching the model's listeners on the way out.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{FlowdocError, Result};
use crate::model::{Reparse, WorkflowModel};
use crate::span::Delta;

enum SessionCommand {
    Edit { generation: u64, text: String },
    Flush(oneshot::Sender<Option<Reparse>>),
    Close,
}

/// Cloneable handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    model: Arc<Mutex<WorkflowModel>>,
    tx: mpsc::UnboundedSender<SessionCommand>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

/// Start the driver task for `model`. Must run inside a tokio runtime.
pub fn spawn_session(model: WorkflowModel, window: Duration) -> SessionHandle {
    let model = Arc::new(Mutex::new(model));
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(drive(Arc::clone(&model), rx, window));
    SessionHandle {
        model,
        tx,
        task: Arc::new(Mutex::new(Some(task))),
    }
}

async fn drive(
    model: Arc<Mutex<WorkflowModel>>,
    mut rx: mpsc::UnboundedReceiver<SessionCommand>,
    window: Duration,
) {
    let mut pending: Option<(u64, String)> = None;
    loop {
        let command = if pending.is_some() {
            match tokio::time::timeout(window, rx.recv()).await {
                Ok(command) => command,
                Err(_) => {
                    reparse(&model, pending.take());
                    continue;
                }
            }
        } else {
            rx.recv().await
        };

        match command {
            Some(SessionCommand::Edit { generation, text }) => {
                if pending.as_ref().map_or(true, |(queued, _)| generation > *queued) {
                    pending = Some((generation, text));
                }
            }
            Some(SessionCommand::Flush(reply)) => {
                let _ = reply.send(reparse(&model, pending.take()));
            }
            Some(SessionCommand::Close) | None => break,
        }
    }
    debug!(cancelled = pending.is_some(), "edit session stopped");
    model.lock().teardown();
}

fn reparse(model: &Mutex<WorkflowModel>, pending: Option<(u64, String)>) -> Option<Reparse> {
    let (generation, text) = pending?;
    Some(model.lock().reparse_generation(generation, &text))
}

impl SessionHandle {
    /// Shift sectors now and queue the editor's full text for reparse
    pub fn edit(&self, delta: &Delta, full_text: impl Into<String>) -> Result<u64> {
        if self.tx.is_closed() {
            return Err(FlowdocError::SessionClosed);
        }
        // queue under the lock so commands reach the driver in generation order
        let mut model = self.model.lock();
        let generation = model.track_edit(delta);
        self.tx
            .send(SessionCommand::Edit {
                generation,
                text: full_text.into(),
            })
            .map_err(|_| FlowdocError::SessionClosed)?;
        Ok(generation)
    }

    /// Reparse the pending text without waiting for the window
    pub async fn flush(&self) -> Result<Option<Reparse>> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(SessionCommand::Flush(reply))
            .map_err(|_| FlowdocError::SessionClosed)?;
        response.await.map_err(|_| FlowdocError::SessionClosed)
    }

    /// Run `f` with the model locked; do not hold it across awaits
    pub fn with_model<R>(&self, f: impl FnOnce(&mut WorkflowModel) -> R) -> R {
        f(&mut self.model.lock())
    }

    pub fn model(&self) -> Arc<Mutex<WorkflowModel>> {
        Arc::clone(&self.model)
    }

    /// Stop the driver, dropping any pending text, and wait for it to exit
    pub async fn close(&self) {
        let _ = self.tx.send(SessionCommand::Close);
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventLog;
    use crate::model::TaskData;
    use crate::span::Position;
    use tokio::time::sleep;

    const PAIR: &str = "tasks:\n  t1:\n    action: core.local\n";

    fn logged() -> (WorkflowModel, EventLog) {
        let mut model = WorkflowModel::new(PAIR).unwrap();
        let log = EventLog::new();
        model.subscribe(log.clone());
        (model, log)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_reparses_once_after_quiescence() {
        let (model, log) = logged();
        let handle = spawn_session(model, Duration::from_millis(300));

        let mut text = PAIR.to_string();
        for (i, ch) in "# todo".chars().enumerate() {
            text.push(ch);
            handle
                .edit(&Delta::insert(Position::new(3, i), ch.to_string()), text.clone())
                .unwrap();
            sleep(Duration::from_millis(100)).await;
        }
        assert!(log.is_empty());

        sleep(Duration::from_millis(400)).await;
        assert_eq!(log.count("change"), 1);
        assert_eq!(log.change_texts(), vec![text.clone()]);
        assert_eq!(handle.with_model(|m| m.text().to_string()), text);
        handle.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn flush_reparses_immediately() {
        let (model, log) = logged();
        let handle = spawn_session(model, Duration::from_secs(10));
        let text = format!("{}  t2:\n", PAIR);
        handle
            .edit(&Delta::insert(Position::new(3, 0), "  t2:\n"), text)
            .unwrap();
        let outcome = handle.flush().await.unwrap();
        assert_eq!(outcome, Some(Reparse::Applied { generation: 1 }));
        assert_eq!(handle.flush().await.unwrap(), None);
        assert_eq!(log.count("change"), 1);
        assert_eq!(handle.with_model(|m| m.tasks().len()), 2);
        handle.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn close_cancels_pending_and_detaches() {
        let (model, log) = logged();
        let handle = spawn_session(model, Duration::from_millis(300));
        handle
            .edit(&Delta::insert(Position::new(3, 0), "#"), format!("{}#", PAIR))
            .unwrap();
        handle.close().await;

        sleep(Duration::from_secs(1)).await;
        assert!(log.is_empty());
        assert!(matches!(
            handle.edit(&Delta::insert(Position::new(0, 0), "#"), "#"),
            Err(FlowdocError::SessionClosed)
        ));
        handle.with_model(|m| m.add_task(TaskData::new("t2"))).unwrap();
        assert!(log.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn older_edit_arriving_late_does_not_replace_newer_text() {
        let (mut model, log) = logged();
        let older = model.track_edit(&Delta::insert(Position::new(3, 0), "#"));
        let newer = model.track_edit(&Delta::insert(Position::new(3, 1), "x"));
        let model = Arc::new(Mutex::new(model));
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(drive(Arc::clone(&model), rx, Duration::from_millis(300)));

        let newest = format!("{}#x", PAIR);
        for (generation, text) in [(newer, newest.clone()), (older, format!("{}#", PAIR))] {
            tx.send(SessionCommand::Edit { generation, text }).unwrap();
        }
        let (reply, response) = oneshot::channel();
        tx.send(SessionCommand::Flush(reply)).unwrap();
        assert_eq!(response.await.unwrap(), Some(Reparse::Applied { generation: newer }));
        assert_eq!(log.change_texts(), vec![newest.clone()]);
        assert_eq!(model.lock().text(), newest);

        tx.send(SessionCommand::Close).unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_every_handle_stops_the_driver() {
        let (model, _log) = logged();
        let handle = spawn_session(model, Duration::from_millis(300));
        let shared = handle.model();
        drop(handle);
        sleep(Duration::from_millis(1)).await;
        assert_eq!(Arc::strong_count(&shared), 1);
    }
}
