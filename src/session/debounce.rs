//! EditSession - debounce state machine with an explicit clock
//!
//! Callers pass `Instant`s in, so tests and editor integrations decide when
//! time passes. Sectors shift on `push`; the reparse waits for `poll` past the
//! deadline (or `flush`).

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::error::{FlowdocError, Result};
use crate::model::{Reparse, WorkflowModel};
use crate::span::Delta;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    /// Edit buffered, window running
    Pending,
    Reparsing,
    Applied,
    /// Last reparse failed; the model keeps its last good state
    ErrorState,
    Closed,
}

#[derive(Debug)]
struct PendingEdit {
    generation: u64,
    text: String,
    deadline: Instant,
}

#[derive(Debug)]
pub struct EditSession {
    model: WorkflowModel,
    window: Duration,
    state: SessionState,
    pending: Option<PendingEdit>,
    reparses: usize,
}

impl EditSession {
    /// Session with the model's configured window
    pub fn new(model: WorkflowModel) -> Self {
        let window = model.config().debounce();
        Self::with_window(model, window)
    }

    pub fn with_window(model: WorkflowModel, window: Duration) -> Self {
        Self {
            model,
            window,
            state: SessionState::Idle,
            pending: None,
            reparses: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn model(&self) -> &WorkflowModel {
        &self.model
    }

    /// Structural mutations go through here; a pending text edit older than
    /// the mutation is discarded when its window ends
    pub fn model_mut(&mut self) -> &mut WorkflowModel {
        &mut self.model
    }

    pub fn into_model(self) -> WorkflowModel {
        self.model
    }

    /// Reparses run so far
    pub fn reparse_count(&self) -> usize {
        self.reparses
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Buffer an editor edit; the new text replaces any text still waiting
    pub fn push(&mut self, delta: &Delta, full_text: impl Into<String>, now: Instant) -> Result<u64> {
        if self.state == SessionState::Closed {
            return Err(FlowdocError::SessionClosed);
        }
        let generation = self.model.track_edit(delta);
        if let Some(previous) = &self.pending {
            debug!(superseded = previous.generation, generation, "pending text superseded");
        }
        self.pending = Some(PendingEdit {
            generation,
            text: full_text.into(),
            deadline: now + self.window,
        });
        self.state = SessionState::Pending;
        Ok(generation)
    }

    /// Reparse if the window has elapsed at `now`
    pub fn poll(&mut self, now: Instant) -> Option<Reparse> {
        match &self.pending {
            Some(pending) if now >= pending.deadline => self.run(),
            _ => None,
        }
    }

    /// Reparse now, whatever the deadline
    pub fn flush(&mut self) -> Option<Reparse> {
        self.run()
    }

    fn run(&mut self) -> Option<Reparse> {
        let pending = self.pending.take()?;
        self.state = SessionState::Reparsing;
        let outcome = self.model.reparse_generation(pending.generation, &pending.text);
        self.reparses += 1;
        self.state = match &outcome {
            Reparse::Applied { .. } => SessionState::Applied,
            Reparse::Failed(_) => SessionState::ErrorState,
            Reparse::Stale => SessionState::Idle,
        };
        Some(outcome)
    }

    /// Cancel the pending reparse and detach every listener
    pub fn close(&mut self) {
        self.pending = None;
        self.model.teardown();
        self.state = SessionState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventLog;
    use crate::model::TaskData;
    use crate::span::Position;

    const PAIR: &str = "tasks:\n  t1:\n    action: core.local\n";

    fn session() -> (EditSession, EventLog) {
        let mut model = WorkflowModel::new(PAIR).unwrap();
        let log = EventLog::new();
        model.subscribe(log.clone());
        (EditSession::with_window(model, Duration::from_millis(300)), log)
    }

    /// Type `chars` at the start of row 3, one edit every 50 ms
    fn type_comment(session: &mut EditSession, start: Instant, chars: &str) -> String {
        let mut text = PAIR.to_string();
        for (i, ch) in chars.chars().enumerate() {
            text.push(ch);
            let now = start + Duration::from_millis(50 * i as u64);
            session
                .push(&Delta::insert(Position::new(3, i), ch.to_string()), text.clone(), now)
                .unwrap();
            assert_eq!(session.poll(now), None);
        }
        text
    }

    #[test]
    fn burst_collapses_into_one_reparse() {
        let (mut session, log) = session();
        let start = Instant::now();
        let text = type_comment(&mut session, start, "# note");
        assert_eq!(session.state(), SessionState::Pending);

        let last = start + Duration::from_millis(250);
        assert_eq!(session.poll(last + Duration::from_millis(299)), None);
        let outcome = session.poll(last + Duration::from_millis(300));
        assert_eq!(outcome, Some(Reparse::Applied { generation: 6 }));
        assert_eq!(session.state(), SessionState::Applied);
        assert_eq!(session.reparse_count(), 1);
        assert_eq!(log.change_texts(), vec![text]);
    }

    #[test]
    fn parse_failure_enters_error_state() {
        let (mut session, log) = session();
        let now = Instant::now();
        let text = format!("{}  t2: [\n", PAIR);
        session
            .push(&Delta::insert(Position::new(3, 0), "  t2: [\n"), text, now)
            .unwrap();
        assert!(matches!(session.flush(), Some(Reparse::Failed(_))));
        assert_eq!(session.state(), SessionState::ErrorState);
        assert_eq!(session.model().text(), PAIR);
        assert_eq!(log.count("yaml-error"), 1);

        let text = format!("{}  t2:\n", PAIR);
        session
            .push(&Delta::new(crate::span::Range::from_points((3, 5), (4, 0)), "\n"), text, now)
            .unwrap();
        assert_eq!(session.state(), SessionState::Pending);
        assert!(matches!(session.flush(), Some(Reparse::Applied { .. })));
        assert_eq!(session.model().tasks().len(), 2);
    }

    #[test]
    fn structural_change_supersedes_pending_text() {
        let (mut session, log) = session();
        let now = Instant::now();
        session
            .push(&Delta::insert(Position::new(3, 0), "#"), format!("{}#", PAIR), now)
            .unwrap();
        session
            .model_mut()
            .add_task(TaskData::new("t2"))
            .unwrap();
        assert_eq!(session.poll(now + Duration::from_secs(1)), Some(Reparse::Stale));
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(log.count("change"), 1);
        assert!(session.model().text().ends_with("  t2:\n"));
    }

    #[test]
    fn close_cancels_and_detaches() {
        let (mut session, log) = session();
        let now = Instant::now();
        session
            .push(&Delta::insert(Position::new(3, 0), "#"), format!("{}#", PAIR), now)
            .unwrap();
        session.close();
        assert_eq!(session.deadline(), None);
        assert_eq!(session.poll(now + Duration::from_secs(1)), None);
        assert!(matches!(
            session.push(&Delta::insert(Position::new(0, 0), "#"), "#", now),
            Err(FlowdocError::SessionClosed)
        ));
        session.model_mut().add_task(TaskData::new("t2")).unwrap();
        assert!(log.is_empty());
    }
}
