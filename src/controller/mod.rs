//! Work-session controller.
//!
//! Clicks on work chips become actions on a single queue. One worker task applies them in
//! order, so two start/stop flows never interleave their session-log writes. While a flow is in
//! flight the controller is `Busy` and further clicks are dropped.

mod action_queue;
pub mod chips;

use crate::automation::RenameAutomation;
use crate::domain::{decode, encode, minutes_from_millis, Phase, WorkState};
use crate::error::{ControlError, FlowError, LogError, RenameError};
use crate::notifications::{Notice, Notifier};
use crate::page::{watch, HostPage, NodeId, WaitPolicy, WatchOptions};
use crate::persistence::{CompletionPopupPreference, SessionLogStore};
use action_queue::{Action, ActionRx, ActionTx};
use std::sync::Arc;
use tokio::sync::{oneshot, watch as state};
use tokio::task::JoinHandle;

/// What happened to the title after a stop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed(String),
    /// Nothing to add: the session rounded to zero minutes
    Skipped,
    Failed(RenameError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopReport {
    pub base_title: String,
    pub minutes: u64,
    pub rename: RenameOutcome,
}

/// Result of one toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowReport {
    Started { base_title: String, start: i64 },
    Stopped(StopReport),
}

/// Everything the controller works with
#[derive(Clone)]
pub struct Collaborators {
    pub page: Arc<dyn HostPage>,
    pub log: SessionLogStore,
    pub notifier: Arc<dyn Notifier>,
    pub completion_popup: CompletionPopupPreference,
    pub wait_policy: WaitPolicy,
}

pub type FlowResult = Result<FlowReport, FlowError>;
pub type FlowReceiver = oneshot::Receiver<FlowResult>;

pub struct WorkController {
    page: Arc<dyn HostPage>,
    log: SessionLogStore,
    actions: ActionTx,
    phase: Arc<state::Sender<Phase>>,
    worker: JoinHandle<()>,
}

impl WorkController {
    /// Create the controller and start its worker task
    pub fn spawn(parts: Collaborators) -> Self {
        let (actions, rx) = action_queue::channel();
        let phase = Arc::new(state::Sender::new(Phase::Idle));
        let worker = Worker {
            rename: RenameAutomation::new(parts.page.clone(), parts.wait_policy),
            page: parts.page.clone(),
            log: parts.log.clone(),
            notifier: parts.notifier,
            completion_popup: parts.completion_popup,
            phase: phase.clone(),
        };
        let worker = tokio::spawn(worker.run(rx));

        Self {
            page: parts.page,
            log: parts.log,
            actions,
            phase,
            worker,
        }
    }

    /// Open the default session, add chips to every row and keep adding them to new rows
    pub async fn boot(&self) -> Result<JoinHandle<()>, LogError> {
        self.log.ensure_open_session(self.log.idle_label()).await?;
        self.augment_all().await?;

        let page = self.page.clone();
        let log = self.log.clone();
        let phase = self.phase.clone();
        let mut added = watch(
            page.clone(),
            page.root(),
            chips::ROW,
            WatchOptions::default(),
        );
        Ok(tokio::spawn(async move {
            while let Some(row) = added.recv().await {
                let open = match log.current_session().await {
                    Ok(open) => open,
                    Err(e) => {
                        tracing::warn!(error = %e, "Could not read session log for new row");
                        None
                    }
                };
                let title = row_title(&*page, row);
                let busy = *phase.borrow() == Phase::Busy;
                chips::augment_row(&*page, row, title.as_deref(), open.as_ref(), busy);
            }
        }))
    }

    /// Add chips to every row currently on the page; returns how many were added
    pub async fn augment_all(&self) -> Result<usize, LogError> {
        let open = self.log.current_session().await?;
        let page = &*self.page;
        let busy = self.phase() == Phase::Busy;
        let added = page
            .query_all(page.root(), &chips::ROW)
            .into_iter()
            .filter(|row| {
                let title = row_title(page, *row);
                chips::augment_row(page, *row, title.as_deref(), open.as_ref(), busy)
            })
            .count();
        tracing::debug!(added, "Work chips added");
        Ok(added)
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> state::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Handle a click on a task row
    ///
    /// Rejected while another flow is running. Otherwise the row's toggle is queued behind a
    /// stop of every other Working row, and the returned receiver yields its outcome.
    pub fn click(&self, node: NodeId) -> Result<FlowReceiver, ControlError> {
        let page = &*self.page;
        let row = page
            .closest(node, &chips::ROW)
            .ok_or(ControlError::NotATaskRow)?;

        let acquired = self.phase.send_if_modified(|phase| match phase {
            Phase::Busy => false,
            Phase::Idle => {
                *phase = Phase::Busy;
                true
            }
        });
        if !acquired {
            tracing::debug!(%row, "Click dropped while busy");
            return Err(ControlError::BusyRejected);
        }
        chips::set_chips_disabled(page, true);

        let (done, receiver) = oneshot::channel();
        let queued = self
            .actions
            .send(Action::StopOthers { except: row })
            .and_then(|_| self.actions.send(Action::Toggle { row, done }));
        if queued.is_err() {
            self.phase.send_replace(Phase::Idle);
            chips::set_chips_disabled(page, false);
            return Err(ControlError::WorkerGone);
        }
        Ok(receiver)
    }

    /// Handle a click on a work chip
    pub fn click_chip(&self, chip: NodeId) -> Result<FlowReceiver, ControlError> {
        let row = self
            .page
            .closest(chip, &chips::ROW)
            .ok_or(ControlError::NotATaskRow)?;
        self.click(row)
    }
}

impl Drop for WorkController {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

fn row_title(page: &dyn HostPage, row: NodeId) -> Option<String> {
    page.query(row, &crate::automation::rename::ROW_TITLE)
        .map(|title| page.text(title))
}

struct Worker {
    page: Arc<dyn HostPage>,
    log: SessionLogStore,
    rename: RenameAutomation,
    notifier: Arc<dyn Notifier>,
    completion_popup: CompletionPopupPreference,
    phase: Arc<state::Sender<Phase>>,
}

impl Worker {
    async fn run(self, mut actions: ActionRx) {
        while let Some(action) = actions.recv().await {
            match action {
                Action::StopOthers { except } => self.stop_others(except).await,
                Action::Toggle { row, done } => {
                    let result = self.toggle(row).await;
                    if let Err(e) = &result {
                        tracing::warn!(error = %e, "Start/stop flow failed");
                    }
                    self.phase.send_replace(Phase::Idle);
                    chips::set_chips_disabled(&*self.page, false);
                    if done.send(result).is_err() {
                        tracing::debug!("Flow outcome dropped by caller");
                    }
                }
            }
        }
        tracing::debug!("Controller worker stopped");
    }

    async fn stop_others(&self, except: NodeId) {
        let page = &*self.page;
        for row in page.query_all(page.root(), &chips::WORKING_ROWS) {
            if row == except {
                continue;
            }
            if let Err(e) = self.stop(row, true).await {
                tracing::warn!(%row, error = %e, "Could not stop Working row");
            }
        }
    }

    async fn toggle(&self, row: NodeId) -> FlowResult {
        match chips::row_state(&*self.page, row) {
            WorkState::Working => Ok(FlowReport::Stopped(self.stop(row, false).await?)),
            WorkState::Idle => self.start(row).await,
        }
    }

    async fn start(&self, row: NodeId) -> FlowResult {
        let page = &*self.page;
        let title = row_title(page, row).ok_or(FlowError::MissingTitle)?;
        let base = decode(&title).base_title;

        self.log.switch_session(&base).await?;
        let start = self.log.clock().now_ms();
        chips::set_row_state(page, row, WorkState::Working, Some(start));

        tracing::info!(work_key = %chips::work_key(page, &base), "Started working");
        Ok(FlowReport::Started {
            base_title: base,
            start,
        })
    }

    async fn stop(&self, row: NodeId, suppress_idle: bool) -> Result<StopReport, FlowError> {
        let page = &*self.page;
        let title = row_title(page, row).ok_or(FlowError::MissingTitle)?;
        let decoded = decode(&title);
        let base = decoded.base_title;
        let work_key = chips::work_key(page, &base);
        let now = self.log.clock().now_ms();

        let open = self.log.current_session().await.map_err(LogError::from)?;
        let elapsed_ms = match open {
            Some(session) if session.label == base => {
                self.log.end_open_session(now).await?;
                session.elapsed_ms(now)
            }
            _ => {
                let start = chips::row_start(page, row);
                tracing::warn!(
                    work_key = %work_key,
                    "No matching open session, using the row's start time"
                );
                start.map(|s| (now - s).max(0)).unwrap_or(0)
            }
        };
        chips::set_row_state(page, row, WorkState::Idle, None);

        let minutes = minutes_from_millis(elapsed_ms);
        let rename = if minutes == 0 {
            RenameOutcome::Skipped
        } else {
            let new_title = encode(&base, decoded.existing_minutes.saturating_add(minutes));
            match self.rename.rename(row, &base, &new_title).await {
                Ok(()) => RenameOutcome::Renamed(new_title),
                Err(e) => {
                    tracing::warn!(work_key = %work_key, error = %e, "Rename failed");
                    self.notifier.notify(Notice::RenameFailed {
                        intended_title: new_title,
                        reason: e.to_string(),
                    });
                    RenameOutcome::Failed(e)
                }
            }
        };

        if self.completion_popup.is_enabled() {
            self.notifier.notify(Notice::SessionCompleted {
                label: base.clone(),
                minutes,
            });
        }

        if !suppress_idle {
            self.log.switch_session(self.log.idle_label()).await?;
        }

        tracing::info!(work_key = %work_key, minutes, "Stopped working");
        Ok(StopReport {
            base_title: base,
            minutes,
            rename,
        })
    }
}
