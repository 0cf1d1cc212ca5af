use std::{
    str::FromStr,
    sync::{Arc, Weak},
};

use serde::Deserialize;
use shared::{
    domain::{MessageId, SessionId},
    protocol::{ChatMessage, QueryReply},
};
use tokio::{
    sync::{broadcast, watch, Mutex},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::{
    error::{ConfigError, ResolveError, SessionError, StoreError},
    quick_query::QuickQueryProvider,
    resolver::QueryResolver,
    store::{MessageDraft, MessageStore, StoreSnapshot},
    view::ViewState,
    WELCOME_MESSAGE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    AwaitingResponse { user_message_id: MessageId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    EmptyQuery,
    ConcurrentSubmit,
    SessionClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted { user_message_id: MessageId },
    Rejected(RejectReason),
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted { .. })
    }
}

/// What a failed turn leaves behind in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverFailurePolicy {
    /// Append a fixed assistant notice naming the failure category.
    #[default]
    Notice,
    /// Append nothing; the user message stays unanswered.
    Drop,
}

impl FromStr for ResolverFailurePolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "notice" => Ok(ResolverFailurePolicy::Notice),
            "drop" => Ok(ResolverFailurePolicy::Drop),
            _ => Err(ConfigError::InvalidValue {
                key: "failure_policy",
                value: value.to_string(),
            }),
        }
    }
}

pub fn failure_notice(err: &ResolveError) -> String {
    format!(
        "Unable to retrieve ARGO data right now ({}). Please try again.",
        err.category().describe()
    )
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    MessageAppended(ChatMessage),
    PendingChanged(bool),
    InputChanged(String),
    ViewChanged(ViewState),
    TurnFailed {
        user_message_id: MessageId,
        reason: String,
    },
    TurnCancelled {
        user_message_id: MessageId,
    },
    Closed,
}

struct SessionState {
    store: MessageStore,
    phase: SessionPhase,
    input: String,
    in_flight: Option<JoinHandle<()>>,
    closed: bool,
}

/// Single entry point for every mutation of a chat session.
///
/// At most one turn is in flight. The resolver runs in a spawned task that
/// only holds a weak reference back to the controller, so dropping the last
/// handle (or calling [`SessionController::shutdown`]) discards the pending
/// reply instead of appending it.
pub struct SessionController {
    session_id: SessionId,
    resolver: Arc<dyn QueryResolver>,
    failure_policy: ResolverFailurePolicy,
    quick_queries: QuickQueryProvider,
    inner: Mutex<SessionState>,
    view: Mutex<ViewState>,
    pending: watch::Sender<bool>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    pub fn new(
        resolver: Arc<dyn QueryResolver>,
        failure_policy: ResolverFailurePolicy,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        let (pending, _) = watch::channel(false);
        let session_id = SessionId::new();
        info!(session = %session_id, ?failure_policy, "starting chat session");

        Arc::new(Self {
            session_id,
            resolver,
            failure_policy,
            quick_queries: QuickQueryProvider::default(),
            inner: Mutex::new(SessionState {
                store: MessageStore::seeded(MessageDraft::assistant(WELCOME_MESSAGE, false)),
                phase: SessionPhase::Idle,
                input: String::new(),
                in_flight: None,
                closed: false,
            }),
            view: Mutex::new(ViewState::default()),
            pending,
            events,
        })
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn failure_policy(&self) -> ResolverFailurePolicy {
        self.failure_policy
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn subscribe_pending(&self) -> watch::Receiver<bool> {
        self.pending.subscribe()
    }

    pub fn is_pending(&self) -> bool {
        *self.pending.borrow()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.inner.lock().await.phase
    }

    pub async fn messages(&self) -> StoreSnapshot {
        self.inner.lock().await.store.snapshot()
    }

    pub async fn message_count(&self) -> usize {
        self.inner.lock().await.store.len()
    }

    pub async fn has_in_flight_task(&self) -> bool {
        self.inner.lock().await.in_flight.is_some()
    }

    pub async fn submit(self: &Arc<Self>, text: &str) -> Result<SubmitOutcome, SessionError> {
        let mut state = self.inner.lock().await;
        self.submit_locked(&mut state, text)
    }

    /// Submits whatever is currently in the input buffer.
    pub async fn send_input(self: &Arc<Self>) -> Result<SubmitOutcome, SessionError> {
        let mut state = self.inner.lock().await;
        let text = state.input.clone();
        self.submit_locked(&mut state, &text)
    }

    fn submit_locked(
        self: &Arc<Self>,
        state: &mut SessionState,
        text: &str,
    ) -> Result<SubmitOutcome, SessionError> {
        if state.closed {
            return Ok(SubmitOutcome::Rejected(RejectReason::SessionClosed));
        }
        let query = text.trim();
        if query.is_empty() {
            debug!(session = %self.session_id, "ignoring empty query");
            return Ok(SubmitOutcome::Rejected(RejectReason::EmptyQuery));
        }
        if let SessionPhase::AwaitingResponse { user_message_id } = state.phase {
            debug!(
                session = %self.session_id,
                pending_turn = %user_message_id,
                "rejecting submit while a reply is pending"
            );
            return Ok(SubmitOutcome::Rejected(RejectReason::ConcurrentSubmit));
        }

        let user_message_id = self.push_and_publish(state, MessageDraft::user(query))?;
        state.phase = SessionPhase::AwaitingResponse { user_message_id };
        if !state.input.is_empty() {
            state.input.clear();
            let _ = self.events.send(SessionEvent::InputChanged(String::new()));
        }
        self.set_pending(true);
        state.in_flight = Some(self.spawn_turn(user_message_id, query.to_string()));

        info!(session = %self.session_id, message_id = %user_message_id, "accepted query");
        Ok(SubmitOutcome::Accepted { user_message_id })
    }

    fn spawn_turn(self: &Arc<Self>, user_message_id: MessageId, query: String) -> JoinHandle<()> {
        let controller: Weak<Self> = Arc::downgrade(self);
        let resolver = Arc::clone(&self.resolver);
        tokio::spawn(async move {
            let result = resolver.resolve(&query).await;
            let Some(controller) = controller.upgrade() else {
                debug!(message_id = %user_message_id, "session ended before reply; discarding");
                return;
            };
            controller.complete_turn(user_message_id, result).await;
        })
    }

    async fn complete_turn(
        &self,
        user_message_id: MessageId,
        result: Result<QueryReply, ResolveError>,
    ) {
        let mut state = self.inner.lock().await;
        match state.phase {
            SessionPhase::AwaitingResponse {
                user_message_id: pending,
            } if pending == user_message_id => {}
            _ => {
                debug!(
                    session = %self.session_id,
                    message_id = %user_message_id,
                    "discarding reply for a turn that is no longer pending"
                );
                return;
            }
        }
        state.in_flight = None;

        let result = result.and_then(|reply| {
            if reply.content.trim().is_empty() {
                Err(ResolveError::InvalidResponse(
                    "reply content is empty".to_string(),
                ))
            } else {
                Ok(reply)
            }
        });

        let draft = match result {
            Ok(reply) => Some(MessageDraft::assistant(
                reply.content,
                reply.has_attachable_data,
            )),
            Err(err) => {
                warn!(
                    session = %self.session_id,
                    message_id = %user_message_id,
                    error = %err,
                    "query resolution failed"
                );
                let _ = self.events.send(SessionEvent::TurnFailed {
                    user_message_id,
                    reason: err.to_string(),
                });
                match self.failure_policy {
                    ResolverFailurePolicy::Notice => {
                        Some(MessageDraft::assistant(failure_notice(&err), false))
                    }
                    ResolverFailurePolicy::Drop => None,
                }
            }
        };

        if let Some(draft) = draft {
            match self.push_and_publish(&mut state, draft) {
                Ok(reply_id) => {
                    info!(session = %self.session_id, message_id = %reply_id, "appended reply")
                }
                Err(err) => {
                    error!(session = %self.session_id, error = %err, "cannot append reply");
                    let _ = self.events.send(SessionEvent::TurnFailed {
                        user_message_id,
                        reason: err.to_string(),
                    });
                }
            }
        }

        state.phase = SessionPhase::Idle;
        self.set_pending(false);
    }

    /// Abandons the pending turn, if any. The user message stays in the log and
    /// no reply is appended for it.
    pub async fn cancel(&self) -> bool {
        let mut state = self.inner.lock().await;
        self.cancel_locked(&mut state)
    }

    fn cancel_locked(&self, state: &mut SessionState) -> bool {
        let SessionPhase::AwaitingResponse { user_message_id } = state.phase else {
            return false;
        };
        if let Some(task) = state.in_flight.take() {
            task.abort();
        }
        state.phase = SessionPhase::Idle;
        self.set_pending(false);
        let _ = self
            .events
            .send(SessionEvent::TurnCancelled { user_message_id });
        info!(session = %self.session_id, message_id = %user_message_id, "cancelled pending turn");
        true
    }

    pub async fn shutdown(&self) {
        let mut state = self.inner.lock().await;
        if state.closed {
            return;
        }
        self.cancel_locked(&mut state);
        state.closed = true;
        let _ = self.events.send(SessionEvent::Closed);
        info!(session = %self.session_id, messages = state.store.len(), "chat session closed");
    }

    /// Resolves once no turn is pending.
    pub async fn wait_until_idle(&self) {
        let mut pending = self.pending.subscribe();
        let _ = pending.wait_for(|pending| !*pending).await;
    }

    pub async fn input(&self) -> String {
        self.inner.lock().await.input.clone()
    }

    pub async fn set_input(&self, text: impl Into<String>) {
        let text = text.into();
        let mut state = self.inner.lock().await;
        if state.closed {
            return;
        }
        if state.input != text {
            state.input = text.clone();
            let _ = self.events.send(SessionEvent::InputChanged(text));
        }
    }

    pub fn quick_queries(&self) -> &'static [&'static str] {
        self.quick_queries.queries()
    }

    pub async fn quick_queries_visible(&self) -> bool {
        let state = self.inner.lock().await;
        self.quick_queries.is_visible(state.store.len())
    }

    /// Copies a quick query into the input buffer without submitting it.
    pub async fn select_quick_query(&self, index: usize) -> Result<&'static str, SessionError> {
        let mut state = self.inner.lock().await;
        if state.closed {
            return Err(SessionError::Closed);
        }
        if !self.quick_queries.is_visible(state.store.len()) {
            return Err(SessionError::QuickQueriesHidden);
        }
        let query = self
            .quick_queries
            .get(index)
            .ok_or(SessionError::UnknownQuickQuery {
                index,
                available: self.quick_queries.queries().len(),
            })?;
        if state.input != query {
            state.input = query.to_string();
            let _ = self
                .events
                .send(SessionEvent::InputChanged(query.to_string()));
        }
        Ok(query)
    }

    pub async fn view(&self) -> ViewState {
        *self.view.lock().await
    }

    async fn is_closed(&self) -> bool {
        self.inner.lock().await.closed
    }

    /// View toggles are frozen once the session is shut down.
    pub async fn toggle_map(&self) -> ViewState {
        if self.is_closed().await {
            return self.view().await;
        }
        let mut view = self.view.lock().await;
        view.toggle_map();
        debug!(session = %self.session_id, map_visible = view.map_visible, "toggled map panel");
        let _ = self.events.send(SessionEvent::ViewChanged(*view));
        *view
    }

    pub async fn toggle_theme(&self) -> ViewState {
        if self.is_closed().await {
            return self.view().await;
        }
        let mut view = self.view.lock().await;
        view.toggle_theme();
        debug!(session = %self.session_id, theme = ?view.theme, "toggled theme");
        let _ = self.events.send(SessionEvent::ViewChanged(*view));
        *view
    }

    fn push_and_publish(
        &self,
        state: &mut SessionState,
        draft: MessageDraft,
    ) -> Result<MessageId, StoreError> {
        let message = state.store.push(draft)?;
        let id = message.id;
        let _ = self
            .events
            .send(SessionEvent::MessageAppended(message.clone()));
        Ok(id)
    }

    fn set_pending(&self, pending: bool) {
        if self.pending.send_replace(pending) != pending {
            let _ = self.events.send(SessionEvent::PendingChanged(pending));
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(task) = self.inner.get_mut().in_flight.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
