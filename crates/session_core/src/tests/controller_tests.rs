use super::*;
use std::time::Duration;

use async_trait::async_trait;
use shared::domain::{Sender, Theme};

use crate::{
    resolver::{CannedResolver, MissingQueryBackend, RESPONSE_TEMPLATES},
    store::MessageStore,
};

const EQUATOR_QUERY: &str = "Show salinity profiles near the equator in March 2023";

struct TestResolver {
    latency: Duration,
    reply: QueryReply,
    fail_with: Option<ResolveError>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl TestResolver {
    fn ok(latency: Duration) -> Self {
        Self {
            latency,
            reply: QueryReply {
                content: "Found 23 matching profiles.".to_string(),
                has_attachable_data: true,
            },
            fail_with: None,
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing(latency: Duration, err: ResolveError) -> Self {
        let mut resolver = Self::ok(latency);
        resolver.fail_with = Some(err);
        resolver
    }

    fn with_reply(mut self, content: &str, has_attachable_data: bool) -> Self {
        self.reply = QueryReply {
            content: content.to_string(),
            has_attachable_data,
        };
        self
    }
}

#[async_trait]
impl QueryResolver for TestResolver {
    async fn resolve(&self, query: &str) -> Result<QueryReply, ResolveError> {
        self.queries.lock().await.push(query.to_string());
        tokio::time::sleep(self.latency).await;
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        Ok(self.reply.clone())
    }
}

fn session_with(resolver: impl QueryResolver + 'static) -> Arc<SessionController> {
    SessionController::new(Arc::new(resolver), ResolverFailurePolicy::Notice)
}

fn unreachable() -> ResolveError {
    ResolveError::Unreachable("connection refused".to_string())
}

#[tokio::test(start_paused = true)]
async fn fresh_session_holds_only_the_welcome_message() {
    let session = session_with(TestResolver::ok(Duration::from_millis(1500)));

    let messages = session.messages().await;
    assert_eq!(messages.len(), 1);
    let welcome = &messages.messages()[0];
    assert_eq!(welcome.id, MessageId(1));
    assert_eq!(welcome.sender, Sender::Assistant);
    assert_eq!(welcome.content, WELCOME_MESSAGE);
    assert!(!welcome.has_attachable_data);
    assert!(!session.is_pending());
    assert_eq!(session.phase().await, SessionPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn accepted_query_appends_user_then_reply() {
    let session = SessionController::new(
        Arc::new(CannedResolver::with_seed(Duration::from_millis(1500), 7)),
        ResolverFailurePolicy::Notice,
    );

    let outcome = session.submit(EQUATOR_QUERY).await.expect("submit");
    assert_eq!(
        outcome,
        SubmitOutcome::Accepted {
            user_message_id: MessageId(2)
        }
    );

    let messages = session.messages().await;
    assert_eq!(messages.len(), 2);
    let user = &messages.messages()[1];
    assert_eq!(user.id, MessageId(2));
    assert_eq!(user.sender, Sender::User);
    assert_eq!(user.content, EQUATOR_QUERY);
    assert!(session.is_pending());
    assert_eq!(
        session.phase().await,
        SessionPhase::AwaitingResponse {
            user_message_id: MessageId(2)
        }
    );

    session.wait_until_idle().await;

    let messages = session.messages().await;
    assert_eq!(messages.len(), 3);
    let reply = &messages.messages()[2];
    assert_eq!(reply.id, MessageId(3));
    assert_eq!(reply.sender, Sender::Assistant);
    assert!(reply.has_attachable_data);
    let candidates: Vec<String> = RESPONSE_TEMPLATES
        .iter()
        .map(|template| template.replace("{query}", EQUATOR_QUERY))
        .collect();
    assert!(candidates.contains(&reply.content));
    assert!(!session.is_pending());
    assert!(!session.has_in_flight_task().await);
}

#[tokio::test(start_paused = true)]
async fn reply_arrives_only_after_latency() {
    let session = session_with(TestResolver::ok(Duration::from_millis(1500)));
    session.submit("BGC in the Arabian Sea").await.expect("submit");

    tokio::time::sleep(Duration::from_millis(1400)).await;
    assert_eq!(session.message_count().await, 2);
    assert!(session.is_pending());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(session.message_count().await, 3);
    assert!(!session.is_pending());
}

#[tokio::test(start_paused = true)]
async fn blank_queries_change_nothing() {
    let session = session_with(TestResolver::ok(Duration::from_millis(1500)));

    for text in ["", "   ", "\n\t "] {
        let outcome = session.submit(text).await.expect("submit");
        assert_eq!(outcome, SubmitOutcome::Rejected(RejectReason::EmptyQuery));
    }

    assert_eq!(session.message_count().await, 1);
    assert!(!session.is_pending());
    assert!(!session.has_in_flight_task().await);
}

#[tokio::test(start_paused = true)]
async fn submitted_text_is_trimmed() {
    let resolver = TestResolver::ok(Duration::from_millis(10));
    let queries = Arc::clone(&resolver.queries);
    let session = session_with(resolver);

    session
        .submit("  Find nearest ARGO floats to 20°N, 65°E \n")
        .await
        .expect("submit");
    session.wait_until_idle().await;

    let messages = session.messages().await;
    assert_eq!(
        messages.messages()[1].content,
        "Find nearest ARGO floats to 20°N, 65°E"
    );
    assert_eq!(
        queries.lock().await.as_slice(),
        ["Find nearest ARGO floats to 20°N, 65°E".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn submit_while_pending_is_rejected() {
    let resolver = TestResolver::ok(Duration::from_millis(1500));
    let queries = Arc::clone(&resolver.queries);
    let session = session_with(resolver);

    session.submit("first query").await.expect("submit");
    let second = session.submit("second query").await.expect("submit");

    assert_eq!(
        second,
        SubmitOutcome::Rejected(RejectReason::ConcurrentSubmit)
    );
    assert_eq!(session.message_count().await, 2);

    session.wait_until_idle().await;
    assert_eq!(session.message_count().await, 3);
    assert_eq!(queries.lock().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn ids_strictly_increase_across_turns() {
    let session = session_with(TestResolver::ok(Duration::from_millis(250)));

    for query in ["salinity", "temperature", "oxygen"] {
        assert!(session.submit(query).await.expect("submit").is_accepted());
        session.wait_until_idle().await;
    }

    let messages = session.messages().await;
    assert_eq!(messages.len(), 7);
    let ids: Vec<u64> = messages.iter().map(|message| message.id.0).collect();
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    let senders: Vec<Sender> = messages.iter().map(|message| message.sender).collect();
    assert_eq!(
        senders,
        vec![
            Sender::Assistant,
            Sender::User,
            Sender::Assistant,
            Sender::User,
            Sender::Assistant,
            Sender::User,
            Sender::Assistant,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn failed_turn_appends_deterministic_notice() {
    let session = session_with(TestResolver::failing(
        Duration::from_millis(1500),
        unreachable(),
    ));

    session.submit(EQUATOR_QUERY).await.expect("submit");
    session.wait_until_idle().await;

    let messages = session.messages().await;
    assert_eq!(messages.len(), 3);
    let notice = &messages.messages()[2];
    assert_eq!(notice.sender, Sender::Assistant);
    assert_eq!(
        notice.content,
        "Unable to retrieve ARGO data right now (data service unreachable). Please try again."
    );
    assert!(!notice.has_attachable_data);
    assert!(!session.is_pending());
    assert!(!session.has_in_flight_task().await);
    assert_eq!(session.phase().await, SessionPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn failed_turn_can_be_dropped() {
    let session = SessionController::new(Arc::new(MissingQueryBackend), ResolverFailurePolicy::Drop);
    let mut events = session.subscribe_events();

    session.submit(EQUATOR_QUERY).await.expect("submit");
    session.wait_until_idle().await;

    assert_eq!(session.message_count().await, 2);
    assert!(!session.is_pending());
    assert!(!session.has_in_flight_task().await);

    let mut saw_failure = false;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::TurnFailed {
            user_message_id, ..
        } = event
        {
            assert_eq!(user_message_id, MessageId(2));
            saw_failure = true;
        }
    }
    assert!(saw_failure);
}

#[tokio::test(start_paused = true)]
async fn session_accepts_new_turn_after_failure() {
    let session = session_with(TestResolver::failing(Duration::from_millis(100), unreachable()));

    session.submit("first").await.expect("submit");
    session.wait_until_idle().await;
    let outcome = session.submit("second").await.expect("submit");

    assert_eq!(
        outcome,
        SubmitOutcome::Accepted {
            user_message_id: MessageId(4)
        }
    );
}

#[tokio::test(start_paused = true)]
async fn empty_reply_is_treated_as_failure() {
    let session =
        session_with(TestResolver::ok(Duration::from_millis(100)).with_reply("   ", true));

    session.submit("salinity").await.expect("submit");
    session.wait_until_idle().await;

    let messages = session.messages().await;
    let notice = messages.last().expect("notice");
    assert_eq!(
        notice.content,
        "Unable to retrieve ARGO data right now (unexpected data service response). Please try again."
    );
    assert!(!notice.has_attachable_data);
}

#[tokio::test(start_paused = true)]
async fn cancel_discards_pending_reply() {
    let session = session_with(TestResolver::ok(Duration::from_millis(1500)));

    session.submit("temperature anomalies").await.expect("submit");
    assert!(session.cancel().await);
    assert!(!session.is_pending());
    assert!(!session.has_in_flight_task().await);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(session.message_count().await, 2);
    assert!(!session.cancel().await);

    let outcome = session.submit("try again").await.expect("submit");
    assert_eq!(
        outcome,
        SubmitOutcome::Accepted {
            user_message_id: MessageId(3)
        }
    );
}

#[tokio::test(start_paused = true)]
async fn shutdown_discards_pending_reply_and_rejects_input() {
    let session = session_with(TestResolver::ok(Duration::from_millis(1500)));

    session.submit("salinity").await.expect("submit");
    session.shutdown().await;

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(session.message_count().await, 2);
    assert!(!session.is_pending());
    assert_eq!(
        session.submit("again").await.expect("submit"),
        SubmitOutcome::Rejected(RejectReason::SessionClosed)
    );
}

#[tokio::test(start_paused = true)]
async fn reply_for_a_superseded_turn_is_discarded() {
    let session = session_with(TestResolver::ok(Duration::from_millis(1500)));

    session.submit("first").await.expect("submit");
    session.cancel().await;
    let outcome = session.submit("second").await.expect("submit");
    assert_eq!(
        outcome,
        SubmitOutcome::Accepted {
            user_message_id: MessageId(3)
        }
    );

    session
        .complete_turn(
            MessageId(2),
            Ok(QueryReply {
                content: "late reply".to_string(),
                has_attachable_data: true,
            }),
        )
        .await;

    assert_eq!(session.message_count().await, 3);
    assert!(session.is_pending());
    assert_eq!(
        session.phase().await,
        SessionPhase::AwaitingResponse {
            user_message_id: MessageId(3)
        }
    );

    session.wait_until_idle().await;
    let messages = session.messages().await;
    assert_eq!(messages.len(), 4);
    let reply = messages.last().expect("reply");
    assert_eq!(reply.id, MessageId(4));
    assert_eq!(reply.content, "Found 23 matching profiles.");
    assert!(messages.iter().all(|message| message.content != "late reply"));
}

#[tokio::test(start_paused = true)]
async fn exhausted_ids_while_appending_reply_fail_the_turn() {
    let session = session_with(TestResolver::ok(Duration::from_millis(100)));
    session.inner.lock().await.store = MessageStore::starting_at(MessageId(u64::MAX));
    let mut events = session.subscribe_events();

    let outcome = session.submit("salinity").await.expect("submit");
    assert_eq!(
        outcome,
        SubmitOutcome::Accepted {
            user_message_id: MessageId(u64::MAX)
        }
    );
    session.wait_until_idle().await;

    assert!(!session.is_pending());
    assert_eq!(session.phase().await, SessionPhase::Idle);
    assert!(!session.has_in_flight_task().await);
    assert_eq!(session.message_count().await, 1);

    let mut failed = None;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::TurnFailed {
            user_message_id,
            reason,
        } = event
        {
            failed = Some((user_message_id, reason));
        }
    }
    let (failed_id, reason) = failed.expect("turn failed event");
    assert_eq!(failed_id, MessageId(u64::MAX));
    assert!(reason.contains("exhausted"));

    assert!(matches!(
        session.submit("again").await,
        Err(SessionError::Store(StoreError::IdSpaceExhausted { .. }))
    ));
}

#[tokio::test(start_paused = true)]
async fn dropping_session_releases_in_flight_task() {
    let resolver: Arc<dyn QueryResolver> = Arc::new(TestResolver::ok(Duration::from_secs(60)));
    let session = SessionController::new(Arc::clone(&resolver), ResolverFailurePolicy::Notice);

    session.submit("salinity").await.expect("submit");
    tokio::task::yield_now().await;
    assert!(Arc::strong_count(&resolver) > 2);

    drop(session);
    for _ in 0..10 {
        if Arc::strong_count(&resolver) == 1 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(Arc::strong_count(&resolver), 1);
}

#[tokio::test(start_paused = true)]
async fn quick_queries_fill_input_without_submitting() {
    let session = session_with(TestResolver::ok(Duration::from_millis(1500)));
    assert!(session.quick_queries_visible().await);
    assert_eq!(session.quick_queries().len(), 4);

    let selected = session.select_quick_query(1).await.expect("select");

    assert_eq!(selected, "Compare BGC parameters in Arabian Sea last 6 months");
    assert_eq!(session.input().await, selected);
    assert_eq!(session.message_count().await, 1);
    assert!(!session.is_pending());

    assert!(matches!(
        session.select_quick_query(9).await,
        Err(SessionError::UnknownQuickQuery {
            index: 9,
            available: 4
        })
    ));
}

#[tokio::test(start_paused = true)]
async fn quick_queries_hide_after_first_turn() {
    let session = session_with(TestResolver::ok(Duration::from_millis(500)));

    session.select_quick_query(0).await.expect("select");
    let outcome = session.send_input().await.expect("send");
    assert!(outcome.is_accepted());
    assert_eq!(session.input().await, "");
    assert!(!session.quick_queries_visible().await);

    session.wait_until_idle().await;
    assert!(!session.quick_queries_visible().await);
    assert!(matches!(
        session.select_quick_query(0).await,
        Err(SessionError::QuickQueriesHidden)
    ));

    session.submit("follow-up").await.expect("submit");
    session.wait_until_idle().await;
    assert!(!session.quick_queries_visible().await);
}

#[tokio::test(start_paused = true)]
async fn rejected_submit_keeps_input_buffer() {
    let session = session_with(TestResolver::ok(Duration::from_millis(1500)));

    session.submit("first").await.expect("submit");
    session.set_input("draft while waiting").await;
    let outcome = session.send_input().await.expect("send");

    assert_eq!(
        outcome,
        SubmitOutcome::Rejected(RejectReason::ConcurrentSubmit)
    );
    assert_eq!(session.input().await, "draft while waiting");
}

#[tokio::test(start_paused = true)]
async fn view_toggles_do_not_disturb_pending_turn() {
    let session = session_with(TestResolver::ok(Duration::from_millis(1500)));
    session.submit("salinity").await.expect("submit");

    let view = session.toggle_map().await;
    assert!(view.map_visible);
    let view = session.toggle_theme().await;
    assert_eq!(view.theme, Theme::Dark);
    assert!(session.is_pending());

    session.toggle_map().await;
    let view = session.toggle_theme().await;
    assert_eq!(view, ViewState::default());

    session.wait_until_idle().await;
    assert_eq!(session.message_count().await, 3);
    assert_eq!(session.view().await, ViewState::default());
}

#[tokio::test(start_paused = true)]
async fn closed_session_ignores_input_and_view_changes() {
    let session = session_with(TestResolver::ok(Duration::from_millis(1500)));
    session.set_input("draft").await;
    let mut events = session.subscribe_events();

    session.shutdown().await;

    session.set_input("after close").await;
    assert_eq!(session.input().await, "draft");
    assert!(matches!(
        session.select_quick_query(0).await,
        Err(SessionError::Closed)
    ));
    assert_eq!(session.input().await, "draft");
    assert_eq!(session.toggle_map().await, ViewState::default());
    assert_eq!(session.toggle_theme().await, ViewState::default());
    assert_eq!(session.view().await, ViewState::default());

    assert!(matches!(events.try_recv(), Ok(SessionEvent::Closed)));
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn events_follow_turn_lifecycle() {
    let session = session_with(TestResolver::ok(Duration::from_millis(100)));
    let mut events = session.subscribe_events();

    session.submit("salinity").await.expect("submit");
    session.wait_until_idle().await;

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(match event {
            SessionEvent::MessageAppended(message) => format!("append:{}", message.id),
            SessionEvent::PendingChanged(pending) => format!("pending:{pending}"),
            other => format!("{other:?}"),
        });
    }
    assert_eq!(
        kinds,
        vec!["append:2", "pending:true", "append:3", "pending:false"]
    );
}

#[test]
fn failure_policy_parses_from_text() {
    assert_eq!(
        "notice".parse::<ResolverFailurePolicy>().expect("notice"),
        ResolverFailurePolicy::Notice
    );
    assert_eq!(
        " DROP ".parse::<ResolverFailurePolicy>().expect("drop"),
        ResolverFailurePolicy::Drop
    );
    assert!("retry".parse::<ResolverFailurePolicy>().is_err());
}

#[test]
fn store_exhaustion_surfaces_as_session_error() {
    let err: SessionError = StoreError::IdSpaceExhausted {
        last: MessageId(u64::MAX),
    }
    .into();
    assert!(err.to_string().contains("exhausted"));
}
