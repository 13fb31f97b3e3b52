//! Conversation controller.
//!
//! `ChatSnapshot` is the whole client-side state as one value; every
//! transition (`classify`, `begin_dispatch`, `complete_dispatch`,
//! `fail_dispatch`) returns a new snapshot. The "one request in flight"
//! rule is enforced inside `begin_dispatch`, and every request carries a
//! sequence number so a response for anything but the in-flight request is
//! dropped.
//!
//! `ConversationController` owns a snapshot and drives those transitions
//! around a real `AnsweringService` call, either awaited in place or split
//! into `submit`/`settle` for an event loop.

use std::fmt;
use std::sync::Arc;

use crate::citations::CitationBrowser;
use crate::client::{AnsweringService, ExchangeResponse};
use crate::conversation::{ConversationState, EmploymentType, Onboarding, Origin, Role};
use crate::error::DispatchFailure;
use crate::parks::Park;
use crate::session::{Session, SessionToken};

// ── Request identity ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestSeq(pub u64);

impl fmt::Display for RequestSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One chat exchange, built fresh per dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRequest {
    pub seq: RequestSeq,
    pub session_token: SessionToken,
    pub query_text: String,
    pub park_label: String,
    pub classification: Option<EmploymentType>,
}

/// Why `begin_dispatch` refused. Only ever logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoSession,
    AwaitingClassification,
    EmptyQuery,
    Busy,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rejection::NoSession => "no session token",
            Rejection::AwaitingClassification => "onboarding not complete",
            Rejection::EmptyQuery => "empty query",
            Rejection::Busy => "a request is already in flight",
        };
        f.write_str(s)
    }
}

// ── ChatSnapshot ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSnapshot {
    pub conversation: ConversationState,
    pub citations: CitationBrowser,
    in_flight: Option<RequestSeq>,
    next_seq: u64,
}

impl Default for ChatSnapshot {
    fn default() -> Self {
        Self {
            conversation: ConversationState::default(),
            citations: CitationBrowser::default(),
            in_flight: None,
            next_seq: 1,
        }
    }
}

impl ChatSnapshot {
    pub fn in_flight(&self) -> Option<RequestSeq> {
        self.in_flight
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn classify(&self, kind: EmploymentType) -> Self {
        Self {
            conversation: self.conversation.classify(kind),
            ..self.clone()
        }
    }

    /// Check every precondition, then log the user message and mark the
    /// request in flight. The log keeps the raw text; the request carries
    /// the trimmed query.
    pub fn begin_dispatch(
        &self,
        session: &Session,
        query: &str,
        park: &Park,
    ) -> Result<(Self, ExchangeRequest), Rejection> {
        let token = session.token().ok_or(Rejection::NoSession)?;
        let classification = match self.conversation.onboarding {
            Onboarding::Active(kind) => kind,
            Onboarding::AwaitingClassification => return Err(Rejection::AwaitingClassification),
        };
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(Rejection::EmptyQuery);
        }
        if self.in_flight.is_some() {
            return Err(Rejection::Busy);
        }

        let seq = RequestSeq(self.next_seq);
        let mut next = self.clone();
        next.conversation.log.push(Role::User, query, Origin::Exchange);
        next.in_flight = Some(seq);
        next.next_seq += 1;

        let request = ExchangeRequest {
            seq,
            session_token: token.clone(),
            query_text: trimmed.to_string(),
            park_label: park.name.to_string(),
            classification: Some(classification),
        };
        tracing::debug!(%seq, "dispatch accepted");
        Ok((next, request))
    }

    /// Append the answer and swap in its citations. Ignored unless `seq` is
    /// the request currently in flight.
    pub fn complete_dispatch(&self, seq: RequestSeq, response: ExchangeResponse) -> Self {
        if self.in_flight != Some(seq) {
            tracing::debug!(%seq, "discarding response for a request that is not in flight");
            return self.clone();
        }
        let mut next = self.clone();
        next.conversation.log.push(Role::Bot, response.text, Origin::Exchange);
        next.citations.replace(response.citations);
        next.in_flight = None;
        tracing::info!(%seq, citations = next.citations.set().len(), "exchange answered");
        next
    }

    /// Release the in-flight flag; log and citations stay as they were.
    pub fn fail_dispatch(&self, seq: RequestSeq) -> Self {
        if self.in_flight != Some(seq) {
            tracing::debug!(%seq, "discarding failure for a request that is not in flight");
            return self.clone();
        }
        Self {
            in_flight: None,
            ..self.clone()
        }
    }

    pub fn settle(&self, seq: RequestSeq, outcome: Result<ExchangeResponse, DispatchFailure>) -> Self {
        if self.in_flight != Some(seq) {
            tracing::debug!(%seq, ok = outcome.is_ok(), "discarding outcome for a request that is not in flight");
            return self.clone();
        }
        match outcome {
            Ok(response) => self.complete_dispatch(seq, response),
            Err(e) => {
                if e.looks_like_expired_token() {
                    tracing::warn!(%seq, error = %e, "exchange failed; the session token may have expired");
                } else {
                    tracing::warn!(%seq, error = %e, "exchange failed");
                }
                self.fail_dispatch(seq)
            }
        }
    }

    /// Open the citation browser on the latest answer.
    pub fn open_citations(&mut self) -> bool {
        let trigger = self
            .conversation
            .log
            .last_answer()
            .and_then(|i| self.conversation.log.get(i));
        self.citations.open(trigger)
    }
}

// ── ConversationController ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Rejected(Rejection),
    Answered,
    Failed(DispatchFailure),
}

/// Owns the snapshot plus the pieces a dispatch reads from outside it: the
/// session, the park, and the input buffer.
///
/// Two ways to drive it. `dispatch` and `submit_input` await the exchange
/// in place. `submit` + `settle` split the same sequence so an event loop can
/// run the exchange on another task and apply the outcome when it arrives.
pub struct ConversationController {
    service: Arc<dyn AnsweringService>,
    session: Session,
    park: Park,
    snapshot: ChatSnapshot,
    input: String,
    restore_draft_on_failure: bool,
    pending_draft: Option<(RequestSeq, String)>,
}

impl ConversationController {
    pub fn new(service: Arc<dyn AnsweringService>, session: Session, park: Park) -> Self {
        Self {
            service,
            session,
            park,
            snapshot: ChatSnapshot::default(),
            input: String::new(),
            restore_draft_on_failure: false,
            pending_draft: None,
        }
    }

    /// Put a failed query back into an empty input buffer.
    pub fn restore_draft_on_failure(mut self, enabled: bool) -> Self {
        self.restore_draft_on_failure = enabled;
        self
    }

    pub fn service(&self) -> Arc<dyn AnsweringService> {
        Arc::clone(&self.service)
    }

    pub fn set_session(&mut self, session: Session) {
        self.session = session;
    }

    pub fn park(&self) -> Park {
        self.park
    }

    pub fn snapshot(&self) -> &ChatSnapshot {
        &self.snapshot
    }

    pub fn citations_mut(&mut self) -> &mut CitationBrowser {
        &mut self.snapshot.citations
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn classify(&mut self, kind: EmploymentType) {
        self.snapshot = self.snapshot.classify(kind);
    }

    /// Open the citation browser on the latest answer.
    pub fn open_citations(&mut self) -> bool {
        self.snapshot.open_citations()
    }

    /// Accept the input buffer as a query. The buffer is cleared as soon as
    /// the dispatch is accepted; a rejected submit leaves it as typed.
    pub fn submit(&mut self) -> Result<ExchangeRequest, Rejection> {
        let (next, request) = self.begin(&self.input.clone())?;
        self.snapshot = next;
        let draft = std::mem::take(&mut self.input);
        self.pending_draft = Some((request.seq, draft));
        Ok(request)
    }

    /// Apply an exchange outcome. Returns false when `seq` was not the
    /// request in flight and nothing changed.
    pub fn settle(&mut self, seq: RequestSeq, outcome: Result<ExchangeResponse, DispatchFailure>) -> bool {
        if self.snapshot.in_flight() != Some(seq) {
            self.snapshot = self.snapshot.settle(seq, outcome);
            return false;
        }
        let failed = outcome.is_err();
        self.snapshot = self.snapshot.settle(seq, outcome);

        let draft = match self.pending_draft.take() {
            Some((s, text)) if s == seq => Some(text),
            other => {
                self.pending_draft = other;
                None
            }
        };
        if failed && self.restore_draft_on_failure && self.input.is_empty() {
            if let Some(text) = draft {
                tracing::debug!(%seq, "restoring failed query to the input buffer");
                self.input = text;
            }
        }
        true
    }

    /// Dispatch `query` directly. The input buffer is left alone.
    pub async fn dispatch(&mut self, query: &str) -> DispatchOutcome {
        let request = match self.begin(query) {
            Ok((next, request)) => {
                self.snapshot = next;
                request
            }
            Err(rejection) => return DispatchOutcome::Rejected(rejection),
        };
        self.exchange(request).await
    }

    /// Dispatch whatever is in the input buffer. The buffer is emptied while
    /// the exchange runs and comes back only on rejection, or on failure
    /// when draft restoring is enabled.
    pub async fn submit_input(&mut self) -> DispatchOutcome {
        let query = std::mem::take(&mut self.input);
        let outcome = self.dispatch(&query).await;
        let keep = match &outcome {
            DispatchOutcome::Rejected(_) => true,
            DispatchOutcome::Failed(_) => self.restore_draft_on_failure,
            DispatchOutcome::Answered => false,
        };
        if keep && self.input.is_empty() {
            self.input = query;
        }
        outcome
    }

    fn begin(&self, query: &str) -> Result<(ChatSnapshot, ExchangeRequest), Rejection> {
        self.snapshot
            .begin_dispatch(&self.session, query, &self.park)
            .inspect_err(|rejection| tracing::debug!(%rejection, "dispatch rejected"))
    }

    async fn exchange(&mut self, request: ExchangeRequest) -> DispatchOutcome {
        let service = self.service();
        let guard = InFlightGuard::new(self, request.seq);
        let outcome = service.chat(&request).await;
        let result = match &outcome {
            Ok(_) => DispatchOutcome::Answered,
            Err(e) => DispatchOutcome::Failed(e.clone()),
        };
        guard.settle(outcome);
        result
    }
}

// ── In-flight guard ───────────────────────────────────────────────────────────

/// Held while a request is out. Settling applies the outcome; dropping it
/// unsettled (the dispatch future was cancelled) settles as `Abandoned`.
struct InFlightGuard<'a> {
    chat: &'a mut ConversationController,
    seq: RequestSeq,
    settled: bool,
}

impl<'a> InFlightGuard<'a> {
    fn new(chat: &'a mut ConversationController, seq: RequestSeq) -> Self {
        Self { chat, seq, settled: false }
    }

    fn settle(mut self, outcome: Result<ExchangeResponse, DispatchFailure>) {
        self.settled = true;
        self.chat.settle(self.seq, outcome);
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.chat.settle(self.seq, Err(DispatchFailure::Abandoned));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::ScriptedService;
    use crate::parks;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn active_controller(service: ScriptedService) -> (ConversationController, Arc<ScriptedService>) {
        let service = Arc::new(service);
        let mut c = ConversationController::new(
            service.clone(),
            Session::with_token(SessionToken::new("tok")),
            parks::resolve("gl"),
        );
        c.classify(EmploymentType::Permanent);
        (c, service)
    }

    fn log_len(c: &ConversationController) -> usize {
        c.snapshot().conversation.log.len()
    }

    // ── Preconditions ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_dispatch_without_session_is_noop() {
        let service = Arc::new(ScriptedService::with_token("tok").answer("x", &[]));
        let mut c = ConversationController::new(service.clone(), Session::absent(), parks::resolve("gl"));
        c.classify(EmploymentType::Permanent);
        let before = c.snapshot().clone();

        assert_eq!(c.dispatch("Hej").await, DispatchOutcome::Rejected(Rejection::NoSession));
        assert_eq!(c.snapshot(), &before);
        assert_eq!(service.chat_calls(), 0);
    }

    #[tokio::test]
    async fn test_dispatch_before_classification_is_noop() {
        let service = Arc::new(ScriptedService::with_token("tok").answer("x", &[]));
        let mut c = ConversationController::new(
            service.clone(),
            Session::with_token(SessionToken::new("tok")),
            parks::resolve("gl"),
        );
        assert_eq!(c.dispatch("Hej").await, DispatchOutcome::Rejected(Rejection::AwaitingClassification));
        assert_eq!(log_len(&c), 1);
        assert_eq!(service.chat_calls(), 0);
    }

    #[tokio::test]
    async fn test_whitespace_query_is_noop() {
        let (mut c, service) = active_controller(ScriptedService::with_token("tok"));
        assert_eq!(log_len(&c), 3);
        assert_eq!(c.dispatch("   ").await, DispatchOutcome::Rejected(Rejection::EmptyQuery));
        assert_eq!(log_len(&c), 3);
        assert!(!c.snapshot().is_in_flight());
        assert_eq!(service.chat_calls(), 0);
    }

    #[test]
    fn test_begin_dispatch_rejects_while_in_flight() {
        let session = Session::with_token(SessionToken::new("tok"));
        let park = parks::resolve("fv");
        let snap = ChatSnapshot::default().classify(EmploymentType::Seasonal);

        let (busy, _) = snap.begin_dispatch(&session, "första", &park).unwrap();
        assert_eq!(busy.begin_dispatch(&session, "andra", &park).unwrap_err(), Rejection::Busy);
        assert_eq!(busy.conversation.log.len(), 4);
    }

    // ── Exchanges ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_successful_dispatch_adds_two_messages_and_citations() {
        let (mut c, service) = active_controller(
            ScriptedService::with_token("tok").answer("Svar", &[("Doc A", "<p>x</p>"), ("Doc B", "<p>y</p>")]),
        );

        assert_eq!(c.dispatch("  Hur byter jag pass? ").await, DispatchOutcome::Answered);
        assert_eq!(log_len(&c), 5);

        let log = &c.snapshot().conversation.log;
        assert_eq!(log.get(3).unwrap().role, Role::User);
        assert_eq!(log.get(3).unwrap().text, "  Hur byter jag pass? ");
        assert_eq!(log.get(4).unwrap().role, Role::Bot);
        assert_eq!(log.get(4).unwrap().text, "Svar");
        assert!(!c.snapshot().is_in_flight());

        let set = c.snapshot().citations.set();
        assert_eq!(set.labels(), ["Doc A".to_string(), "Doc B".to_string()]);
        assert_eq!(set.cursor(), 0);

        let sent = service.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].query_text, "Hur byter jag pass?");
        assert_eq!(sent[0].park_label, "Gröna Lund");
        assert_eq!(sent[0].classification, Some(EmploymentType::Permanent));
        assert_eq!(sent[0].session_token.as_str(), "tok");
    }

    #[tokio::test]
    async fn test_successful_dispatch_then_citation_walk() {
        let (mut c, _) = active_controller(
            ScriptedService::with_token("tok").answer("Svar", &[("Doc A", "<p>x</p>"), ("Doc B", "<p>y</p>")]),
        );
        c.dispatch("fråga").await;

        assert!(c.open_citations());
        assert!(c.snapshot().citations.is_visible());
        c.citations_mut().next();
        assert_eq!(c.snapshot().citations.set().cursor(), 1);
        assert_eq!(c.snapshot().citations.set().current().unwrap().0, "Doc B");
        c.citations_mut().next();
        assert_eq!(c.snapshot().citations.set().cursor(), 0);
        c.citations_mut().previous();
        assert_eq!(c.snapshot().citations.set().cursor(), 1);
    }

    #[tokio::test]
    async fn test_failed_dispatch_keeps_only_user_message() {
        let (mut c, _) = active_controller(ScriptedService::with_token("tok").reply(Err(DispatchFailure::Status(500))));
        let before_citations = c.snapshot().citations.clone();

        let outcome = c.dispatch("fråga").await;
        assert_eq!(outcome, DispatchOutcome::Failed(DispatchFailure::Status(500)));
        assert_eq!(log_len(&c), 4);
        assert_eq!(c.snapshot().conversation.log.last().unwrap().role, Role::User);
        assert!(!c.snapshot().is_in_flight());
        assert_eq!(c.snapshot().citations, before_citations);
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_citations() {
        let (mut c, _) = active_controller(
            ScriptedService::with_token("tok")
                .answer("Svar", &[("Doc A", "<p>x</p>")])
                .reply(Err(DispatchFailure::Transport("reset".into()))),
        );
        c.dispatch("ett").await;
        c.dispatch("två").await;
        assert_eq!(c.snapshot().citations.set().labels(), ["Doc A".to_string()]);
        assert_eq!(log_len(&c), 6);
    }

    #[tokio::test]
    async fn test_empty_citations_replace_previous_ones() {
        let (mut c, _) = active_controller(
            ScriptedService::with_token("tok")
                .answer("Svar", &[("Doc A", "<p>x</p>")])
                .answer("Inga källor", &[]),
        );
        c.dispatch("ett").await;
        c.dispatch("två").await;
        assert!(c.snapshot().citations.set().is_empty());
        assert!(!c.open_citations());
    }

    #[tokio::test]
    async fn test_log_growth_per_outcome() {
        let (mut c, _) = active_controller(
            ScriptedService::with_token("tok")
                .answer("a", &[])
                .reply(Err(DispatchFailure::Status(502)))
                .answer("b", &[]),
        );
        let start = log_len(&c);
        c.dispatch("1").await;
        assert_eq!(log_len(&c), start + 2);
        c.dispatch("").await;
        assert_eq!(log_len(&c), start + 2);
        c.dispatch("2").await;
        assert_eq!(log_len(&c), start + 3);
        c.dispatch("3").await;
        assert_eq!(log_len(&c), start + 5);
    }

    // ── Sequencing and release ────────────────────────────────────────────────

    /// Collects formatted log output for assertions.
    #[derive(Clone, Default)]
    struct CapturedLog(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLog {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[test]
    fn test_stale_failure_is_not_warned() {
        let session = Session::with_token(SessionToken::new("tok"));
        let park = parks::resolve("gl");
        let snap = ChatSnapshot::default().classify(EmploymentType::Permanent);
        let (busy, req) = snap.begin_dispatch(&session, "fråga", &park).unwrap();

        let captured = CapturedLog::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let after = busy.settle(RequestSeq(req.seq.0 + 1), Err(DispatchFailure::Status(500)));
            assert_eq!(after, busy);
            assert_eq!(captured.text(), "");

            let after = busy.settle(req.seq, Err(DispatchFailure::Status(500)));
            assert!(!after.is_in_flight());
            assert!(captured.text().contains("exchange failed"));
        });
    }

    #[test]
    fn test_late_response_is_discarded() {
        let session = Session::with_token(SessionToken::new("tok"));
        let park = parks::resolve("gl");
        let snap = ChatSnapshot::default().classify(EmploymentType::Permanent);

        let (first, req1) = snap.begin_dispatch(&session, "ett", &park).unwrap();
        let failed = first.fail_dispatch(req1.seq);
        let (second, req2) = failed.begin_dispatch(&session, "två", &park).unwrap();
        assert!(req2.seq > req1.seq);

        let stale = ExchangeResponse {
            text: "sent svar".into(),
            citations: Default::default(),
        };
        let after = second.complete_dispatch(req1.seq, stale);
        assert_eq!(after, second);
        assert_eq!(after.in_flight(), Some(req2.seq));
    }

    #[tokio::test]
    async fn test_cancelled_dispatch_releases_in_flight() {
        let (mut c, service) = active_controller(ScriptedService::with_token("tok").hanging());

        let timed_out = tokio::time::timeout(Duration::from_millis(20), c.dispatch("fråga")).await;
        assert!(timed_out.is_err());
        assert_eq!(service.chat_calls(), 1);
        assert!(!c.snapshot().is_in_flight());
        assert_eq!(log_len(&c), 4);
    }

    // ── Input buffer ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_input_cleared_on_accept_and_lost_on_failure() {
        let (mut c, _) = active_controller(ScriptedService::with_token("tok").reply(Err(DispatchFailure::Status(500))));
        c.set_input("min fråga");
        c.submit_input().await;
        // Restoring is off by default
        assert_eq!(c.input(), "");
    }

    #[tokio::test]
    async fn test_input_restored_on_failure_when_enabled() {
        let (c, _) = active_controller(ScriptedService::with_token("tok").reply(Err(DispatchFailure::Status(500))));
        let mut c = c.restore_draft_on_failure(true);
        c.set_input("min fråga");
        c.submit_input().await;
        assert_eq!(c.input(), "min fråga");
    }

    #[tokio::test]
    async fn test_rejected_submit_keeps_input() {
        let (mut c, _) = active_controller(ScriptedService::with_token("tok"));
        c.set_input("   ");
        assert_eq!(c.submit_input().await, DispatchOutcome::Rejected(Rejection::EmptyQuery));
        assert_eq!(c.input(), "   ");
    }

    // ── Split submit/settle ───────────────────────────────────────────────────

    #[test]
    fn test_submit_then_settle_answer() {
        let (mut c, service) = active_controller(ScriptedService::with_token("tok"));
        c.set_input("Var hämtar jag ut arbetskläder?");
        let request = c.submit().unwrap();
        assert_eq!(c.input(), "");
        assert_eq!(c.snapshot().in_flight(), Some(request.seq));
        assert_eq!(service.chat_calls(), 0);

        let applied = c.settle(
            request.seq,
            Ok(ExchangeResponse {
                text: "I förrådet.".into(),
                citations: Default::default(),
            }),
        );
        assert!(applied);
        assert_eq!(log_len(&c), 5);
        assert!(!c.snapshot().is_in_flight());
    }

    #[test]
    fn test_settle_for_other_request_changes_nothing() {
        let (mut c, _) = active_controller(ScriptedService::with_token("tok"));
        c.set_input("fråga");
        let request = c.submit().unwrap();
        let before = c.snapshot().clone();

        assert!(!c.settle(RequestSeq(request.seq.0 + 1), Err(DispatchFailure::Abandoned)));
        assert_eq!(c.snapshot(), &before);
    }

    #[test]
    fn test_restore_skipped_when_user_typed_meanwhile() {
        let (c, _) = active_controller(ScriptedService::with_token("tok"));
        let mut c = c.restore_draft_on_failure(true);
        c.set_input("första");
        let request = c.submit().unwrap();
        c.set_input("andra");
        c.settle(request.seq, Err(DispatchFailure::Status(502)));
        assert_eq!(c.input(), "andra");
    }
}
