//! Turns the current input state into one birth chart request and maps the
//! outcome back into the session.

use std::{sync::Arc, time::Duration};

use log::{info, warn};

use crate::error::{TransportError, WorkflowError};
use crate::service::ChartService;
use crate::session::Session;
use crate::state::RequestState;

#[derive(Debug, Clone)]
pub struct RequestOrchestrator {
    session: Session,
    service: Arc<dyn ChartService>,
    timeout: Duration,
}

impl RequestOrchestrator {
    pub fn new(session: Session, service: Arc<dyn ChartService>, timeout: Duration) -> Self {
        Self { session, service, timeout }
    }

    /// Submit the form.
    ///
    /// Refuses without touching the network when a timezone is still
    /// resolving, a request is already in flight, or inputs are missing.
    /// Otherwise performs exactly one request; transport failures are
    /// recorded as [`RequestState::Failed`], not returned. There are no
    /// automatic retries.
    pub async fn submit(&self) -> Result<RequestState, WorkflowError> {
        let ticket = match self.session.update(|form| form.begin_submission()) {
            Ok(ticket) => ticket,
            Err(e) => {
                info!("submission refused: {e}");
                return Err(e);
            }
        };

        let outcome = match tokio::time::timeout(self.timeout, self.service.fetch_chart(&ticket.query))
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(TransportError::Timeout(self.timeout)),
        };

        let outcome = outcome.map_err(|e| {
            warn!("birth chart request failed: {e}");
            e.user_message()
        });

        let applied = self.session.update(|form| form.complete_submission(&ticket, outcome));
        if !applied {
            info!("discarding birth chart response superseded by an edit");
        }

        Ok(self.session.request_state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CITY_REQUIRED_MESSAGE, FALLBACK_MESSAGE};
    use crate::model::{ChartQuery, TimezoneOffset};
    use crate::service::outcome_from_response;
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveTime};
    use reqwest::StatusCode;
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    const TIMEOUT: Duration = Duration::from_secs(5);

    /// Replies with a canned HTTP status and body and records every query.
    #[derive(Debug)]
    struct CannedService {
        status: StatusCode,
        body: &'static str,
        queries: Mutex<Vec<ChartQuery>>,
    }

    impl CannedService {
        fn new(status: StatusCode, body: &'static str) -> Arc<Self> {
            Arc::new(Self { status, body, queries: Mutex::new(Vec::new()) })
        }

        fn calls(&self) -> Vec<ChartQuery> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChartService for CannedService {
        async fn fetch_chart(&self, query: &ChartQuery) -> Result<Value, TransportError> {
            self.queries.lock().unwrap().push(query.clone());
            outcome_from_response(self.status, self.body)
        }
    }

    /// Holds every request until released.
    #[derive(Debug, Default)]
    struct HeldService {
        release: Notify,
    }

    #[async_trait]
    impl ChartService for HeldService {
        async fn fetch_chart(&self, _: &ChartQuery) -> Result<Value, TransportError> {
            self.release.notified().await;
            Ok(json!({"sun": "Leo"}))
        }
    }

    fn ready_session() -> Session {
        let session = Session::new();
        session.set_date(NaiveDate::from_ymd_opt(1990, 3, 15).unwrap()).unwrap();
        session.set_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap()).unwrap();
        session.set_city("Berlin, Germany");
        session.set_manual_timezone(TimezoneOffset::from_hours(1.0).unwrap());
        assert!(session.request_state().is_ready());
        session
    }

    #[tokio::test]
    async fn success_stores_body_unchanged() {
        let session = ready_session();
        let service = CannedService::new(StatusCode::OK, r#"{"sun":"Aries"}"#);
        let orchestrator = RequestOrchestrator::new(session.clone(), service.clone(), TIMEOUT);

        let state = orchestrator.submit().await.unwrap();
        assert_eq!(state, RequestState::Succeeded(json!({"sun": "Aries"})));

        let calls = service.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].moment_fields(), ["1990", "03", "15", "12", "00"]);
        assert_eq!(calls[0].city, "Berlin, Germany");
        assert_eq!(calls[0].tz_offset.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn client_error_message_is_surfaced() {
        let session = ready_session();
        let service = CannedService::new(StatusCode::BAD_REQUEST, r#"{"error":"invalid city"}"#);
        let orchestrator = RequestOrchestrator::new(session.clone(), service, TIMEOUT);

        let state = orchestrator.submit().await.unwrap();
        assert_eq!(state, RequestState::Failed("invalid city".into()));
    }

    #[tokio::test]
    async fn unreadable_server_error_uses_fallback() {
        let session = ready_session();
        let service = CannedService::new(StatusCode::INTERNAL_SERVER_ERROR, "");
        let orchestrator = RequestOrchestrator::new(session, service, TIMEOUT);

        let state = orchestrator.submit().await.unwrap();
        assert_eq!(state, RequestState::Failed(FALLBACK_MESSAGE.into()));
    }

    #[tokio::test]
    async fn failed_request_can_be_resubmitted() {
        let session = ready_session();
        let service = CannedService::new(StatusCode::BAD_GATEWAY, "");
        let orchestrator = RequestOrchestrator::new(session, service.clone(), TIMEOUT);

        orchestrator.submit().await.unwrap();
        let state = orchestrator.submit().await.unwrap();

        assert!(matches!(state, RequestState::Failed(_)));
        assert_eq!(service.calls().len(), 2);
    }

    #[tokio::test]
    async fn empty_city_never_reaches_network() {
        let session = ready_session();
        session.set_city("");
        session.set_manual_timezone(TimezoneOffset::from_hours(1.0).unwrap());
        let service = CannedService::new(StatusCode::OK, "{}");
        let orchestrator = RequestOrchestrator::new(session.clone(), service.clone(), TIMEOUT);

        let err = orchestrator.submit().await.unwrap_err();
        assert_eq!(err, WorkflowError::Validation(CITY_REQUIRED_MESSAGE.into()));
        assert_eq!(session.snapshot().notice(), Some(CITY_REQUIRED_MESSAGE));
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn second_submit_while_in_flight_is_refused() {
        let session = ready_session();
        let service = Arc::new(HeldService::default());
        let orchestrator = RequestOrchestrator::new(session.clone(), service.clone(), TIMEOUT);

        let first = tokio::spawn({
            let orchestrator = orchestrator.clone();
            async move { orchestrator.submit().await }
        });
        tokio::task::yield_now().await;
        assert_eq!(session.request_state(), RequestState::Submitting);

        assert_eq!(orchestrator.submit().await.unwrap_err(), WorkflowError::Busy);

        service.release.notify_one();
        let state = first.await.unwrap().unwrap();
        assert_eq!(state, RequestState::Succeeded(json!({"sun": "Leo"})));
    }

    #[tokio::test]
    async fn hung_request_times_out() {
        let session = ready_session();
        let service = Arc::new(HeldService::default());
        let orchestrator =
            RequestOrchestrator::new(session, service, Duration::from_millis(20));

        let state = orchestrator.submit().await.unwrap();
        assert!(matches!(state, RequestState::Failed(message) if message.contains("in time")));
    }
}
