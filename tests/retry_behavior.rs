//! Retry, recovery-policy and cancellation behaviour against scripted
//! transports.

mod common;

use common::{request, ScriptedTransport, SlowTransport, Step};
use jsonfetch::policy::{self, NeverRetry, TransientOnly};
use jsonfetch::{
    Backoff, FetchError, FetchErrorKind, Fetcher, JsonObject, RetryDecision, TransportError,
};
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_object_payload_resolves_after_one_call() {
    let fetcher = Fetcher::new(ScriptedTransport::always(Step::json(
        200,
        r#"{"id": 1, "name": "Test"}"#,
    )));

    let object = fetcher.fetch(&request()).await.unwrap();

    assert_eq!(object["id"], 1);
    assert_eq!(object["name"], "Test");
    assert_eq!(fetcher.transport().calls(), 1);
}

#[tokio::test]
async fn test_bad_status_exhausts_default_budget() {
    let fetcher = Fetcher::new(ScriptedTransport::always(Step::json(503, "unavailable")));

    let err = fetcher.fetch(&request()).await.unwrap_err();

    match &err {
        FetchError::RetriesExhausted {
            attempts,
            last_error,
        } => {
            assert_eq!(*attempts, 4);
            assert_eq!(last_error.kind(), FetchErrorKind::BadStatusCode);
        }
        other => panic!("Expected RetriesExhausted, got {:?}", other),
    }
    assert_eq!(err.status().map(|s| s.as_u16()), Some(503));
    assert_eq!(err.raw_response(), Some("unavailable"));
    assert_eq!(fetcher.transport().calls(), 4);
}

#[tokio::test]
async fn test_array_payload_is_decode_failure() {
    let fetcher = Fetcher::new(ScriptedTransport::always(Step::json(200, "[1,2,3]")));

    let err = fetcher.fetch(&request()).await.unwrap_err();

    assert_eq!(err.root_cause().kind(), FetchErrorKind::DecodeFailure);
    assert_eq!(fetcher.transport().calls(), 4);
}

#[tokio::test]
async fn test_empty_payload_is_bad_data_and_retried() {
    let fetcher = Fetcher::builder(ScriptedTransport::new(vec![
        Step::json(200, ""),
        Step::json(204, ""),
        Step::json(200, r#"{"ok": true}"#),
    ]))
    .build()
    .unwrap();

    let response = fetcher
        .fetch_response::<JsonObject>(&request())
        .await
        .unwrap();

    assert_eq!(response.data["ok"], true);
    assert_eq!(response.attempts, 3);
    assert!(response.was_retried());
    assert_eq!(fetcher.transport().calls(), 3);
}

#[tokio::test]
async fn test_missing_metadata_is_invalid_response() {
    let fetcher = Fetcher::builder(ScriptedTransport::always(Step::Respond(
        jsonfetch::RawResponse::default(),
    )))
    .max_retries(1)
    .build()
    .unwrap();

    let err = fetcher.fetch(&request()).await.unwrap_err();

    assert_eq!(err.root_cause().kind(), FetchErrorKind::InvalidResponse);
    assert_eq!(fetcher.transport().calls(), 2);
}

#[tokio::test]
async fn test_transport_failures_then_success() {
    let fetcher = Fetcher::new(ScriptedTransport::new(vec![
        Step::Fail("connection reset"),
        Step::Fail("connection reset"),
        Step::json(200, r#"{"id": 9}"#),
    ]));

    let object = fetcher.fetch(&request()).await.unwrap();

    assert_eq!(object["id"], 9);
    assert_eq!(fetcher.transport().calls(), 3);
}

#[tokio::test]
async fn test_policy_sees_each_error_with_increasing_index() {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen_clone = seen.clone();

    let fetcher = Fetcher::builder(ScriptedTransport::new(vec![
        Step::Fail("dns"),
        Step::json(500, "boom"),
        Step::json(200, "{"),
    ]))
    .recovery_policy(policy::from_fn(move |error: &FetchError, attempt| {
        seen_clone.lock().unwrap().push((error.kind(), attempt));
        if attempt < 2 {
            RetryDecision::Retry
        } else {
            RetryDecision::Propagate
        }
    }))
    .build()
    .unwrap();

    let err = fetcher.fetch(&request()).await.unwrap_err();

    assert!(matches!(err, FetchError::RetriesExhausted { attempts: 3, .. }));
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (FetchErrorKind::TransportFailure, 0),
            (FetchErrorKind::BadStatusCode, 1),
            (FetchErrorKind::DecodeFailure, 2),
        ]
    );
}

#[tokio::test]
async fn test_policy_can_special_case_unauthorized() {
    let refreshes = Arc::new(AtomicUsize::new(0));
    let refreshes_clone = refreshes.clone();

    let fetcher = Fetcher::builder(ScriptedTransport::new(vec![
        Step::json(401, "expired token"),
        Step::json(200, r#"{"user": "alice"}"#),
    ]))
    .recovery_policy(policy::from_fn(move |error: &FetchError, _attempt| {
        match error.status().map(|s| s.as_u16()) {
            Some(401) => {
                refreshes_clone.fetch_add(1, Ordering::SeqCst);
                RetryDecision::Retry
            }
            _ => RetryDecision::Propagate,
        }
    }))
    .build()
    .unwrap();

    let object = fetcher.fetch(&request()).await.unwrap();

    assert_eq!(object["user"], "alice");
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_never_retry_wraps_first_failure() {
    let fetcher = Fetcher::builder(ScriptedTransport::always(Step::json(500, "boom")))
        .recovery_policy(NeverRetry)
        .build()
        .unwrap();

    let err = fetcher.fetch(&request()).await.unwrap_err();

    assert!(matches!(err, FetchError::RetriesExhausted { attempts: 1, .. }));
    assert_eq!(fetcher.transport().calls(), 1);
}

#[tokio::test]
async fn test_transient_only_skips_client_errors() {
    let fetcher = Fetcher::builder(ScriptedTransport::always(Step::json(404, "missing")))
        .recovery_policy(TransientOnly::new(3))
        .build()
        .unwrap();

    let err = fetcher.fetch(&request()).await.unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
    assert_eq!(fetcher.transport().calls(), 1);
}

#[tokio::test]
async fn test_typed_fetch() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: u64,
        name: String,
    }

    let fetcher = Fetcher::builder(ScriptedTransport::new(vec![
        Step::json(200, r#"{"id": "wrong"}"#),
        Step::json(200, r#"{"id": 1, "name": "Alice"}"#),
    ]))
    .build()
    .unwrap();

    let user: User = fetcher.fetch_as(&request()).await.unwrap();

    assert_eq!(
        user,
        User {
            id: 1,
            name: "Alice".to_string()
        }
    );
    assert_eq!(fetcher.transport().calls(), 2);
}

#[tokio::test]
async fn test_attempt_timeout_is_transport_failure() {
    let fetcher = Fetcher::builder(SlowTransport::new(Duration::from_secs(10)))
        .max_retries(1)
        .attempt_timeout(Duration::from_millis(20))
        .build()
        .unwrap();

    let err = fetcher.fetch(&request()).await.unwrap_err();

    match err.root_cause() {
        FetchError::TransportFailure(TransportError::Timeout(timeout)) => {
            assert_eq!(*timeout, Duration::from_millis(20));
        }
        other => panic!("Expected timeout, got {:?}", other),
    }
    assert_eq!(fetcher.transport().calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_timeout_is_per_attempt() {
    // The fetch as a whole outlasts the 50ms timeout; no single attempt does.
    let fetcher = Fetcher::builder(ScriptedTransport::new(vec![
        Step::Fail("reset"),
        Step::Fail("reset"),
        Step::json(200, "{}"),
    ]))
    .attempt_timeout(Duration::from_millis(50))
    .backoff(Backoff::Fixed {
        delay: Duration::from_millis(30),
    })
    .build()
    .unwrap();

    let response = fetcher
        .fetch_response::<JsonObject>(&request())
        .await
        .unwrap();

    assert_eq!(response.attempts, 3);
    assert!(response.latency >= Duration::from_millis(60));
}

#[tokio::test]
async fn test_cancel_between_attempts_prevents_next_attempt() {
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();

    // The policy runs after attempt 1 fails and before attempt 2 is
    // scheduled; cancelling there must stop the fetch.
    let fetcher = Fetcher::builder(ScriptedTransport::always(Step::json(500, "boom")))
        .recovery_policy(policy::from_fn(move |_error: &FetchError, attempt| {
            if attempt == 1 {
                cancel_clone.cancel();
            }
            RetryDecision::Retry
        }))
        .build()
        .unwrap();

    let err = fetcher
        .fetch_with_cancel::<JsonObject>(&request(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Cancelled { attempts: 2 }));
    assert_eq!(fetcher.transport().calls(), 2);
}

#[tokio::test]
async fn test_cancel_during_backoff() {
    let fetcher = Fetcher::builder(ScriptedTransport::always(Step::Fail("reset")))
        .backoff(Backoff::Fixed {
            delay: Duration::from_secs(60),
        })
        .build()
        .unwrap();
    let cancel = CancellationToken::new();

    let fetch = {
        let fetcher = fetcher.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            fetcher
                .fetch_with_cancel::<JsonObject>(&request(), &cancel)
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let err = fetch.await.unwrap().unwrap_err();
    assert!(matches!(err, FetchError::Cancelled { attempts: 1 }));
    assert_eq!(fetcher.transport().calls(), 1);
}

#[tokio::test]
async fn test_cancel_drops_in_flight_attempt() {
    let fetcher = Fetcher::new(ScriptedTransport::always(Step::Hang));
    let cancel = CancellationToken::new();

    let fetch = {
        let fetcher = fetcher.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            fetcher
                .fetch_with_cancel::<JsonObject>(&request(), &cancel)
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let err = fetch.await.unwrap().unwrap_err();
    assert!(matches!(err, FetchError::Cancelled { attempts: 0 }));
    assert_eq!(fetcher.transport().calls(), 1);
    assert_eq!(fetcher.transport().finished(), 0);
}

#[tokio::test]
async fn test_dropping_fetch_stops_retries() {
    let fetcher = Fetcher::builder(ScriptedTransport::always(Step::Fail("reset")))
        .recovery_policy(policy::from_fn(|_: &FetchError, _| RetryDecision::Retry))
        .backoff(Backoff::Fixed {
            delay: Duration::from_millis(20),
        })
        .build()
        .unwrap();

    let result = tokio::time::timeout(Duration::from_millis(70), fetcher.fetch(&request())).await;
    assert!(result.is_err());

    let calls = fetcher.transport().calls();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fetcher.transport().calls(), calls);
}

#[tokio::test]
async fn test_always_retry_only_ends_by_external_deadline() {
    let fetcher = Fetcher::builder(ScriptedTransport::always(Step::json(500, "boom")))
        .recovery_policy(policy::from_fn(|_: &FetchError, _| RetryDecision::Retry))
        .build()
        .unwrap();

    let result = tokio::time::timeout(Duration::from_millis(100), fetcher.fetch(&request())).await;

    assert!(result.is_err(), "fetch should still be retrying");
    assert!(fetcher.transport().calls() > 4);
}

#[tokio::test]
async fn test_concurrent_fetches_keep_separate_counters() {
    let fetcher = Fetcher::new(ScriptedTransport::always(Step::json(500, "boom")));

    let (first, second) = (request(), request());
    let (a, b) = tokio::join!(fetcher.fetch(&first), fetcher.fetch(&second));

    assert!(matches!(a, Err(FetchError::RetriesExhausted { attempts: 4, .. })));
    assert!(matches!(b, Err(FetchError::RetriesExhausted { attempts: 4, .. })));
    assert_eq!(fetcher.transport().calls(), 8);
}

#[tokio::test]
async fn test_fetch_pair_joins_both() {
    let fetcher = Fetcher::new(ScriptedTransport::always(Step::json(200, r#"{"id": 1}"#)));

    let (image, video): (JsonObject, JsonObject) = fetcher
        .fetch_pair(&request(), &request())
        .await
        .unwrap();

    assert_eq!(image["id"], 1);
    assert_eq!(video["id"], 1);
    assert_eq!(fetcher.transport().calls(), 2);
}

#[tokio::test]
async fn test_fetch_pair_propagates_first_failure() {
    let fetcher = Fetcher::builder(ScriptedTransport::new(vec![
        Step::Hang,
        Step::json(404, "missing"),
    ]))
    .recovery_policy(NeverRetry)
    .build()
    .unwrap();

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        fetcher.fetch_pair::<JsonObject, JsonObject>(&request(), &request()),
    )
    .await
    .expect("pair should fail fast instead of waiting on the hanging side");

    let err = result.unwrap_err();
    assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
}
