//! Example demonstrating custom recovery policies.
//!
//! This example shows how to:
//! - Keep the default bounded retry (3 retries, 4 attempts)
//! - Retry only transient failures
//! - Special-case one error kind with a closure
//! - Load retry settings from JSON
//! - Cancel a fetch from another task
//!
//! Run with: `cargo run --example custom_retry`

use jsonfetch::policy::{self, BoundedRetry, RecoveryPolicy, TransientOnly};
use jsonfetch::{
    Backoff, FetchConfig, FetchError, Fetcher, JsonObject, Request, ReqwestTransport,
    RetryDecision,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const URL: &str = "https://jsonplaceholder.typicode.com/posts/1";

#[tokio::main]
async fn main() -> Result<(), FetchError> {
    tracing_subscriber::fmt()
        .with_env_filter("jsonfetch=info,custom_retry=info")
        .init();

    let transport = ReqwestTransport::new();
    let request = Request::get(URL)?;

    println!("=== Example 1: Default bounded retry ===");
    let fetcher = Fetcher::new(transport.clone());
    match fetcher.fetch(&request).await {
        Ok(object) => println!("Success! Title: {:?}", object.get("title")),
        Err(e) => println!("Failed: {}", e),
    }
    println!();

    println!("=== Example 2: Retry only transient failures ===");
    let fetcher = Fetcher::builder(transport.clone())
        .recovery_policy(TransientOnly::new(3))
        .backoff(Backoff::Exponential {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            jitter: true,
        })
        .build()?;

    println!("This fetcher gives up immediately on 4xx and malformed payloads");
    match fetcher.fetch_response::<JsonObject>(&request).await {
        Ok(response) => println!("Success! Attempts: {}", response.attempts),
        Err(e) => println!("Failed: {}", e),
    }
    println!();

    println!("=== Example 3: Re-authenticate on 401, then retry ===");
    let refreshes = Arc::new(AtomicUsize::new(0));
    let refreshes_clone = refreshes.clone();
    let bounded = BoundedRetry::default();

    let fetcher = Fetcher::builder(transport.clone())
        .recovery_policy(policy::from_fn(move |error: &FetchError, attempt| {
            match error.status().map(|s| s.as_u16()) {
                Some(401) => {
                    // A real client would refresh its token here.
                    refreshes_clone.fetch_add(1, Ordering::SeqCst);
                    RetryDecision::Retry
                }
                _ => bounded.decide(error, attempt),
            }
        }))
        .build()?;

    match fetcher.fetch(&request).await {
        Ok(_) => println!(
            "Success! Token refreshes: {}",
            refreshes.load(Ordering::SeqCst)
        ),
        Err(e) => println!("Failed: {}", e),
    }
    println!();

    println!("=== Example 4: Settings from JSON ===");
    let config = FetchConfig::from_json_str(
        r#"{
            "max_retries": 2,
            "attempt_timeout_ms": 5000,
            "backoff": { "kind": "fixed", "delay_ms": 250 }
        }"#,
    )?;
    println!("Loaded config: {:?}", config);

    let fetcher = Fetcher::builder(transport.clone()).config(config).build()?;
    match fetcher.fetch(&request).await {
        Ok(object) => println!("Success! {} keys", object.len()),
        Err(e) => println!("Failed: {}", e),
    }
    println!();

    println!("=== Example 5: Cancelling a fetch ===");
    let cancel = CancellationToken::new();
    let fetcher = Fetcher::builder(transport)
        .backoff(Backoff::Fixed {
            delay: Duration::from_secs(1),
        })
        .build()?;

    let handle = {
        let cancel = cancel.clone();
        let request = Request::get("https://httpstat.us/503")?;
        tokio::spawn(async move {
            fetcher
                .fetch_with_cancel::<JsonObject>(&request, &cancel)
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(1500)).await;
    cancel.cancel();

    match handle.await {
        Ok(Err(FetchError::Cancelled { attempts })) => {
            println!("Cancelled after {} failed attempts", attempts)
        }
        Ok(other) => println!("Finished before cancellation: {:?}", other.map(|r| r.attempts)),
        Err(e) => println!("Task failed: {}", e),
    }

    Ok(())
}
