//! Shared test transports.

#![allow(dead_code)]

use http::{HeaderMap, StatusCode};
use jsonfetch::{RawResponse, Request, Transport, TransportError};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// What one scripted attempt should do.
pub enum Step {
    Respond(RawResponse),
    Fail(&'static str),
    /// Never resolves; used to observe cancellation of in-flight attempts.
    Hang,
}

impl Step {
    pub fn json(status: u16, body: &'static str) -> Self {
        Step::Respond(RawResponse::http(
            StatusCode::from_u16(status).unwrap(),
            HeaderMap::new(),
            body,
        ))
    }
}

/// Plays back a script of steps, repeating the last one forever.
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    last: Mutex<Option<Step>>,
    calls: AtomicUsize,
    finished: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
        }
    }

    pub fn always(step: Step) -> Self {
        Self::new(vec![step])
    }

    /// Number of attempts started.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of attempts that ran to completion.
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Step {
        let mut steps = self.steps.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        match steps.pop_front() {
            Some(step) if steps.is_empty() => {
                *last = Some(step.duplicate());
                step
            }
            Some(step) => step,
            None => last
                .as_ref()
                .map(Step::duplicate)
                .unwrap_or(Step::Fail("script exhausted")),
        }
    }
}

impl Step {
    fn duplicate(&self) -> Step {
        match self {
            Step::Respond(raw) => Step::Respond(raw.clone()),
            Step::Fail(message) => Step::Fail(message),
            Step::Hang => Step::Hang,
        }
    }
}

impl Transport for ScriptedTransport {
    fn send(
        &self,
        _request: &Request,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.next_step();

        async move {
            let result = match step {
                Step::Respond(raw) => Ok(raw),
                Step::Fail(message) => Err(TransportError::other(message)),
                Step::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            };
            self.finished.fetch_add(1, Ordering::SeqCst);
            result
        }
    }
}

/// Answers after a fixed delay.
pub struct SlowTransport {
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl SlowTransport {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
        }
    }
}

impl Transport for SlowTransport {
    fn send(
        &self,
        _request: &Request,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay;

        async move {
            tokio::time::sleep(delay).await;
            Ok(RawResponse::http(StatusCode::OK, HeaderMap::new(), "{}"))
        }
    }
}

pub fn request() -> Request {
    Request::get("http://api.mysite.com/test").unwrap()
}
