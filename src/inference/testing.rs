//! Instrumented engine double for tests

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::inference::engine::{
    EngineCapability, EngineError, LoadParams, LoadedModel, SamplingParams, TokenStream,
};

/// Observations shared between a [`FakeEngine`] and the test holding it
#[derive(Clone, Default)]
pub struct Probe {
    load_calls: Arc<AtomicUsize>,
    generate_calls: Arc<AtomicUsize>,
    last_load_params: Arc<Mutex<Option<LoadParams>>>,
    last_sampling: Arc<Mutex<Option<SamplingParams>>>,
    intervals: Arc<Mutex<Vec<(Instant, Instant)>>>,
}

impl Probe {
    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn last_load_params(&self) -> Option<LoadParams> {
        self.last_load_params.lock().unwrap().clone()
    }

    pub fn last_sampling(&self) -> Option<SamplingParams> {
        self.last_sampling.lock().unwrap().clone()
    }

    /// Start/end of every generation, sorted by start
    pub fn intervals(&self) -> Vec<(Instant, Instant)> {
        let mut intervals = self.intervals.lock().unwrap().clone();
        intervals.sort_by_key(|(start, _)| *start);
        intervals
    }
}

/// Engine that replays scripted fragments
pub struct FakeEngine {
    probe: Probe,
    fragments: Vec<String>,
    fail_after: Option<usize>,
    start_error: Option<fn() -> EngineError>,
    load_error: Option<String>,
    load_delay: Duration,
    fragment_delay: Duration,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            probe: Probe::default(),
            fragments: vec![" Hello".to_string(), " from".to_string(), " llama".to_string()],
            fail_after: None,
            start_error: None,
            load_error: None,
            load_delay: Duration::ZERO,
            fragment_delay: Duration::ZERO,
        }
    }

    pub fn probe(&self) -> Probe {
        self.probe.clone()
    }

    pub fn with_fragments(mut self, fragments: &[&str]) -> Self {
        self.fragments = fragments.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Yield `count` fragments, then an error
    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    /// Refuse to start generating
    pub fn failing_start(mut self, error: fn() -> EngineError) -> Self {
        self.start_error = Some(error);
        self
    }

    pub fn failing_load(mut self, message: &str) -> Self {
        self.load_error = Some(message.to_string());
        self
    }

    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    pub fn with_fragment_delay(mut self, delay: Duration) -> Self {
        self.fragment_delay = delay;
        self
    }
}

impl EngineCapability for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    fn load(&mut self, _path: &Path, params: &LoadParams) -> Result<LoadedModel, EngineError> {
        self.probe.load_calls.fetch_add(1, Ordering::SeqCst);
        *self.probe.last_load_params.lock().unwrap() = Some(params.clone());
        std::thread::sleep(self.load_delay);
        match &self.load_error {
            Some(message) => Err(EngineError::Load(message.clone())),
            None => Ok(LoadedModel {
                name: "fake-model".to_string(),
            }),
        }
    }

    fn generate<'a>(
        &'a self,
        _prompt: &str,
        params: &SamplingParams,
    ) -> Result<TokenStream<'a>, EngineError> {
        self.probe.generate_calls.fetch_add(1, Ordering::SeqCst);
        *self.probe.last_sampling.lock().unwrap() = Some(params.clone());
        if let Some(error) = self.start_error {
            return Err(error());
        }
        Ok(Box::new(FakeStream {
            engine: self,
            index: 0,
            started: Instant::now(),
        }))
    }
}

struct FakeStream<'a> {
    engine: &'a FakeEngine,
    index: usize,
    started: Instant,
}

impl Iterator for FakeStream<'_> {
    type Item = Result<String, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.engine.fail_after == Some(self.index) {
            self.index = usize::MAX;
            return Some(Err(EngineError::Decode("simulated decode failure".to_string())));
        }
        let fragment = self.engine.fragments.get(self.index)?.clone();
        self.index += 1;
        std::thread::sleep(self.engine.fragment_delay);
        Some(Ok(fragment))
    }
}

impl Drop for FakeStream<'_> {
    fn drop(&mut self) {
        self.engine
            .probe
            .intervals
            .lock()
            .unwrap()
            .push((self.started, Instant::now()));
    }
}
