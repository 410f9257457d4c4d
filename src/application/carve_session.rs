//! Carve session use case
//!
//! Orchestrates a complete carving run: the scanner feeds windows to the
//! window carver (sequentially or on a worker pool), and a single collector
//! commits results in window order. The collector alone assigns sequence
//! numbers, applies limits and the overlap policy, talks to the sink and
//! writes checkpoints.

use crate::application::dto::{CarveOptions, CarveProgress, CarveProgressCallback, OverlapPolicy};
use crate::application::error::CarveError;
use crate::application::window_carver::{WindowCarver, WindowOutcome};
use crate::domain::entities::{ArtifactKey, CarveState, CarveSummary, InputIdentity};
use crate::domain::repositories::{ArtifactSink, ByteSource, CheckpointStore, SourceError};
use crate::domain::services::{ChunkScanner, EndPredictor, SignatureRegistry};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

/// Shared flag used to stop a session early
///
/// No new windows are dispatched once cancelled; windows already in flight
/// are finished and committed.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Whether the collector wants more windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// A carving session over one input
///
/// # Example
///
/// ```
/// use artefact::application::{CarveSession, dto::CarveOptions};
/// use artefact::domain::entities::CarvedArtifact;
/// use artefact::domain::repositories::{ByteSource, SinkError};
/// use std::sync::Arc;
///
/// let mut input = vec![0u8; 16];
/// input.extend_from_slice(&[0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3, 0xFF, 0xD9]);
/// let source: Arc<dyn ByteSource> = Arc::new(input);
///
/// let session = CarveSession::new(source, CarveOptions::new().with_formats(["jpg"]));
/// let mut offsets = Vec::new();
/// let mut sink = |artifact: CarvedArtifact| -> Result<(), SinkError> {
///     offsets.push(artifact.origin_offset());
///     Ok(())
/// };
/// let summary = session.run(&mut sink).unwrap();
/// assert_eq!(summary.total_carved(), 1);
/// assert_eq!(offsets, vec![16]);
/// ```
pub struct CarveSession {
    source: Arc<dyn ByteSource>,
    options: CarveOptions,
    registry: SignatureRegistry,
    predictor: Option<Arc<dyn EndPredictor>>,
    checkpoints: Option<Box<dyn CheckpointStore>>,
    cancel: CancelToken,
    scanned: Arc<AtomicU64>,
}

impl CarveSession {
    /// Creates a session over `source` using the built-in registry
    pub fn new(source: Arc<dyn ByteSource>, options: CarveOptions) -> Self {
        Self {
            source,
            options,
            registry: SignatureRegistry::builtin().clone(),
            predictor: None,
            checkpoints: None,
            cancel: CancelToken::new(),
            scanned: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Uses a custom signature registry
    pub fn with_registry(mut self, registry: SignatureRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Consults `predictor` for formats without a derivable size
    pub fn with_predictor(mut self, predictor: Arc<dyn EndPredictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    /// Loads and saves progress through `store`
    pub fn with_checkpoint_store(mut self, store: impl CheckpointStore + 'static) -> Self {
        self.checkpoints = Some(Box::new(store));
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn options(&self) -> &CarveOptions {
        &self.options
    }

    /// Bytes carved by workers so far, resumed range included
    pub fn scanned_bytes(&self) -> u64 {
        self.scanned.load(Ordering::Relaxed)
    }

    /// Executes the session, delivering artifacts to `sink`
    pub fn run(&self, sink: &mut dyn ArtifactSink) -> Result<CarveSummary, CarveError> {
        self.run_with_progress(sink, None)
    }

    /// Executes the session, reporting progress after each committed window
    pub fn run_with_progress(
        &self,
        sink: &mut dyn ArtifactSink,
        progress: Option<CarveProgressCallback>,
    ) -> Result<CarveSummary, CarveError> {
        let started = Instant::now();
        self.options.validate(&self.registry)?;
        let registry = self
            .registry
            .with_max_size_overrides(&self.options.max_artifact_size)?;

        let identity = InputIdentity::compute(self.source.as_ref()).map_err(CarveError::Input)?;
        let (state, resumed) = self.load_state(&identity);
        let start_offset = state.last_offset;
        self.scanned.store(start_offset, Ordering::Relaxed);

        let carver = Arc::new(WindowCarver::new(
            Arc::clone(&self.source),
            &registry,
            &self.options.formats,
            self.predictor.clone(),
            Arc::clone(&self.scanned),
        )?);
        let scanner = ChunkScanner::starting_at(
            Arc::clone(&self.source),
            start_offset,
            self.options.chunk_size,
            self.options.overlap_size,
        );

        tracing::info!(
            "Starting carve of {} ({} bytes) from offset {}: {} mode, {} workers",
            identity.path,
            identity.size,
            start_offset,
            if self.options.parallel { "parallel" } else { "sequential" },
            if self.options.parallel { self.options.workers } else { 1 }
        );

        let mut summary = CarveSummary::new(&identity.path, identity.size);
        summary.resumed_from = resumed.then_some(start_offset);
        let mut collector = Collector::new(
            state,
            summary,
            sink,
            self.checkpoints.as_deref(),
            &self.options,
            progress,
            started,
        );

        let result = if self.options.parallel {
            self.run_parallel(scanner, carver, &mut collector)
        } else {
            self.run_sequential(scanner, &carver, &mut collector)
        };

        if let Err(e) = result {
            tracing::warn!("Carve aborted: {}", e);
            collector.checkpoint();
            return Err(e);
        }
        collector.finish()
    }

    fn load_state(&self, identity: &InputIdentity) -> (CarveState, bool) {
        let Some(store) = self.checkpoints.as_deref() else {
            return (CarveState::fresh(identity.clone()), false);
        };

        match store.load() {
            Ok(Some(state)) if state.matches(identity) => {
                tracing::info!(
                    "Resuming from checkpoint {} at offset {} ({} artifacts emitted)",
                    store.location(),
                    state.last_offset,
                    state.artifact_count
                );
                (state, true)
            }
            Ok(Some(state)) => {
                tracing::warn!(
                    "Checkpoint {} was taken on {} ({} bytes), not this input; starting fresh",
                    store.location(),
                    state.input.path,
                    state.input.size
                );
                (CarveState::fresh(identity.clone()), false)
            }
            Ok(None) => (CarveState::fresh(identity.clone()), false),
            Err(e) => {
                tracing::warn!("Ignoring checkpoint: {}; starting fresh", e);
                (CarveState::fresh(identity.clone()), false)
            }
        }
    }

    fn run_sequential(
        &self,
        scanner: ChunkScanner,
        carver: &WindowCarver,
        collector: &mut Collector<'_>,
    ) -> Result<(), CarveError> {
        for window in scanner {
            if self.cancel.is_cancelled() {
                collector.summary.cancelled = true;
                break;
            }
            let window = window.map_err(|e| collector.read_error(e))?;
            let outcome = carver.carve(&window).map_err(|e| collector.read_error(e))?;
            if collector.commit(outcome)? == Flow::Stop {
                break;
            }
        }
        Ok(())
    }

    /// Fans windows out to a worker pool with a bounded number in flight
    /// and commits results in window order
    fn run_parallel(
        &self,
        mut scanner: ChunkScanner,
        carver: Arc<WindowCarver>,
        collector: &mut Collector<'_>,
    ) -> Result<(), CarveError> {
        let workers = self.options.workers;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("artefact-worker-{}", i))
            .build()
            .map_err(|e| CarveError::Pool(e.to_string()))?;

        let max_in_flight = workers * 2;
        let (result_tx, result_rx) = crossbeam_channel::bounded(max_in_flight);
        let mut in_flight = 0usize;
        let mut scanner_done = false;
        let mut scan_error: Option<SourceError> = None;
        let mut failure: Option<CarveError> = None;
        let mut stopped = false;

        // results waiting for the windows before them
        let mut pending: BTreeMap<usize, Result<WindowOutcome, SourceError>> = BTreeMap::new();
        let mut next_commit = 0usize;

        loop {
            while !scanner_done && in_flight < max_in_flight {
                if stopped || failure.is_some() {
                    scanner_done = true;
                    break;
                }
                if self.cancel.is_cancelled() {
                    collector.summary.cancelled = true;
                    scanner_done = true;
                    break;
                }
                match scanner.next_window() {
                    Ok(Some(window)) => {
                        let tx = result_tx.clone();
                        let carver = Arc::clone(&carver);
                        pool.spawn(move || {
                            let _ = tx.send((window.index(), carver.carve(&window)));
                        });
                        in_flight += 1;
                    }
                    Ok(None) => scanner_done = true,
                    Err(e) => {
                        scan_error = Some(e);
                        scanner_done = true;
                    }
                }
            }

            if in_flight == 0 {
                break;
            }

            match result_rx.recv() {
                Ok((index, result)) => {
                    in_flight -= 1;
                    pending.insert(index, result);
                }
                Err(crossbeam_channel::RecvError) => break,
            }

            while let Some(result) = pending.remove(&next_commit) {
                next_commit += 1;
                if stopped || failure.is_some() {
                    continue;
                }
                match result.map_err(|e| collector.read_error(e)) {
                    Ok(outcome) => match collector.commit(outcome) {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Stop) => stopped = true,
                        Err(e) => failure = Some(e),
                    },
                    Err(e) => failure = Some(e),
                }
            }
        }

        match (failure, scan_error) {
            (Some(e), _) => Err(e),
            (None, Some(e)) if !stopped => Err(collector.read_error(e)),
            _ => Ok(()),
        }
    }
}

/// Single writer for delivery, statistics and checkpoints
struct Collector<'a> {
    state: CarveState,
    summary: CarveSummary,
    sink: &'a mut dyn ArtifactSink,
    store: Option<&'a dyn CheckpointStore>,
    overlap_policy: OverlapPolicy,
    max_total: Option<u64>,
    max_per_format: Option<u64>,
    checkpoint_interval: u64,
    since_checkpoint: u64,
    /// Artifacts per format, resumed ones included
    per_format: BTreeMap<String, u64>,
    progress: Option<CarveProgressCallback>,
    started: Instant,
}

impl<'a> Collector<'a> {
    fn new(
        state: CarveState,
        summary: CarveSummary,
        sink: &'a mut dyn ArtifactSink,
        store: Option<&'a dyn CheckpointStore>,
        options: &CarveOptions,
        progress: Option<CarveProgressCallback>,
        started: Instant,
    ) -> Self {
        let mut per_format = BTreeMap::new();
        for key in &state.emitted {
            if let Some((format_id, _)) = key.rsplit_once('@') {
                *per_format.entry(format_id.to_string()).or_insert(0) += 1;
            }
        }

        Self {
            state,
            summary,
            sink,
            store,
            overlap_policy: options.overlap_policy,
            max_total: options.max_total,
            max_per_format: options.max_per_format,
            checkpoint_interval: options.checkpoint_interval,
            since_checkpoint: 0,
            per_format,
            progress,
            started,
        }
    }

    fn read_error(&self, source: SourceError) -> CarveError {
        CarveError::Read {
            bytes_processed: self.state.bytes_processed,
            source,
        }
    }

    fn total_reached(&self) -> bool {
        self.max_total
            .is_some_and(|limit| self.state.artifact_count >= limit)
    }

    /// Commits one window; must be called in window order
    fn commit(&mut self, outcome: WindowOutcome) -> Result<Flow, CarveError> {
        for (&format_id, stats) in &outcome.stats {
            self.summary.format_mut(format_id).merge(stats);
        }

        // a window cut short by the total limit is not marked processed,
        // so a resumed run revisits it
        let mut truncated = false;

        for range in outcome.carved {
            let key = ArtifactKey::new(range.format_id, range.origin_offset);
            if self.state.has_emitted(&key) {
                self.summary.format_mut(range.format_id).duplicates += 1;
                continue;
            }

            let covered = self.state.covered_until(range.format_id);
            if self.overlap_policy == OverlapPolicy::SkipContained && range.origin_offset < covered {
                tracing::debug!("{}: skipping candidate inside earlier artifact", key);
                self.summary.format_mut(range.format_id).overlapped += 1;
                continue;
            }

            let format_count = self.per_format.get(range.format_id).copied().unwrap_or(0);
            if self.max_per_format.is_some_and(|limit| format_count >= limit) {
                self.summary.format_mut(range.format_id).limited += 1;
                continue;
            }
            if self.total_reached() {
                self.summary.format_mut(range.format_id).limited += 1;
                truncated = true;
                continue;
            }

            let format_id = range.format_id;
            let end = range.end_offset();
            let len = range.content.len() as u64;
            let artifact = range.into_artifact(self.state.artifact_count);
            self.sink
                .deliver(artifact)
                .map_err(|source| CarveError::Sink {
                    emitted: self.state.artifact_count,
                    source,
                })?;

            self.state.record(&key);
            *self.per_format.entry(format_id.to_string()).or_insert(0) += 1;
            self.state.cover(format_id, end);
            let stats = self.summary.format_mut(format_id);
            stats.carved += 1;
            stats.bytes_carved += len;
        }

        if !truncated {
            self.state.advance(outcome.owned_len, outcome.owned_end);
            self.summary.bytes_scanned += outcome.owned_len;
            self.summary.windows += 1;
            self.since_checkpoint += outcome.owned_len;
            if self.since_checkpoint >= self.checkpoint_interval {
                self.checkpoint();
            }
        }
        self.report_progress();

        if self.total_reached() {
            self.summary.limit_reached = true;
            tracing::info!(
                "Artifact limit of {} reached at offset {}",
                self.state.artifact_count,
                outcome.owned_end
            );
            return Ok(Flow::Stop);
        }
        Ok(Flow::Continue)
    }

    fn report_progress(&self) {
        if let Some(callback) = &self.progress {
            callback(&CarveProgress {
                total_bytes: self.summary.total_bytes,
                scanned_bytes: self.state.last_offset,
                artifacts: self.state.artifact_count,
                elapsed: self.started.elapsed(),
            });
        }
    }

    /// Saves the current state; failures are logged, never fatal
    fn checkpoint(&mut self) {
        self.since_checkpoint = 0;
        let Some(store) = self.store else {
            return;
        };
        match store.save(&self.state) {
            Ok(()) => tracing::debug!(
                "Checkpoint written to {} at offset {}",
                store.location(),
                self.state.last_offset
            ),
            Err(e) => tracing::warn!("Failed to write checkpoint: {}", e),
        }
    }

    fn finish(mut self) -> Result<CarveSummary, CarveError> {
        if self.summary.is_complete() {
            self.state.completed = true;
        }
        self.checkpoint();
        self.sink.finish().map_err(|source| CarveError::Sink {
            emitted: self.state.artifact_count,
            source,
        })?;

        self.summary.duration = self.started.elapsed();
        tracing::info!(
            "Carve finished: {} artifacts from {} candidates in {:.2}s",
            self.summary.total_carved(),
            self.summary.total_candidates(),
            self.summary.duration.as_secs_f64()
        );
        Ok(self.summary)
    }
}
