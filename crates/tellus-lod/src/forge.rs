//! The chunk forge: a fixed pool of geometry workers fed from a FIFO queue.
//!
//! Workers never touch chunks. They receive a [`BuildRequest`] by value and
//! send back mesh buffers; everything that mutates chunks or the scene happens
//! in [`ChunkForge::update`], on the update thread, at most
//! `max_applies_per_frame` times per frame.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use tellus_terrain::{BuildRequest, ChunkMeshData, TerrainGenerator};
use tracing::{error, info, trace, warn};

use crate::scene::SceneBackend;
use crate::{ChunkId, ChunkStore};

/// Build geometry for one chunk.
#[derive(Clone, Debug)]
pub struct BuildTask {
    pub chunk: ChunkId,
    pub request: BuildRequest,
}

/// Dispose chunks once the build queued directly before this task is applied.
#[derive(Clone, Debug, Default)]
pub struct DeleteTask {
    pub chunks: Vec<ChunkId>,
}

/// Work accepted by [`ChunkForge::submit`].
///
/// The chunk trees only submit builds; replaced chunks go through
/// [`DeferredDeletion`](crate::DeferredDeletion). `Delete` stays for callers
/// that want chunks released right after a specific build lands. A delete
/// with no build in front of it is disposed on the next update and logged as
/// a solitary deletion.
#[derive(Clone, Debug)]
pub enum ForgeTask {
    Build(BuildTask),
    Delete(DeleteTask),
}

/// A finished build waiting to be applied on the update thread.
#[derive(Debug)]
pub struct ApplyTask {
    pub chunk: ChunkId,
    pub geometry: ChunkMeshData,
    /// Chunks to dispose right after `chunk` is initialized.
    pub chained_deletions: Vec<ChunkId>,
}

/// Errors that can occur when starting the forge.
#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    #[error("failed to spawn chunk forge worker {index}: {source}")]
    Spawn {
        index: usize,
        #[source]
        source: std::io::Error,
    },
}

/// Snapshot of the forge's queues and counters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ForgeStats {
    pub workers: usize,
    pub busy_workers: usize,
    pub queued_tasks: usize,
    pub pending_applies: usize,
    pub applied: u64,
    /// Builds dropped because their chunk was disposed first.
    pub discarded: u64,
    pub solitary_deletions: u64,
    pub average_build_time_us: f64,
}

struct Job {
    chunk: ChunkId,
    request: BuildRequest,
    chained_deletions: Vec<ChunkId>,
}

struct Finished {
    worker: usize,
    chunk: ChunkId,
    geometry: ChunkMeshData,
    chained_deletions: Vec<ChunkId>,
    build_time_us: u64,
}

/// Worker count leaving one core to the update thread.
pub fn default_worker_count() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}

/// Fixed pool of geometry workers.
///
/// Each worker owns a single-slot job channel. Idle workers are tracked by
/// index in a bounded channel holding at most one entry per worker, so a
/// worker is handed a job only after it has reported its previous result.
pub struct ChunkForge {
    jobs: Vec<Sender<Job>>,
    busy: Vec<bool>,
    idle_tx: Sender<usize>,
    idle_rx: Receiver<usize>,
    results_tx: Sender<Finished>,
    results_rx: Receiver<Finished>,
    handles: Vec<JoinHandle<()>>,
    queue: VecDeque<ForgeTask>,
    apply_queue: VecDeque<ApplyTask>,
    trash: Vec<ChunkId>,
    max_applies_per_frame: usize,
    applied: u64,
    discarded: u64,
    solitary_deletions: u64,
    builds_completed: u64,
    build_time_total_us: u64,
}

impl ChunkForge {
    /// Start `worker_count` workers (at least one) running `generator`.
    pub fn new(
        worker_count: usize,
        max_applies_per_frame: usize,
        generator: Arc<dyn TerrainGenerator>,
    ) -> Result<Self, ForgeError> {
        let worker_count = worker_count.max(1);
        let (idle_tx, idle_rx) = bounded(worker_count);
        let (results_tx, results_rx) = unbounded();
        let mut forge = Self {
            jobs: Vec::with_capacity(worker_count),
            busy: Vec::with_capacity(worker_count),
            idle_tx,
            idle_rx,
            results_tx,
            results_rx,
            handles: Vec::with_capacity(worker_count),
            queue: VecDeque::new(),
            apply_queue: VecDeque::new(),
            trash: Vec::new(),
            max_applies_per_frame: max_applies_per_frame.max(1),
            applied: 0,
            discarded: 0,
            solitary_deletions: 0,
            builds_completed: 0,
            build_time_total_us: 0,
        };
        for index in 0..worker_count {
            // Workers spawned so far are joined when `forge` drops on error.
            forge.spawn_worker(index, Arc::clone(&generator))?;
        }
        info!(workers = worker_count, "chunk forge started");
        Ok(forge)
    }

    fn spawn_worker(&mut self, index: usize, generator: Arc<dyn TerrainGenerator>) -> Result<(), ForgeError> {
        let (job_tx, job_rx) = bounded::<Job>(1);
        let results = self.results_tx.clone();
        let handle = std::thread::Builder::new()
            .name(format!("chunk-forge-worker-{index}"))
            .spawn(move || {
                while let Ok(job) = job_rx.recv() {
                    let start = Instant::now();
                    let geometry = generator.generate(&job.request);
                    let finished = Finished {
                        worker: index,
                        chunk: job.chunk,
                        geometry,
                        chained_deletions: job.chained_deletions,
                        build_time_us: start.elapsed().as_micros() as u64,
                    };
                    if results.send(finished).is_err() {
                        break;
                    }
                }
            })
            .map_err(|source| ForgeError::Spawn { index, source })?;

        self.jobs.push(job_tx);
        self.busy.push(false);
        self.handles.push(handle);
        let _ = self.idle_tx.try_send(index);
        Ok(())
    }

    /// Enqueue a task. There is no back-pressure.
    pub fn submit(&mut self, task: ForgeTask) {
        self.queue.push_back(task);
    }

    pub fn submit_build(&mut self, chunk: ChunkId, request: BuildRequest) {
        self.submit(ForgeTask::Build(BuildTask { chunk, request }));
    }

    pub fn submit_delete(&mut self, chunks: Vec<ChunkId>) {
        self.submit(ForgeTask::Delete(DeleteTask { chunks }));
    }

    /// Once per frame: collect finished builds, hand queued tasks to idle
    /// workers, then apply a bounded number of results.
    pub fn update(&mut self, store: &mut ChunkStore, scene: &mut dyn SceneBackend) {
        self.collect_results();
        self.dispatch_queued(store);
        self.apply_results(store, scene);
        self.empty_trash(store, scene);
    }

    fn collect_results(&mut self) {
        while let Ok(done) = self.results_rx.try_recv() {
            self.busy[done.worker] = false;
            if self.idle_tx.try_send(done.worker).is_err() {
                panic!("chunk forge worker {} returned to the idle set twice", done.worker);
            }
            self.builds_completed += 1;
            self.build_time_total_us += done.build_time_us;
            self.apply_queue.push_back(ApplyTask {
                chunk: done.chunk,
                geometry: done.geometry,
                chained_deletions: done.chained_deletions,
            });
        }
    }

    fn dispatch_queued(&mut self, store: &ChunkStore) {
        loop {
            match self.queue.front() {
                None => return,
                Some(ForgeTask::Build(_)) if self.idle_rx.is_empty() => return,
                Some(_) => {}
            }
            let Some(task) = self.queue.pop_front() else {
                return;
            };
            let build = match task {
                ForgeTask::Build(build) => build,
                ForgeTask::Delete(delete) => {
                    warn!(chunks = delete.chunks.len(), "deletion task without a preceding build");
                    self.solitary_deletions += 1;
                    self.trash.extend(delete.chunks);
                    continue;
                }
            };

            let job = Job {
                chunk: build.chunk,
                request: build.request,
                chained_deletions: self.take_chained_deletions(),
            };
            if !store.contains(job.chunk) {
                trace!(chunk = %job.chunk, "skipping build of disposed chunk");
                self.discarded += 1;
                self.trash.extend(job.chained_deletions);
                continue;
            }
            match self.idle_rx.try_recv() {
                Ok(worker) => self.dispatch(worker, job),
                Err(_) => {
                    self.requeue(job);
                    return;
                }
            }
        }
    }

    /// Deletion tasks queued right behind a build ride along with it.
    fn take_chained_deletions(&mut self) -> Vec<ChunkId> {
        let mut chunks = Vec::new();
        while let Some(ForgeTask::Delete(_)) = self.queue.front() {
            if let Some(ForgeTask::Delete(delete)) = self.queue.pop_front() {
                chunks.extend(delete.chunks);
            }
        }
        chunks
    }

    fn requeue(&mut self, job: Job) {
        if !job.chained_deletions.is_empty() {
            self.queue.push_front(ForgeTask::Delete(DeleteTask {
                chunks: job.chained_deletions,
            }));
        }
        self.queue.push_front(ForgeTask::Build(BuildTask {
            chunk: job.chunk,
            request: job.request,
        }));
    }

    /// # Panics
    ///
    /// Panics if `worker` is still busy with an earlier job.
    fn dispatch(&mut self, worker: usize, job: Job) {
        assert!(!self.busy[worker], "chunk forge worker {worker} is already busy");
        self.busy[worker] = true;
        if let Err(err) = self.jobs[worker].send(job) {
            // The worker thread is gone; it is never returned to the idle set.
            error!(worker, "chunk forge worker stopped, requeueing its job");
            self.busy[worker] = false;
            self.requeue(err.into_inner());
        }
    }

    fn apply_results(&mut self, store: &mut ChunkStore, scene: &mut dyn SceneBackend) {
        // Stale results do not count against the frame budget.
        let mut applied = 0;
        while applied < self.max_applies_per_frame {
            let Some(task) = self.apply_queue.pop_front() else {
                break;
            };
            if store.init(task.chunk, task.geometry, scene) {
                self.applied += 1;
                applied += 1;
            } else {
                self.discarded += 1;
            }
            for chunk in task.chained_deletions {
                if store.contains(chunk) {
                    store.dispose(chunk, scene);
                }
            }
        }
    }

    fn empty_trash(&mut self, store: &mut ChunkStore, scene: &mut dyn SceneBackend) {
        for chunk in std::mem::take(&mut self.trash) {
            if store.contains(chunk) {
                store.dispose(chunk, scene);
            }
        }
    }

    /// Drop every queued task and pending result. Jobs already running finish
    /// and are discarded if their chunk is gone by then.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.apply_queue.clear();
    }

    /// True when nothing is queued, running or waiting to be applied.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
            && self.apply_queue.is_empty()
            && self.trash.is_empty()
            && self.busy.iter().all(|b| !b)
    }

    pub fn worker_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn idle_worker_count(&self) -> usize {
        self.idle_rx.len()
    }

    pub fn max_applies_per_frame(&self) -> usize {
        self.max_applies_per_frame
    }

    pub fn stats(&self) -> ForgeStats {
        ForgeStats {
            workers: self.jobs.len(),
            busy_workers: self.busy.iter().filter(|b| **b).count(),
            queued_tasks: self.queue.len(),
            pending_applies: self.apply_queue.len(),
            applied: self.applied,
            discarded: self.discarded,
            solitary_deletions: self.solitary_deletions,
            average_build_time_us: if self.builds_completed == 0 {
                0.0
            } else {
                self.build_time_total_us as f64 / self.builds_completed as f64
            },
        }
    }
}

impl Drop for ChunkForge {
    fn drop(&mut self) {
        // Closing the job channels ends the worker loops.
        self.jobs.clear();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}
