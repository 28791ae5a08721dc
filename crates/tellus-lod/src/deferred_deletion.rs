//! Deferred deletion of superseded chunks.
//!
//! When a tree swaps one set of chunks for another, the old chunks stay on
//! screen until every new chunk has geometry. The coordinator tracks those
//! swaps as [`ReplacementSet`]s and disposes the old side exactly once, after
//! the new side is ready or after the swap has been abandoned.

use crossbeam_channel::Receiver;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::latch::{CompletionLatch, LatchState};
use crate::scene::SceneBackend;
use crate::{ChunkEvent, ChunkId, ChunkStore};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SetId(u64);

/// New chunks replacing old chunks, plus the latch counting the new ones in.
#[derive(Debug)]
pub struct ReplacementSet {
    id: SetId,
    new_chunks: Vec<ChunkId>,
    /// New chunks that have not reported geometry yet.
    waiting: Vec<ChunkId>,
    old_chunks: Vec<ChunkId>,
    latch: CompletionLatch,
}

impl ReplacementSet {
    pub fn id(&self) -> SetId {
        self.id
    }

    pub fn new_chunks(&self) -> &[ChunkId] {
        &self.new_chunks
    }

    pub fn old_chunks(&self) -> &[ChunkId] {
        &self.old_chunks
    }

    pub fn waiting(&self) -> &[ChunkId] {
        &self.waiting
    }

    pub fn state(&self) -> LatchState {
        self.latch.state()
    }

    /// New chunks the latch is still counting down for.
    pub fn remaining(&self) -> usize {
        self.latch.remaining()
    }
}

/// Running totals of the coordinator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeletionStats {
    pub live_sets: usize,
    pub registered: u64,
    /// Sets whose new chunks all became ready.
    pub resolved: u64,
    /// Sets abandoned because a new chunk was disposed before becoming ready.
    pub cancelled: u64,
    pub disposed_chunks: u64,
}

/// Owns every live [`ReplacementSet`] of a planet.
pub struct DeferredDeletion {
    events: Receiver<ChunkEvent>,
    sets: FxHashMap<SetId, ReplacementSet>,
    by_new_chunk: FxHashMap<ChunkId, SetId>,
    next_set: u64,
    stats: DeletionStats,
}

impl DeferredDeletion {
    /// `events` is the receiving end of the chunk store's event channel.
    pub fn new(events: Receiver<ChunkEvent>) -> Self {
        Self {
            events,
            sets: FxHashMap::default(),
            by_new_chunk: FxHashMap::default(),
            next_set: 0,
            stats: DeletionStats::default(),
        }
    }

    /// Schedule `old_chunks` for disposal once every chunk of `new_chunks` is ready.
    ///
    /// Each old chunk must not belong to another live set.
    pub fn register(&mut self, store: &ChunkStore, new_chunks: Vec<ChunkId>, old_chunks: Vec<ChunkId>) -> SetId {
        self.next_set += 1;
        let id = SetId(self.next_set);
        debug_assert!(
            old_chunks.iter().all(|c| !self.is_old_chunk(*c)),
            "chunk scheduled for deletion by two replacement sets"
        );

        let waiting: Vec<ChunkId> = new_chunks.iter().copied().filter(|&c| !store.is_ready(c)).collect();
        for &chunk in &waiting {
            self.by_new_chunk.insert(chunk, id);
        }
        trace!(set = id.0, new = new_chunks.len(), old = old_chunks.len(), "replacement registered");

        self.sets.insert(
            id,
            ReplacementSet {
                id,
                latch: CompletionLatch::new(waiting.len()),
                new_chunks,
                waiting,
                old_chunks,
            },
        );
        self.stats.registered += 1;
        id
    }

    /// Once per frame, after the forge has applied this frame's geometry:
    /// drain chunk events, settle sets and dispose their old chunks.
    pub fn update(&mut self, store: &mut ChunkStore, scene: &mut dyn SceneBackend) {
        loop {
            while let Ok(event) = self.events.try_recv() {
                self.handle_event(event);
            }
            self.cancel_zombies(store);

            let mut settled: Vec<SetId> = self
                .sets
                .values()
                .filter(|s| s.latch.is_settled())
                .map(|s| s.id)
                .collect();
            if settled.is_empty() {
                break;
            }
            settled.sort_unstable();
            for id in settled {
                self.finish(id, store, scene);
            }
        }
    }

    fn handle_event(&mut self, event: ChunkEvent) {
        match event {
            ChunkEvent::GeometryReady(chunk) => {
                let Some(set) = self.by_new_chunk.remove(&chunk).and_then(|id| self.sets.get_mut(&id)) else {
                    return;
                };
                set.waiting.retain(|&c| c != chunk);
                set.latch.count_down();
            }
            ChunkEvent::Disposed(chunk) => {
                if let Some(set) = self.by_new_chunk.remove(&chunk).and_then(|id| self.sets.get_mut(&id)) {
                    set.latch.cancel();
                }
            }
        }
    }

    /// A set still waiting on a chunk that no longer exists can never resolve.
    fn cancel_zombies(&mut self, store: &ChunkStore) {
        for set in self.sets.values_mut() {
            if !set.latch.is_settled() && set.waiting.iter().any(|&c| !store.contains(c)) {
                set.latch.cancel();
            }
        }
    }

    fn finish(&mut self, id: SetId, store: &mut ChunkStore, scene: &mut dyn SceneBackend) {
        let Some(set) = self.sets.remove(&id) else {
            return;
        };
        for chunk in &set.waiting {
            self.by_new_chunk.remove(chunk);
        }
        match set.latch.state() {
            LatchState::Cancelled => {
                debug!(set = id.0, old = set.old_chunks.len(), "replacement abandoned");
                self.stats.cancelled += 1;
            }
            _ => self.stats.resolved += 1,
        }
        for chunk in set.old_chunks {
            store.dispose(chunk, scene);
            self.stats.disposed_chunks += 1;
        }
    }

    /// Dispose the old side of every live set and forget them all.
    pub fn dispose(&mut self, store: &mut ChunkStore, scene: &mut dyn SceneBackend) {
        for (_, set) in self.sets.drain() {
            for chunk in set.old_chunks {
                if store.contains(chunk) {
                    store.dispose(chunk, scene);
                    self.stats.disposed_chunks += 1;
                }
            }
        }
        self.by_new_chunk.clear();
        while self.events.try_recv().is_ok() {}
    }

    pub fn is_old_chunk(&self, chunk: ChunkId) -> bool {
        self.sets.values().any(|s| s.old_chunks.contains(&chunk))
    }

    /// Chunks waiting for disposal across all live sets.
    pub fn old_chunks(&self) -> impl Iterator<Item = ChunkId> + '_ {
        self.sets.values().flat_map(|s| s.old_chunks.iter().copied())
    }

    pub fn sets(&self) -> impl Iterator<Item = &ReplacementSet> {
        self.sets.values()
    }

    pub fn live_sets(&self) -> usize {
        self.sets.len()
    }

    pub fn stats(&self) -> DeletionStats {
        DeletionStats {
            live_sets: self.sets.len(),
            ..self.stats
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChunkSettings, HeadlessScene};
    use tellus_cubesphere::{ChunkPath, CubeFace};
    use tellus_terrain::ChunkMeshData;

    struct Fixture {
        store: ChunkStore,
        coordinator: DeferredDeletion,
        scene: HeadlessScene,
    }

    impl Fixture {
        fn new() -> Self {
            let (tx, rx) = crossbeam_channel::unbounded();
            Self {
                store: ChunkStore::new(ChunkSettings::default(), tx),
                coordinator: DeferredDeletion::new(rx),
                scene: HeadlessScene::new(),
            }
        }

        fn chunk(&mut self, indices: &[u8]) -> ChunkId {
            self.store.create(CubeFace::PosZ, ChunkPath::from_indices(indices), 1_000.0)
        }

        fn ready(&mut self, id: ChunkId) {
            let geometry = ChunkMeshData {
                positions: vec![0.0; 9],
                normals: vec![0.0; 9],
                indices: vec![0, 1, 2],
                ..Default::default()
            };
            assert!(self.store.init(id, geometry, &mut self.scene));
        }

        fn update(&mut self) {
            self.coordinator.update(&mut self.store, &mut self.scene);
        }
    }

    #[test]
    fn test_old_chunk_outlives_partially_ready_replacement() {
        let mut f = Fixture::new();
        let old = f.chunk(&[]);
        f.ready(old);
        let children: Vec<ChunkId> = (0..4).map(|i| f.chunk(&[i])).collect();
        f.coordinator.register(&f.store, children.clone(), vec![old]);

        for &c in &children[..3] {
            f.ready(c);
        }
        f.update();
        assert!(f.store.contains(old), "old chunk disposed before all new chunks were ready");
        assert_eq!(f.coordinator.live_sets(), 1);

        f.ready(children[3]);
        f.update();
        assert!(!f.store.contains(old));
        assert_eq!(f.coordinator.live_sets(), 0);
        assert_eq!(f.coordinator.stats().resolved, 1);
    }

    #[test]
    fn test_disposed_new_chunk_cancels_set() {
        let mut f = Fixture::new();
        let old = f.chunk(&[]);
        let new = f.chunk(&[1]);
        f.coordinator.register(&f.store, vec![new], vec![old]);

        f.store.dispose(new, &mut f.scene);
        f.update();
        assert!(!f.store.contains(old));
        let stats = f.coordinator.stats();
        assert_eq!((stats.resolved, stats.cancelled), (0, 1));
    }

    #[test]
    fn test_zombie_is_found_without_its_event() {
        let mut f = Fixture::new();
        let old = f.chunk(&[]);
        let new = f.chunk(&[2]);
        f.store.dispose(new, &mut f.scene);
        f.update();

        f.coordinator.register(&f.store, vec![new], vec![old]);
        f.update();
        assert!(!f.store.contains(old));
        assert_eq!(f.coordinator.stats().cancelled, 1);
    }

    #[test]
    fn test_collapse_cascades_into_pending_subdivision() {
        let mut f = Fixture::new();
        let leaf = f.chunk(&[]);
        f.ready(leaf);
        let children: Vec<ChunkId> = (0..4).map(|i| f.chunk(&[i])).collect();
        f.coordinator.register(&f.store, children.clone(), vec![leaf]);

        // The observer leaves before the children are built.
        let merged = f.chunk(&[]);
        f.coordinator.register(&f.store, vec![merged], children.clone());
        f.update();
        assert!(f.store.contains(leaf));
        assert!(children.iter().all(|&c| f.store.contains(c)));

        f.ready(merged);
        f.update();
        assert!(!f.store.contains(leaf));
        assert!(children.iter().all(|&c| !f.store.contains(c)));
        let stats = f.coordinator.stats();
        assert_eq!((stats.resolved, stats.cancelled, stats.live_sets), (1, 1, 0));
        assert_eq!(stats.disposed_chunks, 5);
    }

    #[test]
    fn test_each_set_settles_exactly_once() {
        let mut f = Fixture::new();
        let old = f.chunk(&[]);
        let a = f.chunk(&[0]);
        let b = f.chunk(&[1]);
        f.coordinator.register(&f.store, vec![a, b], vec![old]);

        f.ready(a);
        f.store.dispose(b, &mut f.scene);
        f.update();
        f.update();
        let stats = f.coordinator.stats();
        assert_eq!(stats.resolved + stats.cancelled, 1);
        assert_eq!(stats.disposed_chunks, 1);
    }

    #[test]
    fn test_ready_chunks_at_registration_resolve_immediately() {
        let mut f = Fixture::new();
        let old = f.chunk(&[]);
        let new = f.chunk(&[3]);
        f.ready(new);
        f.update();

        f.coordinator.register(&f.store, vec![new], vec![old]);
        f.update();
        assert!(!f.store.contains(old));
        assert_eq!(f.coordinator.stats().resolved, 1);
    }

    #[test]
    fn test_unrelated_events_are_ignored() {
        let mut f = Fixture::new();
        let old = f.chunk(&[]);
        let new = f.chunk(&[0]);
        let stranger = f.chunk(&[1]);
        f.coordinator.register(&f.store, vec![new], vec![old]);
        f.ready(stranger);
        f.store.dispose(stranger, &mut f.scene);
        f.update();
        assert!(f.store.contains(old));
        assert_eq!(f.coordinator.live_sets(), 1);
    }

    #[test]
    fn test_dispose_releases_all_old_chunks() {
        let mut f = Fixture::new();
        let olds: Vec<ChunkId> = (0..3).map(|i| f.chunk(&[i])).collect();
        let new = f.chunk(&[]);
        f.coordinator.register(&f.store, vec![new], olds.clone());
        assert!(f.coordinator.is_old_chunk(olds[1]));

        f.coordinator.dispose(&mut f.store, &mut f.scene);
        assert!(olds.iter().all(|&c| !f.store.contains(c)));
        assert!(f.store.contains(new));
        assert_eq!(f.coordinator.live_sets(), 0);
    }
}
