use super::entry::{Room, RoomKind};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

/// Below this many rooms, reflection does nothing
pub const MIN_ROOMS_TO_REFLECT: usize = 10;
/// Rooms strictly below this stability are eligible for consolidation
pub const STABILITY_CUTOFF: f32 = 0.6;
/// The eligible cluster must be strictly larger than this
pub const MIN_CLUSTER_SIZE: usize = 5;
/// Number of oldest rooms quoted in a summary
pub const SUMMARY_EXCERPTS: usize = 3;
/// Characters kept per quoted room
pub const EXCERPT_CHARS: usize = 30;

#[derive(Error, Debug, PartialEq)]
pub enum StoreError {
    #[error("Room {0} is not in the store")]
    UnknownRoom(u64),
}

/// Configuration for the memory store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Room capacity. Reserved; nothing evicts on it yet.
    pub max_rooms: usize,
    /// Similarity threshold for clustering. Reserved; reflect does not consult it.
    pub sim_threshold: f32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_rooms: 800,
            sim_threshold: 0.25,
        }
    }
}

/// Result of a single reflection pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReflectOutcome {
    TooFewRooms { rooms: usize },
    NoSignificantCluster { low_stability: usize },
    Consolidated { new_id: u64, removed: usize },
}

impl fmt::Display for ReflectOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReflectOutcome::TooFewRooms { .. } => write!(f, "Too few rooms to reflect"),
            ReflectOutcome::NoSignificantCluster { .. } => {
                write!(f, "No significant pudding clusters to consolidate")
            }
            ReflectOutcome::Consolidated { new_id, removed } => write!(
                f,
                "Created semantic room {}, removed {} low-stability rooms",
                new_id, removed
            ),
        }
    }
}

/// In-memory room store with a weighted adjacency graph over room ids
pub struct MemoryStore {
    rooms: Vec<Room>,
    graph: HashMap<u64, HashMap<u64, f32>>,
    attractors: Vec<String>,
    next_id: u64,
    config: StoreConfig,
}

impl MemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            rooms: Vec::new(),
            graph: HashMap::new(),
            attractors: Vec::new(),
            next_id: 0,
            config,
        }
    }

    /// Stores a new room and returns its id
    pub fn add(
        &mut self,
        text: impl Into<String>,
        kind: impl Into<RoomKind>,
        attractor: bool,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        let kind = kind.into();
        let room = Room::new(id, text.into(), &kind);
        debug!(id, stability = room.stability(), ?kind, "room added");

        if attractor {
            self.attractors.push(room.text().to_string());
        }
        self.rooms.push(room);
        id
    }

    /// Adds a directed edge between two live rooms
    pub fn link(&mut self, from: u64, to: u64, weight: f32) -> Result<(), StoreError> {
        for id in [from, to] {
            if self.get(id).is_none() {
                return Err(StoreError::UnknownRoom(id));
            }
        }
        self.graph.entry(from).or_default().insert(to, weight);
        Ok(())
    }

    /// Merges the low-stability rooms into one semantic summary room
    pub fn reflect(&mut self) -> ReflectOutcome {
        if self.rooms.len() < MIN_ROOMS_TO_REFLECT {
            debug!(rooms = self.rooms.len(), "too few rooms to reflect");
            return ReflectOutcome::TooFewRooms { rooms: self.rooms.len() };
        }

        let mut cluster: Vec<&Room> = self
            .rooms
            .iter()
            .filter(|room| room.stability() < STABILITY_CUTOFF)
            .collect();

        if cluster.len() <= MIN_CLUSTER_SIZE {
            debug!(low_stability = cluster.len(), "no significant cluster");
            return ReflectOutcome::NoSignificantCluster { low_stability: cluster.len() };
        }

        // Ids follow creation order; the wall clock may step backwards
        cluster.sort_by_key(|room| room.id());

        let summary = Self::summarize(&cluster);
        let removed_ids: HashSet<u64> = cluster.iter().map(|room| room.id()).collect();

        let new_id = self.add(summary, RoomKind::Semantic, false);
        self.rooms.retain(|room| !removed_ids.contains(&room.id()));
        self.prune_graph(&removed_ids);

        info!(
            new_id,
            removed = removed_ids.len(),
            rooms = self.rooms.len(),
            "reflection consolidated rooms"
        );
        ReflectOutcome::Consolidated {
            new_id,
            removed: removed_ids.len(),
        }
    }

    fn summarize(cluster: &[&Room]) -> String {
        let excerpts: Vec<String> = cluster
            .iter()
            .take(SUMMARY_EXCERPTS)
            .map(|room| room.excerpt(EXCERPT_CHARS))
            .collect();

        format!(
            "Consolidated insight from {} interactions: {}...",
            cluster.len(),
            excerpts.join(" / ")
        )
    }

    fn prune_graph(&mut self, removed: &HashSet<u64>) {
        self.graph.retain(|id, _| !removed.contains(id));
        for neighbors in self.graph.values_mut() {
            neighbors.retain(|id, _| !removed.contains(id));
        }
    }

    /// Similarity between two rooms. Placeholder constant until real clustering exists.
    pub fn pseudo_similarity(&self, _a: &Room, _b: &Room) -> f32 {
        0.3
    }

    pub fn get(&self, id: u64) -> Option<&Room> {
        self.rooms.iter().find(|room| room.id() == id)
    }

    pub fn neighbors(&self, id: u64) -> Option<&HashMap<u64, f32>> {
        self.graph.get(&id)
    }

    /// Rooms in creation order
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn attractors(&self) -> &[String] {
        &self.attractors
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn seeded(episodic: usize, semantic: usize) -> MemoryStore {
        let mut store = MemoryStore::default();
        for i in 0..episodic {
            store.add(format!("Episodic fragment {}", i), "episodic", false);
        }
        for i in 0..semantic {
            store.add(format!("Semantic fact {}", i), "semantic", false);
        }
        store
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut store = MemoryStore::default();
        let ids: Vec<u64> = (0..5)
            .map(|i| store.add(format!("room {}", i), "episodic", false))
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(store.next_id(), 5);
    }

    #[test]
    fn test_attractors_recorded() {
        let mut store = MemoryStore::default();
        store.add("north star", "semantic", true);
        store.add("passing thought", "episodic", false);
        assert_eq!(store.attractors(), ["north star".to_string()]);
    }

    #[test]
    fn test_reflect_too_few_rooms() {
        let mut store = seeded(4, 0);
        let before: Vec<u64> = store.rooms().iter().map(Room::id).collect();

        assert_eq!(store.reflect(), ReflectOutcome::TooFewRooms { rooms: 4 });
        let after: Vec<u64> = store.rooms().iter().map(Room::id).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_reflect_small_cluster_is_noop() {
        let mut store = seeded(4, 6);
        assert_eq!(store.reflect(), ReflectOutcome::NoSignificantCluster { low_stability: 4 });
        assert_eq!(store.len(), 10);
    }

    #[test]
    fn test_reflect_cluster_of_exactly_five_is_noop() {
        let mut store = seeded(5, 5);
        assert_eq!(store.reflect(), ReflectOutcome::NoSignificantCluster { low_stability: 5 });
        assert_eq!(store.len(), 10);
    }

    #[test]
    fn test_reflect_consolidates() {
        let mut store = seeded(6, 4);
        let outcome = store.reflect();

        assert_eq!(outcome, ReflectOutcome::Consolidated { new_id: 10, removed: 6 });
        assert_eq!(store.len(), 10 - 6 + 1);
        assert!(store.rooms().iter().all(|room| room.stability() >= STABILITY_CUTOFF));

        let summary = store.get(10).unwrap();
        assert_eq!(
            summary.text(),
            "Consolidated insight from 6 interactions: \
             Episodic fragment 0 / Episodic fragment 1 / Episodic fragment 2..."
        );
        assert_eq!(summary.stability(), 0.8);
    }

    #[test]
    fn test_summary_order_ignores_clock_steps() {
        let mut store = seeded(10, 0);
        // Clock stepped backwards: later rooms carry earlier timestamps
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        for room in store.rooms.iter_mut() {
            let stamp = base - Duration::from_secs(room.id());
            let text = room.text().to_string();
            *room = Room::with_timestamp(room.id(), text, &RoomKind::Episodic, stamp);
        }

        let ReflectOutcome::Consolidated { new_id, .. } = store.reflect() else {
            panic!("expected consolidation");
        };
        assert_eq!(
            store.get(new_id).unwrap().text(),
            "Consolidated insight from 10 interactions: \
             Episodic fragment 0 / Episodic fragment 1 / Episodic fragment 2..."
        );
    }

    #[test]
    fn test_summary_truncates_excerpts() {
        let mut store = MemoryStore::default();
        for i in 0..10 {
            store.add(format!("{}{}", "x".repeat(40), i), "episodic", false);
        }
        let ReflectOutcome::Consolidated { new_id, .. } = store.reflect() else {
            panic!("expected consolidation");
        };
        let expected = format!(
            "Consolidated insight from 10 interactions: {x} / {x} / {x}...",
            x = "x".repeat(30)
        );
        assert_eq!(store.get(new_id).unwrap().text(), expected);
    }

    #[test]
    fn test_graph_pruned_after_reflect() {
        let mut store = seeded(6, 4);
        // 0..6 episodic, 6..10 semantic
        store.link(0, 1, 0.5).unwrap();
        store.link(6, 0, 0.5).unwrap();
        store.link(6, 7, 0.9).unwrap();
        store.link(7, 2, 0.1).unwrap();

        store.reflect();

        assert!(store.neighbors(0).is_none());
        let six = store.neighbors(6).unwrap();
        assert!(!six.contains_key(&0));
        assert_eq!(six.get(&7), Some(&0.9));
        assert!(store.neighbors(7).unwrap().is_empty());
    }

    #[test]
    fn test_link_rejects_unknown_rooms() {
        let mut store = seeded(2, 0);
        assert_eq!(store.link(0, 42, 1.0), Err(StoreError::UnknownRoom(42)));
        assert_eq!(store.link(42, 0, 1.0), Err(StoreError::UnknownRoom(42)));
        assert!(store.neighbors(0).is_none());
    }

    #[test]
    fn test_ids_not_reused_after_reflect() {
        let mut store = seeded(20, 0);
        store.reflect();
        assert_eq!(store.add("fresh", "episodic", false), 21);
    }

    #[test]
    fn test_reserved_config_and_similarity_stub() {
        let store = MemoryStore::default();
        assert_eq!(store.config().max_rooms, 800);
        assert_eq!(store.config().sim_threshold, 0.25);

        let a = Room::new(0, "a".into(), &RoomKind::Episodic);
        let b = Room::new(1, "b".into(), &RoomKind::Semantic);
        assert_eq!(store.pseudo_similarity(&a, &b), 0.3);
    }
}
