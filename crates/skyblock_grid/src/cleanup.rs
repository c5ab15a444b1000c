//! Rate-limited world cleanup after an island is deleted.
//!
//! Deleting an island removes it from the grid immediately; clearing its
//! blocks is spread over many ticks. Each deleted island is split into chunk
//! jobs and [`CleanupQueue::tick`] runs at most `clean_rate` of them per
//! call. Chunks that lie wholly inside the island space are regenerated,
//! chunks on the edge only have the island's columns cleared so neighbours
//! are untouched. Every job is idempotent, so a failed job is simply retried
//! on the next tick.

use crate::island::Island;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Chunk coordinates (16x16 block columns).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn containing(block_x: i32, block_z: i32) -> Self {
        Self {
            x: block_x >> 4,
            z: block_z >> 4,
        }
    }

    pub fn min_block_x(self) -> i32 {
        self.x << 4
    }

    pub fn min_block_z(self) -> i32 {
        self.z << 4
    }
}

/// What to do with one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkAction {
    /// The whole chunk belongs to the island.
    Regenerate,
    /// Only the columns in `[min_x, max_x) x [min_z, max_z)` belong to it.
    ClearColumns {
        min_x: i32,
        max_x: i32,
        min_z: i32,
        max_z: i32,
    },
}

/// One unit of cleanup work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkJob {
    pub world: String,
    pub chunk: ChunkPos,
    pub action: ChunkAction,
}

/// Performs the actual world edits.
pub trait ChunkRegenerator {
    fn apply(&mut self, job: &ChunkJob) -> Result<(), String>;
}

/// Splits an island's outer bound into chunk jobs.
pub fn plan_island_cleanup(island: &Island) -> Vec<ChunkJob> {
    let (min_x, max_x) = (island.min_x(), island.max_x());
    let (min_z, max_z) = (island.min_z(), island.max_z());
    if min_x >= max_x || min_z >= max_z {
        return Vec::new();
    }

    let first = ChunkPos::containing(min_x, min_z);
    let last = ChunkPos::containing(max_x - 1, max_z - 1);
    let mut jobs = Vec::new();
    for cx in first.x..=last.x {
        for cz in first.z..=last.z {
            let chunk = ChunkPos { x: cx, z: cz };
            let (chunk_min_x, chunk_min_z) = (chunk.min_block_x(), chunk.min_block_z());
            let full = chunk_min_x >= min_x
                && chunk_min_x + 16 <= max_x
                && chunk_min_z >= min_z
                && chunk_min_z + 16 <= max_z;
            let action = if full {
                ChunkAction::Regenerate
            } else {
                ChunkAction::ClearColumns {
                    min_x: min_x.max(chunk_min_x),
                    max_x: max_x.min(chunk_min_x + 16),
                    min_z: min_z.max(chunk_min_z),
                    max_z: max_z.min(chunk_min_z + 16),
                }
            };
            jobs.push(ChunkJob {
                world: island.world().to_string(),
                chunk,
                action,
            });
        }
    }
    jobs
}

/// Pending chunk jobs.
#[derive(Debug, Clone)]
pub struct CleanupQueue {
    jobs: VecDeque<ChunkJob>,
    clean_rate: usize,
    completed: u64,
}

impl CleanupQueue {
    pub fn new(clean_rate: usize) -> Self {
        Self {
            jobs: VecDeque::new(),
            clean_rate: clean_rate.max(1),
            completed: 0,
        }
    }

    /// Queues the cleanup of a deleted island.
    pub fn enqueue_island(&mut self, island: &Island) -> usize {
        let jobs = plan_island_cleanup(island);
        let count = jobs.len();
        self.jobs.extend(jobs);
        info!(
            "🧹 Queued {} chunks for cleanup around {}:{}",
            count,
            island.center_x(),
            island.center_z()
        );
        count
    }

    pub fn pending(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_idle(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Runs up to `clean_rate` jobs.
    ///
    /// A failing job goes back to the front of the queue and ends the tick.
    ///
    /// # Returns
    ///
    /// The number of jobs completed.
    pub fn tick(&mut self, regenerator: &mut dyn ChunkRegenerator) -> usize {
        let mut done = 0;
        while done < self.clean_rate {
            let Some(job) = self.jobs.pop_front() else {
                break;
            };
            match regenerator.apply(&job) {
                Ok(()) => {
                    done += 1;
                    self.completed += 1;
                }
                Err(e) => {
                    warn!(
                        "⚠️ Cleanup of chunk {}:{} failed, retrying next tick: {}",
                        job.chunk.x, job.chunk.z, e
                    );
                    self.jobs.push_front(job);
                    break;
                }
            }
        }
        if done > 0 {
            debug!("Cleaned {} chunks, {} remaining", done, self.jobs.len());
        }
        done
    }
}
