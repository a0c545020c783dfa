/*
 * @file progress.rs
 * @author Mike Hamburg
 * @copyright 2020-2022 Rambus Inc.
 *
 * Construction-phase diagnostics.
 */

use core::fmt;
use std::time::Instant;

/** A phase of distributor construction */
#[derive(Clone,Copy,PartialEq,Eq,Debug,Hash)]
pub enum Phase {
    BuildingTrie,
    LabellingTrie,
    ComputingBehaviour,
    ComputingRankerKeys,
    BuildingRanker,
    BuildingSignatures,
    SearchingMistakes,
    SearchingFalsePositives,
    BuildingCorrections
}

impl Phase {
    /** What the phase iterates over, for reporting */
    pub fn items(&self) -> &'static str {
        match self {
            Phase::ComputingRankerKeys | Phase::LabellingTrie => "nodes",
            Phase::BuildingRanker => "ranker keys",
            Phase::BuildingSignatures => "internal nodes",
            _ => "keys"
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f:&mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::BuildingTrie => "Building trie",
            Phase::LabellingTrie => "Labelling trie",
            Phase::ComputingBehaviour => "Computing behaviour function",
            Phase::ComputingRankerKeys => "Computing leaf ranker keys",
            Phase::BuildingRanker => "Creating leaf ranker",
            Phase::BuildingSignatures => "Computing length/signature map",
            Phase::SearchingMistakes => "Searching for mistakes",
            Phase::SearchingFalsePositives => "Searching for false positives",
            Phase::BuildingCorrections => "Creating correction function"
        })
    }
}

/**
 * Receives construction events.  Phases are strictly sequential:
 * every `start` is followed by its `done` before the next `start`.
 */
pub trait Progress {
    /** A phase begins; `expected` is the number of items, if known */
    fn start(&mut self, phase:Phase, expected:Option<u64>);

    /** One more item processed in the current phase */
    fn update(&mut self) {}

    /** The current phase is over */
    fn done(&mut self);
}

/** Discards all events */
#[derive(Clone,Copy,Debug,Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn start(&mut self, _phase:Phase, _expected:Option<u64>) {}
    fn done(&mut self) {}
}

/** Reports phases through `tracing` */
#[derive(Debug,Default)]
pub struct TracingProgress {
    current: Option<(Phase,Instant)>,
    count: u64
}

impl TracingProgress {
    pub fn new() -> Self { TracingProgress::default() }
}

impl Progress for TracingProgress {
    fn start(&mut self, phase:Phase, expected:Option<u64>) {
        self.count = 0;
        self.current = Some((phase,Instant::now()));
        match expected {
            Some(n) => tracing::info!(expected = n, items = phase.items(), "{}...", phase),
            None => tracing::info!("{}...", phase)
        }
    }

    #[inline]
    fn update(&mut self) { self.count += 1; }

    fn done(&mut self) {
        if let Some((phase,started)) = self.current.take() {
            let elapsed = started.elapsed();
            tracing::info!(
                processed = self.count,
                items = phase.items(),
                elapsed_ms = elapsed.as_millis() as u64,
                "{} done", phase
            );
        }
    }
}
