/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-node resource envelopes: time slot → remaining cpu / ram.
//!
//! The envelope is the one resource abstraction shared by Phases 2–4: the
//! global scheduler and the reallocator both test and commit cpu+ram demand
//! against it, and the local planner uses a cpu-only envelope for its
//! timeline plus idle accounting.
//!
//! # Ownership
//! Envelopes are mutable and owned by whichever planner is executing.
//! Planners deep-copy ingested envelopes at construction (`Clone`), so
//! caller-owned maps are byte-identical before and after a solve.
//!
//! Slot interiors are `BTreeMap` (sorted, deterministic iteration); the
//! node-keyed outer map is an insertion-ordered `IndexMap` so node scan
//! order always follows caller input order.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use thiserror::Error;

/// node id → envelope, in caller insertion order.
pub type EnvelopeMap = IndexMap<String, NodeEnvelope>;

// ── Errors ────────────────────────────────────────────────────────────────────

/// A commit against an envelope failed.
///
/// The fit search never selects a window the envelope cannot hold, so any of
/// these surfacing from a planner indicates a bug in the search itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// The slot is absent from the envelope.
    #[error("time slot {slot} is not present in the envelope")]
    MissingSlot { slot: u64 },

    /// Remaining cpu at the slot is smaller than the demand.
    #[error("cpu underflow at slot {slot}: {remaining} remaining, {demand} demanded")]
    CpuUnderflow {
        slot: u64,
        remaining: u64,
        demand: u64,
    },

    /// Remaining ram at the slot is smaller than the demand.
    #[error("ram underflow at slot {slot}: {remaining} remaining, {demand} demanded")]
    RamUnderflow {
        slot: u64,
        remaining: u64,
        demand: u64,
    },
}

// ── NodeEnvelope ──────────────────────────────────────────────────────────────

/// Remaining capacity of one node, slot by slot.
///
/// RAM tracking is optional: an envelope built without a ram map admits any
/// ram demand, matching planners that only meter cpu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEnvelope {
    cpu: BTreeMap<u64, u64>,
    ram: Option<BTreeMap<u64, u64>>,
}

impl NodeEnvelope {
    /// Build from explicit slot maps.
    pub fn from_maps(cpu: BTreeMap<u64, u64>, ram: Option<BTreeMap<u64, u64>>) -> Self {
        Self { cpu, ram }
    }

    /// Full-capacity envelope over `slots`: every slot starts with the same
    /// remaining cpu, and the same remaining ram when `ram` is given.
    pub fn uniform<'a>(
        slots: impl IntoIterator<Item = &'a u64>,
        cpu: u64,
        ram: Option<u64>,
    ) -> Self {
        let mut cpu_map = BTreeMap::new();
        let mut ram_map = ram.map(|_| BTreeMap::new());
        for &slot in slots {
            cpu_map.insert(slot, cpu);
            if let (Some(map), Some(r)) = (ram_map.as_mut(), ram) {
                map.insert(slot, r);
            }
        }
        Self {
            cpu: cpu_map,
            ram: ram_map,
        }
    }

    /// Whether ram demand is metered by this envelope.
    pub fn tracks_ram(&self) -> bool {
        self.ram.is_some()
    }

    /// Remaining cpu at `slot`, or `None` when the slot is absent.
    pub fn cpu_remaining(&self, slot: u64) -> Option<u64> {
        self.cpu.get(&slot).copied()
    }

    /// Remaining ram at `slot`; `None` when the slot is absent or ram is
    /// untracked.
    pub fn ram_remaining(&self, slot: u64) -> Option<u64> {
        self.ram.as_ref().and_then(|m| m.get(&slot)).copied()
    }

    /// Whether every slot in `[start, start + duration)` exists and retains
    /// at least `cpu` cpu and (when tracked) `ram` ram.
    pub fn can_fit(&self, start: u64, duration: u64, cpu: u64, ram: u64) -> bool {
        (start..start + duration).all(|slot| {
            let cpu_ok = self.cpu.get(&slot).is_some_and(|&rem| rem >= cpu);
            let ram_ok = match &self.ram {
                Some(map) => map.get(&slot).is_some_and(|&rem| rem >= ram),
                None => true,
            };
            cpu_ok && ram_ok
        })
    }

    /// Subtract `cpu`/`ram` from every slot in `[start, start + duration)`.
    ///
    /// Re-validates the whole window before touching any slot, so a failed
    /// commit leaves the envelope unchanged.
    pub fn commit(
        &mut self,
        start: u64,
        duration: u64,
        cpu: u64,
        ram: u64,
    ) -> Result<(), EnvelopeError> {
        for slot in start..start + duration {
            let remaining = *self
                .cpu
                .get(&slot)
                .ok_or(EnvelopeError::MissingSlot { slot })?;
            if remaining < cpu {
                return Err(EnvelopeError::CpuUnderflow {
                    slot,
                    remaining,
                    demand: cpu,
                });
            }
            if let Some(map) = &self.ram {
                let remaining = *map.get(&slot).ok_or(EnvelopeError::MissingSlot { slot })?;
                if remaining < ram {
                    return Err(EnvelopeError::RamUnderflow {
                        slot,
                        remaining,
                        demand: ram,
                    });
                }
            }
        }

        for slot in start..start + duration {
            if let Some(rem) = self.cpu.get_mut(&slot) {
                *rem -= cpu;
            }
            if let Some(map) = self.ram.as_mut() {
                if let Some(rem) = map.get_mut(&slot) {
                    *rem -= ram;
                }
            }
        }
        Ok(())
    }

    /// Sum of remaining cpu across every slot — the node's idle capacity.
    pub fn idle_cpu(&self) -> u64 {
        self.cpu.values().sum()
    }

    /// Largest slot index present, or `None` for an empty envelope.
    pub fn max_slot(&self) -> Option<u64> {
        self.cpu.keys().next_back().copied()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope_over(slots: &[u64], cpu: u64, ram: Option<u64>) -> NodeEnvelope {
        NodeEnvelope::uniform(slots, cpu, ram)
    }

    // ── uniform / accessors ───────────────────────────────────────────────────

    #[test]
    fn uniform_fills_every_slot() {
        let env = envelope_over(&[0, 1, 2], 5, Some(6));
        for slot in 0..3 {
            assert_eq!(env.cpu_remaining(slot), Some(5));
            assert_eq!(env.ram_remaining(slot), Some(6));
        }
        assert_eq!(env.cpu_remaining(3), None);
        assert!(env.tracks_ram());
    }

    #[test]
    fn cpu_only_envelope_does_not_track_ram() {
        let env = envelope_over(&[0, 1], 4, None);
        assert!(!env.tracks_ram());
        assert_eq!(env.ram_remaining(0), None);
    }

    #[test]
    fn max_slot_is_highest_key() {
        assert_eq!(envelope_over(&[0, 3, 7], 1, None).max_slot(), Some(7));
        assert_eq!(NodeEnvelope::uniform(&[], 1, None).max_slot(), None);
    }

    // ── can_fit ───────────────────────────────────────────────────────────────

    #[test]
    fn can_fit_within_capacity() {
        let env = envelope_over(&[0, 1, 2, 3], 5, Some(6));
        assert!(env.can_fit(0, 4, 5, 6));
        assert!(env.can_fit(1, 2, 3, 2));
    }

    #[test]
    fn cannot_fit_when_cpu_short_at_any_slot() {
        let mut env = envelope_over(&[0, 1, 2], 5, None);
        env.commit(1, 1, 4, 0).unwrap(); // slot 1 down to 1 cpu
        assert!(!env.can_fit(0, 3, 2, 0));
        assert!(env.can_fit(0, 1, 2, 0));
    }

    #[test]
    fn cannot_fit_across_missing_slot() {
        let env = envelope_over(&[0, 1, 3], 5, None); // slot 2 absent
        assert!(!env.can_fit(0, 4, 1, 0));
        assert!(env.can_fit(0, 2, 1, 0));
    }

    #[test]
    fn ram_untracked_admits_any_ram_demand() {
        let env = envelope_over(&[0, 1], 5, None);
        assert!(env.can_fit(0, 2, 1, u64::MAX));
    }

    // ── commit ────────────────────────────────────────────────────────────────

    #[test]
    fn commit_decrements_whole_window() {
        let mut env = envelope_over(&[0, 1, 2], 5, Some(6));
        env.commit(0, 2, 2, 3).unwrap();
        assert_eq!(env.cpu_remaining(0), Some(3));
        assert_eq!(env.cpu_remaining(1), Some(3));
        assert_eq!(env.cpu_remaining(2), Some(5)); // outside window
        assert_eq!(env.ram_remaining(0), Some(3));
    }

    #[test]
    fn commit_underflow_is_rejected_and_leaves_envelope_unchanged() {
        let mut env = envelope_over(&[0, 1], 5, None);
        env.commit(1, 1, 4, 0).unwrap();
        let before = env.clone();

        let err = env.commit(0, 2, 2, 0).unwrap_err();
        assert_eq!(
            err,
            EnvelopeError::CpuUnderflow {
                slot: 1,
                remaining: 1,
                demand: 2
            }
        );
        assert_eq!(env, before, "failed commit must not partially apply");
    }

    #[test]
    fn commit_missing_slot_is_rejected() {
        let mut env = envelope_over(&[0, 1], 5, None);
        let err = env.commit(1, 2, 1, 0).unwrap_err();
        assert_eq!(err, EnvelopeError::MissingSlot { slot: 2 });
    }

    // ── idle accounting ───────────────────────────────────────────────────────

    #[test]
    fn idle_cpu_sums_remaining_capacity() {
        let mut env = envelope_over(&[0, 1, 2], 4, None);
        assert_eq!(env.idle_cpu(), 12);
        env.commit(0, 2, 3, 0).unwrap();
        assert_eq!(env.idle_cpu(), 6);
    }
}
