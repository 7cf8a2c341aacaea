// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Person assembly from matched limb connections.
//!
//! Connections are folded limb type by limb type into person records held in
//! an index-stable arena. An owner index maps every candidate id to the
//! record currently holding it, so membership lookups never scan record
//! contents and a merged-away record can tombstone without invalidating
//! indices recorded earlier in the pass.
//!
//! Invariants maintained throughout: a candidate id is owned by at most one
//! record, and a record's joint count always equals its number of filled
//! slots.

#![allow(clippy::cast_precision_loss)]

use crate::config::DecoderConfig;
use crate::connections::{Connection, LimbConnections};
use crate::error::{PoseError, Result};
use crate::peaks::CandidateSet;
use crate::topology::{Limb, Topology};

/// One partially or fully assembled person.
///
/// `slots[j]` holds the global candidate id assigned to joint type `j`, or
/// `None` when that joint was not found for this person.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonRecord {
    slots: Vec<Option<usize>>,
    score: f32,
    joints: usize,
}

impl PersonRecord {
    fn empty(num_joints: usize) -> Self {
        Self {
            slots: vec![None; num_joints],
            score: 0.0,
            joints: 0,
        }
    }

    /// Candidate id assigned to one joint type.
    #[must_use]
    pub fn slot(&self, joint: usize) -> Option<usize> {
        self.slots.get(joint).copied().flatten()
    }

    /// All joint slots, indexed by joint type.
    #[must_use]
    pub fn slots(&self) -> &[Option<usize>] {
        &self.slots
    }

    /// Accumulated evidence score.
    #[must_use]
    pub const fn score(&self) -> f32 {
        self.score
    }

    /// Number of joints found, always equal to the filled slot count.
    #[must_use]
    pub const fn num_joints(&self) -> usize {
        self.joints
    }
}

/// Outcome of the record search for one connection.
enum Matched {
    None,
    One(usize),
    Two(usize, usize),
}

/// Incremental assembler over one frame's connections.
pub struct PersonAssembler<'a> {
    topology: &'a Topology,
    /// Arena of records; merged-away entries become `None` so indices in
    /// `owner` stay valid for the whole pass.
    records: Vec<Option<PersonRecord>>,
    /// Candidate id to arena index of the owning record.
    owner: Vec<Option<usize>>,
}

impl<'a> PersonAssembler<'a> {
    /// New empty assembler for `num_candidates` extracted candidates.
    #[must_use]
    pub fn new(topology: &'a Topology, num_candidates: usize) -> Self {
        Self {
            topology,
            records: Vec::new(),
            owner: vec![None; num_candidates],
        }
    }

    /// Fold every accepted connection into the arena, limb by limb in
    /// topology order. Skipped limbs contribute nothing.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::DecodeError`] if the match list does not line up
    /// with the topology or a connection references an unknown candidate.
    pub fn assemble(
        &mut self,
        matches: &[LimbConnections],
        candidates: &CandidateSet,
    ) -> Result<()> {
        if matches.len() != self.topology.num_limbs() {
            return Err(PoseError::DecodeError(format!(
                "got {} limb match lists for a topology with {} limbs",
                matches.len(),
                self.topology.num_limbs()
            )));
        }
        for (limb, outcome) in self.topology.limbs().iter().zip(matches) {
            let Some(connections) = outcome.connections() else {
                continue;
            };
            for conn in connections {
                self.apply(limb, conn, candidates)?;
            }
        }
        Ok(())
    }

    /// Apply the joint-count and score filters and return the survivors in
    /// creation order.
    #[must_use]
    pub fn finish(self, config: &DecoderConfig) -> Vec<PersonRecord> {
        self.records
            .into_iter()
            .flatten()
            .filter(|person| {
                person.joints >= config.min_joints
                    && person.score / person.joints as f32 >= config.min_score_ratio
            })
            .collect()
    }

    fn apply(&mut self, limb: &Limb, conn: &Connection, candidates: &CandidateSet) -> Result<()> {
        let cand_a = candidates
            .get(conn.a)
            .ok_or_else(|| unknown_candidate(conn.a, candidates.len()))?;
        let cand_b = candidates
            .get(conn.b)
            .ok_or_else(|| unknown_candidate(conn.b, candidates.len()))?;
        if cand_a.joint != limb.a || cand_b.joint != limb.b {
            return Err(PoseError::DecodeError(format!(
                "connection ({}, {}) endpoints do not belong to joints ({}, {})",
                conn.a, conn.b, limb.a, limb.b
            )));
        }
        let conf_a = cand_a.score;
        let conf_b = cand_b.score;

        match self.matching_records(conn) {
            Matched::None => {
                if !limb.terminal_only {
                    self.create(limb, conn, conf_a, conf_b);
                }
            }
            Matched::One(record) => self.assign_destination(record, limb, conn, conf_b),
            Matched::Two(first, second) => {
                if self.disjoint(first, second) {
                    self.merge(first, second, conn);
                } else {
                    // Overlapping records cannot merge; treat the earlier
                    // one as the single match.
                    self.assign_destination(first, limb, conn, conf_b);
                }
            }
        }
        Ok(())
    }

    /// Records already holding either endpoint, lowest arena index first.
    fn matching_records(&self, conn: &Connection) -> Matched {
        match (self.owner[conn.a], self.owner[conn.b]) {
            (None, None) => Matched::None,
            (Some(r), None) | (None, Some(r)) => Matched::One(r),
            (Some(ra), Some(rb)) if ra == rb => Matched::One(ra),
            (Some(ra), Some(rb)) => Matched::Two(ra.min(rb), ra.max(rb)),
        }
    }

    fn create(&mut self, limb: &Limb, conn: &Connection, conf_a: f32, conf_b: f32) {
        let mut record = PersonRecord::empty(self.topology.num_joints());
        record.slots[limb.a] = Some(conn.a);
        record.slots[limb.b] = Some(conn.b);
        record.joints = 2;
        record.score = conf_a + conf_b + conn.score;
        let index = self.records.len();
        self.records.push(Some(record));
        self.owner[conn.a] = Some(index);
        self.owner[conn.b] = Some(index);
    }

    /// Assign the destination candidate to `record`, moving ownership from
    /// any record that currently holds it.
    fn assign_destination(&mut self, record: usize, limb: &Limb, conn: &Connection, conf_b: f32) {
        let already = self.records[record]
            .as_ref()
            .is_some_and(|r| r.slots[limb.b] == Some(conn.b));
        if already {
            // Duplicate evidence for an assignment this record already has.
            return;
        }

        if let Some(holder) = self.owner[conn.b]
            && let Some(victim) = self.records[holder].as_mut()
        {
            victim.slots[limb.b] = None;
            victim.joints -= 1;
        }

        if let Some(target) = self.records[record].as_mut() {
            if let Some(displaced) = target.slots[limb.b].replace(conn.b) {
                self.owner[displaced] = None;
            } else {
                target.joints += 1;
            }
            target.score += conf_b + conn.score;
            self.owner[conn.b] = Some(record);
        }
    }

    /// True when no joint slot is filled in both records.
    fn disjoint(&self, first: usize, second: usize) -> bool {
        match (self.records[first].as_ref(), self.records[second].as_ref()) {
            (Some(a), Some(b)) => a
                .slots
                .iter()
                .zip(&b.slots)
                .all(|(x, y)| x.is_none() || y.is_none()),
            _ => false,
        }
    }

    /// Fold `second` into `first` and tombstone it. Callers must have
    /// checked disjointness.
    fn merge(&mut self, first: usize, second: usize, conn: &Connection) {
        let Some(merged) = self.records[second].take() else {
            return;
        };
        if let Some(target) = self.records[first].as_mut() {
            for (joint, slot) in merged.slots.iter().enumerate() {
                if let Some(candidate) = *slot {
                    target.slots[joint] = Some(candidate);
                    self.owner[candidate] = Some(first);
                }
            }
            target.joints += merged.joints;
            target.score += merged.score + conn.score;
        }
    }
}

fn unknown_candidate(id: usize, total: usize) -> PoseError {
    PoseError::DecodeError(format!(
        "connection references candidate {id} but only {total} were extracted"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    /// Candidate set with `counts[j]` peaks of value `conf` for joint `j`.
    /// Ids come out joint-major: joint 0 first, rows ascending inside a
    /// joint.
    fn candidate_set(counts: &[usize], conf: f32) -> CandidateSet {
        let mut maps = Array3::zeros((32, 32, counts.len()));
        for (joint, &n) in counts.iter().enumerate() {
            for i in 0..n {
                maps[[2 * i, 2 * joint, joint]] = conf;
            }
        }
        CandidateSet::extract(&maps, conf.min(0.05))
    }

    /// Four joints in a chain plus a shortcut: 0-1, 0-2, 1-2, 2-3.
    fn chain_topology() -> Topology {
        Topology::new(
            4,
            vec![
                Limb::new(0, 1, 0, 1),
                Limb::new(0, 2, 2, 3),
                Limb::new(1, 2, 4, 5),
                Limb::new(2, 3, 6, 7),
            ],
        )
        .unwrap()
    }

    fn conn(a: usize, b: usize, score: f32) -> Connection {
        Connection {
            a,
            b,
            score,
            total: 0.0,
        }
    }

    fn matches_for(
        topology: &Topology,
        per_limb: Vec<Vec<Connection>>,
    ) -> Vec<LimbConnections> {
        assert_eq!(per_limb.len(), topology.num_limbs());
        per_limb.into_iter().map(LimbConnections::Matched).collect()
    }

    fn loose() -> DecoderConfig {
        DecoderConfig::default()
            .with_min_joints(1)
            .with_min_score_ratio(0.0)
    }

    /// No candidate id may be owned by two surviving records.
    fn assert_exclusive(records: &[PersonRecord]) {
        let mut seen = std::collections::HashSet::new();
        for record in records {
            for id in record.slots().iter().flatten() {
                assert!(seen.insert(*id), "candidate {id} owned twice");
            }
        }
    }

    fn assert_counts_match_slots(records: &[PersonRecord]) {
        for record in records {
            let filled = record.slots().iter().flatten().count();
            assert_eq!(record.num_joints(), filled);
        }
    }

    #[test]
    fn test_single_connection_creates_record() {
        let topo = chain_topology();
        // Ids: joint 0 -> 0, joint 1 -> 1, joints 2 and 3 -> 2 and 3.
        let cands = candidate_set(&[1, 1, 1, 1], 0.5);
        let matches = matches_for(
            &topo,
            vec![vec![conn(0, 1, 0.8)], vec![], vec![], vec![]],
        );

        let mut assembler = PersonAssembler::new(&topo, cands.len());
        assembler.assemble(&matches, &cands).unwrap();
        let records = assembler.finish(&loose());

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].slot(0), Some(0));
        assert_eq!(records[0].slot(1), Some(1));
        assert_eq!(records[0].slot(2), None);
        assert_eq!(records[0].num_joints(), 2);
        assert!((records[0].score() - 1.8).abs() < 1e-6);
        assert_counts_match_slots(&records);
    }

    #[test]
    fn test_chain_extends_existing_record() {
        let topo = chain_topology();
        let cands = candidate_set(&[1, 1, 1, 1], 0.5);
        let matches = matches_for(
            &topo,
            vec![
                vec![conn(0, 1, 0.8)],
                vec![],
                vec![conn(1, 2, 0.6)],
                vec![conn(2, 3, 0.4)],
            ],
        );

        let mut assembler = PersonAssembler::new(&topo, cands.len());
        assembler.assemble(&matches, &cands).unwrap();
        let records = assembler.finish(&loose());

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].num_joints(), 4);
        assert_eq!(records[0].slot(3), Some(3));
        // 4 * 0.5 joint confidence plus the three connection scores.
        assert!((records[0].score() - 3.8).abs() < 1e-6);
        assert_counts_match_slots(&records);
    }

    #[test]
    fn test_duplicate_evidence_is_a_no_op() {
        let topo = chain_topology();
        let cands = candidate_set(&[1, 1, 1, 1], 0.5);
        let matches = matches_for(
            &topo,
            vec![vec![conn(0, 1, 0.8), conn(0, 1, 0.8)], vec![], vec![], vec![]],
        );

        let mut assembler = PersonAssembler::new(&topo, cands.len());
        assembler.assemble(&matches, &cands).unwrap();
        let records = assembler.finish(&loose());

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].num_joints(), 2);
        assert!((records[0].score() - 1.8).abs() < 1e-6);
    }

    #[test]
    fn test_bridge_connection_merges_disjoint_records() {
        // Limb order matters: the 1-2 bridge is declared last so both
        // partial records exist when it arrives.
        let topo = Topology::new(
            4,
            vec![
                Limb::new(0, 1, 0, 1),
                Limb::new(2, 3, 2, 3),
                Limb::new(1, 2, 4, 5),
            ],
        )
        .unwrap();
        let cands = candidate_set(&[1, 1, 1, 1], 0.5);
        let matches = matches_for(
            &topo,
            vec![
                vec![conn(0, 1, 0.8)],
                vec![conn(2, 3, 0.7)],
                vec![conn(1, 2, 0.5)],
            ],
        );

        let mut assembler = PersonAssembler::new(&topo, cands.len());
        assembler.assemble(&matches, &cands).unwrap();
        let records = assembler.finish(&loose());

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].num_joints(), 4);
        assert_eq!(records[0].slot(0), Some(0));
        assert_eq!(records[0].slot(3), Some(3));
        // 2.0 of summed joint confidence plus the three connection scores.
        assert!((records[0].score() - 4.0).abs() < 1e-6);
        assert_exclusive(&records);
        assert_counts_match_slots(&records);
    }

    #[test]
    fn test_conflicting_records_fall_back_and_move_ownership() {
        let topo = chain_topology();
        // Two candidates for joint 0 so two records can overlap there.
        // Ids: joint0 -> 0, 1; joint1 -> 2; joint2 -> 3; joint3 -> 4.
        let cands = candidate_set(&[2, 1, 1, 1], 0.5);
        let matches = matches_for(
            &topo,
            vec![
                // Record 0: {0@j0, 2@j1}.
                vec![conn(0, 2, 0.8)],
                // Record 1: {1@j0, 3@j2}.
                vec![conn(1, 3, 0.6)],
                // Bridge joint1 to joint2: matches both records, which
                // overlap at joint 0, so record 0 absorbs the endpoint.
                vec![conn(2, 3, 0.5)],
                vec![],
            ],
        );

        let mut assembler = PersonAssembler::new(&topo, cands.len());
        assembler.assemble(&matches, &cands).unwrap();
        let records = assembler.finish(&loose());

        assert_eq!(records.len(), 2);
        let first = &records[0];
        let second = &records[1];
        assert_eq!(first.slot(2), Some(3));
        assert_eq!(first.num_joints(), 3);
        assert!((first.score() - 2.8).abs() < 1e-6);
        // The losing record keeps its score history but not the joint.
        assert_eq!(second.slot(2), None);
        assert_eq!(second.num_joints(), 1);
        assert!((second.score() - 1.6).abs() < 1e-6);
        assert_exclusive(&records);
        assert_counts_match_slots(&records);
    }

    #[test]
    fn test_replaced_candidate_becomes_assignable_again() {
        let topo = chain_topology();
        // Two candidates for joint 1. Ids: 0@j0; 1, 2@j1; 3@j2; 4@j3.
        let cands = candidate_set(&[1, 2, 1, 1], 0.5);
        let matches = matches_for(
            &topo,
            vec![
                // Second connection replaces the record's joint-1 slot.
                vec![conn(0, 1, 0.8), conn(0, 2, 0.9)],
                vec![],
                // The displaced candidate 1 is free again and seeds a new
                // record with joint 2.
                vec![conn(1, 3, 0.4)],
                vec![],
            ],
        );

        let mut assembler = PersonAssembler::new(&topo, cands.len());
        assembler.assemble(&matches, &cands).unwrap();
        let records = assembler.finish(&loose());

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].slot(1), Some(2));
        assert_eq!(records[0].num_joints(), 2);
        assert_eq!(records[1].slot(1), Some(1));
        assert_eq!(records[1].slot(2), Some(3));
        assert_exclusive(&records);
        assert_counts_match_slots(&records);
    }

    #[test]
    fn test_terminal_limb_never_creates() {
        let topo = Topology::new(
            3,
            vec![
                Limb::new(0, 1, 0, 1),
                Limb::new(1, 2, 2, 3).terminal(),
            ],
        )
        .unwrap();
        let cands = candidate_set(&[1, 1, 1], 0.5);

        // Alone, a terminal limb's connection is dropped.
        let matches = matches_for(&topo, vec![vec![], vec![conn(1, 2, 0.9)]]);
        let mut assembler = PersonAssembler::new(&topo, cands.len());
        assembler.assemble(&matches, &cands).unwrap();
        assert!(assembler.finish(&loose()).is_empty());

        // Attached to an existing record it still extends.
        let matches = matches_for(
            &topo,
            vec![vec![conn(0, 1, 0.8)], vec![conn(1, 2, 0.9)]],
        );
        let mut assembler = PersonAssembler::new(&topo, cands.len());
        assembler.assemble(&matches, &cands).unwrap();
        let records = assembler.finish(&loose());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].num_joints(), 3);
    }

    #[test]
    fn test_skipped_limbs_contribute_nothing() {
        let topo = chain_topology();
        let cands = candidate_set(&[1, 1, 1, 1], 0.5);
        let matches = vec![
            LimbConnections::Matched(vec![conn(0, 1, 0.8)]),
            LimbConnections::Skipped,
            LimbConnections::Skipped,
            LimbConnections::Skipped,
        ];

        let mut assembler = PersonAssembler::new(&topo, cands.len());
        assembler.assemble(&matches, &cands).unwrap();
        let records = assembler.finish(&loose());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].num_joints(), 2);
    }

    #[test]
    fn test_filter_thresholds() {
        let topo = chain_topology();
        // Low joint confidence keeps per-joint averages near the cutoff.
        let cands = candidate_set(&[1, 1, 1, 1], 0.1);

        // Record score 0.2 + s over two joints: s = 0.6 sits exactly on a
        // 0.4 average and survives, s = 0.59 falls just below.
        let keep = matches_for(&topo, vec![vec![conn(0, 1, 0.6)], vec![], vec![], vec![]]);
        let mut assembler = PersonAssembler::new(&topo, cands.len());
        assembler.assemble(&keep, &cands).unwrap();
        let config = DecoderConfig::default().with_min_joints(2);
        assert_eq!(assembler.finish(&config).len(), 1);

        let drop_ratio =
            matches_for(&topo, vec![vec![conn(0, 1, 0.59)], vec![], vec![], vec![]]);
        let mut assembler = PersonAssembler::new(&topo, cands.len());
        assembler.assemble(&drop_ratio, &cands).unwrap();
        assert!(assembler.finish(&config).is_empty());

        // Two joints filled, minimum of three required.
        let drop_joints =
            matches_for(&topo, vec![vec![conn(0, 1, 2.0)], vec![], vec![], vec![]]);
        let mut assembler = PersonAssembler::new(&topo, cands.len());
        assembler.assemble(&drop_joints, &cands).unwrap();
        let strict = DecoderConfig::default().with_min_joints(3);
        assert!(assembler.finish(&strict).is_empty());
    }

    #[test]
    fn test_two_people_stay_separate() {
        let topo = chain_topology();
        // Two candidates per joint. Ids: j0 -> 0,1; j1 -> 2,3; j2 -> 4,5;
        // j3 -> 6,7.
        let cands = candidate_set(&[2, 2, 2, 2], 0.5);
        let matches = matches_for(
            &topo,
            vec![
                vec![conn(0, 2, 0.9), conn(1, 3, 0.8)],
                vec![],
                vec![conn(2, 4, 0.7), conn(3, 5, 0.6)],
                vec![conn(4, 6, 0.5), conn(5, 7, 0.4)],
            ],
        );

        let mut assembler = PersonAssembler::new(&topo, cands.len());
        assembler.assemble(&matches, &cands).unwrap();
        let records = assembler.finish(&loose());

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].num_joints(), 4);
        assert_eq!(records[1].num_joints(), 4);
        assert_eq!(records[0].slot(3), Some(6));
        assert_eq!(records[1].slot(3), Some(7));
        assert_exclusive(&records);
        assert_counts_match_slots(&records);
    }

    #[test]
    fn test_mismatched_match_list_is_an_error() {
        let topo = chain_topology();
        let cands = candidate_set(&[1, 1, 1, 1], 0.5);
        let mut assembler = PersonAssembler::new(&topo, cands.len());
        let err = assembler
            .assemble(&[LimbConnections::Skipped], &cands)
            .unwrap_err();
        assert!(err.to_string().contains("limb match lists"));
    }

    #[test]
    fn test_unknown_candidate_is_an_error() {
        let topo = chain_topology();
        let cands = candidate_set(&[1, 1, 1, 1], 0.5);
        let matches = matches_for(&topo, vec![vec![conn(0, 99, 0.5)], vec![], vec![], vec![]]);
        let mut assembler = PersonAssembler::new(&topo, cands.len());
        let err = assembler.assemble(&matches, &cands).unwrap_err();
        assert!(err.to_string().contains("candidate 99"));
    }
}
