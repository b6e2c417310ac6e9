//! Day-phase consensus derivation.
//!
//! The day log is an unordered, append-only set of [`DayEvent`]s submitted by
//! any number of clients. [`derive`] replays it in `(created_at, id)` order and
//! folds it into a [`DerivedDayState`]: nominations and their validity,
//! readiness, the fixed ballot, tallies, majority/tie detection and the skip
//! consensus. Every observer holding the same set of events derives the same
//! state, regardless of the order in which the events arrived.

use crate::types::{EventId, Participant, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// One player action (or privileged transition) in the day log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum DayAction {
    /// Current nomination of the actor; `None` retracts it
    Nominate {
        actor_id: PlayerId,
        target_id: Option<PlayerId>,
    },
    Support {
        actor_id: PlayerId,
        target_id: PlayerId,
        support: bool,
    },
    Ready {
        actor_id: PlayerId,
        ready: bool,
    },
    /// Fixes the ballot for the rest of the round (until a reset)
    StartVote { candidates: Vec<PlayerId> },
    Vote {
        actor_id: PlayerId,
        target_id: PlayerId,
    },
    Skip {
        actor_id: PlayerId,
        support: bool,
    },
    /// Drops everything accumulated so far in the round
    Reset,
}

impl DayAction {
    /// The player this action speaks for, if it is not a privileged transition
    pub fn actor_id(&self) -> Option<&PlayerId> {
        match self {
            DayAction::Nominate { actor_id, .. }
            | DayAction::Support { actor_id, .. }
            | DayAction::Ready { actor_id, .. }
            | DayAction::Vote { actor_id, .. }
            | DayAction::Skip { actor_id, .. } => Some(actor_id),
            DayAction::StartVote { .. } | DayAction::Reset => None,
        }
    }

    pub fn is_privileged(&self) -> bool {
        self.actor_id().is_none()
    }
}

/// An entry of the append-only day log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayEvent {
    pub id: EventId,
    /// Milliseconds since the epoch; primary replay key
    pub created_at: i64,
    pub round: u32,
    #[serde(flatten)]
    pub action: DayAction,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DayStage {
    Nominations,
    Voting,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Nomination {
    pub target_id: PlayerId,
    /// In the order the nominations were made
    pub nominator_ids: Vec<PlayerId>,
    /// In participant order
    pub supporter_ids: Vec<PlayerId>,
    pub valid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteTally {
    pub target_id: PlayerId,
    pub count: usize,
}

/// The authoritative view of a day, derived from the log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DerivedDayState {
    pub round: u32,
    pub stage: DayStage,
    pub eligible_ids: Vec<PlayerId>,
    pub nominations: Vec<Nomination>,
    /// Current nomination per actor
    pub nomination_by_actor: BTreeMap<PlayerId, PlayerId>,
    pub ready_ids: Vec<PlayerId>,
    pub ready_count: usize,
    /// Fixed ballot; empty during nominations
    pub candidates: Vec<PlayerId>,
    /// Counted ballots only (voter -> candidate)
    pub votes: BTreeMap<PlayerId, PlayerId>,
    /// One entry per candidate, in ballot order
    pub tally: Vec<VoteTally>,
    pub pending_voter_ids: Vec<PlayerId>,
    pub majority_threshold: usize,
    pub majority_target_id: Option<PlayerId>,
    pub tie: bool,
    pub skip_support_ids: Vec<PlayerId>,
    pub skip_support_count: usize,
    pub skip_has_majority: bool,
}

impl DerivedDayState {
    pub fn eligible_count(&self) -> usize {
        self.eligible_ids.len()
    }

    pub fn all_ready(&self) -> bool {
        !self.eligible_ids.is_empty() && self.ready_count == self.eligible_ids.len()
    }

    /// Targets of valid nominations, in nomination order
    pub fn valid_targets(&self) -> Vec<PlayerId> {
        self.nominations
            .iter()
            .filter(|n| n.valid)
            .map(|n| n.target_id.clone())
            .collect()
    }

    pub fn voting_complete(&self) -> bool {
        self.stage == DayStage::Voting && self.pending_voter_ids.is_empty()
    }
}

/// `floor(n/2) + 1`
pub fn majority_threshold(eligible_count: usize) -> usize {
    eligible_count / 2 + 1
}

/// Candidates for an automatic `StartVote`, if the round is ready for one.
///
/// Fires when every eligible participant is ready, at least one nomination
/// is valid and no skip majority exists. Enforced by the caller; [`derive`]
/// never appends events itself.
pub fn auto_start_candidates(state: &DerivedDayState) -> Option<Vec<PlayerId>> {
    if state.stage != DayStage::Nominations || !state.all_ready() || state.skip_has_majority {
        return None;
    }
    let targets = state.valid_targets();
    if targets.is_empty() {
        None
    } else {
        Some(targets)
    }
}

/// Accumulated effect of the events replayed since the last reset
#[derive(Default)]
struct Replay<'a> {
    /// actor -> (target, position of the event that set it)
    nominations: HashMap<&'a str, (&'a str, usize)>,
    /// (actor, target) pairs currently supporting
    support: HashSet<(&'a str, &'a str)>,
    ready: HashSet<&'a str>,
    votes: HashMap<&'a str, &'a str>,
    skips: HashSet<&'a str>,
    candidates: Option<&'a [PlayerId]>,
}

impl<'a> Replay<'a> {
    fn apply(&mut self, seq: usize, action: &'a DayAction, eligible: &HashSet<&str>) {
        if let Some(actor) = action.actor_id() {
            if !eligible.contains(actor.as_str()) {
                return;
            }
        }

        match action {
            DayAction::Reset => *self = Replay::default(),
            DayAction::StartVote { candidates } => {
                // The earliest StartVote since the last reset is authoritative
                if self.candidates.is_none() {
                    self.candidates = Some(candidates.as_slice());
                }
            }
            DayAction::Nominate {
                actor_id,
                target_id: None,
            } => {
                self.nominations.remove(actor_id.as_str());
            }
            DayAction::Nominate {
                actor_id,
                target_id: Some(target),
            } => {
                // Recorded even for an ineligible target so it still replaces
                // the actor's earlier choice
                let unchanged = self
                    .nominations
                    .get(actor_id.as_str())
                    .is_some_and(|(current, _)| *current == target.as_str());
                if !unchanged {
                    self.nominations
                        .insert(actor_id.as_str(), (target.as_str(), seq));
                }
            }
            DayAction::Support {
                actor_id,
                target_id,
                support,
            } => {
                if !eligible.contains(target_id.as_str()) {
                    return;
                }
                let pair = (actor_id.as_str(), target_id.as_str());
                if *support {
                    self.support.insert(pair);
                } else {
                    self.support.remove(&pair);
                }
            }
            DayAction::Ready { actor_id, ready } => {
                if *ready {
                    self.ready.insert(actor_id.as_str());
                } else {
                    self.ready.remove(actor_id.as_str());
                }
            }
            DayAction::Vote {
                actor_id,
                target_id,
            } => {
                if self.candidates.is_none() {
                    return;
                }
                self.votes.insert(actor_id.as_str(), target_id.as_str());
            }
            DayAction::Skip { actor_id, support } => {
                if *support {
                    self.skips.insert(actor_id.as_str());
                } else {
                    self.skips.remove(actor_id.as_str());
                }
            }
        }
    }
}

/// Replay the day log for `round` against the current roster.
pub fn derive(events: &[DayEvent], round: u32, participants: &[Participant]) -> DerivedDayState {
    let eligible_ids: Vec<PlayerId> = participants
        .iter()
        .filter(|p| p.alive)
        .map(|p| p.id.clone())
        .collect();
    let eligible: HashSet<&str> = eligible_ids.iter().map(String::as_str).collect();
    let participant_order: HashMap<&str, usize> = participants
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id.as_str(), i))
        .collect();

    let mut ordered: Vec<&DayEvent> = events.iter().filter(|e| e.round == round).collect();
    ordered.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    // Duplicate delivery of the same event
    ordered.dedup_by(|a, b| a.id == b.id && a.created_at == b.created_at);

    let mut replay = Replay::default();
    for (seq, event) in ordered.iter().enumerate() {
        replay.apply(seq, &event.action, &eligible);
    }

    let nominations = build_nominations(&replay, &eligible_ids, &participant_order);
    let nomination_by_actor = replay
        .nominations
        .iter()
        .filter(|(_, (target, _))| eligible.contains(target))
        .map(|(actor, (target, _))| (actor.to_string(), target.to_string()))
        .collect();

    let ready_ids: Vec<PlayerId> = eligible_ids
        .iter()
        .filter(|id| replay.ready.contains(id.as_str()))
        .cloned()
        .collect();
    let skip_support_ids: Vec<PlayerId> = eligible_ids
        .iter()
        .filter(|id| replay.skips.contains(id.as_str()))
        .cloned()
        .collect();

    let stage = if replay.candidates.is_some() {
        DayStage::Voting
    } else {
        DayStage::Nominations
    };

    let mut candidates: Vec<PlayerId> = Vec::new();
    for candidate in replay.candidates.unwrap_or_default() {
        if eligible.contains(candidate.as_str()) && !candidates.contains(candidate) {
            candidates.push(candidate.clone());
        }
    }

    let votes: BTreeMap<PlayerId, PlayerId> = replay
        .votes
        .iter()
        .filter(|(_, &target)| candidates.iter().any(|c| c.as_str() == target))
        .map(|(voter, target)| (voter.to_string(), target.to_string()))
        .collect();

    let tally: Vec<VoteTally> = candidates
        .iter()
        .map(|candidate| VoteTally {
            target_id: candidate.clone(),
            count: votes.values().filter(|t| *t == candidate).count(),
        })
        .collect();

    let pending_voter_ids: Vec<PlayerId> = eligible_ids
        .iter()
        .filter(|id| !votes.contains_key(*id))
        .cloned()
        .collect();

    let eligible_count = eligible_ids.len();
    let threshold = majority_threshold(eligible_count);

    let mut leader: Option<&VoteTally> = None;
    for entry in &tally {
        if leader.map_or(true, |l| entry.count > l.count) {
            leader = Some(entry);
        }
    }
    let majority_target_id = leader
        .filter(|l| l.count >= threshold)
        .map(|l| l.target_id.clone());

    let skip_support_count = skip_support_ids.len();

    let mut state = DerivedDayState {
        round,
        stage,
        nominations,
        nomination_by_actor,
        ready_count: ready_ids.len(),
        ready_ids,
        candidates,
        votes,
        tally,
        pending_voter_ids,
        majority_threshold: threshold,
        majority_target_id,
        tie: false,
        skip_has_majority: skip_support_count * 2 > eligible_count,
        skip_support_count,
        skip_support_ids,
        eligible_ids,
    };
    state.tie = state.voting_complete()
        && state.majority_target_id.is_none()
        && is_tied(&state.tally, state.eligible_count());
    state
}

fn build_nominations(
    replay: &Replay<'_>,
    eligible_ids: &[PlayerId],
    participant_order: &HashMap<&str, usize>,
) -> Vec<Nomination> {
    let mut by_target: HashMap<&str, Vec<(&str, usize)>> = HashMap::new();
    for (&actor, &(target, seq)) in &replay.nominations {
        if !eligible_ids.iter().any(|id| id == target) {
            continue;
        }
        by_target.entry(target).or_default().push((actor, seq));
    }

    let mut entries: Vec<(usize, usize, Nomination)> = by_target
        .into_iter()
        .map(|(target, mut nominators)| {
            nominators.sort_by_key(|(_, seq)| *seq);
            let first_seen = nominators.first().map(|(_, seq)| *seq).unwrap_or(usize::MAX);
            let nominator_ids: Vec<PlayerId> =
                nominators.iter().map(|(a, _)| a.to_string()).collect();
            let supporter_ids: Vec<PlayerId> = eligible_ids
                .iter()
                .filter(|id| replay.support.contains(&(id.as_str(), target)))
                .cloned()
                .collect();
            // A nominator's own support never validates the nomination
            let valid = !nominator_ids.is_empty()
                && supporter_ids.iter().any(|s| !nominator_ids.contains(s));
            let order = participant_order.get(target).copied().unwrap_or(usize::MAX);
            (
                first_seen,
                order,
                Nomination {
                    target_id: target.to_string(),
                    nominator_ids,
                    supporter_ids,
                    valid,
                },
            )
        })
        .collect();

    entries.sort_by_key(|(first_seen, order, _)| (*first_seen, *order));
    entries.into_iter().map(|(_, _, n)| n).collect()
}

fn is_tied(tally: &[VoteTally], eligible_count: usize) -> bool {
    match tally {
        [] => false,
        [only] => only.count * 2 == eligible_count,
        _ => {
            let mut counts: Vec<usize> = tally.iter().map(|t| t.count).collect();
            counts.sort_unstable_by(|a, b| b.cmp(a));
            counts[0] == counts[1]
        }
    }
}
