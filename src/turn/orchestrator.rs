//! Orchestrator - drives one atomic turn at a time
//!
//! A turn is resolved entirely on a working copy of the registry. Only after
//! the snapshot has been appended to the timeline does the working copy
//! replace the live registry, so any failure on the way leaves both the
//! registry and the timeline exactly as they were.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::combat::{self, Engagement};
use crate::core::config::EngineConfig;
use crate::core::error::{NacioError, Result};
use crate::core::types::{NationId, TimelineId, Turn};
use crate::nation::{Directive, DirectiveEffect, Registry, World};
use crate::ranking::Leaderboards;
use crate::timeline::{Autosaver, BranchPoint, Fallback, Snapshot, TimelineManager};
use crate::turn::phase::{Rejection, Submission, Ticket, TurnPhase};
use crate::turn::progression;
use crate::turn::result::{NationReport, TurnResult};

/// Where play continues after a resume
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeReport {
    pub timeline: TimelineId,
    pub turn: Turn,
    /// Set when the requested turn did not exist
    pub fallback: Option<Fallback>,
    /// Set when resuming mid-history opened a new branch
    pub branched_from: Option<BranchPoint>,
}

pub struct Orchestrator {
    registry: Registry,
    config: EngineConfig,
    timelines: TimelineManager,
    timeline: TimelineId,
    phase: TurnPhase,
    autosave: Option<Autosaver>,
}

impl Orchestrator {
    /// Start play from `registry`: a fresh root timeline whose first snapshot
    /// is the registry at its current turn (turn 0 for a new scenario)
    pub fn new(registry: Registry, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let timelines = TimelineManager::new();
        let timeline = timelines.create_at("main", registry.world().turn);
        timelines.append(timeline, registry.snapshot())?;

        Ok(Self {
            registry,
            config,
            timelines,
            timeline,
            phase: TurnPhase::Idle,
            autosave: None,
        })
    }

    /// Continue from a single saved snapshot, such as an autosave
    pub fn restore(snapshot: Snapshot, config: EngineConfig) -> Result<Self> {
        let orch = Self::new(Registry::from_world(snapshot.to_world()), config)?;
        tracing::info!(turn = snapshot.turn(), year = snapshot.year(), "Restored from snapshot");
        Ok(orch)
    }

    /// Continue an existing timeline from its latest snapshot
    pub fn attach(timelines: TimelineManager, timeline: TimelineId, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let latest = timelines.latest(timeline)?;
        Ok(Self {
            registry: Registry::from_world(latest.to_world()),
            config,
            timelines,
            timeline,
            phase: TurnPhase::Idle,
            autosave: None,
        })
    }

    pub fn with_autosave(mut self, autosaver: Autosaver) -> Self {
        self.autosave = Some(autosaver);
        self
    }

    /// Detach the autosaver so it can be flushed
    pub fn take_autosaver(&mut self) -> Option<Autosaver> {
        self.autosave.take()
    }

    pub fn phase(&self) -> &TurnPhase {
        &self.phase
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn world(&self) -> &World {
        self.registry.world()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn timeline(&self) -> TimelineId {
        self.timeline
    }

    /// Shared handle to the timeline store
    pub fn timelines(&self) -> &TimelineManager {
        &self.timelines
    }

    /// Directives queued for the open turn
    pub fn pending(&self) -> &[Submission] {
        match &self.phase {
            TurnPhase::AwaitingDirectives(queue) => queue,
            _ => &[],
        }
    }

    /// Committed snapshot the live registry was built from
    pub fn current_snapshot(&self) -> Result<Arc<Snapshot>> {
        self.timelines.read(self.timeline, self.registry.world().turn)
    }

    pub fn open_turn(&mut self) -> Result<Turn> {
        self.ensure_settled("open a turn")?;
        self.phase = TurnPhase::AwaitingDirectives(Vec::new());
        let turn = self.registry.world().turn;
        tracing::debug!(timeline = %self.timeline.short(), turn, "Turn opened");
        Ok(turn)
    }

    /// Queue a directive for the open turn
    ///
    /// Each directive is checked on its own against the committed state.
    /// Attacks are also checked against the attacks already queued: one per
    /// ordered pair, and the total committed force within strength.
    pub fn submit(&mut self, nation: NationId, directive: Directive) -> std::result::Result<Ticket, Rejection> {
        let phase = self.phase.name();
        let TurnPhase::AwaitingDirectives(queue) = &mut self.phase else {
            return Err(Rejection::new(
                nation,
                directive,
                NacioError::IllegalTransition {
                    phase,
                    action: "submit a directive",
                },
            ));
        };

        let checked = self
            .registry
            .validate_directive(&nation, &directive, &self.config.directives)
            .map_err(|err| err.to_string())
            .and_then(|()| match &directive {
                Directive::Attack { target, force } => {
                    check_attack_queue(queue.as_slice(), &self.registry, &nation, target, *force)
                }
                _ => Ok(()),
            });
        if let Err(reason) = checked {
            tracing::warn!(nation = %nation, kind = directive.kind(), %reason, "Directive rejected");
            return Err(Rejection::new(nation, directive, reason));
        }

        let ticket = Ticket(queue.len() as u32 + 1);
        tracing::debug!(nation = %nation, kind = directive.kind(), %ticket, "Directive accepted");
        queue.push(Submission {
            ticket,
            nation,
            directive,
        });
        Ok(ticket)
    }

    /// Drop the open turn and everything queued; returns how many were dropped
    pub fn cancel_turn(&mut self) -> Result<usize> {
        match std::mem::replace(&mut self.phase, TurnPhase::Idle) {
            TurnPhase::AwaitingDirectives(queue) => {
                tracing::info!(dropped = queue.len(), "Turn cancelled");
                Ok(queue.len())
            }
            other => {
                let phase = other.name();
                self.phase = other;
                Err(NacioError::IllegalTransition {
                    phase,
                    action: "cancel the turn",
                })
            }
        }
    }

    /// Resolve and commit the open turn
    pub fn end_turn(&mut self) -> Result<TurnResult> {
        let queue = match std::mem::replace(&mut self.phase, TurnPhase::Resolving) {
            TurnPhase::AwaitingDirectives(queue) => queue,
            other => {
                let phase = other.name();
                self.phase = other;
                return Err(NacioError::IllegalTransition {
                    phase,
                    action: "end the turn",
                });
            }
        };

        let (working, snapshot, result) = match self.resolve(&queue) {
            Ok(resolved) => resolved,
            Err(err) => {
                self.phase = TurnPhase::Idle;
                tracing::warn!(%err, "Turn aborted");
                return Err(err);
            }
        };

        let committed = match self.timelines.append(self.timeline, snapshot) {
            Ok(committed) => committed,
            Err(err) => {
                self.phase = TurnPhase::Idle;
                tracing::warn!(%err, "Turn aborted at commit");
                return Err(err);
            }
        };

        self.registry = working;
        self.phase = TurnPhase::Committed;

        if let Some(autosave) = &self.autosave {
            if let Err(err) = autosave.submit(self.timeline, committed) {
                tracing::warn!(%err, "Autosave skipped");
            }
        }

        tracing::info!(
            timeline = %self.timeline.short(),
            turn = result.turn,
            year = result.year,
            engagements = result.engagements.len(),
            hash = %&result.snapshot_hash[..12],
            "Turn committed"
        );
        Ok(result)
    }

    /// Continue from `turn` on `timeline`, or its latest turn when `None`
    ///
    /// Picking up anywhere but the end of a timeline opens a branch there,
    /// so the turns after it are never overwritten.
    pub fn resume(&mut self, timeline: TimelineId, turn: Option<Turn>) -> Result<ResumeReport> {
        self.ensure_settled("resume")?;
        let resumed = self.timelines.resume(timeline, turn)?;
        let at = resumed.snapshot.turn();
        let latest = self.timelines.latest(timeline)?.turn();

        let (active, branched_from) = if at < latest {
            let child = self.timelines.branch(timeline, at)?;
            (child, Some(BranchPoint { timeline, turn: at }))
        } else {
            (timeline, None)
        };

        self.registry = Registry::from_world(resumed.snapshot.to_world());
        self.timeline = active;
        self.phase = TurnPhase::Idle;
        tracing::info!(timeline = %active.short(), turn = at, branched = branched_from.is_some(), "Resumed");

        Ok(ResumeReport {
            timeline: active,
            turn: at,
            fallback: resumed.fallback,
            branched_from,
        })
    }

    /// Fork the active timeline at the current turn and continue on the fork
    pub fn branch_here(&mut self) -> Result<TimelineId> {
        self.ensure_settled("branch")?;
        let child = self
            .timelines
            .branch(self.timeline, self.registry.world().turn)?;
        self.timeline = child;
        self.phase = TurnPhase::Idle;
        Ok(child)
    }

    fn ensure_settled(&self, action: &'static str) -> Result<()> {
        if self.phase.is_settled() {
            Ok(())
        } else {
            Err(NacioError::IllegalTransition {
                phase: self.phase.name(),
                action,
            })
        }
    }

    /// Run the whole turn on a working copy
    fn resolve(&self, queue: &[Submission]) -> Result<(Registry, Snapshot, TurnResult)> {
        let before = self.registry.world();
        let mut working = self.registry.clone();
        let mut rejections = Vec::new();

        // Directives, in submission order
        let mut attacks: Vec<(&Submission, Engagement)> = Vec::new();
        for submission in queue {
            match working.apply_directive(
                &submission.nation,
                &submission.directive,
                &self.config.directives,
            ) {
                Ok(DirectiveEffect::Applied { .. }) => {}
                Ok(DirectiveEffect::Engagement(engagement)) => attacks.push((submission, engagement)),
                Err(err) => rejections.push(Rejection::of(submission, err)),
            }
        }
        ensure_clean(rejections)?;

        // Combat, against the post-directive world
        let (sources, engagements): (Vec<&Submission>, Vec<Engagement>) = attacks.into_iter().unzip();
        let outcomes = combat::resolve_each(&engagements, working.world(), self.config.parallel_threshold);

        let mut rejections = Vec::new();
        let mut results = Vec::with_capacity(outcomes.len());
        for (submission, outcome) in sources.iter().zip(outcomes) {
            match outcome {
                Ok(result) => results.push(result),
                Err(err) => rejections.push(Rejection::of(submission, err)),
            }
        }
        ensure_clean(rejections)?;

        let mut rejections = Vec::new();
        let mut engagements = Vec::with_capacity(results.len());
        for (submission, result) in sources.iter().zip(&results) {
            match working.apply_combat(result) {
                Ok(applied) => engagements.push(applied),
                Err(err) => rejections.push(Rejection::of(submission, err)),
            }
        }
        ensure_clean(rejections)?;

        // Growth, then the calendar, then eras
        let mut events = progression::progress_all(&mut working, &self.config.economy)?;
        working.advance_turn();

        let mut transitions = BTreeMap::new();
        for id in working.ids() {
            if let Some(step) = working.reclassify_era(&id)? {
                tracing::debug!(nation = %id, from = %step.from, to = %step.to, "Era changed");
                transitions.insert(id, step);
            }
        }

        let leaderboards = Leaderboards::compute(working.world(), self.config.leaderboard_size);
        let snapshot = working.snapshot();

        let nations = working
            .world()
            .nations
            .iter()
            .filter_map(|(id, after)| {
                before.nations.get(id).map(|prior| {
                    let report = NationReport::between(
                        prior,
                        after,
                        transitions.remove(id),
                        events.remove(id).unwrap_or_default(),
                    );
                    (id.clone(), report)
                })
            })
            .collect();

        let result = TurnResult {
            timeline: self.timeline,
            turn: snapshot.turn(),
            year: snapshot.year(),
            directives_applied: queue.len(),
            nations,
            engagements,
            leaderboards,
            snapshot_hash: snapshot.content_hash(),
        };
        Ok((working, snapshot, result))
    }
}

fn ensure_clean(rejections: Vec<Rejection>) -> Result<()> {
    if rejections.is_empty() {
        Ok(())
    } else {
        for rejection in &rejections {
            tracing::warn!(%rejection, "Directive failed during resolution");
        }
        Err(NacioError::TurnRejected(rejections))
    }
}

fn check_attack_queue(
    queue: &[Submission],
    registry: &Registry,
    attacker: &NationId,
    target: &NationId,
    force: f64,
) -> std::result::Result<(), String> {
    let mut committed = 0.0;
    for queued in queue.iter().filter(|s| &s.nation == attacker) {
        if let Directive::Attack {
            target: queued_target,
            force: queued_force,
        } = &queued.directive
        {
            if queued_target == target {
                return Err(format!(
                    "{} already attacks {} this turn ({})",
                    attacker, target, queued.ticket
                ));
            }
            committed += queued_force;
        }
    }

    let strength = registry
        .get(attacker)
        .map(|n| n.military_strength)
        .map_err(|err| err.to_string())?;
    if committed + force > strength {
        return Err(format!(
            "{} would commit {:.1} in total but has only {:.1} strength",
            attacker,
            committed + force,
            strength
        ));
    }
    Ok(())
}
