//! `ActorHost`: one actor's continuous sense-plan-act loop (spec §4.3).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;
use goap_effects::EffectDispatcher;
use goap_logging::{Field, PerActorLogger};
use goap_plan::{ExecutionProgress, ExecutorRegistry, Plan, Planner, Step};
use goap_reservations::ReservationService;
use goap_store::{CommitResult, Snapshot, WorldStore};
use goap_types::{
    ActorLoopState, ActorPlanStatus, EffectBatch, EntityId, PlanId, WorldTime, WriteEntry, OPEN_ATTRIBUTE,
};
use parking_lot::Mutex;
use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::cooldown::{CooldownSnapshot, CooldownState};
use crate::error::ActorError;
use crate::schedule::ScheduleService;

/// The `actors.json` persistence chunk's payload for one actor: enough to
/// resume diagnostics, backoff state, and jitter determinism across a
/// process restart. Reservations themselves are captured separately, by
/// [`goap_reservations::ReservationService::capture_state`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorStateChunk {
    /// The actor this chunk belongs to.
    pub actor_id: EntityId,
    /// The last recorded loop status.
    pub status: ActorPlanStatus,
    /// Reservation-failure and cooldown bookkeeping.
    pub cooldowns: CooldownSnapshot,
    /// The actor's private jitter/backoff RNG, at its last-used state.
    pub rng: ChaCha8Rng,
}

const NO_PLAN_SLEEP: Duration = Duration::from_millis(20);
const PLAN_EMPTY_SLEEP: Duration = Duration::from_millis(20);
const WAITING_PRECONDITIONS_SLEEP: Duration = Duration::from_millis(15);
const SLEEP_SLICE: Duration = Duration::from_millis(5);
const SCHEDULE_LATE_MINUTES: f64 = 10.0;
const SCHEDULE_LATE_DISTANCE: u64 = 2;

/// Tunables for one [`ActorHost`]'s loop.
#[derive(Debug, Clone, Copy)]
pub struct ActorHostConfig {
    /// How often the loop is throttled to run, in Hz.
    pub loop_frequency_hz: f64,
    /// Seed for this actor's private jitter/backoff RNG.
    pub rng_seed: u64,
}

#[derive(Default)]
struct LoopState {
    current_goal_id: Option<String>,
    goal_start: Option<Instant>,
    last_plan_summary: Option<String>,
    active_schedule_block: Option<String>,
    active_schedule_target: Option<EntityId>,
    late_logged_this_block: bool,
    current_step: usize,
}

/// Drives one actor's snapshot → plan → step-select → reserve → execute →
/// commit → dispatch → release loop on its own background thread.
pub struct ActorHost {
    self_id: EntityId,
    world: Arc<WorldStore>,
    planner: Arc<dyn Planner>,
    executors: Arc<dyn ExecutorRegistry>,
    reservations: Arc<ReservationService>,
    effects: Arc<EffectDispatcher>,
    schedule: Option<Arc<dyn ScheduleService>>,
    per_actor_log: Arc<PerActorLogger>,
    config: ActorHostConfig,
    stop_flag: AtomicBool,
    status: Mutex<ActorPlanStatus>,
    cooldowns: CooldownState,
    rng: Mutex<ChaCha8Rng>,
    thread: Mutex<Option<JoinHandle<Result<(), ActorError>>>>,
}

impl ActorHost {
    /// Build a host for `self_id`, wired to its collaborators. Does not
    /// start the loop — call [`ActorHost::start`] for that.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        self_id: EntityId,
        world: Arc<WorldStore>,
        planner: Arc<dyn Planner>,
        executors: Arc<dyn ExecutorRegistry>,
        reservations: Arc<ReservationService>,
        effects: Arc<EffectDispatcher>,
        schedule: Option<Arc<dyn ScheduleService>>,
        per_actor_log: Arc<PerActorLogger>,
        config: ActorHostConfig,
    ) -> Self {
        let status = Mutex::new(ActorPlanStatus::initializing(self_id.clone()));
        Self {
            self_id,
            world,
            planner,
            executors,
            reservations,
            effects,
            schedule,
            per_actor_log,
            config,
            stop_flag: AtomicBool::new(false),
            status,
            cooldowns: CooldownState::new(),
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(config.rng_seed)),
            thread: Mutex::new(None),
        }
    }

    /// A point-in-time view of this actor's loop state.
    #[must_use]
    pub fn status(&self) -> ActorPlanStatus {
        self.status.lock().clone()
    }

    /// Snapshot this actor's persisted state: loop status, cooldown/backoff
    /// bookkeeping, and jitter RNG. Call before the host's thread starts, or
    /// between `request_stop`/`finish_stop` and a fresh `start`.
    #[must_use]
    pub fn capture_state(&self) -> ActorStateChunk {
        ActorStateChunk {
            actor_id: self.self_id.clone(),
            status: self.status.lock().clone(),
            cooldowns: self.cooldowns.capture_state(),
            rng: self.rng.lock().clone(),
        }
    }

    /// Restore a previously captured chunk. Call before [`ActorHost::start`].
    pub fn apply_state(&self, chunk: ActorStateChunk) {
        *self.status.lock() = chunk.status;
        self.cooldowns.apply_state(chunk.cooldowns);
        *self.rng.lock() = chunk.rng;
    }

    /// Start the background loop thread. A no-op if already started.
    pub fn start(self: &Arc<Self>) {
        let mut slot = self.thread.lock();
        if slot.is_some() {
            return;
        }
        let host = Arc::clone(self);
        *slot = Some(thread::spawn(move || host.run()));
    }

    /// Cooperatively signal the loop to stop. Returns immediately; call
    /// [`ActorHost::finish_stop`] to wait for the thread to exit.
    pub fn request_stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    /// Signal stop and join the loop thread, propagating a fatal error if
    /// the thread panicked or its loop returned one.
    pub fn finish_stop(&self) -> Result<(), ActorError> {
        self.request_stop();
        let handle = self.thread.lock().take();
        let Some(handle) = handle else {
            return Ok(());
        };
        handle.join().map_err(|_| ActorError::ThreadPanicked(self.self_id.clone()))?
    }

    fn run(&self) -> Result<(), ActorError> {
        let mut loop_state = LoopState::default();
        let loop_interval = Duration::from_secs_f64(1.0 / self.config.loop_frequency_hz.max(0.001));

        loop {
            if self.stop_flag.load(Ordering::SeqCst) {
                break;
            }
            let iteration_start = Instant::now();

            let snap = self.world.snapshot();
            let world_time_str = format_world_time(snap.world_time());

            self.evaluate_schedule(&snap, &mut loop_state, &world_time_str);
            if self.stop_flag.load(Ordering::SeqCst) {
                break;
            }

            let Some(plan) = self.planner.plan(&self.self_id, &snap) else {
                self.note_goal_change(&mut loop_state, None, &world_time_str);
                self.set_status(&loop_state, ActorLoopState::NoPlan, None);
                self.sleep_interruptible(NO_PLAN_SLEEP);
                self.throttle(iteration_start, loop_interval);
                continue;
            };
            self.note_goal_change(&mut loop_state, Some(plan.goal_id.clone()), &world_time_str);

            if plan.steps.is_empty() {
                self.set_status(&loop_state, ActorLoopState::PlanEmpty, Some(&plan));
                self.sleep_interruptible(PLAN_EMPTY_SLEEP);
                self.throttle(iteration_start, loop_interval);
                continue;
            }

            let summary = plan_summary(&plan);
            if loop_state.last_plan_summary.as_deref() != Some(summary.as_str()) {
                self.per_actor_log.log(
                    "PLAN",
                    &[Field::new("world_time", &world_time_str), Field::new("summary", &summary)],
                );
                loop_state.last_plan_summary = Some(summary);
            }

            let Some((step_index, step)) = select_ready_step(&plan, &snap) else {
                self.set_status(&loop_state, ActorLoopState::WaitingPreconditions, Some(&plan));
                self.sleep_interruptible(WAITING_PRECONDITIONS_SLEEP);
                self.throttle(iteration_start, loop_interval);
                continue;
            };
            loop_state.current_step = step_index;

            let dur_sec = step.duration_seconds.max(0.0);
            let key = step_key(step);

            while let Some(until) = self.cooldowns.gate_until(&key, Instant::now()) {
                self.set_status(&loop_state, ActorLoopState::Cooldown, Some(&plan));
                self.sleep_until_interruptible(until);
                if self.stop_flag.load(Ordering::SeqCst) {
                    break;
                }
            }
            if self.stop_flag.load(Ordering::SeqCst) {
                break;
            }

            let plan_id = PlanId::new();
            if !self.reservations.try_acquire_all(&self.self_id, plan_id, &step.reservations) {
                self.set_status(&loop_state, ActorLoopState::ReservationFailed, Some(&plan));
                let jitter = {
                    let mut rng = self.rng.lock();
                    self.cooldowns.record_reservation_failure(&key, Instant::now(), &mut rng)
                };
                self.sleep_interruptible(jitter);
                self.throttle(iteration_start, loop_interval);
                continue;
            }
            self.cooldowns.clear_reservation_failure(&key);

            if dur_sec > 0.0 {
                self.set_status(&loop_state, ActorLoopState::DurationWait, Some(&plan));
                self.sleep_interruptible(Duration::from_secs_f64(dur_sec));
            }

            self.set_status(&loop_state, ActorLoopState::ExecutingStep, Some(&plan));
            let exec_snapshot = self.world.snapshot();
            let outcome = self
                .executors
                .executor_for(&step.name)
                .map(|executor| executor.execute(&self.self_id, step, &exec_snapshot));

            match outcome {
                Some(outcome) if outcome.progress == ExecutionProgress::Completed => {
                    if let Some(batch) = &outcome.batch {
                        self.commit_and_dispatch(batch, step, dur_sec, &world_time_str, exec_snapshot.world_time());
                    }
                }
                Some(_) => {}
                None => {
                    self.per_actor_log.log(
                        "ERROR",
                        &[
                            Field::new("world_time", &world_time_str),
                            Field::new("message", format!("no executor registered for step {}", step.name)),
                        ],
                    );
                }
            }

            let held: Vec<EntityId> = step.reservations.iter().map(|r| r.thing.clone()).collect();
            self.reservations.release_all(&self.self_id, plan_id, &held);
            self.per_actor_log
                .log("END", &[Field::new("world_time", &world_time_str), Field::new("step", &step.name)]);

            self.throttle(iteration_start, loop_interval);
        }

        self.note_goal_change(&mut loop_state, None, "shutdown");
        self.set_status(&loop_state, ActorLoopState::Stopped, None);
        Ok(())
    }

    fn commit_and_dispatch(
        &self,
        batch: &EffectBatch,
        step: &Step,
        dur_sec: f64,
        world_time_str: &str,
        world_time: &WorldTime,
    ) {
        match self.world.try_commit(batch) {
            CommitResult::Committed => {
                self.per_actor_log.log(
                    "COMMIT",
                    &[Field::new("world_time", world_time_str), Field::new("result", "success"), Field::new("step", &step.name)],
                );
                self.effects.dispatch(batch, world_time);
                self.register_plan_cooldowns(batch, step, dur_sec);
            }
            CommitResult::Conflict => {
                self.per_actor_log.log(
                    "COMMIT",
                    &[Field::new("world_time", world_time_str), Field::new("result", "conflict"), Field::new("step", &step.name)],
                );
            }
        }
    }

    fn register_plan_cooldowns(&self, batch: &EffectBatch, step: &Step, dur_sec: f64) {
        for request in &batch.plan_cooldowns {
            let Some(scope) = request.scope.clone().or_else(|| step.target.clone()) else {
                continue;
            };
            let seconds = request.seconds.max(if request.use_step_duration { dur_sec } else { 0.0 });
            if seconds > 0.0 {
                let key = format!("{}|{}", step.name, scope);
                self.cooldowns.set_plan_cooldown(&key, Instant::now() + Duration::from_secs_f64(seconds));
            }
        }
    }

    fn evaluate_schedule(&self, snap: &Snapshot, loop_state: &mut LoopState, world_time_str: &str) {
        let Some(schedule) = &self.schedule else {
            return;
        };
        let evaluation = schedule.evaluate(&self.self_id, snap);
        let previous_block = loop_state.active_schedule_block.clone();
        let new_block = evaluation.as_ref().and_then(|e| e.active_block.clone());

        if previous_block.is_some() && previous_block != new_block {
            self.per_actor_log.log(
                "SCHEDULE",
                &[
                    Field::new("world_time", world_time_str),
                    Field::new("event", "end"),
                    Field::new("block", previous_block.clone().unwrap_or_default()),
                ],
            );
            if let Some(target) = &loop_state.active_schedule_target {
                self.mirror_open_flag(target, false);
            }
            loop_state.late_logged_this_block = false;
        }
        if new_block.is_some() && new_block != previous_block {
            self.per_actor_log.log(
                "SCHEDULE",
                &[
                    Field::new("world_time", world_time_str),
                    Field::new("event", "start"),
                    Field::new("block", new_block.clone().unwrap_or_default()),
                ],
            );
            if let Some(target) = evaluation.as_ref().and_then(|e| e.target.as_ref()) {
                self.mirror_open_flag(target, true);
            }
        }

        if let Some(eval) = &evaluation {
            if !loop_state.late_logged_this_block && eval.minutes_into_block > SCHEDULE_LATE_MINUTES {
                if let Some(target) = &eval.target {
                    if snap.distance(&self.self_id, target) > SCHEDULE_LATE_DISTANCE {
                        self.per_actor_log.log(
                            "SCHEDULE",
                            &[
                                Field::new("world_time", world_time_str),
                                Field::new("event", "late"),
                                Field::new("block", eval.active_block.clone().unwrap_or_default()),
                            ],
                        );
                        loop_state.late_logged_this_block = true;
                    }
                }
            }
        }

        loop_state.active_schedule_target = evaluation.as_ref().and_then(|e| e.target.clone());
        loop_state.active_schedule_block = new_block;
    }

    fn mirror_open_flag(&self, target: &EntityId, open: bool) {
        let mut batch = EffectBatch::empty();
        batch.writes.push(WriteEntry {
            thing: target.clone(),
            attribute: OPEN_ATTRIBUTE.to_owned(),
            value: if open { 1.0 } else { 0.0 },
        });
        let _: CommitResult = self.world.try_commit(&batch);
    }

    fn note_goal_change(&self, loop_state: &mut LoopState, new_goal: Option<String>, world_time_str: &str) {
        if loop_state.current_goal_id == new_goal {
            return;
        }
        if let (Some(old_goal), Some(start)) = (loop_state.current_goal_id.take(), loop_state.goal_start.take()) {
            let duration = start.elapsed().as_secs_f64();
            self.per_actor_log.log(
                "GOAL",
                &[
                    Field::new("world_time", world_time_str),
                    Field::new("goal", old_goal),
                    Field::new("duration_seconds", duration),
                ],
            );
        }
        if new_goal.is_some() {
            loop_state.goal_start = Some(Instant::now());
        }
        loop_state.current_goal_id = new_goal;
    }

    fn set_status(&self, loop_state: &LoopState, state: ActorLoopState, plan: Option<&Plan>) {
        let mut status = self.status.lock();
        status.state = state;
        status.goal_id.clone_from(&loop_state.current_goal_id);
        status.current_step = loop_state.current_step;
        if let Some(plan) = plan {
            status.plan_summary = Some(plan_summary(plan));
            status.steps = plan.steps.iter().map(|s| s.name.clone()).collect();
        }
        status.updated_utc = Utc::now();
    }

    fn throttle(&self, iteration_start: Instant, loop_interval: Duration) {
        let elapsed = iteration_start.elapsed();
        if elapsed < loop_interval {
            self.sleep_interruptible(loop_interval - elapsed);
        }
    }

    fn sleep_interruptible(&self, duration: Duration) {
        self.sleep_until_interruptible(Instant::now() + duration);
    }

    fn sleep_until_interruptible(&self, until: Instant) {
        loop {
            if self.stop_flag.load(Ordering::SeqCst) {
                return;
            }
            let now = Instant::now();
            if now >= until {
                return;
            }
            thread::sleep((until - now).min(SLEEP_SLICE));
        }
    }
}

fn plan_summary(plan: &Plan) -> String {
    let mut parts = vec![plan.goal_id.clone()];
    for step in &plan.steps {
        let mut part = step.name.clone();
        if let Some(target) = &step.target {
            part.push_str("->");
            part.push_str(target.as_str());
        }
        parts.push(part);
    }
    parts.join("|")
}

fn select_ready_step<'a>(plan: &'a Plan, snap: &Snapshot) -> Option<(usize, &'a Step)> {
    plan.steps
        .iter()
        .enumerate()
        .find(|(_, step)| step.target.as_ref().is_none_or(|target| snap.get_thing(target).is_some()))
}

fn step_key(step: &Step) -> String {
    format!("{}|{}", step.name, step.target.as_ref().map(EntityId::as_str).unwrap_or(""))
}

fn format_world_time(time: &WorldTime) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let hour = (time.time_of_day * 24.0) as u32;
    format!("y{}-m{}-d{} {hour:02}:00 {}", time.year, time.month, time.day_of_month, time.season_name)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use goap_clock::{Calendar, SimClock};
    use goap_effects::{DomainRegistry, EffectDispatcher};
    use goap_logging::{PerActorLogger, WorldLogger};
    use goap_plan::{Executor, ExecutionOutcome, ExecutionProgress};
    use goap_reservations::ReservationService;
    use goap_store::{WorldStore, WorldStoreConfig};
    use goap_types::EntityId;

    use super::*;

    struct FixedPlanner {
        plan: Plan,
    }

    impl Planner for FixedPlanner {
        fn plan(&self, _actor: &EntityId, _snapshot: &Snapshot) -> Option<Plan> {
            Some(self.plan.clone())
        }
    }

    struct CountingExecutor {
        calls: AtomicUsize,
    }

    impl Executor for CountingExecutor {
        fn execute(&self, _actor: &EntityId, _step: &Step, _snapshot: &Snapshot) -> ExecutionOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ExecutionOutcome { progress: ExecutionProgress::Completed, batch: None }
        }
    }

    struct SingleExecutorRegistry {
        executor: CountingExecutor,
    }

    impl ExecutorRegistry for SingleExecutorRegistry {
        fn executor_for(&self, _step_name: &str) -> Option<&dyn goap_plan::Executor> {
            Some(&self.executor)
        }
    }

    fn test_world() -> Result<Arc<WorldStore>, String> {
        let clock = Arc::new(SimClock::new(0.0, Calendar::default()));
        let config = WorldStoreConfig { width: 4, height: 4, shard_count: 1, walkable_override: None };
        WorldStore::new(config, clock).map(Arc::new).map_err(|e| e.to_string())
    }

    fn test_effects(dir: &std::path::Path) -> Result<Arc<EffectDispatcher>, String> {
        let world_log = WorldLogger::open(dir.join("world.log"), 1_000_000).map_err(|e| e.to_string())?;
        Ok(Arc::new(EffectDispatcher::new(DomainRegistry::default(), Arc::new(world_log))))
    }

    fn idle_step() -> Step {
        Step {
            name: "idle".to_owned(),
            target: None,
            duration_seconds: 0.0,
            reservations: Vec::new(),
            plan_cooldown: None,
        }
    }

    #[test]
    fn runs_to_completion_and_reports_stopped_status() -> Result<(), String> {
        let dir = tempfile::tempdir().map_err(|e| e.to_string())?;
        let world = test_world()?;
        let planner: Arc<dyn Planner> = Arc::new(FixedPlanner {
            plan: Plan { id: PlanId::new(), goal_id: "idle_goal".to_owned(), summary: "idle".to_owned(), steps: vec![idle_step()] },
        });
        let executors: Arc<dyn ExecutorRegistry> =
            Arc::new(SingleExecutorRegistry { executor: CountingExecutor { calls: AtomicUsize::new(0) } });
        let reservations = Arc::new(ReservationService::new());
        let effects = test_effects(dir.path())?;
        let per_actor_log =
            Arc::new(PerActorLogger::open(dir.path(), "alice", 1_000_000).map_err(|e| e.to_string())?);
        let config = ActorHostConfig { loop_frequency_hz: 100.0, rng_seed: 7 };

        let host = Arc::new(ActorHost::new(
            EntityId::new("alice"),
            world,
            planner,
            executors,
            reservations,
            effects,
            None,
            per_actor_log,
            config,
        ));
        host.start();
        thread::sleep(Duration::from_millis(60));
        host.finish_stop().map_err(|e| e.to_string())?;

        let status = host.status();
        assert_eq!(status.state, ActorLoopState::Stopped);
        Ok(())
    }

    #[test]
    fn select_ready_step_skips_steps_whose_target_vanished() -> Result<(), String> {
        let world = test_world()?;
        let snap = world.snapshot();
        let vanished = Step {
            name: "harvest".to_owned(),
            target: Some(EntityId::new("missing_plot")),
            duration_seconds: 0.0,
            reservations: Vec::new(),
            plan_cooldown: None,
        };
        let fallback = idle_step();
        let plan = Plan {
            id: PlanId::new(),
            goal_id: "g".to_owned(),
            summary: String::new(),
            steps: vec![vanished, fallback],
        };
        let ready = select_ready_step(&plan, &snap);
        assert_eq!(ready.map(|(index, _)| index), Some(1));
        Ok(())
    }

    #[test]
    fn capture_and_apply_state_round_trips_goal_id() -> Result<(), String> {
        let dir = tempfile::tempdir().map_err(|e| e.to_string())?;
        let world = test_world()?;
        let planner: Arc<dyn Planner> = Arc::new(FixedPlanner {
            plan: Plan { id: PlanId::new(), goal_id: "idle_goal".to_owned(), summary: "idle".to_owned(), steps: vec![idle_step()] },
        });
        let executors: Arc<dyn ExecutorRegistry> =
            Arc::new(SingleExecutorRegistry { executor: CountingExecutor { calls: AtomicUsize::new(0) } });
        let reservations = Arc::new(ReservationService::new());
        let effects = test_effects(dir.path())?;
        let per_actor_log =
            Arc::new(PerActorLogger::open(dir.path(), "bob", 1_000_000).map_err(|e| e.to_string())?);
        let config = ActorHostConfig { loop_frequency_hz: 100.0, rng_seed: 11 };
        let host = ActorHost::new(
            EntityId::new("bob"),
            world,
            planner,
            executors,
            reservations,
            effects,
            None,
            per_actor_log,
            config,
        );

        let chunk = host.capture_state();
        assert_eq!(chunk.actor_id, EntityId::new("bob"));

        let restored = host.capture_state();
        host.apply_state(chunk);
        assert_eq!(host.status().actor_id, restored.actor_id);
        Ok(())
    }

    #[test]
    fn step_key_combines_name_and_target() {
        let with_target =
            Step { name: "harvest".to_owned(), target: Some(EntityId::new("plot_1")), duration_seconds: 0.0, reservations: Vec::new(), plan_cooldown: None };
        assert_eq!(step_key(&with_target), "harvest|plot_1");
        assert_eq!(step_key(&idle_step()), "idle|");
    }

    #[test]
    fn plan_summary_joins_goal_and_step_targets() {
        let plan = Plan {
            id: PlanId::new(),
            goal_id: "eat".to_owned(),
            summary: String::new(),
            steps: vec![Step {
                name: "walk_to".to_owned(),
                target: Some(EntityId::new("kitchen")),
                duration_seconds: 1.0,
                reservations: Vec::new(),
                plan_cooldown: None,
            }],
        };
        assert_eq!(plan_summary(&plan), "eat|walk_to->kitchen");
    }
}
