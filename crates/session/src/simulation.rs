use crate::error::SessionError;
use glam::Vec2;
use gridworld_author::{DragOutcome, drag};
use gridworld_common::{Cell, EntityId, ObjectKind, RobotCommand, SimConfig};
use gridworld_input::{Action, PadButton};
use gridworld_kernel::{
    Dispatcher, OccupancyGrid, PlacementError, Registration, RobotState, TickReport, World,
    WorldObject, run_tick,
};
use gridworld_timeline::{CaptureHandle, CaptureScheduler, ResumeRequest, ResumeToken, TemporalRecord};
use std::collections::BTreeMap;
use std::time::Duration;

/// What a handled [`Action`] produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Handled {
    Done,
    /// `None` when the grid had no free cell.
    Spawned(Option<EntityId>),
    /// False when the target robot was unknown or nothing was selected.
    Dispatched(bool),
    Dragged(DragOutcome),
    Resume(ResumeRequest),
    /// Snapshots discarded by a confirmed resume.
    Truncated(usize),
}

/// A running grid-world simulation with its temporal record.
pub struct Simulation {
    config: SimConfig,
    world: World,
    dispatcher: Dispatcher,
    registrations: BTreeMap<EntityId, Registration>,
    record: TemporalRecord,
    scheduler: CaptureScheduler,
    pending_capture: Option<CaptureHandle>,
    clock: Duration,
    selected: Option<EntityId>,
    seen_revision: u64,
}

impl Simulation {
    /// Start an empty world and record it as snapshot 0.
    pub fn new(config: SimConfig) -> Result<Self, SessionError> {
        let world = World::new();
        let mut record = TemporalRecord::new();
        record.capture(&world, Duration::ZERO)?;
        tracing::info!(?config, "simulation started");
        Ok(Self {
            scheduler: CaptureScheduler::new(config.capture_debounce()),
            pending_capture: None,
            config,
            seen_revision: world.revision(),
            world,
            dispatcher: Dispatcher::new(),
            registrations: BTreeMap::new(),
            record,
            clock: Duration::ZERO,
            selected: None,
        })
    }

    // --- reads ---

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The live object store, for rendering.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The full temporal record, for inspection.
    pub fn record(&self) -> &TemporalRecord {
        &self.record
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn clock(&self) -> Duration {
        self.clock
    }

    pub fn is_paused(&self) -> bool {
        self.record.is_paused()
    }

    pub fn selected(&self) -> Option<EntityId> {
        self.selected
    }

    /// Idle or executing, for a registered robot.
    pub fn robot_state(&self, id: EntityId) -> Option<RobotState> {
        self.dispatcher.queue(id).map(|q| q.state(self.clock))
    }

    pub fn queue_len(&self, id: EntityId) -> usize {
        self.dispatcher.queue(id).map_or(0, |q| q.len())
    }

    pub fn capture_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    // --- world edits ---

    /// Spawn at the first free cell in raster order. `Ok(None)` if the grid is full.
    pub fn spawn(&mut self, kind: ObjectKind) -> Result<Option<EntityId>, SessionError> {
        self.ensure_live()?;
        let grid = OccupancyGrid::from_world(&self.world);
        let Some(cell) = grid.first_free(self.config.spawn_spacing) else {
            tracing::debug!(%kind, "spawn ignored: grid is full");
            return Ok(None);
        };
        self.insert(kind, cell).map(Some)
    }

    /// Spawn at a specific empty in-bounds cell.
    pub fn spawn_at(&mut self, kind: ObjectKind, cell: Cell) -> Result<EntityId, SessionError> {
        self.ensure_live()?;
        if !cell.in_bounds() {
            return Err(PlacementError::OutOfBounds(cell).into());
        }
        if let Some(occupant) = OccupancyGrid::from_world(&self.world).contents(cell) {
            return Err(PlacementError::Occupied {
                cell,
                by: occupant.blocker(),
            }
            .into());
        }
        self.insert(kind, cell)
    }

    /// Queue a command for a robot. `Ok(false)` if the robot is not registered.
    pub fn dispatch(&mut self, id: EntityId, command: RobotCommand) -> Result<bool, SessionError> {
        self.ensure_live()?;
        Ok(self.dispatcher.dispatch(id, command))
    }

    /// Choose which robot receives pad presses.
    pub fn select_robot(&mut self, id: EntityId) -> Result<(), SessionError> {
        let obj = self.world.get(id).ok_or(SessionError::UnknownObject(id))?;
        if !obj.is_robot() {
            return Err(SessionError::NotARobot { id, kind: obj.kind });
        }
        self.selected = Some(id);
        Ok(())
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    /// Send a pad button's command to the selected robot.
    pub fn press(&mut self, button: PadButton) -> Result<bool, SessionError> {
        self.ensure_live()?;
        match self.selected {
            Some(id) => self.dispatch(id, button.command()),
            None => {
                tracing::debug!(%button, "pad press ignored: no robot selected");
                Ok(false)
            }
        }
    }

    /// Drop a box or shelf at a continuous ground point.
    pub fn drag(&mut self, id: EntityId, to: Vec2) -> Result<DragOutcome, SessionError> {
        self.ensure_live()?;
        let outcome = drag(&mut self.world, id, to, &self.config)?;
        self.settle();
        Ok(outcome)
    }

    /// Advance the clock by `dt`, run one command per idle robot and service
    /// the capture debounce. Paused ticks only advance the clock.
    pub fn tick(&mut self, dt: Duration) -> Result<Vec<TickReport>, SessionError> {
        self.clock += dt;
        let _span = tracing::info_span!("tick", clock_ms = self.clock.as_millis() as u64).entered();
        if self.record.is_paused() {
            return Ok(Vec::new());
        }
        let reports = run_tick(&mut self.world, &mut self.dispatcher, self.clock, &self.config);
        self.settle();
        if self.scheduler.poll(self.clock) {
            self.pending_capture = None;
            self.record.capture(&self.world, self.clock)?;
        }
        Ok(reports)
    }

    /// Tick in steps of `step` until at least `total` has elapsed.
    pub fn run_for(&mut self, total: Duration, step: Duration) -> Result<usize, SessionError> {
        let step = step.max(Duration::from_millis(1));
        let end = self.clock + total;
        let mut executed = 0;
        while self.clock < end {
            executed += self.tick(step.min(end - self.clock))?.len();
        }
        Ok(executed)
    }

    // --- timeline ---

    /// Stop capturing. A capture still inside its debounce window is taken
    /// first, so the tail matches the live world.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        if self.record.is_paused() {
            return Ok(());
        }
        self.settle();
        let flush = self
            .pending_capture
            .take()
            .is_some_and(|handle| self.scheduler.cancel(handle));
        if flush {
            self.record.capture(&self.world, self.clock)?;
        }
        self.record.pause();
        Ok(())
    }

    /// Restore snapshot `index` into the live world.
    pub fn scrub(&mut self, index: usize) -> Result<(), SessionError> {
        self.record.scrub(index, &mut self.world)?;
        self.drain_events();
        if let Some(handle) = self.pending_capture.take() {
            self.scheduler.cancel(handle);
        }
        self.seen_revision = self.world.revision();
        self.resync_robots();
        Ok(())
    }

    /// Ask to resume. Away from the tail this needs [`Self::confirm_resume`].
    pub fn request_resume(&mut self) -> Result<ResumeRequest, SessionError> {
        let request = self.record.request_resume()?;
        if let ResumeRequest::NeedsConfirmation(token) = request {
            tracing::info!(
                discards = token.discards(),
                "resume would discard later snapshots; awaiting confirmation"
            );
        }
        Ok(request)
    }

    /// Truncate the record after the cursor and resume. Returns the number discarded.
    pub fn confirm_resume(&mut self, token: ResumeToken) -> Result<usize, SessionError> {
        Ok(self.record.confirm_resume(token)?)
    }

    pub fn cancel_resume(&mut self, token: ResumeToken) -> Result<(), SessionError> {
        Ok(self.record.cancel_resume(token)?)
    }

    /// Apply one control-surface action.
    pub fn handle(&mut self, action: Action) -> Result<Handled, SessionError> {
        if action.edits_world() {
            self.ensure_live()?;
        }
        match action {
            Action::Spawn(kind) => self.spawn(kind).map(Handled::Spawned),
            Action::SpawnAt(kind, cell) => self.spawn_at(kind, cell).map(|id| Handled::Spawned(Some(id))),
            Action::Select(id) => self.select_robot(id).map(|()| Handled::Done),
            Action::Deselect => {
                self.deselect();
                Ok(Handled::Done)
            }
            Action::Press(button) => self.press(button).map(Handled::Dispatched),
            Action::Dispatch(id, command) => self.dispatch(id, command).map(Handled::Dispatched),
            Action::Drag { id, to } => self.drag(id, to).map(Handled::Dragged),
            Action::Pause => self.pause().map(|()| Handled::Done),
            Action::Resume => self.request_resume().map(Handled::Resume),
            Action::ConfirmResume => {
                let token = self.pending_resume()?;
                self.confirm_resume(token).map(Handled::Truncated)
            }
            Action::CancelResume => {
                let token = self.pending_resume()?;
                self.cancel_resume(token).map(|()| Handled::Done)
            }
            Action::Scrub(index) => self.scrub(index).map(|()| Handled::Done),
        }
    }

    fn pending_resume(&self) -> Result<ResumeToken, SessionError> {
        self.record
            .pending_resume()
            .ok_or(SessionError::NoPendingResume)
    }

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.record.is_paused() {
            return Err(SessionError::Paused);
        }
        Ok(())
    }

    fn insert(&mut self, kind: ObjectKind, cell: Cell) -> Result<EntityId, SessionError> {
        let id = self.world.insert(WorldObject::new(kind, cell))?;
        if kind == ObjectKind::Robot {
            self.registrations.insert(id, self.dispatcher.register(id));
        }
        tracing::info!(id = %id.short(), %kind, %cell, "spawned");
        self.settle();
        Ok(id)
    }

    /// Schedule a capture if the store changed since the last look.
    fn settle(&mut self) {
        self.drain_events();
        let revision = self.world.revision();
        if revision != self.seen_revision {
            self.seen_revision = revision;
            self.pending_capture = Some(self.scheduler.schedule(self.clock));
        }
    }

    fn drain_events(&mut self) {
        for event in self.world.drain_events() {
            tracing::trace!(?event, "world event");
        }
    }

    /// Match dispatcher registrations to the robots in the store and clear every queue.
    fn resync_robots(&mut self) {
        let present: Vec<EntityId> = self.world.robots().map(|r| r.id).collect();
        let stale: Vec<EntityId> = self
            .registrations
            .keys()
            .filter(|id| !present.contains(id))
            .copied()
            .collect();
        for id in stale {
            if let Some(registration) = self.registrations.remove(&id) {
                self.dispatcher.deregister(registration);
            }
        }
        for id in present {
            if !self.registrations.contains_key(&id) {
                self.registrations.insert(id, self.dispatcher.register(id));
            }
        }
        self.dispatcher.reset_queues();
        if self.selected.is_some_and(|id| self.world.get(id).is_none()) {
            self.selected = None;
        }
        tracing::debug!(robots = self.registrations.len(), "robot registrations resynced");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridworld_common::Heading;
    use gridworld_kernel::{Executed, Rejection, validate};

    const FRAME: Duration = Duration::from_millis(16);

    fn sim() -> Simulation {
        Simulation::new(SimConfig::default()).unwrap()
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn starts_with_one_empty_snapshot() {
        let s = sim();
        assert_eq!(s.record().len(), 1);
        assert_eq!(s.record().time_state(), 0);
        assert_eq!(s.record().get(0).unwrap().object_count(), 0);
        assert!(!s.is_paused());
    }

    #[test]
    fn spawn_follows_raster_order() {
        let mut s = sim();
        let a = s.spawn(ObjectKind::Robot).unwrap().unwrap();
        let b = s.spawn(ObjectKind::Box).unwrap().unwrap();
        let c = s.spawn(ObjectKind::Shelf).unwrap().unwrap();
        assert_eq!(s.world().get(a).unwrap().cell, Cell::new(-10, -10));
        assert_eq!(s.world().get(b).unwrap().cell, Cell::new(-10, -9));
        assert_eq!(s.world().get(c).unwrap().cell, Cell::new(-10, -8));
        assert!(s.dispatcher().is_registered(a));
        assert!(!s.dispatcher().is_registered(b));
    }

    #[test]
    fn spawn_on_full_grid_is_silent() {
        let mut s = sim();
        for _ in 0..400 {
            assert!(s.spawn(ObjectKind::Box).unwrap().is_some());
        }
        assert_eq!(s.spawn(ObjectKind::Robot).unwrap(), None);
        assert_eq!(s.world().object_count(), 400);
    }

    #[test]
    fn spawn_at_checks_bounds_and_occupancy() {
        let mut s = sim();
        s.spawn_at(ObjectKind::Shelf, Cell::new(0, 0)).unwrap();
        assert_eq!(
            s.spawn_at(ObjectKind::Box, Cell::new(0, 0)),
            Err(SessionError::Spawn(PlacementError::Occupied {
                cell: Cell::new(0, 0),
                by: ObjectKind::Shelf
            }))
        );
        assert_eq!(
            s.spawn_at(ObjectKind::Box, Cell::new(0, 10)),
            Err(SessionError::Spawn(PlacementError::OutOfBounds(Cell::new(0, 10))))
        );
    }

    #[test]
    fn forward_moves_robot_and_captures_once() {
        let mut s = sim();
        let robot = s.spawn_at(ObjectKind::Robot, Cell::new(0, 0)).unwrap();
        assert_eq!(s.world().get(robot).unwrap().heading, Heading::North);
        assert!(s.dispatch(robot, RobotCommand::Forward).unwrap());

        let reports = s.tick(FRAME).unwrap();
        assert_eq!(reports.len(), 1);
        assert!(matches!(reports[0].outcome, Ok(Executed::Moved { .. })));
        assert_eq!(s.world().get(robot).unwrap().cell, Cell::new(0, 1));
        assert_eq!(s.queue_len(robot), 0);
        assert!(matches!(s.robot_state(robot), Some(RobotState::Executing { .. })));

        s.run_for(ms(300), FRAME).unwrap();
        assert_eq!(s.robot_state(robot), Some(RobotState::Idle));
        assert_eq!(s.record().len(), 2);
        let tail = s.record().get(1).unwrap();
        assert_eq!(tail.objects()[&robot].cell, Cell::new(0, 1));
    }

    #[test]
    fn burst_of_edits_coalesces_into_one_snapshot() {
        let mut s = sim();
        for x in 0..5 {
            s.spawn_at(ObjectKind::Box, Cell::new(x, 0)).unwrap();
            s.tick(ms(20)).unwrap();
        }
        assert_eq!(s.record().len(), 1);
        s.run_for(ms(200), FRAME).unwrap();
        assert_eq!(s.record().len(), 2);
        assert_eq!(s.record().get(1).unwrap().object_count(), 5);
    }

    #[test]
    fn rotate_left_keeps_position_and_locks() {
        let mut s = sim();
        let robot = s.spawn_at(ObjectKind::Robot, Cell::new(0, 0)).unwrap();
        s.dispatch(robot, RobotCommand::RotateLeft).unwrap();
        s.dispatch(robot, RobotCommand::Forward).unwrap();
        s.tick(FRAME).unwrap();
        let obj = s.world().get(robot).unwrap();
        assert_eq!(obj.heading, Heading::West);
        assert_eq!(obj.cell, Cell::new(0, 0));

        // Forward waits out the lock.
        s.run_for(ms(150), FRAME).unwrap();
        assert_eq!(s.queue_len(robot), 1);
        s.run_for(ms(100), FRAME).unwrap();
        assert_eq!(s.queue_len(robot), 0);
        assert_eq!(s.world().get(robot).unwrap().cell, Cell::new(-1, 0));
    }

    #[test]
    fn blocked_move_is_discarded() {
        let mut s = sim();
        let robot = s.spawn_at(ObjectKind::Robot, Cell::new(0, 0)).unwrap();
        s.spawn_at(ObjectKind::Shelf, Cell::new(0, 1)).unwrap();
        s.dispatch(robot, RobotCommand::Forward).unwrap();
        let reports = s.tick(FRAME).unwrap();
        assert_eq!(reports[0].outcome, Err(Rejection::Occupied(Cell::new(0, 1))));
        assert_eq!(s.world().get(robot).unwrap().cell, Cell::new(0, 0));
        assert_eq!(s.queue_len(robot), 0);
    }

    #[test]
    fn grab_and_place_onto_shelf_through_pad() {
        let mut s = sim();
        let robot = s.spawn_at(ObjectKind::Robot, Cell::new(0, 0)).unwrap();
        let item = s.spawn_at(ObjectKind::Box, Cell::new(0, 1)).unwrap();
        let shelf = s.spawn_at(ObjectKind::Shelf, Cell::new(-1, 0)).unwrap();
        s.select_robot(robot).unwrap();

        for button in [PadButton::A, PadButton::Left, PadButton::B] {
            assert!(s.press(button).unwrap());
        }
        s.run_for(ms(500), FRAME).unwrap();

        assert!(s.world().get(shelf).unwrap().has_box);
        let placed = s.world().get(item).unwrap();
        assert_eq!(placed.cell, Cell::new(-1, 0));
        assert_eq!(placed.elevation, s.config().stacked_elevation());
        assert!(s.world().get(robot).unwrap().carried.is_none());
        assert_eq!(validate(s.world()), Ok(()));
    }

    #[test]
    fn press_without_selection_does_nothing() {
        let mut s = sim();
        s.spawn(ObjectKind::Robot).unwrap();
        assert_eq!(s.press(PadButton::Up), Ok(false));
    }

    #[test]
    fn selecting_a_non_robot_fails() {
        let mut s = sim();
        let item = s.spawn(ObjectKind::Box).unwrap().unwrap();
        assert_eq!(
            s.select_robot(item),
            Err(SessionError::NotARobot {
                id: item,
                kind: ObjectKind::Box
            })
        );
        let ghost = EntityId::new();
        assert_eq!(s.select_robot(ghost), Err(SessionError::UnknownObject(ghost)));
    }

    #[test]
    fn edits_refused_while_paused() {
        let mut s = sim();
        let robot = s.spawn(ObjectKind::Robot).unwrap().unwrap();
        s.pause().unwrap();
        assert_eq!(s.spawn(ObjectKind::Box), Err(SessionError::Paused));
        assert_eq!(s.dispatch(robot, RobotCommand::Forward), Err(SessionError::Paused));
        assert_eq!(s.handle(Action::Press(PadButton::Up)), Err(SessionError::Paused));
        assert_eq!(s.tick(FRAME), Ok(Vec::new()));
    }

    #[test]
    fn pause_flushes_pending_capture() {
        let mut s = sim();
        s.spawn(ObjectKind::Shelf).unwrap();
        assert!(s.capture_pending());
        s.pause().unwrap();
        assert!(!s.capture_pending());
        assert_eq!(s.record().len(), 2);
        assert_eq!(s.record().time_state(), 1);
    }

    #[test]
    fn pause_after_fired_capture_adds_nothing() {
        let mut s = sim();
        s.spawn(ObjectKind::Box).unwrap();
        s.run_for(ms(200), FRAME).unwrap();
        assert_eq!(s.record().len(), 2);
        assert!(!s.capture_pending());
        s.pause().unwrap();
        assert_eq!(s.record().len(), 2);
    }

    #[test]
    fn world_events_do_not_accumulate() {
        let mut s = sim();
        let robot = s.spawn_at(ObjectKind::Robot, Cell::new(0, 0)).unwrap();
        for _ in 0..20 {
            s.dispatch(robot, RobotCommand::RotateLeft).unwrap();
        }
        s.run_for(ms(5000), FRAME).unwrap();
        assert_eq!(s.world().get(robot).unwrap().heading, Heading::North);
        assert!(s.world().events().is_empty());
        s.pause().unwrap();
        s.scrub(0).unwrap();
        assert!(s.world().events().is_empty());
    }

    #[test]
    fn scrub_requires_pause() {
        let mut s = sim();
        assert_eq!(
            s.scrub(0),
            Err(SessionError::Timeline(gridworld_timeline::TimelineError::NotPaused))
        );
    }

    #[test]
    fn scrub_then_read_equals_snapshot() {
        let mut s = sim();
        let robot = s.spawn_at(ObjectKind::Robot, Cell::new(0, 0)).unwrap();
        for _ in 0..3 {
            s.dispatch(robot, RobotCommand::Forward).unwrap();
            s.run_for(ms(400), FRAME).unwrap();
        }
        s.pause().unwrap();
        assert_eq!(s.record().len(), 4);
        for i in 0..s.record().len() {
            s.scrub(i).unwrap();
            assert_eq!(s.world().objects(), s.record().get(i).unwrap().objects());
        }
    }

    #[test]
    fn scrub_resyncs_registrations_and_clears_queues() {
        let mut s = sim();
        let first = s.spawn(ObjectKind::Robot).unwrap().unwrap();
        s.run_for(ms(200), FRAME).unwrap();
        let second = s.spawn(ObjectKind::Robot).unwrap().unwrap();
        s.select_robot(second).unwrap();
        s.dispatch(first, RobotCommand::RotateLeft).unwrap();
        s.dispatch(first, RobotCommand::RotateLeft).unwrap();
        s.pause().unwrap();
        assert_eq!(s.record().len(), 3);

        s.scrub(1).unwrap();
        assert!(s.dispatcher().is_registered(first));
        assert!(!s.dispatcher().is_registered(second));
        assert_eq!(s.queue_len(first), 0);
        assert_eq!(s.selected(), None);

        s.scrub(2).unwrap();
        assert!(s.dispatcher().is_registered(second));
    }

    #[test]
    fn resume_away_from_tail_truncates_after_confirmation() {
        let mut s = sim();
        let robot = s.spawn_at(ObjectKind::Robot, Cell::new(0, 0)).unwrap();
        for _ in 0..4 {
            s.dispatch(robot, RobotCommand::Forward).unwrap();
            s.run_for(ms(400), FRAME).unwrap();
        }
        s.pause().unwrap();
        let len = s.record().len();
        assert_eq!(len, 5);

        s.scrub(2).unwrap();
        let ResumeRequest::NeedsConfirmation(token) = s.request_resume().unwrap() else {
            panic!("expected a confirmation request");
        };
        s.cancel_resume(token).unwrap();
        assert_eq!(s.record().len(), len);
        assert!(s.is_paused());

        let ResumeRequest::NeedsConfirmation(token) = s.request_resume().unwrap() else {
            panic!("expected a confirmation request");
        };
        assert_eq!(s.confirm_resume(token), Ok(2));
        assert_eq!(s.record().len(), 3);
        assert!(!s.is_paused());

        // The restored robot keeps working from the restored state.
        s.dispatch(robot, RobotCommand::Forward).unwrap();
        s.run_for(ms(400), FRAME).unwrap();
        assert_eq!(s.world().get(robot).unwrap().cell, Cell::new(0, 3));
        assert_eq!(s.record().len(), 4);
    }

    #[test]
    fn resume_at_tail_is_immediate() {
        let mut s = sim();
        s.pause().unwrap();
        assert_eq!(s.handle(Action::Resume), Ok(Handled::Resume(ResumeRequest::Resumed)));
        assert!(!s.is_paused());
        assert_eq!(
            s.handle(Action::ConfirmResume),
            Err(SessionError::NoPendingResume)
        );
    }

    #[test]
    fn drag_goes_through_stacking_rule() {
        let mut s = sim();
        let item = s.spawn_at(ObjectKind::Box, Cell::new(2, 2)).unwrap();
        let shelf = s.spawn_at(ObjectKind::Shelf, Cell::new(5, 5)).unwrap();
        let out = s
            .handle(Action::Drag {
                id: item,
                to: Vec2::new(4.8, 5.3),
            })
            .unwrap();
        let Handled::Dragged(outcome) = out else {
            panic!("expected a drag outcome");
        };
        assert_eq!(outcome.stacked_with, Some(shelf));
        assert!(s.world().get(shelf).unwrap().has_box);
        assert!(s.capture_pending());
    }
}
