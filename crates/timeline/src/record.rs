use crate::error::TimelineError;
use crate::snapshot::Snapshot;
use gridworld_kernel::World;
use std::time::Duration;

/// A pending destructive resume, awaiting confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeToken {
    id: u64,
    keep: usize,
    discard: usize,
}

impl ResumeToken {
    /// Number of snapshots that survive a confirmed resume.
    pub fn keeps(&self) -> usize {
        self.keep
    }

    /// Number of snapshots a confirmed resume would discard.
    pub fn discards(&self) -> usize {
        self.discard
    }
}

/// Outcome of asking to resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeRequest {
    /// The cursor was at the tail; capture is live again.
    Resumed,
    /// Resuming would discard later snapshots. Confirm or cancel with the token.
    NeedsConfirmation(ResumeToken),
}

/// The ordered, append-only sequence of snapshots plus the time cursor.
#[derive(Debug, Default)]
pub struct TemporalRecord {
    snapshots: Vec<Snapshot>,
    time_state: usize,
    paused: bool,
    pending_resume: Option<ResumeToken>,
    next_token: u64,
}

impl TemporalRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// The cursor, in `[0, len - 1]` once anything has been recorded.
    pub fn time_state(&self) -> usize {
        self.time_state
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn tail_index(&self) -> Option<usize> {
        self.snapshots.len().checked_sub(1)
    }

    /// Read-only access to every recorded snapshot.
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    pub fn pending_resume(&self) -> Option<ResumeToken> {
        self.pending_resume
    }

    /// Append a snapshot of `world` and move the cursor to it.
    pub fn capture(&mut self, world: &World, now: Duration) -> Result<usize, TimelineError> {
        if self.paused {
            return Err(TimelineError::Paused);
        }
        self.snapshots.push(Snapshot::capture(world, now)?);
        self.time_state = self.snapshots.len() - 1;
        tracing::debug!(
            index = self.time_state,
            revision = world.revision(),
            "snapshot captured"
        );
        Ok(self.time_state)
    }

    /// Stop capturing. Returns false if already paused.
    pub fn pause(&mut self) -> bool {
        if self.paused {
            return false;
        }
        self.paused = true;
        tracing::info!(time_state = self.time_state, len = self.len(), "timeline paused");
        true
    }

    /// Move the cursor to `index` and overwrite the world with that snapshot.
    ///
    /// Any pending resume confirmation is invalidated, since it was computed
    /// for the previous cursor.
    pub fn scrub(&mut self, index: usize, world: &mut World) -> Result<(), TimelineError> {
        if !self.paused {
            return Err(TimelineError::NotPaused);
        }
        let snapshot = self.snapshots.get(index).ok_or(TimelineError::OutOfRange {
            index,
            len: self.snapshots.len(),
        })?;
        snapshot.restore_into(world);
        self.time_state = index;
        self.pending_resume = None;
        tracing::debug!(index, "scrubbed");
        Ok(())
    }

    /// First phase of resuming.
    ///
    /// At the tail this resumes immediately. Anywhere else it returns a token
    /// and leaves the record paused and untouched.
    pub fn request_resume(&mut self) -> Result<ResumeRequest, TimelineError> {
        if !self.paused {
            return Err(TimelineError::NotPaused);
        }
        let keep = self.time_state + 1;
        if keep >= self.snapshots.len() {
            self.paused = false;
            self.pending_resume = None;
            tracing::info!(time_state = self.time_state, "timeline resumed");
            return Ok(ResumeRequest::Resumed);
        }
        self.next_token += 1;
        let token = ResumeToken {
            id: self.next_token,
            keep,
            discard: self.snapshots.len() - keep,
        };
        self.pending_resume = Some(token);
        Ok(ResumeRequest::NeedsConfirmation(token))
    }

    /// Second phase: truncate to `record[0..=time_state]` and resume.
    ///
    /// Returns the number of discarded snapshots.
    pub fn confirm_resume(&mut self, token: ResumeToken) -> Result<usize, TimelineError> {
        if self.pending_resume != Some(token) {
            return Err(TimelineError::StaleToken);
        }
        self.snapshots.truncate(token.keep);
        self.pending_resume = None;
        self.paused = false;
        tracing::info!(
            discarded = token.discard,
            len = self.snapshots.len(),
            "timeline truncated and resumed"
        );
        Ok(token.discard)
    }

    /// Abort a pending resume; the record stays paused and untouched.
    pub fn cancel_resume(&mut self, token: ResumeToken) -> Result<(), TimelineError> {
        if self.pending_resume != Some(token) {
            return Err(TimelineError::StaleToken);
        }
        self.pending_resume = None;
        tracing::debug!("resume cancelled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridworld_common::{Cell, EntityId, ObjectKind};
    use gridworld_kernel::WorldObject;

    /// A record of `n` snapshots of a robot walking north one cell at a time.
    fn walk(n: usize) -> (TemporalRecord, World, EntityId) {
        let mut world = World::new();
        let id = world
            .insert(WorldObject::new(ObjectKind::Robot, Cell::new(0, 0)))
            .unwrap();
        let mut record = TemporalRecord::new();
        for step in 0..n {
            world.set_cell(id, Cell::new(0, step as i32)).unwrap();
            record
                .capture(&world, Duration::from_millis(step as u64))
                .unwrap();
        }
        (record, world, id)
    }

    #[test]
    fn capture_moves_cursor_to_tail() {
        let (record, _, _) = walk(3);
        assert_eq!(record.len(), 3);
        assert_eq!(record.time_state(), 2);
        assert_eq!(record.tail_index(), Some(2));
    }

    #[test]
    fn capture_refused_while_paused() {
        let (mut record, world, _) = walk(1);
        assert!(record.pause());
        assert!(!record.pause());
        assert_eq!(
            record.capture(&world, Duration::ZERO),
            Err(TimelineError::Paused)
        );
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn scrub_requires_pause() {
        let (mut record, mut world, _) = walk(3);
        assert_eq!(record.scrub(0, &mut world), Err(TimelineError::NotPaused));
        assert_eq!(record.time_state(), 2);
    }

    #[test]
    fn scrub_restores_every_index() {
        let (mut record, mut world, _) = walk(5);
        record.pause();
        for i in 0..record.len() {
            record.scrub(i, &mut world).unwrap();
            assert_eq!(record.time_state(), i);
            assert_eq!(world.objects(), record.get(i).unwrap().objects());
        }
        assert_eq!(
            record.scrub(5, &mut world),
            Err(TimelineError::OutOfRange { index: 5, len: 5 })
        );
    }

    #[test]
    fn resume_at_tail_needs_no_confirmation() {
        let (mut record, _, _) = walk(2);
        record.pause();
        assert_eq!(record.request_resume(), Ok(ResumeRequest::Resumed));
        assert!(!record.is_paused());
        assert_eq!(record.request_resume(), Err(TimelineError::NotPaused));
    }

    #[test]
    fn confirmed_resume_truncates_after_cursor() {
        let (mut record, mut world, _) = walk(5);
        record.pause();
        record.scrub(1, &mut world).unwrap();
        let ResumeRequest::NeedsConfirmation(token) = record.request_resume().unwrap() else {
            panic!("expected a confirmation request");
        };
        assert_eq!(token.keeps(), 2);
        assert_eq!(token.discards(), 3);
        assert!(record.is_paused());

        assert_eq!(record.confirm_resume(token), Ok(3));
        assert_eq!(record.len(), 2);
        assert!(!record.is_paused());
        assert_eq!(record.confirm_resume(token), Err(TimelineError::StaleToken));
    }

    #[test]
    fn cancelled_resume_leaves_record_untouched() {
        let (mut record, mut world, _) = walk(4);
        record.pause();
        record.scrub(0, &mut world).unwrap();
        let ResumeRequest::NeedsConfirmation(token) = record.request_resume().unwrap() else {
            panic!("expected a confirmation request");
        };
        record.cancel_resume(token).unwrap();
        assert_eq!(record.len(), 4);
        assert!(record.is_paused());
        assert_eq!(record.time_state(), 0);
        assert_eq!(record.confirm_resume(token), Err(TimelineError::StaleToken));
    }

    #[test]
    fn scrub_invalidates_pending_token() {
        let (mut record, mut world, _) = walk(4);
        record.pause();
        record.scrub(1, &mut world).unwrap();
        let ResumeRequest::NeedsConfirmation(token) = record.request_resume().unwrap() else {
            panic!("expected a confirmation request");
        };
        record.scrub(2, &mut world).unwrap();
        assert_eq!(record.confirm_resume(token), Err(TimelineError::StaleToken));
        assert_eq!(record.len(), 4);
    }

    #[test]
    fn capture_after_truncation_appends_to_new_tail() {
        let (mut record, mut world, id) = walk(4);
        record.pause();
        record.scrub(0, &mut world).unwrap();
        if let ResumeRequest::NeedsConfirmation(token) = record.request_resume().unwrap() {
            record.confirm_resume(token).unwrap();
        }
        world.set_cell(id, Cell::new(5, 5)).unwrap();
        assert_eq!(record.capture(&world, Duration::ZERO), Ok(1));
        assert_eq!(record.len(), 2);
    }
}
