use gridworld_common::RobotCommand;
use std::collections::VecDeque;
use std::time::Duration;

/// Whether a robot can take its next command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotState {
    Idle,
    /// Holding a motion lock until the given simulation time.
    Executing { until: Duration },
}

/// Per-robot FIFO of pending commands plus its motion-lock deadline.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    pending: VecDeque<RobotCommand>,
    locked_until: Option<Duration>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: RobotCommand) {
        self.pending.push_back(command);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending commands in arrival order.
    pub fn pending(&self) -> impl Iterator<Item = &RobotCommand> {
        self.pending.iter()
    }

    pub fn state(&self, now: Duration) -> RobotState {
        match self.locked_until {
            Some(until) if now < until => RobotState::Executing { until },
            _ => RobotState::Idle,
        }
    }

    /// Dequeue the next command if the robot is idle at `now`.
    pub fn take_ready(&mut self, now: Duration) -> Option<RobotCommand> {
        if self.state(now) != RobotState::Idle {
            return None;
        }
        self.locked_until = None;
        self.pending.pop_front()
    }

    /// Start a motion lock lasting `duration` from `now`.
    pub fn lock(&mut self, now: Duration, duration: Duration) {
        self.locked_until = Some(now + duration);
    }

    /// Drop all pending commands and any motion lock.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.locked_until = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn commands_leave_in_arrival_order() {
        let mut q = CommandQueue::new();
        q.push(RobotCommand::Forward);
        q.push(RobotCommand::RotateLeft);
        q.push(RobotCommand::Grab);
        assert_eq!(q.len(), 3);
        assert_eq!(q.take_ready(ms(0)), Some(RobotCommand::Forward));
        assert_eq!(q.take_ready(ms(0)), Some(RobotCommand::RotateLeft));
        assert_eq!(q.take_ready(ms(0)), Some(RobotCommand::Grab));
        assert_eq!(q.take_ready(ms(0)), None);
    }

    #[test]
    fn lock_defers_dequeue_until_it_elapses() {
        let mut q = CommandQueue::new();
        q.push(RobotCommand::Forward);
        q.lock(ms(100), ms(200));
        assert_eq!(q.state(ms(150)), RobotState::Executing { until: ms(300) });
        assert_eq!(q.take_ready(ms(299)), None);
        assert_eq!(q.len(), 1);
        assert_eq!(q.state(ms(300)), RobotState::Idle);
        assert_eq!(q.take_ready(ms(300)), Some(RobotCommand::Forward));
    }

    #[test]
    fn reset_clears_everything() {
        let mut q = CommandQueue::new();
        q.push(RobotCommand::Place);
        q.lock(ms(0), ms(500));
        q.reset();
        assert!(q.is_empty());
        assert_eq!(q.state(ms(1)), RobotState::Idle);
    }
}
