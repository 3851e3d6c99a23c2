use std::time::Duration;

use tokio::time::Instant;

/// Identifies one hold of the lock, so a superseded holder cannot release
/// the hold of whoever reclaimed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Idle,
    InFlight { since: Instant, ticket: Ticket },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    Granted(Ticket),
    /// The previous hold outlived the ceiling and was force-released.
    Reclaimed { ticket: Ticket, held_for: Duration },
    Busy,
}

impl Acquire {
    pub fn ticket(&self) -> Option<Ticket> {
        match self {
            Acquire::Granted(ticket) | Acquire::Reclaimed { ticket, .. } => Some(*ticket),
            Acquire::Busy => None,
        }
    }
}

/// Transport operation lock: `{Idle, InFlight(since)}` with a hold ceiling.
///
/// Callers that find the lock held are turned away (no queueing). A hold
/// older than the ceiling is treated as wedged and handed to the next caller.
#[derive(Debug)]
pub struct OperationLock {
    state: LockState,
    ceiling: Duration,
    next_ticket: u64,
}

impl OperationLock {
    pub fn new(ceiling: Duration) -> Self {
        Self {
            state: LockState::Idle,
            ceiling,
            next_ticket: 0,
        }
    }

    pub fn try_acquire(&mut self, now: Instant) -> Acquire {
        match self.state {
            LockState::Idle => Acquire::Granted(self.hold(now)),
            LockState::InFlight { since, .. } => {
                let held_for = now.saturating_duration_since(since);
                if held_for > self.ceiling {
                    Acquire::Reclaimed {
                        ticket: self.hold(now),
                        held_for,
                    }
                } else {
                    Acquire::Busy
                }
            }
        }
    }

    /// Returns false when `ticket` no longer owns the lock.
    pub fn release(&mut self, ticket: Ticket) -> bool {
        match self.state {
            LockState::InFlight { ticket: held, .. } if held == ticket => {
                self.state = LockState::Idle;
                true
            }
            _ => false,
        }
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn is_held(&self) -> bool {
        matches!(self.state, LockState::InFlight { .. })
    }

    fn hold(&mut self, now: Instant) -> Ticket {
        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        self.state = LockState::InFlight { since: now, ticket };
        ticket
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CEILING: Duration = Duration::from_secs(2);

    #[test]
    fn second_caller_is_turned_away_while_held() {
        let mut lock = OperationLock::new(CEILING);
        let t0 = Instant::now();

        assert!(matches!(lock.try_acquire(t0), Acquire::Granted(_)));
        assert_eq!(lock.try_acquire(t0 + Duration::from_millis(1_999)), Acquire::Busy);
    }

    #[test]
    fn hold_past_ceiling_is_reclaimed() {
        let mut lock = OperationLock::new(CEILING);
        let t0 = Instant::now();
        let first = lock.try_acquire(t0).ticket().unwrap();

        let second = lock.try_acquire(t0 + Duration::from_millis(2_100));
        let Acquire::Reclaimed { ticket, held_for } = second else {
            panic!("expected reclaim, got {:?}", second);
        };
        assert_eq!(held_for, Duration::from_millis(2_100));

        // The wedged holder finishing late must not free the new hold.
        assert!(!lock.release(first));
        assert!(lock.is_held());
        assert!(lock.release(ticket));
        assert_eq!(lock.state(), LockState::Idle);
    }

    #[test]
    fn exactly_at_ceiling_is_still_held() {
        let mut lock = OperationLock::new(CEILING);
        let t0 = Instant::now();
        lock.try_acquire(t0);
        assert_eq!(lock.try_acquire(t0 + CEILING), Acquire::Busy);
    }
}
