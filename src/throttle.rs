use crate::timer::Millis;

/// Throttle state. Only the latest pending arguments are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThrottleState<A> {
    Idle,
    Executing { window_ends: Millis },
    Pending { window_ends: Millis, args: A },
}

/// Leading-edge throttle with a single coalesced trailing call.
///
/// The first call in an idle throttle runs immediately and opens a cooldown
/// window. Calls inside the window replace any pending arguments; when the
/// window elapses the pending arguments are handed back exactly once by
/// [`Throttle::poll`], which opens the next window.
#[derive(Debug, Clone)]
pub struct Throttle<A> {
    cooldown_ms: Millis,
    state: ThrottleState<A>,
}

impl<A> Throttle<A> {
    #[must_use]
    pub fn new(cooldown_ms: Millis) -> Self {
        Self {
            cooldown_ms,
            state: ThrottleState::Idle,
        }
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        matches!(self.state, ThrottleState::Pending { .. })
    }

    /// Requests a run. Returns the arguments to run with now, if any.
    pub fn call(&mut self, now: Millis, args: A) -> Option<A> {
        let state = std::mem::replace(&mut self.state, ThrottleState::Idle);
        match state {
            ThrottleState::Executing { window_ends }
            | ThrottleState::Pending { window_ends, .. }
                if now < window_ends =>
            {
                self.state = ThrottleState::Pending { window_ends, args };
                None
            }
            _ => {
                self.state = ThrottleState::Executing {
                    window_ends: now.saturating_add(self.cooldown_ms),
                };
                Some(args)
            }
        }
    }

    /// Releases the pending call once its window has elapsed.
    pub fn poll(&mut self, now: Millis) -> Option<A> {
        let state = std::mem::replace(&mut self.state, ThrottleState::Idle);
        match state {
            ThrottleState::Pending { window_ends, args } if now >= window_ends => {
                self.state = ThrottleState::Executing {
                    window_ends: now.saturating_add(self.cooldown_ms),
                };
                Some(args)
            }
            ThrottleState::Executing { window_ends } if now >= window_ends => None,
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Drops any pending call and returns to idle.
    pub fn cancel(&mut self) {
        self.state = ThrottleState::Idle;
    }
}
