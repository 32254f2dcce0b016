//! Stale-result guarding for asynchronous work.
//!
//! Each kind of work owns a [`Generation`] counter. Starting work bumps the
//! counter and hands out a [`Ticket`]; a result is only applied when its
//! ticket still matches. Invalidation bumps without issuing, so a rapid
//! teardown/re-mount can never confuse an old result with a new one.

use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket {
    generation: u64,
}

impl Ticket {
    pub fn generation(self) -> u64 {
        self.generation
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.generation)
    }
}

#[derive(Debug, Default, Clone)]
pub struct Generation {
    current: u64,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supersedes all outstanding tickets and issues a new one.
    pub fn begin(&mut self) -> Ticket {
        self.current += 1;
        Ticket {
            generation: self.current,
        }
    }

    /// Supersedes all outstanding tickets.
    pub fn invalidate(&mut self) {
        self.current += 1;
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.generation == self.current
    }

    pub fn current(&self) -> u64 {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::Generation;

    #[test]
    fn newer_ticket_supersedes_older() {
        let mut g = Generation::new();
        let a = g.begin();
        let b = g.begin();
        assert!(!g.is_current(a));
        assert!(g.is_current(b));
        assert!(b > a);
    }

    #[test]
    fn invalidate_retires_outstanding_ticket() {
        let mut g = Generation::new();
        let a = g.begin();
        g.invalidate();
        assert!(!g.is_current(a));
        let b = g.begin();
        assert!(g.is_current(b));
    }
}
