//! Pending/confirmed bookkeeping for optimistic install state.
//!
//! Every mutation starts as a pending entry tagged with a per-module
//! sequence number. A pending entry overrides the settled view of its module
//! until the request carrying the same sequence number settles it. Settling
//! with an older sequence number, or one issued before the last [`reset`],
//! reports [`Settle::Stale`].
//!
//! Responses can arrive in any order across modules, so a response's set is
//! not adopted wholesale. It always speaks for its own module. For any other
//! module it is trusted only when that module had nothing in flight and
//! nothing settled after the request was issued; otherwise the response may
//! predate a change the client already knows about.
//!
//! [`reset`]: InstallState::reset

use std::collections::{BTreeSet, HashMap};

use toolkit_types::ModuleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Install,
    Uninstall,
}

impl Intent {
    /// Membership the module has once this intent is applied.
    pub fn target(self) -> bool {
        matches!(self, Intent::Install)
    }
}

/// Identifies one in-flight mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub module: ModuleId,
    pub seq: u64,
    pub intent: Intent,
    /// Logical time the request was issued, shared across modules.
    issued: u64,
    epoch: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Begin {
    /// The optimistic view already satisfies the intent.
    AlreadySatisfied,
    Started(Ticket),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settle {
    Applied,
    /// A newer mutation, or an auth transition, owns the module now.
    Stale,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    seq: u64,
    intent: Intent,
}

#[derive(Debug, Default)]
pub struct InstallState {
    /// Server membership as best known, or loaded from the cache.
    confirmed: BTreeSet<ModuleId>,
    /// Demo modules installed this session. Never sent to the backend.
    demo: BTreeSet<ModuleId>,
    pending: HashMap<ModuleId, Pending>,
    last_seq: HashMap<ModuleId, u64>,
    /// Logical time at which each module's `confirmed` membership was last
    /// learned. A response issued at or before it says nothing new.
    known_at: HashMap<ModuleId, u64>,
    clock: u64,
    epoch: u64,
}

impl InstallState {
    pub fn new(confirmed: impl IntoIterator<Item = ModuleId>) -> Self {
        Self {
            confirmed: confirmed.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Optimistic membership: pending intent first, settled state otherwise.
    pub fn is_installed(&self, module: ModuleId) -> bool {
        match self.pending.get(&module) {
            Some(pending) => pending.intent.target(),
            None => self.confirmed.contains(&module) || self.demo.contains(&module),
        }
    }

    /// Optimistic view of the whole set.
    pub fn snapshot(&self) -> BTreeSet<ModuleId> {
        let mut set = self.settled();
        for (module, pending) in &self.pending {
            if pending.intent.target() {
                set.insert(*module);
            } else {
                set.remove(module);
            }
        }
        set
    }

    /// Confirmed and demo modules, ignoring anything in flight.
    pub fn settled(&self) -> BTreeSet<ModuleId> {
        self.confirmed.union(&self.demo).copied().collect()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn begin(&mut self, module: ModuleId, intent: Intent) -> Begin {
        if self.is_installed(module) == intent.target() {
            return Begin::AlreadySatisfied;
        }

        let seq = self.last_seq.entry(module).or_insert(0);
        *seq += 1;
        self.clock += 1;
        let ticket = Ticket {
            module,
            seq: *seq,
            intent,
            issued: self.clock,
            epoch: self.epoch,
        };
        self.pending.insert(
            module,
            Pending {
                seq: ticket.seq,
                intent,
            },
        );
        Begin::Started(ticket)
    }

    /// Issued in the current session, before or after other mutations.
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.epoch == self.epoch
    }

    pub fn is_latest(&self, ticket: &Ticket) -> bool {
        self.is_current(ticket) && self.last_seq.get(&ticket.module) == Some(&ticket.seq)
    }

    /// Settle `ticket` with the set the backend reported after applying it.
    ///
    /// A stale ticket still records what the backend said about its own
    /// module, so a later rollback of the newer request lands on the
    /// server's state rather than on an older guess.
    pub fn confirm(
        &mut self,
        ticket: Ticket,
        reported: impl IntoIterator<Item = ModuleId>,
    ) -> Settle {
        if !self.is_current(&ticket) {
            return Settle::Stale;
        }
        let reported: BTreeSet<ModuleId> = reported.into_iter().collect();

        let others: Vec<ModuleId> = self
            .confirmed
            .union(&reported)
            .copied()
            .filter(|module| *module != ticket.module)
            .collect();
        for module in others {
            if !self.pending.contains_key(&module) && self.is_news(module, ticket.issued) {
                self.record(module, reported.contains(&module), ticket.issued);
            }
        }

        self.settle_own(ticket, reported.contains(&ticket.module))
    }

    /// Settle `ticket` when the backend reports the module already in the
    /// target state without sending the full set.
    pub fn confirm_single(&mut self, ticket: Ticket) -> Settle {
        if !self.is_current(&ticket) {
            return Settle::Stale;
        }
        self.settle_own(ticket, ticket.intent.target())
    }

    /// Settle a demo `ticket` locally.
    pub fn confirm_demo(&mut self, ticket: Ticket) -> Settle {
        if !self.is_latest(&ticket) {
            return Settle::Stale;
        }
        self.pending.remove(&ticket.module);
        if ticket.intent.target() {
            self.demo.insert(ticket.module);
        } else {
            self.demo.remove(&ticket.module);
            self.confirmed.remove(&ticket.module);
        }
        Settle::Applied
    }

    /// Drop the optimistic change of a failed `ticket`.
    pub fn rollback(&mut self, ticket: Ticket) -> Settle {
        if !self.is_latest(&ticket) {
            return Settle::Stale;
        }
        self.pending.remove(&ticket.module);
        Settle::Applied
    }

    /// Replace everything with `confirmed`, as on login or logout. Tickets
    /// issued before the reset become stale.
    pub fn reset(&mut self, confirmed: impl IntoIterator<Item = ModuleId>) {
        self.confirmed = confirmed.into_iter().collect();
        self.demo.clear();
        self.pending.clear();
        self.known_at.clear();
        self.epoch += 1;
    }

    fn settle_own(&mut self, ticket: Ticket, member: bool) -> Settle {
        let latest = self.is_latest(&ticket);
        if latest || self.is_news(ticket.module, ticket.issued) {
            self.clock += 1;
            self.record(ticket.module, member, self.clock);
        }
        if !latest {
            return Settle::Stale;
        }
        self.pending.remove(&ticket.module);
        Settle::Applied
    }

    fn is_news(&self, module: ModuleId, issued: u64) -> bool {
        self.known_at.get(&module).is_none_or(|known| issued > *known)
    }

    fn record(&mut self, module: ModuleId, member: bool, at: u64) {
        if member {
            self.confirmed.insert(module);
        } else {
            self.confirmed.remove(&module);
        }
        self.known_at.insert(module, at);
    }
}
