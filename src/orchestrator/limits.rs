//! Concurrency caps: one global bound plus one bound per installer kind.
use std::collections::BTreeMap;

use crate::catalog::{Action, InstallerKind};

/// Default global cap.
const DEFAULT_GLOBAL: usize = 4;

/// Global and per-installer-kind caps on concurrently running tasks.
///
/// Homebrew, cargo and rustup serialize on their own global locks, so their
/// kinds default to one task at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcurrencyLimits {
    global: usize,
    per_kind: BTreeMap<InstallerKind, usize>,
}

impl Default for ConcurrencyLimits {
    fn default() -> Self {
        let per_kind = BTreeMap::from([
            (InstallerKind::SystemPackage, 1),
            (InstallerKind::SystemCask, 1),
            (InstallerKind::Cargo, 1),
            (InstallerKind::Rustup, 1),
            (InstallerKind::Npm, 2),
        ]);
        Self {
            global: DEFAULT_GLOBAL,
            per_kind,
        }
    }
}

impl ConcurrencyLimits {
    /// Replace the global cap (minimum 1).
    #[must_use]
    pub fn with_global(mut self, global: usize) -> Self {
        self.global = global.max(1);
        self
    }

    /// Override the cap for one installer kind (minimum 1).
    #[must_use]
    pub fn with_kind(mut self, kind: InstallerKind, cap: usize) -> Self {
        self.per_kind.insert(kind, cap.max(1));
        self
    }

    /// The global cap.
    #[must_use]
    pub const fn global(&self) -> usize {
        self.global
    }

    /// Effective cap for `kind`, never above the global cap.
    #[must_use]
    pub fn cap_for(&self, kind: InstallerKind) -> usize {
        self.per_kind
            .get(&kind)
            .copied()
            .unwrap_or(self.global)
            .min(self.global)
    }
}

/// Running-task accounting against a [`ConcurrencyLimits`].
///
/// Status checks only count against the global cap.
#[derive(Debug)]
pub(crate) struct Slots<'a> {
    limits: &'a ConcurrencyLimits,
    running: usize,
    per_kind: BTreeMap<InstallerKind, usize>,
}

impl<'a> Slots<'a> {
    pub(crate) const fn new(limits: &'a ConcurrencyLimits) -> Self {
        Self {
            limits,
            running: 0,
            per_kind: BTreeMap::new(),
        }
    }

    /// Return `true` if one more task of `kind` may start.
    pub(crate) fn available(&self, kind: InstallerKind, action: Action) -> bool {
        if self.running >= self.limits.global() {
            return false;
        }
        if !action.is_mutating() {
            return true;
        }
        self.per_kind.get(&kind).copied().unwrap_or(0) < self.limits.cap_for(kind)
    }

    pub(crate) fn acquire(&mut self, kind: InstallerKind, action: Action) {
        self.running += 1;
        if action.is_mutating() {
            *self.per_kind.entry(kind).or_insert(0) += 1;
        }
    }

    pub(crate) fn release(&mut self, kind: InstallerKind, action: Action) {
        self.running = self.running.saturating_sub(1);
        if action.is_mutating()
            && let Some(n) = self.per_kind.get_mut(&kind)
        {
            *n = n.saturating_sub(1);
        }
    }

    pub(crate) const fn running(&self) -> usize {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brew_kinds_default_to_one() {
        let limits = ConcurrencyLimits::default();
        assert_eq!(limits.cap_for(InstallerKind::SystemPackage), 1);
        assert_eq!(limits.cap_for(InstallerKind::SystemCask), 1);
        assert_eq!(limits.cap_for(InstallerKind::Script), DEFAULT_GLOBAL);
    }

    #[test]
    fn kind_cap_never_exceeds_global() {
        let limits = ConcurrencyLimits::default()
            .with_kind(InstallerKind::Npm, 8)
            .with_global(3);
        assert_eq!(limits.cap_for(InstallerKind::Npm), 3);
    }

    #[test]
    fn zero_is_clamped_to_one() {
        let limits = ConcurrencyLimits::default().with_global(0);
        assert_eq!(limits.global(), 1);
    }

    #[test]
    fn slots_enforce_kind_cap() {
        let limits = ConcurrencyLimits::default();
        let mut slots = Slots::new(&limits);
        assert!(slots.available(InstallerKind::SystemCask, Action::Install));
        slots.acquire(InstallerKind::SystemCask, Action::Install);
        assert!(!slots.available(InstallerKind::SystemCask, Action::Install));
        assert!(slots.available(InstallerKind::Script, Action::Install));
        slots.release(InstallerKind::SystemCask, Action::Install);
        assert!(slots.available(InstallerKind::SystemCask, Action::Install));
        assert_eq!(slots.running(), 0);
    }

    #[test]
    fn status_checks_ignore_kind_caps() {
        let limits = ConcurrencyLimits::default().with_global(2);
        let mut slots = Slots::new(&limits);
        slots.acquire(InstallerKind::SystemCask, Action::StatusCheck);
        assert!(slots.available(InstallerKind::SystemCask, Action::StatusCheck));
        slots.acquire(InstallerKind::SystemCask, Action::StatusCheck);
        assert!(!slots.available(InstallerKind::Script, Action::StatusCheck));
    }
}
