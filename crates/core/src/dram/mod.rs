//! DRAM operating state and legality.
//!
//! 1. **State:** Bank phases, the (phase, command) transition table and per-rank bookkeeping.
//! 2. **Timing:** The constraint validator deciding whether a command may issue.
//! 3. **Refresh:** Refresh interval compliance and refresh debt.

/// Refresh scheduling and debt tracking.
pub mod refresh;
/// Bank/rank state machine.
pub mod state;
/// Timing constraint validator.
pub mod timing;

pub use refresh::{RefreshDeadlineMissed, RefreshObligation, RefreshScheduler, RefreshTracker};
pub use state::{BankPhase, BankState, ClosedDwell, RankPowerStatus, RankState, Transition, transition};
pub use timing::{ConstraintViolation, TimingConstraint, TimingValidator, ViolationKind};
