//! Replay engine.
//!
//! Replays a time-ordered command trace against the device model. For each
//! event the engine:
//! 1. **Orders:** Rejects timestamps that go backwards; ignores events after END.
//! 2. **Settles:** Completes refreshes whose tRFC has elapsed and ticks the refresh scheduler.
//! 3. **Validates:** Runs the timing validator and applies the violation policy.
//! 4. **Transitions:** Updates bank/rank state and charges the closed dwell intervals.
//! 5. **Charges:** Books command, termination and switching energy.
//!
//! All mutable replay state lives in a [`SimulationContext`]; the [`Engine`]
//! itself is immutable, so one engine can drive many independent replays.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::common::error::{Result, SimError};
use crate::common::units::{format_energy, format_power};
use crate::config::{SimConfig, ViolationPolicy};
use crate::dram::refresh::{RefreshDeadlineMissed, RefreshScheduler};
use crate::dram::state::{BankPhase, ClosedDwell, RankState};
use crate::dram::timing::{ConstraintViolation, TimingValidator};
use crate::energy::accumulator::{EnergyAccumulator, EnergyLogEntry, EnergyObserver, EnergySource};
use crate::energy::command::CoreEnergyModel;
use crate::energy::interface::InterfaceModel;
use crate::energy::{EnergyCategory, EnergyTotals};
use crate::spec::MemorySpec;
use crate::stats::{PowerReport, SimWarning, aggregate};
use crate::trace::{CommandEvent, CommandKind, WorkloadMetadata};

/// Mutable state of one replay.
#[derive(Debug)]
pub struct SimulationContext {
    ranks: Vec<RankState>,
    accumulator: EnergyAccumulator,
    now_ns: f64,
    processed: usize,
    end_ns: Option<f64>,
    ignored_after_end: usize,
    first_ignored_ns: f64,
    command_counts: BTreeMap<CommandKind, u64>,
    bytes_transferred: u64,
    violations: Vec<ConstraintViolation>,
    warnings: Vec<SimWarning>,
    closed: Vec<ClosedDwell>,
    missed: Vec<RefreshDeadlineMissed>,
}

impl SimulationContext {
    /// State of one rank.
    pub fn rank(&self, rank: usize) -> Option<&RankState> {
        self.ranks.get(rank)
    }

    /// Time of the last processed event.
    pub const fn now_ns(&self) -> f64 {
        self.now_ns
    }

    /// Energy booked so far.
    pub const fn totals(&self) -> &EnergyTotals {
        self.accumulator.totals()
    }

    /// Violations recorded so far under the collect policy.
    pub fn violations(&self) -> &[ConstraintViolation] {
        &self.violations
    }

    /// Warnings raised so far.
    pub fn warnings(&self) -> &[SimWarning] {
        &self.warnings
    }

    /// True once END_OF_SIMULATION has been processed.
    pub const fn is_finished(&self) -> bool {
        self.end_ns.is_some()
    }
}

/// Immutable replay driver for one device, workload and configuration.
#[derive(Debug, Clone)]
pub struct Engine {
    spec: MemorySpec,
    config: SimConfig,
    validator: TimingValidator,
    scheduler: RefreshScheduler,
    core: CoreEnergyModel,
    interface: InterfaceModel,
}

impl Engine {
    /// Builds an engine.
    ///
    /// # Arguments
    ///
    /// * `spec` - Device specification; validated here.
    /// * `metadata` - Workload metadata (temperature, data rate, toggle rates).
    /// * `config` - Replay configuration.
    ///
    /// # Returns
    ///
    /// The engine, or [`SimError::Spec`] if the specification is inconsistent.
    pub fn new(spec: MemorySpec, metadata: &WorkloadMetadata, config: SimConfig) -> Result<Self> {
        spec.validate()?;
        let power = spec.power.derated(metadata.temperature);
        let mode = spec.refresh_mode();
        info!(
            ranks = spec.architecture.nbr_of_ranks,
            banks = spec.architecture.nbr_of_banks,
            refresh_mode = %mode,
            temperature = metadata.temperature,
            policy = ?config.violation_policy,
            act_formula = ?config.act_formula,
            "engine configured"
        );
        Ok(Self {
            validator: TimingValidator::new(spec.timing, mode),
            scheduler: RefreshScheduler::new(mode, spec.timing.trefi, config.max_postponed_refreshes),
            core: CoreEnergyModel::new(&spec, power, config.act_formula),
            interface: InterfaceModel::new(&spec, metadata, &config.interface),
            spec,
            config,
        })
    }

    /// Device specification.
    pub const fn spec(&self) -> &MemorySpec {
        &self.spec
    }

    /// Replay configuration.
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Core energy model, with temperature-derated currents.
    pub const fn core_model(&self) -> &CoreEnergyModel {
        &self.core
    }

    /// Fresh replay state: every bank precharged at t = 0.
    pub fn context(&self) -> SimulationContext {
        let arch = &self.spec.architecture;
        SimulationContext {
            ranks: (0..arch.nbr_of_ranks)
                .map(|id| RankState::new(id, arch.nbr_of_banks))
                .collect(),
            accumulator: EnergyAccumulator::new(self.config.record_energy_log),
            now_ns: 0.0,
            processed: 0,
            end_ns: None,
            ignored_after_end: 0,
            first_ignored_ns: 0.0,
            command_counts: BTreeMap::new(),
            bytes_transferred: 0,
            violations: Vec::new(),
            warnings: Vec::new(),
            closed: Vec::with_capacity(arch.nbr_of_banks),
            missed: Vec::new(),
        }
    }

    /// Fresh replay state that forwards every energy credit to `observer`.
    pub fn context_with_observer(&self, observer: Box<dyn EnergyObserver>) -> SimulationContext {
        let mut ctx = self.context();
        ctx.accumulator = EnergyAccumulator::new(self.config.record_energy_log).with_observer(observer);
        ctx
    }

    /// Replays a whole trace and returns its report.
    pub fn run(&self, events: &[CommandEvent]) -> Result<PowerReport> {
        let mut ctx = self.context();
        for event in events {
            self.process(&mut ctx, event)?;
        }
        self.finish(ctx)
    }

    /// Processes one event.
    ///
    /// # Returns
    ///
    /// `Ok(())` when the event was applied, recorded as a violation, or
    /// ignored after END. Errors are fatal: ordering, addressing, a zero burst
    /// length, a violation under [`ViolationPolicy::Fatal`], or an accumulator
    /// contract breach.
    pub fn process(&self, ctx: &mut SimulationContext, event: &CommandEvent) -> Result<()> {
        let index = ctx.processed;
        ctx.processed += 1;
        let now = event.time_ns;

        if !now.is_finite() || now < 0.0 {
            return Err(SimError::InvalidTimestamp { index, time_ns: now });
        }
        if now < ctx.now_ns {
            return Err(SimError::NonMonotonicTimestamp {
                index,
                time_ns: now,
                previous_ns: ctx.now_ns,
            });
        }
        if ctx.end_ns.is_some() {
            if ctx.ignored_after_end == 0 {
                warn!(time_ns = now, command = %event.kind, "event after END_OF_SIMULATION ignored");
                ctx.first_ignored_ns = now;
            }
            ctx.ignored_after_end += 1;
            ctx.now_ns = now;
            return Ok(());
        }
        ctx.now_ns = now;

        if event.kind == CommandKind::End {
            self.finalize(ctx, now)?;
            *ctx.command_counts.entry(CommandKind::End).or_insert(0) += 1;
            return Ok(());
        }

        self.check_address(event)?;
        if event.burst_length == Some(0) {
            return Err(SimError::ZeroBurstLength {
                index,
                command: event.kind,
            });
        }
        let rank_id = event.rank;

        {
            let rank = &mut ctx.ranks[rank_id];
            rank.complete_refreshes(now, &mut ctx.closed);
            if let Some(obligation) = self.scheduler.on_tick(rank, now, &mut ctx.missed) {
                debug!(
                    rank = obligation.rank,
                    bank = ?obligation.bank,
                    overdue_ns = obligation.overdue_ns,
                    postponed = obligation.postponed,
                    "refresh overdue"
                );
            }
        }
        self.charge_closed(ctx, rank_id)?;
        self.drain_missed(ctx);

        if let Err(violation) = self.validator.validate(event, &ctx.ranks[rank_id]) {
            match self.config.violation_policy {
                ViolationPolicy::Fatal => return Err(violation.into()),
                ViolationPolicy::Collect => {
                    warn!(%violation, "constraint violation");
                    let apply = violation.kind.is_timing_only() && ctx.ranks[rank_id].admits(event);
                    ctx.violations.push(violation);
                    if !apply {
                        return Ok(());
                    }
                }
            }
        }

        ctx.ranks[rank_id].apply(event, self.core.refresh_cycle(), &mut ctx.closed);
        if event.kind == CommandKind::PreA {
            let precharged: Vec<usize> = ctx
                .closed
                .iter()
                .filter(|d| d.phase == BankPhase::Active)
                .map(|d| d.bank)
                .collect();
            let duration = self.core.command_duration(CommandKind::PreA, None);
            for bank in precharged {
                let _ = ctx.accumulator.apply_command_energy(
                    &self.core,
                    CommandKind::PreA,
                    duration,
                    now,
                    rank_id,
                    Some(bank),
                )?;
            }
        }
        self.charge_closed(ctx, rank_id)?;
        self.charge_command(ctx, event)?;

        *ctx.command_counts.entry(event.kind).or_insert(0) += 1;
        debug!(
            time_ns = now,
            command = %event.kind,
            rank = rank_id,
            bank = event.bank,
            "command applied"
        );
        Ok(())
    }

    /// Closes the replay and aggregates the report.
    ///
    /// A trace without END_OF_SIMULATION is finalized at its last event, with a warning.
    pub fn finish(&self, mut ctx: SimulationContext) -> Result<PowerReport> {
        if ctx.end_ns.is_none() {
            let end = ctx.now_ns;
            warn!(end_ns = end, "trace has no END_OF_SIMULATION; finalizing at last event");
            ctx.warnings.push(SimWarning::MissingEnd { end_ns: end });
            self.finalize(&mut ctx, end)?;
        }
        if ctx.ignored_after_end > 0 {
            ctx.warnings.push(SimWarning::EventsAfterEnd {
                count: ctx.ignored_after_end,
                first_time_ns: ctx.first_ignored_ns,
            });
        }

        let simulation_time_ns = ctx.end_ns.unwrap_or(ctx.now_ns);
        let (energy, log) = ctx.accumulator.into_parts();
        let summary = aggregate(&energy, simulation_time_ns, ctx.bytes_transferred);
        info!(
            time_ns = simulation_time_ns,
            energy = %format_energy(summary.total_energy_nj),
            power = %format_power(summary.average_power_mw),
            violations = ctx.violations.len(),
            warnings = ctx.warnings.len(),
            "replay finished"
        );
        Ok(PowerReport {
            simulation_time_ns,
            energy,
            summary,
            bytes_transferred: ctx.bytes_transferred,
            command_counts: ctx.command_counts,
            violations: ctx.violations,
            warnings: ctx.warnings,
            energy_log: log.map(|log| log.into_entries()),
        })
    }

    /// Settles every rank at `end_ns` and closes all open dwell intervals.
    fn finalize(&self, ctx: &mut SimulationContext, end_ns: f64) -> Result<()> {
        for rank_id in 0..ctx.ranks.len() {
            let rank = &mut ctx.ranks[rank_id];
            rank.complete_refreshes(end_ns, &mut ctx.closed);
            let _ = self.scheduler.on_tick(rank, end_ns, &mut ctx.missed);
            rank.close_all(end_ns, &mut ctx.closed);
            self.charge_closed(ctx, rank_id)?;
        }
        self.drain_missed(ctx);
        ctx.end_ns = Some(end_ns);
        Ok(())
    }

    fn check_address(&self, event: &CommandEvent) -> Result<()> {
        let arch = &self.spec.architecture;
        let bank_out = event.kind.is_bank_command() && event.bank >= arch.nbr_of_banks;
        if event.rank >= arch.nbr_of_ranks || bank_out {
            return Err(SimError::AddressOutOfRange {
                command: event.kind,
                time_ns: event.time_ns,
                rank: event.rank,
                bank: event.bank,
                ranks: arch.nbr_of_ranks,
                banks: arch.nbr_of_banks,
            });
        }
        match event.row {
            Some(row) if row as usize >= arch.nbr_of_rows => Err(SimError::RowOutOfRange {
                command: event.kind,
                time_ns: event.time_ns,
                row,
                rows: arch.nbr_of_rows,
            }),
            _ => Ok(()),
        }
    }

    /// Books background energy for the dwell intervals closed on `rank`.
    fn charge_closed(&self, ctx: &mut SimulationContext, rank: usize) -> Result<()> {
        for dwell in ctx.closed.drain(..) {
            let _ = ctx.accumulator.apply_dwell(&self.core, rank, &dwell)?;
        }
        Ok(())
    }

    fn drain_missed(&self, ctx: &mut SimulationContext) {
        for missed in ctx.missed.drain(..) {
            warn!(
                time_ns = missed.time_ns,
                rank = missed.rank,
                bank = ?missed.bank,
                postponed = missed.postponed,
                allowance = self.scheduler.max_postponed(),
                "refresh deadline missed"
            );
            ctx.warnings.push(SimWarning::RefreshDeadlineMissed(missed));
        }
    }

    /// Books the command's own energy and refresh bookkeeping.
    fn charge_command(&self, ctx: &mut SimulationContext, event: &CommandEvent) -> Result<()> {
        let now = event.time_ns;
        let rank = event.rank;
        match event.kind {
            CommandKind::Act | CommandKind::Pre => {
                let duration = self.core.command_duration(event.kind, None);
                let _ = ctx.accumulator.apply_command_energy(
                    &self.core,
                    event.kind,
                    duration,
                    now,
                    rank,
                    Some(event.bank),
                )?;
            }
            CommandKind::Rd | CommandKind::Wr => {
                let burst_length = self.core.burst_length(event.burst_length);
                let duration = self.core.command_duration(event.kind, event.burst_length);
                let _ = ctx.accumulator.apply_command_energy(
                    &self.core,
                    event.kind,
                    duration,
                    now,
                    rank,
                    Some(event.bank),
                )?;
                let interface = [
                    (
                        EnergyCategory::Termination,
                        self.interface.termination_energy(event.kind, duration),
                    ),
                    (
                        EnergyCategory::DynamicIo,
                        self.interface.dynamic_energy(event.kind, burst_length),
                    ),
                ];
                for (category, energy_nj) in interface {
                    let _ = ctx.accumulator.credit(EnergyLogEntry {
                        time_ns: now,
                        rank,
                        bank: Some(event.bank),
                        category,
                        source: EnergySource::Command(event.kind),
                        duration_ns: duration,
                        energy_nj,
                    })?;
                }
                ctx.bytes_transferred += self.spec.architecture.burst_bytes(burst_length);
            }
            CommandKind::Ref => {
                let duration = self.core.command_duration(CommandKind::Ref, None);
                let _ = ctx
                    .accumulator
                    .apply_command_energy(&self.core, CommandKind::Ref, duration, now, rank, None)?;
                self.scheduler.on_refresh(&mut ctx.ranks[rank].refresh, now);
            }
            CommandKind::RefPb => {
                let duration = self.core.command_duration(CommandKind::RefPb, None);
                let _ = ctx.accumulator.apply_command_energy(
                    &self.core,
                    CommandKind::RefPb,
                    duration,
                    now,
                    rank,
                    Some(event.bank),
                )?;
                self.scheduler
                    .on_refresh(&mut ctx.ranks[rank].banks[event.bank].refresh, now);
            }
            CommandKind::SelfRefreshExit => {
                self.scheduler.on_self_refresh_exit(&mut ctx.ranks[rank], now);
            }
            CommandKind::PreA
            | CommandKind::PowerDownEntry
            | CommandKind::PowerDownExit
            | CommandKind::SelfRefreshEntry
            | CommandKind::End => {}
        }
        Ok(())
    }
}
