use crate::ir::{NameLookup, SignalId, StateId};
use crate::machine::SignalKind;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IssueKind {
    NameConflicts,
    InitialMissing,
    InitialVirtual,
    ResetMissing,
    SpecialSignalWrongKind,
    BadEmission,
    Uncompiled,
    VirtualStateCycle,
    DependencyCycle,
    OverlappingEmit,
    OverlappingGoto,
    VirtualNoGoto,
    OutputNameConflicts,
    BadOutputName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Warning,
    Error,
}

/// A problem found by analysis, pointing at the signals and states involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
    pub signals: Vec<SignalId>,
    pub states: Vec<StateId>,
    /// `signals` is a dependency cycle, in order.
    pub signals_cyclic: bool,
    /// `states` is a cycle, in order.
    pub states_cyclic: bool,
}

impl Issue {
    fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            message: message.into(),
            signals: Vec::new(),
            states: Vec::new(),
            signals_cyclic: false,
            states_cyclic: false,
        }
    }

    fn with_signals(mut self, signals: Vec<SignalId>) -> Self {
        self.signals = signals;
        self
    }

    fn with_states(mut self, states: Vec<StateId>) -> Self {
        self.states = states;
        self
    }

    fn warning(mut self) -> Self {
        self.severity = Severity::Warning;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn name_conflicts(signals: Vec<SignalId>, states: Vec<StateId>) -> Self {
        Self::new(IssueKind::NameConflicts, "name conflict(s)")
            .with_signals(signals)
            .with_states(states)
    }

    pub fn initial_missing() -> Self {
        Self::new(IssueKind::InitialMissing, "no initial state")
    }

    pub fn initial_virtual(state: StateId, name: &str) -> Self {
        Self::new(
            IssueKind::InitialVirtual,
            format!("initial state \"{name}\" is virtual"),
        )
        .with_states(vec![state])
    }

    pub fn reset_missing(name: &str) -> Self {
        Self::new(
            IssueKind::ResetMissing,
            format!("missing special input signal \"{name}\""),
        )
    }

    pub fn special_signal_wrong_kind(signal: SignalId, name: &str, kind: SignalKind) -> Self {
        Self::new(
            IssueKind::SpecialSignalWrongKind,
            format!("special signal \"{name}\" must be of kind: {kind}"),
        )
        .with_signals(vec![signal])
    }

    pub fn cannot_emit(signal: SignalId, state: StateId) -> Self {
        Self::new(IssueKind::BadEmission, "cannot emit non-statewise signal")
            .with_signals(vec![signal])
            .with_states(vec![state])
    }

    pub fn uncompiled(signals: Vec<SignalId>, states: Vec<StateId>) -> Self {
        Self::new(IssueKind::Uncompiled, "uncompiled signals or states")
            .with_signals(signals)
            .with_states(states)
    }

    pub fn virtual_state_cycle(states: Vec<StateId>) -> Self {
        let mut issue = Self::new(IssueKind::VirtualStateCycle, "virtual state cycle").with_states(states);
        issue.states_cyclic = true;
        issue
    }

    pub fn dependency_cycle(signals: Vec<SignalId>) -> Self {
        let mut issue = Self::new(IssueKind::DependencyCycle, "signal dependency cycle").with_signals(signals);
        issue.signals_cyclic = true;
        issue
    }

    pub fn overlapping_emit(state: StateId) -> Self {
        Self::new(IssueKind::OverlappingEmit, "overlapping emit").with_states(vec![state])
    }

    pub fn overlapping_goto(state: StateId) -> Self {
        Self::new(IssueKind::OverlappingGoto, "overlapping goto").with_states(vec![state])
    }

    pub fn virtual_no_goto(state: StateId) -> Self {
        Self::new(IssueKind::VirtualNoGoto, "virtual state might not leave")
            .with_states(vec![state])
            .warning()
    }

    pub fn output_name_conflicts(signals: Vec<SignalId>, states: Vec<StateId>) -> Self {
        Self::new(IssueKind::OutputNameConflicts, "output name conflict(s)")
            .with_signals(signals)
            .with_states(states)
            .warning()
    }

    /// `signal` and `state` are both `None` when the machine's own name is bad.
    pub fn bad_output_name(output_name: &str, signal: Option<SignalId>, state: Option<StateId>) -> Self {
        Self::new(
            IssueKind::BadOutputName,
            format!("bad output name \"{output_name}\""),
        )
        .with_signals(signal.into_iter().collect())
        .with_states(state.into_iter().collect())
        .warning()
    }

    pub fn display<'a, N: NameLookup>(&'a self, names: &'a N) -> IssueDisplay<'a, N> {
        IssueDisplay { issue: self, names }
    }
}

pub struct IssueDisplay<'a, N> {
    issue: &'a Issue,
    names: &'a N,
}

impl<N: NameLookup> fmt::Display for IssueDisplay<'_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.issue.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
        };
        write!(f, "{prefix} (signals:")?;
        for id in &self.issue.signals {
            write!(f, " {}", self.names.signal_name(*id).unwrap_or("?"))?;
        }
        write!(f, ") (states:")?;
        for id in &self.issue.states {
            write!(f, " {}", self.names.state_name(*id).unwrap_or("?"))?;
        }
        write!(f, ") {}", self.issue.message)
    }
}
