use crate::flatting::Model;
use crate::ir::{SignalId, StateId, Statement};
use crate::machine::{Machine, MachineEvent, MachineStatus, SignalKind};
use crate::parser;
use log::{debug, info, warn};

mod checks;
mod dependency;
mod graph;
mod issue;

pub use graph::Graph;
pub use issue::{Issue, IssueDisplay, IssueKind, Severity};

/// Everything derived by one analysis pass. Rebuilt from scratch each time.
#[derive(Debug, Clone, Default)]
pub(crate) struct Analysis {
    pub status: MachineStatus,
    pub issues: Vec<Issue>,
    pub coarse_graph: Graph<StateId>,
    pub dependency_graph: Option<Graph<SignalId>>,
    pub signal_order: Option<Vec<SignalId>>,
    pub model: Option<Model>,
}

impl Machine {
    /// Compiles all code and runs every check, replacing the derived data of
    /// the previous pass.
    ///
    /// Checks run in a fixed order and the first failing group stops the pass:
    /// name conflicts, then initial state, reset signal, emission types and
    /// compilation, then virtual state cycles, then signal dependency cycles,
    /// then overlapping emits and gotos. Warnings never stop the pass.
    pub fn analyze(&mut self) {
        self.analysis = Analysis::default();
        debug!("analyzing machine \"{}\"", self.name);

        let conflicts = checks::name_conflicts(self);
        if !conflicts.is_empty() {
            return self.finish(MachineStatus::Uncompiled, conflicts);
        }

        self.compile_all();
        self.analysis.coarse_graph = checks::coarse_graph(self);

        let mut issues = checks::initial_state(self);
        issues.extend(checks::reset_signal(self));
        issues.extend(checks::types(self));
        issues.extend(checks::uncompiled(self));
        if !issues.is_empty() {
            return self.finish(MachineStatus::Uncompiled, issues);
        }

        let issues = checks::virtual_cycles(self, &self.analysis.coarse_graph);
        if !issues.is_empty() {
            return self.finish(MachineStatus::Troublesome, issues);
        }

        let graph = dependency::build(self);
        let cycles = graph.find_cycles();
        if !cycles.is_empty() {
            self.analysis.dependency_graph = Some(graph);
            let issues = cycles.into_iter().map(Issue::dependency_cycle).collect();
            return self.finish(MachineStatus::Troublesome, issues);
        }
        let order = graph.toposort_no_cycles();
        assert_eq!(
            order.len(),
            self.signals.len(),
            "dependency order does not cover every signal"
        );
        self.analysis.dependency_graph = Some(graph);
        self.analysis.signal_order = Some(order);

        let issues = checks::overlap(self);
        if !issues.is_empty() {
            return self.finish(MachineStatus::Troublesome, issues);
        }

        let warnings = checks::warnings(self);
        assert!(
            warnings.iter().all(|issue| !issue.is_error()),
            "error-severity issue raised after all checks passed"
        );
        self.analysis.model = Some(Model::extract(self));
        self.finish(MachineStatus::Happy, warnings);
    }

    fn finish(&mut self, status: MachineStatus, issues: Vec<Issue>) {
        for issue in &issues {
            let line = issue.display(&*self).to_string();
            if issue.is_error() {
                warn!("{line}");
            } else {
                info!("{line}");
            }
        }
        debug!(
            "machine \"{}\" is {status} with {} issue(s)",
            self.name,
            issues.len()
        );
        self.analysis.status = status;
        self.analysis.issues = issues;
        self.notify(MachineEvent::Analyzed);
    }

    /// Compiles every expression signal and state not compiled yet. Failures
    /// stay on the code unit.
    fn compile_all(&mut self) {
        let machine = &*self;
        let signal_outcomes: Vec<_> = machine
            .signals
            .iter()
            .enumerate()
            .filter(|(_, s)| s.kind == SignalKind::Expression && !s.code.is_compiled())
            .map(|(i, s)| (i, parser::compile_expression(s.code.source(), machine)))
            .collect();
        for (i, outcome) in signal_outcomes {
            if let Err(err) = &outcome {
                debug!("signal \"{}\" does not compile: {err}", self.signals[i].name);
            }
            self.signals[i].code.store(outcome);
        }

        let machine = &*self;
        let state_outcomes: Vec<_> = machine
            .states
            .iter()
            .enumerate()
            .filter(|(_, st)| !st.code.is_compiled())
            .map(|(i, st)| (i, parser::compile_statement(st.code.source(), machine)))
            .collect();
        for (i, outcome) in state_outcomes {
            if let Err(err) = &outcome {
                debug!("state \"{}\" does not compile: {err}", self.states[i].name);
            }
            self.states[i].code.store(outcome);
        }
    }

    /// Compiled body of a state the current pass has already compiled.
    ///
    /// # Panics
    ///
    /// Panics if the state is unknown or did not compile.
    pub(crate) fn compiled_body(&self, id: StateId) -> &Statement {
        match self.state(id).and_then(|st| st.body()) {
            Some(body) => body,
            None => panic!("{id} has no compiled body"),
        }
    }

    pub fn status(&self) -> MachineStatus {
        self.analysis.status
    }

    pub fn issues(&self) -> &[Issue] {
        &self.analysis.issues
    }

    /// State-to-goto-target graph of the last analysis.
    pub fn coarse_graph(&self) -> &Graph<StateId> {
        &self.analysis.coarse_graph
    }

    pub fn dependency_graph(&self) -> Option<&Graph<SignalId>> {
        self.analysis.dependency_graph.as_ref()
    }

    /// Evaluation order of all signals, dependencies first.
    pub fn signal_order(&self) -> Option<&[SignalId]> {
        self.analysis.signal_order.as_deref()
    }

    /// Available only when the status is [`MachineStatus::Happy`].
    pub fn model(&self) -> Option<&Model> {
        self.analysis.model.as_ref()
    }
}
