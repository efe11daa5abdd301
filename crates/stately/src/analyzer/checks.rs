use super::graph::Graph;
use super::issue::Issue;
use crate::ir::{SignalId, StateId, Statement};
use crate::machine::{Machine, RESET_SIGNAL, SignalKind};
use std::collections::BTreeMap;

/// One issue listing every signal and state whose name is claimed more than
/// once.
pub fn name_conflicts(machine: &Machine) -> Vec<Issue> {
    let mut owners: BTreeMap<&str, (Vec<SignalId>, Vec<StateId>)> = BTreeMap::new();
    for s in machine.signals() {
        owners.entry(s.name()).or_default().0.push(s.id());
    }
    for st in machine.states() {
        owners.entry(st.name()).or_default().1.push(st.id());
    }

    let mut signals = Vec::new();
    let mut states = Vec::new();
    for (sigs, sts) in owners.into_values() {
        if sigs.len() + sts.len() > 1 {
            signals.extend(sigs);
            states.extend(sts);
        }
    }
    if signals.is_empty() && states.is_empty() {
        Vec::new()
    } else {
        vec![Issue::name_conflicts(signals, states)]
    }
}

/// Direct goto targets of every compiled state.
pub fn coarse_graph(machine: &Machine) -> Graph<StateId> {
    let mut graph = Graph::new();
    for st in machine.states() {
        graph.add_node(st.id());
        if let Some(body) = st.body() {
            for target in body.gotos() {
                graph.add_edge(st.id(), target);
            }
        }
    }
    graph
}

pub fn initial_state(machine: &Machine) -> Vec<Issue> {
    match machine.initial_state().and_then(|id| machine.state(id)) {
        None => vec![Issue::initial_missing()],
        Some(st) if st.is_virtual() => vec![Issue::initial_virtual(st.id(), st.name())],
        Some(_) => Vec::new(),
    }
}

pub fn reset_signal(machine: &Machine) -> Vec<Issue> {
    match machine.signal_by_name(RESET_SIGNAL) {
        None => vec![Issue::reset_missing(RESET_SIGNAL)],
        Some(s) if s.kind() != SignalKind::Input => vec![Issue::special_signal_wrong_kind(
            s.id(),
            s.name(),
            SignalKind::Input,
        )],
        Some(_) => Vec::new(),
    }
}

/// Only statewise signals may be emitted. Every offending emission is
/// reported.
pub fn types(machine: &Machine) -> Vec<Issue> {
    let mut issues = Vec::new();
    for st in machine.states() {
        let Some(body) = st.body() else {
            continue;
        };
        issues.extend(
            body.emissions()
                .into_iter()
                .map(|(signal, _)| signal)
                .filter(|id| machine.signal(*id).map(|s| s.kind()) != Some(SignalKind::Statewise))
                .map(|id| Issue::cannot_emit(id, st.id())),
        );
    }
    issues
}

pub fn uncompiled(machine: &Machine) -> Vec<Issue> {
    let signals: Vec<SignalId> = machine
        .signals()
        .iter()
        .filter(|s| s.kind() == SignalKind::Expression && !s.code().is_compiled())
        .map(|s| s.id())
        .collect();
    let states: Vec<StateId> = machine
        .states()
        .iter()
        .filter(|st| !st.code().is_compiled())
        .map(|st| st.id())
        .collect();
    if signals.is_empty() && states.is_empty() {
        Vec::new()
    } else {
        vec![Issue::uncompiled(signals, states)]
    }
}

/// Cycles among virtual states, which would inline forever.
pub fn virtual_cycles(machine: &Machine, coarse: &Graph<StateId>) -> Vec<Issue> {
    let is_virtual = |id: StateId| machine.state(id).is_some_and(|st| st.is_virtual());
    let mut graph = Graph::new();
    for st in machine.states().iter().filter(|st| st.is_virtual()) {
        graph.add_node(st.id());
        for target in coarse.successors(st.id()).filter(|t| is_virtual(*t)) {
            graph.add_edge(st.id(), target);
        }
    }
    graph
        .find_cycles()
        .into_iter()
        .map(Issue::virtual_state_cycle)
        .collect()
}

/// Emissions per signal and reachable gotos along the worst-case control
/// path.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Tally {
    emits: BTreeMap<SignalId, usize>,
    gotos: usize,
}

impl Tally {
    fn add(&mut self, other: Tally) {
        for (signal, count) in other.emits {
            *self.emits.entry(signal).or_default() += count;
        }
        self.gotos += other.gotos;
    }

    fn max(mut self, other: Tally) -> Tally {
        for (signal, count) in other.emits {
            let entry = self.emits.entry(signal).or_default();
            *entry = (*entry).max(count);
        }
        self.gotos = self.gotos.max(other.gotos);
        self
    }
}

fn tally(machine: &Machine, stm: &Statement) -> Tally {
    match stm {
        Statement::Group { statements, .. } => {
            let mut total = Tally::default();
            for stm in statements {
                total.add(tally(machine, stm));
            }
            total
        }
        Statement::Emit { signal, .. } => Tally {
            emits: BTreeMap::from([(*signal, 1)]),
            gotos: 0,
        },
        Statement::Goto(target) => match machine.state(*target) {
            Some(st) if st.is_virtual() => tally(machine, machine.compiled_body(*target)),
            _ => Tally {
                emits: BTreeMap::new(),
                gotos: 1,
            },
        },
        Statement::Cond {
            then_branch,
            else_branch,
            ..
        } => tally(machine, then_branch).max(tally(machine, else_branch)),
    }
}

/// Concrete states that could emit a signal twice, or take two gotos, in one
/// step.
pub fn overlap(machine: &Machine) -> Vec<Issue> {
    let mut issues = Vec::new();
    for st in machine.states().iter().filter(|st| !st.is_virtual()) {
        let total = tally(machine, machine.compiled_body(st.id()));
        if total.emits.values().any(|count| *count > 1) {
            issues.push(Issue::overlapping_emit(st.id()));
        }
        if total.gotos > 1 {
            issues.push(Issue::overlapping_goto(st.id()));
        }
    }
    issues
}

/// Whether every control path through `stm` reaches a goto to some state
/// other than `from`.
fn always_leaves(stm: &Statement, from: StateId) -> bool {
    match stm {
        Statement::Group { statements, .. } => statements.iter().any(|s| always_leaves(s, from)),
        Statement::Emit { .. } => false,
        Statement::Goto(target) => *target != from,
        Statement::Cond {
            then_branch,
            else_branch,
            ..
        } => always_leaves(then_branch, from) && always_leaves(else_branch, from),
    }
}

pub fn warnings(machine: &Machine) -> Vec<Issue> {
    machine
        .states()
        .iter()
        .filter(|st| st.is_virtual())
        .filter(|st| !always_leaves(machine.compiled_body(st.id()), st.id()))
        .map(|st| Issue::virtual_no_goto(st.id()))
        .collect()
}
