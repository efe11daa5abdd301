use super::graph::Graph;
use crate::ir::{SignalId, Statement};
use crate::machine::{Machine, SignalKind};
use std::collections::BTreeSet;

/// Builds the signal dependency graph; an edge `a -> b` means `a` must be
/// computed after `b`.
///
/// Requires every state and expression signal to be compiled and virtual
/// states to be free of cycles.
pub fn build(machine: &Machine) -> Graph<SignalId> {
    let mut graph = Graph::new();
    for signal in machine.signals() {
        graph.add_node(signal.id());
        if signal.kind() == SignalKind::Expression {
            let Some(expr) = signal.code().compiled() else {
                panic!("expression signal \"{}\" is not compiled", signal.name());
            };
            for dep in expr.signals() {
                graph.add_edge(signal.id(), dep);
            }
        }
    }
    for st in machine.states() {
        explore(machine, machine.compiled_body(st.id()), &BTreeSet::new(), &mut graph);
    }
    graph
}

/// `context` holds the signals read by enclosing conditions.
fn explore(
    machine: &Machine,
    stm: &Statement,
    context: &BTreeSet<SignalId>,
    graph: &mut Graph<SignalId>,
) {
    match stm {
        Statement::Group { statements, .. } => {
            for stm in statements {
                explore(machine, stm, context, graph);
            }
        }
        Statement::Emit { signal, value } => {
            for dep in value.signals().iter().chain(context) {
                graph.add_edge(*signal, *dep);
            }
        }
        Statement::Goto(target) => {
            if machine.state(*target).is_some_and(|st| st.is_virtual()) {
                explore(machine, machine.compiled_body(*target), context, graph);
            }
        }
        Statement::Cond {
            condition,
            then_branch,
            else_branch,
        } => {
            let mut inner = context.clone();
            inner.extend(condition.signals());
            explore(machine, then_branch, &inner, graph);
            explore(machine, else_branch, &inner, graph);
        }
    }
}
