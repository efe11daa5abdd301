use stately::{IssueKind, Machine, MachineStatus, Severity, SignalKind};
use test_case::test_case;

fn base() -> Machine {
    let mut m = Machine::new("m");
    m.add_signal("reset", SignalKind::Input);
    m.add_signal("a", SignalKind::Input);
    m.add_signal("X", SignalKind::Statewise);
    m
}

fn kinds(m: &Machine) -> Vec<IssueKind> {
    m.issues().iter().map(|issue| issue.kind).collect()
}

#[test_case("if a\n    emit X\nelse\n    emit X\ngoto S", &[] ; "exclusive branches")]
#[test_case("if a\n    emit X\n    emit X\ngoto S", &[IssueKind::OverlappingEmit] ; "twice in one branch")]
#[test_case("emit X\nif a\n    emit X\ngoto S", &[IssueKind::OverlappingEmit] ; "before and inside a branch")]
#[test_case("if a\n    goto S\nelse\n    goto S", &[] ; "goto in both branches")]
#[test_case("if a\n    goto S\ngoto S", &[IssueKind::OverlappingGoto] ; "conditional then unconditional goto")]
fn test_overlap(source: &str, expected: &[IssueKind]) {
    let mut m = base();
    let s = m.add_state("S");
    m.set_state_source(s, source);
    m.analyze();
    assert_eq!(kinds(&m), expected);
    let status = if expected.is_empty() {
        MachineStatus::Happy
    } else {
        MachineStatus::Troublesome
    };
    assert_eq!(m.status(), status);
}

#[test]
fn test_virtual_state_that_might_not_leave() {
    let mut m = base();
    let s = m.add_state("S");
    let v = m.add_state("V");
    m.set_state_virtual(v, true);
    m.set_state_source(s, "goto V");
    m.set_state_source(v, "emit X");
    m.analyze();

    assert_eq!(m.status(), MachineStatus::Happy);
    assert_eq!(kinds(&m), [IssueKind::VirtualNoGoto]);
    let issue = &m.issues()[0];
    assert_eq!(issue.severity, Severity::Warning);
    assert_eq!(issue.states, [v]);
    assert_eq!(
        issue.display(&m).to_string(),
        "WARNING (signals:) (states: V) virtual state might not leave"
    );
}

#[test]
fn test_virtual_state_with_conditional_exit_might_not_leave() {
    let mut m = base();
    let s = m.add_state("S");
    let v = m.add_state("V");
    m.set_state_virtual(v, true);
    m.set_state_source(s, "goto V");
    m.set_state_source(v, "if a\n    goto S");
    m.analyze();
    assert_eq!(kinds(&m), [IssueKind::VirtualNoGoto]);
}

#[test]
fn test_mutual_dependency_cycle() {
    let mut m = base();
    let p = m.add_signal("A", SignalKind::Expression);
    let q = m.add_signal("B", SignalKind::Expression);
    m.set_signal_source(p, "(not B)");
    m.set_signal_source(q, "(and A a)");
    let s = m.add_state("S");
    m.set_state_source(s, "goto S");
    m.analyze();

    assert_eq!(m.status(), MachineStatus::Troublesome);
    assert_eq!(kinds(&m), [IssueKind::DependencyCycle]);
    let issue = &m.issues()[0];
    assert!(issue.signals_cyclic);
    let mut named = issue.signals.clone();
    named.sort();
    assert_eq!(named, [p, q]);
    assert!(m.signal_order().is_none());
    assert!(m.model().is_none());
}

#[test]
fn test_statewise_signal_in_its_own_condition_is_a_cycle() {
    let mut m = base();
    let x = m.signal_by_name("X").unwrap().id();
    let s = m.add_state("S");
    m.set_state_source(s, "if X\n    emit X\ngoto S");
    m.analyze();
    assert_eq!(kinds(&m), [IssueKind::DependencyCycle]);
    assert_eq!(m.issues()[0].signals, [x]);
}

#[test]
fn test_dependencies_through_virtual_states() {
    let mut m = base();
    let x = m.signal_by_name("X").unwrap().id();
    let a = m.signal_by_name("a").unwrap().id();
    let s = m.add_state("S");
    let v = m.add_state("V");
    m.set_state_virtual(v, true);
    m.set_state_source(s, "if a\n    goto V\nelse\n    goto S");
    m.set_state_source(v, "emit X\ngoto S");
    m.analyze();
    assert_eq!(m.status(), MachineStatus::Happy, "{:?}", m.issues());
    assert!(m.dependency_graph().unwrap().has_edge(x, a));
}

#[test]
fn test_earlier_phase_hides_later_ones() {
    let mut m = base();
    let s = m.add_state("S");
    let t = m.add_state("T");
    m.set_state_source(s, "emit a\ngoto T\ngoto S");
    m.set_state_source(t, "goto S");
    m.analyze();
    assert_eq!(m.status(), MachineStatus::Uncompiled);
    assert_eq!(kinds(&m), [IssueKind::BadEmission]);
}

#[test]
fn test_reanalysis_recovers() {
    let mut m = base();
    let s = m.add_state("S");
    m.set_state_source(s, "goto Missing");
    m.analyze();
    assert_eq!(kinds(&m), [IssueKind::Uncompiled]);
    assert_eq!(
        m.state(s).unwrap().code().error(),
        Some("Cannot find state Missing")
    );

    let missing = m.add_state("Missing");
    m.set_state_source(missing, "goto S");
    m.analyze();
    assert_eq!(m.status(), MachineStatus::Happy, "{:?}", m.issues());
    assert!(m.coarse_graph().has_edge(s, missing));
}
