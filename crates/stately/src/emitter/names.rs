use super::EmitOptions;
use crate::HashSet;
use crate::analyzer::Issue;
use crate::ir::{SignalId, StateId};
use crate::machine::Machine;
use std::collections::BTreeMap;

const ENUM_SUFFIX: &str = "_state";
const MOORE_SUFFIX: &str = "_moore";

fn fix_chars(name: &str) -> String {
    name.replace(' ', "_")
}

pub(crate) fn machine_name(machine: &Machine) -> String {
    fix_chars(machine.name())
}

pub(crate) fn signal_name(name: &str) -> String {
    fix_chars(name)
}

pub(crate) fn state_name(name: &str) -> String {
    fix_chars(name).to_uppercase()
}

pub(crate) fn enum_type(machine: &Machine) -> String {
    machine_name(machine) + ENUM_SUFFIX
}

pub(crate) fn moore_name(machine: &Machine) -> String {
    machine_name(machine) + MOORE_SUFFIX
}

fn is_bad(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => true,
    }
}

#[derive(Debug, Clone, Copy)]
enum Owner {
    Machine,
    Signal(SignalId),
    State(StateId),
}

/// Checks that the identifiers the emitter would generate are usable:
/// well-formed, distinct, and clear of the names it reserves for itself.
/// The issues are warnings only.
pub fn check_names(machine: &Machine, options: &EmitOptions) -> Vec<Issue> {
    let reserved: HashSet<String> = [
        options.state_variable.clone(),
        options.clock.clone(),
        enum_type(machine),
        moore_name(machine),
    ]
    .into_iter()
    .collect();

    let mut generated = vec![(Owner::Machine, machine_name(machine))];
    generated.extend(
        machine
            .signals()
            .iter()
            .map(|s| (Owner::Signal(s.id()), signal_name(s.name()))),
    );
    generated.extend(
        machine
            .states()
            .iter()
            .map(|st| (Owner::State(st.id()), state_name(st.name()))),
    );

    let mut owners: BTreeMap<&str, Vec<Owner>> = BTreeMap::new();
    for (owner, name) in &generated {
        owners.entry(name.as_str()).or_default().push(*owner);
    }
    let mut signals = Vec::new();
    let mut states = Vec::new();
    for clash in owners.values().filter(|owners| owners.len() > 1) {
        for owner in clash {
            match owner {
                Owner::Signal(id) => signals.push(*id),
                Owner::State(id) => states.push(*id),
                Owner::Machine => {}
            }
        }
    }

    let mut issues = Vec::new();
    if !signals.is_empty() || !states.is_empty() {
        issues.push(Issue::output_name_conflicts(signals, states));
    }
    for (owner, name) in &generated {
        if is_bad(name) || reserved.contains(name) {
            issues.push(match owner {
                Owner::Machine => Issue::bad_output_name(name, None, None),
                Owner::Signal(id) => Issue::bad_output_name(name, Some(*id), None),
                Owner::State(id) => Issue::bad_output_name(name, None, Some(*id)),
            });
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::IssueKind;
    use crate::machine::SignalKind;
    use test_case::test_case;

    #[test_case("go", false ; "plain")]
    #[test_case("_x9", false ; "underscore and digit")]
    #[test_case("", true ; "empty")]
    #[test_case("9lives", true ; "leading digit")]
    #[test_case("a-b", true ; "dash")]
    #[test_case("caf\u{e9}", true ; "non ascii")]
    fn test_is_bad(name: &str, bad: bool) {
        assert_eq!(is_bad(name), bad);
    }

    #[test]
    fn test_generated_names() {
        let m = Machine::new("traffic light");
        assert_eq!(machine_name(&m), "traffic_light");
        assert_eq!(enum_type(&m), "traffic_light_state");
        assert_eq!(moore_name(&m), "traffic_light_moore");
        assert_eq!(state_name("go left"), "GO_LEFT");
    }

    #[test]
    fn test_clean_machine_has_no_issues() {
        let mut m = Machine::new("m");
        m.add_signal("go", SignalKind::Input);
        m.add_state("Idle");
        assert!(check_names(&m, &EmitOptions::default()).is_empty());
    }

    #[test]
    fn test_conflicts_after_case_folding() {
        let mut m = Machine::new("m");
        let sig = m.add_signal("IDLE", SignalKind::Statewise);
        let st = m.add_state("idle");
        let issues = check_names(&m, &EmitOptions::default());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::OutputNameConflicts);
        assert_eq!(issues[0].signals, [sig]);
        assert_eq!(issues[0].states, [st]);
        assert!(!issues[0].is_error());
    }

    #[test]
    fn test_reserved_and_malformed_names() {
        let mut m = Machine::new("m");
        let clk = m.add_signal("clk", SignalKind::Input);
        let bad = m.add_signal("a-b", SignalKind::Input);
        let issues = check_names(&m, &EmitOptions::default());
        let named: Vec<_> = issues.iter().map(|i| (i.kind, i.signals.clone())).collect();
        assert_eq!(
            named,
            [
                (IssueKind::BadOutputName, vec![bad]),
                (IssueKind::BadOutputName, vec![clk]),
            ]
        );
        assert_eq!(issues[0].message, "bad output name \"a-b\"");
    }
}
