use proptest::prelude::*;
use stately::{Machine, SignalKind, TransformError};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct SignalFields {
    kind: SignalKind,
    internal: bool,
    description: String,
    code: String,
}

#[derive(Debug, Clone)]
struct StateFields {
    is_virtual: bool,
    description: String,
    position: (i32, i32),
    code: String,
}

fn kind() -> impl Strategy<Value = SignalKind> {
    prop_oneof![
        Just(SignalKind::Input),
        Just(SignalKind::Statewise),
        Just(SignalKind::Expression),
    ]
}

fn text() -> impl Strategy<Value = String> {
    "[ -~\n]{0,16}"
}

fn signal() -> impl Strategy<Value = SignalFields> {
    (kind(), any::<bool>(), text(), text()).prop_map(|(kind, internal, description, code)| {
        SignalFields {
            kind,
            internal,
            description,
            code,
        }
    })
}

fn state() -> impl Strategy<Value = StateFields> {
    (any::<bool>(), text(), -500i32..500, -500i32..500, text()).prop_map(
        |(is_virtual, description, x, y, code)| StateFields {
            is_virtual,
            description,
            position: (x, y),
            code,
        },
    )
}

fn build(
    name: &str,
    signals: &BTreeMap<String, SignalFields>,
    states: &BTreeMap<String, StateFields>,
) -> Machine {
    let mut m = Machine::new(name);
    for (name, fields) in signals {
        let id = m.add_signal(name.as_str(), fields.kind);
        m.set_signal_internal(id, fields.internal);
        m.set_signal_description(id, fields.description.as_str());
        m.set_signal_source(id, fields.code.as_str());
    }
    for (name, fields) in states {
        let id = m.add_state(name.as_str());
        m.set_state_virtual(id, fields.is_virtual);
        m.set_state_description(id, fields.description.as_str());
        m.set_state_position(id, fields.position.0, fields.position.1);
        m.set_state_source(id, fields.code.as_str());
    }
    m
}

fn export_text(m: &Machine) -> String {
    m.export_commands(None)
        .iter()
        .map(|command| format!("{command}\n"))
        .collect()
}

proptest! {
    #[test]
    fn test_save_then_load_preserves_machine(
        name in "[ -~]{0,12}",
        signals in prop::collection::btree_map("[a-z][a-z0-9_]{0,6}", signal(), 0..5),
        states in prop::collection::btree_map("[A-Z][a-z0-9]{0,6}", state(), 0..5),
    ) {
        let m = build(&name, &signals, &states);
        let saved = m.save();
        let loaded = Machine::load(&saved).unwrap();
        prop_assert_eq!(loaded.name(), m.name());
        prop_assert_eq!(loaded.initial_state().is_some(), !states.is_empty());
        prop_assert_eq!(loaded.save(), saved);
    }

    #[test]
    fn test_export_then_import_rebuilds_machine(
        signals in prop::collection::btree_map("[a-z][a-z0-9_]{0,6}", signal(), 0..5),
        states in prop::collection::btree_map("[A-Z][a-z0-9]{0,6}", state(), 0..5),
    ) {
        let m = build("exported", &signals, &states);
        let rebuilt = Machine::new("blank").import_commands(&export_text(&m)).unwrap();
        prop_assert_eq!(rebuilt.save(), m.save());
    }
}

#[test]
fn test_import_onto_existing_machine_with_translation() {
    let mut base = Machine::new("base");
    base.add_signal("reset", SignalKind::Input);
    let a = base.add_state("A");
    base.set_state_position(a, 5, 5);
    base.set_state_source(a, "goto A");

    let mut part = Machine::new("part");
    let b = part.add_state("B");
    part.set_state_position(b, 2, 3);
    let mut commands = String::from("(translate 100 -10)\n");
    commands.push_str(
        &part
            .export_commands(None)
            .iter()
            .filter(|command| {
                let text = command.to_string();
                text.starts_with("(state ")
            })
            .map(|command| format!("{command}\n"))
            .collect::<String>(),
    );

    let merged = base.import_commands(&commands).unwrap();
    assert_eq!(merged.name(), "base");
    assert_eq!(merged.states().len(), 2);
    assert_eq!(merged.state_by_name("A").unwrap().position(), (5, 5));
    assert_eq!(merged.state_by_name("B").unwrap().position(), (102, -7));
    assert_eq!(merged.initial_state(), Some(a));
    assert_eq!(base.states().len(), 1);
}

#[test]
fn test_import_reports_innermost_bad_expression() {
    let m = Machine::new("m");
    let err = m
        .import_commands(r#"(name "ok") (state "S" "" 0 x 0 "")"#)
        .unwrap_err();
    assert!(matches!(&err, TransformError::Bad(sexp) if sexp.as_atom() == Some("x")));

    let err = m.import_commands(r#"(translate 1)"#).unwrap_err();
    assert_eq!(err.to_string(), "Bad: (translate 1)");

    let err = m.import_commands(r#"(name "unterminated)"#).unwrap_err();
    assert!(matches!(err, TransformError::Parse(_)));
}

#[test]
fn test_saved_machine_analyzes_the_same() {
    let mut m = Machine::new("loop");
    m.add_signal("reset", SignalKind::Input);
    let go = m.add_signal("go", SignalKind::Input);
    m.set_signal_description(go, "start \"now\"\nplease");
    let s = m.add_state("S");
    let t = m.add_state("T");
    m.set_state_source(s, "-- wait for go\nif go\n    goto T");
    m.set_state_source(t, "goto S");
    m.analyze();

    let mut loaded = Machine::load(&m.save()).unwrap();
    assert!(loaded.issues().is_empty());
    loaded.analyze();
    assert_eq!(loaded.status(), m.status());
    assert_eq!(
        loaded.signal_by_name("go").unwrap().description(),
        "start \"now\"\nplease"
    );
}
