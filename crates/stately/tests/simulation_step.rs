use stately::{FixedInputs, Machine, MachineStatus, SignalKind, Simulator, StateId};

fn handshake() -> Machine {
    let mut m = Machine::new("handshake");
    m.add_signal("reset", SignalKind::Input);
    m.add_signal("go", SignalKind::Input);
    m.add_signal("out", SignalKind::Statewise);
    let a = m.add_state("A");
    let b = m.add_state("B");
    m.set_state_source(a, "if go\n    emit out\n    goto B\n");
    m.set_state_source(b, "goto A\n");
    m.analyze();
    assert_eq!(m.status(), MachineStatus::Happy, "{:?}", m.issues());
    m
}

fn state(m: &Machine, name: &str) -> StateId {
    m.state_by_name(name).unwrap().id()
}

fn inputs(go: bool, reset: bool) -> FixedInputs {
    FixedInputs::from_iter([("go", go), ("reset", reset)])
}

#[test]
fn test_idle_at_a_without_go() {
    let m = handshake();
    let out = m.signal_by_name("out").unwrap().id();
    let mut sim = Simulator::new(&m).unwrap();
    sim.set_input_source(inputs(false, false));
    assert_eq!(sim.current_state(), Some(state(&m, "A")));
    assert_eq!(sim.next_state(), Some(state(&m, "A")));
    assert_eq!(sim.value(out), Some(false));
}

#[test]
fn test_go_moves_to_b_and_back() {
    let m = handshake();
    let out = m.signal_by_name("out").unwrap().id();
    let mut sim = Simulator::new(&m).unwrap();

    sim.set_input_source(inputs(true, false));
    assert_eq!(sim.next_state(), Some(state(&m, "B")));
    assert_eq!(sim.value(out), Some(true));
    let transition = sim.transition().unwrap();
    assert_eq!(transition.path, [state(&m, "A"), state(&m, "B")]);

    assert!(sim.step_forward());
    sim.set_input_source(inputs(false, false));
    assert_eq!(sim.current_state(), Some(state(&m, "B")));
    assert_eq!(sim.next_state(), Some(state(&m, "A")));
    assert_eq!(sim.value(out), Some(false));
}

#[test]
fn test_reset_overrides_transitions() {
    let m = handshake();
    let mut sim = Simulator::builder(&m)
        .start_state(state(&m, "B"))
        .input_source(inputs(true, true))
        .build()
        .unwrap();
    assert_eq!(sim.next_state(), Some(state(&m, "A")));
    assert!(sim.transition().is_none());

    sim.set_state(Some(state(&m, "A")));
    assert_eq!(sim.next_state(), Some(state(&m, "A")));
    assert!(sim.transition().is_none());
}

#[test]
fn test_backward_reads_current_inputs() {
    let m = handshake();
    let mut sim = Simulator::builder(&m)
        .input_source(inputs(true, false))
        .build()
        .unwrap();
    assert!(sim.step_forward());
    assert!(sim.step_forward());
    assert_eq!(sim.history().len(), 2);
    assert_eq!(sim.current_state(), Some(state(&m, "A")));

    sim.set_input_source(inputs(false, false));
    assert!(sim.step_backward());
    assert_eq!(sim.current_state(), Some(state(&m, "B")));
    assert!(sim.step_backward());
    assert_eq!(sim.current_state(), Some(state(&m, "A")));
    assert_eq!(sim.next_state(), Some(state(&m, "A")));
    assert!(sim.history().is_empty());
}

#[test]
fn test_waveform_and_vcd_of_a_run() {
    let m = handshake();
    let mut sim = Simulator::builder(&m)
        .waveform_label_width(8)
        .input_source(inputs(true, false))
        .build()
        .unwrap();
    for _ in 0..3 {
        assert!(sim.step_forward());
    }

    let wave = sim.waveform();
    let lines: Vec<&str> = wave.lines().collect();
    assert_eq!(
        lines,
        [
            "        ______",
            "     go       ",
            "        __   _",
            "    out   \\_/ ",
            "              ",
            "  reset ______",
        ]
    );

    let vcd = String::from_utf8(sim.write_vcd(Vec::new()).unwrap()).unwrap();
    let changes: Vec<&str> = vcd
        .lines()
        .skip_while(|line| *line != "$enddefinitions $end")
        .skip(1)
        .collect();
    assert_eq!(changes, ["#0", "1!", "1\"", "0#", "#1", "0\"", "#2", "1\""]);
}

#[test]
fn test_mutation_requires_reanalysis() {
    let mut m = handshake();
    let b = state(&m, "B");
    m.set_state_source(b, "goto Nowhere");
    assert!(Simulator::new(&m).is_err());
    m.analyze();
    assert_eq!(m.status(), MachineStatus::Uncompiled);
    assert!(Simulator::new(&m).is_err());
}
