use stately::{
    EmitError, EmitOptions, IssueKind, Machine, MachineStatus, SignalKind, check_names, emit,
};

fn handshake() -> Machine {
    let mut m = Machine::new("handshake");
    m.add_signal("reset", SignalKind::Input);
    m.add_signal("go", SignalKind::Input);
    m.add_signal("out", SignalKind::Statewise);
    let a = m.add_state("A");
    let b = m.add_state("B");
    m.set_state_source(a, "if go\n    emit out\n    goto B");
    m.set_state_source(b, "goto A");
    m.analyze();
    assert_eq!(m.status(), MachineStatus::Happy, "{:?}", m.issues());
    m
}

#[test]
fn test_handshake_fl() {
    let m = handshake();
    let text = emit(&m, &EmitOptions::default()).unwrap();
    insta::assert_snapshot!(text.trim_end(), @r#"
    // handshake (autogenerated by Stately)

    cload "ste.fl";

    ENUM "handshake_state"
        [ "A"
        , "B"
        ];

    let handshake =
        // clock
        bit_input clk.
        // inputs
        bit_input go.
        bit_input reset.
        // outputs
        bit_output out.
        // internals
        // state
        handshake_state_internal state.
        CELL "draw_hier handshake"
            [ Moore_FSM "handshake_moore" clk state ((((is_A state) '&' reset) '|' ((is_B state) '&' reset)), A)
                  [ A --- go --- B
                  , B --- '1 --- A
                  ]
            , out <- ((is_A state) '&' go)
            ];
    "#);
}

#[test]
fn test_options_and_signal_sections() {
    let mut m = Machine::new("door lock");
    m.add_signal("reset", SignalKind::Input);
    m.add_signal("key", SignalKind::Input);
    let busy = m.add_signal("busy", SignalKind::Expression);
    m.set_signal_internal(busy, true);
    m.set_signal_source(busy, "(and key (state_is \"Open\"))");
    let open = m.add_signal("open", SignalKind::Statewise);
    m.set_signal_internal(open, false);
    let closed = m.add_state("Closed");
    let opened = m.add_state("Open");
    m.set_state_source(closed, "if key\n    goto Open");
    m.set_state_source(opened, "emit open\nif busy\n    goto Closed");
    m.analyze();
    assert_eq!(m.status(), MachineStatus::Happy, "{:?}", m.issues());

    let options = EmitOptions {
        clock: "ck".to_string(),
        state_variable: "st".to_string(),
        libraries: Vec::new(),
    };
    let text = emit(&m, &options).unwrap();
    let lines: Vec<&str> = text.lines().map(str::trim).collect();

    assert!(!text.contains("cload"));
    assert_eq!(lines[0], "// door lock (autogenerated by Stately)");
    assert!(lines.contains(&"ENUM \"door_lock_state\""));
    assert!(lines.contains(&"let door_lock ="));
    assert!(lines.contains(&"bit_input ck."));
    assert!(lines.contains(&"bit_output open."));
    assert!(lines.contains(&"bit_internal busy."));
    assert!(lines.contains(&"door_lock_state_internal st."));
    assert!(lines.contains(&"[ \"CLOSED\""));
    assert!(lines.contains(&"[ CLOSED --- key --- OPEN"));
    assert!(lines.iter().any(|line| line.starts_with("[ Moore_FSM \"door_lock_moore\" ck st (")));
    assert!(lines.iter().any(|line| line.starts_with(", busy <- ")));
    assert!(lines.iter().any(|line| line.starts_with(", open <- ")));

    let internals = lines.iter().position(|line| *line == "// internals").unwrap();
    let outputs = lines.iter().position(|line| *line == "// outputs").unwrap();
    let busy_line = lines.iter().position(|line| *line == "bit_internal busy.").unwrap();
    assert!(outputs < internals && internals < busy_line);
}

#[test]
fn test_refuses_troublesome_machine() {
    let mut m = handshake();
    let b = m.state_by_name("B").unwrap().id();
    m.set_state_source(b, "emit out\nemit out\ngoto A");
    m.analyze();
    assert_eq!(m.status(), MachineStatus::Troublesome);
    let err = emit(&m, &EmitOptions::default()).unwrap_err();
    assert_eq!(
        err,
        EmitError::NotHappy {
            status: MachineStatus::Troublesome
        }
    );
}

#[test]
fn test_name_check_against_configured_names() {
    let mut m = handshake();
    let options = EmitOptions {
        clock: "go".to_string(),
        ..EmitOptions::default()
    };
    let go = m.signal_by_name("go").unwrap().id();
    let issues = check_names(&m, &options);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, IssueKind::BadOutputName);
    assert_eq!(issues[0].signals, [go]);

    m.add_state("a");
    let issues = check_names(&m, &EmitOptions::default());
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, IssueKind::OutputNameConflicts);
    assert_eq!(issues[0].states.len(), 2);
    assert!(issues[0].signals.is_empty());
}
