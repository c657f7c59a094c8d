use snapset::{ForestConfig, Session, SessionConfig, SessionError};

fn seeded(seed: u64) -> Session {
    Session::with_config(SessionConfig {
        forest: ForestConfig {
            seed: Some(seed),
            ..ForestConfig::default()
        },
        ..SessionConfig::default()
    })
}

fn replay(input: &str) -> String {
    let mut out = Vec::new();
    seeded(1).run(input.as_bytes(), &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn cursor_walk() {
    let input = "0 0 5\n0 0 10\n0 0 15\n3 0 10\n5\n5\n6\n";
    assert_eq!(replay(input), "true\n5\n-1\n-1\n");
}

#[test]
fn snapshot_then_diverge() {
    let input = "0 0 1 0 0 2 0 0 3 2 0 1 0 2 4 0 1 3 4 1 1 3";
    assert_eq!(replay(input), "2\n3\n");
}

#[test]
fn full_walk_over_a_version() {
    let input = "0 0 30 0 0 10 0 0 20 3 0 10 6 6 6 5";
    assert_eq!(replay(input), "true\n20\n30\n-1\n-1\n");
}

#[test]
fn range_bounds_are_inclusive() {
    let input = "0 0 1 0 0 5 0 0 9 4 0 1 9 4 0 2 8 4 0 5 5 4 0 9 1 4 3 0 100";
    // Version 3 does not exist yet, so the last command is rejected.
    let mut out = Vec::new();
    let err = seeded(2).run(input.as_bytes(), &mut out).unwrap_err();
    assert_eq!(String::from_utf8(out).unwrap(), "3\n1\n1\n0\n");
    assert!(matches!(err, SessionError::UnknownVersion { version: 3, versions: 1 }));
}

#[test]
fn replies_do_not_depend_on_the_seed() {
    let input: String = (0..200)
        .map(|i| match i % 5 {
            0 | 1 => format!("0 {} {}\n", i % 3, (i * 37) % 101),
            2 => format!("3 {} {}\n", i % 3, (i * 11) % 101),
            3 => format!("4 {} {} {}\n", i % 3, i % 50, 50 + i % 50),
            _ => format!("{}\n", 5 + i % 2),
        })
        .collect();

    let outputs: Vec<String> = [1, 2, 3]
        .into_iter()
        .map(|seed| {
            let mut out = Vec::new();
            seeded(seed).run(input.as_bytes(), &mut out).unwrap();
            String::from_utf8(out).unwrap()
        })
        .collect();
    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[1], outputs[2]);
}

#[test]
fn parse_errors_surface() {
    let mut out = Vec::new();
    let err = seeded(3).run("0 0 1 9".as_bytes(), &mut out).unwrap_err();
    assert!(matches!(err, SessionError::UnknownOpcode(9)));

    let err = seeded(3).run("3 0".as_bytes(), &mut out).unwrap_err();
    assert!(matches!(err, SessionError::MissingArgument { opcode: 3 }));

    let err = seeded(3).run("3 0 1.5".as_bytes(), &mut out).unwrap_err();
    assert_eq!(err.to_string(), "expected an integer, found \"1.5\"");
}

#[test]
fn empty_input_is_fine() {
    let mut out = Vec::new();
    assert_eq!(seeded(4).run("".as_bytes(), &mut out).unwrap(), 0);
    assert!(out.is_empty());
}
