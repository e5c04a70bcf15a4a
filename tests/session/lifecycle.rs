use bbopt::prelude::*;

use crate::in_memory;

#[test]
fn run_is_idempotent() {
    let history = MemoryHistory::new();
    let mut bb = in_memory(&history);
    bb.uniform("x", -5.0, 5.0, None).unwrap();
    bb.randint("n", 0, 100, None).unwrap();

    let first = bb.run("random").unwrap().clone();
    let second = bb.run("random").unwrap().clone();
    let third = bb.run("gp").unwrap().clone();
    assert_eq!(first, second);
    assert_eq!(first, third);
    assert_eq!(bb.proposal(), Some(&first));
}

#[test]
fn accessors_return_the_proposal_after_run() {
    let history = MemoryHistory::new();
    let mut bb = in_memory(&history);
    bb.uniform("x", -5.0, 5.0, 0.0).unwrap();

    let config = BackendConfig::new().with("seed", 3);
    let proposed = bb.run_with_config("random", &config).unwrap()["x"]
        .as_f64()
        .unwrap();
    assert_eq!(bb.state(), SessionState::Active);
    assert_eq!(bb.uniform("x", -5.0, 5.0, 0.0).unwrap(), proposed);
    assert_eq!(bb.get_current_run().get_f64("x").unwrap(), proposed);
    assert_eq!(bb.get_current_run().backend.as_deref(), Some("random"));
}

#[test]
fn late_declaration_is_rejected() {
    let history = MemoryHistory::new();
    let mut bb = in_memory(&history);
    bb.uniform("x", 0.0, 1.0, None).unwrap();
    bb.run("random").unwrap();

    assert!(matches!(
        bb.randint("y", 0, 3, None),
        Err(Error::LateParameterDeclaration { name }) if name == "y"
    ));
}

#[test]
fn unknown_backend_fails_at_run() {
    let history = MemoryHistory::new();
    let mut bb = in_memory(&history);
    bb.uniform("x", 0.0, 1.0, None).unwrap();

    assert!(matches!(
        bb.run("hill-climbing"),
        Err(Error::UnknownBackend(name)) if name == "hill-climbing"
    ));
    // Nothing changed; a known backend still activates.
    assert_eq!(bb.state(), SessionState::Declaring);
    assert!(bb.run("guess").is_ok());
}

#[test]
fn finalized_session_accepts_only_queries() {
    let history = MemoryHistory::new();
    let mut bb = in_memory(&history);
    bb.randint("x", 1, 3, None).unwrap();
    bb.run("random").unwrap();
    bb.minimize(1.0).unwrap();

    assert!(matches!(
        bb.randint("x", 1, 3, None),
        Err(Error::InvalidState { .. })
    ));
    assert!(matches!(bb.maximize(1.0), Err(Error::ObjectiveAlreadySet)));
    // `run` keeps returning the committed proposal.
    assert!(bb.run("random").is_ok());
    assert_eq!(bb.n_runs().unwrap(), 1);
    assert_eq!(bb.get_current_run().sequence_index, Some(0));
}

#[test]
fn custom_backends_can_be_registered() {
    let history = MemoryHistory::new();
    let mut registry = BackendRegistry::default();
    registry.register("always-guess", |_: &BackendConfig| Box::new(GuessBackend));

    let mut bb = Session::builder("registry.rs")
        .store(history)
        .registry(registry)
        .build()
        .unwrap();
    bb.choice("opt", ["sgd", "adam"], "adam").unwrap();
    bb.run("always-guess").unwrap();
    assert_eq!(
        bb.choice("opt", ["sgd", "adam"], "adam").unwrap(),
        ParamValue::from("adam")
    );
}

#[test]
fn one_session_per_trial() {
    let history = MemoryHistory::new();
    for trial in 0..5 {
        let mut bb = in_memory(&history);
        bb.uniform("x", 0.0, 1.0, None).unwrap();
        bb.run("random").unwrap();
        let x = bb.uniform("x", 0.0, 1.0, None).unwrap();
        bb.remember([("trial", trial)]).unwrap();
        bb.minimize(x).unwrap();
    }
    let runs = in_memory(&history).history().unwrap();
    let indices: Vec<_> = runs.iter().map(|r| r.sequence_index.unwrap()).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
}
