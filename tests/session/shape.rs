use bbopt::prelude::*;

use crate::in_memory;

#[test]
fn retyping_a_parameter_is_rejected() {
    let history = MemoryHistory::new();
    let mut first = in_memory(&history);
    first.randint("x", 0, 10, None).unwrap();
    first.minimize(1.0).unwrap();

    // Guess-only: the mismatch surfaces when the run is recorded.
    let mut second = in_memory(&history);
    second.uniform("x", 0.0, 10.0, None).unwrap();
    assert!(matches!(
        second.minimize(1.0),
        Err(Error::ParameterShapeMismatch { name, .. }) if name == "x"
    ));

    // With a backend: the mismatch surfaces at `run`.
    let mut third = in_memory(&history);
    third.uniform("x", 0.0, 10.0, None).unwrap();
    assert!(matches!(
        third.run("random"),
        Err(Error::ParameterShapeMismatch { .. })
    ));
    assert_eq!(history.len(), 1);
}

#[test]
fn renaming_a_parameter_is_rejected() {
    let history = MemoryHistory::new();
    let mut first = in_memory(&history);
    first.randint("x", 0, 10, None).unwrap();
    first.minimize(1.0).unwrap();

    let mut second = in_memory(&history);
    second.randint("y", 0, 10, None).unwrap();
    assert!(matches!(
        second.run("random"),
        Err(Error::ParameterShapeMismatch { name, .. }) if name == "y"
    ));
}

#[test]
fn bounds_may_change_between_runs() {
    let history = MemoryHistory::new();
    let mut first = in_memory(&history);
    first.randint("x", 0, 10, None).unwrap();
    first.minimize(1.0).unwrap();

    let mut second = in_memory(&history);
    second.randint("x", 0, 100, 50).unwrap();
    second.run("random").unwrap();
    let x = second.randint("x", 0, 100, 50).unwrap();
    assert!((0..=100).contains(&x));
    second.minimize(2.0).unwrap();
}

#[test]
fn run_first_scripts_adopt_history() {
    let history = MemoryHistory::new();
    let mut first = in_memory(&history);
    first.uniform("lr", 0.0, 1.0, 0.1).unwrap();
    first.getrandbits("seed", 8, None).unwrap();
    first.minimize(1.0).unwrap();

    let mut second = in_memory(&history);
    second.run("random").unwrap();
    assert_eq!(second.space().len(), 2);
    let lr = second.uniform("lr", 0.0, 1.0, 0.1).unwrap();
    let seed = second.getrandbits("seed", 8, None).unwrap();
    assert!((0.0..=1.0).contains(&lr));
    assert!((0..256).contains(&seed));
    second.minimize(0.5).unwrap();
    assert_eq!(history.len(), 2);
}

#[test]
fn invalid_declarations() {
    let history = MemoryHistory::new();
    let mut bb = in_memory(&history);
    for result in [
        bb.uniform("a", 1.0, 0.0, None).map(|_| ()),
        bb.randint("b", 0, 5, 6).map(|_| ()),
        bb.getrandbits("c", 0, None).map(|_| ()),
        bb.loguniform("d", 0.0, 1.0, None).map(|_| ()),
        bb.normalvariate("e", 0.0, -1.0, None).map(|_| ()),
        bb.choice("f", Vec::<&str>::new(), None).map(|_| ()),
    ] {
        assert!(matches!(result, Err(Error::InvalidDistribution { .. })));
    }
    assert!(bb.space().is_empty());
}

#[test]
fn custom_distributions_need_a_guess() {
    let history = MemoryHistory::new();
    let mut bb = in_memory(&history);
    let beta = Distribution::custom("beta", serde_json::json!({"a": 2, "b": 5}));
    assert!(matches!(
        bb.param("p", beta.clone(), None),
        Err(Error::InvalidDistribution { .. })
    ));
    assert_eq!(
        bb.param("p", beta, Some(0.3.into())).unwrap(),
        ParamValue::Float(0.3)
    );
    bb.run("random").unwrap();
    // Random sampling leaves custom parameters at their guess.
    assert_eq!(bb.proposal().unwrap()["p"], ParamValue::Float(0.3));
}
