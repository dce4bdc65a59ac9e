use contour::{ContourError, ContourResult, Context, Demand, Dim, Special, System, Value};

fn factorial_system() -> ContourResult<System> {
    let mut system = System::new();
    system.define("fact @ [n <- 0] = 1", 0)?;
    system.define("fact | #n > 0 = #n * (fact @ [n <- #n - 1])", 0)?;
    Ok(system)
}

#[test]
fn test_fulfil_factorial() -> ContourResult<()> {
    let system = factorial_system()?;
    let n = system.dim("n");
    let kappa = Context::new().with(n, Value::number(3));
    assert_eq!(system.fulfil("fact", &kappa)?, Value::number(6));
    Ok(())
}

#[test]
fn test_full_and_fulfilled_resolution_agree() -> ContourResult<()> {
    let system = factorial_system()?;
    let n = system.dim("n");
    for i in 0..6 {
        let kappa = Context::new().with(n, Value::number(i));
        let full = system.resolve("fact", &mut kappa.clone())?;
        assert_eq!(system.fulfil("fact", &kappa)?, full);
    }
    Ok(())
}

#[test]
fn test_first_step_demands_queried_dimension() -> ContourResult<()> {
    let system = factorial_system()?;
    let n = system.dim("n");
    let mut kappa = Context::new().with(n, Value::number(3));
    let result = system.resolve_known("fact", &mut kappa, &mut Context::new())?;
    assert_eq!(result, Value::Demand(Demand::single(n)));
    Ok(())
}

#[test]
fn test_demand_for_time_when_full_context_binds_it() -> ContourResult<()> {
    let mut system = System::new();
    system.define("x = 1", 0)?;
    let mut kappa = Context::new().with(Dim::TIME, Value::number(4));
    let result = system.resolve_known("x", &mut kappa, &mut Context::new())?;
    assert_eq!(result, Value::Demand(Demand::single(Dim::TIME)));

    let mut delta = Context::new().with(Dim::TIME, Value::number(4));
    assert_eq!(system.resolve_known("x", &mut kappa, &mut delta)?, Value::number(1));
    Ok(())
}

#[test]
fn test_demands_from_both_operands_are_unioned() -> ContourResult<()> {
    let mut system = System::new();
    system.define("sum = #a + #b", 0)?;
    let a = system.dim("a");
    let b = system.dim("b");
    let mut kappa = Context::new()
        .with(a, Value::number(1))
        .with(b, Value::number(2));
    let result = system.resolve_known("sum", &mut kappa, &mut Context::new())?;
    let expected: Demand = [a, b].into_iter().collect();
    assert_eq!(result, Value::Demand(expected));
    assert_eq!(system.fulfil("sum", &kappa)?, Value::number(3));
    Ok(())
}

#[test]
fn test_demand_beats_special() -> ContourResult<()> {
    let mut system = System::new();
    system.define(r#"mixed = ("a" * 2) + #q"#, 0)?;
    let q = system.dim("q");
    let mut kappa = Context::new().with(q, Value::number(1));
    let result = system.resolve_known("mixed", &mut kappa, &mut Context::new())?;
    assert_eq!(result, Value::Demand(Demand::single(q)));
    assert_eq!(system.fulfil("mixed", &kappa)?, Value::Special(Special::TypeError));
    Ok(())
}

#[test]
fn test_unfulfillable_demand_is_dimension_error() -> ContourResult<()> {
    let mut system = System::new();
    system.define("needs = #missing", 0)?;
    assert_eq!(
        system.fulfil("needs", &Context::new())?,
        Value::Special(Special::DimensionError)
    );
    Ok(())
}

#[test]
fn test_full_context_query_of_unbound_dimension() -> ContourResult<()> {
    let mut system = System::new();
    system.define("needs = #missing", 0)?;
    assert_eq!(
        system.resolve("needs", &mut Context::new())?,
        Value::Special(Special::DimensionError)
    );
    Ok(())
}

#[test]
fn test_known_context_must_restrict_full_context() -> ContourResult<()> {
    let mut system = System::new();
    system.define("x = 1", 0)?;
    let d = system.dim("d");
    let mut kappa = Context::new().with(d, Value::number(1));
    let mut delta = Context::new().with(d, Value::number(2));

    match system.resolve_known("x", &mut kappa, &mut delta) {
        Err(ContourError::InconsistentContexts(dim)) => assert_eq!(dim, d),
        other => panic!("Expected inconsistent contexts, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_contexts_are_restored_after_demand() -> ContourResult<()> {
    let system = factorial_system()?;
    let n = system.dim("n");
    let mut kappa = Context::new().with(n, Value::number(4));
    let mut delta = Context::new().with(n, Value::number(4));
    let before = (kappa.clone(), delta.clone());

    assert_eq!(system.resolve_known("fact", &mut kappa, &mut delta)?, Value::number(24));
    assert_eq!((kappa, delta), before);
    Ok(())
}

#[test]
fn test_backward_time_change_is_access_error() -> ContourResult<()> {
    let mut system = System::new();
    system.define("now = 1", 0)?;
    system.define("past = now @ [time <- #time - 1]", 0)?;
    system.define("future = now @ [time <- #time + 1]", 0)?;

    let mut k = Context::new().with(Dim::TIME, Value::number(5));
    assert_eq!(
        system.resolve("past", &mut k)?,
        Value::Special(Special::AccessError)
    );
    assert_eq!(system.resolve("future", &mut k)?, Value::number(1));
    Ok(())
}
