use crate::context::Context;
use crate::dimension::Dim;
use crate::tuple::Tuple;
use crate::value::{Special, Value};

fn d(index: i32) -> Dim {
    Dim::from_index(index)
}

#[test]
fn test_lookup_unbound_is_dimension_error() {
    let k = Context::new();
    assert_eq!(k.lookup(d(0)), Value::Special(Special::DimensionError));
}

#[test]
fn test_lookup_bound() {
    let k = Context::new().with(d(0), Value::number(3));
    assert_eq!(k.lookup(d(0)), Value::number(3));
    assert!(k.contains(d(0)));
    assert!(!k.contains(d(1)));
}

#[test]
fn test_perturbation_restores_previous_value() {
    let mut k = Context::new().with(d(0), Value::number(1));
    {
        let perturbed = k.perturb([(d(0), Value::number(2))]);
        assert_eq!(perturbed.lookup(d(0)), Value::number(2));
    }
    assert_eq!(k.lookup(d(0)), Value::number(1));
}

#[test]
fn test_perturbation_removes_added_dimension() {
    let mut k = Context::new();
    {
        let perturbed = k.perturb([(d(4), Value::text("x"))]);
        assert!(perturbed.contains(d(4)));
    }
    assert!(!k.contains(d(4)));
    assert!(k.is_empty());
}

#[test]
fn test_repeated_dimension_unwinds_to_original() {
    let mut k = Context::new().with(d(0), Value::number(1));
    {
        let perturbed = k.perturb([(d(0), Value::number(2)), (d(0), Value::number(3))]);
        assert_eq!(perturbed.lookup(d(0)), Value::number(3));
        assert_eq!(perturbed.touched().collect::<Vec<_>>(), vec![d(0), d(0)]);
    }
    assert_eq!(k.lookup(d(0)), Value::number(1));
}

#[test]
fn test_nested_perturbations() {
    let mut k = Context::new().with(d(0), Value::number(1));
    let before = k.clone();
    {
        let mut outer = k.perturb([(d(0), Value::number(2)), (d(1), Value::number(5))]);
        {
            let inner = outer.perturb([(d(1), Value::number(6)), (d(2), Value::number(7))]);
            assert_eq!(inner.lookup(d(0)), Value::number(2));
            assert_eq!(inner.lookup(d(1)), Value::number(6));
            assert_eq!(inner.lookup(d(2)), Value::number(7));
        }
        assert_eq!(outer.lookup(d(1)), Value::number(5));
        assert!(!outer.contains(d(2)));
    }
    assert_eq!(k, before);
}

#[test]
fn test_with_perturbation_restores_on_early_return() {
    let mut k = Context::new().with(d(0), Value::number(1));
    let result: Result<(), &str> = k.with_perturbation([(d(0), Value::number(9))], |inner| {
        assert_eq!(inner.lookup(d(0)), Value::number(9));
        if inner.contains(d(0)) {
            return Err("bail");
        }
        Ok(())
    });
    assert!(result.is_err());
    assert_eq!(k.lookup(d(0)), Value::number(1));
}

#[test]
fn test_restriction_check() {
    let kappa = Context::new()
        .with(d(0), Value::number(1))
        .with(d(1), Value::number(2));
    let delta = Context::new().with(d(0), Value::number(1));
    assert_eq!(delta.check_restriction_of(&kappa), Ok(()));

    let wrong_value = Context::new().with(d(1), Value::number(3));
    assert_eq!(wrong_value.check_restriction_of(&kappa), Err(d(1)));

    let missing = Context::new().with(d(5), Value::number(1));
    assert_eq!(missing.check_restriction_of(&kappa), Err(d(5)));
}

#[test]
fn test_snapshot_round_trip() {
    let k = Context::new()
        .with(d(0), Value::number(1))
        .with(Dim::TIME, Value::number(10));
    let snapshot: Tuple = k.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(Context::from_tuple(&snapshot), k);
}
