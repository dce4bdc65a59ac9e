use crate::equation::{Definition, Provenance};
use crate::evaluator::Expr;
use crate::redefinition::{EquationEntry, TimeRange, Variable};
use crate::value::Value;
use crate::ContourError;
use std::rc::Rc;

fn entry(provenance: u64) -> Rc<EquationEntry> {
    Rc::new(EquationEntry::new(
        Provenance::new(provenance),
        Definition::new(Rc::new(Expr::Constant(Value::number(provenance as i64)))),
    ))
}

fn ranges(variable: &Variable) -> Vec<TimeRange> {
    variable.generations().iter().map(|g| g.range()).collect()
}

#[test]
fn test_time_range_contains() {
    let closed = TimeRange {
        start: 2,
        end: Some(5),
    };
    assert!(!closed.contains(1));
    assert!(closed.contains(2));
    assert!(closed.contains(4));
    assert!(!closed.contains(5));
    assert!(TimeRange::starting_at(2).contains(i64::MAX));
    assert_eq!(closed.to_string(), "[2, 5)");
    assert_eq!(TimeRange::starting_at(7).to_string(), "[7, ..)");
}

#[test]
fn test_each_install_opens_a_generation() {
    let mut variable = Variable::new("x");
    variable.install(entry(0), 0).unwrap();
    variable.install(entry(1), 5).unwrap();

    assert_eq!(
        ranges(&variable),
        vec![
            TimeRange {
                start: 0,
                end: Some(5)
            },
            TimeRange::starting_at(5)
        ]
    );
    let generations = variable.generations();
    assert_eq!(generations[0].len(), 1);
    assert_eq!(generations[1].len(), 2);
}

#[test]
fn test_installs_at_same_time_share_a_generation() {
    let mut variable = Variable::new("x");
    variable.install(entry(0), 3).unwrap();
    variable.install(entry(1), 3).unwrap();

    assert_eq!(ranges(&variable), vec![TimeRange::starting_at(3)]);
    assert_eq!(variable.latest().map(|g| g.len()), Some(2));
}

#[test]
fn test_install_before_latest_generation_is_fault() {
    let mut variable = Variable::new("x");
    variable.install(entry(0), 5).unwrap();
    let err = variable.install(entry(1), 4).unwrap_err();
    assert_eq!(
        err,
        ContourError::TimeRegression {
            requested: 4,
            latest: 5
        }
    );
}

#[test]
fn test_remove_opens_generation_without_equation() {
    let mut variable = Variable::new("x");
    variable.install(entry(0), 0).unwrap();
    variable.install(entry(1), 0).unwrap();

    assert!(variable.remove(Provenance::new(0), 2).unwrap());
    assert!(!variable.remove(Provenance::new(0), 3).unwrap());

    let generations = variable.generations();
    assert_eq!(generations.len(), 2);
    assert!(generations[0].contains(Provenance::new(0)));
    assert!(!generations[1].contains(Provenance::new(0)));
    assert!(generations[1].contains(Provenance::new(1)));
}

#[test]
fn test_replace_swaps_in_one_generation() {
    let mut variable = Variable::new("x");
    variable.install(entry(0), 0).unwrap();
    assert!(variable.replace(Provenance::new(0), entry(1), 1).unwrap());

    let latest = variable.latest().unwrap();
    assert!(!latest.contains(Provenance::new(0)));
    assert!(latest.contains(Provenance::new(1)));
    assert_eq!(variable.generations().len(), 2);
}

#[test]
fn test_lookup_outside_history_is_none() {
    let mut variable = Variable::new("x");
    assert!(variable.at(0, 7).is_none());
    variable.install(entry(0), 10).unwrap();
    assert!(variable.at(9, 7).is_none());
    assert!(variable.at(10, 7).is_some());
}

#[test]
fn test_linear_and_binary_lookup_agree() {
    let mut variable = Variable::new("x");
    for i in 0..20 {
        variable.install(entry(i), (i as i64) * 10).unwrap();
    }
    for time in 0..200 {
        let linear = variable.at(time, usize::MAX).map(|g| g.range());
        let binary = variable.at(time, 0).map(|g| g.range());
        assert_eq!(linear, binary, "time {}", time);
        let range = linear.unwrap();
        assert!(range.contains(time));
        assert_eq!(range.start, (time / 10) * 10);
    }
}
