use crate::dimension::{Dim, DimensionKey, DimensionSpace};
use crate::value::Value;

#[test]
fn test_names_are_interned_once() {
    let space = DimensionSpace::new();
    let a = space.intern_name("a");
    let b = space.intern_name("b");
    assert_ne!(a, b);
    assert_eq!(space.intern_name("a"), a);
    assert_eq!(a.index(), 0);
    assert_eq!(b.index(), 1);
    assert_eq!(space.len(), 2);
}

#[test]
fn test_builtin_names_map_to_reserved_indices() {
    let space = DimensionSpace::new();
    assert_eq!(space.intern_name("time"), Dim::TIME);
    assert_eq!(space.intern_name("priority"), Dim::PRIORITY);
    assert!(Dim::TIME.is_builtin());
    assert!(space.is_empty());
}

#[test]
fn test_typed_dimensions_are_distinct_from_names() {
    let space = DimensionSpace::new();
    let named = space.intern_name("3");
    let typed = space.intern_value(&Value::number(3));
    assert_ne!(named, typed);
    assert_eq!(space.intern_value(&Value::number(3)), typed);
    assert_eq!(space.key(typed), Some(DimensionKey::Typed(Value::number(3))));
}

#[test]
fn test_dimension_value_is_its_own_index() {
    let space = DimensionSpace::new();
    let a = space.intern_name("a");
    assert_eq!(space.intern_value(&Value::Dimension(a)), a);
    assert_eq!(space.len(), 1);
}

#[test]
fn test_lookup_name_does_not_allocate() {
    let space = DimensionSpace::new();
    assert_eq!(space.lookup_name("missing"), None);
    assert!(space.is_empty());
    assert_eq!(space.lookup_name("time"), Some(Dim::TIME));
}

#[test]
fn test_describe() {
    let space = DimensionSpace::new();
    let lang = space.intern_name("lang");
    let typed = space.intern_value(&Value::text("x"));
    assert_eq!(space.describe(lang), "lang");
    assert_eq!(space.describe(typed), "<\"x\">");
    assert_eq!(space.describe(Dim::TIME), "time");
    assert_eq!(space.describe(Dim::from_index(40)), "dim_40");
}
