use contour::{ContourError, Definition, ResourceLimits, System};

#[test]
fn test_definition_size_limit() {
    let limits = ResourceLimits {
        max_source_bytes: 32,
        ..ResourceLimits::default()
    };
    let mut system = System::with_limits(limits);

    let long = format!("x = {}", vec!["1"; 40].join(" + "));
    match system.define(&long, 0) {
        Err(ContourError::ResourceLimitExceeded { limit_name, .. }) => {
            assert_eq!(limit_name, "max_source_bytes");
        }
        other => panic!("Expected ResourceLimitExceeded error, got {:?}", other),
    }
    assert!(system.define("x = 1 + 2", 0).is_ok());
}

#[test]
fn test_raw_definition_size_checked_at_install() {
    let limits = ResourceLimits {
        max_source_bytes: 16,
        ..ResourceLimits::default()
    };
    let mut system = System::with_limits(limits);

    let definition = Definition::raw("1".repeat(10)).with_raw_guard("[a <- 1, b <- 2]");
    assert!(matches!(
        system.install_equation("x", definition, 0),
        Err(ContourError::ResourceLimitExceeded { .. })
    ));
    assert_eq!(system.variables().count(), 0);
}

#[test]
fn test_expression_depth_limit() {
    let limits = ResourceLimits {
        max_expression_depth: 10,
        ..ResourceLimits::default()
    };
    let mut system = System::with_limits(limits);

    let deep = format!("x = {}1{}", "(".repeat(20), ")".repeat(20));
    assert!(matches!(
        system.define(&deep, 0),
        Err(ContourError::ResourceLimitExceeded { .. })
    ));
}

#[test]
fn test_limits_from_json() {
    let limits = ResourceLimits::from_json(r#"{"max_resolution_depth": 64}"#).unwrap();
    assert_eq!(limits.max_resolution_depth, 64);
    assert_eq!(limits.max_source_bytes, ResourceLimits::default().max_source_bytes);

    assert!(matches!(
        ResourceLimits::from_json("{not json"),
        Err(ContourError::Engine(_))
    ));
}

#[test]
fn test_default_limits() {
    let limits = ResourceLimits::default();
    assert_eq!(limits.max_resolution_depth, 48);
    assert_eq!(limits.max_expression_depth, 100);
    assert_eq!(limits, ResourceLimits::new());
}
