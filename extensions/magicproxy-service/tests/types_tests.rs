use magicproxy_service::{
    RuntimeConfig, TypeRegistry, TypeResolutionError, TypeSource, TypeToken, builtin_types,
    type_arg,
};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Invoice;

#[test]
fn builtin_types_resolve_by_wire_name() {
    let token = builtin_types().resolve(&type_arg::<i32>()).unwrap();
    assert!(token.is::<i32>());
    assert!(!token.is::<i64>());

    assert!(builtin_types().resolve(&type_arg::<String>()).unwrap().is::<String>());
    assert!(builtin_types().resolve(&type_arg::<Invoice>()).is_none());
}

#[test]
fn config_consults_sources_after_builtins() {
    let registry = TypeRegistry::new().with::<Invoice>();
    let config = RuntimeConfig::default().with_type_source(Arc::new(registry));

    assert!(config.resolve_type(&type_arg::<Invoice>()).unwrap().is::<Invoice>());
    assert!(config.resolve_type(&type_arg::<f64>()).unwrap().is::<f64>());

    assert_eq!(
        config.resolve_type("no::such::Type"),
        Err(TypeResolutionError("no::such::Type".into()))
    );
}

#[test]
fn tokens_compare_by_type_identity() {
    assert_eq!(TypeToken::of::<u8>(), TypeToken::of::<u8>());
    assert_ne!(TypeToken::of::<u8>(), TypeToken::of::<i8>());
    assert_eq!(TypeToken::of::<Invoice>().name(), type_arg::<Invoice>());
}
