use pretty_assertions::assert_eq;
use serde_json::json;
use structbind::{
    bind, bind_many, record, BindError, BoxError, ErrorKind, PathSegment, Target, UnmarshalValue,
    Value,
};

record! {
    #[derive(Debug, Default)]
    struct Line {
        #[tag("qty")]
        pub qty: u32,
    }
}

record! {
    #[derive(Debug, Default)]
    struct Order {
        pub items: Vec<Line>,
    }
}

#[test]
fn test_non_struct_destinations() {
    let mut n = 0i64;
    let err = bind(json!({"a": 1}), &mut n).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidDestination);

    let mut v: Vec<String> = Vec::new();
    let err = bind(json!({"a": 1}), &mut v).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidDestination);

    let mut v: Vec<u8> = Vec::new();
    let err = bind_many(json!([1]), &mut v).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidDestination);
}

#[test]
fn test_unsupported_sources() {
    let mut l = Line::default();
    let err = bind(json!(5), &mut l).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedSource);

    let err = bind("not json", &mut l).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedSource);

    let err = bind("[1, 2]", &mut l).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedSource);

    let mut many: Vec<Line> = Vec::new();
    let err = bind_many(json!({"qty": 1}), &mut many).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedSource);
}

#[test]
fn test_conversion_failure_carries_field_path() {
    let mut o = Order::default();
    let err = bind(json!({"items": [{"qty": 1}, {"qty": "x"}]}), &mut o).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conversion);
    assert_eq!(
        err.path(),
        &[
            PathSegment::Field("items".into()),
            PathSegment::Index(1),
            PathSegment::Field("qty".into()),
        ]
    );
    assert_eq!(err.to_string(), "items[1].qty: cannot convert x into u32");
}

#[test]
fn test_bind_many_reports_element_index() {
    let mut lines: Vec<Line> = Vec::new();
    let err = bind_many(json!([{"qty": 1}, {"qty": -3}]), &mut lines).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conversion);
    assert_eq!(
        err.path(),
        &[PathSegment::Index(1), PathSegment::Field("qty".into())]
    );
}

record! {
    #[derive(Debug, Default)]
    struct Triple {
        pub a: u8,
        pub b: u8,
        pub c: u8,
    }
}

#[test]
fn test_first_failure_aborts_remaining_fields() {
    let mut t = Triple::default();
    let err = bind(json!({"c": 3, "b": 300, "a": 1}), &mut t).unwrap_err();
    assert_eq!(err.path(), &[PathSegment::Field("b".into())]);
    // Fields bind in declaration order, so `a` went in and `c` never did.
    assert_eq!((t.a, t.b, t.c), (1, 0, 0));
}

#[derive(Debug, Default)]
struct Strict(String);

impl UnmarshalValue for Strict {
    fn unmarshal_value(&mut self, value: &Value) -> Result<(), BoxError> {
        match value.as_str() {
            Some(s) if s.starts_with("ok:") => {
                self.0 = s.to_string();
                Ok(())
            }
            _ => Err(format!("rejected {value}").into()),
        }
    }
}

impl Target for Strict {
    fn as_hook(&mut self) -> Option<&mut dyn UnmarshalValue> {
        Some(self)
    }
}

record! {
    #[derive(Debug, Default)]
    struct Guarded {
        pub token: Strict,
        pub tokens: Vec<Strict>,
    }
}

#[test]
fn test_hook_errors_are_final() {
    let mut g = Guarded::default();
    bind(json!({"token": "ok:1", "tokens": ["ok:2"]}), &mut g).unwrap();
    assert_eq!(g.token.0, "ok:1");
    assert_eq!(g.tokens[0].0, "ok:2");

    let err = bind(json!({"tokens": ["ok:3", 7]}), &mut g).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Hook);
    assert_eq!(
        err.path(),
        &[PathSegment::Field("tokens".into()), PathSegment::Index(1)]
    );
    match err.root() {
        BindError::Hook { source, .. } => assert_eq!(source.to_string(), "rejected 7"),
        other => panic!("unexpected {other:?}"),
    }
}

record! {
    #[derive(Debug, Default)]
    struct Flags {
        pub on: bool,
    }
}

#[test]
fn test_unknown_bool_text_is_rejected() {
    let mut f = Flags::default();
    let err = bind(json!({"on": "maybe"}), &mut f).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conversion);
    assert_eq!(err.path(), &[PathSegment::Field("on".into())]);
}
