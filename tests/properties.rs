use proptest::prelude::*;
use serde_json::json;
use structbind::{bind, match_key, record, FieldDef, MatchPolicy, MatchRule, TypeDescriptor};

fn scalar() -> Option<&'static TypeDescriptor> {
    None
}

fn words() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{1,6}", 1..4)
}

record! {
    #[derive(Debug, Default)]
    struct Vault {
        secret: i64,
        pub label: String,
    }
}

proptest! {
    #[test]
    fn separator_and_case_variants_reach_the_declared_name(
        parts in words(),
        sep in prop::sample::select(vec!["", "_", "-", "."]),
        upper in any::<bool>(),
    ) {
        let declared: &'static str = Box::leak(parts.join("_").into_boxed_str());
        let schema = TypeDescriptor::build("Probe", &[FieldDef::new(declared, true, scalar)]);

        let mut key = parts.join(sep);
        if upper {
            key = key.to_uppercase();
        }
        let (pos, rule) = match_key(&key, &schema, &MatchPolicy::default()).unwrap();
        prop_assert_eq!(pos, 0);
        prop_assert!(matches!(rule, MatchRule::NameExact | MatchRule::NameFold));
    }

    #[test]
    fn private_fields_are_never_written(
        key in "[sS][eE][cC][rR][eE][tT]",
        value in any::<i64>(),
    ) {
        let mut v = Vault { secret: 42, label: String::new() };
        bind(json!({ key: value, "label": "l" }), &mut v).unwrap();
        prop_assert_eq!(v.secret, 42);
        prop_assert_eq!(v.label.as_str(), "l");
    }

    #[test]
    fn numeric_text_binds_into_integers(n in any::<u32>(), pad in " {0,2}") {
        record! {
            #[derive(Debug, Default)]
            struct Counter {
                #[tag("n,string")]
                pub n: u32,
            }
        }

        let mut c = Counter::default();
        bind(json!({"n": format!("{pad}{n}{pad}")}), &mut c).unwrap();
        prop_assert_eq!(c.n, n);
    }
}
