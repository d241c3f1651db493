//! Binds dynamically shaped values (mappings, sequences, raw JSON text,
//! snapshots of other structs) into statically typed structs.
//!
//! Source keys are resolved to fields by tag name first, then by declared
//! name, with case-insensitive and separator-insensitive fallbacks. Embedded
//! structs are flattened, private fields are never written, and types can
//! take over their own conversion through [`UnmarshalValue`].

pub mod containers;
pub mod context;
pub mod descriptor;
pub mod engine;
pub mod errors;
pub mod hook;
pub mod leaf;
pub mod matcher;
pub mod target;
pub mod value;

pub use context::{BindOptions, Context, MatchPolicy};
pub use descriptor::{describe, FieldDef, FieldDescriptor, TypeDescriptor};
pub use engine::to_value;
pub use errors::{BindError, BoxError, ErrorKind, PathSegment, Result};
pub use leaf::RawJson;
pub use matcher::{match_key, MatchRule};
pub use target::{Record, Target, UnmarshalValue};
pub use value::{Map, Source, Value};

/// Binds sources with a fixed set of options.
#[derive(Debug, Clone, Default)]
pub struct Binder {
    options: BindOptions,
}

impl Binder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: BindOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &BindOptions {
        &self.options
    }

    /// Populates `dest` from `source`. `dest` must be a struct or a pointer
    /// (`Option`/`Box`, nested freely) to one. Unmatched keys and fields are
    /// skipped; the first failing field aborts the call.
    pub fn bind<D: Target>(&self, source: impl Into<Source>, dest: &mut D) -> Result<()> {
        let mut cx = Context::new(&self.options);
        engine::bind_root(source.into(), dest, &mut cx)
    }

    /// Resizes `dest` to the length of the source sequence and binds each
    /// element in turn. A failure is reported with the element index.
    pub fn bind_many<T: Target + Default>(
        &self,
        source: impl Into<Source>,
        dest: &mut Vec<T>,
    ) -> Result<()> {
        let mut cx = Context::new(&self.options);
        engine::bind_many_root(source.into(), dest, &mut cx)
    }
}

/// Convenience: bind with default options.
pub fn bind<D: Target>(source: impl Into<Source>, dest: &mut D) -> Result<()> {
    Binder::new().bind(source, dest)
}

/// Convenience: bind a sequence with default options.
pub fn bind_many<T: Target + Default>(source: impl Into<Source>, dest: &mut Vec<T>) -> Result<()> {
    Binder::new().bind_many(source, dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    crate::record! {
        #[derive(Debug, Default, PartialEq)]
        struct Profile {
            #[tag("n1")]
            pub name: String,
            pub age: u8,
        }
    }

    #[test]
    fn binds_with_default_options() {
        let mut p = Profile::default();
        bind(json!({"N1": "ann", "AGE": "33"}), &mut p).unwrap();
        assert_eq!(
            p,
            Profile {
                name: "ann".into(),
                age: 33
            }
        );
    }

    #[test]
    fn name_fallback_can_be_disabled() {
        let binder = Binder::new().with_options(BindOptions {
            name_fallback: false,
            ..BindOptions::default()
        });
        let mut p = Profile::default();
        binder.bind(json!({"name": "ann", "age": 1}), &mut p).unwrap();
        assert_eq!(p.name, "");
        assert_eq!(p.age, 1);
    }

    #[test]
    fn non_struct_destination_is_rejected() {
        let mut n = 0u32;
        let err = bind(json!({"a": 1}), &mut n).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDestination);
    }
}
