//! Destination capabilities.
//!
//! Every bindable type implements [`Target`]. Structs additionally implement
//! [`Record`], usually through the [`record!`](crate::record) macro, and any
//! type may opt into custom conversion with [`UnmarshalValue`].

use std::any::Any;

use crate::context::Context;
use crate::descriptor::{FieldDef, TypeDescriptor};
use crate::errors::{BindError, BoxError, Result};
use crate::value::Value;

/// Something a source value can be bound into.
pub trait Target: Any {
    /// Standard coercion. Only called when [`Target::as_hook`] returns `None`.
    fn coerce_from(&mut self, value: &Value, _cx: &mut Context) -> Result<()> {
        Err(BindError::conversion(value.kind_name(), self.target_name()))
    }

    /// Snapshot used when this value is itself a source.
    fn to_value(&self) -> Value {
        Value::Null
    }

    fn target_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Capability query for a custom conversion hook.
    fn as_hook(&mut self) -> Option<&mut dyn UnmarshalValue> {
        None
    }

    /// Capability query for struct-shaped destinations. Pointer-like types
    /// allocate their pointee when it is a struct.
    fn as_record_mut(&mut self) -> Option<&mut dyn Record> {
        None
    }

    fn as_record(&self) -> Option<&dyn Record> {
        None
    }

    /// The struct schema, when `Self` (or what it points to) is a struct.
    fn record_descriptor() -> Option<&'static TypeDescriptor>
    where
        Self: Sized,
    {
        None
    }
}

/// A struct with a reflected schema and positional field access.
pub trait Record: Target {
    /// Field declarations in source order.
    fn field_defs() -> Vec<FieldDef>
    where
        Self: Sized;

    fn descriptor(&self) -> &'static TypeDescriptor;

    fn field_mut(&mut self, index: usize) -> Option<&mut dyn Target>;

    fn field_ref(&self, index: usize) -> Option<&dyn Target>;
}

/// Opt-in custom conversion. When present, the raw source value is handed
/// over untouched and the outcome is final.
pub trait UnmarshalValue {
    fn unmarshal_value(&mut self, value: &Value) -> std::result::Result<(), BoxError>;
}

/// Declares a struct and makes it bindable.
///
/// Fields marked `pub` (any form) are exported; others are private and never
/// written. `#[tag("name,opt")]` sets the wire name and options, `#[embed]`
/// promotes the fields of a nested struct. Doc comments on fields are kept.
///
/// ```
/// structbind::record! {
///     #[derive(Debug, Default)]
///     pub struct Item {
///         /// Numeric id, sent as text.
///         #[tag("id,string")]
///         pub id: u64,
///         pub name: String,
///     }
/// }
///
/// let mut item = Item::default();
/// structbind::bind(serde_json::json!({"id": "7", "NAME": "x"}), &mut item).unwrap();
/// assert_eq!((item.id, item.name.as_str()), (7, "x"));
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fattr:ident $($fargs:tt)*])*
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[doc = $crate::__record_doc!($fattr $($fargs)*)])*
                $fvis $field: $ty
            ),*
        }

        impl $crate::Target for $name {
            fn coerce_from(
                &mut self,
                value: &$crate::Value,
                cx: &mut $crate::Context,
            ) -> $crate::errors::Result<()> {
                $crate::engine::coerce_record(self, value, cx)
            }

            fn to_value(&self) -> $crate::Value {
                $crate::engine::to_value(self)
            }

            fn as_record_mut(&mut self) -> ::std::option::Option<&mut dyn $crate::Record> {
                ::std::option::Option::Some(self)
            }

            fn as_record(&self) -> ::std::option::Option<&dyn $crate::Record> {
                ::std::option::Option::Some(self)
            }

            fn record_descriptor() -> ::std::option::Option<&'static $crate::TypeDescriptor> {
                ::std::option::Option::Some($crate::describe::<Self>())
            }
        }

        impl $crate::Record for $name {
            fn field_defs() -> ::std::vec::Vec<$crate::FieldDef> {
                ::std::vec![$({
                    let def = $crate::FieldDef::new(
                        stringify!($field),
                        !stringify!($fvis).is_empty(),
                        <$ty as $crate::Target>::record_descriptor,
                    );
                    $(let def = $crate::__record_attr!(def; $fattr $($fargs)*);)*
                    def
                }),*]
            }

            fn descriptor(&self) -> &'static $crate::TypeDescriptor {
                $crate::describe::<Self>()
            }

            fn field_mut(&mut self, index: usize) -> ::std::option::Option<&mut dyn $crate::Target> {
                #[allow(non_camel_case_types, dead_code)]
                enum Slot { $($field),* }
                match index {
                    $(i if i == Slot::$field as usize => {
                        ::std::option::Option::Some(&mut self.$field as &mut dyn $crate::Target)
                    })*
                    _ => ::std::option::Option::None,
                }
            }

            fn field_ref(&self, index: usize) -> ::std::option::Option<&dyn $crate::Target> {
                #[allow(non_camel_case_types, dead_code)]
                enum Slot { $($field),* }
                match index {
                    $(i if i == Slot::$field as usize => {
                        ::std::option::Option::Some(&self.$field as &dyn $crate::Target)
                    })*
                    _ => ::std::option::Option::None,
                }
            }
        }
    };
}

/// Applies one `record!` field attribute to its [`FieldDef`].
#[doc(hidden)]
#[macro_export]
macro_rules! __record_attr {
    ($def:expr; tag($tag:literal)) => {
        $def.tag($tag)
    };
    ($def:expr; embed) => {
        $def.embed()
    };
    ($def:expr; doc = $doc:literal) => {
        $def
    };
}

/// Doc text carried over to the generated struct; other attributes give none.
#[doc(hidden)]
#[macro_export]
macro_rules! __record_doc {
    (doc = $doc:literal) => {
        $doc
    };
    ($($other:tt)*) => {
        ""
    };
}
