//! Reflected schemas for destination structs.
//!
//! A [`TypeDescriptor`] is built once per type from the [`FieldDef`]s a
//! [`Record`] declares, with embedded structs expanded in place, and then
//! published into a process-wide table that is never invalidated.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

use crate::target::Record;

/// Static declaration of one struct field, as written in source.
#[derive(Clone, Debug)]
pub struct FieldDef {
    name: &'static str,
    exported: bool,
    tag: Option<&'static str>,
    embedded: bool,
    // Only consulted for embedded fields; `None` for non-struct types.
    nested: fn() -> Option<&'static TypeDescriptor>,
}

impl FieldDef {
    pub fn new(
        name: &'static str,
        exported: bool,
        nested: fn() -> Option<&'static TypeDescriptor>,
    ) -> Self {
        Self {
            name,
            exported,
            tag: None,
            embedded: false,
            nested,
        }
    }

    /// Sets the raw tag text, `name[,option]*`.
    pub fn tag(mut self, tag: &'static str) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Marks the field as an embedded struct whose fields are promoted.
    pub fn embed(mut self) -> Self {
        self.embedded = true;
        self
    }
}

/// One matchable (or explicitly excluded) field of a flattened schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub tag: Option<&'static str>,
    pub options: Vec<&'static str>,
    /// Field indices from the struct root; longer than one when promoted.
    pub path: Vec<usize>,
    pub exported: bool,
    pub embedded: bool,
    /// Tagged `-`: never matched, never snapshotted.
    pub skipped: bool,
    pub(crate) folded_name: String,
}

impl FieldDescriptor {
    fn from_def(index: usize, def: &FieldDef) -> Self {
        let mut parts = def.tag.unwrap_or_default().split(',');
        let tag_name = parts.next().map(str::trim).filter(|s| !s.is_empty());
        let options = parts.map(str::trim).filter(|s| !s.is_empty()).collect();
        Self {
            name: def.name,
            tag: tag_name.filter(|t| *t != "-"),
            options,
            path: vec![index],
            exported: def.exported,
            embedded: def.embedded,
            skipped: tag_name == Some("-"),
            folded_name: crate::matcher::strip_separators(def.name),
        }
    }

    fn promoted(&self, outer: usize) -> Self {
        let mut field = self.clone();
        field.path.insert(0, outer);
        field
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| *o == option)
    }

    /// Whether a source key may ever resolve to this field.
    pub fn is_matchable(&self) -> bool {
        self.exported && !self.embedded && !self.skipped
    }

    /// The key this field is known by in snapshots.
    pub fn key_name(&self) -> &'static str {
        self.tag.unwrap_or(self.name)
    }
}

/// Immutable flattened schema of a destination struct.
#[derive(Clone, Debug)]
pub struct TypeDescriptor {
    type_name: &'static str,
    fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    /// Builds the schema from declarations. Embedded fields are listed, then
    /// their inner fields follow with extended paths. A promoted field is
    /// dropped when a shallower field, or an earlier one at the same depth,
    /// has the same declared name.
    pub fn build(type_name: &'static str, defs: &[FieldDef]) -> Self {
        let mut fields = Vec::new();
        for (index, def) in defs.iter().enumerate() {
            let field = FieldDescriptor::from_def(index, def);
            let inner = if def.embedded { (def.nested)() } else { None };
            fields.push(field);
            if let Some(inner) = inner {
                fields.extend(inner.fields.iter().map(|f| f.promoted(index)));
            }
        }

        let mut owner: HashMap<&'static str, usize> = HashMap::new();
        for (pos, field) in fields.iter().enumerate() {
            if field.embedded {
                continue;
            }
            owner
                .entry(field.name)
                .and_modify(|best| {
                    if field.depth() < fields[*best].depth() {
                        *best = pos;
                    }
                })
                .or_insert(pos);
        }
        let fields = fields
            .iter()
            .enumerate()
            .filter(|(pos, f)| f.embedded || owner.get(f.name) == Some(pos))
            .map(|(_, f)| f.clone())
            .collect();

        Self { type_name, fields }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Fields in schema order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

type Table = RwLock<HashMap<TypeId, &'static TypeDescriptor>>;

fn table() -> &'static Table {
    static TABLE: OnceLock<Table> = OnceLock::new();
    TABLE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Returns the cached descriptor for `T`, building it on first use.
///
/// The build runs without holding the lock, so descriptors of embedded types
/// can be described recursively. When two threads race, the first one to
/// publish wins and both get the same reference.
pub fn describe<T: Record>() -> &'static TypeDescriptor {
    let type_id = TypeId::of::<T>();
    let cached = table()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&type_id)
        .copied();
    if let Some(desc) = cached {
        return desc;
    }

    let built = TypeDescriptor::build(std::any::type_name::<T>(), &T::field_defs());
    tracing::trace!(ty = built.type_name(), fields = built.len(), "described type");
    *table()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(type_id)
        .or_insert_with(|| Box::leak(Box::new(built)))
}
