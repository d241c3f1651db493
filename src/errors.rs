use itertools::Itertools;
use thiserror::Error;

/// Boxed error returned by custom hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The root cause of a failed bind, without path information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidDestination,
    UnsupportedSource,
    Conversion,
    Hook,
}

/// One step of the path leading to a failing field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
    Key(String),
}

#[derive(Debug, Error)]
pub enum BindError {
    /// The destination is not a writable struct shape.
    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    /// The source cannot be read as a mapping, sequence or scalar.
    #[error("unsupported source: {0}")]
    UnsupportedSource(String),

    /// A leaf value could not be coerced to the destination type.
    #[error("cannot convert {value} into {target}")]
    Conversion { value: String, target: &'static str },

    /// A destination-provided hook rejected the value.
    #[error("hook for {target} failed: {source}")]
    Hook {
        target: &'static str,
        #[source]
        source: BoxError,
    },

    /// Wraps an inner failure with the path of the field it happened in.
    #[error("{}: {source}", render_path(.path))]
    At {
        path: Vec<PathSegment>,
        #[source]
        source: Box<BindError>,
    },
}

impl BindError {
    pub(crate) fn conversion(value: impl std::fmt::Display, target: &'static str) -> Self {
        let mut value = value.to_string();
        if value.len() > 64 {
            let cut = (0..=64).rev().find(|i| value.is_char_boundary(*i)).unwrap_or(0);
            value.truncate(cut);
            value.push_str("...");
        }
        BindError::Conversion { value, target }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BindError::InvalidDestination(_) => ErrorKind::InvalidDestination,
            BindError::UnsupportedSource(_) => ErrorKind::UnsupportedSource,
            BindError::Conversion { .. } => ErrorKind::Conversion,
            BindError::Hook { .. } => ErrorKind::Hook,
            BindError::At { source, .. } => source.kind(),
        }
    }

    /// The path of the failing field, outermost segment first. Empty when the
    /// failure happened at the top level.
    pub fn path(&self) -> &[PathSegment] {
        match self {
            BindError::At { path, .. } => path,
            _ => &[],
        }
    }

    /// The error with any path wrapper removed.
    pub fn root(&self) -> &BindError {
        match self {
            BindError::At { source, .. } => source,
            other => other,
        }
    }

    pub(crate) fn at(self, segment: PathSegment) -> Self {
        match self {
            BindError::At { mut path, source } => {
                path.insert(0, segment);
                BindError::At { path, source }
            }
            other => BindError::At {
                path: vec![segment],
                source: Box::new(other),
            },
        }
    }

    pub(crate) fn at_field(self, name: &str) -> Self {
        self.at(PathSegment::Field(name.to_string()))
    }

    pub(crate) fn at_index(self, index: usize) -> Self {
        self.at(PathSegment::Index(index))
    }

    pub(crate) fn at_key(self, key: &str) -> Self {
        self.at(PathSegment::Key(key.to_string()))
    }
}

/// Renders `a.b[2]["k"]`.
pub fn render_path(path: &[PathSegment]) -> String {
    path.iter()
        .enumerate()
        .map(|(i, seg)| match seg {
            PathSegment::Field(name) if i == 0 => name.clone(),
            PathSegment::Field(name) => format!(".{name}"),
            PathSegment::Index(idx) => format!("[{idx}]"),
            PathSegment::Key(key) => format!("[{key:?}]"),
        })
        .join("")
}

pub type Result<T> = std::result::Result<T, BindError>;
