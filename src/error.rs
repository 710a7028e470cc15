//! Error types for the lifecycle container.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Boxed error returned by user-supplied recipes, setters and lifecycle methods.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Shared error cause, kept behind an `Arc` so [`DiError`] stays `Clone`.
pub type Cause = Arc<dyn Error + Send + Sync + 'static>;

/// Lifecycle container errors
///
/// Represents the failure conditions that can occur while registering
/// descriptors, constructing managed instances, or tearing the container down.
///
/// # Examples
///
/// ```rust
/// use ferrous_lifecycle::{Container, DiError};
///
/// let container = Container::new();
/// match container.resolve("ghost") {
///     Err(DiError::DescriptorNotFound(name)) => assert_eq!(name, "ghost"),
///     _ => unreachable!(),
/// }
/// ```
///
/// ```rust
/// use ferrous_lifecycle::DiError;
///
/// let cycle = DiError::CycleUnresolvable(vec!["a".into(), "b".into(), "a".into()]);
/// assert_eq!(cycle.to_string(), "Unresolvable circular dependency: a -> b -> a");
/// ```
#[derive(Debug, Clone)]
pub enum DiError {
    /// No descriptor (and no pre-built instance) is registered under the name
    DescriptorNotFound(String),
    /// A step of the construction pipeline failed for the named instance
    ConstructionFailed {
        /// Name of the instance being constructed
        name: String,
        /// The triggering failure
        cause: Cause,
    },
    /// A dependency cycle exists that cannot be broken by early exposure (includes path)
    CycleUnresolvable(Vec<String>),
    /// One or more disposal handles failed during teardown
    TeardownFailed(Vec<(String, Cause)>),
    /// A managed instance could not be viewed as the requested type
    TypeMismatch {
        /// Name of the offending instance
        name: String,
        /// The type that was requested
        expected: &'static str,
    },
    /// A by-type lookup matched zero or several candidates
    NoUniqueInstance {
        /// The requested type
        type_name: &'static str,
        /// Names of all matching candidates
        candidates: Vec<String>,
    },
    /// A pre-built instance was registered under a name that is already taken
    DuplicateInstance(String),
    /// Maximum recursion depth exceeded
    DepthExceeded(usize),
    /// Container configuration could not be read or parsed
    InvalidConfig(String),
}

impl DiError {
    /// Wraps a foreign failure as a construction failure of `name`.
    pub fn construction(name: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        let cause: BoxError = cause.into();
        DiError::ConstructionFailed {
            name: name.into(),
            cause: Arc::from(cause),
        }
    }

    /// Returns the innermost failure, unwrapping nested construction failures.
    pub fn root_cause(&self) -> &(dyn Error + 'static) {
        let mut current: &(dyn Error + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }

    /// Name of the instance this error is attributed to, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            DiError::DescriptorNotFound(name)
            | DiError::DuplicateInstance(name)
            | DiError::ConstructionFailed { name, .. }
            | DiError::TypeMismatch { name, .. } => Some(name.as_str()),
            DiError::CycleUnresolvable(path) => path.last().map(String::as_str),
            _ => None,
        }
    }
}

impl fmt::Display for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiError::DescriptorNotFound(name) => write!(f, "No descriptor named '{}'", name),
            DiError::ConstructionFailed { name, cause } => {
                write!(f, "Construction of '{}' failed: {}", name, cause)
            }
            DiError::CycleUnresolvable(path) => {
                write!(f, "Unresolvable circular dependency: {}", path.join(" -> "))
            }
            DiError::TeardownFailed(failures) => {
                write!(f, "Teardown failed for {} instance(s)", failures.len())?;
                for (name, cause) in failures {
                    write!(f, "; '{}': {}", name, cause)?;
                }
                Ok(())
            }
            DiError::TypeMismatch { name, expected } => {
                write!(f, "Instance '{}' is not a {}", name, expected)
            }
            DiError::NoUniqueInstance { type_name, candidates } => {
                if candidates.is_empty() {
                    write!(f, "No instance of type {}", type_name)
                } else {
                    write!(
                        f,
                        "Expected a single instance of type {} but found {}: {}",
                        type_name,
                        candidates.len(),
                        candidates.join(", ")
                    )
                }
            }
            DiError::DuplicateInstance(name) => write!(f, "An instance named '{}' already exists", name),
            DiError::DepthExceeded(depth) => write!(f, "Max depth {} exceeded", depth),
            DiError::InvalidConfig(msg) => write!(f, "Invalid container configuration: {}", msg),
        }
    }
}

impl Error for DiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DiError::ConstructionFailed { cause, .. } => Some(cause.as_ref() as &(dyn Error + 'static)),
            DiError::TeardownFailed(failures) => failures
                .first()
                .map(|(_, cause)| cause.as_ref() as &(dyn Error + 'static)),
            _ => None,
        }
    }
}

/// Result type for container operations
///
/// # Examples
///
/// ```rust
/// use ferrous_lifecycle::{DiResult, DiError};
///
/// fn lookup() -> DiResult<()> {
///     Err(DiError::DescriptorNotFound("repository".into()))
/// }
///
/// assert!(lookup().is_err());
/// ```
pub type DiResult<T> = Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "boom")
        }
    }

    impl Error for Boom {}

    #[test]
    fn root_cause_unwraps_nested_construction_failures() {
        let inner = DiError::construction("repo", Boom);
        let outer = DiError::construction("service", inner);

        assert_eq!(outer.name(), Some("service"));
        assert_eq!(outer.root_cause().to_string(), "boom");
    }

    #[test]
    fn teardown_display_lists_every_failure() {
        let err = DiError::TeardownFailed(vec![
            ("a".to_string(), Arc::new(Boom) as Cause),
            ("b".to_string(), Arc::new(Boom) as Cause),
        ]);
        assert_eq!(err.to_string(), "Teardown failed for 2 instance(s); 'a': boom; 'b': boom");
    }
}
