//! Errors surfaced by connected components

/// Boxed error returned by fallible mappers
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// Neither an explicit store nor a provider context supplied a store
    #[error(
        "could not find a store for \"{component}\": either render it under a Provider, \
         or pass a store explicitly when instantiating \"{component}\""
    )]
    MissingStore { component: String },

    /// The wrapped instance was requested without `with_ref`
    #[error(
        "to access the wrapped instance of \"{component}\", set `with_ref: true` \
         in the connect options"
    )]
    RefNotEnabled { component: String },

    /// A mapper or merger failed
    #[error("{function}() in {component} failed: {source}")]
    Mapper {
        component: String,
        function: &'static str,
        #[source]
        source: BoxError,
    },

    /// A provider was given anything but exactly one child
    #[error("Provider expects exactly one child, got {count}")]
    ProviderChildCount { count: usize },

    #[error("invalid connect options: {0}")]
    InvalidOptions(#[from] serde_json::Error),
}

impl ConnectError {
    pub fn component(&self) -> Option<&str> {
        match self {
            ConnectError::MissingStore { component }
            | ConnectError::RefNotEnabled { component }
            | ConnectError::Mapper { component, .. } => Some(component),
            ConnectError::ProviderChildCount { .. } | ConnectError::InvalidOptions(_) => None,
        }
    }
}
