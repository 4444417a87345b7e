use thiserror::Error;

/// Failure of a route calculation, carrying a message fit for API clients.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    /// Start and end are further apart than the routing provider accepts.
    #[error("{0}")]
    DistanceLimitExceeded(String),
    /// The provider could not snap a point to the road network.
    #[error("{0}")]
    PointNotFound(String),
    #[error("{0}")]
    NoRoute(String),
    /// Provider or transport failure; usually transient.
    #[error("{0}")]
    Provider(String),
    /// Missing credentials or an unusable client setup.
    #[error("{0}")]
    Configuration(String),
}

impl RouteError {
    pub fn code(&self) -> &'static str {
        match self {
            RouteError::DistanceLimitExceeded(_) => "DistanceLimitExceeded",
            RouteError::PointNotFound(_) => "PointNotFound",
            RouteError::NoRoute(_) => "NoRoute",
            RouteError::Provider(_) => "Error",
            RouteError::Configuration(_) => "ConfigurationError",
        }
    }
}
