use crate::di::{Container, Invocation, Provider};
use crate::error::{LifewireError, Result};

/// Builder for constructing a dependency injection container
///
/// Registration errors are remembered and reported by [`build`](Self::build),
/// so registrations can be chained freely.
///
/// # Example
/// ```
/// use lifewire::di::{ContainerBuilder, Invocation, Provider};
/// use std::sync::Arc;
///
/// struct Config {
///     port: u16,
/// }
///
/// let container = ContainerBuilder::new()
///     .supply(Config { port: 8080 })
///     .invoke(Invocation::new(|(config,): (Arc<Config>,)| {
///         assert_eq!(config.port, 8080);
///     }))
///     .build()
///     .unwrap();
///
/// assert_eq!(container.len(), 1);
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
    container: Container,
    error: Option<LifewireError>,
}

impl ContainerBuilder {
    /// Create a new container builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor
    pub fn provide(mut self, provider: Provider) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.container.register_provider(provider) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Register an already-built value
    pub fn supply<T: Send + Sync + 'static>(self, value: T) -> Self {
        self.provide(Provider::supply(value))
    }

    /// Register a function to run eagerly at startup
    pub fn invoke(mut self, invocation: Invocation) -> Self {
        self.container.register_invocation(invocation);
        self
    }

    /// Build the container
    ///
    /// # Errors
    /// The first registration error, typically `DuplicateProvider`.
    pub fn build(self) -> Result<Container> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.container),
        }
    }
}

impl From<Container> for ContainerBuilder {
    fn from(container: Container) -> Self {
        Self {
            container,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Logger;

    #[test]
    fn test_duplicate_surfaces_on_build() {
        let result = ContainerBuilder::new()
            .provide(Provider::new(|()| Logger))
            .supply(Logger)
            .build();

        assert!(matches!(result, Err(LifewireError::DuplicateProvider { .. })));
    }
}
