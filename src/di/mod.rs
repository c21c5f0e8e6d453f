mod builder;
mod cache;
mod container;
mod invocation;
mod key;
mod provider;
mod registry;
mod resolver;

pub use builder::ContainerBuilder;
pub use cache::InstanceCache;
pub use container::Container;
pub use invocation::Invocation;
pub use key::TypeKey;
pub use provider::{Args, Dependency, Input, Inputs, Instance, Outputs, Provider};
pub use registry::ProviderRegistry;
