use crate::di::TypeKey;
use crate::error::{LifewireError, Result};
use crate::lifecycle::Lifecycle;
use std::any::Any;
use std::sync::Arc;

/// A materialized value as stored in the instance cache.
pub type Instance = Arc<dyn Any + Send + Sync>;

type ConstructFn =
    Box<dyn Fn(&str, &mut Args, &mut Lifecycle) -> Result<Vec<Instance>> + Send + Sync>;

/// A declared input of a provider or invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Input {
    pub key: TypeKey,
    /// Optional inputs resolve to `None` when no provider is registered.
    pub optional: bool,
}

impl Input {
    pub fn required(key: TypeKey) -> Self {
        Self {
            key,
            optional: false,
        }
    }

    pub fn optional(key: TypeKey) -> Self {
        Self {
            key,
            optional: true,
        }
    }
}

/// Resolved inputs, in declaration order.
pub struct Args {
    slots: std::vec::IntoIter<Option<Instance>>,
}

impl Args {
    pub(crate) fn new(slots: Vec<Option<Instance>>) -> Self {
        Self {
            slots: slots.into_iter(),
        }
    }

    fn next_slot(&mut self) -> Option<Instance> {
        self.slots.next().flatten()
    }
}

/// A single value a constructor or invocation can ask for.
///
/// `Arc<T>` is a required dependency, `Option<Arc<T>>` an optional one.
pub trait Dependency: Sized + Send + 'static {
    fn input() -> Input;

    fn extract(slot: Option<Instance>) -> Result<Self>;
}

fn downcast<T: Send + Sync + 'static>(instance: Instance) -> Result<Arc<T>> {
    instance
        .downcast::<T>()
        .map_err(|_| LifewireError::DowncastFailed {
            type_name: std::any::type_name::<T>().to_string(),
        })
}

impl<T: Send + Sync + 'static> Dependency for Arc<T> {
    fn input() -> Input {
        Input::required(TypeKey::of::<T>())
    }

    fn extract(slot: Option<Instance>) -> Result<Self> {
        let instance = slot.ok_or_else(|| LifewireError::DowncastFailed {
            type_name: std::any::type_name::<T>().to_string(),
        })?;
        downcast::<T>(instance)
    }
}

impl<T: Send + Sync + 'static> Dependency for Option<Arc<T>> {
    fn input() -> Input {
        Input::optional(TypeKey::of::<T>())
    }

    fn extract(slot: Option<Instance>) -> Result<Self> {
        slot.map(downcast::<T>).transpose()
    }
}

/// The full parameter list of a constructor or invocation.
///
/// Implemented for `()` and tuples of up to eight [`Dependency`] values.
pub trait Inputs: Sized + Send + 'static {
    fn inputs() -> Vec<Input>;

    fn from_args(args: &mut Args) -> Result<Self>;
}

impl Inputs for () {
    fn inputs() -> Vec<Input> {
        Vec::new()
    }

    fn from_args(_args: &mut Args) -> Result<Self> {
        Ok(())
    }
}

macro_rules! impl_inputs {
    ($($dep:ident),+) => {
        impl<$($dep: Dependency),+> Inputs for ($($dep,)+) {
            fn inputs() -> Vec<Input> {
                vec![$($dep::input()),+]
            }

            fn from_args(args: &mut Args) -> Result<Self> {
                Ok(($($dep::extract(args.next_slot())?,)+))
            }
        }
    };
}

impl_inputs!(A);
impl_inputs!(A, B);
impl_inputs!(A, B, C);
impl_inputs!(A, B, C, D);
impl_inputs!(A, B, C, D, E);
impl_inputs!(A, B, C, D, E, F);
impl_inputs!(A, B, C, D, E, F, G);
impl_inputs!(A, B, C, D, E, F, G, H);

/// The values a single constructor produces.
///
/// Implemented for tuples of up to eight types; each becomes its own cached
/// singleton.
pub trait Outputs: Sized + 'static {
    fn keys() -> Vec<TypeKey>;

    fn into_instances(self) -> Vec<Instance>;
}

macro_rules! impl_outputs {
    ($($out:ident),+) => {
        impl<$($out: Send + Sync + 'static),+> Outputs for ($($out,)+) {
            fn keys() -> Vec<TypeKey> {
                vec![$(TypeKey::of::<$out>()),+]
            }

            #[allow(non_snake_case)]
            fn into_instances(self) -> Vec<Instance> {
                let ($($out,)+) = self;
                vec![$(Arc::new($out) as Instance),+]
            }
        }
    };
}

impl_outputs!(A);
impl_outputs!(A, B);
impl_outputs!(A, B, C);
impl_outputs!(A, B, C, D);
impl_outputs!(A, B, C, D, E);
impl_outputs!(A, B, C, D, E, F);
impl_outputs!(A, B, C, D, E, F, G);
impl_outputs!(A, B, C, D, E, F, G, H);

/// A registered constructor.
///
/// Constructors run lazily, at most once per container, and only when some
/// invocation transitively needs one of their outputs.
///
/// # Example
///
/// ```rust
/// use lifewire::di::Provider;
/// use std::sync::Arc;
///
/// struct Logger;
/// struct Handler {
///     logger: Arc<Logger>,
/// }
///
/// let logger = Provider::new(|()| Logger);
/// let handler = Provider::fallible(|(logger,): (Arc<Logger>,)| {
///     Ok::<_, std::io::Error>(Handler { logger })
/// });
///
/// assert!(logger.inputs().is_empty());
/// assert_eq!(handler.inputs().len(), 1);
/// ```
pub struct Provider {
    name: String,
    inputs: Vec<Input>,
    outputs: Vec<TypeKey>,
    fallible: bool,
    construct: ConstructFn,
}

impl Provider {
    /// Constructor that cannot fail and produces one value.
    pub fn new<I, T, F>(f: F) -> Self
    where
        I: Inputs,
        T: Send + Sync + 'static,
        F: Fn(I) -> T + Send + Sync + 'static,
    {
        let name = std::any::type_name::<F>();
        Self::build::<I, (T,), std::convert::Infallible, _>(name, false, move |inputs, _| {
            Ok((f(inputs),))
        })
    }

    /// Constructor that may fail and produces one value.
    pub fn fallible<I, T, E, F>(f: F) -> Self
    where
        I: Inputs,
        T: Send + Sync + 'static,
        E: Into<anyhow::Error>,
        F: Fn(I) -> std::result::Result<T, E> + Send + Sync + 'static,
    {
        let name = std::any::type_name::<F>();
        Self::build::<I, (T,), E, _>(name, true, move |inputs, _| f(inputs).map(|value| (value,)))
    }

    /// Constructor that may append lifecycle hooks.
    pub fn with_lifecycle<I, T, E, F>(f: F) -> Self
    where
        I: Inputs,
        T: Send + Sync + 'static,
        E: Into<anyhow::Error>,
        F: Fn(I, &mut Lifecycle) -> std::result::Result<T, E> + Send + Sync + 'static,
    {
        let name = std::any::type_name::<F>();
        Self::build::<I, (T,), E, _>(name, true, move |inputs, lifecycle| {
            f(inputs, lifecycle).map(|value| (value,))
        })
    }

    /// Constructor producing several values at once.
    ///
    /// All outputs are cached together, or none of them if the constructor
    /// fails.
    pub fn multi<I, O, E, F>(f: F) -> Self
    where
        I: Inputs,
        O: Outputs,
        E: Into<anyhow::Error>,
        F: Fn(I, &mut Lifecycle) -> std::result::Result<O, E> + Send + Sync + 'static,
    {
        let name = std::any::type_name::<F>();
        Self::build::<I, O, E, F>(name, true, f)
    }

    /// An already-built value.
    pub fn supply<T: Send + Sync + 'static>(value: T) -> Self {
        let instance: Instance = Arc::new(value);
        Self {
            name: format!("supply({})", std::any::type_name::<T>()),
            inputs: Vec::new(),
            outputs: vec![TypeKey::of::<T>()],
            fallible: false,
            construct: Box::new(move |_, _, _| Ok(vec![Arc::clone(&instance)])),
        }
    }

    fn build<I, O, E, F>(name: &str, fallible: bool, f: F) -> Self
    where
        I: Inputs,
        O: Outputs,
        E: Into<anyhow::Error>,
        F: Fn(I, &mut Lifecycle) -> std::result::Result<O, E> + Send + Sync + 'static,
    {
        let construct: ConstructFn = Box::new(move |provider, args, lifecycle| {
            let inputs = I::from_args(args)?;
            let outputs = f(inputs, lifecycle).map_err(|e| LifewireError::ConstructorFailed {
                provider: provider.to_string(),
                source: e.into(),
            })?;
            Ok(outputs.into_instances())
        });

        Self {
            name: name.to_string(),
            inputs: I::inputs(),
            outputs: O::keys(),
            fallible,
            construct,
        }
    }

    /// Override the name used in logs and errors.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TypeKey] {
        &self.outputs
    }

    pub fn is_fallible(&self) -> bool {
        self.fallible
    }

    pub(crate) fn construct(&self, args: &mut Args, lifecycle: &mut Lifecycle) -> Result<Vec<Instance>> {
        (self.construct)(&self.name, args, lifecycle)
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("fallible", &self.fallible)
            .finish()
    }
}
