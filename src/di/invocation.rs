use crate::di::provider::{Args, Input, Inputs};
use crate::error::{LifewireError, Result};

type CallFn = Box<dyn Fn(&str, &mut Args) -> Result<()> + Send + Sync>;

/// A function run eagerly, once, when the application materializes.
///
/// Invocations are what pull constructors into existence: only types they
/// (transitively) depend on are ever built.
pub struct Invocation {
    name: String,
    inputs: Vec<Input>,
    call: CallFn,
}

impl Invocation {
    pub fn new<I, F>(f: F) -> Self
    where
        I: Inputs,
        F: Fn(I) + Send + Sync + 'static,
    {
        let name = std::any::type_name::<F>();
        Self::build::<I, std::convert::Infallible, _>(name, move |inputs| {
            f(inputs);
            Ok(())
        })
    }

    pub fn fallible<I, E, F>(f: F) -> Self
    where
        I: Inputs,
        E: Into<anyhow::Error>,
        F: Fn(I) -> std::result::Result<(), E> + Send + Sync + 'static,
    {
        let name = std::any::type_name::<F>();
        Self::build(name, f)
    }

    fn build<I, E, F>(name: &str, f: F) -> Self
    where
        I: Inputs,
        E: Into<anyhow::Error>,
        F: Fn(I) -> std::result::Result<(), E> + Send + Sync + 'static,
    {
        let call: CallFn = Box::new(move |name, args| {
            let inputs = I::from_args(args)?;
            f(inputs).map_err(|e| LifewireError::InvocationFailed {
                invocation: name.to_string(),
                source: e.into(),
            })
        });

        Self {
            name: name.to_string(),
            inputs: I::inputs(),
            call,
        }
    }

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

    pub(crate) fn call(&self, args: &mut Args) -> Result<()> {
        (self.call)(&self.name, args)
    }
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .finish()
    }
}
