use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::value::{TypeKey, Value};
use crate::domain::{ActionError, BoxError};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type CallFn = dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, ActionError>> + Send + Sync;

/// One declared parameter of a dynamic function.
///
/// Unnamed parameters are satisfied by type alone. Named parameters prefer a
/// named value with the same type and fall back to type-only lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: Option<String>,
    pub ty: TypeKey,
}

impl Param {
    pub fn typed<T: 'static>() -> Self {
        Self {
            name: None,
            ty: TypeKey::of::<T>(),
        }
    }
}

/// A plugin function whose parameter list is only known at runtime.
///
/// Built from any async closure taking up to six `Clone` arguments and
/// returning `Result<R, E>`; the argument types become the parameter list and
/// `R` the output type.
///
/// ```ignore
/// let build = DynFunc::new(|src: Source, dir: ComponentDir| async move {
///     let image = pack(&src.path, dir.data_dir()).await?;
///     Ok::<_, BoxError>(Arc::new(image) as Arc<dyn Artifact>)
/// })
/// .named("pack.build");
/// ```
#[derive(Clone)]
pub struct DynFunc {
    name: Arc<str>,
    params: Vec<Param>,
    output: TypeKey,
    call: Arc<CallFn>,
}

impl DynFunc {
    pub fn new<Args, F: IntoDynFunc<Args>>(f: F) -> Self {
        f.into_dyn_func()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Arc::from(name.into());
        self
    }

    /// Give parameter `index` a name so it can be matched against named values.
    pub fn with_param_name(mut self, index: usize, name: impl Into<String>) -> Self {
        if let Some(param) = self.params.get_mut(index) {
            param.name = Some(name.into());
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn output(&self) -> TypeKey {
        self.output
    }

    /// Call with arguments already in parameter order.
    pub(crate) fn call(&self, args: Vec<Value>) -> BoxFuture<'static, Result<Value, ActionError>> {
        (self.call)(args)
    }
}

impl fmt::Debug for DynFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynFunc")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("output", &self.output)
            .finish()
    }
}

/// Conversion of an async closure into a `DynFunc`.
///
/// `Args` is a marker (the tuple of argument types) that keeps the impls for
/// different arities apart.
pub trait IntoDynFunc<Args>: Send + Sync + 'static {
    fn into_dyn_func(self) -> DynFunc;
}

fn argument_mismatch(function: &str, index: usize, expected: TypeKey) -> ActionError {
    ActionError::new(format!("{function}: argument {index} is not a {expected}"))
}

macro_rules! impl_into_dyn_func {
    ($($arg:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, Fut, R, E, $($arg,)*> IntoDynFunc<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Result<R, E>> + Send + 'static,
            R: Send + Sync + 'static,
            E: Into<BoxError> + 'static,
            $($arg: Clone + Send + Sync + 'static,)*
        {
            fn into_dyn_func(self) -> DynFunc {
                let name: Arc<str> = Arc::from(std::any::type_name::<F>());
                let params = vec![$(Param::typed::<$arg>()),*];
                let label = name.clone();
                let call = move |args: Vec<Value>| -> BoxFuture<'static, Result<Value, ActionError>> {
                    let mut args = args.into_iter().enumerate();
                    $(
                        let $arg = match args.next().map(|(i, v)| (i, v.downcast_ref::<$arg>().cloned())) {
                            Some((_, Some(v))) => v,
                            Some((i, None)) => {
                                let err = argument_mismatch(&label, i, TypeKey::of::<$arg>());
                                return Box::pin(async move { Err(err) });
                            }
                            None => {
                                let err = ActionError::new(format!("{label}: missing argument"));
                                return Box::pin(async move { Err(err) });
                            }
                        };
                    )*
                    let fut = (self)($($arg),*);
                    Box::pin(async move {
                        fut.await.map(Value::new).map_err(ActionError::new)
                    })
                };
                DynFunc {
                    name,
                    params,
                    output: TypeKey::of::<R>(),
                    call: Arc::new(call),
                }
            }
        }
    };
}

impl_into_dyn_func!();
impl_into_dyn_func!(A1);
impl_into_dyn_func!(A1, A2);
impl_into_dyn_func!(A1, A2, A3);
impl_into_dyn_func!(A1, A2, A3, A4);
impl_into_dyn_func!(A1, A2, A3, A4, A5);
impl_into_dyn_func!(A1, A2, A3, A4, A5, A6);
