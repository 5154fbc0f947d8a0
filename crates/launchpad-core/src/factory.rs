//! Factory - プラグインのコンストラクタ登録
//!
//! A `Factory` maps the type name used in configuration (`use "docker"`) to
//! the constructor that produces the component. Constructors are `DynFunc`s,
//! so their arguments are injected like any other plugin call.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::component::Component;
use crate::domain::{AppError, BoxError};
use crate::invoke::{DynFunc, Value};

/// Cleanup registered by a plugin instance, run when the app is closed.
pub type Disposer = Arc<dyn Fn() -> Result<(), BoxError> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("constructor for type {0:?} is already registered")]
    AlreadyRegistered(String),
}

impl From<FactoryError> for AppError {
    fn from(err: FactoryError) -> Self {
        match err {
            FactoryError::AlreadyRegistered(name) => AppError::DuplicateConstructor(name),
        }
    }
}

/// Constructors for one role, keyed by type name.
#[derive(Debug, Clone, Default)]
pub struct Factory {
    funcs: BTreeMap<String, DynFunc>,
}

impl Factory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `func` as the constructor for `name`.
    ///
    /// The constructor must return either an `Arc<dyn Component>` or a
    /// `PluginInstance`.
    pub fn register(&mut self, name: impl Into<String>, func: DynFunc) -> Result<(), FactoryError> {
        let name = name.into();
        if self.funcs.contains_key(&name) {
            return Err(FactoryError::AlreadyRegistered(name));
        }
        let func = func.named(format!("constructor {name:?}"));
        self.funcs.insert(name, func);
        Ok(())
    }

    pub fn func(&self, name: &str) -> Option<&DynFunc> {
        self.funcs.get(name)
    }

    pub fn registered(&self) -> Vec<String> {
        self.funcs.keys().cloned().collect()
    }
}

/// A constructed component together with what it brings along.
#[derive(Clone)]
pub struct PluginInstance {
    pub component: Arc<dyn Component>,
    /// Converters added to the app's mapper chain.
    pub mappers: Vec<DynFunc>,
    pub disposer: Option<Disposer>,
}

impl PluginInstance {
    pub fn new(component: Arc<dyn Component>) -> Self {
        Self {
            component,
            mappers: Vec::new(),
            disposer: None,
        }
    }

    pub fn with_mapper(mut self, mapper: DynFunc) -> Self {
        self.mappers.push(mapper);
        self
    }

    pub fn with_disposer(
        mut self,
        disposer: impl Fn() -> Result<(), BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.disposer = Some(Arc::new(disposer));
        self
    }

    /// Interpret a constructor's return value.
    pub(crate) fn from_value(value: Value) -> Result<Self, AppError> {
        if let Some(instance) = value.downcast_ref::<PluginInstance>() {
            return Ok(instance.clone());
        }
        if let Some(component) = value.downcast_ref::<Arc<dyn Component>>() {
            return Ok(Self::new(component.clone()));
        }
        Err(AppError::TypeMismatch {
            expected: "Component".to_string(),
            actual: value.type_name().to_string(),
        })
    }
}

impl fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginInstance")
            .field("component", &self.component.type_name())
            .field("mappers", &self.mappers)
            .field("disposer", &self.disposer.is_some())
            .finish()
    }
}
