//! Generic service container with lazy shared factories.
//!
//! # Responsibility
//! - Register values, factories and argument-taking callables under string
//!   ids.
//! - Resolve them as typed `Arc<T>` handles.
//!
//! # Invariants
//! - A factory runs on every `get` unless wrapped by `as_shared`, which runs
//!   it at most once per wrapper.
//! - Lookup misses and type mismatches are errors, never panics.

use log::{debug, error};
use once_cell::sync::OnceCell;
use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type ContainerResult<T> = Result<T, ContainerError>;

type Service = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&Container) -> Service + Send + Sync>;
type Arguments = Box<dyn Any + Send>;
type Callable = Arc<dyn Fn(&Container, Arguments) -> Result<Service, Arguments> + Send + Sync>;

/// Container lookup errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    UnknownService(String),
    TypeMismatch { id: String, expected: &'static str },
    /// `get` on a callable that needs arguments.
    RequiresArguments(String),
    /// `call` on a value or plain factory.
    NotCallable(String),
}

impl Display for ContainerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownService(id) => write!(f, "service `{id}` is not registered"),
            Self::TypeMismatch { id, expected } => {
                write!(f, "service `{id}` is not of type `{expected}`")
            }
            Self::RequiresArguments(id) => {
                write!(f, "service `{id}` must be called with arguments")
            }
            Self::NotCallable(id) => write!(f, "service `{id}` does not take arguments"),
        }
    }
}

impl Error for ContainerError {}

enum Entry {
    Value(Service),
    Factory(Factory),
    Callable(Callable),
}

/// String-keyed service registry.
#[derive(Default)]
pub struct Container {
    entries: BTreeMap<String, Entry>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a ready value, replacing any entry under `id`.
    pub fn set_value<T>(&mut self, id: impl Into<String>, value: T)
    where
        T: Any + Send + Sync,
    {
        self.entries.insert(id.into(), Entry::Value(Arc::new(value)));
    }

    /// Registers a factory invoked with the container on each `get`.
    pub fn set_factory<T, F>(&mut self, id: impl Into<String>, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn(&Container) -> Arc<T> + Send + Sync + 'static,
    {
        let factory: Factory =
            Arc::new(move |container: &Container| -> Service { factory(container) });
        self.entries.insert(id.into(), Entry::Factory(factory));
    }

    /// Registers a callable invoked with the container and caller arguments
    /// on each `call`.
    pub fn set_callable<A, T, F>(&mut self, id: impl Into<String>, callable: F)
    where
        A: Any + Send,
        T: Any + Send + Sync,
        F: Fn(&Container, A) -> Arc<T> + Send + Sync + 'static,
    {
        let callable: Callable = Arc::new(move |container: &Container, args: Arguments| {
            args.downcast::<A>()
                .map(|args| -> Service { callable(container, *args) })
        });
        self.entries.insert(id.into(), Entry::Callable(callable));
    }

    /// Resolves `id` as `T`, invoking its factory when it has one.
    pub fn get<T>(&self, id: &str) -> ContainerResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let service = match self.entries.get(id) {
            Some(Entry::Value(value)) => Arc::clone(value),
            Some(Entry::Factory(factory)) => factory(self),
            Some(Entry::Callable(_)) => {
                return Err(lookup_failure(
                    id,
                    "requires_arguments",
                    ContainerError::RequiresArguments(id.to_string()),
                ))
            }
            None => return Err(unknown_service(id)),
        };
        downcast_service(id, service)
    }

    /// Invokes the callable under `id` with `args` and resolves its result
    /// as `T`.
    pub fn call<A, T>(&self, id: &str, args: A) -> ContainerResult<Arc<T>>
    where
        A: Any + Send,
        T: Any + Send + Sync,
    {
        let service = match self.entries.get(id) {
            Some(Entry::Callable(callable)) => {
                let args: Arguments = Box::new(args);
                callable(self, args).map_err(|_| {
                    lookup_failure(
                        id,
                        "argument_mismatch",
                        ContainerError::TypeMismatch {
                            id: id.to_string(),
                            expected: type_name::<A>(),
                        },
                    )
                })?
            }
            Some(Entry::Value(_) | Entry::Factory(_)) => {
                return Err(lookup_failure(
                    id,
                    "not_callable",
                    ContainerError::NotCallable(id.to_string()),
                ))
            }
            None => return Err(unknown_service(id)),
        };
        downcast_service(id, service)
    }

    pub fn has(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Removes `id`; returns whether it was registered.
    pub fn remove(&mut self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn unknown_service(id: &str) -> ContainerError {
    lookup_failure(
        id,
        "unknown_service",
        ContainerError::UnknownService(id.to_string()),
    )
}

fn lookup_failure(id: &str, code: &str, err: ContainerError) -> ContainerError {
    error!(
        "event=container_get module=service status=error id={} error_code={}",
        id, code
    );
    err
}

fn downcast_service<T>(id: &str, service: Service) -> ContainerResult<Arc<T>>
where
    T: Any + Send + Sync,
{
    match service.downcast::<T>() {
        Ok(typed) => {
            debug!("event=container_get module=service status=ok id={}", id);
            Ok(typed)
        }
        Err(_) => Err(lookup_failure(
            id,
            "type_mismatch",
            ContainerError::TypeMismatch {
                id: id.to_string(),
                expected: type_name::<T>(),
            },
        )),
    }
}

/// Wraps `factory` so its result is built once and reused afterwards.
pub fn as_shared<T, F>(factory: F) -> impl Fn(&Container) -> Arc<T> + Send + Sync + 'static
where
    T: Any + Send + Sync,
    F: Fn(&Container) -> Arc<T> + Send + Sync + 'static,
{
    let cell: OnceCell<Arc<T>> = OnceCell::new();
    move |container: &Container| Arc::clone(cell.get_or_init(|| factory(container)))
}
