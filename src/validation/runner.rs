//! Validation runner
//!
//! Executes an ordered list of named validations against a single object,
//! with a configurable skip-list and an enforced invariant that no
//! validation may mutate the object under validation. The runner takes a
//! deep copy of the object up front, hands the copy to every check, and
//! compares copy and original after the run. A discrepancy is a programming
//! error in a validation and aborts the process.

use std::error::Error as StdError;
use std::marker::PhantomData;

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::error::ValidationError;
use super::informer::Informer;

/// Capability required of objects under validation: a structural deep copy
/// comparable for equality.
pub trait Validatable: Clone + PartialEq + std::fmt::Debug + Send + Sync {}

impl<T: Clone + PartialEq + std::fmt::Debug + Send + Sync> Validatable for T {}

type CheckFn<O> = Box<
    dyn for<'a> Fn(&'a dyn Informer, &'a O) -> BoxFuture<'a, Result<(), ValidationError>>
        + Send
        + Sync,
>;

/// A named, side-effect-free check bound to an object type
pub struct Validation<O> {
    name: String,
    check: CheckFn<O>,
}

impl<O: Validatable> Validation<O> {
    /// Create a validation from a name and a check
    ///
    /// The name is the stable identifier consulted by skip-lists; it must be
    /// unique within a run. The check must not mutate the object it is given.
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: for<'a> Fn(&'a dyn Informer, &'a O) -> BoxFuture<'a, Result<(), ValidationError>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            check: Box::new(check),
        }
    }

    /// The validation's stable name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the check against the given object
    pub async fn check(&self, informer: &dyn Informer, obj: &O) -> Result<(), ValidationError> {
        (self.check)(informer, obj).await
    }
}

impl<O> std::fmt::Debug for Validation<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validation").field("name", &self.name).finish()
    }
}

/// Executes validations against one object
#[async_trait]
pub trait Runner<O: Validatable>: Send + Sync {
    /// Run the given validations in order, returning the first error
    ///
    /// The object must not be modified by any validation. If it is, this
    /// indicates a programming error and the method panics.
    async fn run(&self, obj: &O, validations: &[Validation<O>]) -> Result<(), ValidationError>;
}

/// Runner that executes validations one at a time against a single object
pub struct SingleRunner<O> {
    informer: Box<dyn Informer>,
    skip_validations: Vec<String>,
    _object: PhantomData<fn(O)>,
}

impl<O: Validatable> SingleRunner<O> {
    /// Create a runner that reports progress through the given informer
    pub fn new(informer: impl Informer + 'static) -> Self {
        Self {
            informer: Box::new(informer),
            skip_validations: Vec::new(),
            _object: PhantomData,
        }
    }

    /// Configure the runner to skip the validations with the given names
    pub fn with_skipped_validations<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_validations.extend(names.into_iter().map(Into::into));
        self
    }

    fn should_run(&self, name: &str) -> bool {
        !self.skip_validations.iter().any(|skip| skip == name)
    }
}

#[async_trait]
impl<O: Validatable> Runner<O> for SingleRunner<O> {
    async fn run(&self, obj: &O, validations: &[Validation<O>]) -> Result<(), ValidationError> {
        let copy = obj.clone();

        for validation in validations {
            if !self.should_run(validation.name()) {
                continue;
            }

            self.informer.starting(
                validation.name(),
                &format!("Validating {}", validation.name()),
            );
            let result = validation.check(self.informer.as_ref(), &copy).await;
            let err = result
                .as_ref()
                .err()
                .map(|e| -> &(dyn StdError + 'static) { &**e });
            self.informer.done(validation.name(), err);

            result?;
        }

        if copy != *obj {
            panic!("validations must not modify the object under validation");
        }

        Ok(())
    }
}

/// Runner that performs no validations
///
/// Used by node topologies that intentionally skip in-flight validation.
#[derive(Debug, Default)]
pub struct NoopSingleRunner<O> {
    _object: PhantomData<fn(O)>,
}

impl<O: Validatable> NoopSingleRunner<O> {
    /// Create a new no-op runner
    pub fn new() -> Self {
        Self {
            _object: PhantomData,
        }
    }
}

#[async_trait]
impl<O: Validatable> Runner<O> for NoopSingleRunner<O> {
    async fn run(&self, _obj: &O, _validations: &[Validation<O>]) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, RwLock};

    use futures::FutureExt;

    use super::*;
    use crate::validation::informer::{Event, NoopInformer, RecordingInformer};

    /// Counter with interior mutability, so a misbehaving check can mutate
    /// the object it was given even through a shared reference.
    #[derive(Debug, Default)]
    struct SharedCount(RwLock<u32>);

    impl SharedCount {
        fn get(&self) -> u32 {
            *self.0.read().expect("count lock poisoned")
        }

        fn set(&self, value: u32) {
            *self.0.write().expect("count lock poisoned") = value;
        }
    }

    impl Clone for SharedCount {
        fn clone(&self) -> Self {
            SharedCount(RwLock::new(self.get()))
        }
    }

    impl PartialEq for SharedCount {
        fn eq(&self, other: &Self) -> bool {
            self.get() == other.get()
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct NodeSettings {
        name: String,
        max_pods: SharedCount,
    }

    fn settings(name: &str, max_pods: u32) -> NodeSettings {
        let s = NodeSettings {
            name: name.to_string(),
            max_pods: SharedCount::default(),
        };
        s.max_pods.set(max_pods);
        s
    }

    #[tokio::test]
    async fn test_run_success() {
        let runner = SingleRunner::new(NoopInformer);
        let config = settings("my-node-1", 3);

        let result = runner
            .run(
                &config,
                &[
                    Validation::new("max-pods", |_: &dyn Informer, c: &NodeSettings| {
                        Box::pin(async move {
                            if c.max_pods.get() == 0 {
                                return Err("maxPods can't be 0".into());
                            }
                            Ok(())
                        })
                    }),
                    Validation::new("name", |_: &dyn Informer, c: &NodeSettings| {
                        Box::pin(async move {
                            if c.name.is_empty() {
                                return Err("name can't be empty".into());
                            }
                            Ok(())
                        })
                    }),
                ],
            )
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_run_returns_first_error_and_stops() {
        let runner = SingleRunner::new(NoopInformer);
        let config = settings("", 0);
        let second_ran = Arc::new(AtomicU32::new(0));
        let second_ran_handle = second_ran.clone();

        let result = runner
            .run(
                &config,
                &[
                    Validation::new("name", |_: &dyn Informer, c: &NodeSettings| {
                        Box::pin(async move {
                            if c.name.is_empty() {
                                return Err("name can't be empty".into());
                            }
                            Ok(())
                        })
                    }),
                    Validation::new("max-pods", move |_: &dyn Informer, _: &NodeSettings| {
                        let ran = second_ran_handle.clone();
                        Box::pin(async move {
                            ran.fetch_add(1, Ordering::SeqCst);
                            Err("maxPods can't be 0".into())
                        })
                    }),
                ],
            )
            .await;

        let err = result.expect_err("first validation should fail");
        assert_eq!(err.to_string(), "name can't be empty");
        assert_eq!(second_ran.load(Ordering::SeqCst), 0, "later validation ran");
    }

    #[tokio::test]
    async fn test_run_panics_after_check_modifies_object() {
        let runner = SingleRunner::new(NoopInformer);
        let config = settings("my-node-1", 0);

        let validations = [Validation::new(
            "mutating",
            |_: &dyn Informer, c: &NodeSettings| {
                Box::pin(async move {
                    c.max_pods.set(5);
                    Ok(())
                })
            },
        )];
        let run = runner.run(&config, &validations);

        let panic = std::panic::AssertUnwindSafe(run)
            .catch_unwind()
            .await
            .expect_err("run should panic");
        let message = panic
            .downcast_ref::<&str>()
            .copied()
            .expect("panic payload should be a str");
        assert_eq!(
            message,
            "validations must not modify the object under validation"
        );
    }

    #[tokio::test]
    async fn test_skipped_validations_never_run_or_notify() {
        let informer = RecordingInformer::new();
        let events = informer.clone();
        let runner = SingleRunner::new(informer)
            .with_skipped_validations(["my-validation-1", "my-validation-2"]);
        let config = settings("my-node-1", 3);

        let result = runner
            .run(
                &config,
                &[
                    Validation::new("max-pods", |_: &dyn Informer, c: &NodeSettings| {
                        Box::pin(async move {
                            if c.max_pods.get() == 0 {
                                return Err("maxPods can't be 0".into());
                            }
                            Ok(())
                        })
                    }),
                    Validation::new("my-validation-1", |_: &dyn Informer, _: &NodeSettings| {
                        Box::pin(async move { Err("this should be skipped".into()) })
                    }),
                    Validation::new("my-validation-2", |_: &dyn Informer, _: &NodeSettings| {
                        Box::pin(async move { Err("this should be skipped as well".into()) })
                    }),
                ],
            )
            .await;

        assert!(result.is_ok());

        let recorded = events.events();
        assert_eq!(
            recorded,
            vec![
                Event::Starting("max-pods".to_string()),
                Event::Done("max-pods".to_string(), None),
            ],
        );
    }

    #[tokio::test]
    async fn test_informer_receives_failure() {
        let informer = RecordingInformer::new();
        let events = informer.clone();
        let runner = SingleRunner::new(informer);
        let config = settings("", 3);

        let result = runner
            .run(
                &config,
                &[Validation::new("name", |_: &dyn Informer, c: &NodeSettings| {
                    Box::pin(async move {
                        if c.name.is_empty() {
                            return Err("name can't be empty".into());
                        }
                        Ok(())
                    })
                })],
            )
            .await;

        assert!(result.is_err());
        assert_eq!(
            events.events(),
            vec![
                Event::Starting("name".to_string()),
                Event::Done("name".to_string(), Some("name can't be empty".to_string())),
            ],
        );
    }

    #[tokio::test]
    async fn test_noop_runner_ignores_everything() {
        let runner = NoopSingleRunner::new();
        let config = settings("", 0);

        let result = runner
            .run(
                &config,
                &[Validation::new(
                    "always-fails",
                    |_: &dyn Informer, _: &NodeSettings| {
                        Box::pin(async move { Err("should never run".into()) })
                    },
                )],
            )
            .await;

        assert!(result.is_ok());
    }
}
