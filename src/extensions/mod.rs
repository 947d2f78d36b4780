//! Typed extension points
//!
//! An extension kind is a marker type naming one decision point of the
//! migration (filtering a batch, mapping a location, transforming an item,
//! reacting to a publish...) together with the context value its chain
//! threads through. Extensions implement [`Hook<K>`] for every kind they
//! take part in and list those kinds in [`Extension::declare`]; the
//! `Self: Hook<K>` bound on [`KindRegistrar::kind`] makes that table checked
//! at compile time.
//!
//! Chains run in registration order. A hook returning `Some(ctx)` replaces
//! the context for the next hook; `None` leaves it unchanged.

mod registry;
mod runner;

pub use registry::{ExtensionRegistry, ExtensionRegistryBuilder, KindSummary};
pub use runner::ExtensionRunner;

use crate::content::ContentItem;
use crate::context::MigrationContext;
use crate::migrator::{
    BatchMigrationResult, ContentItemPostPublishContext, ContentItemPrePublishContext,
    ContentMappingContext, ContentMigrationItem,
};
use crate::pipeline::ActionResult;
use async_trait::async_trait;
use siteport_core_manifest::Manifest;
use std::any::{Any, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A named decision point and the context its chain passes along
pub trait ExtensionKind: Send + Sync + 'static {
    type Context: Send + Sync + 'static;

    fn name() -> String;
}

macro_rules! content_kind {
    ($(#[$doc:meta])* $kind:ident, $label:literal, $context:ty) => {
        $(#[$doc])*
        pub struct $kind<T>(PhantomData<fn() -> T>);

        impl<T: ContentItem> ExtensionKind for $kind<T> {
            type Context = $context;

            fn name() -> String {
                format!(concat!($label, "<{}>"), T::CONTENT_TYPE)
            }
        }
    };
}

content_kind!(
    /// Narrows a batch; items missing from the result are marked Skipped
    FilterKind,
    "filter",
    Vec<ContentMigrationItem<T>>
);
content_kind!(
    /// Chooses the destination location of an item
    MappingKind,
    "mapping",
    ContentMappingContext<T>
);
content_kind!(
    /// Rewrites a prepared item before it is converted
    TransformerKind,
    "transformer",
    T
);
content_kind!(
    /// Runs right before an item is published
    PrePublishKind,
    "pre_publish",
    ContentItemPrePublishContext<T>
);
content_kind!(
    /// Runs after a successful publish, before the item is marked Migrated
    PostPublishKind,
    "post_publish",
    ContentItemPostPublishContext<T>
);
content_kind!(
    /// Runs after every batch with the batch summary
    BatchCompletedKind,
    "batch_completed",
    BatchMigrationResult<T>
);

/// Runs after every pipeline action with its result
pub struct ActionCompletedKind;

impl ExtensionKind for ActionCompletedKind {
    type Context = ActionResult;

    fn name() -> String {
        "action_completed".to_string()
    }
}

/// What an executing hook can see of the run
pub struct ExtensionScope<'a> {
    context: &'a MigrationContext,
    extension: &'static str,
}

impl<'a> ExtensionScope<'a> {
    pub(crate) fn new(context: &'a MigrationContext, extension: &'static str) -> Self {
        Self { context, extension }
    }

    pub fn context(&self) -> &'a MigrationContext {
        self.context
    }

    pub fn manifest(&self) -> &'a Manifest {
        self.context.manifest()
    }

    pub fn cancel(&self) -> &'a CancellationToken {
        self.context.cancel_token()
    }

    /// Type name of the running extension
    pub fn extension(&self) -> &'static str {
        self.extension
    }
}

/// One link of a kind's chain
#[async_trait]
pub trait Hook<K: ExtensionKind>: Send + Sync {
    async fn execute(
        &self,
        context: &K::Context,
        scope: &ExtensionScope<'_>,
    ) -> anyhow::Result<Option<K::Context>>;
}

/// A registrable extension and the kinds it takes part in
pub trait Extension: Send + Sync + Sized + 'static {
    fn declare(kinds: &mut KindRegistrar<Self>);
}

/// Produces an extension instance for a run
pub struct ExtensionFactory<E> {
    produce: Arc<dyn Fn(&MigrationContext) -> Arc<E> + Send + Sync>,
}

impl<E> Clone for ExtensionFactory<E> {
    fn clone(&self) -> Self {
        Self {
            produce: self.produce.clone(),
        }
    }
}

impl<E: Send + Sync + 'static> ExtensionFactory<E> {
    /// One shared instance for every execution
    pub fn singleton(extension: E) -> Self {
        let shared = Arc::new(extension);
        Self {
            produce: Arc::new(move |_: &MigrationContext| shared.clone()),
        }
    }

    /// A fresh instance for every execution
    pub fn per_call<F>(make: F) -> Self
    where
        F: Fn() -> E + Send + Sync + 'static,
    {
        Self {
            produce: Arc::new(move |_: &MigrationContext| Arc::new(make())),
        }
    }

    /// A fresh instance built from the run context
    pub fn from_fn<F>(make: F) -> Self
    where
        F: Fn(&MigrationContext) -> E + Send + Sync + 'static,
    {
        Self {
            produce: Arc::new(move |ctx: &MigrationContext| Arc::new(make(ctx))),
        }
    }

    pub fn create(&self, context: &MigrationContext) -> Arc<E> {
        (self.produce)(context)
    }
}

/// Factory for one kind's chain link, erased to `dyn Hook<K>`
pub(crate) type KindFactory<K> = Arc<dyn Fn(&MigrationContext) -> Arc<dyn Hook<K>> + Send + Sync>;

type Eraser<E> = fn(ExtensionFactory<E>) -> Arc<dyn Any + Send + Sync>;

pub(crate) struct KindSlot<E> {
    pub(crate) kind: TypeId,
    pub(crate) name: String,
    pub(crate) erase: Eraser<E>,
}

/// Collects the kinds an extension declares
pub struct KindRegistrar<E> {
    slots: Vec<KindSlot<E>>,
    duplicate: Option<String>,
}

impl<E: Extension> KindRegistrar<E> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            duplicate: None,
        }
    }

    /// Declare that `E` takes part in kind `K`
    pub fn kind<K: ExtensionKind>(&mut self) -> &mut Self
    where
        E: Hook<K>,
    {
        let kind = TypeId::of::<K>();
        if self.slots.iter().any(|s| s.kind == kind) {
            self.duplicate.get_or_insert_with(K::name);
        } else {
            self.slots.push(KindSlot {
                kind,
                name: K::name(),
                erase: erase::<E, K>,
            });
        }
        self
    }

    pub(crate) fn finish(self) -> (Vec<KindSlot<E>>, Option<String>) {
        (self.slots, self.duplicate)
    }
}

fn erase<E, K>(factory: ExtensionFactory<E>) -> Arc<dyn Any + Send + Sync>
where
    E: Extension + Hook<K>,
    K: ExtensionKind,
{
    let link: KindFactory<K> = Arc::new(move |ctx: &MigrationContext| -> Arc<dyn Hook<K>> {
        factory.create(ctx)
    });
    Arc::new(link)
}

/// An extension defined once and instantiated per content type
///
/// Registered with [`ExtensionRegistryBuilder::add_generic`], which closes it
/// over each listed content type.
pub trait GenericExtension: 'static {
    type Instance<T: ContentItem>: Extension;

    fn factory<T: ContentItem>() -> ExtensionFactory<Self::Instance<T>>;
}
