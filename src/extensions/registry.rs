//! Extension registration and the frozen kind table

use super::{Extension, ExtensionFactory, ExtensionKind, GenericExtension, KindFactory, KindRegistrar};
use crate::content::{is_known_content_type, visit_content_type, ContentItem, ContentTypeVisitor};
use crate::error::RegistrationError;
use siteport_core_manifest::ContentType;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

struct RegisteredExtension {
    name: &'static str,
    factory: Arc<dyn Any + Send + Sync>,
}

struct KindEntries {
    name: String,
    extensions: Vec<RegisteredExtension>,
}

/// Kind name and the extensions registered for it, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindSummary {
    pub kind: String,
    pub extensions: Vec<&'static str>,
}

/// Collects extension registrations before a run
#[derive(Default)]
pub struct ExtensionRegistryBuilder {
    table: HashMap<TypeId, KindEntries>,
}

impl ExtensionRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extension under every kind it declares
    pub fn add<E: Extension>(&mut self, factory: ExtensionFactory<E>) -> Result<&mut Self, RegistrationError> {
        let extension = type_name::<E>();
        let mut registrar = KindRegistrar::<E>::new();
        E::declare(&mut registrar);
        let (slots, duplicate) = registrar.finish();

        if let Some(kind) = duplicate {
            return Err(RegistrationError::DuplicateKind { extension, kind });
        }
        if slots.is_empty() {
            return Err(RegistrationError::NoKinds { extension });
        }

        for slot in slots {
            debug!(extension, kind = %slot.name, "Registering extension");
            let entries = self.table.entry(slot.kind).or_insert_with(|| KindEntries {
                name: slot.name.clone(),
                extensions: Vec::new(),
            });
            entries.extensions.push(RegisteredExtension {
                name: extension,
                factory: (slot.erase)(factory.clone()),
            });
        }
        Ok(self)
    }

    /// Close a generic extension over each listed content type and register it
    ///
    /// Nothing is registered unless every tag names a known content type.
    pub fn add_generic<G: GenericExtension>(
        &mut self,
        content_types: &[ContentType],
    ) -> Result<&mut Self, RegistrationError> {
        let extension = type_name::<G>();
        if content_types.is_empty() {
            return Err(RegistrationError::EmptyContentTypes { extension });
        }
        if let Some(unknown) = content_types.iter().find(|c| !is_known_content_type(c)) {
            return Err(RegistrationError::UnknownContentType {
                extension,
                content_type: unknown.clone(),
            });
        }

        for content_type in content_types {
            let closer = CloseOver::<G> {
                builder: &mut *self,
                _generic: PhantomData,
            };
            match visit_content_type(content_type, closer) {
                Some(result) => result?,
                None => {
                    return Err(RegistrationError::UnknownContentType {
                        extension,
                        content_type: content_type.clone(),
                    })
                }
            }
        }
        Ok(self)
    }

    /// Freeze registrations
    pub fn build(self) -> ExtensionRegistry {
        ExtensionRegistry {
            table: Arc::new(self.table),
        }
    }
}

struct CloseOver<'a, G> {
    builder: &'a mut ExtensionRegistryBuilder,
    _generic: PhantomData<G>,
}

impl<G: GenericExtension> ContentTypeVisitor for CloseOver<'_, G> {
    type Output = Result<(), RegistrationError>;

    fn visit<T: ContentItem>(self) -> Self::Output {
        self.builder.add(G::factory::<T>()).map(|_| ())
    }
}

/// Immutable kind → ordered factory table
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    table: Arc<HashMap<TypeId, KindEntries>>,
}

impl ExtensionRegistry {
    pub fn builder() -> ExtensionRegistryBuilder {
        ExtensionRegistryBuilder::new()
    }

    /// Registry with no extensions
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of extensions registered for a kind
    pub fn count<K: ExtensionKind>(&self) -> usize {
        self.table
            .get(&TypeId::of::<K>())
            .map_or(0, |e| e.extensions.len())
    }

    /// All kinds with registrations, sorted by kind name
    pub fn kinds(&self) -> Vec<KindSummary> {
        let mut kinds: Vec<KindSummary> = self
            .table
            .values()
            .map(|e| KindSummary {
                kind: e.name.clone(),
                extensions: e.extensions.iter().map(|x| x.name).collect(),
            })
            .collect();
        kinds.sort_by(|a, b| a.kind.cmp(&b.kind));
        kinds
    }

    /// Chain links for a kind, in registration order
    pub(crate) fn links<K: ExtensionKind>(&self) -> Vec<(&'static str, KindFactory<K>)> {
        let Some(entries) = self.table.get(&TypeId::of::<K>()) else {
            return Vec::new();
        };
        entries
            .extensions
            .iter()
            .filter_map(|x| match x.factory.downcast_ref::<KindFactory<K>>() {
                Some(factory) => Some((x.name, factory.clone())),
                None => {
                    warn!(extension = x.name, kind = %entries.name, "Extension factory has unexpected type");
                    None
                }
            })
            .collect()
    }
}
