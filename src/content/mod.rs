//! Content items and compile-time content-type dispatch
//!
//! Every migratable record implements [`ContentItem`]. The trait carries the
//! content-type tag as an associated constant, so partitions, caches and
//! extension kinds are all selected by type rather than by name. Runtime tags
//! (config files, persisted manifests, generic extension registration) are
//! turned back into concrete types with [`visit_content_type`].

mod types;

pub use types::{
    ContentPermissions, DataSource, ExtractRefreshTask, ExtractTarget, Group, Project, User,
    Workbook,
};

use siteport_core_manifest::{ContentLocation, ContentReference, ContentType};
use std::fmt::Debug;
use uuid::Uuid;

/// A reference held by an item that must be translated to its destination
/// equivalent before the item is published
#[derive(Debug)]
pub struct Dependency<'a> {
    pub content_type: ContentType,
    pub reference: &'a mut ContentReference,
}

impl<'a> Dependency<'a> {
    pub fn new(content_type: ContentType, reference: &'a mut ContentReference) -> Self {
        Self {
            content_type,
            reference,
        }
    }
}

/// A typed record that can be listed, published and tracked in the manifest
pub trait ContentItem: Clone + Send + Sync + Debug + 'static {
    /// Manifest partition key for this type
    const CONTENT_TYPE: ContentType;

    fn reference(&self) -> &ContentReference;

    fn reference_mut(&mut self) -> &mut ContentReference;

    /// References to other content this item points at
    fn dependencies_mut(&mut self) -> Vec<Dependency<'_>> {
        Vec::new()
    }

    fn id(&self) -> Uuid {
        self.reference().id
    }

    fn location(&self) -> &ContentLocation {
        &self.reference().location
    }
}

/// Operation that needs the concrete type behind a runtime content-type tag
pub trait ContentTypeVisitor {
    type Output;

    fn visit<T: ContentItem>(self) -> Self::Output;
}

/// Every content type this crate knows, in dependency order
pub fn known_content_types() -> [ContentType; 6] {
    [
        User::CONTENT_TYPE,
        Group::CONTENT_TYPE,
        Project::CONTENT_TYPE,
        DataSource::CONTENT_TYPE,
        Workbook::CONTENT_TYPE,
        ExtractRefreshTask::CONTENT_TYPE,
    ]
}

pub fn is_known_content_type(content_type: &ContentType) -> bool {
    known_content_types().contains(content_type)
}

/// Run a visitor against the concrete type named by `content_type`
///
/// Returns `None` for tags with no concrete type.
pub fn visit_content_type<V: ContentTypeVisitor>(
    content_type: &ContentType,
    visitor: V,
) -> Option<V::Output> {
    let name = content_type.name();
    if name == User::CONTENT_TYPE.name() {
        Some(visitor.visit::<User>())
    } else if name == Group::CONTENT_TYPE.name() {
        Some(visitor.visit::<Group>())
    } else if name == Project::CONTENT_TYPE.name() {
        Some(visitor.visit::<Project>())
    } else if name == DataSource::CONTENT_TYPE.name() {
        Some(visitor.visit::<DataSource>())
    } else if name == Workbook::CONTENT_TYPE.name() {
        Some(visitor.visit::<Workbook>())
    } else if name == ExtractRefreshTask::CONTENT_TYPE.name() {
        Some(visitor.visit::<ExtractRefreshTask>())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TypeName;

    impl ContentTypeVisitor for TypeName {
        type Output = &'static str;

        fn visit<T: ContentItem>(self) -> Self::Output {
            std::any::type_name::<T>()
        }
    }

    #[test]
    fn test_visit_resolves_every_known_type() {
        for content_type in known_content_types() {
            let name = visit_content_type(&content_type, TypeName).unwrap();
            assert!(!name.is_empty());
        }
        assert!(visit_content_type(&ContentType::new("user"), TypeName)
            .unwrap()
            .ends_with("User"));
    }

    #[test]
    fn test_unknown_tag() {
        let unknown = ContentType::from_name("flow");
        assert!(visit_content_type(&unknown, TypeName).is_none());
        assert!(!is_known_content_type(&unknown));
    }
}
