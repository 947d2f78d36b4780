//! Concrete content records

use super::{ContentItem, Dependency};
use serde::{Deserialize, Serialize};
use siteport_core_manifest::{ContentReference, ContentType};

/// A site user; location is the single-segment user name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub reference: ContentReference,
    #[serde(default)]
    pub email: Option<String>,
    pub site_role: String,
}

impl ContentItem for User {
    const CONTENT_TYPE: ContentType = ContentType::new("user");

    fn reference(&self) -> &ContentReference {
        &self.reference
    }

    fn reference_mut(&mut self) -> &mut ContentReference {
        &mut self.reference
    }
}

/// A group of users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub reference: ContentReference,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub members: Vec<ContentReference>,
}

impl ContentItem for Group {
    const CONTENT_TYPE: ContentType = ContentType::new("group");

    fn reference(&self) -> &ContentReference {
        &self.reference
    }

    fn reference_mut(&mut self) -> &mut ContentReference {
        &mut self.reference
    }

    fn dependencies_mut(&mut self) -> Vec<Dependency<'_>> {
        self.members
            .iter_mut()
            .map(|m| Dependency::new(User::CONTENT_TYPE, m))
            .collect()
    }
}

/// How a project's permissions propagate to its contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentPermissions {
    /// Content owners manage permissions
    #[default]
    ManagedByOwner,
    /// Project permissions apply to all content, nested projects included
    LockedToProject,
    /// Project permissions apply to content but not to nested projects
    LockedToProjectWithoutNested,
}

/// A project; nested projects carry their parent's path as location prefix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub reference: ContentReference,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parent: Option<ContentReference>,
    pub owner: ContentReference,
    #[serde(default)]
    pub permissions: ContentPermissions,
}

impl ContentItem for Project {
    const CONTENT_TYPE: ContentType = ContentType::new("project");

    fn reference(&self) -> &ContentReference {
        &self.reference
    }

    fn reference_mut(&mut self) -> &mut ContentReference {
        &mut self.reference
    }

    fn dependencies_mut(&mut self) -> Vec<Dependency<'_>> {
        let mut deps = vec![Dependency::new(User::CONTENT_TYPE, &mut self.owner)];
        if let Some(parent) = self.parent.as_mut() {
            deps.push(Dependency::new(Project::CONTENT_TYPE, parent));
        }
        deps
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    pub reference: ContentReference,
    pub project: ContentReference,
    pub owner: ContentReference,
    #[serde(default)]
    pub certified: bool,
}

impl ContentItem for DataSource {
    const CONTENT_TYPE: ContentType = ContentType::new("data_source");

    fn reference(&self) -> &ContentReference {
        &self.reference
    }

    fn reference_mut(&mut self) -> &mut ContentReference {
        &mut self.reference
    }

    fn dependencies_mut(&mut self) -> Vec<Dependency<'_>> {
        vec![
            Dependency::new(Project::CONTENT_TYPE, &mut self.project),
            Dependency::new(User::CONTENT_TYPE, &mut self.owner),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    pub reference: ContentReference,
    pub project: ContentReference,
    pub owner: ContentReference,
    #[serde(default)]
    pub show_tabs: bool,
}

impl ContentItem for Workbook {
    const CONTENT_TYPE: ContentType = ContentType::new("workbook");

    fn reference(&self) -> &ContentReference {
        &self.reference
    }

    fn reference_mut(&mut self) -> &mut ContentReference {
        &mut self.reference
    }

    fn dependencies_mut(&mut self) -> Vec<Dependency<'_>> {
        vec![
            Dependency::new(Project::CONTENT_TYPE, &mut self.project),
            Dependency::new(User::CONTENT_TYPE, &mut self.owner),
        ]
    }
}

/// Content an extract refresh task refreshes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "reference", rename_all = "snake_case")]
pub enum ExtractTarget {
    DataSource(ContentReference),
    Workbook(ContentReference),
}

/// A scheduled extract refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractRefreshTask {
    pub reference: ContentReference,
    pub target: ExtractTarget,
    /// Schedule expression as the source reports it
    pub schedule: String,
}

impl ContentItem for ExtractRefreshTask {
    const CONTENT_TYPE: ContentType = ContentType::new("extract_refresh_task");

    fn reference(&self) -> &ContentReference {
        &self.reference
    }

    fn reference_mut(&mut self) -> &mut ContentReference {
        &mut self.reference
    }

    fn dependencies_mut(&mut self) -> Vec<Dependency<'_>> {
        match &mut self.target {
            ExtractTarget::DataSource(r) => vec![Dependency::new(DataSource::CONTENT_TYPE, r)],
            ExtractTarget::Workbook(r) => vec![Dependency::new(Workbook::CONTENT_TYPE, r)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn reference(path: &str) -> ContentReference {
        ContentReference::new(Uuid::new_v4(), path.parse().unwrap())
    }

    #[test]
    fn test_group_members_are_user_dependencies() {
        let mut group = Group {
            reference: reference("Analysts"),
            domain: None,
            members: vec![reference("alice"), reference("bob")],
        };
        let deps = group.dependencies_mut();
        assert_eq!(deps.len(), 2);
        assert!(deps.iter().all(|d| d.content_type == User::CONTENT_TYPE));
    }

    #[test]
    fn test_dependency_rewrite_lands_in_item() {
        let mut project = Project {
            reference: reference("Finance/Reports"),
            description: String::new(),
            parent: Some(reference("Finance")),
            owner: reference("alice"),
            permissions: ContentPermissions::LockedToProject,
        };
        let replacement = reference("Finance");
        for dep in project.dependencies_mut() {
            if dep.content_type == Project::CONTENT_TYPE {
                *dep.reference = replacement.clone();
            }
        }
        assert_eq!(project.parent, Some(replacement));
    }

    #[test]
    fn test_top_level_project_has_only_owner_dependency() {
        let mut project = Project {
            reference: reference("Finance"),
            description: String::new(),
            parent: None,
            owner: reference("alice"),
            permissions: ContentPermissions::default(),
        };
        assert_eq!(project.dependencies_mut().len(), 1);
    }

    #[test]
    fn test_extract_target_dependency_type() {
        let mut task = ExtractRefreshTask {
            reference: reference("nightly"),
            target: ExtractTarget::Workbook(reference("Sales/Pipeline")),
            schedule: "0 2 * * *".to_string(),
        };
        let deps = task.dependencies_mut();
        assert_eq!(deps[0].content_type, Workbook::CONTENT_TYPE);
    }

    #[test]
    fn test_permissions_serde() {
        let json = serde_json::to_string(&ContentPermissions::LockedToProjectWithoutNested).unwrap();
        assert_eq!(json, "\"locked_to_project_without_nested\"");
    }
}
