//! Records and views for namespaces, config files and items.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::state::{PublishEvent, PublishState};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identity of a namespace.
    NamespaceId
);
id_type!(
    /// Identity of a config file.
    FileId
);
id_type!(
    /// Identity of a stored config item.
    ItemId
);

/// A publishable unit: an app, optionally scoped to an environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub id: NamespaceId,
    pub name: String,
    pub environment: Option<String>,
    pub outdated: bool,
    /// Bumped on every transition to dirty.
    pub revision: u64,
}

impl Namespace {
    /// `name` or `name/environment`.
    pub fn full_name(&self) -> String {
        match &self.environment {
            Some(env) => format!("{}/{}", self.name, env),
            None => self.name.clone(),
        }
    }

    /// Key the merged document is published under.
    pub fn publish_key(&self, prefix: &str) -> String {
        format!("{}/{}", prefix.trim_end_matches('/'), self.full_name())
    }

    pub fn publish_state(&self) -> PublishState {
        PublishState::from(self.outdated)
    }

    /// Move the stored flag through `event`. Every move into Dirty bumps the
    /// revision, Dirty to Dirty included.
    pub fn apply(&mut self, event: PublishEvent) -> PublishState {
        let next = self.publish_state().on(event);
        if next.is_outdated() {
            self.revision += 1;
        }
        self.outdated = next.is_outdated();
        next
    }
}

/// A config file record. Items are stored separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub id: FileId,
    pub name: String,
    /// Owning namespace.
    pub namespace_id: NamespaceId,
}

/// A single `key=value` setting with the comment line that preceded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigItem {
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ConfigItem {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// True if value or comment differ. Keys are assumed equal.
    pub fn differs_from(&self, other: &ConfigItem) -> bool {
        self.value != other.value || self.comment != other.comment
    }
}

/// An item as persisted, with its row identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredItem {
    pub id: ItemId,
    pub file_id: FileId,
    pub item: ConfigItem,
}

/// Inclusion of a file in a namespace's published set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    pub namespace_id: NamespaceId,
    pub file_id: FileId,
}

/// Summary of a config file for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileBrief {
    pub id: FileId,
    pub name: String,
    /// Full name of the owning namespace.
    pub namespace: String,
    /// `namespace/name`.
    pub full_name: String,
}

impl FileBrief {
    pub fn new(file: &ConfigFile, owner: &Namespace) -> Self {
        let namespace = owner.full_name();
        Self {
            id: file.id,
            name: file.name.clone(),
            full_name: format!("{}/{}", namespace, file.name),
            namespace,
        }
    }
}

/// A config file together with its serialized content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileView {
    #[serde(flatten)]
    pub brief: FileBrief,
    pub config: String,
}

/// Namespace summary: identity, outdated flag, associated files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceBrief {
    pub id: NamespaceId,
    pub name: String,
    pub environment: Option<String>,
    pub full_name: String,
    pub outdated: bool,
    pub config_files: Vec<FileBrief>,
}
