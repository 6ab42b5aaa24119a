//! Domain types shared by every wmsync crate.
//!
//! Resource paths are `/`-separated strings, never `PathBuf`: the same logical
//! resource must compare equal on every host OS.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Replace every `\` with `/`.
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// A branch-agnostic, `/`-separated resource identifier.
///
/// Construction normalizes OS separators; it never inspects branch segments,
/// that is the job of the branch codec.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct CanonicalPath(String);

impl CanonicalPath {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(normalize_separators(path.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for CanonicalPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for CanonicalPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for CanonicalPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ---------------------------------------------------------------------------
// Resource kinds
// ---------------------------------------------------------------------------

/// The trigger family. Every member is stored as `<name>.<kind>.yaml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TriggerKind {
    Http,
    Websocket,
    Kafka,
    Nats,
    Postgres,
    Mqtt,
    Sqs,
    Gcp,
    Email,
}

impl TriggerKind {
    pub fn all() -> &'static [TriggerKind] {
        &[
            TriggerKind::Http,
            TriggerKind::Websocket,
            TriggerKind::Kafka,
            TriggerKind::Nats,
            TriggerKind::Postgres,
            TriggerKind::Mqtt,
            TriggerKind::Sqs,
            TriggerKind::Gcp,
            TriggerKind::Email,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TriggerKind::Http => "http_trigger",
            TriggerKind::Websocket => "websocket_trigger",
            TriggerKind::Kafka => "kafka_trigger",
            TriggerKind::Nats => "nats_trigger",
            TriggerKind::Postgres => "postgres_trigger",
            TriggerKind::Mqtt => "mqtt_trigger",
            TriggerKind::Sqs => "sqs_trigger",
            TriggerKind::Gcp => "gcp_trigger",
            TriggerKind::Email => "email_trigger",
        }
    }
}

/// Closed set of resource kinds a workspace can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Script,
    Flow,
    App,
    RawApp,
    Resource,
    ResourceType,
    Variable,
    Schedule,
    Trigger(TriggerKind),
    Folder,
    User,
    Group,
    Settings,
}

impl ResourceKind {
    /// Kinds stored as a folder holding a metadata file plus inline content.
    pub fn is_folder_kind(self) -> bool {
        matches!(
            self,
            ResourceKind::Flow | ResourceKind::App | ResourceKind::RawApp
        )
    }

    /// Kinds that may have a branch-qualified sibling on disk.
    pub fn is_branch_eligible(self) -> bool {
        matches!(
            self,
            ResourceKind::Variable
                | ResourceKind::Resource
                | ResourceKind::Trigger(_)
                | ResourceKind::Folder
                | ResourceKind::Settings
        )
    }

    /// Stem of the metadata file inside a folder kind (`flow.yaml`, `app.yaml`, ...).
    pub fn metadata_stem(self) -> Option<&'static str> {
        match self {
            ResourceKind::Flow => Some("flow"),
            ResourceKind::App => Some("app"),
            ResourceKind::RawApp => Some("raw_app"),
            _ => None,
        }
    }

    /// Suffix of a single-file kind, including the leading dot where one exists.
    ///
    /// `folder.meta.yaml` and `settings.yaml` are whole file names.
    pub fn file_suffix(self) -> Option<String> {
        let suffix = match self {
            ResourceKind::Script => ".script.yaml",
            ResourceKind::Resource => ".resource.yaml",
            ResourceKind::ResourceType => ".resource-type.yaml",
            ResourceKind::Variable => ".variable.yaml",
            ResourceKind::Schedule => ".schedule.yaml",
            ResourceKind::Trigger(t) => return Some(format!(".{}.yaml", t.as_str())),
            ResourceKind::Folder => "folder.meta.yaml",
            ResourceKind::User => ".user.yaml",
            ResourceKind::Group => ".group.yaml",
            ResourceKind::Settings => "settings.yaml",
            ResourceKind::Flow | ResourceKind::App | ResourceKind::RawApp => return None,
        };
        Some(suffix.to_string())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Script => "script",
            ResourceKind::Flow => "flow",
            ResourceKind::App => "app",
            ResourceKind::RawApp => "raw_app",
            ResourceKind::Resource => "resource",
            ResourceKind::ResourceType => "resource_type",
            ResourceKind::Variable => "variable",
            ResourceKind::Schedule => "schedule",
            ResourceKind::Trigger(t) => t.as_str(),
            ResourceKind::Folder => "folder",
            ResourceKind::User => "user",
            ResourceKind::Group => "group",
            ResourceKind::Settings => "settings",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "script" => ResourceKind::Script,
            "flow" => ResourceKind::Flow,
            "app" => ResourceKind::App,
            "raw_app" => ResourceKind::RawApp,
            "resource" => ResourceKind::Resource,
            "resource_type" => ResourceKind::ResourceType,
            "variable" => ResourceKind::Variable,
            "schedule" => ResourceKind::Schedule,
            "folder" => ResourceKind::Folder,
            "user" => ResourceKind::User,
            "group" => ResourceKind::Group,
            "settings" => ResourceKind::Settings,
            other => {
                return TriggerKind::all()
                    .iter()
                    .find(|t| t.as_str() == other)
                    .map(|t| ResourceKind::Trigger(*t))
                    .ok_or_else(|| format!("unknown resource kind '{other}'"));
            }
        };
        Ok(kind)
    }
}

/// Serialization format of a metadata file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataFormat {
    #[default]
    Yaml,
    Json,
}

impl MetadataFormat {
    pub fn extension(self) -> &'static str {
        match self {
            MetadataFormat::Yaml => "yaml",
            MetadataFormat::Json => "json",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
