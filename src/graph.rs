//! The object graph: ordered sections of typed records and their labels.
//!
//! A project document is a mapping from record-type name ("PBXBuildFile",
//! "PBXGroup", ...) to a section of records keyed by [`ObjectId`]. On the
//! wire, a record's human-readable name exists only as a sibling pseudo-entry
//! keyed `<id>_comment`; that is the format's sole name index. Inside the
//! crate each section keeps the labels in their own insertion-ordered map and
//! re-derives the pseudo-entries at serialization time, so nothing ever has
//! to filter comment keys out of a record scan.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::ident::{ObjectId, OBJECT_ID_LEN};

// ============================================================================
// Constants
// ============================================================================

/// Suffix that marks a comment pseudo-entry on the wire.
pub const COMMENT_SUFFIX: &str = "_comment";

/// Section holding PBXBuildFile records.
pub const BUILD_FILE_SECTION: &str = "PBXBuildFile";

/// Section holding PBXFileReference records.
pub const FILE_REFERENCE_SECTION: &str = "PBXFileReference";

/// Section holding PBXGroup records.
pub const GROUP_SECTION: &str = "PBXGroup";

/// Section holding the compile-sources build phase.
pub const SOURCES_BUILD_PHASE_SECTION: &str = "PBXSourcesBuildPhase";

/// Section holding the copy-resources build phase.
pub const RESOURCES_BUILD_PHASE_SECTION: &str = "PBXResourcesBuildPhase";

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while converting the wire document shape.
#[derive(Debug, Error)]
pub enum WireError {
    /// A node that must be a JSON object is something else.
    #[error("expected an object at {path}")]
    NotAnObject { path: String },

    /// A record entry is not a JSON object.
    #[error("record {id} in {section} is not an object")]
    RecordNotObject { section: String, id: String },

    /// A record entry does not match its section's record type.
    #[error("record {id} in {section} is malformed: {source}")]
    MalformedRecord {
        section: String,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    /// A comment pseudo-entry holds something other than a string label.
    #[error("comment entry {key} in {section} is not a string")]
    MalformedComment { section: String, key: String },
}

// ============================================================================
// Records
// ============================================================================

/// An `{identifier, comment}` link used by group children and phase files.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RefEntry {
    /// Identifier of the linked record.
    pub value: ObjectId,
    /// Label the writer emits next to the identifier.
    pub comment: Option<String>,
}

impl RefEntry {
    /// Link to `value`, labeled `comment`.
    pub fn new(value: ObjectId, comment: impl Into<String>) -> Self {
        RefEntry {
            value,
            comment: Some(comment.into()),
        }
    }

    fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("value".to_string(), Value::String(self.value.as_str().to_string()));
        if let Some(comment) = &self.comment {
            map.insert("comment".to_string(), Value::String(comment.clone()));
        }
        Value::Object(map)
    }
}

/// A PBXBuildFile: one file's membership in a build phase, pointing at the
/// PBXFileReference that owns the path.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BuildFile {
    #[serde(rename = "fileRef")]
    pub file_ref: ObjectId,
    /// Field-level comment the writer pairs with `fileRef`.
    #[serde(rename = "fileRef_comment", default)]
    pub file_ref_comment: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Wire body key order at parse time; empty for records built in memory.
    /// Emission follows this order so load/save does not move fields.
    #[serde(skip)]
    pub field_order: Vec<String>,
}

impl BuildFile {
    fn to_body(&self) -> Map<String, Value> {
        let mut modeled = Map::new();
        modeled.insert(
            "fileRef".to_string(),
            Value::String(self.file_ref.as_str().to_string()),
        );
        if let Some(comment) = &self.file_ref_comment {
            modeled.insert("fileRef_comment".to_string(), Value::String(comment.clone()));
        }
        splice_body(&self.field_order, modeled, &self.extra)
    }
}

/// A PBXFileReference: one file on disk, with its declared type and path.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct FileReference {
    #[serde(rename = "fileEncoding", default)]
    pub file_encoding: Option<u32>,
    #[serde(rename = "lastKnownFileType", default)]
    pub last_known_file_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(rename = "sourceTree", default)]
    pub source_tree: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Wire body key order at parse time; empty for records built in memory.
    #[serde(skip)]
    pub field_order: Vec<String>,
}

impl FileReference {
    fn to_body(&self) -> Map<String, Value> {
        let mut modeled = Map::new();
        if let Some(encoding) = self.file_encoding {
            modeled.insert("fileEncoding".to_string(), Value::from(encoding));
        }
        if let Some(tag) = &self.last_known_file_type {
            modeled.insert("lastKnownFileType".to_string(), Value::String(tag.clone()));
        }
        if let Some(name) = &self.name {
            modeled.insert("name".to_string(), Value::String(name.clone()));
        }
        if let Some(path) = &self.path {
            modeled.insert("path".to_string(), Value::String(path.clone()));
        }
        if let Some(tree) = &self.source_tree {
            modeled.insert("sourceTree".to_string(), Value::String(tree.clone()));
        }
        splice_body(&self.field_order, modeled, &self.extra)
    }
}

/// A PBXGroup: an ordered list of child links into the group tree. The
/// group's own display name lives only in the section's label map.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub children: Vec<RefEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Wire body key order at parse time; empty for records built in memory.
    #[serde(skip)]
    pub field_order: Vec<String>,
}

impl Group {
    fn to_body(&self) -> Map<String, Value> {
        let mut modeled = Map::new();
        modeled.insert(
            "children".to_string(),
            Value::Array(self.children.iter().map(RefEntry::to_value).collect()),
        );
        splice_body(&self.field_order, modeled, &self.extra)
    }
}

/// A build phase: an ordered list of links to PBXBuildFile records. Like
/// groups, the phase's display name lives only in the section's label map.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct BuildPhase {
    #[serde(default)]
    pub files: Vec<RefEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Wire body key order at parse time; empty for records built in memory.
    #[serde(skip)]
    pub field_order: Vec<String>,
}

impl BuildPhase {
    fn to_body(&self) -> Map<String, Value> {
        let mut modeled = Map::new();
        modeled.insert(
            "files".to_string(),
            Value::Array(self.files.iter().map(RefEntry::to_value).collect()),
        );
        splice_body(&self.field_order, modeled, &self.extra)
    }
}

/// Reassemble a record body in its original key order: modeled keys carry
/// their current values, unmodeled keys come from `extra`, and keys absent at
/// parse time are appended (modeled first). A modeled key that was on the
/// wire but is unset now is dropped.
fn splice_body(
    order: &[String],
    mut modeled: Map<String, Value>,
    extra: &Map<String, Value>,
) -> Map<String, Value> {
    let mut map = Map::new();
    for key in order {
        if let Some(value) = modeled.shift_remove(key) {
            map.insert(key.clone(), value);
        } else if let Some(value) = extra.get(key) {
            map.insert(key.clone(), value.clone());
        }
    }
    for (key, value) in modeled {
        map.insert(key, value);
    }
    for (key, value) in extra {
        if !map.contains_key(key) {
            map.insert(key.clone(), value.clone());
        }
    }
    map
}

/// One typed entry in a section.
///
/// Record types the crate does not interpret are carried verbatim in
/// [`Record::Unknown`] so a load/save cycle never drops them.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    BuildFile(BuildFile),
    FileReference(FileReference),
    Group(Group),
    BuildPhase(BuildPhase),
    Unknown(Map<String, Value>),
}

impl Record {
    pub fn as_build_file(&self) -> Option<&BuildFile> {
        match self {
            Record::BuildFile(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_file_reference(&self) -> Option<&FileReference> {
        match self {
            Record::FileReference(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Record::Group(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut Group> {
        match self {
            Record::Group(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_build_phase(&self) -> Option<&BuildPhase> {
        match self {
            Record::BuildPhase(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_build_phase_mut(&mut self) -> Option<&mut BuildPhase> {
        match self {
            Record::BuildPhase(record) => Some(record),
            _ => None,
        }
    }

    /// Parse one wire record. The record type is dispatched on the section
    /// name, which equals the record's `isa`.
    fn from_wire(section: &str, id: &str, value: Value) -> Result<Record, WireError> {
        let Value::Object(mut map) = value else {
            return Err(WireError::RecordNotObject {
                section: section.to_string(),
                id: id.to_string(),
            });
        };

        if !is_modeled_section(section) {
            return Ok(Record::Unknown(map));
        }

        // `isa` duplicates the section name; it is re-derived on the way
        // out. `shift_remove` keeps the remaining keys in wire order.
        map.shift_remove("isa");
        let field_order: Vec<String> = map.keys().cloned().collect();
        let body = Value::Object(map);
        let malformed = |source| WireError::MalformedRecord {
            section: section.to_string(),
            id: id.to_string(),
            source,
        };

        let record = match section {
            BUILD_FILE_SECTION => {
                let mut record: BuildFile = serde_json::from_value(body).map_err(malformed)?;
                record.field_order = field_order;
                Record::BuildFile(record)
            }
            FILE_REFERENCE_SECTION => {
                let mut record: FileReference =
                    serde_json::from_value(body).map_err(malformed)?;
                record.field_order = field_order;
                Record::FileReference(record)
            }
            GROUP_SECTION => {
                let mut record: Group = serde_json::from_value(body).map_err(malformed)?;
                record.field_order = field_order;
                Record::Group(record)
            }
            _ => {
                let mut record: BuildPhase = serde_json::from_value(body).map_err(malformed)?;
                record.field_order = field_order;
                Record::BuildPhase(record)
            }
        };
        Ok(record)
    }

    /// Serialize back to the wire record shape, `isa` first.
    fn to_wire(&self, section: &str) -> Value {
        let body = match self {
            Record::Unknown(raw) => return Value::Object(raw.clone()),
            Record::BuildFile(record) => record.to_body(),
            Record::FileReference(record) => record.to_body(),
            Record::Group(record) => record.to_body(),
            Record::BuildPhase(record) => record.to_body(),
        };
        let mut map = Map::new();
        map.insert("isa".to_string(), Value::String(section.to_string()));
        map.extend(body);
        Value::Object(map)
    }
}

/// Sections whose records the crate types out. Every build-phase flavor uses
/// the same `{files: [...]}` shape, so any `*BuildPhase` section is modeled.
fn is_modeled_section(section: &str) -> bool {
    matches!(
        section,
        BUILD_FILE_SECTION | FILE_REFERENCE_SECTION | GROUP_SECTION
    ) || section.ends_with("BuildPhase")
}

// ============================================================================
// Section
// ============================================================================

/// One record type's slice of the graph: records plus their labels, both in
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    records: IndexMap<ObjectId, Record>,
    labels: IndexMap<ObjectId, String>,
}

impl Section {
    /// Number of real records (labels do not count).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of labels, orphans included.
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn get(&self, id: &ObjectId) -> Option<&Record> {
        self.records.get(id)
    }

    pub fn get_mut(&mut self, id: &ObjectId) -> Option<&mut Record> {
        self.records.get_mut(id)
    }

    /// The label paired with `id`, if any.
    pub fn label(&self, id: &ObjectId) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    /// Real records in insertion order.
    pub fn records(&self) -> impl Iterator<Item = (&ObjectId, &Record)> {
        self.records.iter()
    }

    /// Insert a record without a label.
    pub fn insert(&mut self, id: ObjectId, record: Record) {
        self.records.insert(id, record);
    }

    /// Insert a record together with its label.
    pub fn insert_labeled(&mut self, id: ObjectId, record: Record, label: impl Into<String>) {
        self.labels.insert(id.clone(), label.into());
        self.records.insert(id, record);
    }

    /// Resolve a display name to its identifier and record.
    ///
    /// Scans the labels in insertion order; the first label equal to `name`
    /// wins, deterministically, even when duplicates exist. A winning label
    /// with no record behind it (an orphan) resolves to nothing, matching a
    /// lookup of a name that never appears.
    pub fn find_named(&self, name: &str) -> Option<(&ObjectId, &Record)> {
        let id = self
            .labels
            .iter()
            .find_map(|(id, label)| (label == name).then_some(id))?;
        self.records.get(id).map(|record| (id, record))
    }

    /// Resolve a display name to its record. See [`Section::find_named`].
    pub fn find_by_name(&self, name: &str) -> Option<&Record> {
        self.find_named(name).map(|(_, record)| record)
    }

    /// Mutable variant of [`Section::find_by_name`], same resolution rules.
    pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut Record> {
        let id = self
            .labels
            .iter()
            .find_map(|(id, label)| (label == name).then(|| id.clone()))?;
        self.records.get_mut(&id)
    }

    fn from_wire(section_name: &str, value: Value) -> Result<Section, WireError> {
        let Value::Object(entries) = value else {
            return Err(WireError::NotAnObject {
                path: format!("objects.{section_name}"),
            });
        };

        let mut section = Section::default();
        for (key, entry) in entries {
            if let Some(id) = key.strip_suffix(COMMENT_SUFFIX) {
                let Value::String(label) = entry else {
                    return Err(WireError::MalformedComment {
                        section: section_name.to_string(),
                        key,
                    });
                };
                section.labels.insert(ObjectId::new(id), label);
            } else {
                let record = Record::from_wire(section_name, &key, entry)?;
                section.records.insert(ObjectId::new(key), record);
            }
        }
        Ok(section)
    }

    fn to_wire(&self, section_name: &str) -> Value {
        let mut map = Map::new();
        for (id, record) in &self.records {
            map.insert(id.as_str().to_string(), record.to_wire(section_name));
            if let Some(label) = self.labels.get(id) {
                map.insert(
                    format!("{}{}", id.as_str(), COMMENT_SUFFIX),
                    Value::String(label.clone()),
                );
            }
        }
        // Orphan labels survive the trip even though nothing resolves them.
        for (id, label) in &self.labels {
            if !self.records.contains_key(id) {
                map.insert(
                    format!("{}{}", id.as_str(), COMMENT_SUFFIX),
                    Value::String(label.clone()),
                );
            }
        }
        Value::Object(map)
    }
}

// ============================================================================
// ObjectGraph
// ============================================================================

/// The full in-memory graph of one project document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectGraph {
    sections: IndexMap<String, Section>,
}

impl ObjectGraph {
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections.get_mut(name)
    }

    /// The named section, created empty when absent.
    pub fn section_entry(&mut self, name: &str) -> &mut Section {
        self.sections.entry(name.to_string()).or_default()
    }

    /// Sections in document order.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &Section)> {
        self.sections.iter().map(|(name, section)| (name.as_str(), section))
    }

    /// The uniqueness universe: every canonical record identifier across all
    /// sections jointly. Labels never participate.
    pub fn all_ids(&self) -> HashSet<&str> {
        self.sections
            .values()
            .flat_map(|section| section.records.keys())
            .map(ObjectId::as_str)
            .filter(|id| id.len() == OBJECT_ID_LEN)
            .collect()
    }

    /// Build the graph from the wire `objects` mapping.
    pub fn from_wire(value: Value) -> Result<ObjectGraph, WireError> {
        let Value::Object(entries) = value else {
            return Err(WireError::NotAnObject {
                path: "objects".to_string(),
            });
        };

        let mut graph = ObjectGraph::default();
        for (name, section_value) in entries {
            let section = Section::from_wire(&name, section_value)?;
            graph.sections.insert(name, section);
        }
        Ok(graph)
    }

    /// Serialize back to the wire `objects` mapping, re-deriving every
    /// `<id>_comment` pseudo-entry from the label maps.
    pub fn to_wire(&self) -> Value {
        let mut map = Map::new();
        for (name, section) in &self.sections {
            map.insert(name.clone(), section.to_wire(name));
        }
        Value::Object(map)
    }
}

// ============================================================================
// Tests
// ============================================================================
