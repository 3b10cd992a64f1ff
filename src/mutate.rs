//! Add-file transactions: the multi-record insert behind "add a file".
//!
//! Adding one file touches up to four independently keyed sections that must
//! stay mutually consistent: the PBXFileReference that owns the path, the
//! PBXBuildFile that enrolls it in a build phase, the group whose children
//! list names it, and the build phase whose file list compiles or copies it.
//! The linkage is purely by convention; nothing in the format enforces the
//! cross-references.
//!
//! Every entry point runs as one staged transaction: all named targets are
//! resolved and all identifiers allocated before the first insert, so a
//! missing group or phase fails the operation with the graph untouched.

use serde_json::Map;
use thiserror::Error;
use tracing::debug;

use crate::file::{AddFileOptions, PbxFile};
use crate::graph::{
    BuildFile, FileReference, ObjectGraph, Record, RefEntry, BUILD_FILE_SECTION,
    FILE_REFERENCE_SECTION, GROUP_SECTION, RESOURCES_BUILD_PHASE_SECTION,
    SOURCES_BUILD_PHASE_SECTION,
};
use crate::ident::{IdentError, ObjectId};

// ============================================================================
// Target Names
// ============================================================================

/// Group that receives every added file.
pub const PLUGINS_GROUP: &str = "Plugins";

/// Build phase that compiles added sources.
pub const SOURCES_PHASE: &str = "Sources";

/// Build phase that copies added resources.
pub const RESOURCES_PHASE: &str = "Resources";

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can fail an add-file transaction. The graph is unchanged in
/// every case.
#[derive(Debug, Error)]
pub enum MutateError {
    /// No record in `section` carries the label `name`.
    #[error("no {section} entry named '{name}'")]
    TargetNotFound { section: String, name: String },

    /// A record carries the label `name` but is not the expected type.
    #[error("'{name}' in {section} is not a {expected}")]
    WrongRecordKind {
        section: String,
        name: String,
        expected: &'static str,
    },

    /// Identifier allocation failed.
    #[error(transparent)]
    Ident(#[from] IdentError),
}

fn not_found(section: &str, name: &str) -> MutateError {
    MutateError::TargetNotFound {
        section: section.to_string(),
        name: name.to_string(),
    }
}

fn wrong_kind(section: &str, name: &str, expected: &'static str) -> MutateError {
    MutateError::WrongRecordKind {
        section: section.to_string(),
        name: name.to_string(),
        expected,
    }
}

// ============================================================================
// File Kinds
// ============================================================================

/// Which record set an entry point touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Source,
    Header,
    Resource,
}

impl FileKind {
    /// The build phase this kind enrolls into, as (section, phase name).
    /// Headers are not built, so they enroll nowhere.
    fn phase_target(self) -> Option<(&'static str, &'static str)> {
        match self {
            FileKind::Source => Some((SOURCES_BUILD_PHASE_SECTION, SOURCES_PHASE)),
            FileKind::Resource => Some((RESOURCES_BUILD_PHASE_SECTION, RESOURCES_PHASE)),
            FileKind::Header => None,
        }
    }

    /// Headers get a file reference only, no PBXBuildFile.
    fn wants_build_file(self) -> bool {
        !matches!(self, FileKind::Header)
    }
}

// ============================================================================
// Entry Points
// ============================================================================

impl ObjectGraph {
    /// Add a source file: PBXBuildFile + PBXFileReference, linked into the
    /// "Plugins" group and the "Sources" build phase.
    pub fn add_source_file(
        &mut self,
        path: &str,
        options: &AddFileOptions,
    ) -> Result<PbxFile, MutateError> {
        self.add_file(path, options, FileKind::Source)
    }

    /// Add a header file: PBXFileReference linked into the "Plugins" group.
    /// Headers are not compiled, so no build-file record and no phase entry.
    pub fn add_header_file(
        &mut self,
        path: &str,
        options: &AddFileOptions,
    ) -> Result<PbxFile, MutateError> {
        self.add_file(path, options, FileKind::Header)
    }

    /// Add a resource file: PBXBuildFile + PBXFileReference, linked into the
    /// "Plugins" group and the "Resources" build phase.
    pub fn add_resource_file(
        &mut self,
        path: &str,
        options: &AddFileOptions,
    ) -> Result<PbxFile, MutateError> {
        self.add_file(path, options, FileKind::Resource)
    }

    fn add_file(
        &mut self,
        path: &str,
        options: &AddFileOptions,
        kind: FileKind,
    ) -> Result<PbxFile, MutateError> {
        let mut file = PbxFile::new(path, options);

        // Stage: every named target must resolve and every identifier must
        // allocate before the first insert. A failure here leaves the graph
        // untouched.
        self.require_group(PLUGINS_GROUP)?;
        if let Some((section, name)) = kind.phase_target() {
            self.require_phase(section, name)?;
        }

        let mut ids =
            ObjectId::allocate_many(self, if kind.wants_build_file() { 2 } else { 1 })?;
        let file_ref_id = ids.remove(0);
        let build_file_id = ids.pop();

        // Commit: the file reference first, then the build file pointing at
        // it, then the links. Nothing past this point can fail while this
        // thread holds the graph.
        let reference = FileReference {
            file_encoding: None,
            last_known_file_type: Some(file.last_type.clone()),
            name: Some(file.basename.clone()),
            path: Some(file.path.clone()),
            source_tree: Some(file.source_tree.clone()),
            extra: Map::new(),
            field_order: Vec::new(),
        };
        self.section_entry(FILE_REFERENCE_SECTION).insert_labeled(
            file_ref_id.clone(),
            Record::FileReference(reference),
            file.basename.clone(),
        );

        if let Some(build_file_id) = &build_file_id {
            let build_file = BuildFile {
                file_ref: file_ref_id.clone(),
                file_ref_comment: Some(file.basename.clone()),
                extra: Map::new(),
                field_order: Vec::new(),
            };
            self.section_entry(BUILD_FILE_SECTION).insert_labeled(
                build_file_id.clone(),
                Record::BuildFile(build_file),
                file.long_comment(),
            );
        }

        self.append_group_child(
            PLUGINS_GROUP,
            RefEntry::new(file_ref_id.clone(), file.basename.clone()),
        )?;
        if let (Some((section, name)), Some(build_file_id)) =
            (kind.phase_target(), &build_file_id)
        {
            self.append_phase_file(
                section,
                name,
                RefEntry::new(build_file_id.clone(), file.long_comment()),
            )?;
        }

        debug!(
            "added {} ({}) to group '{}'",
            file.basename, file.last_type, PLUGINS_GROUP
        );

        file.file_ref_id = Some(file_ref_id);
        file.build_file_id = build_file_id;
        Ok(file)
    }

    fn require_group(&self, name: &str) -> Result<(), MutateError> {
        let record = self
            .section(GROUP_SECTION)
            .and_then(|section| section.find_by_name(name))
            .ok_or_else(|| not_found(GROUP_SECTION, name))?;
        if record.as_group().is_none() {
            return Err(wrong_kind(GROUP_SECTION, name, "group"));
        }
        Ok(())
    }

    fn require_phase(&self, section_name: &str, name: &str) -> Result<(), MutateError> {
        let record = self
            .section(section_name)
            .and_then(|section| section.find_by_name(name))
            .ok_or_else(|| not_found(section_name, name))?;
        if record.as_build_phase().is_none() {
            return Err(wrong_kind(section_name, name, "build phase"));
        }
        Ok(())
    }

    /// Append a child link to the named group, at the end of its children.
    /// The same lookup the staging step already proved out.
    fn append_group_child(&mut self, name: &str, entry: RefEntry) -> Result<(), MutateError> {
        let group = self
            .section_mut(GROUP_SECTION)
            .and_then(|section| section.find_by_name_mut(name))
            .and_then(Record::as_group_mut)
            .ok_or_else(|| not_found(GROUP_SECTION, name))?;
        group.children.push(entry);
        Ok(())
    }

    /// Append a file link to the named build phase, at the end of its files.
    fn append_phase_file(
        &mut self,
        section_name: &str,
        name: &str,
        entry: RefEntry,
    ) -> Result<(), MutateError> {
        let phase = self
            .section_mut(section_name)
            .and_then(|section| section.find_by_name_mut(name))
            .and_then(Record::as_build_phase_mut)
            .ok_or_else(|| not_found(section_name, name))?;
        phase.files.push(entry);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{BuildPhase, Group};

    fn id(seed: &str) -> ObjectId {
        ObjectId::from(seed)
    }

    fn fixture() -> ObjectGraph {
        let mut graph = ObjectGraph::default();
        graph.section_entry(GROUP_SECTION).insert_labeled(
            id("F0F0F0F0F0F0F0F0F0F0F0F0"),
            Record::Group(Group::default()),
            PLUGINS_GROUP,
        );
        graph.section_entry(SOURCES_BUILD_PHASE_SECTION).insert_labeled(
            id("E0E0E0E0E0E0E0E0E0E0E0E0"),
            Record::BuildPhase(BuildPhase::default()),
            SOURCES_PHASE,
        );
        graph
            .section_entry(RESOURCES_BUILD_PHASE_SECTION)
            .insert_labeled(
                id("D0D0D0D0D0D0D0D0D0D0D0D0"),
                Record::BuildPhase(BuildPhase::default()),
                RESOURCES_PHASE,
            );
        graph
    }

    fn plugins_children(graph: &ObjectGraph) -> &Vec<RefEntry> {
        let record = graph
            .section(GROUP_SECTION)
            .and_then(|section| section.find_by_name(PLUGINS_GROUP))
            .unwrap();
        &record.as_group().unwrap().children
    }

    #[test]
    fn source_flow_touches_all_four_sections() {
        let mut graph = fixture();
        let file = graph
            .add_source_file("Plugins/ChildBrowser.m", &AddFileOptions::default())
            .unwrap();

        let file_ref_id = file.file_ref_id.clone().unwrap();
        let build_file_id = file.build_file_id.clone().unwrap();

        let refs = graph.section(FILE_REFERENCE_SECTION).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs.label(&file_ref_id), Some("ChildBrowser.m"));

        let build_files = graph.section(BUILD_FILE_SECTION).unwrap();
        assert_eq!(build_files.len(), 1);
        assert_eq!(
            build_files.label(&build_file_id),
            Some("ChildBrowser.m in Sources")
        );
        let record = build_files.get(&build_file_id).unwrap();
        assert_eq!(record.as_build_file().unwrap().file_ref, file_ref_id);

        let children = plugins_children(&graph);
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].value, file_ref_id);

        let phase = graph
            .section(SOURCES_BUILD_PHASE_SECTION)
            .and_then(|section| section.find_by_name(SOURCES_PHASE))
            .and_then(Record::as_build_phase)
            .unwrap();
        assert_eq!(phase.files.len(), 1);
        assert_eq!(phase.files[0].value, build_file_id);
    }

    #[test]
    fn header_flow_skips_build_records() {
        let mut graph = fixture();
        let file = graph
            .add_header_file("Plugins/ChildBrowser.h", &AddFileOptions::default())
            .unwrap();

        assert!(file.build_file_id.is_none());
        assert!(file.file_ref_id.is_some());
        assert!(graph.section(BUILD_FILE_SECTION).is_none());
        assert_eq!(graph.section(FILE_REFERENCE_SECTION).unwrap().len(), 1);
        assert_eq!(plugins_children(&graph).len(), 1);

        let sources = graph
            .section(SOURCES_BUILD_PHASE_SECTION)
            .and_then(|section| section.find_by_name(SOURCES_PHASE))
            .and_then(Record::as_build_phase)
            .unwrap();
        assert!(sources.files.is_empty());
    }

    #[test]
    fn resource_flow_appends_to_the_resources_phase() {
        let mut graph = fixture();
        let file = graph
            .add_resource_file("Plugins/childbrowser.bundle", &AddFileOptions::default())
            .unwrap();

        let phase = graph
            .section(RESOURCES_BUILD_PHASE_SECTION)
            .and_then(|section| section.find_by_name(RESOURCES_PHASE))
            .and_then(Record::as_build_phase)
            .unwrap();
        assert_eq!(phase.files.len(), 1);
        assert_eq!(
            phase.files[0].comment.as_deref(),
            Some("childbrowser.bundle in Resources")
        );
        assert!(file.build_file_id.is_some());
    }

    #[test]
    fn missing_group_fails_and_leaves_the_graph_unchanged() {
        let mut graph = ObjectGraph::default();
        graph.section_entry(SOURCES_BUILD_PHASE_SECTION).insert_labeled(
            id("E0E0E0E0E0E0E0E0E0E0E0E0"),
            Record::BuildPhase(BuildPhase::default()),
            SOURCES_PHASE,
        );
        let before = graph.clone();

        let err = graph
            .add_source_file("Plugin.m", &AddFileOptions::default())
            .unwrap_err();
        assert!(matches!(err, MutateError::TargetNotFound { .. }));
        assert_eq!(graph, before);
    }

    #[test]
    fn missing_phase_fails_and_leaves_the_graph_unchanged() {
        let mut graph = ObjectGraph::default();
        graph.section_entry(GROUP_SECTION).insert_labeled(
            id("F0F0F0F0F0F0F0F0F0F0F0F0"),
            Record::Group(Group::default()),
            PLUGINS_GROUP,
        );
        let before = graph.clone();

        let err = graph
            .add_source_file("Plugin.m", &AddFileOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            MutateError::TargetNotFound { ref section, .. } if section == SOURCES_BUILD_PHASE_SECTION
        ));
        assert_eq!(graph, before);
    }

    #[test]
    fn plugins_label_on_a_non_group_is_wrong_kind() {
        let mut graph = ObjectGraph::default();
        graph.section_entry(GROUP_SECTION).insert_labeled(
            id("ABABABABABABABABABABABAB"),
            Record::Unknown(Map::new()),
            PLUGINS_GROUP,
        );
        let err = graph
            .add_header_file("Plugin.h", &AddFileOptions::default())
            .unwrap_err();
        assert!(matches!(err, MutateError::WrongRecordKind { .. }));
    }

    #[test]
    fn duplicate_paths_insert_independent_records() {
        let mut graph = fixture();
        let first = graph
            .add_source_file("Plugin.m", &AddFileOptions::default())
            .unwrap();
        let second = graph
            .add_source_file("Plugin.m", &AddFileOptions::default())
            .unwrap();

        assert_ne!(first.file_ref_id, second.file_ref_id);
        assert_eq!(graph.section(FILE_REFERENCE_SECTION).unwrap().len(), 2);
        assert_eq!(graph.section(BUILD_FILE_SECTION).unwrap().len(), 2);
        assert_eq!(plugins_children(&graph).len(), 2);
    }
}
