//! File descriptors: the transient value object behind an add-file operation.
//!
//! A [`PbxFile`] describes one file about to be inserted into the graph. It
//! is built per call from the path and the caller's overrides, picks up its
//! record identifiers while the transaction commits, and is returned to the
//! caller. Nothing here touches the graph.

use std::path::Path;

use serde::Serialize;

use crate::filetype::{detect_file_type, LogicalGroup, DEFAULT_SOURCE_TREE};
use crate::ident::ObjectId;

// ============================================================================
// Options
// ============================================================================

/// Caller overrides accepted by the add-file entry points.
#[derive(Debug, Clone, Default)]
pub struct AddFileOptions {
    /// Force the declared type tag instead of classifying by extension.
    pub last_type: Option<String>,
    /// Force the source-tree root tag instead of the group-relative default.
    pub source_tree: Option<String>,
}

// ============================================================================
// PbxFile
// ============================================================================

/// Descriptor for one file being added to the project graph.
#[derive(Debug, Clone, Serialize)]
pub struct PbxFile {
    /// Final path segment, used as the record name and label.
    pub basename: String,
    /// The path as given by the caller, stored on the file reference.
    pub path: String,
    /// Declared type tag (`lastKnownFileType`).
    pub last_type: String,
    /// Logical bucket derived from the (possibly overridden) type tag.
    pub group: LogicalGroup,
    /// Source-tree root tag.
    pub source_tree: String,
    /// Identifier of the PBXBuildFile record, set when a transaction that
    /// creates one commits.
    pub build_file_id: Option<ObjectId>,
    /// Identifier of the PBXFileReference record, set when the transaction
    /// commits.
    pub file_ref_id: Option<ObjectId>,
}

impl PbxFile {
    /// Build a descriptor for `path`, applying `options` overrides.
    ///
    /// Does not allocate identifiers; that happens inside the transaction so
    /// allocation sees the graph state at commit time.
    pub fn new(path: &str, options: &AddFileOptions) -> Self {
        let last_type = options
            .last_type
            .clone()
            .unwrap_or_else(|| detect_file_type(path).to_string());
        let group = LogicalGroup::for_file_type(&last_type);
        let source_tree = options
            .source_tree
            .clone()
            .unwrap_or_else(|| DEFAULT_SOURCE_TREE.to_string());

        PbxFile {
            basename: basename_of(path),
            path: path.to_string(),
            last_type,
            group,
            source_tree,
            build_file_id: None,
            file_ref_id: None,
        }
    }

    /// The `"<basename> in <group>"` label paired with build-file entries.
    pub fn long_comment(&self) -> String {
        format!("{} in {}", self.basename, self.group)
    }
}

/// Final path segment of `path`; the path itself when it has no segments.
fn basename_of(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filetype::{BUNDLE, SOURCE_FILE, UNKNOWN_TYPE};

    #[test]
    fn basename_is_the_final_path_segment() {
        let file = PbxFile::new("Plugins/ChildBrowser.m", &AddFileOptions::default());
        assert_eq!(file.basename, "ChildBrowser.m");
        assert_eq!(file.path, "Plugins/ChildBrowser.m");
    }

    #[test]
    fn source_files_default_to_group_relative_tree() {
        let file = PbxFile::new("Plugin.m", &AddFileOptions::default());
        assert_eq!(file.last_type, SOURCE_FILE);
        assert_eq!(file.group, LogicalGroup::Sources);
        assert_eq!(file.source_tree, DEFAULT_SOURCE_TREE);
        assert!(file.build_file_id.is_none());
        assert!(file.file_ref_id.is_none());
    }

    #[test]
    fn last_type_override_bypasses_classification() {
        let options = AddFileOptions {
            last_type: Some(BUNDLE.to_string()),
            ..Default::default()
        };
        let file = PbxFile::new("Plugin.m", &options);
        assert_eq!(file.last_type, BUNDLE);
        // Grouping follows the overridden tag, not the extension.
        assert_eq!(file.group, LogicalGroup::Resources);
    }

    #[test]
    fn source_tree_override_is_used_verbatim() {
        let options = AddFileOptions {
            source_tree: Some("SDKROOT".to_string()),
            ..Default::default()
        };
        let file = PbxFile::new("Plugin.m", &options);
        assert_eq!(file.source_tree, "SDKROOT");
    }

    #[test]
    fn unknown_files_carry_the_unknown_tag() {
        let file = PbxFile::new("README.txt", &AddFileOptions::default());
        assert_eq!(file.last_type, UNKNOWN_TYPE);
        assert_eq!(file.group, LogicalGroup::Resources);
    }

    #[test]
    fn long_comment_names_the_logical_group() {
        let source = PbxFile::new("Plugin.m", &AddFileOptions::default());
        assert_eq!(source.long_comment(), "Plugin.m in Sources");

        let resource = PbxFile::new("MainWindow.xib", &AddFileOptions::default());
        assert_eq!(resource.long_comment(), "MainWindow.xib in Resources");
    }
}
