//! File classification: declared type tags and logical grouping.
//!
//! Xcode stamps every file reference with a `lastKnownFileType` tag derived
//! from the file's extension, and labels build-file entries with the logical
//! bucket the file belongs to ("Sources" or "Resources"). Both are pure
//! functions of the path.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Declared Type Tags
// ============================================================================

/// Type tag for Objective-C implementation files (`.m`).
pub const SOURCE_FILE: &str = "sourcecode.c.objc";

/// Type tag for C-family header files (`.h`).
pub const HEADER_FILE: &str = "sourcecode.c.h";

/// Type tag for plugin bundles (`.bundle`). The quotes are part of the tag.
pub const BUNDLE: &str = "\"wrapper.plug-in\"";

/// Type tag for Interface Builder files (`.xib`).
pub const XIB_FILE: &str = "file.xib";

/// Fallback tag for extensions the classifier does not recognize.
pub const UNKNOWN_TYPE: &str = "unknown";

/// Default source-tree root: paths resolve relative to the enclosing group.
/// The quotes are part of the tag.
pub const DEFAULT_SOURCE_TREE: &str = "\"<group>\"";

/// Map a file path to its declared type tag.
///
/// Matching is case-sensitive on the extension: `Foo.M` does not classify as
/// an Objective-C source.
pub fn detect_file_type(path: &str) -> &'static str {
    if path.ends_with(".m") {
        return SOURCE_FILE;
    }
    if path.ends_with(".h") {
        return HEADER_FILE;
    }
    if path.ends_with(".bundle") {
        return BUNDLE;
    }
    if path.ends_with(".xib") {
        return XIB_FILE;
    }
    UNKNOWN_TYPE
}

// ============================================================================
// Logical Group
// ============================================================================

/// The bucket a file lands in for grouping and build-file labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalGroup {
    /// Compiled Objective-C sources.
    Sources,
    /// Everything else. Header files land here too: they carry a source-code
    /// type tag but are not compiled, so the grouping rule does not treat
    /// them as sources.
    Resources,
}

impl LogicalGroup {
    /// Derive the logical group from a declared type tag.
    ///
    /// `Sources` exactly when the tag is the Objective-C source tag; every
    /// other tag, known or unknown, groups with resources.
    pub fn for_file_type(last_type: &str) -> Self {
        if last_type == SOURCE_FILE {
            LogicalGroup::Sources
        } else {
            LogicalGroup::Resources
        }
    }

    /// The label form used in build-file comments and phase names.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalGroup::Sources => "Sources",
            LogicalGroup::Resources => "Resources",
        }
    }
}

impl fmt::Display for LogicalGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
