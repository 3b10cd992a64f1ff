//! pbxedit: programmatic editing of Xcode project documents.
//!
//! An Xcode `project.pbxproj` file is a graph of typed records (file
//! references, build files, groups, build phases) keyed by 24-character hex
//! identifiers, where human-readable names exist only as paired `_comment`
//! entries. This crate models that graph, keeps its implicit cross-references
//! consistent, and exposes atomic add-file mutations on top:
//!
//! - Typed object graph with ordered sections and label maps
//! - Graph-wide unique identifier allocation
//! - File classification by extension
//! - Staged add-source/header/resource transactions
//! - Document sessions with worker-thread parsing
//!
//! The pbxproj grammar itself is out of scope: parsing and serialization are
//! delegated to the [`session::ProjectReader`] and [`session::ProjectWriter`]
//! collaborators, which exchange the JSON-shaped wire form of the document.

pub mod error;
pub mod file;
pub mod filetype;
pub mod graph;
pub mod ident;
pub mod mutate;
pub mod session;

pub use error::{ErrorCode, PbxError};
pub use file::{AddFileOptions, PbxFile};
pub use filetype::LogicalGroup;
pub use graph::{ObjectGraph, Record, RefEntry, Section};
pub use ident::ObjectId;
pub use mutate::MutateError;
pub use session::{
    Document, ParseFailure, ParseJob, ProjectReader, ProjectSession, ProjectWriter, SessionError,
    WriteFailure,
};
