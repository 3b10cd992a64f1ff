//! Session lifecycle against reader/writer collaborators backed by disk.

mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use pbxedit::error::{ErrorCode, PbxError};
use pbxedit::file::AddFileOptions;
use pbxedit::session::{
    LoadError, ParseFailure, ProjectReader, ProjectSession, ProjectWriter, SessionError,
    WriteFailure,
};

use common::sample_project;

/// Reader double: the document's wire form stored as JSON on disk.
struct JsonFileReader;

impl ProjectReader for JsonFileReader {
    fn read_project(&self, path: &Path) -> Result<Value, ParseFailure> {
        let text = fs::read_to_string(path)
            .map_err(|err| ParseFailure::new(format!("cannot read {}: {err}", path.display())))?;
        serde_json::from_str(&text).map_err(|err| ParseFailure {
            message: format!("cannot parse {}: {err}", path.display()),
            code: Some(1),
        })
    }
}

/// Writer double: serializes the wire form back to JSON on disk.
struct JsonFileWriter {
    target: PathBuf,
}

impl ProjectWriter for JsonFileWriter {
    fn write_project(&self, document: &Value) -> Result<(), WriteFailure> {
        let text = serde_json::to_string_pretty(document)
            .map_err(|err| WriteFailure::new(err.to_string()))?;
        fs::write(&self.target, text).map_err(|err| WriteFailure::new(err.to_string()))
    }
}

/// Writer double: captures the handed-over document in memory.
#[derive(Default, Clone)]
struct CapturingWriter {
    written: Arc<Mutex<Option<Value>>>,
}

impl ProjectWriter for CapturingWriter {
    fn write_project(&self, document: &Value) -> Result<(), WriteFailure> {
        *self.written.lock().unwrap() = Some(document.clone());
        Ok(())
    }
}

fn write_fixture(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("project.pbxproj");
    fs::write(&path, sample_project().to_string()).unwrap();
    path
}

#[test]
fn load_mutate_save_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_fixture(&dir);

    let mut session = ProjectSession::load(&source, JsonFileReader);
    session.wait_ready().unwrap();

    session
        .add_source_file("Plugins/ChildBrowserCommand.m", &AddFileOptions::default())
        .unwrap();
    session
        .add_resource_file("Plugins/childbrowser.bundle", &AddFileOptions::default())
        .unwrap();

    let target = dir.path().join("out.pbxproj");
    session
        .save(&JsonFileWriter {
            target: target.clone(),
        })
        .unwrap();

    // A fresh session over the written document sees the mutations.
    let mut reloaded = ProjectSession::load(&target, JsonFileReader);
    reloaded.wait_ready().unwrap();
    let graph = reloaded.graph().unwrap();
    assert_eq!(graph.section("PBXBuildFile").unwrap().len(), 3);
    assert_eq!(graph.section("PBXFileReference").unwrap().len(), 3);
}

#[test]
fn load_then_save_without_mutation_introduces_no_drift() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_fixture(&dir);

    let mut session = ProjectSession::load(&source, JsonFileReader);
    session.wait_ready().unwrap();

    let writer = CapturingWriter::default();
    session.save(&writer).unwrap();

    // Compare serialized text: `Value` equality is order-insensitive and
    // would miss reordered keys.
    let written = writer.written.lock().unwrap().clone().unwrap();
    assert_eq!(
        serde_json::to_string(&written).unwrap(),
        serde_json::to_string(&sample_project()).unwrap()
    );
}

#[test]
fn unparseable_documents_fail_the_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.pbxproj");
    fs::write(&path, "// !$*UTF8*$! not json at all").unwrap();

    let mut session = ProjectSession::load(&path, JsonFileReader);
    let err = session.wait_ready().unwrap_err();
    assert!(matches!(
        err,
        SessionError::Load(LoadError::Parse(ref failure)) if failure.code == Some(1)
    ));

    // Bridged for CLI-style consumers this is a fatal parse failure.
    let bridged = PbxError::from(err);
    assert_eq!(bridged.error_code(), ErrorCode::ParseFailure);
    assert!(bridged.is_fatal());
}

#[test]
fn a_missing_file_fails_the_load() {
    let mut session = ProjectSession::load("/nonexistent/project.pbxproj", JsonFileReader);
    let err = session.wait_ready().unwrap_err();
    assert!(matches!(err, SessionError::Load(LoadError::Parse(_))));
    assert!(!session.is_ready());
}

#[test]
fn target_not_found_leaves_the_document_saveable() {
    let dir = tempfile::tempdir().unwrap();
    let mut project = sample_project();
    project["project"]
        .as_object_mut()
        .unwrap()
        .get_mut("objects")
        .unwrap()
        .as_object_mut()
        .unwrap()
        .remove("PBXGroup");
    let path = dir.path().join("project.pbxproj");
    fs::write(&path, project.to_string()).unwrap();

    let mut session = ProjectSession::load(&path, JsonFileReader);
    session.wait_ready().unwrap();

    let err = session
        .add_source_file("Plugin.m", &AddFileOptions::default())
        .unwrap_err();
    let bridged = PbxError::from(err);
    assert_eq!(bridged.error_code(), ErrorCode::TargetNotFound);
    assert!(!bridged.is_fatal());

    // The failed operation staged nothing, so saving reproduces the input.
    let writer = CapturingWriter::default();
    session.save(&writer).unwrap();
    let written = writer.written.lock().unwrap().clone().unwrap();
    assert_eq!(
        serde_json::to_string(&written).unwrap(),
        serde_json::to_string(&project).unwrap()
    );
}
