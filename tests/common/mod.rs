//! Shared test fixture: a small but realistic project document in the wire
//! shape the reader collaborator produces.

use serde_json::{json, Value};

/// One application target with a main group, a "Plugins" group, a populated
/// "Sources" phase and an empty "Resources" phase.
pub fn sample_project() -> Value {
    json!({
        "project": {
            "archiveVersion": 1,
            "classes": {},
            "objectVersion": 45,
            "objects": sample_objects(),
            "rootObject": "29B97313FDCFA39411CA2CEA"
        }
    })
}

/// The `objects` graph of [`sample_project`].
pub fn sample_objects() -> Value {
    json!({
        "PBXBuildFile": {
            "1D60589B0D05DD56006BFB54": {
                "isa": "PBXBuildFile",
                "fileRef": "29B97316FDCFA39411CA2CEA",
                "fileRef_comment": "main.m"
            },
            "1D60589B0D05DD56006BFB54_comment": "main.m in Sources"
        },
        "PBXFileReference": {
            "29B97316FDCFA39411CA2CEA": {
                "isa": "PBXFileReference",
                "fileEncoding": 4,
                "lastKnownFileType": "sourcecode.c.objc",
                "name": "main.m",
                "path": "main.m",
                "sourceTree": "\"<group>\""
            },
            "29B97316FDCFA39411CA2CEA_comment": "main.m"
        },
        "PBXGroup": {
            "29B97314FDCFA39411CA2CEA": {
                "isa": "PBXGroup",
                "children": [
                    { "value": "34CF37BB122E02D1007502C6", "comment": "Plugins" },
                    { "value": "29B97316FDCFA39411CA2CEA", "comment": "main.m" }
                ],
                "name": "CustomTemplate",
                "sourceTree": "\"<group>\""
            },
            "29B97314FDCFA39411CA2CEA_comment": "CustomTemplate",
            "34CF37BB122E02D1007502C6": {
                "isa": "PBXGroup",
                "children": [],
                "path": "Plugins",
                "sourceTree": "\"<group>\""
            },
            "34CF37BB122E02D1007502C6_comment": "Plugins"
        },
        "PBXSourcesBuildPhase": {
            "1D60589E0D05DD56006BFB54": {
                "isa": "PBXSourcesBuildPhase",
                "buildActionMask": 2147483647i64,
                "files": [
                    { "value": "1D60589B0D05DD56006BFB54", "comment": "main.m in Sources" }
                ],
                "runOnlyForDeploymentPostprocessing": 0
            },
            "1D60589E0D05DD56006BFB54_comment": "Sources"
        },
        "PBXResourcesBuildPhase": {
            "1D60589D0D05DD56006BFB54": {
                "isa": "PBXResourcesBuildPhase",
                "buildActionMask": 2147483647i64,
                "files": [],
                "runOnlyForDeploymentPostprocessing": 0
            },
            "1D60589D0D05DD56006BFB54_comment": "Resources"
        },
        "PBXProject": {
            "29B97313FDCFA39411CA2CEA": {
                "isa": "PBXProject",
                "compatibilityVersion": "\"Xcode 3.1\"",
                "mainGroup": "29B97314FDCFA39411CA2CEA",
                "projectDirPath": "\"\""
            },
            "29B97313FDCFA39411CA2CEA_comment": "Project object"
        }
    })
}
