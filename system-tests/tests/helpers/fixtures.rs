// system-tests/tests/helpers/fixtures.rs
// ============================================================================
// Module: Sample Fixtures
// Description: Seed data shared by the API stub and the fixture directory.
// Purpose: Keep the stub's world and the suite's expectations in lockstep.
// Dependencies: serde_json
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde_json::Value;
use serde_json::json;

use super::api_stub::World;

/// Worker targeted by the suite.
pub const WORKER_ID: &str = "w-100";
/// Location targeted by the suite.
pub const LOCATION_ID: &str = "l-200";
/// Form targeted by the suite.
pub const FORM_ID: &str = "f-300";
/// Emergency notes of the seeded worker; patch restores must bring them back.
pub const WORKER_NOTES: &str = "FOR API TESTING - NOTES";
/// Emergency notes written by the worker patch fixture.
pub const PATCHED_WORKER_NOTES: &str = "PATCH - EMERGENCY NOTES";
/// Template of the targeted form.
pub const FORM_TYPE_ID: u64 = 913;
/// Template no targeted form uses.
const OTHER_FORM_TYPE_ID: u64 = 77;

/// Expected worker record.
pub fn worker() -> Value {
    json!({
        "Id": WORKER_ID,
        "FirstName": "Dana",
        "LastName": "Reyes",
        "EmergencyNotes": WORKER_NOTES,
        "IsActive": true,
    })
}

/// Worker PATCH payload.
pub fn worker_patch() -> Value {
    json!({ "Id": WORKER_ID, "EmergencyNotes": PATCHED_WORKER_NOTES })
}

/// Expected location record with every enumerated field.
pub fn location() -> Value {
    json!({
        "Id": LOCATION_ID,
        "Name": "North Yard",
        "Description": "Laydown area",
        "Address": "1 Harbour Rd",
        "StartDate": "2023-01-09T00:00:00",
        "EndDate": null,
        "CreatingCompanyId": 42,
        "IsArchived": false,
        "CreatedOn": "2023-01-05T16:20:00",
    })
}

/// Location PATCH payload.
pub fn location_patch() -> Value {
    json!({ "Id": LOCATION_ID, "Description": "PATCH - DESCRIPTION" })
}

/// Form record with every enumerated field.
pub fn form(id: &str, template_id: u64) -> Value {
    json!({
        "Id": id,
        "Label": format!("Hazard assessment {id}"),
        "CreatedOn": "2024-03-01T08:00:00",
        "CreatedBy": WORKER_ID,
        "IsDeleted": false,
        "DocumentId": format!("doc-{id}"),
        "DocumentTemplateVersionId": 4,
        "DocumentTemplateId": template_id,
        "HasGoodData": true,
        "PrecedingVersionId": null,
        "Due": null,
        "IsPrivate": false,
        "CreatingCompanyId": 42,
        "LocationId": LOCATION_ID,
        "DocumentTemplateName": "Hazard Assessment",
        "Type": "Form",
        "FormScheduleGroupId": null,
        "ProcessRunId": null,
        "ProcessDefinitionId": null,
    })
}

/// Content document of the targeted form.
pub fn form_content() -> Value {
    json!({
        "Sections": [
            { "Title": "Hazards", "Fields": [{ "Label": "Slip risk", "Value": "Low" }] },
            { "Title": "Sign-off", "Fields": [] },
        ]
    })
}

/// World the stub starts from; a conforming run leaves it unchanged.
pub fn sample_world() -> World {
    let mut forms = vec![form(FORM_ID, FORM_TYPE_ID)];
    forms.extend((301..=306).map(|n| form(&format!("f-{n}"), FORM_TYPE_ID)));
    forms.extend((400..=401).map(|n| form(&format!("f-{n}"), OTHER_FORM_TYPE_ID)));
    World {
        workers: BTreeMap::from([(WORKER_ID.to_string(), worker())]),
        locations: BTreeMap::from([(LOCATION_ID.to_string(), location())]),
        forms,
        form_content: BTreeMap::from([(FORM_ID.to_string(), form_content())]),
        assignments: vec![(WORKER_ID.to_string(), LOCATION_ID.to_string())],
    }
}

/// Writes the fixture directory matching [`sample_world`] under `root`.
pub fn write_fixture_dir(root: &Path) -> Result<PathBuf, String> {
    let dir = root.join("fixtures");
    let files = [
        ("entities.json", json!({ "WorkerID": WORKER_ID, "LocationID": LOCATION_ID })),
        ("worker.json", worker()),
        ("workerPatch.json", worker_patch()),
        ("location.json", location()),
        ("locationPatch.json", location_patch()),
        ("Forms/form.json", form(FORM_ID, FORM_TYPE_ID)),
        ("Forms/formContent.json", form_content()),
    ];
    for (name, value) in files {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| format!("create {}: {err}", parent.display()))?;
        }
        let bytes = serde_json::to_vec_pretty(&value).map_err(|err| err.to_string())?;
        fs::write(&path, bytes).map_err(|err| format!("write {}: {err}", path.display()))?;
    }
    Ok(dir)
}
