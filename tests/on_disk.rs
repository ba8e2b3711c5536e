use serde_json::json;
use tempfile::tempdir;

use libscenepatch::{codec::CodecTable, store, AuthoringSession};
use scenefs::Storage;

#[test]
fn project_round_trips_through_disk() {
    let _ = env_logger::try_init();

    let dir = tempdir().unwrap();
    let scene_path = dir.path().join("level.json");
    let project_path = store::project_path(dir.path(), "level");

    fs_err::write(
        &scene_path,
        json!({
            "entities": [
                { "type": "Mesh", "id": "cube1", "name": "Cube", "castShadow": false },
            ],
        })
        .to_string(),
    )
    .unwrap();

    let storage = Storage::new_default();

    let session = AuthoringSession::new(CodecTable::standard());
    session.open(&storage, &scene_path, &project_path).unwrap();
    session.edit_entity("cube1", |cube| {
        cube.fields.insert("castShadow".to_owned(), json!(true));
    });
    session.save(&storage, &project_path).unwrap();

    assert_eq!(
        store::find_projects(&storage, dir.path()).unwrap(),
        vec![project_path.clone()]
    );

    let contents = fs_err::read_to_string(&project_path).unwrap();
    assert!(contents.contains("\n\t\"nodes\""));

    let reopened = AuthoringSession::new(CodecTable::standard());
    reopened.open(&storage, &scene_path, &project_path).unwrap();

    let output_path = dir.path().join("out").join("level.json");
    store::save_scene_file(
        &storage,
        &output_path,
        &reopened.graph(),
        reopened.codecs(),
    )
    .unwrap();

    let written = store::load_scene_file(&storage, &output_path, &CodecTable::standard()).unwrap();
    assert_eq!(
        written.get("cube1").unwrap().get("castShadow"),
        Some(&json!(true))
    );
}
