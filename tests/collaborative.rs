use std::path::{Path, PathBuf};

use otsync::hash::{crc32, hash_file};
use otsync::patch::apply_one;
use otsync::{diff, DiffMode, EditScript, Operation, Reconciler, ShadowStore, SyncError};

/// Apply one operation to the authoritative file and return the post-apply
/// hash, the way the server's write handler does.
fn server_applier(path: PathBuf) -> impl FnMut(&Operation) -> std::io::Result<u32> {
    move |op| {
        let mut content = std::fs::read(&path)?;
        apply_one(&mut content, op).map_err(std::io::Error::other)?;
        std::fs::write(&path, &content)?;
        hash_file(&path)
    }
}

/// Create the shared file through the reconciler so its initial state is a
/// findable checkpoint, as it would be after any accepted write.
fn seed_file(reconciler: &Reconciler, file: &Path, key: &str, content: &[u8]) {
    std::fs::write(file, b"").unwrap();
    let mut ops = vec![Operation::append(0, content.to_vec()).with_base_hash(crc32(b""))];
    reconciler
        .commit(key, &mut ops, crc32(b""), server_applier(file.to_path_buf()))
        .unwrap();
}

/// Client-side write interception: diff the shadow copy against the edited
/// buffer and tag the operations with the shadow's hash.
fn local_edit(store: &mut ShadowStore, file: &Path, key: &str, new_content: &[u8]) -> Vec<Operation> {
    let path = file.to_path_buf();
    let shadow = store
        .ensure_initialized(key, || std::fs::read(&path))
        .unwrap();
    let base_hash = crc32(shadow);
    diff::diff(shadow, new_content)
        .into_iter()
        .map(|op| op.with_base_hash(base_hash))
        .collect()
}

/// After a successful commit the client's shadow tracks what it wrote.
fn sync_shadow(store: &mut ShadowStore, key: &str, content: &[u8]) {
    store.truncate(key, content.len() as u64);
    store.patch(key, content, 0);
}

#[test]
fn test_concurrent_edits_converge() {
    let temp = tempfile::tempdir().unwrap();
    let file = temp.path().join("shared.txt");
    let key = "shared.txt";

    let reconciler = Reconciler::new();
    seed_file(&reconciler, &file, key, b"Lorem ipsum dolor sit amet");

    // Both clients synchronize on the same state.
    let mut shadow_a = ShadowStore::new();
    let mut shadow_b = ShadowStore::new();
    let mut ops_a = local_edit(&mut shadow_a, &file, key, b"Lorem XXXipsum dolor sit amet");
    let mut ops_b = local_edit(&mut shadow_b, &file, key, b"Lorem ipsum sit amet");

    // A commits first; B's delete was computed against the pre-A state and
    // must be rebased over A's insertion.
    let current = hash_file(&file).unwrap();
    reconciler
        .commit(key, &mut ops_a, current, server_applier(file.clone()))
        .unwrap();
    sync_shadow(&mut shadow_a, key, b"Lorem XXXipsum dolor sit amet");

    let current = hash_file(&file).unwrap();
    reconciler
        .commit(key, &mut ops_b, current, server_applier(file.clone()))
        .unwrap();

    assert_eq!(std::fs::read(&file).unwrap(), b"Lorem XXXipsum sit amet");
}

#[test]
fn test_client_outside_window_resyncs_and_recovers() {
    let temp = tempfile::tempdir().unwrap();
    let file = temp.path().join("busy.txt");
    let key = "busy.txt";

    let reconciler = Reconciler::new();
    seed_file(&reconciler, &file, key, b"v0:");

    // B synchronizes now, then goes quiet.
    let mut shadow_b = ShadowStore::new();
    shadow_b
        .ensure_initialized(key, || std::fs::read(&file))
        .unwrap();
    let stale_base = crc32(shadow_b.get(key).unwrap());

    // A keeps editing until B's checkpoint scrolls out of the window.
    let mut shadow_a = ShadowStore::new();
    shadow_a
        .ensure_initialized(key, || std::fs::read(&file))
        .unwrap();
    for i in 0..25u8 {
        let mut content = shadow_a.get(key).unwrap().to_vec();
        content.push(b'a' + (i % 26));
        let mut ops = local_edit(&mut shadow_a, &file, key, &content);
        let current = hash_file(&file).unwrap();
        reconciler
            .commit(key, &mut ops, current, server_applier(file.clone()))
            .unwrap();
        sync_shadow(&mut shadow_a, key, &content);
    }

    // B's pending edit can no longer be rebased.
    let mut stale_ops = vec![Operation::append(3, b"LATE".to_vec()).with_base_hash(stale_base)];
    let current = hash_file(&file).unwrap();
    let err = reconciler.commit(key, &mut stale_ops, current, server_applier(file.clone()));
    assert!(matches!(err, Err(SyncError::NeedsResync { .. })));

    // Recovery: drop the stale shadow, re-read, re-diff, commit.
    shadow_b.discard(key);
    let mut fresh = std::fs::read(&file).unwrap();
    fresh.splice(3..3, b"LATE".iter().copied());
    let mut ops = local_edit(&mut shadow_b, &file, key, &fresh);
    let current = hash_file(&file).unwrap();
    reconciler
        .commit(key, &mut ops, current, server_applier(file.clone()))
        .unwrap();

    assert_eq!(std::fs::read(&file).unwrap(), fresh);
}

#[test]
fn test_diff_mode_tracks_editor_sessions() {
    let mut mode = DiffMode::new();

    // Two editors open the same file; transport stays in edit-script mode
    // until the last one closes it.
    mode.enable("doc.md");
    mode.enable("doc.md");
    mode.disable("doc.md");
    assert!(mode.is_enabled("doc.md"));
    mode.disable("doc.md");
    assert!(!mode.is_enabled("doc.md"));

    // A stray close for a file that was never opened must not underflow.
    mode.disable("doc.md");
    assert!(!mode.is_enabled("doc.md"));
}

#[test]
fn test_edit_script_file_round_trip() {
    let temp = tempfile::tempdir().unwrap();
    let target = temp.path().join("config.json");
    let script_path = temp.path().join("config.ots");

    let old = br#"{"version": 1, "debug": false}"#.to_vec();
    let new = br#"{"version": 2, "debug": true, "newField": 42}"#.to_vec();
    std::fs::write(&target, &old).unwrap();

    // Producer side: diff and serialize.
    let base_hash = crc32(&old);
    let ops: Vec<Operation> = diff::diff(&old, &new)
        .into_iter()
        .map(|op| op.with_base_hash(base_hash))
        .collect();
    let script = EditScript::new("config.json".into(), base_hash, ops, &new);
    std::fs::write(&script_path, script.encode().unwrap()).unwrap();

    // Consumer side: decode, check base state, apply, verify.
    let decoded = EditScript::decode(&std::fs::read(&script_path).unwrap()).unwrap();
    let current = std::fs::read(&target).unwrap();
    assert_eq!(crc32(&current), decoded.base_hash);
    let patched = otsync::patch::apply_ops(&current, &decoded.ops).unwrap();
    assert!(decoded.verifies(&patched));
    std::fs::write(&target, &patched).unwrap();

    assert_eq!(std::fs::read(&target).unwrap(), new);
}

#[test]
fn test_three_writers_interleaved() {
    let temp = tempfile::tempdir().unwrap();
    let file = temp.path().join("notes.txt");
    let key = "notes.txt";

    let reconciler = Reconciler::new();
    seed_file(&reconciler, &file, key, b"alpha beta gamma");

    // All three clients base their edits on the seeded state.
    let base = hash_file(&file).unwrap();
    let mut first = vec![Operation::append(0, b"0: ".to_vec()).with_base_hash(base)];
    let mut second = vec![Operation::delete(6, b"beta ".to_vec()).with_base_hash(base)];
    let mut third = vec![Operation::append(16, b"!".to_vec()).with_base_hash(base)];

    for ops in [&mut first, &mut second, &mut third] {
        let current = hash_file(&file).unwrap();
        reconciler
            .commit(key, ops, current, server_applier(file.clone()))
            .unwrap();
    }

    assert_eq!(std::fs::read(&file).unwrap(), b"0: alpha gamma!");
}
