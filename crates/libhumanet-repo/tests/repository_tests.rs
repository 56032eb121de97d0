//! End-to-end behaviour of idea repositories through the public store API

use libhumanet_repo::{EntryKind, RepoError, RepoStore, Template, VersionOperation, HISTORY_CAPACITY};
use std::fs;
use tempfile::tempdir;

fn new_store() -> (tempfile::TempDir, RepoStore) {
    let dir = tempdir().unwrap();
    let store = RepoStore::open(dir.path().join("storage").join("ideas"));
    (dir, store)
}

fn version_contents(store: &RepoStore, idea: &str, path: &str) -> Vec<Vec<u8>> {
    store
        .get_file_history(idea, path)
        .unwrap()
        .iter()
        .map(|v| store.get_file_version_content(idea, path, &v.id).unwrap())
        .collect()
}

#[test]
fn test_scaffold_basic_template() {
    let (_dir, store) = new_store();
    store.create_repository("X", Template::Basic).unwrap();

    let root_entries = store.list_files("X", "").unwrap();
    let names: Vec<&str> = root_entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec![".humanet", "docs", "media"]);
    assert!(root_entries.iter().all(|e| e.kind == EntryKind::Directory));

    let meta_entries = store.list_files("X", ".humanet").unwrap();
    let mut files: Vec<String> = meta_entries.iter().map(|e| e.path.clone()).collect();
    files.sort();
    assert_eq!(
        files,
        vec![
            ".humanet/idea.md",
            ".humanet/meta.json",
            ".humanet/problem.md",
            ".humanet/scope.md",
            ".humanet/search.md",
        ]
    );
    assert!(meta_entries.iter().all(|e| e.size > 0));
}

#[test]
fn test_scaffold_research_and_technical_templates() {
    let (_dir, store) = new_store();
    store.create_repository("r", Template::Research).unwrap();
    store.create_repository("t", Template::Technical).unwrap();

    assert_eq!(store.list_files("r", ".humanet").unwrap().len(), 7);
    assert_eq!(store.list_files("t", ".humanet").unwrap().len(), 7);
    assert!(store.get_file_content("r", ".humanet/methodology.md").is_ok());
    assert!(store.get_file_content("r", ".humanet/references.md").is_ok());
    assert!(store.get_file_content("t", ".humanet/architecture.md").is_ok());
    assert!(store.get_file_content("t", ".humanet/requirements.md").is_ok());
    assert_eq!(store.template("t").unwrap(), Template::Technical);
}

#[test]
fn test_double_create_rejected() {
    let (_dir, store) = new_store();
    store.create_repository("X", Template::Basic).unwrap();
    store.update_file("X", "docs/keep.md", "keep me").unwrap();

    let result = store.create_repository("X", Template::Research);
    assert!(matches!(result, Err(RepoError::RepositoryAlreadyExists(_))));

    assert_eq!(store.get_file_content("X", "docs/keep.md").unwrap(), b"keep me");
    assert_eq!(store.template("X").unwrap(), Template::Basic);
}

#[test]
fn test_no_history_on_first_write() {
    let (_dir, store) = new_store();
    store.create_repository("X", Template::Basic).unwrap();

    assert!(store.update_file("X", "notes/new.md", "hello").unwrap().is_none());
    assert!(store.get_file_history("X", "notes/new.md").unwrap().is_empty());
}

#[test]
fn test_history_on_overwrite() {
    let (_dir, store) = new_store();
    store.create_repository("X", Template::Basic).unwrap();

    store.update_file("X", "a.md", "A").unwrap();
    store.update_file("X", "a.md", "B").unwrap();
    assert_eq!(version_contents(&store, "X", "a.md"), vec![b"A".to_vec()]);

    store.update_file("X", "a.md", "C").unwrap();
    assert_eq!(
        version_contents(&store, "X", "a.md"),
        vec![b"B".to_vec(), b"A".to_vec()]
    );

    let history = store.get_file_history("X", "a.md").unwrap();
    assert!(history.iter().all(|v| v.operation == VersionOperation::Updated));
    assert!(history[0].seq > history[1].seq);
}

#[test]
fn test_eviction_cap() {
    let (_dir, store) = new_store();
    store.create_repository("X", Template::Basic).unwrap();

    for i in 0..10 {
        store.update_file("X", "a.md", format!("c{}", i)).unwrap();
    }

    let contents = version_contents(&store, "X", "a.md");
    assert_eq!(contents.len(), HISTORY_CAPACITY);
    let expected: Vec<Vec<u8>> = (4..9).rev().map(|i| format!("c{}", i).into_bytes()).collect();
    assert_eq!(contents, expected);
    assert_eq!(store.get_file_content("X", "a.md").unwrap(), b"c9");
}

#[test]
fn test_restore_round_trip() {
    let (_dir, store) = new_store();
    store.create_repository("X", Template::Basic).unwrap();

    store.update_file("X", "a.md", "A").unwrap();
    store.update_file("X", "a.md", "B").unwrap();
    store.update_file("X", "a.md", "C").unwrap();

    let history = store.get_file_history("X", "a.md").unwrap();
    let a_version = history
        .iter()
        .find(|v| store.get_file_version_content("X", "a.md", &v.id).unwrap() == b"A")
        .unwrap()
        .clone();

    let snapshot = store.restore_file_version("X", "a.md", &a_version.id).unwrap();
    assert_eq!(snapshot.operation, VersionOperation::Restored);
    assert_eq!(store.get_file_content("X", "a.md").unwrap(), b"A");

    let after = store.get_file_history("X", "a.md").unwrap();
    assert_eq!(after.len(), history.len() + 1);
    assert_eq!(after[0].id, snapshot.id);
    assert_eq!(
        store.get_file_version_content("X", "a.md", &after[0].id).unwrap(),
        b"C"
    );
}

#[test]
fn test_restore_at_capacity_stays_bounded() {
    let (_dir, store) = new_store();
    store.create_repository("X", Template::Basic).unwrap();
    for i in 0..=HISTORY_CAPACITY {
        store.update_file("X", "a.md", format!("c{}", i)).unwrap();
    }
    let history = store.get_file_history("X", "a.md").unwrap();
    assert_eq!(history.len(), HISTORY_CAPACITY);

    let newest = history[0].clone();
    store.restore_file_version("X", "a.md", &newest.id).unwrap();

    let after = store.get_file_history("X", "a.md").unwrap();
    assert_eq!(after.len(), HISTORY_CAPACITY);
    assert_eq!(after[1].id, newest.id);
}

#[test]
fn test_required_file_protection() {
    let (_dir, store) = new_store();
    store.create_repository("X", Template::Research).unwrap();

    for path in Template::Research.required_paths() {
        let result = store.delete_file("X", path);
        assert!(
            matches!(result, Err(RepoError::RequiredFileProtected(_))),
            "{} should be protected",
            path
        );
    }

    // Required files can still be updated
    store.update_file("X", ".humanet/idea.md", "# Renamed idea\n").unwrap();
    assert_eq!(store.get_file_history("X", ".humanet/idea.md").unwrap().len(), 1);

    // Normalized aliases are protected too
    assert!(matches!(
        store.delete_file("X", "docs/../.humanet/./scope.md"),
        Err(RepoError::RequiredFileProtected(_))
    ));

    store.update_file("X", "docs/draft.md", "draft").unwrap();
    store.delete_file("X", "docs/draft.md").unwrap();
    assert!(matches!(
        store.get_file_content("X", "docs/draft.md"),
        Err(RepoError::FileNotFound(_))
    ));
    assert!(matches!(
        store.delete_file("X", "docs/draft.md"),
        Err(RepoError::FileNotFound(_))
    ));
}

#[test]
fn test_unknown_file_and_version_errors() {
    let (_dir, store) = new_store();
    store.create_repository("X", Template::Basic).unwrap();

    assert!(matches!(
        store.get_file_history("X", "missing.md"),
        Err(RepoError::FileNotFound(_))
    ));
    assert!(matches!(
        store.get_file_version_content("X", "missing.md", "whatever"),
        Err(RepoError::FileNotFound(_))
    ));
    assert!(matches!(
        store.restore_file_version("X", "missing.md", "whatever"),
        Err(RepoError::FileNotFound(_))
    ));

    store.update_file("X", "a.md", "1").unwrap();
    store.update_file("X", "a.md", "2").unwrap();
    for bad in ["whatever", "", "0123456789abcdef0123456789abcdef"] {
        assert!(matches!(
            store.get_file_version_content("X", "a.md", bad),
            Err(RepoError::VersionNotFound { .. })
        ));
        assert!(matches!(
            store.restore_file_version("X", "a.md", bad),
            Err(RepoError::VersionNotFound { .. })
        ));
    }
    // A failed restore leaves everything as it was
    assert_eq!(store.get_file_content("X", "a.md").unwrap(), b"2");
    assert_eq!(store.get_file_history("X", "a.md").unwrap().len(), 1);
}

#[test]
fn test_sandbox_soundness() {
    let (dir, store) = new_store();
    store.create_repository("X", Template::Basic).unwrap();
    fs::write(dir.path().join("storage").join("outside.txt"), "secret").unwrap();

    let escapes = [
        "../outside.txt",
        "../../outside.txt",
        "docs/../../../outside.txt",
        "/etc/passwd",
        "..\\..\\outside.txt",
        "..%2F..%2Foutside.txt",
        ".versions/anything",
    ];

    let before = snapshot_tree(dir.path());
    for path in escapes {
        let traversal = |r: Result<(), RepoError>| matches!(r, Err(RepoError::PathTraversalRejected(_)));
        assert!(traversal(store.get_file_content("X", path).map(|_| ())), "read {}", path);
        assert!(traversal(store.update_file("X", path, "pwned").map(|_| ())), "write {}", path);
        assert!(traversal(store.delete_file("X", path)), "delete {}", path);
        assert!(traversal(store.get_file_history("X", path).map(|_| ())), "history {}", path);
        assert!(
            traversal(store.get_file_version_content("X", path, "v").map(|_| ())),
            "version {}",
            path
        );
        assert!(
            traversal(store.restore_file_version("X", path, "v").map(|_| ())),
            "restore {}",
            path
        );
        assert!(traversal(store.list_files("X", path).map(|_| ())), "list {}", path);
        assert!(traversal(store.get_file_tree("X", path, Some(2)).map(|_| ())), "tree {}", path);
    }
    assert_eq!(snapshot_tree(dir.path()), before);
    assert_eq!(
        fs::read_to_string(dir.path().join("storage").join("outside.txt")).unwrap(),
        "secret"
    );
}

#[cfg(unix)]
#[test]
fn test_symlink_aliases_cannot_bypass_protection() {
    let (_dir, store) = new_store();
    store.create_repository("X", Template::Basic).unwrap();
    store.update_file("X", "a.md", "1").unwrap();
    store.update_file("X", "a.md", "2").unwrap();
    let root = store.repo_root("X").unwrap();
    std::os::unix::fs::symlink(root.join(".humanet"), root.join("alias")).unwrap();
    std::os::unix::fs::symlink(root.join(".versions"), root.join("v")).unwrap();
    std::os::unix::fs::symlink(root.join("a.md"), root.join("b.md")).unwrap();

    assert!(matches!(
        store.delete_file("X", "alias/idea.md"),
        Err(RepoError::PathTraversalRejected(_))
    ));
    assert!(root.join(".humanet/idea.md").is_file());

    assert!(matches!(
        store.list_files("X", "v"),
        Err(RepoError::PathTraversalRejected(_))
    ));
    assert!(matches!(
        store.get_file_content("X", "v/anything"),
        Err(RepoError::PathTraversalRejected(_))
    ));

    // One physical file never gets a second history through an alias
    assert!(matches!(
        store.update_file("X", "b.md", "3"),
        Err(RepoError::PathTraversalRejected(_))
    ));
    assert_eq!(store.get_file_content("X", "a.md").unwrap(), b"2");
    assert_eq!(store.get_file_history("X", "a.md").unwrap().len(), 1);
}

#[test]
fn test_tree_and_stats() {
    let (_dir, store) = new_store();
    store.create_repository("X", Template::Technical).unwrap();
    store.update_file("X", "docs/design/notes.md", "n").unwrap();
    store.update_file("X", "docs/design/notes.md", "nn").unwrap();

    let tree = store.get_file_tree("X", "", Some(5)).unwrap();
    let top: Vec<&str> = tree
        .children
        .as_ref()
        .unwrap()
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(top, vec![".humanet", "docs", "media"]);

    let stats = store.tree_stats("X", &tree).unwrap();
    assert_eq!(stats.file_count, 8);
    assert_eq!(stats.directory_count, 4);
    assert_eq!(stats.required_present, 7);
    assert_eq!(stats.required_total, 7);

    let shallow = store.get_file_tree("X", "", Some(1)).unwrap();
    let shallow_stats = store.tree_stats("X", &shallow).unwrap();
    assert_eq!(shallow_stats.file_count, 0);
    assert_eq!(shallow_stats.required_present, 0);
    assert!(shallow
        .children
        .as_ref()
        .unwrap()
        .iter()
        .all(|c| c.children.is_none()));

    let sub = store.get_file_tree("X", "docs", None).unwrap();
    assert_eq!(sub.path, "docs");
    assert_eq!(sub.children.as_ref().unwrap()[0].path, "docs/design");
}

#[test]
fn test_delete_repository_removes_everything() {
    let (_dir, store) = new_store();
    store.create_repository("X", Template::Basic).unwrap();
    store.update_file("X", "a.md", "1").unwrap();
    store.update_file("X", "a.md", "2").unwrap();
    let root = store.repo_root("X").unwrap();

    store.delete_repository("X").unwrap();
    assert!(!root.exists());
    assert!(!store.repository_exists("X"));
    assert!(matches!(
        store.delete_repository("X"),
        Err(RepoError::RepositoryNotFound(_))
    ));

    // The id can be reused afterwards
    store.create_repository("X", Template::Basic).unwrap();
    assert!(matches!(
        store.get_file_content("X", "a.md"),
        Err(RepoError::FileNotFound(_))
    ));
}

#[test]
fn test_repositories_are_independent() {
    let (_dir, store) = new_store();
    store.create_repository("one", Template::Basic).unwrap();
    store.create_repository("two", Template::Basic).unwrap();

    store.update_file("one", "a.md", "1").unwrap();
    store.update_file("one", "a.md", "2").unwrap();

    assert!(matches!(
        store.get_file_content("two", "a.md"),
        Err(RepoError::FileNotFound(_))
    ));
    store.delete_repository("one").unwrap();
    assert!(store.repository_exists("two"));
    assert!(store.get_file_content("two", ".humanet/idea.md").is_ok());
}

#[test]
fn test_history_persists_across_store_instances() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("ideas");
    {
        let store = RepoStore::open(&root);
        store.create_repository("X", Template::Basic).unwrap();
        store.update_file("X", "a.md", "old").unwrap();
        store.update_file("X", "a.md", "new").unwrap();
    }

    let store = RepoStore::open(&root);
    let history = store.get_file_history("X", "a.md").unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(
        store.get_file_version_content("X", "a.md", &history[0].id).unwrap(),
        b"old"
    );
}

#[test]
fn test_end_to_end_scenario() {
    let (_dir, store) = new_store();
    store.create_repository("X", Template::Basic).unwrap();

    store.update_file("X", "src/main.txt", "v1").unwrap();
    store.update_file("X", "src/main.txt", "v2").unwrap();
    store.update_file("X", "src/main.txt", "v3").unwrap();

    assert_eq!(store.get_file_content("X", "src/main.txt").unwrap(), b"v3");
    assert_eq!(
        version_contents(&store, "X", "src/main.txt"),
        vec![b"v2".to_vec(), b"v1".to_vec()]
    );

    let history = store.get_file_history("X", "src/main.txt").unwrap();
    let v1 = &history[1];
    store.restore_file_version("X", "src/main.txt", &v1.id).unwrap();

    assert_eq!(store.get_file_content("X", "src/main.txt").unwrap(), b"v1");
    let after = store.get_file_history("X", "src/main.txt").unwrap();
    assert_eq!(after.len(), 3);
    assert_eq!(
        store.get_file_version_content("X", "src/main.txt", &after[0].id).unwrap(),
        b"v3"
    );
}

/// Every path and file content below a directory, sorted
fn snapshot_tree(root: &std::path::Path) -> Vec<(String, Vec<u8>)> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            let rel = path.strip_prefix(root).unwrap().display().to_string();
            if path.is_dir() {
                stack.push(path);
                out.push((rel, Vec::new()));
            } else {
                out.push((rel, fs::read(&path).unwrap()));
            }
        }
    }
    out.sort();
    out
}
