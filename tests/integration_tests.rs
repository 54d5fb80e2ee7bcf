//! Integration tests for the recipevault library.
//!
//! Each test builds its own vault on a temporary root, so tests are isolated
//! from each other and from any user configuration.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use recipevault::commands::{Vault, VaultError};
use recipevault::storage::StorageError;
use recipevault::storage::attachment::{DEFAULT_MAX_ATTACHMENT_BYTES, Upload};
use tempfile::TempDir;

const JPEG: Upload<'static> = Upload {
    filename: "photo.jpeg",
    content_type: Some("image/jpeg"),
};

/// Test helper owning a temporary recipe root.
struct TestVault {
    temp_dir: TempDir,
    vault: Vault,
}

impl TestVault {
    /// Create a vault over an empty root.
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let vault = Vault::new(temp_dir.path(), DEFAULT_MAX_ATTACHMENT_BYTES)
            .expect("Failed to open vault");
        Self { temp_dir, vault }
    }

    /// Create a vault with a few recipes.
    fn with_recipes() -> Self {
        let env = Self::new();
        for (path, content) in [
            ("cookies.md", "# Cookies\n\n## Ingredients\n- chocolate chips"),
            ("desserts/vanilla-cake.md", "# Vanilla Cake\n\n- vanilla\n- flour"),
            ("desserts/chocolate-cookies.md", "# Double Chocolate\n\n- cocoa"),
            ("bread/rye.md", "# Rye\n\n- rye flour\n- water"),
        ] {
            env.vault
                .write_document(path, content, None)
                .expect("Failed to write recipe");
        }
        env
    }

    fn root(&self) -> &Path {
        self.temp_dir.path()
    }
}

// =============================================================================
// Path Resolution
// =============================================================================

mod path_resolution_tests {
    use super::*;

    #[test]
    fn traversal_inputs_are_invalid() {
        let env = TestVault::new();
        let escapes = [
            "../secret.md",
            "a/../../secret.md",
            "..",
            "desserts/../../etc/passwd",
            "./../x",
            "a/b/../../../x",
        ];

        for raw in escapes {
            assert!(
                matches!(
                    env.vault.read_document(raw),
                    Err(VaultError::Storage(StorageError::InvalidPath(_)))
                ),
                "expected {raw} to be rejected"
            );
        }
    }

    #[test]
    fn inside_paths_resolve_under_the_root() {
        let env = TestVault::new();
        let cases = [
            ("a.md", "a.md"),
            ("/b.md", "b.md"),
            ("deep/nested/c.md", "deep/nested/c.md"),
            ("./x/./d.md", "x/d.md"),
            ("e/f.md/", "e/f.md"),
        ];

        for (raw, relative) in cases {
            env.vault.write_document(raw, "x", None).unwrap();
            assert!(env.root().join(relative).is_file(), "{raw} not stored at {relative}");
            assert_eq!(env.vault.read_document(raw).unwrap().path, relative);
        }
    }

    #[cfg(unix)]
    #[test]
    fn symlink_to_sibling_directory_is_rejected() {
        let parent = TempDir::new().unwrap();
        let root = parent.path().join("root");
        let sibling = parent.path().join("root2");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&sibling).unwrap();
        fs::write(sibling.join("secret.md"), "secret").unwrap();
        std::os::unix::fs::symlink(&sibling, root.join("link")).unwrap();

        let vault = Vault::new(&root, DEFAULT_MAX_ATTACHMENT_BYTES).unwrap();

        assert!(matches!(
            vault.read_document("link/secret.md"),
            Err(VaultError::Storage(StorageError::InvalidPath(_)))
        ));
        assert!(vault.write_document("link/new.md", "x", None).is_err());
        assert!(!sibling.join("new.md").exists());
    }

    #[cfg(unix)]
    #[test]
    fn links_out_of_the_root_are_invisible_to_search_and_listing() {
        let env = TestVault::with_recipes();
        let outside = TempDir::new().unwrap();
        fs::write(
            outside.path().join("secret.md"),
            "# Secret\nTOPSECRET password hunter2",
        )
        .unwrap();
        std::os::unix::fs::symlink(outside.path(), env.root().join("link")).unwrap();

        assert!(env.vault.search_content("topsecret", None).is_empty());
        assert!(
            env.vault
                .search_filenames("secret.md", None)
                .iter()
                .all(|r| !r.path.starts_with("link"))
        );
        assert!(
            env.vault
                .list_directory("")
                .unwrap()
                .iter()
                .all(|e| e.name != "link")
        );
        let mut listing = env.vault.list_recursive("").unwrap();
        assert!(listing.by_ref().all(|e| !e.path.starts_with("link")));
    }

    #[cfg(unix)]
    #[test]
    fn photo_links_out_of_the_root_are_never_written() {
        let env = TestVault::with_recipes();
        let outside = TempDir::new().unwrap();
        let victim = outside.path().join("victim.txt");
        fs::write(&victim, "untouched").unwrap();
        std::os::unix::fs::symlink(&victim, env.root().join("cookies.jpeg")).unwrap();

        assert!(matches!(
            env.vault.put_attachment("cookies", b"\xFF\xD8JPEG", JPEG),
            Err(VaultError::Storage(StorageError::InvalidPath(_)))
        ));
        assert!(!env.vault.attachment_exists("cookies").unwrap());
        assert!(env.vault.get_attachment("cookies").is_err());

        env.vault.delete_document("cookies.md").unwrap();
        assert_eq!(fs::read_to_string(&victim).unwrap(), "untouched");
    }
}

// =============================================================================
// Versioned Store
// =============================================================================

mod versioning_tests {
    use super::*;

    #[test]
    fn round_trip_is_exact_at_version_one() {
        let env = TestVault::new();
        let content = "# Crème brûlée\n\n- 4 yolks\n";

        assert_eq!(env.vault.write_document("fr/creme.md", content, None).unwrap(), 1);

        let doc = env.vault.read_document("fr/creme.md").unwrap();
        assert_eq!(doc.content, content);
        assert_eq!(doc.version, 1);
    }

    #[test]
    fn second_editor_with_stale_version_conflicts() {
        let env = TestVault::new();
        env.vault.write_document("a.md", "original", None).unwrap();

        let first = env.vault.read_document("a.md").unwrap();
        let second = env.vault.read_document("a.md").unwrap();
        assert_eq!(first.version, 1);

        assert_eq!(
            env.vault
                .write_document("a.md", "first editor", Some(first.version))
                .unwrap(),
            2
        );

        let err = env
            .vault
            .write_document("a.md", "second editor", Some(second.version))
            .unwrap_err();
        assert!(matches!(
            err,
            VaultError::Storage(StorageError::VersionConflict {
                expected: 1,
                current: 2
            })
        ));
        assert_eq!(env.vault.read_document("a.md").unwrap().content, "first editor");
    }

    #[test]
    fn current_version_always_increments_by_one() {
        let env = TestVault::new();
        env.vault.write_document("a.md", "v1", None).unwrap();

        for expected in 1..=5 {
            let version = env
                .vault
                .write_document("a.md", &format!("v{}", expected + 1), Some(expected))
                .unwrap();
            assert_eq!(version, expected + 1);
        }
        assert_eq!(env.vault.read_document("a.md").unwrap().version, 6);
    }

    #[test]
    fn racing_writers_on_one_path_have_exactly_one_winner() {
        let env = TestVault::new();
        env.vault.write_document("race.md", "start", None).unwrap();

        let vault = Arc::new(env.vault);
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let vault = Arc::clone(&vault);
                let winners = Arc::clone(&winners);
                thread::spawn(move || {
                    match vault.write_document("race.md", &format!("writer {i}"), Some(1)) {
                        Ok(_) => {
                            winners.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(e) => assert!(e.is_conflict(), "unexpected error: {e}"),
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        let doc = vault.read_document("race.md").unwrap();
        assert_eq!(doc.version, 2);
        assert!(doc.content.starts_with("writer "));
    }

    #[test]
    fn moves_never_lose_a_confirmed_edit() {
        for _ in 0..200 {
            let env = TestVault::new();
            env.vault.write_document("a.md", "old", None).unwrap();
            let vault = Arc::new(env.vault);
            let start = Arc::new(Barrier::new(2));

            let mover = {
                let (vault, start) = (Arc::clone(&vault), Arc::clone(&start));
                thread::spawn(move || {
                    start.wait();
                    vault.move_document("a.md", "b.md")
                })
            };
            let editor = {
                let (vault, start) = (Arc::clone(&vault), Arc::clone(&start));
                thread::spawn(move || {
                    start.wait();
                    vault.write_document("a.md", "new", Some(1))
                })
            };

            mover.join().unwrap().unwrap();
            editor.join().unwrap().unwrap();

            let contents: Vec<_> = ["a.md", "b.md"]
                .into_iter()
                .filter_map(|path| vault.read_document(path).ok())
                .map(|doc| doc.content)
                .collect();
            assert!(
                contents.iter().any(|c| c == "new"),
                "confirmed edit lost: {contents:?}"
            );
        }
    }

    #[test]
    fn writers_on_different_paths_all_succeed() {
        let env = TestVault::new();
        let vault = Arc::new(env.vault);

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let vault = Arc::clone(&vault);
                thread::spawn(move || {
                    let path = format!("dir{}/recipe{i}.md", i % 4);
                    vault.write_document(&path, "x", None).unwrap();
                    vault.write_document(&path, "y", Some(1)).unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 2);
        }
    }
}

// =============================================================================
// Listing & Attachments
// =============================================================================

mod attachment_tests {
    use super::*;

    #[test]
    fn photos_never_appear_in_listings() {
        let env = TestVault::with_recipes();
        for recipe in ["cookies", "desserts/vanilla-cake", "desserts/chocolate-cookies"] {
            env.vault.put_attachment(recipe, b"\xFF\xD8jpeg", JPEG).unwrap();
        }

        for dir in ["", "desserts", "bread"] {
            let entries = env.vault.list_directory(dir).unwrap();
            assert!(
                entries.iter().all(|e| !e.name.ends_with(".jpeg")),
                "photo listed in '{dir}'"
            );
        }

        let names: Vec<_> = env
            .vault
            .list_directory("desserts")
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["chocolate-cookies.md", "vanilla-cake.md"]);
    }

    #[test]
    fn deleting_a_document_removes_its_photo() {
        let env = TestVault::with_recipes();
        env.vault.put_attachment("cookies", b"jpeg", JPEG).unwrap();
        assert!(env.vault.attachment_exists("cookies").unwrap());

        env.vault.delete_document("cookies.md").unwrap();

        assert!(!env.vault.attachment_exists("cookies").unwrap());
        assert!(!env.root().join("cookies.jpeg").exists());
    }

    #[test]
    fn failed_photo_cleanup_still_reports_no_attachment() {
        let env = TestVault::with_recipes();
        // A non-empty directory where the photo would be cannot be removed.
        fs::create_dir_all(env.root().join("cookies.jpeg/stuck")).unwrap();

        env.vault.delete_document("cookies.md").unwrap();

        assert!(!env.vault.attachment_exists("cookies").unwrap());
        assert!(env.root().join("cookies.jpeg").exists());
    }

    #[test]
    fn moving_a_document_moves_its_photo() {
        let env = TestVault::with_recipes();
        env.vault.put_attachment("cookies", b"jpeg", JPEG).unwrap();

        env.vault
            .move_document("cookies.md", "desserts/cookies.md")
            .unwrap();

        assert!(env.vault.attachment_exists("desserts/cookies").unwrap());
        assert!(!env.root().join("cookies.jpeg").exists());
        assert!(matches!(
            env.vault.read_document("cookies.md"),
            Err(VaultError::Storage(StorageError::NotFound(_)))
        ));
    }

    #[test]
    fn invalid_uploads_are_rejected() {
        let env = TestVault::with_recipes();

        let png = Upload {
            filename: "photo.png",
            content_type: Some("image/png"),
        };
        let err = env.vault.put_attachment("cookies", b"png", png).unwrap_err();
        assert!(matches!(
            err,
            VaultError::Storage(StorageError::InvalidAttachment(_))
        ));
        assert!(!env.vault.attachment_exists("cookies").unwrap());
    }

    #[test]
    fn size_limit_comes_from_configuration() {
        let temp_dir = TempDir::new().unwrap();
        let vault = Vault::new(temp_dir.path(), 4).unwrap();
        vault.write_document("a.md", "# A", None).unwrap();

        assert!(vault.put_attachment("a", b"1234", JPEG).is_ok());
        assert!(matches!(
            vault.put_attachment("a", b"12345", JPEG),
            Err(VaultError::Storage(StorageError::InvalidAttachment(_)))
        ));
    }
}

// =============================================================================
// Search
// =============================================================================

mod search_tests {
    use super::*;

    #[test]
    fn content_search_cookies_scenario() {
        let env = TestVault::new();
        env.vault
            .write_document(
                "cookies.md",
                "# Cookies\n\n## Ingredients\n- chocolate chips",
                None,
            )
            .unwrap();

        let results = env.vault.search_content("chocolate", Some(10));

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].path, "cookies.md");
        assert!(results[0].score >= 12);
        assert!(
            results[0]
                .preview
                .as_deref()
                .is_some_and(|p| p.contains("chocolate"))
        );
    }

    #[test]
    fn filename_search_chocolate_scenario() {
        let env = TestVault::new();
        env.vault.write_document("chocolate-cookies.md", "x", None).unwrap();
        env.vault.write_document("vanilla-cake.md", "x", None).unwrap();

        let results = env.vault.search_filenames("chocolate", Some(10));

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].path, "chocolate-cookies.md");
        assert_eq!(results[0].score, 50);
    }

    #[test]
    fn more_occurrences_never_lower_the_score() {
        let env = TestVault::new();
        let mut previous = 0;

        for count in 1..=6 {
            let path = format!("n{count}.md");
            let content = vec!["butter"; count].join(" ");
            env.vault.write_document(&path, &content, None).unwrap();

            let score = env
                .vault
                .search_content("butter", None)
                .into_iter()
                .find(|r| r.path == path)
                .map(|r| r.score)
                .unwrap();
            assert!(score >= previous, "{count} occurrences scored {score}");
            previous = score;
        }
    }

    #[test]
    fn results_follow_edits_immediately() {
        let env = TestVault::with_recipes();
        assert!(env.vault.search_content("saffron", None).is_empty());

        env.vault
            .write_document("bread/rye.md", "# Rye\n\n- saffron", Some(1))
            .unwrap();

        let results = env.vault.search_content("saffron", None);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].path, "bread/rye.md");
    }

    #[test]
    fn search_is_deterministic() {
        let env = TestVault::with_recipes();
        let first = env.vault.search_content("flour", None);
        let second = env.vault.search_content("flour", None);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }
}
