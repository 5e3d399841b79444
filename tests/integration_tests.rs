/// End-to-end tests for tidydesk
///
/// These tests build throwaway folders that look like a real Downloads or
/// Desktop directory and run the whole organizer over them.
///
/// Test categories:
/// 1. Basic organization workflows
/// 2. Collision handling and content preservation
/// 3. Repeated runs
/// 4. Failures and edge cases
/// 5. Configuration
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tidydesk::config::Config;
use tidydesk::file_organizer::{FileErrorKind, OrganizeError, Organizer, Progress};
use tidydesk::OTHERS;

// ============================================================================
// Test Utilities
// ============================================================================

/// A temporary folder with helpers for building and inspecting its contents.
struct TestFixture {
    temp_dir: TempDir,
}

impl TestFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        TestFixture { temp_dir }
    }

    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a file with content in the test directory.
    fn create_file(&self, name: &str, content: &[u8]) {
        let file_path = self.path().join(name);
        let mut file = File::create(&file_path).expect("Failed to create file");
        file.write_all(content)
            .expect("Failed to write file content");
    }

    /// Create several text files whose content is their own name.
    fn create_named_files(&self, names: &[&str]) {
        for name in names {
            self.create_file(name, name.as_bytes());
        }
    }

    fn create_subdir(&self, name: &str) {
        fs::create_dir_all(self.path().join(name)).expect("Failed to create subdirectory");
    }

    fn assert_file_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(path.is_file(), "File should exist: {}", path.display());
    }

    fn assert_file_not_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(!path.exists(), "File should not exist: {}", path.display());
    }

    fn read(&self, rel_path: &str) -> Vec<u8> {
        fs::read(self.path().join(rel_path)).expect("Failed to read file")
    }

    /// Count regular files directly in the test directory.
    fn count_files(&self) -> usize {
        fs::read_dir(self.path())
            .expect("Failed to read directory")
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .count()
    }

    /// Every regular file below the test directory, relative and sorted.
    fn list_files_recursive(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        Self::walk_dir(self.path(), self.path(), &mut files);
        files.sort();
        files
    }

    fn walk_dir(root: &Path, dir: &Path, files: &mut Vec<PathBuf>) {
        if let Ok(entries) = fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_file() {
                    files.push(path.strip_prefix(root).unwrap().to_path_buf());
                } else if path.is_dir() {
                    Self::walk_dir(root, &path, files);
                }
            }
        }
    }
}

fn organize(fixture: &TestFixture) -> tidydesk::OrganizeReport {
    Organizer::default()
        .run(fixture.path())
        .expect("organization should succeed")
}

// ============================================================================
// Test Suite 1: Basic Organization
// ============================================================================

#[test]
fn test_organize_empty_directory() {
    let fixture = TestFixture::new();

    let report = organize(&fixture);

    assert_eq!(report.tally.total(), 0);
    assert!(report.errors.is_empty());
    assert!(report.tally.iter().all(|(_, count)| count == 0));
    assert!(fixture.list_files_recursive().is_empty());
    assert_eq!(fs::read_dir(fixture.path()).unwrap().count(), 0);
}

#[test]
fn test_organize_downloads_folder_simulation() {
    let fixture = TestFixture::new();
    fixture.create_named_files(&[
        "IMG_2041.JPG",
        "logo.svg",
        "invoice.pdf",
        "budget.xlsx",
        "notes.md",
        "trailer.mkv",
        "podcast.mp3",
        "backup.tar.gz",
        "installer.dmg",
        "script.py",
        "package.json",
        "LICENSE",
        "data.parquet",
    ]);

    let report = organize(&fixture);

    assert!(report.is_clean());
    let counts: BTreeMap<&str, usize> = report.tally.non_zero().collect();
    let expected: BTreeMap<&str, usize> = [
        ("Images", 2),
        ("Documents", 3),
        ("Videos", 1),
        ("Music", 1),
        ("Archives", 1),
        ("Programs", 1),
        ("Code", 2),
        (OTHERS, 2),
    ]
    .into_iter()
    .collect();
    assert_eq!(counts, expected);
    assert_eq!(report.tally.total(), 13);

    fixture.assert_file_exists("Images/IMG_2041.JPG");
    fixture.assert_file_exists("Documents/budget.xlsx");
    fixture.assert_file_exists("Archives/backup.tar.gz");
    fixture.assert_file_exists("Code/package.json");
    fixture.assert_file_exists("Others/LICENSE");
    fixture.assert_file_exists("Others/data.parquet");
    assert_eq!(fixture.count_files(), 0);
}

#[test]
fn test_only_needed_category_folders_are_created() {
    let fixture = TestFixture::new();
    fixture.create_named_files(&["a.png", "b.txt"]);

    organize(&fixture);

    let mut dirs: Vec<String> = fs::read_dir(fixture.path())
        .unwrap()
        .flatten()
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    dirs.sort();
    assert_eq!(dirs, vec!["Documents", "Images"]);
}

#[test]
fn test_hidden_files_are_organized_by_extension() {
    let fixture = TestFixture::new();
    fixture.create_named_files(&[".gitignore", ".eslintrc.json", ".hidden.png"]);

    let report = organize(&fixture);

    assert_eq!(report.tally.total(), 3);
    fixture.assert_file_exists("Others/.gitignore");
    fixture.assert_file_exists("Code/.eslintrc.json");
    fixture.assert_file_exists("Images/.hidden.png");
}

#[test]
fn test_existing_subdirectories_are_left_alone() {
    let fixture = TestFixture::new();
    fixture.create_subdir("Projects/rust");
    fixture.create_file("Projects/rust/main.py", b"print()");
    fixture.create_named_files(&["photo.webp"]);

    let report = organize(&fixture);

    assert_eq!(report.tally.total(), 1);
    fixture.assert_file_exists("Projects/rust/main.py");
    fixture.assert_file_exists("Images/photo.webp");
}

// ============================================================================
// Test Suite 2: Collisions and Content
// ============================================================================

#[test]
fn test_collisions_never_overwrite() {
    let fixture = TestFixture::new();
    fixture.create_subdir("Documents");
    fixture.create_file("Documents/report.txt", b"first");
    fixture.create_file("Documents/report_1.txt", b"second");
    fixture.create_file("report.txt", b"third");

    let report = organize(&fixture);

    assert!(report.is_clean());
    assert_eq!(report.moved[0].file_name, "report_2.txt");
    assert_eq!(fixture.read("Documents/report.txt"), b"first");
    assert_eq!(fixture.read("Documents/report_1.txt"), b"second");
    assert_eq!(fixture.read("Documents/report_2.txt"), b"third");
}

#[test]
fn test_every_file_lands_somewhere_with_identical_content() {
    let fixture = TestFixture::new();
    let originals: Vec<(&str, Vec<u8>)> = vec![
        ("a.jpg", vec![0xFF, 0xD8, 0xFF, 0xE0]),
        ("b.JPG", b"upper".to_vec()),
        ("c.zip", vec![0x50, 0x4B, 0x03, 0x04]),
        ("d", b"no extension".to_vec()),
        ("e.weird", Vec::new()),
    ];
    for (name, content) in &originals {
        fixture.create_file(name, content);
    }
    fixture.create_subdir("Images");
    fixture.create_file("Images/a.jpg", b"already here");

    let report = organize(&fixture);

    assert_eq!(report.tally.total(), originals.len());
    let mut destinations: Vec<&PathBuf> = report.moved.iter().map(|p| &p.destination).collect();
    destinations.sort();
    destinations.dedup();
    assert_eq!(destinations.len(), originals.len());

    for plan in &report.moved {
        let name = plan.source.file_name().unwrap().to_str().unwrap();
        let (_, expected) = originals
            .iter()
            .find(|(original, _)| *original == name)
            .expect("moved an unknown file");
        assert_eq!(&fs::read(&plan.destination).unwrap(), expected);
        assert!(!plan.source.exists());
    }
    assert_eq!(fixture.read("Images/a.jpg"), b"already here");
    assert_eq!(fixture.read("Images/a_1.jpg"), vec![0xFF, 0xD8, 0xFF, 0xE0]);
}

#[test]
fn test_special_characters_in_filenames() {
    let fixture = TestFixture::new();
    fixture.create_named_files(&["résumé final (2).docx", "my song - live.wav", "日本語.txt"]);

    let report = organize(&fixture);

    assert!(report.is_clean());
    fixture.assert_file_exists("Documents/résumé final (2).docx");
    fixture.assert_file_exists("Music/my song - live.wav");
    fixture.assert_file_exists("Documents/日本語.txt");
}

// ============================================================================
// Test Suite 3: Repeated Runs
// ============================================================================

#[test]
fn test_second_run_on_emptied_folder_is_a_no_op() {
    let fixture = TestFixture::new();
    fixture.create_named_files(&["a.png", "b.mp4", "c.txt"]);

    let first = organize(&fixture);
    assert_eq!(first.tally.total(), 3);
    let layout = fixture.list_files_recursive();

    let second = organize(&fixture);
    assert_eq!(second.tally.total(), 0);
    assert!(second.errors.is_empty());
    assert_eq!(fixture.list_files_recursive(), layout);
}

#[test]
fn test_fresh_content_each_run_is_moved_once() {
    let fixture = TestFixture::new();

    fixture.create_named_files(&["photo.png", "notes.txt"]);
    let first = organize(&fixture);
    assert_eq!(first.tally.total(), 2);

    fixture.create_named_files(&["photo.png", "notes.txt"]);
    let second = organize(&fixture);
    assert_eq!(second.tally.total(), 2);
    assert_eq!(second.tally.get("Images"), 1);
    assert_eq!(second.tally.get("Documents"), 1);

    fixture.assert_file_exists("Images/photo.png");
    fixture.assert_file_exists("Images/photo_1.png");
    fixture.assert_file_exists("Documents/notes.txt");
    fixture.assert_file_exists("Documents/notes_1.txt");
    assert_eq!(fixture.count_files(), 0);
}

// ============================================================================
// Test Suite 4: Failures and Edge Cases
// ============================================================================

#[test]
fn test_nonexistent_path_is_fatal_and_touches_nothing() {
    let fixture = TestFixture::new();
    fixture.create_named_files(&["keep.png"]);
    let missing = fixture.path().join("does-not-exist");

    let result = Organizer::default().run(&missing);

    assert!(matches!(result, Err(OrganizeError::PathNotFound { .. })));
    assert!(!missing.exists());
    assert_eq!(fixture.list_files_recursive(), vec![PathBuf::from("keep.png")]);
}

#[test]
fn test_file_path_is_not_a_directory() {
    let fixture = TestFixture::new();
    fixture.create_named_files(&["keep.png"]);

    let result = Organizer::default().run(&fixture.path().join("keep.png"));

    assert!(matches!(result, Err(OrganizeError::NotADirectory { .. })));
    fixture.assert_file_exists("keep.png");
}

#[test]
fn test_one_failure_does_not_stop_the_run() {
    let fixture = TestFixture::new();
    // "Videos" is a plain file, so the Videos folder cannot be created.
    fixture.create_file("Videos", b"in the way");
    fixture.create_named_files(&["movie.avi", "a.png", "b.csv", "c.deb"]);

    let report = Organizer::default()
        .with_self_exclusion("Videos")
        .run(fixture.path())
        .expect("run should complete");

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].file_name, "movie.avi");
    assert_eq!(report.errors[0].kind, FileErrorKind::DestinationCreateFailed);
    assert_eq!(report.tally.get("Videos"), 0);
    assert_eq!(report.tally.total(), 3);
    fixture.assert_file_exists("movie.avi");
    fixture.assert_file_exists("Images/a.png");
    fixture.assert_file_exists("Documents/b.csv");
    fixture.assert_file_exists("Programs/c.deb");
}

#[test]
fn test_self_exclusion_keeps_program_in_place() {
    let fixture = TestFixture::new();
    fixture.create_named_files(&["tidydesk.py", "helper.py"]);

    let report = Organizer::default()
        .with_self_exclusion("tidydesk.py")
        .run(fixture.path())
        .expect("run should complete");

    assert_eq!(report.tally.get("Code"), 1);
    fixture.assert_file_exists("tidydesk.py");
    fixture.assert_file_exists("Code/helper.py");
}

#[test]
fn test_dry_run_matches_real_run() {
    let fixture = TestFixture::new();
    fixture.create_subdir("Images");
    fixture.create_file("Images/x.gif", b"old");
    fixture.create_named_files(&["x.gif", "y.flac", "z"]);

    let plan = Organizer::default()
        .plan(fixture.path())
        .expect("plan should succeed");
    fixture.assert_file_exists("x.gif");
    fixture.assert_file_not_exists("Music");

    let report = organize(&fixture);

    let mut planned: Vec<_> = plan
        .planned
        .iter()
        .map(|p| (p.category.clone(), p.file_name.clone()))
        .collect();
    let mut moved: Vec<_> = report
        .moved
        .iter()
        .map(|p| (p.category.clone(), p.file_name.clone()))
        .collect();
    planned.sort();
    moved.sort();
    assert_eq!(planned, moved);
    assert!(moved.contains(&("Images".to_string(), "x_1.gif".to_string())));
}

#[test]
fn test_dry_run_never_plans_one_destination_twice() {
    let fixture = TestFixture::new();
    fixture.create_subdir("Documents");
    fixture.create_file("Documents/a.txt", b"old");
    fixture.create_named_files(&["a.txt", "a_1.txt"]);

    let plan = Organizer::default()
        .plan(fixture.path())
        .expect("plan should succeed");
    let mut planned: Vec<_> = plan.planned.iter().map(|p| p.destination.clone()).collect();
    planned.sort();
    planned.dedup();
    assert_eq!(planned.len(), 2);
    fixture.assert_file_not_exists("Documents/a_1.txt");

    let report = organize(&fixture);
    let mut moved: Vec<_> = report.moved.iter().map(|p| p.destination.clone()).collect();
    moved.sort();
    assert_eq!(planned, moved);
    assert_eq!(fixture.read("Documents/a.txt"), b"old");
}

#[test]
fn test_failed_move_is_recorded_and_run_continues() {
    let fixture = TestFixture::new();
    fixture.create_named_files(&["a.txt", "b.txt", "c.txt", "d.txt"]);

    // After the first move, delete a file still waiting in the folder so its
    // rename fails.
    let mut victim: Option<String> = None;
    let report = Organizer::default()
        .run_with(fixture.path(), |progress| {
            if victim.is_none()
                && let Progress::Moved(_) = progress
            {
                let pending = ["a.txt", "b.txt", "c.txt", "d.txt"]
                    .into_iter()
                    .find(|name| fixture.path().join(name).is_file())
                    .expect("a file should still be pending");
                fs::remove_file(fixture.path().join(pending)).expect("Failed to remove file");
                victim = Some(pending.to_string());
            }
            ControlFlow::Continue(())
        })
        .expect("run should complete");

    let victim = victim.expect("observer should have run");
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].file_name, victim);
    assert_eq!(report.errors[0].kind, FileErrorKind::MoveFailed);
    assert_eq!(report.tally.get("Documents"), 3);
    assert_eq!(report.moved.len(), 3);
    assert!(!report.cancelled);
    assert!(!report.is_clean());
    for name in ["a.txt", "b.txt", "c.txt", "d.txt"] {
        if name != victim {
            fixture.assert_file_exists(&format!("Documents/{}", name));
        }
    }
    fixture.assert_file_not_exists(&format!("Documents/{}", victim));
}

// ============================================================================
// Test Suite 5: Configuration
// ============================================================================

#[test]
fn test_organize_with_custom_categories_and_filters() {
    let fixture = TestFixture::new();
    fixture.create_named_files(&[
        "book.epub",
        "photo.jpg",
        "download.crdownload",
        "Thumbs.db",
    ]);

    let config = Config::from_toml(
        r#"
        [[categories]]
        name = "Ebooks"
        extensions = ["epub", "mobi"]

        [filters.exclude]
        filenames = ["Thumbs.db"]
        extensions = ["crdownload"]
        "#,
    )
    .expect("config should parse");
    let organizer = config.into_organizer().expect("config should be valid");

    let report = organizer.run(fixture.path()).expect("run should complete");

    assert_eq!(report.tally.get("Ebooks"), 1);
    assert_eq!(report.tally.get(OTHERS), 1);
    assert_eq!(report.skipped.len(), 2);
    fixture.assert_file_exists("Ebooks/book.epub");
    fixture.assert_file_exists("Others/photo.jpg");
    fixture.assert_file_exists("download.crdownload");
    fixture.assert_file_exists("Thumbs.db");
}

#[test]
fn test_report_serializes_to_json() {
    let fixture = TestFixture::new();
    fixture.create_named_files(&["a.png"]);

    let report = organize(&fixture);
    let json: serde_json::Value =
        serde_json::to_value(&report).expect("report should serialize");

    assert_eq!(json["tally"]["Images"], 1);
    assert_eq!(json["tally"]["Others"], 0);
    assert_eq!(json["moved"][0]["file_name"], "a.png");
    assert_eq!(json["errors"].as_array().unwrap().len(), 0);
    assert_eq!(json["cancelled"], false);
}
