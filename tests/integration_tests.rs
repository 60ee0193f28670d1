/// Integration tests for tidytree
///
/// These tests build real directory trees in temporary directories and run
/// the engine and the CLI layer against them end to end.
///
/// Test categories:
/// 1. Scanning
/// 2. Organizing
/// 3. Dry-run mode
/// 4. Safety: no clobbering, nested targets, partial failure
/// 5. Configuration and filtering
/// 6. CLI commands
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tidytree::cli::{OrganizeCommand, OutputOptions, RunStatus, run_cli_with_config};
use tidytree::{CategoryTable, Organizer, OrganizerConfig, WalkRules};

// ============================================================================
// Test Utilities
// ============================================================================

/// A temporary directory with helpers to lay out and inspect file trees.
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

    /// Create a file (and its parent directories) with the given content.
    fn create_file(&self, rel_path: &str, content: &str) {
        let path = self.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, content).expect("Failed to write file");
    }

    fn create_files(&self, files: &[(&str, &str)]) {
        for (name, content) in files {
            self.create_file(name, content);
        }
    }

    /// Write a configuration file and return its path.
    fn write_config(&self, config: &OrganizerConfig) -> PathBuf {
        let path = self.path().join("tidytree.toml");
        config.save(&path).expect("Failed to save config");
        path
    }

    fn assert_file_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(path.is_file(), "File should exist: {}", path.display());
    }

    fn assert_file_not_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(!path.exists(), "File should not exist: {}", path.display());
    }

    fn read(&self, rel_path: &str) -> String {
        fs::read_to_string(self.path().join(rel_path)).expect("Failed to read file")
    }

    /// List all files below `rel_dir` recursively, relative to the fixture root.
    fn list_files(&self, rel_dir: &str) -> Vec<String> {
        let mut files = Vec::new();
        Self::walk_dir(&self.path().join(rel_dir), &mut files);
        let mut files: Vec<String> = files
            .iter()
            .map(|p| {
                p.strip_prefix(self.path())
                    .expect("file outside fixture")
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        files.sort();
        files
    }

    fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) {
        if let Ok(entries) = fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_file() {
                    files.push(path);
                } else if path.is_dir() {
                    Self::walk_dir(&path, files);
                }
            }
        }
    }
}

fn default_parts() -> (CategoryTable, WalkRules) {
    let config = OrganizerConfig::default();
    (
        config.category_table().expect("default table is valid"),
        config.walk_rules().expect("default rules are valid"),
    )
}

fn quiet() -> OutputOptions {
    OutputOptions {
        json: true,
        max_errors: 0,
    }
}

// ============================================================================
// Test Suite 1: Scanning
// ============================================================================

#[test]
fn test_scan_mixed_directory() {
    let fixture = TestFixture::new();
    fixture.create_files(&[
        ("src/notes.txt", "notes"),
        ("src/photo.PNG", "pixels!"),
        ("src/archive", "zz"),
    ]);

    let (table, rules) = default_parts();
    let report = Organizer::new(&table, &rules)
        .scan(&fixture.path().join("src"))
        .expect("scan failed");

    let counts = report.category_counts();
    assert_eq!(counts.len(), 3);
    assert_eq!(counts["documents"], 1);
    assert_eq!(counts["images"], 1);
    assert_eq!(counts["other"], 1);
    assert_eq!(report.total_bytes(), 5 + 7 + 2);

    // Scanning never moves anything.
    fixture.assert_file_exists("src/notes.txt");
}

#[test]
fn test_scan_respects_depth_limit() {
    let fixture = TestFixture::new();
    fixture.create_files(&[
        ("src/top.txt", "a"),
        ("src/level1/mid.txt", "b"),
        ("src/level1/level2/low.txt", "c"),
    ]);

    let config = OrganizerConfig {
        max_depth: 0,
        ..Default::default()
    };
    let table = config.category_table().unwrap();
    let rules = config.walk_rules().unwrap();
    let report = Organizer::new(&table, &rules)
        .scan(&fixture.path().join("src"))
        .expect("scan failed");

    assert_eq!(report.total_files(), 1);
    assert!(report.categories["documents"][0].path.ends_with("top.txt"));
}

#[test]
fn test_scan_missing_source_is_error() {
    let fixture = TestFixture::new();
    let (table, rules) = default_parts();

    let result = Organizer::new(&table, &rules).scan(&fixture.path().join("missing"));
    assert!(result.is_err());
}

// ============================================================================
// Test Suite 2: Organizing
// ============================================================================

#[test]
fn test_organize_downloads_folder_simulation() {
    let fixture = TestFixture::new();
    fixture.create_files(&[
        ("downloads/vacation.jpg", "jpg"),
        ("downloads/invoice.pdf", "pdf"),
        ("downloads/song.mp3", "mp3"),
        ("downloads/movie.mkv", "mkv"),
        ("downloads/backup.zip", "zip"),
        ("downloads/script.py", "py"),
        ("downloads/budget.xlsx", "xlsx"),
        ("downloads/mystery.bin", "bin"),
        ("downloads/README", "readme"),
    ]);

    let (table, rules) = default_parts();
    let report = Organizer::new(&table, &rules)
        .organize(
            &fixture.path().join("downloads"),
            &fixture.path().join("sorted"),
            false,
        )
        .expect("organize failed");

    assert_eq!(report.total_files(), 9);
    assert!(report.errors.is_empty());
    assert_eq!(
        fixture.list_files("sorted"),
        vec![
            "sorted/archives/backup.zip",
            "sorted/audio/song.mp3",
            "sorted/code/script.py",
            "sorted/documents/invoice.pdf",
            "sorted/images/vacation.jpg",
            "sorted/other/README",
            "sorted/other/mystery.bin",
            "sorted/spreadsheets/budget.xlsx",
            "sorted/videos/movie.mkv",
        ]
    );
    assert!(fixture.list_files("downloads").is_empty());
}

#[test]
fn test_organize_preserves_file_content() {
    let fixture = TestFixture::new();
    fixture.create_file("src/deep/er/letter.txt", "Dear reader,");

    let (table, rules) = default_parts();
    Organizer::new(&table, &rules)
        .organize(&fixture.path().join("src"), &fixture.path().join("dst"), false)
        .expect("organize failed");

    assert_eq!(fixture.read("dst/documents/letter.txt"), "Dear reader,");
}

#[test]
fn test_organize_mixed_case_extensions() {
    let fixture = TestFixture::new();
    fixture.create_files(&[("src/A.JPG", "1"), ("src/b.Jpg", "2"), ("src/c.jpg", "3")]);

    let (table, rules) = default_parts();
    let report = Organizer::new(&table, &rules)
        .organize(&fixture.path().join("src"), &fixture.path().join("dst"), false)
        .expect("organize failed");

    assert_eq!(report.category_counts()["images"], 3);
    fixture.assert_file_exists("dst/images/A.JPG");
    fixture.assert_file_exists("dst/images/b.Jpg");
}

#[test]
fn test_completeness_outcomes_plus_errors_equal_files() {
    let fixture = TestFixture::new();
    for i in 0..25 {
        fixture.create_file(&format!("src/dir{}/file{}.txt", i % 4, i), "x");
    }
    // Blocks the images category directory, so every image fails.
    fixture.create_file("dst/images", "not a directory");
    for i in 0..5 {
        fixture.create_file(&format!("src/pic{}.png", i), "p");
    }

    let (table, rules) = default_parts();
    let report = Organizer::new(&table, &rules)
        .organize(&fixture.path().join("src"), &fixture.path().join("dst"), false)
        .expect("organize failed");

    assert_eq!(report.total_files() + report.errors.len(), 30);
    assert_eq!(report.errors.len(), 5);
    assert_eq!(report.total_files(), 25);
    let summed: usize = report.summaries().iter().map(|s| s.count).sum();
    assert_eq!(summed, report.total_files());
}

// ============================================================================
// Test Suite 3: Dry-Run Mode
// ============================================================================

#[test]
fn test_dry_run_doesnt_move_files() {
    let fixture = TestFixture::new();
    fixture.create_files(&[("src/a.txt", "a"), ("src/b.png", "b")]);

    let (table, rules) = default_parts();
    let report = Organizer::new(&table, &rules)
        .organize(&fixture.path().join("src"), &fixture.path().join("dst"), true)
        .expect("organize failed");

    assert_eq!(report.total_files(), 2);
    fixture.assert_file_exists("src/a.txt");
    fixture.assert_file_exists("src/b.png");
    fixture.assert_file_not_exists("dst");
}

#[test]
fn test_dry_run_is_idempotent() {
    let fixture = TestFixture::new();
    fixture.create_files(&[
        ("src/a/report.txt", "1"),
        ("src/b/report.txt", "2"),
        ("src/c.gif", "3"),
        ("dst/documents/report.txt", "existing"),
    ]);

    let (table, rules) = default_parts();
    let organizer = Organizer::new(&table, &rules);
    let source = fixture.path().join("src");
    let target = fixture.path().join("dst");

    let first = organizer.organize(&source, &target, true).expect("organize failed");
    let second = organizer.organize(&source, &target, true).expect("organize failed");

    assert_eq!(first, second);
    let docs: Vec<_> = first.categories["documents"]
        .iter()
        .map(|o| o.destination.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(docs, vec!["report_1.txt", "report_2.txt"]);
}

#[test]
fn test_dry_run_matches_real_run() {
    let fixture = TestFixture::new();
    fixture.create_files(&[
        ("src/a/report.txt", "1"),
        ("src/b/report.txt", "2"),
        ("src/photo.jpg", "3"),
    ]);

    let (table, rules) = default_parts();
    let organizer = Organizer::new(&table, &rules);
    let source = fixture.path().join("src");
    let target = fixture.path().join("dst");

    let planned = organizer.organize(&source, &target, true).expect("dry run failed");
    let actual = organizer.organize(&source, &target, false).expect("organize failed");

    let destinations = |report: &tidytree::RunReport| -> Vec<PathBuf> {
        report.outcomes().map(|o| o.destination.clone()).collect()
    };
    assert_eq!(destinations(&planned), destinations(&actual));
}

// ============================================================================
// Test Suite 4: Safety
// ============================================================================

#[test]
fn test_same_names_from_different_folders_do_not_clobber() {
    let fixture = TestFixture::new();
    fixture.create_files(&[("src/a/report.txt", "from a"), ("src/b/report.txt", "from b")]);

    let (table, rules) = default_parts();
    Organizer::new(&table, &rules)
        .organize(&fixture.path().join("src"), &fixture.path().join("dst"), false)
        .expect("organize failed");

    assert_eq!(fixture.read("dst/documents/report.txt"), "from a");
    assert_eq!(fixture.read("dst/documents/report_1.txt"), "from b");
}

#[test]
fn test_existing_target_files_are_never_overwritten() {
    let fixture = TestFixture::new();
    fixture.create_files(&[
        ("dst/images/photo.jpg", "old"),
        ("dst/images/photo_1.jpg", "older"),
        ("src/photo.jpg", "new"),
    ]);

    let (table, rules) = default_parts();
    let report = Organizer::new(&table, &rules)
        .organize(&fixture.path().join("src"), &fixture.path().join("dst"), false)
        .expect("organize failed");

    assert!(report.categories["images"][0]
        .destination
        .ends_with("images/photo_2.jpg"));
    assert_eq!(fixture.read("dst/images/photo.jpg"), "old");
    assert_eq!(fixture.read("dst/images/photo_1.jpg"), "older");
    assert_eq!(fixture.read("dst/images/photo_2.jpg"), "new");
}

#[test]
fn test_target_nested_in_source() {
    let fixture = TestFixture::new();
    fixture.create_files(&[
        ("source/a.txt", "a"),
        ("source/sub/b.txt", "b"),
        ("source/z.mp3", "z"),
    ]);

    let (table, rules) = default_parts();
    let source = fixture.path().join("source");
    let report = Organizer::new(&table, &rules)
        .organize(&source, &source.join("organized"), false)
        .expect("organize failed");

    assert_eq!(report.total_files(), 3);
    assert_eq!(report.skipped, 0);
    assert!(report.errors.is_empty());
    assert_eq!(
        fixture.list_files("source"),
        vec![
            "source/organized/audio/z.mp3",
            "source/organized/documents/a.txt",
            "source/organized/documents/b.txt",
        ]
    );

    // A second run finds only already-organized files.
    let again = Organizer::new(&table, &rules)
        .organize(&source, &source.join("organized"), false)
        .expect("organize failed");
    assert_eq!(again.total_files(), 0);
    assert_eq!(again.skipped, 3);
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_is_reported_and_run_continues() {
    use std::os::unix::fs::PermissionsExt;

    let fixture = TestFixture::new();
    fixture.create_files(&[("src/ok.txt", "ok"), ("src/locked/secret.txt", "s")]);
    let locked = fixture.path().join("src/locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root ignores permission bits; nothing to test in that case.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let (table, rules) = default_parts();
    let report = Organizer::new(&table, &rules)
        .organize(&fixture.path().join("src"), &fixture.path().join("dst"), false)
        .expect("organize failed");

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(report.total_files(), 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, tidytree::FileErrorKind::Unreadable);
    fixture.assert_file_exists("dst/documents/ok.txt");
}

// ============================================================================
// Test Suite 5: Configuration and Filtering
// ============================================================================

#[test]
fn test_default_ignore_rules() {
    let fixture = TestFixture::new();
    fixture.create_files(&[
        ("src/.git/config", "git"),
        ("src/.hidden.txt", "h"),
        ("src/.DS_Store", "ds"),
        ("src/Thumbs.db", "t"),
        ("src/visible.txt", "v"),
    ]);

    let (table, rules) = default_parts();
    let report = Organizer::new(&table, &rules)
        .organize(&fixture.path().join("src"), &fixture.path().join("dst"), false)
        .expect("organize failed");

    assert_eq!(report.total_files(), 1);
    fixture.assert_file_exists("src/Thumbs.db");
    fixture.assert_file_exists("src/.hidden.txt");
    fixture.assert_file_exists("dst/documents/visible.txt");
}

#[test]
fn test_hidden_files_included_when_enabled() {
    let fixture = TestFixture::new();
    fixture.create_files(&[("src/.profile.txt", "p"), ("src/.git/HEAD", "ref")]);

    let config = OrganizerConfig {
        ignore_hidden: false,
        ..Default::default()
    };
    let table = config.category_table().unwrap();
    let rules = config.walk_rules().unwrap();
    let report = Organizer::new(&table, &rules)
        .scan(&fixture.path().join("src"))
        .expect("scan failed");

    // .git is still ignored by name.
    assert_eq!(report.total_files(), 1);
    assert_eq!(report.category_counts()["documents"], 1);
}

#[test]
fn test_custom_categories_from_config_file() {
    let fixture = TestFixture::new();
    fixture.create_files(&[("src/font.ttf", "f"), ("src/page.html", "h"), ("src/notes.txt", "n")]);

    let mut config = OrganizerConfig::default();
    config.categories.clear();
    config.add_category("fonts", vec![".ttf".to_string()]);
    config.add_category("web", vec![".html".to_string(), ".txt".to_string()]);
    config.add_category("documents", vec![".txt".to_string()]);
    let config_path = fixture.write_config(&config);

    let status = run_cli_with_config(
        &OrganizeCommand::Organize {
            source: fixture.path().join("src"),
            target: fixture.path().join("dst"),
            dry_run: false,
        },
        Some(&config_path),
        quiet(),
    )
    .expect("organize failed");

    assert_eq!(status, RunStatus::Complete);
    fixture.assert_file_exists("dst/fonts/font.ttf");
    fixture.assert_file_exists("dst/web/page.html");
    fixture.assert_file_exists("dst/web/notes.txt");
    fixture.assert_file_not_exists("dst/documents");
}

#[test]
fn test_ignore_globs_and_regex_from_config() {
    let fixture = TestFixture::new();
    fixture.create_files(&[
        ("src/node_modules/pkg/index.js", "js"),
        ("src/app/main.js", "js"),
        ("src/~$draft.docx", "lock"),
        ("src/final.docx", "doc"),
    ]);

    let config = OrganizerConfig {
        ignore_globs: vec!["node_modules".to_string()],
        ignore_regex: vec![r"^~\$".to_string()],
        ..Default::default()
    };
    let table = config.category_table().unwrap();
    let rules = config.walk_rules().unwrap();
    let report = Organizer::new(&table, &rules)
        .scan(&fixture.path().join("src"))
        .expect("scan failed");

    assert_eq!(report.category_counts()["code"], 1);
    assert_eq!(report.category_counts()["documents"], 1);
}

#[test]
fn test_malformed_config_falls_back_to_defaults() {
    let fixture = TestFixture::new();
    fixture.create_file("src/a.txt", "a");
    fixture.create_file("broken.toml", "categories = 12 [[");

    let status = run_cli_with_config(
        &OrganizeCommand::Organize {
            source: fixture.path().join("src"),
            target: fixture.path().join("dst"),
            dry_run: false,
        },
        Some(&fixture.path().join("broken.toml")),
        quiet(),
    )
    .expect("organize failed");

    assert_eq!(status, RunStatus::Complete);
    fixture.assert_file_exists("dst/documents/a.txt");
}

#[test]
fn test_invalid_category_name_is_fatal() {
    let fixture = TestFixture::new();
    fixture.create_file("src/a.txt", "a");

    let mut config = OrganizerConfig::default();
    config.add_category("../escape", vec![".txt".to_string()]);
    let config_path = fixture.write_config(&config);

    let result = run_cli_with_config(
        &OrganizeCommand::Scan {
            source: fixture.path().join("src"),
        },
        Some(&config_path),
        quiet(),
    );
    assert!(result.is_err());
}

// ============================================================================
// Test Suite 6: CLI Commands
// ============================================================================

#[test]
fn test_cli_scan_missing_source_is_error() {
    let fixture = TestFixture::new();
    let config_path = fixture.write_config(&OrganizerConfig::default());

    let result = run_cli_with_config(
        &OrganizeCommand::Scan {
            source: fixture.path().join("nope"),
        },
        Some(&config_path),
        quiet(),
    );
    assert!(result.is_err());
}

#[test]
fn test_cli_layout_creates_category_folders() {
    let fixture = TestFixture::new();
    let config_path = fixture.write_config(&OrganizerConfig::default());
    let target = fixture.path().join("layout");

    let dry = run_cli_with_config(
        &OrganizeCommand::Layout {
            target: target.clone(),
            dry_run: true,
        },
        Some(&config_path),
        quiet(),
    )
    .expect("layout failed");
    assert_eq!(dry, RunStatus::Complete);
    assert!(!target.exists());

    run_cli_with_config(
        &OrganizeCommand::Layout {
            target: target.clone(),
            dry_run: false,
        },
        Some(&config_path),
        OutputOptions::default(),
    )
    .expect("layout failed");

    for name in [
        "images",
        "documents",
        "videos",
        "audio",
        "archives",
        "code",
        "spreadsheets",
        "other",
    ] {
        assert!(target.join(name).is_dir(), "missing {}", name);
    }
}

#[test]
fn test_cli_init_config_writes_loadable_defaults() {
    let fixture = TestFixture::new();
    let path = fixture.path().join("conf/tidytree.toml");
    let command = OrganizeCommand::InitConfig {
        path: Some(path.clone()),
        force: false,
    };

    run_cli_with_config(&command, None, quiet()).expect("init failed");
    let loaded = OrganizerConfig::load(Some(&path)).expect("load failed");
    assert_eq!(loaded, OrganizerConfig::default());

    // Refuses to overwrite without --force.
    assert!(run_cli_with_config(&command, None, quiet()).is_err());
    let forced = OrganizeCommand::InitConfig {
        path: Some(path),
        force: true,
    };
    assert!(run_cli_with_config(&forced, None, quiet()).is_ok());
}

#[test]
fn test_cli_partial_status_on_per_file_errors() {
    let fixture = TestFixture::new();
    fixture.create_files(&[("src/a.txt", "a"), ("dst/documents", "blocker")]);
    let config_path = fixture.write_config(&OrganizerConfig::default());

    let status = run_cli_with_config(
        &OrganizeCommand::Organize {
            source: fixture.path().join("src"),
            target: fixture.path().join("dst"),
            dry_run: false,
        },
        Some(&config_path),
        OutputOptions::default(),
    )
    .expect("organize failed");

    assert_eq!(status, RunStatus::Partial);
    fixture.assert_file_exists("src/a.txt");
}
