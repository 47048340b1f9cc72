use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use super::record::{ProductRecord, RawProductLine};
use crate::core::errors::RagError;

const BATCH_FILE_EXTENSION: &str = "jsonl";

/// Records produced by one loader pass, plus what was thrown away.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub records: Vec<ProductRecord>,
    pub stats: LoadStats,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub files_scanned: usize,
    pub files_unreadable: usize,
    pub lines_skipped: usize,
    pub records_excluded: usize,
}

/// Reads every `*.jsonl` file below `root`; each file's parent directory
/// name becomes the category of its records.
///
/// Malformed lines and unreadable files are logged and skipped. Records
/// without a title, URL or full text are excluded. Duplicates are kept.
pub fn load_records(root: &Path) -> Result<LoadReport, RagError> {
    if !root.is_dir() {
        return Err(RagError::Config(format!(
            "content directory not found: {}",
            root.display()
        )));
    }

    let mut report = LoadReport::default();

    for file_path in discover_batch_files(root) {
        let category = category_for(&file_path);
        report.stats.files_scanned += 1;

        let contents = match fs::read(&file_path) {
            Ok(contents) => contents,
            Err(err) => {
                tracing::warn!("Skipping unreadable file {}: {}", file_path.display(), err);
                report.stats.files_unreadable += 1;
                continue;
            }
        };

        for (line_no, line) in contents.split(|byte| *byte == b'\n').enumerate() {
            let line = line.trim_ascii();
            if line.is_empty() {
                continue;
            }

            let raw: RawProductLine = match parse_line(line) {
                Ok(raw) => raw,
                Err(err) => {
                    tracing::warn!(
                        "Skipping invalid JSON in {} line {}: {}",
                        file_path.display(),
                        line_no + 1,
                        err
                    );
                    report.stats.lines_skipped += 1;
                    continue;
                }
            };

            match raw.into_record(&category) {
                Some(record) => report.records.push(record),
                None => report.stats.records_excluded += 1,
            }
        }
    }

    tracing::debug!(
        "Loaded {} records from {} files under {}",
        report.records.len(),
        report.stats.files_scanned,
        root.display()
    );

    Ok(report)
}

/// Decodes one line on its own; bad UTF-8 fails only this line.
fn parse_line(line: &[u8]) -> Result<RawProductLine, String> {
    let text = std::str::from_utf8(line).map_err(|e| format!("invalid UTF-8: {}", e))?;
    serde_json::from_str(text).map_err(|e| e.to_string())
}

fn discover_batch_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!("Skipping unreadable directory entry: {}", err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(BATCH_FILE_EXTENSION))
        })
        .map(|entry| entry.into_path())
        .collect()
}

fn category_for(file_path: &Path) -> String {
    file_path
        .parent()
        .and_then(|parent| parent.file_name())
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn malformed_line_is_skipped_and_counted() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "cameras/dslr.jsonl",
            concat!(
                r#"{"title":"DSLR Starter Kit","url":"https://shop.test/dslr","full_text":"24MP sensor"}"#,
                "\n",
                r#"{"title": "broken"#,
                "\n"
            ),
        );

        let report = load_records(tmp.path()).unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].title, "DSLR Starter Kit");
        assert_eq!(report.records[0].category, "cameras");
        assert_eq!(report.stats.lines_skipped, 1);
        assert_eq!(report.stats.files_scanned, 1);
    }

    #[test]
    fn invalid_utf8_line_only_costs_that_line() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cameras").join("a.jsonl");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(
            br#"{"title":"Compact Zoom","url":"https://shop.test/zoom","full_text":"30x optical"}"#,
        );
        bytes.extend_from_slice(b"\n{\"title\":\"bad \xff\"}\r\n");
        bytes.extend_from_slice(
            br#"{"title":"Action Cam","url":"https://shop.test/action","full_text":"waterproof"}"#,
        );
        fs::write(&path, bytes).unwrap();

        let report = load_records(tmp.path()).unwrap();

        let titles: Vec<&str> = report.records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Compact Zoom", "Action Cam"]);
        assert_eq!(report.stats.lines_skipped, 1);
        assert_eq!(report.stats.files_unreadable, 0);
    }

    #[test]
    fn skipped_line_is_logged_with_its_location() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "cameras/dslr.jsonl",
            concat!(
                r#"{"title":"DSLR Starter Kit","url":"https://shop.test/dslr","full_text":"24MP sensor"}"#,
                "\n",
                "not json\n"
            ),
        );

        let buffer = Arc::new(Mutex::new(Vec::new()));
        let writer_buffer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .with_writer(move || CapturedLog(writer_buffer.clone()))
            .finish();

        let report =
            tracing::subscriber::with_default(subscriber, || load_records(tmp.path())).unwrap();

        assert_eq!(report.stats.lines_skipped, 1);
        let logged = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("WARN"), "{logged}");
        assert!(logged.contains("Skipping invalid JSON in"), "{logged}");
        assert!(logged.contains("dslr.jsonl line 2"), "{logged}");
    }

    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn record_without_title_is_excluded() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "audio/speakers.jsonl",
            concat!(
                r#"{"url":"https://shop.test/a","full_text":"a speaker with no name"}"#,
                "\n",
                r#"{"title":"Soundbar","url":"https://shop.test/b"}"#,
                "\n"
            ),
        );

        let report = load_records(tmp.path()).unwrap();

        assert!(report.records.is_empty());
        assert_eq!(report.stats.records_excluded, 2);
        assert_eq!(report.stats.lines_skipped, 0);
    }

    #[test]
    fn nested_files_are_discovered_in_name_order_without_dedup() {
        let tmp = tempfile::tempdir().unwrap();
        let line = r#"{"title":"USB-C Charger","url":"https://shop.test/c","full_text":"65W"}"#;
        write(tmp.path(), "chargers/b.jsonl", line);
        write(tmp.path(), "apple/a.jsonl", line);
        write(tmp.path(), "apple/notes.txt", line);
        write(tmp.path(), "deep/nested/laptops/x.jsonl", "\n\n");

        let report = load_records(tmp.path()).unwrap();

        let categories: Vec<&str> = report.records.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(categories, vec!["apple", "chargers"]);
        assert_eq!(report.stats.files_scanned, 3);
    }

    #[test]
    fn missing_root_is_a_configuration_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load_records(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }
}
