//! YAML loader for test cases.
//!
//! A test file may hold a mapping with a `tests:` list, a bare list of
//! cases, a single case mapping, or nothing at all.

use crate::types::{TestCase, ValidationError};
use glob::glob;
use serde_yml::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Files larger than this are rejected before parsing.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Errors that can occur during loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("test directory not found: {0}")]
    DirectoryNotFound(PathBuf),
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML parse error in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yml::Error,
    },
    #[error("{path} is {size} bytes, exceeding the 10 MiB limit")]
    FileTooLarge { path: PathBuf, size: u64 },
    #[error("unexpected YAML structure in {path}: {detail}")]
    UnexpectedShape { path: PathBuf, detail: String },
    #[error("invalid test case in {path}: {source}")]
    InvalidTestCase {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },
    #[error("duplicate test name '{name}': first defined in {first}, redefined in {second}")]
    DuplicateName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

/// Recursively discover `*.yaml` and `*.yml` files under `dir`, sorted by path.
///
/// # Errors
/// Returns `LoaderError::DirectoryNotFound` if `dir` is not a directory.
pub fn discover_test_files(dir: &Path) -> Result<Vec<PathBuf>, LoaderError> {
    if !dir.is_dir() {
        return Err(LoaderError::DirectoryNotFound(dir.to_path_buf()));
    }

    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let mut files = Vec::new();
    for ext in ["yaml", "yml"] {
        let pattern = format!("{escaped}/**/*.{ext}");
        files.extend(glob(&pattern)?.flatten().filter(|p| p.is_file()));
    }
    files.sort();
    files.dedup();

    tracing::debug!(dir = %dir.display(), count = files.len(), "discovered test files");
    Ok(files)
}

fn shape_error(path: &Path, detail: impl Into<String>) -> LoaderError {
    LoaderError::UnexpectedShape {
        path: path.to_path_buf(),
        detail: detail.into(),
    }
}

/// Split a parsed document into per-case records.
fn case_records(path: &Path, doc: Value) -> Result<Vec<Value>, LoaderError> {
    let records = match doc {
        Value::Null => return Ok(Vec::new()),
        Value::Sequence(items) => items,
        Value::Mapping(map) => match map.get("tests").cloned() {
            Some(Value::Sequence(items)) => items,
            Some(Value::Null) => Vec::new(),
            Some(other) => {
                return Err(shape_error(
                    path,
                    format!("`tests` must be a list, got {}", kind_of(&other)),
                ));
            }
            None => vec![Value::Mapping(map)],
        },
        other => {
            return Err(shape_error(
                path,
                format!("expected a mapping or a list, got {}", kind_of(&other)),
            ));
        }
    };

    if let Some((index, item)) = records.iter().enumerate().find(|(_, v)| !v.is_mapping()) {
        return Err(shape_error(
            path,
            format!("entry {index} is {}, expected a mapping", kind_of(item)),
        ));
    }
    Ok(records)
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Load every test case declared in one YAML file.
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read or exceeds [`MAX_FILE_SIZE`]
/// - YAML parsing fails
/// - The document has an unsupported shape
/// - A case has unknown fields, an unknown `expected_behavior` key, or fails validation
pub fn load_test_file(path: &Path) -> Result<Vec<TestCase>, LoaderError> {
    let io_err = |source| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    };
    let yaml_err = |source| LoaderError::Yaml {
        path: path.to_path_buf(),
        source,
    };

    let size = std::fs::metadata(path).map_err(io_err)?.len();
    if size > MAX_FILE_SIZE {
        return Err(LoaderError::FileTooLarge {
            path: path.to_path_buf(),
            size,
        });
    }

    let content = std::fs::read_to_string(path).map_err(io_err)?;
    let doc: Value = serde_yml::from_str(&content).map_err(yaml_err)?;

    case_records(path, doc)?
        .into_iter()
        .map(|record| {
            let case: TestCase = serde_yml::from_value(record).map_err(yaml_err)?;
            case.validate()
                .map_err(|source| LoaderError::InvalidTestCase {
                    path: path.to_path_buf(),
                    source,
                })?;
            Ok(case)
        })
        .collect()
}

/// Load all test cases under `dir`, in file order then declaration order.
///
/// # Errors
/// Returns `LoaderError::DirectoryNotFound` for a missing directory, any
/// per-file error from [`load_test_file`], or `LoaderError::DuplicateName`
/// when two cases share a name.
pub fn load_tests(dir: &Path) -> Result<Vec<TestCase>, LoaderError> {
    let mut cases = Vec::new();
    let mut seen: HashMap<String, PathBuf> = HashMap::new();

    for file in discover_test_files(dir)? {
        for case in load_test_file(&file)? {
            if let Some(first) = seen.get(&case.name) {
                return Err(LoaderError::DuplicateName {
                    name: case.name,
                    first: first.clone(),
                    second: file,
                });
            }
            seen.insert(case.name.clone(), file.clone());
            cases.push(case);
        }
    }
    Ok(cases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) -> Result<PathBuf, std::io::Error> {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    #[test]
    fn test_load_tests_key_shape() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = write(
            dir.path(),
            "suite.yaml",
            r#"
tests:
  - name: greet
    description: "says hello"
    input_messages:
      - role: user
        content: "Hi"
    expected_behavior:
      contains_text: hello
    tags: [smoke]
  - name: second
"#,
        )?;

        let cases = load_test_file(&path)?;
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].name, "greet");
        assert_eq!(cases[0].input_messages[0].content, "Hi");
        assert_eq!(
            cases[0].expected_behavior.contains_text.as_deref(),
            Some("hello")
        );
        assert!(cases[0].tags.contains("smoke"));
        assert!(cases[1].expected_behavior.is_empty());
        Ok(())
    }

    #[test]
    fn test_load_bare_list_and_single_mapping() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let list = write(dir.path(), "list.yml", "- name: a\n- name: b\n")?;
        let single = write(dir.path(), "single.yaml", "name: only\n")?;

        assert_eq!(load_test_file(&list)?.len(), 2);
        let cases = load_test_file(&single)?;
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].name, "only");
        Ok(())
    }

    #[test]
    fn test_load_empty_document() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = write(dir.path(), "empty.yaml", "# nothing yet\n")?;
        assert!(load_test_file(&path)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_load_rejects_scalar_document() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = write(dir.path(), "scalar.yaml", "just a string\n")?;
        let result = load_test_file(&path);
        assert!(matches!(result, Err(LoaderError::UnexpectedShape { .. })));
        Ok(())
    }

    #[test]
    fn test_load_rejects_non_mapping_entry() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = write(dir.path(), "mixed.yaml", "- name: a\n- 42\n")?;
        let err = load_test_file(&path).err().ok_or("expected an error")?;
        assert!(err.to_string().contains("entry 1"));
        Ok(())
    }

    #[test]
    fn test_load_rejects_unknown_expected_behavior_key() -> Result<(), Box<dyn std::error::Error>>
    {
        let dir = TempDir::new()?;
        let path = write(
            dir.path(),
            "bad.yaml",
            "name: a\nexpected_behavior:\n  sounds_polite: true\n",
        )?;
        assert!(matches!(
            load_test_file(&path),
            Err(LoaderError::Yaml { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_load_rejects_unknown_case_field() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = write(dir.path(), "bad.yaml", "name: a\npriority: high\n")?;
        assert!(load_test_file(&path).is_err());
        Ok(())
    }

    #[test]
    fn test_load_rejects_non_object_schema() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = write(
            dir.path(),
            "bad.yaml",
            "name: a\nexpected_behavior:\n  matches_schema: object\n",
        )?;
        assert!(matches!(
            load_test_file(&path),
            Err(LoaderError::InvalidTestCase {
                source: ValidationError::SchemaNotObject(_),
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn test_load_tests_recurses_in_sorted_order() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        write(dir.path(), "b.yaml", "name: from-b\n")?;
        write(dir.path(), "a.yml", "name: from-a\n")?;
        write(dir.path(), "nested/c.yaml", "name: from-nested\n")?;
        write(dir.path(), "notes.txt", "name: ignored\n")?;

        let names: Vec<String> = load_tests(dir.path())?
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["from-a", "from-b", "from-nested"]);
        Ok(())
    }

    #[test]
    fn test_load_tests_missing_directory() {
        let result = load_tests(Path::new("/nonexistent/agent-ci/tests"));
        assert!(matches!(result, Err(LoaderError::DirectoryNotFound(_))));
    }

    #[test]
    fn test_load_tests_rejects_duplicate_names() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        write(dir.path(), "a.yaml", "name: same\n")?;
        write(dir.path(), "b.yaml", "name: same\n")?;
        assert!(matches!(
            load_tests(dir.path()),
            Err(LoaderError::DuplicateName { name, .. }) if name == "same"
        ));
        Ok(())
    }
}
