/// Markdown-based translation tests
///
/// This test module parses markdown files from tests/translation-examples/
/// and checks translator output against the expected text, line by line.

use std::fs;
use std::path::PathBuf;
use similar::{ChangeTag, TextDiff};

use codeshift::translator::{translate, Dialect, TranslateOptions};

/// Test metadata extracted from ## Metadata section
#[derive(Debug)]
struct TestMetadata {
    from: Dialect,
    to: Dialect,
    python_self_param: bool,
}

/// Represents a parsed translation test case
#[derive(Debug)]
struct TranslationTest {
    name: String,
    metadata: TestMetadata,
    input: String,
    expected_output: String,
}

/// Parse a markdown test file
fn parse_test_file(content: &str, filename: &str) -> Result<TranslationTest, String> {
    let mut lines = content.lines().peekable();
    let mut name = String::new();
    let mut input = String::new();
    let mut expected_output = String::new();
    let mut metadata_content = String::new();

    let mut in_input_section = false;
    let mut in_output_section = false;
    let mut in_metadata_section = false;
    let mut in_code_block = false;

    // Extract test name from first heading
    while let Some(line) = lines.peek() {
        if let Some(title) = line.strip_prefix("# ") {
            name = title.trim().to_string();
            lines.next();
            break;
        }
        lines.next();
    }

    if name.is_empty() {
        return Err(format!("No title found in {}", filename));
    }

    for line in lines {
        if line.starts_with("## Input") {
            in_input_section = true;
            in_output_section = false;
            in_metadata_section = false;
            continue;
        } else if line.starts_with("## Output") {
            in_input_section = false;
            in_output_section = true;
            in_metadata_section = false;
            continue;
        } else if line.starts_with("## Metadata") {
            in_input_section = false;
            in_output_section = false;
            in_metadata_section = true;
            continue;
        } else if line.starts_with("## ") {
            in_input_section = false;
            in_output_section = false;
            in_metadata_section = false;
            continue;
        }

        if line.starts_with("```") {
            in_code_block = !in_code_block;
            continue;
        }

        if in_code_block {
            let buffer = if in_input_section {
                &mut input
            } else if in_output_section {
                &mut expected_output
            } else if in_metadata_section {
                &mut metadata_content
            } else {
                continue;
            };
            buffer.push_str(line);
            buffer.push('\n');
        }
    }

    if input.is_empty() {
        return Err(format!("No input section found in {}", filename));
    }

    if expected_output.is_empty() {
        return Err(format!("No output section found in {}", filename));
    }

    let metadata = parse_metadata(&metadata_content, filename)?;

    Ok(TranslationTest {
        name,
        metadata,
        input,
        expected_output: expected_output.trim_end().to_string(),
    })
}

/// Parse metadata content (simple key: value format)
fn parse_metadata(content: &str, filename: &str) -> Result<TestMetadata, String> {
    let mut from = None;
    let mut to = None;
    let mut python_self_param = false;

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "from" => from = Some(value.parse::<Dialect>()?),
            "to" => to = Some(value.parse::<Dialect>()?),
            "self" => python_self_param = value == "true",
            _ => {}
        }
    }

    Ok(TestMetadata {
        from: from.ok_or_else(|| format!("Missing 'from' in metadata for {}", filename))?,
        to: to.ok_or_else(|| format!("Missing 'to' in metadata for {}", filename))?,
        python_self_param,
    })
}

/// Load all test files from the translation-examples directory
fn load_test_files() -> Vec<(String, String)> {
    let test_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("translation-examples");

    let mut tests = Vec::new();

    if let Ok(entries) = fs::read_dir(&test_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("md") {
                if let Some(filename) = path.file_name().and_then(|s| s.to_str()) {
                    if let Ok(content) = fs::read_to_string(&path) {
                        tests.push((filename.to_string(), content));
                    }
                }
            }
        }
    }

    // Sort for deterministic test order
    tests.sort_by(|a, b| a.0.cmp(&b.0));
    tests
}

/// Trailing whitespace is not significant; leading whitespace is
fn normalize(s: &str) -> String {
    s.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim_end()
        .to_string()
}

/// Print a colored diff between expected and actual output
fn print_colored_diff(expected: &str, actual: &str) {
    let diff = TextDiff::from_lines(actual, expected);

    eprintln!("\n{}", "=".repeat(80));
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => " ",
        };

        let colored_line = match change.tag() {
            ChangeTag::Delete => format!("\x1b[31m{} {}\x1b[0m", sign, change),
            ChangeTag::Insert => format!("\x1b[32m{} {}\x1b[0m", sign, change),
            ChangeTag::Equal => format!("{} {}", sign, change),
        };

        eprint!("{}", colored_line);
    }
    eprintln!("{}", "=".repeat(80));
}

#[test]
fn test_parse_markdown_files() {
    let test_files = load_test_files();

    assert!(
        !test_files.is_empty(),
        "No test files found in tests/translation-examples/"
    );

    for (filename, content) in test_files {
        let result = parse_test_file(&content, &filename);
        assert!(result.is_ok(), "Failed to parse {}: {:?}", filename, result.err());

        let test = result.unwrap();
        assert!(!test.name.is_empty(), "Test name is empty in {}", filename);
        assert_ne!(test.metadata.from, test.metadata.to, "Identity example in {}", filename);
    }
}

#[test]
fn examples() {
    let test_files = load_test_files();
    let mut failures = Vec::new();
    let total_tests = test_files.len();

    for (filename, content) in test_files {
        let test = parse_test_file(&content, &filename).expect("Failed to parse test file");
        eprintln!("Testing: {} ({})", test.name, filename);

        let mut options = TranslateOptions::new(test.metadata.from, test.metadata.to);
        options.python_self_param = test.metadata.python_self_param;

        match translate(&test.input, &options) {
            Ok(result) => {
                let actual = normalize(&result.output);
                let expected = normalize(&test.expected_output);
                if actual != expected {
                    eprintln!("\n\x1b[1;31m✗ MISMATCH in {}\x1b[0m", filename);
                    print_colored_diff(&expected, &actual);
                    failures.push(filename.clone());
                } else if !result.warnings.is_empty() {
                    eprintln!("\n\x1b[1;31m✗ WARNINGS in {}\x1b[0m", filename);
                    for warning in &result.warnings {
                        eprintln!("  {}", warning);
                    }
                    failures.push(filename.clone());
                } else {
                    eprintln!("\x1b[32m✓\x1b[0m [PASS] {}", filename);
                }
            }
            Err(failure) => {
                eprintln!("\n\x1b[1;31m✗ TRANSLATION ERROR in {}\x1b[0m", filename);
                eprintln!("{}", "=".repeat(80));
                eprintln!("\x1b[31mError: {}\x1b[0m", failure);
                eprintln!("\nInput:\n{}", test.input);
                eprintln!("{}", "=".repeat(80));
                failures.push(filename.clone());
            }
        }
    }

    if !failures.is_empty() {
        panic!(
            "\n\n{}/{} examples failed:\n{}\n",
            failures.len(),
            total_tests,
            failures.join("\n")
        );
    }
}
