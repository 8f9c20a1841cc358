use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::{env, fs};

const WIKI_CASES_PATH: &str = "tests/wiki_cases/";
const CASES_WRITE: &str = "tests/integ_test_cases.rs";

fn main() -> Result<(), String> {
    println!("cargo::rerun-if-changed={WIKI_CASES_PATH}");
    let out_dir = env::var("OUT_DIR").map_err(|e| e.to_string())?;

    let generated = generate_integ_test_cases()?;

    let out_path = Path::new(&out_dir).join(CASES_WRITE);
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("mkdirs on {}: {e}", parent.display()))?;
    }
    fs::write(&out_path, generated).map_err(|e| format!("writing to {}: {e}", out_path.display()))
}

/// One `tests/wiki_cases/*.toml` file: a wiki document, and the outputs expected from various command lines.
#[derive(Deserialize)]
struct CaseFile {
    given: Given,
    expect: BTreeMap<String, Expect>,
}

#[derive(Deserialize)]
struct Given {
    /// What the case reads from stdin.
    wiki: String,
    /// Files the case can read by path.
    #[serde(default)]
    files: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct Expect {
    cli_args: Vec<String>,
    output: String,
    #[serde(default)]
    output_json: bool,
    #[serde(default = "succeeds")]
    expect_success: bool,
    #[serde(default)]
    output_err: String,
    /// If set, the reason this case is ignored.
    ignore: Option<String>,
}

fn succeeds() -> bool {
    true
}

fn generate_integ_test_cases() -> Result<String, String> {
    let mut paths = fs::read_dir(WIKI_CASES_PATH)
        .map_err(|e| format!("{WIKI_CASES_PATH}: {e}"))?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<PathBuf>, _>>()
        .map_err(|e| format!("{WIKI_CASES_PATH}: {e}"))?;
    paths.sort();

    let mut out = String::with_capacity(4096);
    for path in paths {
        let display = path.display().to_string();
        if !path.is_file() {
            return Err(format!("{display}: not a regular file"));
        }
        let mod_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .ok_or_else(|| format!("{display}: no file stem"))?;
        let contents = fs::read_to_string(&path).map_err(|e| format!("{display}: {e}"))?;
        let case_file: CaseFile = toml::from_str(&contents).map_err(|e| format!("{display}: {e}"))?;
        write_case_module(&mut out, &mod_name, &case_file).map_err(|e| format!("{display}: {e}"))?;
    }
    Ok(out)
}

fn write_case_module(out: &mut String, mod_name: &str, case_file: &CaseFile) -> std::fmt::Result {
    writeln!(out, "mod {mod_name} {{")?;
    writeln!(out, "    use super::*;")?;
    writeln!(out)?;
    // Debug-formatted literals throughout, since outputs often start or end with significant whitespace.
    writeln!(out, "    const WIKI: &str = {:?};", case_file.given.wiki)?;
    writeln!(out, "    const FILES: [(&str, &str); {}] = [", case_file.given.files.len())?;
    for (name, contents) in &case_file.given.files {
        writeln!(out, "        ({name:?}, {contents:?}),")?;
    }
    writeln!(out, "    ];")?;

    for (case_name, expect) in &case_file.expect {
        writeln!(out)?;
        if let Some(reason) = &expect.ignore {
            writeln!(out, "    #[ignore = {reason:?}]")?;
        }
        writeln!(out, "    #[test]")?;
        writeln!(out, "    fn {}() {{", fn_name(case_name))?;
        writeln!(out, "        Case {{")?;
        writeln!(out, "            cli_args: {:?},", expect.cli_args)?;
        writeln!(out, "            expect_output_json: {},", expect.output_json)?;
        writeln!(out, "            expect_output: {:?},", expect.output)?;
        writeln!(out, "            expect_error: {:?},", expect.output_err)?;
        writeln!(out, "            expect_success: {},", expect.expect_success)?;
        writeln!(out, "            wiki: WIKI,")?;
        writeln!(out, "            files: &FILES,")?;
        writeln!(out, "        }}")?;
        writeln!(out, "        .check();")?;
        writeln!(out, "    }}")?;
    }
    writeln!(out, "}}")?;
    writeln!(out)
}

/// `"gfm falls back to html"` becomes `gfm_falls_back_to_html`.
fn fn_name(case_name: &str) -> String {
    case_name
        .replace(|ch: char| !(ch.is_alphanumeric() || ch.is_whitespace()), "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}
