//! CLI integration tests for srcscan.
//!
//! These tests run the binary against headers written to temporary
//! directories and check what it prints.

use std::fs;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the srcscan binary command, isolated from the user's configuration.
fn srcscan(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("srcscan").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env_remove("SRCSCAN_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

/// Create a temporary directory with the given headers.
fn headers(files: &[(&str, &str)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (name, content) in files {
        let path = tmp.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
    tmp
}

// ============================================================================
// srcscan scan
// ============================================================================

#[test]
fn test_scan_prints_json_symbols() {
    let tmp = headers(&[("math.h", "int add (int a, int b);\nextern double scale;\n")]);

    srcscan(&tmp)
        .args(["scan", "math.h"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"add\""))
        .stdout(predicate::str::contains("\"kind\": \"function\""))
        .stdout(predicate::str::contains("\"c_type\": \"double\""));
}

#[test]
fn test_scan_text_format() {
    let tmp = headers(&[(
        "point.h",
        "struct point { int x; int y; };\ntypedef struct point Point;\n",
    )]);

    srcscan(&tmp)
        .args(["scan", "point.h", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::eq(
            "point.h:1: struct point: struct point\npoint.h:2: typedef Point: struct point\n",
        ));
}

#[test]
fn test_scan_malformed_file_fails_but_reports_others() {
    let tmp = headers(&[
        ("good.h", "int good (void);\n"),
        ("bad.h", "struct broken {\n  int x;\n"),
    ]);

    srcscan(&tmp)
        .args(["scan", "good.h", "bad.h", "--format", "text"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("good.h:1: function good"))
        .stdout(predicate::str::contains("broken").not())
        .stderr(predicate::str::contains("error: expected"))
        .stderr(predicate::str::contains("--> bad.h"))
        .stderr(predicate::str::contains("1 input(s) failed to scan"));
}

#[test]
fn test_scan_missing_file_fails() {
    let tmp = headers(&[]);

    srcscan(&tmp)
        .args(["scan", "missing.h"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not read input"));
}

#[test]
fn test_scan_stdin_with_name() {
    let tmp = headers(&[]);

    assert_cmd::Command::from_std(srcscan(&tmp))
        .args(["scan", "-", "--stdin-name", "piped.h", "--format", "text"])
        .write_stdin("int counter;\n")
        .assert()
        .success()
        .stdout(predicate::eq("piped.h:1: variable counter: int\n"));
}

#[test]
fn test_scan_defines_resolve_constants() {
    let tmp = headers(&[("sizes.h", "enum { WIDE = WIDTH * 2, NARROW };\n")]);

    srcscan(&tmp)
        .args(["scan", "sizes.h", "-D", "WIDTH=4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"const_int\": 8"))
        .stdout(predicate::str::contains("\"const_int\": 9"));
}

#[test]
fn test_scan_macro_files_define_decorations() {
    let tmp = headers(&[
        ("config.h", "#define DEMO_EXPORT\n#define DEMO_VERSION 3\n"),
        ("api.h", "DEMO_EXPORT int demo_init (void);\n"),
    ]);

    srcscan(&tmp)
        .args(["scan", "api.h", "-m", "config.h", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::eq("api.h:1: function demo_init: int (void)\n"));
}

#[test]
fn test_scan_macro_scan_emits_constants() {
    let tmp = headers(&[
        ("config.h", "#define DEMO_VERSION 3\n"),
        (
            "api.h",
            "#define DEMO_NAME \"demo\"\n#define DEMO_NEXT (DEMO_VERSION + 1)\n#define DEMO_CALL(x) x\nint ignored (void);\n",
        ),
    ]);

    srcscan(&tmp)
        .args(["scan", "api.h", "-m", "config.h", "--macro-scan", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::eq(
            "api.h:1: const DEMO_NAME: const char * = \"demo\"\napi.h:2: const DEMO_NEXT: int = 4\n",
        ));
}

#[test]
fn test_scan_walks_directories() {
    let tmp = headers(&[
        ("include/a.h", "int a (void);\n"),
        ("include/sub/b.h", "int b (void);\n"),
        ("include/notes.txt", "int not_scanned;\n"),
    ]);

    srcscan(&tmp)
        .args(["scan", "include", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("function a"))
        .stdout(predicate::str::contains("function b"))
        .stdout(predicate::str::contains("not_scanned").not());
}

#[test]
fn test_scan_filters() {
    let tmp = headers(&[(
        "gtk.h",
        "void gtk_init (void);\nvoid gtk_main (void);\nvoid other (void);\n",
    )]);

    srcscan(&tmp)
        .args([
            "scan",
            "gtk.h",
            "--format",
            "text",
            "--include",
            "gtk_*",
            "--exclude",
            "gtk_main",
            "--strip-prefix",
            "gtk_",
        ])
        .assert()
        .success()
        .stdout(predicate::eq("gtk.h:1: function init: void (void)\n"));
}

#[test]
fn test_scan_xml_format() {
    let tmp = headers(&[("flags.h", "struct flags { unsigned int ready : 1; };\n")]);

    srcscan(&tmp)
        .args(["scan", "flags.h", "--format", "xml"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("<?xml version=\"1.0\"?>\n<symbols>\n"))
        .stdout(predicate::str::contains(
            "<member name=\"ready\" type=\"unsigned int\" bits=\"1\"/>",
        ));
}

#[test]
fn test_scan_project_config() {
    let tmp = headers(&[
        ("api.h", "int api_call (void);\n"),
        (".srcscan/config.toml", "[output]\nformat = \"text\"\n\n[filter]\nstrip_prefix = \"api_\"\n"),
    ]);

    srcscan(&tmp)
        .args(["scan", "api.h"])
        .assert()
        .success()
        .stdout(predicate::eq("api.h:1: function call: int (void)\n"));
}

#[test]
fn test_scan_invalid_config() {
    let tmp = headers(&[
        ("api.h", "int api_call (void);\n"),
        ("broken.toml", "[scan]\nmacro_scan = maybe\n"),
    ]);

    srcscan(&tmp)
        .args(["--config", "broken.toml", "scan", "api.h"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration in broken.toml"));
}

#[test]
fn test_scan_requires_input() {
    let tmp = headers(&[]);

    srcscan(&tmp).args(["scan"]).assert().failure();
}

// ============================================================================
// srcscan directives / macros
// ============================================================================

#[test]
fn test_directives_lists_by_name() {
    let tmp = headers(&[(
        "annotated.h",
        "/**\n * foo_new: (constructor)\n * Returns: (transfer full)\n */\nFoo *foo_new (void);\n\n/**\n * foo_ref: (skip)\n */\nFoo *foo_ref (Foo *foo);\n",
    )]);

    srcscan(&tmp)
        .args(["directives", "transfer", "annotated.h"])
        .assert()
        .success()
        .stdout(predicate::eq("(transfer full) @return\n"));

    srcscan(&tmp)
        .args(["directives", "nonexistent", "annotated.h"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_macros_lists_definitions() {
    let tmp = headers(&[("defs.h", "#define ANSWER 42\n#define MAX(a, b) ((a) > (b) ? (a) : (b))\n#define EMPTY\n")]);

    srcscan(&tmp)
        .args(["macros", "defs.h"])
        .assert()
        .success()
        .stdout(predicate::eq(
            "defs.h:1: ANSWER 42\ndefs.h:2: MAX(a, b) ((a) > (b) ? (a) : (b))\ndefs.h:3: EMPTY\n",
        ));
}

// ============================================================================
// srcscan shlibs
// ============================================================================

#[test]
fn test_shlibs_resolves_from_stdin() {
    let tmp = headers(&[]);
    let output = "\tlibglib-2.0.so.0 => /usr/lib/libglib-2.0.so.0 (0x00007f)\n\tlibgtk-3.so.0 => /usr/lib/libgtk-3.so.0 (0x00007f)\n";

    assert_cmd::Command::from_std(srcscan(&tmp))
        .args(["shlibs", "-l", "glib-2.0", "-l", "gtk-3"])
        .write_stdin(output)
        .assert()
        .success()
        .stdout(predicate::eq("libglib-2.0.so.0\nlibgtk-3.so.0\n"));
}

#[test]
fn test_shlibs_unresolved() {
    let tmp = headers(&[("ldd.txt", "\tlibc.so.6 => /lib/libc.so.6 (0x00)\n")]);

    srcscan(&tmp)
        .args(["shlibs", "-l", "foo", "--ldd-output", "ldd.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "can't resolve libraries to shared libraries: foo",
        ));
}

// ============================================================================
// srcscan attrs / completions
// ============================================================================

#[test]
fn test_attrs_omits_missing_values() {
    let tmp = headers(&[]);

    srcscan(&tmp)
        .args(["attrs", "field", "name=x", "type", "--self-indent", "2", "--indent", "0"])
        .assert()
        .success()
        .stdout(predicate::eq(" name=\"x\"\n"));
}

#[test]
fn test_attrs_escapes_values() {
    let tmp = headers(&[]);

    srcscan(&tmp)
        .args(["attrs", "doc", "text=a<b & \"c\""])
        .assert()
        .success()
        .stdout(predicate::eq(" text=\"a&lt;b &amp; &quot;c&quot;\"\n"));
}

#[test]
fn test_completions_bash() {
    let tmp = headers(&[]);

    srcscan(&tmp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("srcscan"));
}
