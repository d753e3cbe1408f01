//! Mapping library names to the shared objects a program loads.
//!
//! Given `-l` style names such as `glib-2.0` and the output of `ldd` (or
//! `otool -L`, or the BSD `ldd` table), find the shared object path that
//! provides each library.

use std::path::Path;

use miette::Diagnostic;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum ShlibError {
    #[error("can't resolve libraries to shared libraries: {}", .0.join(", "))]
    #[diagnostic(
        code(srcscan::shlibs::unresolved),
        help("Make sure the program was linked against the libraries you list")
    )]
    Unresolved(Vec<String>),

    #[error("invalid library name `{0}`")]
    #[diagnostic(code(srcscan::shlibs::pattern))]
    Pattern(String),
}

/// Pattern matching the basename of a shared object for `library`.
///
/// `lib*` also accepts names without the `lib` prefix doubled up, so both
/// `X` and `libX` can be asked for. The name must be followed by a
/// non-identifier character, so `pango` does not match `libpangocairo`.
fn library_pattern(library: &str) -> Result<Regex, ShlibError> {
    Regex::new(&format!(
        r"^lib*{}[^A-Za-z0-9_][^\s()]*",
        regex::escape(library)
    ))
    .map_err(|_| ShlibError::Pattern(library.to_string()))
}

/// Resolve each library to the first word of `output` that names it.
///
/// Libraries given as paths to existing files need no resolution and are
/// skipped. Results follow the order of `output`.
pub fn resolve_from_ldd_output(
    libraries: &[impl AsRef<str>],
    output: &str,
) -> Result<Vec<String>, ShlibError> {
    let mut patterns = Vec::new();
    for library in libraries {
        let library = library.as_ref();
        if Path::new(library).is_file() {
            debug!("{} is a file, not resolving it", library);
            continue;
        }
        patterns.push((library.to_string(), library_pattern(library)?));
    }
    if patterns.is_empty() {
        return Ok(Vec::new());
    }

    let mut shlibs = Vec::new();
    for line in output.lines() {
        // BSD ldd repeats its argument on a header line
        if line.ends_with(':') {
            continue;
        }
        for word in line.split_whitespace() {
            let Some(basename) = Path::new(word).file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(index) = patterns.iter().position(|(_, re)| re.is_match(basename)) {
                let (library, _) = patterns.remove(index);
                debug!("resolved {} to {}", library, word);
                shlibs.push(word.to_string());
            }
        }
    }

    if !patterns.is_empty() {
        return Err(ShlibError::Unresolved(
            patterns.into_iter().map(|(library, _)| library).collect(),
        ));
    }
    Ok(shlibs)
}

/// The name to record for a resolved shared object.
///
/// On macOS absolute install names are kept, while `@rpath/...` style names
/// reduce to their basename. Elsewhere only the basename is kept.
pub fn sanitize_shlib_path(path: &str) -> String {
    if cfg!(target_os = "macos") && Path::new(path).is_absolute() {
        return path.to_string();
    }
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_from_ldd_output() {
        let output = "\
            libglib-2.0.so.0 => /usr/lib/x86_64-linux-gnu/libglib-2.0.so.0 (0x00007fbe12d68000)
            libgtk-3.so.0 => /usr/lib/x86_64-linux-gnu/libgtk-3.so.0 (0x00007fbe12462000)
            libgdk-3.so.0 => /usr/lib/x86_64-linux-gnu/libgdk-3.so.0 (0x00007fbe1216c000)
            libpango-1.0.so.0 => /usr/lib/x86_64-linux-gnu/libpango-1.0.so.0 (0x00007fbe11d1a000)
            libatk-1.0.so.0 => /usr/lib/x86_64-linux-gnu/libatk-1.0.so.0 (0x00007fbe11af4000)";

        assert_eq!(
            resolve_from_ldd_output(&["glib-2.0", "gtk-3", "pango-1.0"], output).unwrap(),
            vec!["libglib-2.0.so.0", "libgtk-3.so.0", "libpango-1.0.so.0"]
        );
    }

    #[test]
    fn test_resolve_macos_rpath() {
        let output = "\
            @rpath/libbarapp-1.0.dylib (compatibility version 0.0.0, current version 0.0.0)
            /foo/libgio-2.0.0.dylib (compatibility version 5801.0.0, current version 5801.3.0)
            /foo/libgmodule-2.0.0.dylib (compatibility version 5801.0.0, current version 5801.3.0)";

        let shlibs = resolve_from_ldd_output(&["barapp-1.0"], output).unwrap();
        assert_eq!(shlibs, vec!["@rpath/libbarapp-1.0.dylib"]);
        assert_eq!(sanitize_shlib_path(&shlibs[0]), "libbarapp-1.0.dylib");
    }

    #[test]
    fn test_sanitize_shlib_path() {
        assert_eq!(
            sanitize_shlib_path("@rpath/libbarapp-1.0.dylib"),
            "libbarapp-1.0.dylib"
        );
        let expected = if cfg!(target_os = "macos") { "/foo/bar" } else { "bar" };
        assert_eq!(sanitize_shlib_path("/foo/bar"), expected);
    }

    #[test]
    fn test_unresolved_library() {
        let err = resolve_from_ldd_output(&["foo"], "").unwrap_err();
        assert_eq!(err, ShlibError::Unresolved(vec!["foo".to_string()]));
        assert_eq!(
            err.to_string(),
            "can't resolve libraries to shared libraries: foo"
        );
    }

    #[test]
    fn test_prefixed_library_name() {
        let output = "\
           /usr/lib/liblibX.so
           /usr/lib/libX.so";

        assert_eq!(
            resolve_from_ldd_output(&["X"], output).unwrap(),
            vec!["/usr/lib/libX.so"]
        );
        assert_eq!(
            resolve_from_ldd_output(&["libX"], output).unwrap(),
            vec!["/usr/lib/liblibX.so"]
        );
    }

    #[test]
    fn test_suffixed_library_name() {
        let output = "\
            libpangocairo.so.0 => /usr/lib/x86_64-linux-gnu/libpangocairo.so.0 (0x00)
            libpangoft2.so.0 => /usr/lib/x86_64-linux-gnu/libpangoft2.so.0 (0x00)
            libpango.so.0 => /usr/lib/x86_64-linux-gnu/libpango.so.0 (0x00)";

        assert_eq!(
            resolve_from_ldd_output(&["pango"], output).unwrap(),
            vec!["libpango.so.0"]
        );
    }

    #[test]
    fn test_header_is_ignored() {
        let output = "/tmp-introspection/libfoo.so.999:
            0000000000000000 0000000000000000 rlib  0    3   0      /usr/local/lib/libfoo.so.1";

        assert_eq!(
            resolve_from_ldd_output(&["foo"], output).unwrap(),
            vec!["/usr/local/lib/libfoo.so.1"]
        );
    }

    #[test]
    fn test_executable_path_includes_library_name() {
        let output = "/usr/ports/pobj/libgepub-0.6.0/build-amd64/tmp-introspectnxmyodg1/Gepub-0.6:
            Start            End              Type  Open Ref GrpRef Name
            00001066c8400000 00001066c8605000 exe   2    0   0      /usr/ports/pobj/libgepub-0.6.0/build-amd64/tmp-introspectnxmyodg1/Gepub-0.6
            000010690019c000 00001069003a8000 rlib  0    1   0      /usr/local/lib/libgepub-0.6.so.0.0";

        assert_eq!(
            resolve_from_ldd_output(&["gepub-0.6"], output).unwrap(),
            vec!["/usr/local/lib/libgepub-0.6.so.0.0"]
        );
    }

    #[test]
    fn test_library_path_includes_library_name() {
        let output = "/usr/ports/pobj/gnome-music-3.28.1/build-amd64/tmp-introspectuz5xaun3/Gd-1.0:
            Start            End              Type  Open Ref GrpRef Name
            0000070e40f00000 0000070e41105000 exe   2    0   0      /usr/ports/pobj/gnome-music-3.28.1/build-amd64/tmp-introspectuz5xaun3/Gd-1.0
            00000710f9b39000 00000710f9d51000 rlib  0    1   0      /usr/ports/pobj/gnome-music-3.28.1/build-amd64/subprojects/libgd/libgd/libgd.so";

        assert_eq!(
            resolve_from_ldd_output(&["gd"], output).unwrap(),
            vec!["/usr/ports/pobj/gnome-music-3.28.1/build-amd64/subprojects/libgd/libgd/libgd.so"]
        );
    }

    #[test]
    fn test_basename() {
        assert_eq!(
            resolve_from_ldd_output(&["foo"], "/usr/lib/libfoo.so").unwrap(),
            vec!["/usr/lib/libfoo.so"]
        );
    }

    #[test]
    fn test_existing_file_is_skipped() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let path = tmp.path().to_string_lossy().into_owned();
        assert!(resolve_from_ldd_output(&[path], "").unwrap().is_empty());
    }
}
