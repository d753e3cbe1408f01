//! Header fixtures for common test scenarios.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A GObject-style public header.
pub const GLIB_STYLE_HEADER: &str = r#"#ifndef __DEMO_OBJECT_H__
#define __DEMO_OBJECT_H__

#include <glib-object.h>

G_BEGIN_DECLS

#define DEMO_MAX_ITEMS 16
#define DEMO_NAME "demo" "-object"

typedef struct _DemoObject DemoObject;
typedef struct _DemoObjectClass DemoObjectClass;

struct _DemoObject
{
  GObject parent_instance;
  gint    counter;
  guint   flags : 4;
  gchar  *items[DEMO_MAX_ITEMS];
};

typedef enum {
  DEMO_STATE_IDLE,
  DEMO_STATE_BUSY = 4,
  DEMO_STATE_DONE
} DemoState;

typedef void (*DemoCallback) (DemoObject *object, gpointer user_data, ...);

/**
 * demo_object_new: (constructor)
 * @name: (nullable) (transfer none)
 *
 * Creates a new object.
 *
 * Returns: (transfer full)
 */
GLIB_AVAILABLE_IN_ALL
DemoObject *demo_object_new (const gchar *name);

/**
 * demo_object_frobnicate: (skip)
 */
void demo_object_frobnicate (DemoObject *object, DemoCallback callback);

#ifdef __cplusplus
class NotC {};
#endif

G_END_DECLS

#endif /* __DEMO_OBJECT_H__ */
"#;

/// Empty decoration macros the glib-style header relies on.
pub const DECORATION_MACROS: &str = r#"#define G_BEGIN_DECLS
#define G_END_DECLS
#define GLIB_AVAILABLE_IN_ALL
"#;

/// Preprocessor output mixing a system header with the scanned one.
pub const CPP_OUTPUT: &str = r#"# 1 "demo.c"
# 1 "/usr/include/stdio.h" 1
typedef struct _IO_FILE FILE;
extern int printf (const char *format, ...);
# 2 "demo.c" 2
# 1 "demo.h" 1
struct point { int x; int y; };
extern int demo_distance (struct point *a, struct point *b);
# 3 "demo.c" 2
"#;

/// A header with unbalanced braces.
pub const UNBALANCED_HEADER: &str = "struct broken {\n  int x;\n";

/// A set of headers written to disk together.
#[derive(Debug, Clone, Default)]
pub struct HeaderFixture {
    /// Relative path -> content
    pub files: BTreeMap<PathBuf, String>,
}

impl HeaderFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header.
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// The glib-style header plus its decoration macros.
    pub fn glib_style() -> Self {
        HeaderFixture::new()
            .with_file("demo-object.h", GLIB_STYLE_HEADER)
            .with_file("decorations.h", DECORATION_MACROS)
    }

    /// Write every file below `root`, returning the absolute paths in order.
    pub fn write_to(&self, root: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for (path, content) in &self.files {
            let full = root.join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&full, content)?;
            written.push(full);
        }
        Ok(written)
    }
}
