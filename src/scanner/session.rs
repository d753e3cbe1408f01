//! Scanner session: the per-invocation owner of all scan state.
//!
//! A session accumulates macros, types, symbols and directives across any
//! number of files. A file that fails to lex or parse contributes nothing;
//! everything it added is rolled back and earlier results stay intact.

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::const_eval::FoldEnv;
use super::directive::{Directive, DirectiveIndex};
use super::errors::ScanError;
use super::macros::{MacroDef, MacroTable};
use super::parser::{ParseOptions, Parser};
use super::types::{Symbol, Type, TypeArena, TypeId};

/// Name used for streams parsed without a current filename.
pub const STDIN_NAME: &str = "<stdin>";

/// File recorded for macros defined through [`Session::define`].
pub const COMMAND_LINE: &str = "<command line>";

/// Lifecycle of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    FilenamesQueued,
    MacrosParsed,
    Parsed,
    Finalized,
}

/// One undoable change to the scan state.
#[derive(Debug)]
enum Undo {
    MacroInserted,
    MacroRemoved { def: MacroDef, position: usize },
    Constant { name: String, previous: Option<i64> },
    Typedef(String),
}

/// Lookup tables shared by every file of a session.
#[derive(Debug, Default)]
pub(crate) struct ScanState {
    pub(crate) arena: TypeArena,
    pub(crate) macros: MacroTable,
    pub(crate) constants: HashMap<String, i64>,
    pub(crate) typedefs: HashSet<String>,
    journal: Option<Vec<Undo>>,
}

impl ScanState {
    pub(crate) fn fold_env(&self) -> FoldEnv<'_> {
        FoldEnv {
            macros: &self.macros,
            constants: &self.constants,
            typedefs: &self.typedefs,
            position: None,
        }
    }

    fn record(&mut self, undo: Undo) {
        if let Some(journal) = &mut self.journal {
            journal.push(undo);
        }
    }

    pub(crate) fn define_macro(&mut self, def: MacroDef) -> bool {
        let inserted = self.macros.insert(def);
        if inserted {
            self.record(Undo::MacroInserted);
        }
        inserted
    }

    pub(crate) fn undef_macro(&mut self, name: &str, file: &Path) {
        let position = self.macros.names().iter().position(|n| n == name);
        if let (Some(position), Some(def)) = (position, self.macros.undef(name, file)) {
            self.record(Undo::MacroRemoved { def, position });
        }
    }

    pub(crate) fn set_constant(&mut self, name: &str, value: i64) {
        let previous = self.constants.insert(name.to_string(), value);
        self.record(Undo::Constant {
            name: name.to_string(),
            previous,
        });
    }

    pub(crate) fn add_typedef(&mut self, name: &str) {
        if self.typedefs.insert(name.to_string()) {
            self.record(Undo::Typedef(name.to_string()));
        }
    }

    pub(crate) fn checkpoint(&mut self) {
        self.arena.checkpoint();
        self.journal = Some(Vec::new());
    }

    pub(crate) fn commit(&mut self) {
        self.arena.commit();
        self.journal = None;
    }

    pub(crate) fn rollback(&mut self) {
        self.arena.rollback();
        let Some(journal) = self.journal.take() else {
            return;
        };
        for undo in journal.into_iter().rev() {
            match undo {
                Undo::MacroInserted => {
                    let len = self.macros.names().len();
                    self.macros.truncate(len.saturating_sub(1));
                }
                Undo::MacroRemoved { def, position } => self.macros.restore(def, position),
                Undo::Constant { name, previous } => match previous {
                    Some(value) => {
                        self.constants.insert(name, value);
                    }
                    None => {
                        self.constants.remove(&name);
                    }
                },
                Undo::Typedef(name) => {
                    self.typedefs.remove(&name);
                }
            }
        }
    }
}

/// A scanning session over a set of C sources.
#[derive(Debug)]
pub struct Session {
    filenames: Vec<PathBuf>,
    current_filename: Option<PathBuf>,
    macro_scan: bool,
    symbols: Vec<Symbol>,
    directives: DirectiveIndex,
    parsed_files: HashSet<PathBuf>,
    scan: ScanState,
    state: SessionState,
}

impl Default for Session {
    fn default() -> Self {
        Session {
            filenames: Vec::new(),
            current_filename: None,
            macro_scan: false,
            symbols: Vec::new(),
            directives: DirectiveIndex::new(),
            parsed_files: HashSet::new(),
            scan: ScanState::default(),
            state: SessionState::Created,
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<(), ScanError> {
        if self.state == SessionState::Finalized {
            return Err(ScanError::Finalized);
        }
        Ok(())
    }

    /// Queue a file. Adding the same path twice has no effect.
    pub fn append_filename(&mut self, path: impl AsRef<Path>) -> Result<(), ScanError> {
        self.ensure_open()?;
        let path = path.as_ref();
        if !self.filenames.iter().any(|f| f == path) {
            self.filenames.push(path.to_path_buf());
        }
        if self.state == SessionState::Created {
            self.state = SessionState::FilenamesQueued;
        }
        Ok(())
    }

    /// Pre-seed an object-like macro, e.g. from `-D NAME=VALUE`.
    pub fn define(&mut self, name: &str, value: &str) -> Result<(), ScanError> {
        self.ensure_open()?;
        if !self.scan.macros.define(name, value, COMMAND_LINE) {
            debug!("{} is already defined, keeping the first value", name);
        }
        Ok(())
    }

    /// Record the `#define`s of each file in order. The first definition of a name wins.
    pub fn parse_macros<I, P>(&mut self, paths: I) -> Result<(), ScanError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.ensure_open()?;
        for path in paths {
            let path = path.as_ref();
            let source = read_source(path)?;
            let before = self.scan.macros.len();

            let opts = ParseOptions {
                origin: path,
                filenames: &[],
                macro_scan: true,
                emit_consts: false,
            };
            self.scan.checkpoint();
            match Parser::new(&source, &mut self.scan, opts).run() {
                Ok(_) => self.scan.commit(),
                Err(e) => {
                    self.scan.rollback();
                    return Err(e);
                }
            }
            debug!(
                "{}: {} new macro(s)",
                path.display(),
                self.scan.macros.len() - before
            );
        }

        if matches!(
            self.state,
            SessionState::Created | SessionState::FilenamesQueued
        ) {
            self.state = SessionState::MacrosParsed;
        }
        Ok(())
    }

    /// Lex and parse a file from disk.
    pub fn lex_filename(&mut self, path: impl AsRef<Path>) -> Result<(), ScanError> {
        self.ensure_open()?;
        let path = path.as_ref();
        if self.parsed_files.contains(path) {
            debug!("{} was already parsed, skipping", path.display());
            return Ok(());
        }

        let source = read_source(path)?;
        self.current_filename = Some(path.to_path_buf());
        self.parse_source(&source, path)?;

        if !self.filenames.iter().any(|f| f == path) {
            self.filenames.push(path.to_path_buf());
        }
        self.parsed_files.insert(path.to_path_buf());
        Ok(())
    }

    /// Lex and parse an already open stream. The stream is named after the
    /// current filename, or `<stdin>` when there is none.
    pub fn parse_file<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<(), ScanError> {
        self.ensure_open()?;
        let name = self
            .current_filename
            .clone()
            .unwrap_or_else(|| PathBuf::from(STDIN_NAME));

        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| ScanError::io(&name, e))?;
        let source = String::from_utf8_lossy(&bytes);
        self.parse_source(&source, &name)
    }

    /// Like [`parse_file`](Self::parse_file), naming the stream `name`.
    pub fn parse_named<R: Read + ?Sized>(
        &mut self,
        reader: &mut R,
        name: impl AsRef<Path>,
    ) -> Result<(), ScanError> {
        self.ensure_open()?;
        self.current_filename = Some(name.as_ref().to_path_buf());
        self.parse_file(reader)
    }

    fn parse_source(&mut self, source: &str, origin: &Path) -> Result<(), ScanError> {
        let opts = ParseOptions {
            origin,
            filenames: &self.filenames,
            macro_scan: self.macro_scan,
            emit_consts: true,
        };

        self.scan.checkpoint();
        let output = match Parser::new(source, &mut self.scan, opts).run() {
            Ok(output) => output,
            Err(e) => {
                self.scan.rollback();
                debug!("{}: rolled back after error", origin.display());
                return Err(e);
            }
        };
        self.scan.commit();

        for (ident, directives) in &output.registrations {
            self.directives.register(ident.as_deref(), directives);
        }
        debug!(
            "{}: {} symbol(s), {} annotated",
            origin.display(),
            output.symbols.len(),
            output.registrations.len()
        );
        self.symbols.extend(output.symbols);
        self.state = SessionState::Parsed;
        Ok(())
    }

    /// Select macro-scan mode for later lex/parse calls.
    pub fn set_macro_scan(&mut self, enabled: bool) {
        self.macro_scan = enabled;
    }

    pub fn macro_scan(&self) -> bool {
        self.macro_scan
    }

    /// Top-level symbols in parse order.
    pub fn get_symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Directives registered under the keyword `name`, in parse order.
    pub fn get_directives(&self, name: &str) -> &[Directive] {
        self.directives.by_name(name)
    }

    /// Directives attached to the symbol named `ident`.
    pub fn symbol_directives(&self, ident: &str) -> &[Directive] {
        self.directives.by_symbol(ident)
    }

    pub fn directives(&self) -> &DirectiveIndex {
        &self.directives
    }

    pub fn ty(&self, id: TypeId) -> &Type {
        self.scan.arena.get(id)
    }

    pub fn types(&self) -> &TypeArena {
        &self.scan.arena
    }

    pub fn macros(&self) -> &MacroTable {
        &self.scan.macros
    }

    pub fn filenames(&self) -> &[PathBuf] {
        &self.filenames
    }

    pub fn current_filename(&self) -> Option<&Path> {
        self.current_filename.as_deref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Stop accepting input. Results stay readable.
    pub fn finalize(&mut self) {
        self.state = SessionState::Finalized;
    }
}

fn read_source(path: &Path) -> Result<String, ScanError> {
    let bytes = std::fs::read(path).map_err(|e| ScanError::io(path, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
