//! Advisory diagnostics and the traversal context threaded through fields.
//!
//! Soft conditions (unknown keys dropped, defaults substituted, values
//! ignored) never fail an operation. They are recorded in a [`Diagnostics`]
//! list owned by the caller, which keeps validation free of global state.
//! The schema orchestrator forwards them to `tracing` when the caller does
//! not ask for them.

use std::fmt;

/// Category of an advisory diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A mapping key has no matching subfield and was dropped.
    UnknownField,
    /// An empty value was replaced by the field's default.
    DefaultApplied,
    /// An optional subfield was absent.
    MissingOptional,
    /// A supplied value was discarded (not a valid choice, extra element, ...).
    ValueIgnored,
    /// A storage triple could not be placed in the schema and was skipped.
    UnresolvedTriple,
    /// Stored metadata belongs to another version of the schema.
    VersionMismatch,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::UnknownField => "unknown-field",
            DiagnosticKind::DefaultApplied => "default-applied",
            DiagnosticKind::MissingOptional => "missing-optional",
            DiagnosticKind::ValueIgnored => "value-ignored",
            DiagnosticKind::UnresolvedTriple => "unresolved-triple",
            DiagnosticKind::VersionMismatch => "version-mismatch",
        }
    }
}

/// One advisory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Qualified path (or storage name) the diagnostic refers to.
    pub field: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind.as_str(), self.field, self.message)
    }
}

/// Ordered collection of diagnostics produced by one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: DiagnosticKind, field: impl Into<String>, message: impl Into<String>) {
        self.records.push(Diagnostic {
            kind,
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.records.iter()
    }

    /// Returns the diagnostics of one kind.
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.records.iter().filter(move |d| d.kind == kind)
    }

    pub fn has(&self, kind: DiagnosticKind) -> bool {
        self.of_kind(kind).next().is_some()
    }

    /// Emits every record at `debug` level.
    pub fn log(&self) {
        for d in &self.records {
            tracing::debug!(kind = d.kind.as_str(), field = %d.field, "{}", d.message);
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// Switches for the validation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Coerce values to their canonical type before checking them.
    pub convert: bool,
    /// Substitute defaults for empty values.
    pub apply_defaults: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            convert: true,
            apply_defaults: true,
        }
    }
}

/// Traversal state handed to every field operation.
///
/// Fields only know their local name. The context carries the namespace of
/// the enclosing field, so qualified paths are derived while descending and
/// renaming a field never has to touch its descendants.
///
/// # Examples
///
/// ```
/// use mdschema_core::{Context, Diagnostics};
///
/// let mut diagnostics = Diagnostics::new();
/// let mut ctx = Context::new(&mut diagnostics);
/// assert_eq!(ctx.qualify("book"), "book");
///
/// let child = ctx.enter("book");
/// assert_eq!(child.qualify("title"), "book.title");
/// ```
#[derive(Debug)]
pub struct Context<'a> {
    namespace: String,
    options: ValidateOptions,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> Context<'a> {
    /// Creates a root context with default options.
    pub fn new(diagnostics: &'a mut Diagnostics) -> Self {
        Self {
            namespace: String::new(),
            options: ValidateOptions::default(),
            diagnostics,
        }
    }

    pub fn with_options(mut self, options: ValidateOptions) -> Self {
        self.options = options;
        self
    }

    /// Places the context under an existing namespace, e.g. `"book.author"`.
    pub fn within(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn options(&self) -> ValidateOptions {
        self.options
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Qualified path of a field named `name` in the current namespace.
    pub fn qualify(&self, name: &str) -> String {
        if self.namespace.is_empty() {
            name.to_string()
        } else if name.is_empty() {
            self.namespace.clone()
        } else {
            format!("{}.{}", self.namespace, name)
        }
    }

    /// Child context for the subfields of the field named `name`.
    pub fn enter(&mut self, name: &str) -> Context<'_> {
        Context {
            namespace: self.qualify(name),
            options: self.options,
            diagnostics: &mut *self.diagnostics,
        }
    }

    pub fn note(&mut self, kind: DiagnosticKind, field: impl Into<String>, message: impl Into<String>) {
        self.diagnostics.push(kind, field, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualify_nested() {
        let mut diagnostics = Diagnostics::new();
        let mut ctx = Context::new(&mut diagnostics);
        let mut book = ctx.enter("book");
        let author = book.enter("author");
        assert_eq!(author.qualify("email"), "book.author.email");
        assert_eq!(author.namespace(), "book.author");
    }

    #[test]
    fn test_notes_reach_caller() {
        let mut diagnostics = Diagnostics::new();
        {
            let mut ctx = Context::new(&mut diagnostics);
            let mut child = ctx.enter("book");
            child.note(DiagnosticKind::UnknownField, "book.isbn", "dropped");
        }
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics.has(DiagnosticKind::UnknownField));
        assert_eq!(
            diagnostics.iter().next().unwrap().to_string(),
            "[unknown-field] book.isbn: dropped"
        );
    }

    #[test]
    fn test_options_default_to_full_pipeline() {
        let options = ValidateOptions::default();
        assert!(options.convert);
        assert!(options.apply_defaults);
    }
}
