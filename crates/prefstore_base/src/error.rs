use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Error variants that can occur in prefstore operations.
/// Each variant represents a specific error category with its associated context.
#[derive(Debug)]
pub enum ErrorKind {
    /// File system operation failed
    FileError { path: PathBuf, source: io::Error },

    /// A flush could not persist the mapping to the backing file.
    /// A missing `source` means parent-directory creation failed.
    BackingStore {
        path: PathBuf,
        source: Option<io::Error>,
    },

    /// Properties text could not be parsed
    Syntax { line: usize, message: String },

    /// Operation is not available on a leaf node
    Unsupported { operation: &'static str },

    /// Catch-all for other errors with a message
    Message { message: String },
}

/// Error type wrapping ErrorKind with optional context.
/// Error implements the standard Error trait and supports context attachment.
///
/// The two-layer design separates concerns: ErrorKind carries structural
/// variants with specific contexts (paths, line numbers), while Error adds
/// runtime context strings accumulated during propagation.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    context: Vec<String>,
}

impl Error {
    /// Creates a new error from an ErrorKind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: vec![],
        }
    }

    /// Creates a message-only error.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Message {
            message: message.into(),
        })
    }

    /// Creates an unsupported-operation error.
    pub fn unsupported(operation: &'static str) -> Self {
        Self::new(ErrorKind::Unsupported { operation })
    }

    /// Attaches context to an error.
    /// Context is displayed before the error message.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Attaches context using lazy evaluation.
    /// Useful to avoid expensive string construction for successful paths.
    pub fn with_context<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self.context.push(f());
        self
    }

    /// Returns a reference to the underlying ErrorKind.
    /// Allows pattern matching on specific error variants.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the innermost error in the chain.
    /// Traverses the error source chain to find the root cause.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::FileError { source, .. } => Some(source),
            ErrorKind::BackingStore { source, .. } => {
                source.as_ref().map(|e| e as &(dyn StdError + 'static))
            }
            ErrorKind::Syntax { .. } => None,
            ErrorKind::Unsupported { .. } => None,
            ErrorKind::Message { .. } => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Display context first if present
        for (i, ctx) in self.context.iter().enumerate() {
            if i == 0 {
                write!(f, "{}", ctx)?;
            } else {
                write!(f, ": {}", ctx)?;
            }
        }

        // Add a separator if we have context
        if !self.context.is_empty() {
            write!(f, ": ")?;
        }

        // Display the underlying error kind
        match &self.kind {
            ErrorKind::FileError { path, source } => {
                write!(f, "File error at {}: {}", path.display(), source)
            }
            ErrorKind::BackingStore {
                path,
                source: Some(source),
            } => {
                write!(f, "Backing store failure for {}: {}", path.display(), source)
            }
            ErrorKind::BackingStore { path, source: None } => {
                write!(f, "Could not create parent directories for: {}", path.display())
            }
            ErrorKind::Syntax { line, message } => {
                write!(f, "Syntax error on line {}: {}", line, message)
            }
            ErrorKind::Unsupported { operation } => {
                write!(f, "Operation not supported on a leaf node: {}", operation)
            }
            ErrorKind::Message { message } => {
                write!(f, "{}", message)
            }
        }
    }
}

/// Standard result type for prefstore operations.
///
/// Boxing the error keeps the Ok path small, making results cheap to return
/// in the common case.
pub type Result<T> = std::result::Result<T, Box<Error>>;

/// Aliases used when referring to these types from other crates.
pub type PrefsError = Error;
pub type PrefsResult<T> = Result<T>;

/// Creates a boxed message error from format arguments.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        Box::new($crate::error::Error::message(format!($($arg)*)))
    };
}

/// Extension trait for attaching context to Results.
/// Provides ergonomic error context attachment during error propagation.
pub trait ResultExt<T> {
    /// Attaches context to an error, consuming and re-wrapping it.
    /// Eager evaluation: context is evaluated immediately.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Attaches context using lazy evaluation.
    /// Context is only evaluated if the result is an error.
    /// Prefer this to avoid expensive string formatting in the success path.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|err| Box::new(err.context(context)))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| Box::new(err.with_context(f)))
    }
}
