//! Error types for the conversion engine.
//!
//! This module defines a unified error enumeration used across object parsing,
//! configuration loading, path mapping, content processing, and ref writing. It
//! integrates with `thiserror` to provide rich `Display` implementations and
//! error source chaining where applicable.
//!
//! Variants are grouped into two families: object-model errors (carried over
//! from the underlying Git plumbing) are always fatal the moment they occur,
//! while the conversion-specific variants follow the fatal/non-fatal taxonomy
//! the engine's diagnostics sink distinguishes between.

use thiserror::Error;

#[derive(Error, Debug)]
/// Unified error enumeration for the conversion engine.
///
/// Implements `std::error::Error` via `thiserror`. Non-fatal variants
/// (`MappingWarning`, `ContentWarning`) are collected by the engine's
/// `Diagnostics` sink rather than propagated with `?`.
pub enum GitError {
    /// Invalid or unsupported git object type name.
    #[error("The `{0}` is not a valid git object type.")]
    InvalidObjectType(String),

    /// Malformed or unsupported blob object encoding.
    #[error("The `{0}` is not a valid git blob object.")]
    InvalidBlobObject(String),

    /// Malformed tree object.
    #[error("Not a valid git tree object.")]
    InvalidTreeObject,

    /// Invalid tree entry (mode/name/hash).
    #[error("The `{0}` is not a valid git tree item.")]
    InvalidTreeItem(String),

    /// Tree contains no entries.
    #[error("`{0}`.")]
    EmptyTreeItems(String),

    /// Invalid commit signature type.
    #[error("The `{0}` is not a valid git commit signature.")]
    InvalidSignatureType(String),

    /// Malformed commit object.
    #[error("Not a valid git commit object.")]
    InvalidCommitObject,

    /// Commit parse or validation failed.
    #[error("Invalid Commit: {0}")]
    InvalidCommit(String),

    /// Malformed tag object.
    #[error("Not a valid git tag object: {0}")]
    InvalidTagObject(String),

    /// Invalid CLI or function argument.
    #[error("Argument parse failed: {0}")]
    InvalidArgument(String),

    /// I/O error from underlying reader or writer.
    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),

    /// Invalid SHA1/SHA256 hash formatting or value.
    #[error("The {0} is not a valid Hash value ")]
    InvalidHashValue(String),

    /// Invalid decoded object info.
    #[error("Error decode in the Object ,info:{0}")]
    InvalidObjectInfo(String),

    /// Failed to encode object to bytes.
    #[error("Can't encode the object which id [{0}] to bytes")]
    EncodeObjectError(String),

    /// Text encoding or UTF-8 conversion error.
    #[error("UTF-8 conversion error: {0}")]
    ConversionError(String),

    /// Invalid path when locating parent tree.
    #[error("Can't find parent tree by path: {0}")]
    InvalidPathError(String),

    /// Object missing from caches or storage.
    #[error("Can't find specific object: {0}")]
    ObjectNotFound(String),

    /// Generic custom error for miscellaneous failures.
    #[error("{0}")]
    CustomError(String),

    // --- Conversion-specific taxonomy ---
    /// Fatal, pre-run: malformed XML, unknown element, circular variable
    /// reference, bad regex, ref-name syntax violation, conflicting
    /// `ExplicitOnly`/`NeedsProjects`.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Non-fatal, logged: directory unmapped; ref-name collision resolved by
    /// suffix; `<SkipCommit>` matched a labeled revision (ignored).
    #[error("mapping warning: {0}")]
    MappingWarning(String),

    /// Non-fatal, logged: lone CR, missing final EOL (only when formatting
    /// is engaged for the file).
    #[error("content warning: {0}")]
    ContentWarning(String),

    /// Fatal: the upstream revision stream is ill-formed.
    #[error("revision parser error: {0}")]
    ParserError(String),

    /// Fatal, after retry budget: the hash worker failed to produce an
    /// object id for submitted bytes.
    #[error("hasher error: {0}")]
    HasherError(String),

    /// Fatal: failure to write a ref or object to the target repository.
    #[error("git write error: {0}")]
    GitWriteError(String),
}
