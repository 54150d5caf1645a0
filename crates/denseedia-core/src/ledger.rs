//! # Version Ledger
//!
//! Append-only history of one element's values.
//!
//! Invariant: a non-empty ledger has exactly one version flagged
//! `current`, and it is the most recently appended one. Every function
//! here runs inside the caller's write transaction, so readers never see
//! the moment between clearing the old flag and setting the new one.

use crate::primitives::MAX_PAYLOAD_LENGTH;
use crate::storage::{TableRead, TableWrite};
use crate::types::{DenseError, ElementId, ObjectKind, Timestamp, Version, VersionId};
use crate::value::{Value, ValueKind};

/// A value already serialized for storage.
///
/// Encoding is the only value-level step of an append that can fail, so
/// callers encode first and only then start mutating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    kind: ValueKind,
    payload: String,
}

impl Entry {
    /// Serialize `value` into its canonical JSON text.
    pub fn encode(value: &Value) -> Result<Self, DenseError> {
        let json = value.to_payload()?;
        let payload =
            serde_json::to_string(&json).map_err(|e| DenseError::SerializationError(e.to_string()))?;
        if payload.len() > MAX_PAYLOAD_LENGTH {
            return Err(DenseError::InvalidInput(format!(
                "value too large ({} bytes, max {})",
                payload.len(),
                MAX_PAYLOAD_LENGTH
            )));
        }
        Ok(Self {
            kind: value.kind(),
            payload,
        })
    }

    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }
}

/// Append `value` to the ledger of `element` and make it current.
pub fn append<T: TableWrite + ?Sized>(
    tables: &mut T,
    element: ElementId,
    value: &Value,
) -> Result<Version, DenseError> {
    let entry = Entry::encode(value)?;
    append_entry(tables, element, entry)
}

/// Append a pre-encoded entry. See [`append`].
pub fn append_entry<T: TableWrite + ?Sized>(
    tables: &mut T,
    element: ElementId,
    entry: Entry,
) -> Result<Version, DenseError> {
    let previous = current(tables, element)?;
    let id = VersionId(tables.allocate_id(ObjectKind::Version)?);

    if let Some(mut previous) = previous {
        previous.current = false;
        tables.put_version(&previous)?;
    }

    let version = Version {
        id,
        element,
        kind: entry.kind,
        payload: entry.payload,
        created_at: Timestamp::now(),
        current: true,
    };
    tables.put_version(&version)?;

    tracing::debug!(element = %element, version = %id, kind = %version.kind, "appended version");
    Ok(version)
}

/// The current version of `element`, if its ledger is non-empty.
///
/// Two or more current versions mean the store is corrupted; that is
/// reported instead of silently picking one.
pub fn current<T: TableRead + ?Sized>(
    tables: &T,
    element: ElementId,
) -> Result<Option<Version>, DenseError> {
    let mut flagged = tables
        .versions_of(element)?
        .into_iter()
        .filter(|v| v.current);
    let first = flagged.next();
    if flagged.next().is_some() {
        return Err(DenseError::CorruptedStore(format!(
            "element {} has more than one current version",
            element
        )));
    }
    Ok(first)
}

/// Full history of `element`, oldest first.
pub fn history<T: TableRead + ?Sized>(
    tables: &T,
    element: ElementId,
) -> Result<Vec<Version>, DenseError> {
    tables.versions_of(element)
}

/// Reject a kind change unless explicitly allowed.
///
/// An empty ledger (`current == None`) accepts any kind.
pub fn check_kind(
    current: Option<ValueKind>,
    incoming: ValueKind,
    allow_type_change: bool,
) -> Result<(), DenseError> {
    match current {
        Some(old) if old != incoming && !allow_type_change => Err(DenseError::ValueTypeChange {
            old,
            new: incoming,
        }),
        _ => Ok(()),
    }
}

/// Delete one version.
///
/// When the removed version was current, the newest remaining one is
/// promoted so the ledger keeps exactly one current version. Removing
/// the last version leaves an empty ledger.
pub fn remove<T: TableWrite + ?Sized>(tables: &mut T, version: &Version) -> Result<(), DenseError> {
    tables.remove_version(version)?;
    if !version.current {
        return Ok(());
    }
    if let Some(mut newest) = tables.versions_of(version.element)?.pop() {
        newest.current = true;
        tables.put_version(&newest)?;
        tracing::debug!(element = %version.element, version = %newest.id, "promoted version");
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
