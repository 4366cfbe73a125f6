// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! SQL text derived for each collection table.

use stowage_tier::Error;

// PostgreSQL truncates longer identifiers.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Checks that `name` can be spliced into SQL as an unquoted identifier.
pub(crate) fn validate_identifier(what: &str, name: &str) -> Result<(), Error> {
    let mut chars = name.chars();
    let starts_well = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !starts_well || !rest_ok {
        return Err(Error::usage(format!(
            "{what} {name:?} is not a valid SQL identifier: use ASCII letters, digits and underscores, not starting with a digit"
        )));
    }

    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(Error::usage(format!(
            "{what} {name:?} is longer than {MAX_IDENTIFIER_LEN} bytes"
        )));
    }

    Ok(())
}

/// The statements used for one collection table.
///
/// Age predicates take the TTL in seconds as a `float8` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Statements {
    pub(crate) create_table: String,
    pub(crate) delete_expired: String,
    pub(crate) upsert: String,
    pub(crate) select_live: String,
    pub(crate) delete_by_key: String,
}

impl Statements {
    /// Both identifiers must have passed [`validate_identifier`].
    pub(crate) fn new(schema: &str, table: &str) -> Self {
        let qualified = format!("{schema}.{table}");

        Self {
            create_table: format!(
                "CREATE UNLOGGED TABLE IF NOT EXISTS {qualified} (
                    id BIGSERIAL PRIMARY KEY,
                    key TEXT NOT NULL UNIQUE,
                    value BYTEA NOT NULL,
                    added_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );
                CREATE INDEX IF NOT EXISTS {table}__added_at ON {qualified} (added_at);"
            ),
            delete_expired: format!("DELETE FROM {qualified} WHERE added_at < NOW() - make_interval(secs => $1)"),
            upsert: format!(
                "INSERT INTO {qualified} (key, value, added_at)
                VALUES ($1, $2, NOW())
                ON CONFLICT (key) DO UPDATE
                    SET value = EXCLUDED.value,
                        added_at = NOW()"
            ),
            select_live: format!(
                "SELECT value FROM {qualified} WHERE key = $1 AND added_at > NOW() - make_interval(secs => $2) LIMIT 1"
            ),
            delete_by_key: format!("DELETE FROM {qualified} WHERE key = $1"),
        }
    }
}
