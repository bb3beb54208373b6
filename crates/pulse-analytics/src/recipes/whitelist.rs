//! Query whitelist — the closed set of (table, field) pairs recipes may touch.
//!
//! This is the only gate between tenant-authored (or LLM-generated) recipe
//! configs and the data store. Downstream chart/chat layers re-validate
//! independently; this whitelist is not enforced transitively for them.

use pulse_core::constants::{TABLE_ACTIVITIES, TABLE_DEALS, TABLE_LEADS, TABLE_USERS};
use pulse_core::RecipeError;

/// Allowed fields per queryable CRM table.
pub const QUERYABLE_TABLES: &[(&str, &[&str])] = &[
    (
        TABLE_DEALS,
        &[
            "id",
            "title",
            "stage",
            "value",
            "currency",
            "won",
            "closed",
            "close_date",
            "expected_close_date",
            "probability",
            "lead_source",
            "assigned_by_id",
            "contact_id",
            "company_id",
            "created_at",
            "modified_at",
        ],
    ),
    (
        TABLE_LEADS,
        &[
            "id",
            "title",
            "status",
            "source",
            "value",
            "converted",
            "assigned_by_id",
            "created_at",
            "modified_at",
        ],
    ),
    (
        TABLE_ACTIVITIES,
        &[
            "id",
            "kind",
            "subject",
            "completed",
            "due_date",
            "deal_id",
            "lead_id",
            "assigned_by_id",
            "created_at",
            "modified_at",
        ],
    ),
    (
        TABLE_USERS,
        &["id", "name", "email", "active", "created_at", "modified_at"],
    ),
];

/// All queryable table names.
pub fn allowed_tables() -> Vec<&'static str> {
    QUERYABLE_TABLES.iter().map(|(table, _)| *table).collect()
}

fn fields_for(table: &str) -> Option<&'static [&'static str]> {
    QUERYABLE_TABLES
        .iter()
        .find(|(t, _)| *t == table)
        .map(|(_, fields)| *fields)
}

/// Reject a table outside the whitelist.
pub fn check_table(table: &str) -> Result<(), RecipeError> {
    if fields_for(table).is_some() {
        Ok(())
    } else {
        Err(RecipeError::TableNotAllowed {
            table: table.to_string(),
        })
    }
}

/// Reject a (table, field) pair outside the whitelist.
pub fn check_field(table: &str, field: &str) -> Result<(), RecipeError> {
    let fields = fields_for(table).ok_or_else(|| RecipeError::TableNotAllowed {
        table: table.to_string(),
    })?;
    if fields.contains(&field) {
        Ok(())
    } else {
        Err(RecipeError::FieldNotAllowed {
            table: table.to_string(),
            field: field.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_pairs_pass() {
        assert!(check_field("crm_deals", "value").is_ok());
        assert!(check_field("crm_activities", "assigned_by_id").is_ok());
    }

    #[test]
    fn unknown_table_and_field_fail() {
        assert!(check_table("crm_invoices").is_err());
        assert!(check_field("crm_deals", "password").is_err());
    }
}
