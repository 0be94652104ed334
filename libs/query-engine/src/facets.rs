//! Facet engine (C6, spec §4.6). Given a base predicate (scope/time/filter,
//! built by the caller the same way C5 builds its query) and a list of
//! `(field, perFieldLimit)` requests, composes one `GROUP BY`/`COUNT`
//! statement per field over the column each field maps to.

use crate::filter::schema::{allow_list_for, sibling_fields, RecordType};
use telemetry_common::error::AppError;

pub const DEFAULT_FACET_LIMIT: u32 = 20;
pub const MIN_FACET_LIMIT: u32 = 1;
pub const MAX_FACET_LIMIT: u32 = 100;

/// Clamp a caller-supplied per-field limit into `[1, 100]`, defaulting to
/// 20 when absent (spec §4.6).
pub fn clamp_limit(requested: Option<u32>) -> u32 {
    requested
        .unwrap_or(DEFAULT_FACET_LIMIT)
        .clamp(MIN_FACET_LIMIT, MAX_FACET_LIMIT)
}

/// One fully-formed facet query, ready to run against `<where_fragment>`.
/// The store gateway builds `SELECT <column>, count(*) AS bucket_count
/// FROM <table> WHERE <predicate> GROUP BY <column> ORDER BY bucket_count
/// DESC, <column> ASC LIMIT <limit>` from `column`/`limit`; `table` and
/// `predicate` are spliced in by the gateway, which already knows the
/// scope/time/filter predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetStatement {
    pub field: String,
    pub column: &'static str,
    pub limit: u32,
}

/// Build one `FacetStatement` per requested field, resolving each against
/// the record type's allow-list (spec §4.6 "field → column mapping is
/// published per record type").
pub fn plan_facets(
    record_type: RecordType,
    requests: &[(String, Option<u32>)],
) -> Result<Vec<FacetStatement>, AppError> {
    let allow_list = allow_list_for(record_type);
    requests
        .iter()
        .map(|(field, limit)| {
            let column = allow_list.get(field.as_str()).map(|c| c.name).ok_or_else(|| {
                AppError::InvalidArgument(format!(
                    "unknown facet field {field:?}; available fields: {:?}",
                    sibling_fields(allow_list)
                ))
            })?;
            let limit = clamp_limit(*limit);
            Ok(FacetStatement { field: field.clone(), column, limit })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_field_lists_available_fields() {
        let err = plan_facets(RecordType::Audit, &[("bogus".into(), None)]).unwrap_err();
        assert!(err.to_string().contains("unknown facet field"));
    }

    #[test]
    fn limit_is_clamped_into_range() {
        assert_eq!(clamp_limit(None), 20);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(500)), 100);
        assert_eq!(clamp_limit(Some(5)), 5);
    }

    #[test]
    fn known_field_resolves_to_physical_column() {
        let plans = plan_facets(RecordType::Audit, &[("verb".into(), Some(10))]).unwrap();
        assert_eq!(plans[0].column, "verb");
        assert_eq!(plans[0].limit, 10);
    }
}
