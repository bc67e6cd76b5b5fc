// AudSleuth - core/projection.rs
//
// Column exclusion. The same projection is applied to the header row and
// to every data row so labels stay aligned with values.

use crate::core::model::{FieldId, Row};
use crate::util::error::ProjectionError;
use std::collections::BTreeSet;

/// Set of fields to omit from output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionSpec {
    excluded: BTreeSet<FieldId>,
}

impl ProjectionSpec {
    /// Exclude nothing.
    pub fn keep_all() -> Self {
        Self {
            excluded: BTreeSet::new(),
        }
    }

    /// Exclude exactly `fields`.
    pub fn excluding<I: IntoIterator<Item = FieldId>>(fields: I) -> Self {
        Self {
            excluded: fields.into_iter().collect(),
        }
    }

    /// Parse field keys (`eventid`, `termcut`, ...). Fails on the first
    /// unknown key so bad input is rejected before any file is read.
    pub fn from_keys<S: AsRef<str>>(keys: &[S]) -> Result<Self, ProjectionError> {
        let fields = keys
            .iter()
            .map(|k| k.as_ref().parse::<FieldId>())
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self { excluded: fields })
    }

    pub fn excluded(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.excluded.iter().copied()
    }

    pub fn is_excluded(&self, field: FieldId) -> bool {
        self.excluded.contains(&field)
    }

    /// Canonical fields that survive projection, in output order.
    pub fn retained(&self) -> Vec<FieldId> {
        FieldId::ALL
            .into_iter()
            .filter(|f| !self.is_excluded(*f))
            .collect()
    }

    /// Remove every excluded column from `row`.
    ///
    /// Positions are resolved against the row's own columns and removed
    /// from highest to lowest, so earlier removals never shift a later
    /// target. Columns already gone are skipped, which makes the operation
    /// idempotent.
    pub fn project(&self, mut row: Row) -> Row {
        let mut positions: Vec<usize> = row
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, field)| self.is_excluded(**field))
            .map(|(idx, _)| idx)
            .collect();
        positions.sort_unstable_by(|a, b| b.cmp(a));
        for idx in positions {
            row.remove_at(idx);
        }
        row
    }
}

impl Default for ProjectionSpec {
    /// Drops the technical identifiers and keeps the human-relevant columns.
    fn default() -> Self {
        Self::excluding(FieldId::DEFAULT_EXCLUDED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Record;

    fn full_row() -> Row {
        Row::from(Record::from_fields(
            FieldId::ALL.iter().map(|f| (*f, format!("v-{}", f.key()))),
        ))
    }

    #[test]
    fn test_empty_exclusion_is_identity() {
        let row = full_row();
        assert_eq!(ProjectionSpec::keep_all().project(row.clone()), row);
    }

    #[test]
    fn test_default_projection_keeps_nine_columns() {
        let projected = ProjectionSpec::default().project(full_row());
        assert_eq!(projected.len(), 9);
        assert_eq!(
            projected.columns(),
            &[
                FieldId::Date,
                FieldId::Time,
                FieldId::Client,
                FieldId::Login,
                FieldId::RemoteHost,
                FieldId::TransactionCode,
                FieldId::Report,
                FieldId::ConnectionType,
                FieldId::Parameters,
            ]
        );
        assert_eq!(projected.values()[3], "v-login");
    }

    #[test]
    fn test_projection_is_idempotent() {
        let spec = ProjectionSpec::from_keys(&["date", "login", "sessionid"]).unwrap();
        let once = spec.project(full_row());
        let twice = spec.project(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.len(), 12);
    }

    #[test]
    fn test_exclusion_order_does_not_matter() {
        let a = ProjectionSpec::from_keys(&["time", "report", "client"]).unwrap();
        let b = ProjectionSpec::from_keys(&["client", "time", "report"]).unwrap();
        assert_eq!(a.project(full_row()), b.project(full_row()));
        let values = a.project(full_row());
        assert!(!values.values().iter().any(|v| v == "v-client" || v == "v-report"));
        assert_eq!(values.values()[0], "v-date");
        assert_eq!(values.values()[1], "v-login");
    }

    #[test]
    fn test_header_and_data_stay_aligned() {
        let spec = ProjectionSpec::from_keys(&["terminal", "param"]).unwrap();
        let header = spec.project(Row::header());
        let data = spec.project(full_row());
        assert_eq!(header.columns(), data.columns());
        assert!(!header.values().contains(&"Terminal".to_string()));
        assert!(header.values().contains(&"termcut".to_string()));
    }

    #[test]
    fn test_unknown_key_fails_fast() {
        let err = ProjectionSpec::from_keys(&["date", "severity"]).unwrap_err();
        assert!(matches!(err, ProjectionError::UnknownField { ref name } if name == "severity"));
    }

    #[test]
    fn test_retained_follows_canonical_order() {
        let spec = ProjectionSpec::excluding([FieldId::Date, FieldId::SessionId]);
        let retained = spec.retained();
        assert_eq!(retained.len(), 13);
        assert_eq!(retained[0], FieldId::Time);
    }
}
