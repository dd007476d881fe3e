//! Parameters of the shipping-priority report.

use time::macros::date;
use time::Date;

use crate::types::{parse_date, Result};

/// Market segment selected when no override is given.
pub const DEFAULT_SEGMENT: &str = "BUILDING";

/// Cutoff date used when no override is given.
pub const DEFAULT_CUTOFF: Date = date!(1995 - 03 - 15);

/// The two knobs of the report.
///
/// `segment` is matched against `c_mktsegment` by exact equality. `cutoff`
/// bounds both date filters: an order qualifies when it was placed strictly
/// before the cutoff, a line item when it ships strictly after it. A
/// shipment on the cutoff day itself is excluded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryParams {
    /// Market segment customers must belong to.
    pub segment: String,
    /// Date separating not-yet-shipped orders from shipped ones.
    pub cutoff: Date,
}

impl Default for QueryParams {
    fn default() -> Self {
        QueryParams {
            segment: DEFAULT_SEGMENT.to_owned(),
            cutoff: DEFAULT_CUTOFF,
        }
    }
}

impl QueryParams {
    /// Builds parameters from explicit values.
    pub fn new(segment: impl Into<String>, cutoff: Date) -> Self {
        QueryParams {
            segment: segment.into(),
            cutoff,
        }
    }

    /// Builds parameters from the CLI-facing `YYYY-MM-DD` cutoff form.
    pub fn parse(segment: impl Into<String>, cutoff: &str) -> Result<Self> {
        Ok(QueryParams {
            segment: segment.into(),
            cutoff: parse_date("cutoff parameter", cutoff)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_report() {
        let params = QueryParams::default();
        assert_eq!(params.segment, "BUILDING");
        assert_eq!(params.cutoff, date!(1995 - 03 - 15));
    }

    #[test]
    fn parse_accepts_calendar_cutoffs() -> Result<()> {
        let params = QueryParams::parse("MACHINERY", "1994-06-30")?;
        assert_eq!(params.segment, "MACHINERY");
        assert_eq!(params.cutoff, date!(1994 - 06 - 30));
        Ok(())
    }

    #[test]
    fn parse_rejects_malformed_cutoffs() {
        let err = QueryParams::parse("BUILDING", "1995/03/15").unwrap_err();
        assert_eq!(err.code(), "ParseDate");
    }
}
