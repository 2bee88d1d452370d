//! Evidence decay classifier.
//!
//! Pure function of an evidence item and an as-of date. Nothing here reads the
//! clock, which is what keeps health scores and fixtures reproducible.

use crate::core::model::{DecayState, DecaySummary, EvidenceItem};
use chrono::NaiveDate;

pub const FRESH_DAYS: i64 = 30;
pub const AGING_DAYS: i64 = 90;
pub const STALE_DAYS: i64 = 180;

pub fn classify(evidence: &EvidenceItem, as_of: NaiveDate) -> DecayState {
    classify_dates(evidence.asserted_at, evidence.expires_at, as_of)
}

pub fn classify_dates(
    asserted_at: Option<NaiveDate>,
    expires_at: Option<NaiveDate>,
    as_of: NaiveDate,
) -> DecayState {
    if let Some(expires) = expires_at {
        if as_of >= expires {
            return DecayState::Expired;
        }
    }
    let Some(asserted) = asserted_at else {
        return DecayState::Unknown;
    };
    // Evidence asserted after the as-of date counts as age 0.
    let age_days = (as_of - asserted).num_days().max(0);
    if age_days <= FRESH_DAYS {
        DecayState::Fresh
    } else if age_days <= AGING_DAYS {
        DecayState::Aging
    } else if age_days <= STALE_DAYS {
        DecayState::Stale
    } else {
        DecayState::Expired
    }
}

/// Classify every item, in workspace order.
pub fn classify_all<'a>(
    evidence: &'a [EvidenceItem],
    as_of: NaiveDate,
) -> Vec<(&'a EvidenceItem, DecayState)> {
    evidence.iter().map(|e| (e, classify(e, as_of))).collect()
}

pub fn summarize(evidence: &[EvidenceItem], as_of: NaiveDate) -> DecaySummary {
    let mut summary = DecaySummary::default();
    for item in evidence {
        summary.record(classify(item, as_of));
    }
    summary
}
