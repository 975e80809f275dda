//! Fuzzy candidate scoring for manual verification.
//!
//! Stores that cannot rank candidates themselves use [`rank_candidates`] to
//! turn summary rows into scored [`MatchCandidate`]s. The score blends
//! Jaro-Winkler similarity of the family name with an exact date-of-birth
//! match.

use chrono::NaiveDate;

use super::certificate::{CertificateSummary, MatchCandidate};

const NAME_WEIGHT: f64 = 0.75;
const DOB_WEIGHT: f64 = 0.25;

/// Thresholds applied when ranking candidates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchingPolicy {
    /// Candidates scoring below this are discarded.
    pub min_score: f64,
}

impl MatchingPolicy {
    /// Sits above the surname weight, so a candidate whose date of birth
    /// differs never qualifies however closely the name matches.
    pub const DEFAULT_MIN_SCORE: f64 = 0.8;
}

impl Default for MatchingPolicy {
    fn default() -> Self {
        Self {
            min_score: Self::DEFAULT_MIN_SCORE,
        }
    }
}

fn normalise_name(name: &str) -> String {
    name.chars()
        .filter(|ch| ch.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Jaro-Winkler similarity of two names, ignoring case, spacing and
/// punctuation.
///
/// # Examples
/// ```
/// use certverify::domain::name_similarity;
///
/// assert_eq!(name_similarity("Sharma", "SHARMA"), 1.0);
/// assert!(name_similarity("Gurung", "Gurang") > 0.9);
/// assert!(name_similarity("Sharma", "Gurung") < 0.6);
/// ```
#[must_use]
pub fn name_similarity(left: &str, right: &str) -> f64 {
    strsim::jaro_winkler(&normalise_name(left), &normalise_name(right))
}

/// Score one summary against the query's name and date of birth.
#[must_use]
pub fn score_summary(summary: &CertificateSummary, last_name: &str, date_of_birth: NaiveDate) -> f64 {
    let name = name_similarity(&summary.family_name, last_name);
    let dob = if summary.date_of_birth == Some(date_of_birth) {
        1.0
    } else {
        0.0
    };
    (NAME_WEIGHT * name + DOB_WEIGHT * dob).clamp(0.0, 1.0)
}

/// Score, filter and order summaries.
///
/// Output is ordered by descending score. Equal scores put the most
/// recently registered record first, then fall back to certificate number
/// so the order is deterministic.
pub fn rank_candidates<I>(
    summaries: I,
    last_name: &str,
    date_of_birth: NaiveDate,
    policy: &MatchingPolicy,
) -> Vec<MatchCandidate>
where
    I: IntoIterator<Item = CertificateSummary>,
{
    let mut candidates: Vec<MatchCandidate> = summaries
        .into_iter()
        .map(|summary| {
            let score = score_summary(&summary, last_name, date_of_birth);
            MatchCandidate { summary, score }
        })
        .filter(|candidate| candidate.score >= policy.min_score)
        .collect();
    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.summary.registration_date.cmp(&a.summary.registration_date))
            .then_with(|| a.summary.certificate_number.cmp(&b.summary.certificate_number))
    });
    candidates
}

/// First candidate carrying the highest score.
///
/// Stores are not required to return ordered results, so this scans the
/// whole list; on ties the earliest entry wins.
#[must_use]
pub fn top_candidate(candidates: &[MatchCandidate]) -> Option<&MatchCandidate> {
    candidates.iter().fold(None, |best, candidate| match best {
        Some(current) if current.score >= candidate.score => Some(current),
        _ => Some(candidate),
    })
}
