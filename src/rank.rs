use crate::model::SearchMatch;

/// Matches at or above this similarity are presented as confident hits.
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.87;

/// Outcome of bucketing a finalized match list. An empty input is a
/// distinguished "no matches" signal, not a pair of empty groups.
#[derive(Clone, Debug)]
pub enum RankedMatches {
    Empty,
    Grouped {
        high: Vec<SearchMatch>,
        low: Vec<SearchMatch>,
    },
}

/// Partition an already-sorted match list by the confidence threshold.
/// Order within each group is inherited from the input; nothing is re-sorted.
pub fn partition_by_confidence(matches: Vec<SearchMatch>) -> RankedMatches {
    if matches.is_empty() {
        return RankedMatches::Empty;
    }
    let (high, low) = matches
        .into_iter()
        .partition(|m| m.similarity >= HIGH_CONFIDENCE_THRESHOLD);
    RankedMatches::Grouped { high, low }
}
