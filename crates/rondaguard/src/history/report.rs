//! Aggregate statistics over a set of rounds.

use serde::Serialize;

use crate::model::RoundLog;

/// Number of entries kept in the ranked lists.
const TOP_N: usize = 5;

/// A named count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    /// Sector or responsible party.
    pub name: String,
    /// Number of rounds counted.
    pub count: usize,
}

/// Dashboard figures for a set of rounds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Rounds considered.
    pub total_rounds: usize,
    /// Rounds flagged with issues.
    pub rounds_with_issues: usize,
    /// Mean duration, rounded to the nearest second. Zero when empty.
    pub average_duration_seconds: u64,
    /// Rounds per sector, in order of first appearance.
    pub rounds_by_sector: Vec<Tally>,
    /// Responsible parties with the most rounds.
    pub top_responsibles: Vec<Tally>,
    /// Sectors with the most rounds flagged with issues.
    pub top_issue_sectors: Vec<Tally>,
}

impl Summary {
    /// Compute the summary for `rounds`.
    #[must_use]
    pub fn from_rounds(rounds: &[RoundLog]) -> Self {
        let total_rounds = rounds.len();
        let rounds_with_issues = rounds.iter().filter(|r| r.issues_detected).count();

        let total_seconds: u64 = rounds.iter().map(|r| r.duration_seconds).sum();
        let average_duration_seconds = match u64::try_from(total_rounds) {
            Ok(0) | Err(_) => 0,
            Ok(n) => (total_seconds + n / 2) / n,
        };

        let rounds_by_sector = tally(rounds.iter().map(|r| r.sector.as_str()));
        let top_responsibles = top(tally(rounds.iter().map(|r| r.responsible.as_str())));
        let top_issue_sectors = top(tally(
            rounds
                .iter()
                .filter(|r| r.issues_detected)
                .map(|r| r.sector.as_str()),
        ));

        Self {
            total_rounds,
            rounds_with_issues,
            average_duration_seconds,
            rounds_by_sector,
            top_responsibles,
            top_issue_sectors,
        }
    }
}

fn tally<'a>(names: impl Iterator<Item = &'a str>) -> Vec<Tally> {
    let mut tallies: Vec<Tally> = Vec::new();
    for name in names {
        match tallies.iter_mut().find(|t| t.name == name) {
            Some(t) => t.count += 1,
            None => tallies.push(Tally {
                name: name.to_string(),
                count: 1,
            }),
        }
    }
    tallies
}

/// Highest counts first; ties keep first-appearance order.
fn top(mut tallies: Vec<Tally>) -> Vec<Tally> {
    tallies.sort_by(|a, b| b.count.cmp(&a.count));
    tallies.truncate(TOP_N);
    tallies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Task;

    fn round(sector: &str, responsible: &str, seconds: i64, issues: bool) -> RoundLog {
        let task = Task::new(sector, "Round", responsible);
        let mut round = RoundLog::for_task(&task, 0, seconds * 1_000);
        round.issues_detected = issues;
        round
    }

    fn names(tallies: &[Tally]) -> Vec<&str> {
        tallies.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(Summary::from_rounds(&[]), Summary::default());
    }

    #[test]
    fn test_counts_and_average() {
        let rounds = vec![
            round("A", "João", 10, false),
            round("B", "Maria", 15, true),
            round("A", "João", 20, true),
        ];
        let summary = Summary::from_rounds(&rounds);

        assert_eq!(summary.total_rounds, 3);
        assert_eq!(summary.rounds_with_issues, 2);
        assert_eq!(summary.average_duration_seconds, 15);
        assert_eq!(names(&summary.rounds_by_sector), vec!["A", "B"]);
        assert_eq!(summary.rounds_by_sector[0].count, 2);
        assert_eq!(names(&summary.top_responsibles), vec!["João", "Maria"]);
        assert_eq!(names(&summary.top_issue_sectors), vec!["A", "B"]);
    }

    #[test]
    fn test_average_rounds_half_up() {
        let rounds = vec![round("A", "x", 1, false), round("A", "x", 2, false)];
        assert_eq!(Summary::from_rounds(&rounds).average_duration_seconds, 2);
    }

    #[test]
    fn test_top_lists_keep_five_with_stable_ties() {
        let rounds: Vec<RoundLog> = ["p1", "p2", "p3", "p4", "p5", "p6", "p6"]
            .iter()
            .map(|p| round("S", p, 1, false))
            .collect();
        let summary = Summary::from_rounds(&rounds);
        assert_eq!(
            names(&summary.top_responsibles),
            vec!["p6", "p1", "p2", "p3", "p4"]
        );
    }

    #[test]
    fn test_sectors_without_issues_are_not_ranked() {
        let rounds = vec![round("Clean", "x", 1, false), round("Dirty", "x", 1, true)];
        let summary = Summary::from_rounds(&rounds);
        assert_eq!(names(&summary.top_issue_sectors), vec!["Dirty"]);
    }
}
