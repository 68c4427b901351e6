use crate::record::{Grade, Outcome, Record};
use serde::Serialize;
use std::collections::BTreeMap;

/// Pass/fail counts for one grouping key (a subject or a department)
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    pub key: String,
    pub pass: usize,
    pub fail: usize,
}

impl ResultRow {
    /// Number of records counted under this key
    pub fn total(&self) -> usize {
        self.pass + self.fail
    }

    /// Share of records under this key that passed, from 0.0 to 1.0
    pub fn pass_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            n => self.pass as f64 / n as f64,
        }
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        match outcome {
            Outcome::Pass => self.pass,
            Outcome::Fail => self.fail,
        }
    }
}

/// The (key x result) count matrix, one row per key in ascending order
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ResultTable {
    pub rows: Vec<ResultRow>,
}

/// Mean scores of one subject, kept at full precision
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AverageRow {
    pub subject_code: String,
    pub internal: f64,
    pub external: f64,
    pub total: f64,
}

/// Number of records of one subject that received one grade
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GradeCount {
    pub subject_code: String,
    pub grade: Grade,
    pub count: usize,
}

/// All aggregate tables shown on the dashboard
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub record_count: usize,
    pub subject_results: ResultTable,
    pub department_results: ResultTable,
    pub subject_averages: Vec<AverageRow>,
    pub grade_distribution: Vec<GradeCount>,
}

impl Summary {
    /// Computes every aggregate table from the uploaded records
    pub fn from_records(records: &[Record]) -> Self {
        Self {
            record_count: records.len(),
            subject_results: subject_results(records),
            department_results: department_results(records),
            subject_averages: subject_averages(records),
            grade_distribution: grade_distribution(records),
        }
    }
}

/// Counts passes and failures per subject code
pub fn subject_results(records: &[Record]) -> ResultTable {
    result_table(records, |r| &r.subject_code)
}

/// Counts passes and failures per department
pub fn department_results(records: &[Record]) -> ResultTable {
    result_table(records, |r| &r.department)
}

fn result_table<F>(records: &[Record], key: F) -> ResultTable
where
    F: Fn(&Record) -> &String,
{
    let mut groups: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for record in records {
        let entry = groups.entry(key(record).as_str()).or_default();
        match record.outcome() {
            Outcome::Pass => entry.0 += 1,
            Outcome::Fail => entry.1 += 1,
        }
    }

    ResultTable {
        rows: groups
            .into_iter()
            .map(|(key, (pass, fail))| ResultRow {
                key: key.to_string(),
                pass,
                fail,
            })
            .collect(),
    }
}

/// Averages the internal, external and total scores of each subject
pub fn subject_averages(records: &[Record]) -> Vec<AverageRow> {
    #[derive(Default)]
    struct Sums {
        count: usize,
        internal: f64,
        external: f64,
        total: f64,
    }

    let mut sums: BTreeMap<&str, Sums> = BTreeMap::new();
    for record in records {
        let s = sums.entry(record.subject_code.as_str()).or_default();
        s.count += 1;
        s.internal += record.internal;
        s.external += record.external;
        s.total += record.total;
    }

    sums.into_iter()
        .map(|(subject, s)| {
            let n = s.count as f64;
            AverageRow {
                subject_code: subject.to_string(),
                internal: s.internal / n,
                external: s.external / n,
                total: s.total / n,
            }
        })
        .collect()
}

/// Counts grades per subject
///
/// Every subject gets exactly one row per grade, in grade order, so a
/// grade nobody received still shows up with a count of 0.
pub fn grade_distribution(records: &[Record]) -> Vec<GradeCount> {
    let mut counts: BTreeMap<&str, [usize; 7]> = BTreeMap::new();
    for record in records {
        let row = counts.entry(record.subject_code.as_str()).or_default();
        row[record.grade() as usize] += 1;
    }

    counts
        .into_iter()
        .flat_map(|(subject, row)| {
            Grade::ALL.into_iter().map(move |grade| GradeCount {
                subject_code: subject.to_string(),
                grade,
                count: row[grade as usize],
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> Vec<Record> {
        vec![
            Record::new("CS101", "CSE", 30.0, 60.0, 90.0),
            Record::new("CS101", "CSE", 20.0, 44.0, 64.0),
            Record::new("CS101", "ECE", 25.0, 50.0, 75.0),
            Record::new("MA201", "ECE", 10.0, 30.0, 40.0),
            Record::new("MA201", "CSE", 35.0, 58.0, 93.0),
            Record::new("MA201", "MECH", 15.0, 20.0, 35.0),
        ]
    }

    #[test]
    fn subject_results_count_pass_and_fail() {
        let table = subject_results(&sample());
        assert_eq!(
            table.rows,
            vec![
                ResultRow { key: "CS101".into(), pass: 2, fail: 1 },
                ResultRow { key: "MA201".into(), pass: 1, fail: 2 },
            ]
        );
    }

    #[test]
    fn department_results_are_sorted_by_key() {
        let table = department_results(&sample());
        let keys: Vec<&str> = table.rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["CSE", "ECE", "MECH"]);
        assert_eq!(table.rows[0].pass, 2);
        assert_eq!(table.rows[0].fail, 1);
        assert_eq!(table.rows[2].total(), 1);
        assert_eq!(table.rows[2].pass, 0);
    }

    #[test]
    fn pass_rate_handles_empty_rows() {
        let row = ResultRow { key: "X".into(), pass: 0, fail: 0 };
        assert_eq!(row.pass_rate(), 0.0);
        let row = ResultRow { key: "X".into(), pass: 3, fail: 1 };
        assert_eq!(row.pass_rate(), 0.75);
        assert_eq!(row.count(Outcome::Fail), 1);
    }

    #[test]
    fn averages_keep_full_precision() {
        let records = vec![
            Record::new("CS101", "CSE", 10.0, 50.0, 60.0),
            Record::new("CS101", "CSE", 11.0, 51.0, 61.0),
            Record::new("CS101", "CSE", 11.0, 51.0, 61.0),
        ];
        let averages = subject_averages(&records);
        assert_eq!(averages.len(), 1);
        assert!((averages[0].internal - 32.0 / 3.0).abs() < 1e-12);
        assert!((averages[0].external - 152.0 / 3.0).abs() < 1e-12);
        assert!((averages[0].total - 182.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn grade_distribution_is_zero_filled() {
        let dist = grade_distribution(&sample());
        assert_eq!(dist.len(), 14);

        let cs: Vec<&GradeCount> = dist.iter().filter(|g| g.subject_code == "CS101").collect();
        let grades: Vec<Grade> = cs.iter().map(|g| g.grade).collect();
        assert_eq!(grades, Grade::ALL.to_vec());
        let counts: Vec<usize> = cs.iter().map(|g| g.count).collect();
        // 90 -> A+, 64 -> B+, 75 -> A
        assert_eq!(counts, vec![0, 1, 1, 1, 0, 0, 0]);
    }

    #[test]
    fn summary_bundles_all_tables() {
        let summary = Summary::from_records(&sample());
        assert_eq!(summary.record_count, 6);
        assert_eq!(summary.subject_results.rows.len(), 2);
        assert_eq!(summary.department_results.rows.len(), 3);
        assert_eq!(summary.subject_averages.len(), 2);
        assert_eq!(summary.grade_distribution.len(), 14);
    }

    #[test]
    fn empty_input_gives_empty_tables() {
        let summary = Summary::from_records(&[]);
        assert!(summary.subject_results.rows.is_empty());
        assert!(summary.subject_averages.is_empty());
        assert!(summary.grade_distribution.is_empty());
    }

    fn arb_record() -> impl Strategy<Value = Record> {
        (
            prop::sample::select(vec!["CS101", "MA201", "PH110"]),
            prop::sample::select(vec!["CSE", "ECE"]),
            0.0f64..40.0,
            0.0f64..60.0,
            0.0f64..100.0,
        )
            .prop_map(|(s, d, i, e, t)| Record::new(s, d, i, e, t))
    }

    proptest! {
        #[test]
        fn counts_sum_to_records_per_key(records in prop::collection::vec(arb_record(), 1..60)) {
            let summary = Summary::from_records(&records);
            for row in &summary.subject_results.rows {
                let expected = records.iter().filter(|r| r.subject_code == row.key).count();
                prop_assert_eq!(row.total(), expected);
            }
            for row in &summary.department_results.rows {
                let expected = records.iter().filter(|r| r.department == row.key).count();
                prop_assert_eq!(row.total(), expected);
            }
            let total: usize = summary.subject_results.rows.iter().map(|r| r.total()).sum();
            prop_assert_eq!(total, records.len());
        }

        #[test]
        fn grade_rows_per_subject_are_fixed(records in prop::collection::vec(arb_record(), 1..60)) {
            let dist = grade_distribution(&records);
            let subjects = subject_results(&records).rows;
            prop_assert_eq!(dist.len(), subjects.len() * 7);
            for row in &subjects {
                let sum: usize = dist.iter().filter(|g| g.subject_code == row.key).map(|g| g.count).sum();
                prop_assert_eq!(sum, row.total());
            }
        }
    }
}
