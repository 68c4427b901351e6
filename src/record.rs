use serde::{Serialize, Serializer};
use std::fmt;

/// Minimum external score required to pass
pub const PASS_EXTERNAL: f64 = 45.0;

/// Minimum total score required to pass
pub const PASS_TOTAL: f64 = 50.0;

/// One student's score row for one subject
///
/// Every record comes from a single spreadsheet row. The scores are
/// validated as non-negative numbers by the loader before a record is built.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Record {
    /// Subject code, e.g. "CS3401"
    pub subject_code: String,

    /// Department offering the subject
    pub department: String,

    /// Internal assessment score
    pub internal: f64,

    /// External examination score
    pub external: f64,

    /// Total score (as given in the sheet, not recomputed)
    pub total: f64,
}

impl Record {
    pub fn new(
        subject_code: impl Into<String>,
        department: impl Into<String>,
        internal: f64,
        external: f64,
        total: f64,
    ) -> Self {
        Self {
            subject_code: subject_code.into(),
            department: department.into(),
            internal,
            external,
            total,
        }
    }

    /// Pass/fail result derived from the external and total scores
    pub fn outcome(&self) -> Outcome {
        classify(self.external, self.total)
    }

    /// Letter grade derived from the total score
    pub fn grade(&self) -> Grade {
        grade(self.total)
    }
}

/// Derived pass/fail result of a record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Outcome {
    Pass,
    Fail,
}

impl Outcome {
    /// Both outcomes in display order
    pub const ALL: [Outcome; 2] = [Outcome::Pass, Outcome::Fail];

    pub fn label(self) -> &'static str {
        match self {
            Outcome::Pass => "Pass",
            Outcome::Fail => "Fail",
        }
    }
}

/// Letter grade assigned from the total score
///
/// Variants are declared from best to worst, so the derived ordering
/// matches the order grades are listed on the dashboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Grade {
    O,
    APlus,
    A,
    BPlus,
    B,
    C,
    U,
}

impl Grade {
    /// All grades from best to worst
    pub const ALL: [Grade; 7] = [
        Grade::O,
        Grade::APlus,
        Grade::A,
        Grade::BPlus,
        Grade::B,
        Grade::C,
        Grade::U,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Grade::O => "O",
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::C => "C",
            Grade::U => "U",
        }
    }

    /// Parses a grade label such as "A+" back into a grade
    pub fn from_label(label: &str) -> Option<Self> {
        Grade::ALL.into_iter().find(|g| g.label() == label)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl Serialize for Grade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Classifies a record as passed or failed
///
/// A record passes only when both thresholds are met.
///
/// # Arguments
/// * `external` - External examination score
/// * `total` - Total score
///
/// # Returns
/// * `Outcome::Pass` if `external >= 45` and `total >= 50`, otherwise `Outcome::Fail`
///
/// # Examples
/// ```
/// use exam_dashboard::record::{classify, Outcome};
///
/// assert_eq!(classify(45.0, 50.0), Outcome::Pass);
/// assert_eq!(classify(44.0, 50.0), Outcome::Fail);
/// ```
pub fn classify(external: f64, total: f64) -> Outcome {
    if external >= PASS_EXTERNAL && total >= PASS_TOTAL {
        Outcome::Pass
    } else {
        Outcome::Fail
    }
}

/// Assigns a letter grade from the total score
///
/// # Examples
/// ```
/// use exam_dashboard::record::{grade, Grade};
///
/// assert_eq!(grade(91.0), Grade::O);
/// assert_eq!(grade(39.0), Grade::U);
/// ```
pub fn grade(total: f64) -> Grade {
    if total >= 91.0 {
        Grade::O
    } else if total >= 81.0 {
        Grade::APlus
    } else if total >= 71.0 {
        Grade::A
    } else if total >= 61.0 {
        Grade::BPlus
    } else if total >= 51.0 {
        Grade::B
    } else if total >= 40.0 {
        Grade::C
    } else {
        Grade::U
    }
}
