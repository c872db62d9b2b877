//! Scorecard model - the output of one analysis run

use crate::check::Check;
use crate::object::{FileLocation, TypeMeta};
use indexmap::IndexMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::Serialize;

/// Outcome of one check against one object, ordered worst first.
///
/// Grades are numeric so they can be compared and summed; `AllOk` doubles as
/// the default so a check that forgets to grade passes silently - check
/// implementations must set `Critical`/`Warning` explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Critical = 0,
    Warning = 5,
    AlmostOk = 7,
    #[default]
    AllOk = 10,
}

impl Grade {
    pub fn as_number(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Grade::Critical => "CRITICAL",
            Grade::Warning => "WARNING",
            Grade::AlmostOk => "ALMOST OK",
            Grade::AllOk => "OK",
        };
        f.write_str(name)
    }
}

/// One explanatory comment attached to a score.
///
/// `path` points at the offending element inside the object (a container
/// name, an ingress path) and may be empty for object-level findings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScoreComment {
    pub path: String,
    pub summary: String,
    pub description: String,
}

/// The graded result of a single check invocation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestScore {
    pub grade: Grade,
    pub skipped: bool,
    pub comments: Vec<ScoreComment>,
}

impl TestScore {
    pub fn ok() -> Self {
        Self {
            grade: Grade::AllOk,
            ..Default::default()
        }
    }

    pub fn warning() -> Self {
        Self {
            grade: Grade::Warning,
            ..Default::default()
        }
    }

    pub fn almost_ok() -> Self {
        Self {
            grade: Grade::AlmostOk,
            ..Default::default()
        }
    }

    pub fn critical() -> Self {
        Self {
            grade: Grade::Critical,
            ..Default::default()
        }
    }

    /// A result that carries no grade weight, with a one-line reason.
    pub fn skipped(reason: impl Into<String>) -> Self {
        let mut score = Self {
            skipped: true,
            ..Default::default()
        };
        score.add_comment("", reason, "");
        score
    }

    pub fn add_comment(
        &mut self,
        path: impl Into<String>,
        summary: impl Into<String>,
        description: impl Into<String>,
    ) {
        self.comments.push(ScoreComment {
            path: path.into(),
            summary: summary.into(),
            description: description.into(),
        });
    }

    pub fn with_comment(
        mut self,
        path: impl Into<String>,
        summary: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.add_comment(path, summary, description);
        self
    }
}

/// One check outcome paired with the check that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub check: Check,
    pub score: TestScore,
}

/// Everything graded about a single input object.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredObject {
    pub type_meta: TypeMeta,
    pub name: String,
    pub namespace: String,
    pub location: FileLocation,
    pub results: Vec<CheckResult>,
}

impl ScoredObject {
    /// Worst grade over all non-skipped results; `None` when everything was
    /// skipped.
    pub fn aggregate_grade(&self) -> Option<Grade> {
        self.results
            .iter()
            .filter(|r| !r.score.skipped)
            .map(|r| r.score.grade)
            .min()
    }

    pub fn add(&mut self, check: Check, score: TestScore) {
        self.results.push(CheckResult { check, score });
    }
}

/// The complete output of one run, keyed by a stable per-object key and
/// ordered by encounter.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Scorecard {
    objects: IndexMap<String, ScoredObject>,
}

/// Stable key identifying an object across the run.
pub fn object_key(type_meta: &TypeMeta, namespace: &str, name: &str) -> String {
    format!(
        "{}/{}/{}/{}",
        type_meta.kind, type_meta.api_version, namespace, name
    )
}

impl Scorecard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the entry for an object. Objects seen through several
    /// views (e.g. a Deployment that is also graded as a workload) share one
    /// entry.
    pub fn object_mut(
        &mut self,
        type_meta: &TypeMeta,
        metadata: &ObjectMeta,
        location: &FileLocation,
    ) -> &mut ScoredObject {
        let name = metadata.name.as_deref().unwrap_or("");
        let namespace = metadata.namespace.as_deref().unwrap_or("");
        let key = object_key(type_meta, namespace, name);
        self.objects.entry(key).or_insert_with(|| ScoredObject {
            type_meta: type_meta.clone(),
            name: name.to_string(),
            namespace: namespace.to_string(),
            location: location.clone(),
            results: Vec::new(),
        })
    }

    pub fn get(&self, key: &str) -> Option<&ScoredObject> {
        self.objects.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ScoredObject)> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// True when any object carries a non-skipped result at or below the
    /// given grade. Drives the process exit status.
    pub fn any_at_or_below(&self, grade: Grade) -> bool {
        self.objects.values().any(|o| {
            o.results
                .iter()
                .any(|r| !r.score.skipped && r.score.grade <= grade)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(grade: Grade, skipped: bool) -> TestScore {
        TestScore {
            grade,
            skipped,
            comments: Vec::new(),
        }
    }

    fn check(name: &str) -> Check {
        Check::new(name, "Pod", "", false)
    }

    #[test]
    fn test_grade_ordering() {
        assert!(Grade::Critical < Grade::Warning);
        assert!(Grade::Warning < Grade::AlmostOk);
        assert!(Grade::AlmostOk < Grade::AllOk);
        assert_eq!(Grade::AllOk.as_number(), 10);
        assert_eq!(Grade::Critical.as_number(), 0);
    }

    #[test]
    fn test_aggregate_grade_is_minimum_of_non_skipped() {
        let mut object = ScoredObject {
            type_meta: TypeMeta::new("v1", "Pod"),
            name: "test".to_string(),
            namespace: String::new(),
            location: FileLocation::default(),
            results: Vec::new(),
        };
        object.add(check("a"), scored(Grade::AllOk, false));
        object.add(check("b"), scored(Grade::Warning, false));
        object.add(check("c"), scored(Grade::Critical, true));

        assert_eq!(object.aggregate_grade(), Some(Grade::Warning));
    }

    #[test]
    fn test_aggregate_grade_all_skipped() {
        let mut object = ScoredObject {
            type_meta: TypeMeta::new("v1", "Pod"),
            name: "test".to_string(),
            namespace: String::new(),
            location: FileLocation::default(),
            results: Vec::new(),
        };
        object.add(check("a"), scored(Grade::Critical, true));
        assert_eq!(object.aggregate_grade(), None);
    }

    #[test]
    fn test_any_at_or_below_ignores_skipped() {
        let mut card = Scorecard::new();
        let tm = TypeMeta::new("apps/v1", "Deployment");
        let meta = ObjectMeta {
            name: Some("app".to_string()),
            ..Default::default()
        };
        let object = card.object_mut(&tm, &meta, &FileLocation::default());
        object.add(check("a"), scored(Grade::Critical, true));
        object.add(check("b"), scored(Grade::Warning, false));

        assert!(!card.any_at_or_below(Grade::Critical));
        assert!(card.any_at_or_below(Grade::Warning));
    }

    #[test]
    fn test_object_key_format() {
        let tm = TypeMeta::new("apps/v1", "Deployment");
        assert_eq!(object_key(&tm, "", "foo"), "Deployment/apps/v1//foo");
        assert_eq!(
            object_key(&tm, "prod", "foo"),
            "Deployment/apps/v1/prod/foo"
        );
    }

    #[test]
    fn test_scorecard_entries_are_shared_per_object() {
        let mut card = Scorecard::new();
        let tm = TypeMeta::new("apps/v1", "Deployment");
        let meta = ObjectMeta {
            name: Some("app".to_string()),
            ..Default::default()
        };
        card.object_mut(&tm, &meta, &FileLocation::default())
            .add(check("a"), scored(Grade::AllOk, false));
        card.object_mut(&tm, &meta, &FileLocation::default())
            .add(check("b"), scored(Grade::AllOk, false));

        assert_eq!(card.len(), 1);
        assert_eq!(card.get("Deployment/apps/v1//app").unwrap().results.len(), 2);
    }
}
