//! Security archive filters.
//!
//! All of these need a security archive and fail without one, before their
//! arguments are read. Nodes the archive has no report for never match.

use super::{nth_arg, required_arg, Comparator};
use crate::ast::Ast;
use crate::error::QueryError;
use crate::state::ParserState;
use depquery_core::{Alert, PackageReport, ScoreKind, SecurityArchive};
use serde_json::Value;

/// Scores are compared with this tolerance for `=`.
const SCORE_EPSILON: f64 = 1e-6;

/// `(level, alert type)` for `:severity`.
const SEVERITY_ALERTS: &[(u8, &str)] = &[
    (0, "criticalCVE"),
    (1, "cve"),
    (2, "potentialVulnerability"),
    (3, "mildCVE"),
];

/// `(level, alert type)` for `:squat`.
const SQUAT_ALERTS: &[(u8, &str)] = &[(0, "didYouMean"), (2, "gptDidYouMean")];

/// `(level, alert type)` for `:malware`.
const MALWARE_ALERTS: &[(u8, &str)] = &[
    (0, "malware"),
    (1, "gptMalware"),
    (2, "gptSecurity"),
    (3, "gptAnomaly"),
];

/// `:license(<kind>)` vocabulary.
const LICENSE_ALERTS: &[(&str, &str)] = &[
    ("unlicensed", "explicitlyUnlicensedItem"),
    ("misc", "miscLicenseIssues"),
    ("restricted", "nonpermissiveLicense"),
    ("ambiguous", "ambiguousClassifier"),
    ("copyleft", "copyleftLicense"),
    ("unknown", "unidentifiedLicense"),
    ("none", "noLicenseFound"),
    ("exception", "licenseException"),
];

/// Keep nodes whose report satisfies `keep`.
fn retain_reported(
    state: &mut ParserState<'_>,
    archive: &dyn SecurityArchive,
    mut keep: impl FnMut(&PackageReport) -> bool,
) -> Result<(), QueryError> {
    state.retain_nodes(|node| archive.get(&node.id).is_some_and(&mut keep));
    state.remove_dangling_edges();
    Ok(())
}

/// Shared handler for every verb that checks a single alert type.
pub(crate) fn alert(
    state: &mut ParserState<'_>,
    pseudo: &str,
    alert_type: &str,
) -> Result<(), QueryError> {
    let archive = state.security_archive(pseudo)?;
    retain_reported(state, archive.as_ref(), |report| report.has_alert(alert_type))
}

/// `:score([cmp]<value>[, <kind>])`, value in `0..=1` or `0..=100`.
pub(crate) fn score(state: &mut ParserState<'_>, args: &[Ast]) -> Result<(), QueryError> {
    let archive = state.security_archive("score")?;
    let arg = required_arg("score", args)?;
    let (comparator, number) = Comparator::split(&arg);
    let mut target: f64 = number
        .parse()
        .map_err(|_| QueryError::invalid_argument("score", format!("'{}' is not a number", number)))?;
    if target > 1.0 {
        target /= 100.0;
    }
    if !(0.0..=1.0).contains(&target) {
        return Err(QueryError::invalid_argument(
            "score",
            format!("'{}' is outside 0-1 and 0-100", number),
        ));
    }
    let kind = match nth_arg(args, 1) {
        Some(name) => ScoreKind::parse(&name).ok_or_else(|| {
            QueryError::invalid_argument("score", format!("unknown score kind '{}'", name))
        })?,
        None => ScoreKind::Overall,
    };

    retain_reported(state, archive.as_ref(), |report| {
        let value = report.score.get(kind);
        match comparator {
            Comparator::Eq => (value - target).abs() < SCORE_EPSILON,
            cmp => cmp.compare(&value, &target),
        }
    })
}

/// Parse `[cmp]<level>` where level is a name or `0..=3`.
fn level_arg(pseudo: &str, arg: &str) -> Result<(Comparator, u8), QueryError> {
    let (comparator, level) = Comparator::split(arg);
    let level = match level {
        "critical" => 0,
        "high" => 1,
        "medium" => 2,
        "low" => 3,
        other => other
            .parse::<u8>()
            .ok()
            .filter(|n| *n <= 3)
            .ok_or_else(|| {
                QueryError::invalid_argument(pseudo, format!("unknown level '{}'", other))
            })?,
    };
    Ok((comparator, level))
}

/// Nodes with an alert whose level compares against the argument.
fn ranked(
    state: &mut ParserState<'_>,
    pseudo: &str,
    args: &[Ast],
    table: &[(u8, &str)],
) -> Result<(), QueryError> {
    let archive = state.security_archive(pseudo)?;
    let (comparator, target) = level_arg(pseudo, &required_arg(pseudo, args)?)?;
    let alert_types: Vec<&str> = table
        .iter()
        .filter(|(level, _)| comparator.compare(level, &target))
        .map(|(_, alert)| *alert)
        .collect();
    retain_reported(state, archive.as_ref(), |report| {
        alert_types.iter().any(|alert| report.has_alert(alert))
    })
}

pub(crate) fn severity(state: &mut ParserState<'_>, args: &[Ast]) -> Result<(), QueryError> {
    ranked(state, "severity", args, SEVERITY_ALERTS)
}

pub(crate) fn squat(state: &mut ParserState<'_>, args: &[Ast]) -> Result<(), QueryError> {
    ranked(state, "squat", args, SQUAT_ALERTS)
}

pub(crate) fn malware(state: &mut ParserState<'_>, args: &[Ast]) -> Result<(), QueryError> {
    ranked(state, "malware", args, MALWARE_ALERTS)
}

pub(crate) fn license(state: &mut ParserState<'_>, args: &[Ast]) -> Result<(), QueryError> {
    let archive = state.security_archive("license")?;
    let kind = required_arg("license", args)?;
    let alert_type = LICENSE_ALERTS
        .iter()
        .find(|(name, _)| *name == kind)
        .map(|(_, alert)| *alert)
        .ok_or_else(|| {
            QueryError::invalid_argument("license", format!("unknown license kind '{}'", kind))
        })?;
    retain_reported(state, archive.as_ref(), |report| report.has_alert(alert_type))
}

pub(crate) fn cve(state: &mut ParserState<'_>, args: &[Ast]) -> Result<(), QueryError> {
    let archive = state.security_archive("cve")?;
    let id = required_arg("cve", args)?;
    retain_reported(state, archive.as_ref(), |report| {
        report
            .alerts
            .iter()
            .any(|alert| alert.props.get("cveId").and_then(Value::as_str) == Some(id.as_str()))
    })
}

pub(crate) fn cwe(state: &mut ParserState<'_>, args: &[Ast]) -> Result<(), QueryError> {
    let archive = state.security_archive("cwe")?;
    let id = required_arg("cwe", args)?;
    retain_reported(state, archive.as_ref(), |report| {
        report.alerts.iter().any(|alert| alert_cwes(alert).any(|cwe| cwe == id))
    })
}

/// CWE ids of an alert; `cwes` holds either strings or `{ id }` objects.
fn alert_cwes(alert: &Alert) -> impl Iterator<Item = &str> {
    alert
        .props
        .get("cwes")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|cwe| cwe.as_str().or_else(|| cwe.get("id").and_then(Value::as_str)))
}

#[cfg(test)]
mod tests {
    use crate::error::QueryError;
    use crate::testing::{fixture_archive, fixture_graph, frame, names, run};
    use pretty_assertions::assert_eq;

    async fn select(query: &str) -> Vec<String> {
        let graph = fixture_graph();
        let result = run(query, frame(&graph, Some(fixture_archive()))).await.unwrap();
        names(&result.nodes)
    }

    async fn fail(query: &str) -> QueryError {
        let graph = fixture_graph();
        run(query, frame(&graph, Some(fixture_archive()))).await.unwrap_err()
    }

    #[tokio::test]
    async fn test_alert_verbs() {
        assert_eq!(select(":scripts").await, vec!["a"]);
        assert_eq!(select(":shell").await, vec!["e"]);
        assert!(select(":native").await.is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_is_not_deprecated() {
        assert_eq!(select(":abandoned").await, vec!["c"]);
        assert!(select(":deprecated").await.is_empty());
    }

    #[tokio::test]
    async fn test_score() {
        assert_eq!(select(":score(>0.5)").await, vec!["a"]);
        assert_eq!(select(":score(0.5)").await, vec!["c"]);
        assert_eq!(select(":score(>=50, supplyChain)").await, vec!["e"]);
        assert_eq!(select(":score(<=0.5)").await, vec!["c", "e"]);
        assert!(matches!(fail(":score(150)").await, QueryError::InvalidArgument { .. }));
        assert!(matches!(fail(":score(>0.5, bogus)").await, QueryError::InvalidArgument { .. }));
        assert!(matches!(fail(":score(high)").await, QueryError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_severity() {
        assert_eq!(select(":severity(critical)").await, vec!["a"]);
        assert_eq!(select(":severity(low)").await, vec!["e"]);
        assert_eq!(select(":severity(<2)").await, vec!["a"]);
        assert_eq!(select(":severity(>=2)").await, vec!["e"]);
        assert!(matches!(fail(":severity(dire)").await, QueryError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_squat_and_malware() {
        assert_eq!(select(":squat(critical)").await, vec!["e"]);
        assert!(select(":squat(medium)").await.is_empty());
        assert!(select(":malware(critical)").await.is_empty());
    }

    #[tokio::test]
    async fn test_license() {
        assert_eq!(select(":license(copyleft)").await, vec!["a"]);
        assert!(matches!(fail(":license(weird)").await, QueryError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_cve_and_cwe() {
        assert_eq!(select(":cve(CVE-2024-0001)").await, vec!["e"]);
        assert_eq!(select(":cwe(CWE-79)").await, vec!["a"]);
        assert!(select(":cve(CVE-1999-0001)").await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_archive_is_fatal_even_when_loose() {
        let graph = fixture_graph();
        for query in [":scripts", ":score(0.5)", ":severity(high)", ":cve(x)", ":license(none)"] {
            let mut state = frame(&graph, None);
            state.loose = true;
            let err = run(query, state).await.unwrap_err();
            assert!(matches!(err, QueryError::MissingSecurityArchive(_)), "{query}");
        }
    }

    #[tokio::test]
    async fn test_missing_archive_wins_over_bad_arguments() {
        let graph = fixture_graph();
        for query in [
            ":score(150)",
            ":score(high)",
            ":severity(dire)",
            ":squat()",
            ":malware(9)",
            ":license(weird)",
            ":cve()",
            ":is(:license(weird))",
            "#a, :is(:score(150))",
        ] {
            let mut state = frame(&graph, None);
            state.loose = true;
            let err = run(query, state).await.unwrap_err();
            assert!(matches!(err, QueryError::MissingSecurityArchive(_)), "{query}");
        }
    }
}
