//! npm-flavoured version ranges on top of the `semver` crate.
//!
//! npm ranges differ from Cargo requirements in a few places: a bare version
//! means an exact match, comparators are separated by spaces, `||` joins
//! alternatives and `a - b` is an inclusive hyphen range. This module
//! rewrites npm syntax into one `VersionReq` per alternative.

use semver::{Comparator, Op, Prerelease, Version, VersionReq};

/// Parse a version, tolerating a leading `v` or `=`.
pub fn parse_version(input: &str) -> Option<Version> {
    let trimmed = input.trim();
    let trimmed = trimmed.strip_prefix('=').unwrap_or(trimmed);
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(trimmed).ok()
}

/// Union of comparator sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Range {
    raw: String,
    alternatives: Vec<VersionReq>,
}

impl Range {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    /// Lowest version admitted by the range.
    pub fn min_version(&self) -> Option<Version> {
        self.alternatives
            .iter()
            .filter_map(|req| {
                let candidate = req
                    .comparators
                    .iter()
                    .map(lower_bound)
                    .max()
                    .unwrap_or_else(|| Version::new(0, 0, 0));
                req.matches(&candidate).then_some(candidate)
            })
            .min()
    }
}

fn lower_bound(comparator: &Comparator) -> Version {
    let mut version = Version {
        major: comparator.major,
        minor: comparator.minor.unwrap_or(0),
        patch: comparator.patch.unwrap_or(0),
        pre: comparator.pre.clone(),
        build: Default::default(),
    };
    match comparator.op {
        Op::Less | Op::LessEq => Version::new(0, 0, 0),
        Op::Greater => {
            match (comparator.minor, comparator.patch) {
                (None, _) => {
                    version.major += 1;
                    version.minor = 0;
                    version.patch = 0;
                }
                (Some(_), None) => {
                    version.minor += 1;
                    version.patch = 0;
                }
                (Some(_), Some(_)) => version.patch += 1,
            }
            version.pre = Prerelease::EMPTY;
            version
        }
        _ => version,
    }
}

/// Parse an npm range expression.
pub fn parse_range(input: &str) -> Option<Range> {
    let raw = input.trim().to_string();
    let alternatives = raw
        .split("||")
        .map(|alt| VersionReq::parse(&to_cargo_req(alt)?).ok())
        .collect::<Option<Vec<_>>>()?;
    Some(Range { raw, alternatives })
}

/// Whether `version` falls within `range`. Unparseable input never matches.
pub fn satisfies(version: &str, range: &str) -> bool {
    match (parse_version(version), parse_range(range)) {
        (Some(v), Some(r)) => r.matches(&v),
        _ => false,
    }
}

/// Rewrite one npm comparator set into Cargo requirement syntax.
fn to_cargo_req(set: &str) -> Option<String> {
    let tokens = merge_operators(set.split_whitespace().collect());

    let parts: Vec<&str> = tokens.iter().map(String::as_str).collect();
    if let [low, "-", high] = parts.as_slice() {
        return Some(format!(">={}, <={}", strip_v(low), strip_v(high)));
    }

    let comparators: Vec<String> = tokens
        .iter()
        .filter_map(|token| convert_token(token))
        .collect();

    if comparators.is_empty() {
        return Some("*".to_string());
    }
    Some(comparators.join(", "))
}

/// Join operators written apart from their version (`>= 1.2.3`).
fn merge_operators(tokens: Vec<&str>) -> Vec<String> {
    let mut merged = Vec::with_capacity(tokens.len());
    let mut pending: Option<&str> = None;
    for token in tokens {
        if is_operator(token) && token != "-" {
            pending = Some(token);
            continue;
        }
        match pending.take() {
            Some(op) => merged.push(format!("{}{}", op, token)),
            None => merged.push(token.to_string()),
        }
    }
    merged
}

fn is_operator(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| matches!(c, '<' | '>' | '=' | '^' | '~' | '-'))
}

fn strip_v(token: &str) -> &str {
    token.strip_prefix('v').unwrap_or(token)
}

fn convert_token(token: &str) -> Option<String> {
    let op_len = token
        .find(|c: char| !matches!(c, '<' | '>' | '=' | '^' | '~'))
        .unwrap_or(token.len());
    let (op, version) = token.split_at(op_len);
    let version = strip_v(version);
    let version = trim_wildcards(version);

    if version.is_empty() || version == "latest" {
        // `*`, `x`, `""` admit everything and add nothing to the set
        return None;
    }

    let op = match op {
        "" => "=",
        "==" => "=",
        "~>" => "~",
        other => other,
    };
    Some(format!("{}{}", op, version))
}

/// `1.x` -> `1`, `1.2.*` -> `1.2`, `*` -> ``.
fn trim_wildcards(version: &str) -> &str {
    let mut end = version.len();
    for (i, part) in version.split('.').enumerate() {
        if matches!(part, "x" | "X" | "*") {
            end = version
                .match_indices('.')
                .nth(i.saturating_sub(1))
                .filter(|_| i > 0)
                .map(|(idx, _)| idx)
                .unwrap_or(0);
            break;
        }
    }
    &version[..end]
}
