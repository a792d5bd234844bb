//! Release versions reported by the registry
//!
//! Registry versions use Python spellings (`2.0.0rc1`, `1.4.post2`, `3.0.dev1`,
//! `4.9.0.80`). Each release keeps its PEP 440 parts for ordering and exposes a
//! `semver::Version` view of its first three components for major checks.

use chrono::{DateTime, Utc};
use regex::Regex;
use semver::{Prerelease, Version};
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

static PY_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?xi)^
        v?
        (?P<release>\d+(?:\.\d+)*)
        (?:[-_.]?(?P<pre_l>alpha|beta|preview|pre|rc|a|b|c)[-_.]?(?P<pre_n>\d+)?)?
        (?P<post>(?:[-_.]?(?:post|rev|r)[-_.]?(?P<post_n>\d+)?)|(?:-(?P<post_implicit>\d+)))?
        (?P<dev>[-_.]?dev[-_.]?(?P<dev_n>\d+)?)?
        (?:\+[a-z0-9._]+)?
        $",
    )
    .unwrap()
});

/// Pre-release phase, in precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum PrePhase {
    Alpha,
    Beta,
    Candidate,
}

impl PrePhase {
    fn as_str(&self) -> &'static str {
        match self {
            PrePhase::Alpha => "a",
            PrePhase::Beta => "b",
            PrePhase::Candidate => "rc",
        }
    }
}

/// A single release of a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseVersion {
    /// Version string as published
    pub raw: String,
    /// First three release components plus the pre-release marker
    pub version: Version,
    /// True if the release has been yanked
    pub yanked: bool,
    /// Earliest upload time among the release files
    pub released_at: Option<DateTime<Utc>>,
    release: Vec<u64>,
    pre: Option<(PrePhase, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
}

impl ReleaseVersion {
    /// Parses a published version string
    ///
    /// Returns `None` for strings that do not follow the release grammar,
    /// including epoch-qualified versions (`1!2.0`).
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.contains('!') {
            return None;
        }
        let caps = PY_VERSION_RE.captures(raw)?;
        let number = |name: &str| -> Option<u64> {
            match caps.name(name) {
                Some(m) => m.as_str().parse().ok(),
                None => Some(0),
            }
        };

        let release = caps
            .name("release")?
            .as_str()
            .split('.')
            .map(|part| part.parse().ok())
            .collect::<Option<Vec<u64>>>()?;
        let pre = match caps.name("pre_l") {
            Some(label) => {
                let phase = match label.as_str().to_ascii_lowercase().as_str() {
                    "alpha" | "a" => PrePhase::Alpha,
                    "beta" | "b" => PrePhase::Beta,
                    _ => PrePhase::Candidate,
                };
                Some((phase, number("pre_n")?))
            }
            None => None,
        };
        let post = match caps.name("post") {
            Some(_) if caps.name("post_implicit").is_some() => Some(number("post_implicit")?),
            Some(_) => Some(number("post_n")?),
            None => None,
        };
        let dev = match caps.name("dev") {
            Some(_) => Some(number("dev_n")?),
            None => None,
        };

        let version = semver_view(&release, pre, dev)?;
        Some(Self {
            raw: raw.to_string(),
            version,
            yanked: false,
            released_at: None,
            release,
            pre,
            post,
            dev,
        })
    }

    /// Marks the release as yanked (builder pattern)
    pub fn with_yanked(mut self, yanked: bool) -> Self {
        self.yanked = yanked;
        self
    }

    /// Sets the upload time (builder pattern)
    pub fn with_released_at(mut self, released_at: DateTime<Utc>) -> Self {
        self.released_at = Some(released_at);
        self
    }

    /// Returns true for alpha, beta, release-candidate and dev releases
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    /// Returns the major component
    pub fn major(&self) -> u64 {
        self.version.major
    }

    /// Release components as published (`4.9.0.80` -> `[4, 9, 0, 80]`)
    pub fn release(&self) -> &[u64] {
        &self.release
    }

    /// Pre, post and dev parts in normalized spelling (`rc1`, `.post2`, `.dev0`)
    pub fn suffix(&self) -> Option<String> {
        let mut out = String::new();
        if let Some((phase, n)) = self.pre {
            out.push_str(&format!("{}{}", phase.as_str(), n));
        }
        if let Some(n) = self.post {
            out.push_str(&format!(".post{}", n));
        }
        if let Some(n) = self.dev {
            out.push_str(&format!(".dev{}", n));
        }
        (!out.is_empty()).then_some(out)
    }

    /// Normalized version text with every published component
    pub fn release_string(&self) -> String {
        let mut out = self
            .release
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".");
        if let Some(suffix) = self.suffix() {
            out.push_str(&suffix);
        }
        out
    }

    /// PEP 440 precedence: release, then pre phase, then post, then dev
    fn sort_key(&self) -> (&[u64], (u8, u64), (u8, u64), (u8, u64)) {
        let mut release: &[u64] = &self.release;
        while let [rest @ .., 0] = release {
            release = rest;
        }
        let pre = match (self.pre, self.post, self.dev) {
            (Some((phase, n)), _, _) => (phase as u8 + 1, n),
            // a bare dev release precedes every pre-release of its version
            (None, None, Some(_)) => (0, 0),
            (None, _, _) => (u8::MAX, 0),
        };
        let post = self.post.map_or((0, 0), |n| (1, n));
        let dev = self.dev.map_or((1, 0), |n| (0, n));
        (release, pre, post, dev)
    }
}

impl Ord for ReleaseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for ReleaseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn semver_view(release: &[u64], pre: Option<(PrePhase, u64)>, dev: Option<u64>) -> Option<Version> {
    let component = |i: usize| release.get(i).copied().unwrap_or(0);
    let mut labels: Vec<String> = Vec::new();
    if let Some((phase, n)) = pre {
        labels.push(format!("{}.{}", phase.as_str(), n));
    }
    if let Some(n) = dev {
        labels.push(format!("dev.{}", n));
    }
    let pre = if labels.is_empty() {
        Prerelease::EMPTY
    } else {
        Prerelease::new(&labels.join(".")).ok()?
    };
    let mut version = Version::new(component(0), component(1), component(2));
    version.pre = pre;
    Some(version)
}
