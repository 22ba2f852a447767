//! Independent structural checklist for patched artifacts
//!
//! These checks deliberately repeat what the catalog already knows. They are
//! evaluated over the final text without looking at any transform's own
//! outcome, so a transform that reported success against the wrong site still
//! shows up here.

use regex::Regex;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Artifact {
    Script,
    Stylesheet,
}

impl Artifact {
    fn prefix(self) -> &'static str {
        match self {
            Artifact::Script => "JS",
            Artifact::Stylesheet => "CSS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Expectation {
    Present,
    Absent,
}

/// One checklist entry
pub struct Check {
    pub label: &'static str,
    pub artifact: Artifact,
    pub expectation: Expectation,
    predicate: fn(&str) -> bool,
}

impl Check {
    const fn present(artifact: Artifact, label: &'static str, predicate: fn(&str) -> bool) -> Self {
        Self {
            label,
            artifact,
            expectation: Expectation::Present,
            predicate,
        }
    }

    const fn absent(artifact: Artifact, label: &'static str, predicate: fn(&str) -> bool) -> Self {
        Self {
            label,
            artifact,
            expectation: Expectation::Absent,
            predicate,
        }
    }

    pub fn evaluate(&self, text: &str) -> bool {
        let found = (self.predicate)(text);
        match self.expectation {
            Expectation::Present => found,
            Expectation::Absent => !found,
        }
    }
}

fn has_all(text: &str, needles: &[&str]) -> bool {
    needles.iter().all(|needle| text.contains(needle))
}

fn has_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| text.contains(needle))
}

fn matches_pattern(pattern: &str, text: &str) -> bool {
    Regex::new(pattern).is_ok_and(|re| re.is_match(text))
}

use Artifact::{Script, Stylesheet};

static CHECKS: &[Check] = &[
    Check::present(Script, "_ccSessionStart defined", |js| js.contains("_ccSessionStart = Date.now()")),
    Check::present(Script, "_ccAccent defined", |js| js.contains("_ccAccent = \"#e04040\"")),
    Check::present(Script, "_ccDim defined", |js| js.contains("_ccDim = \"rgba(255,255,255,0.55)\"")),
    Check::present(Script, "_ccV value helper", |js| js.contains("function _ccV(")),
    Check::present(Script, "_ccP icon paths defined", |js| has_all(js, &["var _ccP = {", "\"brain\""])),
    Check::present(Script, "_ccIcon function present", |js| js.contains("function _ccIcon(")),
    Check::present(Script, "_ccBar helper present", |js| js.contains("function _ccBar(")),
    Check::present(Script, "_ccAvatarImg defined", |js| has_all(js, &["_ccAvatarImg", "data:image/png;base64,"])),
    Check::present(Script, "_ccAvatar function present", |js| js.contains("function _ccAvatar()")),
    Check::present(Script, "metrics component present", |js| js.contains("function CC_MetricsBar")),
    Check::present(Script, "metrics bar in DOM", |js| js.contains("sessionMetrics_cc")),
    Check::present(Script, "CC_MetricsBar call injected", |js| js.contains("createElement(CC_MetricsBar")),
    Check::present(Script, "row layout (flexDirection row)", |js| js.contains("flexDirection: \"row\"")),
    Check::present(Script, "avatar called", |js| js.contains("_ccAvatar()")),
    Check::present(Script, "icons used in Row1", |js| {
        has_all(js, &["_ccIcon(\"brain\"", "_ccIcon(\"dollar\"", "_ccIcon(\"layers\""])
    }),
    Check::present(Script, "icons used in Row2", |js| has_all(js, &["_ccIcon(\"arrowDown\"", "_ccIcon(\"arrowUp\""])),
    Check::present(Script, "icons used in Row3", |js| {
        has_all(js, &["_ccIcon(\"zap\"", "_ccIcon(\"calDays\"", "_ccIcon(\"timer\""])
    }),
    Check::present(Script, "icons used in Row4", |js| has_all(js, &["_ccIcon(\"clock\"", "_ccIcon(\"calClock\""])),
    Check::present(Script, "usageData has inputTokens", |js| {
        matches_pattern(r"maxOutputTokens:\s*0,\s*inputTokens:\s*0", js)
    }),
    Check::present(Script, "updateUsage stores individual tokens", |js| {
        has_any(js, &["inputTokens:$.input_tokens", "inputTokens: $.input_tokens"])
    }),
    Check::present(Script, "result handler preserves tokens", |js| {
        has_any(js, &["inputTokens:J.inputTokens", "inputTokens: J.inputTokens"])
    }),
    Check::present(Script, "compact_boundary resets tokens", |js| {
        matches_pattern(r"usageData\.value,\s*totalTokens:\s*0,\s*inputTokens:\s*0,\s*outputTokens:\s*0", js)
    }),
    Check::present(Script, "Row2 shows totalIn with cache%", |js| js.contains("cachePct")),
    Check::present(Script, "Row3 utilization signals", |js| js.contains("S.utilization.value")),
    Check::present(Script, "Row3 session time", |js| has_all(js, &["_ccSessionStart", "sesMin"])),
    Check::present(Script, "Row3 last activity", |js| js.contains("S.lastModifiedTime.value")),
    Check::present(Script, "Row4 reset countdowns", |js| has_all(js, &["r5hTime", "r7dCd", "r7dPct"])),
    Check::absent(Script, "visibility gate removed", |js| {
        has_any(js, &["if (U >= 50) return null;", "if(U>=50)return null}", "if(U>=50)return null;"])
    }),
    Check::present(Stylesheet, "custom styles", |css| css.contains(".sessionMetrics_cc")),
    Check::present(Stylesheet, "flex-wrap on inputFooter", |css| css.contains("flex-wrap:wrap")),
    Check::present(Stylesheet, "palette accent", |css| css.contains("--app-claude-orange:#e04040")),
    Check::present(Stylesheet, "palette button", |css| css.contains("--app-claude-clay-button-orange:#b82030")),
    Check::present(Stylesheet, "input border", |css| has_all(css, &["inputContainer_cKsPxg", "rgba(224,64,64"])),
    Check::present(Script, "dim/accent color scheme", |js| has_all(js, &["_ccV(", "color: _ccDim"])),
    Check::present(Script, "Row5 thinking level", |js| has_all(js, &["thinkLvl", "thinkClr"])),
    Check::present(Script, "Row5 message count", |js| js.contains("msgCount")),
    Check::present(Script, "Row5 output utilization", |js| has_all(js, &["outPct", "outMaxStr"])),
    Check::present(Script, "Row6 cost rate", |js| js.contains("costRateStr")),
    Check::present(Script, "Row6 throughput", |js| js.contains("throughStr")),
    Check::present(Script, "Row6 compaction counter", |js| has_all(js, &["_compactRef", "compactCount"])),
    Check::present(Script, "icons used in Row5", |js| js.contains("_ccIcon(\"msgSquare\"")),
    Check::present(Script, "icons used in Row6", |js| js.contains("_ccIcon(\"gauge\"")),
    Check::present(Script, "Row2 workdir display", |js| has_all(js, &["cwdStr", "cwdRaw", "S.cwd"])),
    Check::present(Script, "Row2 git branch display", |js| has_all(js, &["gitBr", "S.gitBranch"])),
    Check::present(Script, "icons used in Row2 (folder+gitBr)", |js| {
        has_all(js, &["_ccIcon(\"folder\"", "_ccIcon(\"gitBr\""])
    }),
];

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub label: &'static str,
    pub artifact: Artifact,
    pub expectation: Expectation,
    pub passed: bool,
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.artifact.prefix(), self.label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub checks: Vec<CheckResult>,
}

impl VerifyReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

/// Run every check against the final script and stylesheet text
pub fn verify(script: &str, stylesheet: &str) -> VerifyReport {
    let checks = CHECKS
        .iter()
        .map(|check| {
            let text = match check.artifact {
                Artifact::Script => script,
                Artifact::Stylesheet => stylesheet,
            };
            CheckResult {
                label: check.label,
                artifact: check.artifact,
                expectation: check.expectation,
                passed: check.evaluate(text),
            }
        })
        .collect::<Vec<_>>();

    let failed = checks.iter().filter(|c| !c.passed).count();
    tracing::debug!(total = checks.len(), failed, "verification finished");
    VerifyReport { checks }
}
