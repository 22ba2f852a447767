//! Host bundle shapes shared by the engine tests
//!
//! Both bundles use non-default build identifiers (`o4`, `KJ`, `FO1`, `MZ`,
//! `Zi1`) so detection is distinguishable from fallback.

use super::encoding::PRETTIFIED_LINE_THRESHOLD;

pub(crate) const MINIFIED_BUNDLE: &str = concat!(
    "(()=>{var Xa=Object.create;",
    "class Ke{constructor(){this.usageData=p7({totalTokens:0,totalCost:0,contextWindow:0,maxOutputTokens:0});this.busy=p7(!1)}",
    "updateUsage($,Z,J){this.usageData.value={totalTokens:J,totalCost:Z.totalCost,contextWindow:Z.contextWindow,maxOutputTokens:Z.maxOutputTokens}}",
    "onResult($,J,X,Q){if($.type===\"result\"){this.usageData.value={totalTokens:J.totalTokens,totalCost:$.total_cost_usd,contextWindow:X,maxOutputTokens:Q}}}",
    "onCompact(){this.usageData.value={...this.usageData.value,totalTokens:0}}}",
    "function er0({used:U}){if(U>=50)return null;return o4.default.createElement(\"span\",null,U)}",
    "function Zi1({session:$}){MZ();let q=$.busy.value;return o4.default.createElement(\"div\",{className:KJ.inputFooter},o4.default.createElement(FO1,{session:$}),q&&o4.default.createElement(\"span\",null))}",
    "})();\n",
);

const PRETTIFIED_BODY: &str = r#""use strict";
class SessionState {
  usageData = g1({
    totalTokens: 0,
    totalCost: 0,
    contextWindow: 0,
    maxOutputTokens: 0,
  });
  updateUsage($, Z, J) {
    this.usageData.value = {
      totalTokens: J,
      totalCost: Z.totalCost,
      contextWindow: Z.contextWindow,
      maxOutputTokens: Z.maxOutputTokens,
    };
  }
  onResult($, J, X, Q) {
    if ($.type === "result") {
      if (J) {
        this.usageData.value = {
          totalTokens: J.totalTokens,
          totalCost: $.total_cost_usd,
          contextWindow: X,
          maxOutputTokens: Q,
        };
      }
    }
  }
  onCompact() {
    this.usageData.value = { ...this.usageData.value, totalTokens: 0 };
  }
}
function er0({ used: U }) {
  if (U >= 50) return null;
  return o4.default.createElement("span", null, U);
}
function Zi1({ session: $ }) {
  MZ();
  let q = $.busy.value;
  return o4.default.createElement(
    "div",
    { className: KJ.inputFooter },
    o4.default.createElement(FO1, { session: $ }),
    q && o4.default.createElement("span", null),
  );
}
"#;

/// Same footer with the container and its first child on one physical line
const PRETTIFIED_SAME_LINE_FOOTER: &str = r#"function Zi1({ session: $ }) {
  MZ();
  let q = $.busy.value;
  return o4.default.createElement("div", { className: KJ.inputFooter }, o4.default.createElement(FO1, { session: $ }));
}
"#;

pub(crate) const STYLESHEET: &str =
    ".inputFooter_gGYT1w{display:flex}\n.inputContainer_cKsPxg{border:1px solid}\n";

/// Pad a body past the line threshold so it classifies as prettified
pub(crate) fn pad_prettified(body: &str) -> String {
    format!("{}{}", body, "// bundle padding\n".repeat(PRETTIFIED_LINE_THRESHOLD))
}

pub(crate) fn prettified_bundle() -> String {
    pad_prettified(PRETTIFIED_BODY)
}

pub(crate) fn prettified_same_line_bundle() -> String {
    let (head, _) = PRETTIFIED_BODY
        .split_once("function Zi1(")
        .unwrap_or((PRETTIFIED_BODY, ""));
    pad_prettified(&format!("{}{}", head, PRETTIFIED_SAME_LINE_FOOTER))
}
