//! Anchor discovery for build-generated identifiers
//!
//! The bundle is regenerated on every release, so the names we need to hook
//! into (the CSS module handle, the React handle, the footer component and so
//! on) change between builds. Each detector tries a strict pattern, then a
//! looser one, and returns `None` when neither matches. The policy table in
//! [`AnchorKind::fallback`] decides what `None` means for each anchor.

use super::{INJECTED_COMPONENT, JS_IDENT, SPLIT_MARKER};
use regex::Regex;
use serde::Serialize;
use std::fmt;

/// How far back from the footer container we look for its enclosing function
const LOOKBEHIND_WINDOW: usize = 5000;

/// The unstable identifiers the engine needs to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorKind {
    /// CSS module object holding the `inputFooter` class
    StyleModule,
    /// React namespace used for `createElement`
    RenderLibrary,
    /// First child component of the footer container
    FooterComponent,
    /// Signal hook called at the top of the footer function
    ReactivityHook,
    /// Function that renders the footer container
    EnclosingFunction,
}

/// What to do when detection fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Use a name that has been stable across known builds
    Default(&'static str),
    /// No safe guess exists
    Fail,
}

impl AnchorKind {
    pub const fn fallback(self) -> Fallback {
        match self {
            AnchorKind::StyleModule => Fallback::Default("WJ"),
            AnchorKind::RenderLibrary => Fallback::Default("n4"),
            AnchorKind::FooterComponent => Fallback::Default("dP1"),
            AnchorKind::ReactivityHook => Fallback::Default("_Z"),
            AnchorKind::EnclosingFunction => Fallback::Fail,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AnchorKind::StyleModule => "style module",
            AnchorKind::RenderLibrary => "render library",
            AnchorKind::FooterComponent => "footer component",
            AnchorKind::ReactivityHook => "reactivity hook",
            AnchorKind::EnclosingFunction => "enclosing function",
        }
    }
}

impl fmt::Display for AnchorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A resolved anchor: what was detected, and what the run will use
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anchor {
    pub kind: AnchorKind,
    pub detected: Option<String>,
}

impl Anchor {
    pub fn new(kind: AnchorKind, detected: Option<String>) -> Self {
        Self { kind, detected }
    }

    /// The identifier to use, falling back per policy. `None` only for
    /// anchors without a safe default.
    pub fn value(&self) -> Option<&str> {
        match (&self.detected, self.kind.fallback()) {
            (Some(name), _) => Some(name.as_str()),
            (None, Fallback::Default(name)) => Some(name),
            (None, Fallback::Fail) => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.detected.is_none()
    }
}

/// All anchors for one run, resolved once from the text as it was read
#[derive(Debug, Clone, Serialize)]
pub struct Anchors {
    pub style_module: Anchor,
    pub render_library: Anchor,
    pub footer_component: Anchor,
    pub reactivity_hook: Anchor,
    pub enclosing_function: Anchor,
}

impl Anchors {
    pub fn resolve(text: &str) -> Self {
        let style_module = Anchor::new(AnchorKind::StyleModule, detect_style_module(text));
        let style = value_or_default(&style_module).to_string();

        let anchors = Self {
            render_library: Anchor::new(
                AnchorKind::RenderLibrary,
                detect_render_library(text, &style),
            ),
            footer_component: Anchor::new(
                AnchorKind::FooterComponent,
                detect_footer_component(text, &style),
            ),
            reactivity_hook: Anchor::new(
                AnchorKind::ReactivityHook,
                detect_reactivity_hook(text, &style),
            ),
            enclosing_function: Anchor::new(
                AnchorKind::EnclosingFunction,
                detect_enclosing_function(text, &style),
            ),
            style_module,
        };

        for anchor in anchors.iter() {
            tracing::debug!(
                anchor = %anchor.kind,
                detected = ?anchor.detected,
                value = ?anchor.value(),
                "resolved anchor"
            );
        }

        anchors
    }

    pub fn iter(&self) -> impl Iterator<Item = &Anchor> {
        [
            &self.style_module,
            &self.render_library,
            &self.footer_component,
            &self.reactivity_hook,
            &self.enclosing_function,
        ]
        .into_iter()
    }

    pub fn style(&self) -> &str {
        value_or_default(&self.style_module)
    }

    pub fn react(&self) -> &str {
        value_or_default(&self.render_library)
    }

    pub fn footer_component(&self) -> &str {
        value_or_default(&self.footer_component)
    }

    pub fn hook(&self) -> &str {
        value_or_default(&self.reactivity_hook)
    }

    pub fn enclosing_function(&self) -> Option<&str> {
        self.enclosing_function.value()
    }
}

fn value_or_default(anchor: &Anchor) -> &str {
    anchor.value().unwrap_or_default()
}

/// Run a pattern and return its first capture group
fn first_capture(pattern: &str, text: &str) -> Option<String> {
    let re = Regex::new(pattern).ok()?;
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Detect the CSS module handle that owns `inputFooter`
pub fn detect_style_module(text: &str) -> Option<String> {
    first_capture(&format!(r"className:\s*({JS_IDENT})\.inputFooter\b"), text)
        .or_else(|| first_capture(&format!(r"({JS_IDENT})\.inputFooter\b"), text))
}

/// Detect the React handle that builds the footer container
pub fn detect_render_library(text: &str, style: &str) -> Option<String> {
    let style = regex::escape(style);
    let strict = format!(
        r#"return ({JS_IDENT})\.default\.createElement\("div",\{{className:{style}\.inputFooter\}}"#
    );
    let loose = format!(
        r#"({JS_IDENT})\.default\.createElement\(\s*"div",\s*\{{\s*className:\s*{JS_IDENT}\.inputFooter\s*\}}"#
    );
    first_capture(&strict, text).or_else(|| first_capture(&loose, text))
}

/// Detect the component rendered as the footer container's first child.
///
/// On an already patched bundle the first child is our own component, so the
/// search moves past the injected call to the element that follows it.
pub fn detect_footer_component(text: &str, style: &str) -> Option<String> {
    let style = regex::escape(style);
    let strict = format!(
        r"className:\s*{style}\.inputFooter\s*\}},\s*{JS_IDENT}\.default\.createElement\(\s*({JS_IDENT})"
    );
    let loose = format!(
        r"className:\s*{JS_IDENT}\.inputFooter\s*\}},\s*{JS_IDENT}\.default\.createElement\(\s*({JS_IDENT})"
    );

    let first = first_capture(&strict, text).or_else(|| first_capture(&loose, text))?;
    if first != INJECTED_COMPONENT {
        return Some(first);
    }

    let past_injected = format!(
        r"createElement\({INJECTED_COMPONENT}[^)]*\),(?:[ \t]*{})?\s*{JS_IDENT}\.default\.createElement\(\s*({JS_IDENT})",
        regex::escape(SPLIT_MARKER)
    );
    first_capture(&past_injected, text)
}

/// Byte offset of the footer container's class reference
pub fn footer_position(text: &str, style: &str) -> Option<usize> {
    text.find(&format!("className:{style}.inputFooter"))
        .or_else(|| text.find(&format!("className: {style}.inputFooter")))
}

/// The slice of text preceding `end`, at most [`LOOKBEHIND_WINDOW`] bytes
fn lookbehind(text: &str, end: usize) -> (usize, &str) {
    let mut start = end.saturating_sub(LOOKBEHIND_WINDOW);
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    (start, &text[start..end])
}

/// Detect the hook called first thing inside the footer function
pub fn detect_reactivity_hook(text: &str, style: &str) -> Option<String> {
    let footer = footer_position(text, style)?;
    let (start, chunk) = lookbehind(text, footer);

    let destructured = Regex::new(&format!(r"function {JS_IDENT}\(\{{[^}}]+\}}\)\s*\{{")).ok()?;
    let any_params = Regex::new(&format!(r"function {JS_IDENT}\([^)]+\)\s*\{{")).ok()?;

    let header = destructured
        .find_iter(chunk)
        .last()
        .or_else(|| any_params.find_iter(chunk).last())?;

    let body = &text[start + header.end()..];
    first_capture(&format!(r"^\s*({JS_IDENT})\(\)"), body)
}

/// Detect the name of the function that renders the footer container.
///
/// There is no safe default for this one; callers must treat `None` as fatal
/// for anything that injects next to it.
pub fn detect_enclosing_function(text: &str, style: &str) -> Option<String> {
    let footer = footer_position(text, style)?;
    let (_, chunk) = lookbehind(text, footer);

    let re = Regex::new(&format!(r"function ({JS_IDENT})\(")).ok()?;
    re.captures_iter(chunk)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::fixtures::{MINIFIED_BUNDLE, prettified_bundle};

    #[test]
    fn test_resolve_minified() {
        let anchors = Anchors::resolve(MINIFIED_BUNDLE);
        assert_eq!(anchors.style(), "KJ");
        assert_eq!(anchors.react(), "o4");
        assert_eq!(anchors.footer_component(), "FO1");
        assert_eq!(anchors.hook(), "MZ");
        assert_eq!(anchors.enclosing_function(), Some("Zi1"));
        assert!(anchors.iter().all(|a| !a.is_fallback()));
    }

    #[test]
    fn test_resolve_prettified() {
        let anchors = Anchors::resolve(&prettified_bundle());
        assert_eq!(anchors.style(), "KJ");
        assert_eq!(anchors.react(), "o4");
        assert_eq!(anchors.footer_component(), "FO1");
        assert_eq!(anchors.hook(), "MZ");
        assert_eq!(anchors.enclosing_function(), Some("Zi1"));
    }

    #[test]
    fn test_fallbacks_when_nothing_matches() {
        let anchors = Anchors::resolve("var a=1;function b(){return 2}");
        assert_eq!(anchors.style(), "WJ");
        assert_eq!(anchors.react(), "n4");
        assert_eq!(anchors.footer_component(), "dP1");
        assert_eq!(anchors.hook(), "_Z");
        assert_eq!(anchors.enclosing_function(), None);
        assert!(anchors.iter().all(|a| a.is_fallback()));
    }

    #[test]
    fn test_policy_table() {
        let anchors = Anchors::resolve("");
        for kind in anchors.iter().map(|a| a.kind) {
            let expect_fail = kind == AnchorKind::EnclosingFunction;
            assert_eq!(kind.fallback() == Fallback::Fail, expect_fail, "{kind}");
        }
    }

    #[test]
    fn test_dollar_prefixed_identifiers() {
        let text = r#"function $Yi({session:$}){$Q();return $r.default.createElement("div",{className:$W.inputFooter},$r.default.createElement($f1,{session:$}))}"#;
        let anchors = Anchors::resolve(text);
        assert_eq!(anchors.style(), "$W");
        assert_eq!(anchors.react(), "$r");
        assert_eq!(anchors.footer_component(), "$f1");
        assert_eq!(anchors.hook(), "$Q");
        assert_eq!(anchors.enclosing_function(), Some("$Yi"));
    }

    #[test]
    fn test_footer_component_skips_injected_call() {
        let text = r#"return o4.default.createElement("div",{className:KJ.inputFooter},o4.default.createElement(CC_MetricsBar, { session: $ }),o4.default.createElement(FO1,{session:$}))"#;
        assert_eq!(detect_footer_component(text, "KJ"), Some("FO1".into()));
    }

    #[test]
    fn test_footer_component_skips_injected_line() {
        let text = "    { className: KJ.inputFooter },\n    o4.default.createElement(CC_MetricsBar, { session: $ }),\n    o4.default.createElement(FO1, { session: $ }),\n";
        assert_eq!(detect_footer_component(text, "KJ"), Some("FO1".into()));
    }

    #[test]
    fn test_footer_component_skips_split_call() {
        let text = "  return o4.default.createElement(\"div\", { className: KJ.inputFooter }, \n    o4.default.createElement(CC_MetricsBar, { session: $ }), /* cc-metrics: split */\n    o4.default.createElement(FO1, { session: $ }));\n";
        assert_eq!(detect_footer_component(text, "KJ"), Some("FO1".into()));
    }

    #[test]
    fn test_hook_with_loose_parameters() {
        let text = r#"function Zi1(q){Hk();return o4.default.createElement("div",{className:KJ.inputFooter})}"#;
        assert_eq!(detect_reactivity_hook(text, "KJ"), Some("Hk".into()));
    }

    #[test]
    fn test_hook_absent_from_body() {
        let text = r#"function Zi1(q){let a=1;return o4.default.createElement("div",{className:KJ.inputFooter})}"#;
        assert_eq!(detect_reactivity_hook(text, "KJ"), None);
        assert_eq!(detect_enclosing_function(text, "KJ"), Some("Zi1".into()));
    }

    #[test]
    fn test_enclosing_function_outside_window() {
        let text = format!(
            "function Far(){{{}return 1}}x={{className:KJ.inputFooter}}",
            "a".repeat(LOOKBEHIND_WINDOW + 10)
        );
        assert_eq!(detect_enclosing_function(&text, "KJ"), None);
    }

    #[test]
    fn test_lookbehind_respects_char_boundaries() {
        let text = format!("{}function Zi1(){{className:KJ.inputFooter}}", "é".repeat(LOOKBEHIND_WINDOW));
        assert_eq!(detect_enclosing_function(&text, "KJ"), Some("Zi1".into()));
    }

    #[test]
    fn test_enclosing_function_after_injection() {
        // The injected definitions sit directly before the footer function
        let text = "function CC_MetricsBar({ session: S }) {\n  MZ();\n}\n\nfunction Zi1({session:$}){MZ();return o4.default.createElement(\"div\",{className:KJ.inputFooter})}";
        assert_eq!(detect_enclosing_function(text, "KJ"), Some("Zi1".into()));
        assert_eq!(detect_reactivity_hook(text, "KJ"), Some("MZ".into()));
    }
}
