//! Browser and operating-system detection from a user-agent string.
//!
//! Rules are tried in order and the first match wins, so more specific
//! products (Edge, Opera, Samsung Internet) come before the engines they
//! embed (Chrome, Safari).

use regex::Regex;
use std::sync::OnceLock;

use crate::models::{BrowserInfo, UNKNOWN};

struct BrowserRule {
    regex: Regex,
    name: &'static str,
}

struct OsRule {
    regex: Regex,
    format: fn(Option<&str>) -> String,
}

const BROWSER_PATTERNS: &[(&str, &str)] = &[
    (r"Edg(?:e|A|iOS)?/([\d.]+)", "Edge"),
    (r"(?:OPR|Opera)/([\d.]+)", "Opera"),
    (r"SamsungBrowser/([\d.]+)", "Samsung Internet"),
    (r"(?:Firefox|FxiOS)/([\d.]+)", "Firefox"),
    (r"(?:Chrome|CriOS)/([\d.]+)", "Chrome"),
    (r"Version/([\d.]+).*Safari/", "Safari"),
    (r"MSIE ([\d.]+)", "Internet Explorer"),
    (r"Trident/.*rv:([\d.]+)", "Internet Explorer"),
];

static BROWSER_RULES: OnceLock<Vec<BrowserRule>> = OnceLock::new();
static OS_RULES: OnceLock<Vec<OsRule>> = OnceLock::new();

fn browser_rules() -> &'static [BrowserRule] {
    BROWSER_RULES.get_or_init(|| {
        BROWSER_PATTERNS
            .iter()
            .filter_map(|(pattern, name)| {
                Regex::new(pattern)
                    .ok()
                    .map(|regex| BrowserRule { regex, name: *name })
            })
            .collect()
    })
}

fn os_rules() -> &'static [OsRule] {
    OS_RULES.get_or_init(|| {
        let patterns: [(&str, fn(Option<&str>) -> String); 6] = [
            (r"Windows NT ([\d.]+)", windows_name),
            (r"(?:iPhone|iPad|iPod).*? OS ([\d_]+)", ios_name),
            (r"Mac OS X ([\d_.]+)", macos_name),
            (r"Android ([\d.]+)", android_name),
            (r"CrOS", chrome_os_name),
            (r"Linux", linux_name),
        ];
        patterns
            .into_iter()
            .filter_map(|(pattern, format)| {
                Regex::new(pattern).ok().map(|regex| OsRule { regex, format })
            })
            .collect()
    })
}

fn versioned(name: &str, version: Option<&str>) -> String {
    match version {
        Some(v) if !v.is_empty() => format!("{name} {}", v.replace('_', ".")),
        _ => name.to_string(),
    }
}

fn ios_name(version: Option<&str>) -> String {
    versioned("iOS", version)
}

fn macos_name(version: Option<&str>) -> String {
    versioned("macOS", version)
}

fn android_name(version: Option<&str>) -> String {
    versioned("Android", version)
}

fn chrome_os_name(_: Option<&str>) -> String {
    "Chrome OS".to_string()
}

fn linux_name(_: Option<&str>) -> String {
    "Linux".to_string()
}

fn windows_name(version: Option<&str>) -> String {
    match version {
        Some("10.0") => "Windows 10".into(),
        Some("6.3") => "Windows 8.1".into(),
        Some("6.2") => "Windows 8".into(),
        Some("6.1") => "Windows 7".into(),
        _ => "Windows".into(),
    }
}

pub fn parse_browser(user_agent: &str) -> BrowserInfo {
    for rule in browser_rules() {
        if let Some(captures) = rule.regex.captures(user_agent) {
            let version = captures
                .get(1)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| UNKNOWN.to_string());
            return BrowserInfo {
                name: rule.name.to_string(),
                version,
            };
        }
    }
    BrowserInfo::unknown()
}

pub fn parse_os(user_agent: &str) -> Option<String> {
    os_rules().iter().find_map(|rule| {
        rule.regex
            .captures(user_agent)
            .map(|captures| (rule.format)(captures.get(1).map(|m| m.as_str())))
    })
}
