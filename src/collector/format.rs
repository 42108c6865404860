//! Renders a snapshot into the labelled text block appended to the persona
//! prompt. Labels and their order are stable; downstream consumers parse them.

use std::fmt::Write;

use crate::models::{AllData, ConnectionSpeed, EnhancedData, UNKNOWN};

const BASIC_HEADER: &str = "# Visitor Context";
const ENHANCED_HEADER: &str = "# Enhanced Visitor Context";

pub fn format_for_prompt(data: &AllData) -> String {
    let mut out = String::new();
    out.push_str("\n\n");
    out.push_str(BASIC_HEADER);
    out.push('\n');

    let basic = data.basic.as_ref();
    line(&mut out, "Device", basic.and_then(|b| known(b.device_type.as_str())));
    line(
        &mut out,
        "Browser",
        basic
            .filter(|b| b.browser.is_known())
            .map(|b| b.browser.to_string()),
    );
    line(&mut out, "Screen Size", basic.and_then(|b| b.screen.size_label()));
    line(&mut out, "Time Zone", basic.and_then(|b| known(&b.time_zone)));
    line(&mut out, "Language", basic.and_then(|b| known(&b.language)));
    line(
        &mut out,
        "Dark Mode",
        basic.and_then(|b| b.dark_mode).map(|dark| yes_no(dark).to_string()),
    );
    line(
        &mut out,
        "Connection Speed",
        basic
            .map(|b| b.connection_speed)
            .filter(|speed| *speed != ConnectionSpeed::Unknown)
            .map(|speed| speed.as_str().to_string()),
    );
    line(
        &mut out,
        "Visit Time",
        basic.map(|b| b.visit_time.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
    );
    line(&mut out, "Referrer", basic.and_then(|b| known(&b.referrer)));

    if data.is_enhanced_mode {
        if let Some(enhanced) = &data.enhanced {
            out.push('\n');
            out.push_str(ENHANCED_HEADER);
            out.push('\n');
            enhanced_lines(&mut out, enhanced);
        }
    }

    out
}

fn enhanced_lines(out: &mut String, enhanced: &EnhancedData) {
    line(out, "Location", enhanced.location.as_ref().map(ToString::to_string));
    line(
        out,
        "Session Duration",
        enhanced.session_duration_secs.map(|secs| format!("{secs} seconds")),
    );
    line(
        out,
        "Typing Speed",
        enhanced
            .interaction
            .as_ref()
            .map(|m| format!("{:.0} keystrokes per minute", m.keystrokes_per_minute)),
    );
    line(
        out,
        "Operating System",
        enhanced.operating_system.as_deref().and_then(known),
    );
    line(
        out,
        "Connection Type",
        enhanced.connection_type.as_deref().and_then(known),
    );
    line(
        out,
        "Device Capabilities",
        enhanced.device_capabilities.map(|caps| caps.to_string()),
    );
    line(
        out,
        "Battery Status",
        enhanced.battery.as_ref().map(ToString::to_string),
    );
}

fn line(out: &mut String, label: &str, value: Option<String>) {
    let value = value.unwrap_or_else(|| "Unknown".to_string());
    // Writing into a String cannot fail.
    let _ = writeln!(out, "- {label}: {value}");
}

fn known(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty() && trimmed != UNKNOWN).then(|| trimmed.to_string())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}
