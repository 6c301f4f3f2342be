use std::sync::Arc;
use std::time::Instant;

use crate::commands::{escape_json, CommandResult};
use replybot_core::config::{AppConfig, LoadOptions};
use replybot_core::{FixedPicker, InboundMessage, Intent, QuickActionMenu, Responder};
use serde::Serialize;

const PROPERTY_CHECKS: [&str; 6] = [
    "keyword_priority",
    "case_folding",
    "fallback_completeness",
    "catalog_totality",
    "menu_round_trip",
    "command_bypass",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SmokeStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: SmokeStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    command: &'static str,
    status: SmokeStatus,
    summary: String,
    total_elapsed_ms: u64,
    checks: Vec<SmokeCheck>,
}

pub fn run() -> CommandResult {
    let started = Instant::now();
    let mut checks = Vec::new();

    let config = match timed_check(|| AppConfig::load(LoadOptions::default())) {
        Ok((elapsed_ms, config)) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Pass,
                elapsed_ms,
                message: "configuration loaded and validated".to_string(),
            });
            config
        }
        Err((elapsed_ms, error)) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Fail,
                elapsed_ms,
                message: error.to_string(),
            });
            checks.push(skipped("catalog_templates"));
            checks.extend(PROPERTY_CHECKS.into_iter().map(skipped));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    let responder = match timed_check(|| Responder::from_config(&config)) {
        Ok((elapsed_ms, responder)) => {
            checks.push(SmokeCheck {
                name: "catalog_templates",
                status: SmokeStatus::Pass,
                elapsed_ms,
                message: "every intent rendered against the company profile".to_string(),
            });
            responder.with_picker(Arc::new(FixedPicker(0)))
        }
        Err((elapsed_ms, error)) => {
            checks.push(SmokeCheck {
                name: "catalog_templates",
                status: SmokeStatus::Fail,
                elapsed_ms,
                message: error.to_string(),
            });
            checks.extend(PROPERTY_CHECKS.into_iter().map(skipped));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    checks.push(property("keyword_priority", || check_priority(&responder)));
    checks.push(property("case_folding", || check_case_folding(&responder)));
    checks.push(property("fallback_completeness", || check_fallback(&responder)));
    checks.push(property("catalog_totality", || check_catalog_totality(&responder)));
    checks.push(property("menu_round_trip", || check_menu_round_trip(&responder)));
    checks.push(property("command_bypass", || check_command_bypass(&responder)));

    finalize_report(checks, started.elapsed().as_millis() as u64)
}

/// A message carrying keywords of two intents resolves to the higher-priority one.
fn check_priority(responder: &Responder) -> Result<String, String> {
    let sets = responder.keywords().sets();
    for pair in sets.windows(2) {
        let (earlier, later) = (&pair[0], &pair[1]);
        let (Some(earlier_keyword), Some(later_keyword)) =
            (earlier.keywords().first(), later.keywords().first())
        else {
            continue;
        };
        let text = format!("{later_keyword} {earlier_keyword}");
        let resolved = responder.classify(&text);
        if resolved == later.intent() {
            return Err(format!("`{text}` resolved to {resolved} ahead of {}", earlier.intent()));
        }
    }
    Ok(format!("{} keyword sets evaluated in priority order", sets.len()))
}

fn check_case_folding(responder: &Responder) -> Result<String, String> {
    for set in responder.keywords().sets() {
        let Some(keyword) = set.keywords().first() else {
            continue;
        };
        let lower = responder.classify(keyword);
        let upper = responder.classify(&keyword.to_uppercase());
        if lower != upper {
            return Err(format!("`{keyword}` resolved to {lower} but upper-cased to {upper}"));
        }
    }
    Ok("upper-cased keywords classify like their lower-case form".to_string())
}

fn check_fallback(responder: &Responder) -> Result<String, String> {
    for text in ["", "xyzzy plugh"] {
        let resolved = responder.classify(text);
        if resolved != Intent::Fallback {
            return Err(format!("`{text}` resolved to {resolved} instead of fallback"));
        }
    }
    Ok("empty and unmatched text fall back".to_string())
}

fn check_catalog_totality(responder: &Responder) -> Result<String, String> {
    for intent in Intent::ALL {
        let action = responder.handle(&message_resolving_to(intent));
        if action.text.trim().is_empty() {
            return Err(format!("{intent} rendered empty text"));
        }
        if action.menu != QuickActionMenu::standard() {
            return Err(format!("{intent} reply is missing the quick-action menu"));
        }
    }
    Ok(format!("{} intents render text with the quick-action menu", Intent::ALL.len()))
}

fn check_menu_round_trip(responder: &Responder) -> Result<String, String> {
    let menu = responder.catalog().menu();
    for label in menu.labels() {
        let expected = QuickActionMenu::intent_for(label)
            .ok_or_else(|| format!("menu label `{label}` does not name an intent"))?;
        let resolved = responder.classify(label);
        if resolved != expected {
            return Err(format!(
                "menu label `{label}` resolved to {resolved}, expected {expected}"
            ));
        }
    }
    Ok(format!("{} menu labels route back to their intents", menu.labels().count()))
}

fn check_command_bypass(responder: &Responder) -> Result<String, String> {
    let message = InboundMessage::command(0, "services").with_text("hello, how do I contact you");
    match responder.resolve(&message) {
        Intent::Services => Ok("explicit /services ignores keyword matches".to_string()),
        other => Err(format!("/services resolved to {other}")),
    }
}

/// Inbound message that resolves to `intent`. Unknown commands land on fallback.
fn message_resolving_to(intent: Intent) -> InboundMessage {
    match intent {
        Intent::Fallback => InboundMessage::command(0, "unknown"),
        other => InboundMessage::command(0, other.as_str()),
    }
}

fn property(name: &'static str, check: impl FnOnce() -> Result<String, String>) -> SmokeCheck {
    match timed_check(check) {
        Ok((elapsed_ms, message)) => {
            SmokeCheck { name, status: SmokeStatus::Pass, elapsed_ms, message }
        }
        Err((elapsed_ms, message)) => {
            SmokeCheck { name, status: SmokeStatus::Fail, elapsed_ms, message }
        }
    }
}

fn timed_check<T, E>(check: impl FnOnce() -> Result<T, E>) -> Result<(u64, T), (u64, E)> {
    let started = Instant::now();
    match check() {
        Ok(value) => Ok((started.elapsed().as_millis() as u64, value)),
        Err(error) => Err((started.elapsed().as_millis() as u64, error)),
    }
}

fn skipped(name: &'static str) -> SmokeCheck {
    SmokeCheck {
        name,
        status: SmokeStatus::Skipped,
        elapsed_ms: 0,
        message: "skipped due previous failure".to_string(),
    }
}

fn finalize_report(checks: Vec<SmokeCheck>, total_elapsed_ms: u64) -> CommandResult {
    let passed = checks.iter().filter(|check| check.status == SmokeStatus::Pass).count();
    let total = checks.len();
    let failed = checks.iter().any(|check| check.status == SmokeStatus::Fail);

    let report = SmokeReport {
        command: "smoke",
        status: if failed { SmokeStatus::Fail } else { SmokeStatus::Pass },
        summary: format!("smoke: {passed}/{total} checks passed in {total_elapsed_ms}ms"),
        total_elapsed_ms,
        checks,
    };

    let human = report.summary.clone();
    let machine = serde_json::to_string(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"smoke\",\"status\":\"fail\",\"summary\":\"serialization failed\",\"error\":\"{}\"}}",
            escape_json(&error.to_string())
        )
    });

    CommandResult { exit_code: if failed { 6 } else { 0 }, output: format!("{human}\n{machine}") }
}
