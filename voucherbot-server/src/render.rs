//! voucherbot-server/src/render.rs
//!
//! Plain-text rendering of the core's semantic replies and notices for the
//! console transport.

use std::fmt::Write;
use std::time::Duration;

use voucherbot_common::models::{CycleReport, Notice, ScanReport, ScanResult, SessionId};
use voucherbot_core::services::command_service::{ButtonAction, CommandReply};

/// Minutes with one decimal, e.g. `1.3 min`.
fn minutes(d: Duration) -> String {
    format!("{:.1} min", d.as_secs_f64() / 60.0)
}

fn bullet_list(out: &mut String, items: &[String]) {
    for item in items {
        let _ = writeln!(out, "  • {item}");
    }
}

pub fn render_reply(session: &SessionId, reply: &CommandReply) -> String {
    match reply {
        CommandReply::Help { check_delay, interval } => render_help(*check_delay, *interval),
        CommandReply::Usage(usage) => format!("Usage: {usage}"),
        CommandReply::Added(outcome) => {
            let mut out = format!("✅ Added {} codes", outcome.added.len());
            if !outcome.skipped.is_empty() {
                let _ = write!(out, ", skipped {} duplicates", outcome.skipped.len());
            }
            let _ = write!(out, "\n📦 Total protected: {}", outcome.total);
            if !outcome.added.is_empty() {
                out.push_str("\n\nAdded:\n");
                bullet_list(&mut out, &outcome.added);
            }
            out.trim_end().to_string()
        }
        CommandReply::ProtectionStarted { added, active, scan_estimate, cycle_estimate } => {
            let mut out = String::from("🛡️ Protection started!\n");
            let _ = writeln!(out, "📦 Protecting {active} code(s)");
            let _ = writeln!(out, "⚡ Scan time: ~{}", minutes(*scan_estimate));
            let _ = writeln!(out, "🔁 Full cycle every ~{}", minutes(*cycle_estimate));
            if let Some(outcome) = added.as_ref().filter(|o| !o.added.is_empty()) {
                out.push_str("\nCodes added:\n");
                bullet_list(&mut out, &outcome.added);
            }
            out.push_str("\nUse /stop to stop.");
            out
        }
        CommandReply::AddedToRunningLoop(outcome) => {
            let mut out = format!(
                "✅ Added {} code(s) to the active protection loop",
                outcome.added.len()
            );
            if !outcome.skipped.is_empty() {
                let _ = write!(out, ", skipped {} already protected", outcome.skipped.len());
            }
            let _ = write!(out, "\n📦 Total codes now: {}", outcome.total);
            if !outcome.added.is_empty() {
                out.push_str("\n\nAdded:\n");
                bullet_list(&mut out, &outcome.added);
            }
            out.trim_end().to_string()
        }
        CommandReply::AlreadyRunning => "🛡️ Protection is already running! Use /stop first.".into(),
        CommandReply::NothingToProtect => "⚠️ No codes to protect. Use /add first.".into(),
        CommandReply::Stopped => "🛑 Protection stopped.".into(),
        CommandReply::NotRunning => "ℹ️ Protection is not currently running.".into(),
        CommandReply::Paused(code) => format!("⏸ {code} paused, will be skipped during scans."),
        CommandReply::Resumed(code) => format!("▶️ {code} resumed."),
        CommandReply::UnknownCode(code) => format!("❌ {code} is not in the protection list."),
        CommandReply::Listing(listing) => {
            if listing.codes.is_empty() {
                return "📭 No codes in the list. Use /add to add some.".into();
            }
            let mut out = String::from("📋 Protected codes:\n");
            for c in &listing.codes {
                let (icon, state) = if c.paused { ("⏸", "paused") } else { ("🔒", "protected") };
                let _ = writeln!(out, "  {icon} {} ₹{} ({state})", c.code, c.value);
            }
            let _ = writeln!(
                out,
                "\n🛡️ Protection: {}",
                if listing.running { "🟢 RUNNING" } else { "🔴 STOPPED" }
            );
            let _ = write!(out, "📦 Total: {} codes", listing.codes.len());
            out
        }
        CommandReply::Cleared(count) => format!("🗑️ Cleared all {count} codes."),
        CommandReply::Status(s) => format!(
            "📊 Bot status\n\n🍪 Cookies: {}\n📦 Total codes: {}\n🔒 Protected: {}\n⏸ Paused: {}\n🛡️ Protection: {}\n⏱ Interval: {} between cycles",
            if s.credential_loaded { "✅ loaded" } else { "❌ missing (every check reports a network error)" },
            s.total,
            s.active,
            s.paused,
            if s.running { "🟢 RUNNING" } else { "🔴 STOPPED" },
            minutes(Duration::from_secs(s.interval_secs)),
        ),
        CommandReply::CheckBusy => "⚠️ A check is already running, please wait.".into(),
        CommandReply::CheckResults(report) => render_check_results(session, report),
        CommandReply::UnknownCommand(name) => format!("❓ Unknown command /{name}. Try /help."),
        CommandReply::Ignored => String::new(),
    }
}

fn render_help(check_delay: Duration, interval: Duration) -> String {
    let fifty = check_delay.saturating_mul(50);
    format!(
        "🛡️ Voucher bot\n\n\
         Commands:\n\
         /add <codes>      add codes to the protection list\n\
         /protect <codes>  add codes and start protecting right away\n\
         /check <codes>    one-time check (plain text works too)\n\
         /run              start the protection loop\n\
         /stop             stop the protection loop\n\
         /pause <code>     skip a code during scans\n\
         /resume <code>    re-enable a paused code\n\
         /list             show all codes\n\
         /clear            remove all codes\n\
         /status           show bot status\n\n\
         ⚡ Speed: 50 codes ≈ {}s\n\
         🔁 Full cycle: scan + {} wait",
        fifty.as_secs(),
        minutes(interval)
    )
}

fn valued(results: &[ScanResult]) -> Vec<String> {
    results.iter().map(|r| format!("{} ₹{}", r.code, r.value)).collect()
}

fn codes_of(results: &[ScanResult]) -> Vec<String> {
    results.iter().map(|r| r.code.clone()).collect()
}

fn render_check_results(session: &SessionId, report: &ScanReport) -> String {
    let mut out = String::from("📊 INSTANT CHECK RESULTS\n\n");

    let _ = writeln!(out, "✅ WORKING ({}):", report.alive.len());
    if report.alive.is_empty() {
        out.push_str("  None\n");
    }
    bullet_list(&mut out, &valued(&report.alive));

    let _ = writeln!(out, "\n❌ DEAD/USED ({}):", report.dead.len());
    if report.dead.is_empty() {
        out.push_str("  None\n");
    }
    bullet_list(&mut out, &codes_of(&report.dead));

    if !report.errors.is_empty() {
        let _ = writeln!(out, "\n⚠️ Network error, try again ({}):", report.errors.len());
        bullet_list(&mut out, &codes_of(&report.errors));
    }

    let buttons = protect_buttons(session, report);
    if !buttons.is_empty() {
        out.push_str("\nPaste a line below to protect:\n");
        for b in buttons {
            let _ = writeln!(out, "  {b}");
        }
    }
    out.trim_end().to_string()
}

/// One "protect" payload per alive code, plus a "protect all" payload in front
/// when more than one code is alive.
pub fn protect_buttons(session: &SessionId, report: &ScanReport) -> Vec<String> {
    let alive = report.alive_codes();
    let mut buttons: Vec<String> = alive
        .iter()
        .map(|code| {
            ButtonAction::ProtectOne { session: session.clone(), code: code.clone() }.encode()
        })
        .collect();
    if alive.len() > 1 {
        let all = ButtonAction::ProtectAll { session: session.clone(), codes: alive }.encode();
        buttons.insert(0, all);
    }
    buttons
}

fn render_cycle_report(report: &CycleReport) -> String {
    let scan = &report.scan;
    let mut out = format!("🔁 Cycle #{} done\n", report.cycle);
    if !scan.alive.is_empty() {
        let _ = writeln!(out, "\n✅ ALIVE ({}):", scan.alive.len());
        bullet_list(&mut out, &valued(&scan.alive));
    }
    if !scan.dead.is_empty() {
        let _ = writeln!(out, "\n❌ DEAD/USED ({}):", scan.dead.len());
        let lines: Vec<String> = scan
            .dead
            .iter()
            .map(|r| format!("{}, still rescanning next cycle", r.code))
            .collect();
        bullet_list(&mut out, &lines);
    }
    if !scan.errors.is_empty() {
        let _ = writeln!(out, "\n⚠️ Network error, retrying next cycle ({}):", scan.errors.len());
        bullet_list(&mut out, &codes_of(&scan.errors));
    }
    let _ = writeln!(out, "\n⏰ Next scan: {}", report.next_scan_at.format("%H:%M:%S"));
    let _ = write!(out, "📦 Remaining: {} codes", report.registry_size);
    out
}

pub fn render_notice(notice: &Notice) -> String {
    match notice {
        Notice::CheckStarted { count } => format!("🔍 Checking {count} voucher(s)... Please wait."),
        Notice::CycleStarted { cycle, active } => {
            format!("🔄 Cycle #{cycle}, scanning {active} codes...")
        }
        Notice::CycleReport(report) => render_cycle_report(report),
        Notice::NoActiveCodes => {
            "⚠️ No active codes to protect.\nAdd codes with /add or resume with /resume.".into()
        }
        Notice::ProtectionCrashed { error } => {
            format!("❌ Protection crashed:\n{error}\n\nRestart with /run")
        }
    }
}
