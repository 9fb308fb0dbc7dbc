use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style};

use crate::format::{
    format_cost, format_date, format_duration, format_number, format_percent, truncate,
};
use crate::models::ClaudeStats;

const TOP_N: usize = 10;
pub const STATS_FILE: &str = "stats.json";

pub fn print_summary(stats: &ClaudeStats) {
    println!();
    println!(
        "{}  {} projects  {} sessions  {} messages  {} tool calls",
        "Claude Stats".bold().cyan(),
        stats.total_projects.to_string().bold(),
        format_number(stats.total_sessions).bold(),
        format_number(stats.total_messages).bold(),
        format_number(stats.total_tool_calls).bold(),
    );

    if let (Some(first), Some(last)) = (&stats.first_session_date, &stats.last_computed_date) {
        println!("  {} to {}", format_date(first), format_date(last));
    }
    if let Some(longest) = &stats.longest_session {
        println!(
            "  Longest session: {} over {} messages",
            format_duration(longest.duration_ms as f64).bold(),
            longest.message_count,
        );
    }
    if let Some(cost) = &stats.cost_estimate {
        println!(
            "  Estimated cost: {}  (cache saved {})",
            format_cost(cost.total_cost_usd).bold().green(),
            format_cost(cost.cache_savings_usd).green(),
        );
    }
    if let Some(cache) = &stats.cache_metrics {
        println!(
            "  Cache hit ratio: {}  ({} tokens read from cache)",
            format_percent(cache.cache_hit_ratio).bold(),
            format_number(cache.total_cache_read_tokens),
        );
    }
    println!();

    if !stats.project_stats.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["Project", "Sessions", "Messages", "Last Session"]);
        for p in stats.project_stats.iter().take(TOP_N) {
            builder.push_record([
                truncate(&p.name, 40),
                p.session_count.to_string(),
                format_number(p.message_count),
                p.last_session.as_deref().map(format_date).unwrap_or_default(),
            ]);
        }
        println!("{}", builder.build().with(Style::rounded()));
        println!();
    }

    if !stats.tool_usage.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["Tool", "Category", "Calls"]);
        for t in stats.tool_usage.iter().take(TOP_N) {
            builder.push_record([
                truncate(&t.name, 40),
                format!("{:?}", t.category).to_lowercase(),
                format_number(t.count),
            ]);
        }
        println!("{}", builder.build().with(Style::rounded()));
        println!();
    }

    if !stats.tool_success_rates.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["Tool", "Calls", "Errors", "Success"]);
        for r in stats.tool_success_rates.iter().take(TOP_N) {
            let rate = format_percent(r.success_rate);
            let rate = if r.success_rate < 0.9 {
                rate.yellow().to_string()
            } else {
                rate
            };
            builder.push_record([
                truncate(&r.tool_name, 40),
                format_number(r.total_calls),
                format_number(r.error_count),
                rate,
            ]);
        }
        println!("{}", builder.build().with(Style::rounded()));
        println!();
    }
}

pub fn to_json(stats: &ClaudeStats) -> Result<String> {
    serde_json::to_string_pretty(stats).context("Failed to serialize stats")
}

pub fn print_json(stats: &ClaudeStats) -> Result<()> {
    println!("{}", to_json(stats)?);
    Ok(())
}

/// Write `stats.json` into `dir`, creating it if needed.
pub fn export_json(stats: &ClaudeStats, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let path = dir.join(STATS_FILE);
    fs::write(&path, to_json(stats)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
