/// Message rendering for the chat transport (Telegram HTML)

use chrono::{DateTime, Utc};

use crate::analytics::performance_tracker::{CallPerformance, PerformanceOutcome, PerformanceReport, PriceLookup};
use crate::config::Config;
use crate::core::types::Signal;
use crate::util::dexscreener::TokenPair;

pub const ANALYZING_NOTICE: &str = "📊 Analyzing call performance...\nFetching current prices from DexScreener...";

/// Escape the characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Format a number with thousands separators and a fixed number of decimals.
pub fn with_commas(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }

    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') { "-" } else { "" };
    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

/// Human readable deployment age.
pub fn format_age(created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(created_at) = created_at else {
        return "Unknown".to_string();
    };

    let minutes = now.signed_duration_since(created_at).num_seconds() as f64 / 60.0;
    if minutes < 60.0 {
        format!("{} minutes ago", minutes.max(0.0) as i64)
    } else if minutes < 1440.0 {
        format!("{:.1} hours ago", minutes / 60.0)
    } else {
        format!("{:.1} days ago", minutes / 1440.0)
    }
}

fn dexscreener_url(pair: &TokenPair) -> String {
    pair.url
        .clone()
        .unwrap_or_else(|| format!("https://dexscreener.com/{}/{}", pair.chain_id, pair.pair_address))
}

pub fn format_signal_alert(signal: &Signal, now: DateTime<Utc>) -> String {
    let pair = &signal.pair;
    let metrics = &signal.metrics;
    let name = if pair.base_token.name.is_empty() { "Unknown" } else { pair.base_token.name.as_str() };
    let buys_5m = pair.buys_5m();

    let mut message = format!("<b>{}</b>\n\n", signal.tier.label());
    message.push_str(&format!("<b>{} (${})</b>\n\n", escape_html(name), escape_html(pair.symbol())));

    message.push_str(&format!(
        "Recent buys: <b>{}</b> | Vol: <b>{} {}</b> | Average: <b>{:.2}</b>\n",
        metrics.recent_buys,
        with_commas(metrics.volume_estimate, 2),
        escape_html(pair.quote_symbol()),
        metrics.avg_buy_size
    ));
    message.push_str(&format!("FR: <b>{}</b> | TR: <b>{}</b>\n\n", buys_5m, buys_5m + pair.sells_5m()));

    message.push_str(&format!("💰 Market cap: <b>{} $</b>\n", with_commas(pair.market_cap_usd(), 0)));
    message.push_str(&format!("<a href=\"{}\">DexScreener</a>\n", escape_html(&dexscreener_url(pair))));
    message.push_str(&format!("CA: <code>{}</code>\n\n", escape_html(&pair.base_token.address)));

    message.push_str(&format!("💧 Liquidity: <b>${}</b>\n", with_commas(pair.liquidity_usd(), 0)));
    message.push_str(&format!("💵 Price: <b>${:.10}</b>\n\n", pair.price_usd_value().unwrap_or(0.0)));

    message.push_str(&format!("⏰ Token deployed: <b>{}</b>", format_age(pair.created_at(), now)));
    message
}

pub fn format_welcome(config: &Config) -> String {
    let tiers = &config.tiers;
    format!(
        "🤖 <b>Smart Money Tracker Bot</b>\n\n\
        ✅ You're now subscribed to real-time alerts!\n\n\
        I automatically scan for volume spikes and smart money activity on {chain}.\n\n\
        <b>Signal Tiers:</b>\n\
        🔔 First Call - {fc_buys}+ buys, ${fc_vol} volume\n\
        💎 Medium - {md_buys}+ buys, ${md_vol} volume\n\
        💎 Strong - {st_buys}+ buys, ${st_vol} volume\n\
        💎 Very Strong - {vs_buys}+ buys OR ${vs_vol} volume\n\n\
        Scanning every {interval} seconds...\n\n\
        <b>Commands:</b>\n\
        /stats - Quick call performance\n\
        /performance - Full performance report\n\
        /stop - Unsubscribe from alerts",
        chain = escape_html(&config.scanner.chain_id),
        fc_buys = tiers.first_call.min_recent_buys,
        fc_vol = with_commas(tiers.first_call.min_volume, 0),
        md_buys = tiers.medium.min_recent_buys,
        md_vol = with_commas(tiers.medium.min_volume, 0),
        st_buys = tiers.strong.min_recent_buys,
        st_vol = with_commas(tiers.strong.min_volume, 0),
        vs_buys = tiers.very_strong.min_recent_buys,
        vs_vol = with_commas(tiers.very_strong.min_volume, 0),
        interval = config.scanner.interval_secs,
    )
}

pub fn format_goodbye() -> String {
    "🛑 <b>Alerts Stopped</b>\n\n\
    You've been unsubscribed from alerts.\n\n\
    Use /start to subscribe again."
        .to_string()
}

pub fn format_no_calls() -> String {
    "📊 <b>No Calls Yet</b>\n\n\
    No calls have been made yet. Wait for the bot to detect signals!"
        .to_string()
}

pub fn format_prices_unavailable(attempted: usize) -> String {
    format!(
        "❌ <b>Unable to Fetch Prices</b>\n\n\
        Couldn't retrieve current prices for {} called token{}.",
        attempted,
        if attempted == 1 { "" } else { "s" }
    )
}

fn outcome_emoji(entry: &CallPerformance) -> &'static str {
    if entry.is_profitable() {
        "🟢"
    } else {
        "🔴"
    }
}

fn format_stats(report: &PerformanceReport) -> String {
    let mut message = String::from("<b>📊 CALL PERFORMANCE STATS</b>\n\n");
    message.push_str(&format!("Total Calls: <b>{}</b>\n", report.summary.count));
    message.push_str(&format!("Average Gain: <b>{:+.2}%</b>\n\n", report.summary.average_gain_pct));
    message.push_str("<b>Top Performers:</b>\n\n");

    for (i, entry) in report.top.iter().enumerate() {
        message.push_str(&format!("{}. {} <b>{}</b>\n", i + 1, outcome_emoji(entry), escape_html(&entry.symbol)));
        message.push_str(&format!("   Tier: {}\n", entry.tier.label()));
        message.push_str(&format!("   Gain: <b>{:+.2}%</b>\n", entry.gain_pct));
        message.push_str(&format!("   Time: {:.1}h ago\n\n", entry.hours_since_call));
    }

    message.trim_end().to_string()
}

fn format_full(report: &PerformanceReport) -> String {
    let summary = &report.summary;
    let mut message = String::from("<b>📊 CALL PERFORMANCE REPORT</b>\n\n");
    message.push_str("<b>Statistics:</b>\n");
    message.push_str(&format!("Total Calls: <b>{}</b>\n", summary.count));
    message.push_str(&format!(
        "Profitable: <b>{}/{}</b> ({:.1}%)\n",
        summary.profitable,
        summary.count,
        summary.win_rate_pct()
    ));
    message.push_str(&format!("Avg Change: <b>{:+.2}%</b>\n", summary.average_gain_pct));
    message.push_str(&format!("Best: <b>{:+.2}%</b>\n", summary.best_gain_pct));
    message.push_str(&format!("Worst: <b>{:+.2}%</b>\n\n", summary.worst_gain_pct));

    message.push_str("<b>Recent Calls:</b>\n");
    for (i, entry) in report.top.iter().enumerate() {
        message.push_str(&format!("\n{}. {} <b>{}</b>\n", i + 1, outcome_emoji(entry), escape_html(&entry.symbol)));
        message.push_str(&format!("   {}\n", entry.tier.label()));
        message.push_str(&format!("   Change: <b>{:+.2}%</b>\n", entry.gain_pct));
        message.push_str(&format!("   Called: {:.1}h ago\n", entry.hours_since_call));
        message.push_str(&format!("   ${:.8} → ${:.8}\n", entry.initial_price, entry.current_price));
    }

    if report.remaining > 0 {
        message.push_str(&format!("\n<i>... and {} more calls</i>", report.remaining));
    }

    message.trim_end().to_string()
}

/// Render any analyzer outcome. Pair lookups get the compact layout.
pub fn format_performance(outcome: &PerformanceOutcome) -> String {
    match outcome {
        PerformanceOutcome::NoCalls => format_no_calls(),
        PerformanceOutcome::PricesUnavailable { attempted } => format_prices_unavailable(*attempted),
        PerformanceOutcome::Report(report) => match report.lookup {
            PriceLookup::ByPair => format_stats(report),
            PriceLookup::ByToken => format_full(report),
        },
    }
}
