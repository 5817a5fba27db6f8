// Message formatting
// Telegram HTML parse mode; every dynamic value goes through `escape_html`

use common::{EnrichedSignal, RankedSignal};

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn code(value: impl std::fmt::Display) -> String {
    format!("<code>{}</code>", escape_html(&value.to_string()))
}

/// Full trade card for one enriched signal
pub fn format_trade_signal(enriched: &EnrichedSignal) -> String {
    let signal = &enriched.signal;
    let ind = signal.indicators();
    let factors = &enriched.factors;

    format!(
        "🚨 <b>SHORT SIGNAL IDENTIFIED</b> 🚨\n\n\
         <b>Symbol:</b> {}\n\
         <b>Entry:</b> {}\n\
         <b>Stop Loss:</b> {} ❌\n\
         <b>Take Profit:</b> {} ✅\n\n\
         📊 <b>Technical Indicators:</b>\n\
         • EMA Short: {}\n\
         • EMA Long: {}\n\
         • RSI: {}\n\
         • MACD: {} vs Signal: {}\n\
         • Volume: {} vs MA {}\n\n\
         🌐 <b>External Factors:</b>\n\
         • Sentiment: {} ({} news)\n\
         • Volume z-score: {}{}\n\n\
         Remember to manage your risk! 🛡️",
        code(signal.symbol()),
        code(format!("{:.4}", signal.entry_price())),
        code(format!("{:.4}", signal.stop_loss())),
        code(format!("{:.4}", signal.take_profit())),
        code(format!("{:.4}", ind.ema_short)),
        code(format!("{:.4}", ind.ema_long)),
        code(format!("{:.2}", ind.rsi)),
        code(format!("{:.4}", ind.macd)),
        code(format!("{:.4}", ind.macd_signal)),
        code(format!("{:.2}", ind.volume)),
        code(format!("{:.2}", ind.volume_ma)),
        escape_html(&factors.sentiment.to_string()),
        factors.news_count,
        code(format!("{:.2}", factors.anomalous_volume_z)),
        if factors.anomalous_volume { " ⚠️ anomalous" } else { "" },
    )
}

/// Trade card prefixed with the advisory header and rank
pub fn format_advisory(ranked: &RankedSignal) -> String {
    format!(
        "🤖 <b>AI suggestion #{}:</b>\n{}",
        ranked.rank,
        format_trade_signal(&ranked.signal)
    )
}

pub fn format_run_failure(reason: &str) -> String {
    format!("❌ <b>Screener error:</b> {}", escape_html(reason))
}

pub fn format_no_opportunities() -> String {
    "🤖 Screener run complete: no opportunities found.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{
        ExternalFactors, IndicatorSnapshot, RecentActivity, SentimentLabel, Signal, Symbol,
        TrendDirection,
    };

    fn enriched(symbol: &str) -> EnrichedSignal {
        EnrichedSignal {
            signal: Signal::new(
                Symbol::from(symbol),
                8.5914,
                10.1202,
                6.29820,
                IndicatorSnapshot {
                    rsi: 12.3456,
                    ema_short: 8.79844,
                    ..Default::default()
                },
            )
            .unwrap(),
            factors: ExternalFactors {
                sentiment: SentimentLabel::Negative,
                news_count: 3,
                anomalous_volume: true,
                anomalous_volume_z: 2.456,
            },
            recent: RecentActivity {
                avg_volume: 1500.0,
                direction: TrendDirection::Down,
            },
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b>&\"c\"'"), "a&lt;b&gt;&amp;&quot;c&quot;&#x27;");
        assert_eq!(escape_html("BTC_USDT"), "BTC_USDT");
    }

    #[test]
    fn test_trade_signal_card() {
        let text = format_trade_signal(&enriched("ARPA_USDT"));
        assert!(text.contains("<code>ARPA_USDT</code>"));
        assert!(text.contains("<b>Entry:</b> <code>8.5914</code>"));
        assert!(text.contains("<b>Take Profit:</b> <code>6.2982</code>"));
        assert!(text.contains("RSI: <code>12.35</code>"));
        assert!(text.contains("EMA Short: <code>8.7984</code>"));
        assert!(text.contains("Sentiment: negative (3 news)"));
        assert!(text.contains("<code>2.46</code> ⚠️ anomalous"));
    }

    #[test]
    fn test_symbol_is_escaped() {
        let text = format_trade_signal(&enriched("<X>"));
        assert!(text.contains("<code>&lt;X&gt;</code>"));
        assert!(!text.contains("<X>"));
    }

    #[test]
    fn test_advisory_prefix_and_failure_notice() {
        let ranked = RankedSignal {
            rank: 1,
            signal: enriched("ARPA_USDT"),
        };
        let text = format_advisory(&ranked);
        assert!(text.starts_with("🤖 <b>AI suggestion #1:</b>\n🚨"));

        assert_eq!(
            format_run_failure("universe <empty>"),
            "❌ <b>Screener error:</b> universe &lt;empty&gt;"
        );
    }
}
