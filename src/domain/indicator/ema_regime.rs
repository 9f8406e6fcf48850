//! EMA regime strategy as a single composite indicator.
//!
//! A long-term regime EMA decides which side is tradable; entries on that
//! side come from price reclaiming the fast EMA (pullback) or the fast EMA
//! crossing the slow one (trend). Entries are suppressed when price is
//! stretched more than `max_extension` ATRs from the fast EMA or volume does
//! not reach `volume_multiplier` × its average. Without high/low or volume
//! the corresponding filter passes.
//!
//! Each active flag is worth 0.5: long entries and a golden cross add,
//! short entries and a death cross subtract.

use crate::domain::error::ScanError;
use crate::domain::indicator::cross::{crossed_above_last, crossed_below_last};
use crate::domain::indicator::math::{atr, ema, last, lift, sma};
use crate::domain::indicator::{
    flag, show, Indicator, IndicatorConfig, IndicatorReading, IndicatorSchema, IndicatorSnapshot,
    ParamSpec,
};
use crate::domain::ohlcv::{PriceColumn, TimeSeries};

pub const ID: &str = "ema_regime";

const FLAG_WEIGHT: f64 = 0.5;

const FLAGS: [&str; 10] = [
    "long_regime",
    "short_regime",
    "not_extended",
    "volume_ok",
    "long_pullback_entry",
    "long_trend_entry",
    "short_pullback_entry",
    "short_trend_entry",
    "golden_cross",
    "death_cross",
];

pub fn schema() -> IndicatorSchema {
    IndicatorSchema {
        label: "EMA Regime",
        description: "Regime-filtered EMA pullback and trend entries with ATR and volume gates",
        params: vec![
            ParamSpec::window("fast", 9, "Fast EMA length"),
            ParamSpec::window("slow", 21, "Slow EMA length"),
            ParamSpec::window("mid", 50, "Mid EMA length"),
            ParamSpec::window("regime", 200, "Regime EMA length"),
            ParamSpec::window("atr_window", 14, "ATR length for the extension filter"),
            ParamSpec::real(
                "max_extension",
                2.0,
                0.0,
                None,
                "Maximum distance from the fast EMA, in ATRs",
            ),
            ParamSpec::window("volume_window", 20, "Volume SMA length"),
            ParamSpec::real(
                "volume_multiplier",
                1.2,
                0.0,
                None,
                "Volume required relative to its average",
            ),
        ],
    }
}

pub struct EmaRegime;

struct Params {
    fast: usize,
    slow: usize,
    mid: usize,
    regime: usize,
    atr_window: usize,
    max_extension: f64,
    volume_window: usize,
    volume_multiplier: f64,
}

fn params(config: &IndicatorConfig) -> Result<Params, ScanError> {
    let p = Params {
        fast: config.window("fast")?,
        slow: config.window("slow")?,
        mid: config.window("mid")?,
        regime: config.window("regime")?,
        atr_window: config.window("atr_window")?,
        max_extension: config.get("max_extension")?,
        volume_window: config.window("volume_window")?,
        volume_multiplier: config.get("volume_multiplier")?,
    };
    if p.fast >= p.slow {
        return Err(config.inconsistent(
            "fast",
            format!("must be below slow ({} >= {})", p.fast, p.slow),
        ));
    }
    if p.slow >= p.regime || p.mid >= p.regime {
        return Err(config.inconsistent(
            "regime",
            format!("must exceed slow and mid ({} / {} / {})", p.slow, p.mid, p.regime),
        ));
    }
    Ok(p)
}

fn ema_names(p: &Params) -> [String; 4] {
    [p.fast, p.slow, p.mid, p.regime].map(|n| format!("ema_{}", n))
}

fn neutral(p: &Params) -> IndicatorReading {
    let names = ema_names(p).into_iter().chain(
        ["atr", "extension", "volume_ratio"]
            .into_iter()
            .chain(FLAGS)
            .map(String::from),
    );
    IndicatorReading::neutral(names)
}

impl Indicator for EmaRegime {
    fn min_history(&self, config: &IndicatorConfig) -> Result<usize, ScanError> {
        Ok(params(config)?.regime + 1)
    }

    fn compute(
        &self,
        series: &TimeSeries,
        column: PriceColumn,
        config: &IndicatorConfig,
    ) -> Result<IndicatorReading, ScanError> {
        let p = params(config)?;
        let prices = match series.column(column) {
            Some(v) if v.len() > p.regime => v,
            _ => return Ok(neutral(&p)),
        };

        let price_line = lift(&prices);
        let fast = ema(&prices, p.fast);
        let slow = ema(&prices, p.slow);
        let mid = ema(&prices, p.mid);
        let regime = ema(&prices, p.regime);

        let price = prices[prices.len() - 1];
        let (Some(fast_now), Some(slow_now), Some(mid_now), Some(regime_now)) =
            (last(&fast), last(&slow), last(&mid), last(&regime))
        else {
            return Ok(neutral(&p));
        };

        let long_regime = price > regime_now && mid_now > regime_now;
        let short_regime = price < regime_now && mid_now < regime_now;

        let atr_now = series
            .true_ranges()
            .and_then(|tr| last(&atr(&tr, p.atr_window)));
        let extension = atr_now
            .filter(|&a| a > 0.0)
            .map(|a| (price - fast_now).abs() / a);
        let not_extended = extension.is_none_or(|e| e <= p.max_extension);

        let volume_ratio = series.volumes().and_then(|volumes| {
            let average = last(&sma(&volumes, p.volume_window))?;
            let current = *volumes.last()?;
            (average > 0.0).then(|| current / average)
        });
        let volume_ok = volume_ratio.is_none_or(|r| r >= p.volume_multiplier);

        let gates = not_extended && volume_ok;
        let long_pullback = long_regime && crossed_above_last(&price_line, &fast) && gates;
        let long_trend = long_regime && crossed_above_last(&fast, &slow) && gates;
        let short_pullback = short_regime && crossed_below_last(&price_line, &fast) && gates;
        let short_trend = short_regime && crossed_below_last(&fast, &slow) && gates;
        let golden = crossed_above_last(&slow, &regime);
        let death = crossed_below_last(&slow, &regime);

        let score: f64 = [
            (long_pullback, 1.0),
            (long_trend, 1.0),
            (golden, 1.0),
            (short_pullback, -1.0),
            (short_trend, -1.0),
            (death, -1.0),
        ]
        .iter()
        .filter(|(active, _)| *active)
        .map(|(_, sign)| sign * FLAG_WEIGHT)
        .sum();

        let [fast_name, slow_name, mid_name, regime_name] = ema_names(&p);
        let mut snapshot = IndicatorSnapshot::new();
        snapshot.insert(fast_name, Some(fast_now));
        snapshot.insert(slow_name, Some(slow_now));
        snapshot.insert(mid_name, Some(mid_now));
        snapshot.insert(regime_name, Some(regime_now));
        snapshot.insert("atr".into(), atr_now);
        snapshot.insert("extension".into(), extension);
        snapshot.insert("volume_ratio".into(), volume_ratio);
        for (name, value) in FLAGS.iter().zip([
            long_regime,
            short_regime,
            not_extended,
            volume_ok,
            long_pullback,
            long_trend,
            short_pullback,
            short_trend,
            golden,
            death,
        ]) {
            snapshot.insert((*name).to_string(), flag(value));
        }

        Ok(IndicatorReading::new(snapshot, score))
    }

    fn explain(&self, reading: &IndicatorReading, config: &IndicatorConfig) -> Vec<String> {
        let Ok(p) = params(config) else {
            return Vec::new();
        };
        let regime = if reading.flag("long_regime") {
            "long"
        } else if reading.flag("short_regime") {
            "short"
        } else {
            "no"
        };
        let mut lines = vec![format!(
            "{} regime: EMA{} {} vs EMA{} {}",
            regime,
            p.mid,
            show(reading.metric(&format!("ema_{}", p.mid))),
            p.regime,
            show(reading.metric(&format!("ema_{}", p.regime)))
        )];

        let described = [
            ("long_pullback_entry", format!("price reclaimed EMA{}", p.fast)),
            (
                "long_trend_entry",
                format!("EMA{} crossed above EMA{}", p.fast, p.slow),
            ),
            ("short_pullback_entry", format!("price lost EMA{}", p.fast)),
            (
                "short_trend_entry",
                format!("EMA{} crossed below EMA{}", p.fast, p.slow),
            ),
            (
                "golden_cross",
                format!("golden cross: EMA{} above EMA{}", p.slow, p.regime),
            ),
            (
                "death_cross",
                format!("death cross: EMA{} below EMA{}", p.slow, p.regime),
            ),
        ];
        lines.extend(
            described
                .into_iter()
                .filter(|(name, _)| reading.flag(name))
                .map(|(_, text)| text),
        );

        if reading.metric("not_extended") == Some(0.0) {
            lines.push(format!(
                "entries blocked: {} ATRs from EMA{} (max {:.2})",
                show(reading.metric("extension")),
                p.fast,
                p.max_extension
            ));
        }
        if reading.metric("volume_ok") == Some(0.0) {
            lines.push(format!(
                "entries blocked: volume {}x average (needs {:.2}x)",
                show(reading.metric("volume_ratio")),
                p.volume_multiplier
            ));
        }
        lines
    }
}
