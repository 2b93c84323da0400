//! Resolution of aliased record fields into numeric values.
//!
//! Each statistic reads one logical [`Field`], which lists the key names it may be
//! stored under in priority order. The first key present in a record decides the
//! value: if that value does not coerce, the record has no value for the field and
//! later aliases are not consulted.

use serde_json::Value;

use crate::dataset::TelemetryRecord;

/// How a raw JSON value is turned into a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// JSON numbers and numeric strings.
    Numeric,
    /// As `Numeric`, plus `true` -> 1.0 and `false` -> 0.0.
    NumericOrBool,
}

/// One key a field may be stored under.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Alias {
    pub key: &'static str,
    pub coercion: Coercion,
    /// Numeric values are divided by this to reach the field's canonical unit.
    /// Booleans are never scaled.
    pub divisor: f64,
}

impl Alias {
    pub const fn numeric(key: &'static str) -> Self {
        Self { key, coercion: Coercion::Numeric, divisor: 1.0 }
    }

    pub const fn flag(key: &'static str) -> Self {
        Self { key, coercion: Coercion::NumericOrBool, divisor: 1.0 }
    }

    pub const fn percent(key: &'static str) -> Self {
        Self { key, coercion: Coercion::NumericOrBool, divisor: 100.0 }
    }

    /// Coerce a raw value found under this alias. Non-finite results are rejected.
    pub fn coerce(&self, value: &Value) -> Option<f64> {
        let coerced = match value {
            Value::Bool(up) if self.coercion == Coercion::NumericOrBool => {
                Some(if *up { 1.0 } else { 0.0 })
            }
            Value::Number(n) => n.as_f64().map(|v| v / self.divisor),
            Value::String(s) => parse_numeric_str(s).map(|v| v / self.divisor),
            _ => None,
        };
        coerced.filter(|v| v.is_finite())
    }
}

fn parse_numeric_str(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok()
}

/// A logical record field and its aliases, highest priority first.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub aliases: &'static [Alias],
}

/// Latency in milliseconds.
pub const LATENCY: Field = Field {
    aliases: &[Alias::numeric("latency_ms"), Alias::numeric("ms"), Alias::numeric("latency")],
};

/// Uptime as a fraction in `[0, 1]`. `uptime_pct` holds a percentage and is rescaled.
pub const UPTIME: Field = Field {
    aliases: &[
        Alias::flag("uptime"),
        Alias::flag("up"),
        Alias::flag("is_up"),
        Alias::percent("uptime_pct"),
    ],
};

impl Field {
    /// The alias that decides this field's value for `record`, with the raw value stored under it.
    pub fn resolve<'r>(&self, record: &'r TelemetryRecord) -> Option<(&Alias, &'r Value)> {
        self.aliases
            .iter()
            .find_map(|alias| record.get(alias.key).map(|value| (alias, value)))
    }

    /// Numeric value of this field in `record`, or `None` if absent or unparseable.
    pub fn extract(&self, record: &TelemetryRecord) -> Option<f64> {
        let (alias, value) = self.resolve(record)?;
        alias.coerce(value)
    }
}
