use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Cost and token usage reported for a node, or summed for an execution.
///
/// Every field is optional on the wire. Token counts accept whole-number
/// floats such as `10.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub input_tokens: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub output_tokens: Option<u64>,
}

impl ExecutionStats {
    pub fn new(cost: f64, input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            cost: Some(cost),
            input_tokens: Some(input_tokens),
            output_tokens: Some(output_tokens),
        }
    }

    pub fn cost_or_zero(&self) -> f64 {
        self.cost.unwrap_or(0.0)
    }

    pub fn input_tokens_or_zero(&self) -> u64 {
        self.input_tokens.unwrap_or(0)
    }

    pub fn output_tokens_or_zero(&self) -> u64 {
        self.output_tokens.unwrap_or(0)
    }

    /// Fold another set of stats into this one, absent fields counting as zero.
    fn accumulate(&mut self, other: &ExecutionStats) {
        self.cost = Some(self.cost_or_zero() + other.cost_or_zero());
        self.input_tokens = Some(
            self.input_tokens_or_zero()
                .saturating_add(other.input_tokens_or_zero()),
        );
        self.output_tokens = Some(
            self.output_tokens_or_zero()
                .saturating_add(other.output_tokens_or_zero()),
        );
    }
}

/// Sum the given per-node stats into a fresh total.
///
/// Always a full recomputation; `None` entries contribute nothing. With no
/// stats at all every field stays absent, otherwise every field is present.
pub fn aggregate<'a, I>(stats: I) -> ExecutionStats
where
    I: IntoIterator<Item = Option<&'a ExecutionStats>>,
{
    let mut total = ExecutionStats::default();
    for node_stats in stats.into_iter().flatten() {
        total.accumulate(node_stats);
    }
    total
}

/// Token count that also accepts a non-negative whole-number float.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Some(count) = number.as_u64() {
        return Ok(Some(count));
    }
    match number.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f < u64::MAX as f64 => Ok(Some(f as u64)),
        _ => Err(D::Error::custom(format!(
            "invalid token count `{number}`, expected a non-negative integer"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_empty_is_default() {
        let total = aggregate(std::iter::empty());
        assert_eq!(total, ExecutionStats::default());
        assert_eq!(total.cost_or_zero(), 0.0);
    }

    #[test]
    fn aggregate_sums_fields_and_skips_missing() {
        let a = ExecutionStats::new(0.5, 10, 20);
        let b = ExecutionStats {
            cost: None,
            input_tokens: Some(5),
            output_tokens: None,
        };
        let total = aggregate([Some(&a), None, Some(&b)]);
        assert_eq!(total.cost, Some(0.5));
        assert_eq!(total.input_tokens, Some(15));
        assert_eq!(total.output_tokens, Some(20));
    }

    #[test]
    fn any_reported_stats_fill_every_field() {
        let a = ExecutionStats {
            cost: Some(0.5),
            ..Default::default()
        };
        let total = aggregate([None, Some(&a)]);
        assert_eq!(total, ExecutionStats::new(0.5, 0, 0));
        assert_eq!(
            serde_json::to_value(&total).unwrap(),
            serde_json::json!({"cost": 0.5, "inputTokens": 0, "outputTokens": 0})
        );
    }

    #[test]
    fn no_reported_stats_stay_absent() {
        let total = aggregate([None, None]);
        assert_eq!(total, ExecutionStats::default());
    }

    #[test]
    fn whole_float_token_counts_accepted() {
        let stats: ExecutionStats =
            serde_json::from_str(r#"{"inputTokens":10.0,"outputTokens":null}"#).unwrap();
        assert_eq!(stats.input_tokens, Some(10));
        assert_eq!(stats.output_tokens, None);
    }

    #[test]
    fn fractional_or_negative_token_counts_rejected() {
        for raw in [r#"{"inputTokens":1.5}"#, r#"{"outputTokens":-3}"#, r#"{"inputTokens":"7"}"#] {
            assert!(serde_json::from_str::<ExecutionStats>(raw).is_err(), "{raw}");
        }
    }

    #[test]
    fn camel_case_wire_format() {
        let stats: ExecutionStats =
            serde_json::from_str(r#"{"cost":0.25,"inputTokens":3,"outputTokens":4}"#).unwrap();
        assert_eq!(stats, ExecutionStats::new(0.25, 3, 4));
        let json = serde_json::to_value(ExecutionStats::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
