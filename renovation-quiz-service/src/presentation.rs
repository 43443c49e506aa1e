use serde::Serialize;
use step_flow::Context;

use crate::steps::types::session_keys;

/// Whole pounds with thousands separators: `£42,000`.
pub fn format_currency(amount: f64) -> String {
    let rounded = if amount.is_finite() { amount.round() } else { 0.0 };
    let sign = if rounded < 0.0 { "-" } else { "" };
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{sign}£{grouped}")
}

/// What the result screen shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultView {
    pub predicted_cost: f64,
    pub post_renovation_value: f64,
    pub formatted_cost: String,
    pub formatted_value: String,
    /// Set when the estimator could not be reached and the figures are zero
    pub estimate_unavailable: bool,
}

impl ResultView {
    pub fn new(predicted_cost: f64, post_renovation_value: f64, estimate_unavailable: bool) -> Self {
        Self {
            predicted_cost,
            post_renovation_value,
            formatted_cost: format_currency(predicted_cost),
            formatted_value: format_currency(post_renovation_value),
            estimate_unavailable,
        }
    }

    /// Missing figures read as zero.
    pub fn from_context(context: &Context) -> Self {
        Self::new(
            context.get_sync(session_keys::PREDICTED_COST).unwrap_or(0.0),
            context
                .get_sync(session_keys::POST_RENOVATION_VALUE)
                .unwrap_or(0.0),
            context
                .get_sync(session_keys::ESTIMATE_UNAVAILABLE)
                .unwrap_or(false),
        )
    }

    pub fn summary(&self) -> String {
        format!(
            "Estimated renovation cost {}, estimated property value after renovation {}",
            self.formatted_cost, self.formatted_value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(format_currency(42000.0), "£42,000");
        assert_eq!(format_currency(0.0), "£0");
        assert_eq!(format_currency(999.0), "£999");
        assert_eq!(format_currency(1000.0), "£1,000");
        assert_eq!(format_currency(1_250_000.0), "£1,250,000");
    }

    #[test]
    fn rounds_to_whole_pounds() {
        assert_eq!(format_currency(41999.6), "£42,000");
        assert_eq!(format_currency(12.4), "£12");
    }

    #[test]
    fn negatives_and_non_finite() {
        assert_eq!(format_currency(-1500.0), "-£1,500");
        assert_eq!(format_currency(-0.2), "£0");
        assert_eq!(format_currency(f64::NAN), "£0");
    }

    #[tokio::test]
    async fn missing_figures_default_to_zero() {
        let context = Context::new();
        context.set(session_keys::PREDICTED_COST, 42000).await.unwrap();

        let view = ResultView::from_context(&context);
        assert_eq!(view.formatted_cost, "£42,000");
        assert_eq!(view.formatted_value, "£0");
        assert!(!view.estimate_unavailable);
    }
}
