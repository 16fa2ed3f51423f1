use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::agent_trait::Agent;
use crate::types::{AgentResult, Evidence};

/// Weekly seasonality period, in buckets. The pipeline buckets
/// time-series volume daily (spec.md §4.3), so a 7-bucket period is the
/// natural weekly cycle to fit a Fourier term against.
const SEASONAL_PERIOD: f64 = 7.0;

/// Minimum number of observations before a forecast is considered more
/// than a guess. Below this, `ForecastingAgent` still answers but caps
/// confidence at a token value.
const MIN_POINTS_FOR_CONFIDENCE: usize = 4;

/// Routed to on the FORECAST intent (spec.md glossary). Wraps a seasonal
/// regression — linear trend plus one Fourier harmonic — fit over the
/// retrieved time-series window. Side-effect free and deterministic: the
/// same window always produces the same forecast, with no RNG involved.
pub struct ForecastingAgent;

struct Fit {
    trend_slope: f64,
    trend_intercept: f64,
    seasonal_amplitude: f64,
    seasonal_phase: f64,
    residual_stddev: f64,
}

fn fit_series(values: &[f64]) -> Fit {
    let n = values.len() as f64;
    let xs: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();

    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = values.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    for (x, y) in xs.iter().zip(values.iter()) {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x) * (x - mean_x);
    }
    let slope = if var_x.abs() < f64::EPSILON { 0.0 } else { cov / var_x };
    let intercept = mean_y - slope * mean_x;

    // Fit one Fourier harmonic against the trend's residual, via the
    // standard projection onto sin/cos basis vectors at the seasonal
    // frequency.
    let omega = 2.0 * std::f64::consts::PI / SEASONAL_PERIOD;
    let mut sum_sin = 0.0;
    let mut sum_cos = 0.0;
    let mut sum_sin2 = 0.0;
    let mut sum_cos2 = 0.0;
    let detrended: Vec<f64> = xs
        .iter()
        .zip(values.iter())
        .map(|(x, y)| y - (intercept + slope * x))
        .collect();
    for (x, r) in xs.iter().zip(detrended.iter()) {
        let s = (omega * x).sin();
        let c = (omega * x).cos();
        sum_sin += r * s;
        sum_cos += r * c;
        sum_sin2 += s * s;
        sum_cos2 += c * c;
    }
    let coef_sin = if sum_sin2.abs() < f64::EPSILON { 0.0 } else { sum_sin / sum_sin2 };
    let coef_cos = if sum_cos2.abs() < f64::EPSILON { 0.0 } else { sum_cos / sum_cos2 };
    let amplitude = (coef_sin * coef_sin + coef_cos * coef_cos).sqrt();
    let phase = coef_cos.atan2(coef_sin);

    let mut sq_err = 0.0;
    for (i, (x, y)) in xs.iter().zip(values.iter()).enumerate() {
        let seasonal = amplitude * (omega * x + phase).sin();
        let predicted = intercept + slope * x + seasonal;
        let err = y - predicted;
        sq_err += err * err;
        let _ = i;
    }
    let residual_stddev = (sq_err / n).sqrt();

    Fit {
        trend_slope: slope,
        trend_intercept: intercept,
        seasonal_amplitude: amplitude,
        seasonal_phase: phase,
        residual_stddev,
    }
}

impl ForecastingAgent {
    fn forecast(evidence: &Evidence) -> Option<(f64, f64, f64, f64, usize)> {
        if evidence.timeseries.points.is_empty() {
            return None;
        }
        let values: Vec<f64> = evidence
            .timeseries
            .points
            .iter()
            .map(|p| p.amount.to_string().parse::<f64>().unwrap_or(0.0))
            .collect();
        let fit = fit_series(&values);

        let next_x = values.len() as f64;
        let omega = 2.0 * std::f64::consts::PI / SEASONAL_PERIOD;
        let trend_component = fit.trend_intercept + fit.trend_slope * next_x;
        let seasonal_component = fit.seasonal_amplitude * (omega * next_x + fit.seasonal_phase).sin();
        let point = trend_component + seasonal_component;

        // 80% interval under a normal residual assumption; z = 1.2816.
        let z = 1.2816;
        let lower = point - z * fit.residual_stddev;
        let upper = point + z * fit.residual_stddev;

        Some((point, lower, upper, fit.trend_slope, values.len()))
    }
}

#[async_trait]
impl Agent for ForecastingAgent {
    fn name(&self) -> &'static str {
        "ForecastingAgent"
    }

    async fn run(&self, _task_id: Uuid, _query: &str, evidence: &Evidence) -> AgentResult {
        match Self::forecast(evidence) {
            None => AgentResult {
                agent: self.name().to_string(),
                summary: "no time-series history available to forecast from".to_string(),
                metrics: json!({}),
                confidence: 0.0,
                rationale: "empty_evidence".to_string(),
            },
            Some((point, lower, upper, slope, n)) => {
                let trend_label = if slope > 0.01 {
                    "rising"
                } else if slope < -0.01 {
                    "falling"
                } else {
                    "flat"
                };
                let confidence = if n >= MIN_POINTS_FOR_CONFIDENCE {
                    (0.4 + (n as f64 / 30.0)).min(0.9)
                } else {
                    0.2
                };
                AgentResult {
                    agent: self.name().to_string(),
                    summary: format!("next-period forecast {point:.2} ({trend_label} trend), 80% interval [{lower:.2}, {upper:.2}]"),
                    metrics: json!({
                        "point": point,
                        "lower": lower,
                        "upper": upper,
                        "trend": trend_label,
                        "observations": n,
                    }),
                    confidence,
                    rationale: "seasonal_regression".to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TimeSeriesPoint, TimeSeriesWindow};
    use rust_decimal::Decimal;

    fn window_with(amounts: &[i64]) -> Evidence {
        let bank_id = Uuid::new_v4();
        let now = chrono::Utc::now();
        Evidence {
            bank_id,
            vector_hits: vec![],
            graph_neighborhoods: vec![],
            timeseries: TimeSeriesWindow {
                bank_id,
                from: now,
                to: now,
                total_amount: Decimal::ZERO,
                points: amounts
                    .iter()
                    .map(|a| TimeSeriesPoint { bucket_time: now, amount: Decimal::new(*a, 0) })
                    .collect(),
            },
        }
    }

    #[tokio::test]
    async fn forecast_is_deterministic_for_the_same_window() {
        let evidence = window_with(&[100, 110, 120, 130, 140, 150, 160, 170]);
        let a = ForecastingAgent.run(Uuid::new_v4(), "forecast", &evidence).await;
        let b = ForecastingAgent.run(Uuid::new_v4(), "forecast", &evidence).await;
        assert_eq!(a.metrics, b.metrics);
    }

    #[tokio::test]
    async fn rising_series_is_labeled_rising() {
        let evidence = window_with(&[10, 20, 30, 40, 50, 60, 70, 80]);
        let result = ForecastingAgent.run(Uuid::new_v4(), "forecast", &evidence).await;
        assert_eq!(result.metrics["trend"], "rising");
    }

    #[tokio::test]
    async fn empty_window_yields_zero_confidence() {
        let evidence = window_with(&[]);
        let result = ForecastingAgent.run(Uuid::new_v4(), "forecast", &evidence).await;
        assert_eq!(result.confidence, 0.0);
    }
}
