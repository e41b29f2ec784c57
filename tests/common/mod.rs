use std::collections::HashMap;
use std::sync::{Arc, Once};

use econorm::fx::FxTable;
use econorm::rules::IndicatorType;
use econorm::types::Observation;

static TRACING: Once = Once::new();

/// Route engine logs through the test harness; honors RUST_LOG.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// USD-based table over the codes the scenarios use.
pub fn usd_fx(pairs: &[(&str, f64)]) -> Arc<FxTable> {
    let rates: HashMap<String, f64> = pairs
        .iter()
        .map(|(code, rate)| (code.to_string(), *rate))
        .collect();
    Arc::new(FxTable::try_new("USD", rates).unwrap())
}

pub fn observation(id: &str, name: &str, value: f64, unit: &str) -> Observation {
    Observation {
        id: id.to_string(),
        name: Some(name.to_string()),
        value,
        unit: unit.to_string(),
        indicator_type: Some(IndicatorType::Flow),
        ..Default::default()
    }
}

/// Relative comparison at the tolerance the engine guarantees.
pub fn assert_close(actual: f64, expected: f64) {
    let scale = expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() / scale < 1e-9,
        "expected {expected}, got {actual}"
    );
}
