//! Whole-pipeline runs: FX prefetch through the provider, majority-vote
//! targets, per-item failure isolation and aggregation over the output.

mod common;

use common::{assert_close, observation, usd_fx};
use econorm::aggregate::{self, AggregateOptions, SeriesPoint};
use econorm::batch::{process_batch, process_batch_with_provider, BatchOptions};
use econorm::fx::{FxProvider, FxProviderOptions, FxSource, SourceFormat};
use econorm::normalize::NormalizeOptions;
use econorm::scale::Magnitude;
use econorm::types::NormalizationTargets;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn batch_prefetches_one_fx_snapshot_for_all_items() {
    common::init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rates/USD"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "base": "USD",
            "date": "2026-07-31",
            "rates": {"XOF": 558.16, "EUR": 0.92}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = FxProvider::new(FxProviderOptions {
        sources: vec![FxSource {
            id: "ecb".to_string(),
            endpoint: format!("{}/rates", server.uri()),
            api_key: None,
            format: SourceFormat::EcbLike,
            min_interval: None,
        }],
        retries: 0,
        ..Default::default()
    });

    let items = vec![
        observation("a", "Balance of Trade", -482.58, "XOF Billions"),
        observation("b", "Balance of Trade", 120.0, "EUR Millions"),
        observation("c", "Balance of Trade", 3.5, "USD Millions"),
    ];
    let opts = BatchOptions {
        targets: Some(NormalizationTargets {
            to_currency: Some("USD".into()),
            to_magnitude: Some(Magnitude::Millions),
            ..Default::default()
        }),
        ..Default::default()
    };

    let result = process_batch_with_provider(&items, &provider, "USD", &opts)
        .await
        .unwrap();
    assert_eq!(result.stats.succeeded, 3);

    let a = result.successful.iter().find(|o| o.id == "a").unwrap();
    assert_close(a.normalized_value, -482.58 * 1000.0 / 558.16);
    let fx = a.explain.fx.as_ref().unwrap();
    assert_eq!(fx.source_id.as_deref(), Some("ecb"));
    assert_eq!(fx.as_of.as_deref(), Some("2026-07-31"));

    let b = result.successful.iter().find(|o| o.id == "b").unwrap();
    assert_close(b.normalized_value, 120.0 / 0.92);
    // One upstream request for the whole batch (expect(1) verifies).
}

#[test]
fn auto_targets_make_a_mixed_group_comparable() {
    common::init_tracing();
    let items = vec![
        observation("q1", "Current Account", -1.2, "XOF Billions"),
        observation("q2", "Current Account", -0.9, "XOF Billions"),
        observation("q3", "current  account", -950.0, "XOF Millions"),
    ];
    let opts = BatchOptions {
        auto_targets: true,
        fx: Some(usd_fx(&[("XOF", 558.16)])),
        ..Default::default()
    };

    let result = process_batch(&items, &opts);
    assert_eq!(result.stats.succeeded, 3);

    // The group votes billions; the millions item is rescaled to match.
    let q3 = result.successful.iter().find(|o| o.id == "q3").unwrap();
    assert_close(q3.normalized_value, -0.95);
    let selection = q3.explain.target_selection.as_ref().unwrap();
    assert_eq!(selection.magnitude, Some(Magnitude::Billions));
    assert!(selection.reason.contains("majority vote"));

    // All three now agree on the unit.
    let units: Vec<&str> = result
        .successful
        .iter()
        .map(|o| o.normalized_full_unit.as_str())
        .collect();
    assert!(units.iter().all(|u| *u == units[0]), "units differ: {units:?}");
}

#[test]
fn batch_output_feeds_straight_into_aggregation() -> anyhow::Result<()> {
    let items = vec![
        observation("a", "Exports", 1.0, "USD Billions"),
        observation("b", "Exports", 500.0, "USD Millions"),
        observation("c", "Exports", 250.0, "USD Millions"),
    ];
    let opts = BatchOptions {
        targets: Some(NormalizationTargets {
            to_magnitude: Some(Magnitude::Millions),
            ..Default::default()
        }),
        ..Default::default()
    };
    let result = process_batch(&items, &opts);

    let points: Vec<SeriesPoint> = result
        .successful
        .iter()
        .map(|o| SeriesPoint {
            value: o.normalized_value,
            unit: o.normalized_unit.clone(),
        })
        .collect();

    let total = aggregate::sum(&points, &AggregateOptions::default())?;
    assert_close(total.value, 1750.0);
    assert_eq!(total.meta.count, 3);
    Ok(())
}

#[test]
fn aggregation_normalizes_mixed_units_on_request() {
    let points = vec![
        SeriesPoint {
            value: 2.0,
            unit: "USD Billions".into(),
        },
        SeriesPoint {
            value: 250.0,
            unit: "USD Millions".into(),
        },
    ];
    let opts = AggregateOptions {
        normalize_first: true,
        normalize: NormalizeOptions {
            to_magnitude: Some(Magnitude::Millions),
            ..Default::default()
        },
    };
    let mean = aggregate::mean(&points, &opts).unwrap();
    assert_close(mean.value, 1125.0);
}
