use std::fs;

use chrono::NaiveDate;
use geocluster_datasets::MunicipalityGrid;
use geocluster_geo::RegionLayer;
use geocluster_pipeline::store::{
    InMemorySink, InMemorySource, JsonModelSink, NullModelSink, WireRecord,
};
use geocluster_pipeline::{CentroidPipeline, DensityPipeline, PipelineConfig, Sample};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Four municipalities on a 2 by 2 grid. Over three days the two cells of the first row share
/// their values, and so do the two cells of the second row.
fn four_cities() -> (MunicipalityGrid, RegionLayer, InMemorySource) {
    let grid = MunicipalityGrid::new(2, 2);
    let layer = grid.layer().unwrap();
    let mut atmosphere = Vec::new();
    let mut climate = Vec::new();
    for day in 1..=3 {
        let date = NaiveDate::from_ymd_opt(2021, 1, day).unwrap();
        let shift = day as f64;
        for (idx, &(longitude, latitude)) in grid.lattice(2).iter().enumerate() {
            let first_row = idx / 4 < 2;
            let (pm10, temperature) = if first_row {
                (10. + shift, 5. + shift)
            } else {
                (30. + shift, 20. - shift)
            };
            atmosphere.push(Sample::new(latitude, longitude, date, "pm10", pm10));
            climate.push(Sample::new(latitude, longitude, date, "temperature", temperature));
        }
    }
    let source = InMemorySource::new()
        .with_samples("atmosphere_data", &atmosphere)
        .with_samples("climate_data", &climate);
    (grid, layer, source)
}

fn config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.grid_search.total_points_per_day = 4;
    config
}

fn percent(records: &[WireRecord], city: &str, ref_city: &str) -> f64 {
    records
        .iter()
        .find(|r| r["city"] == city && r["ref_city"] == ref_city)
        .and_then(|r| r["perc_sim"].as_f64())
        .unwrap()
}

fn check_pairs(grid: &MunicipalityGrid, batch: &[WireRecord]) {
    let names: Vec<String> = grid.names().iter().map(|n| n.replace(' ', "_")).collect();
    assert_eq!(batch.len(), 4 * 3);
    assert_eq!(percent(batch, &names[0], &names[1]), 100.);
    assert_eq!(percent(batch, &names[1], &names[0]), 100.);
    assert_eq!(percent(batch, &names[2], &names[3]), 100.);
    for first in &names[..2] {
        for second in &names[2..] {
            assert!(percent(batch, first, second) < 100.);
            assert!(percent(batch, second, first) < 100.);
        }
    }
}

#[test]
fn density_round_trip() {
    init_tracing();
    let (grid, layer, source) = four_cities();
    let config = config();
    let mut similarity = InMemorySink::new();
    let mut labels = InMemorySink::new();
    let report = DensityPipeline::new(
        &config,
        &layer,
        &source,
        &mut similarity,
        &mut labels,
        &NullModelSink,
    )
    .run(&[2021])
    .unwrap();

    assert!(report.all_succeeded());
    assert_eq!(report.summary(), "All frequency results saved with success");
    assert_eq!(report.skipped(), &["q2 2021", "q3 2021", "q4 2021"]);
    // one batch of labels and one of similarity per subset
    assert_eq!(report.outcomes().len(), 4);

    assert_eq!(labels.batches().len(), 1);
    assert_eq!(labels.batches()[0].len(), 3 * 4 * 3);
    assert!(labels.records().all(|r| r["cluster"].as_i64() != Some(-1)));

    let collections: Vec<&str> = similarity
        .batches()
        .iter()
        .map(|batch| batch[0]["ref_collection"].as_str().unwrap())
        .collect();
    assert_eq!(
        collections,
        vec!["atmosphere_data", "climate_data", "atmosphere_data_climate_data"]
    );
    for batch in similarity.batches() {
        check_pairs(&grid, batch);
        assert!(batch.iter().all(|r| r["ref_quarter"] == "q1" && r["ref_year"] == "2021"));
    }
}

#[test]
fn centroid_round_trip() {
    init_tracing();
    let (grid, layer, source) = four_cities();
    let config = config();
    let mut similarity = InMemorySink::new();
    let report = CentroidPipeline::new(&config, &layer, &source, &mut similarity)
        .run(&[2021])
        .unwrap();

    assert!(report.all_succeeded());
    assert_eq!(report.outcomes().len(), 3);
    assert_eq!(report.skipped().len(), 3);
    assert_eq!(similarity.batches().len(), 3);
    for batch in similarity.batches() {
        check_pairs(&grid, batch);
    }

    let mut again = InMemorySink::new();
    CentroidPipeline::new(&config, &layer, &source, &mut again)
        .run(&[2021])
        .unwrap();
    assert_eq!(again.batches(), similarity.batches());
}

#[test]
fn failed_batches_do_not_stop_the_run() {
    init_tracing();
    let (_, layer, source) = four_cities();
    let config = config();
    let mut similarity = InMemorySink::failing_on(vec![1]);
    let mut labels = InMemorySink::new();
    let report = DensityPipeline::new(
        &config,
        &layer,
        &source,
        &mut similarity,
        &mut labels,
        &NullModelSink,
    )
    .run(&[2021])
    .unwrap();

    assert!(!report.all_succeeded());
    assert_eq!(report.summary(), "Check for frequency upload errors");
    let failed: Vec<&str> = report
        .failed_batches()
        .iter()
        .map(|o| o.label.as_str())
        .collect();
    assert_eq!(failed, vec!["similarity climate_data q1 2021"]);
    assert_eq!(similarity.batches().len(), 2);
}

#[test]
fn models_are_written_per_day_and_subset() {
    let (_, layer, source) = four_cities();
    let config = config();
    let dir = tempfile::tempdir().unwrap();
    let models = JsonModelSink::new(dir.path());
    let mut similarity = InMemorySink::new();
    let mut labels = InMemorySink::new();
    DensityPipeline::new(
        &config,
        &layer,
        &source,
        &mut similarity,
        &mut labels,
        &models,
    )
    .run(&[2021])
    .unwrap();

    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3 * 3);
    let model = fs::read_to_string(dir.path().join("dbscan_climate_data_2021-01-02.json")).unwrap();
    let model: serde_json::Value = serde_json::from_str(&model).unwrap();
    assert_eq!(model["strategy"], "dbscan");
    assert_eq!(model["n_clusters"], 2);
}

#[test]
fn unwritable_models_are_ignored() {
    let (_, layer, source) = four_cities();
    let config = config();
    let dir = tempfile::tempdir().unwrap();
    // a file where the model directory should be
    let blocked = dir.path().join("models");
    fs::write(&blocked, "").unwrap();
    let models = JsonModelSink::new(&blocked);
    let mut similarity = InMemorySink::new();
    let mut labels = InMemorySink::new();
    let report = DensityPipeline::new(
        &config,
        &layer,
        &source,
        &mut similarity,
        &mut labels,
        &models,
    )
    .run(&[2021])
    .unwrap();
    assert!(report.all_succeeded());
    assert_eq!(similarity.batches().len(), 3);
}

#[test]
fn empty_source_skips_every_period() {
    let (_, layer, _) = four_cities();
    let config = config();
    let source = InMemorySource::new();
    let mut similarity = InMemorySink::new();
    let mut labels = InMemorySink::new();
    let report = DensityPipeline::new(
        &config,
        &layer,
        &source,
        &mut similarity,
        &mut labels,
        &NullModelSink,
    )
    .run(&[2020, 2021])
    .unwrap();
    assert_eq!(report.skipped().len(), 8);
    assert!(report.outcomes().is_empty());
    assert!(similarity.batches().is_empty());

    let report = CentroidPipeline::new(&config, &layer, &source, &mut similarity)
        .run(&[2021])
        .unwrap();
    assert_eq!(report.skipped(), &["2021"]);
}

#[test]
fn configured_years_drive_the_run() {
    init_tracing();
    let (_, layer, source) = four_cities();
    let mut config = config();

    let mut similarity = InMemorySink::new();
    let report = CentroidPipeline::new(&config, &layer, &source, &mut similarity)
        .run_configured()
        .unwrap();
    assert!(report.outcomes().is_empty());
    assert!(report.skipped().is_empty());

    config.years = vec![2020, 2021];
    let mut similarity = InMemorySink::new();
    let report = CentroidPipeline::new(&config, &layer, &source, &mut similarity)
        .run_configured()
        .unwrap();
    assert_eq!(report.skipped().len(), 4);
    assert_eq!(report.skipped()[0], "2020");
    assert_eq!(report.outcomes().len(), 3);

    let mut explicit = InMemorySink::new();
    DensityPipeline::new(
        &config,
        &layer,
        &source,
        &mut explicit,
        &mut InMemorySink::new(),
        &NullModelSink,
    )
    .run(&[2020, 2021])
    .unwrap();
    let mut configured = InMemorySink::new();
    DensityPipeline::new(
        &config,
        &layer,
        &source,
        &mut configured,
        &mut InMemorySink::new(),
        &NullModelSink,
    )
    .run_configured()
    .unwrap();
    assert_eq!(configured.batches(), explicit.batches());
    assert_eq!(configured.batches().len(), 3);
}
