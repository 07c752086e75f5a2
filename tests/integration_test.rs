use approx::assert_abs_diff_eq;
use chrono::{TimeZone, Utc};
use hydresgeo::{
    assembler::{discover, AssemblyOutput, DatasetAssembler},
    context::DatasetContext,
    cube::DatapointId,
    diagnostics::DiagnosticCode,
    errors::HydError,
    join::{AuxiliaryTables, JoinSource},
    options::{InputPaths, RunOptions},
    zones::{IgnoreLevel, ZoneId},
};
use ndarray::Array3;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

/// Write a generic-sensor ENVI cube (f32, little endian, bsq)
fn write_cube(folder: &Path, stem: &str, data: &Array3<f32>, local_time: &str) {
    fs::create_dir_all(folder).expect("Failed to create measurement folder");
    let (rows, columns, bands) = data.dim();
    let wavelengths: Vec<String> = (0..bands).map(|b| format!("{}", 450 + 4 * b)).collect();
    let header = format!(
        "ENVI\nsamples = {columns}\nlines = {rows}\nbands = {bands}\nheader offset = 0\n\
         data type = 4\ninterleave = bsq\nbyte order = 0\nacquisition time = {local_time}\n\
         wavelength = {{{}}}\n",
        wavelengths.join(", ")
    );
    fs::write(folder.join(format!("{stem}.hdr")), header).expect("Failed to write header");

    let mut payload = Vec::with_capacity(rows * columns * bands * 4);
    for b in 0..bands {
        for r in 0..rows {
            for c in 0..columns {
                payload.extend_from_slice(&data[[r, c, b]].to_le_bytes());
            }
        }
    }
    fs::write(folder.join(format!("{stem}.img")), payload).expect("Failed to write payload");
}

/// Band 0 holds 10*row + col, band 1 is constant
fn gradient_cube() -> Array3<f32> {
    Array3::from_shape_fn((4, 4, 2), |(r, c, b)| {
        if b == 0 {
            (10 * r + c) as f32
        } else {
            1.0
        }
    })
}

fn write_table(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).expect("Failed to write table");
    path
}

const POSITIONS: &str = "\
measurement    zone1_row_start zone1_row_end zone1_col_start zone1_col_end zone2_row_start zone2_row_end zone2_col_start zone2_col_end
20170815_meas1 0               4             0               2             0               4             2             4
20170816_meas2 0               4             0               2             0               4             2             4
";

fn run(paths: &InputPaths, options: &RunOptions) -> AssemblyOutput {
    let context = DatasetContext::load(paths).expect("Failed to load context");
    let tables = AuxiliaryTables::load(paths, options).expect("Failed to load tables");
    DatasetAssembler::new(&context, &tables, options)
        .expect("Invalid options")
        .run(&paths.hyp_root)
        .expect("Failed to assemble dataset")
}

fn fixture_root() -> (TempDir, InputPaths) {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let hyp_root = temp_dir.path().join("hyp");
    write_cube(&hyp_root.join("20170815_hyp_meas1"), "Auto001", &gradient_cube(), "10:00:00");
    write_cube(&hyp_root.join("20170815_hyp_meas1"), "Auto002", &gradient_cube(), "10:05:00");
    write_cube(&hyp_root.join("20170816_hyp_meas2"), "Auto001", &gradient_cube(), "10:00:00");

    let paths = InputPaths {
        hyp_root,
        positions_hyp: Some(write_table(temp_dir.path(), "positions_hyp.txt", POSITIONS)),
        ..InputPaths::default()
    };
    (temp_dir, paths)
}

#[test]
fn test_ignored_measurement_yields_no_records() {
    let (temp_dir, mut paths) = fixture_root();
    paths.ignore_measurements = Some(write_table(
        temp_dir.path(),
        "ignore_measurements.txt",
        "measurement\n20170815_meas1\n",
    ));

    let output = run(&paths, &RunOptions::default());

    // Every file of the ignored folder is reported
    let ignored: Vec<_> = output
        .diagnostics
        .with_code(DiagnosticCode::IgnoredMeasurement)
        .collect();
    assert_eq!(ignored.len(), 2);
    assert!(ignored.iter().all(|d| d.measurement == "20170815_meas1"));
    assert_eq!(
        ignored.iter().map(|d| d.file_number).collect::<Vec<_>>(),
        vec![Some(1), Some(2)]
    );

    // Only the second measurement contributes records
    assert!(output
        .dataset
        .records
        .iter()
        .all(|r| r.id.measurement == "20170816_meas2"));
    assert_eq!(output.dataset.len(), 2);
}

#[test]
fn test_ignored_datapoint_and_zone() {
    let (temp_dir, mut paths) = fixture_root();
    paths.ignore_datapoints = Some(write_table(
        temp_dir.path(),
        "ignore_datapoints.txt",
        "measurement    filenumber\n20170815_meas1 2.0\n",
    ));
    paths.ignore_zones = Some(write_table(
        temp_dir.path(),
        "ignore_zones.txt",
        "measurement    filenumber zone\n20170816_meas2 1          2.0\n",
    ));

    let context = DatasetContext::load(&paths).expect("Failed to load context");
    let ignored_file = DatapointId {
        measurement: "20170815_meas1".to_string(),
        file_number: 2,
    };
    assert_eq!(
        context.ignore.datapoint_level(&ignored_file),
        Some(IgnoreLevel::Datapoint)
    );

    let output = run(&paths, &RunOptions::default());

    let datapoints: Vec<_> = output
        .diagnostics
        .with_code(DiagnosticCode::IgnoredDatapoint)
        .collect();
    assert_eq!(datapoints.len(), 1);
    assert_eq!(datapoints[0].measurement, "20170815_meas1");
    assert_eq!(datapoints[0].file_number, Some(2));
    assert!(!output
        .dataset
        .records
        .iter()
        .any(|r| r.id == ignored_file));

    let zones: Vec<_> = output
        .diagnostics
        .with_code(DiagnosticCode::IgnoredZone)
        .collect();
    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0].measurement, "20170816_meas2");
    assert_eq!(zones[0].zone, Some(ZoneId(2)));

    // The other zone of the partly ignored file is still emitted
    let keys: Vec<_> = output
        .dataset
        .records
        .iter()
        .map(|r| (r.id.measurement.as_str(), r.id.file_number, r.zone))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("20170815_meas1", 1, ZoneId(1)),
            ("20170815_meas1", 1, ZoneId(2)),
            ("20170816_meas2", 1, ZoneId(1)),
        ]
    );
}

#[test]
fn test_full_pipeline_with_joins() {
    let (temp_dir, mut paths) = fixture_root();
    let dir = temp_dir.path();

    paths.masks = Some(write_table(
        dir,
        "masks.txt",
        "measurement start_row end_row start_col end_col bar1_p1_x bar1_p1_y bar1_p2_x bar1_p2_y bar1_height\n\
         20170815_meas1 0 4 0 4 0 0 0 3 1\n\
         20170816_meas2 0 4 0 4 0 0 0 3 1\n",
    ));
    paths.tdr = Some(write_table(
        dir,
        "tdr.csv",
        "timestamp,sensorID,volSM_vol%,T_C\n\
         2017-08-15 08:00:00,T36554,21.5,18.0\n\
         2017-08-15 08:02:00,T36547,25.0,17.5\n\
         2017-08-16 08:00:00,T36554,20.0,16.0\n",
    ));
    paths.site = Some(write_table(
        dir,
        "site.csv",
        "timestamp,air_temp\n2017-08-15 08:01:00,21.0\n",
    ));

    let lwir_root = dir.join("lwir");
    fs::create_dir_all(&lwir_root).unwrap();
    fs::write(
        lwir_root.join("ir_export_20170815_P0000001_001_10-01-00.csv"),
        "1,2,3,4\n5,6,7,8\n9,10,11,12\n13,14,15,16\n",
    )
    .unwrap();
    paths.lwir_root = Some(lwir_root);
    paths.positions_lwir = Some(write_table(
        dir,
        "positions_lwir.txt",
        "measurement zone1_row_start zone1_row_end zone1_col_start zone1_col_end zone2_row_start zone2_row_end zone2_col_start zone2_col_end\n\
         20170815    0 2 0 2 0 2 2 4\n",
    ));

    let options = RunOptions::default();
    let output = run(&paths, &options);

    // 3 cubes x 2 zones, ordered by measurement, file and zone
    assert_eq!(output.dataset.len(), 6);
    let keys: Vec<_> = output
        .dataset
        .records
        .iter()
        .map(|r| (r.id.measurement.as_str(), r.id.file_number, r.zone))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("20170815_meas1", 1, ZoneId(1)),
            ("20170815_meas1", 1, ZoneId(2)),
            ("20170815_meas1", 2, ZoneId(1)),
            ("20170815_meas1", 2, ZoneId(2)),
            ("20170816_meas2", 1, ZoneId(1)),
            ("20170816_meas2", 1, ZoneId(2)),
        ]
    );
    assert_eq!(output.dataset.wavelengths, vec![450.0, 454.0]);

    // Row 0 is covered by the bar: zone 1 averages rows 1..4, cols 0..2
    let first = &output.dataset.records[0];
    assert_eq!(first.timestamp, Utc.with_ymd_and_hms(2017, 8, 15, 8, 0, 0).unwrap());
    assert_eq!(first.pixel_count, 6);
    assert_abs_diff_eq!(first.features[0], 20.5, epsilon = 1e-9);
    assert_abs_diff_eq!(first.features[1], 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(output.dataset.records[1].features[0], 22.5, epsilon = 1e-9);

    // Zone 1 joins sensor 36554 (A1), zone 2 sensor 36547 (A2)
    let hydro = first.hydro.expect("zone 1 has a TDR reading");
    assert_eq!(hydro.sensor, 36554);
    assert_abs_diff_eq!(hydro.soil_moisture, 21.5);
    assert_eq!(output.dataset.records[1].hydro.unwrap().sensor, 36547);

    // LWIR frame at 08:01 UTC, zone 1 covers values 1, 2, 5, 6
    let lwir = first.lwir.expect("zone 1 has an LWIR summary");
    assert_abs_diff_eq!(lwir.mean, 3.5);
    assert_abs_diff_eq!(output.dataset.records[1].lwir.unwrap().mean, 5.5);
    assert_eq!(first.site.as_ref().unwrap().values, vec![21.0]);

    // The second cube (08:05 UTC) is 5 minutes from the 08:00 reading of
    // sensor 36554: beyond the default 3 minute delta
    let second = &output.dataset.records[2];
    assert!(second.hydro.is_none());
    let hydro_gaps: Vec<_> = output
        .diagnostics
        .with_code(DiagnosticCode::JoinGap)
        .filter(|d| d.source == Some(JoinSource::Hydro))
        .map(|d| (d.measurement.as_str(), d.file_number, d.zone))
        .collect();
    assert!(hydro_gaps.contains(&("20170815_meas1", Some(2), Some(ZoneId(1)))));
    // Sensor 36547 has no reading on the 16th at all
    assert!(hydro_gaps.contains(&("20170816_meas2", Some(1), Some(ZoneId(2)))));

    // The LWIR and site tables only cover the 15th
    let second_day = &output.dataset.records[4];
    assert!(second_day.lwir.is_none());
    assert!(second_day.site.is_none());
    assert_eq!(second_day.hydro.unwrap().soil_moisture, 20.0);

    let mut csv = Vec::new();
    output
        .dataset
        .write_csv(&mut csv, &options.missing_marker)
        .unwrap();
    let text = String::from_utf8(csv).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 7);
    assert_eq!(
        lines[0],
        "measurement,file_number,zone,timestamp,450,454,vol_sm,soil_temp,lwir_mean,lwir_median,lwir_std,air_temp"
    );
    assert!(lines[5].starts_with("20170816_meas2,1,zone1,2017-08-16T08:00:00+00:00,20.5,1,20,16,NaN,NaN,NaN,NaN"));
}

#[test]
fn test_malformed_blank_and_duplicate_files() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let hyp_root = temp_dir.path().join("hyp");
    let folder = hyp_root.join("20170815_hyp_meas1");

    write_cube(&folder, "Auto001", &gradient_cube(), "10:00:00");
    // Payload shorter than the header declares
    write_cube(&folder, "Auto002", &gradient_cube(), "10:00:00");
    fs::write(folder.join("Auto002.img"), vec![0u8; 12]).unwrap();
    // All zeros
    write_cube(&folder, "Auto003", &Array3::zeros((4, 4, 2)), "10:00:00");
    // Same file number as Auto001
    write_cube(&folder, "Auto1", &gradient_cube(), "10:00:00");
    // Header without a payload next to it
    write_cube(&folder, "Auto004", &gradient_cube(), "10:00:00");
    fs::remove_file(folder.join("Auto004.img")).unwrap();
    // Companion headers are not cubes of their own
    fs::copy(folder.join("Auto001.hdr"), folder.join("Auto001_highres.hdr")).unwrap();

    let discovery = discover(&hyp_root).unwrap();
    assert_eq!(discovery.tasks.len(), 4);

    let paths = InputPaths {
        positions_hyp: Some(write_table(temp_dir.path(), "positions.txt", POSITIONS)),
        hyp_root,
        ..InputPaths::default()
    };
    let output = run(&paths, &RunOptions::default());

    let counts = output.diagnostics.counts();
    assert_eq!(counts.get(&DiagnosticCode::MalformedCube), Some(&2));
    assert_eq!(counts.get(&DiagnosticCode::EmptyCube), Some(&1));
    assert_eq!(counts.get(&DiagnosticCode::DuplicateDatapoint), Some(&1));
    // No mask table: the good cube falls back to the full image
    assert_eq!(counts.get(&DiagnosticCode::MissingMaskDefinition), Some(&1));

    // The good cube still contributes both zones
    assert_eq!(output.dataset.len(), 2);
    assert!(output.dataset.records.iter().all(|r| r.id.file_number == 1));
    assert_eq!(output.dataset.records[0].pixel_count, 8);
}

#[test]
fn test_oversized_header_is_malformed() {
    let (_temp_dir, paths) = fixture_root();
    let folder = paths.hyp_root.join("20170815_hyp_meas1");
    // 2^32 x 2^32 f32 samples cannot be addressed
    fs::write(
        folder.join("Auto003.hdr"),
        "ENVI\nsamples = 4294967296\nlines = 4294967296\nbands = 1\nheader offset = 0\n\
         data type = 4\ninterleave = bsq\nbyte order = 0\nacquisition time = 10:10:00\n\
         wavelength = {450}\n",
    )
    .unwrap();
    fs::write(folder.join("Auto003.img"), vec![0u8; 16]).unwrap();

    let output = run(&paths, &RunOptions::default());

    let malformed: Vec<_> = output
        .diagnostics
        .with_code(DiagnosticCode::MalformedCube)
        .collect();
    assert_eq!(malformed.len(), 1);
    assert_eq!(malformed[0].measurement, "20170815_meas1");
    assert_eq!(malformed[0].file_number, Some(3));

    // The remaining files are processed as usual
    assert_eq!(output.dataset.len(), 6);
}

#[test]
fn test_missing_zone_definition_and_coverage() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let hyp_root = temp_dir.path().join("hyp");
    write_cube(&hyp_root.join("20170815_hyp_meas1"), "Auto001", &gradient_cube(), "10:00:00");
    write_cube(&hyp_root.join("20170817_hyp_meas3"), "Auto001", &gradient_cube(), "10:00:00");

    let paths = InputPaths {
        positions_hyp: Some(write_table(temp_dir.path(), "positions.txt", POSITIONS)),
        hyp_root,
        ..InputPaths::default()
    };
    // Each 8-pixel zone needs 9 pixels
    let options = RunOptions {
        min_zone_pixels: 9,
        ..RunOptions::default()
    };
    let output = run(&paths, &options);

    assert!(output.dataset.is_empty());
    let missing: Vec<_> = output
        .diagnostics
        .with_code(DiagnosticCode::MissingZoneDefinition)
        .collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].measurement, "20170817_meas3");
    assert_eq!(
        output
            .diagnostics
            .with_code(DiagnosticCode::InsufficientCoverage)
            .count(),
        2
    );
}

#[test]
fn test_band_mismatch_is_dropped() {
    let (_temp_dir, paths) = fixture_root();
    let three_bands = Array3::from_elem((4, 4, 3), 2.0f32);
    write_cube(
        &paths.hyp_root.join("20170816_hyp_meas2"),
        "Auto002",
        &three_bands,
        "10:00:00",
    );

    let output = run(&paths, &RunOptions::default());
    assert_eq!(
        output
            .diagnostics
            .with_code(DiagnosticCode::BandMismatch)
            .count(),
        1
    );
    assert_eq!(output.dataset.len(), 6);
    assert!(output
        .dataset
        .records
        .iter()
        .all(|r| r.features.len() == 2));
}

#[test]
fn test_repeated_runs_are_identical() {
    let (_temp_dir, paths) = fixture_root();
    let options = RunOptions::default();

    let first = run(&paths, &options);
    let second = run(&paths, &options);
    assert_eq!(first.dataset, second.dataset);
    assert_eq!(first.diagnostics, second.diagnostics);

    let mut json = Vec::new();
    first.diagnostics.write_json(&mut json).unwrap();
    let report: serde_json::Value = serde_json::from_slice(&json).unwrap();
    assert!(report.as_array().unwrap().iter().all(|d| d["code"] != "join_gap"));
}

#[test]
fn test_malformed_table_is_fatal() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let paths = InputPaths {
        hyp_root: temp_dir.path().to_path_buf(),
        positions_hyp: Some(write_table(
            temp_dir.path(),
            "positions.txt",
            "measurement zone1_row_start zone1_row_end zone1_col_start zone1_col_end\nm 1 x 0 4\n",
        )),
        ..InputPaths::default()
    };
    assert!(matches!(
        DatasetContext::load(&paths),
        Err(HydError::Table { .. })
    ));

    let options = RunOptions {
        min_coverage_fraction: -0.1,
        ..RunOptions::default()
    };
    let context = DatasetContext::default();
    let tables = AuxiliaryTables::default();
    assert!(matches!(
        DatasetAssembler::new(&context, &tables, &options),
        Err(HydError::Configuration(_))
    ));
}
