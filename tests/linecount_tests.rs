use linecount::generate::{make_file, FileSpec};
use linecount::reference::count_lines_wc;
use linecount::{
    count_lines_estimate, count_lines_exact, estimate, EstimateMethod, EstimateParams,
    LineCountError,
};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

fn write_temp_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file.flush().unwrap();
    file
}

/// Fails the test if the estimator asks for a random offset.
struct PanickingRng;

impl RngCore for PanickingRng {
    fn next_u32(&mut self) -> u32 {
        panic!("random source used")
    }
    fn next_u64(&mut self) -> u64 {
        panic!("random source used")
    }
    fn fill_bytes(&mut self, _dest: &mut [u8]) {
        panic!("random source used")
    }
    fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
        panic!("random source used")
    }
}

fn small_params() -> EstimateParams {
    EstimateParams {
        n_samples: 5,
        chunk_size: 4096,
        sample_length: 4,
    }
}

#[test]
fn test_empty_file() {
    let file = write_temp_file("");
    assert_eq!(count_lines_exact(file.path()).unwrap(), 0);
    let estimated =
        count_lines_estimate(file.path(), &EstimateParams::default(), &mut PanickingRng).unwrap();
    assert_eq!(estimated, 0);
}

#[test]
fn test_one_line_no_newline() {
    let file = write_temp_file("Hello, world!");
    assert_eq!(count_lines_exact(file.path()).unwrap(), 0);
}

#[test]
fn test_one_line_with_newline() {
    let file = write_temp_file("Hello, world!\n");
    assert_eq!(count_lines_exact(file.path()).unwrap(), 1);
}

#[test]
fn test_multiple_lines_no_trailing_newline() {
    let file = write_temp_file("line1\nline2\nline3");
    assert_eq!(count_lines_exact(file.path()).unwrap(), 2);
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.txt");
    assert!(matches!(
        count_lines_exact(&path),
        Err(LineCountError::PathNotFound(_))
    ));
    assert!(matches!(
        count_lines_estimate(&path, &small_params(), &mut StdRng::seed_from_u64(1)),
        Err(LineCountError::PathNotFound(_))
    ));
}

#[test]
fn exact_matches_wc() {
    let dir = TempDir::new().unwrap();
    let specs = [
        FileSpec::new(0, 0..=10),
        FileSpec::new(1, 5..=5).without_final_newline(),
        FileSpec::new(4_200, 0..=100).without_final_newline(),
        FileSpec::new(30_000, 0..=200),
    ];
    let mut rng = StdRng::seed_from_u64(3);

    for (i, spec) in specs.iter().enumerate() {
        let path = dir.path().join(format!("file-{i}.txt"));
        make_file(&path, spec, &mut rng).unwrap();
        let exact = count_lines_exact(&path).unwrap();
        assert_eq!(exact, spec.expected_newlines());

        // wc may be missing on minimal systems.
        if let Ok(reference) = count_lines_wc(&path) {
            assert_eq!(exact, reference, "{}", path.display());
        }
    }
}

#[test]
fn default_params_never_sample_a_small_file() {
    let content = (0..10_000)
        .map(|i| format!("line {}\n", i))
        .collect::<String>();
    let file = write_temp_file(&content);

    let exact = count_lines_exact(file.path()).unwrap();
    let result = estimate(file.path(), &EstimateParams::default(), &mut PanickingRng).unwrap();

    assert_eq!(result.lines, exact);
    assert_eq!(result.method, EstimateMethod::Exact);
}

#[test]
fn budget_equal_to_file_size_counts_exactly() {
    let params = EstimateParams {
        n_samples: 2,
        chunk_size: 8,
        sample_length: 4,
    };
    // 64 bytes, exactly the budget.
    let file = write_temp_file(&"abcdefg\n".repeat(8));
    let estimated = count_lines_estimate(file.path(), &params, &mut PanickingRng).unwrap();
    assert_eq!(estimated, 8);
}

#[test]
fn estimate_within_ten_percent_across_seeds() {
    const NUM_LINES: u64 = 10_000;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("uniform.txt");
    let spec = FileSpec::new(NUM_LINES, 75..=85);
    let written = make_file(&path, &spec, &mut StdRng::seed_from_u64(42)).unwrap();

    let params = small_params();
    assert!(params.bytes_to_read().unwrap() < written);

    for seed in 0..20 {
        let result = estimate(&path, &params, &mut StdRng::seed_from_u64(seed)).unwrap();
        assert!(matches!(result.method, EstimateMethod::Sampled { .. }));

        let diff = (result.lines as i64 - NUM_LINES as i64).abs();
        assert!(
            diff <= (NUM_LINES / 10) as i64,
            "seed {}: estimated {} vs {}",
            seed,
            result.lines,
            NUM_LINES
        );
    }
}

#[test]
fn estimate_mean_within_four_stddevs_of_exact() {
    const NUM_TRIALS: usize = 20;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("short-lines.txt");
    make_file(
        &path,
        &FileSpec::new(100_000, 1..=10),
        &mut StdRng::seed_from_u64(42),
    )
    .unwrap();

    let exact = count_lines_exact(&path).unwrap() as f64;
    let params = EstimateParams {
        n_samples: 3,
        chunk_size: 4 * 1024,
        sample_length: 2,
    };

    let estimates: Vec<f64> = (0..NUM_TRIALS as u64)
        .map(|seed| {
            count_lines_estimate(&path, &params, &mut StdRng::seed_from_u64(seed)).unwrap() as f64
        })
        .collect();

    let mean = estimates.iter().sum::<f64>() / NUM_TRIALS as f64;
    let stddev = (estimates.iter().map(|x| (x - mean).powi(2)).sum::<f64>()
        / NUM_TRIALS as f64)
        .sqrt();
    let tolerance = 4.0 * stddev + exact * 0.01;

    assert!(
        (mean - exact).abs() <= tolerance,
        "mean {mean:.0} is more than {tolerance:.0} away from {exact}"
    );
}

#[test]
fn estimate_is_deterministic_with_seed() {
    let content = (0..10_000)
        .map(|i| format!("line {}\n", i))
        .collect::<String>();
    let file = write_temp_file(&content);

    let params = EstimateParams {
        n_samples: 3,
        chunk_size: 1 << 10,
        sample_length: 10,
    };

    let est1 = count_lines_estimate(file.path(), &params, &mut StdRng::seed_from_u64(42)).unwrap();
    let est2 = count_lines_estimate(file.path(), &params, &mut StdRng::seed_from_u64(42)).unwrap();

    assert_eq!(est1, est2, "Estimates with same seed should match");
}

#[test]
fn sampled_bytes_always_match_budget() {
    // Small file so most random starts wrap past the end.
    let file = write_temp_file(&"0123456789abcde\n".repeat(100));
    let params = EstimateParams {
        n_samples: 2,
        chunk_size: 64,
        sample_length: 5,
    };

    for seed in 0..50 {
        let result = estimate(file.path(), &params, &mut StdRng::seed_from_u64(seed)).unwrap();
        match result.method {
            EstimateMethod::Sampled {
                n_newlines,
                bytes_read,
            } => {
                assert_eq!(bytes_read, 2 * 64 * 5);
                // Period-16 content: every 640-byte run holds 40 newlines.
                assert_eq!(n_newlines, 40);
            }
            EstimateMethod::Exact => panic!("expected sampling"),
        }
        assert_eq!(result.lines, 100);
    }
}

#[test]
fn no_sampled_newlines_is_an_error() {
    let file = write_temp_file(&"x".repeat(100_000));
    let err = count_lines_estimate(file.path(), &small_params(), &mut StdRng::seed_from_u64(9))
        .unwrap_err();
    assert!(matches!(
        err,
        LineCountError::InsufficientSampleData { bytes_read } if bytes_read == 5 * 4096 * 4
    ));
}

#[test]
fn invalid_params_are_rejected_before_io() {
    let dir = TempDir::new().unwrap();
    let params = EstimateParams {
        n_samples: 0,
        ..EstimateParams::default()
    };
    let err = count_lines_estimate(&dir.path().join("absent"), &params, &mut PanickingRng)
        .unwrap_err();
    assert!(matches!(err, LineCountError::InvalidParameters(_)));
}
