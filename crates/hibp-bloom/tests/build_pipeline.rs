//! # Build Pipeline Tests
//!
//! End-to-end builds through `FilterBuilderService` and `FilterFileStore`
//! against real files in a temporary directory.
//!
//! ## Test Categories
//!
//! 1. **Happy Path** - Membership, sizing, progress sequence
//! 2. **Preconditions** - Missing input, missing output
//! 3. **Malformed Input** - Short records abort the build
//! 4. **Cancellation** - During counting and during insertion
//! 5. **Persistence Failures** - No 100% report, no file left behind

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use hibp_bloom::adapters::filter_file::{partial_path, HEADER_LEN};
use hibp_bloom::{
    BloomFilter, BuildConfig, BuildError, BuildOutcome, BuildRequest, BuildStage,
    CancellationToken, CodecError, FilterBuildApi, FilterBuilderService, FilterFileStore,
    FilterStore, ProgressSink, ProgressUpdate,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// =============================================================================
// TEST HELPERS
// =============================================================================

#[derive(Default)]
struct RecordingProgress {
    updates: Mutex<Vec<ProgressUpdate>>,
}

impl RecordingProgress {
    fn percents(&self) -> Vec<u8> {
        self.updates.lock().unwrap().iter().map(|u| u.percent).collect()
    }
}

impl ProgressSink for RecordingProgress {
    fn report(&self, update: ProgressUpdate) {
        self.updates.lock().unwrap().push(update);
    }
}

/// Cancels the build as soon as insertion progress is reported
struct CancelDuringInsert {
    token: CancellationToken,
    seen: Mutex<Vec<u8>>,
}

impl ProgressSink for CancelDuringInsert {
    fn report(&self, update: ProgressUpdate) {
        self.seen.lock().unwrap().push(update.percent);
        if update.percent > 5 {
            self.token.cancel();
        }
    }
}

/// Store whose disk is always full
struct FailingStore;

impl FilterStore for FailingStore {
    fn write(&self, path: &Path, _: &BloomFilter) -> Result<u64, CodecError> {
        Err(CodecError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "no space left on device"),
        })
    }

    fn read(&self, path: &Path) -> Result<BloomFilter, CodecError> {
        Err(CodecError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }
}

fn random_key(rng: &mut StdRng) -> String {
    (0..40)
        .map(|_| char::from(b"0123456789ABCDEF"[rng.gen_range(0..16)]))
        .collect()
}

fn write_lines(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.join(name);
    let mut contents = lines.join("\n");
    contents.push('\n');
    fs::write(&path, contents).unwrap();
    path
}

fn file_service() -> FilterBuilderService<FilterFileStore> {
    FilterBuilderService::new(Arc::new(FilterFileStore))
}

fn build(
    service: &FilterBuilderService<FilterFileStore>,
    input: &Path,
    output: &Path,
    progress: &dyn ProgressSink,
) -> Result<BuildOutcome, BuildError> {
    service.build(
        &BuildRequest::new(input, output),
        progress,
        &CancellationToken::new(),
    )
}

// =============================================================================
// HAPPY PATH
// =============================================================================

#[test]
fn test_three_records_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let lines = vec![
        "000000005AD76BD555C1D6D771DE417A4B87E4B4:10".to_string(),
        "00000000A8DAE4228F821FB418F59826079BF368:4".to_string(),
        "00000000DD7F2A1C68A35673713783CA390C9E93:873".to_string(),
    ];
    let input = write_lines(dir.path(), "pwned.txt", &lines);
    let output = dir.path().join("HIBPBloomFilter.bin");
    let progress = RecordingProgress::default();

    let outcome = build(&file_service(), &input, &output, &progress).unwrap();
    let report = outcome.report().expect("completed");

    assert_eq!(report.records, 3);
    assert_eq!(report.inserted, 3);
    assert_eq!(report.size_bits, 44);
    assert_eq!(report.hash_count, 10);
    assert_eq!(report.output_path, output);
    assert_eq!(progress.percents(), vec![1, 5, 35, 65, 95, 100]);

    // 52-byte header, 6-byte payload, 4-byte checksum
    assert_eq!(fs::metadata(&output).unwrap().len(), HEADER_LEN + 6 + 4);
    assert_eq!(report.bytes_written, HEADER_LEN + 6 + 4);

    let filter = FilterFileStore.read(&output).unwrap();
    for line in &lines {
        assert!(filter.might_contain(&line.as_bytes()[..40]));
    }
    assert_eq!(filter.elements_inserted(), 3);
}

#[test]
fn test_empty_input_writes_minimal_filter() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("empty.txt");
    fs::write(&input, b"").unwrap();
    let output = dir.path().join("empty.bin");
    let progress = RecordingProgress::default();

    let report = build(&file_service(), &input, &output, &progress)
        .unwrap()
        .report()
        .cloned()
        .unwrap();

    assert_eq!(report.records, 0);
    assert_eq!(report.size_bits, 1);
    assert_eq!(report.hash_count, 1);
    assert_eq!(progress.percents(), vec![1, 5, 100]);
    assert_eq!(fs::metadata(&output).unwrap().len(), HEADER_LEN + 1 + 4);
}

#[test]
fn test_crlf_and_unterminated_last_line() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("crlf.txt");
    fs::write(
        &input,
        "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA:1\r\n\
         BBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB\r\n\
         CCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCC:3",
    )
    .unwrap();
    let output = dir.path().join("crlf.bin");

    let outcome = build(&file_service(), &input, &output, &RecordingProgress::default()).unwrap();
    assert_eq!(outcome.report().unwrap().records, 3);

    let filter = FilterFileStore.read(&output).unwrap();
    assert!(filter.might_contain(b"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"));
    // Exactly 40 characters, no count suffix
    assert!(filter.might_contain(b"BBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB"));
    assert!(filter.might_contain(b"CCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCC"));
}

#[test]
fn test_leading_byte_order_mark_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let lines = vec![
        "000000005AD76BD555C1D6D771DE417A4B87E4B4:10".to_string(),
        "00000000A8DAE4228F821FB418F59826079BF368:4".to_string(),
    ];
    let plain = write_lines(dir.path(), "plain.txt", &lines);
    let with_bom = dir.path().join("bom.txt");
    let mut contents = b"\xEF\xBB\xBF".to_vec();
    contents.extend_from_slice(&fs::read(&plain).unwrap());
    fs::write(&with_bom, contents).unwrap();

    let bom_output = dir.path().join("bom.bin");
    let plain_output = dir.path().join("plain.bin");
    let service = file_service();
    let outcome = build(&service, &with_bom, &bom_output, &RecordingProgress::default()).unwrap();
    assert_eq!(outcome.report().unwrap().inserted, 2);
    build(&service, &plain, &plain_output, &RecordingProgress::default()).unwrap();

    let filter = FilterFileStore.read(&bom_output).unwrap();
    assert!(filter.might_contain(b"000000005AD76BD555C1D6D771DE417A4B87E4B4"));
    assert!(filter.might_contain(b"00000000A8DAE4228F821FB418F59826079BF368"));
    assert_eq!(
        filter.as_bytes(),
        FilterFileStore.read(&plain_output).unwrap().as_bytes()
    );
}

#[test]
fn test_observed_false_positive_rate_near_target() {
    let dir = tempfile::tempdir().unwrap();
    let mut rng = StdRng::seed_from_u64(0x5EED);
    let lines: Vec<String> = (0..20_000)
        .map(|i| format!("{}:{}", random_key(&mut rng), i + 1))
        .collect();
    let input = write_lines(dir.path(), "sample.txt", &lines);
    let output = dir.path().join("sample.bin");

    build(&file_service(), &input, &output, &RecordingProgress::default()).unwrap();
    let filter = FilterFileStore.read(&output).unwrap();

    let mut sample_rng = StdRng::seed_from_u64(0xFA15E);
    let trials = 100_000;
    let hits = (0..trials)
        .filter(|_| filter.might_contain(random_key(&mut sample_rng).as_bytes()))
        .count();

    let observed = hits as f64 / trials as f64;
    assert!(observed <= 0.002, "observed FPR {} exceeds 2x target", observed);
}

#[test]
fn test_progress_updates_carry_stage_and_estimate() {
    let dir = tempfile::tempdir().unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    let lines: Vec<String> = (0..500).map(|_| random_key(&mut rng)).collect();
    let input = write_lines(dir.path(), "in.txt", &lines);
    let progress = RecordingProgress::default();

    build(&file_service(), &input, &dir.path().join("out.bin"), &progress).unwrap();

    let updates = progress.updates.lock().unwrap();
    assert_eq!(updates[0].stage, BuildStage::Counting);
    // Before anything is measured the configured total is scaled instead
    let fallback =
        std::time::Duration::from_secs(BuildConfig::default().estimated_total_minutes * 60);
    assert_eq!(updates[0].remaining, fallback.mul_f64(0.99));
    assert_eq!(updates[0].remaining_label(), "40 minutes");
    assert!(updates
        .iter()
        .filter(|u| u.percent > 5 && u.percent < 100)
        .all(|u| u.stage == BuildStage::Inserting));
    assert!(updates.windows(2).all(|w| w[0].percent < w[1].percent));
}

// =============================================================================
// PRECONDITIONS
// =============================================================================

#[test]
fn test_missing_input_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("does-not-exist.txt");
    let progress = RecordingProgress::default();

    let err = build(&file_service(), &input, &dir.path().join("o.bin"), &progress).unwrap_err();

    assert!(matches!(err, BuildError::InputNotFound { ref path } if *path == input));
    assert!(progress.percents().is_empty());
}

#[test]
fn test_missing_output_is_reported_first() {
    let dir = tempfile::tempdir().unwrap();
    let progress = RecordingProgress::default();

    let err = build(
        &file_service(),
        &dir.path().join("nope.txt"),
        Path::new(""),
        &progress,
    )
    .unwrap_err();

    assert!(matches!(err, BuildError::OutputNotSpecified));
    assert!(progress.percents().is_empty());
}

// =============================================================================
// MALFORMED INPUT
// =============================================================================

#[test]
fn test_short_record_aborts_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let lines = vec![
        "0123456789ABCDEF0123456789ABCDEF01234567".to_string(),
        "0123456789ABCDEF0123456789ABCDEF0123456".to_string(),
        "0123456789ABCDEF0123456789ABCDEF01234567:9".to_string(),
    ];
    let input = write_lines(dir.path(), "short.txt", &lines);
    let output = dir.path().join("short.bin");
    let service = file_service();

    let err = build(&service, &input, &output, &RecordingProgress::default()).unwrap_err();
    assert_eq!(err.stage(), Some(BuildStage::Inserting));

    match err {
        BuildError::MalformedRecord {
            line,
            length,
            expected,
        } => {
            assert_eq!(line, 2);
            assert_eq!(length, 39);
            assert_eq!(expected, 40);
        }
        other => panic!("expected MalformedRecord, got {:?}", other),
    }
    assert!(!output.exists());
    assert_eq!(service.metrics().snapshot().builds_failed, 1);
}

#[test]
fn test_blank_line_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("blank.txt");
    fs::write(&input, "0123456789ABCDEF0123456789ABCDEF01234567\n\n").unwrap();

    let err = build(
        &file_service(),
        &input,
        &dir.path().join("blank.bin"),
        &RecordingProgress::default(),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        BuildError::MalformedRecord {
            line: 2,
            length: 0,
            ..
        }
    ));
}

// =============================================================================
// CANCELLATION
// =============================================================================

#[test]
fn test_cancel_during_counting() {
    let dir = tempfile::tempdir().unwrap();
    let mut rng = StdRng::seed_from_u64(2);
    let lines: Vec<String> = (0..100).map(|_| random_key(&mut rng)).collect();
    let input = write_lines(dir.path(), "in.txt", &lines);
    let output = dir.path().join("out.bin");

    let service = FilterBuilderService::with_config(
        Arc::new(FilterFileStore),
        BuildConfig::default().with_count_check_interval(1),
    );
    let token = CancellationToken::new();
    token.cancel();
    let progress = RecordingProgress::default();

    let outcome = service
        .build(&BuildRequest::new(&input, &output), &progress, &token)
        .unwrap();

    assert_eq!(
        outcome,
        BuildOutcome::Canceled {
            stage: BuildStage::Counting
        }
    );
    assert_eq!(progress.percents(), vec![1]);
    assert!(!output.exists());
    assert_eq!(service.metrics().snapshot().builds_canceled, 1);
}

#[test]
fn test_cancel_during_insertion() {
    let dir = tempfile::tempdir().unwrap();
    let mut rng = StdRng::seed_from_u64(3);
    let lines: Vec<String> = (0..1_000).map(|_| random_key(&mut rng)).collect();
    let input = write_lines(dir.path(), "in.txt", &lines);
    let output = dir.path().join("out.bin");

    let token = CancellationToken::new();
    let sink = CancelDuringInsert {
        token: token.clone(),
        seen: Mutex::new(Vec::new()),
    };
    let service = file_service();

    let outcome = service
        .build(&BuildRequest::new(&input, &output), &sink, &token)
        .unwrap();

    assert_eq!(
        outcome,
        BuildOutcome::Canceled {
            stage: BuildStage::Inserting
        }
    );
    let seen = sink.seen.lock().unwrap();
    assert_eq!(*seen, vec![1, 5, 6]);
    assert!(!output.exists());
    assert!(!partial_path(&output).unwrap().exists());
    // tick = 10; 6% is first reached at 20 records
    assert_eq!(service.metrics().snapshot().keys_inserted, 20);
}

// =============================================================================
// PERSISTENCE FAILURES
// =============================================================================

#[test]
fn test_store_failure_is_a_persisting_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_lines(
        dir.path(),
        "in.txt",
        &["0123456789ABCDEF0123456789ABCDEF01234567".to_string()],
    );
    let output = dir.path().join("out.bin");
    let service = FilterBuilderService::new(Arc::new(FailingStore));
    let progress = RecordingProgress::default();

    let err = service
        .build(
            &BuildRequest::new(&input, &output),
            &progress,
            &CancellationToken::new(),
        )
        .unwrap_err();

    assert!(matches!(
        err,
        BuildError::Io {
            stage: BuildStage::Persisting,
            ..
        }
    ));
    assert_eq!(err.stage(), Some(BuildStage::Persisting));
    assert!(!progress.percents().contains(&100));
    assert!(!output.exists());
}

#[test]
fn test_rebuild_replaces_existing_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.bin");
    fs::write(&output, b"stale").unwrap();

    let input = write_lines(
        dir.path(),
        "in.txt",
        &["FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF:2".to_string()],
    );
    build(&file_service(), &input, &output, &RecordingProgress::default()).unwrap();

    let filter = FilterFileStore.read(&output).unwrap();
    assert!(filter.might_contain(b"FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF"));
}
