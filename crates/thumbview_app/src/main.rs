mod config;
mod logging;
mod preview;

use std::env;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use thumbview_core::{FailureKind, ModelPort, Outcome, ThumbStatus, VecModel, WindowRequest};
use thumbview_engine::{ExtractionService, NameEncoding, TarArchive, ThumbnailScheduler};
use thumbview_logging::{thumb_error, thumb_info};

use config::{load_config, AppConfig};
use logging::LogDestination;
use preview::{Preview, PreviewGenerator};

const DEFAULT_CONFIG: &str = "thumbview.ron";

fn main() -> ExitCode {
    let mut args = env::args().skip(1);
    let Some(archive_path) = args.next().map(PathBuf::from) else {
        eprintln!("usage: thumbview_app <archive.tar> [config.ron]");
        return ExitCode::FAILURE;
    };
    let config_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));

    logging::initialize(LogDestination::Both);
    let config = load_config(&config_path);

    match run(&archive_path, &config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            thumb_error!("thumbview failed on {:?}: {}", archive_path, err);
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    applied: usize,
    failed: usize,
    discarded: usize,
    rejected: usize,
}

impl Tally {
    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Applied => self.applied += 1,
            Outcome::Failed(FailureKind::PoolShutdown) => self.rejected += 1,
            Outcome::Failed(_) => self.failed += 1,
            Outcome::Discarded(_) => self.discarded += 1,
        }
    }
}

/// Scrolls a simulated viewport over the archive one page at a time.
fn run(archive_path: &Path, config: &AppConfig) -> Result<Tally, Box<dyn Error>> {
    let encoding = config
        .name_encoding
        .as_deref()
        .map_or(NameEncoding::Detect, NameEncoding::from_label);
    let archive = Arc::new(TarArchive::open(archive_path, encoding)?);
    let model: VecModel<Preview> = archive.list().into_iter().collect();
    let total = model.len();

    let generator = PreviewGenerator::new(archive.clone(), config.preview_head_bytes);
    let mut scheduler = ThumbnailScheduler::new(&config.scheduler, generator, model)?;
    let page_size = config.page_size.max(1);
    let timeout = Duration::from_millis(config.pump_timeout_ms);

    let mut tally = Tally::default();
    for start in (0..total).step_by(page_size) {
        let visible = WindowRequest::new(start, (start + page_size).min(total));
        let dispatched = scheduler.refresh(Some(visible));
        let merged = scheduler.pump_blocking(timeout);
        merged.iter().for_each(|m| tally.record(&m.outcome));
        thumb_info!(
            "rows {}..{}: dispatched {}, merged {}",
            visible.start,
            visible.end,
            dispatched,
            merged.len()
        );
    }

    let model = scheduler.shutdown();
    archive.close();

    thumb_info!(
        "{} entries: {} ready, {} failed; merges applied {}, failed {}, discarded {}, rejected {}",
        total,
        model.count_with_status(ThumbStatus::Ready),
        model.count_with_status(ThumbStatus::Failed),
        tally.applied,
        tally.failed,
        tally.discarded,
        tally.rejected
    );
    for (uid, status, preview) in model.iter() {
        match preview {
            Some(p) => println!("{uid}\t{} bytes\t{}", p.byte_len, p.digest),
            None => println!("{uid}\t{status:?}"),
        }
    }
    Ok(tally)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use thumbview_core::SchedulerConfig;

    fn tarball(count: usize) -> tempfile::NamedTempFile {
        let mut builder = tar::Builder::new(Vec::new());
        for i in 0..count {
            let data = format!("page {i}").into_bytes();
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, format!("{i:03}.png"), data.as_slice())
                .unwrap();
        }
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&builder.into_inner().unwrap()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn run_scrolls_through_every_page() {
        thumbview_logging::initialize_for_tests();
        let file = tarball(25);
        let config = AppConfig {
            scheduler: SchedulerConfig::new(2),
            page_size: 4,
            pump_timeout_ms: 10_000,
            ..AppConfig::default()
        };
        let tally = run(file.path(), &config).unwrap();
        assert_eq!(tally.applied, 25);
        assert_eq!(tally.failed + tally.rejected, 0);
    }

    #[test]
    fn run_reports_a_missing_archive() {
        let config = AppConfig::default();
        assert!(run(Path::new("/nonexistent/thumbview.tar"), &config).is_err());
    }

    #[test]
    fn tally_separates_rejections_from_failures() {
        let mut tally = Tally::default();
        tally.record(&Outcome::Applied);
        tally.record(&Outcome::Failed(FailureKind::PoolShutdown));
        tally.record(&Outcome::Failed(FailureKind::NotFound));
        assert_eq!((tally.applied, tally.rejected, tally.failed, tally.discarded), (1, 1, 1, 0));
    }
}
