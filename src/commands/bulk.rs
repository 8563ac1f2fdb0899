//! Dump and load commands

use indicatif::{ProgressBar, ProgressStyle};
use mramctl_core::bulk::{self, BulkOptions, BulkProgress, BulkReport};
use mramctl_core::router::{ChipRouter, ChipSelector};
use mramctl_core::transport::TransportOpener;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::Duration;

/// Placeholder for the chip number in output paths
const CHIP_PLACEHOLDER: &str = "{chip}";

/// Create a progress bar with custom phase message
fn create_progress_bar_with_phase(
    total: u64,
    phase: &str,
) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {}",
                phase
            ))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Create a spinner for runs of unknown length
fn create_spinner(phase: &str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new_spinner();
    let template = format!(
        "{{spinner:.green}} [{{elapsed_precise}}] {{pos}} records {}",
        phase
    );
    pb.set_style(ProgressStyle::default_spinner().template(&template)?);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Progress reporter using indicatif progress bars
pub struct IndicatifProgress {
    bar: Option<ProgressBar>,
    phase: String,
}

impl IndicatifProgress {
    pub fn new(phase: impl Into<String>) -> Self {
        Self {
            bar: None,
            phase: phase.into(),
        }
    }
}

impl BulkProgress for IndicatifProgress {
    fn started(&mut self, total: Option<usize>) {
        let bar = match total {
            Some(total) => create_progress_bar_with_phase(total as u64, &self.phase)
                .unwrap_or_else(|_| ProgressBar::new(total as u64)),
            None => create_spinner(&self.phase).unwrap_or_else(|_| ProgressBar::new_spinner()),
        };
        self.bar = Some(bar);
    }

    fn advanced(&mut self, processed: usize) {
        if let Some(pb) = &self.bar {
            pb.set_position(processed as u64);
        }
    }

    fn finished(&mut self, report: &BulkReport) {
        if let Some(pb) = self.bar.take() {
            if report.is_complete() {
                pb.finish_with_message("done");
            } else {
                pb.abandon();
            }
        }
    }
}

/// Expand the `{chip}` placeholder in an output path template
fn output_path(template: &str, selector: ChipSelector) -> String {
    template.replace(CHIP_PLACEHOLDER, &selector.number().to_string())
}

/// Print a per-chip summary and return an error message for failed runs
fn summarize(
    results: Vec<(ChipSelector, Result<Result<BulkReport, String>, mramctl_core::Error>)>,
    action: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut failed = Vec::new();
    for (selector, result) in results {
        match result {
            Ok(Ok(report)) => {
                println!("{} {}: {}", action, selector, report);
                if !report.is_complete() {
                    failed.push(format!("{} {}", action, selector));
                }
            }
            Ok(Err(msg)) => {
                println!("{} {}: {}", action, selector, msg);
                failed.push(format!("{} {}", action, selector));
            }
            Err(e) => {
                println!("{} {}: cannot open: {}", action, selector, e);
                failed.push(format!("{} {}", action, selector));
            }
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(format!("Incomplete: {}", failed.join(", ")).into())
    }
}

/// Dump each selected chip to its own text file
pub fn run_dump<O: TransportOpener>(
    router: &mut ChipRouter<O>,
    selectors: &[ChipSelector],
    template: &str,
    options: &BulkOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    if selectors.len() > 1 && !template.contains(CHIP_PLACEHOLDER) {
        return Err(format!(
            "Output path must contain {} when dumping more than one chip",
            CHIP_PLACEHOLDER
        )
        .into());
    }

    let results = router.for_each_chip(selectors, |selector, mram| -> Result<BulkReport, String> {
        let path = output_path(template, selector);
        let file = File::create(&path).map_err(|e| format!("cannot create {}: {}", path, e))?;
        log::info!("Dumping {} to {}", selector, path);
        let mut progress = IndicatifProgress::new(format!("Dumping {}", selector));
        Ok(bulk::dump_to_text(
            mram,
            BufWriter::new(file),
            options,
            &mut progress,
        ))
    });

    summarize(results, "Dump")
}

/// Load each selected chip from the same text file
pub fn run_load<O: TransportOpener>(
    router: &mut ChipRouter<O>,
    selectors: &[ChipSelector],
    input: &Path,
    options: &BulkOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    // Fail before touching any chip if the source is missing
    File::open(input).map_err(|e| format!("cannot open {}: {}", input.display(), e))?;

    let results = router.for_each_chip(selectors, |selector, mram| -> Result<BulkReport, String> {
        let file = File::open(input)
            .map_err(|e| format!("cannot open {}: {}", input.display(), e))?;
        log::info!("Loading {} from {}", selector, input.display());
        let mut progress = IndicatifProgress::new(format!("Loading {}", selector));
        Ok(bulk::load_from_text(
            mram,
            BufReader::new(file),
            options,
            &mut progress,
        ))
    });

    summarize(results, "Load")
}
