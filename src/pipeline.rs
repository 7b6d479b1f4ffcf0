use crate::common::error::Result;
use crate::common::types::{EventRecord, EventSource, Site};
use crate::infra::ScrapeContext;
use crate::output::save_events;
use metrics::{counter, histogram};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// How a site run ended, from the caller's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    /// At least one event was extracted
    Extracted,
    /// Every request failed; the site was unreachable
    AllFetchesFailed,
    /// Pages came back but nothing matched. Either the site lists no events or its markup changed.
    NothingMatched,
}

/// Result of a complete pipeline run
#[derive(Debug, Serialize)]
pub struct PipelineResult {
    pub site: Site,
    pub total_events: usize,
    pub saved_events: usize,
    pub skipped_events: usize,
    pub output_files: Vec<PathBuf>,
    pub pages_fetched: usize,
    pub fetch_failures: usize,
}

impl PipelineResult {
    pub fn outcome(&self) -> RunOutcome {
        if self.saved_events > 0 {
            RunOutcome::Extracted
        } else if self.pages_fetched == 0 && self.fetch_failures > 0 {
            RunOutcome::AllFetchesFailed
        } else {
            RunOutcome::NothingMatched
        }
    }
}

pub struct Pipeline;

impl Pipeline {
    /// Run the complete pipeline for one site: fetch, filter, save, summarize
    #[instrument(skip(source, ctx, output_dir), fields(site = %source.site()))]
    pub async fn run_for_source(
        source: &dyn EventSource,
        ctx: &ScrapeContext,
        output_dir: &Path,
    ) -> Result<PipelineResult> {
        let site = source.site();
        info!("🚀 Starting pipeline for {}", site);
        counter!("ksa_pipeline_runs_total", "site" => site.api_name()).increment(1);
        let t_pipeline = std::time::Instant::now();
        let stats_before = ctx.fetcher.stats();

        // Step 1: Fetch events
        info!("📡 Fetching events from {}...", site);
        let raw_events = source.get_event_list(ctx).await?;
        info!("✅ Fetched {} raw events", raw_events.len());
        histogram!("ksa_raw_events_per_run", "site" => site.api_name()).record(raw_events.len() as f64);

        // Step 2: Filter
        let total_events = raw_events.len();
        let mut kept = Vec::with_capacity(total_events);
        let mut skipped = 0;
        for record in raw_events {
            let (should_skip, reason) = source.should_skip(&record);
            if should_skip {
                debug!("Skipping event: {}", reason);
                skipped += 1;
            } else {
                kept.push(record);
            }
        }
        counter!("ksa_events_saved_total", "site" => site.api_name()).increment(kept.len() as u64);
        counter!("ksa_events_skipped_total", "site" => site.api_name()).increment(skipped as u64);

        // Step 3: Persist
        let output_files = save_events(&kept, site, output_dir)?;
        if !kept.is_empty() {
            log_summary(&kept);
        }

        let stats_after = ctx.fetcher.stats();
        let result = PipelineResult {
            site,
            total_events,
            saved_events: kept.len(),
            skipped_events: skipped,
            output_files,
            pages_fetched: stats_after.succeeded - stats_before.succeeded,
            fetch_failures: stats_after.failed - stats_before.failed,
        };

        match result.outcome() {
            RunOutcome::Extracted => {}
            RunOutcome::AllFetchesFailed => {
                warn!("Every request to {} failed ({} attempts)", site, result.fetch_failures)
            }
            RunOutcome::NothingMatched => warn!(
                "{} pages fetched from {} but no events extracted; the site may list none or its layout may have changed",
                result.pages_fetched, site
            ),
        }

        histogram!("ksa_pipeline_duration_seconds", "site" => site.api_name())
            .record(t_pipeline.elapsed().as_secs_f64());
        Ok(result)
    }
}

/// Count events per place and show the first few
fn log_summary(events: &[EventRecord]) {
    info!("📊 Scraped {} events", events.len());

    let mut by_place: BTreeMap<&str, usize> = BTreeMap::new();
    for event in events {
        *by_place.entry(event.place()).or_default() += 1;
    }
    for (place, count) in &by_place {
        info!("   {}: {} events", place, count);
    }

    for (i, event) in events.iter().take(3).enumerate() {
        info!("Sample {}: {} | {} | {}", i + 1, event.name, event.start_date, event.place());
    }
}
