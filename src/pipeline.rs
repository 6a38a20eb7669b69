//! One run of the service: fetch → render → (maybe) publish.
//!
//! Every stage reports failure as a value. A run always ends in a
//! [`RunOutcome`]; nothing propagates to the trigger that started it.

use std::error::Error;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::alert::stalenesses;
use crate::config::Config;
use crate::ingest::uba::UbaClient;
use crate::ingest::{QueryWindow, SnapshotSource};
use crate::logging::{self, DataSource};
use crate::model::Report;
use crate::publish::bluesky::BlueskyPublisher;
use crate::publish::{PostRef, Publisher};
use crate::report::ReportGenerator;

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Fetch failed or returned nothing; no report was built.
    NoData(String),
    /// Report built, nothing at or above the alert threshold.
    AllClear(Report),
    /// Report built and would have been published.
    DryRun(Report),
    Published { report: Report, post: PostRef },
    PublishFailed { report: Report, reason: String },
}

impl RunOutcome {
    pub fn report(&self) -> Option<&Report> {
        match self {
            RunOutcome::NoData(_) => None,
            RunOutcome::AllClear(report) | RunOutcome::DryRun(report) => Some(report),
            RunOutcome::Published { report, .. } | RunOutcome::PublishFailed { report, .. } => {
                Some(report)
            }
        }
    }

    /// True if the run did not do what it was asked to.
    pub fn is_failure(&self) -> bool {
        matches!(self, RunOutcome::NoData(_) | RunOutcome::PublishFailed { .. })
    }

    /// One-line description for logs and trigger responses.
    pub fn summary(&self) -> String {
        match self {
            RunOutcome::NoData(reason) => format!("Keine gültigen Daten gefunden: {}", reason),
            RunOutcome::AllClear(_) => "Luftqualität gut, kein Post".to_string(),
            RunOutcome::DryRun(_) => "Alarm, Post übersprungen (dry run)".to_string(),
            RunOutcome::Published { post, .. } => {
                format!("Post erfolgreich erstellt: {}", post.uri)
            }
            RunOutcome::PublishFailed { reason, .. } => {
                format!("Fehler beim Posten auf Bluesky: {}", reason)
            }
        }
    }
}

pub struct Pipeline<S, P> {
    source: S,
    publisher: P,
    generator: ReportGenerator,
    tz: Tz,
    stale_after_minutes: u64,
    dry_run: bool,
}

impl<S: SnapshotSource, P: Publisher> Pipeline<S, P> {
    pub fn new(
        source: S,
        publisher: P,
        generator: ReportGenerator,
        tz: Tz,
        stale_after_minutes: u64,
    ) -> Self {
        Pipeline {
            source,
            publisher,
            generator,
            tz,
            stale_after_minutes,
            dry_run: false,
        }
    }

    /// Render and log, but never publish.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn run(&self) -> RunOutcome {
        self.run_at(Utc::now())
    }

    /// Runs once as if the current time were `now`.
    pub fn run_at(&self, now: DateTime<Utc>) -> RunOutcome {
        let station = self.source.station_id().to_string();
        let window = QueryWindow::at(now, self.tz);
        logging::info(
            DataSource::Uba,
            Some(&station),
            &format!(
                "Fetching {} h{} .. {} h{}",
                window.date_from, window.time_from, window.date_to, window.time_to
            ),
        );

        let snapshot = match self.source.fetch_latest(&window) {
            Ok(s) => s,
            Err(e) => {
                logging::log_uba_failure(&station, "Air quality fetch", &e);
                let outcome = RunOutcome::NoData(e.to_string());
                logging::error(DataSource::System, Some(&station), &outcome.summary());
                return outcome;
            }
        };

        if stalenesses::is_stale_at(&snapshot, self.stale_after_minutes, now) {
            logging::warn(
                DataSource::Uba,
                Some(&station),
                &format!(
                    "Latest snapshot {} is {} minutes old",
                    snapshot.key,
                    stalenesses::age_minutes_at(&snapshot, now)
                ),
            );
        }

        let report = self.generator.generate(&snapshot);
        let rendered = snapshot.reading_entries().len() - report.skipped;
        logging::log_report_summary(&station, rendered, report.skipped);
        logging::debug(DataSource::System, Some(&station), &report.text);

        let outcome = if !report.alert {
            RunOutcome::AllClear(report)
        } else if self.dry_run {
            RunOutcome::DryRun(report)
        } else {
            match self.publisher.publish(&report.text) {
                Ok(post) => RunOutcome::Published { report, post },
                Err(e) => {
                    logging::log_bluesky_failure("Publish", &e);
                    RunOutcome::PublishFailed {
                        report,
                        reason: e.to_string(),
                    }
                }
            }
        };

        logging::info(DataSource::System, Some(&station), &outcome.summary());
        outcome
    }
}

/// Pipeline wired to the real UBA and Bluesky clients.
pub fn live_pipeline(
    config: &Config,
) -> Result<Pipeline<UbaClient, BlueskyPublisher>, Box<dyn Error>> {
    let tz = config.station.tz()?;
    let source = UbaClient::new(&config.uba, &config.station.id, tz)?;
    let publisher = BlueskyPublisher::new(&config.bluesky)?;
    let generator = ReportGenerator::from_config(config)?;

    Ok(Pipeline::new(
        source,
        publisher,
        generator,
        tz,
        config.alert.stale_after_minutes,
    ))
}
