//! sync command: bring every active draw in line with its bracket page
//!
//! Draws are processed one at a time: fetch, extract, check the slot count,
//! reconcile against storage, apply. A failing draw is logged and the batch
//! moves on; only configuration and authentication problems abort the run.

use crate::error::{Result as SyncResult, SyncError};
use crate::extract::{extract, Site};
use crate::fetch::{AnyFetcher, FetchConfig, FetchMode, Fetcher};
use crate::model::{Draw, Set, SlotKey};
use crate::output::{render, OutputFormat};
use crate::reconcile::{reconcile, ChangeSet, NewSet};
use crate::store::{DrawStore, PocketBaseStore};
use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Args)]
pub struct SyncArgs {
    /// Backend root URL
    #[arg(long, env = "BASE_URL")]
    base_url: String,

    /// Script user identity
    #[arg(long, env = "SCRIPT_USER_USERNAME")]
    username: String,

    /// Script user password
    #[arg(long, env = "SCRIPT_USER_PASSWORD", hide_env_values = true)]
    password: String,

    /// Egress proxy every page fetch goes through
    #[arg(long, env = "PROXY_URL")]
    proxy_url: Option<String>,

    /// Where page markup comes from
    #[arg(long, env = "FETCH_MODE", value_enum, default_value_t = FetchMode::Live)]
    fetch_mode: FetchMode,

    /// Directory of saved pages for record/fixture modes
    #[arg(long, env = "FIXTURE_DIR", default_value = "scraped_pages")]
    fixture_dir: PathBuf,

    /// Print the computed changes without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Report format on stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Timeout per fetch attempt in seconds
    #[arg(long, default_value = "300")]
    timeout: u64,

    /// Fetch attempts per page
    #[arg(long, default_value = "5")]
    retries: u32,
}

/// Outcome of one draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawStatus {
    /// Changes applied (possibly none)
    Synced,
    /// Dry run, changes only computed
    Planned,
    /// Scraped slot count did not match the draw size
    Incomplete,
    /// URL does not belong to a known site
    Unsupported,
    /// Store call failed before anything could be applied
    Failed,
}

/// Writes performed for one draw
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyCounts {
    pub slots_created: usize,
    pub sets_created: usize,
    pub slots_updated: usize,
    pub sets_updated: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DrawReport {
    pub draw_id: String,
    pub draw: String,
    pub status: DrawStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<ChangeSet>,
    pub applied: ApplyCounts,
}

impl DrawReport {
    fn new(draw: &Draw, status: DrawStatus) -> Self {
        Self {
            draw_id: draw.id.clone(),
            draw: format!("{} {} {}", draw.name, draw.year, draw.event),
            status,
            detail: None,
            changes: None,
            applied: ApplyCounts::default(),
        }
    }

    fn with_detail(mut self, detail: impl ToString) -> Self {
        self.detail = Some(detail.to_string());
        self
    }
}

/// Report of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub dry_run: bool,
    pub synced: usize,
    pub skipped: usize,
    pub failed: usize,
    pub draws: Vec<DrawReport>,
}

/// Run the sync command
pub async fn run_sync(args: SyncArgs) -> Result<()> {
    let config = FetchConfig {
        proxy_url: args.proxy_url.clone(),
        timeout: Duration::from_secs(args.timeout),
        attempts: args.retries,
        ..FetchConfig::default()
    };

    if args.fetch_mode != FetchMode::Fixture && config.proxy_url.is_none() {
        warn!("no proxy configured, fetching pages directly");
    }

    let fetcher = AnyFetcher::new(args.fetch_mode, &config, &args.fixture_dir)
        .context("Failed to set up page fetcher")?;

    let store = PocketBaseStore::login(&args.base_url, &args.username, &args.password)
        .await
        .with_context(|| format!("Failed to authenticate with {}", args.base_url))?;

    let draws = store
        .list_active_draws()
        .await
        .context("Failed to list active draws")?;
    info!(count = draws.len(), dry_run = args.dry_run, "active draws");

    let report = sync_all(&store, &fetcher, &draws, args.dry_run).await;
    info!(
        synced = report.synced,
        skipped = report.skipped,
        failed = report.failed,
        "run finished"
    );

    println!("{}", render(&report, args.format)?);

    Ok(())
}

/// Sync draws sequentially; no draw's failure stops the others
pub async fn sync_all<S: DrawStore, F: Fetcher>(
    store: &S,
    fetcher: &F,
    draws: &[Draw],
    dry_run: bool,
) -> SyncReport {
    let mut report = SyncReport {
        dry_run,
        synced: 0,
        skipped: 0,
        failed: 0,
        draws: Vec::with_capacity(draws.len()),
    };

    for draw in draws {
        info!(draw = %draw, url = %draw.url, "syncing draw");

        let result = match sync_draw(store, fetcher, draw, dry_run).await {
            Ok(result) => result,
            Err(e) => {
                error!(draw = %draw, error = %e, "draw failed");
                DrawReport::new(draw, DrawStatus::Failed).with_detail(e)
            }
        };

        match result.status {
            DrawStatus::Synced | DrawStatus::Planned => report.synced += 1,
            DrawStatus::Incomplete | DrawStatus::Unsupported => report.skipped += 1,
            DrawStatus::Failed => report.failed += 1,
        }
        report.draws.push(result);
    }

    report
}

/// Fetch, extract, reconcile and (unless `dry_run`) apply one draw
pub async fn sync_draw<S: DrawStore, F: Fetcher>(
    store: &S,
    fetcher: &F,
    draw: &Draw,
    dry_run: bool,
) -> SyncResult<DrawReport> {
    let Some(site) = Site::from_url(&draw.url) else {
        warn!(draw = %draw, url = %draw.url, "no extractor for this site, skipping");
        return Ok(DrawReport::new(draw, DrawStatus::Unsupported).with_detail(&draw.url));
    };

    let html = fetcher.fetch(&draw.url).await;
    let extraction = extract(site, &html, &draw.id);

    // A partial or broken page must never be reconciled
    let expected = draw.expected_slots();
    if extraction.slots.len() != expected {
        let mismatch = SyncError::SlotCount {
            draw: draw.to_string(),
            expected,
            actual: extraction.slots.len(),
        };
        error!(%site, error = %mismatch, "slot count mismatch, skipping draw");
        return Ok(DrawReport::new(draw, DrawStatus::Incomplete).with_detail(mismatch));
    }

    let persisted = store.list_slots(&draw.id).await?;
    let changes = reconcile(&extraction.slots, &persisted, &extraction.seeds);
    info!(
        draw = %draw,
        new_slots = changes.new_slots.len(),
        updated_slots = changes.updated_slots.len(),
        new_sets = changes.new_sets.len(),
        updated_sets = changes.updated_sets.len(),
        "reconciled"
    );

    if dry_run {
        let mut report = DrawReport::new(draw, DrawStatus::Planned);
        report.changes = Some(changes);
        return Ok(report);
    }

    let mut report = DrawReport::new(draw, DrawStatus::Synced);
    report.applied = apply(store, &changes).await;
    Ok(report)
}

/// Write a change-set: new slots, new sets, slot updates, set updates
///
/// Individual write failures are logged and counted, never fatal.
pub async fn apply<S: DrawStore>(store: &S, changes: &ChangeSet) -> ApplyCounts {
    let mut counts = ApplyCounts::default();
    let mut created: HashMap<SlotKey, String> = HashMap::new();

    for slot in &changes.new_slots {
        match store.create_slot(slot).await {
            Ok(id) => {
                info!(slot = %slot.key(), %id, name = %slot.name, "created slot");
                created.insert(slot.key(), id);
                counts.slots_created += 1;
            }
            Err(e) => {
                error!(slot = %slot.key(), error = %e, "failed to create slot");
                counts.failed += 1;
            }
        }
    }

    for new_set in &changes.new_sets {
        let set = match owned_set(new_set, &created) {
            Ok(set) => set,
            Err(e) => {
                warn!(number = new_set.set.number, error = %e, "skipping set");
                counts.failed += 1;
                continue;
            }
        };

        match store.create_set(&set).await {
            Ok(id) => {
                info!(slot = %new_set.slot, number = set.number, %id, "created set");
                counts.sets_created += 1;
            }
            Err(e) => {
                error!(slot = %new_set.slot, number = set.number, error = %e, "failed to create set");
                counts.failed += 1;
            }
        }
    }

    for slot in &changes.updated_slots {
        match store.update_slot(&slot.id, slot).await {
            Ok(()) => {
                info!(slot = %slot.key(), id = %slot.id, name = %slot.name, seed = %slot.seed, "updated slot");
                counts.slots_updated += 1;
            }
            Err(e) => {
                error!(slot = %slot.key(), id = %slot.id, error = %e, "failed to update slot");
                counts.failed += 1;
            }
        }
    }

    for set in &changes.updated_sets {
        match store.update_set(&set.id, set).await {
            Ok(()) => {
                info!(id = %set.id, games = set.games, tiebreak = set.tiebreak, "updated set");
                counts.sets_updated += 1;
            }
            Err(e) => {
                error!(id = %set.id, error = %e, "failed to update set");
                counts.failed += 1;
            }
        }
    }

    counts
}

/// The set with its owning slot id filled in from this run's creations
fn owned_set(new_set: &NewSet, created: &HashMap<SlotKey, String>) -> SyncResult<Set> {
    if !new_set.set.slot_id.is_empty() {
        return Ok(new_set.set.clone());
    }

    let slot_id = created
        .get(&new_set.slot)
        .ok_or_else(|| SyncError::MissingSlot(new_set.slot.to_string()))?;

    Ok(Set {
        slot_id: slot_id.clone(),
        ..new_set.set.clone()
    })
}
