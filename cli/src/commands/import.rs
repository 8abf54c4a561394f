use anyhow::{Context, Result};
use itertools::Itertools;
use log::{info, warn};
use omero_client::{Client, DatasetId, Import};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use structopt::StructOpt;

use crate::{
    printer::{CreatedObject, Printer},
    progress::{Progress, ProgressMessage},
    utils::{file_name, FilePattern},
};

/// File name patterns imported by a seed run, in import order.
pub const SEED_PATTERNS: [&str; 4] = ["*_14-*.png", "*_15-*.png", "*_16-*.png", "*.ome.tif"];

#[derive(Debug, StructOpt)]
pub struct ImportArgs {
    #[structopt(short = "d", long = "dataset")]
    /// Dataset to import into, as `Dataset:<id>` or a bare id
    dataset: DatasetId,

    #[structopt(long = "data-dir")]
    /// Directory holding the images to import, as seen by the OMERO CLI
    data_dir: Option<String>,

    #[structopt(long = "pattern")]
    /// File name pattern to import; may be repeated [default: the seed patterns]
    patterns: Vec<FilePattern>,

    #[structopt(long = "no-progress")]
    /// Don't display a progress bar
    no_progress: bool,
}

/// Files matching `pattern` are imported into `dataset`.
#[derive(Debug, Clone)]
pub struct ImportRule {
    pub pattern: FilePattern,
    pub dataset: DatasetId,
}

pub fn run(
    client: &Client,
    args: &ImportArgs,
    default_data_dir: &str,
    printer: &Printer,
) -> Result<()> {
    let ImportArgs {
        dataset,
        data_dir,
        patterns,
        no_progress,
    } = args;
    let data_dir = data_dir.as_deref().unwrap_or(default_data_dir);

    let patterns = if patterns.is_empty() {
        SEED_PATTERNS
            .iter()
            .map(|pattern| FilePattern::new(pattern))
            .collect::<Result<Vec<_>>>()?
    } else {
        patterns.clone()
    };
    let rules: Vec<ImportRule> = patterns
        .into_iter()
        .map(|pattern| ImportRule {
            pattern,
            dataset: *dataset,
        })
        .collect();

    client
        .check_directory(data_dir)
        .context("Operation to import files has failed")?;
    let imports = import_matching(client, data_dir, &rules, !no_progress)?;
    printer.print_resources(&imported_objects(&imports))
}

/// Lists `data_dir` once, then imports every file matching each rule in turn. Matches of a
/// single rule are imported in sorted order. A file matching several rules is imported once
/// per rule.
pub fn import_matching(
    client: &Client,
    data_dir: &str,
    rules: &[ImportRule],
    show_progress: bool,
) -> Result<Vec<Import>> {
    let files = client
        .list_files(data_dir)
        .with_context(|| format!("Could not list files in `{data_dir}`"))?;

    let mut plan = Vec::new();
    for rule in rules {
        let before = plan.len();
        plan.extend(
            files
                .iter()
                .filter(|path| rule.pattern.matches(path))
                .map(|path| (path.as_str(), rule.dataset)),
        );
        if plan.len() == before {
            warn!("No files in `{}` match `{}`", data_dir, rule.pattern);
        }
    }
    info!("Importing {} file(s) from `{}`", plan.len(), data_dir);

    let statistics = Arc::new(Statistics::default());
    let _progress = if show_progress && !plan.is_empty() {
        Some(get_progress_bar(plan.len() as u64, &statistics))
    } else {
        None
    };

    let mut imports = Vec::with_capacity(plan.len());
    for (path, dataset) in plan {
        let import = client
            .import(dataset, path)
            .with_context(|| format!("Operation to import `{path}` has failed"))?;
        info!(
            "Imported `{}` into {} [images: {}]",
            file_name(path),
            dataset,
            import.images.iter().join(", ")
        );
        statistics.add_import(&import);
        imports.push(import);
    }
    Ok(imports)
}

pub fn imported_objects(imports: &[Import]) -> Vec<CreatedObject> {
    imports
        .iter()
        .flat_map(|import| {
            import
                .images
                .iter()
                .map(move |image| CreatedObject::new("Image", image.0, file_name(&import.path)))
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct Statistics {
    files: AtomicU64,
    images: AtomicU64,
}

impl Statistics {
    fn add_import(&self, import: &Import) {
        self.files.fetch_add(1, Ordering::SeqCst);
        self.images
            .fetch_add(import.images.len() as u64, Ordering::SeqCst);
    }

    fn num_files(&self) -> u64 {
        self.files.load(Ordering::SeqCst)
    }

    fn num_images(&self) -> u64 {
        self.images.load(Ordering::SeqCst)
    }
}

fn get_progress_bar(total_files: u64, statistics: &Arc<Statistics>) -> Progress {
    Progress::new(
        |statistics: &Statistics| -> ProgressMessage {
            (
                statistics.num_files(),
                format!("{} images", statistics.num_images()),
            )
        },
        statistics,
        total_files,
    )
}
