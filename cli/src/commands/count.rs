use anyhow::{Context, Result};
use chrono::Local;
use omero_client::Client;

use crate::printer::{ObjectCount, Printer};

const COUNTED_KINDS: [&str; 3] = ["Project", "Dataset", "Image"];

/// HQL counting objects of `kind` whose creation event is today, in server time.
fn created_today_query(kind: &str) -> String {
    format!(
        "SELECT count(obj) FROM {kind} obj WHERE obj.details.creationEvent.time >= current_date()"
    )
}

pub fn count_created_today(client: &Client) -> Result<Vec<ObjectCount>> {
    let today = Local::now().date_naive();
    COUNTED_KINDS
        .iter()
        .map(|kind| {
            let count = client
                .count(&created_today_query(kind))
                .with_context(|| format!("Operation to count {kind} objects has failed"))?;
            Ok(ObjectCount {
                kind: (*kind).to_owned(),
                created_on: today,
                count,
            })
        })
        .collect()
}

pub fn run(client: &Client, printer: &Printer) -> Result<()> {
    printer.print_resources(&count_created_today(client)?)
}
