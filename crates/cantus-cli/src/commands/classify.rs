//! Classify command implementation.

use anyhow::Result;
use clap::Args;

use cantus_core::{group_tags, TagCategory};

use super::print_json;

/// Arguments for the classify command.
#[derive(Args)]
pub struct ClassifyArgs {
    /// Tags to classify
    #[arg(required = true)]
    pub tags: Vec<String>,

    /// Print the tags grouped by category as JSON
    #[arg(long)]
    pub grouped: bool,
}

/// Runs the classify command. Needs no configuration.
pub fn run(args: &ClassifyArgs) -> Result<()> {
    if args.grouped {
        return print_json(&group_tags(args.tags.iter().map(String::as_str)));
    }

    for tag in &args.tags {
        println!("{tag}\t{}", TagCategory::classify(tag));
    }
    Ok(())
}
