use clap::Parser;
use std::path::PathBuf;

/// Draft affiliate comparison articles from product search results and
/// publish them to WordPress.
#[derive(Debug, Parser)]
#[command(name = "autopost", version, about)]
pub struct Cli {
    /// Run configuration file (YAML). Defaults to config/app.yaml when present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override site.posts_per_run.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub posts: Option<u32>,

    /// Process this keyword instead of the configured selection. Repeatable.
    #[arg(long = "keyword", value_name = "KEYWORD")]
    pub keywords: Vec<String>,

    /// Run every stage except creating the post.
    #[arg(long)]
    pub dry_run: bool,
}
