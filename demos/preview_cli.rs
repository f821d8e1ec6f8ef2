use clap::{Arg, ArgAction, Command};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use safe_link_preview::{
    log_error_card, log_preview_card, setup_logging, LinkPreviewConfig, LinkPreviewFetcher,
    LogConfig, PreviewCache, DEFAULT_CACHE_TTL,
};
use std::error::Error;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let matches = Command::new("preview_cli")
        .about("Fetch link previews the way the post composer does")
        .arg(
            Arg::new("urls")
                .required(true)
                .num_args(1..)
                .help("URLs to preview"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_parser(clap::value_parser!(u64))
                .default_value("5")
                .help("Fetch timeout in seconds"),
        )
        .arg(
            Arg::new("max-body")
                .long("max-body")
                .value_parser(clap::value_parser!(usize))
                .help("Abort responses larger than this many bytes"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Log every step, including the real failure cause"),
        )
        .get_matches();

    setup_logging(LogConfig {
        log_level: if matches.get_flag("verbose") {
            "safe_link_preview=debug".into()
        } else {
            "warn".into()
        },
        ..Default::default()
    })?;

    let timeout = *matches.get_one::<u64>("timeout").unwrap_or(&5);
    let mut config = LinkPreviewConfig::default()
        .with_fetch_timeout(Duration::from_secs(timeout))
        .with_cache(PreviewCache::new(100, DEFAULT_CACHE_TTL));
    if let Some(limit) = matches.get_one::<usize>("max-body") {
        config = config.with_max_body_bytes(*limit);
    }
    let fetcher = LinkPreviewFetcher::with_config(config)?;

    let urls: Vec<&String> = matches.get_many::<String>("urls").into_iter().flatten().collect();

    println!("{}", "Link Preview".bold().green());
    println!("{}", "============".green());

    let pb = ProgressBar::new(urls.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")?
            .progress_chars("#>-"),
    );

    for url in urls {
        match fetcher.fetch_preview(url).await {
            Ok(preview) => {
                pb.inc(1);
                log_preview_card(&preview, url);

                println!("\n{}: {}", "URL".bold(), url);
                if let Some(title) = &preview.title {
                    println!("{}: {}", "Title".bold(), title);
                }
                if let Some(description) = &preview.description {
                    println!("{}: {}", "Description".bold(), description);
                }
                if let Some(image) = &preview.image_url {
                    println!("{}: {}", "Image".bold(), image);
                }
                println!("{}", serde_json::to_string_pretty(&preview)?.dimmed());
            }
            Err(failure) => {
                pb.inc(1);
                log_error_card(url, &failure);
                eprintln!("{}: {} - {}", "Error".bold().red(), url, failure);
            }
        }
    }

    pb.finish_with_message("done");
    Ok(())
}
