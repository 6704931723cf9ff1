//! Show what every extraction strategy makes of a snapshot.
//!
//! Usage: inspect-snapshot <snapshot.json> [config.json]

use anyhow::{bail, Result};
use std::path::Path;

use moobot_queue::config::PipelineConfig;
use moobot_queue::coordinator::Coordinator;
use moobot_queue::extract::ExtractionContext;
use moobot_queue::models::{RawCandidate, Snapshot};

fn describe(c: &RawCandidate) -> String {
    let mut out = c.title.clone();
    if let Some(d) = &c.duration {
        out.push_str(&format!(" [{}]", d));
    }
    if let Some(r) = &c.requester {
        out.push_str(&format!(" by {}", r));
    }
    if let Some(s) = c.status {
        out.push_str(&format!(" ({})", s));
    }
    if let Some(u) = c.video_link() {
        out.push_str(&format!(" <{}>", u));
    }
    out
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        bail!("Usage: {} <snapshot.json> [config.json]", args[0]);
    }

    let snapshot = Snapshot::from_json_file(Path::new(&args[1]))?;
    let config = match args.get(2) {
        Some(path) => PipelineConfig::load(Path::new(path))?,
        None => PipelineConfig::default(),
    };
    let coordinator = Coordinator::new(&config)?;
    let ctx = ExtractionContext::new();

    println!(
        "Snapshot: {} top-level elements, {} elements total, {} lines of text",
        snapshot.elements.len(),
        snapshot.walk().len(),
        snapshot.raw_text.lines().count()
    );

    for report in coordinator.inspect(&snapshot, &ctx) {
        println!("\n=== {} ({} raw, {} accepted) ===", report.strategy, report.raw.len(), report.accepted.len());
        for c in &report.accepted {
            println!("  + {}", describe(c));
        }
        let rejected: Vec<&RawCandidate> = report
            .raw
            .iter()
            .filter(|r| coordinator.screen(std::slice::from_ref(*r)).is_empty())
            .collect();
        for c in rejected.iter().take(20) {
            println!("  - {}", c.title.replace('\n', " / "));
        }
        if rejected.len() > 20 {
            println!("  ... {} more rejected", rejected.len() - 20);
        }
    }

    let links = coordinator.link_index(&snapshot);
    println!("\n=== link index ({} links) ===", links.len());
    for hit in &links {
        println!("  {} -> {}", hit.title, hit.url);
    }

    let first = coordinator.extract(&snapshot, &ctx);
    let all = coordinator.extract_all(&snapshot, &ctx);
    println!("\n{:=<60}", "");
    println!(
        "First match: {} songs via {}",
        first.len(),
        first.strategy.map(|s| s.as_str()).unwrap_or("-")
    );
    println!("All strategies: {} songs after dedupe", all.len());
    println!("{:=<60}", "");

    Ok(())
}
