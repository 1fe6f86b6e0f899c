//! Simulated infinite scroll over a job board.
//!
//! A user scrolls a 134-posting list in a 720px viewport. Each posting is a
//! 96px card; the "loading" sentinel sits right after the last rendered card.
//! Time is virtual, advanced one 16ms frame at a time.
//!
//! Run with: cargo run -p reveal --example scroll_simulation
//!
//! Set `RUST_LOG=reveal=trace` to see every intersection entry.

use std::sync::Arc;
use std::time::Duration;

use reveal::{Rect, RevealConfig, RevealController, ViewportObserver};
use reveal_core::{Clock, ManualClock, TaskScheduler};
use tracing_subscriber::EnvFilter;

const CARD_HEIGHT: f32 = 96.0;
const SENTINEL_HEIGHT: f32 = 48.0;
const VIEWPORT: Rect = Rect::new(0.0, 0.0, 1024.0, 720.0);
const FRAME: Duration = Duration::from_millis(16);
/// Pixels scrolled per frame while the user is flicking.
const SCROLL_SPEED: f32 = 40.0;

#[derive(Debug)]
struct JobPosting {
    id: u32,
    title: String,
    company: &'static str,
}

fn postings() -> Vec<JobPosting> {
    const COMPANIES: [&str; 4] = ["Acme", "Globex", "Initech", "Umbrella"];
    const ROLES: [&str; 5] = [
        "Backend Engineer",
        "Frontend Engineer",
        "Data Analyst",
        "Product Designer",
        "Site Reliability Engineer",
    ];
    (1..=134)
        .map(|id| JobPosting {
            id,
            title: ROLES[id as usize % ROLES.len()].to_string(),
            company: COMPANIES[id as usize % COMPANIES.len()],
        })
        .collect()
}

fn sentinel_rect(display_count: usize) -> Rect {
    Rect::new(
        0.0,
        display_count as f32 * CARD_HEIGHT,
        VIEWPORT.width,
        SENTINEL_HEIGHT,
    )
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reveal=debug")),
        )
        .init();

    let clock = ManualClock::new();
    let scheduler = Arc::new(TaskScheduler::new(Arc::new(clock.clone())));
    let viewport = Arc::new(ViewportObserver::new(VIEWPORT));

    let config = RevealConfig::from_toml_str(
        r#"
        items_per_page = 20
        load_more_delay_ms = 500
        root_margin = "100px 0"
        threshold = 0.1
        "#,
    )
    .expect("valid configuration");

    let controller = RevealController::new(postings(), config, scheduler.clone());
    let sentinel = controller.sentinel();

    // Re-layout: the sentinel follows the last rendered card.
    viewport.set_target_rect(sentinel, sentinel_rect(controller.display_count()));
    {
        let viewport = viewport.clone();
        controller
            .display_count_changed()
            .connect(move |&count| viewport.set_target_rect(sentinel, sentinel_rect(count)));
    }
    controller
        .loading_changed()
        .connect(|&loading| println!("  [{}]", if loading { "Loading more jobs..." } else { "loaded" }));

    controller.attach_sentinel(viewport.clone());
    println!("{}", controller.snapshot());

    let mut offset = 0.0_f32;
    let mut frames = 0u32;
    while controller.has_more() || controller.is_loading() {
        let max_offset = controller.display_count() as f32 * CARD_HEIGHT + SENTINEL_HEIGHT
            - VIEWPORT.height;
        // The user stops at the bottom of what is rendered and waits.
        if offset < max_offset {
            offset = (offset + SCROLL_SPEED).min(max_offset);
            viewport.scroll_to(offset);
        }

        clock.advance(FRAME);
        if scheduler.process_ready() > 0 {
            println!("{} (scrolled to {offset:.0}px)", controller.snapshot());
        }

        frames += 1;
        if frames > 10_000 {
            eprintln!("simulation did not settle");
            break;
        }
    }

    let shown = controller.displayed_items();
    println!();
    println!("Done after {:.1}s of simulated time.", clock.now().as_secs_f32());
    if let Some(last) = shown.last() {
        println!("Last posting: #{} {} at {}", last.id, last.title, last.company);
    }
    println!("No more jobs to load.");
}
