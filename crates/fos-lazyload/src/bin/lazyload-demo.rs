//! fOS Lazy Load - Headless Demo
//!
//! Builds a long page of images, starts the engine and scrolls to the
//! bottom, logging every transition.
//!
//! ```text
//! lazyload-demo '{"threshold": 200, "delay": 300, "errorImage": "error.jpg"}'
//! RUST_LOG=fos_lazyload=debug lazyload-demo
//! ```

use std::rc::Rc;
use std::time::Duration;

use anyhow::Context;
use fos_lazyload::{ElementState, HeadlessHost, Host, LazyLoad, RawOptions};
use tracing_subscriber::EnvFilter;

const VIEWPORT_HEIGHT: f64 = 720.0;
const IMAGE_COUNT: usize = 12;
const IMAGE_HEIGHT: f64 = 400.0;
const SCROLL_STEP: f64 = 360.0;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let options = match std::env::args().nth(1) {
        Some(json) => RawOptions::from_json(&json).context("parsing options argument")?,
        None => RawOptions::new()
            .with_threshold(200.0)
            .with_delay_ms(300.0)
            .with_placeholder("placeholder.jpg")
            .with_error_image("error.jpg"),
    };

    let host = Rc::new(HeadlessHost::new(VIEWPORT_HEIGHT).with_intersection_observer());
    host.set_default_latency(Duration::from_millis(120));

    let images: Vec<_> = (0..IMAGE_COUNT)
        .map(|i| {
            let uri = format!("photos/{:02}.jpg", i);
            host.add_image(Some(&uri), i as f64 * (IMAGE_HEIGHT + 40.0), IMAGE_HEIGHT)
        })
        .collect();
    // Every fifth image is missing on the server
    for i in (4..IMAGE_COUNT).step_by(5) {
        host.fail_resource(&format!("photos/{:02}.jpg", i));
    }

    let options = options.with_callback({
        let host = Rc::downgrade(&host);
        move |node| {
            if let Some(host) = host.upgrade() {
                tracing::info!("Loaded {} -> {}", node, host.src(node).unwrap_or_default());
            }
        }
    });

    let dyn_host: Rc<dyn Host> = host.clone();
    let lazy = LazyLoad::new(dyn_host, "body", options);
    tracing::info!("Started: {:?}", lazy);

    let page_height = IMAGE_COUNT as f64 * (IMAGE_HEIGHT + 40.0);
    let mut y = 0.0;
    while y < page_height {
        host.scroll_to(y);
        host.advance(Duration::from_millis(150));
        y += SCROLL_STEP;
    }
    host.run_until_idle();

    let mut loaded = 0;
    for node in &images {
        let state = lazy.state_of(*node).unwrap_or_default();
        if state == ElementState::Loaded {
            loaded += 1;
        }
        tracing::info!("{} {:?} src={}", node, state, host.src(*node).unwrap_or_default());
    }
    tracing::info!(
        "{}/{} images loaded after {:?}, engine active: {}",
        loaded,
        images.len(),
        host.now(),
        lazy.is_active()
    );

    Ok(())
}
