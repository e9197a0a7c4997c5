//! Resource Loader
//!
//! Drives one element through `Pending → Loading → {Loaded, Errored}`:
//! responsive copy-through, the host resource request, the terminal
//! attribute writes, the fade-in and the user callback.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::config::{Animation, Config};
use crate::host::{DATA_SRC, Host, LoadError, NodeId, SIZES, SRC, SRCSET};
use crate::registry::{ElementRegistry, ElementState, TrackedElement};

/// Pause between `opacity: 0` and `opacity: 1`
pub const FADE_SETTLE_DELAY: Duration = Duration::from_millis(50);
/// Transition applied to faded-in elements
pub const FADE_TRANSITION: &str = "opacity 0.5s";

/// Hook run after every terminal transition
pub type SettledHook = Rc<dyn Fn()>;

/// Element loader
#[derive(Clone)]
pub struct Loader {
    host: Rc<dyn Host>,
    config: Rc<Config>,
    registry: Rc<RefCell<ElementRegistry>>,
    on_settled: Option<SettledHook>,
}

impl Loader {
    pub fn new(host: Rc<dyn Host>, config: Rc<Config>, registry: Rc<RefCell<ElementRegistry>>) -> Self {
        Self {
            host,
            config,
            registry,
            on_settled: None,
        }
    }

    /// Run `hook` after each element reaches Loaded or Errored
    pub fn with_settled_hook(mut self, hook: SettledHook) -> Self {
        self.on_settled = Some(hook);
        self
    }

    /// Submit `node` for loading.
    ///
    /// Returns false if the element is not a pending tracked element; such a
    /// submission has no effect.
    pub fn load(&self, node: NodeId) -> bool {
        let element = self.registry.borrow_mut().begin_load(self.host.as_ref(), node);
        let Some(element) = element else {
            tracing::trace!("Skipping submission of {}", node);
            return false;
        };

        tracing::debug!("Loading {} from {}", node, element.pending_uri);

        if self.config.responsive {
            if let Some(srcset) = &element.srcset {
                self.host.set_attribute(node, SRCSET, srcset);
            }
            if let Some(sizes) = &element.sizes {
                self.host.set_attribute(node, SIZES, sizes);
            }
        }

        let loader = self.clone();
        let uri = element.pending_uri.clone();
        self.host.load_resource(
            &uri,
            Box::new(move |result| loader.finish(element, result)),
        );
        true
    }

    fn finish(&self, element: TrackedElement, result: Result<(), LoadError>) {
        let node = element.node;
        match result {
            Ok(()) => {
                self.host.set_attribute(node, SRC, &element.pending_uri);
                self.host.remove_attribute(node, DATA_SRC);
                self.registry.borrow_mut().complete(node, ElementState::Loaded);
                tracing::debug!("Loaded {} ({})", node, element.pending_uri);

                if self.config.animation == Animation::Fade {
                    self.fade_in(node);
                }
                if let Some(callback) = &self.config.on_loaded {
                    callback(node);
                }
            }
            Err(err) => {
                if let Some(fallback) = &self.config.error_image {
                    self.host.set_attribute(node, SRC, fallback);
                }
                self.host.remove_attribute(node, DATA_SRC);
                self.registry.borrow_mut().complete(node, ElementState::Errored);
                tracing::debug!("Failed to load {}: {}", node, err);
            }
        }

        if let Some(hook) = &self.on_settled {
            hook();
        }
    }

    fn fade_in(&self, node: NodeId) {
        self.host.set_style(node, "transition", FADE_TRANSITION);
        self.host.set_style(node, "opacity", "0");

        let host: Weak<dyn Host> = Rc::downgrade(&self.host);
        self.host.set_timeout(
            FADE_SETTLE_DELAY,
            Box::new(move || {
                if let Some(host) = host.upgrade() {
                    host.set_style(node, "opacity", "1");
                }
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RawOptions, resolve};
    use crate::headless::{HeadlessHost, HostEvent};
    use std::cell::Cell;

    struct Fixture {
        host: Rc<HeadlessHost>,
        registry: Rc<RefCell<ElementRegistry>>,
        loader: Loader,
    }

    fn fixture(host: HeadlessHost, options: RawOptions) -> Fixture {
        let host = Rc::new(host);
        let dyn_host: Rc<dyn Host> = host.clone();
        let registry = Rc::new(RefCell::new(ElementRegistry::scan(host.as_ref(), "body")));
        let loader = Loader::new(dyn_host, Rc::new(resolve(options)), registry.clone());
        Fixture { host, registry, loader }
    }

    #[test]
    fn test_success_sets_src_and_clears_marker() {
        let host = HeadlessHost::new(800.0);
        let img = host.add_image(Some("a.jpg"), 0.0, 100.0);
        let f = fixture(host, RawOptions::new().with_animation("none"));

        assert!(f.loader.load(img));
        assert_eq!(f.registry.borrow().state(img), Some(ElementState::Loading));
        assert_eq!(f.host.src(img), None);

        f.host.run_until_idle();
        assert_eq!(f.host.src(img).as_deref(), Some("a.jpg"));
        assert_eq!(f.host.attribute(img, DATA_SRC), None);
        assert_eq!(f.registry.borrow().state(img), Some(ElementState::Loaded));
        assert!(f.registry.borrow().is_empty());
        assert_eq!(f.host.style(img, "opacity"), None);
    }

    #[test]
    fn test_failure_uses_error_image() {
        let host = HeadlessHost::new(800.0);
        let img = host.add_image(Some("broken.jpg"), 0.0, 100.0);
        host.fail_resource("broken.jpg");
        let f = fixture(host, RawOptions::new().with_error_image("error.jpg"));

        f.loader.load(img);
        f.host.run_until_idle();
        assert_eq!(f.host.src(img).as_deref(), Some("error.jpg"));
        assert_eq!(f.host.attribute(img, DATA_SRC), None);
        assert_eq!(f.registry.borrow().state(img), Some(ElementState::Errored));
    }

    #[test]
    fn test_failure_without_fallback_keeps_src() {
        let host = HeadlessHost::new(800.0);
        let img = host.add_image(Some("broken.jpg"), 0.0, 100.0);
        host.set_attribute(img, SRC, "ph.jpg");
        host.fail_resource("broken.jpg");
        let f = fixture(host, RawOptions::new());

        f.loader.load(img);
        f.host.run_until_idle();
        assert_eq!(f.host.src(img).as_deref(), Some("ph.jpg"));
        assert_eq!(f.host.attribute(img, DATA_SRC), None);
    }

    #[test]
    fn test_second_submission_ignored() {
        let host = HeadlessHost::new(800.0);
        let img = host.add_image(Some("a.jpg"), 0.0, 100.0);
        let f = fixture(host, RawOptions::new());

        assert!(f.loader.load(img));
        assert!(!f.loader.load(img));
        f.host.run_until_idle();
        assert!(!f.loader.load(img));
        assert_eq!(f.host.fetch_count("a.jpg"), 1);
    }

    #[test]
    fn test_responsive_copy_precedes_fetch() {
        let host = HeadlessHost::new(800.0);
        let img = host.add_image(Some("a.jpg"), 0.0, 100.0);
        host.set_attribute(img, "data-srcset", "a-1x.jpg 1x, a-2x.jpg 2x");
        host.set_attribute(img, "data-sizes", "100vw");
        host.clear_journal();
        let f = fixture(host, RawOptions::new().with_responsive(true).with_animation("none"));

        f.loader.load(img);
        f.host.run_until_idle();

        let journal = f.host.journal();
        let position = |wanted: &HostEvent| journal.iter().position(|e| e == wanted).unwrap();
        let srcset = position(&HostEvent::SetAttribute {
            node: img,
            name: "srcset".into(),
            value: "a-1x.jpg 1x, a-2x.jpg 2x".into(),
        });
        let sizes = position(&HostEvent::SetAttribute {
            node: img,
            name: "sizes".into(),
            value: "100vw".into(),
        });
        let fetch = position(&HostEvent::Fetch { uri: "a.jpg".into() });
        let src = position(&HostEvent::SetAttribute {
            node: img,
            name: "src".into(),
            value: "a.jpg".into(),
        });
        assert!(srcset < fetch && sizes < fetch && fetch < src);
    }

    #[test]
    fn test_responsive_off_ignores_srcset() {
        let host = HeadlessHost::new(800.0);
        let img = host.add_image(Some("a.jpg"), 0.0, 100.0);
        host.set_attribute(img, "data-srcset", "a-2x.jpg 2x");
        let f = fixture(host, RawOptions::new());

        f.loader.load(img);
        f.host.run_until_idle();
        assert_eq!(f.host.attribute(img, SRCSET), None);
    }

    #[test]
    fn test_fade_settles_after_delay() {
        let host = HeadlessHost::new(800.0);
        let img = host.add_image(Some("a.jpg"), 0.0, 100.0);
        let f = fixture(host, RawOptions::new());

        f.loader.load(img);
        f.host.advance(Duration::ZERO);
        assert_eq!(f.host.style(img, "transition").as_deref(), Some(FADE_TRANSITION));
        assert_eq!(f.host.style(img, "opacity").as_deref(), Some("0"));

        f.host.advance(Duration::from_millis(49));
        assert_eq!(f.host.style(img, "opacity").as_deref(), Some("0"));
        f.host.advance(Duration::from_millis(1));
        assert_eq!(f.host.style(img, "opacity").as_deref(), Some("1"));
    }

    #[test]
    fn test_callback_sees_src() {
        let host = HeadlessHost::new(800.0);
        let img = host.add_image(Some("a.jpg"), 0.0, 100.0);
        let host = Rc::new(host);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let probe_host = Rc::downgrade(&host);
        let sink = seen.clone();
        let options = RawOptions::new().with_callback(move |node| {
            let src = probe_host.upgrade().and_then(|h| h.src(node));
            sink.borrow_mut().push((node, src));
        });

        let dyn_host: Rc<dyn Host> = host.clone();
        let registry = Rc::new(RefCell::new(ElementRegistry::scan(host.as_ref(), "body")));
        let loader = Loader::new(dyn_host, Rc::new(resolve(options)), registry);

        loader.load(img);
        host.run_until_idle();
        assert_eq!(*seen.borrow(), vec![(img, Some("a.jpg".to_string()))]);
    }

    #[test]
    fn test_settled_hook_runs_on_both_outcomes() {
        let host = HeadlessHost::new(800.0);
        let good = host.add_image(Some("good.jpg"), 0.0, 100.0);
        let bad = host.add_image(Some("bad.jpg"), 0.0, 100.0);
        host.fail_resource("bad.jpg");
        let f = fixture(host, RawOptions::new());

        let settled = Rc::new(Cell::new(0));
        let counter = settled.clone();
        let loader = f
            .loader
            .clone()
            .with_settled_hook(Rc::new(move || counter.set(counter.get() + 1)));

        loader.load(good);
        loader.load(bad);
        f.host.run_until_idle();
        assert_eq!(settled.get(), 2);
    }
}
