//! Configuration
//!
//! Options arrive as a loosely typed bag (programmatic builder or a JSON
//! object using the page-script option names) and are resolved into an
//! immutable [`Config`]. Absent, falsy or malformed values fall back to the
//! documented defaults; resolution never fails.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use serde::Deserialize;

use crate::host::NodeId;

/// Default proximity margin in pixels
pub const DEFAULT_THRESHOLD: f64 = 300.0;
/// Default polling debounce interval
pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

/// Invoked with the element after each successful load
pub type LoadedCallback = Rc<dyn Fn(NodeId)>;

/// Reveal animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Animation {
    /// Opacity 0 → 1 transition after the settle delay
    #[default]
    Fade,
    None,
}

impl Animation {
    /// Parse an animation name. Empty means "unset" (`None` is returned so
    /// the caller applies the default); any name other than `fade` disables
    /// the animation.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            None
        } else if name.eq_ignore_ascii_case("fade") {
            Some(Self::Fade)
        } else {
            Some(Self::None)
        }
    }
}

/// Options error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid options JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Alternate page-script names, as (primary, alias)
const OPTION_ALIASES: [(&str, &str); 2] = [
    ("errorImage", "errorResourceURI"),
    ("useIntersectionObserver", "useObserverStrategy"),
];

/// Partially specified options bag
#[derive(Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawOptions {
    #[serde(deserialize_with = "lenient::number")]
    pub threshold: Option<f64>,
    /// Milliseconds
    #[serde(deserialize_with = "lenient::number")]
    pub delay: Option<f64>,
    #[serde(deserialize_with = "lenient::string")]
    pub animation: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub placeholder: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub error_image: Option<String>,
    #[serde(deserialize_with = "lenient::flag")]
    pub use_intersection_observer: Option<bool>,
    #[serde(deserialize_with = "lenient::flag")]
    pub responsive: Option<bool>,
    #[serde(skip)]
    pub callback: Option<LoadedCallback>,
}

impl RawOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON options object.
    ///
    /// Only a syntax error is reported; a document that is not an object
    /// yields empty options.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        Ok(Self::from_value(value))
    }

    /// Read options from an already parsed JSON value
    ///
    /// Alternate option names are folded onto the primary name first, and
    /// the primary name wins when both are present.
    pub fn from_value(value: serde_json::Value) -> Self {
        let serde_json::Value::Object(mut map) = value else {
            tracing::warn!("Ignoring lazy-load options that are not an object");
            return Self::default();
        };
        for (primary, alias) in OPTION_ALIASES {
            if let Some(value) = map.remove(alias) {
                if map.contains_key(primary) {
                    tracing::debug!("Option {} shadowed by {}", alias, primary);
                } else {
                    map.insert(primary.to_string(), value);
                }
            }
        }

        match Self::deserialize(serde_json::Value::Object(map)) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!("Ignoring malformed lazy-load options: {}", err);
                Self::default()
            }
        }
    }

    pub fn with_threshold(mut self, pixels: f64) -> Self {
        self.threshold = Some(pixels);
        self
    }

    pub fn with_delay_ms(mut self, millis: f64) -> Self {
        self.delay = Some(millis);
        self
    }

    pub fn with_animation(mut self, name: &str) -> Self {
        self.animation = Some(name.to_string());
        self
    }

    pub fn with_placeholder(mut self, uri: &str) -> Self {
        self.placeholder = Some(uri.to_string());
        self
    }

    pub fn with_error_image(mut self, uri: &str) -> Self {
        self.error_image = Some(uri.to_string());
        self
    }

    pub fn with_intersection_observer(mut self, enabled: bool) -> Self {
        self.use_intersection_observer = Some(enabled);
        self
    }

    pub fn with_responsive(mut self, enabled: bool) -> Self {
        self.responsive = Some(enabled);
        self
    }

    pub fn with_callback(mut self, callback: impl Fn(NodeId) + 'static) -> Self {
        self.callback = Some(Rc::new(callback));
        self
    }
}

impl fmt::Debug for RawOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawOptions")
            .field("threshold", &self.threshold)
            .field("delay", &self.delay)
            .field("animation", &self.animation)
            .field("placeholder", &self.placeholder)
            .field("error_image", &self.error_image)
            .field("use_intersection_observer", &self.use_intersection_observer)
            .field("responsive", &self.responsive)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// Resolved, immutable engine configuration
#[derive(Clone)]
pub struct Config {
    /// Pixels before the viewport edge at which loading starts
    pub threshold: f64,
    /// Polling debounce interval
    pub delay: Duration,
    pub animation: Animation,
    /// Shown in `src` until the real resource loads
    pub placeholder: Option<String>,
    /// Shown in `src` when the real resource fails
    pub error_image: Option<String>,
    /// Prefer the host intersection facility over scroll polling
    pub use_intersection_observer: bool,
    /// Copy `data-srcset`/`data-sizes` through at load time
    pub responsive: bool,
    pub on_loaded: Option<LoadedCallback>,
}

impl Default for Config {
    fn default() -> Self {
        resolve(RawOptions::default())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("threshold", &self.threshold)
            .field("delay", &self.delay)
            .field("animation", &self.animation)
            .field("placeholder", &self.placeholder)
            .field("error_image", &self.error_image)
            .field("use_intersection_observer", &self.use_intersection_observer)
            .field("responsive", &self.responsive)
            .field("on_loaded", &self.on_loaded.is_some())
            .finish()
    }
}

/// Resolve an options bag into a complete configuration
pub fn resolve(raw: RawOptions) -> Config {
    let threshold = raw
        .threshold
        .filter(|t| t.is_finite() && *t > 0.0)
        .unwrap_or(DEFAULT_THRESHOLD);

    let delay = raw
        .delay
        .filter(|d| d.is_finite() && *d > 0.0)
        // Float-to-int casts saturate, so huge delays cannot overflow
        .map(|d| Duration::from_micros((d * 1000.0).round() as u64))
        .unwrap_or(DEFAULT_DELAY);

    let animation = raw
        .animation
        .as_deref()
        .and_then(Animation::parse)
        .unwrap_or_default();

    Config {
        threshold,
        delay,
        animation,
        placeholder: non_empty(raw.placeholder),
        error_image: non_empty(raw.error_image),
        use_intersection_observer: raw.use_intersection_observer.unwrap_or(false),
        responsive: raw.responsive.unwrap_or(false),
        on_loaded: raw.callback,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Deserializers that coerce instead of rejecting.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    /// Truthiness, the way page scripts evaluate `options.flag || false`
    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Null => None,
            Value::Bool(b) => Some(b),
            Value::Number(n) => Some(n.as_f64().is_some_and(|v| v != 0.0 && !v.is_nan())),
            Value::String(s) => Some(!s.is_empty()),
            Value::Array(_) | Value::Object(_) => Some(true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.threshold, 300.0);
        assert_eq!(config.delay, Duration::from_millis(500));
        assert_eq!(config.animation, Animation::Fade);
        assert_eq!(config.placeholder, None);
        assert_eq!(config.error_image, None);
        assert!(!config.use_intersection_observer);
        assert!(!config.responsive);
        assert!(config.on_loaded.is_none());
    }

    #[test]
    fn test_builder_values_kept() {
        let config = resolve(
            RawOptions::new()
                .with_threshold(200.0)
                .with_delay_ms(300.0)
                .with_animation("none")
                .with_placeholder("ph.jpg")
                .with_error_image("err.jpg")
                .with_intersection_observer(true)
                .with_responsive(true),
        );
        assert_eq!(config.threshold, 200.0);
        assert_eq!(config.delay, Duration::from_millis(300));
        assert_eq!(config.animation, Animation::None);
        assert_eq!(config.placeholder.as_deref(), Some("ph.jpg"));
        assert_eq!(config.error_image.as_deref(), Some("err.jpg"));
        assert!(config.use_intersection_observer);
        assert!(config.responsive);
    }

    #[test]
    fn test_falsy_values_take_defaults() {
        let config = resolve(
            RawOptions::new()
                .with_threshold(0.0)
                .with_delay_ms(0.0)
                .with_animation("")
                .with_placeholder("")
                .with_error_image("  "),
        );
        assert_eq!(config.threshold, DEFAULT_THRESHOLD);
        assert_eq!(config.delay, DEFAULT_DELAY);
        assert_eq!(config.animation, Animation::Fade);
        assert_eq!(config.placeholder, None);
        assert_eq!(config.error_image, None);
    }

    #[test]
    fn test_malformed_numbers_take_defaults() {
        let config = resolve(
            RawOptions::new()
                .with_threshold(f64::NAN)
                .with_delay_ms(f64::INFINITY),
        );
        assert_eq!(config.threshold, DEFAULT_THRESHOLD);
        assert_eq!(config.delay, DEFAULT_DELAY);

        let config = resolve(RawOptions::new().with_threshold(-50.0).with_delay_ms(-1.0));
        assert_eq!(config.threshold, DEFAULT_THRESHOLD);
        assert_eq!(config.delay, DEFAULT_DELAY);
    }

    #[test]
    fn test_unknown_animation_disables_fade() {
        assert_eq!(Animation::parse("slide"), Some(Animation::None));
        assert_eq!(Animation::parse(" FADE "), Some(Animation::Fade));
        assert_eq!(Animation::parse(""), None);
    }

    #[test]
    fn test_json_page_option_names() {
        let raw = RawOptions::from_json(
            r#"{
                "threshold": 200,
                "animation": "fade",
                "delay": "300",
                "placeholder": "placeholder.jpg",
                "errorImage": "error.jpg",
                "useIntersectionObserver": true,
                "responsive": 1,
                "somethingElse": [1, 2, 3]
            }"#,
        )
        .unwrap();
        let config = resolve(raw);
        assert_eq!(config.threshold, 200.0);
        assert_eq!(config.delay, Duration::from_millis(300));
        assert_eq!(config.placeholder.as_deref(), Some("placeholder.jpg"));
        assert_eq!(config.error_image.as_deref(), Some("error.jpg"));
        assert!(config.use_intersection_observer);
        assert!(config.responsive);
    }

    #[test]
    fn test_json_aliases_and_wrong_types() {
        let raw = RawOptions::from_json(
            r#"{
                "threshold": "far",
                "delay": null,
                "errorResourceURI": "err.jpg",
                "useObserverStrategy": "yes",
                "responsive": 0,
                "placeholder": false
            }"#,
        )
        .unwrap();
        let config = resolve(raw);
        assert_eq!(config.threshold, DEFAULT_THRESHOLD);
        assert_eq!(config.delay, DEFAULT_DELAY);
        assert_eq!(config.error_image.as_deref(), Some("err.jpg"));
        assert!(config.use_intersection_observer);
        assert!(!config.responsive);
        assert_eq!(config.placeholder, None);
    }

    #[test]
    fn test_repeated_option_keeps_primary_name() {
        let raw = RawOptions::from_json(
            r#"{
                "threshold": 200,
                "delay": 300,
                "useIntersectionObserver": true,
                "useObserverStrategy": false,
                "errorImage": "a.jpg",
                "errorResourceURI": "b.jpg"
            }"#,
        )
        .unwrap();
        let config = resolve(raw);
        assert_eq!(config.threshold, 200.0);
        assert_eq!(config.delay, Duration::from_millis(300));
        assert!(config.use_intersection_observer);
        assert_eq!(config.error_image.as_deref(), Some("a.jpg"));
    }

    #[test]
    fn test_json_non_object_degrades() {
        let raw = RawOptions::from_json("42").unwrap();
        let config = resolve(raw);
        assert_eq!(config.threshold, DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_json_syntax_error() {
        assert!(matches!(
            RawOptions::from_json("{threshold: }"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_callback_carried_through() {
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let config = resolve(RawOptions::new().with_callback(move |_| counter.set(counter.get() + 1)));

        let callback = config.on_loaded.clone().unwrap();
        callback(NodeId::from_raw(3));
        assert_eq!(hits.get(), 1);
    }
}
