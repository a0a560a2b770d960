//! Display defaults and the control-panel settings overlay.
//!
//! The control panel (the front-end's dat.GUI instance) is configured by a
//! plain JSON object the kernel side owns. Defaults are produced fresh for
//! every widget; construction overlays the caller's overrides on top and
//! keeps keys the defaults don't know, since the front-end forwards the
//! whole map to its GUI library.

use serde_json::Value;

use crate::graph::AttrMap;

/// Default widget height in pixels.
pub const DEFAULT_HEIGHT: u32 = 500;

/// Default layout algorithm.
pub const DEFAULT_LAYOUT_ALG: &str = LAYOUT_FORCE_ATLAS;

/// Layout names the front-end understands. Unknown names are not an error
/// here; the front-end falls back to ForceAtlas with a console warning.
pub const LAYOUT_FORCE_ATLAS: &str = "FA";
pub const LAYOUT_CIRCULAR: &str = "circular";
pub const LAYOUT_RANDOM: &str = "random";

/// A fresh control-panel settings map, one per call. Instances never share
/// a map, so mutating one widget's settings cannot leak into another.
pub fn control_panel_defaults() -> AttrMap {
    let mut defaults = AttrMap::new();
    defaults.insert("autoPlace".into(), Value::Bool(false));
    defaults.insert("resizable".into(), Value::Bool(true));
    defaults.insert("scrollable".into(), Value::Bool(false));
    defaults.insert("closeOnTop".into(), Value::Bool(true));
    defaults
}

/// Overlay `overrides` onto `base`. Override keys win; everything else in
/// `base` survives untouched.
pub fn overlay(base: &mut AttrMap, overrides: &AttrMap) {
    for (key, value) in overrides {
        base.insert(key.clone(), value.clone());
    }
}
