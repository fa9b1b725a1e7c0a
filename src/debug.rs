//! Debug overlay utilities for web platform
//!
//! Mirrors initialization stages, segment counts and pointer state into DOM
//! elements (`#debug-status`, `#debug-segments`, `#debug-pointer`) when the
//! host page has them. Missing elements are skipped; desktop builds no-op.

#[cfg(target_arch = "wasm32")]
fn set_text(id: &str, text: &str) {
    let element = web_sys::window()
        .and_then(|win| win.document())
        .and_then(|doc| doc.get_element_by_id(id));
    if let Some(element) = element {
        element.set_text_content(Some(text));
    }
}

/// Update the debug status line
#[cfg(target_arch = "wasm32")]
pub fn update_status(status: &str) {
    set_text("debug-status", status);
}

/// Update the visible / capacity segment counter
#[cfg(target_arch = "wasm32")]
pub fn update_segments(visible: usize, capacity: usize) {
    set_text("debug-segments", &format!("{} / {}", visible, capacity));
}

/// Update pointer information in the debug overlay
#[cfg(target_arch = "wasm32")]
pub fn update_pointer(x: f32, y: f32, state: &str) {
    set_text("debug-pointer", &format!("({:.0}, {:.0}) {}", x, y, state));
}

// No-op versions for non-WASM platforms
#[cfg(not(target_arch = "wasm32"))]
pub fn update_status(_status: &str) {}

#[cfg(not(target_arch = "wasm32"))]
pub fn update_segments(_visible: usize, _capacity: usize) {}

#[cfg(not(target_arch = "wasm32"))]
pub fn update_pointer(_x: f32, _y: f32, _state: &str) {}
