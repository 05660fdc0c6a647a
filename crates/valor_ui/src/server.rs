//! Rendering to a markup string.

use core::sync::atomic::{AtomicU64, Ordering};

use html::checksum;
use log::debug;

use crate::element::{Element, Owner};
use crate::error::UiError;
use crate::runtime::Ui;

/// Root ids for server renders. Distinct from client roots (`.N`) so several
/// server-rendered trees can share one document.
static SERVER_ROOTS: AtomicU64 = AtomicU64::new(0);

/// Render `element` to markup carrying a checksum that a later client render
/// of the same element can verify and adopt without rewriting the document.
///
/// # Errors
/// Any [`UiError`] raised while mounting.
pub fn render_to_string(element: impl Into<Element>) -> Result<String, UiError> {
    render_to_string_with(element, |markup| markup)
}

/// [`render_to_string`], handing the markup to `callback`.
///
/// # Errors
/// Same as [`render_to_string`].
pub fn render_to_string_with<R>(
    element: impl Into<Element>,
    callback: impl FnOnce(String) -> R,
) -> Result<R, UiError> {
    let element = element.into();
    element.claim(Owner::TopLevel);
    let mount_id = format!(".s{}", SERVER_ROOTS.fetch_add(1, Ordering::Relaxed));
    let mut ui = Ui::server();
    let (_, mut markup) =
        ui.batched_updates(|ui| ui.mount_element(&element, None, mount_id, String::new(), 0))?;
    let sum = checksum::add_checksum(&mut markup);
    debug!(target: "valor_ui::server", "rendered {} (checksum {sum})", element.display_name());
    Ok(callback(markup.to_html()))
}
