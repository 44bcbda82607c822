use iced_layershell::reexport::{Anchor, KeyboardInteractivity, Layer, NewLayerShellSettings};

use crate::notify::ToastPlacement;

pub(crate) const PANEL_WIDTH: u32 = 340;
pub(crate) const PANEL_HEIGHT: u32 = 540;
pub(crate) const TOAST_WIDTH: u32 = 360;

fn make_output_option(output: Option<&str>) -> iced_layershell::reexport::OutputOption {
    match output {
        Some(name) => iced_layershell::reexport::OutputOption::OutputName(name.to_string()),
        None => iced_layershell::reexport::OutputOption::None,
    }
}

/// The counter panel docks to the top-right corner. Keyboard stays on
/// demand so the login field and shortcuts work while the panel is up.
pub(crate) fn panel_settings(output: Option<&str>) -> NewLayerShellSettings {
    NewLayerShellSettings {
        layer: Layer::Top,
        anchor: Anchor::Top | Anchor::Right,
        keyboard_interactivity: KeyboardInteractivity::OnDemand,
        size: Some((PANEL_WIDTH, PANEL_HEIGHT)),
        margin: Some((20, 20, 0, 0)),
        output_option: make_output_option(output),
        ..Default::default()
    }
}

/// One surface per toast, pinned to the bottom-left corner at the offset
/// the stack computed for it. Clickable but never focusable, so a toast
/// popping up cannot steal the keyboard from the pharmacist.
pub(crate) fn toast_settings(placement: &ToastPlacement, output: Option<&str>) -> NewLayerShellSettings {
    NewLayerShellSettings {
        layer: Layer::Overlay,
        anchor: Anchor::Bottom | Anchor::Left,
        keyboard_interactivity: KeyboardInteractivity::None,
        size: Some((TOAST_WIDTH, placement.height as u32)),
        margin: Some((0, 0, placement.inset_bottom as i32, placement.inset_left as i32)),
        output_option: make_output_option(output),
        ..Default::default()
    }
}
