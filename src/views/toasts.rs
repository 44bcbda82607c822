use iced::widget::{column, container, mouse_area, row, space, text};
use iced::{mouse, Element, Length};

use crate::app::{Counter, Message};
use crate::notify::Toast;

const TITLE_AREA: f32 = 46.0;
const LINE_HEIGHT: f32 = 18.0;
const CHARS_PER_LINE: usize = 44;

/// Toast surfaces are sized before the text is laid out, so the height is
/// estimated from the message length at the toast's wrap width.
pub(crate) fn estimated_height(message: &str) -> f32 {
    let lines = message.chars().count().div_ceil(CHARS_PER_LINE).max(1);
    TITLE_AREA + lines as f32 * LINE_HEIGHT
}

impl Counter {
    pub(crate) fn view_toast(&self, toast: &Toast) -> Element<'_, Message> {
        let colors = &self.colors;

        let title = text(toast.style.title.clone())
            .size(colors.title_size)
            .color(colors.toast_text);
        let close = text("✕").size(colors.body_size).color(colors.toast_text);
        let header = row![title, space::horizontal(), close];

        let separator = container(space::horizontal())
            .style(colors.separator_style())
            .width(Length::Fill)
            .height(1);

        let body = text(toast.message.clone())
            .size(colors.body_size)
            .color(colors.toast_text);

        let card = container(column![header, separator, body].spacing(6))
            .style(colors.toast_bg_style(toast.style.color))
            .padding(10)
            .width(Length::Fill)
            .height(Length::Fill);

        mouse_area(card)
            .on_press(Message::ToastDismissed(toast.id))
            .interaction(mouse::Interaction::Pointer)
            .into()
    }
}
