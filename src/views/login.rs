use iced::widget::{button, checkbox, column, container, text, text_input};
use iced::{Element, Length};

use crate::app::{Counter, Message};

impl Counter {
    /// Login form shown while no staff is bound to the counter.
    pub(crate) fn view_login(&self) -> Element<'_, Message> {
        let colors = &self.colors;

        let title = text("Connectez-vous")
            .size(colors.title_size)
            .color(colors.text);

        let initials = text_input("Initiales", &self.login.initials)
            .on_input(Message::InitialsChanged)
            .on_submit(Message::SubmitLogin)
            .size(colors.body_size)
            .padding(8);

        let elsewhere = checkbox(self.login.logout_elsewhere)
            .label("Me déconnecter des autres postes")
            .on_toggle(Message::LogoutElsewhereToggled)
            .size(colors.body_size)
            .text_size(colors.body_size);

        let submit = button(text("Connexion").size(colors.body_size))
            .style(colors.action_button_style())
            .padding([8, 16])
            .on_press_maybe((!self.login.initials.trim().is_empty()).then_some(Message::SubmitLogin));

        let form = column![title, initials, elsewhere, submit]
            .spacing(14)
            .padding(20)
            .width(Length::Fill);

        container(form)
            .style(colors.panel_bg_style())
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elsewhere_checkbox_builds_with_label_and_toggle() {
        let _: iced::widget::Checkbox<'_, Message> = checkbox(true)
            .label("Me déconnecter des autres postes")
            .on_toggle(Message::LogoutElsewhereToggled);
    }
}
