use iced::widget::{button, column, container, row, scrollable, space, text};
use iced::{Element, Length};

use crate::app::{Counter, Message};
use crate::realtime::ConnectionState;
use crate::util::{language_tag, truncate_str};

impl Counter {
    /// The main counter panel: connection status, current patient, quick
    /// actions and the waiting list.
    pub(crate) fn view_panel(&self) -> Element<'_, Message> {
        let colors = &self.colors;

        // Header: staff name and the connection indicator.
        let staff_name = self
            .state
            .staff
            .as_ref()
            .map(|s| s.name.clone())
            .unwrap_or_else(|| "—".to_string());
        let indicator = text("●")
            .size(colors.body_size)
            .color(colors.connection_color(self.connection));
        let attempts = if self.connection != ConnectionState::Connected && self.attempts > 0 {
            format!(" essai {}", self.attempts)
        } else {
            String::new()
        };
        let attempts = text(attempts).size(colors.small_size).color(colors.muted);
        let header = row![
            text(format!("Comptoir {}", self.config.counter_id))
                .size(colors.title_size)
                .color(colors.text),
            space::horizontal(),
            text(format!("-= {staff_name} =- "))
                .size(colors.body_size)
                .color(colors.muted),
            indicator,
            attempts,
        ]
        .align_y(iced::Alignment::Center);

        // Current patient line.
        let current = text(self.state.current_label())
            .size(colors.body_size)
            .color(colors.text);

        // Quick actions.
        let action = |label: &str, message: Option<Message>| {
            button(text(label.to_string()).size(colors.small_size))
                .style(colors.action_button_style())
                .padding([6, 10])
                .on_press_maybe(message)
        };
        let actions = row![
            action("Suivant", Some(Message::CallNext)),
            action(
                "Valider",
                self.state.can_validate().then_some(Message::ValidatePatient)
            ),
            action(
                "Pause",
                self.state.can_pause().then_some(Message::PausePatient)
            ),
            action(
                "Rappel",
                self.state
                    .current_patient_id()
                    .map(|_| Message::RecallPatient)
            ),
        ]
        .spacing(6);

        // Paper and auto-calling mirrors.
        let paper = if self.state.paper_low {
            text("Papier : à changer !")
                .size(colors.small_size)
                .color(colors.disconnected)
        } else {
            text("Papier : OK")
                .size(colors.small_size)
                .color(colors.muted)
        };
        let auto_calling = text(format!(
            "Appel auto : {}",
            if self.state.auto_calling {
                "actif"
            } else {
                "inactif"
            }
        ))
        .size(colors.small_size)
        .color(colors.muted);
        let mirrors = row![paper, space::horizontal(), auto_calling];

        // Waiting list.
        let plural = if self.state.waiting.len() > 1 { "s" } else { "" };
        let list_title = text(format!("Patient{plural} ({})", self.state.waiting.len()))
            .size(colors.body_size)
            .color(colors.text);

        let staff_id = self.state.staff.as_ref().map(|s| s.id);
        let mut list = column![].spacing(4);
        for patient in &self.state.waiting {
            let earmarked =
                patient.activity_is_staff.is_some() && patient.activity_is_staff == staff_id;
            let mut label = patient.call_number.clone();
            if patient.activity_is_staff.is_some() {
                label.push_str(&format!(" -> {}", truncate_str(&patient.activity, 24)));
            }
            label.push_str(&language_tag(&patient.language_code));
            let entry = button(text(label).size(colors.small_size))
                .style(colors.list_button_style(earmarked))
                .padding([4, 8])
                .width(Length::Fill)
                .on_press_maybe(patient.id.map(Message::CallSpecific));
            list = list.push(entry);
        }

        let body = column![
            header,
            current,
            actions,
            mirrors,
            list_title,
            scrollable(list).height(Length::Fill),
        ]
        .spacing(12)
        .padding(16)
        .width(Length::Fill)
        .height(Length::Fill);

        container(body)
            .style(colors.panel_bg_style())
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }
}
