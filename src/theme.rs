use iced::Color;

use crate::notify::ToastColor;
use crate::realtime::ConnectionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ThemeMode {
    Dark,
    Light,
}

/// Colors and font sizes used throughout the panel and the toasts.
pub(crate) struct Palette {
    pub is_dark: bool,
    // Text
    pub text: Color,
    pub muted: Color,
    // Panel
    pub panel_bg: Color,
    pub accent: Color,
    /// Highlight for patients earmarked for the logged-in staff.
    pub staff_highlight: Color,
    // Toast backgrounds
    pub toast_default: Color,
    pub toast_warning: Color,
    pub toast_alert: Color,
    pub toast_text: Color,
    pub toast_separator: Color,
    // Connection indicator
    pub connected: Color,
    pub connecting: Color,
    pub disconnected: Color,
    // Font sizes (logical pixels)
    pub title_size: f32,
    pub body_size: f32,
    pub small_size: f32,
}

impl Palette {
    pub fn dark() -> Self {
        Self {
            is_dark: true,
            text: Color {
                r: 0.92,
                g: 0.92,
                b: 0.94,
                a: 1.0,
            },
            muted: Color {
                r: 0.92,
                g: 0.92,
                b: 0.94,
                a: 0.45,
            },
            panel_bg: Color {
                r: 0.07,
                g: 0.07,
                b: 0.10,
                a: 0.95,
            },
            accent: Color {
                r: 0.25,
                g: 0.55,
                b: 0.90,
                a: 1.0,
            },
            staff_highlight: Color {
                r: 0.98,
                g: 0.52,
                b: 0.09,
                a: 1.0,
            },
            toast_default: Color {
                r: 0.12,
                g: 0.12,
                b: 0.16,
                a: 0.96,
            },
            toast_warning: Color {
                r: 0.85,
                g: 0.50,
                b: 0.05,
                a: 0.96,
            },
            toast_alert: Color {
                r: 0.75,
                g: 0.12,
                b: 0.12,
                a: 0.96,
            },
            toast_text: Color::WHITE,
            toast_separator: Color {
                r: 1.0,
                g: 1.0,
                b: 1.0,
                a: 0.2,
            },
            connected: Color {
                r: 0.20,
                g: 0.75,
                b: 0.30,
                a: 1.0,
            },
            connecting: Color {
                r: 0.95,
                g: 0.70,
                b: 0.10,
                a: 1.0,
            },
            disconnected: Color {
                r: 0.90,
                g: 0.20,
                b: 0.20,
                a: 1.0,
            },
            title_size: 16.0,
            body_size: 13.0,
            small_size: 11.0,
        }
    }

    pub fn light() -> Self {
        Self {
            is_dark: false,
            text: Color {
                r: 0.10,
                g: 0.10,
                b: 0.12,
                a: 1.0,
            },
            muted: Color {
                r: 0.10,
                g: 0.10,
                b: 0.12,
                a: 0.5,
            },
            panel_bg: Color {
                r: 0.96,
                g: 0.96,
                b: 0.97,
                a: 0.97,
            },
            accent: Color {
                r: 0.15,
                g: 0.40,
                b: 0.80,
                a: 1.0,
            },
            staff_highlight: Color {
                r: 0.98,
                g: 0.52,
                b: 0.09,
                a: 1.0,
            },
            toast_default: Color {
                r: 1.0,
                g: 1.0,
                b: 1.0,
                a: 0.98,
            },
            toast_warning: Color {
                r: 0.98,
                g: 0.65,
                b: 0.15,
                a: 0.98,
            },
            toast_alert: Color {
                r: 0.88,
                g: 0.20,
                b: 0.20,
                a: 0.98,
            },
            toast_text: Color {
                r: 0.08,
                g: 0.08,
                b: 0.10,
                a: 1.0,
            },
            toast_separator: Color {
                r: 0.0,
                g: 0.0,
                b: 0.0,
                a: 0.15,
            },
            connected: Color {
                r: 0.10,
                g: 0.60,
                b: 0.20,
                a: 1.0,
            },
            connecting: Color {
                r: 0.85,
                g: 0.60,
                b: 0.05,
                a: 1.0,
            },
            disconnected: Color {
                r: 0.80,
                g: 0.15,
                b: 0.15,
                a: 1.0,
            },
            title_size: 16.0,
            body_size: 13.0,
            small_size: 11.0,
        }
    }

    pub fn toast_background(&self, color: ToastColor) -> Color {
        match color {
            ToastColor::Default => self.toast_default,
            ToastColor::Orange => self.toast_warning,
            ToastColor::Red => self.toast_alert,
        }
    }

    pub fn connection_color(&self, state: ConnectionState) -> Color {
        match state {
            ConnectionState::Connected => self.connected,
            ConnectionState::Connecting => self.connecting,
            ConnectionState::Disconnected => self.disconnected,
        }
    }
}

impl Palette {
    pub fn panel_bg_style(&self) -> impl Fn(&iced::Theme) -> iced::widget::container::Style {
        let color = self.panel_bg;
        move |_theme: &iced::Theme| iced::widget::container::Style {
            background: Some(iced::Background::Color(color)),
            border: iced::Border {
                radius: 8.0.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn toast_bg_style(
        &self,
        color: ToastColor,
    ) -> impl Fn(&iced::Theme) -> iced::widget::container::Style {
        let background = self.toast_background(color);
        move |_theme: &iced::Theme| iced::widget::container::Style {
            background: Some(iced::Background::Color(background)),
            border: iced::Border {
                radius: 6.0.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn separator_style(&self) -> impl Fn(&iced::Theme) -> iced::widget::container::Style {
        let color = self.toast_separator;
        move |_theme: &iced::Theme| iced::widget::container::Style {
            background: Some(iced::Background::Color(color)),
            ..Default::default()
        }
    }

    pub fn action_button_style(
        &self,
    ) -> impl Fn(&iced::Theme, iced::widget::button::Status) -> iced::widget::button::Style {
        let accent = self.accent;
        let text = Color::WHITE;
        move |_theme: &iced::Theme, status: iced::widget::button::Status| {
            let background = match status {
                iced::widget::button::Status::Hovered | iced::widget::button::Status::Pressed => {
                    Color { a: 0.85, ..accent }
                }
                iced::widget::button::Status::Disabled => Color { a: 0.3, ..accent },
                iced::widget::button::Status::Active => accent,
            };
            iced::widget::button::Style {
                background: Some(iced::Background::Color(background)),
                text_color: text,
                border: iced::Border {
                    radius: 4.0.into(),
                    ..Default::default()
                },
                ..Default::default()
            }
        }
    }

    pub fn list_button_style(
        &self,
        earmarked: bool,
    ) -> impl Fn(&iced::Theme, iced::widget::button::Status) -> iced::widget::button::Style {
        let highlight = self.staff_highlight;
        let text = self.text;
        let base = if self.is_dark {
            Color {
                r: 0.14,
                g: 0.14,
                b: 0.19,
                a: 1.0,
            }
        } else {
            Color {
                r: 0.88,
                g: 0.88,
                b: 0.90,
                a: 1.0,
            }
        };
        move |_theme: &iced::Theme, status: iced::widget::button::Status| {
            let background = if earmarked { highlight } else { base };
            let background = match status {
                iced::widget::button::Status::Hovered | iced::widget::button::Status::Pressed => {
                    Color {
                        a: 0.8,
                        ..background
                    }
                }
                _ => background,
            };
            let text_color = if earmarked { Color::BLACK } else { text };
            iced::widget::button::Style {
                background: Some(iced::Background::Color(background)),
                text_color,
                border: iced::Border {
                    radius: 4.0.into(),
                    ..Default::default()
                },
                ..Default::default()
            }
        }
    }
}

pub(crate) fn resolve(mode: ThemeMode) -> Palette {
    match mode {
        ThemeMode::Dark => Palette::dark(),
        ThemeMode::Light => Palette::light(),
    }
}
