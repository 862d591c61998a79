//! Screen layouts
//!
//! Pure functions from state to widgets. Every interaction is reported as a
//! `Message` and handled in `main.rs`.

use iced::widget::{
    button, canvas, column, container, image, pick_list, progress_bar, row, scrollable, stack,
    text, text_input, Space,
};
use iced::{Alignment, Element, Length};
use iced_aw::Wrap;
use std::fmt;

use super::canvas::CropCanvas;
use crate::error::{AppError, ErrorCategory};
use crate::state::data::{Template, TemplateId};
use crate::state::editor::{DragState, TemplateDraft};
use crate::state::generation::JobStatus;
use crate::state::geometry::RegionKind;
use crate::state::view::GenerateScreen;
use crate::Message;

const CARD_WIDTH: f32 = 220.0;
const THUMBNAIL_HEIGHT: f32 = 140.0;

/// Inline message shown above the current screen
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    /// `None` for informational notices
    pub category: Option<ErrorCategory>,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            category: None,
            text: text.into(),
        }
    }

    pub fn error(error: impl Into<AppError>) -> Self {
        let error = error.into();
        Self {
            category: Some(error.category()),
            text: error.to_string(),
        }
    }
}

/// Entry of the template pick list
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateChoice {
    pub id: TemplateId,
    pub name: String,
}

impl fmt::Display for TemplateChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

pub fn template_choices(templates: &[Template]) -> Vec<TemplateChoice> {
    templates
        .iter()
        .map(|t| TemplateChoice {
            id: t.id,
            name: t.name.clone(),
        })
        .collect()
}

/// Human-readable status line of the generate screen
pub fn job_status_text(screen: &GenerateScreen) -> String {
    let Some(job) = screen.orchestrator.job() else {
        return "Select a template and a source folder".to_string();
    };

    match job.status {
        JobStatus::Idle => "Ready".to_string(),
        JobStatus::Requested => "Starting...".to_string(),
        JobStatus::Generating => format!("Generating... {}%", job.progress),
        JobStatus::Succeeded => match &job.archive_path {
            Some(path) => format!("✅ Done! Archive saved to {}", path.display()),
            None => "✅ Done!".to_string(),
        },
        JobStatus::Failed => match &job.error {
            Some(e) => format!("❌ {}", e),
            None => "❌ Generation failed".to_string(),
        },
    }
}

fn created_label(created_at: i64) -> String {
    chrono::DateTime::from_timestamp(created_at, 0)
        .map(|dt| format!("Created {}", dt.format("%Y-%m-%d %H:%M")))
        .unwrap_or_default()
}

pub fn notice_bar(notice: &Notice) -> Element<'_, Message> {
    let message = match notice.category {
        Some(category) => text(format!("{}: {}", category, notice.text)).style(text::danger),
        None => text(notice.text.as_str()),
    };

    container(
        row![
            message.width(Length::Fill),
            button("Dismiss")
                .on_press(Message::DismissNotice)
                .style(button::text),
        ]
        .spacing(10)
        .align_y(Alignment::Center),
    )
    .padding(10)
    .width(Length::Fill)
    .style(container::rounded_box)
    .into()
}

fn template_card(template: &Template, confirming: bool) -> Element<'_, Message> {
    let actions: Element<Message> = if confirming {
        row![
            text("Delete?").size(14),
            button("Yes")
                .on_press(Message::DeleteConfirmed)
                .style(button::danger),
            button("No")
                .on_press(Message::DeleteCancelled)
                .style(button::secondary),
        ]
        .spacing(6)
        .align_y(Alignment::Center)
        .into()
    } else {
        row![
            button("Edit").on_press(Message::EditTemplate(template.id)),
            button("Delete")
                .on_press(Message::DeleteRequested(template.id))
                .style(button::danger),
        ]
        .spacing(6)
        .into()
    };

    container(
        column![
            image(image::Handle::from_path(&template.template_img))
                .width(Length::Fill)
                .height(THUMBNAIL_HEIGHT),
            text(template.name.as_str()).size(18),
            text(created_label(template.created_at)).size(12),
            actions,
        ]
        .spacing(8),
    )
    .padding(10)
    .width(CARD_WIDTH)
    .style(container::bordered_box)
    .into()
}

pub fn list_view(templates: &[Template], pending_delete: Option<TemplateId>) -> Element<'_, Message> {
    let header = row![
        text("Photo Templates").size(32).width(Length::Fill),
        button("New Template").on_press(Message::NewTemplate),
        button("Generate Images")
            .on_press(Message::OpenGenerate)
            .style(button::success),
    ]
    .spacing(10)
    .align_y(Alignment::Center);

    let body: Element<Message> = if templates.is_empty() {
        text("No templates yet. Create one to get started.").into()
    } else {
        let cards = templates
            .iter()
            .map(|t| template_card(t, pending_delete == Some(t.id)))
            .collect();
        scrollable(Wrap::with_elements(cards).spacing(12.0).line_spacing(12.0))
            .height(Length::Fill)
            .into()
    };

    column![header, body].spacing(20).into()
}

fn region_button(kind: RegionKind, active: RegionKind) -> Element<'static, Message> {
    let label = match kind {
        RegionKind::Photo => "Photo Region",
        RegionKind::Number => "Number Region",
    };
    button(label)
        .on_press(Message::RegionModeSelected(kind))
        .style(if kind == active {
            button::primary
        } else {
            button::secondary
        })
        .into()
}

fn crop_area(draft: &TemplateDraft) -> Element<'_, Message> {
    let Some(preview) = &draft.preview else {
        let hint = if draft.template_img.is_empty() {
            "Upload a template image to draw the regions"
        } else {
            "Loading template image..."
        };
        return container(text(hint))
            .padding(40)
            .center_x(Length::Fill)
            .into();
    };

    let width = preview.width as f32;
    let height = preview.height as f32;
    let program = CropCanvas {
        regions: *draft.editor.regions(),
        active: draft.editor.active_region(),
        dragging: draft.editor.drag_state() != DragState::Idle,
    };

    let layered = stack![
        image(image::Handle::from_path(&preview.path))
            .width(width)
            .height(height),
        canvas(program).width(width).height(height),
    ];

    scrollable(layered)
        .direction(scrollable::Direction::Both {
            vertical: scrollable::Scrollbar::default(),
            horizontal: scrollable::Scrollbar::default(),
        })
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

pub fn editor_view<'a>(
    draft: &'a TemplateDraft,
    title: &'static str,
    saving: bool,
) -> Element<'a, Message> {
    let active = draft.editor.active_region();

    let form = row![
        text_input("Template name", &draft.name)
            .on_input(Message::NameChanged)
            .padding(8)
            .width(Length::Fill),
        button("Upload Image").on_press(Message::PickTemplateImage),
    ]
    .spacing(10)
    .align_y(Alignment::Center);

    let modes = row![
        text("Draw:"),
        region_button(RegionKind::Photo, active),
        region_button(RegionKind::Number, active),
        Space::with_width(Length::Fill),
        button("Cancel")
            .on_press_maybe((!saving).then_some(Message::ShowList))
            .style(button::secondary),
        button(if saving { "Saving..." } else { "Save" })
            .on_press_maybe((!saving).then_some(Message::SaveTemplate))
            .style(button::success),
    ]
    .spacing(10)
    .align_y(Alignment::Center);

    column![text(title).size(32), form, modes, crop_area(draft)]
        .spacing(16)
        .into()
}

pub fn generate_view<'a>(screen: &'a GenerateScreen, templates: &'a [Template]) -> Element<'a, Message> {
    let choices = template_choices(templates);
    let selected = screen
        .selected_template
        .and_then(|id| choices.iter().find(|c| c.id == id).cloned());
    let in_flight = screen.orchestrator.is_in_flight();

    let template_row = row![
        text("Template").width(Length::Fixed(120.0)),
        pick_list(choices, selected, Message::TemplateSelected)
            .placeholder("Choose a template")
            .width(Length::Fill),
    ]
    .spacing(10)
    .align_y(Alignment::Center);

    let folder_row = row![
        text("Source folder").width(Length::Fixed(120.0)),
        text_input("/path/to/photos", &screen.folder)
            .on_input(Message::FolderChanged)
            .padding(8)
            .width(Length::Fill),
        button("Browse").on_press(Message::BrowseFolder),
    ]
    .spacing(10)
    .align_y(Alignment::Center);

    let mut controls = row![
        button("Back")
            .on_press_maybe((!in_flight).then_some(Message::ShowList))
            .style(button::secondary),
        button("Generate")
            .on_press_maybe((!in_flight).then_some(Message::StartGeneration))
            .style(button::success),
    ]
    .spacing(10);

    if in_flight {
        controls = controls.push(
            button("Cancel")
                .on_press(Message::CancelGeneration)
                .style(button::danger),
        );
    }
    if screen.orchestrator.status() == JobStatus::Succeeded {
        controls = controls.push(button("Open Folder").on_press(Message::OpenArchive));
    }

    column![
        text("Generate Images").size(32),
        template_row,
        folder_row,
        controls,
        progress_bar(0.0..=100.0, f32::from(screen.orchestrator.progress())),
        text(job_status_text(screen)),
    ]
    .spacing(16)
    .into()
}
