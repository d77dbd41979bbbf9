use iced::widget::{button, column, image, pick_list, row, text, text_input};
use iced::{Alignment, Color, Element, Length};

use crate::state::draft::ReviewDraft;
use crate::Message;

/// Star ratings offered in the picker
const RATINGS: [u8; 5] = [1, 2, 3, 4, 5];

const MUTED: Color = Color::from_rgb(0.62, 0.65, 0.70);

/// Review form for the current draft
///
/// Submit is disabled while a submit is in flight, so one draft never has
/// two requests outstanding.
pub fn compose_form<'a>(
    draft: &'a ReviewDraft,
    submitting: bool,
    signed_in: bool,
) -> Element<'a, Message> {
    let location = match &draft.point {
        Some(point) => text(format!("📍 {}", point)).size(14),
        None => text("Click the map or search for a place to choose a location").size(14).color(MUTED),
    };

    let mut form = column![
        text("Write a review").size(22),
        location,
        text_input("Title", &draft.title)
            .on_input(Message::TitleChanged)
            .padding(8),
        text_input("Your review", &draft.comment)
            .on_input(Message::CommentChanged)
            .on_submit(Message::Submit)
            .padding(8),
        row![
            text("Rating").size(14),
            pick_list(&RATINGS[..], Some(draft.rating), Message::RatingChanged),
        ]
        .spacing(10)
        .align_y(Alignment::Center),
        text_input("Address (optional)", &draft.address)
            .on_input(Message::AddressChanged)
            .padding(8),
        text_input("Your name (optional)", &draft.author_name)
            .on_input(Message::AuthorChanged)
            .padding(8),
    ]
    .spacing(10);

    form = match &draft.image {
        Some(attachment) => form.push(
            row![
                image(image::Handle::from_bytes(attachment.bytes.clone()))
                    .width(Length::Fixed(96.0))
                    .height(Length::Fixed(72.0)),
                text(&attachment.file_name).size(13),
                button("Remove photo").on_press(Message::RemoveImage).padding(6),
            ]
            .spacing(10)
            .align_y(Alignment::Center),
        ),
        None => form.push(button("Attach photo").on_press(Message::AttachImage).padding(8)),
    };

    let submit_label = if submitting { "Posting..." } else { "Submit review" };
    let actions = row![
        button(submit_label)
            .on_press_maybe((!submitting && signed_in).then_some(Message::Submit))
            .padding(10),
        button("Cancel")
            .on_press_maybe((!submitting && !draft.is_blank()).then_some(Message::CancelDraft))
            .padding(10),
    ]
    .spacing(10);

    form = form.push(actions);
    if !signed_in {
        form = form.push(text("Sign in to post reviews.").size(13).color(MUTED));
    }

    form.into()
}
