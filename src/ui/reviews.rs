use iced::widget::{column, container, image, scrollable, text, Column};
use iced::{Color, ContentFit, Element, Length};
use std::collections::HashMap;

use crate::state::data::Review;
use crate::Message;

const MUTED: Color = Color::from_rgb(0.62, 0.65, 0.70);
const GOLD: Color = Color::from_rgb(0.83, 0.69, 0.22);

/// Scrollable list of review cards
///
/// `photos` maps review ids to downloaded photos; `None` marks a failed download.
pub fn review_list<'a>(
    reviews: &'a [Review],
    photos: &HashMap<String, Option<image::Handle>>,
    empty_text: &'a str,
) -> Element<'a, Message> {
    if reviews.is_empty() {
        return container(text(empty_text).size(16).color(MUTED))
            .padding(20)
            .width(Length::Fill)
            .into();
    }

    let cards: Column<Message> = reviews
        .iter()
        .fold(Column::new().spacing(12), |list, review| {
            list.push(review_card(review, photos.get(&review.id)))
        });

    scrollable(cards.padding([0, 12]))
        .height(Length::Fill)
        .into()
}

fn review_card<'a>(
    review: &'a Review,
    photo: Option<&Option<image::Handle>>,
) -> Element<'a, Message> {
    let byline = match (&review.author_name, review.created_at) {
        (Some(author), Some(at)) => format!("{} · {}", author, at.format("%Y-%m-%d")),
        (Some(author), None) => author.clone(),
        (None, Some(at)) => at.format("%Y-%m-%d").to_string(),
        (None, None) => String::new(),
    };

    let place = match (&review.address, &review.position) {
        (Some(address), _) => address.clone(),
        (None, Some(position)) => position.coordinates_text(),
        (None, None) => "Unknown location".to_string(),
    };

    let mut card = column![
        text(&review.title).size(18),
        text(review.stars()).size(14).color(GOLD),
        text(&review.comment).size(14),
        text(format!("📍 {}", place)).size(12).color(MUTED),
    ]
    .spacing(4);

    if !byline.is_empty() {
        card = card.push(text(byline).size(12).color(MUTED));
    }

    match photo {
        Some(Some(handle)) => {
            card = card.push(
                image(handle.clone())
                    .width(Length::Fill)
                    .height(Length::Fixed(180.0))
                    .content_fit(ContentFit::Cover),
            );
        }
        Some(None) => {
            card = card.push(text("📷 Photo unavailable").size(12).color(MUTED));
        }
        None if review.image_ref.is_some() => {
            card = card.push(text("📷 Loading photo...").size(12).color(MUTED));
        }
        None => {}
    }

    container(card)
        .padding(12)
        .width(Length::Fill)
        .style(container::rounded_box)
        .into()
}
