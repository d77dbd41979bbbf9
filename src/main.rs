use iced::widget::{button, canvas, column, container, image, row, text, text_input, Column};
use iced::{Alignment, Element, Length, Task, Theme};
use reqwest::Url;
use rfd::FileDialog;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

mod api;
mod config;
mod error;
mod geo;
mod location;
mod state;
mod ui;

use api::wire::resolve_image_url;
use api::{HttpTransport, NearReviews, NearSource, ReviewClient};
use config::AppConfig;
use error::ReviewError;
use geo::GeoPoint;
use location::{CatalogSelector, LocationSelector, Place, SelectionEvent, Viewport};
use state::cache::ReviewCache;
use state::data::{ImageAttachment, Review};
use state::draft::ReviewDraft;
use state::session::SessionContext;

/// Horizontal span the map pad zooms to when a searched place is chosen
const FOCUS_SPAN_DEG: f64 = 0.25;

/// Which list is on screen
#[derive(Debug, Clone, PartialEq)]
enum ListMode {
    /// Every review the store has
    All,
    /// Reviews near the selected point
    Near(GeoPoint),
}

/// Main application state
struct LanPya {
    /// Talks to the review store
    client: ReviewClient,
    /// Store base URL, used to resolve photo paths
    store_url: Option<Url>,
    /// Offline copy of the last full list
    cache: Option<ReviewCache>,
    session: SessionContext,
    selector: CatalogSelector,
    /// Reviews on screen; replaced as a whole, never edited in place
    reviews: Vec<Review>,
    mode: ListMode,
    /// A full-list fetch is outstanding
    loading_all: bool,
    /// A proximity fetch is outstanding
    loading_near: bool,
    /// Downloaded review photos by review id; `None` once a download failed
    photos: HashMap<String, Option<image::Handle>>,
    /// Review ids whose photo download is in flight
    photos_pending: HashSet<String>,
    /// Bumped per proximity request; older answers are dropped
    near_generation: u64,
    viewport: Viewport,
    search_query: String,
    search_results: Vec<Place>,
    draft: ReviewDraft,
    /// A submit is in flight
    submitting: bool,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    /// Reload the full list
    Refresh,
    ReviewsLoaded(Result<Vec<Review>, ReviewError>),
    /// Click on the map pad, already projected to coordinates
    MapClicked { latitude: f64, longitude: f64 },
    MapZoom(f32),
    MapPan { dx: f32, dy: f32, aspect: f32 },
    SearchChanged(String),
    PlaceChosen(Place),
    NearLoaded { generation: u64, result: NearReviews },
    PhotoLoaded { review_id: String, result: Result<Vec<u8>, ReviewError> },
    ShowAll,
    TitleChanged(String),
    CommentChanged(String),
    RatingChanged(u8),
    AddressChanged(String),
    AuthorChanged(String),
    /// User clicked "Attach photo"
    AttachImage,
    ImageAttached(Result<ImageAttachment, String>),
    RemoveImage,
    Submit,
    Submitted(Result<Review, ReviewError>),
    CancelDraft,
    SignOut,
}

impl LanPya {
    /// Wire up the application from configuration
    fn bootstrap(config: &AppConfig) -> Result<Self, String> {
        config.validate().map_err(|e| format!("Invalid configuration: {}", e))?;

        let transport = HttpTransport::new(
            &config.api.base_url,
            &config.api.reviews_path,
            config.request_timeout(),
        )
            .map_err(|e| format!("Cannot create HTTP client: {}", e))?;
        log::info!("🗺️  Review store at {}", transport.reviews_url());
        let store_url = Some(transport.base_url().clone());
        let client = ReviewClient::new(Arc::new(transport), config.search.radius_km);

        let cache = open_cache(config.storage.cache_path.as_deref());
        let session = SessionContext::init(&config.session);

        let mut app = Self::with_parts(client, cache, session);
        app.store_url = store_url;
        Ok(app)
    }

    fn with_parts(client: ReviewClient, cache: Option<ReviewCache>, session: SessionContext) -> Self {
        // Show whatever was cached last time until the store answers
        let mut cached = Vec::new();
        let mut status = "Loading reviews...".to_string();
        if let Some(cache) = &cache {
            match cache.load_all() {
                Ok(reviews) if !reviews.is_empty() => {
                    log::info!("💾 Loaded {} cached reviews", reviews.len());
                    let fetched_at = cache.fetched_at().ok().flatten();
                    status = match fetched_at {
                        Some(at) => format!(
                            "Showing {} reviews cached {}. Loading reviews...",
                            reviews.len(),
                            at.format("%Y-%m-%d %H:%M UTC")
                        ),
                        None => format!("Showing {} cached reviews. Loading reviews...", reviews.len()),
                    };
                    client.remember(reviews.clone());
                    cached = reviews;
                }
                Ok(_) => {}
                Err(e) => log::warn!("⚠️  Could not read review cache: {}", e),
            }
        }

        LanPya {
            client,
            store_url: None,
            cache,
            session,
            selector: CatalogSelector::default(),
            reviews: cached,
            mode: ListMode::All,
            loading_all: false,
            loading_near: false,
            photos: HashMap::new(),
            photos_pending: HashSet::new(),
            near_generation: 0,
            viewport: Viewport::default(),
            search_query: String::new(),
            search_results: Vec::new(),
            draft: ReviewDraft::new(),
            submitting: false,
            status,
        }
    }

    /// Initial state plus the first fetch
    fn start(self) -> (Self, Task<Message>) {
        let mut app = self;
        let task = Task::batch([app.refresh(), app.request_photos()]);
        (app, task)
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Refresh => self.refresh(),
            Message::ReviewsLoaded(result) => {
                self.loading_all = false;
                match result {
                    Ok(reviews) => {
                        self.store_in_cache(&reviews);
                        if self.mode == ListMode::All {
                            self.status = format!("{} reviews.", reviews.len());
                            self.reviews = reviews;
                        }
                        self.request_photos()
                    }
                    Err(err) => {
                        if self.mode == ListMode::All {
                            self.reviews = Vec::new();
                        }
                        self.status = format!("Could not load reviews. {}", err);
                        Task::none()
                    }
                }
            }
            Message::MapClicked { latitude, longitude } => {
                match self
                    .selector
                    .select(SelectionEvent::Click { latitude, longitude })
                {
                    Ok(point) => self.select_point(point),
                    Err(e) => {
                        self.status = format!("That spot cannot be selected: {}", e);
                        Task::none()
                    }
                }
            }
            Message::MapZoom(delta) => {
                self.viewport.zoom(delta);
                Task::none()
            }
            Message::MapPan { dx, dy, aspect } => {
                self.viewport.pan(dx, dy, aspect);
                Task::none()
            }
            Message::SearchChanged(query) => {
                self.search_results = self.selector.search(&query);
                self.search_query = query;
                Task::none()
            }
            Message::PlaceChosen(place) => {
                self.search_query.clear();
                self.search_results.clear();
                match self.selector.select(SelectionEvent::Search(place)) {
                    Ok(point) => {
                        self.viewport.focus(&point, Some(FOCUS_SPAN_DEG));
                        self.select_point(point)
                    }
                    Err(e) => {
                        self.status = format!("That place cannot be selected: {}", e);
                        Task::none()
                    }
                }
            }
            Message::NearLoaded { generation, result } => {
                if generation != self.near_generation {
                    log::debug!("Dropping stale proximity result #{}", generation);
                    return Task::none();
                }
                self.loading_near = false;
                let count = result.reviews.len();
                self.reviews = result.reviews;
                self.status = match result.source {
                    NearSource::Server => format!("{} reviews nearby.", count),
                    NearSource::LocalFallback(err) => format!(
                        "{} reviews within {} km (offline results). {}",
                        count,
                        self.client.radius_km(),
                        err
                    ),
                };
                self.request_photos()
            }
            Message::PhotoLoaded { review_id, result } => {
                let handle = match result {
                    Ok(bytes) => Some(image::Handle::from_bytes(bytes)),
                    Err(e) => {
                        log::warn!("⚠️  Photo for review {} unavailable: {}", review_id, e);
                        None
                    }
                };
                self.photos_pending.remove(&review_id);
                self.photos.insert(review_id, handle);
                Task::none()
            }
            Message::ShowAll => {
                self.mode = ListMode::All;
                // Invalidate any proximity request still in flight
                self.near_generation += 1;
                self.loading_near = false;
                self.reviews = self.client.last_known().as_ref().clone();
                self.status = format!("{} reviews.", self.reviews.len());
                self.request_photos()
            }
            Message::TitleChanged(title) => {
                self.draft.title = title;
                Task::none()
            }
            Message::CommentChanged(comment) => {
                self.draft.comment = comment;
                Task::none()
            }
            Message::RatingChanged(rating) => {
                self.draft.rating = rating;
                Task::none()
            }
            Message::AddressChanged(address) => {
                self.draft.address = address;
                Task::none()
            }
            Message::AuthorChanged(name) => {
                self.draft.author_name = name;
                Task::none()
            }
            Message::AttachImage => {
                // Show the native file picker
                let picked = FileDialog::new()
                    .set_title("Choose a photo")
                    .add_filter("Images", &state::attachment::IMAGE_EXTENSIONS)
                    .pick_file();

                match picked {
                    Some(path) => self.attach(path),
                    None => Task::none(),
                }
            }
            Message::ImageAttached(result) => {
                match result {
                    Ok(attachment) => {
                        self.status = format!("Attached {}.", attachment.file_name);
                        self.draft.image = Some(attachment);
                    }
                    Err(e) => self.status = format!("Could not attach photo: {}", e),
                }
                Task::none()
            }
            Message::RemoveImage => {
                self.draft.image = None;
                Task::none()
            }
            Message::Submit => self.submit(),
            Message::Submitted(result) => {
                self.submitting = false;
                match result {
                    Ok(review) => {
                        self.status = format!("Posted \"{}\".", review.title);
                        let mut reviews = self.reviews.clone();
                        reviews.push(review);
                        self.reviews = reviews;
                        let known = self.client.last_known();
                        self.store_in_cache(&known);
                        self.draft.clear();
                        self.request_photos()
                    }
                    // Keep the draft so the user can retry
                    Err(err) => {
                        self.status = format!("Review not posted. {}", err);
                        Task::none()
                    }
                }
            }
            Message::CancelDraft => {
                if !self.submitting {
                    self.draft.clear();
                    self.status = "Draft discarded.".to_string();
                }
                Task::none()
            }
            Message::SignOut => {
                self.session.teardown();
                self.status = "Signed out.".to_string();
                Task::none()
            }
        }
    }

    fn refresh(&mut self) -> Task<Message> {
        self.loading_all = true;
        let client = self.client.clone();
        Task::perform(async move { client.fetch_all().await }, Message::ReviewsLoaded)
    }

    /// Make `point` the draft's location and list the reviews around it
    fn select_point(&mut self, point: GeoPoint) -> Task<Message> {
        self.draft.point = Some(point.clone());
        self.mode = ListMode::Near(point.clone());
        self.near_generation += 1;
        self.loading_near = true;
        self.status = format!("Looking for reviews near {}...", point);

        let generation = self.near_generation;
        let client = self.client.clone();
        Task::perform(
            async move { client.fetch_near(&point).await },
            move |result| Message::NearLoaded { generation, result },
        )
    }

    /// Start downloads for listed photos not fetched or in flight yet
    fn request_photos(&mut self) -> Task<Message> {
        let Some(base) = self.store_url.clone() else {
            return Task::none();
        };

        let mut tasks = Vec::new();
        for review in &self.reviews {
            if self.photos.contains_key(&review.id) || self.photos_pending.contains(&review.id) {
                continue;
            }
            let Some(url) = review
                .image_ref
                .as_deref()
                .and_then(|path| resolve_image_url(&base, path))
            else {
                continue;
            };

            self.photos_pending.insert(review.id.clone());
            let client = self.client.clone();
            let review_id = review.id.clone();
            tasks.push(Task::perform(
                async move { client.fetch_photo(&url).await },
                move |result| Message::PhotoLoaded {
                    review_id: review_id.clone(),
                    result,
                },
            ));
        }

        Task::batch(tasks)
    }

    fn attach(&mut self, path: PathBuf) -> Task<Message> {
        self.status = format!("Reading {}...", path.display());
        Task::perform(state::attachment::load_attachment(path), Message::ImageAttached)
    }

    fn submit(&mut self) -> Task<Message> {
        // At most one request per draft
        if self.submitting {
            return Task::none();
        }

        let session = match self.session.require() {
            Ok(session) => session.clone(),
            Err(e) => {
                self.status = e.to_string();
                return Task::none();
            }
        };
        if let Err(e) = self.draft.validate() {
            self.status = e.to_string();
            return Task::none();
        }

        self.submitting = true;
        self.status = "Posting review...".to_string();

        let client = self.client.clone();
        let draft = self.draft.clone();
        Task::perform(
            async move { client.submit(&draft, &session).await },
            Message::Submitted,
        )
    }

    fn store_in_cache(&mut self, reviews: &[Review]) {
        if let Some(cache) = self.cache.as_mut() {
            if let Err(e) = cache.replace_all(reviews) {
                log::warn!("⚠️  Could not update review cache: {}", e);
            }
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let header = row![
            text("Lan Pya").size(32),
            text("Reviews around the places you go").size(16),
            iced::widget::horizontal_space(),
            text(match self.session.current() {
                Some(session) => format!("Signed in as {}", session.username),
                None => "Browsing as guest".to_string(),
            })
            .size(14),
            button("Refresh")
                .on_press_maybe((!self.loading_all).then_some(Message::Refresh))
                .padding(8),
            button("All reviews")
                .on_press_maybe(matches!(self.mode, ListMode::Near(_)).then_some(Message::ShowAll))
                .padding(8),
            button("Sign out")
                .on_press_maybe(self.session.is_signed_in().then_some(Message::SignOut))
                .padding(8),
        ]
        .spacing(16)
        .align_y(Alignment::Center);

        let results: Column<Message> = self.search_results.iter().fold(
            Column::new().spacing(4),
            |list, place| {
                list.push(
                    button(text(place.name.clone()).size(14))
                        .on_press(Message::PlaceChosen(place.clone()))
                        .width(Length::Fill)
                        .padding(6),
                )
            },
        );

        let map = canvas(ui::MapPad {
            viewport: self.viewport,
            markers: self
                .reviews
                .iter()
                .filter_map(|review| review.position.clone())
                .collect(),
            selected: self.draft.point.clone(),
        })
        .width(Length::Fill)
        .height(Length::Fixed(320.0));

        let left = column![
            text_input("Search destinations", &self.search_query)
                .on_input(Message::SearchChanged)
                .padding(8),
            results,
            map,
            ui::compose_form(&self.draft, self.submitting, self.session.is_signed_in()),
        ]
        .spacing(12)
        .width(Length::FillPortion(3));

        let list_title = match &self.mode {
            ListMode::All => "All reviews".to_string(),
            ListMode::Near(point) => format!("Near {}", point),
        };
        let loading = match self.mode {
            ListMode::All => self.loading_all,
            ListMode::Near(_) => self.loading_near,
        };
        let empty_text = if loading { "Loading..." } else { "No reviews here yet." };

        let right = column![
            text(list_title).size(22),
            ui::review_list(&self.reviews, &self.photos, empty_text),
        ]
        .spacing(12)
        .width(Length::FillPortion(2));

        let content = column![
            header,
            row![left, right].spacing(24).height(Length::Fill),
            text(&self.status).size(14),
        ]
        .spacing(16)
        .padding(24);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Open the on-disk cache, falling back to an in-memory one
fn open_cache(path: Option<&std::path::Path>) -> Option<ReviewCache> {
    let opened = match path {
        Some(path) => ReviewCache::open(path),
        None => ReviewCache::in_memory(),
    };

    match opened {
        Ok(cache) => {
            match cache.path() {
                Some(path) => log::info!("💾 Review cache at {}", path.display()),
                None => log::info!("💾 Review cache kept in memory"),
            }
            Some(cache)
        }
        Err(e) => {
            log::warn!("⚠️  Review cache unavailable ({}); continuing without it", e);
            ReviewCache::in_memory().ok()
        }
    }
}

fn init_logging() {
    let mut builder = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        builder
            .filter_level(log::LevelFilter::Warn)
            .filter_module("lan_pya", log::LevelFilter::Info);
    }
    let _ = builder.try_init();
}

fn main() -> iced::Result {
    init_logging();

    let config = AppConfig::from_env();
    let app = match LanPya::bootstrap(&config) {
        Ok(app) => app,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    iced::application("Lan Pya", LanPya::update, LanPya::view)
        .theme(LanPya::theme)
        .centered()
        .run_with(move || app.start())
}
