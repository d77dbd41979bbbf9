/// Views and widgets
///
/// - Map pad canvas for picking points (map_pad.rs)
/// - Review cards (reviews.rs)
/// - The compose form (compose.rs)

pub mod map_pad;
pub mod reviews;
pub mod compose;

pub use compose::compose_form;
pub use map_pad::MapPad;
pub use reviews::review_list;
