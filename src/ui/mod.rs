//! Terminal front end for playing a match: a plain-text board view and a
//! line-based human seat.

mod human;
mod text_view;

pub use human::{parse_choice, HumanAgent};
pub use text_view::{describe_event, render_state, TextView};
