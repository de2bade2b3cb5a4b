pub mod card;
pub mod error;
pub mod output;
