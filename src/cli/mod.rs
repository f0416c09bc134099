pub mod history;
pub mod price;
pub mod setup;
pub mod ui;
pub mod watchlist;
