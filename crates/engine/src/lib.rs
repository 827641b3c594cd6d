//! Pure computation behind the merger calculator: allocation math, the
//! Allocation View state container, ticker frame codec and display formatting.

pub mod allocation;
pub mod format;
pub mod ticker;
pub mod view;
