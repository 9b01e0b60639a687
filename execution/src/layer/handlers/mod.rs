use super::*;

mod governance;
mod request;
mod settlement;
mod treasury;
