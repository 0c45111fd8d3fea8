use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{}", .0)]
    Custom(String),

    #[error("IO::{:?}: {}", .0, .0)]
    Io(#[from] std::io::Error),

    #[error("Json::{}", .0)]
    Json(#[from] serde_json::Error),

    #[error("FlexiLogger::{:?}: {}", .0, .0)]
    FlexiLogger(#[from] flexi_logger::FlexiLoggerError),

    #[error("Decode::{}", .0)]
    Decode(#[from] keystone_core::token::DecodeError),

    #[error("Session::{}", .0)]
    Session(#[from] keystone_core::session::SessionError),

    #[error("Store::{}", .0)]
    Store(#[from] keystone_core::store::StoreError),

    #[error("Refresh::{}", .0)]
    Refresh(#[from] keystone_core::refresh::RefreshError),
}
