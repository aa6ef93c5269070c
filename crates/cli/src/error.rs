use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not open the atlas cache")]
    Setup,
    #[display("no game version given; pass --version or set `version` in the configuration")]
    NoVersion,
    #[display("{_0}")]
    Service(#[error(not(source))] String),
    #[display("unknown atlas {_0}")]
    UnknownAtlas(#[error(not(source))] String),
    #[display("atlas {atlas} has no group {group}")]
    UnknownGroup { atlas: String, group: String },
}
