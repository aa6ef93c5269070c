//! User-facing feedback about background refreshes.

use derive_more::Display;

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Notice {
    #[display("refreshing atlas cache")]
    Started,
    #[display("a refresh is already running")]
    AlreadyRunning,
    #[display("catalog ready: {atlases} atlases, {sprites} sprites")]
    Completed { atlases: usize, sprites: usize },
    #[display("refresh failed: {_0}")]
    Failed(String),
}

/// Somewhere to send [`Notice`]s: a terminal, a chat, a log.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Notice::Started, "refreshing atlas cache")]
    #[case(Notice::Completed { atlases: 3, sprites: 120 }, "catalog ready: 3 atlases, 120 sprites")]
    #[case(Notice::Failed("no such version".to_string()), "refresh failed: no such version")]
    fn test_notice_display(#[case] notice: Notice, #[case] expected: &str) {
        assert_eq!(notice.to_string(), expected);
    }
}
