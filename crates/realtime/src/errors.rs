use thiserror::Error;

#[derive(Error, Debug)]
pub enum HubError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Outbound queue is full")]
    QueueFull,

    #[error("Connection is closed")]
    Closed,
}
