pub mod assets;
pub mod ws;

use crate::error::AppError;
use tokio::net::TcpListener;

pub async fn bind(what: &'static str, host: &str, port: u16) -> Result<TcpListener, AppError> {
    let addr = format!("{host}:{port}");
    TcpListener::bind(&addr)
        .await
        .map_err(|source| AppError::Bind { what, addr, source })
}
