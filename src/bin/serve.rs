use anyhow::Result;

#[tokio::main]
pub async fn main() -> Result<()> {
    maintenance_relay::start_server().await
}
