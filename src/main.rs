use anyhow::Result;

use wifibat_bridge::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    wifibat_bridge::app(Options::new()).await
}
