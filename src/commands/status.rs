//! Handle status command

use std::io::Write;

use anyhow::Result;

use crate::service::PostingService;

/// Print the latest completed post id reported by the service
pub async fn handle<S: PostingService, W: Write>(service: &S, output: &mut W) -> Result<u64> {
    let latest = service.latest_completed_id().await?;
    writeln!(output, "latest completed post id: {}", latest)?;
    Ok(latest)
}
