use std::time::Instant;
use surf::middleware::{Middleware, Next};
use surf::{Client, Request, Response};

/// Surf middleware that logs every outbound request with its status and
/// duration through the `log` facade.
pub struct SurfLogging;

#[surf::utils::async_trait]
impl Middleware for SurfLogging {
    async fn handle(
        &self,
        req: Request,
        client: Client,
        next: Next<'_>,
    ) -> Result<Response, surf::Error> {
        let method = req.method();
        let url = req.url().clone();
        let start = Instant::now();

        let res = next.run(req, client).await?;

        log::debug!(
            "{} {} -> {} ({}ms)",
            method,
            url,
            res.status(),
            start.elapsed().as_millis()
        );
        Ok(res)
    }
}
