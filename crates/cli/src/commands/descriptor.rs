//! Agent descriptor inspection.

use rwa_discount_agent::{DEFAULT_HTTP_TIMEOUT, HttpNetwork, Network, NetworkError};
use rwa_discount_core::{AgentDescriptor, FetchRequest};
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;

/// Path the origin publishes the descriptor at.
pub const DESCRIPTOR_PATH: &str = "/agent.json";

/// Errors that can occur while fetching the descriptor.
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("Invalid origin: {0}")]
    InvalidOrigin(#[from] url::ParseError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Descriptor request returned status {0}")]
    Status(u16),

    #[error("Invalid descriptor: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// A fetched descriptor and the digest hosts compare it by.
#[derive(Debug)]
pub struct FetchedDescriptor {
    pub url: Url,
    pub descriptor: AgentDescriptor,
    pub sha256: String,
}

/// Fetch the descriptor published by `origin`.
///
/// # Errors
///
/// Returns `DescriptorError` if the request fails or the body is not a descriptor.
pub async fn fetch(network: &dyn Network, origin: &Url) -> Result<FetchedDescriptor, DescriptorError> {
    let url = origin.join(DESCRIPTOR_PATH)?;
    let response = network.fetch(&FetchRequest::get(url.clone())).await?;
    if !response.is_success() {
        return Err(DescriptorError::Status(response.status));
    }

    Ok(FetchedDescriptor {
        url,
        descriptor: AgentDescriptor::from_slice(&response.body)?,
        sha256: format!("{:x}", Sha256::digest(&response.body)),
    })
}

/// Fetch the descriptor and print it.
///
/// # Errors
///
/// Returns `DescriptorError` if the descriptor cannot be fetched.
pub async fn print(origin: &Url) -> Result<(), DescriptorError> {
    let network = HttpNetwork::new(Some(origin.clone()), DEFAULT_HTTP_TIMEOUT)?;
    let fetched = fetch(&network, origin).await?;
    tracing::info!(url = %fetched.url, "Fetched agent descriptor");

    #[allow(clippy::print_stdout)]
    {
        println!("url:     {}", fetched.url);
        println!("sha256:  {}", fetched.sha256);
        println!("{}", serde_json::to_string_pretty(&fetched.descriptor)?);
    }
    Ok(())
}
