use std::future::Future;

use async_trait::async_trait;
use aws_sdk_secretsmanager as secretsmanager;
use aws_sdk_secretsmanager::types::{Filter, FilterNameStringType, SecretListEntry};
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret not found: {0}")]
    NotFound(String),

    #[error("secret {0} has no string value")]
    Empty(String),

    #[error("secrets provider error: {0}")]
    Provider(String),
}

/// Read access to a remote secret store.
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Fetch the string value of the secret with exactly this name (or ARN).
    async fn secret_by_name(&self, name: &str) -> Result<String, SecretError>;

    /// Fetch the string value of the first secret whose description starts with `prefix`.
    async fn secret_by_description_prefix(&self, prefix: &str) -> Result<String, SecretError>;
}

/// [`SecretSource`] backed by AWS Secrets Manager.
#[derive(Clone, Debug)]
pub struct AwsSecretSource {
    inner: secretsmanager::Client,
}

impl AwsSecretSource {
    pub fn new(inner: secretsmanager::Client) -> Self {
        Self { inner }
    }

    /// Build a client from the ambient AWS configuration (env, profile, instance role).
    pub async fn from_env(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let sdk_config = loader.load().await;
        Self::new(secretsmanager::Client::new(&sdk_config))
    }
}

fn provider_error(err: secretsmanager::Error, id: &str) -> SecretError {
    match err {
        secretsmanager::Error::ResourceNotFoundException(_) => SecretError::NotFound(id.to_string()),
        other => SecretError::Provider(other.to_string()),
    }
}

/// One `ListSecrets` page: its entries and the token for the next page.
type SecretPage = (Vec<SecretListEntry>, Option<String>);

/// Id of the first entry whose description starts with `prefix`, compared
/// case-sensitively. The ARN is preferred over the name.
fn first_matching_secret<'a>(entries: &'a [SecretListEntry], prefix: &str) -> Option<&'a str> {
    entries
        .iter()
        .filter(|entry| {
            entry
                .description()
                .is_some_and(|description| description.starts_with(prefix))
        })
        .find_map(|entry| entry.arn().or(entry.name()))
}

/// Walk pages from `fetch_page` until an entry matches or the pages run out.
async fn find_across_pages<F, Fut>(
    prefix: &str,
    mut fetch_page: F,
) -> Result<Option<String>, SecretError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<SecretPage, SecretError>>,
{
    let mut next_token: Option<String> = None;
    loop {
        let (entries, token) = fetch_page(next_token.take()).await?;
        if let Some(id) = first_matching_secret(&entries, prefix) {
            return Ok(Some(id.to_string()));
        }
        match token {
            Some(token) if !token.is_empty() => next_token = Some(token),
            _ => return Ok(None),
        }
    }
}

#[async_trait]
impl SecretSource for AwsSecretSource {
    #[instrument(skip(self))]
    async fn secret_by_name(&self, name: &str) -> Result<String, SecretError> {
        let output = self
            .inner
            .get_secret_value()
            .secret_id(name)
            .send()
            .await
            .map_err(|e| provider_error(secretsmanager::Error::from(e), name))?;

        match output.secret_string() {
            Some(value) => Ok(value.to_string()),
            None => Err(SecretError::Empty(name.to_string())),
        }
    }

    #[instrument(skip(self))]
    async fn secret_by_description_prefix(&self, prefix: &str) -> Result<String, SecretError> {
        // The service-side description filter is a case-insensitive prefix
        // match; `first_matching_secret` keeps the lookup case-sensitive.
        let filter = Filter::builder()
            .key(FilterNameStringType::Description)
            .values(prefix)
            .build();

        let found = find_across_pages(prefix, |token| {
            let request = self
                .inner
                .list_secrets()
                .filters(filter.clone())
                .set_next_token(token);
            async move {
                let page = request
                    .send()
                    .await
                    .map_err(|e| provider_error(secretsmanager::Error::from(e), prefix))?;
                Ok((
                    page.secret_list().to_vec(),
                    page.next_token().map(str::to_string),
                ))
            }
        })
        .await?;

        if let Some(id) = found {
            debug!(secret = %id, "Secret matched description prefix");
            return self.secret_by_name(&id).await;
        }

        Err(SecretError::NotFound(format!(
            "no secret with description starting with '{prefix}'"
        )))
    }
}
